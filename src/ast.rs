//! Abstract Syntax Tree types for the Flint compiler

use crate::css_modules::{CssModuleResult, CssModulesConfig};
use crate::error::Diagnostic;
use crate::selector::SelectorList;
use crate::types::{Location, VendorPrefix};
use crate::values::ComponentValue;

/// A parsed stylesheet
#[derive(Debug, Clone)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
    /// `/*! ... */` comments found at the top level, without delimiters
    pub license_comments: Vec<String>,
    pub filename: String,
    /// Source text, kept for `sourcesContent` and content hashing
    pub source: String,
    /// Problems skipped under error recovery
    pub diagnostics: Vec<Diagnostic>,
    /// Set when the stylesheet was parsed with CSS modules enabled
    pub css_modules: Option<CssModulesConfig>,
    /// Whether `@custom-media` definitions were allowed
    pub custom_media: bool,
    /// Filled in by the transform pass
    pub module_result: Option<CssModuleResult>,
    pub transformed: bool,
}

impl Stylesheet {
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            license_comments: Vec::new(),
            filename: filename.into(),
            source: source.into(),
            diagnostics: Vec::new(),
            css_modules: None,
            custom_media: false,
            module_result: None,
            transformed: false,
        }
    }
}

/// A single `property: value` pair
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: Vec<ComponentValue>,
    pub important: bool,
    pub loc: Location,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: Vec<ComponentValue>, loc: Location) -> Self {
        Self {
            property: property.into(),
            value,
            important: false,
            loc,
        }
    }

    /// Custom properties (`--name`) are kept exactly as written.
    pub fn is_custom(&self) -> bool {
        self.property.starts_with("--")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selectors: SelectorList,
    pub declarations: Vec<Declaration>,
    /// Nested rules, kept until the transform pass flattens them
    pub rules: Vec<CssRule>,
    pub loc: Location,
}

impl StyleRule {
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.rules.is_empty()
    }
}

/// Prelude and body shared by conditional group rules
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRule {
    pub prelude: Vec<ComponentValue>,
    pub rules: Vec<CssRule>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRule {
    pub url: String,
    /// `Some("")` for an anonymous `layer`
    pub layer: Option<String>,
    pub supports: Option<Vec<ComponentValue>>,
    pub media: Vec<ComponentValue>,
    pub loc: Location,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyframeSelector {
    From,
    To,
    Percentage(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub selectors: Vec<KeyframeSelector>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyframesRule {
    pub name: String,
    pub prefix: VendorPrefix,
    pub keyframes: Vec<Keyframe>,
    pub loc: Location,
}

/// At-rules made of a prelude and a declaration block
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationRule {
    pub prelude: String,
    pub declarations: Vec<Declaration>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerRule {
    pub name: Option<String>,
    pub rules: Vec<CssRule>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRule {
    pub name: Option<String>,
    pub condition: Vec<ComponentValue>,
    pub rules: Vec<CssRule>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownAtRule {
    pub name: String,
    pub prelude: String,
    pub block: Option<String>,
    pub loc: Location,
}

/// Rule node types
#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    /// `selector { ... }`
    Style(StyleRule),

    /// `@media <query> { ... }`
    Media(GroupRule),

    /// `@supports <condition> { ... }`
    Supports(GroupRule),

    Import(ImportRule),

    /// `@keyframes` and its vendor-prefixed forms
    Keyframes(KeyframesRule),

    FontFace(DeclarationRule),

    /// `@page`; the prelude holds the page selectors
    Page(DeclarationRule),

    Namespace {
        prefix: Option<String>,
        url: String,
        loc: Location,
    },

    /// `@layer name { ... }`
    Layer(LayerRule),

    /// `@layer a, b;`
    LayerStatement { names: Vec<String>, loc: Location },

    Container(ContainerRule),

    /// `@custom-media --name <query>;`
    CustomMedia {
        name: String,
        query: Vec<ComponentValue>,
        loc: Location,
    },

    /// `@property --name { ... }`; the prelude holds the property name
    Property(DeclarationRule),

    /// `@nest <selector> { ... }`
    Nesting(StyleRule),

    /// Any other at-rule, kept verbatim
    Unknown(UnknownAtRule),
}

impl CssRule {
    pub fn loc(&self) -> Location {
        match self {
            CssRule::Style(rule) | CssRule::Nesting(rule) => rule.loc,
            CssRule::Media(rule) | CssRule::Supports(rule) => rule.loc,
            CssRule::Import(rule) => rule.loc,
            CssRule::Keyframes(rule) => rule.loc,
            CssRule::FontFace(rule) | CssRule::Page(rule) | CssRule::Property(rule) => rule.loc,
            CssRule::Layer(rule) => rule.loc,
            CssRule::Container(rule) => rule.loc,
            CssRule::Unknown(rule) => rule.loc,
            CssRule::Namespace { loc, .. }
            | CssRule::LayerStatement { loc, .. }
            | CssRule::CustomMedia { loc, .. } => *loc,
        }
    }

    /// Child rules of grouping rules.
    pub fn child_rules_mut(&mut self) -> Option<&mut Vec<CssRule>> {
        match self {
            CssRule::Media(rule) | CssRule::Supports(rule) => Some(&mut rule.rules),
            CssRule::Layer(rule) => Some(&mut rule.rules),
            CssRule::Container(rule) => Some(&mut rule.rules),
            _ => None,
        }
    }

    pub fn child_rules(&self) -> Option<&Vec<CssRule>> {
        match self {
            CssRule::Media(rule) | CssRule::Supports(rule) => Some(&rule.rules),
            CssRule::Layer(rule) => Some(&rule.rules),
            CssRule::Container(rule) => Some(&rule.rules),
            _ => None,
        }
    }

    /// Whether the rule would print nothing useful.
    ///
    /// Named `@layer` blocks are kept even when empty since they still
    /// establish layer order.
    pub fn is_empty(&self) -> bool {
        match self {
            CssRule::Style(rule) | CssRule::Nesting(rule) => rule.is_empty(),
            CssRule::Media(rule) | CssRule::Supports(rule) => rule.rules.is_empty(),
            CssRule::Container(rule) => rule.rules.is_empty(),
            CssRule::Layer(rule) => rule.name.is_none() && rule.rules.is_empty(),
            CssRule::Keyframes(rule) => rule.keyframes.is_empty(),
            _ => false,
        }
    }
}

/// Visit every style rule (including nested ones) in source order.
pub fn visit_style_rules_mut(rules: &mut [CssRule], f: &mut dyn FnMut(&mut StyleRule)) {
    for rule in rules.iter_mut() {
        match rule {
            CssRule::Style(style) | CssRule::Nesting(style) => {
                f(style);
                visit_style_rules_mut(&mut style.rules, f);
            }
            other => {
                if let Some(children) = other.child_rules_mut() {
                    visit_style_rules_mut(children, f);
                }
            }
        }
    }
}

pub fn visit_style_rules(rules: &[CssRule], f: &mut dyn FnMut(&StyleRule)) {
    for rule in rules {
        match rule {
            CssRule::Style(style) | CssRule::Nesting(style) => {
                f(style);
                visit_style_rules(&style.rules, f);
            }
            other => {
                if let Some(children) = other.child_rules() {
                    visit_style_rules(children, f);
                }
            }
        }
    }
}

/// Visit every declaration block: style rules, keyframes and the
/// descriptor blocks of `@font-face`, `@page` and `@property`.
pub fn visit_declarations_mut(rules: &mut [CssRule], f: &mut dyn FnMut(&mut Vec<Declaration>)) {
    for rule in rules.iter_mut() {
        match rule {
            CssRule::Style(style) | CssRule::Nesting(style) => {
                f(&mut style.declarations);
                visit_declarations_mut(&mut style.rules, f);
            }
            CssRule::Keyframes(keyframes) => {
                for keyframe in keyframes.keyframes.iter_mut() {
                    f(&mut keyframe.declarations);
                }
            }
            CssRule::FontFace(rule) | CssRule::Page(rule) | CssRule::Property(rule) => {
                f(&mut rule.declarations)
            }
            other => {
                if let Some(children) = other.child_rules_mut() {
                    visit_declarations_mut(children, f);
                }
            }
        }
    }
}

/// Remove empty rules, innermost first, so emptied parents go too.
pub fn remove_empty_rules(rules: &mut Vec<CssRule>) {
    for rule in rules.iter_mut() {
        match rule {
            CssRule::Style(style) | CssRule::Nesting(style) => remove_empty_rules(&mut style.rules),
            other => {
                if let Some(children) = other.child_rules_mut() {
                    remove_empty_rules(children);
                }
            }
        }
    }
    rules.retain(|rule| !rule.is_empty());
}
