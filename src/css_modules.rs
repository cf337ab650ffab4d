//! CSS modules scoping
//!
//! Local names (classes, ids, keyframes and optionally dashed idents) are
//! rewritten through a naming pattern and recorded as exports. `composes`
//! declarations become export references and `var(--x from "file")` becomes
//! a placeholder the embedding tool substitutes later.

use crate::ast::{CssRule, Declaration, Stylesheet, StyleRule};
use crate::error::{CssError, Result};
use crate::selector::{Component, PseudoClass, Selector};
use crate::types::Location;
use crate::values::{walk, walk_mut, ComponentValue, Specifier};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const DEFAULT_PATTERN: &str = "[hash]_[local]";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Name,
    Local,
    Hash,
    ContentHash,
}

/// A parsed naming pattern such as `[name]__[local]--[hash]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(input: &str) -> Result<Self> {
        let input = if input.is_empty() { DEFAULT_PATTERN } else { input };
        let mut segments = Vec::new();
        let mut rest = input;

        while !rest.is_empty() {
            match rest.find('[') {
                Some(0) => {
                    let end = rest.find(']').ok_or_else(|| CssError::InvalidFormat {
                        message: format!("Unclosed placeholder in CSS modules pattern '{}'", input),
                    })?;
                    let segment = match &rest[1..end] {
                        "name" => Segment::Name,
                        "local" => Segment::Local,
                        "hash" => Segment::Hash,
                        "content-hash" => Segment::ContentHash,
                        other => {
                            return Err(CssError::InvalidFormat {
                                message: format!("Unknown placeholder [{}] in CSS modules pattern", other),
                            })
                        }
                    };
                    segments.push(segment);
                    rest = &rest[end + 1..];
                }
                Some(start) => {
                    segments.push(Segment::Literal(rest[..start].to_string()));
                    rest = &rest[start..];
                }
                None => {
                    segments.push(Segment::Literal(rest.to_string()));
                    rest = "";
                }
            }
        }

        Ok(Self { segments })
    }

    fn write(&self, name: &str, local: &str, hash: &str, content_hash: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Name => out.push_str(name),
                Segment::Local => out.push_str(local),
                Segment::Hash => out.push_str(hash),
                Segment::ContentHash => out.push_str(content_hash),
            }
        }
        if out.starts_with(|c: char| c.is_ascii_digit()) {
            out.insert(0, '_');
        }
        out
    }
}

/// CSS modules settings fixed at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssModulesConfig {
    pub pattern: Pattern,
    pub dashed_idents: bool,
}

impl CssModulesConfig {
    pub fn new(pattern: &str, dashed_idents: bool) -> Result<Self> {
        Ok(Self {
            pattern: Pattern::parse(pattern)?,
            dashed_idents,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CssModuleReference {
    pub name: String,
    /// Empty for local and global references
    pub specifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CssModuleExport {
    /// The name as written in the source
    pub exported: String,
    /// The scoped name in the output
    pub local: String,
    pub is_referenced: bool,
    pub composes: Vec<CssModuleReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CssModulePlaceholder {
    pub placeholder: String,
    pub reference: CssModuleReference,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CssModuleResult {
    pub exports: Vec<CssModuleExport>,
    pub placeholders: Vec<CssModulePlaceholder>,
}

pub(crate) fn short_hash(data: &[u8]) -> String {
    let digest = format!("{:x}", md5::compute(data));
    digest[..8].to_string()
}

/// Path of `filename` relative to `project_root`, with `/` separators.
pub fn relative_path(filename: &str, project_root: &str) -> String {
    let path = Path::new(filename);
    let relative = if project_root.is_empty() {
        path
    } else {
        path.strip_prefix(project_root).unwrap_or(path)
    };
    relative.to_string_lossy().replace('\\', "/")
}

fn file_stem(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

struct Scoper<'a> {
    config: &'a CssModulesConfig,
    filename: String,
    name: String,
    hash: String,
    content_hash: String,
    exports: Vec<CssModuleExport>,
    index: HashMap<String, usize>,
    placeholders: Vec<CssModulePlaceholder>,
    /// Local class names defined anywhere in the file
    classes: HashSet<String>,
    /// Locally defined keyframes
    keyframes: HashSet<String>,
}

/// Scope every local name in `stylesheet` and record the module result.
pub fn scope_stylesheet(stylesheet: &mut Stylesheet, project_root: &str) -> Result<()> {
    let config = match &stylesheet.css_modules {
        Some(config) => config.clone(),
        None => return Ok(()),
    };

    let relative = relative_path(&stylesheet.filename, project_root);
    let mut scoper = Scoper {
        config: &config,
        filename: stylesheet.filename.clone(),
        name: file_stem(&stylesheet.filename),
        hash: short_hash(relative.as_bytes()),
        content_hash: short_hash(stylesheet.source.as_bytes()),
        exports: Vec::new(),
        index: HashMap::new(),
        placeholders: Vec::new(),
        classes: HashSet::new(),
        keyframes: HashSet::new(),
    };

    scoper.collect_definitions(&stylesheet.rules);
    scoper.scope_rules(&mut stylesheet.rules)?;

    log::debug!(
        "Scoped {} names in {} ({} placeholders)",
        scoper.exports.len(),
        stylesheet.filename,
        scoper.placeholders.len()
    );

    stylesheet.module_result = Some(CssModuleResult {
        exports: scoper.exports,
        placeholders: scoper.placeholders,
    });
    Ok(())
}

impl<'a> Scoper<'a> {
    fn scoped_name(&self, local: &str) -> String {
        self.config
            .pattern
            .write(&self.name, local, &self.hash, &self.content_hash)
    }

    fn scoped_dashed(&self, ident: &str) -> String {
        format!("--{}", self.scoped_name(ident.trim_start_matches("--")))
    }

    /// The export for `exported`, created on first use.
    fn export(&mut self, exported: &str, dashed: bool) -> &mut CssModuleExport {
        let position = match self.index.get(exported) {
            Some(&position) => position,
            None => {
                let local = if dashed {
                    self.scoped_dashed(exported)
                } else {
                    self.scoped_name(exported)
                };
                self.exports.push(CssModuleExport {
                    exported: exported.to_string(),
                    local,
                    is_referenced: false,
                    composes: Vec::new(),
                });
                self.index.insert(exported.to_string(), self.exports.len() - 1);
                self.exports.len() - 1
            }
        };
        &mut self.exports[position]
    }

    fn collect_definitions(&mut self, rules: &[CssRule]) {
        for rule in rules {
            match rule {
                CssRule::Style(style) | CssRule::Nesting(style) => {
                    for selector in &style.selectors.0 {
                        collect_local_classes(selector, false, &mut self.classes);
                    }
                    self.collect_definitions(&style.rules);
                }
                CssRule::Keyframes(keyframes) => {
                    self.keyframes.insert(keyframes.name.clone());
                }
                other => {
                    if let Some(children) = other.child_rules() {
                        self.collect_definitions(children);
                    }
                }
            }
        }
    }

    fn scope_rules(&mut self, rules: &mut Vec<CssRule>) -> Result<()> {
        for rule in rules.iter_mut() {
            match rule {
                CssRule::Style(style) | CssRule::Nesting(style) => self.scope_style_rule(style)?,
                CssRule::Keyframes(keyframes) => {
                    let name = keyframes.name.clone();
                    keyframes.name = self.export(&name, false).local.clone();
                    for keyframe in keyframes.keyframes.iter_mut() {
                        self.scope_declarations(&mut keyframe.declarations);
                    }
                }
                CssRule::Property(property) if self.config.dashed_idents => {
                    let name = property.prelude.clone();
                    property.prelude = self.export(&name, true).local.clone();
                }
                CssRule::FontFace(rule) | CssRule::Page(rule) | CssRule::Property(rule) => {
                    self.scope_declarations(&mut rule.declarations);
                }
                other => {
                    if let Some(children) = other.child_rules_mut() {
                        self.scope_rules(children)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn scope_style_rule(&mut self, rule: &mut StyleRule) -> Result<()> {
        let composes_classes: Option<Vec<String>> = rule
            .selectors
            .0
            .iter()
            .map(|s| s.single_class().map(str::to_string))
            .collect();

        for selector in rule.selectors.0.iter_mut() {
            self.scope_selector(selector, false);
        }

        let mut declarations = Vec::with_capacity(rule.declarations.len());
        for declaration in rule.declarations.drain(..) {
            if declaration.property == "composes" {
                let classes = composes_classes.as_deref().ok_or_else(|| {
                    CssError::scope(
                        &self.filename,
                        declaration.loc,
                        "composes is only allowed in rules whose selectors are single classes",
                    )
                })?;
                self.compose(classes, &declaration)?;
            } else {
                declarations.push(declaration);
            }
        }
        rule.declarations = declarations;
        self.scope_declarations(&mut rule.declarations);

        self.scope_rules(&mut rule.rules)
    }

    fn scope_selector(&mut self, selector: &mut Selector, global: bool) {
        let mut components = Vec::with_capacity(selector.0.len());
        for component in selector.0.drain(..) {
            match component {
                Component::PseudoClass(PseudoClass::Local(mut inner)) => {
                    self.scope_selector(&mut inner, false);
                    components.extend(inner.0);
                }
                Component::PseudoClass(PseudoClass::Global(mut inner)) => {
                    self.scope_selector(&mut inner, true);
                    components.extend(inner.0);
                }
                Component::PseudoClass(PseudoClass::Selectors { name, mut list }) => {
                    for inner in list.0.iter_mut() {
                        self.scope_selector(inner, global);
                    }
                    components.push(Component::PseudoClass(PseudoClass::Selectors { name, list }));
                }
                Component::Class(name) if !global => {
                    components.push(Component::Class(self.export(&name, false).local.clone()))
                }
                Component::Id(name) if !global => {
                    components.push(Component::Id(self.export(&name, false).local.clone()))
                }
                other => components.push(other),
            }
        }
        selector.0 = components;
    }

    fn compose(&mut self, classes: &[String], declaration: &Declaration) -> Result<()> {
        let (names, from) = parse_composes(&declaration.value)
            .ok_or_else(|| CssError::scope(&self.filename, declaration.loc, "Invalid composes value"))?;

        let mut references = Vec::with_capacity(names.len());
        for name in names {
            let reference = match &from {
                None => {
                    if !self.classes.contains(&name) {
                        return Err(CssError::scope(
                            &self.filename,
                            declaration.loc,
                            format!("Referenced class '{}' is not defined in this file", name),
                        ));
                    }
                    let target = self.export(&name, false);
                    target.is_referenced = true;
                    CssModuleReference {
                        name: target.local.clone(),
                        specifier: String::new(),
                    }
                }
                Some(Specifier::Global) => CssModuleReference {
                    name,
                    specifier: String::new(),
                },
                Some(Specifier::File(file)) => CssModuleReference {
                    name,
                    specifier: file.clone(),
                },
            };
            references.push(reference);
        }

        for class in classes {
            self.export(class, false).composes.extend(references.iter().cloned());
        }
        Ok(())
    }

    fn scope_declarations(&mut self, declarations: &mut [Declaration]) {
        for declaration in declarations.iter_mut() {
            if self.config.dashed_idents && declaration.is_custom() {
                let name = declaration.property.clone();
                declaration.property = self.export(&name, true).local.clone();
            }

            let property = declaration.property.to_ascii_lowercase();
            let animation = matches!(
                crate::types::VendorPrefix::strip(&property).1,
                "animation" | "animation-name"
            );
            let loc = declaration.loc;
            walk_mut(&mut declaration.value, &mut |value| self.scope_value(value, animation, loc));
        }
    }

    fn scope_value(&mut self, value: &mut ComponentValue, animation: bool, loc: Location) {
        match value {
            ComponentValue::Ident(name) if animation && self.keyframes.contains(name.as_str()) => {
                let export = self.export(name, false);
                export.is_referenced = true;
                *name = export.local.clone();
            }
            ComponentValue::Var(variable) if self.config.dashed_idents => {
                let reference = &mut variable.name;
                match reference.from.take() {
                    None => {
                        let export = self.export(&reference.ident, true);
                        export.is_referenced = true;
                        reference.ident = export.local.clone();
                    }
                    Some(Specifier::Global) => {}
                    Some(Specifier::File(specifier)) => {
                        let key = format!("{}:{}:{}:{}", self.filename, specifier, reference.ident, loc.offset);
                        let placeholder = format!("--{}", short_hash(key.as_bytes()));
                        self.placeholders.push(CssModulePlaceholder {
                            placeholder: placeholder.clone(),
                            reference: CssModuleReference {
                                name: reference.ident.trim_start_matches("--").to_string(),
                                specifier,
                            },
                        });
                        reference.ident = placeholder;
                    }
                }
            }
            ComponentValue::DashedIdent(reference) if self.config.dashed_idents => {
                if reference.from.take().is_none() {
                    reference.ident = self.export(&reference.ident, true).local.clone();
                }
            }
            _ => {}
        }
    }
}

fn collect_local_classes(selector: &Selector, global: bool, classes: &mut HashSet<String>) {
    for component in &selector.0 {
        match component {
            Component::Class(name) if !global => {
                classes.insert(name.clone());
            }
            Component::PseudoClass(PseudoClass::Local(inner)) => collect_local_classes(inner, false, classes),
            Component::PseudoClass(PseudoClass::Global(inner)) => collect_local_classes(inner, true, classes),
            Component::PseudoClass(PseudoClass::Selectors { list, .. }) => {
                for inner in &list.0 {
                    collect_local_classes(inner, global, classes);
                }
            }
            _ => {}
        }
    }
}

/// `a b [from "file" | from global]`
fn parse_composes(value: &[ComponentValue]) -> Option<(Vec<String>, Option<Specifier>)> {
    let mut names = Vec::new();
    let mut from = None;
    let mut items = value.iter().filter(|v| !matches!(v, ComponentValue::Whitespace));

    while let Some(item) = items.next() {
        match item {
            v if v.is_ident("from") => {
                from = Some(match items.next()? {
                    ComponentValue::String(file) => Specifier::File(file.clone()),
                    v if v.is_ident("global") => Specifier::Global,
                    _ => return None,
                });
                if items.next().is_some() {
                    return None;
                }
            }
            ComponentValue::Ident(name) => names.push(name.clone()),
            _ => return None,
        }
    }

    if names.is_empty() {
        return None;
    }
    Some((names, from))
}

/// Names of every dashed ident referenced with `var()`, used by pruning.
pub fn referenced_dashed_idents(values: &[ComponentValue], out: &mut HashSet<String>) {
    walk(values, &mut |value| {
        if let ComponentValue::Var(variable) = value {
            out.insert(variable.name.ident.clone());
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;
    use crate::ParserOptions;

    fn scoped(source: &str, pattern: &str, dashed_idents: bool) -> Result<Stylesheet> {
        let options = ParserOptions {
            filename: "styles/button.css".to_string(),
            css_modules: true,
            css_modules_pattern: pattern.to_string(),
            css_modules_dashed_idents: dashed_idents,
            ..ParserOptions::default()
        };
        let mut sheet = parse_stylesheet(source, &options)?;
        scope_stylesheet(&mut sheet, "")?;
        Ok(sheet)
    }

    fn selectors(sheet: &Stylesheet) -> Vec<String> {
        sheet
            .rules
            .iter()
            .filter_map(|rule| match rule {
                CssRule::Style(style) => Some(style.selectors.to_css(false)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_pattern_parsing() {
        assert!(Pattern::parse("[name]_[local]").is_ok());
        assert!(Pattern::parse("[bogus]").is_err());
        assert!(Pattern::parse("[local").is_err());
        assert_eq!(Pattern::parse("").unwrap(), Pattern::parse(DEFAULT_PATTERN).unwrap());
    }

    #[test]
    fn test_class_scoping_with_default_pattern() {
        let sheet = scoped(".foo { color: red }", "", false).unwrap();
        let result = sheet.module_result.as_ref().unwrap();
        let hash = short_hash(b"styles/button.css");

        assert_eq!(result.exports.len(), 1);
        assert_eq!(result.exports[0].exported, "foo");
        assert_ne!(result.exports[0].local, "foo");
        assert!(result.exports[0].local.ends_with("_foo"));
        assert!(result.exports[0].local.trim_start_matches('_').starts_with(&hash));
        assert_eq!(selectors(&sheet), vec![format!(".{}", result.exports[0].local)]);
    }

    #[test]
    fn test_name_pattern_and_global() {
        let sheet = scoped(":global(.app) .title, #main { color: red }", "[name]__[local]", false).unwrap();
        assert_eq!(selectors(&sheet), vec![".app .button__title, #button__main"]);

        let exports: Vec<_> = sheet
            .module_result
            .unwrap()
            .exports
            .into_iter()
            .map(|e| e.exported)
            .collect();
        assert_eq!(exports, vec!["title", "main"]);
    }

    #[test]
    fn test_composes() {
        let sheet = scoped(
            ".base { color: red }\n\
             .button { composes: base; composes: shared from \"./shared.css\"; composes: reset from global; margin: 0 }",
            "[local]-x",
            false,
        )
        .unwrap();

        let result = sheet.module_result.as_ref().unwrap();
        let base = &result.exports[0];
        let button = &result.exports[1];
        assert_eq!(base.exported, "base");
        assert!(base.is_referenced);
        assert_eq!(
            button.composes,
            vec![
                CssModuleReference { name: "base-x".to_string(), specifier: String::new() },
                CssModuleReference { name: "shared".to_string(), specifier: "./shared.css".to_string() },
                CssModuleReference { name: "reset".to_string(), specifier: String::new() },
            ]
        );

        match &sheet.rules[1] {
            CssRule::Style(rule) => {
                assert_eq!(rule.declarations.len(), 1);
                assert_eq!(rule.declarations[0].property, "margin");
            }
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_composes_errors() {
        let err = scoped(".a { composes: missing }", "", false).unwrap_err();
        assert!(matches!(err, CssError::Scope { .. }));

        let err = scoped(".base {} .a .b { composes: base }", "", false).unwrap_err();
        assert!(matches!(err, CssError::Scope { .. }));
    }

    #[test]
    fn test_keyframes_and_animation_references() {
        let sheet = scoped(
            "@keyframes spin { to { opacity: 0 } } .a { animation: spin 1s linear; }",
            "[local]_m",
            false,
        )
        .unwrap();

        match &sheet.rules[0] {
            CssRule::Keyframes(rule) => assert_eq!(rule.name, "spin_m"),
            _ => panic!("Expected @keyframes"),
        }
        match &sheet.rules[1] {
            CssRule::Style(rule) => {
                assert_eq!(rule.declarations[0].value[0], ComponentValue::Ident("spin_m".to_string()))
            }
            _ => panic!("Expected style rule"),
        }
        let spin = &sheet.module_result.unwrap().exports[0];
        assert!(spin.is_referenced);
    }

    #[test]
    fn test_dashed_idents() {
        let sheet = scoped(
            ".a { --accent: red; color: var(--accent); background: var(--bg from \"./theme.css\"); border-color: var(--line from global) }",
            "[local]_m",
            true,
        )
        .unwrap();

        let result = sheet.module_result.as_ref().unwrap();
        let accent = result.exports.iter().find(|e| e.exported == "--accent").unwrap();
        assert_eq!(accent.local, "--accent_m");
        assert!(accent.is_referenced);

        assert_eq!(result.placeholders.len(), 1);
        let placeholder = &result.placeholders[0];
        assert_eq!(placeholder.reference.name, "bg");
        assert_eq!(placeholder.reference.specifier, "./theme.css");
        assert_eq!(placeholder.placeholder.len(), 10);

        match &sheet.rules[0] {
            CssRule::Style(rule) => {
                assert_eq!(rule.declarations[0].property, "--accent_m");
                match &rule.declarations[3].value[0] {
                    ComponentValue::Var(variable) => {
                        assert_eq!(variable.name.ident, "--line");
                        assert!(variable.name.from.is_none());
                    }
                    other => panic!("Expected var(), got {:?}", other),
                }
            }
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("/project/src/a.css", "/project"), "src/a.css");
        assert_eq!(relative_path("a.css", ""), "a.css");
        assert_eq!(relative_path("/elsewhere/a.css", "/project"), "/elsewhere/a.css");
    }
}
