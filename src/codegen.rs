//! CSS code generation
//!
//! Prints a stylesheet either pretty (two-space indentation, a blank line
//! between rules) or minified, tracking output positions so a v3 source map
//! can be built alongside.

use crate::ast::*;
use crate::compat::Feature;
use crate::css_modules::relative_path;
use crate::dependencies::{analyze_dependencies, Dependency};
use crate::error::{CssError, Result};
use crate::optimizer::Optimizer;
use crate::selector::{Component, PseudoClass, Selector, SelectorList};
use crate::types::{Location, VendorPrefix};
use crate::values::{format_number, serialize_identifier, serialize_string, to_css, ValueFormat};
use crate::PrinterOptions;
use sourcemap::{SourceMap, SourceMapBuilder};
use std::borrow::Cow;
use std::collections::HashSet;

/// Output of one generator run.
#[derive(Debug, Clone, Default)]
pub struct GeneratedCode {
    pub code: String,
    /// Source map JSON when requested
    pub map: Option<String>,
    pub dependencies: Vec<Dependency>,
}

/// An output position paired with the source position it came from.
#[derive(Debug, Clone, Copy)]
struct Mapping {
    line: u32,
    column: u32,
    source: Location,
}

pub struct CodeGenerator<'a> {
    options: &'a PrinterOptions,
    output: String,
    line: u32,
    column: u32,
    indent: usize,
    mappings: Vec<Mapping>,
    hex_alpha: bool,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(options: &'a PrinterOptions) -> Self {
        Self {
            options,
            output: String::new(),
            line: 0,
            column: 0,
            indent: 0,
            mappings: Vec::new(),
            hex_alpha: Feature::HexAlphaColors.is_compatible(&options.targets),
        }
    }

    pub fn generate(mut self, stylesheet: &Stylesheet) -> Result<GeneratedCode> {
        let mut rules = Cow::Borrowed(&stylesheet.rules);

        let mut dependencies = Vec::new();
        if self.options.analyze_dependencies {
            dependencies = analyze_dependencies(rules.to_mut(), &stylesheet.filename);
        }

        if self.options.minify {
            let mut optimizer = Optimizer::new();
            optimizer.optimize(rules.to_mut());
            log::trace!(
                "Minification applied: {:?}",
                optimizer.get_optimization_stats().optimizations_applied
            );
        }

        for comment in &stylesheet.license_comments {
            self.write("/*");
            self.write(comment);
            self.write("*/");
            self.newline();
        }

        self.write_rules(&rules);
        if !self.options.minify && !self.output.is_empty() && !self.output.ends_with('\n') {
            self.write("\n");
        }

        let map = if self.options.source_map {
            Some(self.source_map(stylesheet)?)
        } else {
            None
        };

        log::debug!(
            "Generated {} bytes ({} source mappings)",
            self.output.len(),
            self.mappings.len()
        );

        Ok(GeneratedCode {
            code: self.output,
            map,
            dependencies,
        })
    }

    fn minify(&self) -> bool {
        self.options.minify
    }

    fn write(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += ch.len_utf16() as u32;
            }
        }
        self.output.push_str(text);
    }

    /// A line break plus indentation; nothing when minifying.
    fn newline(&mut self) {
        if self.minify() {
            return;
        }
        self.write("\n");
        let indent = "  ".repeat(self.indent);
        self.write(&indent);
    }

    fn whitespace(&mut self) {
        if !self.minify() {
            self.write(" ");
        }
    }

    fn add_mapping(&mut self, source: Location) {
        self.mappings.push(Mapping {
            line: self.line,
            column: self.column,
            source,
        });
    }

    fn value_format(&self, property: &str) -> ValueFormat {
        ValueFormat {
            minify: self.minify(),
            hex_alpha: self.hex_alpha,
            zero_lengths: self.minify()
                && !property.starts_with("--")
                && !matches!(VendorPrefix::strip(property).1, "flex" | "flex-basis"),
        }
    }

    fn write_rules(&mut self, rules: &[CssRule]) {
        let mut first = true;
        for rule in rules {
            if rule.is_empty() && self.minify() {
                continue;
            }
            if !first {
                if !self.minify() {
                    self.write("\n");
                }
                self.newline();
            }
            first = false;
            self.write_rule(rule);
        }
    }

    /// `{`, the block contents and `}`.
    fn write_block(&mut self, contents: impl FnOnce(&mut Self)) {
        self.whitespace();
        self.write("{");
        self.indent += 1;
        contents(self);
        self.indent -= 1;
        self.newline();
        self.write("}");
    }

    fn write_child_rules(&mut self, rules: &[CssRule]) {
        self.write_block(|generator| {
            generator.newline();
            generator.write_rules(rules);
        });
    }

    fn write_rule(&mut self, rule: &CssRule) {
        self.add_mapping(rule.loc());
        match rule {
            CssRule::Style(style) => self.write_style_rule(style, None),
            CssRule::Nesting(style) => self.write_style_rule(style, Some("@nest ")),
            CssRule::Media(group) | CssRule::Supports(group) => {
                let name = if matches!(rule, CssRule::Media(_)) { "@media" } else { "@supports" };
                self.write(name);
                if !group.prelude.is_empty() {
                    self.write(" ");
                    self.write(&to_css(&group.prelude, self.value_format("")));
                }
                self.write_child_rules(&group.rules);
            }
            CssRule::Import(import) => self.write_import(import),
            CssRule::Keyframes(keyframes) => self.write_keyframes(keyframes),
            CssRule::FontFace(rule) => self.write_declaration_rule("@font-face", rule),
            CssRule::Page(rule) => self.write_declaration_rule("@page", rule),
            CssRule::Property(rule) => self.write_declaration_rule("@property", rule),
            CssRule::Namespace { prefix, url, .. } => {
                self.write("@namespace ");
                if let Some(prefix) = prefix {
                    let mut text = String::new();
                    serialize_identifier(prefix, &mut text);
                    self.write(&text);
                    self.write(" ");
                }
                let mut text = String::new();
                serialize_string(url, &mut text);
                self.write(&text);
                self.write(";");
            }
            CssRule::Layer(layer) => {
                self.write("@layer");
                if let Some(name) = &layer.name {
                    self.write(" ");
                    self.write(name);
                }
                self.write_child_rules(&layer.rules);
            }
            CssRule::LayerStatement { names, .. } => {
                self.write("@layer ");
                let separator = if self.minify() { "," } else { ", " };
                self.write(&names.join(separator));
                self.write(";");
            }
            CssRule::Container(container) => {
                self.write("@container");
                if let Some(name) = &container.name {
                    self.write(" ");
                    self.write(name);
                }
                if !container.condition.is_empty() {
                    self.write(" ");
                    self.write(&to_css(&container.condition, self.value_format("")));
                }
                self.write_child_rules(&container.rules);
            }
            CssRule::CustomMedia { name, query, .. } => {
                self.write("@custom-media ");
                self.write(name);
                self.write(" ");
                self.write(&to_css(query, self.value_format("")));
                self.write(";");
            }
            CssRule::Unknown(unknown) => {
                self.write("@");
                self.write(&unknown.name);
                if !unknown.prelude.is_empty() {
                    self.write(" ");
                    self.write(&unknown.prelude);
                }
                match &unknown.block {
                    Some(block) => self.write_block(|generator| {
                        if !block.is_empty() {
                            generator.newline();
                            generator.write(block);
                        }
                    }),
                    None => self.write(";"),
                }
            }
        }
    }

    fn write_style_rule(&mut self, rule: &StyleRule, at_rule: Option<&str>) {
        let groups = self.selector_groups(&rule.selectors);
        let last = groups.len().saturating_sub(1);

        for (i, group) in groups.iter().enumerate() {
            if i > 0 {
                if !self.minify() {
                    self.write("\n");
                }
                self.newline();
                self.add_mapping(rule.loc);
            }
            if let Some(at_rule) = at_rule {
                self.write(at_rule);
            }
            let selectors = SelectorList(group.clone());
            self.write(&selectors.to_css(self.minify()));

            // Nested rules are only printed once, with the unprefixed group.
            let children: &[CssRule] = if i == last { &rule.rules } else { &[] };
            self.write_block(|generator| {
                generator.write_declarations(&rule.declarations, !children.is_empty());
                for (j, child) in children.iter().enumerate() {
                    if !generator.minify() && (j > 0 || !rule.declarations.is_empty()) {
                        generator.write("\n");
                    }
                    generator.newline();
                    generator.write_rule(child);
                }
            });
        }
    }

    /// Selectors after pseudo-class overrides, grouped by vendor prefix in
    /// order of first appearance.
    fn selector_groups(&self, list: &SelectorList) -> Vec<Vec<Selector>> {
        let mut selectors = Vec::with_capacity(list.0.len());
        for selector in &list.0 {
            selectors.push(selector.clone());
            if let Some(replaced) = self.replace_pseudo_classes(selector) {
                if !selectors.contains(&replaced) {
                    selectors.push(replaced);
                }
            }
        }

        let mut groups: Vec<(VendorPrefix, Vec<Selector>)> = Vec::new();
        for selector in selectors {
            let prefix = selector.vendor_prefix();
            match groups.iter_mut().find(|(p, _)| *p == prefix) {
                Some((_, group)) => group.push(selector),
                None => groups.push((prefix, vec![selector])),
            }
        }
        groups.into_iter().map(|(_, group)| group).collect()
    }

    /// A copy of `selector` with overridden pseudo-classes replaced by
    /// their classes, or `None` when nothing was replaced.
    fn replace_pseudo_classes(&self, selector: &Selector) -> Option<Selector> {
        let pseudo_classes = &self.options.pseudo_classes;
        if pseudo_classes.is_empty() {
            return None;
        }

        let mut replaced = false;
        let mut copy = selector.clone();
        copy.walk_mut(&mut |component| {
            let class = match component {
                Component::PseudoClass(PseudoClass::Simple(name)) => pseudo_classes.get(name),
                _ => None,
            };
            if let Some(class) = class {
                *component = Component::Class(class.to_string());
                replaced = true;
            }
        });
        if replaced {
            Some(copy)
        } else {
            None
        }
    }

    fn write_declarations(&mut self, declarations: &[Declaration], followed_by_rules: bool) {
        for (i, declaration) in declarations.iter().enumerate() {
            self.newline();
            self.add_mapping(declaration.loc);
            self.write(&declaration.property);
            self.write(":");
            self.whitespace();
            self.write(&to_css(&declaration.value, self.value_format(&declaration.property)));
            if declaration.important {
                self.whitespace();
                self.write("!important");
            }
            let last = i + 1 == declarations.len();
            if !self.minify() || !last || followed_by_rules {
                self.write(";");
            }
        }
    }

    fn write_declaration_rule(&mut self, name: &str, rule: &DeclarationRule) {
        self.write(name);
        if !rule.prelude.is_empty() {
            self.write(" ");
            self.write(&rule.prelude);
        }
        self.write_block(|generator| generator.write_declarations(&rule.declarations, false));
    }

    fn write_import(&mut self, import: &ImportRule) {
        let format = self.value_format("");
        self.write("@import ");
        let mut url = String::new();
        serialize_string(&import.url, &mut url);
        self.write(&url);

        match import.layer.as_deref() {
            Some("") => self.write(" layer"),
            Some(name) => {
                self.write(" layer(");
                self.write(name);
                self.write(")");
            }
            None => {}
        }
        if let Some(supports) = &import.supports {
            self.write(" supports(");
            self.write(&to_css(supports, format));
            self.write(")");
        }
        if !import.media.is_empty() {
            self.write(" ");
            self.write(&to_css(&import.media, format));
        }
        self.write(";");
    }

    fn write_keyframes(&mut self, keyframes: &KeyframesRule) {
        self.write("@");
        self.write(keyframes.prefix.as_str());
        self.write("keyframes ");
        let mut name = String::new();
        serialize_identifier(&keyframes.name, &mut name);
        self.write(&name);

        self.write_block(|generator| {
            for (i, keyframe) in keyframes.keyframes.iter().enumerate() {
                if i > 0 && !generator.minify() {
                    generator.write("\n");
                }
                generator.newline();
                let separator = if generator.minify() { "," } else { ", " };
                let selectors: Vec<String> = keyframe
                    .selectors
                    .iter()
                    .map(|selector| generator.keyframe_selector(*selector))
                    .collect();
                generator.write(&selectors.join(separator));
                generator.write_block(|generator| generator.write_declarations(&keyframe.declarations, false));
            }
        });
    }

    /// `from` and `100%` print as their shorter forms when minifying.
    fn keyframe_selector(&self, selector: KeyframeSelector) -> String {
        match selector {
            KeyframeSelector::From if self.minify() => "0%".to_string(),
            KeyframeSelector::From => "from".to_string(),
            KeyframeSelector::To => "to".to_string(),
            KeyframeSelector::Percentage(p) if self.minify() && p == 100.0 => "to".to_string(),
            KeyframeSelector::Percentage(p) => format!("{}%", format_number(p, self.minify())),
        }
    }

    /// Build the v3 source map, chaining through the input map if one
    /// was given.
    fn source_map(&self, stylesheet: &Stylesheet) -> Result<String> {
        let input = if self.options.input_source_map.is_empty() {
            None
        } else {
            let map = SourceMap::from_slice(self.options.input_source_map.as_bytes())
                .map_err(|e| CssError::codegen(format!("Invalid input source map: {}", e)))?;
            Some(map)
        };

        let source_name = relative_path(&stylesheet.filename, &self.options.project_root);
        let mut builder = SourceMapBuilder::new(None);

        match &input {
            None => {
                let id = builder.add_source(&source_name);
                builder.set_source_contents(id, Some(&stylesheet.source));
                for mapping in &self.mappings {
                    builder.add(
                        mapping.line,
                        mapping.column,
                        mapping.source.line,
                        mapping.source.column,
                        Some(&source_name),
                        None,
                    );
                }
            }
            Some(input) => {
                let mut with_contents = HashSet::new();
                for mapping in &self.mappings {
                    let token = match input.lookup_token(mapping.source.line, mapping.source.column) {
                        Some(token) => token,
                        None => continue,
                    };
                    let source = match token.get_source() {
                        Some(source) => source,
                        None => continue,
                    };
                    let raw = builder.add(
                        mapping.line,
                        mapping.column,
                        token.get_src_line(),
                        token.get_src_col(),
                        Some(source),
                        token.get_name(),
                    );
                    if with_contents.insert(raw.src_id) {
                        let contents = input.get_source_contents(token.get_src_id());
                        builder.set_source_contents(raw.src_id, contents);
                    }
                }
            }
        }

        let mut json = Vec::new();
        builder
            .into_sourcemap()
            .to_writer(&mut json)
            .map_err(|e| CssError::codegen(format!("Failed to write source map: {}", e)))?;
        String::from_utf8(json).map_err(|e| CssError::codegen(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;
    use crate::targets::{Browser, Targets, Version};
    use crate::{ParserOptions, PseudoClasses};

    fn parse(source: &str) -> Stylesheet {
        let options = ParserOptions {
            filename: "style.css".to_string(),
            nesting: true,
            ..ParserOptions::default()
        };
        parse_stylesheet(source, &options).unwrap()
    }

    fn print(source: &str, options: &PrinterOptions) -> String {
        CodeGenerator::new(options).generate(&parse(source)).unwrap().code
    }

    fn minified() -> PrinterOptions {
        PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        }
    }

    #[test]
    fn test_pretty_output() {
        let output = print(
            ".a { color: red; margin: 0px } @media print { .b { color: green } }",
            &PrinterOptions::default(),
        );
        assert_eq!(
            output,
            ".a {\n  color: red;\n  margin: 0px;\n}\n\n@media print {\n  .b {\n    color: green;\n  }\n}\n"
        );
    }

    #[test]
    fn test_minified_output() {
        let output = print(
            ".a { color: red; margin: 0px; opacity: 0.5 } @media print { .b { color: green } }",
            &minified(),
        );
        assert_eq!(output, ".a{color:red;margin:0;opacity:.5}@media print{.b{color:green}}");
    }

    #[test]
    fn test_license_comment_kept() {
        let output = print("/*! MIT */ .a { color: red }", &minified());
        assert_eq!(output, "/*! MIT */.a{color:red}");
    }

    #[test]
    fn test_nested_rules() {
        let output = print(".a { color: red; &:hover { color: green } }", &PrinterOptions::default());
        assert_eq!(
            output,
            ".a {\n  color: red;\n\n  &:hover {\n    color: green;\n  }\n}\n"
        );
        let output = print(".a { color: red; &:hover { color: green } }", &minified());
        assert_eq!(output, ".a{color:red;&:hover{color:green}}");
    }

    #[test]
    fn test_keyframes_minified_selectors() {
        let output = print(
            "@keyframes fade { from { opacity: 1 } 100% { opacity: 0 } }",
            &minified(),
        );
        assert_eq!(output, "@keyframes fade{0%{opacity:1}to{opacity:0}}");
    }

    #[test]
    fn test_vendor_prefixed_selectors_split() {
        let output = print(
            "input::-webkit-input-placeholder, input::placeholder, .x { color: red }",
            &minified(),
        );
        assert_eq!(
            output,
            "input::-webkit-input-placeholder{color:red}input::placeholder,.x{color:red}"
        );
    }

    #[test]
    fn test_pseudo_class_overrides() {
        let options = PrinterOptions {
            minify: true,
            pseudo_classes: PseudoClasses {
                hover: Some("is-hovered".to_string()),
                ..PseudoClasses::default()
            },
            ..PrinterOptions::default()
        };
        let output = print(".btn:hover { color: red }", &options);
        assert_eq!(output, ".btn:hover,.btn.is-hovered{color:red}");
    }

    #[test]
    fn test_hex_alpha_depends_on_targets() {
        let source = ".a { color: rgba(255, 0, 0, 0.5) }";
        assert_eq!(print(source, &minified()), ".a{color:#ff000080}");

        let mut targets = Targets::default();
        targets.set(Browser::Ie, Some(Version::new(11, 0, 0)));
        let options = PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        };
        assert_eq!(print(source, &options), ".a{color:rgba(255,0,0,.5)}");
    }

    #[test]
    fn test_source_map() {
        let options = PrinterOptions {
            source_map: true,
            ..PrinterOptions::default()
        };
        let generated = CodeGenerator::new(&options)
            .generate(&parse(".a {\n  color: red;\n}\n"))
            .unwrap();
        let map = SourceMap::from_slice(generated.map.unwrap().as_bytes()).unwrap();
        assert_eq!(map.get_source(0), Some("style.css"));
        assert_eq!(map.get_source_contents(0), Some(".a {\n  color: red;\n}\n"));

        let token = map.lookup_token(1, 2).unwrap();
        assert_eq!((token.get_src_line(), token.get_src_col()), (1, 2));
    }

    #[test]
    fn test_malformed_input_source_map() {
        let options = PrinterOptions {
            source_map: true,
            input_source_map: "{not json".to_string(),
            ..PrinterOptions::default()
        };
        let err = CodeGenerator::new(&options)
            .generate(&parse(".a { color: red }"))
            .unwrap_err();
        assert!(matches!(err, CssError::CodeGen { .. }));
    }

    #[test]
    fn test_generation_does_not_mutate_input() {
        let sheet = parse(".a { color: red } .a { margin: 0 }");
        let options = minified();
        CodeGenerator::new(&options).generate(&sheet).unwrap();
        assert_eq!(sheet.rules.len(), 2);
    }
}
