//! Target-aware transform pass
//!
//! Runs once per stylesheet, in order: custom media resolution, unused
//! symbol pruning, nesting flattening, media range downleveling,
//! declaration fallbacks, prefixed selectors and keyframes, unsupported
//! feature reporting and finally CSS modules scoping.

use crate::ast::*;
use crate::compat::Feature;
use crate::css_modules::{referenced_dashed_idents, scope_stylesheet};
use crate::error::{CssError, Diagnostic, DiagnosticKind, Result};
use crate::fallbacks::add_fallbacks;
use crate::prefixes::PrefixFeature;
use crate::selector::{Component, PseudoClass, Selector, SelectorList};
use crate::targets::Targets;
use crate::types::{Location, VendorPrefix};
use crate::values::{BlockKind, ComponentValue};
use crate::TransformOptions;
use std::collections::{HashMap, HashSet};

pub fn transform_stylesheet(stylesheet: &mut Stylesheet, options: &TransformOptions) -> Result<()> {
    if stylesheet.transformed {
        return Err(CssError::transform(
            "transform",
            "Stylesheet has already been transformed",
        ));
    }
    stylesheet.transformed = true;
    let targets = &options.targets;

    if stylesheet.custom_media {
        log::debug!("Phase 1: Resolving custom media queries");
        resolve_custom_media(&mut stylesheet.rules)?;
    }

    if !options.unused_symbols.is_empty() {
        log::debug!("Phase 2: Pruning {} unused symbols", options.unused_symbols.len());
        prune_unused(&mut stylesheet.rules, &options.unused_symbols);
    }

    if !Feature::Nesting.is_compatible(targets) {
        log::debug!("Phase 3: Flattening nested rules");
        let rules = std::mem::take(&mut stylesheet.rules);
        stylesheet.rules = flatten_rules(rules);
    }

    if !Feature::MediaRangeSyntax.is_compatible(targets) {
        log::debug!("Phase 4: Downleveling media range syntax");
        downlevel_media_ranges(&mut stylesheet.rules);
    }

    if !targets.is_empty() {
        log::debug!("Phase 5: Adding declaration fallbacks for {}", targets);
        let mut added = 0;
        visit_style_rules_mut(&mut stylesheet.rules, &mut |rule| {
            added += add_fallbacks(&mut rule.declarations, targets);
        });
        visit_keyframes_mut(&mut stylesheet.rules, &mut |keyframes| {
            for keyframe in keyframes.keyframes.iter_mut() {
                added += add_fallbacks(&mut keyframe.declarations, targets);
            }
        });
        log::trace!("Added {} fallback declarations", added);

        log::debug!("Phase 6: Adding prefixed selectors and keyframes");
        visit_style_rules_mut(&mut stylesheet.rules, &mut |rule| add_prefixed_selectors(rule, targets));
        add_prefixed_keyframes(&mut stylesheet.rules, targets);
    }

    log::debug!("Phase 7: Checking unsupported features");
    let warnings = unsupported_features(&stylesheet.rules, targets);
    if let Some(warning) = warnings.first() {
        if options.fail_on_unsupported {
            return Err(CssError::transform(warning_feature(&warning.message), warning.message.clone()));
        }
    }
    for warning in &warnings {
        log::warn!("{}", warning);
    }
    stylesheet.diagnostics.extend(warnings);

    if stylesheet.css_modules.is_some() {
        log::debug!("Phase 8: Scoping CSS module names");
        scope_stylesheet(stylesheet, &options.project_root)?;
    }

    remove_empty_rules(&mut stylesheet.rules);
    Ok(())
}

fn visit_keyframes_mut(rules: &mut [CssRule], f: &mut dyn FnMut(&mut KeyframesRule)) {
    for rule in rules.iter_mut() {
        match rule {
            CssRule::Keyframes(keyframes) => f(keyframes),
            other => {
                if let Some(children) = other.child_rules_mut() {
                    visit_keyframes_mut(children, f);
                }
            }
        }
    }
}

// Custom media

fn resolve_custom_media(rules: &mut Vec<CssRule>) -> Result<()> {
    let mut definitions = HashMap::new();
    rules.retain(|rule| match rule {
        CssRule::CustomMedia { name, query, .. } => {
            definitions.insert(name.clone(), query.clone());
            false
        }
        _ => true,
    });

    let mut result = Ok(());
    visit_media_preludes(rules, &mut |prelude| {
        if result.is_ok() {
            result = expand_custom_media(prelude, &definitions, &mut Vec::new());
        }
    });
    result
}

fn visit_media_preludes(rules: &mut [CssRule], f: &mut dyn FnMut(&mut Vec<ComponentValue>)) {
    for rule in rules.iter_mut() {
        match rule {
            CssRule::Media(media) => {
                f(&mut media.prelude);
                visit_media_preludes(&mut media.rules, f);
            }
            CssRule::Import(import) => f(&mut import.media),
            CssRule::Style(style) | CssRule::Nesting(style) => visit_media_preludes(&mut style.rules, f),
            other => {
                if let Some(children) = other.child_rules_mut() {
                    visit_media_preludes(children, f);
                }
            }
        }
    }
}

fn custom_media_reference(value: &ComponentValue) -> Option<&str> {
    match value {
        ComponentValue::Block(BlockKind::Paren, inner) => match inner.as_slice() {
            [ComponentValue::DashedIdent(reference)] => Some(&reference.ident),
            _ => None,
        },
        _ => None,
    }
}

fn expand_custom_media(
    query: &mut Vec<ComponentValue>,
    definitions: &HashMap<String, Vec<ComponentValue>>,
    stack: &mut Vec<String>,
) -> Result<()> {
    let mut expanded = Vec::with_capacity(query.len());
    for value in query.drain(..) {
        let name = match custom_media_reference(&value) {
            Some(name) => name.to_string(),
            None => {
                expanded.push(value);
                continue;
            }
        };

        if stack.contains(&name) {
            return Err(CssError::transform(
                "custom-media",
                format!("Circular @custom-media reference to {}", name),
            ));
        }
        let mut definition = definitions.get(&name).cloned().ok_or_else(|| {
            CssError::transform("custom-media", format!("Undefined custom media query {}", name))
        })?;

        stack.push(name);
        expand_custom_media(&mut definition, definitions, stack)?;
        stack.pop();
        expanded.extend(definition);
    }
    *query = expanded;
    Ok(())
}

// Unused symbol pruning

fn selector_uses(selector: &Selector, unused: &HashSet<String>) -> bool {
    selector.0.iter().any(|component| match component {
        Component::Class(name) | Component::Id(name) => unused.contains(name),
        Component::PseudoClass(PseudoClass::Local(inner))
        | Component::PseudoClass(PseudoClass::Global(inner)) => selector_uses(inner, unused),
        _ => false,
    })
}

fn prune_unused(rules: &mut Vec<CssRule>, unused: &HashSet<String>) {
    let mut referenced_vars = HashSet::new();
    visit_style_rules(rules, &mut |rule| {
        for declaration in &rule.declarations {
            referenced_dashed_idents(&declaration.value, &mut referenced_vars);
        }
    });

    prune_rules(rules, unused, &referenced_vars);
    remove_empty_rules(rules);
}

fn prune_rules(rules: &mut Vec<CssRule>, unused: &HashSet<String>, referenced_vars: &HashSet<String>) {
    rules.retain_mut(|rule| match rule {
        CssRule::Style(style) | CssRule::Nesting(style) => {
            let before = style.selectors.0.len();
            style.selectors.0.retain(|selector| !selector_uses(selector, unused));
            if style.selectors.0.is_empty() {
                log::trace!("Removing rule at {} with only unused selectors", style.loc);
                return false;
            }
            if style.selectors.0.len() != before {
                log::trace!("Dropped {} unused selectors at {}", before - style.selectors.0.len(), style.loc);
            }
            style.declarations.retain(|declaration| {
                !(declaration.is_custom()
                    && unused.contains(&declaration.property)
                    && !referenced_vars.contains(&declaration.property))
            });
            prune_rules(&mut style.rules, unused, referenced_vars);
            true
        }
        CssRule::Keyframes(keyframes) => !unused.contains(&keyframes.name),
        other => {
            if let Some(children) = other.child_rules_mut() {
                prune_rules(children, unused, referenced_vars);
            }
            true
        }
    });
}

// Nesting

fn nest_selectors(children: &SelectorList, parents: &SelectorList) -> SelectorList {
    let mut selectors = Vec::with_capacity(children.0.len() * parents.0.len());
    for child in &children.0 {
        for parent in &parents.0 {
            let nested = child.nest_within(parent);
            if !selectors.contains(&nested) {
                selectors.push(nested);
            }
        }
    }
    SelectorList(selectors)
}

fn flatten_rules(rules: Vec<CssRule>) -> Vec<CssRule> {
    let mut out = Vec::with_capacity(rules.len());
    for mut rule in rules {
        match rule {
            CssRule::Style(style) => flatten_style(style, &mut out),
            _ => {
                if let Some(children) = rule.child_rules_mut() {
                    let flattened = flatten_rules(std::mem::take(children));
                    *children = flattened;
                }
                out.push(rule);
            }
        }
    }
    out
}

fn flatten_style(mut rule: StyleRule, out: &mut Vec<CssRule>) {
    let children = std::mem::take(&mut rule.rules);
    let parents = rule.selectors.clone();
    if !rule.declarations.is_empty() || children.is_empty() {
        out.push(CssRule::Style(rule));
    }
    flatten_children(children, &parents, out);
}

fn flatten_children(children: Vec<CssRule>, parents: &SelectorList, out: &mut Vec<CssRule>) {
    for child in children {
        match child {
            CssRule::Style(mut style) | CssRule::Nesting(mut style) => {
                style.selectors = nest_selectors(&style.selectors, parents);
                flatten_style(style, out);
            }
            mut other => {
                if let Some(rules) = other.child_rules_mut() {
                    let mut flattened = Vec::new();
                    flatten_children(std::mem::take(rules), parents, &mut flattened);
                    *rules = flattened;
                }
                out.push(other);
            }
        }
    }
}

// Media ranges

#[derive(Debug, Clone, Copy, PartialEq)]
enum RangeOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl RangeOp {
    /// The operator with its operands swapped.
    fn flip(self) -> Self {
        match self {
            RangeOp::Lt => RangeOp::Gt,
            RangeOp::Le => RangeOp::Ge,
            RangeOp::Gt => RangeOp::Lt,
            RangeOp::Ge => RangeOp::Le,
            RangeOp::Eq => RangeOp::Eq,
        }
    }
}

enum RangeToken<'a> {
    Operand(&'a ComponentValue),
    Op(RangeOp),
}

fn range_tokens(values: &[ComponentValue]) -> Option<Vec<RangeToken<'_>>> {
    let mut tokens = Vec::new();
    let mut iter = values
        .iter()
        .filter(|v| !matches!(v, ComponentValue::Whitespace))
        .peekable();

    while let Some(value) = iter.next() {
        let token = match value {
            ComponentValue::Delim(c @ ('<' | '>')) => {
                let inclusive = matches!(iter.peek(), Some(ComponentValue::Delim('=')));
                if inclusive {
                    iter.next();
                }
                RangeToken::Op(match (*c, inclusive) {
                    ('<', false) => RangeOp::Lt,
                    ('<', true) => RangeOp::Le,
                    ('>', false) => RangeOp::Gt,
                    _ => RangeOp::Ge,
                })
            }
            ComponentValue::Delim('=') => RangeToken::Op(RangeOp::Eq),
            ComponentValue::Ident(_)
            | ComponentValue::Number { .. }
            | ComponentValue::Dimension { .. }
            | ComponentValue::Percentage(_) => RangeToken::Operand(value),
            _ => return None,
        };
        tokens.push(token);
    }
    Some(tokens)
}

/// `(name: value)` with `min-`/`max-` prefixes for the comparison.
fn plain_feature(name: &str, op: RangeOp, value: &ComponentValue) -> Option<ComponentValue> {
    const STEP: f64 = 0.001;
    let adjust = |value: &ComponentValue, delta: f64| match value {
        ComponentValue::Number { value, .. } => Some(ComponentValue::Number {
            value: value + delta,
            is_int: false,
        }),
        ComponentValue::Dimension { value, unit } => Some(ComponentValue::Dimension {
            value: value + delta,
            unit: unit.clone(),
        }),
        ComponentValue::Percentage(value) => Some(ComponentValue::Percentage(value + delta)),
        _ => None,
    };

    let (feature, value) = match op {
        RangeOp::Ge => (format!("min-{}", name), value.clone()),
        RangeOp::Le => (format!("max-{}", name), value.clone()),
        RangeOp::Gt => (format!("min-{}", name), adjust(value, STEP)?),
        RangeOp::Lt => (format!("max-{}", name), adjust(value, -STEP)?),
        RangeOp::Eq => (name.to_string(), value.clone()),
    };

    Some(ComponentValue::Block(
        BlockKind::Paren,
        vec![
            ComponentValue::Ident(feature),
            ComponentValue::Delim(':'),
            ComponentValue::Whitespace,
            value,
        ],
    ))
}

/// Rewrite a parenthesised range feature, or `None` to keep it.
fn downlevel_range(inner: &[ComponentValue]) -> Option<Vec<ComponentValue>> {
    let tokens = range_tokens(inner)?;
    let ident = |token: &RangeToken| match token {
        RangeToken::Operand(ComponentValue::Ident(name)) => Some(name.to_ascii_lowercase()),
        _ => None,
    };

    match tokens.as_slice() {
        [name, RangeToken::Op(op), RangeToken::Operand(value)] if ident(name).is_some() => {
            Some(vec![plain_feature(&ident(name)?, *op, value)?])
        }
        [RangeToken::Operand(value), RangeToken::Op(op), name] if ident(name).is_some() => {
            Some(vec![plain_feature(&ident(name)?, op.flip(), value)?])
        }
        [RangeToken::Operand(low), RangeToken::Op(op1), name, RangeToken::Op(op2), RangeToken::Operand(high)]
            if ident(name).is_some() =>
        {
            let name = ident(name)?;
            Some(vec![
                plain_feature(&name, op1.flip(), low)?,
                ComponentValue::Whitespace,
                ComponentValue::Ident("and".to_string()),
                ComponentValue::Whitespace,
                plain_feature(&name, *op2, high)?,
            ])
        }
        _ => None,
    }
}

fn downlevel_query(query: &mut Vec<ComponentValue>) {
    let mut rewritten = Vec::with_capacity(query.len());
    for mut value in query.drain(..) {
        let replacement = match &value {
            ComponentValue::Block(BlockKind::Paren, inner) => downlevel_range(inner),
            _ => None,
        };
        match replacement {
            Some(replacement) => rewritten.extend(replacement),
            None => {
                if let ComponentValue::Block(BlockKind::Paren, inner) = &mut value {
                    downlevel_query(inner);
                }
                rewritten.push(value);
            }
        }
    }
    *query = rewritten;
}

fn downlevel_media_ranges(rules: &mut [CssRule]) {
    visit_media_preludes(rules, &mut |prelude| downlevel_query(prelude));
}

// Prefixes

fn add_prefixed_selectors(rule: &mut StyleRule, targets: &Targets) {
    let mut selectors = Vec::with_capacity(rule.selectors.0.len());
    for selector in rule.selectors.0.drain(..) {
        for variant in selector.vendor_variants(targets) {
            if !selectors.contains(&variant) {
                selectors.push(variant);
            }
        }
        selectors.push(selector);
    }
    rule.selectors.0 = selectors;
}

fn add_prefixed_keyframes(rules: &mut Vec<CssRule>, targets: &Targets) {
    if !PrefixFeature::Keyframes.prefixes(targets).contains(VendorPrefix::WEBKIT) {
        return;
    }

    let existing: HashSet<String> = rules
        .iter()
        .filter_map(|rule| match rule {
            CssRule::Keyframes(k) if k.prefix == VendorPrefix::WEBKIT => Some(k.name.clone()),
            _ => None,
        })
        .collect();

    let mut result = Vec::with_capacity(rules.len());
    for mut rule in rules.drain(..) {
        if let CssRule::Keyframes(keyframes) = &rule {
            if keyframes.prefix.is_empty() && !existing.contains(&keyframes.name) {
                result.push(CssRule::Keyframes(KeyframesRule {
                    prefix: VendorPrefix::WEBKIT,
                    ..keyframes.clone()
                }));
            }
        }
        if let Some(children) = rule.child_rules_mut() {
            add_prefixed_keyframes(children, targets);
        }
        result.push(rule);
    }
    *rules = result;
}

// Unsupported features

fn unsupported_features(rules: &[CssRule], targets: &Targets) -> Vec<Diagnostic> {
    let has = !Feature::HasSelector.is_compatible(targets);
    let is = !Feature::IsSelector.is_compatible(targets);
    let container = !Feature::ContainerQueries.is_compatible(targets);
    let mut warnings = Vec::new();
    if !(has || is || container) {
        return warnings;
    }

    let mut report = |feature: Feature, loc: Location| {
        warnings.push(Diagnostic::new(
            DiagnosticKind::UnsupportedFeature,
            format!("{} is not supported by the configured targets", feature),
            loc,
        ));
    };

    fn walk_rules(rules: &[CssRule], check: &mut dyn FnMut(&CssRule)) {
        for rule in rules {
            check(rule);
            match rule {
                CssRule::Style(style) | CssRule::Nesting(style) => walk_rules(&style.rules, check),
                other => {
                    if let Some(children) = other.child_rules() {
                        walk_rules(children, check);
                    }
                }
            }
        }
    }

    walk_rules(rules, &mut |rule| match rule {
        CssRule::Style(style) | CssRule::Nesting(style) => {
            let mut found: Vec<Feature> = Vec::new();
            for selector in &style.selectors.0 {
                selector.walk(&mut |component| {
                    if let Component::PseudoClass(PseudoClass::Selectors { name, .. }) = component {
                        let feature = match name.as_str() {
                            "has" if has => Feature::HasSelector,
                            "is" | "where" if is => Feature::IsSelector,
                            _ => return,
                        };
                        if !found.contains(&feature) {
                            found.push(feature);
                        }
                    }
                });
            }
            for feature in found {
                report(feature, style.loc);
            }
        }
        CssRule::Container(rule) if container => report(Feature::ContainerQueries, rule.loc),
        _ => {}
    });

    warnings
}

/// The feature name at the start of an unsupported-feature message.
fn warning_feature(message: &str) -> &str {
    message.split(" is not supported").next().unwrap_or(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;
    use crate::targets::{Browser, Version};
    use crate::ParserOptions;

    fn parse(source: &str) -> Stylesheet {
        let options = ParserOptions {
            filename: "test.css".to_string(),
            nesting: true,
            custom_media: true,
            ..ParserOptions::default()
        };
        parse_stylesheet(source, &options).unwrap()
    }

    fn old_targets() -> Targets {
        let mut targets = Targets::default();
        targets.set(Browser::Chrome, Some(Version::new(80, 0, 0)));
        targets.set(Browser::Safari, Some(Version::new(12, 0, 0)));
        targets
    }

    fn style_selectors(rules: &[CssRule]) -> Vec<String> {
        let mut selectors = Vec::new();
        visit_style_rules(rules, &mut |rule| selectors.push(rule.selectors.to_css(false)));
        selectors
    }

    #[test]
    fn test_second_transform_fails() {
        let mut sheet = parse(".a { color: red }");
        let options = TransformOptions::default();
        transform_stylesheet(&mut sheet, &options).unwrap();
        let err = transform_stylesheet(&mut sheet, &options).unwrap_err();
        assert!(matches!(err, CssError::Transform { .. }));
    }

    #[test]
    fn test_prune_unused_symbols() {
        let mut sheet = parse(
            ".bar { color: red } .foo, .bar .x { color: blue } @media print { #bar { color: green } } \
             @keyframes bar { to { opacity: 0 } } .y { --bar: 1; --keep: 2 }",
        );
        let options = TransformOptions {
            unused_symbols: ["bar".to_string(), "--bar".to_string()].into_iter().collect(),
            ..TransformOptions::default()
        };
        transform_stylesheet(&mut sheet, &options).unwrap();

        assert_eq!(style_selectors(&sheet.rules), vec![".foo", ".y"]);
        assert_eq!(sheet.rules.len(), 2);
        match &sheet.rules[1] {
            CssRule::Style(rule) => {
                assert_eq!(rule.declarations.len(), 1);
                assert_eq!(rule.declarations[0].property, "--keep");
            }
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_custom_media() {
        let mut sheet = parse(
            "@custom-media --small (max-width: 30em);\n\
             @custom-media --tiny (--small);\n\
             @media (--tiny) { .a { color: red } }",
        );
        transform_stylesheet(&mut sheet, &TransformOptions::default()).unwrap();
        assert_eq!(sheet.rules.len(), 1);
        match &sheet.rules[0] {
            CssRule::Media(media) => assert_eq!(
                crate::values::to_css(&media.prelude, Default::default()),
                "(max-width: 30em)"
            ),
            _ => panic!("Expected @media"),
        }
    }

    #[test]
    fn test_custom_media_errors() {
        let mut sheet = parse("@media (--missing) { .a { color: red } }");
        assert!(transform_stylesheet(&mut sheet, &TransformOptions::default()).is_err());

        let mut sheet = parse(
            "@custom-media --a (--b);\n@custom-media --b (--a);\n@media (--a) { .a { color: red } }",
        );
        let err = transform_stylesheet(&mut sheet, &TransformOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Circular"));
    }

    #[test]
    fn test_flatten_nesting() {
        let mut sheet = parse(
            ".a, .b { color: red; &:hover { color: blue } .c { color: green } \
             @media (min-width: 1px) { color: black } }",
        );
        let options = TransformOptions {
            targets: old_targets(),
            ..TransformOptions::default()
        };
        transform_stylesheet(&mut sheet, &options).unwrap();

        assert_eq!(
            style_selectors(&sheet.rules),
            vec![".a, .b", ".a:hover, .b:hover", ".a .c, .b .c", ".a, .b"]
        );
        assert!(matches!(sheet.rules[3], CssRule::Media(_)));
    }

    #[test]
    fn test_nesting_kept_for_modern_targets() {
        let mut sheet = parse(".a { .b { color: red } }");
        transform_stylesheet(&mut sheet, &TransformOptions::default()).unwrap();
        match &sheet.rules[0] {
            CssRule::Style(rule) => assert_eq!(rule.rules.len(), 1),
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_media_range_downleveling() {
        let mut sheet = parse(
            "@media (width >= 600px) { .a { color: red } }\n\
             @media (400px < width <= 800px) { .b { color: red } }\n\
             @media (500px > height) { .c { color: red } }",
        );
        let options = TransformOptions {
            targets: old_targets(),
            ..TransformOptions::default()
        };
        transform_stylesheet(&mut sheet, &options).unwrap();

        let preludes: Vec<String> = sheet
            .rules
            .iter()
            .filter_map(|rule| match rule {
                CssRule::Media(media) => Some(crate::values::to_css(&media.prelude, Default::default())),
                _ => None,
            })
            .collect();
        assert_eq!(
            preludes,
            vec![
                "(min-width: 600px)",
                "(min-width: 400.001px) and (max-width: 800px)",
                "(max-height: 499.999px)",
            ]
        );
    }

    #[test]
    fn test_prefixed_selectors_and_keyframes() {
        let mut sheet = parse("input::placeholder { color: gray } @keyframes fade { to { opacity: 0 } }");
        let mut targets = Targets::default();
        targets.set(Browser::Safari, Some(Version::new(8, 0, 0)));
        let options = TransformOptions {
            targets,
            ..TransformOptions::default()
        };
        transform_stylesheet(&mut sheet, &options).unwrap();

        assert_eq!(
            style_selectors(&sheet.rules),
            vec!["input::-webkit-input-placeholder, input::placeholder"]
        );
        assert!(matches!(
            &sheet.rules[1],
            CssRule::Keyframes(k) if k.prefix == VendorPrefix::WEBKIT
        ));
        assert!(matches!(&sheet.rules[2], CssRule::Keyframes(k) if k.prefix.is_empty()));
    }

    #[test]
    fn test_unsupported_features() {
        let source = ".a:has(.b) { color: red } @container (min-width: 1px) { .c { color: red } }";

        let mut sheet = parse(source);
        let options = TransformOptions {
            targets: old_targets(),
            ..TransformOptions::default()
        };
        transform_stylesheet(&mut sheet, &options).unwrap();
        let kinds: Vec<_> = sheet.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::UnsupportedFeature; 2]);

        let mut sheet = parse(source);
        let options = TransformOptions {
            targets: old_targets(),
            fail_on_unsupported: true,
            ..TransformOptions::default()
        };
        match transform_stylesheet(&mut sheet, &options) {
            Err(CssError::Transform { feature, .. }) => assert_eq!(feature, ":has()"),
            other => panic!("Expected transform error, got {:?}", other),
        }
    }
}
