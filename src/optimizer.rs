//! Minification passes run by the code generator
//!
//! The optimizer rewrites rules in place, so the generator hands it a copy
//! of the stylesheet's rules.

use crate::ast::{remove_empty_rules, visit_declarations_mut, CssRule, Declaration, StyleRule};
use crate::types::VendorPrefix;
use crate::values::{walk_mut, BlockKind, ComponentValue, Function};
use std::collections::HashMap;

pub struct Optimizer {
    optimizations_applied: Vec<String>,
    size_savings: HashMap<String, u32>,
}

impl Optimizer {
    pub fn new() -> Self {
        Self {
            optimizations_applied: Vec::new(),
            size_savings: HashMap::new(),
        }
    }

    pub fn optimize(&mut self, rules: &mut Vec<CssRule>) {
        let folded = self.fold_calc(rules);
        self.record("Constant calc() folding", folded);

        let duplicates = self.remove_duplicate_declarations(rules);
        self.record("Duplicate declaration removal", duplicates);

        let before = count_rules(rules);
        remove_empty_rules(rules);
        self.record("Empty rule removal", before - count_rules(rules));

        let merged = self.merge_adjacent_rules(rules);
        self.record("Adjacent rule merging", merged);
    }

    fn record(&mut self, name: &str, count: usize) {
        if count == 0 {
            return;
        }
        log::debug!("{}: {} changes", name, count);
        self.optimizations_applied.push(name.to_string());
        self.size_savings
            .insert(name.to_lowercase().replace(' ', "_"), count as u32);
    }

    /// Replace `calc()` expressions over a single unit with their value.
    fn fold_calc(&mut self, rules: &mut [CssRule]) -> usize {
        let mut folded = 0;
        visit_declarations_mut(rules, &mut |declarations| {
            for declaration in declarations.iter_mut() {
                walk_mut(&mut declaration.value, &mut |value| {
                    let replacement = match value {
                        ComponentValue::Function(function) if function.name.eq_ignore_ascii_case("calc") => {
                            evaluate_calc(function)
                        }
                        _ => None,
                    };
                    if let Some(replacement) = replacement {
                        *value = replacement;
                        folded += 1;
                    }
                });
            }
        });
        folded
    }

    /// Drop a declaration when the same property and value appear again
    /// later in the block. `!important` wins over a plain duplicate.
    fn remove_duplicate_declarations(&mut self, rules: &mut [CssRule]) -> usize {
        let mut removed = 0;
        visit_declarations_mut(rules, &mut |declarations| {
            let before = declarations.len();
            let mut kept: Vec<Declaration> = Vec::with_capacity(before);
            for declaration in declarations.drain(..) {
                let existing = kept
                    .iter()
                    .position(|d| d.property == declaration.property && d.value == declaration.value);
                match existing {
                    Some(index) => {
                        let important = kept[index].important || declaration.important;
                        kept.remove(index);
                        kept.push(Declaration {
                            important,
                            ..declaration
                        });
                    }
                    None => kept.push(declaration),
                }
            }
            removed += before - kept.len();
            *declarations = kept;
        });
        removed
    }

    fn merge_adjacent_rules(&mut self, rules: &mut Vec<CssRule>) -> usize {
        let mut merged = 0;
        let mut result: Vec<CssRule> = Vec::with_capacity(rules.len());

        for mut rule in rules.drain(..) {
            if let Some(children) = rule.child_rules_mut() {
                merged += self.merge_adjacent_rules(children);
            }

            if let (Some(CssRule::Style(previous)), CssRule::Style(current)) = (result.last_mut(), &rule) {
                if try_merge(previous, current) {
                    merged += 1;
                    continue;
                }
            }
            result.push(rule);
        }

        *rules = result;
        merged
    }

    pub fn get_optimization_stats(&self) -> OptimizationStats {
        OptimizationStats {
            optimizations_applied: self.optimizations_applied.clone(),
            size_savings: self.size_savings.clone(),
        }
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

fn count_rules(rules: &[CssRule]) -> usize {
    rules
        .iter()
        .map(|rule| match rule {
            CssRule::Style(style) | CssRule::Nesting(style) => 1 + count_rules(&style.rules),
            other => 1 + other.child_rules().map_or(0, |children| count_rules(children)),
        })
        .sum()
}

/// Merge `current` into `previous` when one side matches exactly.
fn try_merge(previous: &mut StyleRule, current: &StyleRule) -> bool {
    if !previous.rules.is_empty() || !current.rules.is_empty() {
        return false;
    }

    if previous.selectors == current.selectors {
        previous.declarations.extend(current.declarations.iter().cloned());
        return true;
    }

    // An unknown prefixed selector would invalidate the whole list.
    let prefix = |rule: &StyleRule| {
        rule.selectors
            .0
            .iter()
            .map(|s| s.vendor_prefix())
            .fold(VendorPrefix::NONE, |mut acc, p| {
                acc.insert(p);
                acc
            })
    };

    let same_declarations = previous.declarations.len() == current.declarations.len()
        && previous
            .declarations
            .iter()
            .zip(&current.declarations)
            .all(|(a, b)| a.property == b.property && a.value == b.value && a.important == b.important);

    if same_declarations && prefix(previous) == prefix(current) {
        for selector in &current.selectors.0 {
            if !previous.selectors.0.contains(selector) {
                previous.selectors.0.push(selector.clone());
            }
        }
        return true;
    }
    false
}

/// Evaluate a `calc()` whose operands share one unit (or have none).
///
/// The expression is evaluated a second time with every dimension doubled;
/// only results that double too are lengths of that unit.
fn evaluate_calc(function: &Function) -> Option<ComponentValue> {
    let mut unit: Option<String> = None;
    let mut expression = String::new();
    if !write_expression(&function.arguments, 1.0, &mut expression, &mut unit) {
        return None;
    }
    let value = meval::eval_str(&expression).ok()?;
    if !value.is_finite() {
        return None;
    }

    if unit.is_some() {
        let mut doubled = String::new();
        write_expression(&function.arguments, 2.0, &mut doubled, &mut unit);
        let scaled = meval::eval_str(&doubled).ok()?;
        if (scaled - 2.0 * value).abs() > 1e-9 * value.abs().max(1.0) {
            return None;
        }
    }

    Some(match unit.as_deref() {
        None => ComponentValue::Number {
            value,
            is_int: value.fract() == 0.0,
        },
        Some("%") => ComponentValue::Percentage(value),
        Some(unit) => ComponentValue::Dimension {
            value,
            unit: unit.to_string(),
        },
    })
}

fn same_unit(found: &str, unit: &mut Option<String>) -> bool {
    match unit {
        Some(existing) => existing == found,
        None => {
            *unit = Some(found.to_string());
            true
        }
    }
}

fn write_expression(values: &[ComponentValue], scale: f64, out: &mut String, unit: &mut Option<String>) -> bool {
    for value in values {
        match value {
            ComponentValue::Whitespace => out.push(' '),
            ComponentValue::Number { value, .. } => out.push_str(&value.to_string()),
            ComponentValue::Dimension { value, unit: found } => {
                if !same_unit(found, unit) {
                    return false;
                }
                out.push_str(&(value * scale).to_string());
            }
            ComponentValue::Percentage(value) => {
                if !same_unit("%", unit) {
                    return false;
                }
                out.push_str(&(value * scale).to_string());
            }
            ComponentValue::Delim(c @ ('+' | '-' | '*' | '/')) => out.push(*c),
            ComponentValue::Block(BlockKind::Paren, inner) => {
                out.push('(');
                if !write_expression(inner, scale, out, unit) {
                    return false;
                }
                out.push(')');
            }
            ComponentValue::Function(inner) if inner.name.eq_ignore_ascii_case("calc") => {
                out.push('(');
                if !write_expression(&inner.arguments, scale, out, unit) {
                    return false;
                }
                out.push(')');
            }
            _ => return false,
        }
    }
    true
}

#[derive(Debug, Clone)]
pub struct OptimizationStats {
    pub optimizations_applied: Vec<String>,
    pub size_savings: HashMap<String, u32>,
}

impl OptimizationStats {
    pub fn total_savings(&self) -> u32 {
        self.size_savings.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;
    use crate::values::{to_css, ValueFormat};
    use crate::ParserOptions;

    fn rules(source: &str) -> Vec<CssRule> {
        parse_stylesheet(source, &ParserOptions::default()).unwrap().rules
    }

    fn first_value(rules: &[CssRule]) -> String {
        match &rules[0] {
            CssRule::Style(rule) => to_css(&rule.declarations[0].value, ValueFormat::default()),
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_calc_folding() {
        let mut parsed = rules(".a { width: calc(10px + 5px * 2) }");
        Optimizer::new().optimize(&mut parsed);
        assert_eq!(first_value(&parsed), "20px");

        let mut parsed = rules(".a { width: calc((50% - 10%) / 2) }");
        Optimizer::new().optimize(&mut parsed);
        assert_eq!(first_value(&parsed), "20%");
    }

    #[test]
    fn test_mixed_unit_calc_is_kept() {
        let mut parsed = rules(".a { width: calc(100% - 10px) }");
        Optimizer::new().optimize(&mut parsed);
        assert_eq!(first_value(&parsed), "calc(100% - 10px)");
    }

    #[test]
    fn test_duplicate_declarations() {
        let mut parsed = rules(".a { color: red; margin: 0; color: red !important; color: blue }");
        let mut optimizer = Optimizer::new();
        optimizer.optimize(&mut parsed);
        match &parsed[0] {
            CssRule::Style(rule) => {
                let props: Vec<_> = rule
                    .declarations
                    .iter()
                    .map(|d| (d.property.as_str(), d.important))
                    .collect();
                assert_eq!(props, vec![("margin", false), ("color", true), ("color", false)]);
            }
            _ => panic!("Expected style rule"),
        }
        assert!(optimizer
            .get_optimization_stats()
            .optimizations_applied
            .contains(&"Duplicate declaration removal".to_string()));
    }

    #[test]
    fn test_merge_adjacent_rules() {
        let mut parsed = rules(".a { color: red } .a { margin: 0 } .b { color: red; margin: 0 } .c { padding: 0 }");
        let mut optimizer = Optimizer::new();
        optimizer.optimize(&mut parsed);
        assert_eq!(parsed.len(), 2);
        match &parsed[0] {
            CssRule::Style(rule) => assert_eq!(rule.selectors.to_css(true), ".a,.b"),
            _ => panic!("Expected style rule"),
        }
        assert_eq!(optimizer.get_optimization_stats().total_savings(), 2);
    }

    #[test]
    fn test_prefixed_selectors_are_not_merged() {
        let mut parsed = rules("::-moz-selection { color: red } ::selection { color: red }");
        Optimizer::new().optimize(&mut parsed);
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_empty_rules_removed() {
        let mut parsed = rules(".a {} @media print { .b {} } .c { color: red }");
        Optimizer::new().optimize(&mut parsed);
        assert_eq!(parsed.len(), 1);
    }
}
