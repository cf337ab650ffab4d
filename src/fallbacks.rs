//! Declaration fallbacks for older targets
//!
//! Each declaration may gain duplicates placed before it: vendor-prefixed
//! property names, vendor-prefixed values and a chain of colors in spaces
//! the targets understand. The original always stays last so capable
//! engines use it.

use crate::ast::Declaration;
use crate::color::{CssColor, LabColor};
use crate::compat::Feature;
use crate::prefixes::PrefixFeature;
use crate::targets::Targets;
use crate::types::VendorPrefix;
use crate::values::{walk, walk_mut, ComponentValue};
use std::collections::HashSet;

/// Add fallbacks to a declaration block, returning how many were added.
pub fn add_fallbacks(declarations: &mut Vec<Declaration>, targets: &Targets) -> usize {
    if targets.is_empty() {
        return 0;
    }

    let present: HashSet<String> = declarations.iter().map(|d| d.property.clone()).collect();
    let mut result = Vec::with_capacity(declarations.len());
    let mut added = 0;

    for declaration in declarations.drain(..) {
        if declaration.is_custom() {
            result.push(declaration);
            continue;
        }

        let mut group = prefixed_properties(&declaration, targets, &present);
        group.extend(prefixed_values(&declaration, targets));
        group.extend(color_fallbacks(&declaration, targets));

        added += group.len();
        result.extend(group);
        result.push(declaration);
    }

    *declarations = result;
    added
}

fn prefixed_properties(
    declaration: &Declaration,
    targets: &Targets,
    present: &HashSet<String>,
) -> Vec<Declaration> {
    let (prefix, unprefixed) = VendorPrefix::strip(&declaration.property);
    if !prefix.is_empty() {
        return Vec::new();
    }

    let prefixes = match PrefixFeature::for_property(unprefixed) {
        Some(feature) => feature.prefixes(targets),
        None if unprefixed == "background-clip" && is_single_ident(&declaration.value, "text") => {
            PrefixFeature::BackgroundClipText.prefixes(targets)
        }
        None => return Vec::new(),
    };

    prefixes
        .iter()
        .map(|prefix| format!("{}{}", prefix.as_str(), unprefixed))
        .filter(|name| !present.contains(name))
        .map(|property| Declaration {
            property,
            ..declaration.clone()
        })
        .collect()
}

fn is_single_ident(values: &[ComponentValue], ident: &str) -> bool {
    matches!(values, [value] if value.is_ident(ident))
}

/// Keywords and functions that some targets only know prefixed.
fn value_feature(property: &str, value: &ComponentValue) -> Option<PrefixFeature> {
    match value {
        ComponentValue::Ident(ident) => {
            let ident = ident.to_ascii_lowercase();
            match ident.as_str() {
                "sticky" if property == "position" => Some(PrefixFeature::Sticky),
                "fit-content" if is_sizing_property(property) => Some(PrefixFeature::FitContent),
                "min-content" | "max-content" if is_sizing_property(property) => {
                    Some(PrefixFeature::IntrinsicSize)
                }
                _ => None,
            }
        }
        ComponentValue::Function(function) if function.name.eq_ignore_ascii_case("image-set") => {
            Some(PrefixFeature::ImageSet)
        }
        _ => None,
    }
}

fn is_sizing_property(property: &str) -> bool {
    matches!(
        property,
        "width"
            | "height"
            | "min-width"
            | "min-height"
            | "max-width"
            | "max-height"
            | "inline-size"
            | "block-size"
            | "min-inline-size"
            | "min-block-size"
            | "max-inline-size"
            | "max-block-size"
            | "flex-basis"
    )
}

fn prefixed_values(declaration: &Declaration, targets: &Targets) -> Vec<Declaration> {
    let property = declaration.property.as_str();
    let mut needed = VendorPrefix::NONE;
    walk(&declaration.value, &mut |value| {
        if let Some(feature) = value_feature(property, value) {
            needed.insert(feature.prefixes(targets));
        }
    });

    needed
        .iter()
        .map(|prefix| {
            let mut fallback = declaration.clone();
            walk_mut(&mut fallback.value, &mut |value| {
                let feature = match value_feature(property, value) {
                    Some(feature) => feature,
                    None => return,
                };
                if !feature.prefixes(targets).contains(prefix) {
                    return;
                }
                match value {
                    ComponentValue::Ident(ident) => *ident = format!("{}{}", prefix.as_str(), ident),
                    ComponentValue::Function(function) => {
                        function.name = format!("{}{}", prefix.as_str(), function.name)
                    }
                    _ => {}
                }
            });
            fallback
        })
        .collect()
}

fn is_unsupported(color: &CssColor, targets: &Targets) -> bool {
    color
        .required_feature()
        .map_or(false, |feature| !feature.is_compatible(targets))
}

fn map_colors(
    values: &[ComponentValue],
    targets: &Targets,
    convert: fn(&CssColor) -> Option<CssColor>,
) -> Vec<ComponentValue> {
    let mut mapped = values.to_vec();
    walk_mut(&mut mapped, &mut |value| {
        if let ComponentValue::Color(color) = value {
            if is_unsupported(color, targets) {
                if let Some(converted) = convert(color) {
                    *color = converted;
                }
            }
        }
    });
    mapped
}

/// sRGB, then display-p3 and lab where the targets support them.
fn color_fallbacks(declaration: &Declaration, targets: &Targets) -> Vec<Declaration> {
    let mut unsupported = Vec::new();
    walk(&declaration.value, &mut |value| {
        if let ComponentValue::Color(color) = value {
            if is_unsupported(color, targets) {
                unsupported.push(*color);
            }
        }
    });
    if unsupported.is_empty() {
        return Vec::new();
    }

    let mut conversions: Vec<fn(&CssColor) -> Option<CssColor>> = vec![CssColor::to_rgb];
    if Feature::P3Colors.is_compatible(targets) {
        conversions.push(CssColor::to_p3);
    }
    let has_ok_colors = unsupported.iter().any(|color| {
        matches!(
            color,
            CssColor::Lab(LabColor::Oklab { .. }) | CssColor::Lab(LabColor::Oklch { .. })
        )
    });
    if has_ok_colors && Feature::LabColors.is_compatible(targets) {
        conversions.push(CssColor::to_lab);
    }

    let mut fallbacks: Vec<Declaration> = Vec::new();
    for convert in conversions {
        let value = map_colors(&declaration.value, targets, convert);
        let duplicate = value == declaration.value || fallbacks.iter().any(|f| f.value == value);
        if !duplicate {
            fallbacks.push(Declaration {
                value,
                ..declaration.clone()
            });
        }
    }
    fallbacks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::targets::{Browser, Version};
    use crate::types::Location;
    use crate::values::{parse_value, to_css, ValueFormat};

    fn declaration(property: &str, value: &str) -> Declaration {
        let tokens = tokenize(value);
        let value = parse_value(&tokens, "test.css", property).unwrap();
        Declaration::new(property, value, Location::default())
    }

    fn targets(entries: &[(Browser, u8, u8)]) -> Targets {
        let mut targets = Targets::default();
        for (browser, major, minor) in entries {
            targets.set(*browser, Some(Version::new(*major, *minor, 0)));
        }
        targets
    }

    fn render(declarations: &[Declaration]) -> Vec<String> {
        declarations
            .iter()
            .map(|d| format!("{}: {}", d.property, to_css(&d.value, ValueFormat::default())))
            .collect()
    }

    #[test]
    fn test_no_targets_no_fallbacks() {
        let mut declarations = vec![declaration("color", "lch(50% 40 30)")];
        assert_eq!(add_fallbacks(&mut declarations, &Targets::default()), 0);
        assert_eq!(declarations.len(), 1);
    }

    #[test]
    fn test_lch_color_chain() {
        let mut declarations = vec![declaration("color", "lch(50.998% 135.363 338)")];
        add_fallbacks(&mut declarations, &targets(&[(Browser::Chrome, 90, 0)]));
        assert_eq!(
            render(&declarations),
            vec!["color: #f000c0", "color: lch(50.998% 135.363 338)"]
        );
    }

    #[test]
    fn test_p3_step_when_supported() {
        let mut declarations = vec![declaration("color", "lch(50.998% 135.363 338)")];
        add_fallbacks(&mut declarations, &targets(&[(Browser::Safari, 14, 0)]));
        assert_eq!(declarations.len(), 3);
        assert!(render(&declarations)[1].starts_with("color: color(display-p3 "));
    }

    #[test]
    fn test_oklab_gets_lab_step() {
        let mut declarations = vec![declaration("color", "oklch(60% 0.1 200)")];
        add_fallbacks(&mut declarations, &targets(&[(Browser::Safari, 15, 0)]));
        let rendered = render(&declarations);
        assert_eq!(rendered.len(), 4);
        assert!(rendered[2].starts_with("color: lab("));
        assert_eq!(rendered[3], "color: oklch(60% 0.1 200)");
    }

    #[test]
    fn test_prefixed_properties() {
        let mut declarations = vec![declaration("user-select", "none"), declaration("color", "red")];
        add_fallbacks(&mut declarations, &targets(&[(Browser::Safari, 15, 0), (Browser::Firefox, 60, 0)]));
        assert_eq!(
            render(&declarations),
            vec![
                "-webkit-user-select: none",
                "-moz-user-select: none",
                "user-select: none",
                "color: red"
            ]
        );
    }

    #[test]
    fn test_existing_prefixed_property_is_not_duplicated() {
        let mut declarations = vec![
            declaration("-webkit-user-select", "none"),
            declaration("user-select", "none"),
        ];
        add_fallbacks(&mut declarations, &targets(&[(Browser::Safari, 15, 0)]));
        assert_eq!(declarations.len(), 2);
    }

    #[test]
    fn test_prefixed_values() {
        let mut declarations = vec![declaration("position", "sticky")];
        add_fallbacks(&mut declarations, &targets(&[(Browser::Safari, 12, 0)]));
        assert_eq!(render(&declarations), vec!["position: -webkit-sticky", "position: sticky"]);

        let mut declarations = vec![declaration("background-clip", "text")];
        add_fallbacks(&mut declarations, &targets(&[(Browser::Chrome, 100, 0)]));
        assert_eq!(
            render(&declarations),
            vec!["-webkit-background-clip: text", "background-clip: text"]
        );
    }

    #[test]
    fn test_custom_properties_are_untouched() {
        let mut declarations = vec![declaration("--brand", "lch(50% 40 30)")];
        add_fallbacks(&mut declarations, &targets(&[(Browser::Chrome, 90, 0)]));
        assert_eq!(declarations.len(), 1);
    }
}
