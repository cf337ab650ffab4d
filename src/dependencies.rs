//! Dependency analysis for bundlers
//!
//! `@import` rules are removed from the output and every `url()` is replaced
//! by a placeholder. Both are reported so the caller can resolve them and
//! substitute the final URLs.

use crate::ast::{visit_declarations_mut, CssRule};
use crate::css_modules::short_hash;
use crate::types::Location;
use crate::values::{to_css, walk_mut, ComponentValue, ValueFormat};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Dependency {
    Import {
        url: String,
        placeholder: String,
        supports: Option<String>,
        media: Option<String>,
        loc: Location,
    },
    Url {
        url: String,
        placeholder: String,
        loc: Location,
    },
}

impl Dependency {
    pub fn url(&self) -> &str {
        match self {
            Dependency::Import { url, .. } | Dependency::Url { url, .. } => url,
        }
    }

    pub fn placeholder(&self) -> &str {
        match self {
            Dependency::Import { placeholder, .. } | Dependency::Url { placeholder, .. } => placeholder,
        }
    }
}

fn placeholder(filename: &str, url: &str) -> String {
    short_hash(format!("{}{}", filename, url).as_bytes())
}

/// Inline data and same-document fragments are not dependencies.
fn is_dependency(url: &str) -> bool {
    !(url.is_empty() || url.starts_with('#') || url.to_ascii_lowercase().starts_with("data:"))
}

/// Remove `@import`s and replace `url()`s, returning what was found in
/// source order (imports first, as they must lead the file).
pub fn analyze_dependencies(rules: &mut Vec<CssRule>, filename: &str) -> Vec<Dependency> {
    let mut dependencies = Vec::new();
    let format = ValueFormat::default();

    rules.retain(|rule| match rule {
        CssRule::Import(import) => {
            dependencies.push(Dependency::Import {
                url: import.url.clone(),
                placeholder: placeholder(filename, &import.url),
                supports: import.supports.as_ref().map(|condition| to_css(condition, format)),
                media: if import.media.is_empty() {
                    None
                } else {
                    Some(to_css(&import.media, format))
                },
                loc: import.loc,
            });
            false
        }
        _ => true,
    });

    visit_declarations_mut(rules, &mut |declarations| {
        for declaration in declarations.iter_mut() {
            walk_mut(&mut declaration.value, &mut |value| {
                if let ComponentValue::Url(url) = value {
                    if !is_dependency(&url.url) {
                        return;
                    }
                    let replacement = placeholder(filename, &url.url);
                    dependencies.push(Dependency::Url {
                        url: std::mem::replace(&mut url.url, replacement.clone()),
                        placeholder: replacement,
                        loc: url.loc,
                    });
                }
            });
        }
    });

    log::debug!("Found {} dependencies in {}", dependencies.len(), filename);
    dependencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;
    use crate::ParserOptions;

    #[test]
    fn test_imports_are_removed_and_reported() {
        let source = "@import \"base.css\" supports(display: grid) screen;\n.a { color: red }";
        let mut sheet = parse_stylesheet(source, &ParserOptions::default()).unwrap();
        let dependencies = analyze_dependencies(&mut sheet.rules, "app.css");

        assert_eq!(sheet.rules.len(), 1);
        match &dependencies[0] {
            Dependency::Import { url, supports, media, placeholder, .. } => {
                assert_eq!(url, "base.css");
                assert_eq!(supports.as_deref(), Some("display: grid"));
                assert_eq!(media.as_deref(), Some("screen"));
                assert_eq!(placeholder.len(), 8);
            }
            other => panic!("Expected import dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_urls_are_replaced_with_placeholders() {
        let source = ".a { background: url(img.png), url(\"data:image/png;base64,AAAA\") }\n\
                      @font-face { src: url(font.woff2) }";
        let mut sheet = parse_stylesheet(source, &ParserOptions::default()).unwrap();
        let dependencies = analyze_dependencies(&mut sheet.rules, "app.css");

        let urls: Vec<_> = dependencies.iter().map(Dependency::url).collect();
        assert_eq!(urls, vec!["img.png", "font.woff2"]);

        match &sheet.rules[0] {
            CssRule::Style(rule) => {
                let printed = to_css(&rule.declarations[0].value, ValueFormat::default());
                assert!(printed.starts_with(&format!("url({})", dependencies[0].placeholder())));
                assert!(printed.contains("data:image/png"));
            }
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_placeholder_depends_on_file() {
        assert_ne!(placeholder("a.css", "x.png"), placeholder("b.css", "x.png"));
        assert_eq!(placeholder("a.css", "x.png"), placeholder("a.css", "x.png"));
    }
}
