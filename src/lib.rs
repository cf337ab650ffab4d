//! Flint CSS Compiler
//!
//! Parses CSS, rewrites it for a set of browser targets and prints it back
//! out, optionally minified and with a source map.
//!
//! # Features
//!
//! - browserslist queries resolved against a compiled-in release table
//! - Color fallbacks for `lab()`, `lch()`, `oklab()`, `oklch()` and `color()`
//! - Vendor prefixes for properties, values, selectors and `@keyframes`
//! - Nesting, `@custom-media` and media range syntax lowered for old targets
//! - CSS modules with configurable naming patterns and dashed idents
//! - Dependency analysis for `@import` and `url()`
//!
//! # Basic Usage
//!
//! ```rust
//! use flintcss::{transform, TransformRequest, Result};
//!
//! fn main() -> Result<()> {
//!     let mut request = TransformRequest::new(".a { color: lch(50% 40 30) }");
//!     request.transform.targets = flintcss::browserslist_to_targets("safari 13")?;
//!     let result = transform(&request)?;
//!     assert!(!result.code.is_empty());
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! 1. **Phase 1**: Parser - Tokenize and build the rule tree
//! 2. **Phase 2**: Transform - Fallbacks, prefixes, pruning and CSS modules
//! 3. **Phase 3**: Code Generator - Print CSS, source map and dependencies

pub mod types;
pub mod error;
pub mod lexer;

pub mod targets;
pub mod browserslist;
pub mod compat;
pub mod prefixes;

pub mod values;
pub mod color;
pub mod selector;
pub mod ast;
pub mod parser;

pub mod fallbacks;
pub mod transform;
pub mod css_modules;
pub mod optimizer;
pub mod dependencies;
pub mod codegen;
pub mod cli;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Re-export commonly used types and functions
pub use error::{CssError, Diagnostic, DiagnosticKind, Result};
pub use types::{Location, VendorPrefix};
pub use lexer::{tokenize, Token, TokenType};
pub use targets::{Browser, Targets, Version};

pub use ast::{CssRule, Declaration, StyleRule, Stylesheet};
pub use parser::Parser;
pub use codegen::{CodeGenerator, GeneratedCode};
pub use css_modules::{CssModuleExport, CssModulePlaceholder, CssModuleReference, CssModuleResult};
pub use dependencies::Dependency;
pub use optimizer::{Optimizer, OptimizationStats};
pub use cli::EnhancedCli;

/// Compiler version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Compiler build information
pub const BUILD_INFO: CompilerInfo = CompilerInfo {
    version: VERSION,
    name: NAME,
    description: DESCRIPTION,
    supported_features: &[
        "nesting",
        "custom-media",
        "media-ranges",
        "color-fallbacks",
        "vendor-prefixes",
        "css-modules",
        "source-maps",
        "dependencies",
        "minify",
    ],
};

/// Compiler information structure
#[derive(Debug, Clone)]
pub struct CompilerInfo {
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub supported_features: &'static [&'static str],
}

/// How source text is read
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    /// Name used in errors, source maps and CSS module hashes
    pub filename: String,

    /// Allow nested style rules and `@nest`
    pub nesting: bool,

    /// Allow `@custom-media` definitions
    pub custom_media: bool,

    /// Scope class names, ids and keyframes as a CSS module
    pub css_modules: bool,

    /// Naming pattern for scoped names; empty means `[hash]_[local]`
    pub css_modules_pattern: String,

    /// Also scope custom property names and `var()` references
    pub css_modules_dashed_idents: bool,

    /// Skip malformed rules and declarations instead of failing
    pub error_recovery: bool,
}

/// What the transform pass does to the rule tree
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    /// Browsers to add fallbacks and prefixes for; empty means none
    pub targets: Targets,

    /// Class names, ids, keyframes and custom properties to remove
    pub unused_symbols: HashSet<String>,

    /// Fail instead of warning on features the targets cannot support
    pub fail_on_unsupported: bool,

    /// Root that CSS module hashes are computed relative to
    pub project_root: String,
}

/// Classes to emit alongside the matching user-action pseudo-classes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PseudoClasses {
    pub hover: Option<String>,
    pub active: Option<String>,
    pub focus: Option<String>,
    pub focus_visible: Option<String>,
    pub focus_within: Option<String>,
}

impl PseudoClasses {
    pub fn is_empty(&self) -> bool {
        self.hover.is_none()
            && self.active.is_none()
            && self.focus.is_none()
            && self.focus_visible.is_none()
            && self.focus_within.is_none()
    }

    /// The replacement class for a pseudo-class name, if configured.
    pub fn get(&self, name: &str) -> Option<&str> {
        let class = match name.to_ascii_lowercase().as_str() {
            "hover" => &self.hover,
            "active" => &self.active,
            "focus" => &self.focus,
            "focus-visible" => &self.focus_visible,
            "focus-within" => &self.focus_within,
            _ => return None,
        };
        class.as_deref().filter(|class| !class.is_empty())
    }
}

/// How the stylesheet is printed
#[derive(Debug, Clone, Default)]
pub struct PrinterOptions {
    pub minify: bool,

    /// Produce a v3 source map
    pub source_map: bool,

    /// Source map of the input to chain through; empty means none
    pub input_source_map: String,

    /// Source map paths are made relative to this directory
    pub project_root: String,

    /// Decides whether newer color syntax may be printed
    pub targets: Targets,

    pub pseudo_classes: PseudoClasses,

    /// Remove `@import`s and replace `url()`s with placeholders
    pub analyze_dependencies: bool,
}

/// Everything needed for one end-to-end run
#[derive(Debug, Clone, Default)]
pub struct TransformRequest {
    pub code: Vec<u8>,
    pub parser: ParserOptions,
    pub transform: TransformOptions,
    pub printer: PrinterOptions,
}

impl TransformRequest {
    pub fn new(code: impl Into<Vec<u8>>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }
}

/// Output of `generate` and `transform`
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformResult {
    pub code: String,
    pub map: Option<String>,
    pub exports: Vec<CssModuleExport>,
    pub references: Vec<CssModulePlaceholder>,
    pub dependencies: Vec<Dependency>,
    pub warnings: Vec<Diagnostic>,
}

/// Transformation statistics and metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformStats {
    /// Original source size in bytes
    pub source_size: u64,

    /// Generated CSS size in bytes
    pub output_size: u64,

    /// Compression ratio (output/source)
    pub compression_ratio: f64,

    /// Number of top-level rules after transformation
    pub rule_count: usize,

    /// Number of CSS module exports
    pub export_count: usize,

    /// Number of dependencies found
    pub dependency_count: usize,

    /// Number of warnings reported
    pub warning_count: usize,

    /// Transformation time in milliseconds
    pub transform_time_ms: u64,
}

/// Resolve a browserslist query into minimum engine versions.
pub fn browserslist_to_targets(query: &str) -> Result<Targets> {
    browserslist::resolve(query)
}

/// Parse CSS source bytes into a stylesheet.
pub fn parse(code: &[u8], options: &ParserOptions) -> Result<Stylesheet> {
    let source = std::str::from_utf8(code).map_err(|e| {
        let valid = &code[..e.valid_up_to()];
        // The prefix is valid UTF-8 by construction.
        let valid = String::from_utf8_lossy(valid);
        let line = valid.matches('\n').count() as u32;
        let column = valid.rsplit('\n').next().map_or(0, |l| l.chars().count()) as u32;
        CssError::parse(
            &options.filename,
            Location::new(e.valid_up_to(), line, column),
            "Input is not valid UTF-8",
        )
    })?;
    parser::parse_stylesheet(source, options)
}

/// Apply target fallbacks, pruning and CSS modules scoping in place.
pub fn transform_stylesheet(stylesheet: &mut Stylesheet, options: &TransformOptions) -> Result<()> {
    transform::transform_stylesheet(stylesheet, options)
}

/// Print a stylesheet.
pub fn generate(stylesheet: &Stylesheet, options: &PrinterOptions) -> Result<TransformResult> {
    let generated = CodeGenerator::new(options).generate(stylesheet)?;
    let module = stylesheet.module_result.clone().unwrap_or_default();

    Ok(TransformResult {
        code: generated.code,
        map: generated.map,
        exports: module.exports,
        references: module.placeholders,
        dependencies: generated.dependencies,
        warnings: stylesheet.diagnostics.clone(),
    })
}

/// Parse, transform and print in one call.
///
/// When the printer has no targets of its own it uses the transform
/// targets, and likewise for the project root in the other direction.
pub fn transform(request: &TransformRequest) -> Result<TransformResult> {
    log::debug!("Phase 1: Parsing {} bytes", request.code.len());
    let mut stylesheet = parse(&request.code, &request.parser)?;

    log::debug!("Phase 2: Transforming {} rules", stylesheet.rules.len());
    let mut transform_options = request.transform.clone();
    if transform_options.project_root.is_empty() {
        transform_options.project_root = request.printer.project_root.clone();
    }
    transform_stylesheet(&mut stylesheet, &transform_options)?;

    log::debug!("Phase 3: Generating code");
    let mut printer = request.printer.clone();
    if printer.targets.is_empty() {
        printer.targets = request.transform.targets;
    }
    generate(&stylesheet, &printer)
}

/// Transform a file and write the result
pub fn transform_file(input_path: &str, output_path: &str, request: &TransformRequest) -> Result<TransformStats> {
    let (_result, stats) = transform_file_with_result(input_path, output_path, request)?;
    Ok(stats)
}

/// Transform a file, write the CSS (and its source map next to it) and
/// return the full result alongside the statistics.
pub fn transform_file_with_result(
    input_path: &str,
    output_path: &str,
    request: &TransformRequest,
) -> Result<(TransformResult, TransformStats)> {
    use std::fs;
    use std::path::Path;
    use std::time::Instant;

    let start_time = Instant::now();
    log::info!("Transforming '{}' to '{}'...", input_path, output_path);

    let code = fs::read(input_path).map_err(|e| CssError::FileNotFound {
        path: format!("{}: {}", input_path, e),
    })?;

    let mut request = request.clone();
    request.code = code;
    if request.parser.filename.is_empty() {
        request.parser.filename = input_path.to_string();
    }

    let mut result = transform(&request)?;

    if let Some(map) = &result.map {
        let map_path = format!("{}.map", output_path);
        fs::write(&map_path, map)?;
        let map_name = Path::new(&map_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| map_path.clone());
        if !result.code.is_empty() && !result.code.ends_with('\n') {
            result.code.push('\n');
        }
        result.code.push_str(&format!("/*# sourceMappingURL={} */\n", map_name));
    }

    fs::write(output_path, &result.code)?;

    let source_size = request.code.len() as u64;
    let output_size = result.code.len() as u64;
    let stats = TransformStats {
        source_size,
        output_size,
        compression_ratio: if source_size > 0 {
            output_size as f64 / source_size as f64
        } else {
            0.0
        },
        rule_count: count_output_rules(&result.code),
        export_count: result.exports.len(),
        dependency_count: result.dependencies.len(),
        warning_count: result.warnings.len(),
        transform_time_ms: start_time.elapsed().as_millis() as u64,
    };

    log::info!("Transformation successful!");
    log::debug!("Full stats: {:?}", stats);
    Ok((result, stats))
}

/// Top-level rules in generated CSS, counted from its braces.
fn count_output_rules(code: &str) -> usize {
    let mut depth = 0usize;
    let mut count = 0;
    let mut in_string: Option<char> = None;
    for ch in code.chars() {
        match (in_string, ch) {
            (Some(quote), c) if c == quote => in_string = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => in_string = Some(ch),
            (None, '{') => {
                if depth == 0 {
                    count += 1;
                }
                depth += 1;
            }
            (None, '}') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    count
}

/// Check if a feature is supported
pub fn supports_feature(feature: &str) -> bool {
    BUILD_INFO.supported_features.contains(&feature)
}

/// Get compiler build information
pub fn build_info() -> &'static CompilerInfo {
    &BUILD_INFO
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn request(code: &str) -> TransformRequest {
        let mut request = TransformRequest::new(code);
        request.parser.filename = "test.css".to_string();
        request
    }

    #[test]
    fn test_end_to_end_example() {
        let mut request = request(".foo { color: lch(50.998% 135.363 338); }");
        request.parser.css_modules = true;
        request.parser.css_modules_dashed_idents = true;
        request.transform.unused_symbols = ["bar".to_string()].into_iter().collect();
        request.transform.targets = browserslist_to_targets("last 2 versions, not IE <= 11").unwrap();

        let result = transform(&request).unwrap();
        assert!(!result.code.is_empty());
        assert!(!result.code.contains(".foo "));
        assert_eq!(result.exports.len(), 1);
        assert_eq!(result.exports[0].exported, "foo");
        assert!(result.code.contains(&format!(".{} {{", result.exports[0].local)));
        assert!(result.code.contains("color: lch(50.998% 135.363 338);"));
        let fallback = result.code.find("color: #f000c0;").expect("sRGB fallback is emitted");
        assert!(fallback < result.code.find("color: lch(").unwrap());
    }

    #[test]
    fn test_lch_fallback_for_old_targets() {
        let mut request = request(".foo { color: lch(50.998% 135.363 338); }");
        request.transform.targets = browserslist_to_targets("chrome 90").unwrap();
        let result = transform(&request).unwrap();
        assert_eq!(
            result.code,
            ".foo {\n  color: #f000c0;\n  color: lch(50.998% 135.363 338);\n}\n"
        );
    }

    #[test]
    fn test_unused_symbol_pruning() {
        let mut request = request(".foo { color: red }\n.bar { color: green }\n.baz { margin: 0 }");
        request.transform.unused_symbols = ["bar".to_string()].into_iter().collect();
        request.printer.minify = true;
        let result = transform(&request).unwrap();
        assert_eq!(result.code, ".foo{color:red}.baz{margin:0}");
    }

    #[test]
    fn test_css_modules_scoping() {
        let mut request = request(".foo { color: red }");
        request.parser.css_modules = true;
        let result = transform(&request).unwrap();

        assert_eq!(result.exports.len(), 1);
        let export = &result.exports[0];
        assert_eq!(export.exported, "foo");
        assert_ne!(export.local, "foo");
        assert!(result.code.contains(&format!(".{}", export.local)));
        assert!(!result.code.contains(".foo"));
    }

    #[test]
    fn test_query_error() {
        match browserslist_to_targets("not a real browser") {
            Err(CssError::Query { .. }) => {}
            other => panic!("Expected query error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_offset_within_input() {
        let source = ".a { color: red }\n.b { color: \"unterminated\n}";
        let err = parse(source.as_bytes(), &ParserOptions::default()).unwrap_err();
        let offset = err.offset().expect("parse errors carry an offset");
        assert!(offset <= source.len());
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error() {
        let err = parse(b".a { content: \"\xff\" }", &ParserOptions::default()).unwrap_err();
        assert_eq!(err.offset(), Some(15));
    }

    #[test]
    fn test_error_recovery_omits_bad_rules() {
        let mut request = request(".a { color: red }\n.b { color }\n.c { color: green }");
        request.parser.error_recovery = true;
        request.printer.minify = true;
        let result = transform(&request).unwrap();
        assert_eq!(result.code, ".a{color:red}.c{color:green}");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, DiagnosticKind::RecoveredParseError);
    }

    #[test]
    fn test_pretty_printing_is_idempotent() {
        let source = "@media (min-width: 100px) { .a > .b, .c::before { margin: 0 auto; color: rgba(0, 0, 0, 0.5) } }\n\
                      @keyframes spin { from { transform: rotate(0deg) } to { transform: rotate(360deg) } }\n\
                      .d[data-x=\"y\"]:hover { background: url(img.png) no-repeat; --brand: #abc }";
        let options = ParserOptions::default();
        let printer = PrinterOptions::default();

        let first = generate(&parse(source.as_bytes(), &options).unwrap(), &printer).unwrap().code;
        let second = generate(&parse(first.as_bytes(), &options).unwrap(), &printer).unwrap().code;
        assert_eq!(first, second);
    }

    #[test]
    fn test_transform_is_idempotent_for_comments_nesting_and_recovery() {
        let source = "/*! MIT */
                      .a { color: red; > .c { color: blue } &:hover { color: green } }
                      }
                      @font-face { font-family: x; unicode-range: U+0025-00FF, u+4?? }
                      *|a, ns|b { color: red }
                      .e { grid-area: #12345 }";
        for query in ["chrome 130", "chrome 100"] {
            for minify in [false, true] {
                let mut first_request = request(source);
                first_request.parser.nesting = true;
                first_request.parser.error_recovery = true;
                first_request.transform.targets = browserslist_to_targets(query).unwrap();
                first_request.printer.minify = minify;
                let first = transform(&first_request).unwrap();
                let recovered = |result: &TransformResult| {
                    result.warnings.iter().filter(|w| w.kind == DiagnosticKind::RecoveredParseError).count()
                };
                assert_eq!(recovered(&first), 1);

                let mut second_request = first_request.clone();
                second_request.code = first.code.clone().into_bytes();
                let second = transform(&second_request).unwrap();
                assert_eq!(first.code, second.code);
                assert_eq!(recovered(&second), 0);

                assert!(first.code.starts_with("/*! MIT */"));
                assert!(first.code.contains("U+0025-00FF"));
                assert!(first.code.contains("U+4??"));
                assert!(first.code.contains("ns|b"));
                assert!(first.code.contains("#12345"));
            }
        }
    }

    #[test]
    fn test_printer_uses_transform_targets() {
        let mut request = request(".a { color: rgba(255, 0, 0, 0.5) }");
        request.printer.minify = true;
        request.transform.targets = browserslist_to_targets("ie 11").unwrap();
        let result = transform(&request).unwrap();
        assert_eq!(result.code, ".a{color:rgba(255,0,0,.5)}");
    }

    #[test]
    fn test_transform_file_writes_output_and_map() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.css");
        let output = temp_dir.path().join("out.css");
        fs::write(&input, ".a { color: red }").unwrap();

        let mut request = TransformRequest::default();
        request.printer.source_map = true;
        let stats = transform_file(input.to_str().unwrap(), output.to_str().unwrap(), &request).unwrap();

        let code = fs::read_to_string(&output).unwrap();
        assert!(code.ends_with("/*# sourceMappingURL=out.css.map */\n"));
        assert!(temp_dir.path().join("out.css.map").exists());
        assert_eq!(stats.rule_count, 1);
        assert_eq!(stats.source_size, 17);
    }

    #[test]
    fn test_transform_missing_file() {
        let err = transform_file("/nonexistent/in.css", "/nonexistent/out.css", &TransformRequest::default())
            .unwrap_err();
        assert!(matches!(err, CssError::FileNotFound { .. }));
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.name, NAME);
        assert!(supports_feature("css-modules"));
        assert!(!supports_feature("scripting"));
    }
}
