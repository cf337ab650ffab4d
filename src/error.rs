//! Error types for the Flint compiler

use crate::types::Location;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CssError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid browserslist query '{query}': {message}")]
    Query { query: String, message: String },

    #[error("Parse error{} at {line}:{column}: {message}", in_file(.file))]
    Parse {
        file: String,
        offset: usize,
        line: u32,
        column: u32,
        message: String,
    },

    #[error("CSS modules error{} at {loc}: {message}", in_file(.file))]
    Scope { file: String, loc: Location, message: String },

    #[error("Unsupported feature '{feature}': {message}")]
    Transform { feature: String, message: String },

    #[error("Code generation error: {message}")]
    CodeGen { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, CssError>;

fn in_file(file: &str) -> String {
    if file.is_empty() {
        String::new()
    } else {
        format!(" in {}", file)
    }
}

impl CssError {
    pub fn query(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Parse error at `loc`. Lines and columns are reported 1-based.
    pub fn parse(file: impl Into<String>, loc: Location, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            offset: loc.offset,
            line: loc.line + 1,
            column: loc.column + 1,
            message: message.into(),
        }
    }

    pub fn scope(file: impl Into<String>, loc: Location, message: impl Into<String>) -> Self {
        Self::Scope {
            file: file.into(),
            loc,
            message: message.into(),
        }
    }

    pub fn transform(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            feature: feature.into(),
            message: message.into(),
        }
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        Self::CodeGen {
            message: message.into(),
        }
    }

    /// Byte offset of the error in the source, when the error has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Parse { offset, .. } => Some(*offset),
            Self::Scope { loc, .. } => Some(loc.offset),
            _ => None,
        }
    }
}

/// Category of a non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A malformed construct skipped under error recovery.
    RecoveredParseError,
    /// A feature the targets lack with no known fallback.
    UnsupportedFeature,
}

/// A non-fatal problem reported alongside a successful result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub loc: Location,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, loc: Location) -> Self {
        Self {
            kind,
            message: message.into(),
            loc,
        }
    }

    /// Downgrade a parse error into a recovered diagnostic.
    pub fn from_error(error: &CssError) -> Self {
        let loc = match error {
            CssError::Parse {
                offset, line, column, ..
            } => Location::new(*offset, line.saturating_sub(1), column.saturating_sub(1)),
            CssError::Scope { loc, .. } => *loc,
            _ => Location::default(),
        };
        let message = match error {
            CssError::Parse { message, .. } | CssError::Scope { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self::new(DiagnosticKind::RecoveredParseError, message, loc)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.loc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_reports_one_based_position() {
        let err = CssError::parse("test.css", Location::new(12, 1, 3), "Unexpected token");
        assert_eq!(err.to_string(), "Parse error in test.css at 2:4: Unexpected token");
        assert_eq!(err.offset(), Some(12));
    }

    #[test]
    fn test_parse_error_without_filename() {
        let err = CssError::parse("", Location::new(3, 0, 3), "Unexpected token");
        assert_eq!(err.to_string(), "Parse error at 1:4: Unexpected token");
    }

    #[test]
    fn test_diagnostic_from_parse_error_keeps_location() {
        let err = CssError::parse("test.css", Location::new(7, 0, 7), "Invalid selector");
        let diagnostic = Diagnostic::from_error(&err);
        assert_eq!(diagnostic.kind, DiagnosticKind::RecoveredParseError);
        assert_eq!(diagnostic.loc, Location::new(7, 0, 7));
        assert_eq!(diagnostic.message, "Invalid selector");
    }

    #[test]
    fn test_query_error_has_no_offset() {
        let err = CssError::query("not a real browser", "Unknown browser 'a'");
        assert!(err.offset().is_none());
        assert!(err.to_string().contains("not a real browser"));
    }
}
