//! Typed declaration values and their serialization

use crate::color::CssColor;
use crate::error::{CssError, Result};
use crate::lexer::{Token, TokenType};
use crate::types::Location;

/// Where a `var(--x from ...)` reference points.
#[derive(Debug, Clone, PartialEq)]
pub enum Specifier {
    Global,
    File(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashedIdentReference {
    pub ident: String,
    pub from: Option<Specifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Url {
    pub url: String,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub arguments: Vec<ComponentValue>,
}

/// A `var()` reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: DashedIdentReference,
    pub fallback: Option<Vec<ComponentValue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paren,
    Bracket,
    Brace,
}

impl BlockKind {
    fn delimiters(self) -> (char, char) {
        match self {
            BlockKind::Paren => ('(', ')'),
            BlockKind::Bracket => ('[', ']'),
            BlockKind::Brace => ('{', '}'),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentValue {
    Ident(String),
    DashedIdent(DashedIdentReference),
    Number { value: f64, is_int: bool },
    Percentage(f64),
    Dimension { value: f64, unit: String },
    String(String),
    Url(Url),
    Hash(String),
    UnicodeRange(String),
    Color(CssColor),
    Function(Function),
    Var(Variable),
    Block(BlockKind, Vec<ComponentValue>),
    Delim(char),
    Comma,
    Whitespace,
}

impl ComponentValue {
    pub fn is_ident(&self, name: &str) -> bool {
        matches!(self, ComponentValue::Ident(ident) if ident.eq_ignore_ascii_case(name))
    }
}

const COLOR_FUNCTIONS: &[&str] = &[
    "rgb", "rgba", "hsl", "hsla", "hwb", "lab", "lch", "oklab", "oklch", "color",
];

const LENGTH_UNITS: &[&str] = &[
    "px", "em", "rem", "ex", "ch", "vw", "vh", "vmin", "vmax", "cm", "mm", "q", "in", "pt", "pc",
];

/// Properties whose values may contain named colors.
pub fn is_color_property(property: &str) -> bool {
    let name = property.to_ascii_lowercase();
    matches!(
        name.as_str(),
        "color"
            | "background"
            | "background-color"
            | "border"
            | "border-color"
            | "outline"
            | "outline-color"
            | "fill"
            | "stroke"
            | "box-shadow"
            | "text-shadow"
            | "caret-color"
            | "accent-color"
            | "column-rule"
            | "column-rule-color"
            | "stop-color"
            | "flood-color"
            | "lighting-color"
            | "text-decoration"
            | "text-decoration-color"
            | "text-emphasis-color"
    ) || (name.starts_with("border-") && (name.ends_with("-color") || !name.contains("radius")))
}

/// Parse the tokens of a declaration value or at-rule prelude.
pub fn parse_value(tokens: &[Token], filename: &str, property: &str) -> Result<Vec<ComponentValue>> {
    let mut parser = ValueParser {
        tokens,
        pos: 0,
        filename,
        named_colors: is_color_property(property),
    };
    parser.parse_until(None)
}

struct ValueParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    filename: &'a str,
    named_colors: bool,
}

impl<'a> ValueParser<'a> {
    fn error(&self, token: &Token, message: impl Into<String>) -> CssError {
        CssError::parse(self.filename, token.location(), message)
    }

    fn parse_until(&mut self, close: Option<TokenType>) -> Result<Vec<ComponentValue>> {
        let mut values = Vec::new();

        while let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;

            if close.as_ref() == Some(&token.token_type) {
                return Ok(normalize(values));
            }

            let value = match &token.token_type {
                TokenType::Whitespace | TokenType::Comment(_) => ComponentValue::Whitespace,
                TokenType::RightParen | TokenType::RightBracket | TokenType::RightBrace => {
                    return Err(self.error(token, format!("Unexpected '{}'", token.token_type)));
                }
                TokenType::BadString => return Err(self.error(token, "Unterminated string")),
                TokenType::BadUrl => return Err(self.error(token, "Malformed url()")),
                TokenType::Ident(name) => self.ident(name),
                TokenType::Function(name) => {
                    let arguments = self.parse_until(Some(TokenType::RightParen))?;
                    function(name, arguments, token.location())
                }
                TokenType::AtKeyword(name) => {
                    values.push(ComponentValue::Delim('@'));
                    ComponentValue::Ident(name.clone())
                }
                TokenType::Hash { value, .. } => CssColor::parse_hex(value)
                    .map(ComponentValue::Color)
                    .unwrap_or_else(|| ComponentValue::Hash(value.clone())),
                TokenType::QuotedString(s) => ComponentValue::String(s.clone()),
                TokenType::UnicodeRange(range) => ComponentValue::UnicodeRange(range.clone()),
                TokenType::Url(url) => ComponentValue::Url(Url {
                    url: url.clone(),
                    loc: token.location(),
                }),
                TokenType::Number { value, is_int } => ComponentValue::Number {
                    value: *value,
                    is_int: *is_int,
                },
                TokenType::Percentage(value) => ComponentValue::Percentage(*value),
                TokenType::Dimension { value, unit, .. } => ComponentValue::Dimension {
                    value: *value,
                    unit: unit.to_ascii_lowercase(),
                },
                TokenType::Delim(c) => ComponentValue::Delim(*c),
                TokenType::Colon => ComponentValue::Delim(':'),
                TokenType::Semicolon => ComponentValue::Delim(';'),
                TokenType::Comma => ComponentValue::Comma,
                TokenType::LeftParen => {
                    ComponentValue::Block(BlockKind::Paren, self.parse_until(Some(TokenType::RightParen))?)
                }
                TokenType::LeftBracket => ComponentValue::Block(
                    BlockKind::Bracket,
                    self.parse_until(Some(TokenType::RightBracket))?,
                ),
                TokenType::LeftBrace => {
                    ComponentValue::Block(BlockKind::Brace, self.parse_until(Some(TokenType::RightBrace))?)
                }
                TokenType::Cdo | TokenType::Cdc => continue,
                TokenType::Eof => break,
            };
            values.push(value);
        }

        // Blocks left open at the end of input close implicitly.
        Ok(normalize(values))
    }

    fn ident(&self, name: &str) -> ComponentValue {
        if name.starts_with("--") {
            return ComponentValue::DashedIdent(DashedIdentReference {
                ident: name.to_string(),
                from: None,
            });
        }
        if self.named_colors {
            if let Some(color) = CssColor::parse_named(name) {
                return ComponentValue::Color(color);
            }
        }
        ComponentValue::Ident(name.to_string())
    }
}

fn function(name: &str, arguments: Vec<ComponentValue>, loc: Location) -> ComponentValue {
    let lower = name.to_ascii_lowercase();

    if lower == "var" {
        if let Some(variable) = variable(&arguments) {
            return ComponentValue::Var(variable);
        }
    } else if COLOR_FUNCTIONS.contains(&lower.as_str()) {
        if let Some(color) = CssColor::parse_function(&lower, &arguments) {
            return ComponentValue::Color(color);
        }
    } else if lower == "url" {
        if let [ComponentValue::String(url)] = arguments.as_slice() {
            return ComponentValue::Url(Url { url: url.clone(), loc });
        }
    }

    ComponentValue::Function(Function {
        name: name.to_string(),
        arguments,
    })
}

fn variable(arguments: &[ComponentValue]) -> Option<Variable> {
    let mut rest = arguments
        .iter()
        .filter(|v| !matches!(v, ComponentValue::Whitespace))
        .peekable();

    let ident = match rest.next()? {
        ComponentValue::DashedIdent(reference) => reference.ident.clone(),
        _ => return None,
    };

    let mut from = None;
    if rest.peek().map_or(false, |v| v.is_ident("from")) {
        rest.next();
        from = match rest.next()? {
            ComponentValue::String(file) => Some(Specifier::File(file.clone())),
            v if v.is_ident("global") => Some(Specifier::Global),
            _ => return None,
        };
    }

    let fallback = match rest.next() {
        None => None,
        Some(ComponentValue::Comma) => {
            let position = arguments.iter().position(|v| matches!(v, ComponentValue::Comma))?;
            Some(normalize(arguments[position + 1..].to_vec()))
        }
        Some(_) => return None,
    };

    Some(Variable {
        name: DashedIdentReference { ident, from },
        fallback,
    })
}

/// Collapse whitespace runs and drop whitespace at the edges and around
/// commas.
fn normalize(values: Vec<ComponentValue>) -> Vec<ComponentValue> {
    let mut result: Vec<ComponentValue> = Vec::with_capacity(values.len());

    for value in values {
        match value {
            ComponentValue::Whitespace => {
                let skip = match result.last() {
                    None | Some(ComponentValue::Whitespace) | Some(ComponentValue::Comma) => true,
                    _ => false,
                };
                if !skip {
                    result.push(value);
                }
            }
            ComponentValue::Comma => {
                if matches!(result.last(), Some(ComponentValue::Whitespace)) {
                    result.pop();
                }
                result.push(value);
            }
            other => result.push(other),
        }
    }

    if matches!(result.last(), Some(ComponentValue::Whitespace)) {
        result.pop();
    }
    result
}

/// Visit every value, descending into functions, blocks and `var()`
/// fallbacks.
pub fn walk(values: &[ComponentValue], f: &mut dyn FnMut(&ComponentValue)) {
    for value in values {
        f(value);
        match value {
            ComponentValue::Function(function) => walk(&function.arguments, f),
            ComponentValue::Block(_, inner) => walk(inner, f),
            ComponentValue::Var(Variable { fallback: Some(fallback), .. }) => walk(fallback, f),
            _ => {}
        }
    }
}

pub fn walk_mut(values: &mut [ComponentValue], f: &mut dyn FnMut(&mut ComponentValue)) {
    for value in values.iter_mut() {
        f(value);
        match value {
            ComponentValue::Function(function) => walk_mut(&mut function.arguments, f),
            ComponentValue::Block(_, inner) => walk_mut(inner, f),
            ComponentValue::Var(Variable { fallback: Some(fallback), .. }) => walk_mut(fallback, f),
            _ => {}
        }
    }
}

/// Format a number the shortest way CSS allows. Values are rounded to six
/// decimals; `minify` drops the leading zero of fractions.
pub fn format_number(value: f64, minify: bool) -> String {
    let rounded = if value.abs() < 1e9 {
        (value * 1e6).round() / 1e6
    } else {
        value.round()
    };
    // Avoid printing "-0".
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let text = format!("{}", rounded);

    if minify {
        if let Some(rest) = text.strip_prefix("0.") {
            return format!(".{}", rest);
        }
        if let Some(rest) = text.strip_prefix("-0.") {
            return format!("-.{}", rest);
        }
    }
    text
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
}

/// Serialize the name of a hash token. Unlike an identifier it may start
/// with a digit.
pub fn serialize_name(name: &str, out: &mut String) {
    for ch in name.chars() {
        match ch {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => out.push_str(&format!("\\{:x} ", ch as u32)),
            c if is_name_char(c) => out.push(c),
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
}

/// Serialize an identifier, escaping what would not re-tokenize as one.
pub fn serialize_identifier(name: &str, out: &mut String) {
    if name == "-" {
        out.push_str("\\-");
        return;
    }

    let leading_dash = name.starts_with('-');
    for (i, ch) in name.chars().enumerate() {
        match ch {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => out.push_str(&format!("\\{:x} ", ch as u32)),
            '0'..='9' if i == 0 || (i == 1 && leading_dash) => {
                out.push_str(&format!("\\{:x} ", ch as u32))
            }
            c if is_name_char(c) => out.push(c),
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
}

pub fn serialize_string(value: &str, out: &mut String) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\a "),
            '\u{1}'..='\u{1f}' | '\u{7f}' => out.push_str(&format!("\\{:x} ", ch as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

pub fn serialize_url(url: &str, out: &mut String) {
    let needs_quotes = url
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ')' | '\\') || c.is_control());
    out.push_str("url(");
    if needs_quotes {
        serialize_string(url, out);
    } else {
        out.push_str(url);
    }
    out.push(')');
}

/// How values are printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueFormat {
    pub minify: bool,
    /// Translucent colors may use `#rrggbbaa`.
    pub hex_alpha: bool,
    /// Zero lengths may drop their unit.
    pub zero_lengths: bool,
}

/// Delimiters whitespace may be dropped around when minifying.
fn is_tight_delim(value: Option<&ComponentValue>) -> bool {
    matches!(
        value,
        Some(ComponentValue::Delim(':' | '/' | '>' | '<' | '=' | '*'))
    )
}

pub fn to_css(values: &[ComponentValue], format: ValueFormat) -> String {
    let mut out = String::new();
    write_values(values, format, false, &mut out);
    out
}

pub fn write_values(values: &[ComponentValue], format: ValueFormat, in_function: bool, out: &mut String) {
    let num = |v: f64| format_number(v, format.minify);
    let mut skip_whitespace = false;

    for (i, value) in values.iter().enumerate() {
        if skip_whitespace && matches!(value, ComponentValue::Whitespace) {
            skip_whitespace = false;
            continue;
        }
        skip_whitespace = false;

        match value {
            ComponentValue::Whitespace => {
                let tight = format.minify
                    && (is_tight_delim(values.get(i.wrapping_sub(1))) || is_tight_delim(values.get(i + 1)));
                if !tight {
                    out.push(' ');
                }
            }
            ComponentValue::Comma => out.push_str(if format.minify { "," } else { ", " }),
            ComponentValue::Delim(':') if !format.minify => {
                out.push_str(": ");
                skip_whitespace = true;
            }
            ComponentValue::Delim(c) => out.push(*c),
            ComponentValue::Ident(ident) => serialize_identifier(ident, out),
            ComponentValue::DashedIdent(reference) => write_dashed_ident(reference, out),
            ComponentValue::Number { value, .. } => out.push_str(&num(*value)),
            ComponentValue::Percentage(value) => {
                out.push_str(&num(*value));
                out.push('%');
            }
            ComponentValue::Dimension { value, unit } => {
                if format.zero_lengths && !in_function && *value == 0.0 && LENGTH_UNITS.contains(&unit.as_str()) {
                    out.push('0');
                } else {
                    out.push_str(&num(*value));
                    serialize_identifier(unit, out);
                }
            }
            ComponentValue::String(s) => serialize_string(s, out),
            ComponentValue::Url(url) => serialize_url(&url.url, out),
            ComponentValue::Hash(hash) => {
                out.push('#');
                serialize_name(hash, out);
            }
            ComponentValue::UnicodeRange(range) => out.push_str(range),
            ComponentValue::Color(color) => out.push_str(&color.to_css(format.minify, format.hex_alpha)),
            ComponentValue::Function(function) => {
                serialize_identifier(&function.name, out);
                out.push('(');
                write_values(&function.arguments, format, true, out);
                out.push(')');
            }
            ComponentValue::Var(variable) => {
                out.push_str("var(");
                write_dashed_ident(&variable.name, out);
                if let Some(fallback) = &variable.fallback {
                    out.push_str(if format.minify { "," } else { ", " });
                    write_values(fallback, format, true, out);
                }
                out.push(')');
            }
            ComponentValue::Block(kind, inner) => {
                let (open, close) = kind.delimiters();
                out.push(open);
                write_values(inner, format, in_function, out);
                out.push(close);
            }
        }
    }
}

fn write_dashed_ident(reference: &DashedIdentReference, out: &mut String) {
    serialize_identifier(&reference.ident, out);
    match &reference.from {
        Some(Specifier::Global) => out.push_str(" from global"),
        Some(Specifier::File(file)) => {
            out.push_str(" from ");
            serialize_string(file, out);
        }
        None => {}
    }
}
