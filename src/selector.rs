//! Selector parsing, serialization and rewriting

use crate::error::{CssError, Result};
use crate::lexer::{Token, TokenType};
use crate::prefixes::PrefixFeature;
use crate::targets::Targets;
use crate::types::{Location, VendorPrefix};
use crate::values::{serialize_identifier, serialize_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    LaterSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOperator {
    Equal,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

impl AttrOperator {
    fn as_str(self) -> &'static str {
        match self {
            AttrOperator::Equal => "=",
            AttrOperator::Includes => "~=",
            AttrOperator::DashMatch => "|=",
            AttrOperator::Prefix => "^=",
            AttrOperator::Suffix => "$=",
            AttrOperator::Substring => "*=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub operation: Option<(AttrOperator, String)>,
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    /// `:hover`, `:first-child`, `:-moz-read-only`
    Simple(String),
    /// `:is()`, `:where()`, `:not()`, `:has()` and their vendor forms.
    Selectors { name: String, list: SelectorList },
    /// Any other functional pseudo-class, arguments kept as text.
    Raw { name: String, args: String },
    /// CSS modules `:local(...)`
    Local(Box<Selector>),
    /// CSS modules `:global(...)`
    Global(Box<Selector>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Combinator(Combinator),
    Nesting,
    Universal,
    /// Namespace prefix of the type or universal selector that follows:
    /// `ns|` is `Some("ns")`, `|` is `Some("")` and `*|` is `None`.
    Namespace(Option<String>),
    Type(String),
    Class(String),
    Id(String),
    Attribute(Attribute),
    PseudoClass(PseudoClass),
    PseudoElement { name: String, args: Option<String> },
}

impl Component {
    fn is_combinator(&self) -> bool {
        matches!(self, Component::Combinator(_))
    }

    fn is_type_like(&self) -> bool {
        matches!(self, Component::Type(_) | Component::Universal)
    }
}

/// A complex selector: compounds joined by combinators, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector(pub Vec<Component>);

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<Selector>);

const SELECTOR_FUNCTIONS: &[&str] = &[
    "is", "where", "not", "has", "matches", "any", "-webkit-any", "-moz-any",
];

const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];

/// What the selector parser needs to know about its surroundings.
#[derive(Debug, Clone, Copy)]
pub struct SelectorContext<'a> {
    pub filename: &'a str,
    pub source: &'a str,
    pub css_modules: bool,
    /// Inside a style rule, where relative selectors are allowed.
    pub nested: bool,
}

pub fn parse_selector_list(tokens: &[Token], context: &SelectorContext) -> Result<SelectorList> {
    let mut parser = SelectorParser {
        tokens,
        pos: 0,
        context: *context,
        relative: context.nested,
    };
    parser.parse_list()
}

struct SelectorParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    context: SelectorContext<'a>,
    relative: bool,
}

impl<'a> SelectorParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).filter(|t| t.token_type != TokenType::Eof)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, |t| t.is_whitespace_or_comment()) {
            self.pos += 1;
        }
    }

    fn location(&self) -> Location {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.location())
            .unwrap_or_default()
    }

    fn error(&self, message: impl Into<String>) -> CssError {
        CssError::parse(self.context.filename, self.location(), message)
    }

    fn parse_list(&mut self) -> Result<SelectorList> {
        let mut selectors = Vec::new();
        loop {
            selectors.push(self.parse_selector()?);
            match self.advance() {
                None => break,
                Some(token) if token.token_type == TokenType::Comma => continue,
                Some(token) => {
                    self.pos -= 1;
                    return Err(self.error(format!("Unexpected token in selector: {}", token.token_type)));
                }
            }
        }
        Ok(SelectorList(selectors))
    }

    fn parse_selector(&mut self) -> Result<Selector> {
        let mut components: Vec<Component> = Vec::new();
        let mut pending: Option<Combinator> = None;
        self.skip_whitespace();

        while let Some(token) = self.peek() {
            let combinator = match token.token_type {
                TokenType::Comma => break,
                TokenType::Whitespace | TokenType::Comment(_) => {
                    self.pos += 1;
                    let after_combinator = components.last().map_or(false, Component::is_combinator);
                    if !components.is_empty() && pending.is_none() && !after_combinator {
                        pending = Some(Combinator::Descendant);
                    }
                    continue;
                }
                TokenType::Delim('>') => Some(Combinator::Child),
                TokenType::Delim('+') => Some(Combinator::NextSibling),
                TokenType::Delim('~') => Some(Combinator::LaterSibling),
                _ => None,
            };

            if let Some(combinator) = combinator {
                let explicit_pending = matches!(pending, Some(c) if c != Combinator::Descendant);
                if explicit_pending || components.last().map_or(false, Component::is_combinator) {
                    return Err(self.error("Unexpected combinator"));
                }
                if components.is_empty() {
                    if !self.relative {
                        return Err(self.error("Selector cannot start with a combinator"));
                    }
                    components.push(Component::Combinator(combinator));
                } else {
                    pending = Some(combinator);
                }
                self.pos += 1;
                continue;
            }

            if let Some(combinator) = pending.take() {
                components.push(Component::Combinator(combinator));
            }
            let component = self.parse_simple()?;
            components.push(component);
        }

        if matches!(pending, Some(c) if c != Combinator::Descendant) {
            return Err(self.error("Selector cannot end with a combinator"));
        }
        if components.is_empty() {
            return Err(self.error("Empty selector"));
        }
        if components.last().map_or(false, Component::is_combinator) {
            return Err(self.error("Selector cannot end with a combinator"));
        }
        Ok(Selector(components))
    }

    fn parse_simple(&mut self) -> Result<Component> {
        let token = match self.advance() {
            Some(token) => token,
            None => return Err(self.error("Unexpected end of selector")),
        };

        match &token.token_type {
            TokenType::Ident(name) if self.namespace_follows() => {
                self.pos += 1;
                Ok(Component::Namespace(Some(name.clone())))
            }
            TokenType::Delim('*') if self.namespace_follows() => {
                self.pos += 1;
                Ok(Component::Namespace(None))
            }
            TokenType::Delim('|') if self.type_follows(self.pos) => Ok(Component::Namespace(Some(String::new()))),
            TokenType::Ident(name) => Ok(Component::Type(name.clone())),
            TokenType::Delim('*') => Ok(Component::Universal),
            TokenType::Delim('&') => Ok(Component::Nesting),
            TokenType::Delim('.') => match self.advance().map(|t| &t.token_type) {
                Some(TokenType::Ident(name)) => Ok(Component::Class(name.clone())),
                _ => {
                    self.pos -= 1;
                    Err(self.error("Expected class name after '.'"))
                }
            },
            TokenType::Hash { value, is_id: true } => Ok(Component::Id(value.clone())),
            TokenType::Hash { .. } => {
                self.pos -= 1;
                Err(self.error("Invalid id selector"))
            }
            TokenType::LeftBracket => self.parse_attribute(),
            TokenType::Colon => self.parse_pseudo(),
            other => {
                self.pos -= 1;
                Err(self.error(format!("Unexpected token in selector: {}", other)))
            }
        }
    }

    /// `|` then a type or universal selector, with nothing in between.
    fn namespace_follows(&self) -> bool {
        matches!(self.tokens.get(self.pos).map(|t| &t.token_type), Some(TokenType::Delim('|')))
            && self.type_follows(self.pos + 1)
    }

    fn type_follows(&self, pos: usize) -> bool {
        matches!(
            self.tokens.get(pos).map(|t| &t.token_type),
            Some(TokenType::Ident(_)) | Some(TokenType::Delim('*'))
        )
    }

    fn parse_attribute(&mut self) -> Result<Component> {
        self.skip_whitespace();
        let name = match self.advance().map(|t| &t.token_type) {
            Some(TokenType::Ident(name)) => name.clone(),
            _ => return Err(self.error("Expected attribute name")),
        };
        self.skip_whitespace();

        let operator = match self.advance().map(|t| &t.token_type) {
            Some(TokenType::RightBracket) => {
                return Ok(Component::Attribute(Attribute {
                    name,
                    operation: None,
                    flag: None,
                }))
            }
            Some(TokenType::Delim('=')) => AttrOperator::Equal,
            Some(TokenType::Delim(c @ ('~' | '|' | '^' | '$' | '*'))) => {
                let c = *c;
                if self.advance().map(|t| &t.token_type) != Some(&TokenType::Delim('=')) {
                    return Err(self.error("Expected '=' in attribute selector"));
                }
                match c {
                    '~' => AttrOperator::Includes,
                    '|' => AttrOperator::DashMatch,
                    '^' => AttrOperator::Prefix,
                    '$' => AttrOperator::Suffix,
                    _ => AttrOperator::Substring,
                }
            }
            _ => return Err(self.error("Invalid attribute selector")),
        };

        self.skip_whitespace();
        let value = match self.advance().map(|t| &t.token_type) {
            Some(TokenType::Ident(value)) | Some(TokenType::QuotedString(value)) => value.clone(),
            _ => return Err(self.error("Expected attribute value")),
        };
        self.skip_whitespace();

        let mut flag = None;
        if let Some(TokenType::Ident(f)) = self.peek().map(|t| &t.token_type) {
            flag = Some(f.to_ascii_lowercase());
            self.pos += 1;
            self.skip_whitespace();
        }

        match self.advance().map(|t| &t.token_type) {
            Some(TokenType::RightBracket) => Ok(Component::Attribute(Attribute {
                name,
                operation: Some((operator, value)),
                flag,
            })),
            _ => Err(self.error("Expected ']'")),
        }
    }

    fn parse_pseudo(&mut self) -> Result<Component> {
        let element = self.peek().map(|t| &t.token_type) == Some(&TokenType::Colon);
        if element {
            self.pos += 1;
        }

        let token = match self.advance() {
            Some(token) => token,
            None => return Err(self.error("Expected pseudo-class name")),
        };

        match &token.token_type {
            TokenType::Ident(name) => {
                let lower = name.to_ascii_lowercase();
                if element || LEGACY_PSEUDO_ELEMENTS.contains(&lower.as_str()) {
                    return Ok(Component::PseudoElement { name: lower, args: None });
                }
                if self.context.css_modules && (lower == "local" || lower == "global") {
                    self.pos -= 1;
                    return Err(self.error(format!(":{} requires a selector argument", lower)));
                }
                Ok(Component::PseudoClass(PseudoClass::Simple(lower)))
            }
            TokenType::Function(name) => {
                let lower = name.to_ascii_lowercase();
                let args = self.function_arguments()?;

                if element {
                    let args = self.raw_text(args);
                    return Ok(Component::PseudoElement { name: lower, args: Some(args) });
                }

                if SELECTOR_FUNCTIONS.contains(&lower.as_str()) {
                    let mut inner = SelectorParser {
                        tokens: args,
                        pos: 0,
                        context: self.context,
                        relative: lower == "has" || self.relative,
                    };
                    let list = inner.parse_list()?;
                    return Ok(Component::PseudoClass(PseudoClass::Selectors { name: lower, list }));
                }

                if self.context.css_modules && (lower == "local" || lower == "global") {
                    let mut inner = SelectorParser {
                        tokens: args,
                        pos: 0,
                        context: self.context,
                        relative: false,
                    };
                    let selector = Box::new(inner.parse_selector()?);
                    if inner.peek().is_some() {
                        return Err(inner.error(format!(":{}() takes a single selector", lower)));
                    }
                    return Ok(Component::PseudoClass(if lower == "local" {
                        PseudoClass::Local(selector)
                    } else {
                        PseudoClass::Global(selector)
                    }));
                }

                let args = self.raw_text(args);
                Ok(Component::PseudoClass(PseudoClass::Raw { name: lower, args }))
            }
            other => {
                self.pos -= 1;
                Err(self.error(format!("Unexpected token after ':': {}", other)))
            }
        }
    }

    /// Tokens up to the matching `)`, which is consumed.
    fn function_arguments(&mut self) -> Result<&'a [Token]> {
        let start = self.pos;
        let mut depth = 0usize;

        while let Some(token) = self.advance() {
            match token.token_type {
                TokenType::Function(_) | TokenType::LeftParen => depth += 1,
                TokenType::RightParen if depth == 0 => return Ok(&self.tokens[start..self.pos - 1]),
                TokenType::RightParen => depth -= 1,
                _ => {}
            }
        }
        Err(self.error("Unclosed function in selector"))
    }

    /// Source text of `tokens` with whitespace runs collapsed.
    fn raw_text(&self, tokens: &[Token]) -> String {
        let (first, last) = match (tokens.first(), tokens.last()) {
            (Some(first), Some(_)) => (first.offset, self.tokens[self.pos - 1].offset),
            _ => return String::new(),
        };
        self.context
            .source
            .get(first..last)
            .unwrap_or_default()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Selector {
    pub fn is_relative(&self) -> bool {
        self.0.first().map_or(false, Component::is_combinator)
    }

    /// A selector without combinators.
    pub fn is_compound(&self) -> bool {
        !self.0.iter().any(Component::is_combinator)
    }

    /// The class name when the selector is exactly one class.
    pub fn single_class(&self) -> Option<&str> {
        match self.0.as_slice() {
            [Component::Class(name)] => Some(name),
            _ => None,
        }
    }

    pub fn contains_nesting(&self) -> bool {
        self.0.iter().any(|component| match component {
            Component::Nesting => true,
            Component::PseudoClass(PseudoClass::Selectors { list, .. }) => {
                list.0.iter().any(Selector::contains_nesting)
            }
            _ => false,
        })
    }

    /// Visit every component, descending into selector arguments.
    pub fn walk(&self, f: &mut dyn FnMut(&Component)) {
        for component in &self.0 {
            f(component);
            match component {
                Component::PseudoClass(PseudoClass::Selectors { list, .. }) => {
                    list.0.iter().for_each(|s| s.walk(f))
                }
                Component::PseudoClass(PseudoClass::Local(inner))
                | Component::PseudoClass(PseudoClass::Global(inner)) => inner.walk(f),
                _ => {}
            }
        }
    }

    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Component)) {
        for component in self.0.iter_mut() {
            f(component);
            match component {
                Component::PseudoClass(PseudoClass::Selectors { list, .. }) => {
                    list.0.iter_mut().for_each(|s| s.walk_mut(f))
                }
                Component::PseudoClass(PseudoClass::Local(inner))
                | Component::PseudoClass(PseudoClass::Global(inner)) => inner.walk_mut(f),
                _ => {}
            }
        }
    }

    /// Resolve this nested selector against one parent selector.
    ///
    /// `&` is spliced in when it starts a compound or the parent is a single
    /// compound; otherwise it becomes `:is(parent)`. Without any `&` the
    /// parent is prepended as an ancestor.
    pub fn nest_within(&self, parent: &Selector) -> Selector {
        if !self.contains_nesting() {
            let mut components = parent.0.clone();
            if !self.is_relative() {
                components.push(Component::Combinator(Combinator::Descendant));
            }
            components.extend(self.0.iter().cloned());
            return Selector(components);
        }

        let mut components = Vec::with_capacity(self.0.len() + parent.0.len());
        for (i, component) in self.0.iter().enumerate() {
            match component {
                Component::Nesting => {
                    let at_compound_start = i == 0 || self.0[i - 1].is_combinator();
                    if at_compound_start || parent.is_compound() {
                        components.extend(parent.0.iter().cloned());
                    } else {
                        components.push(Component::PseudoClass(PseudoClass::Selectors {
                            name: "is".to_string(),
                            list: SelectorList(vec![parent.clone()]),
                        }));
                    }
                }
                Component::PseudoClass(PseudoClass::Selectors { name, list }) => {
                    let list = list
                        .0
                        .iter()
                        .map(|s| if s.contains_nesting() { s.nest_within(parent) } else { s.clone() })
                        .collect();
                    components.push(Component::PseudoClass(PseudoClass::Selectors {
                        name: name.clone(),
                        list: SelectorList(list),
                    }));
                }
                other => components.push(other.clone()),
            }
        }

        let mut selector = Selector(components);
        selector.normalize_compounds();
        selector
    }

    /// Move type selectors to the front of their compound.
    fn normalize_compounds(&mut self) {
        let mut start = 0;
        for i in 0..=self.0.len() {
            let boundary = i == self.0.len() || self.0[i].is_combinator();
            if boundary {
                let leading = self.0[start..i]
                    .iter()
                    .position(|c| c.is_type_like() || matches!(c, Component::Namespace(_)));
                if let Some(offset) = leading.filter(|offset| *offset > 0) {
                    let len = if matches!(self.0[start + offset], Component::Namespace(_)) { 2 } else { 1 };
                    let moved: Vec<Component> = self.0.drain(start + offset..start + offset + len).collect();
                    for (k, component) in moved.into_iter().enumerate() {
                        self.0.insert(start + k, component);
                    }
                }
                start = i + 1;
            }
        }
    }

    /// The vendor prefix of the selector's prefixed pseudo-classes and
    /// pseudo-elements, if any.
    pub fn vendor_prefix(&self) -> VendorPrefix {
        let mut prefix = VendorPrefix::NONE;
        self.walk(&mut |component| {
            let name = match component {
                Component::PseudoClass(PseudoClass::Simple(name))
                | Component::PseudoClass(PseudoClass::Selectors { name, .. })
                | Component::PseudoClass(PseudoClass::Raw { name, .. })
                | Component::PseudoElement { name, .. } => name,
                _ => return,
            };
            prefix.insert(VendorPrefix::strip(name).0);
        });
        prefix
    }

    /// Vendor-prefixed copies of this selector the targets need.
    pub fn vendor_variants(&self, targets: &Targets) -> Vec<Selector> {
        let mut needed = VendorPrefix::NONE;
        self.walk(&mut |component| {
            if let Some(feature) = pseudo_feature(component) {
                needed.insert(feature.prefixes(targets));
            }
        });

        let mut variants = Vec::new();
        for prefix in needed.iter() {
            let mut variant = self.clone();
            let mut complete = true;
            variant.walk_mut(&mut |component| {
                let feature = match pseudo_feature(component) {
                    Some(feature) => feature,
                    None => return,
                };
                match feature.prefixed_pseudo(prefix) {
                    Some((name, true)) => {
                        *component = Component::PseudoElement { name: name.to_string(), args: None }
                    }
                    Some((name, false)) => {
                        *component = Component::PseudoClass(PseudoClass::Simple(name.to_string()))
                    }
                    None => complete = false,
                }
            });
            if complete {
                variants.push(variant);
            }
        }
        variants
    }

    pub fn to_css(&self, minify: bool) -> String {
        let mut out = String::new();
        self.write(minify, &mut out);
        out
    }

    fn write(&self, minify: bool, out: &mut String) {
        for (i, component) in self.0.iter().enumerate() {
            match component {
                Component::Combinator(combinator) => {
                    let symbol = match combinator {
                        Combinator::Descendant => {
                            out.push(' ');
                            continue;
                        }
                        Combinator::Child => '>',
                        Combinator::NextSibling => '+',
                        Combinator::LaterSibling => '~',
                    };
                    if minify {
                        out.push(symbol);
                    } else {
                        if i > 0 {
                            out.push(' ');
                        }
                        out.push(symbol);
                        out.push(' ');
                    }
                }
                Component::Nesting => out.push('&'),
                Component::Universal => out.push('*'),
                Component::Namespace(prefix) => {
                    match prefix {
                        Some(name) => serialize_identifier_or_empty(name, out),
                        None => out.push('*'),
                    }
                    out.push('|');
                }
                Component::Type(name) => serialize_identifier(name, out),
                Component::Class(name) => {
                    out.push('.');
                    serialize_identifier(name, out);
                }
                Component::Id(name) => {
                    out.push('#');
                    serialize_identifier(name, out);
                }
                Component::Attribute(attribute) => {
                    out.push('[');
                    serialize_identifier(&attribute.name, out);
                    if let Some((operator, value)) = &attribute.operation {
                        out.push_str(operator.as_str());
                        serialize_string(value, out);
                    }
                    if let Some(flag) = &attribute.flag {
                        out.push(' ');
                        out.push_str(flag);
                    }
                    out.push(']');
                }
                Component::PseudoClass(pseudo) => {
                    out.push(':');
                    match pseudo {
                        PseudoClass::Simple(name) => serialize_identifier(name, out),
                        PseudoClass::Selectors { name, list } => {
                            serialize_identifier(name, out);
                            out.push('(');
                            list.write(minify, out);
                            out.push(')');
                        }
                        PseudoClass::Raw { name, args } => {
                            serialize_identifier(name, out);
                            out.push('(');
                            out.push_str(args);
                            out.push(')');
                        }
                        PseudoClass::Local(inner) | PseudoClass::Global(inner) => {
                            out.push_str(if matches!(pseudo, PseudoClass::Local(_)) {
                                "local("
                            } else {
                                "global("
                            });
                            inner.write(minify, out);
                            out.push(')');
                        }
                    }
                }
                Component::PseudoElement { name, args } => {
                    out.push_str("::");
                    serialize_identifier(name, out);
                    if let Some(args) = args {
                        out.push('(');
                        out.push_str(args);
                        out.push(')');
                    }
                }
            }
        }
    }
}

fn serialize_identifier_or_empty(name: &str, out: &mut String) {
    if !name.is_empty() {
        serialize_identifier(name, out);
    }
}

fn pseudo_feature(component: &Component) -> Option<PrefixFeature> {
    match component {
        Component::PseudoClass(PseudoClass::Simple(name)) => PrefixFeature::for_pseudo(name, false),
        Component::PseudoElement { name, args: None } => PrefixFeature::for_pseudo(name, true),
        _ => None,
    }
}

impl SelectorList {
    pub fn to_css(&self, minify: bool) -> String {
        let mut out = String::new();
        self.write(minify, &mut out);
        out
    }

    fn write(&self, minify: bool, out: &mut String) {
        for (i, selector) in self.0.iter().enumerate() {
            if i > 0 {
                out.push_str(if minify { "," } else { ", " });
            }
            selector.write(minify, out);
        }
    }

    pub fn contains_nesting(&self) -> bool {
        self.0.iter().any(Selector::contains_nesting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::targets::{Browser, Version};

    fn parse_with(input: &str, css_modules: bool, nested: bool) -> Result<SelectorList> {
        let tokens = tokenize(input);
        let context = SelectorContext {
            filename: "test.css",
            source: input,
            css_modules,
            nested,
        };
        parse_selector_list(&tokens, &context)
    }

    fn parse(input: &str) -> SelectorList {
        parse_with(input, false, false).unwrap()
    }

    #[test]
    fn test_serialization() {
        let list = parse("div.a  >  p#b:hover ,  a[href^='http' i]::before");
        assert_eq!(list.to_css(false), "div.a > p#b:hover, a[href^=\"http\" i]::before");
        assert_eq!(list.to_css(true), "div.a>p#b:hover,a[href^=\"http\" i]::before");
    }

    #[test]
    fn test_legacy_pseudo_elements() {
        let list = parse("p:after");
        assert_eq!(list.to_css(false), "p::after");
    }

    #[test]
    fn test_functional_pseudo_classes() {
        let list = parse("li:nth-child( 2n + 1 ):not(.a, .b)");
        assert_eq!(list.to_css(false), "li:nth-child(2n + 1):not(.a, .b)");
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(parse_with("", false, false).is_err());
        assert!(parse_with(".a >", false, false).is_err());
        assert!(parse_with(".a > > .b", false, false).is_err());
        assert!(parse_with("> .a", false, false).is_err());
        assert!(parse_with(".a,", false, false).is_err());
        assert!(parse_with("#1a", false, false).is_err());
        assert!(parse_with(".", false, false).is_err());
    }

    #[test]
    fn test_relative_selectors_when_nested() {
        let list = parse_with("> .child", false, true).unwrap();
        assert!(list.0[0].is_relative());
    }

    #[test]
    fn test_css_modules_pseudo_classes() {
        let list = parse_with(":global(.a) .b", true, false).unwrap();
        assert!(matches!(
            list.0[0].0[0],
            Component::PseudoClass(PseudoClass::Global(_))
        ));
        assert!(parse_with(":global .a", true, false).is_err());

        // Without CSS modules these are ordinary functional pseudo-classes.
        let list = parse_with(":global(.a)", false, false).unwrap();
        assert!(matches!(list.0[0].0[0], Component::PseudoClass(PseudoClass::Raw { .. })));
    }

    #[test]
    fn test_nest_within() {
        let parent = &parse(".a .b").0[0];

        let child = &parse_with("&:hover", false, true).unwrap().0[0];
        assert_eq!(child.nest_within(parent).to_css(false), ".a .b:hover");

        let child = &parse_with(".c", false, true).unwrap().0[0];
        assert_eq!(child.nest_within(parent).to_css(false), ".a .b .c");

        let child = &parse_with("> .c", false, true).unwrap().0[0];
        assert_eq!(child.nest_within(parent).to_css(false), ".a .b > .c");

        let child = &parse_with(".c&", false, true).unwrap().0[0];
        assert_eq!(child.nest_within(parent).to_css(false), ".c:is(.a .b)");

        let parent = &parse("div").0[0];
        let child = &parse_with(".c&", false, true).unwrap().0[0];
        assert_eq!(child.nest_within(parent).to_css(false), "div.c");
    }

    #[test]
    fn test_relative_selector_has_single_combinator() {
        let selector = &parse_with("> .c", false, true).unwrap().0[0];
        assert_eq!(
            selector.0,
            vec![Component::Combinator(Combinator::Child), Component::Class("c".to_string())]
        );
        assert_eq!(selector.to_css(false), "> .c");
    }

    #[test]
    fn test_namespace_prefixes() {
        let list = parse("*|a, ns|b, |c, svg|*");
        assert_eq!(list.0[1].0[0], Component::Namespace(Some("ns".to_string())));
        assert_eq!(list.0[0].0[0], Component::Namespace(None));
        assert_eq!(list.to_css(false), "*|a, ns|b, |c, svg|*");
        assert_eq!(list.to_css(true), "*|a,ns|b,|c,svg|*");

        let parent = &parse("ns|div").0[0];
        let child = &parse_with(".c&", false, true).unwrap().0[0];
        assert_eq!(child.nest_within(parent).to_css(false), "ns|div.c");
    }

    #[test]
    fn test_vendor_variants() {
        let mut targets = Targets::default();
        targets.set(Browser::Firefox, Some(Version::new(50, 0, 0)));
        targets.set(Browser::Safari, Some(Version::new(9, 0, 0)));

        let selector = &parse("input::placeholder").0[0];
        let variants: Vec<String> = selector
            .vendor_variants(&targets)
            .iter()
            .map(|s| s.to_css(false))
            .collect();
        assert_eq!(
            variants,
            vec!["input::-webkit-input-placeholder", "input::-moz-placeholder"]
        );
        assert_eq!(parse("::-moz-placeholder").0[0].vendor_prefix(), VendorPrefix::MOZ);
        assert!(parse("::placeholder").0[0].vendor_prefix().is_empty());
    }
}
