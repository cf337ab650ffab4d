//! Recursive descent parser for CSS stylesheets

use crate::ast::*;
use crate::css_modules::CssModulesConfig;
use crate::error::{CssError, Diagnostic, Result};
use crate::lexer::{tokenize, Token, TokenType};
use crate::selector::{parse_selector_list, Component, Selector, SelectorContext, SelectorList};
use crate::types::{Location, VendorPrefix};
use crate::values::{parse_value, to_css, ComponentValue, ValueFormat};
use crate::ParserOptions;

/// Tokens before a `{` or `;`.
struct Prelude {
    tokens: Vec<Token>,
    /// Offset of the terminating token
    end: usize,
    has_block: bool,
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    source: &'a str,
    options: &'a ParserOptions,
    diagnostics: Vec<Diagnostic>,
    license_comments: Vec<String>,
    /// Set once a rule that must follow `@import` has been seen
    seen_rules: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, options: &'a ParserOptions) -> Self {
        Self {
            tokens: tokenize(source),
            current: 0,
            source,
            options,
            diagnostics: Vec::new(),
            license_comments: Vec::new(),
            seen_rules: false,
        }
    }

    pub fn parse(mut self) -> Result<Stylesheet> {
        let css_modules = if self.options.css_modules {
            Some(CssModulesConfig::new(
                &self.options.css_modules_pattern,
                self.options.css_modules_dashed_idents,
            )?)
        } else {
            None
        };

        let mut rules = Vec::new();
        loop {
            match &self.peek().token_type {
                TokenType::Whitespace | TokenType::Cdo | TokenType::Cdc | TokenType::Semicolon => {
                    self.advance();
                    continue;
                }
                TokenType::Comment(text) => {
                    let text = text.clone();
                    self.advance();
                    if text.starts_with('!') {
                        self.license_comments.push(text);
                    }
                    continue;
                }
                TokenType::Eof => break,
                _ => {}
            }

            let start = self.current;
            match self.parse_rule(false) {
                Ok(Some(rule)) => rules.push(rule),
                Ok(None) => {}
                Err(error) => self.recover(error, start)?,
            }
        }

        log::trace!(
            "Parsed {} top-level rules with {} recovered errors",
            rules.len(),
            self.diagnostics.len()
        );

        let mut stylesheet = Stylesheet::new(self.options.filename.clone(), self.source);
        stylesheet.rules = rules;
        stylesheet.license_comments = self.license_comments;
        stylesheet.diagnostics = self.diagnostics;
        stylesheet.css_modules = css_modules;
        stylesheet.custom_media = self.options.custom_media;
        Ok(stylesheet)
    }

    /// Record `error` and skip the construct starting at `start`, or give
    /// up when error recovery is off.
    fn recover(&mut self, error: CssError, start: usize) -> Result<()> {
        if !self.options.error_recovery {
            return Err(error);
        }
        log::warn!("{}", error);
        self.diagnostics.push(Diagnostic::from_error(&error));
        self.current = start;
        self.skip_construct();
        if self.current == start && !self.is_at_end() {
            // A stray `}` with no block to close.
            self.advance();
        }
        Ok(())
    }

    /// Skip to the end of the current rule or declaration. A `}` closing
    /// the enclosing block is left in place.
    fn skip_construct(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.peek().token_type {
                TokenType::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenType::LeftBrace => depth += 1,
                TokenType::RightBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn filename(&self) -> &str {
        &self.options.filename
    }

    fn error_at(&self, loc: Location, message: impl Into<String>) -> CssError {
        CssError::parse(self.filename(), loc, message)
    }

    fn parse_rule(&mut self, nested: bool) -> Result<Option<CssRule>> {
        if matches!(self.peek().token_type, TokenType::AtKeyword(_)) {
            return self.parse_at_rule(nested);
        }

        if nested && !self.options.nesting {
            return Err(self.error_at(self.peek().location(), "Nested rules require the nesting option"));
        }
        self.seen_rules = true;
        self.parse_style_rule(nested).map(|rule| Some(CssRule::Style(rule)))
    }

    fn parse_style_rule(&mut self, nested: bool) -> Result<StyleRule> {
        let loc = self.peek().location();
        let prelude = self.collect_prelude()?;
        if !prelude.has_block {
            return Err(self.error_at(loc, "Expected '{' after selector"));
        }

        let selectors = self.parse_selectors(&prelude.tokens, nested)?;
        let (declarations, rules) = self.parse_block_contents(true)?;

        Ok(StyleRule {
            selectors,
            declarations,
            rules,
            loc,
        })
    }

    fn parse_selectors(&self, tokens: &[Token], nested: bool) -> Result<SelectorList> {
        let context = SelectorContext {
            filename: self.filename(),
            source: self.source,
            css_modules: self.options.css_modules,
            nested,
        };
        parse_selector_list(tokens, &context)
    }

    /// Collect prelude tokens up to a top-level `{` or `;`, consuming it.
    fn collect_prelude(&mut self) -> Result<Prelude> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;

        loop {
            let token = self.peek().clone();
            match token.token_type {
                TokenType::LeftBrace if depth == 0 => {
                    self.advance();
                    return Ok(Prelude {
                        tokens,
                        end: token.offset,
                        has_block: true,
                    });
                }
                TokenType::Semicolon if depth == 0 => {
                    self.advance();
                    return Ok(Prelude {
                        tokens,
                        end: token.offset,
                        has_block: false,
                    });
                }
                TokenType::RightBrace if depth == 0 => {
                    return Ok(Prelude {
                        tokens,
                        end: token.offset,
                        has_block: false,
                    });
                }
                TokenType::Eof => {
                    return Ok(Prelude {
                        tokens,
                        end: token.offset,
                        has_block: false,
                    });
                }
                TokenType::Function(_) | TokenType::LeftParen | TokenType::LeftBracket => depth += 1,
                TokenType::RightParen | TokenType::RightBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            tokens.push(token);
            self.advance();
        }
    }

    /// Parse declarations and nested rules up to and including the `}`.
    fn parse_block_contents(&mut self, style_rule: bool) -> Result<(Vec<Declaration>, Vec<CssRule>)> {
        let mut declarations = Vec::new();
        let mut rules = Vec::new();

        loop {
            match self.peek().token_type {
                TokenType::Whitespace | TokenType::Comment(_) | TokenType::Semicolon => {
                    self.advance();
                    continue;
                }
                TokenType::RightBrace => {
                    self.advance();
                    break;
                }
                TokenType::Eof => break,
                _ => {}
            }

            let start = self.current;
            let result = if matches!(self.peek().token_type, TokenType::AtKeyword(_)) || self.is_nested_rule_start() {
                if style_rule {
                    self.parse_rule(true).map(|rule| {
                        rules.extend(rule);
                    })
                } else {
                    Err(self.error_at(self.peek().location(), "Unexpected rule in declaration block"))
                }
            } else {
                self.parse_declaration().map(|declaration| declarations.push(declaration))
            };

            if let Err(error) = result {
                self.recover(error, start)?;
            }
        }

        Ok((declarations, rules))
    }

    /// A `{` before the next top-level `;` or `}` starts a nested rule.
    /// Custom properties are always declarations.
    fn is_nested_rule_start(&self) -> bool {
        if let TokenType::Ident(name) = &self.peek().token_type {
            if name.starts_with("--") {
                return false;
            }
        }

        let mut depth = 0usize;
        for token in &self.tokens[self.current..] {
            match token.token_type {
                TokenType::LeftBrace if depth == 0 => return true,
                TokenType::Semicolon | TokenType::RightBrace if depth == 0 => return false,
                TokenType::Function(_) | TokenType::LeftParen | TokenType::LeftBracket => depth += 1,
                TokenType::RightParen | TokenType::RightBracket => depth = depth.saturating_sub(1),
                TokenType::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_declaration(&mut self) -> Result<Declaration> {
        let name_token = self.advance().clone();
        let loc = name_token.location();
        let name = match name_token.token_type {
            TokenType::Ident(name) => name,
            other => return Err(self.error_at(loc, format!("Unexpected token: {}", other))),
        };

        while self.peek().is_whitespace_or_comment() {
            self.advance();
        }
        self.consume(TokenType::Colon, "Expected ':' after property name")?;

        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.peek().token_type {
                TokenType::Semicolon if depth == 0 => {
                    self.advance();
                    break;
                }
                TokenType::RightBrace if depth == 0 => break,
                TokenType::Eof => break,
                TokenType::Function(_) | TokenType::LeftParen | TokenType::LeftBracket | TokenType::LeftBrace => {
                    depth += 1
                }
                TokenType::RightParen | TokenType::RightBracket | TokenType::RightBrace => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            tokens.push(self.advance().clone());
        }

        let important = strip_important(&mut tokens);
        let custom = name.starts_with("--");
        if !custom && tokens.iter().all(Token::is_whitespace_or_comment) {
            return Err(self.error_at(loc, format!("Empty value for property '{}'", name)));
        }

        let value = parse_value(&tokens, self.filename(), &name)?;
        let property = if custom { name } else { name.to_ascii_lowercase() };

        Ok(Declaration {
            property,
            value,
            important,
            loc,
        })
    }

    fn parse_at_rule(&mut self, nested: bool) -> Result<Option<CssRule>> {
        let token = self.advance().clone();
        let loc = token.location();
        let name = match &token.token_type {
            TokenType::AtKeyword(name) => name.to_ascii_lowercase(),
            _ => return Err(self.error_at(loc, "Expected at-rule")),
        };
        let (prefix, unprefixed) = VendorPrefix::strip(&name);
        let unprefixed = unprefixed.to_string();

        if nested && !self.options.nesting {
            return Err(self.error_at(loc, "Nested rules require the nesting option"));
        }
        if nested && !matches!(unprefixed.as_str(), "media" | "supports" | "container" | "layer" | "nest") {
            return Err(self.error_at(loc, format!("@{} is not allowed inside a style rule", name)));
        }

        let prelude = self.collect_prelude()?;
        let values = |parser: &Self| parse_value(&prelude.tokens, parser.filename(), "");

        match unprefixed.as_str() {
            "charset" => {
                self.expect_statement(&prelude, &name, loc)?;
                Ok(None)
            }
            "import" => {
                if self.seen_rules {
                    return Err(self.error_at(loc, "@import must precede all other rules"));
                }
                self.expect_statement(&prelude, &name, loc)?;
                let import = self.parse_import(values(self)?, loc)?;
                Ok(Some(CssRule::Import(import)))
            }
            "namespace" => {
                self.expect_statement(&prelude, &name, loc)?;
                self.seen_rules = true;
                let values = values(self)?;
                let mut prefix = None;
                let mut url = None;
                for value in values.iter().filter(|v| !matches!(v, ComponentValue::Whitespace)) {
                    match value {
                        ComponentValue::Ident(ident) if prefix.is_none() && url.is_none() => {
                            prefix = Some(ident.clone())
                        }
                        ComponentValue::String(s) => url = Some(s.clone()),
                        ComponentValue::Url(u) => url = Some(u.url.clone()),
                        _ => return Err(self.error_at(loc, "Invalid @namespace rule")),
                    }
                }
                let url = url.ok_or_else(|| self.error_at(loc, "Expected URL in @namespace rule"))?;
                Ok(Some(CssRule::Namespace { prefix, url, loc }))
            }
            "media" | "supports" => {
                self.expect_block(&prelude, &name, loc)?;
                self.seen_rules = true;
                let prelude = values(self)?;
                if prelude.is_empty() && unprefixed == "supports" {
                    return Err(self.error_at(loc, "Expected condition after @supports"));
                }
                let rules = self.parse_group_body(nested)?;
                let group = GroupRule { prelude, rules, loc };
                Ok(Some(if unprefixed == "media" {
                    CssRule::Media(group)
                } else {
                    CssRule::Supports(group)
                }))
            }
            "container" => {
                self.expect_block(&prelude, &name, loc)?;
                self.seen_rules = true;
                let mut condition = values(self)?;
                let name = match condition.first() {
                    Some(ComponentValue::Ident(ident)) if !ident.eq_ignore_ascii_case("not") => {
                        let ident = ident.clone();
                        condition.remove(0);
                        if matches!(condition.first(), Some(ComponentValue::Whitespace)) {
                            condition.remove(0);
                        }
                        Some(ident)
                    }
                    _ => None,
                };
                let rules = self.parse_group_body(nested)?;
                Ok(Some(CssRule::Container(ContainerRule {
                    name,
                    condition,
                    rules,
                    loc,
                })))
            }
            "layer" => {
                let values = values(self)?;
                let names = layer_names(&values);
                if prelude.has_block {
                    self.seen_rules = true;
                    if names.len() > 1 {
                        return Err(self.error_at(loc, "A @layer block takes at most one name"));
                    }
                    let rules = self.parse_group_body(nested)?;
                    Ok(Some(CssRule::Layer(LayerRule {
                        name: names.into_iter().next(),
                        rules,
                        loc,
                    })))
                } else {
                    if names.is_empty() {
                        return Err(self.error_at(loc, "Expected layer name"));
                    }
                    Ok(Some(CssRule::LayerStatement { names, loc }))
                }
            }
            "keyframes" => {
                self.expect_block(&prelude, &name, loc)?;
                self.seen_rules = true;
                let keyframes_name = match values(self)?.as_slice() {
                    [ComponentValue::Ident(ident)] | [ComponentValue::String(ident)] => ident.clone(),
                    _ => return Err(self.error_at(loc, "Expected name after @keyframes")),
                };
                let keyframes = self.parse_keyframes()?;
                Ok(Some(CssRule::Keyframes(KeyframesRule {
                    name: keyframes_name,
                    prefix,
                    keyframes,
                    loc,
                })))
            }
            "font-face" | "page" | "property" => {
                self.expect_block(&prelude, &name, loc)?;
                self.seen_rules = true;
                let text = self.raw_prelude(&prelude);
                if unprefixed == "property" && !text.starts_with("--") {
                    return Err(self.error_at(loc, "Expected custom property name after @property"));
                }
                let (declarations, _) = self.parse_block_contents(false)?;
                let rule = DeclarationRule {
                    prelude: text,
                    declarations,
                    loc,
                };
                Ok(Some(match unprefixed.as_str() {
                    "font-face" => CssRule::FontFace(rule),
                    "page" => CssRule::Page(rule),
                    _ => CssRule::Property(rule),
                }))
            }
            "custom-media" => {
                if !self.options.custom_media {
                    return Err(self.error_at(loc, "@custom-media requires the custom_media option"));
                }
                self.expect_statement(&prelude, &name, loc)?;
                self.seen_rules = true;
                let values = values(self)?;
                match values.split_first() {
                    Some((ComponentValue::DashedIdent(reference), rest)) => {
                        let query: Vec<ComponentValue> = rest
                            .iter()
                            .skip_while(|v| matches!(v, ComponentValue::Whitespace))
                            .cloned()
                            .collect();
                        if query.is_empty() {
                            return Err(self.error_at(loc, "Expected media query in @custom-media"));
                        }
                        Ok(Some(CssRule::CustomMedia {
                            name: reference.ident.clone(),
                            query,
                            loc,
                        }))
                    }
                    _ => Err(self.error_at(loc, "Expected --name after @custom-media")),
                }
            }
            "nest" => {
                if !nested {
                    return Err(self.error_at(loc, "@nest is only allowed inside a style rule"));
                }
                self.expect_block(&prelude, &name, loc)?;
                let selectors = self.parse_selectors(&prelude.tokens, true)?;
                if !selectors.contains_nesting() {
                    return Err(self.error_at(loc, "@nest selectors must contain '&'"));
                }
                let (declarations, rules) = self.parse_block_contents(true)?;
                Ok(Some(CssRule::Nesting(StyleRule {
                    selectors,
                    declarations,
                    rules,
                    loc,
                })))
            }
            _ => {
                self.seen_rules = true;
                let text = self.raw_prelude(&prelude);
                let block = if prelude.has_block {
                    Some(self.raw_block())
                } else {
                    None
                };
                Ok(Some(CssRule::Unknown(UnknownAtRule {
                    name,
                    prelude: text,
                    block,
                    loc,
                })))
            }
        }
    }

    fn expect_statement(&self, prelude: &Prelude, name: &str, loc: Location) -> Result<()> {
        if prelude.has_block {
            return Err(self.error_at(loc, format!("@{} does not take a block", name)));
        }
        Ok(())
    }

    fn expect_block(&self, prelude: &Prelude, name: &str, loc: Location) -> Result<()> {
        if !prelude.has_block {
            return Err(self.error_at(loc, format!("Expected '{{' after @{}", name)));
        }
        Ok(())
    }

    /// Rules inside `@media`, `@supports`, `@container` or `@layer`. Inside
    /// a style rule, bare declarations apply to the parent via `&`.
    fn parse_group_body(&mut self, nested: bool) -> Result<Vec<CssRule>> {
        if nested {
            let loc = self.previous().location();
            let (declarations, mut rules) = self.parse_block_contents(true)?;
            if !declarations.is_empty() {
                rules.insert(
                    0,
                    CssRule::Style(StyleRule {
                        selectors: SelectorList(vec![Selector(vec![Component::Nesting])]),
                        declarations,
                        rules: Vec::new(),
                        loc,
                    }),
                );
            }
            return Ok(rules);
        }

        let mut rules = Vec::new();
        loop {
            match self.peek().token_type {
                TokenType::Whitespace | TokenType::Comment(_) | TokenType::Semicolon => {
                    self.advance();
                    continue;
                }
                TokenType::RightBrace => {
                    self.advance();
                    break;
                }
                TokenType::Eof => break,
                _ => {}
            }

            let start = self.current;
            match self.parse_rule(false) {
                Ok(Some(rule)) => rules.push(rule),
                Ok(None) => {}
                Err(error) => self.recover(error, start)?,
            }
        }
        Ok(rules)
    }

    fn parse_import(&self, values: Vec<ComponentValue>, loc: Location) -> Result<ImportRule> {
        let mut rest = trim_start(&values);

        let url = match rest.first() {
            Some(ComponentValue::String(url)) => url.clone(),
            Some(ComponentValue::Url(url)) => url.url.clone(),
            _ => return Err(self.error_at(loc, "Expected URL after @import")),
        };
        rest = trim_start(&rest[1..]);

        let mut layer = None;
        match rest.first() {
            Some(value) if value.is_ident("layer") => {
                layer = Some(String::new());
                rest = trim_start(&rest[1..]);
            }
            Some(ComponentValue::Function(function)) if function.name.eq_ignore_ascii_case("layer") => {
                layer = Some(to_css(&function.arguments, ValueFormat::default()));
                rest = trim_start(&rest[1..]);
            }
            _ => {}
        }

        let mut supports = None;
        if let Some(ComponentValue::Function(function)) = rest.first() {
            if function.name.eq_ignore_ascii_case("supports") {
                supports = Some(function.arguments.clone());
                rest = trim_start(&rest[1..]);
            }
        }

        Ok(ImportRule {
            url,
            layer,
            supports,
            media: rest.to_vec(),
            loc,
        })
    }

    fn parse_keyframes(&mut self) -> Result<Vec<Keyframe>> {
        let mut keyframes = Vec::new();
        loop {
            match self.peek().token_type {
                TokenType::Whitespace | TokenType::Comment(_) | TokenType::Semicolon => {
                    self.advance();
                    continue;
                }
                TokenType::RightBrace => {
                    self.advance();
                    break;
                }
                TokenType::Eof => break,
                _ => {}
            }

            let start = self.current;
            match self.parse_keyframe() {
                Ok(keyframe) => keyframes.push(keyframe),
                Err(error) => self.recover(error, start)?,
            }
        }
        Ok(keyframes)
    }

    fn parse_keyframe(&mut self) -> Result<Keyframe> {
        let loc = self.peek().location();
        let prelude = self.collect_prelude()?;
        if !prelude.has_block {
            return Err(self.error_at(loc, "Expected '{' after keyframe selector"));
        }

        let mut selectors = Vec::new();
        for token in prelude.tokens.iter().filter(|t| !t.is_whitespace_or_comment()) {
            let selector = match &token.token_type {
                TokenType::Comma => continue,
                TokenType::Ident(ident) if ident.eq_ignore_ascii_case("from") => KeyframeSelector::From,
                TokenType::Ident(ident) if ident.eq_ignore_ascii_case("to") => KeyframeSelector::To,
                TokenType::Percentage(p) if (0.0..=100.0).contains(p) => KeyframeSelector::Percentage(*p),
                other => {
                    return Err(self.error_at(token.location(), format!("Invalid keyframe selector: {}", other)))
                }
            };
            selectors.push(selector);
        }
        if selectors.is_empty() {
            return Err(self.error_at(loc, "Expected keyframe selector"));
        }

        let (declarations, _) = self.parse_block_contents(false)?;
        Ok(Keyframe {
            selectors,
            declarations,
        })
    }

    fn raw_prelude(&self, prelude: &Prelude) -> String {
        match prelude.tokens.first() {
            Some(first) => self
                .source
                .get(first.offset..prelude.end)
                .unwrap_or_default()
                .trim()
                .to_string(),
            None => String::new(),
        }
    }

    /// Skip a block whose `{` was consumed, returning its inner text.
    fn raw_block(&mut self) -> String {
        let start = self.peek().offset;
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.peek().token_type {
                TokenType::LeftBrace => depth += 1,
                TokenType::RightBrace if depth == 0 => {
                    let end = self.advance().offset;
                    return self.source.get(start..end).unwrap_or_default().trim().to_string();
                }
                TokenType::RightBrace => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        self.source.get(start..).unwrap_or_default().trim().to_string()
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            &self.peek().token_type == token_type
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(self.error_at(
                self.peek().location(),
                format!("{}, got {}", message, self.peek().token_type),
            ))
        }
    }
}

/// Remove a trailing `!important`, reporting whether it was there.
fn strip_important(tokens: &mut Vec<Token>) -> bool {
    let significant: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_whitespace_or_comment())
        .map(|(i, _)| i)
        .collect();

    if let [.., bang, last] = significant.as_slice() {
        let is_important = matches!(&tokens[*last].token_type, TokenType::Ident(i) if i.eq_ignore_ascii_case("important"));
        if is_important && tokens[*bang].token_type == TokenType::Delim('!') {
            tokens.truncate(*bang);
            return true;
        }
    }
    false
}

fn trim_start(values: &[ComponentValue]) -> &[ComponentValue] {
    let start = values
        .iter()
        .position(|v| !matches!(v, ComponentValue::Whitespace))
        .unwrap_or(values.len());
    &values[start..]
}

/// Comma-separated, possibly dotted, layer names.
fn layer_names(values: &[ComponentValue]) -> Vec<String> {
    values
        .split(|v| matches!(v, ComponentValue::Comma))
        .map(|segment| to_css(segment, ValueFormat::default()))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Parse `source` into a stylesheet.
pub fn parse_stylesheet(source: &str, options: &ParserOptions) -> Result<Stylesheet> {
    Parser::new(source, options).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ParserOptions {
        ParserOptions {
            filename: "test.css".to_string(),
            ..ParserOptions::default()
        }
    }

    fn parse(source: &str) -> Stylesheet {
        parse_stylesheet(source, &options()).unwrap()
    }

    #[test]
    fn test_parse_style_rule() {
        let sheet = parse(".a, .b > p { color: red; margin: 0 auto !important }");
        assert_eq!(sheet.rules.len(), 1);

        match &sheet.rules[0] {
            CssRule::Style(rule) => {
                assert_eq!(rule.selectors.0.len(), 2);
                assert_eq!(rule.declarations.len(), 2);
                assert_eq!(rule.declarations[0].property, "color");
                assert!(!rule.declarations[0].important);
                assert!(rule.declarations[1].important);
            }
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_property_names_are_lowercased_except_custom() {
        let sheet = parse("a { COLOR: red; --Brand: blue }");
        match &sheet.rules[0] {
            CssRule::Style(rule) => {
                assert_eq!(rule.declarations[0].property, "color");
                assert_eq!(rule.declarations[1].property, "--Brand");
            }
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_at_rules() {
        let sheet = parse(
            "@charset \"utf-8\";\n\
             @import url(base.css) layer(base) supports(display: grid) screen;\n\
             @layer reset, base;\n\
             @media (min-width: 600px) { .a { color: red } }\n\
             @keyframes spin { from { opacity: 0 } 50%, to { opacity: 1 } }\n\
             @font-face { font-family: Foo; src: url(foo.woff2) }\n\
             @unknown thing { whatever: 1 }",
        );

        assert_eq!(sheet.rules.len(), 6);
        match &sheet.rules[0] {
            CssRule::Import(import) => {
                assert_eq!(import.url, "base.css");
                assert_eq!(import.layer.as_deref(), Some("base"));
                assert!(import.supports.is_some());
                assert_eq!(import.media, vec![ComponentValue::Ident("screen".to_string())]);
            }
            other => panic!("Expected @import, got {:?}", other),
        }
        match &sheet.rules[1] {
            CssRule::LayerStatement { names, .. } => assert_eq!(names, &["reset", "base"]),
            other => panic!("Expected @layer statement, got {:?}", other),
        }
        match &sheet.rules[3] {
            CssRule::Keyframes(rule) => {
                assert_eq!(rule.name, "spin");
                assert_eq!(rule.keyframes.len(), 2);
                assert_eq!(
                    rule.keyframes[1].selectors,
                    vec![KeyframeSelector::Percentage(50.0), KeyframeSelector::To]
                );
            }
            other => panic!("Expected @keyframes, got {:?}", other),
        }
        match &sheet.rules[5] {
            CssRule::Unknown(rule) => {
                assert_eq!(rule.name, "unknown");
                assert_eq!(rule.prelude, "thing");
                assert_eq!(rule.block.as_deref(), Some("whatever: 1"));
            }
            other => panic!("Expected unknown at-rule, got {:?}", other),
        }
    }

    #[test]
    fn test_license_comments_are_kept() {
        let sheet = parse("/*! MIT */ /* dropped */ a { color: red }");
        assert_eq!(sheet.license_comments, vec!["! MIT ".to_string()]);
    }

    #[test]
    fn test_misplaced_import_is_error() {
        let err = parse_stylesheet("a { color: red } @import \"x.css\";", &options()).unwrap_err();
        match err {
            CssError::Parse { offset, .. } => assert_eq!(offset, 17),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_colon_is_error() {
        let err = parse_stylesheet("a { color red }", &options()).unwrap_err();
        assert!(matches!(err, CssError::Parse { .. }));
    }

    #[test]
    fn test_error_recovery_skips_bad_constructs() {
        let options = ParserOptions {
            error_recovery: true,
            ..options()
        };
        let sheet = parse_stylesheet(
            "a { color red; margin: 0 } .b > { color: blue } .c { color: green }",
            &options,
        )
        .unwrap();

        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.diagnostics.len(), 2);
        match &sheet.rules[0] {
            CssRule::Style(rule) => {
                assert_eq!(rule.declarations.len(), 1);
                assert_eq!(rule.declarations[0].property, "margin");
            }
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_error_recovery_skips_stray_closing_braces() {
        let options = ParserOptions {
            error_recovery: true,
            ..options()
        };
        let sheet = parse_stylesheet(".a{color:red;}}.b{x:y}", &options).unwrap();
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.diagnostics.len(), 1);

        let sheet = parse_stylesheet("}}}", &options).unwrap();
        assert!(sheet.rules.is_empty());
        assert_eq!(sheet.diagnostics.len(), 3);

        let sheet = parse_stylesheet("@media screen { .a{x:y} } } .b{x:y}", &options).unwrap();
        assert_eq!(sheet.rules.len(), 2);
    }

    #[test]
    fn test_nesting_requires_option() {
        let source = ".a { color: red; .b { color: blue } }";
        assert!(parse_stylesheet(source, &options()).is_err());

        let options = ParserOptions {
            nesting: true,
            ..options()
        };
        let sheet = parse_stylesheet(source, &options).unwrap();
        match &sheet.rules[0] {
            CssRule::Style(rule) => {
                assert_eq!(rule.declarations.len(), 1);
                assert_eq!(rule.rules.len(), 1);
            }
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_nested_media_wraps_declarations() {
        let options = ParserOptions {
            nesting: true,
            ..options()
        };
        let sheet = parse_stylesheet(".a { @media (min-width: 1px) { color: red } }", &options).unwrap();
        match &sheet.rules[0] {
            CssRule::Style(rule) => match &rule.rules[0] {
                CssRule::Media(media) => match &media.rules[0] {
                    CssRule::Style(inner) => assert_eq!(inner.selectors.to_css(false), "&"),
                    _ => panic!("Expected nested style rule"),
                },
                _ => panic!("Expected nested @media"),
            },
            _ => panic!("Expected style rule"),
        }
    }

    #[test]
    fn test_custom_media_requires_option() {
        let source = "@custom-media --small (max-width: 30em);";
        assert!(parse_stylesheet(source, &options()).is_err());

        let options = ParserOptions {
            custom_media: true,
            ..options()
        };
        let sheet = parse_stylesheet(source, &options).unwrap();
        assert!(matches!(&sheet.rules[0], CssRule::CustomMedia { name, .. } if name == "--small"));
    }

    #[test]
    fn test_empty_value_is_error() {
        assert!(parse_stylesheet("a { color: ; }", &options()).is_err());
        assert!(parse_stylesheet("a { --empty: ; }", &options()).is_ok());
    }
}
