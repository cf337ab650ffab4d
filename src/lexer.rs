//! Lexical analysis for CSS source code

use crate::types::Location;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Names
    Ident(String),
    Function(String),
    AtKeyword(String),
    Hash { value: String, is_id: bool },

    // Literals
    QuotedString(String),
    BadString,
    Url(String),
    BadUrl,
    Number { value: f64, is_int: bool },
    Percentage(f64),
    Dimension { value: f64, is_int: bool, unit: String },
    /// `U+0025-00FF`, only recognised in a `unicode-range` value
    UnicodeRange(String),
    Delim(char),

    // Punctuation
    Colon,        // :
    Semicolon,    // ;
    Comma,        // ,
    LeftBracket,  // [
    RightBracket, // ]
    LeftParen,    // (
    RightParen,   // )
    LeftBrace,    // {
    RightBrace,   // }

    // Special
    Whitespace,
    Cdo, // <!--
    Cdc, // -->
    Comment(String),
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn location(&self) -> Location {
        Location::new(self.offset, self.line, self.column)
    }

    pub fn is_whitespace_or_comment(&self) -> bool {
        matches!(self.token_type, TokenType::Whitespace | TokenType::Comment(_))
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Ident(name) => write!(f, "identifier({})", name),
            TokenType::Function(name) => write!(f, "function({}()", name),
            TokenType::AtKeyword(name) => write!(f, "@{}", name),
            TokenType::Hash { value, .. } => write!(f, "#{}", value),
            TokenType::QuotedString(s) => write!(f, "string(\"{}\")", s),
            TokenType::BadString => write!(f, "unterminated string"),
            TokenType::Url(url) => write!(f, "url({})", url),
            TokenType::BadUrl => write!(f, "malformed url()"),
            TokenType::UnicodeRange(range) => write!(f, "unicode-range({})", range),
            TokenType::Number { value, .. } => write!(f, "number({})", value),
            TokenType::Percentage(value) => write!(f, "percentage({}%)", value),
            TokenType::Dimension { value, unit, .. } => write!(f, "dimension({}{})", value, unit),
            TokenType::Delim(c) => write!(f, "'{}'", c),
            TokenType::Colon => write!(f, ":"),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::Comma => write!(f, ","),
            TokenType::LeftBracket => write!(f, "["),
            TokenType::RightBracket => write!(f, "]"),
            TokenType::LeftParen => write!(f, "("),
            TokenType::RightParen => write!(f, ")"),
            TokenType::LeftBrace => write!(f, "{{"),
            TokenType::RightBrace => write!(f, "}}"),
            TokenType::Whitespace => write!(f, "whitespace"),
            TokenType::Cdo => write!(f, "<!--"),
            TokenType::Cdc => write!(f, "-->"),
            TokenType::Comment(_) => write!(f, "comment"),
            TokenType::Eof => write!(f, "EOF"),
        }
    }
}

/// CSS tokenizer.
///
/// Newlines are normalised (`\r\n`, `\r` and form feed become `\n`) and NUL
/// becomes U+FFFD, but every token keeps the byte offset it had in the
/// original input.
pub struct Lexer {
    input: Vec<(char, usize)>,
    end_offset: usize,
    position: usize,
    line: u32,
    column: u32,
    in_unicode_range: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let mut chars = Vec::with_capacity(input.len());
        let mut iter = input.char_indices().peekable();
        while let Some((offset, ch)) = iter.next() {
            let ch = match ch {
                '\r' => {
                    if matches!(iter.peek(), Some((_, '\n'))) {
                        iter.next();
                    }
                    '\n'
                }
                '\x0C' => '\n',
                '\0' => '\u{FFFD}',
                other => other,
            };
            chars.push((ch, offset));
        }

        Self {
            input: chars,
            end_offset: input.len(),
            position: 0,
            line: 0,
            column: 0,
            in_unicode_range: false,
        }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut last_significant: Option<usize> = None;

        while !self.is_at_end() {
            let token = self.next_token();
            match &token.token_type {
                TokenType::Colon => {
                    self.in_unicode_range = matches!(
                        last_significant.map(|i| &tokens[i].token_type),
                        Some(TokenType::Ident(name)) if name.eq_ignore_ascii_case("unicode-range")
                    );
                }
                TokenType::Semicolon | TokenType::LeftBrace | TokenType::RightBrace => {
                    self.in_unicode_range = false;
                }
                _ => {}
            }
            if !token.is_whitespace_or_comment() {
                last_significant = Some(tokens.len());
            }
            tokens.push(token);
        }

        tokens.push(Token {
            token_type: TokenType::Eof,
            offset: self.end_offset,
            line: self.line,
            column: self.column,
        });

        tokens
    }

    fn next_token(&mut self) -> Token {
        let offset = self.current_offset();
        let line = self.line;
        let column = self.column;

        let token_type = self.consume_token();

        Token {
            token_type,
            offset,
            line,
            column,
        }
    }

    fn consume_token(&mut self) -> TokenType {
        let ch = match self.peek(0) {
            Some(ch) => ch,
            None => return TokenType::Eof,
        };

        if self.in_unicode_range && self.starts_unicode_range() {
            return self.consume_unicode_range();
        }

        match ch {
            c if is_whitespace(c) => {
                while self.peek(0).map_or(false, is_whitespace) {
                    self.advance();
                }
                TokenType::Whitespace
            }
            '"' | '\'' => {
                self.advance();
                self.consume_string(ch)
            }
            '#' => {
                self.advance();
                let next = self.peek(0);
                if next.map_or(false, is_name_char) || self.is_valid_escape_at(0) {
                    let is_id = self.would_start_identifier_at(0);
                    let value = self.consume_name();
                    TokenType::Hash { value, is_id }
                } else {
                    TokenType::Delim('#')
                }
            }
            '(' => self.single(TokenType::LeftParen),
            ')' => self.single(TokenType::RightParen),
            '[' => self.single(TokenType::LeftBracket),
            ']' => self.single(TokenType::RightBracket),
            '{' => self.single(TokenType::LeftBrace),
            '}' => self.single(TokenType::RightBrace),
            ',' => self.single(TokenType::Comma),
            ':' => self.single(TokenType::Colon),
            ';' => self.single(TokenType::Semicolon),
            '+' | '.' => {
                if self.starts_number_at(0) {
                    self.consume_numeric()
                } else {
                    self.single(TokenType::Delim(ch))
                }
            }
            '-' => {
                if self.starts_number_at(0) {
                    self.consume_numeric()
                } else if self.peek(1) == Some('-') && self.peek(2) == Some('>') {
                    self.advance_by(3);
                    TokenType::Cdc
                } else if self.would_start_identifier_at(0) {
                    self.consume_ident_like()
                } else {
                    self.single(TokenType::Delim('-'))
                }
            }
            '<' => {
                if self.peek(1) == Some('!') && self.peek(2) == Some('-') && self.peek(3) == Some('-') {
                    self.advance_by(4);
                    TokenType::Cdo
                } else {
                    self.single(TokenType::Delim('<'))
                }
            }
            '@' => {
                self.advance();
                if self.would_start_identifier_at(0) {
                    TokenType::AtKeyword(self.consume_name())
                } else {
                    TokenType::Delim('@')
                }
            }
            '\\' => {
                if self.is_valid_escape_at(0) {
                    self.consume_ident_like()
                } else {
                    self.single(TokenType::Delim('\\'))
                }
            }
            '/' if self.peek(1) == Some('*') => {
                self.advance_by(2);
                self.consume_comment()
            }
            c if c.is_ascii_digit() => self.consume_numeric(),
            c if is_name_start(c) => self.consume_ident_like(),
            _ => self.single(TokenType::Delim(ch)),
        }
    }

    fn single(&mut self, token_type: TokenType) -> TokenType {
        self.advance();
        token_type
    }

    fn consume_comment(&mut self) -> TokenType {
        let mut text = String::new();
        while let Some(ch) = self.peek(0) {
            if ch == '*' && self.peek(1) == Some('/') {
                self.advance_by(2);
                return TokenType::Comment(text);
            }
            text.push(ch);
            self.advance();
        }
        // Unterminated comments run to the end of input.
        TokenType::Comment(text)
    }

    fn consume_string(&mut self, quote: char) -> TokenType {
        let mut value = String::new();

        while let Some(ch) = self.peek(0) {
            match ch {
                c if c == quote => {
                    self.advance();
                    return TokenType::QuotedString(value);
                }
                '\n' => return TokenType::BadString,
                '\\' => {
                    match self.peek(1) {
                        None => {
                            self.advance();
                        }
                        Some('\n') => {
                            self.advance_by(2);
                        }
                        Some(_) => {
                            self.advance();
                            value.push(self.consume_escape());
                        }
                    }
                }
                _ => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        TokenType::QuotedString(value)
    }

    fn consume_numeric(&mut self) -> TokenType {
        let (value, is_int) = self.consume_number();

        if self.would_start_identifier_at(0) {
            let unit = self.consume_name();
            TokenType::Dimension { value, is_int, unit }
        } else if self.peek(0) == Some('%') {
            self.advance();
            TokenType::Percentage(value)
        } else {
            TokenType::Number { value, is_int }
        }
    }

    fn consume_number(&mut self) -> (f64, bool) {
        let mut repr = String::new();
        let mut is_int = true;

        if let Some(sign @ ('+' | '-')) = self.peek(0) {
            if sign == '-' {
                repr.push('-');
            }
            self.advance();
        }

        while let Some(ch) = self.peek(0).filter(|c| c.is_ascii_digit()) {
            repr.push(ch);
            self.advance();
        }

        if self.peek(0) == Some('.') && self.peek(1).map_or(false, |c| c.is_ascii_digit()) {
            is_int = false;
            if repr.is_empty() || repr == "-" {
                repr.push('0');
            }
            repr.push('.');
            self.advance();
            while let Some(ch) = self.peek(0).filter(|c| c.is_ascii_digit()) {
                repr.push(ch);
                self.advance();
            }
        }

        if let Some('e' | 'E') = self.peek(0) {
            let exponent_len = match (self.peek(1), self.peek(2)) {
                (Some(d), _) if d.is_ascii_digit() => Some(1),
                (Some('+' | '-'), Some(d)) if d.is_ascii_digit() => Some(2),
                _ => None,
            };
            if let Some(len) = exponent_len {
                is_int = false;
                repr.push('e');
                self.advance();
                if len == 2 {
                    if let Some(sign) = self.peek(0) {
                        repr.push(sign);
                    }
                    self.advance();
                }
                while let Some(ch) = self.peek(0).filter(|c| c.is_ascii_digit()) {
                    repr.push(ch);
                    self.advance();
                }
            }
        }

        let value = repr.parse::<f64>().unwrap_or(0.0);
        (value, is_int)
    }

    fn consume_ident_like(&mut self) -> TokenType {
        let name = self.consume_name();

        if self.peek(0) != Some('(') {
            return TokenType::Ident(name);
        }
        self.advance();

        if !name.eq_ignore_ascii_case("url") {
            return TokenType::Function(name);
        }

        // url( followed by a quoted string is an ordinary function token.
        let mut lookahead = 0;
        while self.peek(lookahead).map_or(false, is_whitespace) {
            lookahead += 1;
        }
        match self.peek(lookahead) {
            Some('"') | Some('\'') => TokenType::Function(name),
            _ => {
                self.advance_by(lookahead);
                self.consume_url()
            }
        }
    }

    fn consume_url(&mut self) -> TokenType {
        let mut url = String::new();

        loop {
            let ch = match self.peek(0) {
                Some(ch) => ch,
                None => return TokenType::Url(url),
            };

            match ch {
                ')' => {
                    self.advance();
                    return TokenType::Url(url);
                }
                c if is_whitespace(c) => {
                    while self.peek(0).map_or(false, is_whitespace) {
                        self.advance();
                    }
                    match self.peek(0) {
                        Some(')') => {
                            self.advance();
                            return TokenType::Url(url);
                        }
                        None => return TokenType::Url(url),
                        Some(_) => {
                            self.consume_bad_url_remnants();
                            return TokenType::BadUrl;
                        }
                    }
                }
                '"' | '\'' | '(' => {
                    self.consume_bad_url_remnants();
                    return TokenType::BadUrl;
                }
                c if is_non_printable(c) => {
                    self.consume_bad_url_remnants();
                    return TokenType::BadUrl;
                }
                '\\' => {
                    if self.is_valid_escape_at(0) {
                        self.advance();
                        url.push(self.consume_escape());
                    } else {
                        self.consume_bad_url_remnants();
                        return TokenType::BadUrl;
                    }
                }
                _ => {
                    url.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn consume_bad_url_remnants(&mut self) {
        while let Some(ch) = self.peek(0) {
            if ch == ')' {
                self.advance();
                return;
            }
            if self.is_valid_escape_at(0) {
                self.advance();
                self.consume_escape();
            } else {
                self.advance();
            }
        }
    }

    fn consume_name(&mut self) -> String {
        let mut name = String::new();

        loop {
            match self.peek(0) {
                Some(ch) if is_name_char(ch) => {
                    name.push(ch);
                    self.advance();
                }
                Some('\\') if self.is_valid_escape_at(0) => {
                    self.advance();
                    name.push(self.consume_escape());
                }
                _ => return name,
            }
        }
    }

    /// Consume an escape sequence; the backslash is already consumed.
    fn consume_escape(&mut self) -> char {
        let ch = match self.peek(0) {
            Some(ch) => ch,
            None => return '\u{FFFD}',
        };

        if !ch.is_ascii_hexdigit() {
            self.advance();
            return ch;
        }

        let mut hex = String::new();
        while hex.len() < 6 {
            match self.peek(0) {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.advance();
                }
                _ => break,
            }
        }
        if self.peek(0).map_or(false, is_whitespace) {
            self.advance();
        }

        u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|&code| code != 0)
            .and_then(char::from_u32)
            .unwrap_or('\u{FFFD}')
    }

    fn is_valid_escape_at(&self, n: usize) -> bool {
        self.peek(n) == Some('\\') && self.peek(n + 1).map_or(false, |c| c != '\n')
    }

    fn would_start_identifier_at(&self, n: usize) -> bool {
        match self.peek(n) {
            Some('-') => match self.peek(n + 1) {
                Some(c) if is_name_start(c) || c == '-' => true,
                Some('\\') => self.is_valid_escape_at(n + 1),
                _ => false,
            },
            Some(c) if is_name_start(c) => true,
            Some('\\') => self.is_valid_escape_at(n),
            _ => false,
        }
    }

    fn starts_number_at(&self, n: usize) -> bool {
        match self.peek(n) {
            Some('+' | '-') => match self.peek(n + 1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('.') => self.peek(n + 2).map_or(false, |c| c.is_ascii_digit()),
                _ => false,
            },
            Some('.') => self.peek(n + 1).map_or(false, |c| c.is_ascii_digit()),
            Some(c) => c.is_ascii_digit(),
            None => false,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let (ch, _) = *self.input.get(self.position)?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn starts_unicode_range(&self) -> bool {
        matches!(self.peek(0), Some('u' | 'U'))
            && self.peek(1) == Some('+')
            && self.peek(2).map_or(false, |c| c.is_ascii_hexdigit() || c == '?')
    }

    /// `U+` followed by up to six hex digits or `?` wildcards, optionally
    /// followed by `-` and an end point.
    fn consume_unicode_range(&mut self) -> TokenType {
        self.advance_by(2);
        let mut range = String::from("U+");

        let mut digits = 0;
        while digits < 6 && self.peek(0).map_or(false, |c| c.is_ascii_hexdigit()) {
            range.extend(self.advance());
            digits += 1;
        }
        let mut wildcard = false;
        while digits < 6 && self.peek(0) == Some('?') {
            range.extend(self.advance());
            digits += 1;
            wildcard = true;
        }

        if !wildcard && self.peek(0) == Some('-') && self.peek(1).map_or(false, |c| c.is_ascii_hexdigit()) {
            range.extend(self.advance());
            let mut digits = 0;
            while digits < 6 && self.peek(0).map_or(false, |c| c.is_ascii_hexdigit()) {
                range.extend(self.advance());
                digits += 1;
            }
        }

        TokenType::UnicodeRange(range)
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn peek(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).map(|(ch, _)| *ch)
    }

    fn current_offset(&self) -> usize {
        self.input
            .get(self.position)
            .map(|(_, offset)| *offset)
            .unwrap_or(self.end_offset)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n')
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || !ch.is_ascii()
}

fn is_name_char(ch: char) -> bool {
    is_name_start(ch) || ch.is_ascii_digit() || ch == '-'
}

fn is_non_printable(ch: char) -> bool {
    matches!(ch, '\u{0}'..='\u{8}' | '\u{B}' | '\u{E}'..='\u{1F}' | '\u{7F}')
}

/// Tokenize `input`, dropping nothing.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(input: &str) -> Vec<TokenType> {
        tokenize(input).into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_basic_tokens() {
        let tokens = types("{ } : ; , ( ) [ ]");
        let significant: Vec<_> = tokens
            .into_iter()
            .filter(|t| *t != TokenType::Whitespace)
            .collect();

        assert_eq!(
            significant,
            vec![
                TokenType::LeftBrace,
                TokenType::RightBrace,
                TokenType::Colon,
                TokenType::Semicolon,
                TokenType::Comma,
                TokenType::LeftParen,
                TokenType::RightParen,
                TokenType::LeftBracket,
                TokenType::RightBracket,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers_and_units() {
        let tokens = types("42 3.5px 50% -.5em 1e3");

        assert_eq!(tokens[0], TokenType::Number { value: 42.0, is_int: true });
        assert_eq!(
            tokens[2],
            TokenType::Dimension { value: 3.5, is_int: false, unit: "px".to_string() }
        );
        assert_eq!(tokens[4], TokenType::Percentage(50.0));
        assert_eq!(
            tokens[6],
            TokenType::Dimension { value: -0.5, is_int: false, unit: "em".to_string() }
        );
        assert_eq!(tokens[8], TokenType::Number { value: 1000.0, is_int: false });
    }

    #[test]
    fn test_idents_functions_and_at_keywords() {
        let tokens = types("@media rgb( --custom -webkit-box");

        assert_eq!(tokens[0], TokenType::AtKeyword("media".to_string()));
        assert_eq!(tokens[2], TokenType::Function("rgb".to_string()));
        assert_eq!(tokens[4], TokenType::Ident("--custom".to_string()));
        assert_eq!(tokens[6], TokenType::Ident("-webkit-box".to_string()));
    }

    #[test]
    fn test_hash_tokens() {
        let tokens = types("#main #123");

        assert_eq!(tokens[0], TokenType::Hash { value: "main".to_string(), is_id: true });
        assert_eq!(tokens[2], TokenType::Hash { value: "123".to_string(), is_id: false });
    }

    #[test]
    fn test_string_escaping() {
        let tokens = types(r#""a\"b" 'c\41 d'"#);

        assert_eq!(tokens[0], TokenType::QuotedString("a\"b".to_string()));
        assert_eq!(tokens[2], TokenType::QuotedString("cAd".to_string()));
    }

    #[test]
    fn test_unterminated_string_is_bad_string() {
        let tokens = types("\"abc\ndef");
        assert_eq!(tokens[0], TokenType::BadString);
    }

    #[test]
    fn test_urls() {
        let tokens = types("url(foo.png) url( \"bar.png\" ) url(a b)");

        assert_eq!(tokens[0], TokenType::Url("foo.png".to_string()));
        assert_eq!(tokens[2], TokenType::Function("url".to_string()));
        assert!(tokens.contains(&TokenType::BadUrl));
    }

    #[test]
    fn test_escaped_identifier() {
        let tokens = types(r".a\:b");
        assert_eq!(tokens[0], TokenType::Delim('.'));
        assert_eq!(tokens[1], TokenType::Ident("a:b".to_string()));
    }

    #[test]
    fn test_comments() {
        let tokens = types("/* hello */a");
        assert_eq!(tokens[0], TokenType::Comment(" hello ".to_string()));
        assert_eq!(tokens[1], TokenType::Ident("a".to_string()));
    }

    #[test]
    fn test_unicode_range_tokens() {
        let tokens = types("unicode-range: U+0025-00FF, u+4??, U+1F600");
        let ranges: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t {
                TokenType::UnicodeRange(range) => Some(range.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ranges, vec!["U+0025-00FF", "U+4??", "U+1F600"]);
    }

    #[test]
    fn test_unicode_range_needs_declaration_context() {
        let tokens = types("u+a { unicode-range: U+0-7F; } u+b");
        assert_eq!(tokens[0], TokenType::Ident("u".to_string()));
        assert_eq!(tokens[1], TokenType::Delim('+'));
        assert_eq!(tokens.iter().filter(|t| matches!(t, TokenType::UnicodeRange(_))).count(), 1);
        assert!(tokens.contains(&TokenType::Ident("b".to_string())));
    }

    #[test]
    fn test_cdo_cdc() {
        let tokens = types("<!-- -->");
        assert_eq!(tokens[0], TokenType::Cdo);
        assert_eq!(tokens[2], TokenType::Cdc);
    }

    #[test]
    fn test_offsets_and_lines_track_original_input() {
        let tokens = tokenize("a\r\n  é b");

        assert_eq!(tokens[0].offset, 0);
        let e = tokens
            .iter()
            .find(|t| t.token_type == TokenType::Ident("é".to_string()))
            .unwrap();
        assert_eq!(e.offset, 5);
        assert_eq!(e.line, 1);
        assert_eq!(e.column, 2);

        let b = tokens
            .iter()
            .find(|t| t.token_type == TokenType::Ident("b".to_string()))
            .unwrap();
        assert_eq!(b.offset, 8);
        assert_eq!(tokens.last().unwrap().offset, 9);
    }
}
