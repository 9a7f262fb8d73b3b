// File: src/scanner.rs
//
// Lazy, restartable lexer. `Scanner::next_token` is pulled one token
// at a time by the compiler (no token vector is ever materialized),
// matching `original_source/lox/src/scanner.c`. `ruff/src/lexer.rs`
// eagerly tokenizes the whole source into a `Vec<Token>`; that shape
// doesn't fit a single-pass Pratt compiler that wants to peek one
// token ahead and no further, so this module is written directly
// against clox's scanner instead, using a `Peekable<CharIndices>`
// iterator in place of clox's raw pointer arithmetic.

use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Single-character
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    // One or two character
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    // Literals
    Identifier,
    String,
    Number,
    // Keywords
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,
    // Control
    Error,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub line: u32,
}

pub struct Scanner<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    start: usize,
    current: usize,
    line: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Scanner { source, chars: source.char_indices().peekable(), start: 0, current: 0, line: 1 }
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn advance(&mut self) -> char {
        let (idx, c) = self.chars.next().expect("advance past end");
        self.current = idx + c.len_utf8();
        c
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.peek().map(|&(_, c)| c)
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make(&self, kind: TokenKind) -> Token<'a> {
        Token { kind, lexeme: &self.source[self.start..self.current], line: self.line }
    }

    fn error(&self, message: &'static str) -> Token<'a> {
        Token { kind: TokenKind::Error, lexeme: message, line: self.line }
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\r') | Some('\t') => {
                    self.advance();
                }
                Some('\n') => {
                    self.line += 1;
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while self.peek() != Some('\n') && !self.is_at_end() {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> Token<'a> {
        while self.peek() != Some('"') && !self.is_at_end() {
            if self.peek() == Some('\n') {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            return self.error("Unterminated string.");
        }
        self.advance(); // closing quote
        self.make(TokenKind::String)
    }

    fn number(&mut self) -> Token<'a> {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek_next(), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        self.make(TokenKind::Number)
    }

    fn identifier(&mut self) -> Token<'a> {
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        let text = &self.source[self.start..self.current];
        self.make(keyword_kind(text))
    }

    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make(TokenKind::Eof);
        }

        let c = self.advance();

        if c.is_ascii_alphabetic() || c == '_' {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }

        match c {
            '(' => self.make(TokenKind::LeftParen),
            ')' => self.make(TokenKind::RightParen),
            '{' => self.make(TokenKind::LeftBrace),
            '}' => self.make(TokenKind::RightBrace),
            ';' => self.make(TokenKind::Semicolon),
            ',' => self.make(TokenKind::Comma),
            '.' => self.make(TokenKind::Dot),
            '-' => self.make(TokenKind::Minus),
            '+' => self.make(TokenKind::Plus),
            '/' => self.make(TokenKind::Slash),
            '*' => self.make(TokenKind::Star),
            '!' => {
                let k = if self.matches('=') { TokenKind::BangEqual } else { TokenKind::Bang };
                self.make(k)
            }
            '=' => {
                let k = if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
                self.make(k)
            }
            '<' => {
                let k = if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.make(k)
            }
            '>' => {
                let k =
                    if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.make(k)
            }
            '"' => self.string(),
            _ => self.error("Unexpected character."),
        }
    }
}

/// Classify an identifier as a keyword via a small character trie
/// (one branch per matching prefix character), same shape as clox's
/// hand-rolled `identifierType` switch.
fn keyword_kind(text: &str) -> TokenKind {
    let mut chars = text.chars();
    match chars.next() {
        Some('a') => rest(chars.as_str(), "nd", TokenKind::And),
        Some('c') => rest(chars.as_str(), "lass", TokenKind::Class),
        Some('e') => rest(chars.as_str(), "lse", TokenKind::Else),
        Some('f') => match chars.next() {
            Some('a') => rest(chars.as_str(), "lse", TokenKind::False),
            Some('o') => rest(chars.as_str(), "r", TokenKind::For),
            Some('u') => rest(chars.as_str(), "n", TokenKind::Fun),
            _ => TokenKind::Identifier,
        },
        Some('i') => rest(chars.as_str(), "f", TokenKind::If),
        Some('n') => rest(chars.as_str(), "il", TokenKind::Nil),
        Some('o') => rest(chars.as_str(), "r", TokenKind::Or),
        Some('p') => rest(chars.as_str(), "rint", TokenKind::Print),
        Some('r') => rest(chars.as_str(), "eturn", TokenKind::Return),
        Some('s') => rest(chars.as_str(), "uper", TokenKind::Super),
        Some('t') => match chars.next() {
            Some('h') => rest(chars.as_str(), "is", TokenKind::This),
            Some('r') => rest(chars.as_str(), "ue", TokenKind::True),
            _ => TokenKind::Identifier,
        },
        Some('v') => rest(chars.as_str(), "ar", TokenKind::Var),
        Some('w') => rest(chars.as_str(), "hile", TokenKind::While),
        _ => TokenKind::Identifier,
    }
}

fn rest(remaining: &str, expected: &str, kind: TokenKind) -> TokenKind {
    if remaining == expected {
        kind
    } else {
        TokenKind::Identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut s = Scanner::new(src);
        let mut out = Vec::new();
        loop {
            let t = s.next_token();
            let done = t.kind == TokenKind::Eof;
            out.push(t.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(kinds("and class fork"), vec![
            TokenKind::And,
            TokenKind::Class,
            TokenKind::Identifier,
            TokenKind::Eof
        ]);
    }

    #[test]
    fn numbers_and_operators() {
        assert_eq!(
            kinds("1 + 2.5 <= 3"),
            vec![
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Number,
                TokenKind::LessEqual,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_string_is_error() {
        let mut s = Scanner::new("\"abc");
        let t = s.next_token();
        assert_eq!(t.kind, TokenKind::Error);
    }

    #[test]
    fn comment_and_newline_tracked() {
        let mut s = Scanner::new("// hi\nvar");
        let t = s.next_token();
        assert_eq!(t.kind, TokenKind::Var);
        assert_eq!(t.line, 2);
    }

    #[test]
    fn string_literal_lexeme_includes_quotes() {
        let mut s = Scanner::new("\"hi\"");
        let t = s.next_token();
        assert_eq!(t.kind, TokenKind::String);
        assert_eq!(t.lexeme, "\"hi\"");
    }
}
