// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The tokenizer. Uses a [`CharStream`] to lazily construct raw tokens.

use crate::parse::char_stream::CharStream;
use crate::parse::lang;

/// Kind of a raw lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    /// Decimal numeric literal, possibly with a leading minus.
    Number,
    /// Binary literal (digits only, the `0b` prefix is consumed).
    Binary,
    /// Identifier.
    Identifier,
    /// Reserved keyword.
    Keyword,
    /// Single punctuation character.
    Punctuation,
    /// Malformed input; `text` carries the message.
    Error,
}

/// A raw token with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub kind: RawKind,
    pub text: String,
    pub line: u32,
    pub col: u32,
}

impl RawToken {
    /// Whether this token is the given punctuation character.
    pub fn is_punctuation(&self, c: char) -> bool {
        self.kind == RawKind::Punctuation && self.text.chars().next() == Some(c)
    }

    /// Whether this token is the given keyword.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == RawKind::Keyword && self.text == keyword
    }
}

/// Lazy token reader with a one-token lookahead cache.
#[derive(Debug)]
pub struct TokenStream {
    input: CharStream,
    current: Option<RawToken>,
}

impl TokenStream {
    /// Create a token stream over `input`.
    pub fn new(input: &str) -> Self {
        Self {
            input: CharStream::new(input),
            current: None,
        }
    }

    /// The next token without consuming it.
    pub fn peek(&mut self) -> Option<&RawToken> {
        if self.current.is_none() {
            self.current = self.read_next();
        }
        self.current.as_ref()
    }

    /// Consume and return the next token.
    pub fn next(&mut self) -> Option<RawToken> {
        match self.current.take() {
            Some(token) => Some(token),
            None => self.read_next(),
        }
    }

    /// Whether there are any more tokens to read.
    pub fn is_empty(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Current line of the reader, 1-based. When a token is cached this
    /// is the line of that token.
    pub fn line(&mut self) -> u32 {
        if let Some(token) = self.peek() {
            return token.line;
        }
        self.input.line()
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut string = String::new();
        while let Some(c) = self.input.peek() {
            if !predicate(c) {
                break;
            }
            string.push(c);
            self.input.next();
        }
        string
    }

    fn skip_comment(&mut self) {
        self.read_while(|c| c != '\n');
        self.input.next();
    }

    fn read_next(&mut self) -> Option<RawToken> {
        loop {
            self.read_while(char::is_whitespace);
            let line = self.input.line();
            let col = self.input.col();
            let c = self.input.peek()?;
            if c == lang::COMMENT {
                self.skip_comment();
                continue;
            }
            let token = if lang::is_number_start(c) {
                self.read_number(line, col)
            } else if lang::is_identifier_start(c) {
                self.read_identifier(line, col)
            } else if lang::is_punctuation(c) {
                self.input.next();
                RawToken {
                    kind: RawKind::Punctuation,
                    text: c.to_string(),
                    line,
                    col,
                }
            } else {
                self.input.next();
                RawToken {
                    kind: RawKind::Error,
                    text: format!("can't handle character: '{c}'"),
                    line,
                    col,
                }
            };
            return Some(token);
        }
    }

    /*
     * Read a decimal number or a 0b-prefixed binary literal.
     */
    fn read_number(&mut self, line: u32, col: u32) -> RawToken {
        let first = self.input.next().unwrap_or_default();
        if first == '0' && self.input.peek() == Some('b') {
            self.input.next();
            return self.read_binary(line, col);
        }
        let rest = self.read_while(|c| c.is_ascii_digit());
        if first == '-' && rest.is_empty() {
            return RawToken {
                kind: RawKind::Error,
                text: "expected digits after '-'".to_string(),
                line,
                col,
            };
        }
        RawToken {
            kind: RawKind::Number,
            text: format!("{first}{rest}"),
            line,
            col,
        }
    }

    fn read_binary(&mut self, line: u32, col: u32) -> RawToken {
        let digits = self.read_while(|c| c == '0' || c == '1');
        if digits.is_empty() {
            return RawToken {
                kind: RawKind::Error,
                text: "expected digits after '0b'".to_string(),
                line,
                col,
            };
        }
        RawToken {
            kind: RawKind::Binary,
            text: digits,
            line,
            col,
        }
    }

    /*
     * Read an identifier and classify it as keyword or identification.
     */
    fn read_identifier(&mut self, line: u32, col: u32) -> RawToken {
        let identifier = self.read_while(lang::is_identifier_char);
        let kind = if lang::is_keyword(&identifier) {
            RawKind::Keyword
        } else {
            RawKind::Identifier
        };
        RawToken {
            kind,
            text: identifier,
            line,
            col,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(RawKind, String)> {
        let mut stream = TokenStream::new(input);
        let mut out = Vec::new();
        while let Some(token) = stream.next() {
            out.push((token.kind, token.text));
        }
        out
    }

    #[test]
    fn tokenizes_a_statement() {
        assert_eq!(
            kinds("LDC(5);"),
            vec![
                (RawKind::Identifier, "LDC".to_string()),
                (RawKind::Punctuation, "(".to_string()),
                (RawKind::Number, "5".to_string()),
                (RawKind::Punctuation, ")".to_string()),
                (RawKind::Punctuation, ";".to_string()),
            ]
        );
    }

    #[test]
    fn recognizes_keywords_and_definition_marker() {
        assert_eq!(
            kinds("§define const x: -3"),
            vec![
                (RawKind::Punctuation, "§".to_string()),
                (RawKind::Keyword, "define".to_string()),
                (RawKind::Keyword, "const".to_string()),
                (RawKind::Identifier, "x".to_string()),
                (RawKind::Punctuation, ":".to_string()),
                (RawKind::Number, "-3".to_string()),
            ]
        );
    }

    #[test]
    fn reads_binary_literals() {
        assert_eq!(kinds("0b1010"), vec![(RawKind::Binary, "1010".to_string())]);
        assert_eq!(kinds("0"), vec![(RawKind::Number, "0".to_string())]);
    }

    #[test]
    fn skips_line_comments() {
        assert_eq!(
            kinds("# a comment\nHALT"),
            vec![(RawKind::Identifier, "HALT".to_string())]
        );
    }

    #[test]
    fn malformed_characters_become_error_tokens() {
        let mut stream = TokenStream::new("\n  @");
        let token = stream.next().unwrap();
        assert_eq!(token.kind, RawKind::Error);
        assert_eq!((token.line, token.col), (2, 3));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut stream = TokenStream::new("A B");
        assert_eq!(stream.peek().unwrap().text, "A");
        assert_eq!(stream.peek().unwrap().text, "A");
        assert_eq!(stream.next().unwrap().text, "A");
        assert_eq!(stream.next().unwrap().text, "B");
        assert!(stream.is_empty());
    }
}
