// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The parser constructs the nested token tree that makes up a program.
//!
//! Parsing is best-effort: a malformed statement is recorded as a
//! [`ParseError`], an `Error` placeholder keeps its statement index, one
//! token is skipped, and parsing continues so the rest of the file still
//! produces diagnostics. Whether a bare identifier names a variable,
//! constant or jump target is deliberately left to interpretation time.

use std::sync::Arc;

use crate::parse::error::ParseError;
use crate::parse::lang;
use crate::parse::token::{ProgramNode, Token};
use crate::parse::token_stream::{RawKind, TokenStream};

/// Parse `source` into a program token plus all recovered parse errors.
pub fn parse(source: &str) -> (Arc<ProgramNode>, Vec<ParseError>) {
    let mut parser = Parser::new(source);
    let program = parser.parse_top_level();
    (Arc::new(program), parser.errors)
}

/*
 * Result of one statement parse; a closing scope bracket is reported
 * upward without being consumed.
 */
enum Parsed {
    Token(Token),
    ScopeEnd,
}

struct Parser {
    input: TokenStream,
    errors: Vec<ParseError>,
    skip_end_of_instruction: bool,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            input: TokenStream::new(source),
            errors: Vec::new(),
            skip_end_of_instruction: true,
        }
    }

    /*
     * Parse statements divided by ';' until the scope closes or the
     * input ends.
     */
    fn parse_top_level(&mut self) -> ProgramNode {
        let line = self.input.line();
        let mut tokens = Vec::new();
        while !self.input.is_empty() {
            self.skip_end_of_instruction = true;
            if self.peek_is_punctuation(lang::INSTRUCTION_END) {
                self.input.next();
                continue;
            }
            match self.parse_statement() {
                Ok(Parsed::ScopeEnd) => {
                    self.input.next();
                    break;
                }
                Ok(Parsed::Token(token)) => {
                    tokens.push(token);
                    // the separator is optional before a closing brace
                    if self.skip_end_of_instruction
                        && !self.peek_is_punctuation(lang::SCOPE_CLOSED)
                    {
                        if let Err(error) = self.expect_punctuation(lang::INSTRUCTION_END) {
                            self.recover(&mut tokens, error);
                        }
                    }
                }
                Err(error) => self.recover(&mut tokens, error),
            }
        }
        ProgramNode::new(tokens, line)
    }

    /*
     * Record the error, keep the statement index alive with a
     * placeholder, and skip a single token.
     */
    fn recover(&mut self, tokens: &mut Vec<Token>, error: ParseError) {
        tokens.push(Token::Error {
            message: error.message.clone(),
            line: error.line,
            col: error.col,
        });
        self.errors.push(error);
        self.input.next();
    }

    fn parse_statement(&mut self) -> Result<Parsed, ParseError> {
        self.maybe_jump_association()
    }

    /*
     * Parse an expression that may have jump labels preceding it. Labels
     * chain right-associatively: `A: B: stmt` nests `B: stmt` under `A`.
     */
    fn maybe_jump_association(&mut self) -> Result<Parsed, ParseError> {
        let expression = match self.parse_expression()? {
            Parsed::Token(token) => token,
            end => return Ok(end),
        };
        if !self.peek_is_punctuation(lang::DELIMITER) {
            return Ok(Parsed::Token(expression));
        }
        let line = self.input.line();
        self.input.next();
        match self.maybe_jump_association()? {
            Parsed::Token(body) => Ok(Parsed::Token(Token::JumpPoint {
                label: Box::new(expression),
                body: Box::new(body),
                line,
            })),
            Parsed::ScopeEnd => Err(self.error_at_input("expected statement after label")),
        }
    }

    /*
     * Parse an expression; trailing '(' makes it a call, and a call
     * result may itself be called.
     */
    fn parse_expression(&mut self) -> Result<Parsed, ParseError> {
        let mut expression = match self.parse_atomic()? {
            Parsed::Token(token) => token,
            end => return Ok(end),
        };
        while self.peek_is_punctuation(lang::OPEN_BRACKET) {
            expression = self.parse_call(expression)?;
        }
        Ok(Parsed::Token(expression))
    }

    fn parse_atomic(&mut self) -> Result<Parsed, ParseError> {
        if self.peek_is_punctuation(lang::SCOPE_OPEN) {
            self.input.next();
            let node = self.parse_top_level();
            if self.peek_is_punctuation(lang::INSTRUCTION_END) {
                self.input.next();
            }
            self.skip_end_of_instruction = false;
            return Ok(Parsed::Token(Token::Program(Arc::new(node))));
        }
        if self.peek_is_punctuation(lang::SCOPE_CLOSED) {
            return Ok(Parsed::ScopeEnd);
        }
        if self.peek_is_punctuation(lang::OPEN_BRACKET) {
            self.input.next();
            let expression = match self.parse_expression()? {
                Parsed::Token(token) => token,
                Parsed::ScopeEnd => return Err(self.error_at_input("unexpected '}'")),
            };
            self.expect_punctuation(lang::CLOSED_BRACKET)?;
            return Ok(Parsed::Token(expression));
        }
        if self.peek_is_punctuation(lang::DEFINITION_BEGIN) {
            self.input.next();
            return self.parse_definition().map(Parsed::Token);
        }
        let peeked = self
            .input
            .peek()
            .map(|t| (t.kind, t.text.clone(), t.line, t.col));
        let Some((kind, text, line, col)) = peeked else {
            return Err(self.error_at_input("unexpected end of input"));
        };
        match kind {
            RawKind::Identifier | RawKind::Number | RawKind::Binary => {
                self.input.next();
                Ok(Parsed::Token(match kind {
                    RawKind::Identifier => Token::Identification { name: text, line },
                    RawKind::Number => Token::Number { text, line },
                    _ => Token::Binary { text, line },
                }))
            }
            RawKind::Error => Err(ParseError::new(text, line, col)),
            _ => Err(self.unexpected()),
        }
    }

    /*
     * Parse a definition list: `define (const)? item (',' item)*`
     * terminated by ';' (left for the caller) or end of input.
     */
    fn parse_definition(&mut self) -> Result<Token, ParseError> {
        let line = self.input.line();
        self.expect_keyword(lang::KEYWORD_DEFINE)?;
        let mut items = Vec::new();
        let mut first = true;
        while !self.input.is_empty() && !self.peek_is_punctuation(lang::INSTRUCTION_END) {
            if !first {
                self.expect_punctuation(lang::COMMA)?;
            }
            first = false;
            if self.input.is_empty() || self.peek_is_punctuation(lang::INSTRUCTION_END) {
                break;
            }
            items.push(self.parse_definition_item()?);
        }
        Ok(Token::Definition { items, line })
    }

    fn parse_definition_item(&mut self) -> Result<Token, ParseError> {
        if self.peek_is_keyword(lang::KEYWORD_CONST) {
            self.input.next();
            return self.parse_constant_item();
        }
        self.parse_variable_item()
    }

    /*
     * A constant definition must have a value.
     */
    fn parse_constant_item(&mut self) -> Result<Token, ParseError> {
        let (name, line) = self.expect_identifier()?;
        self.expect_punctuation(lang::DELIMITER)?;
        let value = self.parse_value_expression()?;
        Ok(Token::Constant {
            name,
            value: Box::new(value),
            line,
        })
    }

    /*
     * A variable definition may have a value; without one an address is
     * reserved at interpretation time.
     */
    fn parse_variable_item(&mut self) -> Result<Token, ParseError> {
        let (name, line) = self.expect_identifier()?;
        if self.peek_is_punctuation(lang::DELIMITER) {
            self.input.next();
            let value = self.parse_value_expression()?;
            return Ok(Token::Variable {
                name,
                value: Some(Box::new(value)),
                line,
            });
        }
        Ok(Token::Variable {
            name,
            value: None,
            line,
        })
    }

    fn parse_value_expression(&mut self) -> Result<Token, ParseError> {
        match self.parse_expression()? {
            Parsed::Token(token) => Ok(token),
            Parsed::ScopeEnd => Err(self.error_at_input("unexpected '}'")),
        }
    }

    fn parse_call(&mut self, callee: Token) -> Result<Token, ParseError> {
        let line = self.input.line();
        self.expect_punctuation(lang::OPEN_BRACKET)?;
        let mut args = Vec::new();
        let mut first = true;
        loop {
            if self.input.is_empty() {
                return Err(self.error_at_input("expected ')'"));
            }
            if self.peek_is_punctuation(lang::CLOSED_BRACKET) {
                break;
            }
            if !first {
                self.expect_punctuation(lang::COMMA)?;
            }
            first = false;
            if self.peek_is_punctuation(lang::CLOSED_BRACKET) {
                break;
            }
            args.push(self.parse_value_expression()?);
        }
        self.expect_punctuation(lang::CLOSED_BRACKET)?;
        Ok(Token::Call {
            callee: Box::new(callee),
            args,
            line,
        })
    }

    fn peek_is_punctuation(&mut self, c: char) -> bool {
        self.input.peek().is_some_and(|t| t.is_punctuation(c))
    }

    fn peek_is_keyword(&mut self, keyword: &str) -> bool {
        self.input.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn expect_punctuation(&mut self, c: char) -> Result<(), ParseError> {
        if self.peek_is_punctuation(c) {
            self.input.next();
            Ok(())
        } else {
            Err(self.error_at_input(format!("expecting symbol: \"{c}\"")))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.peek_is_keyword(keyword) {
            self.input.next();
            Ok(())
        } else {
            Err(self.error_at_input(format!("expecting keyword: \"{keyword}\"")))
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, u32), ParseError> {
        let is_identifier =
            matches!(self.input.peek(), Some(t) if t.kind == RawKind::Identifier);
        if is_identifier {
            if let Some(token) = self.input.next() {
                return Ok((token.text, token.line));
            }
        }
        Err(self.error_at_input("expected identifier"))
    }

    fn unexpected(&mut self) -> ParseError {
        let description = self
            .input
            .peek()
            .map(|t| t.text.clone())
            .unwrap_or_else(|| "end of input".to_string());
        self.error_at_input(format!("unexpected token: {description}"))
    }

    fn error_at_input(&mut self, message: impl Into<String>) -> ParseError {
        if let Some(token) = self.input.peek() {
            let (line, col) = (token.line, token.col);
            return ParseError::new(message, line, col);
        }
        let line = self.input.line();
        ParseError::new(message, line, 1)
    }
}
