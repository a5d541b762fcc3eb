// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The token tree produced by the parser.

use std::fmt;
use std::sync::Arc;

/// A node of the parsed program tree.
///
/// Only `Identification`, `Binary`, `Number` and nested `Call`/`Program`
/// may appear where an expression is expected. A `Program` owns its
/// children exclusively; each top-level child gets a 0-based statement
/// index used for jump targeting.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A scope: ordered statements plus the jump table of its labels.
    Program(Arc<ProgramNode>),
    /// Decimal literal.
    Number { text: String, line: u32 },
    /// Binary literal (digits as written, without the `0b` prefix).
    Binary { text: String, line: u32 },
    /// Bare identifier; binding category is resolved at interpretation.
    Identification { name: String, line: u32 },
    /// A `§define` statement holding variable/constant items.
    Definition { items: Vec<Token>, line: u32 },
    /// A variable definition; without a value an address is auto-assigned.
    Variable {
        name: String,
        value: Option<Box<Token>>,
        line: u32,
    },
    /// A constant definition; the value is mandatory.
    Constant {
        name: String,
        value: Box<Token>,
        line: u32,
    },
    /// A function/instruction call.
    Call {
        callee: Box<Token>,
        args: Vec<Token>,
        line: u32,
    },
    /// A labelled statement. Multiple labels chain right-associatively.
    JumpPoint {
        label: Box<Token>,
        body: Box<Token>,
        line: u32,
    },
    /// Nothing.
    Empty,
    /// Placeholder for a statement that failed to parse.
    Error {
        message: String,
        line: u32,
        col: u32,
    },
}

impl Token {
    /// Source line of this token, if it has one.
    pub fn line(&self) -> Option<u32> {
        match self {
            Token::Program(node) => Some(node.line),
            Token::Number { line, .. }
            | Token::Binary { line, .. }
            | Token::Identification { line, .. }
            | Token::Definition { line, .. }
            | Token::Variable { line, .. }
            | Token::Constant { line, .. }
            | Token::Call { line, .. }
            | Token::JumpPoint { line, .. }
            | Token::Error { line, .. } => Some(*line),
            Token::Empty => None,
        }
    }

    /// The text a token contributes when used as a jump label.
    pub fn label_text(&self) -> Option<&str> {
        match self {
            Token::Identification { name, .. } => Some(name),
            Token::Number { text, .. } | Token::Binary { text, .. } => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Program(node) => {
                write!(f, "{{ {} statements }}", node.tokens.len())
            }
            Token::Number { text, .. } => write!(f, "{text}"),
            Token::Binary { text, .. } => write!(f, "0b{text}"),
            Token::Identification { name, .. } => write!(f, "{name}"),
            Token::Definition { items, .. } => write!(f, "§define ({} items)", items.len()),
            Token::Variable { name, .. } => write!(f, "{name}"),
            Token::Constant { name, .. } => write!(f, "const {name}"),
            Token::Call { callee, args, .. } => write!(f, "{callee}({} args)", args.len()),
            Token::JumpPoint { label, body, .. } => write!(f, "{label}: {body}"),
            Token::Empty => write!(f, "<empty>"),
            Token::Error { message, .. } => write!(f, "<error: {message}>"),
        }
    }
}

/// One parsed scope: its statements in order and the jump table mapping
/// each label to the 0-based index of the statement it precedes.
#[derive(Debug, PartialEq)]
pub struct ProgramNode {
    pub tokens: Vec<Token>,
    pub line: u32,
    jumps: Vec<(String, usize)>,
}

impl ProgramNode {
    /// Build a scope node and collect its jump table. Chained labels on
    /// one statement all map to the same index; labels of nested scopes
    /// belong to those scopes, not to this one.
    pub fn new(tokens: Vec<Token>, line: u32) -> Self {
        let mut jumps = Vec::new();
        for (index, token) in tokens.iter().enumerate() {
            let mut current = token;
            while let Token::JumpPoint { label, body, .. } = current {
                if let Some(name) = label.label_text() {
                    jumps.push((name.to_string(), index));
                }
                current = body.as_ref();
            }
        }
        Self {
            tokens,
            line,
            jumps,
        }
    }

    /// The label-to-statement-index associations of this scope.
    pub fn jumps(&self) -> &[(String, usize)] {
        &self.jumps
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the scope has no statements.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
