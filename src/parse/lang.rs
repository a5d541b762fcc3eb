// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Punctuation and keywords of the Mima surface syntax.

/// Begin of a definition statement.
pub const DEFINITION_BEGIN: char = '§';
/// Delimiter between a defined name and its value, and between a jump
/// label and its statement.
pub const DELIMITER: char = ':';
/// Open argument bracket.
pub const OPEN_BRACKET: char = '(';
/// Closed argument bracket.
pub const CLOSED_BRACKET: char = ')';
/// End of an instruction.
pub const INSTRUCTION_END: char = ';';
/// Argument separator.
pub const COMMA: char = ',';
/// Open scope bracket.
pub const SCOPE_OPEN: char = '{';
/// Closed scope bracket.
pub const SCOPE_CLOSED: char = '}';
/// Start of a line comment.
pub const COMMENT: char = '#';
/// Reference-to-address marker.
pub const REFERENCE: char = '&';

/// Keyword opening a definition list.
pub const KEYWORD_DEFINE: &str = "define";
/// Keyword marking a constant definition.
pub const KEYWORD_CONST: &str = "const";

const PUNCTUATION: &[char] = &[
    DEFINITION_BEGIN,
    DELIMITER,
    OPEN_BRACKET,
    CLOSED_BRACKET,
    INSTRUCTION_END,
    COMMA,
    SCOPE_OPEN,
    SCOPE_CLOSED,
    REFERENCE,
];

const KEYWORDS: &[&str] = &[KEYWORD_DEFINE, KEYWORD_CONST];

/// Whether `c` is one of the fixed punctuation characters.
pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

/// Whether `s` is a reserved keyword.
pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// Whether `c` can start an identifier.
pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

/// Whether `c` can continue an identifier.
pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether `c` can start a number (digit or a leading minus).
pub fn is_number_start(c: char) -> bool {
    c.is_ascii_digit() || c == '-'
}
