//! Parser error and shared constants.

use std::fmt;
use thiserror::Error;

use crate::interpreter::errors::ErrorCode;

/// A parse-phase failure, carrying the position it occurred at so the
/// driver can format the mandatory `Syntax error (l:L,c:C)` message.
/// Every Pass-1 parse error reports through this same generic format
/// regardless of its `code` (grounded in `Script-Core.c`'s `ScriptExecute`
/// — see DESIGN.md).
#[derive(Debug, Clone, Error)]
pub struct ParseError {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(code: ErrorCode, line: usize, column: usize) -> Self {
        Self { code, line, column }
    }

    pub fn syntax(line: usize, column: usize) -> Self {
        Self::new(ErrorCode::Syntax, line, column)
    }

    pub fn unmatched_brace(line: usize, column: usize) -> Self {
        Self::new(ErrorCode::UnmatchedBrace, line, column)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Syntax error (l:{},c:{})", self.line, self.column)
    }
}
