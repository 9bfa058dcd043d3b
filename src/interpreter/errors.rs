//! Error taxonomy for the script engine
//!
//! `ErrorCode` is the embedder-facing classification returned by `execute`
//! and `get_last_error`. `ScriptError` is the internal error type threaded
//! through evaluation via `Result`; it folds down to an `ErrorCode` at the
//! `Context` boundary.

use std::fmt;
use thiserror::Error;

/// Embedder-facing error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCode {
    #[default]
    Ok,
    Syntax,
    UndefinedVar,
    TypeMismatch,
    DivisionByZero,
    OutOfMemory,
    UnmatchedBrace,
}

/// Internal evaluation error. Carries no message of its own; the message
/// is recorded separately on `Context` so that "first error wins" can be
/// enforced independently of which evaluation step produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("syntax error")]
    Syntax,
    #[error("undefined variable")]
    UndefinedVar,
    #[error("type mismatch")]
    TypeMismatch,
    #[error("division by zero")]
    DivisionByZero,
    #[error("out of memory")]
    OutOfMemory,
    #[error("unmatched brace")]
    UnmatchedBrace,
}

impl From<ScriptError> for ErrorCode {
    fn from(e: ScriptError) -> Self {
        match e {
            ScriptError::Syntax => ErrorCode::Syntax,
            ScriptError::UndefinedVar => ErrorCode::UndefinedVar,
            ScriptError::TypeMismatch => ErrorCode::TypeMismatch,
            ScriptError::DivisionByZero => ErrorCode::DivisionByZero,
            ScriptError::OutOfMemory => ErrorCode::OutOfMemory,
            ScriptError::UnmatchedBrace => ErrorCode::UnmatchedBrace,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Ok => "ok",
            ErrorCode::Syntax => "syntax error",
            ErrorCode::UndefinedVar => "undefined variable",
            ErrorCode::TypeMismatch => "type mismatch",
            ErrorCode::DivisionByZero => "division by zero",
            ErrorCode::OutOfMemory => "out of memory",
            ErrorCode::UnmatchedBrace => "unmatched brace",
        };
        write!(f, "{s}")
    }
}
