//! Abstract Syntax Tree (AST) types for the script language
//!
//! ```text
//! source bytes -> Lexer -> Parser -> AST -> Evaluator/Driver -> Value / side effects
//! ```

pub mod types;

pub use types::*;
