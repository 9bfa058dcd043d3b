//! script-engine — an embeddable tree-walking scripting engine
//!
//! ```text
//! source bytes -> Lexer -> Parser -> AST -> Evaluator/Driver -> Value / side effects
//! ```
//!
//! Single-threaded, non-reentrant per [`Context`]; the host exposes native
//! data through [`HostDescriptor`] and drives commands/functions through
//! [`Callbacks`].

pub mod ast;
pub mod interpreter;
pub mod parser;

pub use ast::types::*;
pub use interpreter::{
    is_e0_file, Callbacks, Context, ElementValue, ErrorCode, ExecutionLimits, HostDescriptor, HostRegistry,
    HostSymbol, HostSymbolKind, Scope, ScopeStack, ScriptArray, ScriptError, Value, ValueKind, Variable,
};
pub use parser::{parse, ParseError, Parser};
