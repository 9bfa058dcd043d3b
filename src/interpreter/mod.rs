//! The tree-walking evaluator: value model, scopes, host interop, error
//! taxonomy, and the `Context` driver that ties them together.
//!
//! ```text
//! source bytes -> Lexer -> Parser -> AST -> Evaluator/Driver -> Value / side effects
//! ```

pub mod bucket_table;
pub mod context;
mod eval;
pub mod errors;
mod exec;
pub mod host;
pub mod scope;
pub mod value;

pub use context::{is_e0_file, Callbacks, Context, ExecutionLimits, DF_RETURN_SUCCESS};
pub use errors::{ErrorCode, ScriptError};
pub use host::{HostDescriptor, HostRegistry, HostSymbol, HostSymbolKind};
pub use scope::{Scope, ScopeStack, Variable};
pub use value::{ElementValue, ScriptArray, Value, ValueKind};
