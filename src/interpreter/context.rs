//! `Context` (component F) — the embeddable engine handle: owns the scope
//! stack, host registry, callbacks, and per-`execute` error/return state.
//!
//! `Context` is `!Sync` by construction: it holds `Rc`-based host handles
//! and `Box<dyn FnMut>` callbacks, neither of which is `Sync`. The type
//! system therefore refuses to compile a program that shares a `Context`
//! across threads, which is the idiomatic way to enforce "single-threaded,
//! non-reentrant per context" (spec §5) without a runtime check.

use std::any::Any;
use std::rc::Rc;

use crate::ast::types::Stmt;

use super::errors::ErrorCode;
use super::host::{HostDescriptor, HostRegistry, HostSymbolKind};
use super::scope::{ScopeStack, Variable};
use super::value::Value;

/// Success status for `execute_command`/`call_function` callbacks,
/// matching the source's `DF_RETURN_SUCCESS` constant.
pub const DF_RETURN_SUCCESS: u32 = 0;

const MAX_ERROR_MESSAGE: usize = 255;

/// Safety rails configurable by the embedder; defaults match spec §5/§9.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionLimits {
    pub max_for_iterations: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_for_iterations: 1000,
        }
    }
}

/// The embedder's callback contract (spec §6), one optional closure per
/// slot rather than four nullable function pointers plus a shared
/// `user_data`: a closure already carries its own captured state.
#[derive(Default)]
pub struct Callbacks {
    /// Never invoked by any evaluator path today; reserved (spec §9 Open
    /// Question).
    pub output: Option<Box<dyn FnMut(&str)>>,
    pub execute_command: Option<Box<dyn FnMut(&str) -> u32>>,
    /// Reserved; not consulted by any specified evaluation path.
    pub resolve_variable: Option<Box<dyn FnMut(&str) -> Option<String>>>,
    pub call_function: Option<Box<dyn FnMut(&str, &str) -> u32>>,
}

pub struct Context {
    pub(super) scopes: ScopeStack,
    pub(super) host: HostRegistry,
    pub(super) callbacks: Callbacks,
    pub(super) limits: ExecutionLimits,
    error_code: ErrorCode,
    error_message: String,
    pub(super) return_value: Option<Value>,
    pub(super) has_return_value: bool,
    pub(super) return_triggered: bool,
}

impl Context {
    pub fn new(callbacks: Callbacks) -> Self {
        Self::with_limits(callbacks, ExecutionLimits::default())
    }

    pub fn with_limits(callbacks: Callbacks, limits: ExecutionLimits) -> Self {
        Self {
            scopes: ScopeStack::new(),
            host: HostRegistry::new(),
            callbacks,
            limits,
            error_code: ErrorCode::Ok,
            error_message: String::new(),
            return_value: None,
            has_return_value: false,
            return_triggered: false,
        }
    }

    /// Parses `source`, then walks the resulting statements, stopping on
    /// the first error or once a `return` statement fires. Resets all
    /// per-call state first (spec §4.F step 1), so a `Context` remains
    /// usable across repeated `execute` calls (spec §7).
    pub fn execute(&mut self, source: &str) -> ErrorCode {
        self.error_code = ErrorCode::Ok;
        self.error_message.clear();
        self.return_value = None;
        self.has_return_value = false;
        self.return_triggered = false;

        let stmts: Vec<Stmt> = match crate::parser::parse(source) {
            Ok(stmts) => stmts,
            Err(e) => {
                self.set_error_if_empty(e.code, e.to_string());
                return self.error_code;
            }
        };

        for stmt in &stmts {
            if self.return_triggered {
                break;
            }
            if let Err(err) = self.exec_stmt(stmt) {
                self.set_error_if_empty(err.into(), "Execution error");
                break;
            }
        }

        self.error_code
    }

    /// "First error wins" (spec §7): only records `code`/`message` when no
    /// error has been recorded yet this `execute` call. Messages longer
    /// than the spec's 255-byte bound are truncated.
    pub(super) fn set_error_if_empty(&mut self, code: ErrorCode, message: impl Into<String>) {
        if !self.error_message.is_empty() {
            return;
        }
        self.error_code = code;
        let mut message = message.into();
        if message.len() > MAX_ERROR_MESSAGE {
            message.truncate(MAX_ERROR_MESSAGE);
        }
        self.error_message = message;
    }

    pub fn set_variable(&mut self, name: &str, value: Value) -> &Variable {
        self.scopes.set(name, value.normalize_for_storage());
        self.scopes
            .find(name, true)
            .expect("set_variable just inserted this binding")
    }

    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.scopes.find(name, true)
    }

    pub fn delete_variable(&mut self, name: &str) {
        self.scopes.delete(name);
    }

    pub fn last_error(&self) -> ErrorCode {
        self.error_code
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn register_host_symbol(
        &mut self,
        name: &str,
        kind: HostSymbolKind,
        handle: Rc<dyn Any>,
        descriptor: Rc<dyn HostDescriptor>,
        context: Option<Rc<dyn Any>>,
    ) -> bool {
        self.host.register(name, kind, handle, descriptor, context)
    }

    pub fn unregister_host_symbol(&mut self, name: &str) {
        self.host.unregister(name);
    }

    pub fn clear_host_symbols(&mut self) {
        self.host.clear();
    }

    pub fn has_return_value(&self) -> bool {
        self.has_return_value
    }

    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    /// Not invoked by `execute`/block evaluation (spec §9: blocks never
    /// push); exists so the scope stack is independently exercisable.
    pub fn push_scope(&mut self) {
        self.scopes.push();
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }
}

/// True when `name` ends in `.e0`, case-insensitively. An embedder utility
/// (spec §9), not part of the engine's own evaluation paths.
pub fn is_e0_file(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".e0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_e0_file_is_case_insensitive() {
        assert!(is_e0_file("boot.E0"));
        assert!(is_e0_file("boot.e0"));
        assert!(!is_e0_file("boot.sh"));
    }

    #[test]
    fn execute_resets_state_between_calls() {
        let mut ctx = Context::new(Callbacks::default());
        assert_eq!(ctx.execute("a = 1 / 0;"), ErrorCode::DivisionByZero);
        assert_eq!(ctx.execute("a = 1 + 1;"), ErrorCode::Ok);
        assert_eq!(ctx.last_error(), ErrorCode::Ok);
    }

    #[test]
    fn first_error_wins() {
        let mut ctx = Context::new(Callbacks::default());
        ctx.set_error_if_empty(ErrorCode::Syntax, "first");
        ctx.set_error_if_empty(ErrorCode::OutOfMemory, "second");
        assert_eq!(ctx.error_message(), "first");
        assert_eq!(ctx.last_error(), ErrorCode::Syntax);
    }
}
