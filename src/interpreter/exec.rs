//! Statement execution (component F, first half) — `Context::exec_stmt`
//! and the statement-level helpers. See spec §4.F "Statement execution"
//! for the rule each branch below implements.

use crate::ast::types::{Assignment, ForStmt, IfStmt, Stmt};

use super::context::Context;
use super::errors::ScriptError;
use super::eval::value_to_element;
use super::value::{ScriptArray, Value, ValueKind};

impl Context {
    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        match stmt {
            Stmt::Assignment(a) => self.exec_assignment(a),
            Stmt::If(s) => self.exec_if(s),
            Stmt::For(s) => self.exec_for(s),
            Stmt::Block(stmts) => self.exec_block(stmts),
            Stmt::Return(expr) => self.exec_return(expr),
            Stmt::Expression(expr) => {
                self.eval_expr(expr)?;
                Ok(())
            }
        }
    }

    /// Plain `name = expr;` stores the evaluated, storage-normalized
    /// value under `name`; `name[index] = expr;` writes through the
    /// array-set path, auto-creating an Array variable when `name` is
    /// unbound. Writing to a registered host symbol name is forbidden
    /// (spec §4.C), and a HostHandle result can never be stored directly.
    fn exec_assignment(&mut self, assign: &Assignment) -> Result<(), ScriptError> {
        let value = self.eval_expr(&assign.value)?;
        if value.as_host_handle().is_some() {
            return Err(ScriptError::TypeMismatch);
        }
        if self.host.find(&assign.name).is_some() {
            return Err(ScriptError::Syntax);
        }

        match &assign.index {
            None => {
                self.scopes.set(&assign.name, value.normalize_for_storage());
                Ok(())
            }
            Some(index_expr) => {
                let idx_val = self.eval_expr(index_expr)?;
                let idx_f = idx_val.to_float().ok_or(ScriptError::TypeMismatch)?;
                if idx_f < 0.0 {
                    return Err(ScriptError::TypeMismatch);
                }
                let idx = idx_f as usize;
                let element = value_to_element(&value.normalize_for_storage())?;

                let mut arr = match self.scopes.find(&assign.name, true) {
                    Some(var) => match &var.value.kind {
                        ValueKind::Array(a) => a.clone(),
                        _ => return Err(ScriptError::TypeMismatch),
                    },
                    None => ScriptArray::with_capacity(idx + 1),
                };
                arr.set(idx, element);
                self.scopes.set(&assign.name, Value::owned_array(arr));
                Ok(())
            }
        }
    }

    /// No new scope is pushed; variables created inside a block persist
    /// in the surrounding scope (spec §4.F, §9).
    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<(), ScriptError> {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
            if self.return_triggered {
                break;
            }
        }
        Ok(())
    }

    fn exec_if(&mut self, stmt: &IfStmt) -> Result<(), ScriptError> {
        let cond = self.eval_expr(&stmt.condition)?;
        let cond = cond.to_float().ok_or(ScriptError::TypeMismatch)?;
        if cond != 0.0 {
            self.exec_stmt(&stmt.then_branch)
        } else if let Some(else_branch) = &stmt.else_branch {
            self.exec_stmt(else_branch)
        } else {
            Ok(())
        }
    }

    /// Enforces the hard iteration cap (spec §5/§9: a safety rail in a
    /// kernel context): when exceeded, stops silently with no error
    /// surfaced beyond a diagnostic, rather than failing the script.
    fn exec_for(&mut self, stmt: &ForStmt) -> Result<(), ScriptError> {
        self.exec_assignment(&stmt.init)?;
        let mut iterations: u32 = 0;
        loop {
            let cond = self.eval_expr(&stmt.condition)?;
            let cond = cond.to_float().ok_or(ScriptError::TypeMismatch)?;
            if cond == 0.0 {
                break;
            }
            if iterations >= self.limits.max_for_iterations {
                eprintln!(
                    "for loop exceeded {} iterations, stopping",
                    self.limits.max_for_iterations
                );
                break;
            }
            self.exec_stmt(&stmt.body)?;
            if self.return_triggered {
                return Ok(());
            }
            self.exec_assignment(&stmt.increment)?;
            iterations += 1;
        }
        Ok(())
    }

    /// Array and HostHandle results cannot be returned (spec §4.F); on
    /// success the value is cloned into `return_value` and both
    /// `has_return_value` and `return_triggered` are set together.
    fn exec_return(&mut self, expr: &crate::ast::types::Expr) -> Result<(), ScriptError> {
        let value = self.eval_expr(expr)?;
        if value.as_host_handle().is_some() || matches!(value.kind, ValueKind::Array(_)) {
            return Err(ScriptError::TypeMismatch);
        }
        self.return_value = Some(value);
        self.has_return_value = true;
        self.return_triggered = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::context::Callbacks;
    use super::super::errors::ErrorCode;
    use super::*;

    fn run(source: &str) -> Context {
        let mut ctx = Context::new(Callbacks::default());
        ctx.execute(source);
        ctx
    }

    #[test]
    fn block_does_not_push_a_scope() {
        let ctx = run("{ a = 1; }");
        assert!(ctx.get_variable("a").is_some());
    }

    #[test]
    fn return_stops_remaining_statements() {
        let mut ctx = Context::new(Callbacks::default());
        ctx.execute("a = 1; return a; a = 2;");
        assert!(ctx.has_return_value());
        assert!(matches!(ctx.return_value().unwrap().kind, ValueKind::Integer(1)));
        assert!(matches!(ctx.get_variable("a").unwrap().value.kind, ValueKind::Integer(1)));
    }

    #[test]
    fn return_of_array_is_type_mismatch() {
        let ctx = run("arr[0] = 1; return arr;");
        assert_eq!(ctx.last_error(), ErrorCode::TypeMismatch);
    }

    #[test]
    fn for_loop_honors_iteration_cap() {
        let mut ctx = Context::new(Callbacks::default());
        ctx.execute("count = 0; for (i = 0; i >= 0; i = i + 1) { count = count + 1; }");
        assert_eq!(ctx.last_error(), ErrorCode::Ok);
        assert!(matches!(ctx.get_variable("count").unwrap().value.kind, ValueKind::Integer(1000)));
    }

    #[test]
    fn if_else_picks_branch_by_condition() {
        let ctx = run("if (0) { a = 1; } else { a = 2; }");
        assert!(matches!(ctx.get_variable("a").unwrap().value.kind, ValueKind::Integer(2)));
    }

    #[test]
    fn assignment_to_host_symbol_name_is_forbidden() {
        use super::super::host::{HostDescriptor, HostSymbolKind};
        use std::any::Any;
        use std::rc::Rc;

        struct Prop;
        impl HostDescriptor for Prop {
            fn get_property(
                &self,
                _context: Option<&Rc<dyn Any>>,
                _handle: &Rc<dyn Any>,
                _name: &str,
            ) -> Result<Value, ScriptError> {
                Ok(Value::owned_integer(42))
            }
        }

        let mut ctx = Context::new(Callbacks::default());
        ctx.register_host_symbol(
            "hostValue",
            HostSymbolKind::Property,
            Rc::new(()) as Rc<dyn Any>,
            Rc::new(Prop),
            None,
        );
        assert_eq!(ctx.execute("result = hostValue;"), ErrorCode::Ok);
        assert!(matches!(ctx.get_variable("result").unwrap().value.kind, ValueKind::Integer(42)));

        assert_eq!(ctx.execute("hostValue = 99;"), ErrorCode::Syntax);
        assert!(ctx.get_variable("hostValue").is_none());
    }

    #[test]
    fn host_array_chained_index_and_property_access() {
        use super::super::host::{HostDescriptor, HostSymbolKind};
        use std::any::Any;
        use std::rc::Rc;

        #[derive(Clone, Copy)]
        enum Handle {
            Root,
            Item(usize),
        }

        const ITEMS: [(&str, i32); 3] = [("Alpha", 100), ("Beta", 200), ("Gamma", 300)];

        struct Hosts;
        impl HostDescriptor for Hosts {
            fn get_element(
                &self,
                _context: Option<&Rc<dyn Any>>,
                handle: &Rc<dyn Any>,
                index: i64,
            ) -> Result<Value, ScriptError> {
                match handle.downcast_ref::<Handle>() {
                    Some(Handle::Root) if index >= 0 && (index as usize) < ITEMS.len() => {
                        Ok(Value::borrowed_host(
                            Rc::new(Handle::Item(index as usize)) as Rc<dyn Any>,
                            None,
                            None,
                        ))
                    }
                    Some(Handle::Root) => Err(ScriptError::UndefinedVar),
                    _ => Err(ScriptError::TypeMismatch),
                }
            }

            fn get_property(
                &self,
                _context: Option<&Rc<dyn Any>>,
                handle: &Rc<dyn Any>,
                name: &str,
            ) -> Result<Value, ScriptError> {
                match handle.downcast_ref::<Handle>() {
                    Some(Handle::Item(i)) => {
                        let (item_name, item_value) = ITEMS[*i];
                        match name {
                            "name" => Ok(Value::owned_str(item_name)),
                            "value" => Ok(Value::owned_integer(item_value)),
                            _ => Err(ScriptError::UndefinedVar),
                        }
                    }
                    _ => Err(ScriptError::TypeMismatch),
                }
            }
        }

        let mut ctx = Context::new(Callbacks::default());
        ctx.register_host_symbol(
            "hosts",
            HostSymbolKind::Array,
            Rc::new(Handle::Root) as Rc<dyn Any>,
            Rc::new(Hosts),
            None,
        );

        assert_eq!(ctx.execute("value = hosts[1].value; name = hosts[2].name;"), ErrorCode::Ok);
        assert!(matches!(ctx.get_variable("value").unwrap().value.kind, ValueKind::Integer(200)));
        assert_eq!(ctx.get_variable("name").unwrap().value.as_str(), Some("Gamma"));
    }
}
