//! Expression evaluation (component F, second half) — `Context::eval_expr`
//! and its helpers. See spec §4.F "Expression evaluation" for the rule
//! each branch below implements.

use crate::ast::types::{BinOp, CmpOp, Expr};

use super::context::{Context, DF_RETURN_SUCCESS};
use super::errors::ScriptError;
use super::value::{ElementValue, Value, ValueKind};

/// A non-owning view of `value`'s payload: strings/arrays/host handles
/// share their underlying `Rc`/handle but the returned `Value` does not
/// claim ownership; integers and floats are plain copies (spec §4.F:
/// "return a non-owning view for strings, and the native payload for
/// integer/float").
fn view_of(value: &Value) -> Value {
    match &value.kind {
        ValueKind::Str(s) => Value {
            kind: ValueKind::Str(s.clone()),
            owns_payload: false,
            host_descriptor: None,
            host_context: None,
        },
        ValueKind::Integer(i) => Value::owned_integer(*i),
        ValueKind::Float(f) => Value::owned_float(*f),
        ValueKind::Array(a) => Value {
            kind: ValueKind::Array(a.clone()),
            owns_payload: false,
            host_descriptor: None,
            host_context: None,
        },
        ValueKind::Host(h) => Value {
            kind: ValueKind::Host(h.clone()),
            owns_payload: false,
            host_descriptor: value.host_descriptor.clone(),
            host_context: value.host_context.clone(),
        },
    }
}

fn numeric_binop(l: &Value, r: &Value, op: BinOp) -> Result<Value, ScriptError> {
    let lf = l.to_float().ok_or(ScriptError::TypeMismatch)?;
    let rf = r.to_float().ok_or(ScriptError::TypeMismatch)?;
    match op {
        BinOp::Add => Ok(Value::owned_float(lf + rf)),
        BinOp::Sub => Ok(Value::owned_float(lf - rf)),
        BinOp::Mul => Ok(Value::owned_float(lf * rf)),
        BinOp::Div => {
            if rf == 0.0 {
                return Err(ScriptError::DivisionByZero);
            }
            if Value::is_integer_valued(lf) && Value::is_integer_valued(rf) {
                Ok(Value::owned_integer((lf as i32) / (rf as i32)))
            } else {
                Ok(Value::owned_float(lf / rf))
            }
        }
    }
}

/// Non-shell function-call argument stringification: a string value
/// passes through, a numeric value formats `%d`-style when integer-valued
/// else `%f`-style (spec §4.F, grounded in `ScriptEvaluateExpression`).
fn stringify_argument(v: &Value) -> Result<String, ScriptError> {
    if let Some(s) = v.as_str() {
        return Ok(s.to_string());
    }
    match &v.kind {
        ValueKind::Integer(i) => Ok(format!("{i}")),
        ValueKind::Float(f) => {
            if Value::is_integer_valued(*f) {
                Ok(format!("{}", *f as i32))
            } else {
                Ok(format!("{f}"))
            }
        }
        _ => Err(ScriptError::TypeMismatch),
    }
}

fn to_element(v: &Value) -> Result<ElementValue, ScriptError> {
    match &v.kind {
        ValueKind::Integer(i) => Ok(ElementValue::Integer(*i)),
        ValueKind::Float(f) => Ok(ElementValue::Float(*f)),
        ValueKind::Str(s) => Ok(ElementValue::Str(s.clone())),
        _ => Err(ScriptError::TypeMismatch),
    }
}

pub(super) fn element_to_value(e: &ElementValue) -> Value {
    e.clone().into_value()
}

pub(super) fn value_to_element(v: &Value) -> Result<ElementValue, ScriptError> {
    to_element(v)
}

impl Context {
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        match expr {
            Expr::Number(n) => Ok(Value::owned_float(*n)),
            Expr::Str(s) => Ok(Value::owned_str(s)),
            Expr::Identifier(name) => self.eval_identifier(name),
            Expr::Call { name, arg } => self.eval_call(name, arg.as_deref()),
            Expr::ShellCommand { command_line, .. } => self.eval_shell_command(command_line),
            Expr::IndexIdent { name, index } => self.eval_index_ident(name, index),
            Expr::Index { base, index } => self.eval_index(base, index),
            Expr::Property { base, name } => self.eval_property(base, name),
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Comparison { op, left, right } => self.eval_comparison(*op, left, right),
        }
    }

    /// Identifier lookup: host symbols resolve ahead of variables (spec
    /// §4.C "Resolution precedence").
    fn eval_identifier(&mut self, name: &str) -> Result<Value, ScriptError> {
        if let Some(sym) = self.host.find(name) {
            let kind = sym.kind;
            let handle = sym.handle.clone();
            let descriptor = sym.descriptor.clone();
            let context = sym.effective_context();
            return match kind {
                super::host::HostSymbolKind::Property => {
                    let mut v = descriptor.get_property(context.as_ref(), &handle, name)?;
                    v.prepare_host_value(Some(&descriptor), context.as_ref());
                    Ok(v)
                }
                super::host::HostSymbolKind::Array | super::host::HostSymbolKind::Object => {
                    Ok(Value::borrowed_host(handle, Some(descriptor), context))
                }
            };
        }
        match self.scopes.find(name, true) {
            Some(var) => Ok(view_of(&var.value)),
            None => Err(ScriptError::UndefinedVar),
        }
    }

    /// `name[idx]` where `name` is a bare identifier: host arrays are
    /// checked first, else an array variable's element is read.
    fn eval_index_ident(&mut self, name: &str, index: &Expr) -> Result<Value, ScriptError> {
        let idx_val = self.eval_expr(index)?;
        let idx_f = idx_val.to_float().ok_or(ScriptError::TypeMismatch)?;

        if let Some(sym) = self.host.find(name) {
            let handle = sym.handle.clone();
            let descriptor = sym.descriptor.clone();
            let context = sym.effective_context();
            let mut v = descriptor.get_element(context.as_ref(), &handle, idx_f as i64)?;
            v.prepare_host_value(Some(&descriptor), context.as_ref());
            return Ok(v);
        }

        if idx_f < 0.0 {
            return Err(ScriptError::UndefinedVar);
        }
        let var = self.scopes.find(name, true).ok_or(ScriptError::UndefinedVar)?;
        match &var.value.kind {
            ValueKind::Array(arr) => {
                let elem = arr.get(idx_f as usize).ok_or(ScriptError::UndefinedVar)?;
                Ok(element_to_value(elem))
            }
            _ => Err(ScriptError::TypeMismatch),
        }
    }

    /// `base[idx]` where `base` is any other expression: requires `base`
    /// to yield a `HostHandle` with a non-null `get_element` entry.
    fn eval_index(&mut self, base: &Expr, index: &Expr) -> Result<Value, ScriptError> {
        let base_val = self.eval_expr(base)?;
        let handle = base_val.as_host_handle().ok_or(ScriptError::TypeMismatch)?.clone();
        let descriptor = base_val.host_descriptor.clone().ok_or(ScriptError::TypeMismatch)?;
        let context = base_val.host_context.clone();
        let idx_val = self.eval_expr(index)?;
        let idx = idx_val.to_float().ok_or(ScriptError::TypeMismatch)? as i64;
        let mut v = descriptor.get_element(context.as_ref(), &handle, idx)?;
        v.prepare_host_value(Some(&descriptor), context.as_ref());
        Ok(v)
    }

    /// `base.name`: requires `base` to yield a `HostHandle` with a
    /// non-null `get_property` entry.
    fn eval_property(&mut self, base: &Expr, name: &str) -> Result<Value, ScriptError> {
        let base_val = self.eval_expr(base)?;
        let handle = base_val.as_host_handle().ok_or(ScriptError::TypeMismatch)?.clone();
        let descriptor = base_val.host_descriptor.clone().ok_or(ScriptError::TypeMismatch)?;
        let context = base_val.host_context.clone();
        let mut v = descriptor.get_property(context.as_ref(), &handle, name)?;
        v.prepare_host_value(Some(&descriptor), context.as_ref());
        Ok(v)
    }

    fn eval_shell_command(&mut self, command_line: &str) -> Result<Value, ScriptError> {
        match &mut self.callbacks.execute_command {
            None => {
                self.set_error_if_empty(super::errors::ErrorCode::Syntax, "No command callback registered");
                Err(ScriptError::Syntax)
            }
            Some(cb) => {
                let status = cb(command_line);
                if status == DF_RETURN_SUCCESS {
                    Ok(Value::owned_float(status as f32))
                } else {
                    self.set_error_if_empty(
                        super::errors::ErrorCode::Syntax,
                        format!("Command failed (0x{status:08X})"),
                    );
                    Err(ScriptError::Syntax)
                }
            }
        }
    }

    fn eval_call(&mut self, name: &str, arg: Option<&Expr>) -> Result<Value, ScriptError> {
        if self.callbacks.call_function.is_none() {
            self.set_error_if_empty(super::errors::ErrorCode::Syntax, "No function callback registered");
            return Err(ScriptError::Syntax);
        }
        let arg_str = match arg {
            None => String::new(),
            Some(Expr::Str(s)) => s.clone(),
            Some(other) => {
                let v = self.eval_expr(other)?;
                stringify_argument(&v)?
            }
        };
        let status = (self.callbacks.call_function.as_mut().unwrap())(name, &arg_str);
        Ok(Value::owned_float(status as f32))
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> Result<Value, ScriptError> {
        let l = self.eval_expr(left)?;
        let r = self.eval_expr(right)?;
        match op {
            BinOp::Add if l.as_str().is_some() || r.as_str().is_some() => l.concat(&r),
            BinOp::Sub if l.as_str().is_some() || r.as_str().is_some() => l.remove_occurrences(&r),
            BinOp::Mul | BinOp::Div if l.as_str().is_some() || r.as_str().is_some() => Err(ScriptError::TypeMismatch),
            _ => numeric_binop(&l, &r, op),
        }
    }

    fn eval_comparison(&mut self, op: CmpOp, left: &Expr, right: &Expr) -> Result<Value, ScriptError> {
        let l = self.eval_expr(left)?;
        let r = self.eval_expr(right)?;
        let lf = l.to_float().ok_or(ScriptError::TypeMismatch)?;
        let rf = r.to_float().ok_or(ScriptError::TypeMismatch)?;
        let result = match op {
            CmpOp::Lt => lf < rf,
            CmpOp::Le => lf <= rf,
            CmpOp::Gt => lf > rf,
            CmpOp::Ge => lf >= rf,
            CmpOp::Eq => lf == rf,
            CmpOp::Ne => lf != rf,
        };
        Ok(Value::owned_float(if result { 1.0 } else { 0.0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::errors::ErrorCode;
    use crate::interpreter::context::Callbacks;

    fn eval_source(source: &str) -> Context {
        let mut ctx = Context::new(Callbacks::default());
        ctx.execute(source);
        ctx
    }

    #[test]
    fn addition_stores_integer() {
        let ctx = eval_source("a = 1 + 2;");
        assert_eq!(ctx.last_error(), ErrorCode::Ok);
        assert!(matches!(ctx.get_variable("a").unwrap().value.kind, ValueKind::Integer(3)));
    }

    #[test]
    fn precedence_and_parens() {
        let ctx = eval_source("a = 2 + 3 * 4; b = (2 + 3) * 4;");
        assert!(matches!(ctx.get_variable("a").unwrap().value.kind, ValueKind::Integer(14)));
        assert!(matches!(ctx.get_variable("b").unwrap().value.kind, ValueKind::Integer(20)));
    }

    #[test]
    fn for_loop_sums_to_45() {
        let ctx = eval_source("sum = 0; for (i = 0; i < 10; i = i + 1) { sum = sum + i; }");
        assert!(matches!(ctx.get_variable("sum").unwrap().value.kind, ValueKind::Integer(45)));
    }

    #[test]
    fn array_index_assignment_and_read() {
        let ctx = eval_source("arr[0] = 10; arr[1] = 20; arr[2] = 30; val = arr[1];");
        assert!(matches!(ctx.get_variable("val").unwrap().value.kind, ValueKind::Integer(20)));
    }

    #[test]
    fn string_concat_and_removal() {
        let ctx = eval_source(
            r#"value = "foobarfoo" - "foo"; other = "foo" + "bar"; third = "hello" - "";"#,
        );
        assert_eq!(ctx.get_variable("value").unwrap().value.as_str(), Some("bar"));
        assert_eq!(ctx.get_variable("other").unwrap().value.as_str(), Some("foobar"));
        assert_eq!(ctx.get_variable("third").unwrap().value.as_str(), Some("hello"));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let ctx = eval_source("a = 1 / 0;");
        assert_eq!(ctx.last_error(), ErrorCode::DivisionByZero);
    }

    #[test]
    fn shell_command_without_callback_fails() {
        let ctx = eval_source("/bin/echo hi;");
        assert_eq!(ctx.last_error(), ErrorCode::Syntax);
        assert_eq!(ctx.error_message(), "No command callback registered");
    }
}
