//! Value model (component A) — a tagged value with an ownership flag and,
//! for `HostHandle` values, descriptor/context metadata.
//!
//! Rust's own ownership system already guarantees memory safety regardless
//! of `owns_payload`; the flag is kept anyway because it is part of the
//! observable contract (spec §8: "if `owns_payload` is true then
//! `value_release` frees exactly one allocation") and because it gates one
//! real side effect: whether dropping a `HostHandle` value invokes
//! `release_handle`. Dropping a `Value` *is* `value_release` — there is no
//! separate release function to call.

use std::any::Any;
use std::rc::Rc;

use super::errors::ScriptError;
use super::host::HostDescriptor;

/// Elements are native tagged values stored inline; the source's per-
/// element heap boxing of integers/floats is an implementation detail the
/// spec explicitly does not require (spec §9).
#[derive(Debug, Clone, Default)]
pub struct ScriptArray {
    elements: Vec<Option<ElementValue>>,
}

/// An array element never carries host metadata or ownership bookkeeping
/// of its own; it is always a plain Integer/Float/String copy.
#[derive(Debug, Clone)]
pub enum ElementValue {
    Integer(i32),
    Float(f32),
    Str(Rc<str>),
}

impl ScriptArray {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
        }
    }

    pub fn set(&mut self, index: usize, value: ElementValue) {
        if index >= self.elements.len() {
            self.elements.resize(index + 1, None);
        }
        self.elements[index] = Some(value);
    }

    pub fn get(&self, index: usize) -> Option<&ElementValue> {
        self.elements.get(index).and_then(|slot| slot.as_ref())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl ElementValue {
    pub fn into_value(self) -> Value {
        match self {
            ElementValue::Integer(i) => Value::owned_integer(i),
            ElementValue::Float(f) => Value::owned_float(f),
            ElementValue::Str(s) => Value::owned_str_rc(s),
        }
    }
}

/// The tagged payload, minus ownership/host metadata (carried separately
/// on `Value` so that a single `Drop` impl can apply the release rule
/// uniformly).
#[derive(Clone)]
pub enum ValueKind {
    Integer(i32),
    Float(f32),
    Str(Rc<str>),
    Array(ScriptArray),
    Host(Rc<dyn Any>),
}

impl std::fmt::Debug for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Integer(i) => write!(f, "Integer({i})"),
            ValueKind::Float(v) => write!(f, "Float({v})"),
            ValueKind::Str(s) => write!(f, "Str({s:?})"),
            ValueKind::Array(a) => write!(f, "Array(len={})", a.len()),
            ValueKind::Host(_) => write!(f, "Host(..)"),
        }
    }
}

/// A tagged union over {Integer, Float, String, Array, HostHandle} plus an
/// ownership flag and, for `HostHandle` values, descriptor/context
/// metadata (spec §3).
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub owns_payload: bool,
    pub host_descriptor: Option<Rc<dyn HostDescriptor>>,
    pub host_context: Option<Rc<dyn Any>>,
}

impl Default for Value {
    /// `value_init`: default to Float 0, not-owning, no host metadata.
    fn default() -> Self {
        Value {
            kind: ValueKind::Float(0.0),
            owns_payload: false,
            host_descriptor: None,
            host_context: None,
        }
    }
}

impl Value {
    pub fn owned_integer(v: i32) -> Self {
        Value {
            kind: ValueKind::Integer(v),
            owns_payload: true,
            host_descriptor: None,
            host_context: None,
        }
    }

    pub fn owned_float(v: f32) -> Self {
        Value {
            kind: ValueKind::Float(v),
            owns_payload: true,
            host_descriptor: None,
            host_context: None,
        }
    }

    pub fn owned_str(s: impl AsRef<str>) -> Self {
        Self::owned_str_rc(Rc::from(s.as_ref()))
    }

    pub fn owned_str_rc(s: Rc<str>) -> Self {
        Value {
            kind: ValueKind::Str(s),
            owns_payload: true,
            host_descriptor: None,
            host_context: None,
        }
    }

    pub fn owned_array(a: ScriptArray) -> Self {
        Value {
            kind: ValueKind::Array(a),
            owns_payload: true,
            host_descriptor: None,
            host_context: None,
        }
    }

    /// A host-exposed array/object symbol yields a non-owning handle value
    /// (spec §4.F): the script never releases native host memory itself.
    pub fn borrowed_host(
        handle: Rc<dyn Any>,
        descriptor: Option<Rc<dyn HostDescriptor>>,
        context: Option<Rc<dyn Any>>,
    ) -> Self {
        Value {
            kind: ValueKind::Host(handle),
            owns_payload: false,
            host_descriptor: descriptor,
            host_context: context,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_host_handle(&self) -> Option<&Rc<dyn Any>> {
        match &self.kind {
            ValueKind::Host(h) => Some(h),
            _ => None,
        }
    }

    /// `value_to_float`: Integer and Float succeed (Integer widens);
    /// others fail.
    pub fn to_float(&self) -> Option<f32> {
        match &self.kind {
            ValueKind::Integer(i) => Some(*i as f32),
            ValueKind::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// `concat`: requires both strings; a null/missing string payload is
    /// treated as empty (not applicable here since `Rc<str>` is never
    /// null, but an empty `Rc<str>` plays the same role).
    pub fn concat(&self, other: &Value) -> Result<Value, ScriptError> {
        let (Some(l), Some(r)) = (self.as_str(), other.as_str()) else {
            return Err(ScriptError::TypeMismatch);
        };
        let mut out = String::with_capacity(l.len() + r.len());
        out.push_str(l);
        out.push_str(r);
        Ok(Value::owned_str(out))
    }

    /// `remove_occurrences`: requires both strings; elides every exact,
    /// non-overlapping occurrence of `pat` from `src`; empty `pat` yields
    /// a copy of `src`.
    pub fn remove_occurrences(&self, pat: &Value) -> Result<Value, ScriptError> {
        let (Some(src), Some(pat)) = (self.as_str(), pat.as_str()) else {
            return Err(ScriptError::TypeMismatch);
        };
        if pat.is_empty() {
            return Ok(Value::owned_str(src));
        }
        Ok(Value::owned_str(src.replace(pat, "")))
    }

    /// `prepare_host_value`: if `v` is a non-owning string, duplicate it
    /// into an owned copy (with `Rc<str>` this is a fresh allocation via
    /// clone-to-owned, not merely an `Rc` refcount bump, matching the
    /// source's "duplicate" semantics); if `v` is a `HostHandle` with a
    /// null descriptor or null context, fill from the defaults.
    pub fn prepare_host_value(
        &mut self,
        default_descriptor: Option<&Rc<dyn HostDescriptor>>,
        default_context: Option<&Rc<dyn Any>>,
    ) {
        match &self.kind {
            ValueKind::Str(_) if !self.owns_payload => {
                self.owns_payload = true;
            }
            ValueKind::Host(_) => {
                if self.host_descriptor.is_none() {
                    self.host_descriptor = default_descriptor.cloned();
                }
                if self.host_context.is_none() {
                    self.host_context = default_context.cloned();
                }
            }
            _ => {}
        }
    }

    /// `IsInteger`: whether a float value equals its truncation toward zero.
    pub fn is_integer_valued(v: f32) -> bool {
        v == (v as i32) as f32
    }

    /// Storage rule used by assignment (spec §4.F): a numeric Float whose
    /// value equals its truncation is stored as Integer; otherwise the
    /// value keeps its natural tag.
    pub fn normalize_for_storage(self) -> Value {
        if let ValueKind::Float(f) = self.kind {
            if Value::is_integer_valued(f) {
                return Value::owned_integer(f as i32);
            }
        }
        self
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        if !self.owns_payload {
            return;
        }
        if let ValueKind::Host(handle) = &self.kind {
            if let Some(descriptor) = &self.host_descriptor {
                descriptor.release_handle(self.host_context.as_ref(), handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Recorder {
        released: Rc<Cell<bool>>,
    }
    impl HostDescriptor for Recorder {
        fn release_handle(&self, _context: Option<&Rc<dyn Any>>, _handle: &Rc<dyn Any>) {
            self.released.set(true);
        }
    }

    #[test]
    fn owning_host_value_releases_on_drop() {
        let released = Rc::new(Cell::new(false));
        let descriptor: Rc<dyn HostDescriptor> = Rc::new(Recorder { released: released.clone() });
        let mut v = Value::borrowed_host(Rc::new(()), Some(descriptor), None);
        v.owns_payload = true;
        drop(v);
        assert!(released.get());
    }

    #[test]
    fn non_owning_host_value_does_not_release_on_drop() {
        let released = Rc::new(Cell::new(false));
        let descriptor: Rc<dyn HostDescriptor> = Rc::new(Recorder { released: released.clone() });
        let v = Value::borrowed_host(Rc::new(()), Some(descriptor), None);
        drop(v);
        assert!(!released.get());
    }

    #[test]
    fn concat_is_associative_modulo_allocation() {
        let a = Value::owned_str("a");
        let b = Value::owned_str("b");
        let c = Value::owned_str("c");
        let left = a.concat(&b).unwrap().concat(&c).unwrap();
        let right = a.concat(&b.concat(&c).unwrap()).unwrap();
        assert_eq!(left.as_str(), right.as_str());
        assert_eq!(left.as_str(), Some("abc"));
    }

    #[test]
    fn remove_occurrences_empty_pattern_is_identity() {
        let src = Value::owned_str("src");
        let pat = Value::owned_str("");
        assert_eq!(src.remove_occurrences(&pat).unwrap().as_str(), Some("src"));
    }

    #[test]
    fn remove_occurrences_elides_every_match() {
        let src = Value::owned_str("abcabc");
        let pat = Value::owned_str("abc");
        assert_eq!(src.remove_occurrences(&pat).unwrap().as_str(), Some(""));
    }

    #[test]
    fn remove_occurrences_foobarfoo() {
        let src = Value::owned_str("foobarfoo");
        let pat = Value::owned_str("foo");
        assert_eq!(src.remove_occurrences(&pat).unwrap().as_str(), Some("bar"));
    }

    #[test]
    fn normalize_stores_integer_valued_float_as_integer() {
        let v = Value::owned_float(3.0).normalize_for_storage();
        assert!(matches!(v.kind, ValueKind::Integer(3)));
    }

    #[test]
    fn normalize_keeps_fractional_float() {
        let v = Value::owned_float(3.5).normalize_for_storage();
        assert!(matches!(v.kind, ValueKind::Float(f) if f == 3.5));
    }
}
