//! Host registry (component C) — the interop layer that lets native code
//! expose properties, arrays, and object graphs to scripts.
//!
//! The source's four-function-pointer descriptor plus a `user_data`-style
//! context pointer becomes a single Rust trait with default methods: a
//! descriptor that doesn't override `get_element` behaves exactly as if
//! that entry were null (spec §6: "any entry may be null; callers of a
//! null entry fail TypeMismatch").

use std::any::Any;
use std::rc::Rc;

use super::bucket_table::{BucketTable, Named};
use super::errors::ScriptError;
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSymbolKind {
    Property,
    Array,
    Object,
}

/// The quadruple of callbacks the source calls a "descriptor": property
/// access, element access, handle release, and a descriptor-level default
/// context. Any method left at its default behaves as a null entry.
pub trait HostDescriptor {
    fn default_context(&self) -> Option<Rc<dyn Any>> {
        None
    }

    fn get_property(
        &self,
        _context: Option<&Rc<dyn Any>>,
        _handle: &Rc<dyn Any>,
        _name: &str,
    ) -> Result<Value, ScriptError> {
        Err(ScriptError::TypeMismatch)
    }

    fn get_element(
        &self,
        _context: Option<&Rc<dyn Any>>,
        _handle: &Rc<dyn Any>,
        _index: i64,
    ) -> Result<Value, ScriptError> {
        Err(ScriptError::TypeMismatch)
    }

    fn release_handle(&self, _context: Option<&Rc<dyn Any>>, _handle: &Rc<dyn Any>) {}
}

/// A named binding to native data, resolved ahead of ordinary variables.
pub struct HostSymbol {
    pub name: String,
    pub kind: HostSymbolKind,
    pub handle: Rc<dyn Any>,
    pub descriptor: Rc<dyn HostDescriptor>,
    pub context: Option<Rc<dyn Any>>,
}

impl HostSymbol {
    pub fn new(
        name: impl Into<String>,
        kind: HostSymbolKind,
        handle: Rc<dyn Any>,
        descriptor: Rc<dyn HostDescriptor>,
        context: Option<Rc<dyn Any>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            handle,
            descriptor,
            context,
        }
    }

    /// The context a call against this symbol should use: the symbol's own
    /// context if present, else the descriptor's default.
    pub fn effective_context(&self) -> Option<Rc<dyn Any>> {
        self.context.clone().or_else(|| self.descriptor.default_context())
    }
}

impl Named for HostSymbol {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for HostSymbol {
    fn drop(&mut self) {
        let ctx = self.effective_context();
        self.descriptor.release_handle(ctx.as_ref(), &self.handle);
    }
}

/// A fixed bucket array of width 32 mapping name -> host symbol.
#[derive(Default)]
pub struct HostRegistry {
    table: BucketTable<HostSymbol>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name`; any prior entry of the same name is released
    /// (dropped) before the new one takes its place. Always succeeds: a
    /// `Rc<dyn HostDescriptor>` cannot be absent by construction, so the
    /// source's "reject if descriptor is null" check is enforced by the
    /// type system rather than at runtime (see DESIGN.md).
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: HostSymbolKind,
        handle: Rc<dyn Any>,
        descriptor: Rc<dyn HostDescriptor>,
        context: Option<Rc<dyn Any>>,
    ) -> bool {
        self.table.insert(HostSymbol::new(name, kind, handle, descriptor, context));
        true
    }

    pub fn unregister(&mut self, name: &str) {
        self.table.remove(name);
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn find(&self, name: &str) -> Option<&HostSymbol> {
        self.table.find(name)
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
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
    fn unregister_releases_handle() {
        let released = Rc::new(Cell::new(false));
        let mut registry = HostRegistry::new();
        registry.register(
            "thing",
            HostSymbolKind::Object,
            Rc::new(()) as Rc<dyn Any>,
            Rc::new(Recorder { released: released.clone() }),
            None,
        );
        assert!(!released.get());
        registry.unregister("thing");
        assert!(released.get());
    }

    #[test]
    fn reregistration_releases_prior_entry() {
        let released = Rc::new(Cell::new(false));
        let mut registry = HostRegistry::new();
        registry.register(
            "thing",
            HostSymbolKind::Property,
            Rc::new(()) as Rc<dyn Any>,
            Rc::new(Recorder { released: released.clone() }),
            None,
        );
        registry.register(
            "thing",
            HostSymbolKind::Property,
            Rc::new(()) as Rc<dyn Any>,
            Rc::new(Recorder { released: Rc::new(Cell::new(false)) }),
            None,
        );
        assert!(released.get());
    }

    #[test]
    fn clear_releases_every_symbol() {
        let released = Rc::new(Cell::new(false));
        let mut registry = HostRegistry::new();
        registry.register(
            "thing",
            HostSymbolKind::Property,
            Rc::new(()) as Rc<dyn Any>,
            Rc::new(Recorder { released: released.clone() }),
            None,
        );
        registry.clear();
        assert!(released.get());
        assert!(registry.is_empty());
    }
}
