//! Type descriptors: name, parents, cached well-known-method slots, and an
//! attribute dictionary (spec §3 "Types", §4.D).
//!
//! Only user-defined types (via the `type Name { ... }` statement) carry
//! real slots and an attribute dictionary that scripts can extend — builtin
//! types (`int`, `str`, ...) are represented by a [`TypeObj`] too, for
//! uniform `type(x)`/`issub` introspection, but their operators are
//! resolved natively by the VM rather than through a slot indirection (see
//! `ember_vm::interpreter::resolve_binary_op`), since there is nothing a
//! script could usefully override on a builtin without also being able to
//! subclass it, which this spec does not ask for.

use crate::types::dict::KDict;
use crate::value::Value;
use ember_core::error::Error;
use ember_core::gc::Gc;
use std::cell::RefCell;

/// Cached pointers to the operator/protocol methods a user type may define
/// (spec §3: "cached pointers to well-known methods (constructor,
/// finalizer, string conversion, hash, call, getattr/setattr,
/// getitem/setitem, each binary and unary operator)").
#[derive(Debug, Default, Clone)]
pub struct Slots {
    pub new: Option<Value>,
    pub init: Option<Value>,
    pub str_: Option<Value>,
    pub repr_: Option<Value>,
    pub hash_: Option<Value>,
    pub call: Option<Value>,
    pub getattr: Option<Value>,
    pub setattr: Option<Value>,
    pub getitem: Option<Value>,
    pub setitem: Option<Value>,
    pub add: Option<Value>,
    pub sub: Option<Value>,
    pub mul: Option<Value>,
    pub div: Option<Value>,
    pub modulo: Option<Value>,
    pub pow: Option<Value>,
    pub lt: Option<Value>,
    pub le: Option<Value>,
    pub gt: Option<Value>,
    pub ge: Option<Value>,
    pub eq: Option<Value>,
    pub ne: Option<Value>,
    pub neg: Option<Value>,
    pub sqig: Option<Value>,
}

#[derive(Debug)]
pub struct TypeObj {
    pub name: String,
    pub parents: Vec<Gc<TypeObj>>,
    pub slots: RefCell<Slots>,
    pub attrs: RefCell<KDict>,
}

impl TypeObj {
    pub fn new(name: impl Into<String>, parents: Vec<Gc<TypeObj>>) -> Self {
        TypeObj {
            name: name.into(),
            parents,
            slots: RefCell::new(Slots::default()),
            attrs: RefCell::new(KDict::new()),
        }
    }

    pub fn builtin(name: impl Into<String>) -> Gc<TypeObj> {
        Gc::new(TypeObj::new(name, Vec::new()))
    }

    /// Transitive subtype test: `a == b` is the base case, otherwise search
    /// `a`'s parents (spec §4.D "Subtype test").
    pub fn issub(a: &Gc<TypeObj>, b: &Gc<TypeObj>) -> bool {
        if Gc::ptr_eq(a, b) {
            return true;
        }
        a.parents.iter().any(|p| TypeObj::issub(p, b))
    }

    /// Search this type's attribute dictionary, then recursively its
    /// parents in order ("first-parent-wins" ambiguity resolution, spec
    /// §3/§4.D).
    pub fn find_attr(self_ty: &Gc<TypeObj>, name: &str) -> Option<Value> {
        if let Ok(Some(v)) = self_ty.attrs.borrow().get(&Value::str(name)) {
            return Some(v.clone());
        }
        for parent in &self_ty.parents {
            if let Some(v) = TypeObj::find_attr(parent, name) {
                return Some(v);
            }
        }
        None
    }

    pub fn set_attr(&self, name: &str, value: Value) {
        self.attrs
            .borrow_mut()
            .set(Value::str(name), value)
            .expect("string keys are always hashable");
    }
}

/// Attribute lookup on a type object itself (`SomeType.attr`): well-known
/// slots are addressable by their conventional dunder-free names alongside
/// the ordinary attribute dictionary, grounded in
/// `examples/original_source/src/types/type.c`'s `type.__getattr__`, which
/// exposes `__name__`/`__repr__`/etc. the same way.
pub fn type_attr(ty: &Gc<TypeObj>, name: &str) -> Result<Value, Error> {
    if name == "__name__" {
        return Ok(Value::str(ty.name.clone()));
    }
    TypeObj::find_attr(ty, name).ok_or_else(|| {
        Error::attr(format!("type '{}' has no attribute '{}'", ty.name, name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issub_is_transitive_over_parents() {
        let grandparent = TypeObj::builtin("A");
        let parent = Gc::new(TypeObj::new("B", vec![Gc::newref(&grandparent)]));
        let child = Gc::new(TypeObj::new("C", vec![Gc::newref(&parent)]));
        assert!(TypeObj::issub(&child, &grandparent));
        assert!(TypeObj::issub(&child, &child));
        assert!(!TypeObj::issub(&grandparent, &child));
    }

    #[test]
    fn first_parent_wins_on_ambiguity() {
        let left = Gc::new(TypeObj::new("Left", vec![]));
        left.set_attr("greet", Value::str("left"));
        let right = Gc::new(TypeObj::new("Right", vec![]));
        right.set_attr("greet", Value::str("right"));
        let child = Gc::new(TypeObj::new(
            "Child",
            vec![Gc::newref(&left), Gc::newref(&right)],
        ));
        assert_eq!(
            TypeObj::find_attr(&child, "greet"),
            Some(Value::str("left"))
        );
    }
}
