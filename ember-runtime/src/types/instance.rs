//! The generic object layout used when a user type's `__new__` slot is
//! absent (spec §4.D: "If `__new__` is absent, allocation defaults to the
//! generic object layout"), and also used as the allocation a user-defined
//! `__new__` returns when it has nothing more specialized to do.
//!
//! Grounded in `examples/original_source/src/types/kobj.c`: the generic
//! object carries its type plus its own (initially empty) attribute
//! dictionary, and its `getattr`/`setattr` behavior is simply "look in my
//! own dict". Bound-method wrapping for methods found on the *type* instead
//! of the instance is spec §4.D step 3, implemented in
//! `ember_vm::interpreter::getattr`.

use crate::types::dict::KDict;
use crate::types::type_obj::TypeObj;
use crate::value::Value;
use ember_core::gc::Gc;
use std::cell::RefCell;

#[derive(Debug)]
pub struct Instance {
    pub ty: Gc<TypeObj>,
    pub attrs: RefCell<KDict>,
}

impl Instance {
    pub fn new(ty: Gc<TypeObj>) -> Self {
        Instance {
            ty,
            attrs: RefCell::new(KDict::new()),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.attrs
            .borrow()
            .get(&Value::str(name))
            .ok()
            .flatten()
            .cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        self.attrs
            .borrow_mut()
            .set(Value::str(name), value)
            .expect("string keys are always hashable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_round_trip() {
        let inst = Instance::new(TypeObj::builtin("Point"));
        inst.set_field("x", Value::int(42));
        assert_eq!(inst.get_field("x"), Some(Value::int(42)));
        assert_eq!(inst.get_field("y"), None);
    }
}
