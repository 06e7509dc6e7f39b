//! Module objects (spec §3, §4.K): a name and an attribute dictionary.
//!
//! The directory search, file loading, and native-library `.so` handle
//! opening described in spec §4.K/§6 require compiling and *executing*
//! script source, which needs the VM — so that orchestration lives in
//! `ember-vm`'s module loader, which builds and caches `ModuleObj` values
//! using the type defined here. This crate only owns the data shape and the
//! name -> cached-instance map (spec §4.K: "repeated imports of the same
//! name return the same cached module instance").

use crate::types::dict::KDict;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug)]
pub struct ModuleObj {
    pub name: String,
    pub attrs: RefCell<KDict>,
}

impl ModuleObj {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleObj {
            name: name.into(),
            attrs: RefCell::new(KDict::new()),
        }
    }

    pub fn set(&self, name: &str, value: Value) {
        self.attrs
            .borrow_mut()
            .set(Value::str(name), value)
            .expect("string keys are always hashable");
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.attrs.borrow().get(&Value::str(name)).ok().flatten().cloned()
    }
}

/// Name -> already-loaded-module cache, shared process-wide per spec §5
/// ("the module cache... are process-wide. Only the VM thread may mutate
/// them"). One `ModuleCache` per VM/embedding.
#[derive(Debug, Default)]
pub struct ModuleCache {
    loaded: HashMap<String, Value>,
}

impl ModuleCache {
    pub fn new() -> Self {
        ModuleCache::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.loaded.get(name).cloned()
    }

    pub fn insert(&mut self, name: impl Into<String>, module: Value) {
        self.loaded.insert(name.into(), module);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_attrs_round_trip() {
        let m = ModuleObj::new("math");
        m.set("pi", Value::Float(std::f64::consts::PI));
        assert_eq!(m.get("pi"), Some(Value::Float(std::f64::consts::PI)));
    }

    #[test]
    fn cache_returns_same_instance_on_repeat_import() {
        let mut cache = ModuleCache::new();
        let m = Value::str("pretend-module");
        cache.insert("foo", m.clone());
        assert_eq!(cache.get("foo"), Some(m));
        assert_eq!(cache.get("bar"), None);
    }
}
