//! Module loading (spec §4.K): directory search, compile-and-run, and the
//! process-wide cache that makes repeated imports of the same name return
//! the same instance.
//!
//! Native extension modules (a `.so` handle exporting a module-init symbol)
//! are explicitly out of scope beyond the interface they must provide —
//! [`NativeInit`] documents that contract; this crate never calls
//! `dlopen`/`libloading` itself.

use crate::config::Config;
use crate::interpreter::Vm;
use ember_core::error::Error;
use ember_core::gc::Gc;
use ember_runtime::types::module::ModuleObj;
use ember_runtime::value::Value;
use std::path::PathBuf;

/// Source files for script modules carry this extension.
pub const MODULE_EXTENSION: &str = "ember";

/// The signature a native extension module's exported initializer must have
/// (spec §4.K "Native extension module contract"): `(argc, argv) -> module
/// object`. Out of scope to actually load via `dlopen`; kept here purely as
/// the documented interface an embedder's own FFI glue would target.
pub type NativeInit = fn(&[Value]) -> Result<Value, Error>;

/// Search `config.module_paths` in order for `<name>.ember`.
fn find_source(config: &Config, name: &str) -> Option<PathBuf> {
    for dir in &config.module_paths {
        let candidate = dir.join(format!("{name}.{MODULE_EXTENSION}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Load (or fetch from cache) the module named `name` (spec §4.K: "Repeated
/// imports of the same name return the same cached module instance").
///
/// A script module's top level runs like any other program, except its
/// resulting globals become the module object's attribute dictionary
/// instead of being discarded.
pub fn load_module(vm: &mut Vm, name: &str) -> Result<Value, Error> {
    if let Some(cached) = vm.modules.get(name) {
        return Ok(cached);
    }
    let path = find_source(&vm.config, name)
        .ok_or_else(|| Error::attr(format!("no module named '{name}'")))?;
    let source = std::fs::read_to_string(&path)
        .map_err(|e| Error::internal(format!("reading module '{name}': {e}")))?;
    tracing::debug!(name, path = %path.display(), "loading module");

    let code = ember_compiler::compile(name, &source)
        .map_err(|e| Error::syntax(format!("compiling module '{name}': {}", e.0)))?;

    let mut module_vm = Vm::new(vm.config.clone());
    module_vm.run(code)?;

    let module = ModuleObj::new(name);
    for (key, value) in module_vm.globals {
        module.set(&key, value);
    }
    let value = Value::Module(Gc::new(module));
    vm.modules.insert(name, value.clone());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_module_is_attr_error() {
        let mut vm = Vm::new(Config::default());
        let err = load_module(&mut vm, "does_not_exist").unwrap_err();
        assert_eq!(err.kind, ember_core::error::ErrorKind::AttrError);
    }

    #[test]
    fn loads_script_module_and_caches_it() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("greet.ember"), "name = \"world\"\n").unwrap();
        let config = Config::default().with_module_path(dir.path());
        let mut vm = Vm::new(config);

        let first = load_module(&mut vm, "greet").unwrap();
        let second = load_module(&mut vm, "greet").unwrap();
        assert_eq!(first, second);
        match first {
            Value::Module(m) => assert_eq!(m.get("name"), Some(Value::str("world"))),
            _ => panic!("expected a module"),
        }
    }
}
