//! Ember VM: the bytecode interpreter (§4.I) that runs the code objects
//! `ember-compiler` produces.

pub mod config;
pub mod error;
pub mod frame;
pub mod interpreter;
pub mod module_loader;

pub use config::Config;
pub use error::VmError;
pub use interpreter::Vm;

/// Compile and run a complete program in one call (spec §6 "Embed API":
/// "parse to an AST; codegen to a code object; execute via the VM").
pub fn run(name: &str, source: &str) -> Result<ember_runtime::value::Value, VmError> {
    let code = ember_compiler::compile(name, source).map_err(|e| VmError(e.0))?;
    let mut vm = Vm::new(Config::default());
    vm.run(code).map_err(VmError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_compiles_and_executes() {
        let result = run("<test>", "ret 1 + 2").unwrap();
        assert_eq!(result, ember_runtime::value::Value::int(3));
    }

    #[test]
    fn run_surfaces_syntax_errors_as_vm_error() {
        let err = run("<test>", "ret (").unwrap_err();
        assert_eq!(err.0.kind, ember_core::error::ErrorKind::SyntaxError);
    }
}
