//! Ember Compiler: source text to bytecode. Tokenizer (§4.F), parser
//! (§4.G, expressions by precedence climbing and statements by recursive
//! descent), and codegen (§4.H) — everything `ember-vm`'s interpreter
//! executes.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod token;

use ember_core::gc::Gc;
use ember_runtime::types::code::Code;

pub use codegen::CodeGen;
pub use error::CompileError;
pub use parser::Parser;

/// Compile a complete program (file or embed-API source string) to a code
/// object in one call: tokenize, parse, lower.
pub fn compile(name: &str, source: &str) -> Result<Gc<Code>, CompileError> {
    tracing::debug!(name, len = source.len(), "compiling program");
    let mut parser = Parser::new(source)?;
    let program = parser.parse_program()?;
    let code = CodeGen::compile_program(name, &program)?;
    Ok(code)
}

/// Compile a single expression, for the `-e <expr>` CLI form (spec §6).
pub fn compile_expr(source: &str) -> Result<Gc<Code>, CompileError> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_expression()?;
    let span = ember_core::span::Span::default();
    let program = ast::Stmt::Ret(Some(expr), span);
    let code = CodeGen::compile_program("<expr>", &program)?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_end_to_end_scenario_one() {
        let code = compile("<test>", "ret 1 + 2 * 3").unwrap();
        assert_eq!(code.consts, vec![ember_runtime::value::Value::int(7)]);
    }

    #[test]
    fn compile_expr_wraps_bare_expression_in_return() {
        let code = compile_expr("1 + 1").unwrap();
        assert!(!code.bytecode.is_empty());
    }
}
