//! Ember CLI: run a script file or a bare expression (spec §6 "CLI
//! surface"). Thin by design — everything here is wiring over
//! `ember-compiler`/`ember-vm`'s library API; the only logic that lives in
//! this crate is argument parsing, subscriber setup, and exit-code mapping.

use clap::Parser as ClapParser;
use ember_core::error::ErrorStack;
use ember_vm::{Config, Vm};
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "ember")]
#[command(about = "Run an Ember script", long_about = None)]
struct Cli {
    /// Script file to run
    #[arg(required_unless_present = "expr")]
    file: Option<PathBuf>,

    /// Evaluate a single expression instead of a file
    #[arg(short = 'e', long = "eval", value_name = "EXPR")]
    expr: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ember=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::module_paths_from_env("EMBER_PATH")
        .into_iter()
        .fold(Config::default(), |cfg, path| cfg.with_module_path(path));

    let result = match &cli.expr {
        Some(expr) => run_expr(expr, config),
        None => run_file(cli.file.as_ref().expect("clap enforces file or --eval"), config),
    };

    if let Err(rendered) = result {
        eprint!("{rendered}");
        process::exit(1);
    }
}

fn run_file(path: &PathBuf, config: Config) -> Result<(), String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("reading '{}': {e}\n", path.display()))?;
    let name = path.to_string_lossy().into_owned();
    let code = ember_compiler::compile(&name, &source).map_err(|e| render_one(&e.0, &source))?;
    let mut vm = Vm::new(config);
    vm.run(code)
        .map_err(|_| vm.error_stack.render(&source))?;
    Ok(())
}

fn run_expr(expr: &str, config: Config) -> Result<(), String> {
    let code = ember_compiler::compile_expr(expr).map_err(|e| render_one(&e.0, expr))?;
    let mut vm = Vm::new(config);
    vm.run(code)
        .map_err(|_| vm.error_stack.render(expr))?;
    Ok(())
}

/// Render a single pre-VM error (tokenizer/parser/codegen) the same way an
/// uncaught runtime error is rendered (spec §7): kind, message, and a
/// caret-underlined source excerpt. There is no error stack this early in
/// the pipeline, so a throwaway one-entry stack stands in for it.
fn render_one(err: &ember_core::error::Error, source: &str) -> String {
    let mut stack = ErrorStack::new();
    stack.push(err.clone());
    stack.render(source)
}
