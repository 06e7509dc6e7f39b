//! Host-facing wrapper around the language-level [`ember_core::error::Error`]
//! so embedders get plain `Result`-based `?` propagation from parse/codegen
//! without reaching into a VM error stack that doesn't exist yet at this
//! stage of the pipeline.

use ember_core::error::Error;
use std::fmt;

#[derive(Debug, Clone)]
pub struct CompileError(pub Error);

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CompileError {}

impl From<Error> for CompileError {
    fn from(e: Error) -> Self {
        CompileError(e)
    }
}
