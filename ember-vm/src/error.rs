//! Host-facing wrapper around the language-level [`ember_core::error::Error`]
//! for `run`'s `Result` return, matching `ember_compiler::CompileError`'s
//! style so an embedder chaining `compile(...)?` then `run(...)?` gets the
//! same shape of error both times.

use ember_core::error::Error;
use std::fmt;

#[derive(Debug, Clone)]
pub struct VmError(pub Error);

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for VmError {}

impl From<Error> for VmError {
    fn from(e: Error) -> Self {
        VmError(e)
    }
}
