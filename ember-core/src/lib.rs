//! Ember Core: the object base and error model shared by every other Ember
//! crate.
//!
//! - `gc`: reference-counted object handles (component A of the spec: object
//!   base & refcount discipline).
//! - `error`: the error taxonomy, token-tagged diagnostics, and the per-VM
//!   error stack (component E).
//! - `span`: source locations, shared by the tokenizer, parser and error
//!   renderer.

pub mod error;
pub mod gc;
pub mod span;

pub use error::{Error, ErrorKind, ErrorStack};
pub use gc::Gc;
pub use span::Span;
