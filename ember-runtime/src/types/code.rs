//! Executable bytecode objects: an instruction buffer, a deduplicated
//! constant pool, and a side table from byte offset to source span for
//! line-accurate diagnostics (spec §3 "Code & AST", §4.H).
//!
//! The spec's side table maps offsets to AST nodes; since the AST type
//! lives in `ember-compiler` (above `ember-runtime` in the dependency
//! graph — `Code` is a runtime object shared by codegen *and* the VM), this
//! stores the span each AST node carried instead of the node itself. That
//! preserves everything a diagnostic needs (source location) without an
//! upward dependency from the runtime onto the compiler.

use crate::value::Value;
use ember_core::span::Span;

#[derive(Debug, Clone)]
pub struct Code {
    pub name: String,
    pub bytecode: Vec<u8>,
    pub consts: Vec<Value>,
    /// `(byte_offset, span)` pairs in ascending offset order; one entry per
    /// instruction that was lowered from a distinct AST node.
    spans: Vec<(u32, Span)>,
}

impl Code {
    pub fn new(name: impl Into<String>, bytecode: Vec<u8>, consts: Vec<Value>, spans: Vec<(u32, Span)>) -> Self {
        Code {
            name: name.into(),
            bytecode,
            consts,
            spans,
        }
    }

    /// The span "active" at `offset`: the most recent entry whose offset is
    /// `<= offset` (spec §4.H: "a side table records which AST node is
    /// 'active' for each byte offset").
    pub fn span_at(&self, offset: u32) -> Option<Span> {
        match self.spans.binary_search_by_key(&offset, |(o, _)| *o) {
            Ok(i) => Some(self.spans[i].1),
            Err(0) => None,
            Err(i) => Some(self.spans[i - 1].1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_at_finds_most_recent_entry_at_or_before_offset() {
        let code = Code::new(
            "<test>",
            vec![],
            vec![],
            vec![
                (0, Span::new(0, 1, 1, 1)),
                (5, Span::new(10, 1, 1, 11)),
            ],
        );
        assert_eq!(code.span_at(0).unwrap().offset, 0);
        assert_eq!(code.span_at(3).unwrap().offset, 0);
        assert_eq!(code.span_at(5).unwrap().offset, 10);
        assert_eq!(code.span_at(100).unwrap().offset, 10);
    }
}
