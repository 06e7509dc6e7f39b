//! One call activation record (spec §4.I, GLOSSARY "Frame"): a value stack,
//! a locals scope, a program counter, and an exception-handler stack.
//!
//! `decref` happens for free here: a `Value` popped off `stack` and not
//! rebound anywhere is simply dropped, running its `Gc`'s `Drop` impl when
//! it was the last outstanding handle (spec §4.A).

use ember_core::error::Error;
use ember_runtime::types::code::Code;
use ember_runtime::value::Value;
use ember_core::gc::Gc;
use std::collections::HashMap;

/// A registered `(pc, stack_depth)` landing pad (spec GLOSSARY "Handler").
#[derive(Debug, Clone, Copy)]
pub struct Handler {
    pub pc: u32,
    pub stack_depth: usize,
}

pub struct Frame {
    pub code: Gc<Code>,
    pub stack: Vec<Value>,
    pub locals: HashMap<String, Value>,
    pub pc: usize,
    pub handlers: Vec<Handler>,
}

impl Frame {
    pub fn new(code: Gc<Code>) -> Self {
        Frame {
            code,
            stack: Vec::new(),
            locals: HashMap::new(),
            pc: 0,
            handlers: Vec::new(),
        }
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, Error> {
        self.stack
            .pop()
            .ok_or_else(|| Error::internal("value stack underflow"))
    }

    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, Error> {
        if self.stack.len() < n {
            return Err(Error::internal("value stack underflow"));
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    pub fn peek(&self) -> Result<&Value, Error> {
        self.stack
            .last()
            .ok_or_else(|| Error::internal("value stack underflow"))
    }

    /// Drop every value above `depth` (spec §4.I "Exception propagation":
    /// "truncates the value stack to the stored depth" — each popped value
    /// is decref'd simply by being dropped here, per §5 "Scoped
    /// acquisition").
    pub fn truncate_to(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Read a byte at the current PC and advance, for opcode decoding.
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let b = *self
            .code
            .bytecode
            .get(self.pc)
            .ok_or_else(|| Error::internal("program counter ran off the end of bytecode"))?;
        self.pc += 1;
        Ok(b)
    }

    /// Read a little-endian `u32` operand at the current PC and advance.
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self
            .code
            .bytecode
            .get(self.pc..self.pc + 4)
            .ok_or_else(|| Error::internal("truncated instruction operand"))?;
        let v = u32::from_le_bytes(bytes.try_into().unwrap());
        self.pc += 4;
        Ok(v)
    }

    pub fn const_at(&self, idx: u32) -> Result<Value, Error> {
        self.code
            .consts
            .get(idx as usize)
            .cloned()
            .ok_or_else(|| Error::internal("constant pool index out of range"))
    }

    pub fn const_name_at(&self, idx: u32) -> Result<String, Error> {
        match self.const_at(idx)? {
            Value::Str(s) => Ok(s.as_str().to_string()),
            _ => Err(Error::internal("name operand did not index a string constant")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_code() -> Gc<Code> {
        Gc::new(Code::new("<test>", vec![], vec![], vec![]))
    }

    #[test]
    fn pop_on_empty_stack_is_internal_error() {
        let mut f = Frame::new(empty_code());
        assert!(f.pop().is_err());
    }

    #[test]
    fn truncate_drops_values_above_depth() {
        let mut f = Frame::new(empty_code());
        f.push(Value::int(1));
        f.push(Value::int(2));
        f.push(Value::int(3));
        f.truncate_to(1);
        assert_eq!(f.depth(), 1);
        assert_eq!(f.pop().unwrap(), Value::int(1));
    }

    #[test]
    fn pop_n_returns_in_original_order() {
        let mut f = Frame::new(empty_code());
        f.push(Value::int(1));
        f.push(Value::int(2));
        let popped = f.pop_n(2).unwrap();
        assert_eq!(popped, vec![Value::int(1), Value::int(2)]);
    }
}
