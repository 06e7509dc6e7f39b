//! Iterators (SPEC_FULL supplement 1: recovered from
//! `examples/original_source/src/types/iter/{list,dict}.c`, needed to back
//! the `for` statement spec §8 scenario 5 exercises).
//!
//! `next` returns `Err(Error::stop_iter())` once exhausted; callers (the
//! `next` builtin, `for`-loop codegen's handler) treat that exactly like
//! any other catchable error, just with the dedicated `StopIter` kind so it
//! can be told apart from a genuine failure.

use crate::value::Value;
use ember_core::error::Error;

#[derive(Debug)]
pub enum IterState {
    Seq { items: Vec<Value>, pos: usize },
    /// Dict iteration snapshots `(key, value)` tuples at creation time,
    /// since mutating a dict mid-iteration has unspecified behavior here
    /// (spec §5: "iteration order over a dict is not guaranteed").
    DictEntries { items: Vec<(Value, Value)>, pos: usize },
}

impl IterState {
    pub fn over_list(items: Vec<Value>) -> Self {
        IterState::Seq { items, pos: 0 }
    }

    pub fn over_dict(items: Vec<(Value, Value)>) -> Self {
        IterState::DictEntries { items, pos: 0 }
    }

    pub fn next(&mut self) -> Result<Value, Error> {
        match self {
            IterState::Seq { items, pos } => {
                if *pos >= items.len() {
                    return Err(Error::stop_iter());
                }
                let v = items[*pos].clone();
                *pos += 1;
                Ok(v)
            }
            IterState::DictEntries { items, pos } => {
                if *pos >= items.len() {
                    return Err(Error::stop_iter());
                }
                let (k, v) = items[*pos].clone();
                *pos += 1;
                Ok(Value::Tuple(ember_core::gc::Gc::new(
                    crate::types::tuple::KTuple::from_vec(vec![k, v]),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::error::ErrorKind;

    #[test]
    fn exhausted_iterator_raises_stop_iter() {
        let mut it = IterState::over_list(vec![Value::int(1)]);
        assert_eq!(it.next().unwrap(), Value::int(1));
        let err = it.next().unwrap_err();
        assert_eq!(err.kind, ErrorKind::StopIter);
    }
}
