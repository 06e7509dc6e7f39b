//! Immutable tuples (spec §3, §4.C).
//!
//! The source allocates tuples as one block of inline element pointers with
//! two construction variants — one that increfs every incoming element, one
//! that adopts ownership without increfing. In idiomatic Rust both
//! collapse to the same thing: `Vec<Value>` already owns its elements
//! (moving a `Value` in is the "adopt" path; `Value::clone` on a `Gc`
//! variant is the incref). We keep both constructors anyway so call sites
//! read the same way the spec's vocabulary does.

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct KTuple {
    items: Vec<Value>,
}

impl KTuple {
    /// Construct from owned items (the "adopt ownership" fast path — no
    /// extra clone needed since the caller already owns each `Value`).
    pub fn from_vec(items: Vec<Value>) -> Self {
        KTuple { items }
    }

    /// Construct by cloning (increfing) each element from a borrowed slice
    /// (the "normal" construction path, spec §4.C).
    pub fn from_slice(items: &[Value]) -> Self {
        KTuple {
            items: items.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: i64) -> Option<&Value> {
        normalize_index(index, self.items.len()).and_then(|i| self.items.get(i))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn repr(&self) -> String {
        if self.items.len() == 1 {
            return format!("({},)", self.items[0].repr_of());
        }
        let parts: Vec<String> = self.items.iter().map(Value::repr_of).collect();
        format!("({})", parts.join(", "))
    }
}

/// Negative indices count from the end, as in the source's `list`/`tuple`
/// indexing (spec §4.C doesn't spell this out explicitly; grounded in
/// `examples/original_source/src/types/list.c`'s index-normalization).
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let idx = if index < 0 { index + len } else { index };
    if idx < 0 || idx >= len {
        None
    } else {
        Some(idx as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_element_tuple_reprs_with_trailing_comma() {
        let t = KTuple::from_vec(vec![Value::int(5)]);
        assert_eq!(t.repr(), "(5,)");
    }

    #[test]
    fn negative_index_counts_from_end() {
        let t = KTuple::from_vec(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(t.get(-1), Some(&Value::int(3)));
        assert_eq!(t.get(-3), Some(&Value::int(1)));
        assert_eq!(t.get(3), None);
    }

    #[test]
    fn equality_is_elementwise() {
        let a = KTuple::from_vec(vec![Value::int(1), Value::int(2)]);
        let b = KTuple::from_vec(vec![Value::int(1), Value::int(2)]);
        assert_eq!(a, b);
    }
}
