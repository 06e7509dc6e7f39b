//! Immutable UTF-8 strings with a cached length and hash (spec §3, §4.B).
//!
//! [`StrBuilder`] is the separate mutable helper mentioned in §4.B: it
//! accepts raw bytes or the `repr`/`str` of any value, and `finish` yields an
//! immutable [`KStr`]. A builder must not be reused without [`StrBuilder::reset`].

use crate::hashing::hash_str;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KStr {
    bytes: String,
    hash: u64,
}

impl KStr {
    pub fn new(s: impl Into<String>) -> Self {
        let bytes = s.into();
        let hash = hash_str(&bytes);
        KStr { bytes, hash }
    }

    pub fn as_str(&self) -> &str {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// NUL-terminated byte view for FFI callers (spec §3: "embedded NUL
    /// terminator for FFI").
    pub fn to_c_bytes(&self) -> Vec<u8> {
        let mut v = self.bytes.as_bytes().to_vec();
        v.push(0);
        v
    }

    pub fn concat(&self, other: &KStr) -> KStr {
        let mut s = self.bytes.clone();
        s.push_str(&other.bytes);
        KStr::new(s)
    }
}

impl std::fmt::Display for KStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.bytes)
    }
}

/// Mutable string-builder; `finish` yields an immutable [`KStr`] and
/// consumes the builder's buffer.
#[derive(Debug, Default)]
pub struct StrBuilder {
    buf: String,
    finished: bool,
}

impl StrBuilder {
    pub fn new() -> Self {
        StrBuilder::default()
    }

    /// Append raw bytes (assumed valid UTF-8 — the tokenizer and escape
    /// processing are the only producers of raw byte runs).
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        assert!(!self.finished, "StrBuilder used after finish");
        self.buf.push_str(&String::from_utf8_lossy(bytes));
    }

    pub fn push_str(&mut self, s: &str) {
        assert!(!self.finished, "StrBuilder used after finish");
        self.buf.push_str(s);
    }

    pub fn push_char(&mut self, c: char) {
        assert!(!self.finished, "StrBuilder used after finish");
        self.buf.push(c);
    }

    pub fn finish(mut self) -> KStr {
        self.finished = true;
        KStr::new(std::mem::take(&mut self.buf))
    }

    /// Reinitialize a finished builder so it can be used again (spec §4.B:
    /// "must not be used after finishing without reinitialization").
    pub fn reset(&mut self) {
        self.buf.clear();
        self.finished = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trips() {
        let mut b = StrBuilder::new();
        b.push_str("hello, ");
        b.push_str("world");
        let s = b.finish();
        assert_eq!(s.as_str(), "hello, world");
    }

    #[test]
    fn equal_strings_hash_equal() {
        let a = KStr::new("abc");
        let b = KStr::new("abc");
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic(expected = "used after finish")]
    fn builder_panics_after_finish() {
        let mut b = StrBuilder::new();
        b.push_str("x");
        let _ = b.finish();
        // Reusing the consumed builder's type directly isn't possible since
        // `finish` takes `self` by value; simulate reuse-after-finish via a
        // builder explicitly marked finished.
        let mut reused = StrBuilder {
            buf: String::new(),
            finished: true,
        };
        reused.push_str("y");
    }
}
