//! Hashing rules for dict keys (spec §4.B).
//!
//! - Strings hash by a simple byte-multiply-add polynomial, multiplier 31,
//!   seed 7.
//! - Integers that fit in 64 bits hash to their value; bigger integers hash
//!   their limb bytes through the same string polynomial.
//! - Floats whose value equals an integer hash as that integer, so
//!   `hash(1.0) == hash(1)`; other floats hash their binary representation.
//! - A hash of 0 is always remapped to 1, so dict implementations may use 0
//!   as an "empty bucket" sentinel (spec §3 Containers).

use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Byte-polynomial hash used for strings and, as a fallback, for arbitrary
/// byte sequences (big integer limbs).
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut h: u64 = 7;
    for &b in bytes {
        h = h.wrapping_mul(31).wrapping_add(b as u64);
    }
    normalize(h)
}

pub fn hash_str(s: &str) -> u64 {
    hash_bytes(s.as_bytes())
}

pub fn hash_i64(v: i64) -> u64 {
    normalize(v as u64)
}

pub fn hash_bigint(v: &BigInt) -> u64 {
    if let Some(small) = v.to_i64() {
        return hash_i64(small);
    }
    hash_bytes(&v.to_signed_bytes_le())
}

pub fn hash_f64(v: f64) -> u64 {
    if v.fract() == 0.0 && v.is_finite() && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        return hash_i64(v as i64);
    }
    normalize(v.to_bits())
}

pub fn hash_bool(v: bool) -> u64 {
    hash_i64(v as i64)
}

/// Zero is reserved as the dict's "empty bucket" marker.
fn normalize(h: u64) -> u64 {
    if h == 0 {
        1
    } else {
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hash_is_remapped() {
        assert_eq!(hash_bytes(&[]), 7); // seed alone, non-zero already
        assert_eq!(normalize(0), 1);
    }

    #[test]
    fn float_matching_int_hashes_equal() {
        assert_eq!(hash_f64(1.0), hash_i64(1));
        assert_eq!(hash_f64(-42.0), hash_i64(-42));
    }

    #[test]
    fn big_int_falls_back_to_small_hash_when_it_fits() {
        let v = BigInt::from(12345i64);
        assert_eq!(hash_bigint(&v), hash_i64(12345));
    }
}
