//! Float normalization shared by cell equality and hashing.

const CANONICAL_NAN_BITS: u64 = 0x7ff8_0000_0000_0000;

/// Map a float to bits that are equal exactly when two cell numbers should
/// compare equal: `-0.0` folds into `0.0` and every NaN folds into one NaN.
pub(crate) fn normalize_float_for_hash(n: f64) -> u64 {
    if n.is_nan() {
        CANONICAL_NAN_BITS
    } else if n == 0.0 {
        0
    } else {
        n.to_bits()
    }
}
