//! Stable key fingerprints for hash grouping, hash joins and set membership.
//!
//! Fingerprints only pick a bucket; callers confirm matches with `Scalar::key_eq`,
//! so a collision costs a comparison, never a wrong answer.

use blake3::Hasher;

use crate::types::{scalar_type_order, Scalar};

/// Fingerprint a key tuple. Values that are `key_eq` hash identically.
pub fn key_fingerprint<'a, I>(values: I) -> u64
where
    I: IntoIterator<Item = &'a Scalar>,
{
    let mut hasher = Hasher::new();
    for value in values {
        hash_scalar(value, &mut hasher);
    }
    let hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

/// Element-wise `key_eq` over two key tuples.
pub fn keys_eq(a: &[&Scalar], b: &[&Scalar]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.key_eq(y))
}

fn hash_scalar(scalar: &Scalar, hasher: &mut Hasher) {
    hasher.update(&[scalar_type_order(scalar)]);

    match scalar {
        Scalar::Null => {}
        Scalar::Bool(b) => {
            hasher.update(&[*b as u8]);
        }
        // Integers and floats share a numeric domain under key_eq.
        Scalar::I64(_) | Scalar::F64(_) => {
            let v = scalar.as_f64().unwrap_or(f64::NAN);
            let bits = if v.is_nan() {
                f64::NAN.to_bits()
            } else if v == 0.0 {
                0.0f64.to_bits()
            } else {
                v.to_bits()
            };
            hasher.update(&bits.to_le_bytes());
        }
        Scalar::Str(s) => {
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_equal_values_share_a_fingerprint() {
        let a = [Scalar::I64(1), Scalar::Str("x".into())];
        let b = [Scalar::F64(1.0), Scalar::Str("x".into())];
        assert_eq!(key_fingerprint(&a), key_fingerprint(&b));
        assert_eq!(
            key_fingerprint(&[Scalar::F64(-0.0)]),
            key_fingerprint(&[Scalar::F64(0.0)])
        );
    }

    #[test]
    fn string_boundaries_are_part_of_the_key() {
        let a = [Scalar::Str("ab".into()), Scalar::Str("c".into())];
        let b = [Scalar::Str("a".into()), Scalar::Str("bc".into())];
        assert_ne!(key_fingerprint(&a), key_fingerprint(&b));
    }
}
