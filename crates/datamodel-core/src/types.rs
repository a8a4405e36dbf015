//! Cell values held by the column store.
//!
//! `Scalar` is deliberately small: every field subtype coerces into one of these
//! variants at build time, so operators never see raw input again.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    /// Integers; temporal values are epoch milliseconds.
    I64(i64),
    F64(f64),
    Str(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::I64(v) => Some(*v as f64),
            Scalar::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Loose conversion of a raw JSON value; the field's coercion rule runs afterwards.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Scalar::I64(i),
                None => n.as_f64().map(Scalar::F64).unwrap_or(Scalar::Null),
            },
            Value::String(s) => Scalar::Str(s.clone()),
            other => Scalar::Str(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::I64(i) => Value::from(*i),
            // Non-finite floats have no JSON form.
            Scalar::F64(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Str(s) => Value::String(s.clone()),
        }
    }

    /// Equality used for group keys, join keys and set membership.
    ///
    /// Unlike `PartialEq`, nulls match nulls, `NaN` matches `NaN`, and integers
    /// compare numerically against floats.
    pub fn key_eq(&self, other: &Scalar) -> bool {
        use Scalar::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => (x.is_nan() && y.is_nan()) || x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::I64(i) => write!(f, "{i}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

/// Compare two scalar tuples lexicographically.
pub fn scalar_tuple_cmp(a: &[Scalar], b: &[Scalar]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match scalar_cmp(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Total order over scalars.
///
/// Nulls sort first, numbers compare numerically across `I64`/`F64` with `NaN`
/// after every other number, and mixed kinds order by variant rank.
pub fn scalar_cmp(a: &Scalar, b: &Scalar) -> Ordering {
    use Scalar::*;

    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Bool(x), Bool(y)) => x.cmp(y),
        (I64(x), I64(y)) => x.cmp(y),
        (Str(x), Str(y)) => x.cmp(y),
        (I64(_) | F64(_), I64(_) | F64(_)) => {
            let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            if x.is_nan() && y.is_nan() {
                Ordering::Equal
            } else if x.is_nan() {
                Ordering::Greater
            } else if y.is_nan() {
                Ordering::Less
            } else {
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        }
        _ => scalar_type_order(a).cmp(&scalar_type_order(b)),
    }
}

/// Assign a numeric order to scalar kinds for mixed comparisons and hashing.
pub(crate) fn scalar_type_order(s: &Scalar) -> u8 {
    use Scalar::*;
    match s {
        Null => 0,
        Bool(_) => 1,
        I64(_) | F64(_) => 2,
        Str(_) => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_eq_treats_null_and_nan_as_groupable() {
        assert!(Scalar::Null.key_eq(&Scalar::Null));
        assert!(Scalar::F64(f64::NAN).key_eq(&Scalar::F64(f64::NAN)));
        assert!(Scalar::I64(3).key_eq(&Scalar::F64(3.0)));
        assert!(!Scalar::Str("3".into()).key_eq(&Scalar::I64(3)));
        assert!(!Scalar::Null.key_eq(&Scalar::F64(0.0)));
    }

    #[test]
    fn nulls_sort_first_and_nan_after_numbers() {
        let mut values = vec![
            Scalar::F64(f64::NAN),
            Scalar::I64(2),
            Scalar::Null,
            Scalar::F64(-1.5),
        ];
        values.sort_by(scalar_cmp);
        assert_eq!(values[0], Scalar::Null);
        assert_eq!(values[1], Scalar::F64(-1.5));
        assert_eq!(values[2], Scalar::I64(2));
        assert!(matches!(values[3], Scalar::F64(v) if v.is_nan()));
    }

    #[test]
    fn json_conversion_keeps_integers_integral() {
        assert_eq!(Scalar::from_json(&serde_json::json!(7)), Scalar::I64(7));
        assert_eq!(Scalar::from_json(&serde_json::json!(7.5)), Scalar::F64(7.5));
        assert_eq!(Scalar::F64(f64::INFINITY).to_json(), serde_json::Value::Null);
    }
}
