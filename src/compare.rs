//! Tolerance-aware equivalence between expected and actual result sets
//!
//! Pure structural/numeric comparison; knows nothing about SQL. Floats
//! and decimals compare under a fixed absolute-difference threshold, all
//! other types compare exactly. A type mismatch is never tolerated.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::value::{Row, Value};

/// Absolute-difference threshold for FLOAT and DOUBLE values.
pub const FLOAT_TOLERANCE: f64 = 1e-3;

/// Comparison thresholds, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Tolerances {
    /// Inclusive bound on `|expected - actual|` for FLOAT and DOUBLE.
    pub float_abs: f64,
    /// Inclusive bound on `|expected - actual|` for DECIMAL.
    pub decimal_abs: Decimal,
}

impl Tolerances {
    /// Build both thresholds from a single float magnitude so they carry
    /// the same precision. `None` if the magnitude has no exact decimal
    /// representation.
    pub fn from_float(float_abs: f64) -> Option<Self> {
        Decimal::from_f64(float_abs).map(|decimal_abs| Self {
            float_abs,
            decimal_abs,
        })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::from_float(FLOAT_TOLERANCE).expect("FLOAT_TOLERANCE fits a Decimal")
    }
}

/// Verdict of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Equivalent,
    /// Not equivalent; carries a description of the first mismatch.
    NotEquivalent(String),
}

impl Comparison {
    pub fn is_equivalent(&self) -> bool {
        matches!(self, Comparison::Equivalent)
    }
}

/// Compare two result sets row-for-row, in order.
pub fn compare_results(expected: &[Row], actual: &[Row], tolerances: &Tolerances) -> Comparison {
    if expected.len() != actual.len() {
        return Comparison::NotEquivalent(format!(
            "row count mismatch: expected {} row(s), got {}",
            expected.len(),
            actual.len()
        ));
    }
    for (i, (exp, act)) in expected.iter().zip(actual).enumerate() {
        if let Comparison::NotEquivalent(why) = compare_rows(exp, act, tolerances) {
            return Comparison::NotEquivalent(format!("row {i}: {why}"));
        }
    }
    Comparison::Equivalent
}

/// Compare two rows value-for-value, in order.
pub fn compare_rows(expected: &Row, actual: &Row, tolerances: &Tolerances) -> Comparison {
    if expected.len() != actual.len() {
        return Comparison::NotEquivalent(format!(
            "column count mismatch: expected {} value(s), got {}",
            expected.len(),
            actual.len()
        ));
    }
    for (i, (exp, act)) in expected.iter().zip(actual).enumerate() {
        if let Comparison::NotEquivalent(why) = compare_values(exp, act, tolerances) {
            return Comparison::NotEquivalent(format!("column {i}: {why}"));
        }
    }
    Comparison::Equivalent
}

/// Compare two scalar values.
///
/// Exact equality always passes. Otherwise the values must share a
/// declared type; FLOAT, DOUBLE and DECIMAL then fall back to the
/// absolute-difference threshold, every other type is exact-only.
pub fn compare_values(expected: &Value, actual: &Value, tolerances: &Tolerances) -> Comparison {
    if expected == actual {
        return Comparison::Equivalent;
    }
    if std::mem::discriminant(expected) != std::mem::discriminant(actual) {
        return Comparison::NotEquivalent(format!(
            "type mismatch: expected {} {expected:?}, got {} {actual:?}",
            expected.type_name(),
            actual.type_name()
        ));
    }
    match (expected, actual) {
        (Value::Float32(exp), Value::Float32(act)) => {
            float_within(f64::from(*exp), f64::from(*act), tolerances.float_abs, "FLOAT")
        }
        (Value::Float64(exp), Value::Float64(act)) => {
            float_within(*exp, *act, tolerances.float_abs, "DOUBLE")
        }
        (Value::Decimal(exp), Value::Decimal(act)) => {
            let delta = (*exp - *act).abs();
            if delta <= tolerances.decimal_abs {
                tracing::warn!(
                    expected = %exp,
                    actual = %act,
                    delta = %delta,
                    "DECIMAL values differ within tolerance"
                );
                Comparison::Equivalent
            } else {
                Comparison::NotEquivalent(format!(
                    "DECIMAL {exp} vs {act} differ by {delta} (tolerance {})",
                    tolerances.decimal_abs
                ))
            }
        }
        // No tolerance rule exists for the remaining types; the exact
        // equality failure above is final.
        _ => Comparison::NotEquivalent(format!(
            "{}: expected {expected:?}, got {actual:?}",
            expected.type_name()
        )),
    }
}

fn float_within(expected: f64, actual: f64, limit: f64, type_name: &str) -> Comparison {
    let delta = (expected - actual).abs();
    if delta <= limit {
        tracing::warn!(
            expected,
            actual,
            delta,
            "{type_name} values differ within tolerance"
        );
        Comparison::Equivalent
    } else {
        Comparison::NotEquivalent(format!(
            "{type_name} {expected} vs {actual} differ by {delta} (tolerance {limit})"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tol() -> Tolerances {
        Tolerances::default()
    }

    #[test]
    fn test_default_thresholds_share_precision() {
        let t = Tolerances::default();
        assert_eq!(t.float_abs, 1e-3);
        assert_eq!(t.decimal_abs, Decimal::new(1, 3));
    }

    #[test]
    fn test_identical_values_equivalent() {
        assert!(compare_values(&Value::Int64(5), &Value::Int64(5), &tol()).is_equivalent());
        assert!(compare_values(&Value::Float64(1.5), &Value::Float64(1.5), &tol()).is_equivalent());
        assert!(compare_values(&Value::Null, &Value::Null, &tol()).is_equivalent());
    }

    #[test]
    fn test_double_boundary_is_inclusive() {
        // 0.001 and 0.0 both have the delta exactly at the threshold.
        let exp = Value::Float64(0.0);
        assert!(compare_values(&exp, &Value::Float64(0.001), &tol()).is_equivalent());
        assert!(!compare_values(&exp, &Value::Float64(0.0011), &tol()).is_equivalent());
    }

    #[test]
    fn test_float_widens_before_comparing() {
        let exp = Value::Float32(1.0);
        assert!(compare_values(&exp, &Value::Float32(1.0005), &tol()).is_equivalent());
        assert!(!compare_values(&exp, &Value::Float32(1.002), &tol()).is_equivalent());
    }

    #[test]
    fn test_decimal_boundary_is_inclusive() {
        let exp = Value::Decimal(Decimal::new(2000, 3)); // 2.000
        let at = Value::Decimal(Decimal::new(2001, 3)); // 2.001
        let over = Value::Decimal(Decimal::new(20011, 4)); // 2.0011
        assert!(compare_values(&exp, &at, &tol()).is_equivalent());
        assert!(!compare_values(&exp, &over, &tol()).is_equivalent());
    }

    #[test]
    fn test_type_mismatch_never_tolerated() {
        // Numerically identical, but FLOAT vs DOUBLE.
        let verdict = compare_values(&Value::Float32(1.0), &Value::Float64(1.0), &tol());
        match verdict {
            Comparison::NotEquivalent(why) => assert!(why.contains("type mismatch")),
            Comparison::Equivalent => panic!("FLOAT vs DOUBLE must not be equivalent"),
        }
    }

    #[test]
    fn test_non_tolerant_types_are_exact() {
        assert!(!compare_values(&Value::Int64(1), &Value::Int64(2), &tol()).is_equivalent());
        assert!(!compare_values(
            &Value::Text("a".into()),
            &Value::Text("a ".into()),
            &tol()
        )
        .is_equivalent());
        assert!(!compare_values(
            &Value::Bytes(vec![1]),
            &Value::Bytes(vec![1, 0]),
            &tol()
        )
        .is_equivalent());
    }

    #[test]
    fn test_row_count_gate() {
        let one = vec![vec![Value::Int64(1)]];
        let two = vec![vec![Value::Int64(1)], vec![Value::Int64(1)]];
        assert!(!compare_results(&one, &two, &tol()).is_equivalent());
    }

    #[test]
    fn test_column_count_gate() {
        let wide: Row = vec![Value::Int64(1), Value::Int64(2)];
        let narrow: Row = vec![Value::Int64(1)];
        assert!(!compare_rows(&wide, &narrow, &tol()).is_equivalent());
    }

    #[test]
    fn test_row_order_sensitive() {
        let forward = vec![vec![Value::Int64(1)], vec![Value::Int64(2)]];
        let reversed = vec![vec![Value::Int64(2)], vec![Value::Int64(1)]];
        assert!(compare_results(&forward, &forward.clone(), &tol()).is_equivalent());
        assert!(!compare_results(&forward, &reversed, &tol()).is_equivalent());
    }

    #[test]
    fn test_mismatch_names_position() {
        let expected = vec![vec![Value::Int64(1), Value::Int64(2)]];
        let actual = vec![vec![Value::Int64(1), Value::Int64(3)]];
        match compare_results(&expected, &actual, &tol()) {
            Comparison::NotEquivalent(why) => {
                assert!(why.contains("row 0"));
                assert!(why.contains("column 1"));
            }
            Comparison::Equivalent => panic!("expected a mismatch"),
        }
    }
}
