//! Similarity scoring for pairing elements that are close but not equal.
//!
//! Scores range over `0.0..=1.0`. Equal fingerprints score 1. Nodes of
//! different kinds, scalars that differ and values of different
//! representation score 0. Nodes of the same kind score the mean of their
//! field scores, with the shared kind counted as one matching field;
//! sequences score `2 * lcs / (n + m)` over element fingerprints.

use std::collections::BTreeSet;

use dast_hash::Fingerprinter;
use dast_types::Value;

use crate::align::lcs_pairs;
use crate::error::DiffResult;

/// Similarity of two values under the fingerprinter's policy.
pub fn similarity<'t>(
    fingerprinter: &mut Fingerprinter<'t>,
    before: &'t Value,
    after: &'t Value,
) -> DiffResult<f64> {
    if fingerprinter.fingerprint(before)? == fingerprinter.fingerprint(after)? {
        return Ok(1.0);
    }

    match (before, after) {
        (Value::Node(b), Value::Node(a)) if b.kind == a.kind => {
            let names: BTreeSet<&String> = b
                .fields
                .iter()
                .chain(&a.fields)
                .filter(|(name, value)| {
                    !value.is_none() && !fingerprinter.policy().is_ignored(name)
                })
                .map(|(name, _)| name)
                .collect();
            let mut total = 1.0;
            for name in &names {
                total += similarity(fingerprinter, b.field(name), a.field(name))?;
            }
            Ok(total / (names.len() + 1) as f64)
        }
        (Value::Seq(b), Value::Seq(a)) => {
            if b.is_empty() && a.is_empty() {
                return Ok(1.0);
            }
            let bf = fingerprinter.fingerprint_all(b)?;
            let af = fingerprinter.fingerprint_all(a)?;
            let common = lcs_pairs(&bf, &af).len();
            Ok(2.0 * common as f64 / (b.len() + a.len()) as f64)
        }
        _ => Ok(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dast_hash::FingerprintPolicy;
    use serde_json::json;

    fn parse(json: serde_json::Value) -> Value {
        Value::from_json(&json).unwrap()
    }

    fn score(before: &Value, after: &Value) -> f64 {
        let mut fp = Fingerprinter::new(FingerprintPolicy::ignoring(["lineno"]));
        similarity(&mut fp, before, after).unwrap()
    }

    #[test]
    fn equal_values_score_one() {
        let a = parse(json!({"_type": "Name", "id": "x", "lineno": 1}));
        let b = parse(json!({"_type": "Name", "id": "x", "lineno": 9}));
        assert_eq!(score(&a, &b), 1.0);
    }

    #[test]
    fn sequences_score_by_common_subsequence() {
        let a = parse(json!([4, 5]));
        let b = parse(json!([4, 5, 6]));
        assert!((score(&a, &b) - 0.8).abs() < 1e-9);
        assert_eq!(score(&parse(json!([1])), &parse(json!([2]))), 0.0);
    }

    #[test]
    fn different_kinds_score_zero() {
        let a = parse(json!({"_type": "Name", "id": "x"}));
        let b = parse(json!({"_type": "Constant", "value": "x"}));
        assert_eq!(score(&a, &b), 0.0);
        assert_eq!(score(&Value::from(1), &Value::from(2)), 0.0);
        assert_eq!(score(&Value::from(1), &parse(json!([1]))), 0.0);
    }

    #[test]
    fn node_score_averages_fields_recursively() {
        let a = parse(json!({
            "_type": "Call",
            "func": {"_type": "Name", "id": "print"},
            "args": [{"_type": "Constant", "value": 1}]
        }));
        let b = parse(json!({
            "_type": "Call",
            "func": {"_type": "Name", "id": "print"},
            "args": [{"_type": "Constant", "value": 2}]
        }));
        // kind and func match, args share nothing
        assert!((score(&a, &b) - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn ignored_fields_do_not_dilute_score() {
        let a = parse(json!({"_type": "Name", "id": "x", "lineno": 1}));
        let b = parse(json!({"_type": "Name", "id": "y", "lineno": 2}));
        assert_eq!(score(&a, &b), 0.5);
    }
}
