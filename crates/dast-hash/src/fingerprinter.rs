//! Canonical structural hashing of trees.
//!
//! A scalar hashes its type and value. A node hashes its type tag followed by
//! `(field name, child fingerprint)` for every field that is neither ignored
//! nor `None`, in field-name order. A sequence hashes each element with its
//! index, unless it is held by a field declared order-independent, in which
//! case the sorted multiset of element fingerprints is hashed instead.

use std::collections::{BTreeSet, HashMap};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use dast_types::{Fingerprint, Scalar, Value};

use crate::error::{HashError, HashResult};
use crate::hasher::DomainHasher;

/// Nesting limit applied when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Which fields take part in equality, and how deep a tree may nest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintPolicy {
    /// Field names excluded from fingerprints at every depth.
    pub ignored_fields: BTreeSet<String>,
    /// Field names whose sequences compare as multisets.
    pub unordered_fields: BTreeSet<String>,
    /// Maximum nesting depth before the tree is rejected as malformed.
    pub max_depth: usize,
}

impl Default for FingerprintPolicy {
    fn default() -> Self {
        Self {
            ignored_fields: BTreeSet::new(),
            unordered_fields: BTreeSet::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FingerprintPolicy {
    /// A policy ignoring the given field names.
    pub fn ignoring<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored_fields: fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn is_ignored(&self, field: &str) -> bool {
        self.ignored_fields.contains(field)
    }

    pub fn is_unordered(&self, field: &str) -> bool {
        self.unordered_fields.contains(field)
    }
}

/// Memoizing fingerprinter scoped to one diff invocation.
///
/// Results are cached by the address of the value, which is stable because
/// the fingerprinter borrows the trees for `'t`. Each invocation builds its
/// own instance; instances are never shared.
pub struct Fingerprinter<'t> {
    policy: FingerprintPolicy,
    cache: HashMap<*const Value, Fingerprint>,
    _trees: PhantomData<&'t Value>,
}

impl<'t> Fingerprinter<'t> {
    pub fn new(policy: FingerprintPolicy) -> Self {
        Self {
            policy,
            cache: HashMap::new(),
            _trees: PhantomData,
        }
    }

    pub fn policy(&self) -> &FingerprintPolicy {
        &self.policy
    }

    /// Number of memoized values.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Fingerprint a value, reusing earlier results for the same value.
    pub fn fingerprint(&mut self, value: &'t Value) -> HashResult<Fingerprint> {
        self.compute(value, 0, false)
    }

    /// Fingerprint every element of a sequence, in order.
    pub fn fingerprint_all(&mut self, values: &'t [Value]) -> HashResult<Vec<Fingerprint>> {
        values.iter().map(|v| self.fingerprint(v)).collect()
    }

    fn compute(&mut self, value: &'t Value, depth: usize, unordered: bool) -> HashResult<Fingerprint> {
        let key = value as *const Value;
        if let Some(fp) = self.cache.get(&key) {
            return Ok(*fp);
        }
        if depth > self.policy.max_depth {
            return Err(HashError::MalformedTree {
                depth,
                reason: format!("nesting exceeds {} levels", self.policy.max_depth),
            });
        }

        let fp = match value {
            Value::Scalar(scalar) => scalar_fingerprint(scalar),
            Value::Node(node) => {
                if node.kind.is_empty() {
                    return Err(HashError::MalformedTree {
                        depth,
                        reason: "node has an empty type tag".to_string(),
                    });
                }
                let mut encoder = DomainHasher::NODE.start();
                encoder.str(&node.kind);
                for (name, child) in &node.fields {
                    if child.is_none() || self.policy.is_ignored(name) {
                        continue;
                    }
                    let child_unordered = self.policy.is_unordered(name);
                    let child_fp = self.compute(child, depth + 1, child_unordered)?;
                    encoder.str(name).fingerprint(&child_fp);
                }
                encoder.finish()
            }
            Value::Seq(items) => {
                let mut child_fps = Vec::with_capacity(items.len());
                for item in items {
                    child_fps.push(self.compute(item, depth + 1, false)?);
                }
                if unordered {
                    child_fps.sort();
                    let mut encoder = DomainHasher::UNORDERED.start();
                    encoder.u64(child_fps.len() as u64);
                    for fp in &child_fps {
                        encoder.fingerprint(fp);
                    }
                    encoder.finish()
                } else {
                    let mut encoder = DomainHasher::SEQUENCE.start();
                    encoder.u64(child_fps.len() as u64);
                    for (index, fp) in child_fps.iter().enumerate() {
                        encoder.u64(index as u64).fingerprint(fp);
                    }
                    encoder.finish()
                }
            }
        };

        self.cache.insert(key, fp);
        Ok(fp)
    }
}

fn scalar_fingerprint(scalar: &Scalar) -> Fingerprint {
    let mut encoder = DomainHasher::SCALAR.start();
    match scalar {
        Scalar::None => encoder.tag(0),
        Scalar::Bool(b) => encoder.tag(1).tag(u8::from(*b)),
        Scalar::Int(i) => encoder.tag(2).u64(*i as u64),
        Scalar::UInt(u) => encoder.tag(5).u64(*u),
        Scalar::Float(x) => encoder.tag(3).u64(x.to_bits()),
        Scalar::Str(s) => encoder.tag(4).str(s),
    };
    encoder.finish()
}

/// One-shot fingerprint of a value under `policy`, without caching.
pub fn fingerprint(value: &Value, policy: &FingerprintPolicy) -> HashResult<Fingerprint> {
    Fingerprinter::new(policy.clone()).fingerprint(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dast_types::Node;
    use serde_json::json;

    fn positions() -> FingerprintPolicy {
        FingerprintPolicy::ignoring(["lineno", "col_offset"])
    }

    fn parse(json: serde_json::Value) -> Value {
        Value::from_json(&json).unwrap()
    }

    fn name_at(id: &str, lineno: i64) -> Value {
        parse(json!({"_type": "Name", "id": id, "lineno": lineno, "col_offset": 4}))
    }

    #[test]
    fn ignored_fields_do_not_affect_fingerprint() {
        let policy = positions();
        let a = fingerprint(&name_at("x", 1), &policy).unwrap();
        let b = fingerprint(&name_at("x", 40), &policy).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn non_ignored_field_changes_fingerprint() {
        let policy = positions();
        let a = fingerprint(&name_at("x", 1), &policy).unwrap();
        let b = fingerprint(&name_at("y", 1), &policy).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn without_policy_positions_count() {
        let policy = FingerprintPolicy::default();
        let a = fingerprint(&name_at("x", 1), &policy).unwrap();
        let b = fingerprint(&name_at("x", 2), &policy).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn type_tag_is_part_of_identity() {
        let policy = FingerprintPolicy::default();
        let a = fingerprint(&Node::new("Pass").into(), &policy).unwrap();
        let b = fingerprint(&Node::new("Break").into(), &policy).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn scalar_types_are_distinguished() {
        let policy = FingerprintPolicy::default();
        let int = fingerprint(&Value::from(1), &policy).unwrap();
        let float = fingerprint(&Value::from(1.0), &policy).unwrap();
        let string = fingerprint(&Value::from("1"), &policy).unwrap();
        let seq = fingerprint(&Value::Seq(vec![Value::from(1)]), &policy).unwrap();
        assert_ne!(int, float);
        assert_ne!(int, string);
        assert_ne!(int, seq);
    }

    #[test]
    fn large_integers_are_exact() {
        let policy = FingerprintPolicy::default();
        let max = fingerprint(&parse(json!(u64::MAX)), &policy).unwrap();
        let below = fingerprint(&parse(json!(u64::MAX - 1)), &policy).unwrap();
        let wrapped = fingerprint(&Value::from(-1), &policy).unwrap();
        assert_ne!(max, below);
        assert_ne!(max, wrapped);
    }

    #[test]
    fn none_field_equals_absent_field() {
        let policy = FingerprintPolicy::default();
        let with_none: Value = Node::new("Return").with("value", Value::Scalar(Scalar::None)).into();
        let without: Value = Node::new("Return").into();
        assert_eq!(
            fingerprint(&with_none, &policy).unwrap(),
            fingerprint(&without, &policy).unwrap()
        );
    }

    #[test]
    fn sequences_are_order_sensitive_by_default() {
        let policy = FingerprintPolicy::default();
        let a = parse(json!({"_type": "List", "elts": [1, 2, 3]}));
        let b = parse(json!({"_type": "List", "elts": [3, 2, 1]}));
        assert_ne!(
            fingerprint(&a, &policy).unwrap(),
            fingerprint(&b, &policy).unwrap()
        );
    }

    #[test]
    fn unordered_fields_compare_as_multisets() {
        let mut policy = FingerprintPolicy::default();
        policy.unordered_fields.insert("elts".into());
        let a = parse(json!({"_type": "Set", "elts": [1, 2, 3]}));
        let b = parse(json!({"_type": "Set", "elts": [3, 2, 1]}));
        let c = parse(json!({"_type": "Set", "elts": [3, 2, 2]}));
        let fa = fingerprint(&a, &policy).unwrap();
        assert_eq!(fa, fingerprint(&b, &policy).unwrap());
        assert_ne!(fa, fingerprint(&c, &policy).unwrap());
    }

    #[test]
    fn depth_budget_rejects_deep_trees() {
        let mut value = Value::from(0);
        for _ in 0..20 {
            value = Value::Seq(vec![value]);
        }
        let policy = FingerprintPolicy {
            max_depth: 10,
            ..Default::default()
        };
        let err = fingerprint(&value, &policy).unwrap_err();
        assert!(matches!(err, HashError::MalformedTree { depth: 11, .. }));
    }

    #[test]
    fn empty_type_tag_is_malformed() {
        let value: Value = Node::new("").into();
        let err = fingerprint(&value, &FingerprintPolicy::default()).unwrap_err();
        assert!(matches!(err, HashError::MalformedTree { depth: 0, .. }));
    }

    #[test]
    fn memoizes_every_visited_value() {
        let value = parse(json!({"_type": "Assign", "targets": [{"_type": "Name", "id": "x"}], "value": 1}));
        let mut fingerprinter = Fingerprinter::new(FingerprintPolicy::default());
        let first = fingerprinter.fingerprint(&value).unwrap();
        // Assign, targets, Name, id, value
        assert_eq!(fingerprinter.cached(), 5);
        assert_eq!(fingerprinter.fingerprint(&value).unwrap(), first);
        assert_eq!(fingerprinter.cached(), 5);
    }
}
