//! Property tests: fingerprints track content, never positions.

use dast_hash::{fingerprint, FingerprintPolicy};
use dast_types::{Node, Value};
use proptest::prelude::*;

fn policy() -> FingerprintPolicy {
    FingerprintPolicy::ignoring(["lineno", "col_offset", "end_lineno", "end_col_offset"])
}

/// A call `name(args...)` placed at `line`.
fn call(name: &str, args: &[i64], line: i64) -> Value {
    Node::new("Call")
        .with(
            "func",
            Node::new("Name").with("id", name).with("lineno", line),
        )
        .with(
            "args",
            Value::Seq(
                args.iter()
                    .map(|a| {
                        Node::new("Constant")
                            .with("value", *a)
                            .with("col_offset", line * 2)
                            .into()
                    })
                    .collect(),
            ),
        )
        .with("lineno", line)
        .into()
}

proptest! {
    #[test]
    fn positions_never_change_fingerprints(
        name in "[a-z]{1,8}",
        args in prop::collection::vec(any::<i64>(), 0..6),
        line_a in 1i64..10_000,
        line_b in 1i64..10_000,
    ) {
        let policy = policy();
        let a = fingerprint(&call(&name, &args, line_a), &policy).unwrap();
        let b = fingerprint(&call(&name, &args, line_b), &policy).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn argument_changes_always_change_fingerprints(
        args in prop::collection::vec(any::<i64>(), 1..6),
        slot in any::<prop::sample::Index>(),
        delta in 1i64..1000,
    ) {
        let policy = policy();
        let mut changed = args.clone();
        let i = slot.index(changed.len());
        changed[i] = changed[i].wrapping_add(delta);
        let a = fingerprint(&call("f", &args, 1), &policy).unwrap();
        let b = fingerprint(&call("f", &changed, 1), &policy).unwrap();
        prop_assert_ne!(a, b);
    }

    #[test]
    fn fingerprinting_is_deterministic(args in prop::collection::vec(any::<i64>(), 0..8)) {
        let policy = policy();
        let value = call("g", &args, 3);
        let fresh = value.clone();
        prop_assert_eq!(
            fingerprint(&value, &policy).unwrap(),
            fingerprint(&fresh, &policy).unwrap()
        );
    }
}
