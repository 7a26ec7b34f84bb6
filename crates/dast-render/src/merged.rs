//! The merged tree: a copy of the after tree with deletions re-inserted and
//! every change annotated in place.

use std::collections::BTreeMap;

use dast_types::{Scalar, Value};

/// Value of an absent field in a merged node.
pub static MISSING: Merged = Merged::Scalar(Scalar::None);

/// Display annotation of one sequence element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mark {
    Plain,
    Inserted,
    Deleted,
    Moved,
}

/// A sequence element with its annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct Marked {
    pub mark: Mark,
    pub value: Merged,
}

impl Marked {
    pub fn new(mark: Mark, value: Merged) -> Self {
        Self { mark, value }
    }

    /// Returns `true` unless the element exists only in the before tree.
    pub fn is_visible(&self) -> bool {
        self.mark != Mark::Deleted
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MergedNode {
    pub kind: String,
    pub fields: BTreeMap<String, Merged>,
}

impl MergedNode {
    /// The value of a field, or [`MISSING`] when absent.
    pub fn field(&self, name: &str) -> &Merged {
        self.fields.get(name).unwrap_or(&MISSING)
    }

    /// Elements of a sequence field; empty when the field is not a sequence.
    pub fn items(&self, name: &str) -> &[Marked] {
        match self.field(name) {
            Merged::Seq(items) => items,
            _ => &[],
        }
    }
}

/// A node of the merged tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Merged {
    Scalar(Scalar),
    Node(MergedNode),
    Seq(Vec<Marked>),
    /// A value replaced in place.
    Delta { old: Box<Merged>, new: Box<Merged> },
}

impl Merged {
    /// Copy a plain value without annotations.
    pub fn lift(value: &Value) -> Merged {
        match value {
            Value::Scalar(s) => Merged::Scalar(s.clone()),
            Value::Node(n) => Merged::Node(MergedNode {
                kind: n.kind.clone(),
                fields: n
                    .fields
                    .iter()
                    .map(|(name, v)| (name.clone(), Merged::lift(v)))
                    .collect(),
            }),
            Value::Seq(items) => Merged::Seq(
                items
                    .iter()
                    .map(|v| Marked::new(Mark::Plain, Merged::lift(v)))
                    .collect(),
            ),
        }
    }

    pub fn delta(old: &Value, new: &Value) -> Merged {
        Merged::Delta {
            old: Box::new(Merged::lift(old)),
            new: Box::new(Merged::lift(new)),
        }
    }

    /// Returns `true` for `None` and absent values.
    pub fn is_none(&self) -> bool {
        matches!(self, Merged::Scalar(Scalar::None))
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, Merged::Delta { .. })
    }

    pub fn as_node(&self) -> Option<&MergedNode> {
        match self {
            Merged::Node(n) => Some(n),
            _ => None,
        }
    }

    /// The value as it reads in the after tree: the new side of a delta.
    pub fn current(&self) -> &Merged {
        match self {
            Merged::Delta { new, .. } => new.current(),
            other => other,
        }
    }

    /// Kind of the node this value holds in the after tree.
    pub fn kind(&self) -> Option<&str> {
        self.current().as_node().map(|n| n.kind.as_str())
    }
}
