//! Structured addressing of locations inside a tree.
//!
//! A [`Path`] is a sequence of [`PathStep`]s walked from the root. It renders
//! as `root.body[3].value` and parses back from the same form, but it is never
//! evaluated as text: lookups go through [`Value::resolve`].
//!
//! [`Value::resolve`]: crate::Value::resolve

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// One step from a value to one of its children.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    /// A named field of a node.
    Field(String),
    /// A position inside a sequence.
    Index(usize),
}

/// Location of a value relative to the root of a tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<PathStep>);

impl Path {
    /// The empty path, addressing the root itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from explicit steps.
    pub fn from_steps(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }

    /// A new path extended by a field step.
    pub fn field(&self, name: impl Into<String>) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Field(name.into()));
        Self(steps)
    }

    /// A new path extended by an index step.
    pub fn index(&self, index: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep::Index(index));
        Self(steps)
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// Split a path ending in an index step into its container and the index.
    pub fn split_index(&self) -> Option<(Path, usize)> {
        match self.0.split_last()? {
            (PathStep::Index(i), init) => Some((Self(init.to_vec()), *i)),
            _ => None,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for step in &self.0 {
            match step {
                PathStep::Field(name) => write!(f, ".{name}")?,
                PathStep::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TypeError::InvalidPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let mut rest = s
            .strip_prefix("root")
            .ok_or_else(|| invalid("must start with `root`"))?;
        let mut steps = Vec::new();

        while !rest.is_empty() {
            if let Some(after_dot) = rest.strip_prefix('.') {
                let end = after_dot
                    .find(['.', '['])
                    .unwrap_or(after_dot.len());
                let name = &after_dot[..end];
                if name.is_empty() {
                    return Err(invalid("empty field name"));
                }
                steps.push(PathStep::Field(name.to_string()));
                rest = &after_dot[end..];
            } else if let Some(after_bracket) = rest.strip_prefix('[') {
                let end = after_bracket
                    .find(']')
                    .ok_or_else(|| invalid("unclosed `[`"))?;
                let index = after_bracket[..end]
                    .parse::<usize>()
                    .map_err(|e| invalid(&e.to_string()))?;
                steps.push(PathStep::Index(index));
                rest = &after_bracket[end + 1..];
            } else {
                return Err(invalid("expected `.` or `[`"));
            }
        }

        Ok(Self(steps))
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
