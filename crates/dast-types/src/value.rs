//! The tree data model handed over by the external parser.
//!
//! Trees are exchanged as JSON: an object carrying a `"_type"` string is a
//! [`Node`] whose other keys are its fields, arrays are sequences and JSON
//! scalars are [`Scalar`]s.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as Json};

use crate::error::TypeError;
use crate::path::{Path, PathStep};

/// JSON key holding a node's type tag.
pub const TYPE_KEY: &str = "_type";

/// Value of an absent field.
pub static NONE: Value = Value::Scalar(Scalar::None);

/// A leaf value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    None,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX` that still fit a `u64`.
    UInt(u64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Literal source form: strings quoted, `None`, `True`, `False`.
    pub fn literal(&self) -> String {
        match self {
            Scalar::None => "None".to_string(),
            Scalar::Bool(true) => "True".to_string(),
            Scalar::Bool(false) => "False".to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::UInt(u) => u.to_string(),
            Scalar::Float(x) if x.is_finite() && x.fract() == 0.0 => format!("{x:.1}"),
            Scalar::Float(x) => x.to_string(),
            Scalar::Str(s) => quote(s),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal())
    }
}

fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

/// A typed tree element.
///
/// Fields live in a sorted map, so enumeration order depends only on the
/// field names. A field holding `None` is equivalent to an absent one.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: String,
    pub fields: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The value of a field, or [`NONE`] when absent.
    pub fn field(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NONE)
    }
}

/// A field value: a scalar, a single child node, or an ordered sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Node(Node),
    Seq(Vec<Value>),
}

impl Value {
    /// Name of the value's representation, used in diagnostics.
    pub fn representation(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Node(_) => "node",
            Value::Seq(_) => "sequence",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::Scalar(Scalar::None))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Follow `path` from this value.
    ///
    /// Absent node fields resolve to [`NONE`]; out-of-range indices and steps
    /// that do not fit the value's representation resolve to `None`.
    pub fn resolve(&self, path: &Path) -> Option<&Value> {
        let mut current = self;
        for step in path.steps() {
            current = match (step, current) {
                (PathStep::Field(name), Value::Node(node)) => node.field(name),
                (PathStep::Index(i), Value::Seq(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Convert from the JSON interchange format.
    pub fn from_json(json: &Json) -> Result<Self, TypeError> {
        Ok(match json {
            Json::Null => Value::Scalar(Scalar::None),
            Json::Bool(b) => Value::Scalar(Scalar::Bool(*b)),
            Json::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Value::Scalar(Scalar::Int(i)),
                (None, Some(u)) => Value::Scalar(Scalar::UInt(u)),
                _ => Value::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Json::String(s) => Value::Scalar(Scalar::Str(s.clone())),
            Json::Array(items) => Value::Seq(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            Json::Object(map) => {
                let kind = map
                    .get(TYPE_KEY)
                    .and_then(Json::as_str)
                    .ok_or(TypeError::MissingTypeTag)?;
                let mut node = Node::new(kind);
                for (name, value) in map.iter().filter(|(k, _)| k.as_str() != TYPE_KEY) {
                    node.fields.insert(name.clone(), Value::from_json(value)?);
                }
                Value::Node(node)
            }
        })
    }

    /// Convert to the JSON interchange format.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Scalar(Scalar::None) => Json::Null,
            Value::Scalar(Scalar::Bool(b)) => Json::Bool(*b),
            Value::Scalar(Scalar::Int(i)) => Json::Number((*i).into()),
            Value::Scalar(Scalar::UInt(u)) => Json::Number((*u).into()),
            Value::Scalar(Scalar::Float(x)) => {
                Number::from_f64(*x).map(Json::Number).unwrap_or(Json::Null)
            }
            Value::Scalar(Scalar::Str(s)) => Json::String(s.clone()),
            Value::Seq(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Node(node) => {
                let mut map = Map::new();
                map.insert(TYPE_KEY.to_string(), Json::String(node.kind.clone()));
                for (name, value) in &node.fields {
                    map.insert(name.clone(), value.to_json());
                }
                Json::Object(map)
            }
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Scalar(Scalar::Int(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(Scalar::Float(x))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::Str(s))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Value::from_json(&json).map_err(serde::de::Error::custom)
    }
}
