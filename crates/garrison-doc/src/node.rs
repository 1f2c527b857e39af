//! The in-memory document tree.
//!
//! Every [`Node`] remembers the byte offset of its first token in whichever
//! buffer it was parsed from, so errors raised long after parsing can still
//! point at a line and column. Object members are kept in a [`BTreeMap`]:
//! the format is key-order-insensitive and sorted output keeps saves
//! deterministic.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::{ErrorKind, Result};

// ============================================================================
// Values and nodes
// ============================================================================

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Node>),
    Object(BTreeMap<String, Node>),
}

/// A parsed value plus the byte offset of its first token.
///
/// Nodes built programmatically (during saves) carry offset 0; offsets are
/// only meaningful for trees produced by the parser.
#[derive(Debug, Clone)]
pub struct Node {
    pub value: Value,
    pub offset: usize,
}

impl Node {
    pub fn new(value: Value, offset: usize) -> Self {
        Self { value, offset }
    }

    /// An empty object with no source position.
    pub fn object() -> Self {
        Self::new(Value::Object(BTreeMap::new()), 0)
    }

    pub fn null() -> Self {
        Self::new(Value::Null, 0)
    }

    /// A short noun for error messages and debugging.
    pub fn kind(&self) -> &'static str {
        match &self.value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self.value, Value::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Any number, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            Value::Int(i) => Some(i as f64),
            Value::Float(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match &self.value {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.value {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Node>> {
        match &self.value {
            Value::Object(members) => Some(members),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match &mut self.value {
            Value::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Member lookup; `None` for non-objects as well as absent keys.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_object().and_then(|m| m.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.as_object_mut().and_then(|m| m.get_mut(key))
    }

    /// Inserts a member. Panics if this node is not an object; builders only
    /// ever call it on nodes created with [`Node::object`].
    pub fn insert(&mut self, key: impl Into<String>, node: Node) {
        match &mut self.value {
            Value::Object(members) => {
                members.insert(key.into(), node);
            }
            _ => panic!("insert on a non-object node"),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        self.as_object_mut().and_then(|m| m.remove(key))
    }

    /// The member names of an object, collected so the tree can be mutated
    /// while walking them. Empty for non-objects.
    pub fn member_names(&self) -> Vec<String> {
        match self.as_object() {
            Some(members) => members.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Structural equality ignoring source offsets.
    pub fn value_eq(&self, other: &Node) -> bool {
        match (&self.value, &other.value) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.value_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.value_eq(vb))
            }
            _ => false,
        }
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Self::new(Value::Bool(v), 0)
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Self::new(Value::Int(v), 0)
    }
}

impl From<u32> for Node {
    fn from(v: u32) -> Self {
        Self::new(Value::Int(i64::from(v)), 0)
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Self::new(Value::Float(v), 0)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Self::new(Value::String(v.to_owned()), 0)
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Self::new(Value::String(v), 0)
    }
}

// ============================================================================
// Emission
// ============================================================================

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => {
                if !x.is_finite() {
                    return Err(serde::ser::Error::custom("non-finite number"));
                }
                serializer.serialize_f64(*x)
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (key, member) in members {
                    map.serialize_entry(key, member)?;
                }
                map.end()
            }
        }
    }
}

/// Renders a tree as pretty-printed JSON with a trailing newline. Keys come
/// out sorted, so saving an unmodified document is byte-stable.
pub fn to_json_pretty(node: &Node) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(node)
        .map_err(|err| ErrorKind::Serialize(err.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

// ============================================================================
// Tests
// ============================================================================
