//! Typed member access with located errors.
//!
//! `require_*` readers fail with [`ErrorKind::MissingField`] (located at the
//! enclosing object) or [`ErrorKind::TypeMismatch`] (located at the
//! offending value). `optional_*` readers treat an absent key and an
//! explicit `null` the same way and return `None`; any other value must
//! still have the right type. `set_*` writers build plain nodes for saves.

use crate::context::LoadContext;
use crate::error::{ErrorKind, Result};
use crate::node::Node;

fn fetch<'n>(ctx: &LoadContext, node: &'n Node, key: &str) -> Result<&'n Node> {
    node.get(key)
        .ok_or_else(|| ctx.error(ErrorKind::MissingField(key.to_owned()), "", node))
}

fn mismatch(ctx: &LoadContext, key: &str, expected: &'static str, value: &Node) -> crate::error::DocError {
    ctx.error(
        ErrorKind::TypeMismatch {
            key: key.to_owned(),
            expected,
        },
        key,
        value,
    )
}

// ============================================================================
// Mandatory readers
// ============================================================================

pub fn require_bool(ctx: &LoadContext, node: &Node, key: &str) -> Result<bool> {
    let value = fetch(ctx, node, key)?;
    value
        .as_bool()
        .ok_or_else(|| mismatch(ctx, key, "a boolean", value))
}

pub fn require_i64(ctx: &LoadContext, node: &Node, key: &str) -> Result<i64> {
    let value = fetch(ctx, node, key)?;
    value
        .as_i64()
        .ok_or_else(|| mismatch(ctx, key, "an integer", value))
}

pub fn require_u32(ctx: &LoadContext, node: &Node, key: &str) -> Result<u32> {
    let value = fetch(ctx, node, key)?;
    value
        .as_i64()
        .and_then(|i| u32::try_from(i).ok())
        .ok_or_else(|| mismatch(ctx, key, "an unsigned integer", value))
}

pub fn require_f64(ctx: &LoadContext, node: &Node, key: &str) -> Result<f64> {
    let value = fetch(ctx, node, key)?;
    value
        .as_f64()
        .ok_or_else(|| mismatch(ctx, key, "a number", value))
}

pub fn require_str<'n>(ctx: &LoadContext, node: &'n Node, key: &str) -> Result<&'n str> {
    let value = fetch(ctx, node, key)?;
    value
        .as_str()
        .ok_or_else(|| mismatch(ctx, key, "a string", value))
}

pub fn require_string(ctx: &LoadContext, node: &Node, key: &str) -> Result<String> {
    require_str(ctx, node, key).map(str::to_owned)
}

/// An array whose elements must all be strings; the error points at the
/// first offending element.
pub fn require_str_list(ctx: &LoadContext, node: &Node, key: &str) -> Result<Vec<String>> {
    let value = fetch(ctx, node, key)?;
    str_list(ctx, key, value)
}

// ============================================================================
// Optional readers
// ============================================================================

pub fn optional_bool(ctx: &LoadContext, node: &Node, key: &str) -> Result<Option<bool>> {
    match node.get(key) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| mismatch(ctx, key, "a boolean", value)),
    }
}

pub fn optional_i64(ctx: &LoadContext, node: &Node, key: &str) -> Result<Option<i64>> {
    match node.get(key) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| mismatch(ctx, key, "an integer", value)),
    }
}

pub fn optional_u32(ctx: &LoadContext, node: &Node, key: &str) -> Result<Option<u32>> {
    match node.get(key) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        Some(value) => value
            .as_i64()
            .and_then(|i| u32::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| mismatch(ctx, key, "an unsigned integer", value)),
    }
}

pub fn optional_f64(ctx: &LoadContext, node: &Node, key: &str) -> Result<Option<f64>> {
    match node.get(key) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| mismatch(ctx, key, "a number", value)),
    }
}

pub fn optional_string(ctx: &LoadContext, node: &Node, key: &str) -> Result<Option<String>> {
    match node.get(key) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        Some(value) => value
            .as_str()
            .map(|s| Some(s.to_owned()))
            .ok_or_else(|| mismatch(ctx, key, "a string", value)),
    }
}

pub fn optional_str_list(ctx: &LoadContext, node: &Node, key: &str) -> Result<Vec<String>> {
    match node.get(key) {
        None => Ok(Vec::new()),
        Some(value) if value.is_null() => Ok(Vec::new()),
        Some(value) => str_list(ctx, key, value),
    }
}

fn str_list(ctx: &LoadContext, key: &str, value: &Node) -> Result<Vec<String>> {
    let Some(items) = value.as_array() else {
        return Err(mismatch(ctx, key, "an array of strings", value));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(s) = item.as_str() else {
            return Err(mismatch(ctx, key, "an array of strings", item));
        };
        out.push(s.to_owned());
    }
    Ok(out)
}

// ============================================================================
// Writers
// ============================================================================

pub fn set_bool(node: &mut Node, key: &str, value: bool) {
    node.insert(key, Node::from(value));
}

pub fn set_i64(node: &mut Node, key: &str, value: i64) {
    node.insert(key, Node::from(value));
}

pub fn set_u32(node: &mut Node, key: &str, value: u32) {
    node.insert(key, Node::from(value));
}

pub fn set_f64(node: &mut Node, key: &str, value: f64) {
    node.insert(key, Node::from(value));
}

pub fn set_str(node: &mut Node, key: &str, value: &str) {
    node.insert(key, Node::from(value));
}

pub fn set_null(node: &mut Node, key: &str) {
    node.insert(key, Node::null());
}

pub fn set_str_list(node: &mut Node, key: &str, values: &[String]) {
    let items = values.iter().map(|s| Node::from(s.as_str())).collect();
    node.insert(key, Node::new(crate::node::Value::Array(items), 0));
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_document;
    use crate::source::SourceRegistry;

    fn context_for(text: &str) -> (LoadContext, Node) {
        let mut registry = SourceRegistry::new(Vec::new());
        let root = registry.open_root_str(text);
        let node = parse_document(text).unwrap();
        (LoadContext::new(registry, root), node)
    }

    #[test]
    fn mandatory_readers_return_values() {
        let (ctx, node) =
            context_for(r#"{"b": true, "i": -3, "u": 7, "f": 1.5, "s": "ok", "l": ["x", "y"]}"#);
        assert!(require_bool(&ctx, &node, "b").unwrap());
        assert_eq!(require_i64(&ctx, &node, "i").unwrap(), -3);
        assert_eq!(require_u32(&ctx, &node, "u").unwrap(), 7);
        assert_eq!(require_f64(&ctx, &node, "f").unwrap(), 1.5);
        assert_eq!(require_f64(&ctx, &node, "i").unwrap(), -3.0);
        assert_eq!(require_str(&ctx, &node, "s").unwrap(), "ok");
        assert_eq!(require_str_list(&ctx, &node, "l").unwrap(), ["x", "y"]);
    }

    #[test]
    fn missing_field_points_at_the_enclosing_object() {
        let (ctx, node) = context_for("{\n  \"a\": 1\n}");
        let err = require_i64(&ctx, &node, "zz").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MissingField(ref k) if k == "zz"));
        let location = err.location.unwrap();
        assert_eq!((location.line, location.column), (1, 1));
    }

    #[test]
    fn type_mismatch_points_at_the_value() {
        let (ctx, node) = context_for(r#"{"d": 54, "e": true, "f": "omg", "g": "bla"}"#);
        let err = require_i64(&ctx, &node, "g").unwrap_err();
        assert_eq!(
            err.to_string(),
            "1:39: field 'g' is not an integer"
        );
    }

    #[test]
    fn negative_and_oversized_values_fail_u32() {
        let (ctx, node) = context_for(r#"{"neg": -1, "big": 5000000000}"#);
        assert!(require_u32(&ctx, &node, "neg").is_err());
        assert!(require_u32(&ctx, &node, "big").is_err());
    }

    #[test]
    fn mandatory_null_is_a_type_mismatch() {
        let (ctx, node) = context_for(r#"{"x": null}"#);
        let err = require_i64(&ctx, &node, "x").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn optional_readers_treat_null_as_absent() {
        let (ctx, node) = context_for(r#"{"a": null, "b": 5}"#);
        assert_eq!(optional_i64(&ctx, &node, "a").unwrap(), None);
        assert_eq!(optional_i64(&ctx, &node, "zz").unwrap(), None);
        assert_eq!(optional_i64(&ctx, &node, "b").unwrap(), Some(5));
        assert!(optional_string(&ctx, &node, "b").is_err());
        assert_eq!(optional_str_list(&ctx, &node, "a").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn str_list_errors_point_at_the_bad_element() {
        let (ctx, node) = context_for(r#"{"l": ["ok", 5]}"#);
        let err = require_str_list(&ctx, &node, "l").unwrap_err();
        let location = err.location.unwrap();
        assert_eq!((location.line, location.column), (1, 14));
    }

    #[test]
    fn writers_round_trip_through_readers() {
        let mut node = Node::object();
        set_bool(&mut node, "b", true);
        set_i64(&mut node, "i", -3);
        set_u32(&mut node, "u", 7);
        set_f64(&mut node, "f", 1.5);
        set_str(&mut node, "s", "ok");
        set_null(&mut node, "n");
        set_str_list(&mut node, "l", &["x".to_owned()]);

        let mut registry = SourceRegistry::new(Vec::new());
        let root = registry.open_root_str("{}");
        let ctx = LoadContext::new(registry, root);
        assert!(require_bool(&ctx, &node, "b").unwrap());
        assert_eq!(require_i64(&ctx, &node, "i").unwrap(), -3);
        assert_eq!(require_u32(&ctx, &node, "u").unwrap(), 7);
        assert_eq!(require_f64(&ctx, &node, "f").unwrap(), 1.5);
        assert_eq!(require_str(&ctx, &node, "s").unwrap(), "ok");
        assert!(node.get("n").unwrap().is_null());
        assert_eq!(require_str_list(&ctx, &node, "l").unwrap(), ["x"]);
    }
}
