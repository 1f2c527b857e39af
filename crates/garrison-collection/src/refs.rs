//! Reading and writing references through documents.
//!
//! References appear in documents as the target object's ID string: a
//! single field, an array of IDs ([`RefSet`]), or an object keyed by ID
//! with one entry per collection element ([`RefMap`]). Loading resolves
//! them against an already-populated [`Collection`]; unknown IDs are input
//! errors with full provenance. Saving turns handles back into IDs and
//! panics on dangling ones, since a handle that outlived its object is a
//! caller-side bookkeeping bug, not a document problem.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use garrison_doc::{ErrorKind, LoadContext, Node, Result, Value};
use slotmap::{DefaultKey, SecondaryMap};

use crate::collection::{Collection, Ref};

// ============================================================================
// Single references
// ============================================================================

pub fn load_ref<T>(
    ctx: &LoadContext,
    node: &Node,
    key: &str,
    collection: &Collection<T>,
) -> Result<Ref<T>> {
    let Some(value) = node.get(key) else {
        return Err(ctx.error(ErrorKind::MissingField(key.to_owned()), "", node));
    };
    resolve_id(ctx, key, value, collection)
}

pub fn load_ref_opt<T>(
    ctx: &LoadContext,
    node: &Node,
    key: &str,
    collection: &Collection<T>,
) -> Result<Option<Ref<T>>> {
    match node.get(key) {
        None => Ok(None),
        Some(value) if value.is_null() => Ok(None),
        Some(value) => resolve_id(ctx, key, value, collection).map(Some),
    }
}

fn resolve_id<T>(
    ctx: &LoadContext,
    key: &str,
    value: &Node,
    collection: &Collection<T>,
) -> Result<Ref<T>> {
    let Some(id) = value.as_str() else {
        return Err(ctx.error(
            ErrorKind::TypeMismatch {
                key: key.to_owned(),
                expected: "an object ID string",
            },
            key,
            value,
        ));
    };
    collection
        .by_id(id)
        .ok_or_else(|| ctx.error(ErrorKind::UnknownReference(id.to_owned()), key, value))
}

pub fn save_ref<T>(node: &mut Node, key: &str, handle: Ref<T>, collection: &Collection<T>) {
    let id = collection
        .id_of(handle)
        .expect("saved reference points at a removed object");
    node.insert(key, Node::from(id));
}

/// `None` saves as an absent key, matching the optional loader.
pub fn save_ref_opt<T>(
    node: &mut Node,
    key: &str,
    handle: Option<Ref<T>>,
    collection: &Collection<T>,
) {
    if let Some(handle) = handle {
        save_ref(node, key, handle, collection);
    }
}

// ============================================================================
// Reference sets
// ============================================================================

/// An ordered set of references, remembered by ID.
#[derive(Debug)]
pub struct RefSet<T> {
    refs: BTreeMap<String, Ref<T>>,
}

impl<T> Default for RefSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RefSet<T> {
    fn clone(&self) -> Self {
        Self {
            refs: self.refs.clone(),
        }
    }
}

impl<T> RefSet<T> {
    pub fn new() -> Self {
        Self {
            refs: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// False if the ID was already present.
    pub fn insert(&mut self, id: impl Into<String>, handle: Ref<T>) -> bool {
        let id = id.into();
        if self.refs.contains_key(&id) {
            return false;
        }
        self.refs.insert(id, handle);
        true
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.refs.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Ref<T>> {
        self.refs.get(id).copied()
    }

    /// Iterates `(id, handle)` in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Ref<T>)> {
        self.refs.iter().map(|(id, &handle)| (id.as_str(), handle))
    }
}

/// Reads `node[key]` as an array of ID strings. An absent key or `null` is
/// an empty set; a repeated ID is a `DuplicateReference` pointing at the
/// second occurrence.
pub fn load_ref_set<T>(
    ctx: &LoadContext,
    node: &Node,
    key: &str,
    collection: &Collection<T>,
) -> Result<RefSet<T>> {
    let mut set = RefSet::new();
    let entries = match node.get(key) {
        None => return Ok(set),
        Some(value) if value.is_null() => return Ok(set),
        Some(value) => value,
    };
    let Some(items) = entries.as_array() else {
        return Err(ctx.error(
            ErrorKind::TypeMismatch {
                key: key.to_owned(),
                expected: "an array of object IDs",
            },
            key,
            entries,
        ));
    };
    for item in items {
        let Some(id) = item.as_str() else {
            return Err(ctx.error(
                ErrorKind::TypeMismatch {
                    key: key.to_owned(),
                    expected: "an array of object IDs",
                },
                key,
                item,
            ));
        };
        let Some(handle) = collection.by_id(id) else {
            return Err(ctx.error(ErrorKind::UnknownReference(id.to_owned()), key, item));
        };
        if !set.insert(id, handle) {
            return Err(ctx.error(ErrorKind::DuplicateReference(id.to_owned()), key, item));
        }
    }
    Ok(set)
}

pub fn save_ref_set<T>(node: &mut Node, key: &str, set: &RefSet<T>) {
    let items = set.iter().map(|(id, _)| Node::from(id)).collect();
    node.insert(key, Node::new(Value::Array(items), 0));
}

// ============================================================================
// Reference maps
// ============================================================================

/// A value attached to every element of a [`Collection`].
#[derive(Debug)]
pub struct RefMap<C, V> {
    entries: SecondaryMap<DefaultKey, V>,
    _marker: PhantomData<fn() -> C>,
}

impl<C, V> Default for RefMap<C, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, V> RefMap<C, V> {
    pub fn new() -> Self {
        Self {
            entries: SecondaryMap::new(),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, handle: Ref<C>, value: V) -> Option<V> {
        self.entries.insert(handle.key(), value)
    }

    pub fn get(&self, handle: Ref<C>) -> Option<&V> {
        self.entries.get(handle.key())
    }

    pub fn get_mut(&mut self, handle: Ref<C>) -> Option<&mut V> {
        self.entries.get_mut(handle.key())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ref<C>, &V)> {
        self.entries.iter().map(|(key, value)| (Ref::new(key), value))
    }
}

/// Reads `node[key]` as an object mapping element IDs to values, one entry
/// per element of `collection`.
///
/// Unknown IDs are input errors. A count mismatch after loading panics:
/// these maps are engine-written, so an incomplete one means the document
/// and collection went out of sync programmatically.
pub fn load_ref_map<C, V>(
    ctx: &mut LoadContext,
    node: &Node,
    key: &str,
    collection: &Collection<C>,
    mut parse: impl FnMut(&mut LoadContext, &str, &Node) -> Result<V>,
) -> Result<RefMap<C, V>> {
    let mut map = RefMap::new();
    match node.get(key) {
        None => {}
        Some(entries) if entries.is_null() => {}
        Some(entries) => {
            let Some(members) = entries.as_object() else {
                return Err(ctx.error(
                    ErrorKind::TypeMismatch {
                        key: key.to_owned(),
                        expected: "an object keyed by ID",
                    },
                    key,
                    entries,
                ));
            };
            for (id, value) in members {
                let Some(handle) = collection.by_id(id) else {
                    return Err(ctx.error(ErrorKind::UnknownReference(id.clone()), key, value));
                };
                let parsed = parse(ctx, id, value)?;
                map.insert(handle, parsed);
            }
        }
    }
    assert_eq!(
        map.len(),
        collection.len(),
        "ref map '{key}' must have exactly one entry per collection element"
    );
    Ok(map)
}

/// Writes one entry per collection element, in ID order. Panics if the map
/// is missing an element.
pub fn save_ref_map<C, V>(
    node: &mut Node,
    key: &str,
    collection: &Collection<C>,
    map: &RefMap<C, V>,
    mut emit: impl FnMut(&V) -> Node,
) {
    let mut entries = Node::object();
    for (handle, id, _) in collection.iter() {
        let Some(value) = map.get(handle) else {
            panic!("ref map '{key}' has no entry for '{id}'");
        };
        entries.insert(id, emit(value));
    }
    node.insert(key, entries);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use garrison_doc::Loader;
    use proptest::prelude::*;

    fn load<R>(
        text: &str,
        f: impl FnOnce(&mut LoadContext, &mut Node) -> Result<R>,
    ) -> Result<R> {
        Loader::new().load_str(text, f).map(|(value, _)| value)
    }

    fn sample_collection() -> Collection<u32> {
        let mut collection = Collection::new();
        collection.insert("infantry", 10).unwrap();
        collection.insert("tank", 70).unwrap();
        collection
    }

    #[test]
    fn single_refs_resolve_by_id() {
        let collection = sample_collection();
        let handle = load(r#"{"unit": "tank"}"#, |ctx, node| {
            load_ref(ctx, node, "unit", &collection)
        })
        .unwrap();
        assert_eq!(collection.id_of(handle), Some("tank"));
    }

    #[test]
    fn unknown_refs_are_input_errors() {
        let collection = sample_collection();
        let err = load(r#"{"unit": "battleship"}"#, |ctx, node| {
            load_ref(ctx, node, "unit", &collection)
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "1:10: object 'battleship' does not exist"
        );
    }

    #[test]
    fn optional_refs_treat_null_as_absent() {
        let collection = sample_collection();
        let (a, b) = load(r#"{"a": null, "b": "infantry"}"#, |ctx, node| {
            Ok((
                load_ref_opt(ctx, node, "a", &collection)?,
                load_ref_opt(ctx, node, "missing", &collection)?,
            ))
        })
        .unwrap();
        assert_eq!(a, None);
        assert_eq!(b, None);
    }

    #[test]
    fn ref_sets_load_both_ids() {
        let collection = sample_collection();
        let set = load(r#"{"stock": ["tank", "infantry"]}"#, |ctx, node| {
            load_ref_set(ctx, node, "stock", &collection)
        })
        .unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains_id("tank"));
        assert!(set.contains_id("infantry"));
        // saved back in ID order
        let mut out = Node::object();
        save_ref_set(&mut out, "stock", &set);
        let ids: Vec<&str> = out
            .get("stock")
            .and_then(Node::as_array)
            .unwrap()
            .iter()
            .filter_map(Node::as_str)
            .collect();
        assert_eq!(ids, ["infantry", "tank"]);
    }

    #[test]
    fn duplicate_ids_in_a_ref_set_fail() {
        let collection = sample_collection();
        let err = load(r#"{"stock": ["tank", "tank"]}"#, |ctx, node| {
            load_ref_set(ctx, node, "stock", &collection)
        })
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DuplicateReference(ref id) if id == "tank"));
        // the second occurrence is the offender
        let location = err.location.unwrap();
        assert_eq!((location.line, location.column), (1, 20));
    }

    #[test]
    fn absent_ref_sets_are_empty() {
        let collection = sample_collection();
        let set = load(r#"{}"#, |ctx, node| {
            load_ref_set(ctx, node, "stock", &collection)
        })
        .unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn ref_maps_cover_the_whole_collection() {
        let collection = sample_collection();
        let map = load(
            r#"{"costs": {"infantry": 100, "tank": 900}}"#,
            |ctx, node| {
                load_ref_map(ctx, node, "costs", &collection, |ctx, id, value| {
                    value.as_i64().ok_or_else(|| {
                        ctx.error(
                            ErrorKind::TypeMismatch {
                                key: id.to_owned(),
                                expected: "an integer",
                            },
                            "",
                            value,
                        )
                    })
                })
            },
        )
        .unwrap();
        let tank = collection.by_id("tank").unwrap();
        assert_eq!(map.get(tank), Some(&900));

        let mut out = Node::object();
        save_ref_map(&mut out, "costs", &collection, &map, |v| Node::from(*v));
        assert_eq!(
            out.get("costs")
                .and_then(|c| c.get("infantry"))
                .and_then(Node::as_i64),
            Some(100)
        );
    }

    #[test]
    #[should_panic(expected = "exactly one entry per collection element")]
    fn incomplete_ref_maps_panic() {
        let collection = sample_collection();
        let _ = load(r#"{"costs": {"tank": 900}}"#, |ctx, node| {
            load_ref_map(ctx, node, "costs", &collection, |_, _, value| {
                Ok(value.as_i64().unwrap_or(0))
            })
        });
    }

    #[test]
    fn ref_map_rejects_unknown_ids() {
        let collection = sample_collection();
        let err = load(r#"{"costs": {"battleship": 1}}"#, |ctx, node| {
            load_ref_map(ctx, node, "costs", &collection, |_, _, value| {
                Ok(value.as_i64().unwrap_or(0))
            })
        })
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownReference(ref id) if id == "battleship"));
    }

    proptest! {
        #[test]
        fn distinct_ids_load_and_repeats_fail(ids in proptest::collection::btree_set("[a-z]{1,8}", 2)) {
            let mut ids = ids.into_iter();
            let (first, second) = (ids.next().unwrap(), ids.next().unwrap());
            let mut collection = Collection::new();
            collection.insert(first.clone(), 0u32).unwrap();
            collection.insert(second.clone(), 0u32).unwrap();

            let text = format!(r#"{{"stock": ["{first}", "{second}"]}}"#);
            let set = load(&text, |ctx, node| {
                load_ref_set(ctx, node, "stock", &collection)
            })
            .unwrap();
            prop_assert_eq!(set.len(), 2);
            prop_assert!(set.get(&first).is_some());
            prop_assert!(set.get(&second).is_some());

            let text = format!(r#"{{"stock": ["{first}", "{first}"]}}"#);
            let err = load(&text, |ctx, node| {
                load_ref_set(ctx, node, "stock", &collection)
            })
            .unwrap_err();
            prop_assert!(matches!(err.kind, ErrorKind::DuplicateReference(ref id) if *id == first));
        }
    }
}
