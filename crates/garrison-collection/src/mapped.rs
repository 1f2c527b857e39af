//! Stable string IDs for elements that have none of their own.
//!
//! Some containers (units on a map) are sequences in memory but objects in
//! the document, keyed `obj0`, `obj1`, ... A [`MappedIds`] remembers the
//! binding both ways: loading claims the IDs found in the document, saving
//! reuses a claimed ID and mints fresh ones only for new elements, so an
//! element keeps its document ID across any number of load/save cycles.

use std::collections::BTreeMap;

use garrison_doc::{load_object, save_object, LoadContext, Node, Result, SaveContext};

#[derive(Debug)]
pub struct MappedIds<K> {
    by_key: BTreeMap<K, String>,
    by_id: BTreeMap<String, K>,
    next: usize,
}

impl<K> Default for MappedIds<K> {
    fn default() -> Self {
        Self {
            by_key: BTreeMap::new(),
            by_id: BTreeMap::new(),
            next: 0,
        }
    }
}

impl<K: Ord + Clone> MappedIds<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Binds a key to the ID the document spelled out for it.
    pub fn claim(&mut self, key: K, id: impl Into<String>) {
        let id = id.into();
        self.by_key.insert(key.clone(), id.clone());
        self.by_id.insert(id, key);
    }

    /// The ID bound to `key`, minting the next free `objN` if none is.
    pub fn id_for(&mut self, key: &K) -> String {
        if let Some(id) = self.by_key.get(key) {
            return id.clone();
        }
        loop {
            let id = format!("obj{}", self.next);
            self.next += 1;
            if !self.by_id.contains_key(&id) {
                self.by_key.insert(key.clone(), id.clone());
                self.by_id.insert(id.clone(), key.clone());
                return id;
            }
        }
    }

    pub fn id_of(&self, key: &K) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn key_of(&self, id: &str) -> Option<&K> {
        self.by_id.get(id)
    }

    /// Releases a binding, freeing the ID for later elements.
    pub fn release(&mut self, key: &K) {
        if let Some(id) = self.by_key.remove(key) {
            self.by_id.remove(&id);
        }
    }
}

/// Loads `parent[key]` as an object of ID'd members, claiming each ID and
/// building the items in ID order. `next_key` mints the in-memory key for
/// each member.
pub fn load_mapped<K: Ord + Clone, T>(
    ctx: &mut LoadContext,
    parent: &mut Node,
    key: &str,
    ids: &mut MappedIds<K>,
    mut next_key: impl FnMut() -> K,
    mut f: impl FnMut(&mut LoadContext, &mut Node, K) -> Result<T>,
) -> Result<Vec<T>> {
    load_object(ctx, parent, key, |ctx, members| {
        let mut items = Vec::new();
        for id in members.member_names() {
            let item_key = next_key();
            ids.claim(item_key.clone(), id.as_str());
            let item = load_object(ctx, members, &id, |ctx, child| f(ctx, child, item_key))?;
            items.push(item);
        }
        Ok(items)
    })
}

/// Saves the items as an object keyed by their mapped IDs.
pub fn save_mapped<K: Ord + Clone, T>(
    ctx: &mut SaveContext,
    parent: &mut Node,
    key: &str,
    items: &[T],
    ids: &mut MappedIds<K>,
    mut key_of: impl FnMut(&T) -> K,
    mut f: impl FnMut(&mut SaveContext, &mut Node, &T) -> Result<()>,
) -> Result<()> {
    save_object(ctx, parent, key, |ctx, members| {
        for item in items {
            let id = ids.id_for(&key_of(item));
            save_object(ctx, members, &id, |ctx, child| f(ctx, child, item))?;
        }
        Ok(())
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use garrison_doc::{require_u32, save_document, set_u32, Loader};

    #[test]
    fn minting_skips_claimed_ids() {
        let mut ids: MappedIds<u64> = MappedIds::new();
        ids.claim(1, "obj0");
        ids.claim(2, "custom");

        assert_eq!(ids.id_for(&1), "obj0");
        // obj0 is taken, so the first minted ID is obj1
        assert_eq!(ids.id_for(&3), "obj1");
        assert_eq!(ids.id_for(&3), "obj1");
        assert_eq!(ids.key_of("custom"), Some(&2));
        assert_eq!(ids.key_of("obj9"), None);
    }

    #[test]
    fn release_frees_the_id() {
        let mut ids: MappedIds<u64> = MappedIds::new();
        ids.claim(1, "obj5");
        ids.release(&1);
        assert_eq!(ids.id_of(&1), None);
        assert_eq!(ids.key_of("obj5"), None);
    }

    #[test]
    fn ids_survive_a_load_save_cycle() {
        let text = r#"{"units": {"obj2": {"hp": 5}, "veteran": {"hp": 9}}}"#;
        let mut ids: MappedIds<u64> = MappedIds::new();
        let mut next = 0u64;

        let (units, _) = Loader::new()
            .load_str(text, |ctx, node| {
                load_mapped(
                    ctx,
                    node,
                    "units",
                    &mut ids,
                    || {
                        next += 1;
                        next
                    },
                    |ctx, n, key| Ok((key, require_u32(ctx, n, "hp")?)),
                )
            })
            .unwrap();

        assert_eq!(units.len(), 2);
        // members load in ID order
        assert_eq!(ids.id_of(&units[0].0), Some("obj2"));
        assert_eq!(ids.id_of(&units[1].0), Some("veteran"));

        let bytes = save_document(None, |ctx, node| {
            save_mapped(ctx, node, "units", &units, &mut ids, |u| u.0, |_, n, u| {
                set_u32(n, "hp", u.1);
                Ok(())
            })
        })
        .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"obj2\""));
        assert!(text.contains("\"veteran\""));
    }

    #[test]
    fn new_items_get_fresh_ids_on_save() {
        let mut ids: MappedIds<u64> = MappedIds::new();
        ids.claim(1, "obj0");
        let items = [1u64, 2, 3];

        let bytes = save_document(None, |ctx, node| {
            save_mapped(ctx, node, "units", &items, &mut ids, |k| *k, |_, n, k| {
                set_u32(n, "hp", *k as u32);
                Ok(())
            })
        })
        .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"obj0\""));
        assert!(text.contains("\"obj1\""));
        assert!(text.contains("\"obj2\""));
    }
}
