//! Keyed object collections with stable handles.
//!
//! A [`Collection`] owns every object of one kind declared by a document
//! (weapon types, players, ...), each under a unique string ID. A
//! [`Ref`] is a generation-stamped slot key: it stays valid across later
//! insertions, compares cheaply, and observably dangles (rather than
//! aliasing a newcomer) if its object is removed.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use slotmap::{DefaultKey, SlotMap};

// ============================================================================
// References
// ============================================================================

/// A typed handle to an object inside a [`Collection`].
pub struct Ref<T> {
    key: DefaultKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Ref<T> {
    pub(crate) fn new(key: DefaultKey) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    pub(crate) fn key(self) -> DefaultKey {
        self.key
    }
}

// manual impls so `Ref<T>` is copyable for any `T`
impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ref<T> {}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Ref<T> {}

impl<T> Hash for Ref<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({:?})", self.key)
    }
}

// ============================================================================
// Collections
// ============================================================================

#[derive(Debug)]
struct Slot<T> {
    id: String,
    value: T,
}

#[derive(Debug)]
pub struct Collection<T> {
    slots: SlotMap<DefaultKey, Slot<T>>,
    index: BTreeMap<String, DefaultKey>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::new(),
            index: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Inserts an object under `id`. Returns `None` if the ID is taken.
    pub fn insert(&mut self, id: impl Into<String>, value: T) -> Option<Ref<T>> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return None;
        }
        let key = self.slots.insert(Slot {
            id: id.clone(),
            value,
        });
        self.index.insert(id, key);
        Some(Ref::new(key))
    }

    pub fn by_id(&self, id: &str) -> Option<Ref<T>> {
        self.index.get(id).map(|&key| Ref::new(key))
    }

    /// The ID an object was inserted under; `None` if the handle dangles.
    pub fn id_of(&self, handle: Ref<T>) -> Option<&str> {
        self.slots.get(handle.key).map(|slot| slot.id.as_str())
    }

    pub fn get(&self, handle: Ref<T>) -> Option<&T> {
        self.slots.get(handle.key).map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, handle: Ref<T>) -> Option<&mut T> {
        self.slots.get_mut(handle.key).map(|slot| &mut slot.value)
    }

    pub fn contains(&self, handle: Ref<T>) -> bool {
        self.slots.contains_key(handle.key)
    }

    /// Removes an object. Handles to it dangle from here on; its ID becomes
    /// free for reuse.
    pub fn remove(&mut self, handle: Ref<T>) -> Option<T> {
        let slot = self.slots.remove(handle.key)?;
        self.index.remove(&slot.id);
        Some(slot.value)
    }

    /// Iterates `(handle, id, value)` in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (Ref<T>, &str, &T)> {
        self.index.iter().map(|(id, &key)| {
            let slot = &self.slots[key];
            (Ref::new(key), id.as_str(), &slot.value)
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub(crate) fn take_value(&mut self, handle: Ref<T>) -> T
    where
        T: Default,
    {
        std::mem::take(&mut self.slots[handle.key].value)
    }

    pub(crate) fn put_value(&mut self, handle: Ref<T>, value: T) {
        self.slots[handle.key].value = value;
    }
}

// ============================================================================
// Tests
// ============================================================================
