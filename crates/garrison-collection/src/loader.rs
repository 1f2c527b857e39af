//! Loading and saving whole collections through documents.
//!
//! A collection appears in a document as an object whose member names are
//! the IDs. Loading runs in two stages inside one call: every member is
//! first registered with a default-constructed value, then each member
//! object is loaded in ID order. Registration-before-loading means a
//! member's loader can resolve references to its siblings, as long as it
//! only needs their handles; sibling *values* are still being filled in,
//! so the loader only sees the shared collection immutably, with its own
//! value passed separately.
//!
//! Schemas with genuine forward references across collections split the
//! stages explicitly: [`register_collection`] for every collection first,
//! then [`load_collection_pass`] for each once all handles exist.

use garrison_doc::{load_object, save_object, ErrorKind, LoadContext, Node, Result, SaveContext};

use crate::collection::{Collection, Ref};

/// Registers and loads `parent[key]` into `collection` in one call.
///
/// The loader closure receives the shared collection (for sibling lookups),
/// the member's own handle, and its value to fill in.
pub fn load_collection<T: Default>(
    ctx: &mut LoadContext,
    parent: &mut Node,
    key: &str,
    collection: &mut Collection<T>,
    mut f: impl FnMut(&mut LoadContext, &mut Node, &Collection<T>, Ref<T>, &mut T) -> Result<()>,
) -> Result<()> {
    load_object(ctx, parent, key, |ctx, members| {
        register_members(ctx, members, collection)?;
        load_members(ctx, members, collection, &mut f)
    })
}

/// Stage one only: allocate a slot per member without loading any fields.
pub fn register_collection<T: Default>(
    ctx: &mut LoadContext,
    parent: &mut Node,
    key: &str,
    collection: &mut Collection<T>,
) -> Result<()> {
    load_object(ctx, parent, key, |ctx, members| {
        register_members(ctx, members, collection)
    })
}

/// Stage two only: load fields into slots registered earlier. Panics on an
/// unregistered member, which means the two stages ran over different
/// documents.
pub fn load_collection_pass<T: Default>(
    ctx: &mut LoadContext,
    parent: &mut Node,
    key: &str,
    collection: &mut Collection<T>,
    mut f: impl FnMut(&mut LoadContext, &mut Node, &Collection<T>, Ref<T>, &mut T) -> Result<()>,
) -> Result<()> {
    load_object(ctx, parent, key, |ctx, members| {
        load_members(ctx, members, collection, &mut f)
    })
}

fn register_members<T: Default>(
    ctx: &LoadContext,
    members: &Node,
    collection: &mut Collection<T>,
) -> Result<()> {
    for id in members.member_names() {
        if collection.insert(id.as_str(), T::default()).is_none() {
            return Err(ctx.error(ErrorKind::DuplicateReference(id), "", members));
        }
    }
    Ok(())
}

fn load_members<T: Default>(
    ctx: &mut LoadContext,
    members: &mut Node,
    collection: &mut Collection<T>,
    f: &mut impl FnMut(&mut LoadContext, &mut Node, &Collection<T>, Ref<T>, &mut T) -> Result<()>,
) -> Result<()> {
    for id in members.member_names() {
        let Some(handle) = collection.by_id(&id) else {
            panic!("collection member '{id}' was never registered");
        };
        // the value is taken out while its loader runs so the closure can
        // hold the collection shared for sibling lookups
        let mut value = collection.take_value(handle);
        let result = load_object(ctx, members, &id, |ctx, child| {
            f(ctx, child, collection, handle, &mut value)
        });
        collection.put_value(handle, value);
        result?;
    }
    Ok(())
}

/// Saves every element as a member object, in ID order.
pub fn save_collection<T>(
    ctx: &mut SaveContext,
    parent: &mut Node,
    key: &str,
    collection: &Collection<T>,
    mut f: impl FnMut(&mut SaveContext, &mut Node, Ref<T>, &T) -> Result<()>,
) -> Result<()> {
    save_object(ctx, parent, key, |ctx, members| {
        for (handle, id, value) in collection.iter() {
            save_object(ctx, members, id, |ctx, child| f(ctx, child, handle, value))?;
        }
        Ok(())
    })
}

// ============================================================================
// Tests
// ============================================================================
