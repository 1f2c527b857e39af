//! The include merge engine.
//!
//! An object may carry an `include` key naming another document relative to
//! the search roots. Before handlers see the object, the named file is
//! loaded and its top-level members merged in underneath the object's own
//! members: an existing key overrides the included value, an existing
//! `null` deletes it, and object-valued keys present on both sides merge
//! recursively. The directive key itself never reaches handlers.
//!
//! Each resolved directive leaves an [`IncludeInfo`] record behind so a
//! later save can re-emit the document as the same minimal diff against the
//! included file instead of a flattened copy.

use std::collections::BTreeMap;

use crate::context::LoadContext;
use crate::error::{ErrorKind, Result};
use crate::node::{Node, Value};
use crate::source::{normalize_include_path, FileId, SourceId};

/// The reserved member name that triggers include resolution.
pub const INCLUDE_KEY: &str = "include";

/// Ceiling on the include chain length. Cycles are caught exactly; this
/// bounds pathological non-cyclic chains.
const MAX_INCLUDE_DEPTH: usize = 64;

/// How to reconstruct one include directive on save.
///
/// `override_keys` holds every member the including document carried next
/// to the directive: `true` means "re-emit the loaded value as an
/// override", `false` means "re-emit an explicit `null` removal".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeInfo {
    /// The include path exactly as written in the directive.
    pub filename: String,
    pub override_keys: BTreeMap<String, bool>,
}

impl IncludeInfo {
    /// True when the whole object can be saved as `{"include": filename}`.
    pub fn include_only(&self) -> bool {
        self.override_keys.is_empty() && !self.filename.is_empty()
    }
}

/// Dotted tree path -> include record, for every directive resolved while
/// loading one document.
pub type IncludeMap = BTreeMap<String, IncludeInfo>;

// ============================================================================
// Resolution
// ============================================================================

/// Resolves the include directive of `node`, if any, merging the target's
/// members in. `record` is true when `node` sits in the real document tree;
/// it is false while flattening an include target's own chained includes,
/// where no [`IncludeInfo`] or provenance entries must be written because
/// the surviving values get attributed to the outermost target.
pub(crate) fn resolve_includes(ctx: &mut LoadContext, node: &mut Node, record: bool) -> Result<()> {
    let Some(members) = node.as_object_mut() else {
        return Ok(());
    };
    resolve_includes_in(ctx, members, record)
}

fn resolve_includes_in(
    ctx: &mut LoadContext,
    members: &mut BTreeMap<String, Node>,
    record: bool,
) -> Result<()> {
    let Some(directive) = members.get(INCLUDE_KEY) else {
        return Ok(());
    };
    let directive_offset = directive.offset;

    // The buffer the directive physically lives in decides the search-level
    // restriction and anchors the cycle chain. While flattening a target the
    // directive always sits in the buffer just opened.
    let owner = if record {
        ctx.origin_source(&ctx.path.child(INCLUDE_KEY))
            .unwrap_or(ctx.current_source())
    } else {
        ctx.current_source()
    };

    let Some(filename) = directive.as_str().map(str::to_owned) else {
        return Err(ctx.error_at(
            owner,
            directive_offset,
            ErrorKind::TypeMismatch {
                key: INCLUDE_KEY.to_owned(),
                expected: "a string",
            },
        ));
    };

    if ctx.registry().chain_len(owner) >= MAX_INCLUDE_DEPTH {
        return Err(ctx.error_at(
            owner,
            directive_offset,
            ErrorKind::IncludeTooDeep(filename),
        ));
    }

    let relative = match normalize_include_path(&filename) {
        Ok(path) => path,
        Err(reason) => {
            return Err(ctx.error_at(
                owner,
                directive_offset,
                ErrorKind::IncludePathInvalid {
                    path: filename,
                    reason,
                },
            ));
        }
    };

    // includes may only reach the includer's search level or deeper
    let owner_level = ctx.registry().buffer(owner).level;
    let (found, level) = match ctx.registry().locate(&relative, owner_level) {
        Ok(hit) => hit,
        Err(tried) => {
            return Err(ctx.error_at(
                owner,
                directive_offset,
                ErrorKind::IncludeNotFound {
                    path: filename,
                    tried,
                },
            ));
        }
    };

    let identity = FileId::of(&found)?;
    if ctx.registry().chain_contains(owner, &identity) {
        return Err(ctx.error_at(
            owner,
            directive_offset,
            ErrorKind::CyclicInclude(filename),
        ));
    }

    let source = ctx.registry_mut().open_include(identity, level, owner)?;
    let mut included = ctx.registry().parse(source)?;
    let included_offset = included.offset;

    // flatten any chain inside the target before merging it
    ctx.with_source(source, |ctx| resolve_includes(ctx, &mut included, false))?;

    let Value::Object(incoming) = included.value else {
        return Err(ctx.error_at(
            source,
            included_offset,
            ErrorKind::TypeMismatch {
                key: INCLUDE_KEY.to_owned(),
                expected: "an object",
            },
        ));
    };

    members.remove(INCLUDE_KEY);
    let mut info = IncludeInfo {
        filename,
        override_keys: BTreeMap::new(),
    };
    for (key, value) in members.iter() {
        info.override_keys.insert(key.clone(), !value.is_null());
    }

    merge_object(ctx, members, incoming, source, record)?;

    if record {
        let dotted = ctx.path.dotted();
        ctx.record_include(dotted, info);
    }
    Ok(())
}

/// Merges the included members under the document's own. Spliced keys get a
/// provenance entry pointing at the include target so errors raised against
/// them later resolve to the right file.
fn merge_object(
    ctx: &mut LoadContext,
    base: &mut BTreeMap<String, Node>,
    incoming: BTreeMap<String, Node>,
    source: SourceId,
    record: bool,
) -> Result<()> {
    for (key, added) in incoming {
        let Some(current) = base.get_mut(&key) else {
            if record {
                let dotted = ctx.path.child(&key);
                ctx.record_origin(dotted, source);
            }
            base.insert(key, added);
            continue;
        };
        match (&mut current.value, added.value) {
            (Value::Object(current_members), Value::Object(added_members)) => {
                ctx.descend(&key, None, |ctx| {
                    merge_object(ctx, current_members, added_members, source, record)
                })?;
            }
            // a null in the including document deletes the included key
            (Value::Null, _) => {
                base.remove(&key);
            }
            // anything else: the including document's value wins wholesale
            _ => {}
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
