//! Document load and save entry points.
//!
//! Loading starts from a [`Loader`] configured with search roots. Handlers
//! receive a [`LoadContext`] plus the root node and pull their fields out
//! with the `fields` readers, calling [`load_object`] to step into nested
//! objects; include resolution and provenance bookkeeping happen inside
//! those steps, so handlers never see an `include` key.
//!
//! Saving is the mirror image: handlers build nodes inside [`save_object`]
//! / [`save_document`], and the include map recorded at load time prunes
//! the output back down to the original minimal diff.

use std::path::{Path, PathBuf};

use crate::context::{LoadContext, SaveContext};
use crate::error::{ErrorKind, Result};
use crate::include::{resolve_includes, IncludeInfo, IncludeMap, INCLUDE_KEY};
use crate::node::{to_json_pretty, Node};
use crate::source::{SourceId, SourceRegistry};

// ============================================================================
// Loading
// ============================================================================

/// Entry point for loading documents. Search roots are consulted in the
/// order they were added; an empty list disables includes entirely.
#[derive(Debug, Default)]
pub struct Loader {
    search_roots: Vec<PathBuf>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_roots.push(root.into());
        self
    }

    /// Loads a root document from a file. `f` receives the fully
    /// include-resolved root object; the returned map records every include
    /// directive encountered, keyed by dotted tree path.
    pub fn load_file<R>(
        &self,
        path: impl AsRef<Path>,
        f: impl FnOnce(&mut LoadContext, &mut Node) -> Result<R>,
    ) -> Result<(R, IncludeMap)> {
        let mut registry = SourceRegistry::new(self.search_roots.clone());
        let root = registry.open_root_file(path.as_ref())?;
        finish_load(registry, root, f)
    }

    /// Loads a root document from a string. The buffer is anonymous: errors
    /// report line and column without a file path.
    pub fn load_str<R>(
        &self,
        text: &str,
        f: impl FnOnce(&mut LoadContext, &mut Node) -> Result<R>,
    ) -> Result<(R, IncludeMap)> {
        let mut registry = SourceRegistry::new(self.search_roots.clone());
        let root = registry.open_root_str(text);
        finish_load(registry, root, f)
    }
}

fn finish_load<R>(
    registry: SourceRegistry,
    root: SourceId,
    f: impl FnOnce(&mut LoadContext, &mut Node) -> Result<R>,
) -> Result<(R, IncludeMap)> {
    let mut ctx = LoadContext::new(registry, root);
    let mut node = ctx.registry().parse(root)?;
    if !node.is_object() {
        return Err(ctx.error_at(
            root,
            node.offset,
            ErrorKind::Syntax("document root is not an object".to_owned()),
        ));
    }
    resolve_includes(&mut ctx, &mut node, true)?;
    let value = f(&mut ctx, &mut node)?;
    Ok((value, ctx.into_include_map()))
}

/// Descends into the object held at `parent[key]` for the duration of `f`.
///
/// Fails with `MissingField` if the key is absent and `TypeMismatch` if the
/// value is not an object. The descent switches the authoritative source
/// buffer when the value was spliced in by an include, resolves the
/// sub-object's own include directive, and restores path and source on
/// every exit.
pub fn load_object<R>(
    ctx: &mut LoadContext,
    parent: &mut Node,
    key: &str,
    f: impl FnOnce(&mut LoadContext, &mut Node) -> Result<R>,
) -> Result<R> {
    let next_source = ctx.origin_source(&ctx.path.child(key));
    let Some(child) = parent.get_mut(key) else {
        return Err(ctx.error(ErrorKind::MissingField(key.to_owned()), "", parent));
    };
    if !child.is_object() {
        return Err(ctx.error(
            ErrorKind::TypeMismatch {
                key: key.to_owned(),
                expected: "an object",
            },
            key,
            child,
        ));
    }
    ctx.descend(key, next_source, |ctx| {
        resolve_includes(ctx, child, true)?;
        f(ctx, child)
    })
}

// ============================================================================
// Saving
// ============================================================================

/// Builds the object for `parent[key]` by running `f`, then applies any
/// include reconstruction recorded for that tree path.
pub fn save_object(
    ctx: &mut SaveContext,
    parent: &mut Node,
    key: &str,
    f: impl FnOnce(&mut SaveContext, &mut Node) -> Result<()>,
) -> Result<()> {
    let node = ctx.descend(key, |ctx| build_object(ctx, f))?;
    parent.insert(key, node);
    Ok(())
}

/// Serializes a whole document. `includes` is the map returned by the
/// matching load; pass `None` (or an empty map) for documents that never
/// used includes.
pub fn save_document(
    includes: Option<&IncludeMap>,
    f: impl FnOnce(&mut SaveContext, &mut Node) -> Result<()>,
) -> Result<Vec<u8>> {
    let mut ctx = SaveContext::new(includes.cloned().unwrap_or_default());
    let node = build_object(&mut ctx, f)?;
    to_json_pretty(&node)
}

pub fn save_document_to(
    path: impl AsRef<Path>,
    includes: Option<&IncludeMap>,
    f: impl FnOnce(&mut SaveContext, &mut Node) -> Result<()>,
) -> Result<()> {
    let bytes = save_document(includes, f)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn build_object(
    ctx: &mut SaveContext,
    f: impl FnOnce(&mut SaveContext, &mut Node) -> Result<()>,
) -> Result<Node> {
    // a pure include collapses to the directive without running the handler
    if let Some(info) = ctx.include_info() {
        if info.include_only() {
            return Ok(include_only_node(info));
        }
    }
    let mut node = Node::object();
    f(ctx, &mut node)?;
    if let Some(info) = ctx.include_info() {
        apply_include_reconstruction(&mut node, info);
    }
    Ok(node)
}

fn include_only_node(info: &IncludeInfo) -> Node {
    let mut node = Node::object();
    node.insert(INCLUDE_KEY, Node::from(info.filename.as_str()));
    node
}

/// Prunes a freshly emitted object down to the minimal diff: keys the
/// original document overrode stay, keys it removed become explicit nulls,
/// everything inherited from the include is dropped, and the directive
/// itself is re-added.
fn apply_include_reconstruction(node: &mut Node, info: &IncludeInfo) {
    let Some(members) = node.as_object_mut() else {
        return;
    };
    members.retain(|key, _| info.override_keys.get(key).copied().unwrap_or(false));
    for (key, &kept) in &info.override_keys {
        if !kept {
            members.insert(key.clone(), Node::null());
        }
    }
    if !info.filename.is_empty() {
        members.insert(INCLUDE_KEY.to_owned(), Node::from(info.filename.as_str()));
    }
}

// ============================================================================
// Tests
// ============================================================================
