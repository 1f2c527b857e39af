//! Traversal state for loads and saves.
//!
//! A [`LoadContext`] tracks two things as handlers descend the object tree:
//! the dotted tree path, and which source buffer is currently authoritative
//! for byte offsets. They move together but are steered independently; a
//! node can sit at a tree position whose ancestor was spliced in from an
//! include, in which case descending into it switches the authoritative
//! buffer to the include target while the path keeps growing normally.
//!
//! Both cursors are mutated only through [`LoadContext::descend`], which
//! restores the previous state on every exit path.

use std::collections::HashMap;

use crate::error::{DocError, ErrorKind};
use crate::include::{IncludeInfo, IncludeMap};
use crate::node::Node;
use crate::source::{SourceId, SourceRegistry};

// ============================================================================
// Tree paths
// ============================================================================

/// A dotted path into the object tree: `""` at the root, `".units.obj1"`
/// two levels down.
#[derive(Debug, Default)]
pub(crate) struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    fn push(&mut self, segment: &str) {
        self.segments.push(segment.to_owned());
    }

    fn pop(&mut self) {
        self.segments.pop();
    }

    pub(crate) fn dotted(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('.');
            out.push_str(segment);
        }
        out
    }

    /// The dotted path of a child key of the current position.
    pub(crate) fn child(&self, key: &str) -> String {
        let mut out = self.dotted();
        out.push('.');
        out.push_str(key);
        out
    }
}

// ============================================================================
// Load context
// ============================================================================

pub struct LoadContext {
    registry: SourceRegistry,
    current: SourceId,
    pub(crate) path: TreePath,
    /// Dotted path -> buffer that physically holds the value there. Only
    /// paths whose values were spliced in by an include get an entry; every
    /// other path inherits the enclosing buffer.
    origin_map: HashMap<String, SourceId>,
    include_map: IncludeMap,
}

impl LoadContext {
    pub(crate) fn new(registry: SourceRegistry, root: SourceId) -> Self {
        Self {
            registry,
            current: root,
            path: TreePath::default(),
            origin_map: HashMap::new(),
            include_map: IncludeMap::new(),
        }
    }

    pub(crate) fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut SourceRegistry {
        &mut self.registry
    }

    pub(crate) fn current_source(&self) -> SourceId {
        self.current
    }

    /// The dotted tree path of the position currently being loaded.
    pub fn current_path(&self) -> String {
        self.path.dotted()
    }

    /// Descends into `key` for the duration of `f`, optionally switching the
    /// authoritative source buffer. Path and source are restored afterwards
    /// regardless of how `f` exits.
    pub(crate) fn descend<R>(
        &mut self,
        key: &str,
        source: Option<SourceId>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.path.push(key);
        let previous = self.current;
        if let Some(source) = source {
            self.current = source;
        }
        let result = f(self);
        self.current = previous;
        self.path.pop();
        result
    }

    /// Switches the authoritative source for the duration of `f` without
    /// touching the tree path. Used while flattening include targets.
    pub(crate) fn with_source<R>(&mut self, source: SourceId, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.current;
        self.current = source;
        let result = f(self);
        self.current = previous;
        result
    }

    pub(crate) fn origin_source(&self, dotted: &str) -> Option<SourceId> {
        self.origin_map.get(dotted).copied()
    }

    pub(crate) fn record_origin(&mut self, dotted: String, source: SourceId) {
        self.origin_map.insert(dotted, source);
    }

    pub(crate) fn record_include(&mut self, dotted: String, info: IncludeInfo) {
        self.include_map.insert(dotted, info);
    }

    pub(crate) fn into_include_map(self) -> IncludeMap {
        self.include_map
    }

    /// Builds a located error for `node`. When `key` is non-empty and the
    /// value at the current path's `key` was spliced in by an include, the
    /// location resolves against the included file; otherwise against the
    /// buffer currently authoritative.
    pub fn error(&self, kind: ErrorKind, key: &str, node: &Node) -> DocError {
        let source = if key.is_empty() {
            self.current
        } else {
            self.origin_source(&self.path.child(key))
                .unwrap_or(self.current)
        };
        DocError::at(kind, self.registry.location(source, node.offset))
    }

    /// A located [`ErrorKind::Domain`] error, for validation rules that live
    /// in caller handlers.
    pub fn domain_error(&self, message: impl Into<String>, key: &str, node: &Node) -> DocError {
        self.error(ErrorKind::Domain(message.into()), key, node)
    }

    pub(crate) fn error_at(&self, source: SourceId, offset: usize, kind: ErrorKind) -> DocError {
        DocError::at(kind, self.registry.location(source, offset))
    }
}

// ============================================================================
// Save context
// ============================================================================

pub struct SaveContext {
    path: TreePath,
    includes: IncludeMap,
}

impl SaveContext {
    pub(crate) fn new(includes: IncludeMap) -> Self {
        Self {
            path: TreePath::default(),
            includes,
        }
    }

    pub fn current_path(&self) -> String {
        self.path.dotted()
    }

    pub(crate) fn descend<R>(&mut self, key: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push(key);
        let result = f(self);
        self.path.pop();
        result
    }

    /// The include record for the position currently being saved, if the
    /// original document used an include here.
    pub(crate) fn include_info(&self) -> Option<&IncludeInfo> {
        self.includes.get(&self.path.dotted())
    }
}

// ============================================================================
// Tests
// ============================================================================
