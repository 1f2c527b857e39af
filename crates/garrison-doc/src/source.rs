//! Source buffers and the per-load registry.
//!
//! One [`SourceRegistry`] lives for the duration of a single root-document
//! load. Every file touched while resolving that document (the root plus
//! every include, transitively) gets a [`SourceBuffer`] entry holding its
//! text, its canonical identity for cycle detection, the search-root level
//! it was found at, and the buffer that included it.

use std::path::{Component, Path, PathBuf};

use crate::error::{DocError, ErrorKind, Location, Result};
use crate::node::Node;
use crate::parse::parse_document;

/// Index of a buffer within its registry. Never outlives the load that
/// minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceId(usize);

/// Filesystem identity of a loaded file, for include-cycle detection.
/// Canonicalization collapses symlinks and relative spellings, so the same
/// file reached through two different paths still compares equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileId(PathBuf);

impl FileId {
    pub(crate) fn of(path: &Path) -> std::io::Result<FileId> {
        Ok(FileId(std::fs::canonicalize(path)?))
    }
}

#[derive(Debug)]
pub struct SourceBuffer {
    /// Canonical absolute path, or empty for a buffer loaded from a string.
    pub(crate) path: PathBuf,
    pub(crate) text: String,
    pub(crate) identity: Option<FileId>,
    /// Index of the search root this file was found under; 0 for roots.
    pub(crate) level: usize,
    /// The buffer whose include directive caused this one to be opened.
    pub(crate) origin: Option<SourceId>,
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug)]
pub struct SourceRegistry {
    buffers: Vec<SourceBuffer>,
    search_roots: Vec<PathBuf>,
}

impl SourceRegistry {
    pub fn new(search_roots: Vec<PathBuf>) -> Self {
        Self {
            buffers: Vec::new(),
            search_roots,
        }
    }

    /// Opens the root document from a file. The root is read from its given
    /// path directly; search roots only constrain includes.
    pub(crate) fn open_root_file(&mut self, path: &Path) -> Result<SourceId> {
        let canonical = std::fs::canonicalize(path)?;
        let text = std::fs::read_to_string(&canonical)?;
        Ok(self.push(SourceBuffer {
            path: canonical.clone(),
            text,
            identity: Some(FileId(canonical)),
            level: 0,
            origin: None,
        }))
    }

    /// Opens the root document from an in-memory string. Anonymous buffers
    /// have no identity and can never be the target of an include.
    pub(crate) fn open_root_str(&mut self, text: &str) -> SourceId {
        self.push(SourceBuffer {
            path: PathBuf::new(),
            text: text.to_owned(),
            identity: None,
            level: 0,
            origin: None,
        })
    }

    /// Searches the roots at `min_level` or deeper, in order, for a relative
    /// path. Returns the first hit plus its level, or the full candidate
    /// list for the not-found message.
    pub(crate) fn locate(
        &self,
        relative: &Path,
        min_level: usize,
    ) -> std::result::Result<(PathBuf, usize), Vec<PathBuf>> {
        let mut tried = Vec::new();
        for (level, root) in self.search_roots.iter().enumerate().skip(min_level) {
            let candidate = root.join(relative);
            if candidate.is_file() {
                return Ok((candidate, level));
            }
            tried.push(candidate);
        }
        Err(tried)
    }

    /// Reads and registers an include target. The caller has already run the
    /// cycle check against `identity`.
    pub(crate) fn open_include(
        &mut self,
        identity: FileId,
        level: usize,
        origin: SourceId,
    ) -> Result<SourceId> {
        let text = std::fs::read_to_string(&identity.0)?;
        Ok(self.push(SourceBuffer {
            path: identity.0.clone(),
            text,
            identity: Some(identity),
            level,
            origin: Some(origin),
        }))
    }

    fn push(&mut self, buffer: SourceBuffer) -> SourceId {
        let id = SourceId(self.buffers.len());
        self.buffers.push(buffer);
        id
    }

    pub fn buffer(&self, id: SourceId) -> &SourceBuffer {
        &self.buffers[id.0]
    }

    /// True if `candidate` already appears in the origin chain starting at
    /// `from` (inclusive).
    pub(crate) fn chain_contains(&self, from: SourceId, candidate: &FileId) -> bool {
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let buffer = self.buffer(id);
            if buffer.identity.as_ref() == Some(candidate) {
                return true;
            }
            cursor = buffer.origin;
        }
        false
    }

    /// Length of the origin chain starting at `from` (inclusive).
    pub(crate) fn chain_len(&self, from: SourceId) -> usize {
        let mut len = 0;
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            len += 1;
            cursor = self.buffer(id).origin;
        }
        len
    }

    /// Converts a byte offset into a 1-based line and byte column.
    pub fn line_col(&self, id: SourceId, offset: usize) -> (u32, u32) {
        let text = &self.buffer(id).text;
        let upto = offset.min(text.len());
        let bytes = &text.as_bytes()[..upto];
        let line = memchr::memchr_iter(b'\n', bytes).count() as u32 + 1;
        let line_start = memchr::memrchr(b'\n', bytes).map_or(0, |i| i + 1);
        let column = (upto - line_start) as u32 + 1;
        (line, column)
    }

    pub(crate) fn location(&self, id: SourceId, offset: usize) -> Location {
        let (line, column) = self.line_col(id, offset);
        Location {
            file: self.buffer(id).path.clone(),
            line,
            column,
        }
    }

    /// Parses a registered buffer, turning any syntax failure into a located
    /// error against that buffer.
    pub(crate) fn parse(&self, id: SourceId) -> Result<Node> {
        parse_document(&self.buffer(id).text).map_err(|err| {
            DocError::at(ErrorKind::Syntax(err.message), self.location(id, err.offset))
        })
    }
}

// ============================================================================
// Include path normalization
// ============================================================================

/// Lexically normalizes an include path. The path must be relative, must
/// name a file, and must not climb above the search root it will be joined
/// to.
pub(crate) fn normalize_include_path(raw: &str) -> std::result::Result<PathBuf, &'static str> {
    let path = Path::new(raw);
    let mut normalized = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err("escapes above the search root");
                }
                depth -= 1;
                normalized.pop();
            }
            Component::Normal(part) => {
                depth += 1;
                normalized.push(part);
            }
            Component::RootDir | Component::Prefix(_) => return Err("must be relative"),
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err("names no file");
    }
    Ok(normalized)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "garrison_doc_source_{}_{}",
            std::process::id(),
            name
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn normalization_accepts_plain_relative_paths() {
        assert_eq!(
            normalize_include_path("units/tank.json").unwrap(),
            PathBuf::from("units/tank.json")
        );
        assert_eq!(
            normalize_include_path("./a.json").unwrap(),
            PathBuf::from("a.json")
        );
        assert_eq!(
            normalize_include_path("a/../b.json").unwrap(),
            PathBuf::from("b.json")
        );
    }

    #[test]
    fn normalization_rejects_escapes_and_absolutes() {
        assert_eq!(
            normalize_include_path("../secret.json").unwrap_err(),
            "escapes above the search root"
        );
        assert_eq!(
            normalize_include_path("a/../../secret.json").unwrap_err(),
            "escapes above the search root"
        );
        assert_eq!(
            normalize_include_path("/etc/passwd").unwrap_err(),
            "must be relative"
        );
        assert_eq!(normalize_include_path(".").unwrap_err(), "names no file");
        assert_eq!(normalize_include_path("").unwrap_err(), "names no file");
    }

    #[test]
    fn line_col_counts_from_one() {
        let mut registry = SourceRegistry::new(Vec::new());
        let id = registry.open_root_str("ab\ncde\nf");
        assert_eq!(registry.line_col(id, 0), (1, 1));
        assert_eq!(registry.line_col(id, 1), (1, 2));
        assert_eq!(registry.line_col(id, 3), (2, 1));
        assert_eq!(registry.line_col(id, 5), (2, 3));
        assert_eq!(registry.line_col(id, 7), (3, 1));
    }

    #[test]
    fn line_col_clamps_past_the_end() {
        let mut registry = SourceRegistry::new(Vec::new());
        let id = registry.open_root_str("ab");
        assert_eq!(registry.line_col(id, 99), (1, 3));
    }

    #[test]
    fn locate_respects_root_order_and_level() {
        let base = make_test_dir("locate_base");
        let mods = make_test_dir("locate_mods");
        std::fs::write(base.join("both.json"), "{}").unwrap();
        std::fs::write(mods.join("both.json"), "{}").unwrap();
        std::fs::write(mods.join("only_mods.json"), "{}").unwrap();

        let registry = SourceRegistry::new(vec![base.clone(), mods.clone()]);

        let (path, level) = registry.locate(Path::new("both.json"), 0).unwrap();
        assert_eq!(path, base.join("both.json"));
        assert_eq!(level, 0);

        // restricting to level 1 skips the first root entirely
        let (path, level) = registry.locate(Path::new("both.json"), 1).unwrap();
        assert_eq!(path, mods.join("both.json"));
        assert_eq!(level, 1);

        let (_, level) = registry.locate(Path::new("only_mods.json"), 0).unwrap();
        assert_eq!(level, 1);

        let tried = registry.locate(Path::new("nowhere.json"), 0).unwrap_err();
        assert_eq!(
            tried,
            vec![base.join("nowhere.json"), mods.join("nowhere.json")]
        );
    }

    #[test]
    fn chain_contains_walks_origins() {
        let dir = make_test_dir("chain");
        std::fs::write(dir.join("a.json"), "{}").unwrap();
        std::fs::write(dir.join("b.json"), "{}").unwrap();

        let mut registry = SourceRegistry::new(vec![dir.clone()]);
        let a = registry.open_root_file(&dir.join("a.json")).unwrap();
        let a_identity = FileId::of(&dir.join("a.json")).unwrap();
        let b_identity = FileId::of(&dir.join("b.json")).unwrap();
        let b = registry.open_include(b_identity.clone(), 0, a).unwrap();

        assert!(registry.chain_contains(b, &a_identity));
        assert!(registry.chain_contains(b, &b_identity));
        assert!(!registry.chain_contains(a, &b_identity));
        assert_eq!(registry.chain_len(b), 2);
        assert_eq!(registry.chain_len(a), 1);
    }

    #[test]
    fn parse_failures_carry_buffer_locations() {
        let mut registry = SourceRegistry::new(Vec::new());
        let id = registry.open_root_str("{\n  \"a\": }");
        let err = registry.parse(id).unwrap_err();
        let location = err.location.unwrap();
        assert_eq!(location.line, 2);
        assert_eq!(location.column, 8);
    }
}
