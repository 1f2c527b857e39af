//! Error types for document loading and saving.
//!
//! Every failure is an [`ErrorKind`] wrapped in a [`DocError`], which may
//! carry a [`Location`] resolving the failing byte back to a file, line and
//! column. Errors raised while reading a field of an object that was spliced
//! in from an include point at the included file, not the document that
//! named it.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the document engine.
pub type Result<T> = std::result::Result<T, DocError>;

// ============================================================================
// Error kinds
// ============================================================================

/// The failure classes reported by the engine.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("missing mandatory field '{0}'")]
    MissingField(String),

    #[error("field '{key}' is not {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("object '{0}' does not exist")]
    UnknownReference(String),

    #[error("duplicate reference '{0}'")]
    DuplicateReference(String),

    #[error("include path '{path}' {reason}")]
    IncludePathInvalid { path: String, reason: &'static str },

    #[error("include file '{path}' not found (tried: {})", list_paths(.tried))]
    IncludeNotFound { path: String, tried: Vec<PathBuf> },

    #[error("cyclic include of '{0}'")]
    CyclicInclude(String),

    #[error("include chain too deep at '{0}'")]
    IncludeTooDeep(String),

    #[error("{0}")]
    Syntax(String),

    #[error("could not serialize document: {0}")]
    Serialize(String),

    #[error("{0}")]
    Domain(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn list_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no search roots".to_owned();
    }
    let rendered: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    rendered.join(", ")
}

// ============================================================================
// Located errors
// ============================================================================

/// A position in a source buffer, resolved to 1-based line and column.
///
/// `file` is empty when the buffer was loaded from a string rather than a
/// file; the display form then omits the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.as_os_str().is_empty() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
        }
    }
}

/// An [`ErrorKind`] plus the place it was detected, when known.
#[derive(Debug)]
pub struct DocError {
    pub kind: ErrorKind,
    pub location: Option<Location>,
}

impl DocError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub fn at(kind: ErrorKind, location: Location) -> Self {
        Self {
            kind,
            location: Some(location),
        }
    }
}

impl fmt::Display for DocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}", loc, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for DocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for DocError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for DocError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(err))
    }
}

// ============================================================================
// Tests
// ============================================================================
