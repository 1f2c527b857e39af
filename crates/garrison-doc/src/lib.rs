//! Provenance-tracking JSON document engine.
//!
//! This crate loads and saves the JSON documents the game's data files are
//! written in. It differs from a plain serde pipeline in three ways:
//!
//! - **Includes.** Any object may carry an `include` key naming another
//!   document; its members are merged in underneath the object's own, with
//!   overrides, deep object merges and explicit `null` removals. Saving
//!   reconstructs the original minimal diff instead of a flattened copy.
//! - **Provenance.** Every parsed node remembers its byte offset, and the
//!   load context knows which file each part of the tree physically came
//!   from, so an error deep inside a handler still reports the right file,
//!   line and column, even for values spliced in from an include.
//! - **Handlers, not derives.** Call sites read and write fields through
//!   explicit typed accessors against a [`Node`] tree. That keeps domain
//!   validation next to field access and gives every failure a location.
//!
//! The usual flow: build a [`Loader`] with search roots, call
//! [`Loader::load_file`] with a handler closure, keep the returned
//! [`IncludeMap`] alongside the loaded state, and hand it back to
//! [`save_document`] when writing the state out again.

pub mod context;
pub mod error;
pub mod fields;
pub mod include;
pub mod node;
pub mod parse;
pub mod protocol;
pub mod source;

pub use context::{LoadContext, SaveContext};
pub use error::{DocError, ErrorKind, Location, Result};
pub use fields::{
    optional_bool, optional_f64, optional_i64, optional_str_list, optional_string, optional_u32,
    require_bool, require_f64, require_i64, require_str, require_str_list, require_string,
    require_u32, set_bool, set_f64, set_i64, set_null, set_str, set_str_list, set_u32,
};
pub use include::{IncludeInfo, IncludeMap, INCLUDE_KEY};
pub use node::{to_json_pretty, Node, Value};
pub use protocol::{load_object, save_document, save_document_to, save_object, Loader};
pub use source::{SourceBuffer, SourceId, SourceRegistry};
