//! Object collections and references on top of the document engine.
//!
//! Game data is a web of named objects pointing at each other: unit types
//! reference weapon types, units reference their type and owner, shops
//! reference what they sell. This crate provides the containers that hold
//! those objects ([`Collection`]), the handles that link them ([`Ref`],
//! [`RefSet`], [`RefMap`]), and the document plumbing that loads and saves
//! whole collections member by member, including two-phase loading for
//! schemas with forward references and stable `objN` ID assignment for
//! elements that have no natural key ([`MappedIds`]).

pub mod collection;
pub mod loader;
pub mod mapped;
pub mod refs;

pub use collection::{Collection, Ref};
pub use loader::{load_collection, load_collection_pass, register_collection, save_collection};
pub use mapped::{load_mapped, save_mapped, MappedIds};
pub use refs::{
    load_ref, load_ref_map, load_ref_opt, load_ref_set, save_ref, save_ref_map, save_ref_opt,
    save_ref_set, RefMap, RefSet,
};
