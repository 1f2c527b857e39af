//! The wargame data model.
//!
//! A [`Scenario`] is one self-contained battle: a terrain grid, a palette
//! of unit and weapon types, the players, and every unit on the board. It
//! loads from and saves to the document format in `garrison-doc`, with
//! type palettes typically pulled in through include files.

pub mod scenario;
pub mod types;

pub use scenario::{Player, Scenario, Shop, Stance, Unit, UnitKey};
pub use types::{UnitType, WeaponType};
