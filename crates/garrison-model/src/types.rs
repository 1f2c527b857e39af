//! Unit and weapon type definitions.
//!
//! Types are the palette a scenario draws from: every unit on the map
//! points at a [`UnitType`], and every unit type carries a set of
//! [`WeaponType`] references. Palettes are the natural target for include
//! files, so one base roster can be shared across many scenarios.

use garrison_collection::{
    Collection, Ref, RefSet, load_ref_opt, load_ref_set, save_ref_opt, save_ref_set,
};
use garrison_doc::{
    LoadContext, Node, Result, optional_u32, require_string, require_u32, set_str, set_u32,
};

// ============================================================================
// Weapon types
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WeaponType {
    pub name: String,
    pub damage: u32,
    pub range: u32,
    /// Ammo spent per shot; 1 when the document does not say.
    pub ammo_cost: u32,
}

pub(crate) fn load_weapon_type(
    ctx: &LoadContext,
    node: &Node,
    weapon: &mut WeaponType,
) -> Result<()> {
    weapon.name = require_string(ctx, node, "name")?;
    weapon.damage = require_u32(ctx, node, "damage")?;
    weapon.range = require_u32(ctx, node, "range")?;
    weapon.ammo_cost = optional_u32(ctx, node, "ammo_cost")?.unwrap_or(1);
    Ok(())
}

pub(crate) fn save_weapon_type(node: &mut Node, weapon: &WeaponType) {
    set_str(node, "name", &weapon.name);
    set_u32(node, "damage", weapon.damage);
    set_u32(node, "range", weapon.range);
    set_u32(node, "ammo_cost", weapon.ammo_cost);
}

// ============================================================================
// Unit types
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct UnitType {
    pub name: String,
    pub movement: u32,
    pub max_fuel: u32,
    pub max_ammo: u32,
    pub cost: u32,
    pub weapons: RefSet<WeaponType>,
    /// The unit type this one can carry, if any. May name any member of
    /// the same palette, including ones declared later in the document.
    pub transport: Option<Ref<UnitType>>,
}

pub(crate) fn load_unit_type(
    ctx: &LoadContext,
    node: &Node,
    unit_type: &mut UnitType,
    palette: &Collection<UnitType>,
    weapons: &Collection<WeaponType>,
) -> Result<()> {
    unit_type.name = require_string(ctx, node, "name")?;
    unit_type.movement = require_u32(ctx, node, "movement")?;
    unit_type.max_fuel = require_u32(ctx, node, "max_fuel")?;
    unit_type.max_ammo = require_u32(ctx, node, "max_ammo")?;
    unit_type.cost = require_u32(ctx, node, "cost")?;
    unit_type.weapons = load_ref_set(ctx, node, "weapons", weapons)?;
    unit_type.transport = load_ref_opt(ctx, node, "transport", palette)?;
    Ok(())
}

pub(crate) fn save_unit_type(
    node: &mut Node,
    unit_type: &UnitType,
    palette: &Collection<UnitType>,
) {
    set_str(node, "name", &unit_type.name);
    set_u32(node, "movement", unit_type.movement);
    set_u32(node, "max_fuel", unit_type.max_fuel);
    set_u32(node, "max_ammo", unit_type.max_ammo);
    set_u32(node, "cost", unit_type.cost);
    save_ref_set(node, "weapons", &unit_type.weapons);
    save_ref_opt(node, "transport", unit_type.transport, palette);
}

// ============================================================================
// Tests
// ============================================================================
