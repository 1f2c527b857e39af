//! Scenario documents: the map, the players, the type palette, and every
//! live unit on the board.
//!
//! Loading is ordered so that references only ever point at collections
//! that are already registered. Players register before anything else
//! (units name their owner), but their fields load after the unit roster,
//! because a captain entry names a unit ID. Units themselves are not a
//! [`Collection`]: they come and go during play, so the document keys them
//! with generated `objN` IDs that a [`MappedIds`] table ties to stable
//! in-memory [`UnitKey`]s across save and reload.

use std::path::Path;

use garrison_collection::{
    Collection, MappedIds, Ref, RefMap, RefSet, load_collection, load_collection_pass,
    load_mapped, load_ref, load_ref_map, load_ref_opt, load_ref_set, register_collection,
    save_collection, save_mapped, save_ref, save_ref_map, save_ref_opt, save_ref_set,
};
use garrison_doc::{
    ErrorKind, IncludeMap, LoadContext, Loader, Node, Result, SaveContext, optional_string,
    require_i64, require_str_list, require_string, require_u32, save_document, save_document_to,
    set_i64, set_str, set_str_list, set_u32,
};

use crate::types::{
    UnitType, WeaponType, load_unit_type, load_weapon_type, save_unit_type, save_weapon_type,
};

// ============================================================================
// Players and diplomacy
// ============================================================================

#[derive(Debug, Default)]
pub struct Player {
    pub name: String,
    pub funds: i64,
    /// The player's commanding unit, always one of their own.
    pub captain: Option<UnitKey>,
}

/// How a player treats everyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stance {
    Friendly,
    Neutral,
    Hostile,
}

impl Stance {
    pub fn as_str(self) -> &'static str {
        match self {
            Stance::Friendly => "friendly",
            Stance::Neutral => "neutral",
            Stance::Hostile => "hostile",
        }
    }

    pub fn parse(text: &str) -> Option<Stance> {
        match text {
            "friendly" => Some(Stance::Friendly),
            "neutral" => Some(Stance::Neutral),
            "hostile" => Some(Stance::Hostile),
            _ => None,
        }
    }
}

// ============================================================================
// Units
// ============================================================================

/// A stable in-memory unit identity. Keys are minted once per scenario and
/// never reused, and the ID mapping keeps them tied to the same document
/// IDs across saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitKey(u64);

#[derive(Debug)]
pub struct Unit {
    pub key: UnitKey,
    pub unit_type: Ref<UnitType>,
    pub owner: Ref<Player>,
    pub fuel: u32,
    pub ammo: u32,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Default)]
pub struct Shop {
    pub name: String,
    /// Unowned shops sell to whoever reaches them.
    pub owner: Option<Ref<Player>>,
    pub stock: RefSet<UnitType>,
}

// ============================================================================
// Scenario
// ============================================================================

#[derive(Debug, Default)]
pub struct Scenario {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// One string per map row, one terrain code per column.
    pub terrain: Vec<String>,
    pub weapon_types: Collection<WeaponType>,
    pub unit_types: Collection<UnitType>,
    pub players: Collection<Player>,
    pub units: Vec<Unit>,
    pub shops: Collection<Shop>,
    pub diplomacy: RefMap<Player, Stance>,
    unit_ids: MappedIds<UnitKey>,
    next_unit: u64,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_file(loader: &Loader, path: impl AsRef<Path>) -> Result<(Scenario, IncludeMap)> {
        loader.load_file(path, Self::load)
    }

    pub fn load_str(loader: &Loader, text: &str) -> Result<(Scenario, IncludeMap)> {
        loader.load_str(text, Self::load)
    }

    fn load(ctx: &mut LoadContext, node: &mut Node) -> Result<Scenario> {
        let mut sc = Scenario {
            name: require_string(ctx, node, "name")?,
            width: require_u32(ctx, node, "width")?,
            height: require_u32(ctx, node, "height")?,
            terrain: require_str_list(ctx, node, "terrain")?,
            ..Scenario::default()
        };
        if sc.terrain.len() != sc.height as usize {
            return Err(ctx.domain_error(
                "terrain row count does not match map height",
                "terrain",
                node.get("terrain").unwrap_or(node),
            ));
        }
        for row in &sc.terrain {
            if row.chars().count() != sc.width as usize {
                return Err(ctx.domain_error(
                    "terrain row length does not match map width",
                    "terrain",
                    node.get("terrain").unwrap_or(node),
                ));
            }
        }

        register_collection(ctx, node, "players", &mut sc.players)?;

        load_collection(ctx, node, "weapon_types", &mut sc.weapon_types, |ctx, n, _, _, weapon| {
            load_weapon_type(ctx, n, weapon)
        })?;
        load_collection(ctx, node, "unit_types", &mut sc.unit_types, |ctx, n, palette, _, unit_type| {
            load_unit_type(ctx, n, unit_type, palette, &sc.weapon_types)
        })?;

        let (width, height) = (sc.width, sc.height);
        sc.units = load_mapped(
            ctx,
            node,
            "units",
            &mut sc.unit_ids,
            || {
                sc.next_unit += 1;
                UnitKey(sc.next_unit)
            },
            |ctx, n, key| load_unit(ctx, n, key, &sc.unit_types, &sc.players, width, height),
        )?;

        load_collection_pass(ctx, node, "players", &mut sc.players, |ctx, n, _, handle, player| {
            load_player(ctx, n, player, handle, &sc.units, &sc.unit_ids)
        })?;

        load_collection(ctx, node, "shops", &mut sc.shops, |ctx, n, _, _, shop| {
            load_shop(ctx, n, shop, &sc.players, &sc.unit_types)
        })?;

        sc.diplomacy = if node.get("diplomacy").is_some_and(|n| !n.is_null()) {
            load_ref_map(ctx, node, "diplomacy", &sc.players, parse_stance)?
        } else {
            // Scenario designers may leave diplomacy out or null it.
            let mut map = RefMap::new();
            for (handle, _, _) in sc.players.iter() {
                map.insert(handle, Stance::Neutral);
            }
            map
        };

        Ok(sc)
    }

    pub fn save(&mut self, includes: Option<&IncludeMap>) -> Result<Vec<u8>> {
        save_document(includes, |ctx, node| self.emit(ctx, node))
    }

    pub fn save_to(&mut self, path: impl AsRef<Path>, includes: Option<&IncludeMap>) -> Result<()> {
        save_document_to(path, includes, |ctx, node| self.emit(ctx, node))
    }

    fn emit(&mut self, ctx: &mut SaveContext, node: &mut Node) -> Result<()> {
        set_str(node, "name", &self.name);
        set_u32(node, "width", self.width);
        set_u32(node, "height", self.height);
        set_str_list(node, "terrain", &self.terrain);

        save_collection(ctx, node, "weapon_types", &self.weapon_types, |_, n, _, weapon| {
            save_weapon_type(n, weapon);
            Ok(())
        })?;
        save_collection(ctx, node, "unit_types", &self.unit_types, |_, n, _, unit_type| {
            save_unit_type(n, unit_type, &self.unit_types);
            Ok(())
        })?;

        // Units go out before players so a unit spawned since the last
        // save already has its ID minted when a captain entry names it.
        save_mapped(
            ctx,
            node,
            "units",
            &self.units,
            &mut self.unit_ids,
            |unit| unit.key,
            |_, n, unit| {
                save_unit(n, unit, &self.unit_types, &self.players);
                Ok(())
            },
        )?;

        save_collection(ctx, node, "players", &self.players, |_, n, _, player| {
            save_player(n, player, &self.unit_ids);
            Ok(())
        })?;
        save_collection(ctx, node, "shops", &self.shops, |_, n, _, shop| {
            save_shop(n, shop, &self.players);
            Ok(())
        })?;
        save_ref_map(node, "diplomacy", &self.players, &self.diplomacy, |stance| {
            Node::from(stance.as_str())
        });
        Ok(())
    }

    pub fn unit(&self, key: UnitKey) -> Option<&Unit> {
        self.units.iter().find(|u| u.key == key)
    }

    pub fn unit_mut(&mut self, key: UnitKey) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.key == key)
    }

    /// Creates a unit at full fuel and ammo. It gets a document ID the
    /// next time the scenario is saved. Panics on an off-map position or
    /// a type handle from another scenario.
    pub fn spawn_unit(
        &mut self,
        unit_type: Ref<UnitType>,
        owner: Ref<Player>,
        x: u32,
        y: u32,
    ) -> UnitKey {
        assert!(
            x < self.width && y < self.height,
            "spawn position is outside the map"
        );
        let stats = self
            .unit_types
            .get(unit_type)
            .expect("spawned unit type belongs to this scenario");
        let (fuel, ammo) = (stats.max_fuel, stats.max_ammo);
        self.next_unit += 1;
        let key = UnitKey(self.next_unit);
        self.units.push(Unit {
            key,
            unit_type,
            owner,
            fuel,
            ammo,
            x,
            y,
        });
        key
    }

    /// Removes a unit, releasing its document ID and clearing any captain
    /// entry that pointed at it. False if no unit has this key.
    pub fn remove_unit(&mut self, key: UnitKey) -> bool {
        let Some(pos) = self.units.iter().position(|u| u.key == key) else {
            return false;
        };
        self.units.remove(pos);
        self.unit_ids.release(&key);
        let orphaned: Vec<_> = self
            .players
            .iter()
            .filter(|(_, _, player)| player.captain == Some(key))
            .map(|(handle, _, _)| handle)
            .collect();
        for handle in orphaned {
            if let Some(player) = self.players.get_mut(handle) {
                player.captain = None;
            }
        }
        true
    }
}

// ============================================================================
// Member loaders and savers
// ============================================================================

fn load_unit(
    ctx: &mut LoadContext,
    node: &mut Node,
    key: UnitKey,
    types: &Collection<UnitType>,
    players: &Collection<Player>,
    width: u32,
    height: u32,
) -> Result<Unit> {
    let unit_type = load_ref(ctx, node, "type", types)?;
    let owner = load_ref(ctx, node, "owner", players)?;
    let fuel = require_u32(ctx, node, "fuel")?;
    let ammo = require_u32(ctx, node, "ammo")?;
    let x = require_u32(ctx, node, "x")?;
    let y = require_u32(ctx, node, "y")?;

    let stats = types.get(unit_type).expect("handle came from this palette");
    if fuel > stats.max_fuel {
        return Err(ctx.domain_error(
            "unit exceeds maximum fuel",
            "fuel",
            node.get("fuel").unwrap_or(node),
        ));
    }
    if ammo > stats.max_ammo {
        return Err(ctx.domain_error(
            "unit exceeds maximum ammo",
            "ammo",
            node.get("ammo").unwrap_or(node),
        ));
    }
    if x >= width {
        return Err(ctx.domain_error(
            "unit is outside the map",
            "x",
            node.get("x").unwrap_or(node),
        ));
    }
    if y >= height {
        return Err(ctx.domain_error(
            "unit is outside the map",
            "y",
            node.get("y").unwrap_or(node),
        ));
    }
    Ok(Unit {
        key,
        unit_type,
        owner,
        fuel,
        ammo,
        x,
        y,
    })
}

fn save_unit(
    node: &mut Node,
    unit: &Unit,
    types: &Collection<UnitType>,
    players: &Collection<Player>,
) {
    save_ref(node, "type", unit.unit_type, types);
    save_ref(node, "owner", unit.owner, players);
    set_u32(node, "fuel", unit.fuel);
    set_u32(node, "ammo", unit.ammo);
    set_u32(node, "x", unit.x);
    set_u32(node, "y", unit.y);
}

fn load_player(
    ctx: &mut LoadContext,
    node: &mut Node,
    player: &mut Player,
    handle: Ref<Player>,
    units: &[Unit],
    unit_ids: &MappedIds<UnitKey>,
) -> Result<()> {
    player.name = require_string(ctx, node, "name")?;
    player.funds = require_i64(ctx, node, "funds")?;
    player.captain = None;
    if let Some(id) = optional_string(ctx, node, "captain")? {
        let at = node.get("captain").unwrap_or(node);
        let Some(&key) = unit_ids.key_of(&id) else {
            return Err(ctx.error(ErrorKind::UnknownReference(id), "captain", at));
        };
        match units.iter().find(|u| u.key == key) {
            Some(unit) if unit.owner == handle => player.captain = Some(key),
            Some(_) => {
                return Err(ctx.domain_error(
                    "captain belongs to a different player",
                    "captain",
                    at,
                ));
            }
            None => return Err(ctx.error(ErrorKind::UnknownReference(id), "captain", at)),
        }
    }
    Ok(())
}

fn save_player(node: &mut Node, player: &Player, unit_ids: &MappedIds<UnitKey>) {
    set_str(node, "name", &player.name);
    set_i64(node, "funds", player.funds);
    if let Some(captain) = player.captain {
        let id = unit_ids
            .id_of(&captain)
            .expect("captain went out with the unit roster");
        set_str(node, "captain", id);
    }
}

fn load_shop(
    ctx: &mut LoadContext,
    node: &mut Node,
    shop: &mut Shop,
    players: &Collection<Player>,
    types: &Collection<UnitType>,
) -> Result<()> {
    shop.name = require_string(ctx, node, "name")?;
    shop.owner = load_ref_opt(ctx, node, "owner", players)?;
    shop.stock = load_ref_set(ctx, node, "stock", types)?;
    Ok(())
}

fn save_shop(node: &mut Node, shop: &Shop, players: &Collection<Player>) {
    set_str(node, "name", &shop.name);
    save_ref_opt(node, "owner", shop.owner, players);
    save_ref_set(node, "stock", &shop.stock);
}

fn parse_stance(ctx: &mut LoadContext, id: &str, value: &Node) -> Result<Stance> {
    let Some(text) = value.as_str() else {
        return Err(ctx.error(
            ErrorKind::TypeMismatch {
                key: id.to_owned(),
                expected: "a stance string",
            },
            "",
            value,
        ));
    };
    Stance::parse(text).ok_or_else(|| ctx.domain_error(format!("unknown stance '{text}'"), "", value))
}

// ============================================================================
// Tests
// ============================================================================
