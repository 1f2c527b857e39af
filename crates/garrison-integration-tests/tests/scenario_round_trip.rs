//! Full scenarios over real files: palettes pulled in through includes,
//! cross-pass captain references, ID stability, and save reconstruction.

use std::fs;
use std::path::{Path, PathBuf};

use garrison_doc::{ErrorKind, Loader};
use garrison_model::{Scenario, Stance};

fn make_test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "garrison_scenario_{}_{}",
        std::process::id(),
        name
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

const WEAPONS: &str = r#"{
  "cannon": {"name": "Cannon", "damage": 70, "range": 2, "ammo_cost": 1},
  "mg": {"name": "Machine gun", "damage": 35, "range": 1, "ammo_cost": 1}
}"#;

const PALETTE: &str = r#"{
  "rifle": {"name": "Rifle squad", "movement": 3, "max_fuel": 99, "max_ammo": 3, "cost": 1000, "weapons": ["mg"]},
  "tank": {"name": "Tank", "movement": 6, "max_fuel": 40, "max_ammo": 9, "cost": 7000, "weapons": ["cannon", "mg"]}
}"#;

const SCENARIO: &str = r#"{
  "name": "Bridgehead",
  "width": 4,
  "height": 3,
  "terrain": ["ggrg", "ggrg", "ggbg"],
  "weapon_types": {"include": "weapons.json"},
  "unit_types": {"include": "palette.json"},
  "players": {
    "blue": {"name": "Blue", "funds": 12000},
    "red": {"name": "Red", "funds": 10000, "captain": "obj1"}
  },
  "units": {
    "obj1": {"type": "tank", "owner": "red", "fuel": 40, "ammo": 9, "x": 0, "y": 0},
    "obj2": {"type": "rifle", "owner": "blue", "fuel": 99, "ammo": 3, "x": 3, "y": 2}
  },
  "shops": {
    "base": {"name": "Barracks", "owner": "red", "stock": ["rifle", "tank"]}
  },
  "diplomacy": {"blue": "friendly", "red": "hostile"}
}"#;

fn battlefield(name: &str) -> (PathBuf, Loader) {
    let dir = make_test_dir(name);
    write_file(&dir, "weapons.json", WEAPONS);
    write_file(&dir, "palette.json", PALETTE);
    write_file(&dir, "scenario.json", SCENARIO);
    let loader = Loader::new().with_root(&dir);
    (dir, loader)
}

#[test]
fn scenarios_assemble_from_included_palettes() {
    let (dir, loader) = battlefield("assemble");
    let (sc, includes) = Scenario::load_file(&loader, dir.join("scenario.json")).unwrap();

    assert_eq!(sc.name, "Bridgehead");
    assert_eq!(sc.unit_types.len(), 2);
    assert_eq!(sc.weapon_types.len(), 2);
    assert_eq!(sc.units.len(), 2);

    let tank = sc.unit_types.get(sc.unit_types.by_id("tank").unwrap()).unwrap();
    assert_eq!(tank.max_fuel, 40);
    assert!(tank.weapons.contains_id("cannon"));

    let red = sc.players.by_id("red").unwrap();
    assert_eq!(sc.players.get(red).unwrap().captain, Some(sc.units[0].key));
    assert_eq!(sc.diplomacy.get(red), Some(&Stance::Hostile));

    // both palette pulls got recorded against their tree paths
    assert_eq!(includes.len(), 2);
    assert!(includes.get(".weapon_types").unwrap().include_only());
    assert!(includes.get(".unit_types").unwrap().include_only());
}

#[test]
fn untouched_palettes_save_back_as_pure_directives() {
    let (dir, loader) = battlefield("resave");
    let (mut sc, includes) = Scenario::load_file(&loader, dir.join("scenario.json")).unwrap();

    sc.save_to(dir.join("out.json"), Some(&includes)).unwrap();
    let saved = fs::read_to_string(dir.join("out.json")).unwrap();
    assert!(saved.contains("\"weapon_types\": {\n    \"include\": \"weapons.json\"\n  }"));
    assert!(saved.contains("\"unit_types\": {\n    \"include\": \"palette.json\"\n  }"));

    // the directive round-trips through a second load from the same roots
    let (mut sc2, includes2) = Scenario::load_file(&loader, dir.join("out.json")).unwrap();
    assert_eq!(sc2.unit_types.len(), 2);
    assert_eq!(includes2.len(), 2);
    let again = String::from_utf8(sc2.save(Some(&includes2)).unwrap()).unwrap();
    assert_eq!(saved, again);
}

#[test]
fn palette_overrides_keep_their_diff_across_saves() {
    let dir = make_test_dir("palette_override");
    write_file(&dir, "weapons.json", WEAPONS);
    write_file(&dir, "palette.json", PALETTE);
    let doc = SCENARIO.replace(
        r#""unit_types": {"include": "palette.json"}"#,
        r#""unit_types": {"include": "palette.json", "tank": {"name": "Tank", "movement": 6, "max_fuel": 40, "max_ammo": 9, "cost": 8000, "weapons": ["cannon", "mg"]}}"#,
    );
    write_file(&dir, "scenario.json", &doc);

    let loader = Loader::new().with_root(&dir);
    let (mut sc, includes) = Scenario::load_file(&loader, dir.join("scenario.json")).unwrap();
    let tank = sc.unit_types.get(sc.unit_types.by_id("tank").unwrap()).unwrap();
    assert_eq!(tank.cost, 8000);

    let info = includes.get(".unit_types").unwrap();
    assert_eq!(info.override_keys.len(), 1);
    assert_eq!(info.override_keys.get("tank"), Some(&true));

    sc.save_to(dir.join("out.json"), Some(&includes)).unwrap();
    let (sc2, _) = Scenario::load_file(&loader, dir.join("out.json")).unwrap();
    let tank2 = sc2.unit_types.get(sc2.unit_types.by_id("tank").unwrap()).unwrap();
    assert_eq!(tank2.cost, 8000);
    // the rifle never leaves the included palette
    let saved = fs::read_to_string(dir.join("out.json")).unwrap();
    assert!(!saved.contains("Rifle squad"));
}

#[test]
fn errors_point_into_the_palette_file() {
    let dir = make_test_dir("palette_error");
    write_file(&dir, "weapons.json", WEAPONS);
    let broken = PALETTE.replace(" \"movement\": 6,", "");
    write_file(&dir, "palette.json", &broken);
    write_file(&dir, "scenario.json", SCENARIO);

    let loader = Loader::new().with_root(&dir);
    let err = Scenario::load_file(&loader, dir.join("scenario.json")).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingField(ref k) if k == "movement"));
    assert!(err.location.unwrap().file.ends_with("palette.json"));
}

#[test]
fn spawned_units_keep_roster_ids_stable_across_files() {
    let (dir, loader) = battlefield("spawn");
    let (mut sc, includes) = Scenario::load_file(&loader, dir.join("scenario.json")).unwrap();

    let rifle = sc.unit_types.by_id("rifle").unwrap();
    let blue = sc.players.by_id("blue").unwrap();
    let spawned = sc.spawn_unit(rifle, blue, 1, 1);
    assert_eq!(sc.unit(spawned).unwrap().fuel, 99);

    sc.save_to(dir.join("out.json"), Some(&includes)).unwrap();
    let saved = fs::read_to_string(dir.join("out.json")).unwrap();
    // obj1 and obj2 stay with the loaded units; the new one takes obj0
    assert!(saved.contains("\"obj0\""));
    assert!(saved.contains("\"captain\": \"obj1\""));

    let (sc2, _) = Scenario::load_file(&loader, dir.join("out.json")).unwrap();
    assert_eq!(sc2.units.len(), 3);
    let fresh = &sc2.units[0];
    assert_eq!((fresh.x, fresh.y), (1, 1));
    assert_eq!(fresh.fuel, 99);
}
