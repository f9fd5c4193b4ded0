//! Device designation against document fixtures

use std::path::PathBuf;
use wirenum::passes::designation::plan_designations;
use wirenum::prelude::*;
use wirenum::{EntityId, LetterCodeRule, TerminalSet};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn panel() -> MemoryDocument {
    MemoryDocument::load(&fixture_path("panel.json")).expect("fixture should load")
}

fn name_of(doc: &MemoryDocument, device: i64) -> &str {
    &doc.device(EntityId(device)).unwrap().name
}

#[test]
fn test_designations_follow_symbol_positions() {
    let mut doc = panel();
    let report = NamingCore::assign_device_designations(
        &mut doc,
        &NamingConfig::default(),
        &RunOptions::default(),
    )
    .unwrap();

    assert_eq!(name_of(&doc, 2), "M2D4");
    // both relays sit in 1C3; the one further left keeps the plain label
    assert_eq!(name_of(&doc, 6), "K1C3");
    assert_eq!(name_of(&doc, 1), "K1C3.A");
    assert_eq!(name_of(&doc, 5), "W001");

    assert_eq!(report.considered, 6);
    assert_eq!(report.updated, 4);
    assert_eq!(report.skipped, 2);
}

#[test]
fn test_terminals_are_excluded() {
    let mut doc = panel();
    let config = NamingConfig::default();
    NamingCore::assign_device_designations(&mut doc, &config, &RunOptions::default()).unwrap();

    // by predicate
    assert_eq!(name_of(&doc, 3), "XT1");
    // by name prefix, the host has no terminal predicates for it
    assert_eq!(name_of(&doc, 4), "TB2");
}

#[test]
fn test_prefix_fallback_follows_config() {
    let mut doc = panel();
    let config = NamingConfig {
        terminal_prefixes: vec!["XT".to_string()],
        ..Default::default()
    };
    let terminals = TerminalSet::classify(&mut doc, &config).unwrap();
    let plan = plan_designations(&mut doc, &config, &terminals).unwrap();
    assert_eq!(plan.terminals, vec![EntityId(3)]);
    assert_eq!(plan.unplaced, vec![EntityId(4)]);
}

#[test]
fn test_cable_ids_are_not_duplicated() {
    let mut doc = panel();
    let config = NamingConfig::default();
    let terminals = TerminalSet::classify(&mut doc, &config).unwrap();
    let plan = plan_designations(&mut doc, &config, &terminals).unwrap();
    let cables = plan
        .devices
        .iter()
        .filter(|d| d.device == EntityId(5))
        .count();
    assert_eq!(cables, 1);
}

#[test]
fn test_second_run_changes_nothing() {
    let mut doc = panel();
    let config = NamingConfig::default();
    let options = RunOptions::default();

    NamingCore::assign_device_designations(&mut doc, &config, &options).unwrap();
    let report = NamingCore::assign_device_designations(&mut doc, &config, &options).unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.unchanged, 4);
}

#[test]
fn test_custom_letter_code_rules() {
    let mut doc = panel();
    let config = NamingConfig {
        letter_code_rules: vec![LetterCodeRule::new("relay", "KA")],
        ..Default::default()
    };
    NamingCore::assign_device_designations(&mut doc, &config, &RunOptions::default()).unwrap();
    assert_eq!(name_of(&doc, 6), "KA1C3");
    // no rule matches, first letter of the name
    assert_eq!(name_of(&doc, 2), "M2D4");
}
