//! Integration tests for full naming runs

use std::path::PathBuf;
use wirenum::prelude::*;
use wirenum::EntityId;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_run_all_order_and_results() {
    let mut doc = MemoryDocument::load(&fixture_path("panel.json")).unwrap();
    let report =
        NamingCore::run_all(&mut doc, &NamingConfig::default(), &RunOptions::default()).unwrap();

    let order: Vec<PassKind> = report.passes.iter().map(|p| p.pass).collect();
    assert_eq!(order, PassKind::ALL.to_vec());
    assert!(!report.has_failures());

    // terminal pins see the wire numbers written earlier in the same run
    assert_eq!(doc.pin(EntityId(13)).unwrap().name, "1A5.A");
    assert_eq!(doc.device(EntityId(2)).unwrap().name, "M2D4");
    assert_eq!(doc.peak_selections(), 1);
}

#[test]
fn test_run_all_twice_is_stable() {
    let mut doc = MemoryDocument::load(&fixture_path("panel.json")).unwrap();
    let config = NamingConfig::default();
    let options = RunOptions::default();

    NamingCore::run_all(&mut doc, &config, &options).unwrap();
    let first = doc.snapshot().clone();
    let report = NamingCore::run_all(&mut doc, &config, &options).unwrap();

    assert_eq!(doc.snapshot(), &first);
    assert_eq!(report.total_updated(), 0);
}

#[test]
fn test_selected_passes_only() {
    let mut doc = MemoryDocument::load(&fixture_path("panel.json")).unwrap();
    let report = NamingCore::run(
        &mut doc,
        &NamingConfig::default(),
        &RunOptions::default(),
        &[PassKind::WireNumbers],
    )
    .unwrap();

    assert_eq!(report.passes.len(), 1);
    assert!(report.pass(PassKind::DeviceDesignations).is_none());
    assert_eq!(doc.device(EntityId(1)).unwrap().name, "RELAY_1");
}

#[test]
fn test_snapshot_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("numbered.json");

    let mut doc = MemoryDocument::load(&fixture_path("panel.json")).unwrap();
    NamingCore::run_all(&mut doc, &NamingConfig::default(), &RunOptions::default()).unwrap();
    doc.save(&out).unwrap();

    let reloaded = MemoryDocument::load(&out).unwrap();
    assert_eq!(reloaded.snapshot(), doc.snapshot());
    assert_eq!(reloaded.segment_attribute(EntityId(204), "Wire number"), Some("1B7"));
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wirenum.json");
    std::fs::write(
        &path,
        r#"{ "wire_number_attributes": ["WireNumber"], "base_label_order": "natural" }"#,
    )
    .unwrap();

    let config = NamingConfig::load(&path).unwrap();
    assert_eq!(config.wire_number_attributes, vec!["WireNumber".to_string()]);
    assert_eq!(config.base_label_order, BaseLabelOrder::Natural);
    assert_eq!(config.fix_wire_name_attribute, "FixWireName");

    let mut doc = MemoryDocument::load(&fixture_path("panel.json")).unwrap();
    NamingCore::assign_wire_numbers(&mut doc, &config, &RunOptions::default()).unwrap();
    assert_eq!(doc.segment_attribute(EntityId(200), "WireNumber"), Some("1A5"));
}

#[test]
fn test_report_serializes_to_json() {
    let mut doc = MemoryDocument::load(&fixture_path("panel.json")).unwrap();
    let report =
        NamingCore::run_all(&mut doc, &NamingConfig::default(), &RunOptions::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["passes"][1]["pass"], "wire_numbers");
    assert_eq!(json["passes"][1]["updated"], 4);
}

#[test]
fn test_invalid_snapshot_is_rejected() {
    let result = MemoryDocument::from_json_str(
        r#"{ "connections": [{ "id": 1, "signal": "A", "pins": [9] }] }"#,
    );
    assert!(matches!(
        result,
        Err(NamingError::Document(wirenum::DocumentError::InvalidSnapshot(_)))
    ));
}

#[test]
fn test_designated_device_is_not_a_terminal_later_in_the_run() {
    // device 7 has no terminal predicates and a name with no letter, so it is
    // designated with the default letter code "X", a terminal prefix
    let mut doc = MemoryDocument::from_json_str(
        r#"{
            "sheets": [{ "id": 1, "name": "1" }],
            "net_segments": [{ "id": 20 }],
            "pins": [
                {
                    "id": 2,
                    "name": "2",
                    "location": { "sheet": 1, "x": 10.0, "y": 10.0, "grid": "/1.A5" }
                }
            ],
            "connections": [{ "id": 100, "signal": "S", "pins": [2], "net_segments": [20] }],
            "symbols": [
                { "id": 30, "location": { "sheet": 1, "x": 40.0, "y": 20.0, "grid": "/1.B2" } }
            ],
            "devices": [{ "id": 7, "name": "42", "symbols": [30], "pins": [2] }]
        }"#,
    )
    .unwrap();
    let report =
        NamingCore::run_all(&mut doc, &NamingConfig::default(), &RunOptions::default()).unwrap();

    assert_eq!(doc.device(EntityId(7)).unwrap().name, "X1B2");
    assert_eq!(doc.segment_attribute(EntityId(20), "Wire number"), Some("1A5"));
    assert_eq!(doc.pin(EntityId(2)).unwrap().name, "2");
    assert_eq!(report.pass(PassKind::TerminalPinNames).unwrap().considered, 0);
}

#[test]
fn test_terminal_by_prefix_stays_a_terminal_for_the_whole_run() {
    let mut doc = MemoryDocument::load(&fixture_path("panel.json")).unwrap();
    let report =
        NamingCore::run_all(&mut doc, &NamingConfig::default(), &RunOptions::default()).unwrap();

    let devices = report.pass(PassKind::DeviceDesignations).unwrap();
    assert_eq!(devices.label_of("TB2"), None);
    assert_eq!(doc.device(EntityId(4)).unwrap().name, "TB2");
    assert_eq!(doc.pin(EntityId(14)).unwrap().name, "1B7");
}
