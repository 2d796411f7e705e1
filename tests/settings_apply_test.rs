//! End-to-end tests for the settings pipeline: load from disk, patch,
//! normalize, apply to a scripted instrument, snapshot back.

use sweepbench::dispatcher::{apply_settings, FieldOutcome};
use sweepbench::link::mock::MockLink;
use sweepbench::link::shared;
use sweepbench::readback::read_current_settings;
use sweepbench::settings::SettingsDocument;

const PRESET: &str = r#"{
    "Generator Config": {
        "Instrument Generator": "ANLG",
        "Channel Generator": "CH1",
        "Output Type (Unbal/Bal)": "BAL",
        "Impedance": "R10",
        "Max Voltage": "1 V",
        "Ref Voltage": "0.775 V",
        "Ref Frequency": "1000 hz"
    },
    "Generator Function": {
        "Function Generator": "Sine",
        "Low Dist": "OFF",
        "Sweep Ctrl": "ASW",
        "Start": "100 Hz",
        "Stop": "12 KHZ",
        "Points": "30",
        "Voltage": "0.5 uV"
    },
    "Analyzer Config": {
        "Instrument Analyzer": "ANLG",
        "Ref Imped": "600 Ω",
        "Delay": "0.5 S"
    },
    "Analyzer Function": {
        "Function Analyzer": "RMS Selective",
        "Fnct Settling": "EXP",
        "Samples": "6",
        "Tolerance": "0.1 pct",
        "Obsolete Field": "whatever"
    },
    "INIT:CONT": "OFF",
    "SENS:UNIT": "DBV",
    "DISP:SWE1:A:UNIT:TRAC": "DBV"
}"#;

fn load_preset(dir: &tempfile::TempDir) -> SettingsDocument {
    let path = dir.path().join("preset.json");
    std::fs::write(&path, PRESET).unwrap();
    let mut doc = SettingsDocument::load(&path).unwrap();
    doc.ensure_defaults();
    doc.normalize();
    doc
}

#[tokio::test]
async fn preset_flows_to_wire_in_canonical_form() {
    let dir = tempfile::tempdir().unwrap();
    let doc = load_preset(&dir);

    // The forward-compat patch landed right after its anchor.
    let labels: Vec<String> = doc
        .fields("Generator Function")
        .into_iter()
        .map(|(l, _)| l)
        .collect();
    let sweep_ctrl = labels.iter().position(|l| l == "Sweep Ctrl").unwrap();
    assert_eq!(labels[sweep_ctrl + 1], "Frequency");

    let mock = MockLink::new();
    let link = shared(mock.clone());
    let report = apply_settings(&doc, &link).await;
    let writes = mock.writes();

    // Normalized units reach the wire in ASCII form.
    assert!(writes.contains(&"SOUR:FREQ:REF 1000 Hz".to_string()));
    assert!(writes.contains(&"SOUR:SWE:FREQ:STOP 12 kHz".to_string()));
    assert!(writes.contains(&"SOUR:VOLT 0.5 uV".to_string()));
    assert!(writes.contains(&"TRIG:DEL 0.5 s".to_string()));
    assert!(writes.contains(&"SENS1:POW:REF:RES 600 ohm".to_string()));
    assert!(writes.contains(&"SENS1:FUNC:SETT:TOL 0.1 %".to_string()));
    // Display-form enumerations were reverse-mapped.
    assert!(writes.contains(&"SOUR:FUNC SIN".to_string()));
    assert!(writes.contains(&"SENS1:FUNC RMSS".to_string()));
    // The patched default went out too.
    assert!(writes.contains(&"SOUR:FREQ 1 kHz".to_string()));
    // Raw passthrough keys, minus the excluded sweep-mode key.
    assert!(writes.contains(&"SENS:UNIT DBV".to_string()));
    assert!(!writes.iter().any(|w| w.starts_with("INIT:CONT")));

    assert_eq!(report.failed(), 0);
    assert_eq!(report.skipped(), 1); // "Obsolete Field"
}

#[tokio::test]
async fn partial_failure_leaves_the_rest_applied() {
    let dir = tempfile::tempdir().unwrap();
    let doc = load_preset(&dir);

    let mock = MockLink::new();
    mock.fail_write_on("SENS1:FUNC:SETT:COUN");
    let link = shared(mock.clone());
    let report = apply_settings(&doc, &link).await;

    assert_eq!(report.failed(), 1);
    let failed: Vec<_> = report
        .entries
        .iter()
        .filter(|e| matches!(e.outcome, FieldOutcome::Failed(_)))
        .map(|e| e.label.as_str())
        .collect();
    assert_eq!(failed, ["Samples"]);

    // Fields after the failure in the same section still went out.
    assert!(mock.writes().contains(&"SENS1:FUNC:SETT:TOL 0.1 %".to_string()));
    // So did the raw passthrough at the very end.
    assert!(mock.writes().contains(&"DISP:SWE1:A:UNIT:TRAC DBV".to_string()));
}

#[tokio::test]
async fn snapshot_round_trips_into_an_applicable_preset() {
    // An instrument answering a handful of queries...
    let mock = MockLink::new();
    mock.stick_response("INST?", "1");
    mock.stick_response("SOUR:FUNC?", "SIN");
    mock.stick_response("SENS1:FUNC?", "RMSS");
    mock.stick_response("SENS1:FUNC:SETT:MODE?", "EXP");
    mock.stick_response("SOUR:VOLT:MAX?", "1 V");
    let link = shared(mock.clone());

    let snapshot = read_current_settings(&link).await;
    assert_eq!(snapshot.get("Generator Function", "Function Generator"), Some("SIN"));

    // ...produces a document the dispatcher can apply right back.
    let apply_mock = MockLink::new();
    let apply_link = shared(apply_mock.clone());
    let report = apply_settings(&snapshot, &apply_link).await;

    assert_eq!(report.failed(), 0);
    assert!(apply_mock.writes().contains(&"SENS1:FUNC RMSS".to_string()));
    assert!(apply_mock.writes().contains(&"SOUR:VOLT:MAX 1 V".to_string()));
}

#[test]
fn document_round_trip_preserves_order_and_normalization_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let doc = load_preset(&dir);

    let path = dir.path().join("saved.json");
    doc.save(&path).unwrap();
    let mut reloaded = SettingsDocument::load(&path).unwrap();

    let before: Vec<_> = doc.fields("Analyzer Function");
    assert_eq!(before, reloaded.fields("Analyzer Function"));

    // Normalizing the already-normalized reload changes nothing.
    reloaded.normalize();
    assert_eq!(doc, reloaded);
}

#[test]
fn malformed_preset_is_a_load_error_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ this is not json").unwrap();
    assert!(SettingsDocument::load(&path).is_err());
}
