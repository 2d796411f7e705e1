//! The hierarchical settings document.
//!
//! The persisted form is a JSON object with four fixed section keys, each
//! mapping field labels to string values, plus a handful of top-level keys
//! (`INIT:CONT` for global sweep mode, optional raw SCPI passthrough keys,
//! unit overrides like `SENS:USER`). Field order inside a section is the
//! panel's display order and must survive a load/save round trip, which is
//! why the document is backed by `serde_json`'s order-preserving map.
//!
//! Three passes operate on a loaded document:
//!
//! - **default patching** inserts fields that older presets predate, at a
//!   fixed position so the form layout stays stable;
//! - **normalization** rewrites legacy unit spellings into canonical form
//!   and is idempotent, so re-normalizing an already-clean document is a
//!   no-op;
//! - **resolve-for-write** turns an edited (possibly display-form) value
//!   into its wire form for the dispatcher.

use crate::error::{AppResult, PanelError};
use crate::protocol::{display_map, SECTIONS};
use crate::units::{FrequencyUnit, ImpedanceUnit, TimeUnit, VoltageUnit};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;

/// Top-level key holding the global sweep mode ("ON" = continuous).
pub const SWEEP_MODE_KEY: &str = "INIT:CONT";

/// Global sweep mode, stored outside the four sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    Single,
    Continuous,
}

/// Enumeration codes look like "S256K" or "R200": letters and digits, no
/// embedded space. Those must never be touched by unit normalization.
static CODE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    let re = Regex::new(r"^[A-Za-z]+\d[A-Za-z0-9]*$").unwrap();
    re
});

/// A `<number> <unit>` composite, unit optional, spacing sloppy.
static VALUE_UNIT: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    let re = Regex::new(r"^(-?[0-9][0-9.]*(?:[eE][-+]?[0-9]+)?)\s*(\S+)?$").unwrap();
    re
});

/// The in-memory settings document.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsDocument {
    root: Map<String, Value>,
}

impl SettingsDocument {
    /// An empty document with no sections.
    pub fn empty() -> Self {
        Self { root: Map::new() }
    }

    /// Parse a persisted document. A malformed document is fatal to the
    /// load only; the caller keeps whatever it had before.
    pub fn parse(text: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(root) = value else {
            return Err(PanelError::Document(
                "settings document must be a JSON object".to_string(),
            ));
        };
        for section in SECTIONS {
            if let Some(entry) = root.get(section) {
                if !entry.is_object() {
                    return Err(PanelError::Document(format!(
                        "section '{section}' must be an object"
                    )));
                }
            }
        }
        Ok(Self { root })
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn to_json_string(&self) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(&Value::Object(self.root.clone()))?)
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// Field labels and string values of one section, in display order.
    pub fn fields(&self, section: &str) -> Vec<(String, String)> {
        match self.root.get(section) {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(label, value)| {
                    value.as_str().map(|v| (label.clone(), v.to_string()))
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn get(&self, section: &str, label: &str) -> Option<&str> {
        self.root.get(section)?.get(label)?.as_str()
    }

    pub fn set(&mut self, section: &str, label: &str, value: impl Into<String>) {
        let entry = self
            .root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(label.to_string(), Value::String(value.into()));
        }
    }

    /// Top-level string entry outside the sections (unit overrides, sweep
    /// mode, raw passthrough commands).
    pub fn top_level(&self, key: &str) -> Option<&str> {
        if SECTIONS.contains(&key) {
            return None;
        }
        self.root.get(key)?.as_str()
    }

    pub fn set_top_level(&mut self, key: &str, value: impl Into<String>) {
        self.root.insert(key.to_string(), Value::String(value.into()));
    }

    /// All top-level string entries that are not sections, in order.
    pub fn top_level_entries(&self) -> Vec<(String, String)> {
        self.root
            .iter()
            .filter(|(key, _)| !SECTIONS.contains(&key.as_str()))
            .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
            .collect()
    }

    pub fn sweep_mode(&self) -> SweepMode {
        match self.top_level(SWEEP_MODE_KEY) {
            Some(v) if v.eq_ignore_ascii_case("ON") => SweepMode::Continuous,
            _ => SweepMode::Single,
        }
    }

    pub fn set_sweep_mode(&mut self, mode: SweepMode) {
        let value = match mode {
            SweepMode::Continuous => "ON",
            SweepMode::Single => "OFF",
        };
        self.set_top_level(SWEEP_MODE_KEY, value);
    }

    /// Patch fields that older presets predate.
    ///
    /// `Frequency` joined Generator Function after presets were already in
    /// circulation; documents without it get it inserted with a 1 kHz
    /// default right after `Sweep Ctrl` so the form order matches current
    /// presets. Without the anchor it is prepended.
    pub fn ensure_defaults(&mut self) {
        const SECTION: &str = "Generator Function";
        const FIELD: &str = "Frequency";
        const ANCHOR: &str = "Sweep Ctrl";
        const DEFAULT: &str = "1 kHz";

        let Some(Value::Object(map)) = self.root.get(SECTION) else {
            return;
        };
        if map.contains_key(FIELD) {
            return;
        }

        let mut rebuilt = Map::new();
        let mut inserted = false;
        for (label, value) in map {
            rebuilt.insert(label.clone(), value.clone());
            if label == ANCHOR {
                rebuilt.insert(FIELD.to_string(), Value::String(DEFAULT.to_string()));
                inserted = true;
            }
        }
        if !inserted {
            let mut front = Map::new();
            front.insert(FIELD.to_string(), Value::String(DEFAULT.to_string()));
            front.extend(rebuilt);
            rebuilt = front;
        }
        self.root.insert(SECTION.to_string(), Value::Object(rebuilt));
    }

    /// Rewrite legacy unit spellings into canonical form across all four
    /// sections. Idempotent: normalizing a normalized document changes
    /// nothing.
    pub fn normalize(&mut self) {
        for section in SECTIONS {
            let Some(Value::Object(map)) = self.root.get_mut(section) else {
                continue;
            };
            for (_, value) in map.iter_mut() {
                if let Value::String(text) = value {
                    let normalized = normalize_value(text);
                    if normalized != *text {
                        *text = normalized;
                    }
                }
            }
        }
    }
}

/// Normalize one field value. See [`SettingsDocument::normalize`].
pub fn normalize_value(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() || CODE_TOKEN.is_match(trimmed) {
        return trimmed.to_string();
    }
    let Some(caps) = VALUE_UNIT.captures(trimmed) else {
        return trimmed.to_string();
    };
    let number = &caps[1];
    let Some(unit) = caps.get(2) else {
        return trimmed.to_string();
    };
    match canonical_unit(unit.as_str()) {
        Some(canonical) => format!("{number} {canonical}"),
        None => trimmed.to_string(),
    }
}

/// Canonical spelling for a recognized unit token.
fn canonical_unit(token: &str) -> Option<&'static str> {
    let t = token.trim();
    if t == "%" || t.eq_ignore_ascii_case("pct") {
        return Some("%");
    }
    if t.eq_ignore_ascii_case("dB") {
        return Some("dB");
    }
    if let Some(u) = VoltageUnit::parse(t) {
        return Some(u.canonical());
    }
    if let Some(u) = FrequencyUnit::parse(t) {
        return Some(u.canonical());
    }
    if let Some(u) = TimeUnit::parse(t) {
        return Some(u.canonical());
    }
    if let Some(u) = ImpedanceUnit::parse(t) {
        return Some(u.canonical());
    }
    None
}

/// ASCII wire spelling for a unit token; the instrument rejects the micro
/// sign, everything else passes through canonical.
fn wire_unit(token: &str) -> String {
    if let Some(u) = VoltageUnit::parse(token) {
        return u.wire().to_string();
    }
    if let Some(u) = TimeUnit::parse(token) {
        return u.wire().to_string();
    }
    if let Some(u) = FrequencyUnit::parse(token) {
        return u.canonical().to_string();
    }
    if let Some(u) = ImpedanceUnit::parse(token) {
        return u.canonical().to_string();
    }
    token.to_string()
}

/// Produce the wire-protocol value for an edited field.
///
/// Enumerated fields reverse-map display → code, falling back to the raw
/// string so an unmapped edit still reaches the instrument. Composite
/// value+unit fields re-join with one space and ASCII unit spelling. A
/// blank numeric field resolves to an empty string.
pub fn resolve_for_write(section: &str, label: &str, value: &str) -> String {
    let trimmed = value.trim();
    if let Some(family) = display_map::family_for(section, label) {
        return family.code_or_raw(trimmed).to_string();
    }
    if trimmed.is_empty() {
        return String::new();
    }
    let Some(caps) = VALUE_UNIT.captures(trimmed) else {
        return trimmed.to_string();
    };
    let number = caps[1].to_string();
    match caps.get(2) {
        Some(unit) => format!("{number} {}", wire_unit(unit.as_str())),
        None => number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SettingsDocument {
        SettingsDocument::parse(
            r#"{
                "Generator Config": {
                    "Instrument Generator": "ANLG",
                    "Output Type (Unbal/Bal)": "BAL",
                    "Impedance": "R10",
                    "Max Voltage": "1 V",
                    "Ref Voltage": "0.775 V",
                    "Ref Frequency": "1000 hz"
                },
                "Generator Function": {
                    "Function Generator": "SIN",
                    "Low Dist": "OFF",
                    "Sweep Ctrl": "ASW",
                    "Start": "100 Hz",
                    "Stop": "12 KHZ",
                    "Voltage": "0.1 uV"
                },
                "Analyzer Config": {
                    "Instrument Analyzer": "ANLG",
                    "Ref Imped": "600 Ω",
                    "Delay": "2000 MS",
                    "MAX FFT Size": "S256K"
                },
                "Analyzer Function": {
                    "Function Analyzer": "RMSS",
                    "Fnct Settling": "EXP",
                    "Samples": "6",
                    "Tolerance": "0.1pct",
                    "Timeout": "10 us"
                },
                "INIT:CONT": "OFF",
                "SENS:UNIT": "DBV",
                "DISP:SWE1:A:UNIT:TRAC": "DBV"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn parse_rejects_non_object() {
        assert!(SettingsDocument::parse("[1,2]").is_err());
        assert!(SettingsDocument::parse("{bad json").is_err());
        assert!(SettingsDocument::parse(r#"{"Generator Config": 7}"#).is_err());
    }

    #[test]
    fn field_order_survives_round_trip() {
        let doc = sample();
        let text = doc.to_json_string().unwrap();
        let reparsed = SettingsDocument::parse(&text).unwrap();
        let before: Vec<_> = doc.fields("Generator Function");
        let after: Vec<_> = reparsed.fields("Generator Function");
        assert_eq!(before, after);
        assert_eq!(before[0].0, "Function Generator");
        assert_eq!(before[2].0, "Sweep Ctrl");
    }

    #[test]
    fn normalization_rewrites_legacy_spellings() {
        let mut doc = sample();
        doc.normalize();
        assert_eq!(doc.get("Generator Config", "Ref Frequency"), Some("1000 Hz"));
        assert_eq!(doc.get("Generator Function", "Stop"), Some("12 kHz"));
        assert_eq!(doc.get("Generator Function", "Voltage"), Some("0.1 \u{b5}V"));
        assert_eq!(doc.get("Analyzer Config", "Ref Imped"), Some("600 ohm"));
        assert_eq!(doc.get("Analyzer Config", "Delay"), Some("2000 ms"));
        assert_eq!(doc.get("Analyzer Function", "Tolerance"), Some("0.1 %"));
        assert_eq!(doc.get("Analyzer Function", "Timeout"), Some("10 \u{b5}s"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut once = sample();
        once.normalize();
        let mut twice = once.clone();
        twice.normalize();
        assert_eq!(once, twice);
    }

    #[test]
    fn code_tokens_are_exempt() {
        assert_eq!(normalize_value("S256K"), "S256K");
        assert_eq!(normalize_value("R200"), "R200");
        assert_eq!(normalize_value("DB12"), "DB12");
        assert_eq!(normalize_value("HP22"), "HP22");
    }

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(normalize_value("RMS"), "RMS");
        assert_eq!(normalize_value("ON"), "ON");
        assert_eq!(normalize_value("30"), "30");
        assert_eq!(normalize_value(""), "");
    }

    #[test]
    fn missing_frequency_is_patched_after_anchor() {
        let mut doc = SettingsDocument::parse(
            r#"{
                "Generator Function": {
                    "Function Generator": "SIN",
                    "Sweep Ctrl": "ASW",
                    "Start": "100 Hz"
                }
            }"#,
        )
        .unwrap();
        doc.ensure_defaults();
        let labels: Vec<_> = doc
            .fields("Generator Function")
            .into_iter()
            .map(|(l, _)| l)
            .collect();
        assert_eq!(labels, ["Function Generator", "Sweep Ctrl", "Frequency", "Start"]);
        assert_eq!(doc.get("Generator Function", "Frequency"), Some("1 kHz"));
    }

    #[test]
    fn frequency_patch_prepends_without_anchor() {
        let mut doc = SettingsDocument::parse(
            r#"{"Generator Function": {"Function Generator": "SIN"}}"#,
        )
        .unwrap();
        doc.ensure_defaults();
        let labels: Vec<_> = doc
            .fields("Generator Function")
            .into_iter()
            .map(|(l, _)| l)
            .collect();
        assert_eq!(labels, ["Frequency", "Function Generator"]);
    }

    #[test]
    fn frequency_patch_is_stable_when_present() {
        let mut doc = sample();
        doc.set("Generator Function", "Frequency", "2 kHz");
        let before = doc.clone();
        doc.ensure_defaults();
        assert_eq!(doc, before);
    }

    #[test]
    fn resolve_enumeration_display_to_code() {
        assert_eq!(
            resolve_for_write("Analyzer Function", "Function Analyzer", "RMS Selective"),
            "RMSS"
        );
        // Already-code values survive the reverse lookup untouched.
        assert_eq!(
            resolve_for_write("Analyzer Function", "Function Analyzer", "RMSS"),
            "RMSS"
        );
        // Unknown display text falls back to the raw string.
        assert_eq!(
            resolve_for_write("Analyzer Function", "Function Analyzer", "Mystery"),
            "Mystery"
        );
    }

    #[test]
    fn resolve_composite_uses_ascii_wire_units() {
        assert_eq!(
            resolve_for_write("Generator Function", "Voltage", "0.1 \u{b5}V"),
            "0.1 uV"
        );
        assert_eq!(
            resolve_for_write("Analyzer Function", "Timeout", "10 \u{b5}s"),
            "10 us"
        );
        assert_eq!(
            resolve_for_write("Generator Function", "Start", "100Hz"),
            "100 Hz"
        );
        assert_eq!(resolve_for_write("Generator Function", "Voltage", ""), "");
        assert_eq!(resolve_for_write("Generator Function", "Points", "30"), "30");
    }

    #[test]
    fn sweep_mode_accessor() {
        let mut doc = sample();
        assert_eq!(doc.sweep_mode(), SweepMode::Single);
        doc.set_sweep_mode(SweepMode::Continuous);
        assert_eq!(doc.sweep_mode(), SweepMode::Continuous);
        assert_eq!(doc.top_level(SWEEP_MODE_KEY), Some("ON"));
    }

    #[test]
    fn top_level_entries_exclude_sections() {
        let doc = sample();
        let keys: Vec<_> = doc
            .top_level_entries()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, ["INIT:CONT", "SENS:UNIT", "DISP:SWE1:A:UNIT:TRAC"]);
    }
}
