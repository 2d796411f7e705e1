//! Declarative field-visibility rules.
//!
//! Some fields only make sense while a sibling field holds a particular
//! value: the settling detail fields are meaningless with settling off,
//! and the balanced impedance selector only applies to balanced output.
//! Rather than toggling widgets imperatively from every edit handler, the
//! dependencies live in one table of predicates evaluated against the
//! document; fields without a rule are always visible.

use crate::settings::SettingsDocument;

type Predicate = fn(&SettingsDocument) -> bool;

pub struct VisibilityRule {
    pub section: &'static str,
    pub label: &'static str,
    pub applies: Predicate,
}

fn settling_enabled(doc: &SettingsDocument) -> bool {
    doc.get("Analyzer Function", "Fnct Settling")
        .map(|v| !v.eq_ignore_ascii_case("OFF"))
        .unwrap_or(false)
}

fn rms_function(doc: &SettingsDocument) -> bool {
    matches!(
        doc.get("Analyzer Function", "Function Analyzer"),
        Some("RMS") | Some("RMSS") | Some("RMS Selective")
    )
}

fn samples_visible(doc: &SettingsDocument) -> bool {
    settling_enabled(doc) && rms_function(doc)
}

fn balanced_output(doc: &SettingsDocument) -> bool {
    matches!(
        doc.get("Generator Config", "Output Type (Unbal/Bal)"),
        Some("BAL") | Some("Bal")
    )
}

static RULES: &[VisibilityRule] = &[
    VisibilityRule {
        section: "Analyzer Function",
        label: "Samples",
        applies: samples_visible,
    },
    VisibilityRule {
        section: "Analyzer Function",
        label: "Tolerance",
        applies: settling_enabled,
    },
    VisibilityRule {
        section: "Analyzer Function",
        label: "Resolution",
        applies: settling_enabled,
    },
    VisibilityRule {
        section: "Analyzer Function",
        label: "Timeout",
        applies: settling_enabled,
    },
    VisibilityRule {
        section: "Generator Config",
        label: "Impedance",
        applies: balanced_output,
    },
];

/// Whether a field should be shown given the current document state.
pub fn is_visible(doc: &SettingsDocument, section: &str, label: &str) -> bool {
    RULES
        .iter()
        .find(|rule| rule.section == section && rule.label == label)
        .map(|rule| (rule.applies)(doc))
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(settling: &str, function: &str, output: &str) -> SettingsDocument {
        let mut doc = SettingsDocument::parse("{}").unwrap();
        doc.set("Analyzer Function", "Fnct Settling", settling);
        doc.set("Analyzer Function", "Function Analyzer", function);
        doc.set("Generator Config", "Output Type (Unbal/Bal)", output);
        doc
    }

    #[test]
    fn settling_fields_follow_settling_mode() {
        let on = doc("EXP", "RMS", "BAL");
        let off = doc("OFF", "RMS", "BAL");
        for label in ["Tolerance", "Resolution", "Timeout"] {
            assert!(is_visible(&on, "Analyzer Function", label));
            assert!(!is_visible(&off, "Analyzer Function", label));
        }
    }

    #[test]
    fn samples_needs_settling_and_rms() {
        assert!(is_visible(&doc("EXP", "RMS", "BAL"), "Analyzer Function", "Samples"));
        assert!(is_visible(&doc("FLAT", "RMSS", "BAL"), "Analyzer Function", "Samples"));
        assert!(!is_visible(&doc("OFF", "RMS", "BAL"), "Analyzer Function", "Samples"));
        assert!(!is_visible(&doc("EXP", "THD", "BAL"), "Analyzer Function", "Samples"));
    }

    #[test]
    fn impedance_follows_output_type() {
        assert!(is_visible(&doc("OFF", "RMS", "BAL"), "Generator Config", "Impedance"));
        assert!(!is_visible(&doc("OFF", "RMS", "UNB"), "Generator Config", "Impedance"));
    }

    #[test]
    fn unlisted_fields_default_visible() {
        let empty = SettingsDocument::parse("{}").unwrap();
        assert!(is_visible(&empty, "Generator Config", "Max Voltage"));
        assert!(is_visible(&empty, "Nowhere", "Nothing"));
    }
}
