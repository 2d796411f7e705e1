//! Axis-limit policy for the live sweep view.
//!
//! The X axis is pinned to a fixed display range regardless of data
//! extent, matching what the instrument's own screen shows. The Y axis
//! starts out auto-scaled from the visible data, but the moment the
//! instrument reports a usable display span of its own, that span is
//! locked for the rest of the session — recomputing bounds mid-sweep makes
//! the chart jitter as points arrive.
//!
//! Freshly reset instruments report placeholder limits: exactly (0, 1), a
//! degenerate span, or one narrower than any real measurement window.
//! Those are "trivial" and never locked.

use crate::acquisition::TraceSample;
use crate::config::DisplaySettings;
use crate::settings::SettingsDocument;

/// Session-scoped Y-axis state.
#[derive(Debug, Default)]
pub struct YAxisPolicy {
    locked: Option<(f64, f64)>,
}

/// A span the instrument reports before it has real limits configured.
pub fn is_trivial_span(bottom: f64, top: f64, trivial_width: f64) -> bool {
    if top <= bottom {
        return true;
    }
    if bottom == 0.0 && top == 1.0 {
        return true;
    }
    (top - bottom) < trivial_width
}

impl YAxisPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked(&self) -> Option<(f64, f64)> {
        self.locked
    }

    /// Offer an instrument-reported span. Locks on the first non-trivial
    /// span and ignores everything after, trivial or not. Returns whether
    /// this call locked.
    pub fn offer_span(&mut self, span: Option<(f64, f64)>, display: &DisplaySettings) -> bool {
        if self.locked.is_some() {
            return false;
        }
        let Some((bottom, top)) = span else {
            return false;
        };
        if is_trivial_span(bottom, top, display.trivial_span_width) {
            return false;
        }
        self.locked = Some((bottom, top));
        true
    }

    /// Y bounds to plot with: the locked span when one exists, otherwise
    /// an auto-scale over the points inside the fixed X window.
    pub fn bounds(&self, sample: &TraceSample, display: &DisplaySettings) -> (f64, f64) {
        if let Some(locked) = self.locked {
            return locked;
        }
        autoscale(sample, display)
    }
}

/// Min/max of the visible data window, padded. Falls back to the full
/// data when nothing lies inside the X window, and to a unit span when
/// there is no data at all.
fn autoscale(sample: &TraceSample, display: &DisplaySettings) -> (f64, f64) {
    let visible: Vec<f64> = sample
        .frequency
        .iter()
        .zip(&sample.magnitude)
        .filter(|(x, _)| **x >= display.x_min_hz && **x <= display.x_max_hz)
        .map(|(_, y)| *y)
        .collect();

    let values: &[f64] = if visible.is_empty() {
        &sample.magnitude
    } else {
        &visible
    };
    if values.is_empty() {
        return (0.0, 1.0);
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return (min - display.flat_pad, max + display.flat_pad);
    }
    let pad = (max - min) * display.autoscale_pad_fraction;
    (min - pad, max + pad)
}

/// Resolve the Y-axis unit label from the settings document.
///
/// Priority: user-defined free-text unit (`SENS:USER`) > standard
/// enumerated unit (`SENS:UNIT`, legacy `SENS1:UNIT`) > `"dBV"`.
pub fn resolve_y_unit(doc: &SettingsDocument) -> String {
    if let Some(user) = doc.top_level("SENS:USER") {
        let sanitized = sanitize_user_unit(user);
        if !sanitized.is_empty() {
            return sanitized;
        }
    }
    let std_unit = doc
        .top_level("SENS:UNIT")
        .or_else(|| doc.top_level("SENS1:UNIT"));
    if let Some(raw) = std_unit {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return standard_unit_label(trimmed);
        }
    }
    "dBV".to_string()
}

/// Clean up a user-entered unit: strip enclosing quotes, fix dB casing,
/// upper-case an SPL token.
fn sanitize_user_unit(raw: &str) -> String {
    let stripped = raw.trim().trim_matches('"').trim_matches('\'').trim();
    if stripped.is_empty() {
        return String::new();
    }
    if stripped.len() >= 2 && stripped.is_char_boundary(2) && stripped[..2].eq_ignore_ascii_case("db")
    {
        let rest = stripped[2..].trim_start();
        if rest.is_empty() {
            return "dB".to_string();
        }
        let tokens: Vec<String> = rest
            .split_whitespace()
            .map(|t| {
                if t.eq_ignore_ascii_case("spl") {
                    "SPL".to_string()
                } else {
                    t.to_string()
                }
            })
            .collect();
        return format!("dB {}", tokens.join(" "));
    }
    stripped.to_string()
}

/// Map the enumerated wire unit onto its display label.
fn standard_unit_label(raw: &str) -> String {
    match raw.to_uppercase().as_str() {
        "DBR" => "dBr".to_string(),
        "DBV" => "dBV".to_string(),
        "DBU" => "dBu".to_string(),
        "DBM" => "dBm".to_string(),
        "V" => "V".to_string(),
        "MV" => "mV".to_string(),
        "UV" | "UVR" | "UV RMS" | "UVRMS" => "\u{b5}V".to_string(),
        "PCT" | "%" => "%".to_string(),
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display() -> DisplaySettings {
        DisplaySettings::default()
    }

    fn sample(points: &[(f64, f64)]) -> TraceSample {
        TraceSample {
            frequency: points.iter().map(|(x, _)| *x).collect(),
            magnitude: points.iter().map(|(_, y)| *y).collect(),
        }
    }

    #[test]
    fn trivial_span_detection() {
        let width = display().trivial_span_width;
        assert!(is_trivial_span(0.0, 1.0, width)); // the placeholder pair
        assert!(is_trivial_span(-10.0, -10.0, width)); // degenerate
        assert!(is_trivial_span(5.0, 2.0, width)); // inverted
        assert!(is_trivial_span(0.0, 0.2, width)); // too narrow
        assert!(!is_trivial_span(-80.0, 20.0, width));
        assert!(!is_trivial_span(0.0, 2.0, width));
    }

    #[test]
    fn first_non_trivial_span_locks_forever() {
        let display = display();
        let mut policy = YAxisPolicy::new();
        let data = sample(&[(1000.0, -20.0), (2000.0, -10.0)]);

        // Trivial spans never lock.
        assert!(!policy.offer_span(Some((0.0, 1.0)), &display));
        assert!(policy.locked().is_none());

        assert!(policy.offer_span(Some((-80.0, 20.0)), &display));
        assert_eq!(policy.bounds(&data, &display), (-80.0, 20.0));

        // A later span, even a perfectly good one, changes nothing.
        assert!(!policy.offer_span(Some((-40.0, 0.0)), &display));
        assert_eq!(policy.bounds(&data, &display), (-80.0, 20.0));
    }

    #[test]
    fn autoscale_uses_visible_window_with_padding() {
        let display = display();
        let policy = YAxisPolicy::new();
        // One point far outside the fixed X range must not stretch the axis.
        let data = sample(&[(50.0, -90.0), (1000.0, -30.0), (5000.0, -10.0)]);
        let (lo, hi) = policy.bounds(&data, &display);
        assert!((lo - (-31.0)).abs() < 1e-9); // -30 - 5% of 20
        assert!((hi - (-9.0)).abs() < 1e-9); // -10 + 5% of 20
    }

    #[test]
    fn autoscale_flat_window_gets_fixed_pad() {
        let display = display();
        let policy = YAxisPolicy::new();
        let data = sample(&[(1000.0, -20.0), (2000.0, -20.0)]);
        assert_eq!(policy.bounds(&data, &display), (-20.1, -19.9));
    }

    #[test]
    fn autoscale_empty_sample() {
        let display = display();
        let policy = YAxisPolicy::new();
        assert_eq!(policy.bounds(&TraceSample::default(), &display), (0.0, 1.0));
    }

    #[test]
    fn y_unit_priority() {
        let mut doc = SettingsDocument::parse("{}").unwrap();
        assert_eq!(resolve_y_unit(&doc), "dBV");

        doc.set_top_level("SENS1:UNIT", "DBU");
        assert_eq!(resolve_y_unit(&doc), "dBu");

        doc.set_top_level("SENS:UNIT", "UVR");
        assert_eq!(resolve_y_unit(&doc), "\u{b5}V");

        doc.set_top_level("SENS:USER", "\"db spl\"");
        assert_eq!(resolve_y_unit(&doc), "dB SPL");
    }

    #[test]
    fn user_unit_sanitizing() {
        assert_eq!(sanitize_user_unit("\"dB SPL\""), "dB SPL");
        assert_eq!(sanitize_user_unit("'db spl'"), "dB SPL");
        assert_eq!(sanitize_user_unit("db"), "dB");
        assert_eq!(sanitize_user_unit("Pa"), "Pa");
        assert_eq!(sanitize_user_unit("  "), "");
    }
}
