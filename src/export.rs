//! Trace export to the HXML curve-data dialect.
//!
//! A completed sweep is written as a fixed-schema XML document: one
//! dataset holding one curvedata block with exactly two named curves,
//! frequency (Hz) and magnitude (resolved display unit). Values are
//! space-separated decimals at 6 fractional digits inside bracketed text
//! content. The dataset `WorkingTitle` comes from the active preset (or
//! the export file stem as fallback); the `CurveDataName` always equals
//! the destination file name. Both are attribute text and get XML-escaped.
//!
//! [`read_trace`] parses the same dialect back, which gives the round-trip
//! property the tests rely on and backs the CLI trace viewer.

use crate::error::{AppResult, PanelError};
use chrono::Local;
use log::info;
use std::fmt::Write as _;
use std::path::Path;

/// Escape text for an XML attribute or text node.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`xml_escape`].
pub fn xml_unescape(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// A trace read back from an exported file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedTrace {
    pub working_title: String,
    pub curve_data_name: String,
    pub y_unit: String,
    pub frequency: Vec<f64>,
    pub magnitude: Vec<f64>,
}

/// Write a completed trace to `dest`.
///
/// `working_title` is the preset stem when one is active; `y_unit` is the
/// resolved magnitude unit label. Arrays must be non-empty and of equal
/// length — by the time a sweep is exported there is no shorter-length
/// clipping to hide behind, a mismatch here is a real defect.
pub fn export_trace(
    frequency: &[f64],
    magnitude: &[f64],
    dest: &Path,
    working_title: Option<&str>,
    y_unit: &str,
) -> AppResult<()> {
    if frequency.is_empty() || frequency.len() != magnitude.len() {
        return Err(PanelError::Export(format!(
            "empty or mismatched sweep data ({} frequency / {} magnitude points)",
            frequency.len(),
            magnitude.len()
        )));
    }

    let file_stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "sweep_trace".to_string());
    let file_name = dest
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "sweep_trace.hxml".to_string());

    let title = match working_title {
        Some(t) if !t.trim().is_empty() => t.trim().to_string(),
        _ => file_stem,
    };
    let title_xml = xml_escape(&title);
    let curve_name_xml = xml_escape(&file_name);

    let now = Local::now().format("%d-%b-%Y %H:%M:%S");
    // The attribute carries the unit without interior spaces ("dB SPL"
    // becomes "dBSPL"), matching what downstream curve tooling expects.
    let unit_attr = xml_escape(&y_unit.replace(' ', ""));

    let mut out = String::new();
    let _ = writeln!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>");
    let _ = writeln!(out, "<hxml>");
    let _ = writeln!(out, "  <head>");
    let _ = writeln!(out, "    <Document>");
    let _ = writeln!(
        out,
        "      <DataVersion XsdVersion=\"0.0.0.1\">0.0.0.1</DataVersion>"
    );
    let _ = writeln!(out, "      <DataType>hiCurve</DataType>");
    let _ = writeln!(out, "      <LDocNode>//hxml/data</LDocNode>");
    let _ = writeln!(out, "      <PlatformVersion>n.a.</PlatformVersion>");
    let _ = writeln!(out, "    </Document>");
    let _ = writeln!(out, "  </head>");
    let _ = writeln!(out, "  <data>");
    let _ = writeln!(out, "    <dataset WorkingTitle=\"{title_xml}\">");
    let _ = writeln!(out, "      <longDataSetDesc/>");
    let _ = writeln!(out, "      <shortDataSetDesc/>");
    let _ = writeln!(out, "      <acpEarhookType/>");
    let _ = writeln!(out, "      <v-curvedata>");
    let _ = writeln!(
        out,
        "        <curvedata CurveDataName=\"{curve_name_xml}\" MeasurementDate=\"{now}\""
    );
    let _ = writeln!(out, "                   TestEquipmentNr=\"UPV_Audio_Analyzer\"");
    let _ = writeln!(out, "                   Tester=\"sweepbench\">");
    let _ = writeln!(out, "          <longCurveDesc/>");
    let _ = writeln!(out, "          <shortCurveDesc/>");
    let _ = writeln!(
        out,
        "          <curve name=\"frequency\" unit=\"Hz\">[{}]</curve>",
        format_values(frequency)
    );
    let _ = writeln!(
        out,
        "          <curve name=\"magnitude\" unit=\"{unit_attr}\">[{}]</curve>",
        format_values(magnitude)
    );
    let _ = writeln!(out, "        </curvedata>");
    let _ = writeln!(out, "      </v-curvedata>");
    let _ = writeln!(out, "    </dataset>");
    let _ = writeln!(out, "  </data>");
    let _ = writeln!(out, "</hxml>");

    std::fs::write(dest, out)?;
    info!("trace exported to {}", dest.display());
    Ok(())
}

fn format_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.6}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an exported trace file back into arrays and labels.
pub fn read_trace(path: &Path) -> AppResult<ExportedTrace> {
    let text = std::fs::read_to_string(path)?;

    let working_title = attribute_value(&text, "WorkingTitle")
        .ok_or_else(|| PanelError::Export("missing WorkingTitle attribute".to_string()))?;
    let curve_data_name = attribute_value(&text, "CurveDataName")
        .ok_or_else(|| PanelError::Export("missing CurveDataName attribute".to_string()))?;

    let (_, frequency) = curve_values(&text, "frequency")?;
    let (y_unit, magnitude) = curve_values(&text, "magnitude")?;

    if frequency.len() != magnitude.len() {
        return Err(PanelError::Export(format!(
            "curve length mismatch in {}: {} vs {}",
            path.display(),
            frequency.len(),
            magnitude.len()
        )));
    }

    Ok(ExportedTrace {
        working_title,
        curve_data_name,
        y_unit,
        frequency,
        magnitude,
    })
}

/// Extract and unescape the first occurrence of `name="..."`.
fn attribute_value(text: &str, name: &str) -> Option<String> {
    let marker = format!("{name}=\"");
    let start = text.find(&marker)? + marker.len();
    let end = text[start..].find('"')? + start;
    Some(xml_unescape(&text[start..end]))
}

/// Extract the unit attribute and bracketed values of a named curve.
fn curve_values(text: &str, curve: &str) -> AppResult<(String, Vec<f64>)> {
    let marker = format!("<curve name=\"{curve}\" unit=\"");
    let unit_start = text
        .find(&marker)
        .ok_or_else(|| PanelError::Export(format!("missing curve '{curve}'")))?
        + marker.len();
    let unit_end = text[unit_start..]
        .find('"')
        .ok_or_else(|| PanelError::Export(format!("unterminated unit on curve '{curve}'")))?
        + unit_start;
    let unit = xml_unescape(&text[unit_start..unit_end]);

    let open = text[unit_end..]
        .find('[')
        .ok_or_else(|| PanelError::Export(format!("missing values on curve '{curve}'")))?
        + unit_end;
    let close = text[open..]
        .find(']')
        .ok_or_else(|| PanelError::Export(format!("unterminated values on curve '{curve}'")))?
        + open;

    let values = text[open + 1..close]
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| PanelError::Export(format!("bad value '{token}' in curve '{curve}'")))
        })
        .collect::<AppResult<Vec<f64>>>()?;

    Ok((unit, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_round_trip() {
        let nasty = r#"a & b "quoted" <tag> 'single'"#;
        let escaped = xml_escape(nasty);
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('"'));
        assert_eq!(xml_unescape(&escaped), nasty);
    }

    #[test]
    fn rejects_empty_and_mismatched_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.hxml");

        let err = export_trace(&[], &[], &dest, None, "dBV").unwrap_err();
        assert!(matches!(err, PanelError::Export(_)));

        let err = export_trace(&[1.0, 2.0], &[1.0], &dest, None, "dBV").unwrap_err();
        assert!(matches!(err, PanelError::Export(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn export_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("response.hxml");
        let freqs = vec![100.0, 1000.123456, 12_000.0];
        let mags = vec![-20.5, -3.000001, 0.25];

        export_trace(&freqs, &mags, &dest, Some("Bench Preset"), "dBV").unwrap();
        let trace = read_trace(&dest).unwrap();

        assert_eq!(trace.working_title, "Bench Preset");
        assert_eq!(trace.curve_data_name, "response.hxml");
        assert_eq!(trace.y_unit, "dBV");
        for (a, b) in trace.frequency.iter().zip(&freqs) {
            assert!((a - b).abs() < 1e-6);
        }
        for (a, b) in trace.magnitude.iter().zip(&mags) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn working_title_falls_back_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("late_night_run.hxml");
        export_trace(&[1.0], &[2.0], &dest, None, "dBV").unwrap();
        let trace = read_trace(&dest).unwrap();
        assert_eq!(trace.working_title, "late_night_run");

        let dest2 = dir.path().join("second.hxml");
        export_trace(&[1.0], &[2.0], &dest2, Some("   "), "dBV").unwrap();
        assert_eq!(read_trace(&dest2).unwrap().working_title, "second");
    }

    #[test]
    fn attributes_with_specials_are_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("amp.hxml");
        let title = r#"R&D "golden" <rev 2>"#;
        export_trace(&[1.0, 2.0], &[3.0, 4.0], &dest, Some(title), "dBV").unwrap();

        let raw = std::fs::read_to_string(&dest).unwrap();
        assert!(raw.contains("&amp;"));
        assert!(raw.contains("&quot;"));
        assert!(raw.contains("&lt;"));

        let trace = read_trace(&dest).unwrap();
        assert_eq!(trace.working_title, title);
    }

    #[test]
    fn unit_attribute_drops_interior_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("spl.hxml");
        export_trace(&[1.0], &[94.0], &dest, None, "dB SPL").unwrap();
        let trace = read_trace(&dest).unwrap();
        assert_eq!(trace.y_unit, "dBSPL");
    }
}
