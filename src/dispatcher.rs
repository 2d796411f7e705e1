//! Settings applier: walks the document and configures the instrument.
//!
//! Application is best-effort by design. The protocol has no multi-command
//! transaction, so a failure partway through leaves the instrument in a
//! mixed old/new state; each field gets its own outcome and the batch
//! always runs to the end. Fields without a command-map entry are coverage
//! gaps, recorded as skipped rather than failed — some settings only exist
//! in certain instrument modes.
//!
//! Top-level document keys containing a `:` that are not sections and not
//! on the exclusion list are sent verbatim as raw SCPI. This is the escape
//! hatch for settings the panel has no form for; it performs no validation,
//! so the settings document must come from a trusted source.

use crate::link::SharedLink;
use crate::protocol::{command_prefix, COMMAND_GROUPS, RAW_EXCLUDE};
use crate::settings::{resolve_for_write, SettingsDocument};
use log::{info, warn};

/// What happened to one field during apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    /// Command issued successfully.
    Applied,
    /// No command-map entry for this label; nothing sent.
    Skipped,
    /// The write errored; the batch continued.
    Failed(String),
}

/// One line of the apply log.
#[derive(Debug, Clone)]
pub struct AppliedField {
    pub section: String,
    pub label: String,
    /// Full wire command, when one was issued.
    pub command: Option<String>,
    pub outcome: FieldOutcome,
}

/// Per-field outcome log of a whole apply run.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub entries: Vec<AppliedField>,
}

impl ApplyReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, FieldOutcome::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FieldOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FieldOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&FieldOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} applied, {} failed, {} skipped",
            self.applied(),
            self.failed(),
            self.skipped()
        )
    }
}

/// Apply every field of the document to the instrument, one write per
/// resolved field, never aborting on a per-field failure.
pub async fn apply_settings(doc: &SettingsDocument, link: &SharedLink) -> ApplyReport {
    let mut report = ApplyReport::default();

    for group in &COMMAND_GROUPS {
        let fields = doc.fields(group.section);
        if fields.is_empty() {
            warn!("section '{}' not present in settings document", group.section);
            continue;
        }
        info!("applying {}", group.section);
        for (label, value) in fields {
            let entry = match command_prefix(group.section, &label) {
                Some(prefix) => {
                    let wire_value = resolve_for_write(group.section, &label, &value);
                    let command = format!("{prefix} {wire_value}");
                    let outcome = {
                        let mut link = link.lock().await;
                        match link.write(&command).await {
                            Ok(()) => {
                                info!("  {label}: {wire_value}");
                                FieldOutcome::Applied
                            }
                            Err(err) => {
                                warn!("  failed to apply {label}: {err}");
                                FieldOutcome::Failed(err.to_string())
                            }
                        }
                    };
                    AppliedField {
                        section: group.section.to_string(),
                        label,
                        command: Some(command),
                        outcome,
                    }
                }
                None => {
                    warn!("  unknown setting label: {label}");
                    AppliedField {
                        section: group.section.to_string(),
                        label,
                        command: None,
                        outcome: FieldOutcome::Skipped,
                    }
                }
            };
            report.entries.push(entry);
        }
    }

    apply_raw_passthrough(doc, link, &mut report).await;
    info!("apply finished: {}", report.summary());
    report
}

/// Send top-level raw SCPI keys. Sections are already handled, keys on the
/// exclusion list are interpreted by the panel itself, and only keys with a
/// command separator qualify.
async fn apply_raw_passthrough(doc: &SettingsDocument, link: &SharedLink, report: &mut ApplyReport) {
    for (key, value) in doc.top_level_entries() {
        if RAW_EXCLUDE.contains(&key.as_str()) || !key.contains(':') {
            continue;
        }
        let command = format!("{key} {value}");
        let outcome = {
            let mut link = link.lock().await;
            match link.write(&command).await {
                Ok(()) => {
                    info!("  (raw) {key}: {value}");
                    FieldOutcome::Applied
                }
                Err(err) => {
                    warn!("  (raw) failed {key}: {err}");
                    FieldOutcome::Failed(err.to_string())
                }
            }
        };
        report.entries.push(AppliedField {
            section: String::new(),
            label: key,
            command: Some(command),
            outcome,
        });
    }
}
