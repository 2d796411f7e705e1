//! Static wire-protocol tables.
//!
//! Everything in here is read-only data: the per-section command map from
//! settings labels to SCPI prefixes, and the bidirectional code/display
//! maps for every enumerated setting family. Nothing mutates these at
//! runtime; the translation layer resolves through them on every apply.

pub mod command_map;
pub mod display_map;

pub use command_map::{command_prefix, CommandGroup, COMMAND_GROUPS, RAW_EXCLUDE, SECTIONS};
pub use display_map::{display_label, family_for, DisplayMap};
