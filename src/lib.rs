//! # Sweepbench Core Library
//!
//! Control-panel core for a LAN/USB SCPI audio analyzer: settings-to-
//! protocol translation plus the live sweep-acquisition pipeline. The
//! binary (`main.rs`) and the egui panel are thin layers over this crate;
//! everything with behavior worth testing lives here.
//!
//! ## Crate Structure
//!
//! - **`acquisition`**: the background polling loop. Streams partial sweep
//!   traces through a freshest-wins channel and detects single-sweep
//!   completion via the event status register.
//! - **`axis`**: axis-limit policy for the live view (fixed X window,
//!   lock-once Y span) and Y-unit label resolution.
//! - **`config`**: tunable runtime settings (`config` crate + TOML) and
//!   the instrument address cache.
//! - **`dispatcher`**: best-effort bulk application of a settings document
//!   to the instrument, one write per field, per-field outcome log.
//! - **`error`**: the `PanelError` enum shared across the crate.
//! - **`export`**: HXML trace export and read-back.
//! - **`gui`**: the eframe/egui panel (live consumer of the acquisition
//!   channels).
//! - **`link`**: the `InstrumentLink` transport trait, the TCP SCPI socket
//!   implementation, discovery against the address cache, and the scripted
//!   mock used throughout the tests.
//! - **`protocol`**: static command map and code/display maps.
//! - **`readback`**: instrument settings snapshot (wire codes back into a
//!   document-shaped JSON file).
//! - **`settings`**: the ordered settings document, normalization pass and
//!   resolve-for-write translation.
//! - **`units`**: pure unit conversions (voltage/frequency/time/impedance/
//!   ratio families).
//! - **`visibility`**: declarative field-visibility predicates.

pub mod acquisition;
pub mod axis;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod export;
pub mod gui;
pub mod link;
pub mod protocol;
pub mod readback;
pub mod settings;
pub mod units;
pub mod visibility;
