//! Custom error types for the application.
//!
//! This module defines the primary error type, `PanelError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different failure classes of the panel:
//!
//! - **`Config`**: wraps errors from the `config` crate (file parsing or
//!   format issues in the tunables file).
//! - **`Io`**: wraps standard `std::io::Error`, covering all file and socket
//!   I/O issues.
//! - **`Link`**: communication failures on the instrument link. These are
//!   usually transient (the instrument is busy mid-sweep) and are retried by
//!   the acquisition loop rather than propagated.
//! - **`Timeout`**: a bounded read on the link expired. Kept separate from
//!   `Link` so callers can distinguish "instrument said nothing" from
//!   "instrument said something unusable".
//! - **`Document`**: the persisted settings document failed to parse or is
//!   structurally unusable. Fatal to the load operation only; callers retain
//!   their previous in-memory state.
//! - **`Export`**: trace export validation failures (empty or mismatched
//!   arrays). Raised to the caller of export, which decides whether to
//!   re-fetch or abort.
//!
//! By using `#[from]`, `PanelError` can be seamlessly created from underlying
//! error types with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, PanelError>;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Instrument link error: {0}")]
    Link(String),

    #[error("Instrument link timeout after {0} ms")]
    Timeout(u64),

    #[error("Link not connected")]
    NotConnected,

    #[error("Settings document error: {0}")]
    Document(String),

    #[error("Trace export error: {0}")]
    Export(String),

    #[error("No instrument found at any candidate address")]
    InstrumentNotFound,
}

impl From<serde_json::Error> for PanelError {
    fn from(err: serde_json::Error) -> Self {
        PanelError::Document(err.to_string())
    }
}

impl PanelError {
    /// Whether the error is a transient link condition worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, PanelError::Link(_) | PanelError::Timeout(_))
    }
}
