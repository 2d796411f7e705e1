//! The instrument link: transport trait, TCP implementation, discovery.
//!
//! The panel talks to the analyzer through the [`InstrumentLink`] trait so
//! the whole pipeline can run against a scripted mock in tests. The
//! concrete transport is a raw SCPI socket ([`TcpLink`]): newline-framed
//! ASCII commands over TCP, the plain-socket service every LAN-attached
//! analyzer exposes alongside its vendor protocol.
//!
//! The link object is stateful and not reentrant. Every consumer —
//! settings apply, status probes, the acquisition loop — must go through
//! one [`SharedLink`] mutex; interleaving two command/response exchanges
//! on the wire corrupts both.

use crate::config::AddressCache;
use crate::error::{AppResult, PanelError};
use async_trait::async_trait;
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Token expected in the `*IDN?` response of a supported analyzer.
pub const PRODUCT_MARKER: &str = "UPV";

/// Default port of the raw SCPI socket service.
pub const DEFAULT_SCPI_PORT: u16 = 5025;

/// Synchronous-style command transport to the instrument.
///
/// `write` is fire-and-forget (errors via `Err`); `query` returns the raw
/// response line with trailing whitespace stripped. Both respect the
/// per-link timeout set via `set_timeout`.
#[async_trait]
pub trait InstrumentLink: Send {
    async fn write(&mut self, command: &str) -> AppResult<()>;
    async fn query(&mut self, command: &str) -> AppResult<String>;
    fn set_timeout(&mut self, timeout: Duration);
}

/// The single shared handle through which all wire access is serialized.
pub type SharedLink = Arc<Mutex<Box<dyn InstrumentLink>>>;

/// Wrap a link for shared use.
pub fn shared(link: impl InstrumentLink + 'static) -> SharedLink {
    Arc::new(Mutex::new(Box::new(link)))
}

/// Raw SCPI socket transport.
pub struct TcpLink {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    timeout: Duration,
}

impl TcpLink {
    /// Open a connection to `host` or `host:port` (port defaults to the
    /// SCPI socket service).
    pub async fn open(address: &str) -> AppResult<Self> {
        let target = if address.contains(':') {
            address.to_string()
        } else {
            format!("{address}:{DEFAULT_SCPI_PORT}")
        };
        let timeout = Duration::from_secs(5);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&target))
            .await
            .map_err(|_| PanelError::Timeout(timeout.as_millis() as u64))?
            .map_err(|e| PanelError::Link(format!("connect {target}: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| PanelError::Link(format!("set_nodelay: {e}")))?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            timeout,
        })
    }
}

#[async_trait]
impl InstrumentLink for TcpLink {
    async fn write(&mut self, command: &str) -> AppResult<()> {
        let framed = format!("{command}\n");
        tokio::time::timeout(self.timeout, self.writer.write_all(framed.as_bytes()))
            .await
            .map_err(|_| PanelError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| PanelError::Link(format!("write '{command}': {e}")))?;
        Ok(())
    }

    async fn query(&mut self, command: &str) -> AppResult<String> {
        self.write(command).await?;
        let mut line = String::new();
        let read = tokio::time::timeout(self.timeout, self.reader.read_line(&mut line))
            .await
            .map_err(|_| PanelError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| PanelError::Link(format!("read for '{command}': {e}")))?;
        if read == 0 {
            return Err(PanelError::Link(format!(
                "connection closed while waiting for '{command}'"
            )));
        }
        Ok(line.trim_end().to_string())
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

/// Query `*IDN?` and verify the response names a supported analyzer.
pub async fn identify(link: &mut dyn InstrumentLink) -> AppResult<String> {
    let idn = link.query("*IDN?").await?;
    if idn.contains(PRODUCT_MARKER) {
        Ok(idn)
    } else {
        Err(PanelError::Link(format!(
            "instrument at link is not a {PRODUCT_MARKER}: {idn}"
        )))
    }
}

/// Open and identify a single address.
pub async fn connect(address: &str) -> AppResult<(SharedLink, String)> {
    let mut link = TcpLink::open(address).await?;
    let idn = identify(&mut link).await?;
    info!("connected to {idn} at {address}");
    Ok((shared(link), idn))
}

/// Connect using the cached address first, then each candidate in order.
/// The first address whose `*IDN?` carries the product marker wins and is
/// written back to the cache.
pub async fn connect_cached(
    cache_path: &Path,
    candidates: &[String],
) -> AppResult<(SharedLink, String)> {
    let mut tried = Vec::new();
    if let Some(cache) = AddressCache::load(cache_path) {
        info!("trying cached instrument address {}", cache.address);
        match connect(&cache.address).await {
            Ok((link, idn)) => return Ok((link, idn)),
            Err(err) => {
                warn!("cached address {} failed: {err}", cache.address);
                tried.push(cache.address);
            }
        }
    }
    for address in candidates {
        if tried.contains(address) {
            continue;
        }
        match connect(address).await {
            Ok((link, idn)) => {
                let cache = AddressCache {
                    address: address.clone(),
                };
                if let Err(err) = cache.save(cache_path) {
                    warn!("could not persist address cache: {err}");
                }
                return Ok((link, idn));
            }
            Err(err) => warn!("candidate {address} failed: {err}"),
        }
    }
    Err(PanelError::InstrumentNotFound)
}

pub mod mock {
    //! Scripted in-memory link for tests and offline development.

    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MockState {
        /// One-shot responses, consumed front to back, per command.
        queued: HashMap<String, VecDeque<String>>,
        /// Fallback response repeated once the queue for a command is dry.
        sticky: HashMap<String, String>,
        /// Remaining number of times a query should fail, per command.
        query_failures: HashMap<String, u32>,
        /// Write commands (matched by prefix) that error.
        write_failure_prefixes: Vec<String>,
        writes: Vec<String>,
        queries: Vec<String>,
        timeout: Option<Duration>,
    }

    /// Scripted instrument link. Clones share state, so a test can keep a
    /// handle for scripting and inspection while the pipeline owns the
    /// boxed copy.
    #[derive(Clone, Default)]
    pub struct MockLink {
        state: Arc<StdMutex<MockState>>,
    }

    impl MockLink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Always answer `command` with `response`.
        pub fn stick_response(&self, command: &str, response: &str) {
            if let Ok(mut state) = self.state.lock() {
                state
                    .sticky
                    .insert(command.to_string(), response.to_string());
            }
        }

        /// Answer `command` with `response` once, before any sticky
        /// response. Queued responses are consumed in push order.
        pub fn push_response(&self, command: &str, response: &str) {
            if let Ok(mut state) = self.state.lock() {
                state
                    .queued
                    .entry(command.to_string())
                    .or_default()
                    .push_back(response.to_string());
            }
        }

        /// Make the next `times` queries of `command` fail as timeouts.
        pub fn fail_query_times(&self, command: &str, times: u32) {
            if let Ok(mut state) = self.state.lock() {
                state.query_failures.insert(command.to_string(), times);
            }
        }

        /// Make every write whose command starts with `prefix` fail.
        pub fn fail_write_on(&self, prefix: &str) {
            if let Ok(mut state) = self.state.lock() {
                state.write_failure_prefixes.push(prefix.to_string());
            }
        }

        /// All writes issued so far, in order.
        pub fn writes(&self) -> Vec<String> {
            self.state.lock().map(|s| s.writes.clone()).unwrap_or_default()
        }

        /// All queries issued so far, in order.
        pub fn queries(&self) -> Vec<String> {
            self.state
                .lock()
                .map(|s| s.queries.clone())
                .unwrap_or_default()
        }

        /// The most recent timeout configured on the link.
        pub fn timeout(&self) -> Option<Duration> {
            self.state.lock().ok().and_then(|s| s.timeout)
        }
    }

    #[async_trait]
    impl InstrumentLink for MockLink {
        async fn write(&mut self, command: &str) -> AppResult<()> {
            let mut state = self
                .state
                .lock()
                .map_err(|_| PanelError::Link("mock state poisoned".to_string()))?;
            state.writes.push(command.to_string());
            let failing = state
                .write_failure_prefixes
                .iter()
                .any(|prefix| command.starts_with(prefix.as_str()));
            if failing {
                return Err(PanelError::Link(format!("scripted write failure: {command}")));
            }
            Ok(())
        }

        async fn query(&mut self, command: &str) -> AppResult<String> {
            let mut state = self
                .state
                .lock()
                .map_err(|_| PanelError::Link("mock state poisoned".to_string()))?;
            state.queries.push(command.to_string());
            if let Some(remaining) = state.query_failures.get_mut(command) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PanelError::Timeout(0));
                }
            }
            if let Some(queue) = state.queued.get_mut(command) {
                if let Some(response) = queue.pop_front() {
                    return Ok(response);
                }
            }
            if let Some(response) = state.sticky.get(command) {
                return Ok(response.clone());
            }
            Err(PanelError::Link(format!("no scripted response for '{command}'")))
        }

        fn set_timeout(&mut self, timeout: Duration) {
            if let Ok(mut state) = self.state.lock() {
                state.timeout = Some(timeout);
            }
        }
    }
}
