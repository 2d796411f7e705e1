//! Background sweep acquisition.
//!
//! One [`SweepMonitor`] exists per active sweep session. It spawns a tokio
//! task that repeatedly pulls the two trace arrays off the instrument,
//! publishes the freshest pair through a watch channel (a single slot
//! where a new value overwrites an unread one — the consumer only ever
//! sees the latest state), and reports lifecycle events over a status
//! channel.
//!
//! The loop never touches UI state and never dies on a per-iteration
//! error: trace reads fail routinely while the instrument is busy
//! settling, so failures increment a counter, surface one warning past a
//! threshold, back off and retry. Poll pacing is adaptive — tight while
//! the point count is still growing, progressively slower once the data
//! stops changing, which keeps the link load down during long dwell
//! phases.
//!
//! Single-sweep sessions finish in one of two ways: the event status
//! register reports operation-complete (bit 0 of `*ESR?`), or no new
//! points have arrived for a configured number of polls and the sweep is
//! declared ended by timeout. The latter is a recognized terminal state,
//! not an error. Continuous sessions only stop on user action.

use crate::config::AcquisitionSettings;
use crate::error::AppResult;
use crate::link::{InstrumentLink, SharedLink};
use crate::settings::SweepMode;
use log::{debug, warn};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Trace query for the sweep X (frequency) array.
const TRACE_X_QUERY: &str = "TRAC:SWE1:LOAD:AX?";
/// Trace query for the sweep Y (magnitude) array.
const TRACE_Y_QUERY: &str = "TRAC:SWE1:LOAD:AY?";
/// Event-status register; bit 0 set means operation complete.
const ESR_QUERY: &str = "*ESR?";
/// Instrument-side display limits, offered to the axis-lock policy.
const DISPLAY_BOTTOM_QUERY: &str = "DISP:SWE1:A:BOTT?";
const DISPLAY_TOP_QUERY: &str = "DISP:SWE1:A:TOP?";

/// Bounded wait when joining the acquisition task on stop.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// One matched pair of trace arrays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TraceSample {
    pub frequency: Vec<f64>,
    pub magnitude: Vec<f64>,
}

impl TraceSample {
    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }
}

/// What the monitor publishes after each successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceUpdate {
    pub sample: TraceSample,
    /// Instrument-reported display bottom/top, when readable this poll.
    pub display_span: Option<(f64, f64)>,
}

/// Lifecycle events surfaced to the foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepStatus {
    /// Transient read failures crossed the warning threshold. Sent once
    /// per session; the loop keeps retrying regardless.
    Warning(String),
    /// Operation-complete bit observed (single sweep finished).
    Completed,
    /// No new data for the configured idle budget; ended without a
    /// completion signal.
    Ended,
    /// Stopped by user action.
    Stopped,
}

impl SweepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SweepStatus::Warning(_))
    }
}

/// Parse a comma-separated trace array. Tokens that fail to parse are
/// dropped rather than failing the whole read; a torn response mid-sweep
/// should degrade, not error.
pub fn parse_trace_array(raw: &str) -> Vec<f64> {
    raw.split(',')
        .filter_map(|token| token.trim().parse::<f64>().ok())
        .collect()
}

/// Pair two raw arrays into a sample, clipping to the shorter length when
/// they disagree. In-flight reads can catch the instrument between array
/// updates; clipping keeps the pair consistent.
pub fn pair_arrays(frequency: Vec<f64>, magnitude: Vec<f64>) -> TraceSample {
    let common = frequency.len().min(magnitude.len());
    if frequency.len() != magnitude.len() {
        debug!(
            "trace arrays length mismatch ({} vs {}), clipping to {}",
            frequency.len(),
            magnitude.len(),
            common
        );
    }
    let mut frequency = frequency;
    let mut magnitude = magnitude;
    frequency.truncate(common);
    magnitude.truncate(common);
    TraceSample {
        frequency,
        magnitude,
    }
}

/// Whether an `*ESR?` response has the operation-complete bit set.
pub fn esr_operation_complete(raw: &str) -> bool {
    raw.trim()
        .parse::<i64>()
        .map(|esr| esr & 0x01 != 0)
        .unwrap_or(false)
}

/// Next poll delay given how long the point count has been stable.
/// Tight while data is arriving, then stepped down to the slow interval,
/// then to the cap.
pub fn next_interval(stable_polls: u32, cfg: &AcquisitionSettings) -> Duration {
    if stable_polls < cfg.stable_polls_before_slowdown {
        Duration::from_millis(cfg.fast_poll_ms)
    } else if stable_polls < cfg.stable_polls_before_slowdown * 4 {
        Duration::from_millis(cfg.slow_poll_ms)
    } else {
        Duration::from_millis(cfg.max_poll_ms)
    }
}

/// Turn generator output on and trigger a single sweep.
pub async fn arm_single_sweep(link: &SharedLink) -> AppResult<()> {
    let mut link = link.lock().await;
    link.write("OUTP ON").await?;
    link.write("INIT:CONT OFF").await?;
    link.write("INIT").await?;
    Ok(())
}

/// Turn generator output on and put the instrument in continuous sweep.
pub async fn start_continuous(link: &SharedLink) -> AppResult<()> {
    let mut link = link.lock().await;
    link.write("OUTP ON").await?;
    link.write("INIT:CONT ON").await?;
    Ok(())
}

struct PollOutcome {
    update: TraceUpdate,
    operation_complete: bool,
}

/// One poll iteration: both trace arrays, the display span, and (for
/// single sweeps) the completion bit, all under one lock acquisition so a
/// foreground status probe cannot interleave between the paired reads.
async fn poll_once(link: &mut dyn InstrumentLink, check_completion: bool) -> AppResult<PollOutcome> {
    let x_raw = link.query(TRACE_X_QUERY).await?;
    let y_raw = link.query(TRACE_Y_QUERY).await?;
    let sample = pair_arrays(parse_trace_array(&x_raw), parse_trace_array(&y_raw));

    let display_span = match (
        link.query(DISPLAY_BOTTOM_QUERY).await,
        link.query(DISPLAY_TOP_QUERY).await,
    ) {
        (Ok(bottom), Ok(top)) => match (bottom.trim().parse::<f64>(), top.trim().parse::<f64>()) {
            (Ok(b), Ok(t)) => Some((b, t)),
            _ => None,
        },
        _ => None,
    };

    let operation_complete = if check_completion {
        match link.query(ESR_QUERY).await {
            Ok(raw) => esr_operation_complete(&raw),
            Err(err) => {
                debug!("completion probe failed: {err}");
                false
            }
        }
    } else {
        false
    };

    Ok(PollOutcome {
        update: TraceUpdate {
            sample,
            display_span,
        },
        operation_complete,
    })
}

/// Handle to a running acquisition session.
pub struct SweepMonitor {
    handle: JoinHandle<()>,
    cancel_tx: watch::Sender<bool>,
    mode: SweepMode,
}

impl SweepMonitor {
    /// Spawn the acquisition task for a new sweep session.
    ///
    /// Returns the monitor handle, the freshest-wins trace channel and the
    /// status channel. The task runs until completion, timeout, or
    /// [`SweepMonitor::stop`].
    pub fn start(
        link: SharedLink,
        mode: SweepMode,
        cfg: AcquisitionSettings,
    ) -> (
        Self,
        watch::Receiver<Option<TraceUpdate>>,
        mpsc::UnboundedReceiver<SweepStatus>,
    ) {
        let (trace_tx, trace_rx) = watch::channel(None);
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let handle = tokio::spawn(run_loop(link, mode, cfg, cancel_rx, trace_tx, status_tx));

        (
            Self {
                handle,
                cancel_tx,
                mode,
            },
            trace_rx,
            status_rx,
        )
    }

    pub fn mode(&self) -> SweepMode {
        self.mode
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the session: for continuous sweeps, turn continuous mode off
    /// on the instrument, then signal the task and join it with a bounded
    /// wait. The link itself stays open — its lifetime is independent of
    /// any one session.
    pub async fn stop(self, link: &SharedLink) {
        if self.mode == SweepMode::Continuous {
            let mut link = link.lock().await;
            if let Err(err) = link.write("INIT:CONT OFF").await {
                warn!("could not leave continuous mode: {err}");
            }
        }
        let _ = self.cancel_tx.send(true);
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, self.handle)
            .await
            .is_err()
        {
            warn!("acquisition task did not stop within {STOP_JOIN_TIMEOUT:?}");
        }
    }
}

async fn run_loop(
    link: SharedLink,
    mode: SweepMode,
    cfg: AcquisitionSettings,
    mut cancel_rx: watch::Receiver<bool>,
    trace_tx: watch::Sender<Option<TraceUpdate>>,
    status_tx: mpsc::UnboundedSender<SweepStatus>,
) {
    {
        let mut link = link.lock().await;
        link.set_timeout(Duration::from_millis(cfg.read_timeout_ms));
    }

    let check_completion = mode == SweepMode::Single;
    let mut consecutive_failures: u32 = 0;
    let mut warned = false;
    let mut last_points: Option<usize> = None;
    let mut stable_polls: u32 = 0;
    let mut interval = Duration::from_millis(cfg.fast_poll_ms);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel_rx.changed() => {}
        }
        if *cancel_rx.borrow() {
            let _ = status_tx.send(SweepStatus::Stopped);
            break;
        }

        let outcome = {
            let mut link = link.lock().await;
            poll_once(&mut **link, check_completion).await
        };

        match outcome {
            Err(err) => {
                consecutive_failures += 1;
                debug!("trace poll failed ({consecutive_failures} in a row): {err}");
                if consecutive_failures >= cfg.failure_warn_threshold && !warned {
                    warned = true;
                    let _ = status_tx.send(SweepStatus::Warning(format!(
                        "instrument not answering trace reads ({consecutive_failures} consecutive failures), still retrying"
                    )));
                }
                interval = Duration::from_millis(cfg.failure_backoff_ms);
            }
            Ok(poll) => {
                consecutive_failures = 0;
                let points = poll.update.sample.len();
                if last_points == Some(points) {
                    stable_polls += 1;
                } else {
                    stable_polls = 0;
                    last_points = Some(points);
                }
                interval = next_interval(stable_polls, &cfg);

                // Freshest wins: an unread previous sample is overwritten.
                // A send error means every consumer is gone; without a
                // display attached there is nothing left to poll for.
                if trace_tx.send(Some(poll.update)).is_err() {
                    debug!("no trace consumers left, acquisition task exiting");
                    break;
                }

                if check_completion {
                    if poll.operation_complete {
                        let _ = status_tx.send(SweepStatus::Completed);
                        break;
                    }
                    if stable_polls >= cfg.idle_poll_limit {
                        let _ = status_tx.send(SweepStatus::Ended);
                        break;
                    }
                }
            }
        }
    }
}
