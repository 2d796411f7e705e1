//! CLI entry point for sweepbench.
//!
//! Provides the panel window plus headless operations for scripted use:
//!
//! ```bash
//! sweepbench gui
//! sweepbench --address 192.168.1.100 apply --preset presets/mic.json
//! sweepbench --address 192.168.1.100 sweep --export run1.hxml --preset presets/mic.json
//! sweepbench snapshot --output snapshot.json
//! sweepbench view run1.hxml
//! ```
//!
//! Without `--address`, connection goes through the cached address from
//! the last successful session.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use sweepbench::acquisition::{arm_single_sweep, SweepMonitor, SweepStatus};
use sweepbench::axis::resolve_y_unit;
use sweepbench::config::{default_cache_path, AddressCache, Settings};
use sweepbench::dispatcher::apply_settings;
use sweepbench::export::{export_trace, read_trace};
use sweepbench::link::{connect, connect_cached, SharedLink};
use sweepbench::readback::save_snapshot;
use sweepbench::settings::{SettingsDocument, SweepMode};

#[derive(Parser)]
#[command(name = "sweepbench")]
#[command(about = "Control panel and sweep acquisition for SCPI audio analyzers", long_about = None)]
struct Cli {
    /// Instrument address (host or host:port); overrides the cached one.
    #[arg(long, global = true)]
    address: Option<String>,

    /// Name of an alternative config file under config/.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the panel window (default).
    Gui {
        /// Settings preset to load at startup.
        #[arg(long, default_value = "settings.json")]
        preset: PathBuf,
    },

    /// Apply a settings preset to the instrument and exit.
    Apply {
        #[arg(long)]
        preset: PathBuf,
    },

    /// Run a single sweep headless and export the trace.
    Sweep {
        /// Destination .hxml file.
        #[arg(long)]
        export: PathBuf,

        /// Optional preset to apply before sweeping.
        #[arg(long)]
        preset: Option<PathBuf>,

        /// Dataset working title; defaults to the preset file stem.
        #[arg(long)]
        title: Option<String>,
    },

    /// Read the instrument's current settings into a JSON snapshot.
    Snapshot {
        #[arg(long, default_value = "snapshot.json")]
        output: PathBuf,
    },

    /// Print a summary of an exported trace file.
    View { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_deref())?;

    let default_level = settings.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;

    match cli.command.unwrap_or(Commands::Gui {
        preset: PathBuf::from("settings.json"),
    }) {
        Commands::Gui { preset } => {
            let handle = rt.handle().clone();
            sweepbench::gui::run(handle, settings, cli.address, preset)
                .map_err(|e| anyhow::anyhow!("panel window failed: {e}"))
        }
        Commands::Apply { preset } => rt.block_on(run_apply(cli.address, preset)),
        Commands::Sweep {
            export,
            preset,
            title,
        } => rt.block_on(run_sweep(cli.address, export, preset, title, settings)),
        Commands::Snapshot { output } => rt.block_on(run_snapshot(cli.address, output)),
        Commands::View { file } => run_view(file),
    }
}

/// Connect using the explicit address or the cache.
async fn establish_link(address: Option<String>) -> Result<SharedLink> {
    let cache_path = default_cache_path();
    let (link, idn) = match address {
        Some(addr) => {
            let pair = connect(&addr).await?;
            let cache = AddressCache { address: addr };
            if let Err(err) = cache.save(&cache_path) {
                warn!("could not persist address cache: {err}");
            }
            pair
        }
        None => connect_cached(&cache_path, &[])
            .await
            .context("no cached instrument address; pass --address")?,
    };
    info!("instrument: {idn}");
    Ok(link)
}

fn load_preset(path: &std::path::Path) -> Result<SettingsDocument> {
    let mut doc =
        SettingsDocument::load(path).with_context(|| format!("loading {}", path.display()))?;
    doc.ensure_defaults();
    doc.normalize();
    Ok(doc)
}

async fn run_apply(address: Option<String>, preset: PathBuf) -> Result<()> {
    let doc = load_preset(&preset)?;
    let link = establish_link(address).await?;
    let report = apply_settings(&doc, &link).await;
    println!("{}", report.summary());
    if report.failed() > 0 {
        bail!("{} field(s) failed to apply", report.failed());
    }
    Ok(())
}

async fn run_sweep(
    address: Option<String>,
    export: PathBuf,
    preset: Option<PathBuf>,
    title: Option<String>,
    settings: Settings,
) -> Result<()> {
    let doc = preset.as_ref().map(|p| load_preset(p)).transpose()?;
    let link = establish_link(address).await?;

    if let Some(doc) = &doc {
        let report = apply_settings(doc, &link).await;
        info!("preset applied: {}", report.summary());
    }

    arm_single_sweep(&link).await?;
    info!("single sweep started");

    let (monitor, trace_rx, mut status_rx) =
        SweepMonitor::start(link.clone(), SweepMode::Single, settings.acquisition.clone());

    let outcome = loop {
        match status_rx.recv().await {
            Some(SweepStatus::Warning(msg)) => warn!("{msg}"),
            Some(terminal) => break terminal,
            None => bail!("acquisition task ended without a status"),
        }
    };
    drop(monitor);

    match &outcome {
        SweepStatus::Completed => info!("sweep completed"),
        SweepStatus::Ended => warn!("sweep ended without a completion signal; exporting anyway"),
        SweepStatus::Stopped => bail!("sweep stopped before completion"),
        SweepStatus::Warning(_) => unreachable!("warnings are not terminal"),
    }

    let update = trace_rx
        .borrow()
        .clone()
        .context("no trace data was received")?;
    let y_unit = doc
        .as_ref()
        .map(resolve_y_unit)
        .unwrap_or_else(|| "dBV".to_string());
    let working_title = title.or_else(|| {
        preset
            .as_ref()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
    });

    export_trace(
        &update.sample.frequency,
        &update.sample.magnitude,
        &export,
        working_title.as_deref(),
        &y_unit,
    )?;
    println!(
        "exported {} points to {}",
        update.sample.len(),
        export.display()
    );
    Ok(())
}

async fn run_snapshot(address: Option<String>, output: PathBuf) -> Result<()> {
    let link = establish_link(address).await?;
    save_snapshot(&link, &output).await?;
    println!("snapshot written to {}", output.display());
    Ok(())
}

fn run_view(file: PathBuf) -> Result<()> {
    let trace = read_trace(&file)?;
    println!("WorkingTitle:  {}", trace.working_title);
    println!("CurveDataName: {}", trace.curve_data_name);
    println!("Points:        {}", trace.frequency.len());
    if let (Some(first), Some(last)) = (trace.frequency.first(), trace.frequency.last()) {
        println!("Frequency:     {first} .. {last} Hz");
    }
    let min = trace.magnitude.iter().copied().fold(f64::INFINITY, f64::min);
    let max = trace
        .magnitude
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    println!("Magnitude:     {min} .. {max} {}", trace.y_unit);
    Ok(())
}
