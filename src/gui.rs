//! The eframe/egui implementation of the control panel.
//!
//! The GUI owns no instrument state of its own: it holds the settings
//! document, a shared link handle, and (while a sweep runs) the receive
//! ends of the acquisition channels. All instrument I/O is spawned onto
//! the tokio runtime and results come back through an event channel, so
//! the update loop never blocks on the wire. The plot applies the
//! axis-limit policy from [`crate::axis`] on every repaint.

use crate::acquisition::{
    arm_single_sweep, start_continuous, SweepMonitor, SweepStatus, TraceSample, TraceUpdate,
};
use crate::axis::{resolve_y_unit, YAxisPolicy};
use crate::config::{default_cache_path, Settings};
use crate::dispatcher::apply_settings;
use crate::export::export_trace;
use crate::link::{connect, connect_cached, SharedLink};
use crate::protocol::{display_label, family_for, SECTIONS};
use crate::settings::{SettingsDocument, SweepMode};
use crate::visibility::is_visible;
use eframe::egui;
use egui_plot::{Line, Plot, PlotBounds, PlotPoints};
use log::{error, warn};
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};

/// Results of spawned instrument operations, marshalled back to the UI.
enum UiEvent {
    Connected { link: SharedLink, idn: String },
    ConnectFailed(String),
    Applied(String),
    Info(String),
    Failed(String),
}

pub struct PanelGui {
    rt: tokio::runtime::Handle,
    cfg: Settings,
    address_override: Option<String>,

    preset_path: PathBuf,
    doc: Option<SettingsDocument>,

    link: Option<SharedLink>,
    idn: Option<String>,

    monitor: Option<SweepMonitor>,
    trace_rx: Option<watch::Receiver<Option<TraceUpdate>>>,
    status_rx: Option<mpsc::UnboundedReceiver<SweepStatus>>,

    events_tx: mpsc::UnboundedSender<UiEvent>,
    events_rx: mpsc::UnboundedReceiver<UiEvent>,

    y_policy: YAxisPolicy,
    last_sample: Option<TraceSample>,
    y_unit: String,
    status_line: String,
    export_path: String,
}

impl PanelGui {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        rt: tokio::runtime::Handle,
        cfg: Settings,
        address_override: Option<String>,
        preset_path: PathBuf,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let doc = match SettingsDocument::load(&preset_path) {
            Ok(mut doc) => {
                doc.ensure_defaults();
                doc.normalize();
                Some(doc)
            }
            Err(err) => {
                warn!("could not load {}: {err}", preset_path.display());
                None
            }
        };
        let y_unit = doc.as_ref().map(resolve_y_unit).unwrap_or_else(|| "dBV".to_string());

        Self {
            rt,
            cfg,
            address_override,
            preset_path,
            doc,
            link: None,
            idn: None,
            monitor: None,
            trace_rx: None,
            status_rx: None,
            events_tx,
            events_rx,
            y_policy: YAxisPolicy::new(),
            last_sample: None,
            y_unit,
            status_line: "Not connected".to_string(),
            export_path: "sweep_trace.hxml".to_string(),
        }
    }

    fn sweep_running(&self) -> bool {
        self.monitor.as_ref().is_some_and(|m| !m.is_finished())
    }

    fn connect_clicked(&mut self) {
        let tx = self.events_tx.clone();
        let address = self.address_override.clone();
        self.status_line = "Connecting...".to_string();
        self.rt.spawn(async move {
            let result = match address {
                Some(addr) => connect(&addr).await,
                None => connect_cached(&default_cache_path(), &[]).await,
            };
            let event = match result {
                Ok((link, idn)) => UiEvent::Connected { link, idn },
                Err(err) => UiEvent::ConnectFailed(err.to_string()),
            };
            let _ = tx.send(event);
        });
    }

    fn apply_clicked(&mut self) {
        let (Some(link), Some(doc)) = (self.link.clone(), self.doc.clone()) else {
            self.status_line = "Connect and load a preset first".to_string();
            return;
        };
        let tx = self.events_tx.clone();
        if let Err(err) = doc.save(&self.preset_path) {
            self.status_line = format!("Could not save settings: {err}");
            return;
        }
        self.rt.spawn(async move {
            let report = apply_settings(&doc, &link).await;
            let _ = tx.send(UiEvent::Applied(report.summary()));
        });
    }

    fn load_preset_clicked(&mut self) {
        match SettingsDocument::load(&self.preset_path) {
            Ok(mut doc) => {
                doc.ensure_defaults();
                doc.normalize();
                self.y_unit = resolve_y_unit(&doc);
                self.doc = Some(doc);
                self.status_line = format!("Loaded {}", self.preset_path.display());
            }
            Err(err) => {
                // Keep the previous document; a bad file on disk must not
                // clobber a good in-memory state.
                self.status_line = format!("Load failed: {err}");
            }
        }
    }

    fn start_sweep_clicked(&mut self) {
        let Some(link) = self.link.clone() else {
            self.status_line = "Not connected".to_string();
            return;
        };
        if self.sweep_running() {
            return;
        }
        let mode = self
            .doc
            .as_ref()
            .map(|d| d.sweep_mode())
            .unwrap_or(SweepMode::Single);

        let tx = self.events_tx.clone();
        let arm_link = link.clone();
        self.rt.spawn(async move {
            let armed = match mode {
                SweepMode::Single => arm_single_sweep(&arm_link).await,
                SweepMode::Continuous => start_continuous(&arm_link).await,
            };
            let event = match armed {
                Ok(()) => UiEvent::Info("Sweep started".to_string()),
                Err(err) => UiEvent::Failed(format!("Could not start sweep: {err}")),
            };
            let _ = tx.send(event);
        });

        // Fresh session: Y-axis lock state belongs to the session, not
        // the application.
        self.y_policy = YAxisPolicy::new();
        let _guard = self.rt.enter();
        let (monitor, trace_rx, status_rx) =
            SweepMonitor::start(link, mode, self.cfg.acquisition.clone());
        self.monitor = Some(monitor);
        self.trace_rx = Some(trace_rx);
        self.status_rx = Some(status_rx);
        self.status_line = "Sweep running".to_string();
    }

    fn stop_sweep_clicked(&mut self) {
        let (Some(monitor), Some(link)) = (self.monitor.take(), self.link.clone()) else {
            return;
        };
        self.rt.spawn(async move {
            monitor.stop(&link).await;
        });
    }

    fn export_clicked(&mut self) {
        let Some(sample) = &self.last_sample else {
            self.status_line = "No trace to export".to_string();
            return;
        };
        let dest = PathBuf::from(self.export_path.trim());
        let title = self
            .preset_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string());
        match export_trace(
            &sample.frequency,
            &sample.magnitude,
            &dest,
            title.as_deref(),
            &self.y_unit,
        ) {
            Ok(()) => self.status_line = format!("Exported {}", dest.display()),
            Err(err) => self.status_line = format!("Export failed: {err}"),
        }
    }

    /// Drain all pending cross-thread traffic without blocking.
    fn pump_channels(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                UiEvent::Connected { link, idn } => {
                    self.status_line = format!("Connected: {idn}");
                    self.idn = Some(idn);
                    self.link = Some(link);
                }
                UiEvent::ConnectFailed(msg) => {
                    self.status_line = format!("Connect failed: {msg}");
                    error!("{}", self.status_line);
                }
                UiEvent::Applied(summary) => {
                    self.status_line = format!("Settings applied: {summary}");
                }
                UiEvent::Info(msg) => self.status_line = msg,
                UiEvent::Failed(msg) => {
                    self.status_line = msg;
                    error!("{}", self.status_line);
                }
            }
        }

        if let Some(status_rx) = &mut self.status_rx {
            while let Ok(status) = status_rx.try_recv() {
                match status {
                    SweepStatus::Warning(msg) => self.status_line = msg,
                    SweepStatus::Completed => {
                        self.status_line = "Sweep completed".to_string();
                        self.monitor = None;
                    }
                    SweepStatus::Ended => {
                        self.status_line =
                            "Sweep ended (no completion signal from instrument)".to_string();
                        self.monitor = None;
                    }
                    SweepStatus::Stopped => {
                        self.status_line = "Sweep stopped".to_string();
                    }
                }
            }
        }

        // Freshest-wins drain: only the latest update matters.
        if let Some(trace_rx) = &mut self.trace_rx {
            if trace_rx.has_changed().unwrap_or(false) {
                let update: Option<TraceUpdate> = trace_rx.borrow_and_update().clone();
                if let Some(update) = update {
                    self.y_policy.offer_span(update.display_span, &self.cfg.display);
                    self.last_sample = Some(update.sample);
                }
            }
        }
    }
}

impl eframe::App for PanelGui {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_channels();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Sweepbench");
                ui.separator();
                if ui.button("Connect").clicked() {
                    self.connect_clicked();
                }
                if ui.button("Load Preset").clicked() {
                    self.load_preset_clicked();
                }
                if ui
                    .add_enabled(
                        self.link.is_some() && self.doc.is_some(),
                        egui::Button::new("Apply Settings"),
                    )
                    .clicked()
                {
                    self.apply_clicked();
                }
                if ui
                    .add_enabled(
                        self.link.is_some() && !self.sweep_running(),
                        egui::Button::new("Start Sweep"),
                    )
                    .clicked()
                {
                    self.start_sweep_clicked();
                }
                if ui
                    .add_enabled(self.sweep_running(), egui::Button::new("Stop"))
                    .clicked()
                {
                    self.stop_sweep_clicked();
                }
            });
            ui.horizontal(|ui| {
                ui.label("Export to:");
                ui.text_edit_singleline(&mut self.export_path);
                if ui
                    .add_enabled(self.last_sample.is_some(), egui::Button::new("Export"))
                    .clicked()
                {
                    self.export_clicked();
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_line);
                if let Some(idn) = &self.idn {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.weak(idn);
                    });
                }
            });
        });

        egui::SidePanel::left("settings_panel")
            .default_width(340.0)
            .show(ctx, |ui| match &self.doc {
                Some(doc) => {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        for section in SECTIONS {
                            ui.heading(section);
                            for (label, value) in doc.fields(section) {
                                if !is_visible(doc, section, &label) {
                                    continue;
                                }
                                let shown = family_for(section, &label)
                                    .map(|family| family.display_or_raw(&value).to_string())
                                    .unwrap_or_else(|| value.clone());
                                ui.horizontal(|ui| {
                                    ui.label(display_label(&label));
                                    ui.monospace(shown);
                                });
                            }
                            ui.separator();
                        }
                    });
                }
                None => {
                    ui.label("No settings document loaded");
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let display = &self.cfg.display;
            let (y_min, y_max) = match &self.last_sample {
                Some(sample) => self.y_policy.bounds(sample, display),
                None => (0.0, 1.0),
            };
            let points: PlotPoints = self
                .last_sample
                .as_ref()
                .map(|sample| {
                    sample
                        .frequency
                        .iter()
                        .zip(&sample.magnitude)
                        .map(|(x, y)| [*x, *y])
                        .collect()
                })
                .unwrap_or_else(|| PlotPoints::new(Vec::new()));

            Plot::new("sweep_plot")
                .x_axis_label("Frequency (Hz)")
                .y_axis_label(format!("Level ({})", self.y_unit))
                .allow_drag(false)
                .allow_zoom(false)
                .allow_scroll(false)
                .show(ui, |plot_ui| {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        [display.x_min_hz, y_min],
                        [display.x_max_hz, y_max],
                    ));
                    plot_ui.line(Line::new(points));
                });
        });

        // Keep polling the channels while a sweep is live.
        if self.sweep_running() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

/// Launch the panel window. Blocks until the window closes.
pub fn run(
    rt: tokio::runtime::Handle,
    cfg: Settings,
    address_override: Option<String>,
    preset_path: PathBuf,
) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 720.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Sweepbench",
        options,
        Box::new(move |cc| {
            Ok(Box::new(PanelGui::new(
                cc,
                rt,
                cfg,
                address_override,
                preset_path,
            )))
        }),
    )
}
