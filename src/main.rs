//! Native viewer: tails a logger file and plots inlet/outlet temperature and
//! humidity in a 2×2 grid, with optional overlays.
//!
//! Usage:
//!   sensor-liveplot [main.log] [--overlay live.log]... [--static run.csv]...
//!                   [--export out.csv] [--config cfg.yaml]
//!
//! Logging goes through `tracing`; set `RUST_LOG` to change the filter.

use std::path::{Path, PathBuf};

use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sensor_liveplot::data::render::PANEL_LAYOUT;
use sensor_liveplot::data::time_format::format_mmss;
use sensor_liveplot::{
    Channel, EventKind, IngestConfig, IngestionManager, PanelView, Quantity, Viewport,
};

/// Primary trace colors in panel order.
const PRIMARY_COLORS: [Color32; 4] = [
    Color32::from_rgb(0x25, 0x63, 0xEB),
    Color32::from_rgb(0x7C, 0x3A, 0xED),
    Color32::from_rgb(0x10, 0xB9, 0x81),
    Color32::from_rgb(0xF5, 0x9E, 0x0B),
];

#[derive(Debug, Default)]
struct Args {
    main_log: Option<PathBuf>,
    live_overlays: Vec<PathBuf>,
    static_overlays: Vec<PathBuf>,
    export: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--overlay" => args.live_overlays.extend(it.next().map(PathBuf::from)),
            "--static" => args.static_overlays.extend(it.next().map(PathBuf::from)),
            "--export" => args.export = it.next().map(PathBuf::from),
            "--config" => args.config = it.next().map(PathBuf::from),
            _ if args.main_log.is_none() => args.main_log = Some(PathBuf::from(arg)),
            _ => warn!(%arg, "ignoring extra argument"),
        }
    }
    args
}

fn parse_hex_color(hex: &str) -> Option<Color32> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let v = u32::from_str_radix(hex, 16).ok()?;
    Some(Color32::from_rgb((v >> 16) as u8, (v >> 8) as u8, v as u8))
}

fn overlay_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

struct ViewerApp {
    manager: IngestionManager,
    full_view: bool,
    export_path: PathBuf,
    status: String,
    samples_since_rescale: usize,
    force_rescale: bool,
    y_limits: [Option<(f64, f64)>; 4],
}

impl ViewerApp {
    fn new(manager: IngestionManager, export_path: PathBuf) -> Self {
        let status = match manager.primary_path() {
            Some(p) => format!("running: {}", p.display()),
            None => "no main log selected".to_string(),
        };
        Self {
            manager,
            full_view: false,
            export_path,
            status,
            samples_since_rescale: 0,
            force_rescale: true,
            y_limits: [None; 4],
        }
    }

    fn pump(&mut self) {
        let report = self.manager.drain();
        self.samples_since_rescale += report.samples;
        for ev in &report.events {
            if ev.is(EventKind::RESET | EventKind::DATA_CLEARED | EventKind::OVERLAY_LOADED) {
                self.force_rescale = true;
            }
            if ev.is(EventKind::READ_ERROR | EventKind::OVERLAY_LOAD_FAILED) {
                self.status = format!(
                    "error ({}): {}",
                    ev.source.map(|s| s.to_string()).unwrap_or_default(),
                    ev.message.as_deref().unwrap_or("")
                );
            } else if ev.is(EventKind::RESET) && ev.message.is_some() {
                self.status = "file truncated, restarted".to_string();
            } else if ev.is(EventKind::OVERLAY_LOADED) {
                if let Some(meta) = &ev.overlay_load {
                    self.status = format!(
                        "overlay {} loaded ({} / {} points)",
                        meta.overlay, meta.points.0, meta.points.1
                    );
                }
            }
        }
    }

    fn latest_text(&self) -> String {
        let part = |ch: Channel| match self.manager.latest_reading(ch) {
            Some(r) => format!("{:.2} °C / {:.2} %", r.temperature, r.humidity),
            None => "–".to_string(),
        };
        format!(
            "Latest: inlet {}   outlet {}",
            part(Channel::Inlet),
            part(Channel::Outlet)
        )
    }

    fn top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Start").clicked() {
                let path = self.manager.primary_path().map(Path::to_path_buf).unwrap_or_default();
                match self.manager.start_primary(&path) {
                    Ok(()) => self.status = format!("running: {}", path.display()),
                    Err(e) => self.status = e.to_string(),
                }
            }
            if ui.button("Stop").clicked() {
                self.manager.stop_primary();
                self.status = "stopped".to_string();
            }
            if ui.button("Reset").clicked() {
                self.manager.reset_primary();
                self.status = "reset".to_string();
            }
            let view_label = if self.full_view { "Rolling view" } else { "Full view" };
            if ui.button(view_label).clicked() {
                self.full_view = !self.full_view;
                self.force_rescale = true;
            }
            if ui.button("Clear overlays").clicked() {
                self.manager.clear_overlays();
                self.force_rescale = true;
            }
            if ui.button("Export CSV").clicked() {
                let path = self.export_path.clone();
                match self.manager.export_csv(&path) {
                    Ok(rows) => self.status = format!("exported {rows} rows to {}", path.display()),
                    Err(e) => {
                        error!(error = %e, "export failed");
                        self.status = e.to_string();
                    }
                }
            }
            ui.separator();
            ui.label(&self.status);
        });
        ui.label(self.latest_text());
    }

    fn draw_panel(&self, ui: &mut egui::Ui, idx: usize, panel: &PanelView, viewport: Viewport, height: f32) {
        let unit = match panel.quantity {
            Quantity::Temperature => "Temperature (°C)",
            Quantity::Humidity => "Humidity (%)",
        };
        let label = match panel.channel {
            Channel::Inlet => &self.manager.config().inlet_label,
            Channel::Outlet => &self.manager.config().outlet_label,
        };
        ui.label(format!("{label}: {unit}"));

        let y_limits = self.y_limits[idx];
        Plot::new(format!("panel_{idx}"))
            .height(height)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .legend(Legend::default())
            .x_axis_formatter(|mark, _range| format_mmss(mark.value))
            .show(ui, |plot_ui| {
                plot_ui.set_plot_bounds_x(viewport.x0..=viewport.x1);
                if let Some((lo, hi)) = y_limits {
                    plot_ui.set_plot_bounds_y(lo..=hi);
                }
                for ov in &panel.overlays {
                    let color = ov
                        .color
                        .as_deref()
                        .and_then(parse_hex_color)
                        .unwrap_or(Color32::GRAY);
                    plot_ui.line(Line::new(ov.name.clone(), ov.points()).color(color).width(1.2));
                }
                plot_ui.line(
                    Line::new(panel.primary.name.clone(), panel.primary.points())
                        .color(PRIMARY_COLORS[idx])
                        .width(2.0),
                );
            });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump();

        let viewport = if self.full_view {
            self.manager.full_viewport()
        } else {
            self.manager.rolling_viewport()
        };
        let snapshot = self.manager.render_snapshot(viewport);
        if self.force_rescale || self.samples_since_rescale >= self.manager.config().rescale_every_n {
            for (slot, panel) in self.y_limits.iter_mut().zip(&snapshot.panels) {
                if panel.y_limits.is_some() || self.force_rescale {
                    *slot = panel.y_limits;
                }
            }
            self.samples_since_rescale = 0;
            self.force_rescale = false;
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.top_bar(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            let height = (ui.available_height() / 2.0 - 40.0).max(80.0);
            for row in 0..2 {
                ui.columns(2, |cols| {
                    for (col, ui) in cols.iter_mut().enumerate() {
                        let idx = row * 2 + col;
                        debug_assert_eq!(
                            (snapshot.panels[idx].quantity, snapshot.panels[idx].channel),
                            PANEL_LAYOUT[idx]
                        );
                        self.draw_panel(ui, idx, &snapshot.panels[idx], snapshot.viewport, height);
                    }
                });
            }
        });

        ctx.request_repaint_after(self.manager.config().consumer_tick());
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sensor_liveplot=info")),
        )
        .init();

    let args = parse_args();
    let cfg = match &args.config {
        Some(path) => IngestConfig::load_or_default(path).unwrap_or_else(|e| {
            error!(error = %e, "failed to load configuration, using defaults");
            IngestConfig::default()
        }),
        None => IngestConfig::default(),
    };

    let mut manager = IngestionManager::new(cfg);
    if let Some(path) = &args.main_log {
        if let Err(e) = manager.start_primary(path) {
            error!(error = %e, "cannot start main log");
        }
    }
    for path in &args.live_overlays {
        let started = manager
            .add_overlay(overlay_name(path), None)
            .and_then(|id| manager.start_live_overlay(id, path));
        if let Err(e) = started {
            warn!(path = %path.display(), error = %e, "live overlay not started");
        }
    }
    for path in &args.static_overlays {
        let loaded = manager
            .add_overlay(overlay_name(path), None)
            .and_then(|id| manager.load_static_overlay(id, path));
        if let Err(e) = loaded {
            warn!(path = %path.display(), error = %e, "static overlay not loaded");
        }
    }

    let export_path = args.export.unwrap_or_else(|| PathBuf::from("export.csv"));
    info!(export = %export_path.display(), "viewer starting");
    let app = ViewerApp::new(manager, export_path);

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = egui::ViewportBuilder::default().with_inner_size([1400.0, 900.0]);
    eframe::run_native(
        "Sensor Live Plot",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
