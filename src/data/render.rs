//! Render-ready reduction of the buffers for one viewport.
//!
//! The consumer asks for a [`RenderSnapshot`] on its own schedule; nothing in
//! here touches a live buffer, everything works on [`BufferSnapshot`] copies.

use crate::config::IngestConfig;
use crate::data::buffer::{BufferSnapshot, SeriesSnapshot};
use crate::data::resample::{downsample_xy, y_limits};
use crate::data::sample::{Channel, Quantity};

/// Visible x range in source-relative seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x0: f64,
    pub x1: f64,
}

impl Viewport {
    /// The last `window` seconds up to `latest`, never starting before 0.
    pub fn rolling(latest: f64, window: f64) -> Self {
        let x1 = latest.max(0.0);
        Self {
            x0: (x1 - window).max(0.0),
            x1,
        }
    }

    /// Everything from 0 to `latest`, at least one second wide.
    pub fn full(latest: f64) -> Self {
        Self {
            x0: 0.0,
            x1: latest.max(1.0),
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        (self.x0..=self.x1).contains(&x)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }
}

/// One drawable line.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesView {
    pub name: String,
    /// `#RRGGBB`, `None` for the primary trace.
    pub color: Option<String>,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl SeriesView {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Points in the `[x, y]` form plotting backends take.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.xs.iter().zip(&self.ys).map(|(&x, &y)| [x, y]).collect()
    }
}

/// One of the four plot panels.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub quantity: Quantity,
    pub channel: Channel,
    pub primary: SeriesView,
    pub overlays: Vec<SeriesView>,
    /// Padded y range, `None` when nothing is visible.
    pub y_limits: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub viewport: Viewport,
    pub panels: [PanelView; 4],
}

/// Panel order: row-major 2×2 grid with temperature on top.
pub const PANEL_LAYOUT: [(Quantity, Channel); 4] = [
    (Quantity::Temperature, Channel::Inlet),
    (Quantity::Temperature, Channel::Outlet),
    (Quantity::Humidity, Channel::Inlet),
    (Quantity::Humidity, Channel::Outlet),
];

/// An overlay's data as seen by the renderer.
#[derive(Debug, Clone, Copy)]
pub struct OverlaySeries<'a> {
    pub name: &'a str,
    pub color: &'a str,
    pub snapshot: &'a BufferSnapshot,
}

fn visible(series: &SeriesSnapshot, q: Quantity, viewport: &Viewport) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (&t, &v) in series.t.iter().zip(series.quantity(q)) {
        if viewport.contains(t) {
            xs.push(t);
            ys.push(v);
        }
    }
    (xs, ys)
}

fn series_view(
    name: &str,
    color: Option<&str>,
    series: &SeriesSnapshot,
    q: Quantity,
    viewport: &Viewport,
    budget: usize,
) -> SeriesView {
    let (xs, ys) = visible(series, q, viewport);
    let (xs, ys) = downsample_xy(&xs, &ys, budget);
    SeriesView {
        name: name.to_string(),
        color: color.map(str::to_string),
        xs,
        ys,
    }
}

fn panel_limits(
    primary: &SeriesSnapshot,
    overlays: &[OverlaySeries<'_>],
    channel: Channel,
    q: Quantity,
    viewport: &Viewport,
    cfg: &IngestConfig,
) -> Option<(f64, f64)> {
    let from_primary = y_limits(
        &primary.t,
        primary.quantity(q),
        viewport.x0,
        viewport.x1,
        cfg.y_pad_frac,
        cfg.min_y_span,
    );
    if from_primary.is_some() {
        return from_primary;
    }
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for ov in overlays {
        let s = ov.snapshot.channel(channel);
        xs.extend_from_slice(&s.t);
        ys.extend_from_slice(s.quantity(q));
    }
    y_limits(&xs, &ys, viewport.x0, viewport.x1, cfg.y_pad_frac, cfg.min_y_span)
}

/// Reduce the primary and overlay snapshots to what fits in `viewport`.
///
/// Every series is cut to the viewport and downsampled to the draw budget.
/// Y-limits follow the primary series; panels where the primary has nothing
/// visible fall back to the overlays.
pub fn build_render_snapshot(
    primary: &BufferSnapshot,
    overlays: &[OverlaySeries<'_>],
    viewport: Viewport,
    cfg: &IngestConfig,
) -> RenderSnapshot {
    let panels = PANEL_LAYOUT.map(|(quantity, channel)| {
        let label = match channel {
            Channel::Inlet => cfg.inlet_label.as_str(),
            Channel::Outlet => cfg.outlet_label.as_str(),
        };
        let primary_series = primary.channel(channel);
        PanelView {
            quantity,
            channel,
            primary: series_view(
                label,
                None,
                primary_series,
                quantity,
                &viewport,
                cfg.draw_budget,
            ),
            overlays: overlays
                .iter()
                .map(|ov| {
                    series_view(
                        ov.name,
                        Some(ov.color),
                        ov.snapshot.channel(channel),
                        quantity,
                        &viewport,
                        cfg.draw_budget,
                    )
                })
                .collect(),
            y_limits: panel_limits(primary_series, overlays, channel, quantity, &viewport, cfg),
        }
    });
    RenderSnapshot { viewport, panels }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::SeriesPoint;

    fn snapshot(n: usize, temp: f64) -> BufferSnapshot {
        let mut snap = BufferSnapshot::default();
        for i in 0..n {
            let p = SeriesPoint {
                t: i as f64,
                temperature: temp + (i % 3) as f64,
                humidity: 40.0,
            };
            snap.inlet.push(p);
            snap.outlet.push(p);
        }
        snap
    }

    #[test]
    fn rolling_window_clamps_at_zero() {
        assert_eq!(Viewport::rolling(50.0, 180.0), Viewport { x0: 0.0, x1: 50.0 });
        assert_eq!(
            Viewport::rolling(300.0, 180.0),
            Viewport {
                x0: 120.0,
                x1: 300.0
            }
        );
        assert_eq!(Viewport::full(0.2), Viewport { x0: 0.0, x1: 1.0 });
    }

    #[test]
    fn series_are_cut_to_viewport_and_budget() {
        let cfg = IngestConfig {
            draw_budget: 10,
            ..IngestConfig::default()
        };
        let primary = snapshot(1000, 20.0);
        let snap = build_render_snapshot(&primary, &[], Viewport { x0: 100.0, x1: 199.0 }, &cfg);
        for panel in &snap.panels {
            assert_eq!(panel.primary.len(), 10);
            assert_eq!(panel.primary.xs[0], 100.0);
            assert!(panel.primary.xs.iter().all(|&x| (100.0..=199.0).contains(&x)));
        }
        assert_eq!(snap.panels[0].quantity, Quantity::Temperature);
        assert_eq!(snap.panels[3].channel, Channel::Outlet);
    }

    #[test]
    fn y_limits_fall_back_to_overlays() {
        let cfg = IngestConfig::default();
        let primary = BufferSnapshot::default();
        let ov = snapshot(10, 30.0);
        let overlays = [OverlaySeries {
            name: "run 1",
            color: "#DC2626",
            snapshot: &ov,
        }];
        let snap = build_render_snapshot(&primary, &overlays, Viewport::full(9.0), &cfg);
        let panel = &snap.panels[0];
        assert!(panel.primary.is_empty());
        assert_eq!(panel.overlays.len(), 1);
        assert_eq!(panel.overlays[0].color.as_deref(), Some("#DC2626"));
        let (lo, hi) = panel.y_limits.unwrap();
        assert!(lo < 30.0 && hi > 32.0);
    }

    #[test]
    fn primary_drives_limits_when_present() {
        let cfg = IngestConfig::default();
        let primary = snapshot(10, 20.0);
        let ov = snapshot(10, 80.0);
        let overlays = [OverlaySeries {
            name: "hot",
            color: "#DC2626",
            snapshot: &ov,
        }];
        let snap = build_render_snapshot(&primary, &overlays, Viewport::full(9.0), &cfg);
        let (_, hi) = snap.panels[0].y_limits.unwrap();
        assert!(hi < 30.0);
    }

    #[test]
    fn nothing_visible_means_no_limits() {
        let cfg = IngestConfig::default();
        let snap = build_render_snapshot(
            &BufferSnapshot::default(),
            &[],
            Viewport::full(0.0),
            &cfg,
        );
        assert!(snap.panels.iter().all(|p| p.y_limits.is_none()));
    }
}
