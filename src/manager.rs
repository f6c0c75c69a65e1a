//! Ingestion manager: one primary source plus a bounded set of overlays.
//!
//! The manager is the single consumer of the hand-off channel. Tailers and
//! static imports run on their own threads and only ever send
//! [`IngestMessage`]s; [`IngestionManager::drain`] applies them to the
//! buffers. Call it on a periodic tick (see
//! [`IngestConfig::consumer_tick`]).
//!
//! Every (re)start of a source hands out a fresh [`SourceKey`] generation.
//! Messages tagged with an older generation belong to a worker that was
//! stopped, reset or removed and are dropped on drain.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::data::buffer::{BufferSnapshot, StreamBuffer};
use crate::data::export::{build_export_rows, load_static_csv, save_export_csv, ExportLayout, ExportRow};
use crate::data::render::{build_render_snapshot, OverlaySeries, RenderSnapshot, Viewport};
use crate::data::sample::{Channel, Reading};
use crate::error::{IngestError, Result};
use crate::events::{DataUpdateMeta, EventController, EventKind, ExportMeta, IngestEvent, OverlayLoadMeta};
use crate::sink::{self, IngestMessage, IngestSink, OverlayId, SourceId, SourceKey};
use crate::tailer::{SourceTailer, TailerHandle};

/// Default overlay colors, handed out in order of addition.
pub const OVERLAY_PALETTE: [&str; 10] = [
    "#64748B", "#DC2626", "#0EA5E9", "#16A34A", "#F97316", "#A855F7", "#14B8A6", "#EAB308",
    "#EC4899", "#334155",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    /// Added but not fed by anything.
    Idle,
    /// Tailing a growing log.
    Live,
    /// Holding the result of a static import.
    Static,
    /// Static import in progress.
    Loading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayInfo {
    pub id: OverlayId,
    pub name: String,
    pub color: String,
    pub mode: OverlayMode,
    pub path: Option<PathBuf>,
}

/// Result of one consumer tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    /// Samples applied to buffers.
    pub samples: usize,
    /// Messages dropped because their source was restarted or removed.
    pub stale: usize,
    /// Events emitted since the previous drain, including those raised by
    /// direct calls such as `add_overlay`.
    pub events: Vec<IngestEvent>,
    /// Latest relative time held by the primary buffer.
    pub latest: Option<f64>,
}

struct SourceSlot {
    key: SourceKey,
    buffer: StreamBuffer,
    tailer: Option<TailerHandle>,
    path: Option<PathBuf>,
}

impl SourceSlot {
    fn new(id: SourceId, capacity: usize) -> Self {
        Self {
            key: SourceKey::next(id),
            buffer: StreamBuffer::with_capacity(capacity),
            tailer: None,
            path: None,
        }
    }

    fn stop(&mut self) -> bool {
        match self.tailer.take() {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    /// Stop any worker, drop its pending output and empty the buffer.
    fn restart(&mut self) {
        self.stop();
        self.key = SourceKey::next(self.key.id);
        self.buffer.clear();
    }

    fn is_running(&self) -> bool {
        self.tailer.as_ref().is_some_and(|t| !t.is_finished())
    }
}

struct OverlaySlot {
    info: OverlayInfo,
    source: SourceSlot,
}

pub struct IngestionManager {
    cfg: IngestConfig,
    layout: ExportLayout,
    sink: IngestSink,
    rx: Receiver<IngestMessage>,
    events: EventController,
    pending_events: Vec<IngestEvent>,
    primary: SourceSlot,
    latest: [Option<Reading>; 2],
    overlays: Vec<OverlaySlot>,
    next_overlay_id: OverlayId,
}

impl IngestionManager {
    pub fn new(cfg: IngestConfig) -> Self {
        Self::with_events(cfg, EventController::new())
    }

    /// Use an existing controller, e.g. one a UI already subscribed to.
    pub fn with_events(cfg: IngestConfig, events: EventController) -> Self {
        let (sink, rx) = sink::channel();
        Self {
            layout: ExportLayout::from_config(&cfg),
            primary: SourceSlot::new(SourceId::Primary, cfg.buffer_capacity),
            cfg,
            sink,
            rx,
            events,
            pending_events: Vec::new(),
            latest: [None, None],
            overlays: Vec::new(),
            next_overlay_id: 1,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.cfg
    }

    pub fn events(&self) -> &EventController {
        &self.events
    }

    pub fn export_layout(&self) -> &ExportLayout {
        &self.layout
    }

    fn emit(&mut self, event: IngestEvent) {
        let stamped = self.events.emit(event);
        self.pending_events.push(stamped);
    }

    fn spawn_tailer(&self, key: SourceKey, path: &Path) -> Result<TailerHandle> {
        SourceTailer::new(
            key,
            path,
            self.cfg.limits,
            self.cfg.static_dt_s,
            self.sink.clone(),
        )
        .spawn(self.cfg.poll_interval())
        .map_err(|e| IngestError::io(path, e))
    }

    // ── Primary ─────────────────────────────────────────────────────────

    /// Reset the primary source and start tailing `path`.
    pub fn start_primary(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = checked_path(path.as_ref())?;
        self.primary.restart();
        self.latest = [None, None];
        let handle = self.spawn_tailer(self.primary.key, path)?;
        self.primary.tailer = Some(handle);
        self.primary.path = Some(path.to_path_buf());
        info!(source = %SourceId::Primary, path = %path.display(), "primary started");
        self.emit(
            IngestEvent::new(EventKind::SOURCE_STARTED | EventKind::DATA_CLEARED)
                .with_source(SourceId::Primary)
                .with_message(path.display().to_string()),
        );
        Ok(())
    }

    /// Stop tailing the primary. Its buffer is kept; samples already read are
    /// still applied by the next drain.
    pub fn stop_primary(&mut self) {
        if self.primary.stop() {
            info!(source = %SourceId::Primary, "primary stop requested");
        }
    }

    /// Stop the primary and clear its buffer, anchor and latest readings.
    pub fn reset_primary(&mut self) {
        let was_running = self.primary.is_running();
        self.primary.restart();
        self.latest = [None, None];
        info!(source = %SourceId::Primary, "primary reset");
        let mut kinds = EventKind::RESET | EventKind::DATA_CLEARED;
        if was_running {
            kinds |= EventKind::SOURCE_STOPPED;
        }
        self.emit(IngestEvent::new(kinds).with_source(SourceId::Primary));
    }

    pub fn primary(&self) -> &StreamBuffer {
        &self.primary.buffer
    }

    pub fn primary_path(&self) -> Option<&Path> {
        self.primary.path.as_deref()
    }

    pub fn is_primary_running(&self) -> bool {
        self.primary.is_running()
    }

    /// Most recent accepted reading of a primary channel.
    pub fn latest_reading(&self, channel: Channel) -> Option<Reading> {
        self.latest[channel.index()]
    }

    // ── Overlays ────────────────────────────────────────────────────────

    /// Color the next added overlay gets when none is given.
    pub fn next_overlay_color(&self) -> &'static str {
        OVERLAY_PALETTE[self.overlays.len() % OVERLAY_PALETTE.len()]
    }

    /// Register an empty, idle overlay.
    pub fn add_overlay(&mut self, name: impl Into<String>, color: Option<&str>) -> Result<OverlayId> {
        if self.overlays.len() >= self.cfg.max_overlays {
            return Err(IngestError::OverlayLimitReached {
                max: self.cfg.max_overlays,
            });
        }
        let id = self.next_overlay_id;
        self.next_overlay_id += 1;
        let mut name = name.into();
        if name.trim().is_empty() {
            name = format!("Overlay {id}");
        }
        let color = color.unwrap_or_else(|| self.next_overlay_color()).to_string();
        info!(overlay = id, %name, %color, "overlay added");
        self.overlays.push(OverlaySlot {
            info: OverlayInfo {
                id,
                name: name.clone(),
                color,
                mode: OverlayMode::Idle,
                path: None,
            },
            source: SourceSlot::new(SourceId::Overlay(id), self.cfg.buffer_capacity),
        });
        self.emit(
            IngestEvent::new(EventKind::OVERLAY_ADDED)
                .with_source(SourceId::Overlay(id))
                .with_message(name),
        );
        Ok(id)
    }

    fn overlay_index(&self, id: OverlayId) -> Result<usize> {
        self.overlays
            .iter()
            .position(|o| o.info.id == id)
            .ok_or(IngestError::UnknownOverlay(id))
    }

    /// Tail `path` into the overlay, replacing whatever it held.
    pub fn start_live_overlay(&mut self, id: OverlayId, path: impl AsRef<Path>) -> Result<()> {
        let idx = self.overlay_index(id)?;
        let path = checked_path(path.as_ref())?;
        let key = {
            let slot = &mut self.overlays[idx];
            slot.source.restart();
            slot.source.key
        };
        let handle = self.spawn_tailer(key, path)?;
        let slot = &mut self.overlays[idx];
        slot.source.tailer = Some(handle);
        slot.source.path = Some(path.to_path_buf());
        slot.info.mode = OverlayMode::Live;
        slot.info.path = Some(path.to_path_buf());
        info!(overlay = id, path = %path.display(), "live overlay started");
        self.emit(
            IngestEvent::new(EventKind::SOURCE_STARTED | EventKind::DATA_CLEARED)
                .with_source(SourceId::Overlay(id))
                .with_message(path.display().to_string()),
        );
        Ok(())
    }

    /// Import an exported CSV into the overlay on a background thread.
    ///
    /// Completion shows up as an `OVERLAY_LOADED` or `OVERLAY_LOAD_FAILED`
    /// event on a later drain.
    pub fn load_static_overlay(&mut self, id: OverlayId, path: impl AsRef<Path>) -> Result<()> {
        let idx = self.overlay_index(id)?;
        let path = checked_path(path.as_ref())?.to_path_buf();
        let slot = &mut self.overlays[idx];
        slot.source.restart();
        let key = slot.source.key;
        let sink = self.sink.clone();
        let layout = self.layout.clone();
        let static_dt = self.cfg.static_dt_s;
        let job_path = path.clone();
        std::thread::Builder::new()
            .name(format!("import-{id}"))
            .spawn(move || {
                let msg = match load_static_csv(&job_path, &layout, static_dt) {
                    Ok(snapshot) => IngestMessage::StaticLoaded {
                        key,
                        path: job_path,
                        snapshot,
                    },
                    Err(e) => IngestMessage::StaticLoadFailed {
                        key,
                        path: job_path,
                        message: e.to_string(),
                    },
                };
                let _ = sink.send(msg);
            })
            .map_err(|e| IngestError::io(&path, e))?;
        let slot = &mut self.overlays[idx];
        slot.info.mode = OverlayMode::Loading;
        slot.info.path = Some(path.clone());
        slot.source.path = Some(path.clone());
        info!(overlay = id, path = %path.display(), "static overlay import started");
        self.emit(IngestEvent::new(EventKind::DATA_CLEARED).with_source(SourceId::Overlay(id)));
        Ok(())
    }

    /// Stop and discard an overlay.
    pub fn remove_overlay(&mut self, id: OverlayId) -> Result<()> {
        let idx = self.overlay_index(id)?;
        let slot = self.overlays.remove(idx);
        self.discard_overlay(slot);
        Ok(())
    }

    pub fn clear_overlays(&mut self) {
        for slot in std::mem::take(&mut self.overlays) {
            self.discard_overlay(slot);
        }
    }

    fn discard_overlay(&mut self, mut slot: OverlaySlot) {
        let id = slot.info.id;
        slot.source.stop();
        info!(overlay = id, "overlay removed");
        self.emit(IngestEvent::new(EventKind::OVERLAY_REMOVED).with_source(SourceId::Overlay(id)));
    }

    pub fn overlays(&self) -> Vec<OverlayInfo> {
        self.overlays.iter().map(|o| o.info.clone()).collect()
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&OverlayInfo> {
        self.overlays.iter().find(|o| o.info.id == id).map(|o| &o.info)
    }

    pub fn overlay_buffer(&self, id: OverlayId) -> Option<&StreamBuffer> {
        self.overlays
            .iter()
            .find(|o| o.info.id == id)
            .map(|o| &o.source.buffer)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    // ── Consumer tick ───────────────────────────────────────────────────

    /// Apply every pending message to the buffers and collect events.
    pub fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        let mut updated: Vec<SourceId> = Vec::new();
        loop {
            let msg = match self.rx.try_recv() {
                Ok(msg) => msg,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            let key = msg.key();
            if !self.is_current(key) {
                report.stale += 1;
                continue;
            }
            match msg {
                IngestMessage::Sample { channel, point, .. } => {
                    if let Some(slot) = self.slot_mut(key.id) {
                        slot.buffer.push(channel, point);
                    }
                    if key.id == SourceId::Primary {
                        self.latest[channel.index()] = Some(Reading {
                            temperature: point.temperature,
                            humidity: point.humidity,
                        });
                    }
                    if !updated.contains(&key.id) {
                        updated.push(key.id);
                    }
                    report.samples += 1;
                }
                IngestMessage::Reset { .. } => {
                    if let Some(slot) = self.slot_mut(key.id) {
                        slot.buffer.clear();
                    }
                    if key.id == SourceId::Primary {
                        self.latest = [None, None];
                    }
                    warn!(source = %key.id, "source file truncated, buffer cleared");
                    self.emit(
                        IngestEvent::new(EventKind::RESET | EventKind::DATA_CLEARED)
                            .with_source(key.id)
                            .with_message("file truncated"),
                    );
                }
                IngestMessage::ReadError { message, .. } => {
                    self.emit(
                        IngestEvent::new(EventKind::READ_ERROR)
                            .with_source(key.id)
                            .with_message(message),
                    );
                }
                IngestMessage::StaticLoaded { path, snapshot, .. } => {
                    self.apply_static(key, path, snapshot);
                }
                IngestMessage::StaticLoadFailed { path, message, .. } => {
                    if let SourceId::Overlay(id) = key.id {
                        if let Ok(idx) = self.overlay_index(id) {
                            self.overlays[idx].info.mode = OverlayMode::Idle;
                        }
                        warn!(overlay = id, path = %path.display(), error = %message, "static import failed");
                        let mut event = IngestEvent::new(EventKind::OVERLAY_LOAD_FAILED)
                            .with_source(key.id)
                            .with_message(message);
                        event.overlay_load = Some(OverlayLoadMeta {
                            overlay: id,
                            path,
                            points: (0, 0),
                        });
                        self.emit(event);
                    }
                }
                IngestMessage::TailerStopped { .. } => {
                    if let SourceId::Overlay(id) = key.id {
                        if let Ok(idx) = self.overlay_index(id) {
                            let info = &mut self.overlays[idx].info;
                            if info.mode == OverlayMode::Live {
                                info.mode = OverlayMode::Idle;
                            }
                        }
                    }
                    if let Some(slot) = self.slot_mut(key.id) {
                        slot.tailer = None;
                    }
                    self.emit(IngestEvent::new(EventKind::SOURCE_STOPPED).with_source(key.id));
                }
            }
        }

        if report.samples > 0 {
            debug!(samples = report.samples, sources = updated.len(), "drained batch");
            let mut event = IngestEvent::new(EventKind::DATA_UPDATED);
            event.data_update = Some(DataUpdateMeta {
                sources: updated,
                new_point_count: report.samples,
            });
            self.emit(event);
        }
        report.events = std::mem::take(&mut self.pending_events);
        report.latest = self.primary.buffer.latest_time();
        report
    }

    fn apply_static(&mut self, key: SourceKey, path: PathBuf, snapshot: BufferSnapshot) {
        let SourceId::Overlay(id) = key.id else {
            return;
        };
        let Ok(idx) = self.overlay_index(id) else {
            return;
        };
        let capacity = self.cfg.buffer_capacity;
        let slot = &mut self.overlays[idx];
        slot.source.buffer = StreamBuffer::from_snapshot(&snapshot, capacity);
        slot.info.mode = OverlayMode::Static;
        let points = (
            slot.source.buffer.len(Channel::Inlet),
            slot.source.buffer.len(Channel::Outlet),
        );
        info!(overlay = id, path = %path.display(), inlet = points.0, outlet = points.1, "static overlay loaded");
        let mut event = IngestEvent::new(EventKind::OVERLAY_LOADED | EventKind::DATA_UPDATED)
            .with_source(key.id)
            .with_message(path.display().to_string());
        event.overlay_load = Some(OverlayLoadMeta {
            overlay: id,
            path,
            points,
        });
        self.emit(event);
    }

    fn is_current(&self, key: SourceKey) -> bool {
        match key.id {
            SourceId::Primary => self.primary.key == key,
            SourceId::Overlay(id) => self
                .overlays
                .iter()
                .any(|o| o.info.id == id && o.source.key == key),
        }
    }

    fn slot_mut(&mut self, id: SourceId) -> Option<&mut SourceSlot> {
        match id {
            SourceId::Primary => Some(&mut self.primary),
            SourceId::Overlay(id) => self
                .overlays
                .iter_mut()
                .find(|o| o.info.id == id)
                .map(|o| &mut o.source),
        }
    }

    // ── Views ───────────────────────────────────────────────────────────

    /// Latest relative time over the primary and every overlay.
    pub fn latest_time(&self) -> Option<f64> {
        std::iter::once(&self.primary)
            .chain(self.overlays.iter().map(|o| &o.source))
            .filter_map(|s| s.buffer.latest_time())
            .reduce(f64::max)
    }

    pub fn rolling_viewport(&self) -> Viewport {
        Viewport::rolling(self.latest_time().unwrap_or(0.0), self.cfg.view_window_s)
    }

    pub fn full_viewport(&self) -> Viewport {
        Viewport::full(self.latest_time().unwrap_or(0.0))
    }

    pub fn render_snapshot(&self, viewport: Viewport) -> RenderSnapshot {
        let primary = self.primary.buffer.snapshot();
        let snaps: Vec<BufferSnapshot> = self.overlays.iter().map(|o| o.source.buffer.snapshot()).collect();
        let overlays: Vec<OverlaySeries<'_>> = self
            .overlays
            .iter()
            .zip(&snaps)
            .map(|(o, snapshot)| OverlaySeries {
                name: &o.info.name,
                color: &o.info.color,
                snapshot,
            })
            .collect();
        build_render_snapshot(&primary, &overlays, viewport, &self.cfg)
    }

    /// Merged primary table, one row per distinct sample time.
    pub fn export_rows(&self) -> Vec<ExportRow> {
        build_export_rows(&self.primary.buffer.snapshot(), self.cfg.export_tolerance_s)
    }

    /// Write the merged primary table as CSV. Returns the row count.
    pub fn export_csv(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let rows = self.export_rows();
        save_export_csv(path, &self.layout, &rows)?;
        self.export_done("csv", path, rows.len());
        Ok(rows.len())
    }

    #[cfg(feature = "parquet")]
    pub fn export_parquet(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let rows = self.export_rows();
        crate::data::export::save_export_parquet(path, &self.layout, &rows)?;
        self.export_done("parquet", path, rows.len());
        Ok(rows.len())
    }

    fn export_done(&mut self, format: &str, path: &Path, rows: usize) {
        info!(format, path = %path.display(), rows, "export written");
        let mut event = IngestEvent::new(EventKind::EXPORT).with_message(path.display().to_string());
        event.export = Some(ExportMeta {
            format: format.to_string(),
            path: path.to_path_buf(),
            rows,
        });
        self.emit(event);
    }
}

impl Drop for IngestionManager {
    fn drop(&mut self) {
        self.primary.stop();
        for o in self.overlays.iter_mut() {
            o.source.stop();
        }
    }
}

fn checked_path(path: &Path) -> Result<&Path> {
    if path.as_os_str().is_empty() {
        Err(IngestError::NoFileSelected)
    } else {
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_rejected() {
        let mut m = IngestionManager::new(IngestConfig::default());
        assert!(matches!(m.start_primary(""), Err(IngestError::NoFileSelected)));
        assert!(!m.is_primary_running());
    }

    #[test]
    fn overlay_cap_leaves_no_partial_state() {
        let cfg = IngestConfig {
            max_overlays: 2,
            ..IngestConfig::default()
        };
        let mut m = IngestionManager::new(cfg);
        m.add_overlay("a", None).unwrap();
        m.add_overlay("b", None).unwrap();
        let err = m.add_overlay("c", None).unwrap_err();
        assert!(matches!(err, IngestError::OverlayLimitReached { max: 2 }));
        assert_eq!(m.overlay_count(), 2);
    }

    #[test]
    fn palette_cycles_with_overlay_count() {
        let mut m = IngestionManager::new(IngestConfig::default());
        let a = m.add_overlay("a", None).unwrap();
        let b = m.add_overlay("", Some("#000000")).unwrap();
        assert_eq!(m.overlay(a).unwrap().color, OVERLAY_PALETTE[0]);
        assert_eq!(m.overlay(b).unwrap().color, "#000000");
        assert_eq!(m.overlay(b).unwrap().name, format!("Overlay {b}"));
        assert_eq!(m.next_overlay_color(), OVERLAY_PALETTE[2]);
    }

    #[test]
    fn unknown_overlay_is_an_error() {
        let mut m = IngestionManager::new(IngestConfig::default());
        assert!(matches!(m.remove_overlay(42), Err(IngestError::UnknownOverlay(42))));
        assert!(matches!(
            m.start_live_overlay(42, "x.log"),
            Err(IngestError::UnknownOverlay(42))
        ));
    }

    #[test]
    fn sync_events_show_up_in_drain() {
        let mut m = IngestionManager::new(IngestConfig::default());
        let rx = m.events().subscribe(crate::events::EventFilter::only(EventKind::OVERLAY_ADDED));
        let id = m.add_overlay("a", None).unwrap();
        m.remove_overlay(id).unwrap();
        let report = m.drain();
        assert_eq!(report.events.len(), 2);
        assert!(report.events[0].is(EventKind::OVERLAY_ADDED));
        assert!(report.events[1].is(EventKind::OVERLAY_REMOVED));
        assert_eq!(rx.try_recv().unwrap().source, Some(SourceId::Overlay(id)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stale_generation_is_dropped() {
        let mut m = IngestionManager::new(IngestConfig::default());
        let old_key = m.primary.key;
        m.reset_primary();
        let point = crate::data::sample::SeriesPoint {
            t: 0.0,
            temperature: 20.0,
            humidity: 40.0,
        };
        m.sink.send_sample(old_key, Channel::Inlet, point).unwrap();
        m.sink
            .send_sample(m.primary.key, Channel::Outlet, point)
            .unwrap();
        let report = m.drain();
        assert_eq!(report.samples, 1);
        assert_eq!(report.stale, 1);
        assert_eq!(m.primary().len(Channel::Inlet), 0);
        assert_eq!(m.primary().len(Channel::Outlet), 1);
        assert_eq!(m.latest_reading(Channel::Outlet).unwrap().temperature, 20.0);
    }

    fn point(t: f64) -> crate::data::sample::SeriesPoint {
        crate::data::sample::SeriesPoint {
            t,
            temperature: 20.0,
            humidity: 40.0,
        }
    }

    #[test]
    fn viewport_spans_longest_source() {
        let mut m = IngestionManager::new(IngestConfig::default());
        let id = m.add_overlay("long run", None).unwrap();
        let overlay_key = m.overlays[0].source.key;
        m.sink.send_sample(m.primary.key, Channel::Inlet, point(10.0)).unwrap();
        m.sink.send_sample(overlay_key, Channel::Inlet, point(7200.0)).unwrap();
        m.drain();

        assert_eq!(m.overlay_buffer(id).unwrap().latest_time(), Some(7200.0));
        assert_eq!(m.latest_time(), Some(7200.0));
        let full = m.full_viewport();
        assert_eq!((full.x0, full.x1), (0.0, 7200.0));
    }

    #[test]
    fn clear_overlays_reports_each_removal() {
        let mut m = IngestionManager::new(IngestConfig::default());
        let a = m.add_overlay("a", None).unwrap();
        let b = m.add_overlay("b", None).unwrap();
        m.drain();

        m.clear_overlays();
        let report = m.drain();
        let removed: Vec<Option<SourceId>> = report
            .events
            .iter()
            .filter(|e| e.is(EventKind::OVERLAY_REMOVED))
            .map(|e| e.source)
            .collect();
        assert_eq!(
            removed,
            vec![Some(SourceId::Overlay(a)), Some(SourceId::Overlay(b))]
        );
        assert_eq!(m.overlay_count(), 0);
    }
}
