//! Lifecycle and error events of the ingestion core.
//!
//! Consumers subscribe through [`EventController`] and receive
//! [`IngestEvent`]s on an `mpsc` channel. Each event carries a set of
//! [`EventKind`] flags so that one occurrence can match several categories
//! (a truncation is both a `RESET` and a `DATA_CLEARED`).
//!
//! The filter is a simple OR mask: an event is delivered when
//! `(event.kinds & filter) != 0`.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::sink::{OverlayId, SourceId};

// ─────────────────────────────────────────────────────────────────────────────
// EventKind – bitflags
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKind(pub u32);

impl EventKind {
    // ── Source lifecycle ────────────────────────────────────────────────
    /// A tailer was started for the primary or a live overlay.
    pub const SOURCE_STARTED: Self = Self(1 << 0);
    /// A tailer was stopped or exited.
    pub const SOURCE_STOPPED: Self = Self(1 << 1);
    /// A source was reset, explicitly or because its file shrank.
    pub const RESET: Self = Self(1 << 2);
    /// A non-transient read error. The tailer keeps running.
    pub const READ_ERROR: Self = Self(1 << 3);

    // ── Overlays ────────────────────────────────────────────────────────
    pub const OVERLAY_ADDED: Self = Self(1 << 4);
    pub const OVERLAY_REMOVED: Self = Self(1 << 5);
    /// A static import finished successfully.
    pub const OVERLAY_LOADED: Self = Self(1 << 6);
    pub const OVERLAY_LOAD_FAILED: Self = Self(1 << 7);

    // ── Data ────────────────────────────────────────────────────────────
    /// New samples were applied to one or more buffers.
    pub const DATA_UPDATED: Self = Self(1 << 8);
    /// A buffer was emptied.
    pub const DATA_CLEARED: Self = Self(1 << 9);

    /// An export file was written.
    pub const EXPORT: Self = Self(1 << 10);

    /// Wildcard: matches every event kind.
    pub const ALL: Self = Self(u32::MAX);

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether `self` contains all bits in `other`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check whether `self` has at least one bit in common with `other`.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for EventKind {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for EventKind {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for EventKind {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

const KIND_NAMES: &[(EventKind, &str)] = &[
    (EventKind::SOURCE_STARTED, "SOURCE_STARTED"),
    (EventKind::SOURCE_STOPPED, "SOURCE_STOPPED"),
    (EventKind::RESET, "RESET"),
    (EventKind::READ_ERROR, "READ_ERROR"),
    (EventKind::OVERLAY_ADDED, "OVERLAY_ADDED"),
    (EventKind::OVERLAY_REMOVED, "OVERLAY_REMOVED"),
    (EventKind::OVERLAY_LOADED, "OVERLAY_LOADED"),
    (EventKind::OVERLAY_LOAD_FAILED, "OVERLAY_LOAD_FAILED"),
    (EventKind::DATA_UPDATED, "DATA_UPDATED"),
    (EventKind::DATA_CLEARED, "DATA_CLEARED"),
    (EventKind::EXPORT, "EXPORT"),
];

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "EMPTY");
        }
        if *self == EventKind::ALL {
            return write!(f, "ALL");
        }

        let mut names = Vec::new();
        let mut known_bits = 0u32;
        for (kind, name) in KIND_NAMES {
            known_bits |= kind.0;
            if self.contains(*kind) {
                names.push((*name).to_string());
            }
        }
        let extra = self.0 & !known_bits;
        if extra != 0 {
            names.push(format!("0x{extra:x}"));
        }
        write!(f, "{}", names.join("|"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Attached to `DATA_UPDATED` events.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUpdateMeta {
    /// Sources that received samples, in first-seen order.
    pub sources: Vec<SourceId>,
    pub new_point_count: usize,
}

/// Attached to `OVERLAY_LOADED` and `OVERLAY_LOAD_FAILED` events.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLoadMeta {
    pub overlay: OverlayId,
    pub path: PathBuf,
    /// Points per channel (inlet, outlet); zero on failure.
    pub points: (usize, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportMeta {
    /// "csv" or "parquet".
    pub format: String,
    pub path: PathBuf,
    pub rows: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// IngestEvent
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct IngestEvent {
    pub kinds: EventKind,
    /// Seconds since the controller was created, set on emit.
    pub timestamp: f64,
    pub source: Option<SourceId>,
    /// Human readable detail (error text, file path).
    pub message: Option<String>,

    pub data_update: Option<DataUpdateMeta>,
    pub overlay_load: Option<OverlayLoadMeta>,
    pub export: Option<ExportMeta>,
}

impl IngestEvent {
    pub fn new(kinds: EventKind) -> Self {
        Self {
            kinds,
            timestamp: 0.0,
            source: None,
            message: None,
            data_update: None,
            overlay_load: None,
            export: None,
        }
    }

    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is(&self, kind: EventKind) -> bool {
        self.kinds.intersects(kind)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventFilter
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct EventFilter {
    pub mask: EventKind,
}

impl EventFilter {
    pub const fn all() -> Self {
        Self {
            mask: EventKind::ALL,
        }
    }

    pub const fn only(mask: EventKind) -> Self {
        Self { mask }
    }

    #[inline]
    pub fn matches(&self, event: &IngestEvent) -> bool {
        event.kinds.intersects(self.mask)
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventController
// ─────────────────────────────────────────────────────────────────────────────

struct Subscriber {
    filter: EventFilter,
    sender: Sender<IngestEvent>,
}

struct EventCtrlInner {
    subscribers: Vec<Subscriber>,
    start_instant: Instant,
}

/// Fans events out to subscribers. Cloning shares the subscriber list.
#[derive(Clone)]
pub struct EventController {
    inner: Arc<Mutex<EventCtrlInner>>,
}

impl EventController {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EventCtrlInner {
                subscribers: Vec::new(),
                start_instant: Instant::now(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EventCtrlInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Subscribe to events matching `filter`.
    pub fn subscribe(&self, filter: EventFilter) -> Receiver<IngestEvent> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.lock().subscribers.push(Subscriber { filter, sender: tx });
        rx
    }

    pub fn subscribe_all(&self) -> Receiver<IngestEvent> {
        self.subscribe(EventFilter::all())
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Stamp `event` and deliver it to every matching subscriber. Returns the
    /// stamped event. Subscribers whose receiver was dropped are pruned on
    /// their next match.
    pub fn emit(&self, mut event: IngestEvent) -> IngestEvent {
        let mut inner = self.lock();
        event.timestamp = inner.start_instant.elapsed().as_secs_f64();
        inner.subscribers.retain(|sub| {
            if sub.filter.matches(&event) {
                sub.sender.send(event.clone()).is_ok()
            } else {
                true
            }
        });
        event
    }
}

impl Default for EventController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventController")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_combine_and_intersect() {
        let k = EventKind::RESET | EventKind::DATA_CLEARED;
        assert!(k.contains(EventKind::RESET));
        assert!(k.intersects(EventKind::DATA_CLEARED));
        assert!(!k.intersects(EventKind::EXPORT));
        assert!(EventKind::ALL.contains(EventKind::OVERLAY_LOAD_FAILED));
    }

    #[test]
    fn kinds_do_not_overlap() {
        for (i, (a, _)) in KIND_NAMES.iter().enumerate() {
            for (j, (b, _)) in KIND_NAMES.iter().enumerate() {
                if i != j {
                    assert!(!a.intersects(*b), "{a} overlaps {b}");
                }
            }
        }
    }

    #[test]
    fn display_joins_names() {
        assert_eq!(EventKind::RESET.to_string(), "RESET");
        assert_eq!(
            (EventKind::RESET | EventKind::DATA_CLEARED).to_string(),
            "RESET|DATA_CLEARED"
        );
        assert_eq!(EventKind::ALL.to_string(), "ALL");
        assert_eq!(EventKind(0).to_string(), "EMPTY");
        assert!(EventKind(1 << 31).to_string().starts_with("0x"));
    }

    #[test]
    fn subscribers_only_get_matching_events() {
        let ctrl = EventController::new();
        let rx_all = ctrl.subscribe_all();
        let rx_err = ctrl.subscribe(EventFilter::only(EventKind::READ_ERROR));

        ctrl.emit(IngestEvent::new(EventKind::DATA_UPDATED));
        ctrl.emit(
            IngestEvent::new(EventKind::READ_ERROR)
                .with_source(SourceId::Primary)
                .with_message("permission denied"),
        );

        assert!(rx_all.try_recv().unwrap().is(EventKind::DATA_UPDATED));
        assert!(rx_all.try_recv().unwrap().is(EventKind::READ_ERROR));
        let err = rx_err.try_recv().unwrap();
        assert_eq!(err.source, Some(SourceId::Primary));
        assert_eq!(err.message.as_deref(), Some("permission denied"));
        assert!(rx_err.try_recv().is_err());
    }

    #[test]
    fn timestamp_is_set_on_emit() {
        let ctrl = EventController::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let evt = ctrl.emit(IngestEvent::new(EventKind::EXPORT));
        assert!(evt.timestamp > 0.0);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let ctrl = EventController::new();
        let rx1 = ctrl.subscribe_all();
        let rx2 = ctrl.subscribe_all();
        drop(rx1);
        ctrl.emit(IngestEvent::new(EventKind::RESET));
        assert_eq!(ctrl.subscriber_count(), 1);
        assert!(rx2.try_recv().is_ok());
    }
}
