//! sensor-liveplot crate root: re-exports and module wiring.
//!
//! Live ingestion of two-channel temperature/humidity logs written by a
//! serial logger, with overlays and a merged CSV export:
//! - `data`: samples, line parsing, bounded buffers, resampling, export and
//!   render views
//! - `tailer`: per-file polling worker that feeds parsed samples to a sink
//! - `sink`: the one-way hand-off channel between workers and the consumer
//! - `manager`: owns the primary source and overlays, drained on a tick
//! - `events`: lifecycle/error events with bitflag filtering
//! - `config`: tunables, loadable from YAML or JSON

pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod manager;
pub mod sink;
pub mod tailer;

// Public re-exports for a compact external API
pub use config::{IngestConfig, ValidationLimits};
pub use data::buffer::{BufferSnapshot, SeriesSnapshot, StreamBuffer};
pub use data::export::{ExportLayout, ExportRow};
pub use data::parser::{LineOutcome, LineParser, RejectReason};
pub use data::render::{PanelView, RenderSnapshot, SeriesView, Viewport};
pub use data::sample::{Channel, Quantity, Reading, Sample, SeriesPoint};
pub use error::{IngestError, Result};
pub use events::{EventController, EventFilter, EventKind, IngestEvent};
pub use manager::{DrainReport, IngestionManager, OverlayInfo, OverlayMode};
pub use sink::{channel, IngestMessage, IngestSink, OverlayId, SourceId, SourceKey};
pub use tailer::{PollOutcome, SourceTailer, TailCursor, TailState, TailerHandle};
