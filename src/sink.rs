//! Hand-off channel between source workers and the consumer.
//!
//! Workers (tailers, static imports) never touch a buffer. They send
//! [`IngestMessage`]s through an [`IngestSink`]; the consumer drains the
//! receiving end and applies each message to the buffer of the addressed
//! source. Every message carries a [`SourceKey`] whose `generation` identifies
//! the worker run that produced it, so output of a worker that was stopped,
//! reset or removed can be told apart and dropped.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SendError, Sender};

use crate::data::buffer::BufferSnapshot;
use crate::data::sample::{Channel, SeriesPoint};

/// Numeric identifier for an overlay, assigned by the manager.
pub type OverlayId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    Primary,
    Overlay(OverlayId),
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Primary => write!(f, "primary"),
            SourceId::Overlay(id) => write!(f, "overlay#{id}"),
        }
    }
}

/// A source together with the worker run that speaks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub id: SourceId,
    pub generation: u64,
}

impl SourceKey {
    /// Key with a generation number never handed out before.
    pub fn next(id: SourceId) -> Self {
        static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);
        Self {
            id,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// Messages sent from workers to the consumer.
#[derive(Debug, Clone)]
pub enum IngestMessage {
    /// An accepted sample, already rebased to the source anchor.
    Sample {
        key: SourceKey,
        channel: Channel,
        point: SeriesPoint,
    },
    /// The file shrank; the source's buffer must be cleared before any
    /// following sample is applied.
    Reset { key: SourceKey },
    /// A non-transient read problem. The worker keeps running.
    ReadError { key: SourceKey, message: String },
    /// A static import finished; `snapshot` replaces the overlay contents.
    StaticLoaded {
        key: SourceKey,
        path: PathBuf,
        snapshot: BufferSnapshot,
    },
    StaticLoadFailed {
        key: SourceKey,
        path: PathBuf,
        message: String,
    },
    /// The tailer loop exited.
    TailerStopped { key: SourceKey },
}

impl IngestMessage {
    pub fn key(&self) -> SourceKey {
        match self {
            IngestMessage::Sample { key, .. }
            | IngestMessage::Reset { key }
            | IngestMessage::ReadError { key, .. }
            | IngestMessage::StaticLoaded { key, .. }
            | IngestMessage::StaticLoadFailed { key, .. }
            | IngestMessage::TailerStopped { key } => *key,
        }
    }
}

pub type SendResult = Result<(), SendError<IngestMessage>>;

/// Convenience sender used by workers.
#[derive(Debug, Clone)]
pub struct IngestSink {
    tx: Sender<IngestMessage>,
}

impl IngestSink {
    pub fn new(tx: Sender<IngestMessage>) -> Self {
        Self { tx }
    }

    pub fn send(&self, msg: IngestMessage) -> SendResult {
        self.tx.send(msg)
    }

    pub fn send_sample(&self, key: SourceKey, channel: Channel, point: SeriesPoint) -> SendResult {
        self.tx.send(IngestMessage::Sample {
            key,
            channel,
            point,
        })
    }

    pub fn send_reset(&self, key: SourceKey) -> SendResult {
        self.tx.send(IngestMessage::Reset { key })
    }

    pub fn send_read_error(&self, key: SourceKey, message: impl Into<String>) -> SendResult {
        self.tx.send(IngestMessage::ReadError {
            key,
            message: message.into(),
        })
    }

    pub fn send_stopped(&self, key: SourceKey) -> SendResult {
        self.tx.send(IngestMessage::TailerStopped { key })
    }
}

/// Create a new sink and its receiving end.
pub fn channel() -> (IngestSink, Receiver<IngestMessage>) {
    let (tx, rx) = std::sync::mpsc::channel();
    (IngestSink::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_are_unique() {
        let a = SourceKey::next(SourceId::Primary);
        let b = SourceKey::next(SourceId::Primary);
        assert_ne!(a, b);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn messages_arrive_in_send_order() {
        let (sink, rx) = channel();
        let key = SourceKey::next(SourceId::Overlay(3));
        let p = SeriesPoint {
            t: 0.0,
            temperature: 20.0,
            humidity: 40.0,
        };
        sink.send_sample(key, Channel::Inlet, p).unwrap();
        sink.send_reset(key).unwrap();
        sink.send_stopped(key).unwrap();
        assert!(matches!(rx.try_recv().unwrap(), IngestMessage::Sample { .. }));
        assert!(matches!(rx.try_recv().unwrap(), IngestMessage::Reset { .. }));
        let last = rx.try_recv().unwrap();
        assert!(matches!(last, IngestMessage::TailerStopped { .. }));
        assert_eq!(last.key(), key);
    }

    #[test]
    fn source_id_display() {
        assert_eq!(SourceId::Primary.to_string(), "primary");
        assert_eq!(SourceId::Overlay(2).to_string(), "overlay#2");
    }
}
