//! Follows a growing log file and forwards accepted samples to a sink.
//!
//! A [`SourceTailer`] polls the file size, reads whatever was appended since
//! the last tick, reassembles lines across read boundaries and parses each
//! complete line. It never touches a buffer: samples, resets and read errors
//! go out through an [`IngestSink`].

use std::fs::{File, Metadata};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::config::ValidationLimits;
use crate::data::parser::{LineOutcome, LineParser, RejectReason};
use crate::sink::{IngestSink, SourceKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    /// The file does not exist (yet).
    WaitingForFile,
    Tailing,
    /// The file shrank or was replaced during this tick; state was reset and
    /// reading restarted from offset 0.
    Truncated,
    Stopped,
}

/// Per-source read position and line reassembly state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TailCursor {
    /// Next byte to read.
    pub offset: u64,
    /// File size seen on the previous tick.
    pub last_size: u64,
    /// Bytes after the last line terminator.
    pub carry: Vec<u8>,
    /// Absolute time of the first accepted sample.
    pub anchor: Option<f64>,
    /// Data lines seen so far; drives the fallback time of time-less records.
    pub line_index: u64,
}

impl TailCursor {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// What one call to [`SourceTailer::poll_once`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    pub state: TailState,
    /// Complete lines handed to the parser.
    pub lines: usize,
    /// Samples sent to the sink.
    pub accepted: usize,
}

pub struct SourceTailer {
    key: SourceKey,
    path: PathBuf,
    parser: LineParser,
    static_dt: f64,
    sink: IngestSink,
    cursor: TailCursor,
    state: TailState,
    file: Option<File>,
    file_id: Option<FileId>,
    last_error: Option<String>,
}

impl SourceTailer {
    pub fn new(
        key: SourceKey,
        path: impl Into<PathBuf>,
        limits: ValidationLimits,
        static_dt: f64,
        sink: IngestSink,
    ) -> Self {
        Self {
            key,
            path: path.into(),
            parser: LineParser::new(limits),
            static_dt,
            sink,
            cursor: TailCursor::default(),
            state: TailState::WaitingForFile,
            file: None,
            file_id: None,
            last_error: None,
        }
    }

    pub fn key(&self) -> SourceKey {
        self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    pub fn cursor(&self) -> &TailCursor {
        &self.cursor
    }

    /// Run a single tick: check the size, handle truncation, read and parse
    /// new bytes.
    pub fn poll_once(&mut self) -> PollOutcome {
        let mut outcome = PollOutcome {
            state: self.state,
            lines: 0,
            accepted: 0,
        };
        if self.state == TailState::Stopped {
            return outcome;
        }

        let (len, id) = match std::fs::metadata(&self.path) {
            Ok(meta) => (meta.len(), file_id(&meta)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.file = None;
                self.state = TailState::WaitingForFile;
                outcome.state = self.state;
                return outcome;
            }
            Err(e) => {
                self.report_error(&e);
                outcome.state = self.state;
                return outcome;
            }
        };

        let replaced = matches!((self.file_id, id), (Some(old), Some(new)) if old != new);
        let mut truncated = false;
        if replaced || len < self.cursor.offset || len < self.cursor.last_size {
            warn!(
                source = %self.key.id,
                path = %self.path.display(),
                offset = self.cursor.offset,
                len,
                replaced,
                "file truncated, restarting from the beginning"
            );
            self.cursor.reset();
            self.parser.reset();
            self.file = None;
            truncated = true;
            if self.sink.send_reset(self.key).is_err() {
                return self.disconnected();
            }
        }
        self.cursor.last_size = len;
        self.file_id = id;
        self.state = TailState::Tailing;

        if len > self.cursor.offset {
            match self.read_new_bytes(len) {
                Ok(chunk) => {
                    self.last_error = None;
                    debug!(
                        source = %self.key.id,
                        offset = self.cursor.offset,
                        bytes = chunk.len(),
                        "read chunk"
                    );
                    self.cursor.offset += chunk.len() as u64;
                    self.cursor.carry.extend_from_slice(&chunk);
                    let (lines, accepted) = self.drain_lines();
                    outcome.lines = lines;
                    outcome.accepted = accepted;
                }
                Err(e) if is_transient(&e) => {}
                Err(e) => {
                    self.file = None;
                    self.report_error(&e);
                }
            }
        }

        if self.state == TailState::Stopped {
            outcome.state = TailState::Stopped;
        } else {
            outcome.state = if truncated {
                TailState::Truncated
            } else {
                self.state
            };
        }
        outcome
    }

    fn read_new_bytes(&mut self, len: u64) -> io::Result<Vec<u8>> {
        // Without a file identity a replaced file can only be caught by
        // reopening through the path every tick.
        if self.file.is_none() || self.file_id.is_none() {
            self.file = Some(File::open(&self.path)?);
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(Vec::new());
        };
        file.seek(SeekFrom::Start(self.cursor.offset))?;
        let mut buf = Vec::with_capacity((len - self.cursor.offset) as usize);
        file.take(len - self.cursor.offset).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Parse every complete line in the carry. Returns (lines, accepted).
    fn drain_lines(&mut self) -> (usize, usize) {
        let mut carry = std::mem::take(&mut self.cursor.carry);
        let mut lines = 0;
        let mut accepted = 0;
        take_lines(&mut carry, |raw| {
            if self.state == TailState::Stopped {
                return;
            }
            lines += 1;
            if self.handle_line(&String::from_utf8_lossy(raw)) {
                accepted += 1;
            }
        });
        self.cursor.carry = carry;
        (lines, accepted)
    }

    fn handle_line(&mut self, line: &str) -> bool {
        let fallback_time = self.cursor.line_index as f64 * self.static_dt;
        let outcome = self.parser.parse(line, fallback_time);
        match outcome {
            LineOutcome::Header | LineOutcome::Rejected(RejectReason::Empty) => return false,
            _ => self.cursor.line_index += 1,
        }
        match outcome {
            LineOutcome::Accepted(sample) => {
                let anchor = *self.cursor.anchor.get_or_insert(sample.time);
                let point = sample.rebase(anchor);
                if self.sink.send_sample(self.key, sample.channel, point).is_err() {
                    self.disconnected();
                    return false;
                }
                true
            }
            LineOutcome::Rejected(reason) => {
                trace!(source = %self.key.id, ?reason, line, "line rejected");
                false
            }
            LineOutcome::Header => false,
        }
    }

    /// Surface a read problem once until the message changes or a read succeeds.
    fn report_error(&mut self, err: &io::Error) {
        let message = err.to_string();
        if self.last_error.as_deref() == Some(message.as_str()) {
            return;
        }
        warn!(source = %self.key.id, path = %self.path.display(), error = %message, "read error");
        if self.sink.send_read_error(self.key, message.clone()).is_err() {
            self.disconnected();
            return;
        }
        self.last_error = Some(message);
    }

    fn disconnected(&mut self) -> PollOutcome {
        debug!(source = %self.key.id, "sink closed, stopping tailer");
        self.state = TailState::Stopped;
        PollOutcome {
            state: TailState::Stopped,
            lines: 0,
            accepted: 0,
        }
    }

    /// Poll until `stop` is set or the sink goes away, sleeping `interval`
    /// between ticks. Sends a stop notice on exit.
    pub fn run(&mut self, stop: &AtomicBool, interval: Duration) {
        info!(source = %self.key.id, path = %self.path.display(), "tailer started");
        while !stop.load(Ordering::Relaxed) {
            if self.poll_once().state == TailState::Stopped {
                break;
            }
            std::thread::sleep(interval);
        }
        self.state = TailState::Stopped;
        let _ = self.sink.send_stopped(self.key);
        info!(source = %self.key.id, "tailer stopped");
    }

    /// Move the tailer onto its own thread.
    pub fn spawn(mut self, interval: Duration) -> io::Result<TailerHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let key = self.key;
        let flag = stop.clone();
        let thread = std::thread::Builder::new()
            .name(format!("tail-{}", key.id))
            .spawn(move || self.run(&flag, interval))?;
        Ok(TailerHandle {
            key,
            stop,
            thread: Some(thread),
        })
    }
}

/// Device and inode of a file, where the platform exposes them.
type FileId = (u64, u64);

#[cfg(unix)]
fn file_id(meta: &Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_id(_meta: &Metadata) -> Option<FileId> {
    None
}

/// Errors worth a silent retry on the next tick.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
    )
}

/// Call `f` for each complete line in `carry` and drop the consumed bytes.
///
/// `\n`, `\r\n` and a lone `\r` terminate a line. A trailing `\r` stays in
/// the carry until the next byte shows whether a `\n` follows.
fn take_lines(carry: &mut Vec<u8>, mut f: impl FnMut(&[u8])) {
    let mut start = 0;
    let mut i = 0;
    while i < carry.len() {
        match carry[i] {
            b'\n' => {
                f(&carry[start..i]);
                start = i + 1;
            }
            b'\r' => {
                if i + 1 == carry.len() {
                    break;
                }
                f(&carry[start..i]);
                if carry[i + 1] == b'\n' {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    carry.drain(..start);
}

/// Owner side of a spawned tailer.
#[derive(Debug)]
pub struct TailerHandle {
    key: SourceKey,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TailerHandle {
    pub fn key(&self) -> SourceKey {
        self.key
    }

    /// Ask the tailer to exit at the top of its next tick. Repeated calls are
    /// no-ops.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop and wait for the thread to exit.
    pub fn join(mut self) {
        self.stop();
        if let Some(t) = self.thread.take() {
            if t.join().is_err() {
                warn!(source = %self.key.id, "tailer thread panicked");
            }
        }
    }
}

impl Drop for TailerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(mut carry: Vec<u8>) -> (Vec<String>, Vec<u8>) {
        let mut out = Vec::new();
        take_lines(&mut carry, |l| out.push(String::from_utf8_lossy(l).into_owned()));
        (out, carry)
    }

    #[test]
    fn splits_on_all_terminators() {
        let (lines, rest) = lines_of(b"a\nb\r\nc\rd".to_vec());
        assert_eq!(lines, vec!["a", "b", "c"]);
        assert_eq!(rest, b"d");
    }

    #[test]
    fn trailing_cr_waits_for_next_byte() {
        let (lines, rest) = lines_of(b"a\r".to_vec());
        assert!(lines.is_empty());
        assert_eq!(rest, b"a\r");
        let mut carry = rest;
        carry.extend_from_slice(b"\nb\n");
        let (lines, rest) = lines_of(carry);
        assert_eq!(lines, vec!["a", "b"]);
        assert!(rest.is_empty());
    }

    #[test]
    fn empty_lines_are_reported() {
        let (lines, _) = lines_of(b"\n\nx\n".to_vec());
        assert_eq!(lines, vec!["", "", "x"]);
    }

    #[test]
    fn read_errors_are_reported_once_per_message() {
        let (sink, rx) = crate::sink::channel();
        let key = SourceKey::next(crate::sink::SourceId::Primary);
        let mut tailer = SourceTailer::new(key, "unused.log", ValidationLimits::default(), 0.25, sink);

        let denied = io::Error::new(ErrorKind::PermissionDenied, "access denied");
        tailer.report_error(&denied);
        tailer.report_error(&denied);
        let busy = io::Error::new(ErrorKind::Other, "device busy");
        tailer.report_error(&busy);

        let messages: Vec<String> = rx
            .try_iter()
            .filter_map(|m| match m {
                crate::sink::IngestMessage::ReadError { message, .. } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(messages, vec!["access denied", "device busy"]);
        assert_eq!(tailer.state(), TailState::WaitingForFile);
    }

    #[test]
    fn cursor_reset_clears_everything() {
        let mut c = TailCursor {
            offset: 10,
            last_size: 10,
            carry: b"abc".to_vec(),
            anchor: Some(3.0),
            line_index: 4,
        };
        c.reset();
        assert_eq!(c, TailCursor::default());
    }
}
