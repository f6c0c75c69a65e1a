//! Formatting of source-relative seconds as `MM:SS` / `MM:SS.mmm`.
//!
//! Minutes are not wrapped into hours: a two-hour log reads `120:00.000`.

use once_cell::sync::Lazy;
use regex::Regex;

static MMSS_MMM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+):(\d+)\.(\d+)\s*$").expect("timestamp pattern is valid"));

/// Representation error guard applied before truncating to milliseconds, so
/// that e.g. `0.35 - 0.1` still renders as `.250`.
const MS_EPSILON: f64 = 1e-6;

fn whole_millis(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0 + MS_EPSILON).floor() as u64
}

/// Export timestamp: zero-padded minutes and seconds, three-digit
/// milliseconds, truncated to whole milliseconds. Negative input clamps to 0.
pub fn format_mmss_mmm(seconds: f64) -> String {
    let total_ms = whole_millis(seconds);
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    format!("{:02}:{:02}.{:03}", total_s / 60, total_s % 60, ms)
}

/// Axis tick label with whole seconds.
pub fn format_mmss(seconds: f64) -> String {
    let total_s = whole_millis(seconds) / 1000;
    format!("{:02}:{:02}", total_s / 60, total_s % 60)
}

/// Parse `M:S.mmm` as written by [`format_mmss_mmm`]. The fractional digits
/// are read as a millisecond count, as the logger writes them.
pub fn parse_mmss_mmm(text: &str) -> Option<f64> {
    let caps = MMSS_MMM.captures(text)?;
    let m: u64 = caps[1].parse().ok()?;
    let s: u64 = caps[2].parse().ok()?;
    let ms: u64 = caps[3].parse().ok()?;
    Some(m as f64 * 60.0 + s as f64 + ms as f64 / 1000.0)
}
