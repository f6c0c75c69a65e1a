//! Line parser: raw log line → validated [`Sample`] or a rejection.
//!
//! Recognized inputs, tried in order:
//! - delimited records `row,time,SensorN,temp,hum`, `time,SensorN,temp,hum`
//!   and `SensorN,temp,hum` (the latter takes its time from the caller),
//! - free text `<token> MM:SS.mmm , SensorN , temp , hum`,
//! - the header row `TS,Sensor,TempC,RH`, which is skipped.
//!
//! Accepted samples pass a range check and a step check against the previous
//! accepted value of the same channel. The step state lives in the parser, so
//! each source owns its own `LineParser`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ValidationLimits;
use crate::data::sample::{Channel, Reading, Sample};
use crate::data::time_format::parse_mmss_mmm;

const HEADER_FIELDS: [&str; 4] = ["TS", "Sensor", "TempC", "RH"];

static FREE_TEXT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*\S+\s+(?P<m>\d+):(?P<s>\d+)\.(?P<ms>\d+)\s*,\s*(?P<sensor>[Ss]ensor\s*[12])\s*,\s*(?P<temp>-?\d+(?:\.\d+)?)\s*,\s*(?P<rh>-?\d+(?:\.\d+)?)\s*$",
    )
    .expect("free-text line pattern is valid")
});

/// Why a line produced no sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    Malformed,
    OutOfRange,
    StepExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineOutcome {
    Accepted(Sample),
    /// The column header row; not an error.
    Header,
    Rejected(RejectReason),
}

impl LineOutcome {
    pub fn sample(self) -> Option<Sample> {
        match self {
            LineOutcome::Accepted(s) => Some(s),
            _ => None,
        }
    }
}

/// Stateful parser for one source.
#[derive(Debug, Clone)]
pub struct LineParser {
    limits: ValidationLimits,
    last_good: [Option<Reading>; 2],
}

impl LineParser {
    pub fn new(limits: ValidationLimits) -> Self {
        Self {
            limits,
            last_good: [None, None],
        }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Last accepted reading on `channel`, if any.
    pub fn last_good(&self, channel: Channel) -> Option<Reading> {
        self.last_good[channel.index()]
    }

    /// Forget all step-validation state.
    pub fn reset(&mut self) {
        self.last_good = [None, None];
    }

    /// Parse and validate one line (without its terminator).
    ///
    /// `fallback_time` is used for delimited records that carry no time field.
    pub fn parse(&mut self, line: &str, fallback_time: f64) -> LineOutcome {
        let line = line.trim();
        if line.is_empty() {
            return LineOutcome::Rejected(RejectReason::Empty);
        }
        if is_header(line) {
            return LineOutcome::Header;
        }
        let Some(sample) = decode_delimited(line, fallback_time).or_else(|| decode_free_text(line))
        else {
            return LineOutcome::Rejected(RejectReason::Malformed);
        };
        self.validate(sample)
    }

    fn validate(&mut self, sample: Sample) -> LineOutcome {
        if !self.limits.in_range(sample.temperature, sample.humidity) {
            return LineOutcome::Rejected(RejectReason::OutOfRange);
        }
        let slot = &mut self.last_good[sample.channel.index()];
        if let Some(prev) = slot {
            let temp_jump = self
                .limits
                .max_temp_step_c
                .is_some_and(|max| (sample.temperature - prev.temperature).abs() > max);
            let hum_jump = self
                .limits
                .max_hum_step_pct
                .is_some_and(|max| (sample.humidity - prev.humidity).abs() > max);
            if temp_jump || hum_jump {
                return LineOutcome::Rejected(RejectReason::StepExceeded);
            }
        }
        *slot = Some(sample.reading());
        LineOutcome::Accepted(sample)
    }
}

fn is_header(line: &str) -> bool {
    let mut fields = line.split(',').map(str::trim);
    HEADER_FIELDS.iter().all(|h| fields.next() == Some(*h)) && fields.next().is_none()
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Time field of a delimited record: plain seconds or `MM:SS.mmm`.
fn parse_time_field(s: &str) -> Option<f64> {
    parse_finite(s).or_else(|| parse_mmss_mmm(s))
}

fn decode_delimited(line: &str, fallback_time: f64) -> Option<Sample> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let (time, rest) = match fields.len() {
        5 => (parse_time_field(fields[1])?, &fields[2..]),
        4 => (parse_time_field(fields[0])?, &fields[1..]),
        3 => (fallback_time, &fields[..]),
        _ => return None,
    };
    let channel = Channel::from_label(rest[0])?;
    Some(Sample {
        time,
        channel,
        temperature: parse_finite(rest[1])?,
        humidity: parse_finite(rest[2])?,
    })
}

fn decode_free_text(line: &str) -> Option<Sample> {
    let caps = FREE_TEXT_LINE.captures(line)?;
    let minutes: u64 = caps["m"].parse().ok()?;
    let seconds: u64 = caps["s"].parse().ok()?;
    let millis: u64 = caps["ms"].parse().ok()?;
    Some(Sample {
        time: minutes as f64 * 60.0 + seconds as f64 + millis as f64 / 1000.0,
        channel: Channel::from_label(&caps["sensor"])?,
        temperature: caps["temp"].parse().ok()?,
        humidity: caps["rh"].parse().ok()?,
    })
}
