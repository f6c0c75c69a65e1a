//! Value types flowing from the parser to the buffers.

use std::fmt;

/// One of the two physical sensor positions of a source.
///
/// `Sensor1` in a log maps to [`Channel::Inlet`], `Sensor2` to [`Channel::Outlet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Inlet,
    Outlet,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Inlet, Channel::Outlet];

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Channel::Inlet => 0,
            Channel::Outlet => 1,
        }
    }

    /// Interpret a channel label such as `Sensor1`, `sensor 2` or `SENSOR1`.
    pub fn from_label(label: &str) -> Option<Channel> {
        let compact: String = label.chars().filter(|c| !c.is_whitespace()).collect();
        if !compact.to_ascii_lowercase().contains("sensor") {
            return None;
        }
        if compact.ends_with('1') {
            Some(Channel::Inlet)
        } else if compact.ends_with('2') {
            Some(Channel::Outlet)
        } else {
            None
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Inlet => write!(f, "inlet"),
            Channel::Outlet => write!(f, "outlet"),
        }
    }
}

/// Which quantity of a channel a series refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Temperature,
    Humidity,
}

/// A temperature/humidity pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
}

/// A validated sample as produced by the line parser. `time` is the absolute
/// time found in the log line, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub channel: Channel,
    pub temperature: f64,
    pub humidity: f64,
}

impl Sample {
    pub fn reading(&self) -> Reading {
        Reading {
            temperature: self.temperature,
            humidity: self.humidity,
        }
    }

    /// Convert into a buffer point relative to `anchor`.
    pub fn rebase(&self, anchor: f64) -> SeriesPoint {
        SeriesPoint {
            t: self.time - anchor,
            temperature: self.temperature,
            humidity: self.humidity,
        }
    }
}

/// One entry of a channel series, time relative to the source anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub t: f64,
    pub temperature: f64,
    pub humidity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_to_channels() {
        assert_eq!(Channel::from_label("Sensor1"), Some(Channel::Inlet));
        assert_eq!(Channel::from_label("Sensor 2"), Some(Channel::Outlet));
        assert_eq!(Channel::from_label("SENSOR1"), Some(Channel::Inlet));
        assert_eq!(Channel::from_label("my_sensor_2"), Some(Channel::Outlet));
        assert_eq!(Channel::from_label("Sensor3"), None);
        assert_eq!(Channel::from_label("Probe1"), None);
    }
}
