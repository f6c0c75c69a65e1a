//! Bounded per-channel sample storage and detached snapshots.

use std::collections::VecDeque;

use crate::data::sample::{Channel, Quantity, SeriesPoint};

/// Bounded, insertion-ordered series of one channel. The oldest point is
/// evicted when a push would exceed the capacity.
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    points: VecDeque<SeriesPoint>,
    capacity: usize,
}

impl SeriesBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::new(),
            capacity,
        }
    }

    /// Append a point. Returns `true` if an old point was evicted.
    pub fn push(&mut self, point: SeriesPoint) -> bool {
        let evicted = if self.points.len() >= self.capacity {
            self.points.pop_front();
            true
        } else {
            false
        };
        self.points.push_back(point);
        evicted
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.front()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> + '_ {
        self.points.iter()
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        let mut snap = SeriesSnapshot::with_capacity(self.points.len());
        for p in &self.points {
            snap.push(*p);
        }
        snap
    }
}

/// Both channels of one source.
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    channels: [SeriesBuffer; 2],
}

impl StreamBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: [
                SeriesBuffer::with_capacity(capacity),
                SeriesBuffer::with_capacity(capacity),
            ],
        }
    }

    /// Rebuild a buffer from a snapshot, keeping only the newest `capacity`
    /// points per channel.
    pub fn from_snapshot(snapshot: &BufferSnapshot, capacity: usize) -> Self {
        let mut buf = Self::with_capacity(capacity);
        for channel in Channel::ALL {
            for p in snapshot.channel(channel).points() {
                buf.push(channel, p);
            }
        }
        buf
    }

    pub fn push(&mut self, channel: Channel, point: SeriesPoint) -> bool {
        self.channels[channel.index()].push(point)
    }

    pub fn series(&self, channel: Channel) -> &SeriesBuffer {
        &self.channels[channel.index()]
    }

    pub fn len(&self, channel: Channel) -> usize {
        self.series(channel).len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(SeriesBuffer::is_empty)
    }

    pub fn capacity(&self) -> usize {
        self.channels[0].capacity()
    }

    pub fn clear(&mut self) {
        for ch in self.channels.iter_mut() {
            ch.clear();
        }
    }

    /// Largest relative time currently held by either channel.
    pub fn latest_time(&self) -> Option<f64> {
        self.channels
            .iter()
            .filter_map(|c| c.last().map(|p| p.t))
            .reduce(f64::max)
    }

    /// Copy the current contents out for reading.
    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            inlet: self.channels[0].snapshot(),
            outlet: self.channels[1].snapshot(),
        }
    }
}

/// Immutable copy of one channel as parallel vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSnapshot {
    pub t: Vec<f64>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
}

impl SeriesSnapshot {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            t: Vec::with_capacity(n),
            temperature: Vec::with_capacity(n),
            humidity: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, p: SeriesPoint) {
        self.t.push(p.t);
        self.temperature.push(p.temperature);
        self.humidity.push(p.humidity);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn quantity(&self, q: Quantity) -> &[f64] {
        match q {
            Quantity::Temperature => &self.temperature,
            Quantity::Humidity => &self.humidity,
        }
    }

    pub fn points(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        self.t
            .iter()
            .zip(&self.temperature)
            .zip(&self.humidity)
            .map(|((&t, &temperature), &humidity)| SeriesPoint {
                t,
                temperature,
                humidity,
            })
    }
}

/// Immutable copy of a whole [`StreamBuffer`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferSnapshot {
    pub inlet: SeriesSnapshot,
    pub outlet: SeriesSnapshot,
}

impl BufferSnapshot {
    pub fn channel(&self, channel: Channel) -> &SeriesSnapshot {
        match channel {
            Channel::Inlet => &self.inlet,
            Channel::Outlet => &self.outlet,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut SeriesSnapshot {
        match channel {
            Channel::Inlet => &mut self.inlet,
            Channel::Outlet => &mut self.outlet,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inlet.is_empty() && self.outlet.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inlet.len() + self.outlet.len()
    }
}
