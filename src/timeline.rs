//! Per-citation event timelines built from coarse (typically yearly) citation counts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WsbError};

/// Length of one coarse interval, in days.
pub const DAYS_PER_INTERVAL: f64 = 365.0;

/// A single citation: when it happened and its 1-based rank in the series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CitationEvent {
    /// Days since publication (or first record). Strictly positive.
    pub timestamp: f64,
    /// 1-based position of this citation within the whole timeline.
    pub cumulative_index: usize,
}

/// Ordered, immutable sequence of citation events.
///
/// The natural log of every timestamp is cached at construction because every
/// Newton-Raphson iteration needs it.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    events: Vec<CitationEvent>,
    log_times: Vec<f64>,
}

impl Timeline {
    /// Creates a timeline from explicit events after checking the ordering invariants.
    pub fn new(events: Vec<CitationEvent>) -> Result<Self> {
        let mut previous = 0.0_f64;
        for (index, event) in events.iter().enumerate() {
            if !event.timestamp.is_finite() || event.timestamp <= 0.0 {
                return Err(WsbError::invalid_timeline(
                    index,
                    "timestamp must be finite and strictly positive",
                ));
            }
            if event.timestamp < previous {
                return Err(WsbError::invalid_timeline(
                    index,
                    "timestamps must be non-decreasing",
                ));
            }
            if event.cumulative_index != index + 1 {
                return Err(WsbError::invalid_timeline(
                    index,
                    "cumulative index must equal the 1-based position",
                ));
            }
            previous = event.timestamp;
        }
        Ok(Self::from_validated(events))
    }

    /// Convenience constructor from bare timestamps; ranks are assigned in order.
    pub fn from_timestamps<I>(timestamps: I) -> Result<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let events = timestamps
            .into_iter()
            .enumerate()
            .map(|(offset, timestamp)| CitationEvent {
                timestamp,
                cumulative_index: offset + 1,
            })
            .collect();
        Self::new(events)
    }

    fn from_validated(events: Vec<CitationEvent>) -> Self {
        let log_times = events.iter().map(|event| event.timestamp.ln()).collect();
        Self { events, log_times }
    }

    /// Total number of citations `n`.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the timeline holds no citations.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Fewer than two citations: the estimator is defined but carries no information.
    pub fn is_degenerate(&self) -> bool {
        self.events.len() < 2
    }

    /// Read-only view of the events.
    pub fn events(&self) -> &[CitationEvent] {
        &self.events
    }

    /// Natural log of every timestamp, in event order.
    pub fn log_times(&self) -> &[f64] {
        &self.log_times
    }

    /// Timestamp of the last citation (the reference time `t`), if any.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.events.last().map(|event| event.timestamp)
    }

    /// Reconstructs citation counts per coarse interval.
    ///
    /// The last citation of an interval sits exactly on the interval's upper
    /// boundary, so the interval of a timestamp is `ceil(ts / 365) - 1`.
    pub fn interval_counts(&self) -> Vec<u64> {
        let mut counts: Vec<u64> = Vec::new();
        for event in &self.events {
            let interval = ((event.timestamp / DAYS_PER_INTERVAL).ceil() as usize).saturating_sub(1);
            if counts.len() <= interval {
                counts.resize(interval + 1, 0);
            }
            counts[interval] += 1;
        }
        counts
    }
}

/// Builder that spreads coarse interval counts into a per-citation [`Timeline`].
#[derive(Clone, Debug)]
pub struct TimelineBuilder {
    series: Vec<(usize, u64)>,
    row_limit: usize,
}

impl TimelineBuilder {
    /// Start building from ordered `(interval_index, citation_count)` pairs.
    pub fn new(series: Vec<(usize, u64)>) -> Self {
        Self {
            series,
            row_limit: 0,
        }
    }

    /// Start building from counts whose interval index is their position.
    pub fn from_counts(counts: &[u64]) -> Self {
        Self::new(counts.iter().copied().enumerate().collect())
    }

    /// Only read the first `limit` intervals; `0` reads them all.
    pub fn row_limit(mut self, limit: usize) -> Self {
        self.row_limit = limit;
        self
    }

    /// Finalizes construction.
    ///
    /// Citation `j` of `k` in interval `i` lands at `365 * (i + j / k)` days, so
    /// citations are spread evenly and never sit on the interval's start. An
    /// all-zero window yields an empty timeline rather than an error.
    pub fn build(self) -> Result<Timeline> {
        let rows = if self.row_limit > 0 {
            self.row_limit.min(self.series.len())
        } else {
            self.series.len()
        };
        let window = &self.series[..rows];

        for (position, pair) in window.windows(2).enumerate() {
            let (previous, found) = (pair[0].0, pair[1].0);
            if found <= previous {
                return Err(WsbError::UnorderedIntervals {
                    position: position + 1,
                    previous,
                    found,
                });
            }
        }

        let total: u64 = window.iter().map(|&(_, count)| count).sum();
        let mut events = Vec::with_capacity(total as usize);

        for &(interval, count) in window {
            let k = count as f64;
            for j in 1..=count {
                let timestamp = DAYS_PER_INTERVAL * (interval as f64 + j as f64 / k);
                events.push(CitationEvent {
                    timestamp,
                    cumulative_index: events.len() + 1,
                });
            }
        }

        Ok(Timeline::from_validated(events))
    }
}
