//! Time intervals over which cred is accumulated.
//!
//! An [`Interval`] is half-open: `[start_time_ms, end_time_ms)`. An
//! [`Intervals`] sequence is validated once at construction to be non-empty,
//! strictly ascending and non-overlapping; after that it is immutable.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_WEEKLY_INTERVALS, MS_PER_WEEK};
use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
}

impl Interval {
    pub fn new(start_time_ms: i64, end_time_ms: i64) -> Self {
        Self { start_time_ms, end_time_ms }
    }

    pub fn contains(&self, timestamp_ms: i64) -> bool {
        self.start_time_ms <= timestamp_ms && timestamp_ms < self.end_time_ms
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_time_ms - self.start_time_ms
    }
}

/// A validated, ordered sequence of intervals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Interval>", into = "Vec<Interval>")]
pub struct Intervals(Vec<Interval>);

impl Intervals {
    /// Validate and wrap an interval sequence.
    ///
    /// Gaps between intervals are allowed; overlap and disorder are not.
    pub fn new(intervals: Vec<Interval>) -> Result<Self, ConfigError> {
        if intervals.is_empty() {
            return Err(ConfigError::NoIntervals);
        }
        for (index, iv) in intervals.iter().enumerate() {
            if iv.end_time_ms <= iv.start_time_ms {
                return Err(ConfigError::EmptyInterval {
                    index,
                    start: iv.start_time_ms,
                    end: iv.end_time_ms,
                });
            }
            if index > 0 && iv.start_time_ms < intervals[index - 1].end_time_ms {
                return Err(ConfigError::UnorderedIntervals { index });
            }
        }
        Ok(Self(intervals))
    }

    /// Contiguous week-aligned intervals covering every timestamp.
    ///
    /// Weeks are aligned to the Unix epoch. Weeks between the first and the
    /// last timestamp are included even when no timestamp falls in them.
    pub fn weekly<I: IntoIterator<Item = i64>>(timestamps: I) -> Result<Self, ConfigError> {
        let mut bounds: Option<(i64, i64)> = None;
        for ts in timestamps {
            let week = ts.div_euclid(MS_PER_WEEK);
            bounds = Some(match bounds {
                None => (week, week),
                Some((lo, hi)) => (lo.min(week), hi.max(week)),
            });
        }
        let (first, last) = bounds.ok_or(ConfigError::NoIntervals)?;
        let too_large = ConfigError::WeeklyRangeTooLarge { first, last };
        if last - first >= MAX_WEEKLY_INTERVALS {
            return Err(too_large);
        }
        let intervals = (first..=last)
            .map(|w| {
                let start = w.checked_mul(MS_PER_WEEK)?;
                let end = w.checked_add(1)?.checked_mul(MS_PER_WEEK)?;
                Some(Interval::new(start, end))
            })
            .collect::<Option<Vec<_>>>()
            .ok_or(too_large)?;
        Self::new(intervals)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed sequence; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Interval> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.0
    }

    /// Index of the interval containing `timestamp_ms`, if any.
    pub fn interval_containing(&self, timestamp_ms: i64) -> Option<usize> {
        // First interval whose end is past the timestamp.
        let idx = self.0.partition_point(|iv| iv.end_time_ms <= timestamp_ms);
        self.0
            .get(idx)
            .filter(|iv| iv.contains(timestamp_ms))
            .map(|_| idx)
    }
}

impl TryFrom<Vec<Interval>> for Intervals {
    type Error = ConfigError;

    fn try_from(intervals: Vec<Interval>) -> Result<Self, Self::Error> {
        Self::new(intervals)
    }
}

impl From<Intervals> for Vec<Interval> {
    fn from(intervals: Intervals) -> Self {
        intervals.0
    }
}

impl<'a> IntoIterator for &'a Intervals {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
