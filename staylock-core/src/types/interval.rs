use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected interval bounds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("invalid interval: start {start} is not before end {end}")]
    NotIncreasing { start: NaiveDate, end: NaiveDate },
}

/// A half-open date range `[start, end)`.
///
/// `end` is exclusive, so a check-out date equal to another stay's check-in
/// date does not overlap it. Ordering is lexicographic on `(start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Interval {
    start: NaiveDate,
    end: NaiveDate,
}

impl Interval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, IntervalError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(IntervalError::NotIncreasing { start, end })
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of nights covered
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Half-open overlap: `a.start < b.end && b.start < a.end`.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// Deserialization goes through `new` so a decoded interval is always valid.
impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            start: NaiveDate,
            end: NaiveDate,
        }

        let raw = Raw::deserialize(deserializer)?;
        Interval::new(raw.start, raw.end).map_err(serde::de::Error::custom)
    }
}
