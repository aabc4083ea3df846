//! Hourly time series.

use crate::{DlError, DlResult};
use chrono::{Datelike, Duration, NaiveDateTime, Timelike};

/// Ordered `(timestamp, value)` pairs. Timestamps mark the end of each reporting interval.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
    units: String,
}

impl TimeSeries {
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        values: Vec<f64>,
        units: impl Into<String>,
    ) -> DlResult<Self> {
        if timestamps.len() != values.len() {
            return Err(DlError::LengthMismatch {
                what: "time series values",
                expected: timestamps.len(),
                got: values.len(),
            });
        }
        if let Some(index) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(DlError::UnorderedTimestamps { index: index + 1 });
        }
        Ok(Self {
            timestamps,
            values,
            units: units.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    /// Value recorded at exactly `timestamp`.
    pub fn value_at(&self, timestamp: NaiveDateTime) -> Option<f64> {
        self.timestamps
            .binary_search(&timestamp)
            .ok()
            .map(|i| self.values[i])
    }
}

/// Zero-based hour-of-year index for an end-of-interval timestamp.
///
/// `01:00` on January 1st closes the first hour and maps to 0; midnight closing
/// December 31st maps to the last hour of the year.
pub fn hour_of_year(end_of_interval: NaiveDateTime) -> usize {
    let start = end_of_interval - Duration::hours(1);
    (start.ordinal0() as usize) * 24 + start.hour() as usize
}
