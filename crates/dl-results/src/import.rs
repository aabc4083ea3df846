//! Hourly CSV import into a results store.
//!
//! Header: `month,day,hour,<Key>:<Variable Name> [unit](Hourly),...`. Hours are
//! hour-ending (1..=24). Empty cells are left out of the series.

use crate::store::ResultsStore;
use crate::types::ReportingFrequency;
use crate::{ResultsError, ResultsResult};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use dl_core::TimeSeries;
use std::path::Path;
use tracing::{info, warn};

/// Non-leap year used for series timestamps.
pub const SERIES_YEAR: i32 = 2009;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub key: String,
    pub name: String,
    pub units: String,
    pub frequency: ReportingFrequency,
}

impl ColumnSpec {
    /// Parses `Key:Variable Name [unit](Frequency)`; unit and frequency are optional.
    pub fn parse(header: &str) -> Option<Self> {
        let (key, rest) = header.trim().rsplit_once(':')?;
        let (rest, frequency) = match rest.trim_end().strip_suffix(')') {
            Some(inner) => {
                let (rest, freq) = inner.rsplit_once('(')?;
                (rest, ReportingFrequency::parse(freq)?)
            }
            None => (rest, ReportingFrequency::Hourly),
        };
        let (name, units) = match rest.trim_end().strip_suffix(']') {
            Some(inner) => {
                let (name, units) = inner.rsplit_once('[')?;
                (name, units.trim())
            }
            None => (rest, ""),
        };
        let key = key.trim();
        let name = name.trim();
        if key.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            name: name.to_string(),
            units: units.to_string(),
            frequency,
        })
    }
}

/// End-of-interval timestamp for an hour-ending row.
pub fn interval_end(year: i32, month: u32, day: u32, hour: u32) -> Option<NaiveDateTime> {
    if !(1..=24).contains(&hour) {
        return None;
    }
    let midnight = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    Some(midnight + Duration::hours(i64::from(hour)))
}

/// Reads `csv_path` and adds every column to `store`. Returns the number of series.
pub fn import_csv(csv_path: &Path, year: i32, store: &mut ResultsStore) -> ResultsResult<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;

    let headers = reader.headers()?.clone();
    if headers.len() < 4 {
        return Err(ResultsError::Import {
            line: 1,
            reason: "expected month, day, hour and at least one series column".to_string(),
        });
    }
    let columns = headers
        .iter()
        .skip(3)
        .map(|h| {
            ColumnSpec::parse(h).ok_or_else(|| ResultsError::Import {
                line: 1,
                reason: format!("cannot parse column header '{h}'"),
            })
        })
        .collect::<ResultsResult<Vec<_>>>()?;

    let mut data: Vec<(Vec<NaiveDateTime>, Vec<f64>)> = vec![(Vec::new(), Vec::new()); columns.len()];
    let mut skipped = 0usize;
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;
        let field = |idx: usize| -> ResultsResult<u32> {
            record
                .get(idx)
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| ResultsError::Import {
                    line,
                    reason: format!("invalid date field {}", idx + 1),
                })
        };
        let timestamp =
            interval_end(year, field(0)?, field(1)?, field(2)?).ok_or_else(|| ResultsError::Import {
                line,
                reason: "month/day/hour out of range".to_string(),
            })?;

        for (col, (timestamps, values)) in data.iter_mut().enumerate() {
            let cell = record.get(col + 3).unwrap_or("");
            if cell.is_empty() {
                skipped += 1;
                continue;
            }
            let value: f64 = cell.parse().map_err(|_| ResultsError::Import {
                line,
                reason: format!("'{cell}' is not a number"),
            })?;
            timestamps.push(timestamp);
            values.push(value);
        }
    }

    if skipped > 0 {
        warn!(cells = skipped, file = %csv_path.display(), "empty cells left out of imported series");
    }
    let count = columns.len();
    for (spec, (timestamps, values)) in columns.into_iter().zip(data) {
        let series = TimeSeries::new(timestamps, values, spec.units)?;
        store.insert_time_series(&spec.key, &spec.name, spec.frequency, series)?;
    }
    info!(series = count, file = %csv_path.display(), "imported series");
    Ok(count)
}
