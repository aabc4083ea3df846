//! Result data types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreManifest {
    pub run_id: RunId,
    pub model_name: String,
    pub timestamp: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportingFrequency {
    Hourly,
    Daily,
    Monthly,
    RunPeriod,
}

impl ReportingFrequency {
    pub fn label(self) -> &'static str {
        match self {
            ReportingFrequency::Hourly => "Hourly",
            ReportingFrequency::Daily => "Daily",
            ReportingFrequency::Monthly => "Monthly",
            ReportingFrequency::RunPeriod => "RunPeriod",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "hourly" => Some(ReportingFrequency::Hourly),
            "daily" => Some(ReportingFrequency::Daily),
            "monthly" => Some(ReportingFrequency::Monthly),
            "runperiod" => Some(ReportingFrequency::RunPeriod),
            _ => None,
        }
    }
}

/// One entry of `report_variables.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariableRecord {
    pub id: usize,
    pub key: String,
    pub name: String,
    pub frequency: ReportingFrequency,
    pub units: String,
}

impl VariableRecord {
    /// Keys compare case-insensitively, names exactly.
    pub fn matches(&self, key: &str, name: &str, frequency: ReportingFrequency) -> bool {
        self.key.eq_ignore_ascii_case(key) && self.name == name && self.frequency == frequency
    }
}

/// One line of `report_data.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub variable_id: usize,
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

/// Per-timestep illuminance grids of one space.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IlluminanceMapRecord {
    /// `<space> DAYLIGHT MAP`
    pub name: String,
    pub space: String,
    pub z: f64,
    pub x_coords: Vec<f64>,
    pub y_coords: Vec<f64>,
    pub timestamps: Vec<NaiveDateTime>,
    /// Row-major `x_points * y_points` values per timestep.
    pub grids: Vec<Vec<f64>>,
}

impl IlluminanceMapRecord {
    pub fn grid_at(&self, timestamp: NaiveDateTime) -> Option<&[f64]> {
        self.timestamps
            .binary_search(&timestamp)
            .ok()
            .and_then(|i| self.grids.get(i))
            .map(Vec::as_slice)
    }
}
