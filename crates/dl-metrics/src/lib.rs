//! dl-metrics: annual daylighting metrics.
//!
//! Daylight Autonomy, continuous DA and Useful Daylight Illuminance per space,
//! each under three hour masks, plus a building-level DA average.

pub mod calc;
pub mod inputs;
pub mod report;

pub use calc::{Mask, Metric, MetricTriple, SpaceMetrics, building_average, compute_space_metrics};
pub use inputs::{GatheredInputs, MetricsConfig, OCCUPANT_COUNT, SpaceInput, gather_inputs};
pub use report::{MetricsReport, compute_report, write_csv};

pub type MetricsResult<T> = Result<T, MetricsError>;

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("Missing time series: {key} / {name}")]
    MissingTimeSeries { key: String, name: String },

    #[error("Configuration error: {what}")]
    Configuration { what: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Results error: {0}")]
    Results(#[from] dl_results::ResultsError),
}
