//! Error types for simulation operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("External tool error: {0}")]
    ExternalTool(#[from] dl_radiance::RadianceError),

    #[error("Missing time series: {key} / {name}")]
    MissingTimeSeries { key: String, name: String },

    #[error("Configuration error: {what}")]
    Configuration { what: String },

    #[error("Expected {expected} values from {what}, got {got}")]
    PointCount {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("Hour worker panicked: {0}")]
    WorkerPanic(String),

    #[error("Results error: {0}")]
    Results(#[from] dl_results::ResultsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] dl_core::DlError),
}

pub type SimResult<T> = Result<T, SimError>;
