//! Error types for the dl-app service layer.

use std::path::PathBuf;

/// Wraps the backend crate errors for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Model error: {0}")]
    Model(String),

    #[error("Failed to read model file: {path}")]
    ModelFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Model validation failed: {0}")]
    Validation(String),

    #[error("Radiance error: {0}")]
    Radiance(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Lighting schedule error: {0}")]
    Lighting(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<dl_model::ModelError> for AppError {
    fn from(err: dl_model::ModelError) -> Self {
        match err {
            dl_model::ModelError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Model(other.to_string()),
        }
    }
}

impl From<dl_model::ValidationError> for AppError {
    fn from(err: dl_model::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<dl_radiance::RadianceError> for AppError {
    fn from(err: dl_radiance::RadianceError) -> Self {
        AppError::Radiance(err.to_string())
    }
}

impl From<dl_sim::SimError> for AppError {
    fn from(err: dl_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<dl_results::ResultsError> for AppError {
    fn from(err: dl_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}

impl From<dl_metrics::MetricsError> for AppError {
    fn from(err: dl_metrics::MetricsError) -> Self {
        AppError::Metrics(err.to_string())
    }
}

impl From<dl_lighting::LightingError> for AppError {
    fn from(err: dl_lighting::LightingError) -> Self {
        AppError::Lighting(err.to_string())
    }
}

impl From<dl_core::DlError> for AppError {
    fn from(err: dl_core::DlError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}
