//! dl-results: time-series storage and the flat result files.

pub mod hash;
pub mod ill;
pub mod import;
pub mod store;
pub mod types;

pub use hash::compute_run_id;
pub use import::import_csv;
pub use store::ResultsStore;
pub use types::*;

use std::path::PathBuf;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Results store not found: {path}")]
    StoreNotFound { path: PathBuf },

    #[error("Refusing to replace {path}: not empty and not a results store")]
    NotAStore { path: PathBuf },

    #[error("Series already stored: {key} / {name}")]
    DuplicateSeries { key: String, name: String },

    #[error("Import error at line {line}: {reason}")]
    Import { line: usize, reason: String },

    #[error("Result file {path}: {reason}")]
    FileFormat { path: PathBuf, reason: String },

    #[error(transparent)]
    Core(#[from] dl_core::DlError),
}
