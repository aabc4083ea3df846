//! Shared application service layer for daylightflow.
//!
//! The CLI calls into these services; each one loads its inputs, drives the
//! backend crates and writes its outputs.

pub mod error;
pub mod metrics_service;
pub mod model_service;
pub mod progress;
pub mod schedule_service;
pub mod simulate_service;
pub mod store_service;

pub use error::{AppError, AppResult};
pub use metrics_service::{MetricsRequest, compute_metrics};
pub use model_service::{ModelSummary, load_model, save_model, summarize_model, validate_model_file};
pub use progress::{HourProgress, RunProgressEvent, RunStage};
pub use schedule_service::{ScheduleRequest, write_dimming_schedules};
pub use simulate_service::{
    HourIssue, RUN_SUMMARY, RunSummary, RunTimingSummary, SimulateRequest, SimulateResponse,
    WEATHER_FILE, default_results_dir, run_simulation, run_simulation_with_progress,
};
pub use store_service::{StoreSummary, VariableSummary, import_series, summarize_store};
