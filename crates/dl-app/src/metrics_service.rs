//! Daylighting metrics report.

use dl_metrics::{MetricsConfig, MetricsReport, compute_report, gather_inputs, write_csv};
use dl_results::ResultsStore;
use std::path::Path;

use crate::error::AppResult;
use crate::model_service;

pub struct MetricsRequest<'a> {
    pub model_path: &'a Path,
    pub results_dir: &'a Path,
    pub source_dir: &'a Path,
    pub output_csv: &'a Path,
    pub config: MetricsConfig,
}

/// Scores every simulated space and writes the CSV report.
pub fn compute_metrics(request: &MetricsRequest) -> AppResult<MetricsReport> {
    let model = model_service::load_model(request.model_path)?;
    let results = ResultsStore::open(request.results_dir)?;
    let source = ResultsStore::open(request.source_dir)?;

    let inputs = gather_inputs(&model, &results, &source, &request.config)?;
    let report = compute_report(&inputs);
    write_csv(request.output_csv, &report)?;
    Ok(report)
}
