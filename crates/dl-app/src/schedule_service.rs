//! Dimming schedule synthesis and model rewrite.

use dl_lighting::{ScheduleSynthesis, apply_schedules, synthesize_schedules};
use dl_results::ResultsStore;
use std::path::Path;

use crate::error::AppResult;
use crate::model_service;

pub struct ScheduleRequest<'a> {
    pub model_path: &'a Path,
    pub results_dir: &'a Path,
    pub output_model: &'a Path,
}

/// Writes a copy of the model whose daylit spaces carry dimmed lights.
pub fn write_dimming_schedules(request: &ScheduleRequest) -> AppResult<ScheduleSynthesis> {
    let model = model_service::load_model(request.model_path)?;
    let results = ResultsStore::open(request.results_dir)?;

    let synthesis = synthesize_schedules(&model, &results)?;
    let rewritten = apply_schedules(&model, &synthesis.schedules)?;
    model_service::save_model(request.output_model, &rewritten)?;
    Ok(synthesis)
}
