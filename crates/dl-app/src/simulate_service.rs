//! Annual simulation service.
//!
//! Drives one run end to end: model and source series, point merging, sky and
//! coefficient matrices, the hourly worker pool, state merging, aggregation and
//! the results store. The store and the run summary are written by this thread
//! only, after every hour has been collected.

use chrono::Utc;
use dl_core::{standard_meridian, to_degrees};
use dl_radiance::coefficients::SINGLE_PHASE_DMX;
use dl_radiance::env::check_available;
use dl_radiance::{
    CoefficientBuilder, CoefficientOptions, PointLayout, SiteLocation, SkyMatrixGenerator,
    ThreePhasePaths, ToolRunner, load_coefficients,
};
use dl_results::{ResultsStore, StoreManifest, compute_run_id};
use dl_sim::{
    Aggregator, HourContext, HourOutcome, HourStatus, MergedHour, PhaseInputs, SimulationConfig,
    SimulationMethod, SkyMode, SkySource, SolarSeries, available_cores, build_time_axis,
    check_layout, merge_hour, resolve_worker_count, schedule_hours, select_spaces, window_groups,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::model_service;
use crate::progress::{HourProgress, RunProgressEvent, RunStage};

/// Annual weather file inside the radiance directory.
pub const WEATHER_FILE: &str = "in.wea";
pub const RUN_SUMMARY: &str = "output/run_summary.json";
const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn default_results_dir(radiance_dir: &Path) -> PathBuf {
    radiance_dir.join("output/radout")
}

/// Rejects a results directory that would overwrite the source series or
/// files that are not a results store.
fn check_results_dir(results_dir: &Path, source_dir: &Path) -> AppResult<()> {
    let resolve = |p: &Path| p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
    if resolve(source_dir).starts_with(resolve(results_dir)) {
        return Err(AppError::InvalidInput(format!(
            "Results directory {} would replace the source store {}",
            results_dir.display(),
            source_dir.display()
        )));
    }
    ResultsStore::check_replaceable(results_dir)?;
    Ok(())
}

pub struct SimulateRequest<'a> {
    pub model_path: &'a Path,
    pub source_dir: &'a Path,
    /// Defaults to `output/radout` inside the radiance directory.
    pub results_dir: Option<&'a Path>,
    pub config: &'a SimulationConfig,
    pub runner: Arc<dyn ToolRunner>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunTimingSummary {
    pub setup_time_s: f64,
    pub sky_time_s: f64,
    pub coefficients_time_s: f64,
    pub timesteps_time_s: f64,
    pub aggregate_time_s: f64,
    pub save_time_s: f64,
    pub total_time_s: f64,
}

/// An hour that finished without a computed result.
#[derive(Debug, Clone, Serialize)]
pub struct HourIssue {
    pub index: usize,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HourIssue {
    fn new(outcome: &HourOutcome, reason: Option<String>) -> Self {
        Self {
            index: outcome.hour.index,
            month: outcome.hour.month(),
            day: outcome.hour.day(),
            hour: outcome.hour.hour(),
            reason,
        }
    }
}

/// Contents of `output/run_summary.json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub method: String,
    pub spaces: Vec<String>,
    pub workers: usize,
    pub hours_total: usize,
    pub hours_computed: usize,
    pub hours_below_horizon: usize,
    pub failed_hours: Vec<HourIssue>,
    pub timed_out_hours: Vec<HourIssue>,
    pub clamped_values: usize,
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
    pub files: Vec<PathBuf>,
    pub timing: RunTimingSummary,
}

#[derive(Debug, Clone)]
pub struct SimulateResponse {
    pub run_id: String,
    pub results_dir: PathBuf,
    pub summary_path: PathBuf,
    pub summary: RunSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    hours: Option<HourProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            hours,
        });
    }
}

pub fn run_simulation(request: &SimulateRequest) -> AppResult<SimulateResponse> {
    run_simulation_with_progress(request, None)
}

/// Runs the simulation and streams stage and hour progress events.
pub fn run_simulation_with_progress(
    request: &SimulateRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<SimulateResponse> {
    let started = Instant::now();
    let config = request.config;
    let radiance_dir = config.radiance_dir.as_path();
    let runner = request.runner.as_ref();
    let mut summary = RunSummary {
        method: config.method.label().to_string(),
        ..RunSummary::default()
    };

    emit_progress(
        &mut progress_cb,
        RunStage::LoadingModel,
        started,
        Some("Loading model and source series".to_string()),
        None,
    );
    if !radiance_dir.is_dir() {
        return Err(AppError::InvalidInput(format!(
            "Radiance directory {} does not exist",
            radiance_dir.display()
        )));
    }
    let results_dir = request
        .results_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_results_dir(radiance_dir));
    check_results_dir(&results_dir, request.source_dir)?;
    let model = model_service::load_model(request.model_path)?;
    let source = ResultsStore::open(request.source_dir)?;
    let solar = SolarSeries::from_store(&source)?;
    let hours = build_time_axis(&solar, config);
    if hours.is_empty() {
        return Err(AppError::InvalidInput(
            "No hours match the month/day/hour filters".to_string(),
        ));
    }
    summary.hours_total = hours.len();

    emit_progress(
        &mut progress_cb,
        RunStage::CheckingRadiance,
        started,
        Some("Checking Radiance installation".to_string()),
        None,
    );
    check_available(runner)?;

    emit_progress(
        &mut progress_cb,
        RunStage::MergingPoints,
        started,
        Some("Merging sensor points".to_string()),
        None,
    );
    let selection = select_spaces(&model, config.spaces.as_deref(), config.glare)?;
    let layout = PointLayout::merge(radiance_dir, &selection.names(), config.glare)?;
    check_layout(&selection.spaces, &layout)?;
    summary.spaces = selection.names();
    summary.skipped = selection.skipped.clone();

    let (groups, has_uncontrolled) = match config.method {
        SimulationMethod::SinglePhase => (Vec::new(), false),
        SimulationMethod::ThreePhase => window_groups(&model, &mut summary.skipped),
    };
    let options = CoefficientOptions::load(radiance_dir)?;
    let workers = resolve_worker_count(config.cores, available_cores());
    summary.workers = workers;
    summary.timing.setup_time_s = started.elapsed().as_secs_f64();

    let sky = match config.sky_mode {
        SkyMode::SkyMatrix => {
            emit_progress(
                &mut progress_cb,
                RunStage::BuildingSkyMatrix,
                started,
                Some("Generating annual sky matrix".to_string()),
                None,
            );
            let sky_started = Instant::now();
            let allow_legacy = config.method == SimulationMethod::SinglePhase;
            let matrix = SkyMatrixGenerator::new(runner, radiance_dir).generate(
                Path::new(WEATHER_FILE),
                options.sky_density,
                allow_legacy,
            )?;
            summary.timing.sky_time_s = sky_started.elapsed().as_secs_f64();
            SkySource::Matrix(Arc::new(matrix))
        }
        SkyMode::PerTimestep => SkySource::PerTimestep {
            density: options.sky_density,
        },
    };

    emit_progress(
        &mut progress_cb,
        RunStage::BuildingCoefficients,
        started,
        Some(if config.build_coefficients {
            "Building daylight coefficients".to_string()
        } else {
            "Reusing daylight coefficients".to_string()
        }),
        None,
    );
    let coeff_started = Instant::now();
    let builder = CoefficientBuilder::new(runner, radiance_dir, &options, workers);
    let phase = match config.method {
        SimulationMethod::SinglePhase => {
            let dmx = if config.build_coefficients {
                let dmx = builder.single_phase()?;
                builder.view_images(config.max_image_dimension)?;
                dmx
            } else {
                let dmx = radiance_dir.join(SINGLE_PHASE_DMX);
                if !dmx.is_file() {
                    return Err(AppError::InvalidInput(format!(
                        "{} not found, rebuild coefficients",
                        dmx.display()
                    )));
                }
                dmx
            };
            let coefficients = match &sky {
                SkySource::Matrix(_) => Some(load_coefficients(&dmx, layout.total())?),
                SkySource::PerTimestep { .. } => None,
            };
            PhaseInputs::Single { dmx, coefficients }
        }
        SimulationMethod::ThreePhase => {
            let paths = if config.build_coefficients {
                builder.three_phase(&groups, has_uncontrolled)?
            } else {
                ThreePhasePaths::existing(radiance_dir, &groups, has_uncontrolled)?
            };
            PhaseInputs::Three { paths }
        }
    };
    summary.timing.coefficients_time_s = coeff_started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::RunningTimesteps,
        started,
        Some(format!("Simulating {} hours on {} workers", hours.len(), workers)),
        Some(HourProgress {
            finished: 0,
            total: hours.len(),
        }),
    );
    let ts_started = Instant::now();
    let context = Arc::new(HourContext {
        runner: Arc::clone(&request.runner),
        radiance_dir: radiance_dir.to_path_buf(),
        site: SiteLocation {
            latitude_deg: model.site.latitude_deg,
            longitude_deg: model.site.longitude_deg,
            meridian_deg: to_degrees(standard_meridian(model.site.time_zone_h)),
        },
        sky,
        phase,
        points: layout.total(),
    });
    let outcomes = schedule_hours(
        context,
        &hours,
        workers,
        config.join_timeout,
        &mut |finished, total| {
            emit_progress(
                &mut progress_cb,
                RunStage::RunningTimesteps,
                started,
                None,
                Some(HourProgress { finished, total }),
            )
        },
    )?;
    summary.timing.timesteps_time_s = ts_started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::Merging,
        started,
        Some("Merging window group states".to_string()),
        None,
    );
    let agg_started = Instant::now();
    let group_ids = groups.iter().map(|g| g.id.clone()).collect();
    let mut aggregator = Aggregator::new(&selection.spaces, &layout, group_ids);
    for outcome in &outcomes {
        match &outcome.status {
            HourStatus::Computed => summary.hours_computed += 1,
            HourStatus::BelowHorizon => summary.hours_below_horizon += 1,
            HourStatus::Failed(reason) => summary
                .failed_hours
                .push(HourIssue::new(outcome, Some(reason.clone()))),
            HourStatus::TimedOut => summary.timed_out_hours.push(HourIssue::new(outcome, None)),
        }
        let merged = match merge_hour(outcome.output.as_ref(), &groups, layout.total()) {
            Ok(merged) => merged,
            Err(e) => {
                warn!(hour = outcome.hour.index, error = %e, "hour output unusable, zero-filling");
                if outcome.status == HourStatus::Computed {
                    summary.hours_computed -= 1;
                }
                summary
                    .failed_hours
                    .push(HourIssue::new(outcome, Some(e.to_string())));
                MergedHour::zeros(layout.total(), groups.len())
            }
        };
        aggregator.push_hour(&outcome.hour, merged)?;
    }

    emit_progress(
        &mut progress_cb,
        RunStage::Aggregating,
        started,
        Some("Aggregating space results".to_string()),
        None,
    );
    let run_id = compute_run_id(&model, &serde_json::to_string(config)?, PIPELINE_VERSION);
    summary.run_id = run_id.clone();
    let mut store = ResultsStore::create(
        results_dir.clone(),
        StoreManifest {
            run_id: run_id.clone(),
            model_name: model.name.clone(),
            timestamp: Utc::now().to_rfc3339(),
            method: config.method.label().to_string(),
            description: None,
        },
    );
    let aggregate = aggregator.write(radiance_dir, &mut store)?;
    summary.clamped_values = aggregate.clamped_values;
    summary.files = aggregate.files;
    summary.timing.aggregate_time_s = agg_started.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::SavingResults,
        started,
        Some("Saving results store".to_string()),
        None,
    );
    let save_started = Instant::now();
    store.finish()?;
    summary.warnings = collect_warnings(&summary);
    summary.timing.save_time_s = save_started.elapsed().as_secs_f64();
    summary.timing.total_time_s = started.elapsed().as_secs_f64();

    let summary_path = radiance_dir.join(RUN_SUMMARY);
    if let Some(dir) = summary_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    info!(
        run_id = %run_id,
        computed = summary.hours_computed,
        failed = summary.failed_hours.len(),
        timed_out = summary.timed_out_hours.len(),
        total_s = summary.timing.total_time_s,
        "simulation finished"
    );

    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some("Run completed".to_string()),
        None,
    );

    Ok(SimulateResponse {
        run_id,
        results_dir,
        summary_path,
        summary,
    })
}

fn collect_warnings(summary: &RunSummary) -> Vec<String> {
    let mut warnings = Vec::new();
    if summary.clamped_values > 0 {
        warnings.push(format!(
            "{} negative illuminance values clamped to zero",
            summary.clamped_values
        ));
    }
    if !summary.failed_hours.is_empty() {
        warnings.push(format!(
            "{} hours failed and were zero-filled",
            summary.failed_hours.len()
        ));
    }
    if !summary.timed_out_hours.is_empty() {
        warnings.push(format!(
            "{} hours timed out and were zero-filled",
            summary.timed_out_hours.len()
        ));
    }
    if !summary.skipped.is_empty() {
        warnings.push(format!("{} spaces or window groups skipped", summary.skipped.len()));
    }
    warnings
}
