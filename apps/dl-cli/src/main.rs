use clap::{ArgAction, Parser, Subcommand};
use dl_app::{
    AppResult, MetricsRequest, RunProgressEvent, RunStage, RunSummary, ScheduleRequest,
    SimulateRequest, compute_metrics, import_series, model_service, run_simulation_with_progress,
    summarize_store, write_dimming_schedules,
};
use dl_core::sanitize_name;
use dl_metrics::{Mask, Metric, MetricsConfig};
use dl_radiance::{ProcessRunner, RadianceEnv};
use dl_sim::{SimulationConfig, SimulationMethod, SkyMode};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dl-cli")]
#[command(about = "Annual daylight simulation with Radiance", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a building model file
    Validate {
        /// Path to the model YAML or JSON file
        model_path: PathBuf,
    },
    /// Import an hourly CSV into a source store
    ImportSeries {
        /// CSV with month, day, hour and one column per series
        csv_path: PathBuf,
        /// Store directory, created when absent
        store_dir: PathBuf,
    },
    /// Run the annual Radiance simulation
    Simulate(SimulateArgs),
    /// Compute DA, cDA and UDI for every simulated space
    Metrics {
        /// Path to the model file
        model_path: PathBuf,
        /// Results store written by `simulate`
        #[arg(long)]
        results: PathBuf,
        /// Source store with exterior illuminance and occupancy
        #[arg(long)]
        source: PathBuf,
        /// Output CSV report
        #[arg(short, long)]
        output: PathBuf,
        /// Setpoint for spaces without a daylighting control (lux)
        #[arg(long, default_value_t = MetricsConfig::default().default_setpoint_lux)]
        default_setpoint: f64,
    },
    /// Write a copy of the model with daylight-dimmed lighting schedules
    Schedules {
        /// Path to the model file
        model_path: PathBuf,
        /// Results store written by `simulate`
        #[arg(long)]
        results: PathBuf,
        /// Output model file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Simulate, then compute metrics and dimming schedules from the new results
    Run {
        #[command(flatten)]
        simulate: SimulateArgs,
        /// Metrics CSV report [default: <results>/daylight_metrics.csv]
        #[arg(long)]
        metrics_output: Option<PathBuf>,
        /// Setpoint for spaces without a daylighting control (lux)
        #[arg(long, default_value_t = MetricsConfig::default().default_setpoint_lux)]
        default_setpoint: f64,
        /// Write a model with dimmed lighting schedules to this path
        #[arg(long)]
        schedules_output: Option<PathBuf>,
    },
    /// Show the manifest and series of a store
    Show {
        /// Store directory
        store_dir: PathBuf,
    },
}

#[derive(clap::Args)]
struct SimulateArgs {
    /// Path to the model file
    model_path: PathBuf,
    /// Exported Radiance model directory
    #[arg(long)]
    radiance_dir: PathBuf,
    /// Source store with the solar series
    #[arg(long)]
    source: PathBuf,
    /// Results store directory [default: <radiance-dir>/output/radout]
    #[arg(long)]
    results: Option<PathBuf>,
    /// Months to simulate (comma separated)
    #[arg(long, value_delimiter = ',')]
    month: Vec<u32>,
    /// Days of the month to simulate (comma separated)
    #[arg(long, value_delimiter = ',')]
    day: Vec<u32>,
    /// Hour-ending values 1-24 to simulate (comma separated)
    #[arg(long, value_delimiter = ',')]
    hour: Vec<u32>,
    /// Spaces to simulate (comma separated)
    #[arg(long, value_delimiter = ',')]
    spaces: Vec<String>,
    /// Worker count [default: available cores minus one]
    #[arg(long)]
    cores: Option<usize>,
    /// Maximum rendered image dimension in pixels
    #[arg(long, default_value_t = 400)]
    dims: u32,
    /// Use the three-phase method for controlled window groups
    #[arg(long)]
    three_phase: bool,
    /// Evaluate glare sensors
    #[arg(long)]
    glare: bool,
    /// Build each hour's sky with gendaylit instead of the annual sky matrix
    #[arg(long)]
    per_timestep: bool,
    /// Reuse coefficient matrices from an earlier run
    #[arg(long)]
    skip_coefficients: bool,
    /// Radiance installation directory [default: RADIANCE_PATH or PATH]
    #[arg(long)]
    radiance_path: Option<PathBuf>,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Validate { model_path } => cmd_validate(&model_path),
        Commands::ImportSeries {
            csv_path,
            store_dir,
        } => cmd_import_series(&csv_path, &store_dir),
        Commands::Simulate(args) => cmd_simulate(args).map(|_| ()),
        Commands::Metrics {
            model_path,
            results,
            source,
            output,
            default_setpoint,
        } => cmd_metrics(&model_path, &results, &source, &output, default_setpoint),
        Commands::Schedules {
            model_path,
            results,
            output,
        } => cmd_schedules(&model_path, &results, &output),
        Commands::Run {
            simulate,
            metrics_output,
            default_setpoint,
            schedules_output,
        } => {
            let model_path = simulate.model_path.clone();
            let source = simulate.source.clone();
            let results = cmd_simulate(simulate)?;
            let metrics_output =
                metrics_output.unwrap_or_else(|| results.join("daylight_metrics.csv"));
            println!();
            cmd_metrics(
                &model_path,
                &results,
                &source,
                &metrics_output,
                default_setpoint,
            )?;
            if let Some(output) = schedules_output {
                println!();
                cmd_schedules(&model_path, &results, &output)?;
            }
            Ok(())
        }
        Commands::Show { store_dir } => cmd_show(&store_dir),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cmd_validate(model_path: &Path) -> AppResult<()> {
    println!("Validating model: {}", model_path.display());
    let summary = model_service::validate_model_file(model_path)?;
    println!("✓ Model is valid");
    println!("  Name: {} ({})", summary.name, summary.site);
    println!(
        "  Spaces: {} ({} with illuminance maps)",
        summary.spaces, summary.mapped_spaces.len()
    );
    println!("  Daylighting controls: {}", summary.daylighting_controls);
    println!("  Glare sensors: {}", summary.glare_sensors);
    println!("  Thermal zones: {}", summary.thermal_zones);
    println!(
        "  Controlled window groups: {}",
        summary.controlled_window_groups
    );
    Ok(())
}

fn cmd_import_series(csv_path: &Path, store_dir: &Path) -> AppResult<()> {
    let summary = import_series(csv_path, store_dir)?;
    println!(
        "✓ Imported {} into {} ({} series)",
        csv_path.display(),
        store_dir.display(),
        summary.variables.len()
    );
    Ok(())
}

/// Returns the results store directory.
fn cmd_simulate(args: SimulateArgs) -> AppResult<PathBuf> {
    let config = SimulationConfig {
        radiance_dir: args.radiance_dir,
        method: if args.three_phase {
            SimulationMethod::ThreePhase
        } else {
            SimulationMethod::SinglePhase
        },
        sky_mode: if args.per_timestep {
            SkyMode::PerTimestep
        } else {
            SkyMode::SkyMatrix
        },
        months: args.month,
        days: args.day,
        hours: args.hour,
        spaces: if args.spaces.is_empty() {
            None
        } else {
            Some(args.spaces.iter().map(|s| sanitize_name(s)).collect())
        },
        cores: args.cores,
        max_image_dimension: args.dims,
        glare: args.glare,
        build_coefficients: !args.skip_coefficients,
        ..SimulationConfig::default()
    };
    let runner = ProcessRunner::new(RadianceEnv::discover(args.radiance_path.as_deref()));

    println!(
        "Running {} simulation for: {}",
        config.method.label(),
        args.model_path.display()
    );
    let request = SimulateRequest {
        model_path: &args.model_path,
        source_dir: &args.source,
        results_dir: args.results.as_deref(),
        config: &config,
        runner: Arc::new(runner),
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_simulation_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now = last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    println!("✓ Simulation completed: {}", response.run_id);
    println!("  Results: {}", response.results_dir.display());
    println!("  Summary: {}", response.summary_path.display());
    print_run_summary(&response.summary);
    Ok(response.results_dir)
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (event.stage, event.hours) {
        (RunStage::RunningTimesteps, Some(hours)) => {
            let fraction = hours.fraction_complete();
            let width = 28usize;
            let filled = ((fraction * width as f64).round() as usize).min(width);
            print!(
                "\r[{}{}] {:>6.2}%  hours={}/{}  elapsed={:.1}s",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled)),
                fraction * 100.0,
                hours.finished,
                hours.total,
                event.elapsed_wall_s
            );
            let _ = io::stdout().flush();
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}

fn print_run_summary(summary: &RunSummary) {
    println!(
        "  Hours: {} total, {} computed, {} below horizon",
        summary.hours_total, summary.hours_computed, summary.hours_below_horizon
    );
    if !summary.failed_hours.is_empty() || !summary.timed_out_hours.is_empty() {
        println!(
            "  Failed: {}  Timed out: {}",
            summary.failed_hours.len(),
            summary.timed_out_hours.len()
        );
    }
    for warning in &summary.warnings {
        println!("  ! {}", warning);
    }

    let timing = &summary.timing;
    let total = timing.total_time_s.max(1.0e-12);
    println!("\nTiming summary:");
    for (label, seconds) in [
        ("Setup", timing.setup_time_s),
        ("Sky", timing.sky_time_s),
        ("Coefficients", timing.coefficients_time_s),
        ("Timesteps", timing.timesteps_time_s),
        ("Aggregate", timing.aggregate_time_s),
        ("Save", timing.save_time_s),
    ] {
        println!(
            "  {:<13} {:.3}s ({:.1}%)",
            format!("{label}:"),
            seconds,
            100.0 * seconds / total
        );
    }
    println!("  {:<13} {:.3}s", "Total:", timing.total_time_s);
}

fn cmd_metrics(
    model_path: &Path,
    results: &Path,
    source: &Path,
    output: &Path,
    default_setpoint: f64,
) -> AppResult<()> {
    let report = compute_metrics(&MetricsRequest {
        model_path,
        results_dir: results,
        source_dir: source,
        output_csv: output,
        config: MetricsConfig {
            default_setpoint_lux: default_setpoint,
        },
    })?;

    println!("Daylit and occupied hours:");
    println!(
        "  {:<28} {:>9} {:>8} {:>8} {:>8}",
        "space", "setpoint", "DA", "cDA", "UDI"
    );
    for space in &report.spaces {
        let value = |metric| space.get(metric, Mask::DaylitOccupied).average;
        println!(
            "  {:<28} {:>9.0} {:>8.3} {:>8.3} {:>8.3}",
            space.space,
            space.setpoint_lux,
            value(Metric::Da),
            value(Metric::Cda),
            value(Metric::Udi)
        );
    }
    println!("  Building DA: {:.3}", report.building_da);
    for skipped in &report.skipped {
        println!("  skipped {}", skipped);
    }
    println!("✓ Report written to {}", output.display());
    Ok(())
}

fn cmd_schedules(model_path: &Path, results: &Path, output: &Path) -> AppResult<()> {
    let synthesis = write_dimming_schedules(&ScheduleRequest {
        model_path,
        results_dir: results,
        output_model: output,
    })?;

    if synthesis.schedules.is_empty() {
        println!("No spaces received dimming schedules");
    } else {
        println!("Dimmed spaces:");
        for schedule in &synthesis.schedules {
            println!(
                "  {} (zone {}, setpoint {:.0} lux, {:.1} W)",
                schedule.space, schedule.zone, schedule.setpoint_lux, schedule.level_w
            );
        }
    }
    for skipped in &synthesis.skipped {
        println!("  skipped {}", skipped);
    }
    println!("✓ Model written to {}", output.display());
    Ok(())
}

fn cmd_show(store_dir: &Path) -> AppResult<()> {
    let summary = summarize_store(store_dir)?;
    let manifest = &summary.manifest;

    println!("Store: {}", store_dir.display());
    println!("  Run: {} ({})", manifest.run_id, manifest.method);
    println!("  Model: {}", manifest.model_name);
    println!("  Created: {}", manifest.timestamp);
    if let Some(description) = &manifest.description {
        println!("  {}", description);
    }

    println!("\nSeries:");
    for v in &summary.variables {
        println!(
            "  {}:{} [{}] ({}) {} points",
            v.key, v.name, v.units, v.frequency, v.points
        );
    }
    if !summary.illuminance_maps.is_empty() {
        println!("\nIlluminance maps:");
        for name in &summary.illuminance_maps {
            println!("  {}", name);
        }
    }
    Ok(())
}
