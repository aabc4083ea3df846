//! Metrics report assembly and CSV output.

use crate::calc::{SpaceMetrics, building_average, compute_space_metrics};
use crate::inputs::GatheredInputs;
use crate::MetricsResult;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct MetricsReport {
    pub spaces: Vec<SpaceMetrics>,
    pub building_da: f64,
    pub skipped: Vec<String>,
}

pub fn compute_report(inputs: &GatheredInputs) -> MetricsReport {
    let spaces: Vec<SpaceMetrics> = inputs
        .spaces
        .iter()
        .map(|s| {
            compute_space_metrics(
                &s.space,
                &s.illuminance,
                &inputs.exterior,
                &s.occupancy,
                s.setpoint_lux,
            )
        })
        .collect();
    let building_da = if spaces.is_empty() {
        0.0
    } else {
        building_average(&spaces)
    };
    info!(spaces = spaces.len(), building_da, "daylight metrics computed");
    MetricsReport {
        spaces,
        building_da,
        skipped: inputs.skipped.clone(),
    }
}

/// Writes `space,metric,sum,count,annual_average` rows followed by the building row.
pub fn write_csv(path: &Path, report: &MetricsReport) -> MetricsResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["space", "metric", "sum", "count", "annual_average"])?;
    for space in &report.spaces {
        for (label, triple) in space.rows() {
            writer.write_record([
                space.space.clone(),
                label,
                triple.sum.to_string(),
                triple.count.to_string(),
                triple.average.to_string(),
            ])?;
        }
    }
    writer.write_record([
        "building".to_string(),
        "da_daylit_occupied_average".to_string(),
        String::new(),
        String::new(),
        report.building_da.to_string(),
    ])?;
    writer.flush()?;
    Ok(())
}
