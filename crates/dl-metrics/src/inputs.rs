//! Series lookup for the metrics run.

use crate::{MetricsError, MetricsResult};
use dl_core::{TimeSeries, sanitize_name};
use dl_model::BuildingModel;
use dl_results::{ReportingFrequency, ResultsStore};
use dl_sim::aggregate::{MEAN_MAP_ILLUMINANCE, SENSOR_ILLUMINANCE};
use dl_sim::time_axis::{ENVIRONMENT_KEY, EXTERIOR_HORIZONTAL_ILLUMINANCE};
use serde::Serialize;
use tracing::{debug, warn};

pub const OCCUPANT_COUNT: &str = "Zone People Occupant Count";

#[derive(Debug, Clone, Serialize)]
pub struct MetricsConfig {
    /// Used for spaces without a daylighting control.
    pub default_setpoint_lux: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            default_setpoint_lux: 300.0,
        }
    }
}

/// Everything needed to score one space.
#[derive(Debug, Clone)]
pub struct SpaceInput {
    /// Sanitized space name.
    pub space: String,
    pub setpoint_lux: f64,
    pub illuminance: TimeSeries,
    pub occupancy: TimeSeries,
}

#[derive(Debug, Clone)]
pub struct GatheredInputs {
    pub exterior: TimeSeries,
    pub spaces: Vec<SpaceInput>,
    pub skipped: Vec<String>,
}

fn hourly<'a>(store: &'a ResultsStore, key: &str, name: &str) -> Option<&'a TimeSeries> {
    store.time_series(key, name, ReportingFrequency::Hourly)
}

fn require<'a>(store: &'a ResultsStore, key: &str, name: &str) -> MetricsResult<&'a TimeSeries> {
    hourly(store, key, name).ok_or_else(|| MetricsError::MissingTimeSeries {
        key: key.to_string(),
        name: name.to_string(),
    })
}

/// Collects simulated illuminance from `results` and exterior and occupancy series
/// from `source` for every mapped space of `model`.
///
/// Spaces with no simulated series or no thermal zone are skipped and reported.
/// Missing exterior or occupancy data is fatal.
pub fn gather_inputs(
    model: &BuildingModel,
    results: &ResultsStore,
    source: &ResultsStore,
    config: &MetricsConfig,
) -> MetricsResult<GatheredInputs> {
    if config.default_setpoint_lux <= 0.0 {
        return Err(MetricsError::Configuration {
            what: format!(
                "default setpoint must be positive, got {}",
                config.default_setpoint_lux
            ),
        });
    }
    let exterior = require(source, ENVIRONMENT_KEY, EXTERIOR_HORIZONTAL_ILLUMINANCE)?.clone();

    let mut spaces = Vec::new();
    let mut skipped = Vec::new();
    for space in model.spaces.iter().filter(|s| s.illuminance_map.is_some()) {
        let name = sanitize_name(&space.name);
        let illuminance = hourly(results, &name, SENSOR_ILLUMINANCE)
            .or_else(|| hourly(results, &name, MEAN_MAP_ILLUMINANCE));
        let Some(illuminance) = illuminance else {
            warn!(space = %name, "no simulated illuminance, skipping");
            skipped.push(format!("{name}: no simulated illuminance"));
            continue;
        };
        let Some(zone) = &space.thermal_zone else {
            warn!(space = %name, "space has no thermal zone, skipping");
            skipped.push(format!("{name}: no thermal zone for occupancy"));
            continue;
        };
        let occupancy = require(source, zone, OCCUPANT_COUNT)?;

        let setpoint_lux = match &space.daylighting_control {
            Some(control) if control.setpoint_lux > 0.0 => control.setpoint_lux,
            Some(control) => {
                warn!(
                    space = %name,
                    setpoint = control.setpoint_lux,
                    "invalid control setpoint, using default"
                );
                config.default_setpoint_lux
            }
            None => config.default_setpoint_lux,
        };
        debug!(space = %name, zone = %zone, setpoint_lux, "metrics inputs resolved");
        spaces.push(SpaceInput {
            space: name,
            setpoint_lux,
            illuminance: illuminance.clone(),
            occupancy: occupancy.clone(),
        });
    }

    if spaces.is_empty() {
        warn!("no spaces with simulated illuminance");
    }
    Ok(GatheredInputs {
        exterior,
        spaces,
        skipped,
    })
}
