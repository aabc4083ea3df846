//! Zone-by-zone schedule synthesis and model rewrite.

use crate::dimming::{DimmingSchedule, measured_illuminance, original_power};
use crate::setpoint::resolve_setpoint;
use crate::{LightingError, LightingResult};
use dl_core::sanitize_name;
use dl_model::{BuildingModel, LightsDef, ScheduleDef, ScheduleKind, validate_model};
use dl_results::{ReportingFrequency, ResultsStore};
use dl_sim::aggregate::SENSOR_ILLUMINANCE;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleSynthesis {
    pub schedules: Vec<DimmingSchedule>,
    /// Zones and spaces left unchanged, with the reason.
    pub skipped: Vec<String>,
}

/// Builds one dimming schedule per lit space of every zone with a resolvable setpoint.
pub fn synthesize_schedules(
    model: &BuildingModel,
    results: &ResultsStore,
) -> LightingResult<ScheduleSynthesis> {
    let mut synthesis = ScheduleSynthesis::default();
    for zone in &model.thermal_zones {
        let control = match resolve_setpoint(model, zone) {
            Ok(control) => control,
            Err(e) => {
                warn!(zone = %zone.name, error = %e, "zone skipped");
                synthesis.skipped.push(format!("{}: {e}", zone.name));
                continue;
            }
        };

        let key = sanitize_name(&control.space);
        let Some(sensor) = results.time_series(&key, SENSOR_ILLUMINANCE, ReportingFrequency::Hourly)
        else {
            let e = LightingError::MissingTimeSeries {
                key,
                name: SENSOR_ILLUMINANCE.to_string(),
            };
            warn!(zone = %zone.name, error = %e, "zone skipped");
            synthesis.skipped.push(format!("{}: {e}", zone.name));
            continue;
        };
        let measured = measured_illuminance(sensor);

        for space in model.spaces_in_zone(&zone.name) {
            let original = original_power(model, space).and_then(|power| {
                if power.iter().all(|p| *p == 0.0) {
                    return Err(LightingError::ZeroLightingLevel {
                        space: space.name.clone(),
                    });
                }
                Ok(power)
            });
            let original = match original {
                Ok(power) => power,
                Err(e) => {
                    warn!(zone = %zone.name, error = %e, "space skipped");
                    synthesis.skipped.push(format!("{}: {e}", space.name));
                    continue;
                }
            };
            let schedule = DimmingSchedule::build(
                &space.name,
                &zone.name,
                control.setpoint_lux,
                &measured,
                &original,
            );
            if schedule.level_w == 0.0 {
                warn!(space = %space.name, "daylight covers every lit hour, dimmed level is zero");
            }
            synthesis.schedules.push(schedule);
        }
    }
    info!(
        schedules = synthesis.schedules.len(),
        skipped = synthesis.skipped.len(),
        "dimming schedules synthesized"
    );
    Ok(synthesis)
}

/// Returns `model` with the lights and daylighting controls of every scheduled
/// space replaced by its dimmed lights.
pub fn apply_schedules(
    model: &BuildingModel,
    schedules: &[DimmingSchedule],
) -> LightingResult<BuildingModel> {
    let mut out = model.clone();
    let zones: HashSet<&str> = schedules.iter().map(|s| s.zone.as_str()).collect();

    for schedule in schedules {
        let Some(space) = out.spaces.iter_mut().find(|s| s.name == schedule.space) else {
            continue;
        };
        space.daylighting_control = None;
        space.lights = vec![LightsDef {
            name: schedule.lights_name(),
            lighting_level_w: schedule.level_w,
            schedule: schedule.schedule_name(),
        }];
        out.schedules.retain(|s| s.name != schedule.schedule_name());
        out.schedules.push(ScheduleDef {
            name: schedule.schedule_name(),
            kind: ScheduleKind::Hourly {
                values: schedule.fractions.clone(),
            },
        });
    }

    // Zone references must not dangle once their controls are gone.
    let controls: HashSet<String> = out
        .spaces
        .iter()
        .filter_map(|s| s.daylighting_control.as_ref().map(|c| c.name.clone()))
        .collect();
    for zone in out.thermal_zones.iter_mut() {
        if zones.contains(zone.name.as_str()) {
            zone.primary_daylighting_control = None;
            zone.secondary_daylighting_control = None;
        }
        for slot in [
            &mut zone.primary_daylighting_control,
            &mut zone.secondary_daylighting_control,
        ] {
            if slot.as_ref().is_some_and(|c| !controls.contains(c)) {
                *slot = None;
            }
        }
    }

    validate_model(&out)?;
    Ok(out)
}
