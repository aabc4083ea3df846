//! Model validation logic.

use crate::schema::{BuildingModel, ScheduleKind, SpaceDef};
use dl_core::sanitize_name;
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_model(model: &BuildingModel) -> Result<(), ValidationError> {
    if model.version > crate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: model.version,
        });
    }

    check_finite("site.latitude_deg", model.site.latitude_deg)?;
    check_finite("site.longitude_deg", model.site.longitude_deg)?;
    check_finite("site.time_zone_h", model.site.time_zone_h)?;

    let mut zone_names = HashSet::new();
    for zone in &model.thermal_zones {
        if !zone_names.insert(zone.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: zone.name.clone(),
                context: "thermal_zones".to_string(),
            });
        }
    }

    let mut schedule_names = HashSet::new();
    for schedule in &model.schedules {
        if !schedule_names.insert(schedule.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: schedule.name.clone(),
                context: "schedules".to_string(),
            });
        }
        if let ScheduleKind::Hourly { values } = &schedule.kind
            && values.len() != 8760
            && values.len() != 8784
        {
            return Err(ValidationError::InvalidValue {
                field: format!("schedule '{}' values", schedule.name),
                value: values.len().to_string(),
                reason: "hourly schedules need 8760 or 8784 values".to_string(),
            });
        }
    }

    let mut group_ids = HashSet::new();
    for group in &model.window_groups {
        if !group_ids.insert(group.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: group.id.clone(),
                context: "window_groups".to_string(),
            });
        }
        check_finite(&format!("window group '{}' azimuth_deg", group.id), group.azimuth_deg)?;
        check_finite(
            &format!("window group '{}' setpoint_lux", group.id),
            group.setpoint_lux,
        )?;
    }

    // Sanitized names become file names, so collisions after sanitizing are duplicates too.
    let mut space_names = HashSet::new();
    let mut control_names = HashSet::new();
    for space in &model.spaces {
        if !space_names.insert(sanitize_name(&space.name)) {
            return Err(ValidationError::DuplicateId {
                id: space.name.clone(),
                context: "spaces".to_string(),
            });
        }
        if let Some(control) = &space.daylighting_control
            && !control_names.insert(control.name.as_str())
        {
            return Err(ValidationError::DuplicateId {
                id: control.name.clone(),
                context: "daylighting controls".to_string(),
            });
        }
        validate_space(space, &zone_names, &group_ids, &schedule_names)?;
    }

    for zone in &model.thermal_zones {
        for control in [
            &zone.primary_daylighting_control,
            &zone.secondary_daylighting_control,
        ]
        .into_iter()
        .flatten()
        {
            if !control_names.contains(control.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: control.clone(),
                    context: format!("thermal zone '{}' daylighting control", zone.name),
                });
            }
        }
    }

    Ok(())
}

fn validate_space(
    space: &SpaceDef,
    zone_names: &HashSet<&str>,
    group_ids: &HashSet<&str>,
    schedule_names: &HashSet<&str>,
) -> Result<(), ValidationError> {
    if let Some(zone) = &space.thermal_zone
        && !zone_names.contains(zone.as_str())
    {
        return Err(ValidationError::MissingReference {
            id: zone.clone(),
            context: format!("space '{}' thermal_zone", space.name),
        });
    }

    for group in &space.window_groups {
        if !group_ids.contains(group.as_str()) {
            return Err(ValidationError::MissingReference {
                id: group.clone(),
                context: format!("space '{}' window_groups", space.name),
            });
        }
    }

    if let Some(map) = &space.illuminance_map {
        if map.x_points == 0 || map.y_points == 0 {
            return Err(ValidationError::InvalidValue {
                field: format!("space '{}' illuminance_map points", space.name),
                value: format!("{}x{}", map.x_points, map.y_points),
                reason: "grid must have at least one point per axis".to_string(),
            });
        }
        for (field, v) in [("x_length_m", map.x_length_m), ("y_length_m", map.y_length_m)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(ValidationError::InvalidValue {
                    field: format!("space '{}' illuminance_map {}", space.name, field),
                    value: v.to_string(),
                    reason: "must be finite and positive".to_string(),
                });
            }
        }
    }

    if let Some(control) = &space.daylighting_control {
        check_finite(
            &format!("daylighting control '{}' setpoint_lux", control.name),
            control.setpoint_lux,
        )?;
    }

    if let Some(glare) = &space.glare_sensor
        && glare.view_directions.is_empty()
    {
        return Err(ValidationError::InvalidValue {
            field: format!("space '{}' glare_sensor view_directions", space.name),
            value: "[]".to_string(),
            reason: "glare sensor needs at least one view direction".to_string(),
        });
    }

    for lights in &space.lights {
        if !schedule_names.contains(lights.schedule.as_str()) {
            return Err(ValidationError::MissingReference {
                id: lights.schedule.clone(),
                context: format!("lights '{}' schedule", lights.name),
            });
        }
        if !(lights.lighting_level_w.is_finite() && lights.lighting_level_w >= 0.0) {
            return Err(ValidationError::InvalidValue {
                field: format!("lights '{}' lighting_level_w", lights.name),
                value: lights.lighting_level_w.to_string(),
                reason: "must be finite and non-negative".to_string(),
            });
        }
    }

    Ok(())
}

fn check_finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be finite".to_string(),
        })
    }
}
