//! Daylighting setpoint resolution for thermal zones.

use crate::{LightingError, LightingResult};
use dl_model::{BuildingModel, ResolvedControl, ThermalZoneDef};
use tracing::debug;

/// The control that drives a zone's dimming.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneControl {
    pub zone: String,
    pub control: String,
    /// Host space of the control point, unsanitized.
    pub space: String,
    pub setpoint_lux: f64,
}

/// Primary control, then secondary, then the first space control in the zone.
/// Controls with a non-positive setpoint are passed over.
pub fn resolve_setpoint(model: &BuildingModel, zone: &ThermalZoneDef) -> LightingResult<ZoneControl> {
    let named = [
        &zone.primary_daylighting_control,
        &zone.secondary_daylighting_control,
    ]
    .into_iter()
    .flatten()
    .filter_map(|name| model.daylighting_control(name));

    let in_zone = model.spaces_in_zone(&zone.name).filter_map(|space| {
        space
            .daylighting_control
            .as_ref()
            .map(|control| ResolvedControl { space, control })
    });

    let resolved = named
        .chain(in_zone)
        .find(|r| r.control.setpoint_lux > 0.0)
        .ok_or_else(|| LightingError::UnresolvedSetpoint {
            zone: zone.name.clone(),
        })?;

    debug!(
        zone = %zone.name,
        control = %resolved.control.name,
        setpoint = resolved.control.setpoint_lux,
        "setpoint resolved"
    );
    Ok(ZoneControl {
        zone: zone.name.clone(),
        control: resolved.control.name.clone(),
        space: resolved.space.name.clone(),
        setpoint_lux: resolved.control.setpoint_lux,
    })
}
