//! Name-based lookups over a building model.

use crate::schema::{
    BuildingModel, DaylightingControlDef, ScheduleDef, SpaceDef, ThermalZoneDef, WindowGroupDef,
};
use dl_core::sanitize_name;

/// A daylighting control together with the space that hosts it.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedControl<'a> {
    pub space: &'a SpaceDef,
    pub control: &'a DaylightingControlDef,
}

impl BuildingModel {
    pub fn space(&self, name: &str) -> Option<&SpaceDef> {
        self.spaces.iter().find(|s| s.name == name)
    }

    /// Finds a space by its sanitized Radiance name.
    pub fn space_by_sanitized(&self, sanitized: &str) -> Option<&SpaceDef> {
        self.spaces
            .iter()
            .find(|s| sanitize_name(&s.name) == sanitized)
    }

    pub fn thermal_zone(&self, name: &str) -> Option<&ThermalZoneDef> {
        self.thermal_zones.iter().find(|z| z.name == name)
    }

    pub fn window_group(&self, id: &str) -> Option<&WindowGroupDef> {
        self.window_groups.iter().find(|g| g.id == id)
    }

    pub fn schedule(&self, name: &str) -> Option<&ScheduleDef> {
        self.schedules.iter().find(|s| s.name == name)
    }

    pub fn spaces_in_zone<'a>(&'a self, zone: &'a str) -> impl Iterator<Item = &'a SpaceDef> + 'a {
        self.spaces
            .iter()
            .filter(move |s| s.thermal_zone.as_deref() == Some(zone))
    }

    pub fn daylighting_control(&self, name: &str) -> Option<ResolvedControl<'_>> {
        self.spaces.iter().find_map(|space| {
            space
                .daylighting_control
                .as_ref()
                .filter(|c| c.name == name)
                .map(|control| ResolvedControl { space, control })
        })
    }
}
