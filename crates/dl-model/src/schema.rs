//! Building model schema definitions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingModel {
    pub version: u32,
    pub name: String,
    pub site: SiteDef,
    #[serde(default)]
    pub spaces: Vec<SpaceDef>,
    #[serde(default)]
    pub thermal_zones: Vec<ThermalZoneDef>,
    #[serde(default)]
    pub window_groups: Vec<WindowGroupDef>,
    #[serde(default)]
    pub schedules: Vec<ScheduleDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteDef {
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Offset from UTC in hours, negative west of Greenwich.
    pub time_zone_h: f64,
    #[serde(default)]
    pub elevation_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpaceDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illuminance_map: Option<IlluminanceMapDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daylighting_control: Option<DaylightingControlDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glare_sensor: Option<GlareSensorDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub window_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lights: Vec<LightsDef>,
}

/// Rectangular grid of illuminance points on a horizontal plane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IlluminanceMapDef {
    pub origin: [f64; 3],
    pub x_length_m: f64,
    pub y_length_m: f64,
    pub x_points: usize,
    pub y_points: usize,
}

impl IlluminanceMapDef {
    pub fn point_count(&self) -> usize {
        self.x_points * self.y_points
    }

    pub fn x_spacing(&self) -> f64 {
        self.x_length_m / self.x_points as f64
    }

    pub fn y_spacing(&self) -> f64 {
        self.y_length_m / self.y_points as f64
    }

    pub fn x_max(&self) -> f64 {
        self.origin[0] + self.x_length_m
    }

    pub fn y_max(&self) -> f64 {
        self.origin[1] + self.y_length_m
    }

    pub fn x_coords(&self) -> Vec<f64> {
        let dx = self.x_spacing();
        (0..self.x_points)
            .map(|i| self.origin[0] + i as f64 * dx)
            .collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        let dy = self.y_spacing();
        (0..self.y_points)
            .map(|j| self.origin[1] + j as f64 * dy)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaylightingControlDef {
    pub name: String,
    pub position: [f64; 3],
    pub setpoint_lux: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlareSensorDef {
    pub position: [f64; 3],
    pub view_directions: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LightsDef {
    pub name: String,
    pub lighting_level_w: f64,
    pub schedule: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalZoneDef {
    pub name: String,
    /// Name of a daylighting control defined on one of the zone's spaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_daylighting_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_daylighting_control: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowGroupDef {
    pub id: String,
    /// Outward normal azimuth, degrees clockwise from north.
    pub azimuth_deg: f64,
    #[serde(default)]
    pub setpoint_lux: f64,
    /// BSDF files under the radiance `bsdf/` directory, clear state first.
    #[serde(default)]
    pub states: Vec<String>,
    /// Apertures with no shading control; merged into a single matrix.
    #[serde(default)]
    pub uncontrolled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDef {
    pub name: String,
    pub kind: ScheduleKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ScheduleKind {
    Constant { value: f64 },
    Hourly { values: Vec<f64> },
}

impl ScheduleDef {
    /// Schedule value for a zero-based hour of the year.
    pub fn value_at(&self, hour_of_year: usize) -> Option<f64> {
        match &self.kind {
            ScheduleKind::Constant { value } => Some(*value),
            ScheduleKind::Hourly { values } => values.get(hour_of_year).copied(),
        }
    }
}
