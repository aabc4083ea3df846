//! Space and window-group selection for a run.

use crate::{SimError, SimResult};
use dl_core::sanitize_name;
use dl_model::{BuildingModel, IlluminanceMapDef};
use dl_radiance::{PointLayout, WindowGroupSpec};
use dl_results::ill::MapGeometry;
use tracing::{info, warn};

/// A space that takes part in the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceInfo {
    /// Sanitized name, used for files and result keys.
    pub name: String,
    pub map: IlluminanceMapDef,
    pub has_sensor: bool,
    pub glare_views: usize,
    pub window_groups: Vec<String>,
}

impl SpaceInfo {
    pub fn geometry(&self) -> MapGeometry {
        MapGeometry {
            x_min: self.map.origin[0],
            y_min: self.map.origin[1],
            z: self.map.origin[2],
            x_max: self.map.x_max(),
            y_max: self.map.y_max(),
            x_spacing: self.map.x_spacing(),
            y_spacing: self.map.y_spacing(),
        }
    }

    pub fn map_name(&self) -> String {
        format!("{} DAYLIGHT MAP", self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpaceSelection {
    pub spaces: Vec<SpaceInfo>,
    /// Requested or modelled spaces left out, with the reason.
    pub skipped: Vec<String>,
}

impl SpaceSelection {
    pub fn names(&self) -> Vec<String> {
        self.spaces.iter().map(|s| s.name.clone()).collect()
    }
}

/// Spaces with an illuminance map, optionally limited to `filter` (sanitized names).
pub fn select_spaces(
    model: &BuildingModel,
    filter: Option<&[String]>,
    glare: bool,
) -> SimResult<SpaceSelection> {
    let mut selection = SpaceSelection::default();

    if let Some(filter) = filter {
        for wanted in filter {
            if model.space_by_sanitized(wanted).is_none() {
                warn!(space = %wanted, "requested space not in model");
                selection.skipped.push(format!("{wanted}: not in model"));
            }
        }
    }

    for space in &model.spaces {
        let name = sanitize_name(&space.name);
        if filter.is_some_and(|f| !f.contains(&name)) {
            continue;
        }
        let Some(map) = &space.illuminance_map else {
            info!(space = %name, "no illuminance map, skipping");
            selection.skipped.push(format!("{name}: no illuminance map"));
            continue;
        };
        selection.spaces.push(SpaceInfo {
            name,
            map: map.clone(),
            has_sensor: space.daylighting_control.is_some(),
            glare_views: if glare {
                space
                    .glare_sensor
                    .as_ref()
                    .map_or(0, |g| g.view_directions.len())
            } else {
                0
            },
            window_groups: space.window_groups.clone(),
        });
    }

    if selection.spaces.is_empty() {
        return Err(SimError::Configuration {
            what: "no spaces with an illuminance map to simulate".to_string(),
        });
    }
    Ok(selection)
}

/// Checks the merged point files against the model's grid, sensor and glare counts.
pub fn check_layout(spaces: &[SpaceInfo], layout: &PointLayout) -> SimResult<()> {
    if spaces.len() != layout.spaces.len() {
        return Err(SimError::Configuration {
            what: format!(
                "{} spaces selected but {} point sets merged",
                spaces.len(),
                layout.spaces.len()
            ),
        });
    }
    for (space, points) in spaces.iter().zip(&layout.spaces) {
        let expected = (
            space.map.point_count(),
            usize::from(space.has_sensor),
            space.glare_views,
        );
        let found = (points.grid, points.sensor, points.glare);
        if space.name != points.name || expected != found {
            return Err(SimError::Configuration {
                what: format!(
                    "point files of {} hold grid/sensor/glare {:?}, model expects {:?}",
                    points.name, found, expected
                ),
            });
        }
    }
    Ok(())
}

/// Controlled window groups with at least one state, and whether uncontrolled
/// apertures exist. Groups without states are reported in `skipped` but keep
/// their row in the window control matrix.
pub fn window_groups(model: &BuildingModel, skipped: &mut Vec<String>) -> (Vec<WindowGroupSpec>, bool) {
    let mut groups = Vec::new();
    let mut has_uncontrolled = false;
    let mut control_row = 0;
    for group in &model.window_groups {
        if group.uncontrolled {
            has_uncontrolled = true;
            continue;
        }
        let row = control_row;
        control_row += 1;
        if group.states.is_empty() {
            warn!(group = %group.id, "window group has no BSDF states, skipping");
            skipped.push(format!("{}: window group without states", group.id));
            continue;
        }
        if group.states.len() > 2 {
            warn!(group = %group.id, states = group.states.len(), "extra states are not supported");
            skipped.push(format!(
                "{}: {} states beyond the first two ignored",
                group.id,
                group.states.len() - 2
            ));
        }
        groups.push(WindowGroupSpec {
            id: group.id.clone(),
            azimuth_deg: group.azimuth_deg,
            setpoint_lux: group.setpoint_lux,
            states: group.states.clone(),
            control_row: row,
        });
    }
    (groups, has_uncontrolled)
}
