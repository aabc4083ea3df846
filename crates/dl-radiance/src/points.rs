//! Sensor point files written by the geometry exporter.
//!
//! Each space has `numeric/<space>.map` (grid points), optionally
//! `<space>.sns` (one daylight sensor) and `<space>.glr` (one line per glare
//! view). They are concatenated into `numeric/merged_space.map`, and the raw
//! result vector of every timestep follows the same order.

use crate::{RadianceError, RadianceResult};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MERGED_POINTS: &str = "numeric/merged_space.map";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpacePoints {
    /// Sanitized space name.
    pub name: String,
    pub grid: usize,
    pub sensor: usize,
    pub glare: usize,
}

impl SpacePoints {
    pub fn total(&self) -> usize {
        self.grid + self.sensor + self.glare
    }
}

/// Per-space point counts in merged-file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointLayout {
    pub spaces: Vec<SpacePoints>,
}

impl PointLayout {
    pub fn total(&self) -> usize {
        self.spaces.iter().map(SpacePoints::total).sum()
    }

    /// Offset of each space's first point in the merged vector.
    pub fn offsets(&self) -> Vec<usize> {
        self.spaces
            .iter()
            .scan(0, |acc, s| {
                let start = *acc;
                *acc += s.total();
                Some(start)
            })
            .collect()
    }

    /// Reads each space's point files, writes the merged file and returns the layout.
    pub fn merge(radiance_dir: &Path, spaces: &[String], include_glare: bool) -> RadianceResult<Self> {
        let numeric = radiance_dir.join("numeric");
        let mut merged = String::new();
        let mut layout = PointLayout::default();

        for name in spaces {
            let map_path = numeric.join(format!("{name}.map"));
            let grid = read_points(&map_path)?;
            if grid.is_empty() {
                return Err(RadianceError::PointFile {
                    path: map_path,
                    reason: "illuminance map has no points".to_string(),
                });
            }
            let sensor = read_optional(&numeric.join(format!("{name}.sns")))?;
            if sensor.len() > 1 {
                return Err(RadianceError::PointFile {
                    path: numeric.join(format!("{name}.sns")),
                    reason: format!("expected one sensor point, found {}", sensor.len()),
                });
            }
            let glare = if include_glare {
                read_optional(&numeric.join(format!("{name}.glr")))?
            } else {
                Vec::new()
            };

            for line in grid.iter().chain(&sensor).chain(&glare) {
                merged.push_str(line);
                merged.push('\n');
            }
            debug!(
                space = %name,
                grid = grid.len(),
                sensor = sensor.len(),
                glare = glare.len(),
                "merged point files"
            );
            layout.spaces.push(SpacePoints {
                name: name.clone(),
                grid: grid.len(),
                sensor: sensor.len(),
                glare: glare.len(),
            });
        }

        std::fs::write(radiance_dir.join(MERGED_POINTS), merged)?;
        Ok(layout)
    }
}

fn read_points(path: &Path) -> RadianceResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| RadianceError::PointFile {
        path: PathBuf::from(path),
        reason: e.to_string(),
    })?;
    let mut points = Vec::new();
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let fields = line.split_whitespace().count();
        if fields != 6 {
            return Err(RadianceError::PointFile {
                path: PathBuf::from(path),
                reason: format!("expected 'x y z dx dy dz', found {fields} fields"),
            });
        }
        points.push(line.to_string());
    }
    Ok(points)
}

fn read_optional(path: &Path) -> RadianceResult<Vec<String>> {
    if path.exists() {
        read_points(path)
    } else {
        Ok(Vec::new())
    }
}
