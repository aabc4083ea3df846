//! Per-space series from merged point vectors.
//!
//! Each hour's vector is split by the point layout into grid, sensor and glare
//! values in that order. Negative values are clamped to zero and counted.

use crate::merger::MergedHour;
use crate::spaces::SpaceInfo;
use crate::time_axis::SimHour;
use crate::{SimError, SimResult};
use chrono::NaiveDateTime;
use dl_core::{TimeSeries, clamp_non_negative, mean, simplified_dgp};
use dl_radiance::PointLayout;
use dl_results::ill::{GlareRow, IllRow, RowStamp, write_glr, write_ill};
use dl_results::{IlluminanceMapRecord, ReportingFrequency, ResultsStore};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DIRECT_NORMAL_ILLUMINANCE: &str = "Direct Normal Illuminance";
pub const DIFFUSE_HORIZONTAL_ILLUMINANCE: &str = "Diffuse Horizontal Illuminance";
pub const SENSOR_ILLUMINANCE: &str = "Daylight Sensor Illuminance";
pub const MEAN_MAP_ILLUMINANCE: &str = "Mean Illuminance Map";
pub const MIN_DGP: &str = "Minimum Simplified Daylight Glare Probability";
pub const MEAN_DGP: &str = "Mean Simplified Daylight Glare Probability";
pub const MAX_DGP: &str = "Maximum Simplified Daylight Glare Probability";
pub const SHADE_STATE: &str = "Window Group Shade State";

#[derive(Debug, Clone, Default)]
struct SpaceSeries {
    grids: Vec<Vec<f64>>,
    sensor: Vec<f64>,
    /// Simplified DGP per view.
    glare: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSummary {
    pub hours: usize,
    pub clamped_values: usize,
    pub files: Vec<PathBuf>,
}

pub struct Aggregator<'a> {
    spaces: &'a [SpaceInfo],
    offsets: Vec<usize>,
    total_points: usize,
    /// Controlled group ids in shade-state order.
    groups: Vec<String>,
    timestamps: Vec<NaiveDateTime>,
    stamps: Vec<RowStamp>,
    direct_normal: Vec<f64>,
    diffuse_horizontal: Vec<f64>,
    shade_states: Vec<Vec<u8>>,
    series: Vec<SpaceSeries>,
    clamped: usize,
}

impl<'a> Aggregator<'a> {
    pub fn new(spaces: &'a [SpaceInfo], layout: &PointLayout, groups: Vec<String>) -> Self {
        Self {
            spaces,
            offsets: layout.offsets(),
            total_points: layout.total(),
            groups,
            timestamps: Vec::new(),
            stamps: Vec::new(),
            direct_normal: Vec::new(),
            diffuse_horizontal: Vec::new(),
            shade_states: Vec::new(),
            series: vec![SpaceSeries::default(); spaces.len()],
            clamped: 0,
        }
    }

    pub fn clamped(&self) -> usize {
        self.clamped
    }

    pub fn push_hour(&mut self, hour: &SimHour, merged: MergedHour) -> SimResult<()> {
        let MergedHour {
            mut values,
            shade_states,
            zero_filled,
        } = merged;
        if values.len() != self.total_points {
            return Err(SimError::PointCount {
                what: format!("merged values for hour {}", hour.index),
                expected: self.total_points,
                got: values.len(),
            });
        }
        self.clamped += clamp_non_negative(&mut values);

        let spaces = self.spaces.iter().zip(&self.offsets);
        for ((space, offset), series) in spaces.zip(&mut self.series) {
            let grid_end = offset + space.map.point_count();
            series.grids.push(values[*offset..grid_end].to_vec());
            let sensor_end = grid_end + usize::from(space.has_sensor);
            series
                .sensor
                .push(values[grid_end..sensor_end].first().copied().unwrap_or(0.0));
            let glare_end = sensor_end + space.glare_views;
            let glare = &values[sensor_end..glare_end];
            series.glare.push(if zero_filled {
                vec![0.0; glare.len()]
            } else {
                glare.iter().map(|v| simplified_dgp(*v)).collect()
            });
        }

        let c = &hour.conditions;
        self.timestamps.push(hour.timestamp);
        self.stamps.push(RowStamp {
            month: c.month,
            day: c.day,
            hour: c.hour,
        });
        self.direct_normal.push(c.direct_normal_lux);
        self.diffuse_horizontal.push(c.diffuse_horizontal_lux);
        self.shade_states.push(shade_states);
        Ok(())
    }

    /// Writes `.ill`/`.glr` files under `radiance_dir/output/ts` and adds every series to `store`.
    pub fn write(
        &self,
        radiance_dir: &Path,
        store: &mut ResultsStore,
    ) -> SimResult<AggregateSummary> {
        if self.clamped > 0 {
            warn!(values = self.clamped, "negative illuminance values clamped to zero");
        }
        let mut files = Vec::new();
        for (space, series) in self.spaces.iter().zip(&self.series) {
            let dir = radiance_dir.join("output/ts").join(&space.name).join("maps");
            let ill_path = dir.join(format!("{}_map.ill", space.name));
            let rows: Vec<IllRow> = (0..self.stamps.len())
                .map(|t| IllRow {
                    stamp: self.stamps[t],
                    direct_normal: self.direct_normal[t],
                    diffuse_horizontal: self.diffuse_horizontal[t],
                    sensor: series.sensor[t],
                    grid: series.grids[t].clone(),
                })
                .collect();
            write_ill(&ill_path, &space.geometry(), &rows)?;
            files.push(ill_path);

            if space.glare_views > 0 {
                let glr_path = dir.join(format!("{}_map.glr", space.name));
                let rows: Vec<GlareRow> = self
                    .stamps
                    .iter()
                    .zip(&series.glare)
                    .map(|(stamp, values)| GlareRow {
                        stamp: *stamp,
                        values: values.clone(),
                    })
                    .collect();
                write_glr(&glr_path, &rows)?;
                files.push(glr_path);
            }

            self.store_space(space, series, store)?;
        }

        info!(
            spaces = self.spaces.len(),
            hours = self.timestamps.len(),
            "aggregated space results"
        );
        Ok(AggregateSummary {
            hours: self.timestamps.len(),
            clamped_values: self.clamped,
            files,
        })
    }

    fn store_space(
        &self,
        space: &SpaceInfo,
        series: &SpaceSeries,
        store: &mut ResultsStore,
    ) -> SimResult<()> {
        let mut insert = |name: &str, values: Vec<f64>, units: &str| -> SimResult<()> {
            let ts = TimeSeries::new(self.timestamps.clone(), values, units)?;
            store.insert_time_series(&space.name, name, ReportingFrequency::Hourly, ts)?;
            Ok(())
        };

        insert(DIRECT_NORMAL_ILLUMINANCE, self.direct_normal.clone(), "lux")?;
        insert(DIFFUSE_HORIZONTAL_ILLUMINANCE, self.diffuse_horizontal.clone(), "lux")?;
        if space.has_sensor {
            insert(SENSOR_ILLUMINANCE, series.sensor.clone(), "lux")?;
        }
        insert(
            MEAN_MAP_ILLUMINANCE,
            series.grids.iter().map(|g| mean(g).unwrap_or(0.0)).collect(),
            "lux",
        )?;
        if space.glare_views > 0 {
            let stat = |f: fn(&[f64]) -> f64| series.glare.iter().map(|g| f(g)).collect::<Vec<_>>();
            insert(MIN_DGP, stat(|g| g.iter().copied().fold(f64::INFINITY, f64::min)), "")?;
            insert(MEAN_DGP, stat(|g| mean(g).unwrap_or(0.0)), "")?;
            insert(MAX_DGP, stat(|g| g.iter().copied().fold(f64::NEG_INFINITY, f64::max)), "")?;
        }

        for group in &space.window_groups {
            if let Some(g) = self.groups.iter().position(|id| id == group) {
                let states = self
                    .shade_states
                    .iter()
                    .map(|s| s.get(g).copied().map_or(0.0, f64::from))
                    .collect();
                store.insert_time_series(
                    &format!("{}:{group}", space.name),
                    SHADE_STATE,
                    ReportingFrequency::Hourly,
                    TimeSeries::new(self.timestamps.clone(), states, "")?,
                )?;
            }
        }

        store.insert_illuminance_map(IlluminanceMapRecord {
            name: space.map_name(),
            space: space.name.clone(),
            z: space.map.origin[2],
            x_coords: space.map.x_coords(),
            y_coords: space.map.y_coords(),
            timestamps: self.timestamps.clone(),
            grids: series.grids.clone(),
        });
        Ok(())
    }
}
