//! Dimming fractions and schedule normalization.

use crate::{LightingError, LightingResult};
use dl_core::{TimeSeries, hour_of_year};
use dl_model::{BuildingModel, SpaceDef};
use serde::Serialize;

pub const HOURS_PER_YEAR: usize = 8760;

/// Share of full output still needed at illuminance `measured_lux`.
pub fn dimming_fraction(setpoint_lux: f64, measured_lux: f64) -> f64 {
    ((setpoint_lux - measured_lux) / setpoint_lux).max(0.0)
}

/// Hour-of-year illuminance from a sensor series. Hours without a value read 0 lux.
pub fn measured_illuminance(sensor: &TimeSeries) -> Vec<f64> {
    let mut hours = vec![0.0; HOURS_PER_YEAR];
    for (ts, value) in sensor.iter() {
        if let Some(slot) = hours.get_mut(hour_of_year(ts)) {
            *slot = value;
        }
    }
    hours
}

/// Hourly electric lighting power of `space` in watts.
pub fn original_power(model: &BuildingModel, space: &SpaceDef) -> LightingResult<Vec<f64>> {
    let mut power = vec![0.0; HOURS_PER_YEAR];
    for lights in &space.lights {
        let schedule =
            model
                .schedule(&lights.schedule)
                .ok_or_else(|| LightingError::MissingSchedule {
                    name: lights.schedule.clone(),
                    lights: lights.name.clone(),
                })?;
        for (hour, total) in power.iter_mut().enumerate() {
            *total += lights.lighting_level_w * schedule.value_at(hour).unwrap_or(0.0);
        }
    }
    Ok(power)
}

/// Divides by the maximum. Returns the scaled values and the peak; an all-zero
/// input stays zero with a peak of 0.
pub fn normalize(values: &[f64]) -> (Vec<f64>, f64) {
    let peak = values.iter().copied().fold(0.0, f64::max);
    if peak <= 0.0 {
        return (vec![0.0; values.len()], 0.0);
    }
    (values.iter().map(|v| v / peak).collect(), peak)
}

/// Replacement lighting for one space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimmingSchedule {
    pub space: String,
    pub zone: String,
    pub setpoint_lux: f64,
    /// Rated level of the replacement lights.
    pub level_w: f64,
    pub fractions: Vec<f64>,
}

impl DimmingSchedule {
    pub fn lights_name(&self) -> String {
        format!("{} Daylight Dimmed Lights", self.space)
    }

    pub fn schedule_name(&self) -> String {
        format!("{} Daylight Dimming Schedule", self.space)
    }

    /// Dims `original` by `measured` and normalizes the result.
    pub fn build(
        space: &str,
        zone: &str,
        setpoint_lux: f64,
        measured: &[f64],
        original: &[f64],
    ) -> Self {
        let dimmed: Vec<f64> = original
            .iter()
            .zip(measured)
            .map(|(p, e)| dimming_fraction(setpoint_lux, *e) * p)
            .collect();
        let (fractions, level_w) = normalize(&dimmed);
        Self {
            space: space.to_string(),
            zone: zone.to_string(),
            setpoint_lux,
            level_w,
            fractions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn fraction_is_zero_at_and_above_setpoint() {
        assert_eq!(dimming_fraction(300.0, 300.0), 0.0);
        assert_eq!(dimming_fraction(300.0, 1200.0), 0.0);
        assert_eq!(dimming_fraction(300.0, 0.0), 1.0);
        assert_relative_eq!(dimming_fraction(400.0, 100.0), 0.75);
    }

    #[test]
    fn normalize_peaks_at_one() {
        let (values, peak) = normalize(&[0.0, 250.0, 1000.0, 500.0]);
        assert_eq!(peak, 1000.0);
        assert_eq!(values, vec![0.0, 0.25, 1.0, 0.5]);
        assert_eq!(normalize(&[0.0, 0.0]), (vec![0.0, 0.0], 0.0));
    }

    #[test]
    fn measured_hours_default_to_zero() {
        let ts = |d, h| {
            NaiveDate::from_ymd_opt(2009, 1, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        let sensor = TimeSeries::new(vec![ts(1, 1), ts(2, 13)], vec![120.0, 800.0], "lux").unwrap();
        let hours = measured_illuminance(&sensor);
        assert_eq!(hours.len(), HOURS_PER_YEAR);
        assert_eq!(hours[0], 120.0);
        assert_eq!(hours[24 + 12], 800.0);
        assert_eq!(hours.iter().filter(|v| **v != 0.0).count(), 2);
    }

    #[test]
    fn build_dims_and_normalizes() {
        let s = DimmingSchedule::build("S", "Z", 500.0, &[0.0, 250.0, 600.0], &[1000.0, 1000.0, 1000.0]);
        assert_eq!(s.level_w, 1000.0);
        assert_eq!(s.fractions, vec![1.0, 0.5, 0.0]);
        assert_eq!(s.lights_name(), "S Daylight Dimmed Lights");
        assert_eq!(s.schedule_name(), "S Daylight Dimming Schedule");
    }
}
