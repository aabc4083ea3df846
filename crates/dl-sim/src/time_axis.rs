//! Simulated hours and the solar series that drive them.

use crate::config::SimulationConfig;
use crate::{SimError, SimResult};
use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use dl_core::{TimeSeries, hour_of_year};
use dl_radiance::SkyConditions;
use dl_results::{ReportingFrequency, ResultsStore};
use tracing::{debug, warn};

pub const ENVIRONMENT_KEY: &str = "Environment";
pub const EXTERIOR_HORIZONTAL_ILLUMINANCE: &str = "Site Exterior Horizontal Sky Illuminance";
pub const BEAM_NORMAL_ILLUMINANCE: &str = "Site Exterior Beam Normal Illuminance";
pub const DIFFUSE_EFFICACY: &str = "Site Sky Diffuse Solar Radiation Luminous Efficacy";
pub const BEAM_EFFICACY: &str = "Site Beam Solar Radiation Luminous Efficacy";
pub const SOLAR_ALTITUDE: &str = "Site Solar Altitude Angle";
pub const SOLAR_AZIMUTH: &str = "Site Solar Azimuth Angle";

/// Hourly solar reference data from the energy simulation.
#[derive(Debug, Clone)]
pub struct SolarSeries {
    pub diffuse_horizontal: TimeSeries,
    pub direct_normal: TimeSeries,
    pub diffuse_efficacy: TimeSeries,
    pub beam_efficacy: TimeSeries,
    pub altitude: TimeSeries,
    pub azimuth: TimeSeries,
}

impl SolarSeries {
    pub fn from_store(store: &ResultsStore) -> SimResult<Self> {
        let get = |name: &str| -> SimResult<TimeSeries> {
            store
                .time_series(ENVIRONMENT_KEY, name, ReportingFrequency::Hourly)
                .cloned()
                .ok_or_else(|| SimError::MissingTimeSeries {
                    key: ENVIRONMENT_KEY.to_string(),
                    name: name.to_string(),
                })
        };
        Ok(Self {
            diffuse_horizontal: get(EXTERIOR_HORIZONTAL_ILLUMINANCE)?,
            direct_normal: get(BEAM_NORMAL_ILLUMINANCE)?,
            diffuse_efficacy: get(DIFFUSE_EFFICACY)?,
            beam_efficacy: get(BEAM_EFFICACY)?,
            altitude: get(SOLAR_ALTITUDE)?,
            azimuth: get(SOLAR_AZIMUTH)?,
        })
    }

    fn conditions_at(&self, timestamp: NaiveDateTime) -> Option<[f64; 6]> {
        Some([
            self.altitude.value_at(timestamp)?,
            self.azimuth.value_at(timestamp)?,
            self.direct_normal.value_at(timestamp)?,
            self.diffuse_horizontal.value_at(timestamp)?,
            self.beam_efficacy.value_at(timestamp)?,
            self.diffuse_efficacy.value_at(timestamp)?,
        ])
    }
}

/// One simulated hour.
#[derive(Debug, Clone, PartialEq)]
pub struct SimHour {
    /// Position in the simulated sequence.
    pub index: usize,
    /// End of the reporting interval.
    pub timestamp: NaiveDateTime,
    /// Zero-based sky-matrix column.
    pub hour_of_year: usize,
    pub conditions: SkyConditions,
}

impl SimHour {
    pub fn month(&self) -> u32 {
        self.conditions.month
    }

    pub fn day(&self) -> u32 {
        self.conditions.day
    }

    /// Hour ending, 1..=24.
    pub fn hour(&self) -> u32 {
        self.conditions.hour
    }
}

/// Builds the chronological axis from the altitude series, applying the config filters.
pub fn build_time_axis(solar: &SolarSeries, config: &SimulationConfig) -> Vec<SimHour> {
    let mut hours = Vec::new();
    let mut incomplete = 0usize;
    for timestamp in solar.altitude.timestamps().iter().copied() {
        let start = timestamp - Duration::hours(1);
        let (month, day, hour) = (start.month(), start.day(), start.hour() + 1);
        if !config.includes(month, day, hour) {
            continue;
        }
        let Some([alt, azi, dni, dhi, beam_eff, diff_eff]) = solar.conditions_at(timestamp) else {
            incomplete += 1;
            continue;
        };
        hours.push(SimHour {
            index: hours.len(),
            timestamp,
            hour_of_year: hour_of_year(timestamp),
            conditions: SkyConditions {
                month,
                day,
                hour,
                solar_altitude_deg: alt,
                solar_azimuth_deg: azi,
                direct_normal_lux: dni,
                diffuse_horizontal_lux: dhi,
                beam_efficacy: beam_eff,
                diffuse_efficacy: diff_eff,
            },
        });
    }
    if incomplete > 0 {
        warn!(hours = incomplete, "hours missing solar data were left out");
    }
    debug!(hours = hours.len(), "time axis built");
    hours
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(hours: &[u32], values: &[f64]) -> TimeSeries {
        let ts = hours
            .iter()
            .map(|h| {
                NaiveDate::from_ymd_opt(2009, 6, 21)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    + Duration::hours(i64::from(*h))
            })
            .collect();
        TimeSeries::new(ts, values.to_vec(), "").unwrap()
    }

    fn solar() -> SolarSeries {
        let h = [11, 12, 13];
        SolarSeries {
            diffuse_horizontal: series(&h, &[10000.0, 11000.0, 12000.0]),
            direct_normal: series(&h, &[50000.0, 60000.0, 55000.0]),
            diffuse_efficacy: series(&h, &[120.0; 3]),
            beam_efficacy: series(&h, &[95.0; 3]),
            altitude: series(&h, &[60.0, 70.0, 65.0]),
            azimuth: series(&[11, 13], &[150.0, 210.0]),
        }
    }

    #[test]
    fn axis_carries_hour_ending_and_column() {
        let hours = build_time_axis(&solar(), &SimulationConfig::default());
        // Hour 12 has no azimuth and is dropped.
        assert_eq!(hours.len(), 2);
        assert_eq!(hours[0].hour(), 11);
        assert_eq!(hours[0].day(), 21);
        assert_eq!(hours[1].index, 1);
        assert_eq!(hours[1].hour(), 13);
        // June 21st is day 172.
        assert_eq!(hours[0].hour_of_year, 171 * 24 + 10);
        assert_eq!(hours[1].conditions.solar_azimuth_deg, 210.0);
    }

    #[test]
    fn hour_filter_applies() {
        let config = SimulationConfig {
            hours: vec![13],
            ..SimulationConfig::default()
        };
        let hours = build_time_axis(&solar(), &config);
        assert_eq!(hours.len(), 1);
        assert_eq!(hours[0].index, 0);
        assert_eq!(hours[0].conditions.direct_normal_lux, 55000.0);
    }

    #[test]
    fn missing_series_is_fatal() {
        let store = ResultsStore::create(
            std::path::PathBuf::from("unused"),
            dl_results::StoreManifest {
                run_id: "x".to_string(),
                model_name: "m".to_string(),
                timestamp: String::new(),
                method: String::new(),
                description: None,
            },
        );
        let err = SolarSeries::from_store(&store).unwrap_err();
        assert!(matches!(err, SimError::MissingTimeSeries { .. }));
    }
}
