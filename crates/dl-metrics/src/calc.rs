//! Metric formulas.

use dl_core::TimeSeries;
use tracing::warn;

/// Useful daylight illuminance band, both bounds excluded.
pub const UDI_LOWER_LUX: f64 = 100.0;
pub const UDI_UPPER_LUX: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mask {
    Daylit,
    Occupied,
    DaylitOccupied,
}

impl Mask {
    pub const ALL: [Mask; 3] = [Mask::Daylit, Mask::Occupied, Mask::DaylitOccupied];

    pub fn label(self) -> &'static str {
        match self {
            Mask::Daylit => "daylit",
            Mask::Occupied => "occupied",
            Mask::DaylitOccupied => "daylit_occupied",
        }
    }

    fn admits(self, daylit: bool, occupied: bool) -> bool {
        match self {
            Mask::Daylit => daylit,
            Mask::Occupied => occupied,
            Mask::DaylitOccupied => daylit && occupied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Da,
    Cda,
    Udi,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Da, Metric::Cda, Metric::Udi];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Da => "da",
            Metric::Cda => "cda",
            Metric::Udi => "udi",
        }
    }

    /// Credit of one hour with illuminance `e` against `setpoint`.
    pub fn credit(self, e: f64, setpoint: f64) -> f64 {
        match self {
            Metric::Da => {
                if e >= setpoint {
                    1.0
                } else {
                    0.0
                }
            }
            Metric::Cda => {
                if e >= setpoint {
                    1.0
                } else {
                    (e / setpoint).max(0.0)
                }
            }
            Metric::Udi => {
                if e > UDI_LOWER_LUX && e < UDI_UPPER_LUX {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricTriple {
    pub sum: f64,
    pub count: usize,
    pub average: f64,
}

impl MetricTriple {
    fn from_credits(credits: impl Iterator<Item = f64>) -> Self {
        let (sum, count) = credits.fold((0.0, 0usize), |(s, n), c| (s + c, n + 1));
        Self {
            sum,
            count,
            average: if count == 0 { 0.0 } else { sum / count as f64 },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpaceMetrics {
    pub space: String,
    pub setpoint_lux: f64,
    /// Indexed `[metric][mask]` in `Metric::ALL` and `Mask::ALL` order.
    values: [[MetricTriple; 3]; 3],
}

impl SpaceMetrics {
    pub fn get(&self, metric: Metric, mask: Mask) -> MetricTriple {
        self.values[metric as usize][mask as usize]
    }

    /// `(label, triple)` for every metric and mask, e.g. `cda_occupied`.
    pub fn rows(&self) -> impl Iterator<Item = (String, MetricTriple)> + '_ {
        Metric::ALL.into_iter().flat_map(move |metric| {
            Mask::ALL.into_iter().map(move |mask| {
                (
                    format!("{}_{}", metric.label(), mask.label()),
                    self.get(metric, mask),
                )
            })
        })
    }
}

/// Metrics for one space. Hours come from `illuminance`; an hour counts as daylit
/// or occupied only when the exterior or occupancy series holds a positive value
/// at the same timestamp.
pub fn compute_space_metrics(
    space: &str,
    illuminance: &TimeSeries,
    exterior: &TimeSeries,
    occupancy: &TimeSeries,
    setpoint_lux: f64,
) -> SpaceMetrics {
    let hours: Vec<(f64, bool, bool)> = illuminance
        .iter()
        .map(|(ts, e)| {
            let daylit = exterior.value_at(ts).is_some_and(|v| v > 0.0);
            let occupied = occupancy.value_at(ts).is_some_and(|v| v > 0.0);
            (e, daylit, occupied)
        })
        .collect();

    let mut values = [[MetricTriple::default(); 3]; 3];
    for metric in Metric::ALL {
        for mask in Mask::ALL {
            values[metric as usize][mask as usize] = MetricTriple::from_credits(
                hours
                    .iter()
                    .filter(|(_, d, o)| mask.admits(*d, *o))
                    .map(|(e, _, _)| metric.credit(*e, setpoint_lux)),
            );
        }
    }
    SpaceMetrics {
        space: space.to_string(),
        setpoint_lux,
        values,
    }
}

/// Mean of the daylit-occupied DA averages.
pub fn building_average(spaces: &[SpaceMetrics]) -> f64 {
    let values: Vec<f64> = spaces
        .iter()
        .map(|s| s.get(Metric::Da, Mask::DaylitOccupied).average)
        .collect();
    if values.iter().all(|v| *v == 0.0) {
        warn!(spaces = values.len(), "every space has zero daylit-occupied DA");
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2009, 3, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn series(values: &[(u32, f64)]) -> TimeSeries {
        TimeSeries::new(
            values.iter().map(|(h, _)| at(*h)).collect(),
            values.iter().map(|(_, v)| *v).collect(),
            "",
        )
        .unwrap()
    }

    #[test]
    fn da_boundaries() {
        assert_eq!(Metric::Da.credit(300.0, 300.0), 1.0);
        assert_eq!(Metric::Da.credit(0.0, 300.0), 0.0);
        assert_eq!(Metric::Cda.credit(150.0, 300.0), 0.5);
    }

    #[test]
    fn udi_excludes_both_bounds() {
        assert_eq!(Metric::Udi.credit(100.0, 300.0), 0.0);
        assert_eq!(Metric::Udi.credit(2000.0, 300.0), 0.0);
        assert_eq!(Metric::Udi.credit(100.1, 300.0), 1.0);
        assert_eq!(Metric::Udi.credit(1999.9, 300.0), 1.0);
    }

    #[test]
    fn masks_select_hours() {
        let illum = series(&[(9, 600.0), (10, 150.0), (11, 50.0), (12, 3000.0)]);
        let exterior = series(&[(9, 1000.0), (10, 1000.0), (11, 0.0), (12, 1000.0)]);
        // Hour 12 has no occupancy record and counts as unoccupied.
        let occupancy = series(&[(9, 2.0), (10, 0.0), (11, 5.0)]);
        let m = compute_space_metrics("S", &illum, &exterior, &occupancy, 300.0);

        let da_daylit = m.get(Metric::Da, Mask::Daylit);
        assert_eq!(da_daylit.count, 3);
        assert_eq!(da_daylit.sum, 2.0);

        let cda_occ = m.get(Metric::Cda, Mask::Occupied);
        assert_eq!(cda_occ.count, 2);
        assert!((cda_occ.sum - (1.0 + 50.0 / 300.0)).abs() < 1e-12);

        let udi_both = m.get(Metric::Udi, Mask::DaylitOccupied);
        assert_eq!(udi_both.count, 1);
        assert_eq!(udi_both.average, 0.0);
    }

    #[test]
    fn empty_mask_averages_zero() {
        let illum = series(&[(9, 600.0)]);
        let none = series(&[(9, 0.0)]);
        let m = compute_space_metrics("S", &illum, &none, &none, 300.0);
        assert_eq!(m.get(Metric::Da, Mask::DaylitOccupied), MetricTriple::default());
    }

    #[test]
    fn row_labels() {
        let s = series(&[(9, 1.0)]);
        let m = compute_space_metrics("S", &s, &s, &s, 300.0);
        let labels: Vec<String> = m.rows().map(|(l, _)| l).collect();
        assert_eq!(labels.len(), 9);
        assert_eq!(labels[0], "da_daylit");
        assert_eq!(labels[5], "cda_daylit_occupied");
        assert_eq!(labels[8], "udi_daylit_occupied");
    }

    #[test]
    fn building_average_of_daylit_occupied_da() {
        let illum = series(&[(9, 600.0), (10, 100.0)]);
        let on = series(&[(9, 1.0), (10, 1.0)]);
        let a = compute_space_metrics("A", &illum, &on, &on, 300.0);
        let b = compute_space_metrics("B", &illum, &on, &on, 50.0);
        assert!((building_average(&[a.clone(), b]) - 0.75).abs() < 1e-12);

        let dark = series(&[(9, 0.0), (10, 0.0)]);
        let c = compute_space_metrics("C", &dark, &on, &on, 300.0);
        assert_eq!(building_average(&[c]), 0.0);
    }
}
