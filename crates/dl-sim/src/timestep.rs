//! One simulated hour: sky vector, then matrix products.

use crate::scheduler::HourSimulator;
use crate::time_axis::SimHour;
use crate::{SimError, SimResult};
use dl_core::rgb_to_lux;
use dl_radiance::sky::{describe_sky, sky_vector};
use dl_radiance::{
    CoefficientMatrix, RadianceMatrix, SiteLocation, SkyMatrix, ThreePhasePaths, ToolInvocation,
    ToolRunner, parse_triplets, run_checked,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

pub enum SkySource {
    Matrix(Arc<SkyMatrix>),
    /// Build each hour's sky with gendaylit/gensky and genskyvec.
    PerTimestep { density: u32 },
}

pub enum PhaseInputs {
    /// `coefficients` is the loaded `dmx` for in-process products; without it
    /// `dctimestep` runs on the file.
    Single {
        dmx: PathBuf,
        coefficients: Option<CoefficientMatrix>,
    },
    Three { paths: ThreePhasePaths },
}

/// Raw point illuminance for one hour, before state selection.
#[derive(Debug, Clone, PartialEq)]
pub enum HourOutput {
    SinglePhase(Vec<f64>),
    ThreePhase {
        /// One value per controlled group.
        control: Vec<f64>,
        uncontrolled: Option<Vec<f64>>,
        /// `groups[g][state]` holds one value per point.
        groups: Vec<Vec<Vec<f64>>>,
    },
}

/// Everything an hour needs, shared read-only by the workers.
pub struct HourContext {
    pub runner: Arc<dyn ToolRunner>,
    pub radiance_dir: PathBuf,
    pub site: SiteLocation,
    pub sky: SkySource,
    pub phase: PhaseInputs,
    /// Length of every per-point vector.
    pub points: usize,
}

impl HourContext {
    fn sky_vector(&self, hour: &SimHour) -> SimResult<RadianceMatrix> {
        match &self.sky {
            SkySource::Matrix(matrix) => Ok(matrix.sky_vector(hour.hour_of_year)?),
            SkySource::PerTimestep { density } => {
                let description = describe_sky(self.runner.as_ref(), &self.site, &hour.conditions)?;
                Ok(sky_vector(self.runner.as_ref(), &description, *density)?)
            }
        }
    }

    fn dctimestep(&self, matrices: &[&Path], sky: SkyArg<'_>) -> SimResult<Vec<f64>> {
        let mut invocation = ToolInvocation::new("dctimestep")
            .cwd(self.radiance_dir.as_path())
            .args(matrices.iter().map(|p| p.to_string_lossy().into_owned()));
        invocation = match sky {
            SkyArg::File(path) => invocation.arg(path.to_string_lossy().into_owned()),
            SkyArg::Stdin(vector) => invocation.stdin(vector.to_text().into_bytes()),
        };
        let out = run_checked(self.runner.as_ref(), &invocation)?;
        Ok(parse_triplets(&out.stdout)?
            .into_iter()
            .map(rgb_to_lux)
            .collect())
    }

    fn check_points(&self, what: &str, values: Vec<f64>) -> SimResult<Vec<f64>> {
        if values.len() != self.points {
            return Err(SimError::PointCount {
                what: what.to_string(),
                expected: self.points,
                got: values.len(),
            });
        }
        Ok(values)
    }

    fn three_phase(
        &self,
        hour: &SimHour,
        paths: &ThreePhasePaths,
        sky: &RadianceMatrix,
    ) -> SimResult<HourOutput> {
        let skv = self.radiance_dir.join(format!("ts/hour_{}.skv", hour.index));
        if let Some(parent) = skv.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&skv, sky.to_text())?;

        let control = match &paths.control {
            Some(control) => {
                let rows = self.dctimestep(&[control.as_path()], SkyArg::File(&skv))?;
                let mut values = Vec::with_capacity(paths.groups.len());
                for group in &paths.groups {
                    let Some(value) = rows.get(group.control_row) else {
                        return Err(SimError::PointCount {
                            what: "window control matrix".to_string(),
                            expected: group.control_row + 1,
                            got: rows.len(),
                        });
                    };
                    values.push(*value);
                }
                values
            }
            None => Vec::new(),
        };

        let uncontrolled = match &paths.uncontrolled {
            Some(dmx) => Some(self.check_points(
                "uncontrolled apertures",
                self.dctimestep(&[dmx.as_path()], SkyArg::File(&skv))?,
            )?),
            None => None,
        };

        let mut groups = Vec::with_capacity(paths.groups.len());
        for group in &paths.groups {
            let mut states = Vec::with_capacity(group.bsdf.len());
            for bsdf in &group.bsdf {
                let matrices = [group.vmx.as_path(), bsdf.as_path(), group.dmx.as_path()];
                let values = self.dctimestep(&matrices, SkyArg::File(&skv))?;
                states.push(self.check_points(&format!("window group {}", group.id), values)?);
            }
            groups.push(states);
        }

        Ok(HourOutput::ThreePhase {
            control,
            uncontrolled,
            groups,
        })
    }
}

enum SkyArg<'a> {
    File(&'a Path),
    Stdin(&'a RadianceMatrix),
}

impl HourSimulator for HourContext {
    fn simulate(&self, hour: &SimHour) -> SimResult<HourOutput> {
        let sky = self.sky_vector(hour)?;
        trace!(hour = hour.index, patches = sky.rows(), "sky vector ready");
        match &self.phase {
            PhaseInputs::Single {
                coefficients: Some(dc),
                ..
            } => Ok(HourOutput::SinglePhase(
                self.check_points("daylight coefficients", dc.apply(&sky)?)?,
            )),
            PhaseInputs::Single {
                dmx,
                coefficients: None,
            } => Ok(HourOutput::SinglePhase(self.check_points(
                "daylight coefficients",
                self.dctimestep(&[dmx.as_path()], SkyArg::Stdin(&sky))?,
            )?)),
            PhaseInputs::Three { paths } => self.three_phase(hour, paths, &sky),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dl_radiance::{RadianceResult, SkyConditions, ToolOutput};
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<String>>,
        stdout: Vec<u8>,
    }

    impl ToolRunner for Recorder {
        fn run(&self, invocation: &ToolInvocation) -> RadianceResult<ToolOutput> {
            self.seen.lock().unwrap().push(invocation.program.clone());
            Ok(ToolOutput {
                status: Some(0),
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }
    }

    fn hour(altitude: f64) -> SimHour {
        SimHour {
            index: 3,
            timestamp: chrono::NaiveDate::from_ymd_opt(2009, 1, 1)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap(),
            hour_of_year: 0,
            conditions: SkyConditions {
                month: 1,
                day: 1,
                hour: 1,
                solar_altitude_deg: altitude,
                solar_azimuth_deg: 180.0,
                direct_normal_lux: 0.0,
                diffuse_horizontal_lux: 0.0,
                beam_efficacy: 0.0,
                diffuse_efficacy: 0.0,
            },
        }
    }

    fn site() -> SiteLocation {
        SiteLocation {
            latitude_deg: 40.0,
            longitude_deg: -105.0,
            meridian_deg: -105.0,
        }
    }

    #[test]
    fn zero_coefficients_give_zero_lux() {
        let dc = RadianceMatrix::zeros(4, 2);
        let sky = RadianceMatrix::from_data(2, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let ctx = HourContext {
            runner: Arc::new(Recorder {
                seen: Mutex::new(vec![]),
                stdout: vec![],
            }),
            radiance_dir: PathBuf::from("."),
            site: site(),
            sky: SkySource::Matrix(Arc::new(SkyMatrix::new(sky))),
            phase: PhaseInputs::Single {
                dmx: PathBuf::from("unused.dmx"),
                coefficients: Some(CoefficientMatrix::new(&dc)),
            },
            points: 4,
        };
        let out = ctx.simulate(&hour(30.0)).unwrap();
        assert_eq!(out, HourOutput::SinglePhase(vec![0.0; 4]));
    }

    #[test]
    fn per_timestep_single_phase_runs_dctimestep() {
        let runner = Arc::new(Recorder {
            seen: Mutex::new(vec![]),
            stdout: b"1 1 1\n2 2 2\n".to_vec(),
        });
        let ctx = HourContext {
            runner: runner.clone(),
            radiance_dir: PathBuf::from("."),
            site: site(),
            sky: SkySource::PerTimestep { density: 1 },
            phase: PhaseInputs::Single {
                dmx: PathBuf::from("output/dc/merged_space/maps/merged_space.dmx"),
                coefficients: None,
            },
            points: 2,
        };
        let out = ctx.simulate(&hour(30.0)).unwrap();
        let HourOutput::SinglePhase(values) = out else {
            panic!("expected single-phase output");
        };
        assert!((values[0] - 179.0).abs() < 1e-9);
        assert!((values[1] - 358.0).abs() < 1e-9);
        let seen = runner.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["gendaylit", "genskyvec", "dctimestep"]);
    }

    #[test]
    fn point_count_mismatch_is_an_error() {
        let ctx = HourContext {
            runner: Arc::new(Recorder {
                seen: Mutex::new(vec![]),
                stdout: b"1 1 1\n".to_vec(),
            }),
            radiance_dir: PathBuf::from("."),
            site: site(),
            sky: SkySource::PerTimestep { density: 1 },
            phase: PhaseInputs::Single {
                dmx: PathBuf::from("x.dmx"),
                coefficients: None,
            },
            points: 5,
        };
        assert!(matches!(
            ctx.simulate(&hour(30.0)),
            Err(SimError::PointCount { expected: 5, got: 1, .. })
        ));
    }

    fn three_phase_context(dir: &std::path::Path, control_row: usize) -> HourContext {
        let sky = RadianceMatrix::from_data(2, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        HourContext {
            // Two rows from every dctimestep call: WG1 and a stateless group.
            runner: Arc::new(Recorder {
                seen: Mutex::new(vec![]),
                stdout: b"1 1 1\n2 2 2\n".to_vec(),
            }),
            radiance_dir: dir.to_path_buf(),
            site: site(),
            sky: SkySource::Matrix(Arc::new(SkyMatrix::new(sky))),
            phase: PhaseInputs::Three {
                paths: ThreePhasePaths {
                    control: Some(dir.join("output/dc/window_controls.dmx")),
                    uncontrolled: None,
                    groups: vec![dl_radiance::GroupMatrices {
                        id: "WG1".to_string(),
                        control_row,
                        vmx: dir.join("output/dc/WG1.vmx"),
                        dmx: dir.join("output/dc/WG1.dmx"),
                        bsdf: vec![dir.join("bsdf/clear.xml")],
                    }],
                },
            },
            points: 2,
        }
    }

    #[test]
    fn control_values_follow_group_rows() {
        let dir = std::env::temp_dir().join("dl_sim_timestep_control_rows");
        let _ = std::fs::remove_dir_all(&dir);

        let out = three_phase_context(&dir, 1).simulate(&hour(30.0)).unwrap();
        let HourOutput::ThreePhase { control, groups, .. } = out else {
            panic!("expected three-phase output");
        };
        assert_eq!(control.len(), 1);
        assert!((control[0] - 358.0).abs() < 1e-9);
        assert_eq!(groups.len(), 1);

        assert!(matches!(
            three_phase_context(&dir, 2).simulate(&hour(30.0)),
            Err(SimError::PointCount { expected: 3, got: 2, .. })
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
