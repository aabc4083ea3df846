//! Sky generation: the annual sky matrix and per-hour sky descriptions.

use crate::matrix::{RadianceMatrix, SkyMatrix, parse_triplets};
use crate::tool::{ToolInvocation, ToolRunner, run_checked};
use crate::{RadianceError, RadianceResult};
use std::path::Path;
use tracing::{debug, warn};

/// gendaylit output containing any of these words means the Perez model was not applicable.
const GENDAYLIT_COMPLAINTS: &[&str] = &["warning", "error", "valid", "check", "skyclearness"];

/// gendaylit rejects components below this many lux.
const MIN_COMPONENT_LUX: f64 = 1.0;
const FLOOR_COMPONENT_LUX: f64 = 0.001;

/// Sky and ground glow sources appended to generated sky functions.
const SKY_GLOW: &str = "\
skyfunc glow sky_glow 0 0 4 1 1 1 0
sky_glow source sky 0 0 4 0 0 1 180
skyfunc glow ground_glow 0 0 4 1 1 1 0
ground_glow source ground 0 0 4 0 0 -1 180
";

/// Site position in the sign convention of the model (longitude east positive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteLocation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub meridian_deg: f64,
}

/// Solar and sky state for one simulated hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyConditions {
    pub month: u32,
    pub day: u32,
    /// Hour ending, 1..=24.
    pub hour: u32,
    pub solar_altitude_deg: f64,
    /// Degrees clockwise from north.
    pub solar_azimuth_deg: f64,
    pub direct_normal_lux: f64,
    pub diffuse_horizontal_lux: f64,
    /// Beam luminous efficacy (lm/W).
    pub beam_efficacy: f64,
    /// Diffuse luminous efficacy (lm/W).
    pub diffuse_efficacy: f64,
}

impl SkyConditions {
    pub fn sun_up(&self) -> bool {
        self.solar_altitude_deg >= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyModel {
    /// Perez all-weather sky from gendaylit.
    Perez,
    /// CIE sky from gensky, used when gendaylit refuses the inputs.
    Cie,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkyDescription {
    pub model: SkyModel,
    pub text: String,
}

/// Builds the sky description for one hour, falling back from gendaylit to gensky.
pub fn describe_sky(
    runner: &dyn ToolRunner,
    site: &SiteLocation,
    sky: &SkyConditions,
) -> RadianceResult<SkyDescription> {
    let perez = ToolInvocation::new("gendaylit").args([
        "-ang".to_string(),
        format!("{:.4}", sky.solar_altitude_deg),
        format!("{:.4}", sky.solar_azimuth_deg - 180.0),
        "-L".to_string(),
        format!("{:.4}", floor_component(sky.direct_normal_lux)),
        format!("{:.4}", floor_component(sky.diffuse_horizontal_lux)),
    ]);

    match run_checked(runner, &perez) {
        Ok(out) => {
            let text = out.stdout_text();
            match complaint(&text).or_else(|| complaint(&out.stderr)) {
                None => {
                    return Ok(SkyDescription {
                        model: SkyModel::Perez,
                        text: text + SKY_GLOW,
                    });
                }
                Some(word) => warn!(
                    month = sky.month,
                    day = sky.day,
                    hour = sky.hour,
                    word,
                    "gendaylit rejected conditions, falling back to gensky"
                ),
            }
        }
        Err(e) => warn!(error = %e, "gendaylit failed, falling back to gensky"),
    }

    // gensky takes longitude and meridian as degrees west.
    let cie = ToolInvocation::new("gensky").args([
        sky.month.to_string(),
        sky.day.to_string(),
        format!("{}:00", sky.hour),
        "-a".to_string(),
        format!("{:.4}", site.latitude_deg),
        "-o".to_string(),
        format!("{:.4}", -site.longitude_deg),
        "-m".to_string(),
        format!("{:.4}", -site.meridian_deg),
        "-R".to_string(),
        format!("{:.4}", to_irradiance(sky.direct_normal_lux, sky.beam_efficacy)),
        "-B".to_string(),
        format!(
            "{:.4}",
            to_irradiance(sky.diffuse_horizontal_lux, sky.diffuse_efficacy)
        ),
    ]);
    let out = run_checked(runner, &cie)?;
    Ok(SkyDescription {
        model: SkyModel::Cie,
        text: out.stdout_text() + SKY_GLOW,
    })
}

/// Runs genskyvec on a sky description and returns the `patches x 1` sky vector.
pub fn sky_vector(
    runner: &dyn ToolRunner,
    sky: &SkyDescription,
    density: u32,
) -> RadianceResult<RadianceMatrix> {
    let invocation = ToolInvocation::new("genskyvec")
        .args(["-m".to_string(), density.to_string()])
        .stdin(sky.text.clone().into_bytes());
    let out = run_checked(runner, &invocation)?;
    let triplets = parse_triplets(&out.stdout)?;
    if triplets.is_empty() {
        return Err(RadianceError::EmptyOutput {
            tool: "genskyvec".to_string(),
        });
    }
    let rows = triplets.len();
    RadianceMatrix::from_data(rows, 1, triplets.into_iter().flatten().collect())
}

/// Runs gendaymtx once over the annual weather file.
pub struct SkyMatrixGenerator<'a> {
    runner: &'a dyn ToolRunner,
    working_dir: &'a Path,
}

impl<'a> SkyMatrixGenerator<'a> {
    pub fn new(runner: &'a dyn ToolRunner, working_dir: &'a Path) -> Self {
        Self {
            runner,
            working_dir,
        }
    }

    /// Generates the sky matrix. With `allow_legacy`, an empty float output is retried
    /// once in ASCII for gendaymtx builds that predate `-of`.
    pub fn generate(
        &self,
        weather: &Path,
        density: u32,
        allow_legacy: bool,
    ) -> RadianceResult<SkyMatrix> {
        let base = ToolInvocation::new("gendaymtx")
            .args(["-m".to_string(), density.to_string()])
            .cwd(self.working_dir);
        let weather_arg = weather.to_string_lossy().into_owned();

        let out = run_checked(self.runner, &base.clone().arg("-of").arg(&weather_arg))?;
        let out = if out.stdout.is_empty() {
            if !allow_legacy {
                return Err(RadianceError::EmptyOutput {
                    tool: "gendaymtx".to_string(),
                });
            }
            warn!("gendaymtx produced no float output, retrying with legacy ASCII output");
            let legacy = run_checked(self.runner, &base.arg(&weather_arg))?;
            if legacy.stdout.is_empty() {
                return Err(RadianceError::EmptyOutput {
                    tool: "gendaymtx".to_string(),
                });
            }
            legacy
        } else {
            out
        };

        let matrix = RadianceMatrix::parse(&out.stdout)?;
        debug!(
            patches = matrix.rows(),
            hours = matrix.cols(),
            "sky matrix generated"
        );
        Ok(SkyMatrix::new(matrix))
    }
}

fn floor_component(lux: f64) -> f64 {
    if lux < MIN_COMPONENT_LUX {
        FLOOR_COMPONENT_LUX
    } else {
        lux
    }
}

fn to_irradiance(lux: f64, efficacy: f64) -> f64 {
    if efficacy.is_finite() && efficacy > 0.0 {
        lux / efficacy
    } else {
        0.0
    }
}

fn complaint(text: &str) -> Option<&'static str> {
    let lower = text.to_ascii_lowercase();
    GENDAYLIT_COMPLAINTS
        .iter()
        .copied()
        .find(|word| lower.contains(word))
}
