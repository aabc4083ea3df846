//! Daylight coefficient matrices.
//!
//! Expected layout of the exported Radiance directory:
//!
//! ```text
//! materials/materials.rad      scene materials
//! materials/materials_vmx.rad  glow materials named after each controlled window group
//! model.rad                    opaque geometry and uncontrolled glazing
//! scene/glazing/<group>.rad    glazing of one controlled window group
//! numeric/                     sensor point files
//! numeric/window_controls.map  one shading-control point per controlled group
//! options/                     treg.opt, dmx.opt, vmx.opt
//! views/<name>.vfh             glare views (optional)
//! bsdf/                        BSDF state files
//! ```

use crate::matrix::{CoefficientMatrix, RadianceMatrix};
use crate::options::CoefficientOptions;
use crate::points::MERGED_POINTS;
use crate::tool::{ToolInvocation, ToolRunner, run_checked, run_pipeline};
use crate::{RadianceError, RadianceResult};
use dl_core::{azimuth_vector, deg};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DC_SKY: &str = "skies/dc.sky";
pub const SINGLE_PHASE_DMX: &str = "output/dc/merged_space/maps/merged_space.dmx";
pub const WINDOW_CONTROL_POINTS: &str = "numeric/window_controls.map";

const DC_SKY_TEXT: &str = "void glow skyglow 0 0 4 1 1 1 0\nskyglow source sky 0 0 4 0 0 1 360\n";

/// A window group as the coefficient builder and the merger see it.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGroupSpec {
    pub id: String,
    pub azimuth_deg: f64,
    pub setpoint_lux: f64,
    /// BSDF file names under `bsdf/`, at most two are used.
    pub states: Vec<String>,
    /// Row of this group's point in `numeric/window_controls.map`.
    pub control_row: usize,
}

/// Matrix files of one controlled window group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMatrices {
    pub id: String,
    pub control_row: usize,
    pub vmx: PathBuf,
    pub dmx: PathBuf,
    pub bsdf: Vec<PathBuf>,
}

/// Everything the per-hour three-phase step multiplies.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreePhasePaths {
    /// `controls x patches`, one row per controlled group of the model.
    pub control: Option<PathBuf>,
    /// Combined view/daylight matrix of uncontrolled apertures.
    pub uncontrolled: Option<PathBuf>,
    pub groups: Vec<GroupMatrices>,
}

impl ThreePhasePaths {
    /// Matrices left by an earlier build, for runs that skip the coefficient step.
    pub fn existing(
        radiance_dir: &Path,
        groups: &[WindowGroupSpec],
        has_uncontrolled: bool,
    ) -> RadianceResult<Self> {
        let require = |relative: String| -> RadianceResult<PathBuf> {
            let path = radiance_dir.join(relative);
            if path.is_file() {
                Ok(path)
            } else {
                Err(RadianceError::MatrixFormat {
                    what: format!("{} not found, rebuild coefficients", path.display()),
                })
            }
        };
        let mut matrices = Vec::with_capacity(groups.len());
        for group in groups {
            matrices.push(GroupMatrices {
                id: group.id.clone(),
                control_row: group.control_row,
                vmx: require(format!("output/dc/{}.vmx", group.id))?,
                dmx: require(format!("output/dc/{}.dmx", group.id))?,
                bsdf: group
                    .states
                    .iter()
                    .take(2)
                    .map(|s| radiance_dir.join("bsdf").join(s))
                    .collect(),
            });
        }
        Ok(Self {
            control: if groups.is_empty() {
                None
            } else {
                Some(require("output/dc/window_controls.dmx".to_string())?)
            },
            uncontrolled: if has_uncontrolled {
                Some(require("output/dc/WG0.dmx".to_string())?)
            } else {
                None
            },
            groups: matrices,
        })
    }
}

pub struct CoefficientBuilder<'a> {
    runner: &'a dyn ToolRunner,
    radiance_dir: &'a Path,
    options: &'a CoefficientOptions,
    cores: usize,
}

impl<'a> CoefficientBuilder<'a> {
    pub fn new(
        runner: &'a dyn ToolRunner,
        radiance_dir: &'a Path,
        options: &'a CoefficientOptions,
        cores: usize,
    ) -> Self {
        Self {
            runner,
            radiance_dir,
            options,
            cores,
        }
    }

    /// Builds the merged-space coefficient matrix from `numeric/merged_space.map`.
    pub fn single_phase(&self) -> RadianceResult<PathBuf> {
        let octree = self.dc_octree()?;
        let points = std::fs::read(self.radiance_dir.join(MERGED_POINTS))?;
        let invocation = self
            .rcontrib()
            .args(self.options.vmx.iter().cloned())
            .args(self.parallel_args())
            .arg("-I+")
            .args(self.options.sky_binning.iter().cloned())
            .args(["-m", "skyglow"])
            .arg(path_arg(&octree))
            .stdin(points);
        info!("computing single-phase daylight coefficients");
        let out = run_checked(self.runner, &invocation)?;
        self.write_output(SINGLE_PHASE_DMX, &out.stdout)
    }

    /// Builds view, daylight, uncontrolled and window-control matrices.
    pub fn three_phase(
        &self,
        groups: &[WindowGroupSpec],
        has_uncontrolled: bool,
    ) -> RadianceResult<ThreePhasePaths> {
        let octree = self.dc_octree()?;
        std::fs::create_dir_all(self.radiance_dir.join("output/dc"))?;

        let mut matrices = Vec::with_capacity(groups.len());
        for group in groups {
            // Sample from inside looking out through the window.
            let (x, y) = azimuth_vector(deg(group.azimuth_deg));
            let glazing = format!("scene/glazing/{}.rad", group.id);
            let sample = ToolInvocation::new("genklemsamp")
                .cwd(self.radiance_dir)
                .args(self.options.klems_sampling.iter().cloned())
                .args(["-vd".to_string(), fmt(-x), fmt(-y), "0".to_string()])
                .arg(glazing);
            let contrib = self
                .rcontrib()
                .args(self.options.klems_sampling.iter().cloned())
                .args(self.options.dmx.iter().cloned())
                .args(self.parallel_args())
                .arg("-fa")
                .args(self.options.sky_binning.iter().cloned())
                .args(["-m", "skyglow"])
                .arg(path_arg(&octree));
            info!(group = %group.id, "computing daylight matrix");
            let out = run_pipeline(self.runner, &[sample, contrib])?;
            let dmx = self.write_output(&format!("output/dc/{}.dmx", group.id), &out.stdout)?;

            if group.states.len() > 2 {
                warn!(
                    group = %group.id,
                    states = group.states.len(),
                    "only the first two BSDF states are supported"
                );
            }
            matrices.push(GroupMatrices {
                id: group.id.clone(),
                control_row: group.control_row,
                vmx: self.radiance_dir.join(format!("output/dc/{}.vmx", group.id)),
                dmx,
                bsdf: group
                    .states
                    .iter()
                    .take(2)
                    .map(|s| self.radiance_dir.join("bsdf").join(s))
                    .collect(),
            });
        }

        if !groups.is_empty() {
            self.view_matrices(groups)?;
        }

        let uncontrolled = if has_uncontrolled {
            let points = std::fs::read(self.radiance_dir.join(MERGED_POINTS))?;
            let invocation = self
                .rcontrib()
                .args(self.options.vmx.iter().cloned())
                .args(self.parallel_args())
                .arg("-I+")
                .args(self.options.sky_binning.iter().cloned())
                .args(["-m", "skyglow"])
                .arg(path_arg(&octree))
                .stdin(points);
            info!("computing uncontrolled aperture matrix");
            let out = run_checked(self.runner, &invocation)?;
            Some(self.write_output("output/dc/WG0.dmx", &out.stdout)?)
        } else {
            None
        };

        let control = if groups.is_empty() {
            None
        } else {
            let control_points = std::fs::read(self.radiance_dir.join(WINDOW_CONTROL_POINTS))
                .map_err(|e| RadianceError::PointFile {
                    path: self.radiance_dir.join(WINDOW_CONTROL_POINTS),
                    reason: e.to_string(),
                })?;
            let invocation = self
                .rcontrib()
                .args(self.options.vmx.iter().cloned())
                .args(self.parallel_args())
                .arg("-I+")
                .args(self.options.sky_binning.iter().cloned())
                .args(["-m", "skyglow"])
                .arg(path_arg(&octree))
                .stdin(control_points);
            info!("computing window control point matrix");
            let out = run_checked(self.runner, &invocation)?;
            Some(self.write_output("output/dc/window_controls.dmx", &out.stdout)?)
        };

        Ok(ThreePhasePaths {
            control,
            uncontrolled,
            groups: matrices,
        })
    }

    /// One rcontrib call writes `output/dc/<group>.vmx` for every controlled group.
    fn view_matrices(&self, groups: &[WindowGroupSpec]) -> RadianceResult<()> {
        let mut scene = vec![
            "materials/materials.rad".to_string(),
            "materials/materials_vmx.rad".to_string(),
            "model.rad".to_string(),
        ];
        scene.extend(groups.iter().map(|g| format!("scene/glazing/{}.rad", g.id)));
        let octree = self.octree("model_vmx", &scene)?;

        let mut invocation = self
            .rcontrib()
            .args(self.options.vmx.iter().cloned())
            .args(self.parallel_args())
            .args(["-I+", "-fo", "-o", "output/dc/%s.vmx", "-f", "klems_full.cal"]);
        for group in groups {
            let (x, y) = azimuth_vector(deg(group.azimuth_deg));
            invocation = invocation
                .arg("-b")
                .arg(format!("kbin({},{},0,0,0,1)", fmt(x), fmt(y)))
                .args(["-bn", "Nkbins", "-m"])
                .arg(group.id.clone());
        }
        let points = std::fs::read(self.radiance_dir.join(MERGED_POINTS))?;
        info!(groups = groups.len(), "computing view matrices");
        run_checked(self.runner, &invocation.arg(path_arg(&octree)).stdin(points))?;
        Ok(())
    }

    /// Renders coefficient images for each `views/*.vfh`, capped at `max_dimension` pixels.
    pub fn view_images(&self, max_dimension: u32) -> RadianceResult<Vec<PathBuf>> {
        let views_dir = self.radiance_dir.join("views");
        if !views_dir.is_dir() {
            return Ok(Vec::new());
        }
        let octree = self.dc_octree()?;
        let mut view_files: Vec<PathBuf> = std::fs::read_dir(&views_dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "vfh"))
            .collect();
        view_files.sort();

        let dims = max_dimension.to_string();
        let mut outputs = Vec::with_capacity(view_files.len());
        for view in view_files {
            let stem = view
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let out_dir = self.radiance_dir.join("output/dc/views").join(&stem);
            std::fs::create_dir_all(&out_dir)?;
            let view_arg = format!("views/{stem}.vfh");

            let resolution = ToolInvocation::new("vwrays")
                .cwd(self.radiance_dir)
                .args(["-d", "-x", dims.as_str(), "-y", dims.as_str(), "-vf"])
                .arg(view_arg.clone());
            let resolution = run_checked(self.runner, &resolution)?.stdout_text();

            let rays = ToolInvocation::new("vwrays")
                .cwd(self.radiance_dir)
                .args(["-ff", "-x", dims.as_str(), "-y", dims.as_str(), "-vf"])
                .arg(view_arg);
            let contrib = self
                .rcontrib()
                .arg("-ffc")
                .args(resolution.split_whitespace().map(str::to_string))
                .args(self.options.vmx.iter().cloned())
                .args(self.parallel_args())
                .args(["-fo", "-o"])
                .arg(format!("output/dc/views/{stem}/treg%03d.hdr"))
                .args(self.options.sky_binning.iter().cloned())
                .args(["-m", "skyglow"])
                .arg(path_arg(&octree));
            info!(view = %stem, "rendering view coefficient images");
            run_pipeline(self.runner, &[rays, contrib])?;
            outputs.push(out_dir);
        }
        Ok(outputs)
    }

    fn dc_octree(&self) -> RadianceResult<PathBuf> {
        let sky = self.radiance_dir.join(DC_SKY);
        if let Some(parent) = sky.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&sky, DC_SKY_TEXT)?;
        self.octree(
            "model_dc",
            &[
                "materials/materials.rad".to_string(),
                "model.rad".to_string(),
                DC_SKY.to_string(),
            ],
        )
    }

    fn octree(&self, name: &str, scene: &[String]) -> RadianceResult<PathBuf> {
        let invocation = ToolInvocation::new("oconv")
            .cwd(self.radiance_dir)
            .args(scene.iter().cloned());
        let out = run_checked(self.runner, &invocation)?;
        let relative = format!("octrees/{name}.oct");
        self.write_output(&relative, &out.stdout)?;
        // Tools run inside the radiance directory, so callers get the relative path.
        Ok(PathBuf::from(relative))
    }

    fn rcontrib(&self) -> ToolInvocation {
        ToolInvocation::new("rcontrib").cwd(self.radiance_dir)
    }

    /// rcontrib multiprocessing is unavailable on Windows.
    fn parallel_args(&self) -> Vec<String> {
        if cfg!(windows) || self.cores <= 1 {
            Vec::new()
        } else {
            vec!["-n".to_string(), self.cores.to_string()]
        }
    }

    fn write_output(&self, relative: &str, bytes: &[u8]) -> RadianceResult<PathBuf> {
        if bytes.is_empty() {
            return Err(RadianceError::EmptyOutput {
                tool: format!("coefficients for {relative}"),
            });
        }
        let path = self.radiance_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Loads a points x patches coefficient matrix for in-process products.
pub fn load_coefficients(path: &Path, points: usize) -> RadianceResult<CoefficientMatrix> {
    let bytes = std::fs::read(path)?;
    let matrix = RadianceMatrix::parse_with_rows(&bytes, points)?;
    if matrix.rows() != points {
        return Err(RadianceError::MatrixFormat {
            what: format!(
                "{} has {} rows, expected {points} sensor points",
                path.display(),
                matrix.rows()
            ),
        });
    }
    Ok(CoefficientMatrix::new(&matrix))
}

fn fmt(v: f64) -> String {
    format!("{v:.6}")
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
