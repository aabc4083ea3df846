//! dl-radiance: orchestration of the Radiance command-line tools.
//!
//! Ray tracing stays inside the Radiance binaries. This crate owns:
//! - tool (typed subprocess invocations and the `ToolRunner` seam)
//! - env (locating the installation, PATH/RAYPATH, script interpreters)
//! - matrix (Radiance matrix text/float format, coefficient products)
//! - options (coefficient option files)
//! - points (per-space sensor point files and their merged layout)
//! - sky (sky matrix generation and per-hour sky vectors)
//! - coefficients (daylight, view and window-control coefficient matrices)

pub mod coefficients;
pub mod env;
pub mod matrix;
pub mod options;
pub mod points;
pub mod sky;
pub mod tool;

pub use coefficients::{
    CoefficientBuilder, GroupMatrices, ThreePhasePaths, WindowGroupSpec, load_coefficients,
};
pub use env::RadianceEnv;
pub use matrix::{CoefficientMatrix, RadianceMatrix, SkyMatrix, parse_triplets};
pub use options::CoefficientOptions;
pub use points::{PointLayout, SpacePoints};
pub use sky::{SiteLocation, SkyConditions, SkyDescription, SkyMatrixGenerator, SkyModel};
pub use tool::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner, run_checked, run_pipeline};

use std::path::PathBuf;

pub type RadianceResult<T> = Result<T, RadianceError>;

#[derive(thiserror::Error, Debug)]
pub enum RadianceError {
    #[error("Cannot find required Radiance executable: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} exited with status {status:?}: {stderr}")]
    ToolFailed {
        tool: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("{tool} reported a problem: {message}")]
    ToolWarning { tool: String, message: String },

    #[error("{tool} produced no output")]
    EmptyOutput { tool: String },

    #[error("Matrix format error: {what}")]
    MatrixFormat { what: String },

    #[error("Option file {path}: {reason}")]
    OptionFile { path: PathBuf, reason: String },

    #[error("Point file {path}: {reason}")]
    PointFile { path: PathBuf, reason: String },

    #[error("Empty pipeline")]
    EmptyPipeline,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] dl_core::DlError),
}
