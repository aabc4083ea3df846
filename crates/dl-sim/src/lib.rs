//! Annual daylight simulation.
//!
//! Provides:
//! - Simulation configuration and the worker-count policy
//! - The simulated time axis built from the source store's solar series
//! - Per-hour sky and matrix products against Radiance coefficients
//! - A bounded worker pool that runs hours and collects them in order
//! - Window-group state selection for three-phase runs
//! - Aggregation of raw point vectors into per-space series and result files

pub mod aggregate;
pub mod config;
pub mod error;
pub mod merger;
pub mod scheduler;
pub mod spaces;
pub mod time_axis;
pub mod timestep;

pub use aggregate::{AggregateSummary, Aggregator};
pub use config::{
    SimulationConfig, SimulationMethod, SkyMode, available_cores, resolve_worker_count,
};
pub use error::{SimError, SimResult};
pub use merger::{MergedHour, merge_hour, select_state};
pub use scheduler::{HourOutcome, HourSimulator, HourStatus, schedule_hours};
pub use spaces::{SpaceInfo, SpaceSelection, check_layout, select_spaces, window_groups};
pub use time_axis::{SimHour, SolarSeries, build_time_axis};
pub use timestep::{HourContext, HourOutput, PhaseInputs, SkySource};
