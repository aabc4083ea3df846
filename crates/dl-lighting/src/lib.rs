//! dl-lighting: daylight-driven dimming schedules.
//!
//! Replaces the fixed lighting of daylit zones with a normalized hourly schedule
//! derived from simulated sensor illuminance.

pub mod dimming;
pub mod setpoint;
pub mod synthesize;

pub use dimming::{
    DimmingSchedule, HOURS_PER_YEAR, dimming_fraction, measured_illuminance, normalize,
    original_power,
};
pub use setpoint::{ZoneControl, resolve_setpoint};
pub use synthesize::{ScheduleSynthesis, apply_schedules, synthesize_schedules};

pub type LightingResult<T> = Result<T, LightingError>;

#[derive(thiserror::Error, Debug)]
pub enum LightingError {
    #[error("No daylighting setpoint for zone {zone}")]
    UnresolvedSetpoint { zone: String },

    #[error("Space {space} has zero total lighting level")]
    ZeroLightingLevel { space: String },

    #[error("Schedule not found: {name} (lights {lights})")]
    MissingSchedule { name: String, lights: String },

    #[error("Missing time series: {key} / {name}")]
    MissingTimeSeries { key: String, name: String },

    #[error("Validation error: {0}")]
    Validation(#[from] dl_model::ValidationError),
}
