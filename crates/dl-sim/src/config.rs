//! Simulation configuration.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum SimulationMethod {
    #[default]
    SinglePhase,
    ThreePhase,
}

impl SimulationMethod {
    pub fn label(self) -> &'static str {
        match self {
            SimulationMethod::SinglePhase => "single-phase",
            SimulationMethod::ThreePhase => "three-phase",
        }
    }
}

/// Where each hour's sky vector comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum SkyMode {
    /// Columns of the annual `gendaymtx` matrix.
    #[default]
    SkyMatrix,
    /// `gendaylit`/`gensky` then `genskyvec` for every hour.
    PerTimestep,
}

/// Immutable run configuration, built once by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationConfig {
    pub radiance_dir: PathBuf,
    pub method: SimulationMethod,
    pub sky_mode: SkyMode,
    /// Months to simulate, all when empty.
    pub months: Vec<u32>,
    /// Days of the month to simulate, all when empty.
    pub days: Vec<u32>,
    /// Hour-ending values (1..=24) to simulate, all when empty.
    pub hours: Vec<u32>,
    /// Sanitized space names, all spaces with a map when `None`.
    pub spaces: Option<Vec<String>>,
    pub cores: Option<usize>,
    pub max_image_dimension: u32,
    pub glare: bool,
    pub join_timeout: Duration,
    /// Rebuild coefficient matrices; otherwise reuse the ones on disk.
    pub build_coefficients: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            radiance_dir: PathBuf::from("radiance"),
            method: SimulationMethod::default(),
            sky_mode: SkyMode::default(),
            months: Vec::new(),
            days: Vec::new(),
            hours: Vec::new(),
            spaces: None,
            cores: None,
            max_image_dimension: 400,
            glare: false,
            join_timeout: Duration::from_secs(200),
            build_coefficients: true,
        }
    }
}

impl SimulationConfig {
    pub fn includes(&self, month: u32, day: u32, hour: u32) -> bool {
        let pass = |filter: &[u32], v: u32| filter.is_empty() || filter.contains(&v);
        pass(&self.months, month) && pass(&self.days, day) && pass(&self.hours, hour)
    }
}

pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Worker count for a request against the available cores.
///
/// Requests above `available` are capped. Without a request one core is left
/// free, unless there is only one.
pub fn resolve_worker_count(requested: Option<usize>, available: usize) -> usize {
    let available = available.max(1);
    match requested {
        Some(n) if n > available => {
            warn!(requested = n, available, "requested more cores than available");
            available
        }
        Some(n) => n.max(1),
        None if available == 1 => 1,
        None => available - 1,
    }
}
