#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingModel,
    CheckingRadiance,
    MergingPoints,
    BuildingSkyMatrix,
    BuildingCoefficients,
    RunningTimesteps,
    Merging,
    Aggregating,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            RunStage::LoadingModel => "Loading model",
            RunStage::CheckingRadiance => "Checking Radiance",
            RunStage::MergingPoints => "Merging points",
            RunStage::BuildingSkyMatrix => "Building sky matrix",
            RunStage::BuildingCoefficients => "Building coefficients",
            RunStage::RunningTimesteps => "Running timesteps",
            RunStage::Merging => "Merging states",
            RunStage::Aggregating => "Aggregating",
            RunStage::SavingResults => "Saving results",
            RunStage::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HourProgress {
    pub finished: usize,
    pub total: usize,
}

impl HourProgress {
    pub fn fraction_complete(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.finished as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub hours: Option<HourProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            hours: None,
        }
    }
}
