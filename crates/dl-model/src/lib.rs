//! dl-model: building model file format, lookups and validation.

pub mod lookup;
pub mod schema;
pub mod validate;

pub use lookup::ResolvedControl;
pub use schema::*;
pub use validate::{ValidationError, validate_model};

/// Newest model file version this crate reads and writes.
pub const LATEST_VERSION: u32 = 1;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ModelResult<BuildingModel> {
    let content = std::fs::read_to_string(path)?;
    let model: BuildingModel = serde_yaml::from_str(&content)?;
    validate_model(&model)?;
    Ok(model)
}

pub fn save_yaml(path: &std::path::Path, model: &BuildingModel) -> ModelResult<()> {
    validate_model(model)?;
    let content = serde_yaml::to_string(model)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ModelResult<BuildingModel> {
    let content = std::fs::read_to_string(path)?;
    let model: BuildingModel = serde_json::from_str(&content)?;
    validate_model(&model)?;
    Ok(model)
}

pub fn save_json(path: &std::path::Path, model: &BuildingModel) -> ModelResult<()> {
    validate_model(model)?;
    let content = serde_json::to_string_pretty(model)?;
    std::fs::write(path, content)?;
    Ok(())
}
