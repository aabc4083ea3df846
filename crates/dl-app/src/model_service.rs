//! Model loading, saving, validation and introspection.

use dl_core::sanitize_name;
use dl_model::{BuildingModel, validate_model};
use std::path::Path;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub name: String,
    pub site: String,
    pub spaces: usize,
    /// Sanitized names of spaces with an illuminance map.
    pub mapped_spaces: Vec<String>,
    pub daylighting_controls: usize,
    pub glare_sensors: usize,
    pub thermal_zones: usize,
    pub controlled_window_groups: usize,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Loads a model from YAML, or JSON for `.json` files, and validates it.
pub fn load_model(path: &Path) -> AppResult<BuildingModel> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ModelFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let model: BuildingModel = if is_json(path) {
        serde_json::from_str(&content)
            .map_err(|e| AppError::Model(format!("Failed to parse model JSON: {}", e)))?
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Model(format!("Failed to parse model YAML: {}", e)))?
    };
    validate_model(&model)?;
    Ok(model)
}

pub fn save_model(path: &Path, model: &BuildingModel) -> AppResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    if is_json(path) {
        dl_model::save_json(path, model)?;
    } else {
        dl_model::save_yaml(path, model)?;
    }
    Ok(())
}

/// Loads and validates a model file, returning its summary.
pub fn validate_model_file(path: &Path) -> AppResult<ModelSummary> {
    let model = load_model(path)?;
    if model.spaces.iter().all(|s| s.illuminance_map.is_none()) {
        return Err(AppError::Validation(
            "Model has no space with an illuminance map".to_string(),
        ));
    }
    Ok(summarize_model(&model))
}

pub fn summarize_model(model: &BuildingModel) -> ModelSummary {
    ModelSummary {
        name: model.name.clone(),
        site: model.site.name.clone(),
        spaces: model.spaces.len(),
        mapped_spaces: model
            .spaces
            .iter()
            .filter(|s| s.illuminance_map.is_some())
            .map(|s| sanitize_name(&s.name))
            .collect(),
        daylighting_controls: model
            .spaces
            .iter()
            .filter(|s| s.daylighting_control.is_some())
            .count(),
        glare_sensors: model.spaces.iter().filter(|s| s.glare_sensor.is_some()).count(),
        thermal_zones: model.thermal_zones.len(),
        controlled_window_groups: model
            .window_groups
            .iter()
            .filter(|g| !g.uncontrolled)
            .count(),
    }
}
