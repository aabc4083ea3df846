//! Content-based hashing for run IDs.

use dl_model::BuildingModel;
use sha2::{Digest, Sha256};

pub fn compute_run_id(model: &BuildingModel, config_json: &str, version: &str) -> String {
    let mut hasher = Sha256::new();

    let model_json = serde_json::to_string(model).unwrap_or_default();
    hasher.update(model_json.as_bytes());
    hasher.update(config_json.as_bytes());
    hasher.update(version.as_bytes());

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dl_model::schema::*;

    fn model(name: &str) -> BuildingModel {
        BuildingModel {
            version: dl_model::LATEST_VERSION,
            name: name.to_string(),
            site: SiteDef {
                name: "Golden".to_string(),
                latitude_deg: 39.74,
                longitude_deg: -105.18,
                time_zone_h: -7.0,
                elevation_m: 1829.0,
            },
            spaces: vec![],
            thermal_zones: vec![],
            window_groups: vec![],
            schedules: vec![],
        }
    }

    #[test]
    fn hash_stability() {
        let a = compute_run_id(&model("Office"), "{}", "v1");
        let b = compute_run_id(&model("Office"), "{}", "v1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let base = compute_run_id(&model("Office"), "{}", "v1");
        assert_ne!(base, compute_run_id(&model("School"), "{}", "v1"));
        assert_ne!(base, compute_run_id(&model("Office"), "{\"glare\":true}", "v1"));
    }
}
