//! Source-series import and store inspection.

use chrono::Utc;
use dl_results::import::SERIES_YEAR;
use dl_results::{ResultsStore, StoreManifest, import_csv};
use std::path::Path;
use tracing::info;

use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct VariableSummary {
    pub key: String,
    pub name: String,
    pub frequency: String,
    pub units: String,
    pub points: usize,
}

#[derive(Debug, Clone)]
pub struct StoreSummary {
    pub manifest: StoreManifest,
    pub variables: Vec<VariableSummary>,
    pub illuminance_maps: Vec<String>,
}

/// Adds every column of `csv_path` to the store at `store_dir`, creating it when absent.
pub fn import_series(csv_path: &Path, store_dir: &Path) -> AppResult<StoreSummary> {
    let mut store = if ResultsStore::exists(store_dir) {
        ResultsStore::open(store_dir)?
    } else {
        ResultsStore::create(
            store_dir.to_path_buf(),
            StoreManifest {
                run_id: "source".to_string(),
                model_name: csv_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                timestamp: Utc::now().to_rfc3339(),
                method: "import".to_string(),
                description: Some(format!("imported from {}", csv_path.display())),
            },
        )
    };
    let added = import_csv(csv_path, SERIES_YEAR, &mut store)?;
    store.finish()?;
    info!(series = added, store = %store_dir.display(), "series imported");
    Ok(describe(&store))
}

pub fn summarize_store(store_dir: &Path) -> AppResult<StoreSummary> {
    let store = ResultsStore::open(store_dir)?;
    Ok(describe(&store))
}

fn describe(store: &ResultsStore) -> StoreSummary {
    StoreSummary {
        manifest: store.manifest().clone(),
        variables: store
            .variables()
            .iter()
            .map(|v| VariableSummary {
                key: v.key.clone(),
                name: v.name.clone(),
                frequency: v.frequency.label().to_string(),
                units: v.units.clone(),
                points: store
                    .time_series(&v.key, &v.name, v.frequency)
                    .map_or(0, |s| s.len()),
            })
            .collect(),
        illuminance_maps: store
            .illuminance_maps()
            .iter()
            .map(|m| m.name.clone())
            .collect(),
    }
}
