//! Results store API.
//!
//! A store is a directory of JSON tables:
//!
//! - `manifest.json`
//! - `report_variables.json` (one [`VariableRecord`] per series)
//! - `report_data.jsonl` (one [`SeriesRecord`] per line)
//! - `illuminance_maps.jsonl` (one [`IlluminanceMapRecord`] per line)
//!
//! Series are collected in memory and written by [`ResultsStore::finish`], which
//! replaces a store previously written at the same path. Any other non-empty
//! directory is left alone and reported as [`ResultsError::NotAStore`].

use crate::types::{
    IlluminanceMapRecord, ReportingFrequency, SeriesRecord, StoreManifest, VariableRecord,
};
use crate::{ResultsError, ResultsResult};
use dl_core::TimeSeries;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MANIFEST: &str = "manifest.json";
const VARIABLES: &str = "report_variables.json";
const DATA: &str = "report_data.jsonl";
const MAPS: &str = "illuminance_maps.jsonl";

#[derive(Debug, Clone)]
pub struct ResultsStore {
    root_dir: PathBuf,
    manifest: StoreManifest,
    variables: Vec<VariableRecord>,
    series: Vec<TimeSeries>,
    maps: Vec<IlluminanceMapRecord>,
}

impl ResultsStore {
    /// Starts an empty in-memory store that will be written to `root_dir`.
    pub fn create(root_dir: PathBuf, manifest: StoreManifest) -> Self {
        Self {
            root_dir,
            manifest,
            variables: Vec::new(),
            series: Vec::new(),
            maps: Vec::new(),
        }
    }

    pub fn exists(root_dir: &Path) -> bool {
        root_dir.join(MANIFEST).exists()
    }

    /// Fails unless `root_dir` is missing, empty, or holds a store.
    pub fn check_replaceable(root_dir: &Path) -> ResultsResult<()> {
        if !root_dir.exists() || Self::exists(root_dir) {
            return Ok(());
        }
        if !root_dir.is_dir() || fs::read_dir(root_dir)?.next().is_some() {
            return Err(ResultsError::NotAStore {
                path: root_dir.to_path_buf(),
            });
        }
        Ok(())
    }

    pub fn open(root_dir: &Path) -> ResultsResult<Self> {
        let manifest_path = root_dir.join(MANIFEST);
        if !manifest_path.exists() {
            return Err(ResultsError::StoreNotFound {
                path: root_dir.to_path_buf(),
            });
        }
        let manifest: StoreManifest = serde_json::from_str(&fs::read_to_string(manifest_path)?)?;
        let variables: Vec<VariableRecord> =
            serde_json::from_str(&fs::read_to_string(root_dir.join(VARIABLES))?)?;

        let mut series: Vec<Option<TimeSeries>> = vec![None; variables.len()];
        for record in read_lines::<SeriesRecord>(&root_dir.join(DATA))? {
            let variable = variables
                .iter()
                .position(|v| v.id == record.variable_id)
                .ok_or_else(|| ResultsError::FileFormat {
                    path: root_dir.join(DATA),
                    reason: format!("unknown variable id {}", record.variable_id),
                })?;
            series[variable] = Some(TimeSeries::new(
                record.timestamps,
                record.values,
                variables[variable].units.clone(),
            )?);
        }
        let series = series
            .into_iter()
            .zip(&variables)
            .map(|(s, v)| {
                s.ok_or_else(|| ResultsError::FileFormat {
                    path: root_dir.join(DATA),
                    reason: format!("no data for {} / {}", v.key, v.name),
                })
            })
            .collect::<ResultsResult<Vec<_>>>()?;

        let maps_path = root_dir.join(MAPS);
        let maps = if maps_path.exists() {
            read_lines(&maps_path)?
        } else {
            Vec::new()
        };

        debug!(
            store = %root_dir.display(),
            variables = variables.len(),
            maps = maps.len(),
            "opened results store"
        );
        Ok(Self {
            root_dir: root_dir.to_path_buf(),
            manifest,
            variables,
            series,
            maps,
        })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn manifest(&self) -> &StoreManifest {
        &self.manifest
    }

    pub fn variables(&self) -> &[VariableRecord] {
        &self.variables
    }

    pub fn illuminance_maps(&self) -> &[IlluminanceMapRecord] {
        &self.maps
    }

    pub fn insert_time_series(
        &mut self,
        key: &str,
        name: &str,
        frequency: ReportingFrequency,
        series: TimeSeries,
    ) -> ResultsResult<usize> {
        if self.find(key, name, frequency).is_some() {
            return Err(ResultsError::DuplicateSeries {
                key: key.to_string(),
                name: name.to_string(),
            });
        }
        let id = self.variables.len() + 1;
        self.variables.push(VariableRecord {
            id,
            key: key.to_string(),
            name: name.to_string(),
            frequency,
            units: series.units().to_string(),
        });
        self.series.push(series);
        Ok(id)
    }

    pub fn insert_illuminance_map(&mut self, map: IlluminanceMapRecord) {
        self.maps.retain(|m| m.name != map.name);
        self.maps.push(map);
    }

    /// Series stored under `(key, name, frequency)`; keys compare case-insensitively.
    pub fn time_series(
        &self,
        key: &str,
        name: &str,
        frequency: ReportingFrequency,
    ) -> Option<&TimeSeries> {
        self.find(key, name, frequency).map(|i| &self.series[i])
    }

    pub fn illuminance_map(&self, name: &str) -> Option<&IlluminanceMapRecord> {
        self.maps.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Distinct keys that report `name`.
    pub fn keys_for(&self, name: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .variables
            .iter()
            .filter(|v| v.name == name)
            .map(|v| v.key.as_str())
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Writes every table, replacing any store already at `root_dir`.
    pub fn finish(&self) -> ResultsResult<()> {
        Self::check_replaceable(&self.root_dir)?;
        if Self::exists(&self.root_dir) {
            debug!(store = %self.root_dir.display(), "replacing prior store");
            fs::remove_dir_all(&self.root_dir)?;
        }
        fs::create_dir_all(&self.root_dir)?;

        fs::write(
            self.root_dir.join(MANIFEST),
            serde_json::to_string_pretty(&self.manifest)?,
        )?;
        fs::write(
            self.root_dir.join(VARIABLES),
            serde_json::to_string_pretty(&self.variables)?,
        )?;

        let records = self
            .variables
            .iter()
            .zip(&self.series)
            .map(|(v, s)| SeriesRecord {
                variable_id: v.id,
                timestamps: s.timestamps().to_vec(),
                values: s.values().to_vec(),
            });
        write_lines(&self.root_dir.join(DATA), records)?;
        if !self.maps.is_empty() {
            write_lines(&self.root_dir.join(MAPS), self.maps.iter())?;
        }

        info!(
            store = %self.root_dir.display(),
            variables = self.variables.len(),
            maps = self.maps.len(),
            "results store written"
        );
        Ok(())
    }

    fn find(&self, key: &str, name: &str, frequency: ReportingFrequency) -> Option<usize> {
        self.variables
            .iter()
            .position(|v| v.matches(key, name, frequency))
    }
}

fn write_lines<T: Serialize>(path: &Path, records: impl Iterator<Item = T>) -> ResultsResult<()> {
    let mut content = String::new();
    for record in records {
        content.push_str(&serde_json::to_string(&record)?);
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

fn read_lines<T: DeserializeOwned>(path: &Path) -> ResultsResult<Vec<T>> {
    let content = fs::read_to_string(path)?;
    let mut records = Vec::new();
    for line in content.lines() {
        if !line.trim().is_empty() {
            records.push(serde_json::from_str(line)?);
        }
    }
    Ok(records)
}
