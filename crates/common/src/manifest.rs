//! Experiment manifest
//!
//! The manifest is the data boundary between the experiments directory on
//! disk and a comparison session: one record per experiment run, each
//! carrying the run's parameter configuration and the relative path to its
//! results payload. The metadata index is derived from it on load.

use crate::metadata::MetadataIndex;
use crate::types::{format_level, ParamValue, ParameterKey, SelectionTuple};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Filename of a run's parameter configuration inside its directory
pub const RUN_CONFIG_FILE: &str = "config.json";

/// Filename of a run's results payload inside its directory
pub const RUN_RESULTS_FILE: &str = "results.json";

/// Parameter configuration of one experiment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub scenario: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
    pub adm_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_backbone: Option<String>,
    /// KDMA name → level, fractional in [0.0, 1.0]
    #[serde(default)]
    pub kdmas: BTreeMap<String, f64>,
}

impl RunConfig {
    /// The run's full selection tuple, in canonical key order
    pub fn selection_tuple(&self) -> SelectionTuple {
        let mut entries = vec![(
            ParameterKey::Scenario,
            ParamValue::Choice(self.scenario.clone()),
        )];
        if let Some(scene) = &self.scene {
            entries.push((ParameterKey::Scene, ParamValue::Choice(scene.clone())));
        }
        entries.push((
            ParameterKey::AdmType,
            ParamValue::Choice(self.adm_type.clone()),
        ));
        if let Some(llm) = &self.llm_backbone {
            entries.push((
                ParameterKey::LlmBackbone,
                ParamValue::Choice(llm.clone()),
            ));
        }
        for (name, level) in &self.kdmas {
            entries.push((ParameterKey::Kdma(name.clone()), ParamValue::Level(*level)));
        }
        SelectionTuple { entries }
    }

    /// Fingerprint used for fetch lookup and conflict detection
    pub fn canonical_key(&self) -> String {
        self.selection_tuple().canonical_key()
    }

    fn validate(&self) -> Result<()> {
        for (name, level) in &self.kdmas {
            if !(0.0..=1.0).contains(level) {
                return Err(Error::Manifest(format!(
                    "KDMA {} level {} outside [0.0, 1.0]",
                    name,
                    format_level(*level)
                )));
            }
        }
        Ok(())
    }

    fn kdma_names(&self) -> Vec<String> {
        self.kdmas.keys().cloned().collect()
    }
}

/// One manifest entry: a run configuration plus where its results live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub config: RunConfig,
    /// Path to the results JSON, relative to the experiments root
    pub results_path: String,
}

/// The global experiment manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Unix timestamp of the build
    pub generated_at: i64,
    pub runs: Vec<RunRecord>,
}

impl Manifest {
    /// Load a manifest from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Save the manifest as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Derive the scenario → ADM → KDMA metadata index
    pub fn index(&self) -> MetadataIndex {
        let mut index = MetadataIndex::default();
        for run in &self.runs {
            index.insert_run(
                &run.config.scenario,
                run.config.scene.as_deref(),
                &run.config.adm_type,
                run.config.llm_backbone.as_deref(),
                &run.config.kdma_names(),
            );
        }
        index
    }

    /// Canonical key → relative results path, for fetch lookup
    pub fn result_paths(&self) -> std::collections::HashMap<String, String> {
        self.runs
            .iter()
            .map(|r| (r.config.canonical_key(), r.results_path.clone()))
            .collect()
    }
}

/// Scan an experiments directory tree and build a manifest.
///
/// A run directory is any directory containing both `config.json` and
/// `results.json`. Malformed configs are skipped with a warning; paths
/// containing `OUTDATED` are ignored; duplicate configurations keep the
/// first directory found.
pub fn scan_experiments(root: &Path) -> Result<Manifest> {
    if !root.is_dir() {
        return Err(Error::Manifest(format!(
            "experiments root {} is not a directory",
            root.display()
        )));
    }

    let mut manifest = Manifest {
        generated_at: chrono::Utc::now().timestamp(),
        runs: Vec::new(),
    };
    let mut seen_keys: Vec<String> = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let dir = entry.path();
        if dir.to_string_lossy().to_uppercase().contains("OUTDATED") {
            continue;
        }

        let config_path = dir.join(RUN_CONFIG_FILE);
        let results_path = dir.join(RUN_RESULTS_FILE);
        if !config_path.is_file() || !results_path.is_file() {
            continue;
        }

        let config: RunConfig = match std::fs::read_to_string(&config_path)
            .map_err(Error::from)
            .and_then(|s| serde_json::from_str(&s).map_err(Error::from))
        {
            Ok(config) => config,
            Err(e) => {
                warn!("Skipping {}: {}", config_path.display(), e);
                continue;
            }
        };

        if let Err(e) = config.validate() {
            warn!("Skipping {}: {}", config_path.display(), e);
            continue;
        }

        let key = config.canonical_key();
        if seen_keys.contains(&key) {
            warn!(
                "Duplicate run configuration at {}, keeping first occurrence",
                dir.display()
            );
            continue;
        }

        let relative = results_path
            .strip_prefix(root)
            .map_err(|_| Error::Internal("walkdir entry escaped root".to_string()))?;

        debug!("Found run: {}", key);
        seen_keys.push(key);
        manifest.runs.push(RunRecord {
            config,
            results_path: relative.to_string_lossy().to_string(),
        });
    }

    Ok(manifest)
}
