//! Test fixture: a small experiments tree on disk
//!
//! Builds a temporary experiments directory with a handful of runs across
//! two scenarios, scans it into a manifest, and wires up a file-backed
//! session. The tree stays alive as long as the fixture is held.

use std::path::Path;
use std::sync::Arc;

use alignview_common::{scan_experiments, Manifest, RUN_CONFIG_FILE, RUN_RESULTS_FILE};
use alignview_session::{FileFetcher, Session};
use tempfile::TempDir;

use crate::error::E2eResult;

/// A session backed by a temporary experiments tree
pub struct Fixture {
    dir: TempDir,
    manifest: Manifest,
}

impl Fixture {
    /// Build the standard fixture tree:
    ///
    /// - S1 / pipeline_baseline, bare and with llm + scene variants
    /// - S1 / pipeline_baseline with one and two KDMAs (cap of two)
    /// - S2 / pipeline_baseline and pipeline_random
    pub fn new() -> E2eResult<Self> {
        let dir = TempDir::new()?;

        write_run(
            dir.path(),
            "s1/baseline",
            &serde_json::json!({"scenario": "S1", "adm_type": "pipeline_baseline"}),
            &serde_json::json!({"run": "s1-baseline", "score": 0.42}),
        )?;
        write_run(
            dir.path(),
            "s1/baseline_llm_scene",
            &serde_json::json!({
                "scenario": "S1",
                "scene": "scene-a",
                "adm_type": "pipeline_baseline",
                "llm_backbone": "llama-8b"
            }),
            &serde_json::json!({"run": "s1-llm-scene", "score": 0.55}),
        )?;
        write_run(
            dir.path(),
            "s1/baseline_aff",
            &serde_json::json!({
                "scenario": "S1",
                "adm_type": "pipeline_baseline",
                "kdmas": {"affiliation": 0.5}
            }),
            &serde_json::json!({"run": "s1-aff-05", "score": 0.61}),
        )?;
        write_run(
            dir.path(),
            "s1/baseline_aff_merit",
            &serde_json::json!({
                "scenario": "S1",
                "adm_type": "pipeline_baseline",
                "kdmas": {"affiliation": 0.5, "merit": 1.0}
            }),
            &serde_json::json!({"run": "s1-aff-merit", "score": 0.38}),
        )?;
        write_run(
            dir.path(),
            "s2/baseline",
            &serde_json::json!({"scenario": "S2", "adm_type": "pipeline_baseline"}),
            &serde_json::json!({"run": "s2-baseline", "score": 0.71}),
        )?;
        write_run(
            dir.path(),
            "s2/random",
            &serde_json::json!({"scenario": "S2", "adm_type": "pipeline_random"}),
            &serde_json::json!({"run": "s2-random", "score": 0.12}),
        )?;

        let manifest = scan_experiments(dir.path())?;
        Ok(Self { dir, manifest })
    }

    /// A fresh session over the fixture tree
    pub fn session(&self) -> Session {
        let fetcher = FileFetcher::new(&self.manifest, self.dir.path().to_path_buf());
        Session::new(Arc::new(self.manifest.index()), Arc::new(fetcher))
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

fn write_run(
    root: &Path,
    dir: &str,
    config: &serde_json::Value,
    results: &serde_json::Value,
) -> E2eResult<()> {
    let run_dir = root.join(dir);
    std::fs::create_dir_all(&run_dir)?;
    std::fs::write(run_dir.join(RUN_CONFIG_FILE), config.to_string())?;
    std::fs::write(run_dir.join(RUN_RESULTS_FILE), results.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_tree_scans() {
        let fixture = Fixture::new().unwrap();
        assert_eq!(fixture.manifest().runs.len(), 6);

        let index = fixture.manifest().index();
        assert_eq!(index.scenario_names(), vec!["S1", "S2"]);
        assert_eq!(index.max_kdmas("S1", "pipeline_baseline"), 2);
    }
}
