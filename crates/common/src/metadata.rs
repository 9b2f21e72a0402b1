//! Experiment metadata index
//!
//! Read-only hierarchy derived from the manifest at session start:
//! scenario constrains scenes and ADM types, an ADM constrains LLM
//! backbones and KDMA availability. Vectors preserve discovery order
//! so dropdowns and KDMA rows render in the order the data was found.

use serde::{Deserialize, Serialize};

/// Metadata for one ADM type within a scenario
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmMeta {
    pub name: String,
    /// LLM backbones observed for this scenario/ADM combination
    pub llm_backbones: Vec<String>,
    /// KDMA names available under this ADM
    pub kdmas: Vec<String>,
    /// Maximum simultaneous KDMA count observed in any run for this ADM
    pub max_kdmas: usize,
}

/// Metadata for one scenario
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioMeta {
    pub name: String,
    pub scenes: Vec<String>,
    pub adms: Vec<AdmMeta>,
}

impl ScenarioMeta {
    pub fn adm(&self, name: &str) -> Option<&AdmMeta> {
        self.adms.iter().find(|a| a.name == name)
    }
}

/// The full scenario → ADM → KDMA index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataIndex {
    pub scenarios: Vec<ScenarioMeta>,
}

impl MetadataIndex {
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioMeta> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    pub fn scenario_names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn scenes(&self, scenario: &str) -> Vec<&str> {
        self.scenario(scenario)
            .map(|s| s.scenes.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn adm_names(&self, scenario: &str) -> Vec<&str> {
        self.scenario(scenario)
            .map(|s| s.adms.iter().map(|a| a.name.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn llm_backbones(&self, scenario: &str, adm: &str) -> Vec<&str> {
        self.scenario(scenario)
            .and_then(|s| s.adm(adm))
            .map(|a| a.llm_backbones.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn kdma_names(&self, scenario: &str, adm: &str) -> Vec<&str> {
        self.scenario(scenario)
            .and_then(|s| s.adm(adm))
            .map(|a| a.kdmas.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Cap on simultaneously active KDMA keys for a scenario/ADM context.
    /// Zero when the context is unknown or has no KDMA-bearing runs.
    pub fn max_kdmas(&self, scenario: &str, adm: &str) -> usize {
        self.scenario(scenario)
            .and_then(|s| s.adm(adm))
            .map(|a| a.max_kdmas)
            .unwrap_or(0)
    }

    /// All KDMA names across the index, deduplicated, in discovery order.
    /// Drives the dynamic parameter rows of the projection.
    pub fn kdma_keys(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for scenario in &self.scenarios {
            for adm in &scenario.adms {
                for kdma in &adm.kdmas {
                    if !names.contains(kdma) {
                        names.push(kdma.clone());
                    }
                }
            }
        }
        names
    }

    /// Record one run's parameters. Called by the manifest layer while
    /// building or loading; keeps discovery order, dedups everything.
    pub fn insert_run(
        &mut self,
        scenario: &str,
        scene: Option<&str>,
        adm: &str,
        llm: Option<&str>,
        kdmas: &[String],
    ) {
        let scenario_meta = match self.scenarios.iter_mut().find(|s| s.name == scenario) {
            Some(meta) => meta,
            None => {
                self.scenarios.push(ScenarioMeta {
                    name: scenario.to_string(),
                    ..Default::default()
                });
                self.scenarios.last_mut().unwrap()
            }
        };

        if let Some(scene) = scene {
            if !scenario_meta.scenes.iter().any(|s| s == scene) {
                scenario_meta.scenes.push(scene.to_string());
            }
        }

        let adm_meta = match scenario_meta.adms.iter_mut().find(|a| a.name == adm) {
            Some(meta) => meta,
            None => {
                scenario_meta.adms.push(AdmMeta {
                    name: adm.to_string(),
                    ..Default::default()
                });
                scenario_meta.adms.last_mut().unwrap()
            }
        };

        if let Some(llm) = llm {
            if !adm_meta.llm_backbones.iter().any(|l| l == llm) {
                adm_meta.llm_backbones.push(llm.to_string());
            }
        }

        for kdma in kdmas {
            if !adm_meta.kdmas.iter().any(|k| k == kdma) {
                adm_meta.kdmas.push(kdma.clone());
            }
        }

        adm_meta.max_kdmas = adm_meta.max_kdmas.max(kdmas.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> MetadataIndex {
        let mut index = MetadataIndex::default();
        index.insert_run(
            "S1",
            Some("scene-a"),
            "pipeline_baseline",
            Some("llama-8b"),
            &["affiliation".to_string(), "merit".to_string()],
        );
        index.insert_run(
            "S1",
            Some("scene-b"),
            "pipeline_baseline",
            None,
            &["affiliation".to_string()],
        );
        index.insert_run("S2", None, "pipeline_random", None, &[]);
        index
    }

    #[test]
    fn test_hierarchy_lookups() {
        let index = sample_index();
        assert_eq!(index.scenario_names(), vec!["S1", "S2"]);
        assert_eq!(index.scenes("S1"), vec!["scene-a", "scene-b"]);
        assert_eq!(index.adm_names("S1"), vec!["pipeline_baseline"]);
        assert_eq!(index.adm_names("S2"), vec!["pipeline_random"]);
        assert_eq!(
            index.kdma_names("S1", "pipeline_baseline"),
            vec!["affiliation", "merit"]
        );
        assert!(index.kdma_names("S2", "pipeline_random").is_empty());
    }

    #[test]
    fn test_max_kdmas_is_max_observed() {
        let index = sample_index();
        assert_eq!(index.max_kdmas("S1", "pipeline_baseline"), 2);
        assert_eq!(index.max_kdmas("S2", "pipeline_random"), 0);
        assert_eq!(index.max_kdmas("S1", "unknown_adm"), 0);
    }

    #[test]
    fn test_kdma_keys_deduped_in_discovery_order() {
        let index = sample_index();
        assert_eq!(index.kdma_keys(), vec!["affiliation", "merit"]);
    }

    #[test]
    fn test_unknown_scenario_yields_empty_options() {
        let index = sample_index();
        assert!(index.adm_names("S9").is_empty());
        assert!(index.scenes("S9").is_empty());
    }
}
