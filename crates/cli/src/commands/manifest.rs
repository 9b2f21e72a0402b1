//! Manifest build and inspection commands

use crate::output::{self, OutputFormat, TableDisplay};
use alignview_common::{scan_experiments, Manifest};
use clap::Subcommand;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ManifestCommands {
    /// Scan an experiments directory and write the manifest
    Build {
        /// Root directory of experiment run directories
        #[arg(long)]
        experiments: PathBuf,

        /// Output manifest path
        #[arg(long, default_value = "manifest.json")]
        output: PathBuf,
    },

    /// Summarize a manifest's scenarios, ADM types and KDMAs
    Inspect {
        /// Manifest path
        path: PathBuf,
    },
}

#[derive(Serialize)]
struct ScenarioSummary {
    scenario: String,
    scenes: usize,
    adm_types: String,
    kdmas: String,
    max_kdmas: usize,
}

impl TableDisplay for ScenarioSummary {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Scenes", "ADM Types", "KDMAs", "Max KDMAs"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.scenario.clone(),
            self.scenes.to_string(),
            self.adm_types.clone(),
            self.kdmas.clone(),
            self.max_kdmas.to_string(),
        ]
    }
}

pub async fn execute(cmd: ManifestCommands, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ManifestCommands::Build {
            experiments,
            output,
        } => {
            let manifest = scan_experiments(&experiments)?;
            if manifest.runs.is_empty() {
                output::print_error(&format!(
                    "No experiment runs found under {}",
                    experiments.display()
                ));
                std::process::exit(1);
            }
            manifest.save(&output)?;
            output::print_success(&format!(
                "Wrote {} runs to {}",
                manifest.runs.len(),
                output.display()
            ));
        }

        ManifestCommands::Inspect { path } => {
            let manifest = Manifest::load(&path)?;
            let index = manifest.index();

            let summaries: Vec<ScenarioSummary> = index
                .scenarios
                .iter()
                .map(|scenario| {
                    let adm_types = scenario
                        .adms
                        .iter()
                        .map(|a| a.name.clone())
                        .collect::<Vec<_>>()
                        .join(", ");
                    let mut kdmas: Vec<String> = Vec::new();
                    let mut max_kdmas = 0;
                    for adm in &scenario.adms {
                        for kdma in &adm.kdmas {
                            if !kdmas.contains(kdma) {
                                kdmas.push(kdma.clone());
                            }
                        }
                        max_kdmas = max_kdmas.max(adm.max_kdmas);
                    }
                    ScenarioSummary {
                        scenario: scenario.name.clone(),
                        scenes: scenario.scenes.len(),
                        adm_types,
                        kdmas: kdmas.join(", "),
                        max_kdmas,
                    }
                })
                .collect();

            output::print_list(&summaries, format);
            println!("{} runs total", manifest.runs.len());
        }
    }

    Ok(())
}
