//! Declarative YAML interaction scripts
//!
//! A script is a named sequence of session interactions and assertions.
//! Columns are addressed by their current position among live columns
//! (creation order); removing a column shifts later positions down.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::E2eResult;

/// A complete interaction script parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptSpec {
    /// Unique name for this script
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scripts
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<ScriptStep>,
}

/// A single step in a script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Add a comparison column
    AddColumn,

    /// Remove the column at a position
    RemoveColumn { column: usize },

    /// Set a categorical selection
    Select {
        column: usize,
        key: String,
        value: String,
    },

    /// Set a KDMA slider value
    SetKdma {
        column: usize,
        name: String,
        value: f64,
    },

    /// Remove a KDMA selection
    ClearKdma { column: usize, name: String },

    /// Toggle linkage for a parameter key
    ToggleLink { key: String },

    /// Render the table (runs new-column link reconciliation)
    Render,

    /// Wait for all in-flight fetches to complete
    Settle,

    /// Assert a column's selection value
    Assert {
        column: usize,
        key: String,
        /// Expected categorical value
        #[serde(default)]
        value: Option<String>,
        /// Expected KDMA level
        #[serde(default)]
        level: Option<f64>,
    },

    /// Assert a column has no value for a key
    AssertUnset { column: usize, key: String },

    /// Assert the number of live columns
    AssertColumnCount { count: usize },

    /// Assert a key's link state
    AssertLinked { key: String, linked: bool },

    /// Assert a key holds one value across all live columns
    AssertConsistent { key: String },

    /// Assert a column's result cell state
    /// (`pending`, `no_data`, `error`, `ready`)
    AssertResult { column: usize, state: String },

    /// Log a message (for debugging)
    Log { message: String },
}

impl ScriptSpec {
    /// Parse a script from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a script from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all scripts from a directory
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            specs.push(Self::from_file(entry.path())?);
        }

        Ok(specs)
    }

    /// Filter scripts by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs
            .iter()
            .filter(|s| s.tags.contains(&tag.to_string()))
            .collect()
    }
}
