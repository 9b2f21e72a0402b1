//! AlignView Common Library
//!
//! Shared types and utilities for the AlignView comparison-table platform.

pub mod config;
pub mod error;
pub mod manifest;
pub mod metadata;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
pub use manifest::{
    scan_experiments, Manifest, RunConfig, RunRecord, RUN_CONFIG_FILE, RUN_RESULTS_FILE,
};
pub use metadata::{AdmMeta, MetadataIndex, ScenarioMeta};
pub use types::*;

/// AlignView version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default store path
pub fn default_store_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".alignview")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
