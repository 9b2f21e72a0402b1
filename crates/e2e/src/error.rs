//! Error types for the e2e runner

use thiserror::Error;

pub type E2eResult<T> = std::result::Result<T, E2eError>;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Session error: {0}")]
    Session(#[from] alignview_common::Error),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Assertion failed: {0}")]
    Assertion(String),
}
