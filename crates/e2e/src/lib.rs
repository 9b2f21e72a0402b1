//! Scripted end-to-end runner for AlignView sessions
//!
//! Drives a real file-backed session through YAML interaction scripts:
//! column lifecycle, parameter linking, fetch settling, and table-level
//! assertions.

pub mod error;
pub mod fixture;
pub mod runner;
pub mod spec;

pub use error::{E2eError, E2eResult};
pub use fixture::Fixture;
pub use runner::{ScriptRunner, StepResult, TestResult, TestSummary};
pub use spec::{ScriptSpec, ScriptStep};
