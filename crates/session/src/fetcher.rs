//! Result fetching
//!
//! The fetcher resolves a column's selection tuple to its result payload.
//! Fetches run as spawned tasks and report back over a channel; the store
//! applies a completion only when the column's version still matches the
//! snapshot taken at fetch start.

use alignview_common::{Manifest, ColumnId, ResultState, SelectionTuple};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Outcome of a single fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(serde_json::Value),
    /// Valid combination, no matching experiment run
    NoData,
    Error(String),
}

impl FetchOutcome {
    pub fn into_result_state(self) -> ResultState {
        match self {
            FetchOutcome::Success(payload) => ResultState::Ready { payload },
            FetchOutcome::NoData => ResultState::NoData,
            FetchOutcome::Error(reason) => ResultState::Error { reason },
        }
    }
}

/// A completed fetch, tagged with the version captured at fetch start
#[derive(Debug)]
pub struct FetchCompletion {
    pub column: ColumnId,
    pub version: u64,
    pub outcome: FetchOutcome,
}

/// External data-access collaborator: selection tuple in, outcome out.
/// Equal tuples must yield equal results. Timeouts are the fetcher's
/// concern and surface as `FetchOutcome::Error`.
#[async_trait]
pub trait ResultFetcher: Send + Sync {
    async fn fetch(&self, tuple: &SelectionTuple) -> FetchOutcome;
}

/// Fetcher backed by result files on disk, indexed via the manifest
pub struct FileFetcher {
    root: PathBuf,
    paths: HashMap<String, String>,
    timeout: Duration,
}

impl FileFetcher {
    pub fn new(manifest: &Manifest, root: PathBuf) -> Self {
        Self {
            root,
            paths: manifest.result_paths(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ResultFetcher for FileFetcher {
    async fn fetch(&self, tuple: &SelectionTuple) -> FetchOutcome {
        let key = tuple.canonical_key();
        let relative = match self.paths.get(&key) {
            Some(path) => path,
            None => {
                debug!("No run matches tuple {}", key);
                return FetchOutcome::NoData;
            }
        };

        let path = self.root.join(relative);
        let read = tokio::time::timeout(self.timeout, tokio::fs::read_to_string(&path)).await;
        match read {
            Err(_) => FetchOutcome::Error(format!(
                "timeout after {}s reading {}",
                self.timeout.as_secs(),
                path.display()
            )),
            Ok(Err(e)) => FetchOutcome::Error(format!("read {}: {}", path.display(), e)),
            Ok(Ok(content)) => match serde_json::from_str(&content) {
                Ok(payload) => FetchOutcome::Success(payload),
                Err(e) => FetchOutcome::Error(format!("parse {}: {}", path.display(), e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignview_common::{scan_experiments, ParamValue, ParameterKey};

    fn tuple(entries: Vec<(ParameterKey, ParamValue)>) -> SelectionTuple {
        SelectionTuple { entries }
    }

    #[tokio::test]
    async fn test_file_fetcher_success_and_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = tmp.path().join("run1");
        std::fs::create_dir_all(&run_dir).unwrap();
        std::fs::write(
            run_dir.join("config.json"),
            r#"{"scenario": "S1", "adm_type": "pipeline_baseline"}"#,
        )
        .unwrap();
        std::fs::write(run_dir.join("results.json"), r#"{"score": 0.7}"#).unwrap();

        let manifest = scan_experiments(tmp.path()).unwrap();
        let fetcher = FileFetcher::new(&manifest, tmp.path().to_path_buf());

        let hit = tuple(vec![
            (
                ParameterKey::Scenario,
                ParamValue::Choice("S1".to_string()),
            ),
            (
                ParameterKey::AdmType,
                ParamValue::Choice("pipeline_baseline".to_string()),
            ),
        ]);
        assert_eq!(
            fetcher.fetch(&hit).await,
            FetchOutcome::Success(serde_json::json!({"score": 0.7}))
        );

        let miss = tuple(vec![(
            ParameterKey::Scenario,
            ParamValue::Choice("S9".to_string()),
        )]);
        assert_eq!(fetcher.fetch(&miss).await, FetchOutcome::NoData);
    }

    #[tokio::test]
    async fn test_file_fetcher_reports_parse_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = tmp.path().join("run1");
        std::fs::create_dir_all(&run_dir).unwrap();
        std::fs::write(
            run_dir.join("config.json"),
            r#"{"scenario": "S1", "adm_type": "a"}"#,
        )
        .unwrap();
        std::fs::write(run_dir.join("results.json"), "not json").unwrap();

        let manifest = scan_experiments(tmp.path()).unwrap();
        let fetcher = FileFetcher::new(&manifest, tmp.path().to_path_buf());

        let hit = tuple(vec![
            (
                ParameterKey::Scenario,
                ParamValue::Choice("S1".to_string()),
            ),
            (ParameterKey::AdmType, ParamValue::Choice("a".to_string())),
        ]);
        assert!(matches!(fetcher.fetch(&hit).await, FetchOutcome::Error(_)));
    }
}
