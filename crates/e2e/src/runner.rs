//! Script runner
//!
//! Executes interaction scripts against an in-process session. Columns in
//! a script are addressed by position among the live columns in creation
//! order, so `remove_column` shifts later positions down, matching what a
//! user sees in the table.

use std::str::FromStr;
use std::time::Instant;

use alignview_common::{format_level, ColumnId, ParamValue, ParameterKey, ResultState};
use alignview_session::Session;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{E2eError, E2eResult};
use crate::spec::{ScriptSpec, ScriptStep};

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

/// Result of running a set of scripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

/// Executes scripts against a session
pub struct ScriptRunner {
    session: Session,
    /// Live columns in creation order; script positions index into this
    columns: Vec<ColumnId>,
}

impl ScriptRunner {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            columns: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run a list of scripts, each against a fresh column layout but the
    /// same session data
    pub async fn run_all(&mut self, specs: &[ScriptSpec]) -> TestSummary {
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} script(s)...", specs.len());

        for spec in specs {
            let result = self.run_script(spec).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Script results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        TestSummary {
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Run a single script, stopping at the first failing step
    pub async fn run_script(&mut self, spec: &ScriptSpec) -> TestResult {
        let start = Instant::now();
        debug!("Running script: {}", spec.name);
        self.reset();

        let mut steps = Vec::new();
        let mut script_error: Option<String> = None;

        for step in &spec.steps {
            let step_start = Instant::now();
            let outcome = self.execute_step(step).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => steps.push(StepResult {
                    step: format!("{:?}", step),
                    success: true,
                    duration_ms,
                    error: None,
                }),
                Err(e) => {
                    let message = e.to_string();
                    steps.push(StepResult {
                        step: format!("{:?}", step),
                        success: false,
                        duration_ms,
                        error: Some(message.clone()),
                    });
                    script_error = Some(message);
                    break;
                }
            }
        }

        TestResult {
            name: spec.name.clone(),
            success: script_error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error: script_error,
        }
    }

    /// Remove all columns so the next script starts from a blank table.
    /// Link state carries over between scripts only if a script leaves it
    /// set; scripts that care about links toggle them explicitly.
    fn reset(&mut self) {
        for id in self.columns.drain(..) {
            let _ = self.session.remove_column(id);
        }
        for key in self.session.linked_keys() {
            let _ = self.session.toggle_link(key);
        }
    }

    async fn execute_step(&mut self, step: &ScriptStep) -> E2eResult<()> {
        match step {
            ScriptStep::AddColumn => {
                let id = self.session.add_column();
                self.columns.push(id);
                Ok(())
            }
            ScriptStep::RemoveColumn { column } => {
                let id = self.column_at(*column)?;
                self.session.remove_column(id)?;
                self.columns.retain(|c| *c != id);
                Ok(())
            }
            ScriptStep::Select { column, key, value } => {
                let id = self.column_at(*column)?;
                let key = parse_key(key)?;
                self.session
                    .set_selection(id, key, ParamValue::Choice(value.clone()))?;
                Ok(())
            }
            ScriptStep::SetKdma {
                column,
                name,
                value,
            } => {
                let id = self.column_at(*column)?;
                self.session.set_selection(
                    id,
                    ParameterKey::Kdma(name.clone()),
                    ParamValue::Level(*value),
                )?;
                Ok(())
            }
            ScriptStep::ClearKdma { column, name } => {
                let id = self.column_at(*column)?;
                self.session
                    .clear_selection(id, ParameterKey::Kdma(name.clone()))?;
                Ok(())
            }
            ScriptStep::ToggleLink { key } => {
                let key = parse_key(key)?;
                self.session.toggle_link(key)?;
                Ok(())
            }
            ScriptStep::Render => {
                self.session.project();
                Ok(())
            }
            ScriptStep::Settle => {
                self.session.settle().await;
                Ok(())
            }
            ScriptStep::Assert {
                column,
                key,
                value,
                level,
            } => {
                let id = self.column_at(*column)?;
                let key = parse_key(key)?;
                let actual = self.session.column(id)?.selection(&key).cloned();

                match (value, level, actual) {
                    (Some(expected), _, Some(ParamValue::Choice(actual))) => {
                        if &actual != expected {
                            return Err(E2eError::Assertion(format!(
                                "column {} {}: expected {:?}, got {:?}",
                                column, key, expected, actual
                            )));
                        }
                        Ok(())
                    }
                    (_, Some(expected), Some(ParamValue::Level(actual))) => {
                        if format_level(actual) != format_level(*expected) {
                            return Err(E2eError::Assertion(format!(
                                "column {} {}: expected level {}, got {}",
                                column,
                                key,
                                format_level(*expected),
                                format_level(actual)
                            )));
                        }
                        Ok(())
                    }
                    (None, None, _) => Err(E2eError::Script(format!(
                        "assert on {} needs a value or level",
                        key
                    ))),
                    (_, _, actual) => Err(E2eError::Assertion(format!(
                        "column {} {}: unexpected value {:?}",
                        column, key, actual
                    ))),
                }
            }
            ScriptStep::AssertUnset { column, key } => {
                let id = self.column_at(*column)?;
                let key = parse_key(key)?;
                match self.session.column(id)?.selection(&key) {
                    None => Ok(()),
                    Some(value) => Err(E2eError::Assertion(format!(
                        "column {} {}: expected unset, got {:?}",
                        column, key, value
                    ))),
                }
            }
            ScriptStep::AssertColumnCount { count } => {
                let actual = self.session.columns().len();
                if actual != *count {
                    return Err(E2eError::Assertion(format!(
                        "expected {} column(s), got {}",
                        count, actual
                    )));
                }
                Ok(())
            }
            ScriptStep::AssertLinked { key, linked } => {
                let key = parse_key(key)?;
                let actual = self.session.is_linked(&key);
                if actual != *linked {
                    return Err(E2eError::Assertion(format!(
                        "{}: expected linked={}, got {}",
                        key, linked, actual
                    )));
                }
                Ok(())
            }
            ScriptStep::AssertConsistent { key } => {
                let key = parse_key(key)?;
                let mut values = self
                    .session
                    .columns()
                    .iter()
                    .map(|c| c.selection(&key).cloned());
                let first = values.next().flatten();
                for value in values {
                    if value != first {
                        return Err(E2eError::Assertion(format!(
                            "{} diverges across columns: {:?} vs {:?}",
                            key, first, value
                        )));
                    }
                }
                Ok(())
            }
            ScriptStep::AssertResult { column, state } => {
                let id = self.column_at(*column)?;
                let actual = match &self.session.column(id)?.result {
                    ResultState::Pending => "pending",
                    ResultState::NoData => "no_data",
                    ResultState::Error { .. } => "error",
                    ResultState::Ready { .. } => "ready",
                };
                if actual != state {
                    return Err(E2eError::Assertion(format!(
                        "column {} result: expected {}, got {}",
                        column, state, actual
                    )));
                }
                Ok(())
            }
            ScriptStep::Log { message } => {
                info!("{}", message);
                Ok(())
            }
        }
    }

    fn column_at(&self, position: usize) -> E2eResult<ColumnId> {
        self.columns
            .get(position)
            .copied()
            .ok_or_else(|| E2eError::Script(format!("no column at position {}", position)))
    }
}

fn parse_key(key: &str) -> E2eResult<ParameterKey> {
    ParameterKey::from_str(key).map_err(|e| E2eError::Script(e.to_string()))
}
