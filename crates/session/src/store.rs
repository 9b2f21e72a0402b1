//! Column store
//!
//! Ordered collection of comparison columns. Owns all per-column mutation:
//! validated selection updates, cascading invalidation down the parameter
//! hierarchy, KDMA cap enforcement, and version-guarded application of
//! fetch results.

use crate::fetcher::FetchOutcome;
use crate::registry::{ColumnContext, ParameterRegistry};
use alignview_common::{
    Column, ColumnId, Error, ParamValue, ParameterKey, Result, ResultState, SelectionTuple,
};
use tracing::debug;

/// Outcome of a selection mutation
#[derive(Debug, Clone, Copy)]
pub struct SetOutcome {
    pub column: ColumnId,
    /// False when the value was already current (no version bump, no fetch)
    pub changed: bool,
    pub result_version: u64,
}

/// Ordered collection of comparison columns
pub struct ColumnStore {
    registry: ParameterRegistry,
    columns: Vec<Column>,
    next_id: u64,
}

impl ColumnStore {
    pub fn new(registry: ParameterRegistry) -> Self {
        Self {
            registry,
            columns: Vec::new(),
            next_id: 1,
        }
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    /// Columns in creation order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_ids(&self) -> Vec<ColumnId> {
        self.columns.iter().map(|c| c.id).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Create a column with empty selections and a pending result. Never
    /// copies state from other columns; link reconciliation is the
    /// session's job on its first projection pass.
    pub fn add_column(&mut self) -> ColumnId {
        let id = ColumnId(self.next_id);
        self.next_id += 1;
        self.columns.push(Column::new(id));
        debug!("Added column {}", id);
        id
    }

    pub fn remove_column(&mut self, id: ColumnId) -> Result<()> {
        let index = self
            .columns
            .iter()
            .position(|c| c.id == id)
            .ok_or(Error::ColumnNotFound { id: id.0 })?;
        self.columns.remove(index);
        debug!("Removed column {}", id);
        Ok(())
    }

    pub fn column(&self, id: ColumnId) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.id == id)
            .ok_or(Error::ColumnNotFound { id: id.0 })
    }

    fn column_mut(&mut self, id: ColumnId) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(Error::ColumnNotFound { id: id.0 })
    }

    /// Update one selection. Validates against the registry, enforces the
    /// KDMA cap, and clears dependent selections whose option sets are
    /// scoped under the changed key. Setting the already-current value is
    /// a no-op.
    pub fn set_selection(
        &mut self,
        id: ColumnId,
        key: &ParameterKey,
        value: ParamValue,
    ) -> Result<SetOutcome> {
        let registry = self.registry.clone();
        let column = self.column_mut(id)?;

        registry.validate(key, &value, ColumnContext::of(column))?;

        if column.selections.get(key) == Some(&value) {
            return Ok(SetOutcome {
                column: id,
                changed: false,
                result_version: column.result_version,
            });
        }

        if key.is_kdma() && !column.selections.contains_key(key) {
            let cap = registry.kdma_cap(ColumnContext::of(column));
            if column.kdma_count() + 1 > cap {
                return Err(Error::LimitExceeded {
                    key: key.to_string(),
                    max: cap,
                });
            }
        }

        column.selections.insert(key.clone(), value);
        column
            .selections
            .retain(|other, _| other == key || !key.invalidates(other));
        column.result = ResultState::Pending;
        column.result_version += 1;

        debug!(
            "Column {} set {} (version {})",
            id, key, column.result_version
        );
        Ok(SetOutcome {
            column: id,
            changed: true,
            result_version: column.result_version,
        })
    }

    /// Remove one selection (KDMA slider removal). Clearing an unset key
    /// is a no-op.
    pub fn clear_selection(&mut self, id: ColumnId, key: &ParameterKey) -> Result<SetOutcome> {
        let column = self.column_mut(id)?;
        if column.selections.remove(key).is_none() {
            return Ok(SetOutcome {
                column: id,
                changed: false,
                result_version: column.result_version,
            });
        }
        column.result = ResultState::Pending;
        column.result_version += 1;
        debug!(
            "Column {} cleared {} (version {})",
            id, key, column.result_version
        );
        Ok(SetOutcome {
            column: id,
            changed: true,
            result_version: column.result_version,
        })
    }

    /// Snapshot the state a fetch is issued against
    pub fn fetch_snapshot(&self, id: ColumnId) -> Result<(u64, SelectionTuple)> {
        let column = self.column(id)?;
        Ok((column.result_version, column.selection_tuple()))
    }

    /// Apply a completed fetch if the column still exists and its version
    /// matches the one captured at fetch start. Returns false when the
    /// completion was discarded as stale or orphaned.
    pub fn apply_fetch(&mut self, id: ColumnId, version: u64, outcome: FetchOutcome) -> bool {
        let column = match self.columns.iter_mut().find(|c| c.id == id) {
            Some(column) => column,
            None => {
                debug!("Discarding fetch completion for removed column {}", id);
                return false;
            }
        };
        if column.result_version != version {
            debug!(
                "Discarding stale fetch for column {} (version {} != {})",
                id, version, column.result_version
            );
            return false;
        }
        column.result = outcome.into_result_state();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignview_common::MetadataIndex;
    use std::sync::Arc;

    fn store() -> ColumnStore {
        let mut index = MetadataIndex::default();
        index.insert_run(
            "S1",
            Some("scene-a"),
            "pipeline_baseline",
            Some("llama-8b"),
            &["affiliation".to_string(), "merit".to_string()],
        );
        index.insert_run("S2", None, "pipeline_random", None, &[]);
        ColumnStore::new(ParameterRegistry::new(Arc::new(index)))
    }

    fn choice(s: &str) -> ParamValue {
        ParamValue::Choice(s.to_string())
    }

    fn populate(store: &mut ColumnStore, id: ColumnId) {
        store
            .set_selection(id, &ParameterKey::Scenario, choice("S1"))
            .unwrap();
        store
            .set_selection(id, &ParameterKey::AdmType, choice("pipeline_baseline"))
            .unwrap();
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut store = store();
        let a = store.add_column();
        let b = store.add_column();
        store.remove_column(b).unwrap();
        let c = store.add_column();
        assert_ne!(b, c);
        assert!(c > a && c > b);
    }

    #[test]
    fn test_remove_unknown_column_fails() {
        let mut store = store();
        assert!(matches!(
            store.remove_column(ColumnId(42)),
            Err(Error::ColumnNotFound { id: 42 })
        ));
    }

    #[test]
    fn test_empty_store_is_functional() {
        let mut store = store();
        let id = store.add_column();
        store.remove_column(id).unwrap();
        assert!(store.is_empty());
        assert!(store.column_ids().is_empty());
    }

    #[test]
    fn test_scenario_change_cascades() {
        let mut store = store();
        let id = store.add_column();
        populate(&mut store, id);
        store
            .set_selection(
                id,
                &ParameterKey::Kdma("affiliation".to_string()),
                ParamValue::Level(0.5),
            )
            .unwrap();
        store
            .set_selection(id, &ParameterKey::Scene, choice("scene-a"))
            .unwrap();

        store
            .set_selection(id, &ParameterKey::Scenario, choice("S2"))
            .unwrap();

        let column = store.column(id).unwrap();
        assert_eq!(column.scenario(), Some("S2"));
        assert!(column.adm_type().is_none());
        assert!(column.selection(&ParameterKey::Scene).is_none());
        assert_eq!(column.kdma_count(), 0);
    }

    #[test]
    fn test_adm_change_clears_llm_and_kdmas_only() {
        let mut store = store();
        let id = store.add_column();
        populate(&mut store, id);
        store
            .set_selection(id, &ParameterKey::Scene, choice("scene-a"))
            .unwrap();
        store
            .set_selection(id, &ParameterKey::LlmBackbone, choice("llama-8b"))
            .unwrap();
        store
            .set_selection(
                id,
                &ParameterKey::Kdma("merit".to_string()),
                ParamValue::Level(0.3),
            )
            .unwrap();

        // Re-setting the same ADM is a no-op; no cascade
        let outcome = store
            .set_selection(id, &ParameterKey::AdmType, choice("pipeline_baseline"))
            .unwrap();
        assert!(!outcome.changed);
        assert_eq!(store.column(id).unwrap().kdma_count(), 1);
    }

    #[test]
    fn test_kdma_cap_rejected_without_mutation() {
        let mut store = store();
        let id = store.add_column();
        populate(&mut store, id);
        store
            .set_selection(
                id,
                &ParameterKey::Kdma("affiliation".to_string()),
                ParamValue::Level(0.2),
            )
            .unwrap();
        store
            .set_selection(
                id,
                &ParameterKey::Kdma("merit".to_string()),
                ParamValue::Level(0.4),
            )
            .unwrap();

        let before = store.column(id).unwrap().clone();
        // Cap is 2 for this ADM; metadata has no third KDMA, so push the
        // cap with a valid name after clearing would be needed. Re-setting
        // an existing key must stay allowed at the cap.
        let outcome = store
            .set_selection(
                id,
                &ParameterKey::Kdma("merit".to_string()),
                ParamValue::Level(0.9),
            )
            .unwrap();
        assert!(outcome.changed);

        // An unavailable KDMA fails validation before cap checks
        let err = store
            .set_selection(
                id,
                &ParameterKey::Kdma("unknown".to_string()),
                ParamValue::Level(0.5),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));

        let after = store.column(id).unwrap();
        assert_eq!(after.kdma_count(), before.kdma_count());
    }

    #[test]
    fn test_cap_of_one_blocks_second_kdma() {
        let mut index = MetadataIndex::default();
        index.insert_run(
            "S1",
            None,
            "adm",
            None,
            &["affiliation".to_string()],
        );
        index.insert_run("S1", None, "adm", None, &["merit".to_string()]);
        let mut store = ColumnStore::new(ParameterRegistry::new(Arc::new(index)));

        let id = store.add_column();
        store
            .set_selection(id, &ParameterKey::Scenario, choice("S1"))
            .unwrap();
        store
            .set_selection(id, &ParameterKey::AdmType, choice("adm"))
            .unwrap();
        store
            .set_selection(
                id,
                &ParameterKey::Kdma("affiliation".to_string()),
                ParamValue::Level(0.1),
            )
            .unwrap();

        let before_version = store.column(id).unwrap().result_version;
        let err = store
            .set_selection(
                id,
                &ParameterKey::Kdma("merit".to_string()),
                ParamValue::Level(0.1),
            )
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { max: 1, .. }));

        let column = store.column(id).unwrap();
        assert_eq!(column.kdma_count(), 1);
        assert_eq!(column.result_version, before_version);
    }

    #[test]
    fn test_version_strictly_increases_and_guards_stale() {
        let mut store = store();
        let id = store.add_column();
        populate(&mut store, id);

        let (v1, _t1) = store.fetch_snapshot(id).unwrap();
        store
            .set_selection(id, &ParameterKey::Scene, choice("scene-a"))
            .unwrap();
        let (v2, _t2) = store.fetch_snapshot(id).unwrap();
        assert!(v2 > v1);

        // Stale completion is discarded
        assert!(!store.apply_fetch(id, v1, FetchOutcome::NoData));
        assert_eq!(store.column(id).unwrap().result, ResultState::Pending);

        // Current completion lands
        assert!(store.apply_fetch(
            id,
            v2,
            FetchOutcome::Success(serde_json::json!({"score": 0.9}))
        ));
        assert!(matches!(
            store.column(id).unwrap().result,
            ResultState::Ready { .. }
        ));
    }

    #[test]
    fn test_clear_selection() {
        let mut store = store();
        let id = store.add_column();
        populate(&mut store, id);
        let key = ParameterKey::Kdma("merit".to_string());
        store
            .set_selection(id, &key, ParamValue::Level(0.3))
            .unwrap();

        let outcome = store.clear_selection(id, &key).unwrap();
        assert!(outcome.changed);
        assert_eq!(store.column(id).unwrap().kdma_count(), 0);

        let outcome = store.clear_selection(id, &key).unwrap();
        assert!(!outcome.changed);
    }
}
