//! Render projection
//!
//! Pure derivation of the visible comparison table from a column store
//! snapshot and the link set. One row per parameter key, one column per
//! live column. Static rows always show; dynamic KDMA rows only when the
//! key is valid in, or selected by, at least one current column.

use crate::registry::ColumnContext;
use crate::store::ColumnStore;
use alignview_common::{ColumnId, ParamValue, ParameterKey, ResultState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One parameter row across all columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterRow {
    pub key: ParameterKey,
    pub label: String,
    pub linked: bool,
    /// One cell per column, `None` for unset selections
    pub cells: Vec<Option<ParamValue>>,
}

/// Per-column result cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCell {
    pub column: ColumnId,
    pub result: ResultState,
}

/// The derived comparison table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableProjection {
    /// Column ids in creation order
    pub columns: Vec<ColumnId>,
    pub rows: Vec<ParameterRow>,
    pub results: Vec<ResultCell>,
}

/// Derive the table. Pure; recomputed on every store or link change.
pub fn project(store: &ColumnStore, links: &BTreeSet<ParameterKey>) -> TableProjection {
    let columns = store.columns();
    let registry = store.registry();

    let mut rows = Vec::new();
    for key in registry.parameter_keys() {
        if key.is_kdma() {
            let relevant = columns.iter().any(|c| {
                c.selection(&key).is_some()
                    || !registry
                        .valid_options(&key, ColumnContext::of(c))
                        .is_empty()
            });
            if !relevant {
                continue;
            }
        }

        rows.push(ParameterRow {
            label: key.label(),
            linked: links.contains(&key),
            cells: columns.iter().map(|c| c.selection(&key).cloned()).collect(),
            key,
        });
    }

    TableProjection {
        columns: columns.iter().map(|c| c.id).collect(),
        rows,
        results: columns
            .iter()
            .map(|c| ResultCell {
                column: c.id,
                result: c.result.clone(),
            })
            .collect(),
    }
}

impl TableProjection {
    pub fn row(&self, key: &ParameterKey) -> Option<&ParameterRow> {
        self.rows.iter().find(|r| &r.key == key)
    }

    pub fn result_for(&self, column: ColumnId) -> Option<&ResultState> {
        self.results
            .iter()
            .find(|r| r.column == column)
            .map(|r| &r.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParameterRegistry;
    use alignview_common::MetadataIndex;
    use std::sync::Arc;

    fn store() -> ColumnStore {
        let mut index = MetadataIndex::default();
        index.insert_run(
            "S1",
            None,
            "pipeline_baseline",
            None,
            &["affiliation".to_string()],
        );
        index.insert_run("S2", None, "pipeline_random", None, &[]);
        ColumnStore::new(ParameterRegistry::new(Arc::new(index)))
    }

    fn choice(s: &str) -> ParamValue {
        ParamValue::Choice(s.to_string())
    }

    #[test]
    fn test_static_rows_always_present() {
        let store = store();
        let projection = project(&store, &BTreeSet::new());
        assert!(projection.columns.is_empty());
        assert_eq!(projection.rows.len(), 4);
        assert!(projection.row(&ParameterKey::Scenario).is_some());
    }

    #[test]
    fn test_kdma_row_shown_only_when_relevant() {
        let mut store = store();
        let id = store.add_column();
        let kdma = ParameterKey::Kdma("affiliation".to_string());

        // No column context makes the KDMA valid yet
        let projection = project(&store, &BTreeSet::new());
        assert!(projection.row(&kdma).is_none());

        store
            .set_selection(id, &ParameterKey::Scenario, choice("S1"))
            .unwrap();
        store
            .set_selection(id, &ParameterKey::AdmType, choice("pipeline_baseline"))
            .unwrap();
        let projection = project(&store, &BTreeSet::new());
        assert!(projection.row(&kdma).is_some());
    }

    #[test]
    fn test_linked_flag_and_cells() {
        let mut store = store();
        let a = store.add_column();
        let b = store.add_column();
        store
            .set_selection(a, &ParameterKey::Scenario, choice("S1"))
            .unwrap();

        let mut links = BTreeSet::new();
        links.insert(ParameterKey::Scenario);

        let projection = project(&store, &links);
        let row = projection.row(&ParameterKey::Scenario).unwrap();
        assert!(row.linked);
        assert_eq!(row.cells, vec![Some(choice("S1")), None]);
        assert!(!projection.row(&ParameterKey::AdmType).unwrap().linked);
        assert_eq!(projection.columns, vec![a, b]);
    }
}
