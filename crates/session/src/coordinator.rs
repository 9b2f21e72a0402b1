//! Session coordination
//!
//! A `Session` owns one comparison session: the column store, the global
//! link set, and fetch orchestration. Every user interaction is a single
//! synchronous command processed to completion, including link fan-out,
//! before the next one runs; result fetches are the only asynchronous
//! work and race only against the per-column version guard.
//!
//! Fan-out is best effort: a column that rejects a linked value keeps its
//! own state (or falls back to its first valid option during link
//! adoption) and never aborts propagation to the remaining columns.

use crate::fetcher::{FetchCompletion, FetchOutcome, ResultFetcher};
use crate::projection::{self, TableProjection};
use crate::registry::{ColumnContext, ParameterRegistry};
use crate::store::ColumnStore;
use alignview_common::{Column, ColumnId, MetadataIndex, ParamValue, ParameterKey, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One comparison session: columns, link set, and in-flight fetches.
/// Sessions are self-contained; any number can coexist in a process.
pub struct Session {
    id: Uuid,
    store: ColumnStore,
    links: BTreeSet<ParameterKey>,
    fetcher: Arc<dyn ResultFetcher>,
    tx: mpsc::UnboundedSender<FetchCompletion>,
    rx: mpsc::UnboundedReceiver<FetchCompletion>,
    inflight: usize,
    /// Columns added since the last projection pass, awaiting link
    /// reconciliation and their first fetch
    unreconciled: Vec<ColumnId>,
}

impl Session {
    pub fn new(metadata: Arc<MetadataIndex>, fetcher: Arc<dyn ResultFetcher>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        info!("Created session {}", id);
        Self {
            id,
            store: ColumnStore::new(ParameterRegistry::new(metadata)),
            links: BTreeSet::new(),
            fetcher,
            tx,
            rx,
            inflight: 0,
            unreconciled: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn registry(&self) -> &ParameterRegistry {
        self.store.registry()
    }

    pub fn columns(&self) -> &[Column] {
        self.store.columns()
    }

    pub fn column(&self, id: ColumnId) -> Result<&Column> {
        self.store.column(id)
    }

    pub fn linked_keys(&self) -> Vec<ParameterKey> {
        self.links.iter().cloned().collect()
    }

    pub fn is_linked(&self, key: &ParameterKey) -> bool {
        self.links.contains(key)
    }

    pub fn inflight_fetches(&self) -> usize {
        self.inflight
    }

    /// Add a blank column. It starts independent and is reconciled to
    /// linked values on the next projection pass.
    pub fn add_column(&mut self) -> ColumnId {
        let id = self.store.add_column();
        self.unreconciled.push(id);
        id
    }

    /// Remove a column. Link membership and other columns are unaffected;
    /// the column's in-flight fetches become orphans and are discarded on
    /// completion.
    pub fn remove_column(&mut self, id: ColumnId) -> Result<()> {
        self.store.remove_column(id)?;
        self.unreconciled.retain(|c| *c != id);
        Ok(())
    }

    /// Update one column's selection. For a linked key the new value fans
    /// out to every other column; columns rejecting it are skipped with a
    /// warning. Fetches start for every column whose tuple changed.
    pub fn set_selection(
        &mut self,
        id: ColumnId,
        key: ParameterKey,
        value: ParamValue,
    ) -> Result<()> {
        let outcome = self.store.set_selection(id, &key, value.clone())?;
        if !outcome.changed {
            return Ok(());
        }

        let mut affected = vec![id];
        if self.links.contains(&key) {
            for other in self.store.column_ids() {
                if other == id {
                    continue;
                }
                match self.store.set_selection(other, &key, value.clone()) {
                    Ok(outcome) if outcome.changed => affected.push(other),
                    Ok(_) => {}
                    Err(e) if e.is_recoverable() => {
                        warn!("Column {} rejected linked {}: {}", other, key, e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        for column in affected {
            self.start_fetch(column);
        }
        Ok(())
    }

    /// Clear one column's selection (KDMA removal). A cleared linked key
    /// clears on every column so the link invariant holds for unset too.
    pub fn clear_selection(&mut self, id: ColumnId, key: ParameterKey) -> Result<()> {
        let outcome = self.store.clear_selection(id, &key)?;
        if !outcome.changed {
            return Ok(());
        }

        let mut affected = vec![id];
        if self.links.contains(&key) {
            for other in self.store.column_ids() {
                if other == id {
                    continue;
                }
                if let Ok(outcome) = self.store.clear_selection(other, &key) {
                    if outcome.changed {
                        affected.push(other);
                    }
                }
            }
        }

        for column in affected {
            self.start_fetch(column);
        }
        Ok(())
    }

    /// Toggle linkage for a key. Returns whether the key is now linked.
    ///
    /// Linking adopts the first column's non-empty value as canonical and
    /// propagates it; a column rejecting that value falls back to the
    /// first entry of its own valid options. Unlinking changes no values.
    pub fn toggle_link(&mut self, key: ParameterKey) -> Result<bool> {
        if self.links.remove(&key) {
            info!("Unlinked {}", key);
            return Ok(false);
        }
        self.links.insert(key.clone());
        info!("Linked {}", key);

        let canonical = self
            .store
            .columns()
            .iter()
            .find_map(|c| c.selection(&key).cloned());
        let canonical = match canonical {
            Some(value) => value,
            // No column has a value yet; nothing to synchronize
            None => return Ok(true),
        };

        let mut affected = Vec::new();
        for id in self.store.column_ids() {
            match self.store.set_selection(id, &key, canonical.clone()) {
                Ok(outcome) if outcome.changed => affected.push(id),
                Ok(_) => {}
                Err(e) if e.is_recoverable() => {
                    if let Some(fallback) = self.fallback_value(id, &key) {
                        match self.store.set_selection(id, &key, fallback) {
                            Ok(outcome) if outcome.changed => affected.push(id),
                            Ok(_) => {}
                            Err(e) => warn!("Column {} fallback for {} failed: {}", id, key, e),
                        }
                    } else {
                        warn!("Column {} has no valid fallback for {}: {}", id, key, e);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        for column in affected {
            self.start_fetch(column);
        }
        Ok(true)
    }

    /// Reconcile freshly added columns to linked values, drain completed
    /// fetches, and derive the table projection.
    pub fn project(&mut self) -> TableProjection {
        self.reconcile_new_columns();
        self.drain_ready();
        projection::project(&self.store, &self.links)
    }

    /// Apply all fetch completions that have already arrived
    pub fn drain_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            if self.apply_completion(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for every in-flight fetch to complete and apply the survivors
    /// of the version guard
    pub async fn settle(&mut self) {
        while self.inflight > 0 {
            match self.rx.recv().await {
                Some(completion) => {
                    self.apply_completion(completion);
                }
                // Sender only drops when the session is torn down
                None => break,
            }
        }
    }

    fn apply_completion(&mut self, completion: FetchCompletion) -> bool {
        self.inflight = self.inflight.saturating_sub(1);
        self.store
            .apply_fetch(completion.column, completion.version, completion.outcome)
    }

    /// Spawn a fetch for the column's current tuple, tagged with the
    /// version captured now. Requires a tokio runtime.
    fn start_fetch(&mut self, id: ColumnId) {
        let (version, tuple) = match self.store.fetch_snapshot(id) {
            Ok(snapshot) => snapshot,
            Err(_) => return,
        };
        debug!("Fetch start: column {} version {} [{}]", id, version, tuple);

        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        self.inflight += 1;
        tokio::spawn(async move {
            let outcome = fetcher.fetch(&tuple).await;
            // Receiver gone means the session was dropped; nothing to do
            let _ = tx.send(FetchCompletion {
                column: id,
                version,
                outcome,
            });
        });
    }

    fn reconcile_new_columns(&mut self) {
        let pending = std::mem::take(&mut self.unreconciled);
        for id in pending {
            if self.store.column(id).is_err() {
                continue;
            }
            for key in self.links.clone() {
                let canonical = self
                    .store
                    .columns()
                    .iter()
                    .filter(|c| c.id != id)
                    .find_map(|c| c.selection(&key).cloned());
                let Some(value) = canonical else { continue };

                match self.store.set_selection(id, &key, value) {
                    Ok(_) => {}
                    Err(e) if e.is_recoverable() => {
                        if let Some(fallback) = self.fallback_value(id, &key) {
                            if let Err(e) = self.store.set_selection(id, &key, fallback) {
                                warn!("Column {} fallback for {} failed: {}", id, key, e);
                            }
                        } else {
                            warn!("Column {} has no valid fallback for {}: {}", id, key, e);
                        }
                    }
                    Err(e) => warn!("Reconciling column {} failed: {}", id, e),
                }
            }
            self.start_fetch(id);
        }
    }

    fn fallback_value(&self, id: ColumnId, key: &ParameterKey) -> Option<ParamValue> {
        let column = self.store.column(id).ok()?;
        self.store
            .registry()
            .valid_options(key, ColumnContext::of(column))
            .into_iter()
            .next()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("columns", &self.store.len())
            .field("links", &self.links)
            .field("inflight", &self.inflight)
            .finish()
    }
}
