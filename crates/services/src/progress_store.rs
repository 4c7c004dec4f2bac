use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use backend::{ApiError, ProgressApi};
use learn_core::aggregate::{self, LearnerStats, ModuleProgress};
use learn_core::model::{CompletionSet, ItemId, Module, ModuleId, ProgressSnapshot, Unit, UnitId};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How an optimistic mark-complete request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The backend confirmed the completion.
    Confirmed,
    /// The backend failed or declined; the item was restored to its prior state.
    RolledBack,
    /// A newer request for the same item (or a re-hydrate) took over; the response was ignored.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    ticket: u64,
    was_completed: bool,
}

#[derive(Debug, Default)]
struct ProgressState {
    completions: CompletionSet,
    snapshots: HashMap<ModuleId, ProgressSnapshot>,
    pending: HashMap<ItemId, Pending>,
    next_ticket: u64,
}

impl ProgressState {
    /// Optimistically complete `item_id` and hand out a ticket for the request.
    fn begin_mark(&mut self, item_id: &ItemId) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let newly_inserted = self.completions.insert(item_id.clone());
        // Keep the state from before the first in-flight request so rollback is exact.
        let was_completed = self
            .pending
            .get(item_id)
            .map_or(!newly_inserted, |pending| pending.was_completed);
        self.pending.insert(
            item_id.clone(),
            Pending {
                ticket,
                was_completed,
            },
        );
        ticket
    }

    /// Take the pending entry if `ticket` is still the newest for `item_id`.
    fn finish_mark(&mut self, item_id: &ItemId, ticket: u64) -> Option<Pending> {
        match self.pending.get(item_id) {
            Some(pending) if pending.ticket == ticket => self.pending.remove(item_id),
            _ => None,
        }
    }
}

/// Shared record of what the current learner has completed.
///
/// Cloning yields another handle to the same state. Build one at startup and
/// pass it to every consumer. The lock is only held inside synchronous
/// sections, never across a backend call.
#[derive(Clone)]
pub struct ProgressStore {
    api: Arc<dyn ProgressApi>,
    state: Arc<Mutex<ProgressState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(api: Arc<dyn ProgressApi>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            api,
            state: Arc::new(Mutex::new(ProgressState::default())),
            revision: Arc::new(revision),
        }
    }

    fn state(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Receiver that observes a new revision after every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Replace all progress with the given snapshots.
    ///
    /// An empty list clears the store. Responses to requests issued before
    /// this call are ignored when they arrive.
    pub fn hydrate(&self, all: Vec<ProgressSnapshot>) {
        {
            let mut state = self.state();
            state.completions = all
                .iter()
                .flat_map(ProgressSnapshot::completed_item_ids)
                .cloned()
                .collect();
            state.snapshots = all
                .into_iter()
                .map(|snapshot| (snapshot.module_id.clone(), snapshot))
                .collect();
            state.pending.clear();
            debug!(
                modules = state.snapshots.len(),
                completed = state.completions.len(),
                "progress hydrated"
            );
        }
        self.notify();
    }

    /// Forget all progress, e.g. when the learner signs out.
    pub fn clear(&self) {
        self.hydrate(Vec::new());
    }

    /// Fetch all progress from the backend and hydrate from it.
    ///
    /// On failure the store falls back to empty progress. Returns whether the
    /// fetch succeeded.
    pub async fn load_all(&self) -> bool {
        match self.api.get_all_progress().await {
            Ok(all) => {
                info!(modules = all.len(), "loaded learner progress");
                self.hydrate(all);
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to load progress; starting empty");
                self.hydrate(Vec::new());
                false
            }
        }
    }

    /// Fetch one module's progress and merge it into the store.
    ///
    /// Completed ids are added; nothing is removed. Failure leaves the store
    /// untouched. Returns whether anything was merged.
    pub async fn load_module_progress(&self, module_id: &ModuleId) -> bool {
        let snapshot = match self.api.get_progress(module_id).await {
            Ok(snapshot) => snapshot,
            Err(ApiError::NotFound) => {
                debug!(%module_id, "no progress recorded for module");
                return false;
            }
            Err(err) => {
                warn!(%module_id, error = %err, "failed to load module progress");
                return false;
            }
        };

        {
            let mut state = self.state();
            let ids: Vec<ItemId> = snapshot.completed_item_ids().cloned().collect();
            state.completions.extend(ids);
            state.snapshots.insert(module_id.clone(), snapshot);
        }
        self.notify();
        true
    }

    /// Mark an item complete immediately, then confirm with the backend.
    ///
    /// A failed or unconfirmed request restores the item's previous state.
    /// Only the newest request for an item may apply its response.
    pub async fn mark_complete(
        &self,
        module_id: &ModuleId,
        unit_id: &UnitId,
        item_id: &ItemId,
    ) -> MarkOutcome {
        let ticket = self.state().begin_mark(item_id);
        self.notify();

        let response = self
            .api
            .mark_item_complete(module_id, unit_id, item_id)
            .await;

        let outcome = {
            let mut state = self.state();
            let Some(pending) = state.finish_mark(item_id, ticket) else {
                debug!(%item_id, ticket, "ignoring superseded mark-complete response");
                // Keep a confirmed record while a newer request for the item is in flight.
                let cached = match response {
                    Ok(Some(snapshot)) if state.pending.contains_key(item_id) => {
                        state.snapshots.insert(module_id.clone(), snapshot);
                        true
                    }
                    _ => false,
                };
                drop(state);
                if cached {
                    self.notify();
                }
                return MarkOutcome::Superseded;
            };

            match response {
                Ok(Some(snapshot)) => {
                    state.snapshots.insert(module_id.clone(), snapshot);
                    MarkOutcome::Confirmed
                }
                Ok(None) => {
                    warn!(%module_id, %item_id, "mark complete was not confirmed; rolling back");
                    if !pending.was_completed {
                        state.completions.remove(item_id);
                    }
                    MarkOutcome::RolledBack
                }
                Err(err) => {
                    warn!(%module_id, %item_id, error = %err, "mark complete failed; rolling back");
                    if !pending.was_completed {
                        state.completions.remove(item_id);
                    }
                    MarkOutcome::RolledBack
                }
            }
        };
        self.notify();
        outcome
    }

    /// True if the item is completed. A missing id is never completed.
    #[must_use]
    pub fn is_completed<'a>(&self, item_id: impl Into<Option<&'a ItemId>>) -> bool {
        self.state().completions.contains(item_id)
    }

    /// Copy of the current completion set.
    #[must_use]
    pub fn completions(&self) -> CompletionSet {
        self.state().completions.clone()
    }

    /// Run `f` against a consistent view of the completion set.
    pub fn with_completions<R>(&self, f: impl FnOnce(&CompletionSet) -> R) -> R {
        f(&self.state().completions)
    }

    /// Last backend snapshot known for a module.
    #[must_use]
    pub fn snapshot(&self, module_id: &ModuleId) -> Option<ProgressSnapshot> {
        self.state().snapshots.get(module_id).cloned()
    }

    #[must_use]
    pub fn module_progress(&self, module: &Module) -> ModuleProgress {
        self.with_completions(|set| ModuleProgress::compute(module, set))
    }

    #[must_use]
    pub fn module_percentage(&self, module: &Module) -> u8 {
        self.with_completions(|set| aggregate::module_percentage(module, set))
    }

    #[must_use]
    pub fn unit_percentage(&self, unit: &Unit) -> u8 {
        self.with_completions(|set| aggregate::unit_percentage(unit, set))
    }

    #[must_use]
    pub fn completed_items_count(&self, module: &Module) -> usize {
        self.with_completions(|set| aggregate::completed_in_module(module, set))
    }

    #[must_use]
    pub fn learner_stats(&self, modules: &[Module]) -> LearnerStats {
        self.with_completions(|set| LearnerStats::compute(modules, set))
    }

    /// Started but unfinished modules with their percentage, at most `limit`.
    #[must_use]
    pub fn in_progress<'a>(&self, modules: &'a [Module], limit: usize) -> Vec<(&'a Module, u8)> {
        self.with_completions(|set| aggregate::in_progress(modules, set, limit))
    }
}
