//! In-process cache of leave requests, the render source of the UI.
//!
//! Only [`crate::LeaveClient`] mutates the store; everything else gets read accessors
//! and a [`StoreEvent`] stream. The lock is never held across an `.await`.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use shared::domain::{LeaveRequest, RequestId};
use tokio::sync::broadcast;

const STORE_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    ListReplaced { total_count: u64 },
    Upserted(RequestId),
    Removed(RequestId),
    SelectedChanged(Option<RequestId>),
    ErrorChanged(Option<String>),
    LoadingChanged(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// The store already holds a newer version; nothing changed.
    Stale,
}

/// Point-in-time copy of everything the store exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub requests: Vec<LeaveRequest>,
    pub selected: Option<LeaveRequest>,
    pub total_count: u64,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct StoreState {
    order: Vec<RequestId>,
    entries: HashMap<RequestId, LeaveRequest>,
    selected: Option<LeaveRequest>,
    total_count: u64,
    in_flight: usize,
    error: Option<String>,
}

impl StoreState {
    fn list(&self) -> Vec<LeaveRequest> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }
}

pub struct RequestStore {
    state: RwLock<StoreState>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(STORE_EVENT_CAPACITY);
        Self {
            state: RwLock::new(StoreState::default()),
            events,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StoreEvent) {
        // No subscriber is fine.
        let _ = self.events.send(event);
    }

    /// Requests in the order the last list query returned them, followed by
    /// requests created since.
    pub fn list(&self) -> Vec<LeaveRequest> {
        self.read().list()
    }

    /// The freshest copy of `id` held in either the list or the selected slot.
    pub fn get(&self, id: RequestId) -> Option<LeaveRequest> {
        let state = self.read();
        let in_list = state.entries.get(&id);
        let in_selected = state.selected.as_ref().filter(|selected| selected.id == id);
        match (in_list, in_selected) {
            (Some(listed), Some(selected)) if selected.modified_at > listed.modified_at => {
                Some(selected.clone())
            }
            (Some(listed), _) => Some(listed.clone()),
            (None, selected) => selected.cloned(),
        }
    }

    pub fn selected(&self) -> Option<LeaveRequest> {
        self.read().selected.clone()
    }

    pub fn total_count(&self) -> u64 {
        self.read().total_count
    }

    pub fn is_loading(&self) -> bool {
        self.read().in_flight > 0
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read();
        StoreSnapshot {
            requests: state.list(),
            selected: state.selected.clone(),
            total_count: state.total_count,
            loading: state.in_flight > 0,
            error: state.error.clone(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Replaces every copy of `entry` the store holds (list and selected slot).
    /// An entry held nowhere is appended to the list and counted. A version older
    /// than the one already held is ignored.
    pub(crate) fn upsert(&self, entry: LeaveRequest) -> UpsertOutcome {
        let id = entry.id;
        let outcome = {
            let mut state = self.write();

            let in_list = state.entries.get(&id).map(|held| held.modified_at);
            let in_selected = state
                .selected
                .as_ref()
                .filter(|held| held.id == id)
                .map(|held| held.modified_at);

            let newest_held = in_list.into_iter().chain(in_selected).max();
            if newest_held.is_some_and(|held| entry.modified_at < held) {
                UpsertOutcome::Stale
            } else {
                if in_selected.is_some() {
                    state.selected = Some(entry.clone());
                }
                if in_list.is_some() {
                    state.entries.insert(id, entry);
                    UpsertOutcome::Replaced
                } else if in_selected.is_some() {
                    UpsertOutcome::Replaced
                } else {
                    state.order.push(id);
                    state.entries.insert(id, entry);
                    state.total_count += 1;
                    UpsertOutcome::Inserted
                }
            }
        };

        if outcome != UpsertOutcome::Stale {
            self.emit(StoreEvent::Upserted(id));
        }
        outcome
    }

    pub(crate) fn remove(&self, id: RequestId) -> bool {
        let removed = {
            let mut state = self.write();
            let in_list = state.entries.remove(&id).is_some();
            if in_list {
                state.order.retain(|held| *held != id);
            }
            let in_selected = state.selected.as_ref().is_some_and(|held| held.id == id);
            if in_selected {
                state.selected = None;
            }
            let removed = in_list || in_selected;
            if removed {
                state.total_count = state.total_count.saturating_sub(1);
            }
            removed
        };

        if removed {
            self.emit(StoreEvent::Removed(id));
        }
        removed
    }

    pub(crate) fn replace_all(&self, entries: Vec<LeaveRequest>, total_count: u64) {
        {
            let mut state = self.write();
            state.order = entries.iter().map(|entry| entry.id).collect();
            state.entries = entries.into_iter().map(|entry| (entry.id, entry)).collect();
            state.total_count = total_count;
        }
        self.emit(StoreEvent::ListReplaced { total_count });
    }

    /// Fills the selected slot whatever it held. A list entry with the same id is
    /// refreshed too unless it is newer.
    pub(crate) fn set_selected(&self, entry: LeaveRequest) {
        let id = entry.id;
        let list_refreshed = {
            let mut state = self.write();
            let refreshed = match state.entries.get_mut(&id) {
                Some(listed) if listed.modified_at <= entry.modified_at => {
                    *listed = entry.clone();
                    true
                }
                _ => false,
            };
            state.selected = Some(entry);
            refreshed
        };
        if list_refreshed {
            self.emit(StoreEvent::Upserted(id));
        }
        self.emit(StoreEvent::SelectedChanged(Some(id)));
    }

    pub(crate) fn clear_selected(&self) {
        let had_selection = self.write().selected.take().is_some();
        if had_selection {
            self.emit(StoreEvent::SelectedChanged(None));
        }
    }

    pub(crate) fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.write().error = Some(message.clone());
        self.emit(StoreEvent::ErrorChanged(Some(message)));
    }

    pub(crate) fn clear_error(&self) {
        let had_error = self.write().error.take().is_some();
        if had_error {
            self.emit(StoreEvent::ErrorChanged(None));
        }
    }

    /// Counted: the flag stays asserted until every `true` has been matched by a `false`.
    pub(crate) fn set_loading(&self, loading: bool) {
        let changed = {
            let mut state = self.write();
            let was_loading = state.in_flight > 0;
            if loading {
                state.in_flight += 1;
            } else {
                state.in_flight = state.in_flight.saturating_sub(1);
            }
            was_loading != (state.in_flight > 0)
        };
        if changed {
            self.emit(StoreEvent::LoadingChanged(loading));
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
