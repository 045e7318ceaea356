//! Intent handlers reconciling the [`RequestStore`] with the remote authority.
//!
//! Every mutating intent runs the same sequence: refuse while an error is
//! displayed, claim the request id, check the rules locally, call the authority
//! exactly once, then apply the response to the store. A failed call leaves the
//! store as it was and records the cause in the error slot.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::NaiveDate;
use shared::{
    domain::{Actor, LeaveRequest, LeaveType, RequestId, UserId},
    error::LifecycleError,
    lifecycle::{check_attach, check_delete, check_edit, check_review, LifecycleEvent},
    protocol::{DepartmentStatistics, LeaveDraft, LeavePatch, LeaveStatistics, ListQuery},
    validation::validate_draft,
};
use tracing::{debug, info, warn};

use crate::{
    config::ClientSettings,
    error::{LeaveError, RemoteError, SynchronizationError},
    http::HttpRemoteAuthority,
    remote::RemoteAuthority,
    store::{RequestStore, UpsertOutcome},
};

pub type LeaveResult<T> = std::result::Result<T, LeaveError>;

/// Marks a request id as having a mutation in flight until dropped.
struct InFlightGuard<'a> {
    ids: &'a Mutex<HashSet<RequestId>>,
    id: RequestId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Keeps the store's loading flag asserted for the duration of a remote call.
struct LoadingGuard<'a>(&'a RequestStore);

impl<'a> LoadingGuard<'a> {
    fn start(store: &'a RequestStore) -> Self {
        store.set_loading(true);
        Self(store)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.set_loading(false);
    }
}

pub struct LeaveClient {
    remote: Arc<dyn RemoteAuthority>,
    actor: Actor,
    store: RequestStore,
    in_flight: Mutex<HashSet<RequestId>>,
}

impl LeaveClient {
    pub fn new(remote: Arc<dyn RemoteAuthority>, actor: Actor) -> Self {
        Self {
            remote,
            actor,
            store: RequestStore::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn over_http(settings: &ClientSettings, actor: Actor) -> anyhow::Result<Self> {
        let remote = HttpRemoteAuthority::from_settings(settings)?;
        Ok(Self::new(Arc::new(remote), actor))
    }

    pub fn store(&self) -> &RequestStore {
        &self.store
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Replaces the list view and total count with one page of results.
    pub async fn fetch_requests(&self, query: &ListQuery) -> LeaveResult<Vec<LeaveRequest>> {
        let response = {
            let _loading = LoadingGuard::start(&self.store);
            self.remote.list(query).await
        }
        .map_err(|err| self.sync_failure("list", None, err))?;

        info!(
            returned = response.data.len(),
            total_count = response.total_count,
            "leave requests fetched"
        );
        self.store
            .replace_all(response.data.clone(), response.total_count);
        Ok(response.data)
    }

    /// Loads one request into the selected slot, whatever it held before.
    pub async fn fetch_request(&self, id: RequestId) -> LeaveResult<LeaveRequest> {
        let request = {
            let _loading = LoadingGuard::start(&self.store);
            self.remote.get_by_id(id).await
        }
        .map_err(|err| self.sync_failure("get", Some(id), err))?;

        self.store.set_selected(request.clone());
        Ok(request)
    }

    pub async fn create(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        leave_type: LeaveType,
        reason: &str,
    ) -> LeaveResult<LeaveRequest> {
        self.ensure_error_dismissed()?;
        let draft = LeaveDraft::for_actor(&self.actor, start_date, end_date, leave_type, reason);
        validate_draft(&draft).map_err(LifecycleError::Validation)?;

        let created = {
            let _loading = LoadingGuard::start(&self.store);
            self.remote.create(&draft).await
        }
        .map_err(|err| self.sync_failure("create", None, err))?;

        info!(
            request_id = created.id.0,
            duration_days = created.duration_days,
            "leave request created"
        );
        self.apply(created.clone());
        Ok(created)
    }

    pub async fn edit(&self, id: RequestId, patch: LeavePatch) -> LeaveResult<LeaveRequest> {
        self.ensure_error_dismissed()?;
        let _claim = self.claim(id)?;
        let current = self.loaded(id)?;

        let patch = patch.with_recomputed_duration(&current);
        check_edit(&self.actor, &current, &patch)?;

        let updated = {
            let _loading = LoadingGuard::start(&self.store);
            self.remote.update(id, &patch).await
        }
        .map_err(|err| self.sync_failure("edit", Some(id), err))?;

        info!(request_id = id.0, "leave request updated");
        self.apply(updated.clone());
        Ok(updated)
    }

    pub async fn approve(&self, id: RequestId, comment: Option<&str>) -> LeaveResult<LeaveRequest> {
        self.review(id, LifecycleEvent::Approve, comment).await
    }

    pub async fn reject(&self, id: RequestId, comment: &str) -> LeaveResult<LeaveRequest> {
        self.review(id, LifecycleEvent::Reject, Some(comment)).await
    }

    async fn review(
        &self,
        id: RequestId,
        event: LifecycleEvent,
        comment: Option<&str>,
    ) -> LeaveResult<LeaveRequest> {
        self.ensure_error_dismissed()?;
        let _claim = self.claim(id)?;
        let current = self.loaded(id)?;
        let decision = check_review(&self.actor, &current, event, comment)?;

        let reviewed = {
            let _loading = LoadingGuard::start(&self.store);
            match event {
                LifecycleEvent::Reject => self.remote.reject(id, &decision).await,
                _ => self.remote.approve(id, &decision).await,
            }
        }
        .map_err(|err| self.sync_failure("review", Some(id), err))?;

        info!(
            request_id = id.0,
            status = %reviewed.status,
            reviewer_id = self.actor.user_id.0,
            "leave request reviewed"
        );
        self.apply(reviewed.clone());
        Ok(reviewed)
    }

    pub async fn delete(&self, id: RequestId) -> LeaveResult<()> {
        self.ensure_error_dismissed()?;
        let _claim = self.claim(id)?;
        let current = self.loaded(id)?;
        check_delete(&self.actor, &current)?;

        let deleted = {
            let _loading = LoadingGuard::start(&self.store);
            self.remote.delete(id).await
        };
        deleted.map_err(|err| self.sync_failure("delete", Some(id), err))?;

        info!(request_id = id.0, "leave request deleted");
        self.store.remove(id);
        Ok(())
    }

    /// Uploads a justification document for a pending request.
    pub async fn attach(
        &self,
        id: RequestId,
        filename: &str,
        content: Vec<u8>,
    ) -> LeaveResult<LeaveRequest> {
        self.ensure_error_dismissed()?;
        let _claim = self.claim(id)?;
        let current = self.loaded(id)?;
        check_attach(&self.actor, &current)?;

        let updated = {
            let _loading = LoadingGuard::start(&self.store);
            self.remote.upload_attachment(id, filename, content).await
        }
        .map_err(|err| self.sync_failure("attach", Some(id), err))?;

        info!(request_id = id.0, filename, "justification attached");
        self.apply(updated.clone());
        Ok(updated)
    }

    /// Yearly totals; read-only and not cached in the store.
    pub async fn user_statistics(&self, user_id: UserId, year: i32) -> LeaveResult<LeaveStatistics> {
        let _loading = LoadingGuard::start(&self.store);
        self.remote
            .user_statistics(user_id, year)
            .await
            .map_err(|err| self.sync_failure("statistics", None, err))
    }

    /// Yearly totals per requester of `department`; read-only and not cached.
    pub async fn department_statistics(
        &self,
        department: &str,
        year: i32,
    ) -> LeaveResult<DepartmentStatistics> {
        let _loading = LoadingGuard::start(&self.store);
        self.remote
            .department_statistics(department, year)
            .await
            .map_err(|err| self.sync_failure("department statistics", None, err))
    }

    /// Closing the detail view empties the selected slot.
    pub fn close_selected(&self) {
        self.store.clear_selected();
    }

    pub fn clear_error(&self) {
        self.store.clear_error();
    }

    fn ensure_error_dismissed(&self) -> LeaveResult<()> {
        match self.store.error() {
            Some(message) => Err(LeaveError::ErrorNotCleared(message)),
            None => Ok(()),
        }
    }

    fn claim(&self, id: RequestId) -> LeaveResult<InFlightGuard<'_>> {
        let mut ids = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id) {
            debug!(request_id = id.0, "mutation refused, another one is in flight");
            return Err(LeaveError::RequestBusy(id));
        }
        Ok(InFlightGuard {
            ids: &self.in_flight,
            id,
        })
    }

    fn loaded(&self, id: RequestId) -> LeaveResult<LeaveRequest> {
        self.store.get(id).ok_or(LeaveError::UnknownRequest(id))
    }

    fn apply(&self, request: LeaveRequest) {
        let id = request.id;
        if self.store.upsert(request) == UpsertOutcome::Stale {
            debug!(request_id = id.0, "ignored response older than the cached entry");
        }
    }

    fn sync_failure(&self, intent: &str, id: Option<RequestId>, err: RemoteError) -> LeaveError {
        let err = SynchronizationError::from(err);
        warn!(
            intent,
            request_id = id.map(|id| id.0),
            code = ?err.code,
            error = %err.message,
            "remote call failed"
        );
        self.store.set_error(err.message.clone());
        LeaveError::Synchronization(err)
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
