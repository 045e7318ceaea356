use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, Utc};
use shared::{
    domain::{LeaveRequest, LeaveStatus, LeaveType, RequestId},
    protocol::LeaveDraft,
};

#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

pub fn attachment_reference(request_id: RequestId, filename: &str) -> String {
    format!("attachments/{request_id}/{filename}")
}

#[derive(Default)]
struct Records {
    last_id: i64,
    requests: BTreeMap<RequestId, LeaveRequest>,
    attachments: BTreeMap<RequestId, StoredAttachment>,
}

/// In-memory system of record. Clones share the same records.
#[derive(Clone, Default)]
pub struct Storage {
    records: Arc<RwLock<Records>>,
}

impl Storage {
    fn read(&self) -> RwLockReadGuard<'_, Records> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Records> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a validated draft as a new Pending request with a fresh id.
    pub fn insert_request(&self, draft: LeaveDraft, now: DateTime<Utc>) -> LeaveRequest {
        let mut records = self.write();
        records.last_id += 1;
        let request = LeaveRequest {
            id: RequestId(records.last_id),
            requester_id: draft.requester_id,
            requester_name: draft.requester_name,
            requester_department: draft.requester_department,
            start_date: draft.start_date,
            end_date: draft.end_date,
            duration_days: draft.duration_days,
            leave_type: draft.leave_type.unwrap_or(LeaveType::Other),
            reason: draft.reason,
            status: LeaveStatus::Pending,
            created_at: now,
            modified_at: now,
            reviewer_id: None,
            reviewer_name: None,
            review_comment: None,
            attachment_ref: None,
        };
        records.requests.insert(request.id, request.clone());
        request
    }

    pub fn load_request(&self, id: RequestId) -> Option<LeaveRequest> {
        self.read().requests.get(&id).cloned()
    }

    /// Every request, ordered by id.
    pub fn all_requests(&self) -> Vec<LeaveRequest> {
        self.read().requests.values().cloned().collect()
    }

    /// Runs `change` on a copy and commits it only if it succeeds.
    /// `None` when the request does not exist.
    pub fn update_request<E>(
        &self,
        id: RequestId,
        change: impl FnOnce(&mut LeaveRequest) -> Result<(), E>,
    ) -> Option<Result<LeaveRequest, E>> {
        let mut records = self.write();
        let current = records.requests.get(&id)?;
        let mut updated = current.clone();
        if let Err(err) = change(&mut updated) {
            return Some(Err(err));
        }
        records.requests.insert(id, updated.clone());
        Some(Ok(updated))
    }

    pub fn remove_request(&self, id: RequestId) -> Option<LeaveRequest> {
        let mut records = self.write();
        records.attachments.remove(&id);
        records.requests.remove(&id)
    }

    /// Keeps one document per request; a new upload replaces the previous one.
    pub fn store_attachment(&self, request_id: RequestId, filename: &str, content: Vec<u8>) {
        self.write().attachments.insert(
            request_id,
            StoredAttachment {
                filename: filename.to_string(),
                content,
            },
        );
    }

    pub fn load_attachment(&self, request_id: RequestId) -> Option<StoredAttachment> {
        self.read().attachments.get(&request_id).cloned()
    }
}

#[cfg(test)]
#[path = "tests/storage_tests.rs"]
mod tests;
