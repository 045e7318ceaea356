//! Status transitions of a leave request and who may trigger them.
//!
//! ```text
//! Pending --approve--> Approved
//! Pending --reject---> Rejected
//! Pending --edit/attach--> Pending
//! Pending --delete--> (removed)
//! ```
//!
//! Approved and Rejected are terminal. Editing or attaching to a terminal request fails with
//! [`LifecycleError::ImmutableRequest`]; any other event fails with
//! [`LifecycleError::IllegalTransition`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Actor, LeaveRequest, LeaveStatus},
    error::{Field, LifecycleError, ValidationError},
    protocol::{LeaveDraft, LeavePatch, ReviewDecision},
    validation::{validate_edit, FROZEN_FIELDS},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Edit,
    Attach,
    Delete,
    Approve,
    Reject,
}

impl LifecycleEvent {
    pub fn is_review(&self) -> bool {
        matches!(self, LifecycleEvent::Approve | LifecycleEvent::Reject)
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleEvent::Edit => "edit",
            LifecycleEvent::Attach => "attach a document to",
            LifecycleEvent::Delete => "delete",
            LifecycleEvent::Approve => "approve",
            LifecycleEvent::Reject => "reject",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(LeaveStatus),
    Removed,
}

pub fn next_state(from: LeaveStatus, event: LifecycleEvent) -> Result<Transition, LifecycleError> {
    use LifecycleEvent::*;

    match (from, event) {
        (LeaveStatus::Pending, Edit | Attach) => Ok(Transition::To(LeaveStatus::Pending)),
        (LeaveStatus::Pending, Delete) => Ok(Transition::Removed),
        (LeaveStatus::Pending, Approve) => Ok(Transition::To(LeaveStatus::Approved)),
        (LeaveStatus::Pending, Reject) => Ok(Transition::To(LeaveStatus::Rejected)),
        (status, Edit | Attach) => Err(LifecycleError::ImmutableRequest {
            status,
            frozen: FROZEN_FIELDS.to_vec(),
        }),
        (from, event) => Err(LifecycleError::IllegalTransition { from, event }),
    }
}

/// Review events need a reviewer role; every other event belongs to the requester.
pub fn authorize(
    actor: &Actor,
    request: &LeaveRequest,
    event: LifecycleEvent,
) -> Result<(), LifecycleError> {
    if event.is_review() {
        if !actor.role.is_reviewer() {
            return Err(LifecycleError::Forbidden {
                event,
                reason: format!("user {} is not a reviewer", actor.user_id),
            });
        }
        return Ok(());
    }

    if actor.user_id != request.requester_id {
        return Err(LifecycleError::Forbidden {
            event,
            reason: format!(
                "request {} belongs to user {}",
                request.id, request.requester_id
            ),
        });
    }
    Ok(())
}

/// Normalizes a review comment. Reject requires one; approve treats blank as absent.
pub fn review_comment(
    event: LifecycleEvent,
    comment: Option<&str>,
) -> Result<Option<String>, LifecycleError> {
    let comment = comment.map(str::trim).filter(|c| !c.is_empty());
    if event == LifecycleEvent::Reject && comment.is_none() {
        return Err(LifecycleError::Validation(vec![ValidationError::new(
            Field::ReviewComment,
            "a comment is required to reject a request",
        )]));
    }
    Ok(comment.map(str::to_string))
}

/// Full local check of an approve or reject intent, in order: transition legality,
/// authorization, comment.
pub fn check_review(
    actor: &Actor,
    request: &LeaveRequest,
    event: LifecycleEvent,
    comment: Option<&str>,
) -> Result<ReviewDecision, LifecycleError> {
    debug_assert!(event.is_review());
    next_state(request.status, event)?;
    authorize(actor, request, event)?;
    let comment = review_comment(event, comment)?;
    Ok(ReviewDecision {
        reviewer_id: actor.user_id,
        reviewer_name: actor.name.clone(),
        comment,
    })
}

pub fn check_edit(
    actor: &Actor,
    request: &LeaveRequest,
    patch: &LeavePatch,
) -> Result<LeaveDraft, LifecycleError> {
    next_state(request.status, LifecycleEvent::Edit)?;
    authorize(actor, request, LifecycleEvent::Edit)?;
    validate_edit(request, patch)
}

pub fn check_delete(actor: &Actor, request: &LeaveRequest) -> Result<(), LifecycleError> {
    next_state(request.status, LifecycleEvent::Delete)?;
    authorize(actor, request, LifecycleEvent::Delete)
}

pub fn check_attach(actor: &Actor, request: &LeaveRequest) -> Result<(), LifecycleError> {
    next_state(request.status, LifecycleEvent::Attach)?;
    authorize(actor, request, LifecycleEvent::Attach)
}

impl LeaveRequest {
    /// Applies an approve or reject decision, stamping the reviewer and `modified_at`.
    pub fn apply_review(
        &mut self,
        event: LifecycleEvent,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        let Transition::To(status) = next_state(self.status, event)? else {
            return Err(LifecycleError::IllegalTransition {
                from: self.status,
                event,
            });
        };
        let comment = review_comment(event, decision.comment.as_deref())?;

        self.status = status;
        self.reviewer_id = Some(decision.reviewer_id);
        self.reviewer_name = Some(decision.reviewer_name.clone());
        self.review_comment = comment;
        self.modified_at = now;
        Ok(())
    }

    /// Applies an edit; the duration must already match the new range.
    pub fn apply_patch(
        &mut self,
        patch: &LeavePatch,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        next_state(self.status, LifecycleEvent::Edit)?;
        let merged = validate_edit(self, patch)?;

        self.start_date = merged.start_date;
        self.end_date = merged.end_date;
        self.duration_days = merged.duration_days;
        if let Some(leave_type) = merged.leave_type {
            self.leave_type = leave_type;
        }
        self.reason = merged.reason;
        self.modified_at = now;
        Ok(())
    }

    pub fn attach_document(
        &mut self,
        reference: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        next_state(self.status, LifecycleEvent::Attach)?;
        self.attachment_ref = Some(reference.into());
        self.modified_at = now;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
