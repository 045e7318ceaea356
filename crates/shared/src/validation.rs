use chrono::NaiveDate;

use crate::{
    calendar::count_working_days,
    domain::{Actor, LeaveRequest, LeaveType},
    error::{Field, LifecycleError, ValidationError},
    protocol::{LeaveDraft, LeavePatch},
};

/// Fields that can no longer change once a request has been reviewed.
pub const FROZEN_FIELDS: [Field; 4] = [
    Field::StartDate,
    Field::EndDate,
    Field::LeaveType,
    Field::Reason,
];

impl LeaveDraft {
    /// Builds a draft for `actor` with `duration_days` derived from the range.
    /// An inverted range yields zero; [`validate_draft`] reports it.
    pub fn for_actor(
        actor: &Actor,
        start_date: NaiveDate,
        end_date: NaiveDate,
        leave_type: LeaveType,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            requester_id: actor.user_id,
            requester_name: actor.name.clone(),
            requester_department: actor.department.clone(),
            start_date,
            end_date,
            duration_days: count_working_days(start_date, end_date).unwrap_or(0),
            leave_type: Some(leave_type),
            reason: reason.into(),
        }
    }
}

impl LeavePatch {
    /// Fills `duration_days` for the range that results from applying this patch
    /// to `existing`. Leaves it untouched when the patch does not move the dates.
    pub fn with_recomputed_duration(mut self, existing: &LeaveRequest) -> Self {
        if self.touches_dates() {
            let start = self.start_date.unwrap_or(existing.start_date);
            let end = self.end_date.unwrap_or(existing.end_date);
            self.duration_days = Some(count_working_days(start, end).unwrap_or(0));
        }
        self
    }
}

/// Checks every rule and reports all violations, not only the first.
pub fn validate_draft(draft: &LeaveDraft) -> Result<(), Vec<ValidationError>> {
    let mut violations = Vec::new();

    if draft.reason.trim().is_empty() {
        violations.push(ValidationError::new(Field::Reason, "reason is required"));
    }

    if draft.leave_type.is_none() {
        violations.push(ValidationError::new(
            Field::LeaveType,
            "leave type must be one of paid_leave, rtt, sick, unpaid, other",
        ));
    }

    match count_working_days(draft.start_date, draft.end_date) {
        Err(_) => violations.push(ValidationError::new(
            Field::StartDate,
            format!(
                "start date {} must not be after end date {}",
                draft.start_date, draft.end_date
            ),
        )),
        Ok(0) => violations.push(ValidationError::new(
            Field::DurationDays,
            "the range must contain at least one working day",
        )),
        Ok(expected) if expected != draft.duration_days => {
            violations.push(ValidationError::new(
                Field::DurationDays,
                format!(
                    "duration is {} working days, got {}",
                    expected, draft.duration_days
                ),
            ))
        }
        Ok(_) => {}
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Merges `patch` into `existing` without validating the result.
pub fn merge_patch(existing: &LeaveRequest, patch: &LeavePatch) -> LeaveDraft {
    LeaveDraft {
        requester_id: existing.requester_id,
        requester_name: existing.requester_name.clone(),
        requester_department: existing.requester_department.clone(),
        start_date: patch.start_date.unwrap_or(existing.start_date),
        end_date: patch.end_date.unwrap_or(existing.end_date),
        duration_days: patch.duration_days.unwrap_or(existing.duration_days),
        leave_type: Some(patch.leave_type.unwrap_or(existing.leave_type)),
        reason: patch
            .reason
            .clone()
            .unwrap_or_else(|| existing.reason.clone()),
    }
}

/// Validates an edit of an existing request and returns the merged draft.
pub fn validate_edit(
    existing: &LeaveRequest,
    patch: &LeavePatch,
) -> Result<LeaveDraft, LifecycleError> {
    if !existing.is_pending() {
        return Err(LifecycleError::ImmutableRequest {
            status: existing.status,
            frozen: FROZEN_FIELDS.to_vec(),
        });
    }

    let merged = merge_patch(existing, patch);
    validate_draft(&merged).map_err(LifecycleError::Validation)?;
    Ok(merged)
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
