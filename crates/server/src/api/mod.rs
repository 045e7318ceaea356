//! Authority-side operations on leave requests. Handlers in `main.rs` translate HTTP to
//! these calls; every rule is re-checked here regardless of what the client already did.

use std::{cmp::Ordering, collections::BTreeMap};

use chrono::{DateTime, Utc};
use shared::{
    domain::{LeaveRequest, LeaveStatus, RequestId, UserId},
    error::{ApiError, ErrorCode, LifecycleError},
    lifecycle::LifecycleEvent,
    protocol::{
        DepartmentStatistics, LeaveDraft, LeavePatch, LeaveStatistics, ListQuery, ListResponse,
        ReviewDecision, SortField, SortOrder,
    },
    validation::validate_draft,
};
use tracing::info;

use crate::storage::{attachment_reference, Storage, StoredAttachment};

pub const MAX_FILENAME_BYTES: usize = 180;

#[derive(Clone, Default)]
pub struct ApiContext {
    pub storage: Storage,
}

pub fn list_requests(ctx: &ApiContext, query: &ListQuery) -> Result<ListResponse, ApiError> {
    let mut matching: Vec<_> = ctx
        .storage
        .all_requests()
        .into_iter()
        .filter(|request| query.matches(request))
        .collect();

    if let Some(field) = query.sort {
        let order = query.order.unwrap_or_default();
        matching.sort_by(|a, b| {
            let ordering = compare_by(field, a, b);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }

    let total_count = matching.len() as u64;
    let data = matching
        .into_iter()
        .skip(query.skip.unwrap_or(0) as usize)
        .take(query.take.map_or(usize::MAX, |take| take as usize))
        .collect();
    Ok(ListResponse { data, total_count })
}

fn compare_by(field: SortField, a: &LeaveRequest, b: &LeaveRequest) -> Ordering {
    let primary = match field {
        SortField::StartDate => a.start_date.cmp(&b.start_date),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Status => status_rank(a.status).cmp(&status_rank(b.status)),
    };
    primary.then(a.id.cmp(&b.id))
}

fn status_rank(status: LeaveStatus) -> u8 {
    match status {
        LeaveStatus::Pending => 0,
        LeaveStatus::Approved => 1,
        LeaveStatus::Rejected => 2,
    }
}

pub fn get_request(ctx: &ApiContext, id: RequestId) -> Result<LeaveRequest, ApiError> {
    ctx.storage.load_request(id).ok_or_else(|| not_found(id))
}

pub fn create_request(
    ctx: &ApiContext,
    draft: LeaveDraft,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, ApiError> {
    validate_draft(&draft)
        .map_err(|violations| ApiError::from(LifecycleError::Validation(violations)))?;
    let created = ctx.storage.insert_request(draft, now);
    info!(
        request_id = created.id.0,
        requester_id = created.requester_id.0,
        duration_days = created.duration_days,
        "leave request stored"
    );
    Ok(created)
}

pub fn update_request(
    ctx: &ApiContext,
    id: RequestId,
    patch: &LeavePatch,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, ApiError> {
    let updated = ctx
        .storage
        .update_request(id, |request| request.apply_patch(patch, now))
        .ok_or_else(|| not_found(id))?
        .map_err(ApiError::from)?;
    info!(request_id = id.0, "leave request updated");
    Ok(updated)
}

pub fn delete_request(ctx: &ApiContext, id: RequestId) -> Result<(), ApiError> {
    let current = get_request(ctx, id)?;
    if !current.is_pending() {
        return Err(ApiError::new(
            ErrorCode::Conflict,
            format!("cannot delete a request that is already {}", current.status),
        ));
    }
    ctx.storage.remove_request(id).ok_or_else(|| not_found(id))?;
    info!(request_id = id.0, "leave request deleted");
    Ok(())
}

pub fn review_request(
    ctx: &ApiContext,
    id: RequestId,
    event: LifecycleEvent,
    decision: &ReviewDecision,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, ApiError> {
    let reviewed = ctx
        .storage
        .update_request(id, |request| request.apply_review(event, decision, now))
        .ok_or_else(|| not_found(id))?
        .map_err(ApiError::from)?;
    info!(
        request_id = id.0,
        status = %reviewed.status,
        reviewer_id = decision.reviewer_id.0,
        "leave request reviewed"
    );
    Ok(reviewed)
}

/// Trims and checks an uploaded file name; it becomes part of the stored reference.
pub fn clean_filename(raw: Option<&str>) -> Result<String, ApiError> {
    let name = raw
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::new(ErrorCode::Validation, "filename is required"))?;
    if name.len() > MAX_FILENAME_BYTES {
        return Err(ApiError::new(ErrorCode::Validation, "filename is too long"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "filename must not contain path separators",
        ));
    }
    Ok(name.to_string())
}

pub fn attach_document(
    ctx: &ApiContext,
    id: RequestId,
    filename: &str,
    content: Vec<u8>,
    now: DateTime<Utc>,
) -> Result<LeaveRequest, ApiError> {
    if content.is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "attachment body cannot be empty",
        ));
    }

    let reference = attachment_reference(id, filename);
    let updated = ctx
        .storage
        .update_request(id, |request| request.attach_document(reference, now))
        .ok_or_else(|| not_found(id))?
        .map_err(ApiError::from)?;

    let size_bytes = content.len();
    ctx.storage.store_attachment(id, filename, content);
    info!(request_id = id.0, filename, size_bytes, "justification stored");
    Ok(updated)
}

pub fn load_document(ctx: &ApiContext, id: RequestId) -> Result<StoredAttachment, ApiError> {
    get_request(ctx, id)?;
    ctx.storage.load_attachment(id).ok_or_else(|| {
        ApiError::new(
            ErrorCode::NotFound,
            format!("leave request {id} has no attachment"),
        )
    })
}

/// Approved working days per leave type inside `year`, and how many of the user's requests
/// touching that year sit in each status.
pub fn user_statistics(
    ctx: &ApiContext,
    user_id: UserId,
    year: i32,
) -> Result<LeaveStatistics, ApiError> {
    let mut stats = LeaveStatistics::empty(user_id, year);
    for request in ctx
        .storage
        .all_requests()
        .iter()
        .filter(|request| request.requester_id == user_id)
    {
        stats.record(request);
    }
    Ok(stats)
}

/// Per-requester totals for everyone in `department` with a request touching `year`.
pub fn department_statistics(
    ctx: &ApiContext,
    department: &str,
    year: i32,
) -> Result<DepartmentStatistics, ApiError> {
    let department = department.trim();
    if department.is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "department must not be empty",
        ));
    }

    let mut members: BTreeMap<UserId, LeaveStatistics> = BTreeMap::new();
    for request in ctx.storage.all_requests().iter().filter(|request| {
        request.requester_department == department && request.touches_year(year)
    }) {
        members
            .entry(request.requester_id)
            .or_insert_with(|| LeaveStatistics::empty(request.requester_id, year))
            .record(request);
    }

    Ok(DepartmentStatistics {
        department: department.to_string(),
        year,
        members: members.into_values().collect(),
    })
}

fn not_found(id: RequestId) -> ApiError {
    ApiError::new(
        ErrorCode::NotFound,
        format!("leave request {id} not found"),
    )
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
