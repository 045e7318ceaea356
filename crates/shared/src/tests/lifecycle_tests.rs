use chrono::{Duration, NaiveDate};

use super::*;
use crate::domain::{LeaveType, RequestId, UserId, UserRole};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn actor(id: i64, role: UserRole) -> Actor {
    Actor {
        user_id: UserId(id),
        name: format!("user-{id}"),
        department: "Sales".into(),
        role,
    }
}

fn request(status: LeaveStatus) -> LeaveRequest {
    let now = Utc::now();
    LeaveRequest {
        id: RequestId(11),
        requester_id: UserId(1),
        requester_name: "user-1".into(),
        requester_department: "Sales".into(),
        start_date: date(2024, 3, 4),
        end_date: date(2024, 3, 6),
        duration_days: 3,
        leave_type: LeaveType::PaidLeave,
        reason: "spring break".into(),
        status,
        created_at: now,
        modified_at: now,
        reviewer_id: None,
        reviewer_name: None,
        review_comment: None,
        attachment_ref: None,
    }
}

#[test]
fn pending_transitions_follow_the_table() {
    use LifecycleEvent::*;

    let pending = LeaveStatus::Pending;
    assert_eq!(next_state(pending, Edit), Ok(Transition::To(pending)));
    assert_eq!(next_state(pending, Attach), Ok(Transition::To(pending)));
    assert_eq!(next_state(pending, Delete), Ok(Transition::Removed));
    assert_eq!(
        next_state(pending, Approve),
        Ok(Transition::To(LeaveStatus::Approved))
    );
    assert_eq!(
        next_state(pending, Reject),
        Ok(Transition::To(LeaveStatus::Rejected))
    );
}

#[test]
fn terminal_states_refuse_every_mutation() {
    use LifecycleEvent::*;

    for status in [LeaveStatus::Approved, LeaveStatus::Rejected] {
        for event in [Approve, Reject, Delete] {
            assert_eq!(
                next_state(status, event),
                Err(LifecycleError::IllegalTransition { from: status, event })
            );
        }
        for event in [Edit, Attach] {
            assert!(matches!(
                next_state(status, event),
                Err(LifecycleError::ImmutableRequest { .. })
            ));
        }
    }
}

#[test]
fn only_reviewers_may_review() {
    let pending = request(LeaveStatus::Pending);
    let err = check_review(
        &actor(1, UserRole::User),
        &pending,
        LifecycleEvent::Approve,
        None,
    )
    .expect_err("plain user");
    assert!(matches!(err, LifecycleError::Forbidden { .. }));

    let decision = check_review(
        &actor(2, UserRole::Manager),
        &pending,
        LifecycleEvent::Approve,
        Some("  "),
    )
    .expect("manager approves");
    assert_eq!(decision.reviewer_id, UserId(2));
    assert_eq!(decision.comment, None);
}

#[test]
fn only_the_requester_may_edit_or_delete() {
    let pending = request(LeaveStatus::Pending);
    let stranger = actor(5, UserRole::Admin);

    assert!(matches!(
        check_delete(&stranger, &pending),
        Err(LifecycleError::Forbidden { .. })
    ));
    assert!(matches!(
        check_edit(&stranger, &pending, &LeavePatch::default()),
        Err(LifecycleError::Forbidden { .. })
    ));
    assert!(check_delete(&actor(1, UserRole::User), &pending).is_ok());
}

#[test]
fn reject_without_comment_is_a_validation_error() {
    let pending = request(LeaveStatus::Pending);
    let err = check_review(
        &actor(2, UserRole::Manager),
        &pending,
        LifecycleEvent::Reject,
        Some(""),
    )
    .expect_err("comment required");
    assert_eq!(err.violations()[0].field, Field::ReviewComment);
}

#[test]
fn illegal_transition_is_reported_before_authorization() {
    let approved = request(LeaveStatus::Approved);
    let err = check_review(
        &actor(1, UserRole::User),
        &approved,
        LifecycleEvent::Approve,
        None,
    )
    .expect_err("already approved");
    assert_eq!(
        err,
        LifecycleError::IllegalTransition {
            from: LeaveStatus::Approved,
            event: LifecycleEvent::Approve,
        }
    );
}

#[test]
fn apply_review_stamps_reviewer_and_freezes_content() {
    let mut req = request(LeaveStatus::Pending);
    let before = req.clone();
    let later = req.modified_at + Duration::minutes(5);
    let decision = ReviewDecision {
        reviewer_id: UserId(2),
        reviewer_name: "Bob".into(),
        comment: Some("insufficient notice".into()),
    };

    req.apply_review(LifecycleEvent::Reject, &decision, later)
        .expect("reject");
    assert_eq!(req.status, LeaveStatus::Rejected);
    assert_eq!(req.review_comment.as_deref(), Some("insufficient notice"));
    assert_eq!(req.reviewer_name.as_deref(), Some("Bob"));
    assert_eq!(req.modified_at, later);
    assert_eq!(req.start_date, before.start_date);
    assert_eq!(req.reason, before.reason);

    let err = req
        .apply_review(LifecycleEvent::Approve, &decision, later)
        .expect_err("terminal");
    assert!(matches!(err, LifecycleError::IllegalTransition { .. }));
}

#[test]
fn apply_patch_recomputes_duration_and_bumps_modified_at() {
    let mut req = request(LeaveStatus::Pending);
    let later = req.modified_at + Duration::hours(1);
    let patch = LeavePatch {
        start_date: Some(date(2024, 3, 1)),
        ..LeavePatch::default()
    }
    .with_recomputed_duration(&req);

    req.apply_patch(&patch, later).expect("edit");
    assert_eq!(req.duration_days, 4);
    assert_eq!(req.modified_at, later);
}

#[test]
fn attach_is_refused_once_reviewed() {
    let mut req = request(LeaveStatus::Rejected);
    let err = req
        .attach_document("doc-1", Utc::now())
        .expect_err("frozen");
    assert!(matches!(err, LifecycleError::ImmutableRequest { .. }));
    assert!(req.attachment_ref.is_none());
}

#[test]
fn inverted_edit_range_is_a_start_date_violation() {
    let requester = actor(1, UserRole::User);
    let patch = LeavePatch {
        start_date: Some(date(2024, 3, 8)),
        end_date: Some(date(2024, 3, 5)),
        ..LeavePatch::default()
    }
    .with_recomputed_duration(&request(LeaveStatus::Pending));

    let err = check_edit(&requester, &request(LeaveStatus::Pending), &patch)
        .expect_err("end before start");
    assert!(err
        .violations()
        .iter()
        .any(|violation| violation.field == Field::StartDate));
    assert_eq!(
        crate::error::ApiError::from(err).code,
        crate::error::ErrorCode::Validation
    );
}
