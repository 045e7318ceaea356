use chrono::Utc;

use super::*;
use crate::domain::RequestId;

fn sample(status: LeaveStatus, requester: i64, leave_type: LeaveType) -> LeaveRequest {
    let now = Utc::now();
    let day = NaiveDate::from_ymd_opt(2024, 5, 6).expect("date");
    LeaveRequest {
        id: RequestId(3),
        requester_id: UserId(requester),
        requester_name: "Chloe".into(),
        requester_department: "Finance".into(),
        start_date: day,
        end_date: day,
        duration_days: 1,
        leave_type,
        reason: "appointment".into(),
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
fn list_query_filters_combine() {
    let query = ListQuery {
        status: Some(LeaveStatus::Pending),
        requester_id: Some(UserId(4)),
        ..ListQuery::default()
    };

    assert!(query.matches(&sample(LeaveStatus::Pending, 4, LeaveType::Sick)));
    assert!(!query.matches(&sample(LeaveStatus::Approved, 4, LeaveType::Sick)));
    assert!(!query.matches(&sample(LeaveStatus::Pending, 5, LeaveType::Sick)));
    assert!(ListQuery::default().matches(&sample(LeaveStatus::Rejected, 9, LeaveType::Rtt)));
}

#[test]
fn pending_request_omits_review_fields_on_the_wire() {
    let json = serde_json::to_value(sample(LeaveStatus::Pending, 4, LeaveType::PaidLeave))
        .expect("json");

    assert_eq!(json["leave_type"], "paid_leave");
    assert_eq!(json["status"], "pending");
    assert_eq!(json["id"], 3);
    assert!(json.get("reviewer_id").is_none());
    assert!(json.get("review_comment").is_none());
}

#[test]
fn draft_with_unknown_leave_type_fails_to_decode() {
    let payload = serde_json::json!({
        "requester_id": 1,
        "requester_name": "Chloe",
        "requester_department": "Finance",
        "start_date": "2024-05-06",
        "end_date": "2024-05-06",
        "duration_days": 1,
        "leave_type": "sabbatical",
        "reason": "rest"
    });
    assert!(serde_json::from_value::<LeaveDraft>(payload).is_err());
}

#[test]
fn statistics_route_days_by_leave_type() {
    let mut stats = LeaveStatistics::empty(UserId(1), 2024);
    *stats.days_mut(LeaveType::Rtt) += 2;
    *stats.days_mut(LeaveType::Sick) += 3;
    assert_eq!(stats.rtt_days, 2);
    assert_eq!(stats.total_approved_days(), 5);
}

#[test]
fn recording_clips_approved_days_to_the_year() {
    let mut straddling = sample(LeaveStatus::Approved, 1, LeaveType::PaidLeave);
    // Monday 2024-12-30 to Friday 2025-01-03.
    straddling.start_date = NaiveDate::from_ymd_opt(2024, 12, 30).expect("date");
    straddling.end_date = NaiveDate::from_ymd_opt(2025, 1, 3).expect("date");
    straddling.duration_days = 5;

    let mut stats = LeaveStatistics::empty(UserId(1), 2025);
    stats.record(&straddling);
    stats.record(&sample(LeaveStatus::Pending, 1, LeaveType::Rtt));

    assert_eq!(stats.paid_leave_days, 3);
    assert_eq!(stats.approved_count, 1);
    assert_eq!(stats.pending_count, 0);
}

#[test]
fn department_totals_sum_their_members() {
    let mut first = LeaveStatistics::empty(UserId(1), 2024);
    first.record(&sample(LeaveStatus::Approved, 1, LeaveType::Sick));
    first.record(&sample(LeaveStatus::Pending, 1, LeaveType::Rtt));
    let mut second = LeaveStatistics::empty(UserId(2), 2024);
    second.record(&sample(LeaveStatus::Approved, 2, LeaveType::Rtt));

    let department = DepartmentStatistics {
        department: "Finance".into(),
        year: 2024,
        members: vec![first, second],
    };
    assert_eq!(department.total_approved_days(), 2);
    assert_eq!(department.pending_count(), 1);
}
