use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode as AxumStatus},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, TimeZone};
use shared::domain::{LeaveStatus, LeaveType};
use tokio::net::TcpListener;

use super::*;
use crate::credentials::Anonymous;

#[derive(Debug, Default, Clone)]
struct Seen {
    authorization: Option<String>,
    query: Option<String>,
    body: Vec<u8>,
}

type Recorder = Arc<Mutex<Vec<Seen>>>;

fn record(recorder: &Recorder, headers: &HeaderMap, query: Option<String>, body: &[u8]) {
    recorder.lock().expect("recorder").push(Seen {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        query,
        body: body.to_vec(),
    });
}

fn sample(id: i64) -> LeaveRequest {
    let day = NaiveDate::from_ymd_opt(2024, 4, 8).expect("date");
    let at = chrono::Utc
        .with_ymd_and_hms(2024, 4, 1, 9, 0, 0)
        .single()
        .expect("time");
    LeaveRequest {
        id: RequestId(id),
        requester_id: UserId(1),
        requester_name: "Dana".into(),
        requester_department: "Support".into(),
        start_date: day,
        end_date: day,
        duration_days: 1,
        leave_type: LeaveType::Sick,
        reason: "flu".into(),
        status: LeaveStatus::Pending,
        created_at: at,
        modified_at: at,
        reviewer_id: None,
        reviewer_name: None,
        review_comment: None,
        attachment_ref: None,
    }
}

async fn list_handler(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Json<ListResponse> {
    record(&recorder, &headers, query, &[]);
    Json(ListResponse {
        data: vec![sample(11), sample(12)],
        total_count: 25,
    })
}

async fn attach_handler(
    State(recorder): State<Recorder>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Json<LeaveRequest> {
    record(&recorder, &headers, query, &body);
    let mut request = sample(id);
    request.attachment_ref = Some("attachments/7/note.pdf".into());
    Json(request)
}

async fn department_handler(
    State(recorder): State<Recorder>,
    Path(department): Path<String>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Json<DepartmentStatistics> {
    record(&recorder, &headers, query, &[]);
    Json(DepartmentStatistics {
        department,
        year: 2024,
        members: vec![LeaveStatistics::empty(UserId(1), 2024)],
    })
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}/api")
}

fn recording_router(recorder: Recorder) -> Router {
    Router::new()
        .route("/api/leave-requests", get(list_handler))
        .route("/api/leave-requests/:id/attachment", post(attach_handler))
        .route(
            "/api/leave-requests/:id",
            get(|| async {
                (
                    AxumStatus::CONFLICT,
                    Json(ApiError::new(ErrorCode::Conflict, "request already reviewed")),
                )
            })
            .delete(|| async { AxumStatus::NO_CONTENT }),
        )
        .route(
            "/api/users/:id/leave-statistics",
            get(|| async { (AxumStatus::NOT_FOUND, "no such user") }),
        )
        .route(
            "/api/departments/:department/leave-statistics",
            get(department_handler),
        )
        .route(
            "/api/leave-requests/:id/approve",
            post(|| async { AxumStatus::FORBIDDEN }),
        )
        .with_state(recorder)
}

#[test]
fn base_url_keeps_its_path_prefix() {
    let remote = HttpRemoteAuthority::new("http://leave.internal/api", Arc::new(Anonymous))
        .expect("remote");
    assert_eq!(remote.base_url().as_str(), "http://leave.internal/api/");

    let remote = HttpRemoteAuthority::new(" http://leave.internal/api/ ", Arc::new(Anonymous))
        .expect("remote");
    assert_eq!(remote.base_url().as_str(), "http://leave.internal/api/");
}

#[test]
fn malformed_base_url_is_rejected() {
    assert!(HttpRemoteAuthority::new("not a url", Arc::new(Anonymous)).is_err());
}

#[test]
fn statuses_map_to_error_codes() {
    assert_eq!(error_code_for_status(StatusCode::UNAUTHORIZED), ErrorCode::Unauthorized);
    assert_eq!(error_code_for_status(StatusCode::FORBIDDEN), ErrorCode::Forbidden);
    assert_eq!(error_code_for_status(StatusCode::NOT_FOUND), ErrorCode::NotFound);
    assert_eq!(error_code_for_status(StatusCode::CONFLICT), ErrorCode::Conflict);
    assert_eq!(
        error_code_for_status(StatusCode::UNPROCESSABLE_ENTITY),
        ErrorCode::Validation
    );
    assert_eq!(error_code_for_status(StatusCode::BAD_GATEWAY), ErrorCode::Internal);
}

#[tokio::test]
async fn list_sends_paging_and_bearer_token() {
    let recorder = Recorder::default();
    let base = spawn(recording_router(recorder.clone())).await;
    let remote = HttpRemoteAuthority::new(&base, Arc::new(StaticToken::new("secret")))
        .expect("remote");

    let query = ListQuery {
        status: Some(LeaveStatus::Pending),
        ..ListQuery::page(10, 10)
    };
    let page = remote.list(&query).await.expect("list");

    assert_eq!(page.total_count, 25);
    assert_eq!(page.data.len(), 2);
    let seen = recorder.lock().expect("recorder")[0].clone();
    assert_eq!(seen.authorization.as_deref(), Some("Bearer secret"));
    let query = seen.query.expect("query string");
    assert!(query.contains("status=pending"));
    assert!(query.contains("skip=10"));
    assert!(query.contains("take=10"));
}

#[tokio::test]
async fn anonymous_calls_carry_no_authorization() {
    let recorder = Recorder::default();
    let base = spawn(recording_router(recorder.clone())).await;
    let remote = HttpRemoteAuthority::new(&base, Arc::new(Anonymous)).expect("remote");

    remote.list(&ListQuery::default()).await.expect("list");

    assert!(recorder.lock().expect("recorder")[0].authorization.is_none());
}

#[tokio::test]
async fn attachment_is_sent_as_raw_body() {
    let recorder = Recorder::default();
    let base = spawn(recording_router(recorder.clone())).await;
    let remote = HttpRemoteAuthority::new(&base, Arc::new(Anonymous)).expect("remote");

    let updated = remote
        .upload_attachment(RequestId(7), "note.pdf", b"%PDF-1.7".to_vec())
        .await
        .expect("upload");

    assert_eq!(updated.attachment_ref.as_deref(), Some("attachments/7/note.pdf"));
    let seen = recorder.lock().expect("recorder")[0].clone();
    assert_eq!(seen.query.as_deref(), Some("filename=note.pdf"));
    assert_eq!(seen.body, b"%PDF-1.7");
}

#[tokio::test]
async fn structured_error_body_is_decoded() {
    let base = spawn(recording_router(Recorder::default())).await;
    let remote = HttpRemoteAuthority::new(&base, Arc::new(Anonymous)).expect("remote");

    let err = remote.get_by_id(RequestId(3)).await.expect_err("conflict");

    let RemoteError::Rejected(api) = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert_eq!(api, ApiError::new(ErrorCode::Conflict, "request already reviewed"));
}

#[tokio::test]
async fn plain_error_body_falls_back_to_status() {
    let base = spawn(recording_router(Recorder::default())).await;
    let remote = HttpRemoteAuthority::new(&base, Arc::new(Anonymous)).expect("remote");

    let err = remote
        .user_statistics(UserId(404), 2024)
        .await
        .expect_err("not found");
    let RemoteError::Rejected(api) = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert_eq!(api.code, ErrorCode::NotFound);
    assert_eq!(api.message, "no such user");

    let decision = ReviewDecision {
        reviewer_id: UserId(2),
        reviewer_name: "Morgan".into(),
        comment: None,
    };
    let err = remote
        .approve(RequestId(1), &decision)
        .await
        .expect_err("forbidden");
    let RemoteError::Rejected(api) = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert_eq!(api.code, ErrorCode::Forbidden);
    assert_eq!(api.message, "Forbidden");
}

#[tokio::test]
async fn delete_accepts_an_empty_response() {
    let base = spawn(recording_router(Recorder::default())).await;
    let remote = HttpRemoteAuthority::new(&base, Arc::new(Anonymous)).expect("remote");

    remote.delete(RequestId(5)).await.expect("delete");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let remote = HttpRemoteAuthority::new(&format!("http://{addr}/api"), Arc::new(Anonymous))
        .expect("remote");
    let err = remote
        .list(&ListQuery::default())
        .await
        .expect_err("nothing listening");

    assert!(matches!(err, RemoteError::Transport(_)));
}

#[tokio::test]
async fn department_names_are_encoded_as_one_path_segment() {
    let recorder = Recorder::default();
    let base = spawn(recording_router(recorder.clone())).await;
    let remote = HttpRemoteAuthority::new(&base, Arc::new(Anonymous)).expect("remote");

    let stats = remote
        .department_statistics("Research & Development/EU", 2024)
        .await
        .expect("department statistics");

    assert_eq!(stats.department, "Research & Development/EU");
    assert_eq!(stats.members.len(), 1);
    let seen = recorder.lock().expect("recorder");
    assert_eq!(seen[0].query.as_deref(), Some("year=2024"));
}
