use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use shared::{
    domain::{LeaveRequest, RequestId, UserId},
    error::{ApiError, ErrorCode},
    lifecycle::LifecycleEvent,
    protocol::{
        DepartmentStatistics, LeaveDraft, LeavePatch, LeaveStatistics, ListQuery, ListResponse,
        ReviewDecision, StatisticsQuery,
    },
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};

mod api;
mod config;
mod storage;

use api::{
    attach_document, clean_filename, create_request, delete_request, department_statistics,
    get_request, list_requests, load_document, review_request, update_request, user_statistics,
    ApiContext,
};
use config::{load_settings, DEFAULT_CONFIG_FILE};

struct AppState {
    api: ApiContext,
    api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentQuery {
    filename: Option<String>,
}

type HttpResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings(DEFAULT_CONFIG_FILE)?;
    if settings.api_token.is_none() {
        warn!("no api token configured; every caller is accepted");
    }

    let state = AppState {
        api: ApiContext::default(),
        api_token: settings.api_token,
    };
    let app = build_router(Arc::new(state), settings.max_attachment_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "leave authority listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route(
            "/leave-requests",
            get(http_list_requests).post(http_create_request),
        )
        .route(
            "/leave-requests/:id",
            get(http_get_request)
                .put(http_update_request)
                .delete(http_delete_request),
        )
        .route("/leave-requests/:id/approve", post(http_approve_request))
        .route("/leave-requests/:id/reject", post(http_reject_request))
        .route(
            "/leave-requests/:id/attachment",
            post(http_upload_attachment).get(http_download_attachment),
        )
        .route("/users/:id/leave-statistics", get(http_user_statistics))
        .route(
            "/departments/:department/leave-statistics",
            get(http_department_statistics),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    warn!(code = ?err.code, message = %err.message, "request refused");
    (status_for(err.code), Json(err))
}

async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> HttpResult<Response> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if presented != Some(expected) {
        return Err(reject(ApiError::new(
            ErrorCode::Unauthorized,
            "missing or invalid bearer token",
        )));
    }
    Ok(next.run(request).await)
}

async fn http_list_requests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> HttpResult<Json<ListResponse>> {
    let page = list_requests(&state.api, &query).map_err(reject)?;
    Ok(Json(page))
}

async fn http_get_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> HttpResult<Json<LeaveRequest>> {
    let request = get_request(&state.api, RequestId(id)).map_err(reject)?;
    Ok(Json(request))
}

async fn http_create_request(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<LeaveDraft>,
) -> HttpResult<(StatusCode, Json<LeaveRequest>)> {
    let created = create_request(&state.api, draft, Utc::now()).map_err(reject)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn http_update_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<LeavePatch>,
) -> HttpResult<Json<LeaveRequest>> {
    let updated = update_request(&state.api, RequestId(id), &patch, Utc::now()).map_err(reject)?;
    Ok(Json(updated))
}

async fn http_delete_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> HttpResult<StatusCode> {
    delete_request(&state.api, RequestId(id)).map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_approve_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(decision): Json<ReviewDecision>,
) -> HttpResult<Json<LeaveRequest>> {
    let reviewed = review_request(
        &state.api,
        RequestId(id),
        LifecycleEvent::Approve,
        &decision,
        Utc::now(),
    )
    .map_err(reject)?;
    Ok(Json(reviewed))
}

async fn http_reject_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(decision): Json<ReviewDecision>,
) -> HttpResult<Json<LeaveRequest>> {
    let reviewed = review_request(
        &state.api,
        RequestId(id),
        LifecycleEvent::Reject,
        &decision,
        Utc::now(),
    )
    .map_err(reject)?;
    Ok(Json(reviewed))
}

async fn http_upload_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(q): Query<AttachmentQuery>,
    body: Bytes,
) -> HttpResult<Json<LeaveRequest>> {
    let filename = clean_filename(q.filename.as_deref()).map_err(reject)?;
    let updated = attach_document(
        &state.api,
        RequestId(id),
        &filename,
        body.to_vec(),
        Utc::now(),
    )
    .map_err(reject)?;
    Ok(Json(updated))
}

async fn http_download_attachment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> HttpResult<impl IntoResponse> {
    let document = load_document(&state.api, RequestId(id)).map_err(reject)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", document.filename))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok((StatusCode::OK, headers, document.content))
}

async fn http_user_statistics(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(q): Query<StatisticsQuery>,
) -> HttpResult<Json<LeaveStatistics>> {
    let stats = user_statistics(&state.api, UserId(user_id), q.year).map_err(reject)?;
    Ok(Json(stats))
}

async fn http_department_statistics(
    State(state): State<Arc<AppState>>,
    Path(department): Path<String>,
    Query(q): Query<StatisticsQuery>,
) -> HttpResult<Json<DepartmentStatistics>> {
    let stats = department_statistics(&state.api, &department, q.year).map_err(reject)?;
    Ok(Json(stats))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
