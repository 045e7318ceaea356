use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{LeaveRequest, RequestId, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        DepartmentStatistics, LeaveDraft, LeavePatch, LeaveStatistics, ListQuery, ListResponse,
        ReviewDecision, StatisticsQuery,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::ClientSettings,
    credentials::{Anonymous, CredentialProvider, StaticToken},
    error::RemoteError,
    remote::{RemoteAuthority, RemoteResult},
};

/// [`RemoteAuthority`] over the JSON/HTTP API served by the leave server.
pub struct HttpRemoteAuthority {
    http: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpRemoteAuthority {
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        Self::with_client(Client::new(), base_url, credentials)
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        let credentials: Arc<dyn CredentialProvider> = match &settings.api_token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(Anonymous),
        };
        Self::with_client(http, &settings.server_url, credentials)
    }

    fn with_client(
        http: Client,
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid server url '{base_url}'"))?;
        // Url::join replaces the last segment unless the path ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RemoteResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RemoteError::Transport(format!("invalid request path '{path}': {e}")))?;
        Ok(self.request_url(method, url))
    }

    /// Like [`Self::request`] but percent-encodes each segment, for free-form names.
    fn request_segments(&self, method: Method, segments: &[&str]) -> RemoteResult<RequestBuilder> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RemoteError::Transport(format!("server url '{}' cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(self.request_url(method, url))
    }

    fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "remote call");
        let builder = self.http.request(method, url);
        match self.credentials.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> RemoteResult<Response> {
        let response = builder.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::decode_failure(response).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> RemoteResult<T> {
        let response = Self::send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Transport(format!("invalid response body: {e}")))
    }

    async fn decode_failure(response: Response) -> RemoteError {
        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();

        if let Ok(api) = serde_json::from_slice::<ApiError>(&body) {
            warn!(%status, code = ?api.code, message = %api.message, "remote rejected call");
            return RemoteError::Rejected(api);
        }

        let text = String::from_utf8_lossy(&body).trim().to_string();
        let message = if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            text
        };
        warn!(%status, %message, "remote call failed");
        RemoteError::Rejected(ApiError::new(error_code_for_status(status), message))
    }
}

pub(crate) fn error_code_for_status(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
        StatusCode::FORBIDDEN => ErrorCode::Forbidden,
        StatusCode::NOT_FOUND => ErrorCode::NotFound,
        StatusCode::CONFLICT => ErrorCode::Conflict,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorCode::Validation,
        _ => ErrorCode::Internal,
    }
}

#[async_trait]
impl RemoteAuthority for HttpRemoteAuthority {
    async fn list(&self, query: &ListQuery) -> RemoteResult<ListResponse> {
        let builder = self.request(Method::GET, "leave-requests")?.query(query);
        Self::send_json(builder).await
    }

    async fn get_by_id(&self, id: RequestId) -> RemoteResult<LeaveRequest> {
        let builder = self.request(Method::GET, &format!("leave-requests/{id}"))?;
        Self::send_json(builder).await
    }

    async fn create(&self, draft: &LeaveDraft) -> RemoteResult<LeaveRequest> {
        let builder = self.request(Method::POST, "leave-requests")?.json(draft);
        Self::send_json(builder).await
    }

    async fn update(&self, id: RequestId, patch: &LeavePatch) -> RemoteResult<LeaveRequest> {
        let builder = self
            .request(Method::PUT, &format!("leave-requests/{id}"))?
            .json(patch);
        Self::send_json(builder).await
    }

    async fn delete(&self, id: RequestId) -> RemoteResult<()> {
        let builder = self.request(Method::DELETE, &format!("leave-requests/{id}"))?;
        Self::send(builder).await?;
        Ok(())
    }

    async fn approve(
        &self,
        id: RequestId,
        decision: &ReviewDecision,
    ) -> RemoteResult<LeaveRequest> {
        let builder = self
            .request(Method::POST, &format!("leave-requests/{id}/approve"))?
            .json(decision);
        Self::send_json(builder).await
    }

    async fn reject(&self, id: RequestId, decision: &ReviewDecision) -> RemoteResult<LeaveRequest> {
        let builder = self
            .request(Method::POST, &format!("leave-requests/{id}/reject"))?
            .json(decision);
        Self::send_json(builder).await
    }

    async fn upload_attachment(
        &self,
        id: RequestId,
        filename: &str,
        content: Vec<u8>,
    ) -> RemoteResult<LeaveRequest> {
        let builder = self
            .request(Method::POST, &format!("leave-requests/{id}/attachment"))?
            .query(&[("filename", filename)])
            .body(content);
        Self::send_json(builder).await
    }

    async fn user_statistics(&self, user_id: UserId, year: i32) -> RemoteResult<LeaveStatistics> {
        let builder = self
            .request(Method::GET, &format!("users/{user_id}/leave-statistics"))?
            .query(&StatisticsQuery { year });
        Self::send_json(builder).await
    }

    async fn department_statistics(
        &self,
        department: &str,
        year: i32,
    ) -> RemoteResult<DepartmentStatistics> {
        let builder = self
            .request_segments(Method::GET, &["departments", department, "leave-statistics"])?
            .query(&StatisticsQuery { year });
        Self::send_json(builder).await
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
