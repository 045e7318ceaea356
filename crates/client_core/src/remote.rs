use async_trait::async_trait;
use shared::{
    domain::{LeaveRequest, RequestId, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        DepartmentStatistics, LeaveDraft, LeavePatch, LeaveStatistics, ListQuery, ListResponse,
        ReviewDecision,
    },
};

use crate::error::RemoteError;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// The system of record for leave requests. Every call is made at most once per
/// user intent; implementations must not retry on their own.
#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    async fn list(&self, query: &ListQuery) -> RemoteResult<ListResponse>;
    async fn get_by_id(&self, id: RequestId) -> RemoteResult<LeaveRequest>;
    async fn create(&self, draft: &LeaveDraft) -> RemoteResult<LeaveRequest>;
    async fn update(&self, id: RequestId, patch: &LeavePatch) -> RemoteResult<LeaveRequest>;
    async fn delete(&self, id: RequestId) -> RemoteResult<()>;
    async fn approve(&self, id: RequestId, decision: &ReviewDecision)
        -> RemoteResult<LeaveRequest>;
    async fn reject(&self, id: RequestId, decision: &ReviewDecision) -> RemoteResult<LeaveRequest>;
    async fn upload_attachment(
        &self,
        id: RequestId,
        filename: &str,
        content: Vec<u8>,
    ) -> RemoteResult<LeaveRequest>;
    async fn user_statistics(&self, user_id: UserId, year: i32) -> RemoteResult<LeaveStatistics>;
    async fn department_statistics(
        &self,
        department: &str,
        year: i32,
    ) -> RemoteResult<DepartmentStatistics>;
}

/// Stand-in used until a real authority is wired; every call fails.
pub struct MissingRemoteAuthority;

fn unavailable<T>() -> RemoteResult<T> {
    Err(RemoteError::Rejected(ApiError::new(
        ErrorCode::Internal,
        "remote authority is unavailable",
    )))
}

#[async_trait]
impl RemoteAuthority for MissingRemoteAuthority {
    async fn list(&self, _query: &ListQuery) -> RemoteResult<ListResponse> {
        unavailable()
    }

    async fn get_by_id(&self, _id: RequestId) -> RemoteResult<LeaveRequest> {
        unavailable()
    }

    async fn create(&self, _draft: &LeaveDraft) -> RemoteResult<LeaveRequest> {
        unavailable()
    }

    async fn update(&self, _id: RequestId, _patch: &LeavePatch) -> RemoteResult<LeaveRequest> {
        unavailable()
    }

    async fn delete(&self, _id: RequestId) -> RemoteResult<()> {
        unavailable()
    }

    async fn approve(
        &self,
        _id: RequestId,
        _decision: &ReviewDecision,
    ) -> RemoteResult<LeaveRequest> {
        unavailable()
    }

    async fn reject(
        &self,
        _id: RequestId,
        _decision: &ReviewDecision,
    ) -> RemoteResult<LeaveRequest> {
        unavailable()
    }

    async fn upload_attachment(
        &self,
        _id: RequestId,
        _filename: &str,
        _content: Vec<u8>,
    ) -> RemoteResult<LeaveRequest> {
        unavailable()
    }

    async fn user_statistics(
        &self,
        _user_id: UserId,
        _year: i32,
    ) -> RemoteResult<LeaveStatistics> {
        unavailable()
    }

    async fn department_statistics(
        &self,
        _department: &str,
        _year: i32,
    ) -> RemoteResult<DepartmentStatistics> {
        unavailable()
    }
}
