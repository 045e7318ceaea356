use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{domain::LeaveStatus, lifecycle::LifecycleEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl From<LifecycleError> for ApiError {
    fn from(value: LifecycleError) -> Self {
        let code = match &value {
            LifecycleError::Validation(_) => ErrorCode::Validation,
            LifecycleError::ImmutableRequest { .. } | LifecycleError::IllegalTransition { .. } => {
                ErrorCode::Conflict
            }
            LifecycleError::Forbidden { .. } => ErrorCode::Forbidden,
        };
        Self::new(code, value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("end date {end} is before start date {start}")]
pub struct InvalidRangeError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Reason,
    StartDate,
    EndDate,
    LeaveType,
    DurationDays,
    ReviewComment,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Reason => "reason",
            Field::StartDate => "start_date",
            Field::EndDate => "end_date",
            Field::LeaveType => "leave_type",
            Field::DurationDays => "duration_days",
            Field::ReviewComment => "review_comment",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-level rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors raised by the pure request rules. None of them involve I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("invalid request: {}", join_violations(.0))]
    Validation(Vec<ValidationError>),
    #[error("request is {status} and can no longer be changed (frozen: {})", join_fields(.frozen))]
    ImmutableRequest {
        status: LeaveStatus,
        frozen: Vec<Field>,
    },
    #[error("cannot {event} a request that is already {from}")]
    IllegalTransition {
        from: LeaveStatus,
        event: LifecycleEvent,
    },
    #[error("not allowed to {event}: {reason}")]
    Forbidden {
        event: LifecycleEvent,
        reason: String,
    },
}

impl LifecycleError {
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            LifecycleError::Validation(violations) => violations,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(Field::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
