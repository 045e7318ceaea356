use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    calendar::working_days_in_year,
    domain::{LeaveRequest, LeaveStatus, LeaveType, UserId},
};

/// Create payload. An unsaved request has no id; the authority assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveDraft {
    pub requester_id: UserId,
    pub requester_name: String,
    pub requester_department: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: u32,
    #[serde(default)]
    pub leave_type: Option<LeaveType>,
    pub reason: String,
}

/// Update payload. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeavePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_type: Option<LeaveType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LeavePatch {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.duration_days.is_none()
            && self.leave_type.is_none()
            && self.reason.is_none()
    }

    pub fn touches_dates(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Body of an approve or reject call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub reviewer_id: UserId,
    pub reviewer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    StartDate,
    CreatedAt,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Filter, sort and page parameters of a list call. Kept flat so it maps
/// one-to-one onto a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeaveStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_type: Option<LeaveType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<u32>,
}

impl ListQuery {
    pub fn page(skip: u32, take: u32) -> Self {
        Self {
            skip: Some(skip),
            take: Some(take),
            ..Self::default()
        }
    }

    pub fn matches(&self, request: &LeaveRequest) -> bool {
        self.status.map_or(true, |status| request.status == status)
            && self
                .requester_id
                .map_or(true, |id| request.requester_id == id)
            && self
                .leave_type
                .map_or(true, |leave_type| request.leave_type == leave_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub data: Vec<LeaveRequest>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsQuery {
    pub year: i32,
}

/// Yearly totals for one requester. Day counts only include approved requests;
/// a request straddling the year boundary contributes the working days inside the year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveStatistics {
    pub user_id: UserId,
    pub year: i32,
    pub paid_leave_days: u32,
    pub rtt_days: u32,
    pub sick_days: u32,
    pub unpaid_days: u32,
    pub other_days: u32,
    pub pending_count: u32,
    pub approved_count: u32,
    pub rejected_count: u32,
}

impl LeaveStatistics {
    pub fn empty(user_id: UserId, year: i32) -> Self {
        Self {
            user_id,
            year,
            ..Self::default()
        }
    }

    pub fn days_mut(&mut self, leave_type: LeaveType) -> &mut u32 {
        match leave_type {
            LeaveType::PaidLeave => &mut self.paid_leave_days,
            LeaveType::Rtt => &mut self.rtt_days,
            LeaveType::Sick => &mut self.sick_days,
            LeaveType::Unpaid => &mut self.unpaid_days,
            LeaveType::Other => &mut self.other_days,
        }
    }

    /// Adds one request of this requester. Requests outside the year are ignored.
    pub fn record(&mut self, request: &LeaveRequest) {
        if !request.touches_year(self.year) {
            return;
        }
        match request.status {
            LeaveStatus::Pending => self.pending_count += 1,
            LeaveStatus::Rejected => self.rejected_count += 1,
            LeaveStatus::Approved => {
                self.approved_count += 1;
                *self.days_mut(request.leave_type) +=
                    working_days_in_year(request.start_date, request.end_date, self.year);
            }
        }
    }

    pub fn total_approved_days(&self) -> u32 {
        self.paid_leave_days + self.rtt_days + self.sick_days + self.unpaid_days + self.other_days
    }
}

/// Yearly totals of one department, one entry per requester with a request
/// touching the year, ordered by user id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentStatistics {
    pub department: String,
    pub year: i32,
    pub members: Vec<LeaveStatistics>,
}

impl DepartmentStatistics {
    pub fn total_approved_days(&self) -> u32 {
        self.members
            .iter()
            .map(LeaveStatistics::total_approved_days)
            .sum()
    }

    pub fn pending_count(&self) -> u32 {
        self.members.iter().map(|member| member.pending_count).sum()
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
