pub mod memory;
pub mod mysql;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::model::balance::LeaveBalance;
use crate::model::leave_type::LeaveType;
use crate::model::request::LeaveRequestDetail;
use crate::model::status::LeaveStatus;
use crate::model::user::{UserProfile, UserRecord};

/// Catalog entry used for idempotent seeding at startup.
#[derive(Debug, Clone)]
pub struct LeaveTypeSeed {
    pub name: &'static str,
    pub description: &'static str,
    pub days_per_year: i64,
}

/// Default catalog. The allotment is copied into each user's balance row at
/// provisioning time.
pub fn default_catalog() -> Vec<LeaveTypeSeed> {
    vec![
        LeaveTypeSeed { name: "Sick Leave", description: "Medical leave for illness", days_per_year: 12 },
        LeaveTypeSeed { name: "Casual Leave", description: "Short-notice personal leave", days_per_year: 12 },
        LeaveTypeSeed { name: "Paid Leave", description: "Planned annual vacation", days_per_year: 20 },
        LeaveTypeSeed { name: "Unpaid Leave", description: "Leave without pay", days_per_year: 30 },
    ]
}

/// Input for creating a request. `days_count` is computed by the store; no
/// date or balance validation happens here (the lifecycle engine owns that).
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub user_id: String,
    pub leave_type_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

/// Field updates that accompany a status transition. Fields left `None` keep
/// their stored value.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub to: LeaveStatus,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl StatusChange {
    pub fn approved(approver: String, at: DateTime<Utc>) -> Self {
        StatusChange {
            to: LeaveStatus::Approved,
            approved_by: Some(approver),
            approved_at: Some(at),
            rejection_reason: None,
        }
    }

    pub fn rejected(approver: String, at: DateTime<Utc>, reason: Option<String>) -> Self {
        StatusChange {
            to: LeaveStatus::Rejected,
            approved_by: Some(approver),
            approved_at: Some(at),
            rejection_reason: reason,
        }
    }

    pub fn cancelled() -> Self {
        StatusChange {
            to: LeaveStatus::Cancelled,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Debit,
    Credit,
}

/// Balance adjustment applied in the same transaction as a status CAS.
#[derive(Debug, Clone)]
pub struct LedgerDelta {
    pub user_id: String,
    pub leave_type_id: String,
    pub year: i32,
    pub days: i64,
    pub op: LedgerOp,
}

impl LedgerDelta {
    pub fn debit(user_id: String, leave_type_id: String, year: i32, days: i64) -> Self {
        LedgerDelta { user_id, leave_type_id, year, days, op: LedgerOp::Debit }
    }

    pub fn credit(user_id: String, leave_type_id: String, year: i32, days: i64) -> Self {
        LedgerDelta { user_id, leave_type_id, year, days, op: LedgerOp::Credit }
    }
}

/// Listing filters. `user_id` is only honored by the unscoped admin listing.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<LeaveStatus>,
    pub year: Option<i32>,
    pub user_id: Option<String>,
}

/// 1-based pagination, capped to keep result sets bounded.
#[derive(Debug, Copy, Clone)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
}

impl Page {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Page {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(50).min(100),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }
}

#[derive(Debug, Clone)]
pub struct SummaryFilter {
    pub year: i32,
    pub user_id: Option<String>,
    pub month: Option<u32>,
}

/// One row of the summary report: a (user, leave type) cell of the
/// cross-product, zero-filled where no requests or balance exist.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SummaryRow {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub leave_type: String,
    pub approved_count: i64,
    pub rejected_count: i64,
    pub pending_count: i64,
    pub total_days_taken: i64,
    pub total_days: i64,
    pub used_days: i64,
    pub remaining_days: i64,
}

/// One row of the per-type statistics report.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct StatsRow {
    pub leave_type: String,
    pub employees_used: i64,
    pub total_days_taken: i64,
    pub pending_requests: i64,
    pub approved_requests: i64,
    pub rejected_requests: i64,
}

/// Persistence contract for the leave catalog, the balance ledger, the
/// request store, the report queries and the user directory.
///
/// The lifecycle engine is constructed with a value of this trait; production
/// uses [`mysql::MySqlLeaveStore`], tests use [`memory::InMemoryLeaveStore`].
///
/// `transition_request` is the concurrency primitive: a compare-and-set on
/// the stored status plus an optional ledger delta, committed as one unit.
/// Sufficiency checks read the current balance immediately before the CAS;
/// skipping the CAS would reintroduce the double-debit race.
#[allow(async_fn_in_trait)]
pub trait LeaveStore {
    // ---- leave type catalog ----
    async fn leave_types(&self) -> Result<Vec<LeaveType>, LeaveError>;
    async fn leave_type_by_id(&self, id: &str) -> Result<Option<LeaveType>, LeaveError>;
    /// Idempotent: entries whose name already exists are skipped. Returns the
    /// number of entries created.
    async fn seed_leave_types(&self, catalog: &[LeaveTypeSeed]) -> Result<u64, LeaveError>;

    // ---- balance ledger ----
    async fn balance(
        &self,
        user_id: &str,
        leave_type_id: &str,
        year: i32,
    ) -> Result<Option<LeaveBalance>, LeaveError>;
    async fn balances_for_user(
        &self,
        user_id: &str,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError>;
    /// Unconditional increment of `used_days`. No validation, not idempotent:
    /// calling twice double-applies. Callers guarantee at-most-once per
    /// approval.
    async fn apply_usage(
        &self,
        user_id: &str,
        leave_type_id: &str,
        year: i32,
        days: i64,
    ) -> Result<(), LeaveError>;
    /// Decrement of `used_days`, floored at zero.
    async fn reverse_usage(
        &self,
        user_id: &str,
        leave_type_id: &str,
        year: i32,
        days: i64,
    ) -> Result<(), LeaveError>;
    /// One balance row per catalog entry, skipping rows that already exist.
    /// Returns the number of rows created.
    async fn provision_balances(&self, user_id: &str, year: i32) -> Result<u64, LeaveError>;

    // ---- request store ----
    async fn insert_request(&self, new: NewLeaveRequest) -> Result<String, LeaveError>;
    async fn request_by_id(&self, id: &str) -> Result<Option<LeaveRequestDetail>, LeaveError>;
    async fn requests_for_user(
        &self,
        user_id: &str,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<Vec<LeaveRequestDetail>, LeaveError>;
    async fn all_requests(
        &self,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<Vec<LeaveRequestDetail>, LeaveError>;
    async fn count_requests(
        &self,
        user_id: Option<&str>,
        filter: &RequestFilter,
    ) -> Result<i64, LeaveError>;
    /// Compare-and-set: applies `change` (and `ledger`, if any) only if the
    /// stored status equals `expected`, atomically. Returns false when the
    /// status no longer matches, without writing anything.
    async fn transition_request(
        &self,
        id: &str,
        expected: LeaveStatus,
        change: StatusChange,
        ledger: Option<LedgerDelta>,
    ) -> Result<bool, LeaveError>;

    // ---- reports ----
    async fn summary_report(&self, filter: &SummaryFilter) -> Result<Vec<SummaryRow>, LeaveError>;
    async fn stats_report(&self, year: i32) -> Result<Vec<StatsRow>, LeaveError>;

    // ---- user directory ----
    async fn upsert_user(&self, profile: &UserProfile) -> Result<UserRecord, LeaveError>;
    async fn user_by_id(&self, id: &str) -> Result<Option<UserRecord>, LeaveError>;
}
