use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::status::LeaveStatus;

/// Inclusive day count between two dates: same-day start/end counts as one
/// full day of leave.
pub fn days_count_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    end.signed_duration_since(start).num_days() + 1
}

/// One time-off application. Rows are never deleted; history is permanent.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: String,
    pub user_id: String,
    pub leave_type_id: String,
    #[schema(example = "2025-03-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-03-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub days_count: i64,
    pub reason: Option<String>,
    #[schema(example = "PENDING", value_type = String)]
    pub status: LeaveStatus,
    pub approved_by: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub created_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Read view of a request enriched with joined display fields. The extra
/// columns are derived, not stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequestDetail {
    pub id: String,
    pub user_id: String,
    pub leave_type_id: String,
    #[schema(example = "Sick Leave")]
    pub leave_type_name: String,
    pub user_name: String,
    pub user_email: String,
    #[schema(example = "2025-03-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-03-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub days_count: i64,
    pub reason: Option<String>,
    #[schema(example = "PENDING", value_type = String)]
    pub status: LeaveStatus,
    pub approved_by: Option<String>,
    pub approved_by_name: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_day_counts_as_one() {
        assert_eq!(days_count_inclusive(date(2025, 1, 1), date(2025, 1, 1)), 1);
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        assert_eq!(days_count_inclusive(date(2025, 1, 1), date(2025, 1, 5)), 5);
        assert_eq!(days_count_inclusive(date(2025, 2, 27), date(2025, 3, 2)), 4);
    }

    #[test]
    fn spans_year_boundaries() {
        assert_eq!(days_count_inclusive(date(2024, 12, 30), date(2025, 1, 2)), 4);
    }
}
