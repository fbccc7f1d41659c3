use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::LeaveError;
use crate::model::balance::LeaveBalance;
use crate::model::leave_type::LeaveType;
use crate::model::request::{LeaveRequestDetail, days_count_inclusive};
use crate::model::status::LeaveStatus;
use crate::model::user::{UserProfile, UserRecord};
use crate::store::{
    LeaveStore, LeaveTypeSeed, LedgerDelta, LedgerOp, NewLeaveRequest, Page, RequestFilter,
    StatsRow, StatusChange, SummaryFilter, SummaryRow,
};

const CATALOG_KEY: &str = "catalog";

/// Helper enum for typed SQLx binding of dynamically composed filters.
enum FilterValue {
    Str(String),
    I32(i32),
}

const DETAIL_SELECT: &str = r#"
    SELECT lr.id, lr.user_id, lr.leave_type_id,
           lt.name AS leave_type_name,
           u.display_name AS user_name, u.email AS user_email,
           lr.start_date, lr.end_date, lr.days_count, lr.reason, lr.status,
           lr.approved_by, approver.display_name AS approved_by_name,
           lr.approved_at, lr.rejection_reason, lr.created_at
    FROM leave_requests lr
    JOIN leave_types lt ON lr.leave_type_id = lt.id
    JOIN users u ON lr.user_id = u.id
    LEFT JOIN users approver ON lr.approved_by = approver.id
"#;

/// MySQL-backed store. The leave-type catalog is immutable after seeding, so
/// it is served from a moka cache with a daily TTL.
#[derive(Clone)]
pub struct MySqlLeaveStore {
    pool: MySqlPool,
    catalog: Cache<&'static str, Arc<Vec<LeaveType>>>,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlLeaveStore {
            pool,
            catalog: Cache::builder()
                .max_capacity(8)
                .time_to_live(Duration::from_secs(86400))
                .build(),
        }
    }

    /// Prime the catalog cache; meant to run from a spawned warmup task.
    pub async fn warm_catalog(&self) -> anyhow::Result<usize> {
        let types = self.leave_types().await?;
        log::info!("Leave type catalog warmup complete: {} types", types.len());
        Ok(types.len())
    }

    async fn fetch_catalog(&self) -> Result<Arc<Vec<LeaveType>>, LeaveError> {
        if let Some(cached) = self.catalog.get(CATALOG_KEY).await {
            return Ok(cached);
        }
        let types = sqlx::query_as::<_, LeaveType>(
            "SELECT id, name, description, days_per_year FROM leave_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        let types = Arc::new(types);
        self.catalog.insert(CATALOG_KEY, types.clone()).await;
        Ok(types)
    }
}

async fn apply_usage_exec<'e, E>(
    ex: E,
    user_id: &str,
    leave_type_id: &str,
    year: i32,
    days: i64,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::MySql>,
{
    sqlx::query(
        r#"
        UPDATE leave_balances
        SET used_days = used_days + ?, updated_at = CURRENT_TIMESTAMP
        WHERE user_id = ? AND leave_type_id = ? AND year = ?
        "#,
    )
    .bind(days)
    .bind(user_id)
    .bind(leave_type_id)
    .bind(year)
    .execute(ex)
    .await?;
    Ok(())
}

async fn reverse_usage_exec<'e, E>(
    ex: E,
    user_id: &str,
    leave_type_id: &str,
    year: i32,
    days: i64,
) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::MySql>,
{
    // Floored at zero: the storage layer never lets used_days go negative.
    sqlx::query(
        r#"
        UPDATE leave_balances
        SET used_days = GREATEST(0, used_days - ?), updated_at = CURRENT_TIMESTAMP
        WHERE user_id = ? AND leave_type_id = ? AND year = ?
        "#,
    )
    .bind(days)
    .bind(user_id)
    .bind(leave_type_id)
    .bind(year)
    .execute(ex)
    .await?;
    Ok(())
}

impl LeaveStore for MySqlLeaveStore {
    /* =========================
    Leave type catalog
    ========================= */

    async fn leave_types(&self) -> Result<Vec<LeaveType>, LeaveError> {
        Ok(self.fetch_catalog().await?.as_ref().clone())
    }

    async fn leave_type_by_id(&self, id: &str) -> Result<Option<LeaveType>, LeaveError> {
        let types = self.fetch_catalog().await?;
        Ok(types.iter().find(|t| t.id == id).cloned())
    }

    async fn seed_leave_types(&self, catalog: &[LeaveTypeSeed]) -> Result<u64, LeaveError> {
        let mut created = 0;
        for seed in catalog {
            let result = sqlx::query(
                r#"
                INSERT IGNORE INTO leave_types (id, name, description, days_per_year)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(seed.name)
            .bind(seed.description)
            .bind(seed.days_per_year)
            .execute(&self.pool)
            .await?;
            created += result.rows_affected();
        }
        if created > 0 {
            self.catalog.invalidate(CATALOG_KEY).await;
        }
        Ok(created)
    }

    /* =========================
    Balance ledger
    ========================= */

    async fn balance(
        &self,
        user_id: &str,
        leave_type_id: &str,
        year: i32,
    ) -> Result<Option<LeaveBalance>, LeaveError> {
        let balance = sqlx::query_as::<_, LeaveBalance>(
            r#"
            SELECT lb.id, lb.user_id, lb.leave_type_id, lt.name AS leave_type_name,
                   lb.year, lb.total_days, lb.used_days
            FROM leave_balances lb
            JOIN leave_types lt ON lb.leave_type_id = lt.id
            WHERE lb.user_id = ? AND lb.leave_type_id = ? AND lb.year = ?
            "#,
        )
        .bind(user_id)
        .bind(leave_type_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(balance)
    }

    async fn balances_for_user(
        &self,
        user_id: &str,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError> {
        let balances = sqlx::query_as::<_, LeaveBalance>(
            r#"
            SELECT lb.id, lb.user_id, lb.leave_type_id, lt.name AS leave_type_name,
                   lb.year, lb.total_days, lb.used_days
            FROM leave_balances lb
            JOIN leave_types lt ON lb.leave_type_id = lt.id
            WHERE lb.user_id = ? AND lb.year = ?
            ORDER BY lt.name
            "#,
        )
        .bind(user_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(balances)
    }

    async fn apply_usage(
        &self,
        user_id: &str,
        leave_type_id: &str,
        year: i32,
        days: i64,
    ) -> Result<(), LeaveError> {
        apply_usage_exec(&self.pool, user_id, leave_type_id, year, days).await?;
        Ok(())
    }

    async fn reverse_usage(
        &self,
        user_id: &str,
        leave_type_id: &str,
        year: i32,
        days: i64,
    ) -> Result<(), LeaveError> {
        reverse_usage_exec(&self.pool, user_id, leave_type_id, year, days).await?;
        Ok(())
    }

    async fn provision_balances(&self, user_id: &str, year: i32) -> Result<u64, LeaveError> {
        let types = self.fetch_catalog().await?;
        let mut created = 0;
        for leave_type in types.iter() {
            let result = sqlx::query(
                r#"
                INSERT IGNORE INTO leave_balances (id, user_id, leave_type_id, year, total_days, used_days)
                VALUES (?, ?, ?, ?, ?, 0)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(&leave_type.id)
            .bind(year)
            .bind(leave_type.days_per_year)
            .execute(&self.pool)
            .await?;
            created += result.rows_affected();
        }
        Ok(created)
    }

    /* =========================
    Request store
    ========================= */

    async fn insert_request(&self, new: NewLeaveRequest) -> Result<String, LeaveError> {
        let id = Uuid::new_v4().to_string();
        let days_count = days_count_inclusive(new.start_date, new.end_date);
        sqlx::query(
            r#"
            INSERT INTO leave_requests
                (id, user_id, leave_type_id, start_date, end_date, days_count, reason, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.user_id)
        .bind(&new.leave_type_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(days_count)
        .bind(new.reason.as_deref())
        .bind(LeaveStatus::Pending.to_string())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn request_by_id(&self, id: &str) -> Result<Option<LeaveRequestDetail>, LeaveError> {
        let sql = format!("{} WHERE lr.id = ?", DETAIL_SELECT);
        let request = sqlx::query_as::<_, LeaveRequestDetail>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(request)
    }

    async fn requests_for_user(
        &self,
        user_id: &str,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<Vec<LeaveRequestDetail>, LeaveError> {
        let scoped = RequestFilter {
            user_id: Some(user_id.to_string()),
            status: filter.status,
            year: filter.year,
        };
        self.all_requests(&scoped, page).await
    }

    async fn all_requests(
        &self,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<Vec<LeaveRequestDetail>, LeaveError> {
        let (where_sql, args) = build_where(None, filter);
        let sql = format!(
            "{} {} ORDER BY lr.created_at DESC LIMIT ? OFFSET ?",
            DETAIL_SELECT, where_sql
        );

        let mut query = sqlx::query_as::<_, LeaveRequestDetail>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::Str(v) => query.bind(v),
                FilterValue::I32(v) => query.bind(v),
            };
        }

        let requests = query
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(requests)
    }

    async fn count_requests(
        &self,
        user_id: Option<&str>,
        filter: &RequestFilter,
    ) -> Result<i64, LeaveError> {
        let (where_sql, args) = build_where(user_id, filter);
        let sql = format!("SELECT COUNT(*) FROM leave_requests lr {}", where_sql);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::Str(v) => query.bind(v),
                FilterValue::I32(v) => query.bind(v),
            };
        }

        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn transition_request(
        &self,
        id: &str,
        expected: LeaveStatus,
        change: StatusChange,
        ledger: Option<LedgerDelta>,
    ) -> Result<bool, LeaveError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?,
                approved_by = COALESCE(?, approved_by),
                approved_at = COALESCE(?, approved_at),
                rejection_reason = COALESCE(?, rejection_reason),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(change.to.to_string())
        .bind(change.approved_by.as_deref())
        .bind(change.approved_at)
        .bind(change.rejection_reason.as_deref())
        .bind(id)
        .bind(expected.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        // Only the CAS winner reaches the ledger, and both writes commit as
        // one unit.
        if let Some(delta) = ledger {
            match delta.op {
                LedgerOp::Debit => {
                    apply_usage_exec(
                        &mut *tx,
                        &delta.user_id,
                        &delta.leave_type_id,
                        delta.year,
                        delta.days,
                    )
                    .await?
                }
                LedgerOp::Credit => {
                    reverse_usage_exec(
                        &mut *tx,
                        &delta.user_id,
                        &delta.leave_type_id,
                        delta.year,
                        delta.days,
                    )
                    .await?
                }
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    /* =========================
    Reports
    ========================= */

    async fn summary_report(&self, filter: &SummaryFilter) -> Result<Vec<SummaryRow>, LeaveError> {
        let mut sql = String::from(
            r#"
            SELECT
                u.id AS user_id,
                u.display_name,
                u.email,
                lt.name AS leave_type,
                CAST(COUNT(CASE WHEN lr.status = 'APPROVED' THEN 1 END) AS SIGNED) AS approved_count,
                CAST(COUNT(CASE WHEN lr.status = 'REJECTED' THEN 1 END) AS SIGNED) AS rejected_count,
                CAST(COUNT(CASE WHEN lr.status = 'PENDING' THEN 1 END) AS SIGNED) AS pending_count,
                CAST(COALESCE(SUM(CASE WHEN lr.status = 'APPROVED' THEN lr.days_count ELSE 0 END), 0) AS SIGNED) AS total_days_taken,
                CAST(COALESCE(lb.total_days, 0) AS SIGNED) AS total_days,
                CAST(COALESCE(lb.used_days, 0) AS SIGNED) AS used_days,
                CAST(COALESCE(lb.total_days - lb.used_days, 0) AS SIGNED) AS remaining_days
            FROM users u
            CROSS JOIN leave_types lt
            LEFT JOIN leave_requests lr
                ON u.id = lr.user_id AND lt.id = lr.leave_type_id AND YEAR(lr.start_date) = ?
            LEFT JOIN leave_balances lb
                ON u.id = lb.user_id AND lt.id = lb.leave_type_id AND lb.year = ?
            WHERE 1=1
            "#,
        );
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(user_id) = filter.user_id.as_deref() {
            sql.push_str(" AND u.id = ?");
            args.push(FilterValue::Str(user_id.to_string()));
        }
        if let Some(month) = filter.month {
            sql.push_str(" AND MONTH(lr.start_date) = ?");
            args.push(FilterValue::I32(month as i32));
        }

        sql.push_str(
            r#"
            GROUP BY u.id, u.display_name, u.email, lt.id, lt.name, lb.total_days, lb.used_days
            ORDER BY u.display_name, lt.name
            "#,
        );

        let mut query = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(filter.year)
            .bind(filter.year);
        for arg in args {
            query = match arg {
                FilterValue::Str(v) => query.bind(v),
                FilterValue::I32(v) => query.bind(v),
            };
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn stats_report(&self, year: i32) -> Result<Vec<StatsRow>, LeaveError> {
        let rows = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT
                lt.name AS leave_type,
                CAST(COUNT(DISTINCT lr.user_id) AS SIGNED) AS employees_used,
                CAST(COALESCE(SUM(CASE WHEN lr.status = 'APPROVED' THEN lr.days_count ELSE 0 END), 0) AS SIGNED) AS total_days_taken,
                CAST(COUNT(CASE WHEN lr.status = 'PENDING' THEN 1 END) AS SIGNED) AS pending_requests,
                CAST(COUNT(CASE WHEN lr.status = 'APPROVED' THEN 1 END) AS SIGNED) AS approved_requests,
                CAST(COUNT(CASE WHEN lr.status = 'REJECTED' THEN 1 END) AS SIGNED) AS rejected_requests
            FROM leave_types lt
            LEFT JOIN leave_requests lr
                ON lt.id = lr.leave_type_id AND YEAR(lr.start_date) = ?
            GROUP BY lt.id, lt.name
            ORDER BY lt.name
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /* =========================
    User directory
    ========================= */

    async fn upsert_user(&self, profile: &UserProfile) -> Result<UserRecord, LeaveError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, role, last_login)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON DUPLICATE KEY UPDATE
                email = VALUES(email),
                display_name = VALUES(display_name),
                role = VALUES(role),
                last_login = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(profile.role.to_string())
        .execute(&self.pool)
        .await?;

        self.user_by_id(&profile.id)
            .await?
            .ok_or(LeaveError::not_found("user"))
    }

    async fn user_by_id(&self, id: &str) -> Result<Option<UserRecord>, LeaveError> {
        let user = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, display_name, role, last_login FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

fn build_where(user_id: Option<&str>, filter: &RequestFilter) -> (String, Vec<FilterValue>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = user_id.or(filter.user_id.as_deref()) {
        where_sql.push_str(" AND lr.user_id = ?");
        args.push(FilterValue::Str(user_id.to_string()));
    }
    if let Some(status) = filter.status {
        where_sql.push_str(" AND lr.status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }
    if let Some(year) = filter.year {
        where_sql.push_str(" AND YEAR(lr.start_date) = ?");
        args.push(FilterValue::I32(year));
    }

    (where_sql, args)
}
