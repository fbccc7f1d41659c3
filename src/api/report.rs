use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::AppService;
use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::service::current_year;
use crate::store::SummaryFilter;

#[derive(Deserialize, IntoParams)]
pub struct ReportQuery {
    /// Year to report on; defaults to the current year.
    pub year: Option<i32>,
    /// Restrict to one user.
    pub user_id: Option<String>,
    #[param(minimum = 1, maximum = 12)]
    /// Restrict to requests starting in one calendar month.
    pub month: Option<u32>,
}

#[derive(Deserialize, IntoParams)]
pub struct StatsQuery {
    /// Year to report on; defaults to the current year.
    pub year: Option<i32>,
}

/// Per-user, per-type summary report (admin only).
#[utoipa::path(
    get,
    path = "/api/leaves/reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Summary report rows"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn summary(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, LeaveError> {
    let filter = SummaryFilter {
        year: query.year.unwrap_or_else(current_year),
        user_id: query.user_id.clone(),
        month: query.month,
    };
    let report = service.summary_report(&auth.actor(), &filter).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "report": report })))
}

/// Per-type aggregated statistics (admin only).
#[utoipa::path(
    get,
    path = "/api/leaves/reports/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Statistics rows"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn stats(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<StatsQuery>,
) -> Result<HttpResponse, LeaveError> {
    let year = query.year.unwrap_or_else(current_year);
    let stats = service.stats_report(&auth.actor(), year).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "stats": stats, "year": year })))
}
