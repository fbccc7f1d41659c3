use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::AppService;
use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::service::current_year;

#[derive(Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Year to report on; defaults to the current year.
    pub year: Option<i32>,
}

/// Current user's leave balances.
#[utoipa::path(
    get,
    path = "/api/leaves/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Balances for the current user"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Balances"
)]
pub async fn my_balances(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, LeaveError> {
    let year = query.year.unwrap_or_else(current_year);
    let actor = auth.actor();
    let balances = service.balances(&actor, &actor.user_id, year).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "balances": balances, "year": year })))
}

/// Any user's leave balances (admin only).
#[utoipa::path(
    get,
    path = "/api/leaves/balance/{user_id}",
    params(
        ("user_id" = String, Path, description = "User whose balances to fetch"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Balances for the given user"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Balances"
)]
pub async fn user_balances(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<String>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, LeaveError> {
    let user_id = path.into_inner();
    let year = query.year.unwrap_or_else(current_year);
    let balances = service.balances(&auth.actor(), &user_id, year).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "balances": balances, "year": year })))
}
