use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::AppService;
use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::model::request::LeaveRequestDetail;
use crate::model::status::LeaveStatus;
use crate::service::NewRequestInput;
use crate::store::{Page, RequestFilter};

#[derive(Deserialize, IntoParams)]
pub struct LeaveFilter {
    #[param(example = "PENDING")]
    /// Filter by request status
    pub status: Option<LeaveStatus>,
    #[param(example = 2025)]
    /// Filter by the year of the start date
    pub year: Option<i32>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct AdminLeaveFilter {
    /// Filter by request owner
    pub user_id: Option<String>,
    #[param(example = "PENDING")]
    /// Filter by request status
    pub status: Option<LeaveStatus>,
    /// Filter by the year of the start date
    pub year: Option<i32>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequestDetail>,
    pub page: u64,
    pub per_page: u64,
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectBody {
    #[schema(example = "Not enough coverage that week")]
    pub reason: Option<String>,
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leaves/requests",
    request_body(
        content = NewRequestInput,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request created", body = Object, example = json!({
            "request": {"id": "…", "status": "PENDING", "days_count": 3}
        })),
        (status = 400, description = "Invalid dates"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown leave type")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_request(
    auth: AuthUser,
    service: web::Data<AppService>,
    payload: web::Json<NewRequestInput>,
) -> Result<HttpResponse, LeaveError> {
    let request = service
        .create_request(&auth.actor(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "request": request })))
}

/* =========================
Own requests
========================= */
#[utoipa::path(
    get,
    path = "/api/leaves/requests",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated list of own requests", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_requests(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, LeaveError> {
    let filter = RequestFilter {
        status: query.status,
        year: query.year,
        user_id: None,
    };
    let page = Page::new(query.page, query.per_page);
    let (data, total) = service.my_requests(&auth.actor(), &filter, page).await?;
    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/leaves/requests/{id}",
    params(("id" = String, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequestDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_request(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LeaveError> {
    let request = service.get_request(&auth.actor(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "request": request })))
}

#[utoipa::path(
    put,
    path = "/api/leaves/requests/{id}/cancel",
    params(("id" = String, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request cancelled"),
        (status = 400, description = "Already cancelled"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the request owner"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_request(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LeaveError> {
    let request = service
        .cancel_request(&auth.actor(), &path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "request": request,
        "message": "Leave request cancelled successfully"
    })))
}

/* =========================
Admin
========================= */
#[utoipa::path(
    get,
    path = "/api/leaves/admin/requests",
    params(AdminLeaveFilter),
    responses(
        (status = 200, description = "Paginated list across all users", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn all_requests(
    auth: AuthUser,
    service: web::Data<AppService>,
    query: web::Query<AdminLeaveFilter>,
) -> Result<HttpResponse, LeaveError> {
    let filter = RequestFilter {
        status: query.status,
        year: query.year,
        user_id: query.user_id.clone(),
    };
    let page = Page::new(query.page, query.per_page);
    let (data, total) = service.all_requests(&auth.actor(), &filter, page).await?;
    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    put,
    path = "/api/leaves/admin/requests/{id}/approve",
    params(("id" = String, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request approved"),
        (status = 400, description = "Not pending, or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_request(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<String>,
) -> Result<HttpResponse, LeaveError> {
    let request = service
        .approve_request(&auth.actor(), &path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "request": request,
        "message": "Leave request approved successfully"
    })))
}

#[utoipa::path(
    put,
    path = "/api/leaves/admin/requests/{id}/reject",
    params(("id" = String, Path, description = "Leave request id")),
    request_body(content = RejectBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave request rejected"),
        (status = 400, description = "Not pending"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_request(
    auth: AuthUser,
    service: web::Data<AppService>,
    path: web::Path<String>,
    payload: web::Json<RejectBody>,
) -> Result<HttpResponse, LeaveError> {
    let request = service
        .reject_request(&auth.actor(), &path.into_inner(), payload.into_inner().reason)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "request": request,
        "message": "Leave request rejected"
    })))
}
