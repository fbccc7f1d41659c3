use actix_web::{HttpResponse, web};

use crate::AppService;
use crate::error::LeaveError;

/// Leave type catalog. Read-only after startup seeding.
#[utoipa::path(
    get,
    path = "/api/leaves/types",
    responses(
        (status = 200, description = "All leave types", body = Object, example = json!({
            "leaveTypes": [
                {"id": "…", "name": "Sick Leave", "description": "Medical leave for illness", "days_per_year": 12}
            ]
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave Types"
)]
pub async fn list_leave_types(
    service: web::Data<AppService>,
) -> Result<HttpResponse, LeaveError> {
    let types = service.leave_types().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "leaveTypes": types })))
}
