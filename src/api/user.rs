use actix_web::{HttpResponse, web};

use crate::AppService;
use crate::auth::auth::AuthUser;
use crate::error::LeaveError;

/// First-login sync: upsert the directory row from the verified claims and
/// provision this year's balances. Safe to call repeatedly.
#[utoipa::path(
    post,
    path = "/api/users/sync",
    responses(
        (status = 200, description = "User synced and provisioned", body = Object, example = json!({
            "user": {"id": "…", "email": "a@example.com", "display_name": "A", "role": "USER"}
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn sync_user(
    auth: AuthUser,
    service: web::Data<AppService>,
) -> Result<HttpResponse, LeaveError> {
    let user = service.sync_user(&auth.profile()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": user })))
}
