use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// Directory row for a user known to the system. Written only on first-login
/// sync; read for denormalized report fields.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[schema(example = "USER")]
    pub role: String,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub last_login: Option<DateTime<Utc>>,
}

/// Identity profile as delivered by the provider on login; input to
/// `sync_user`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    #[schema(example = "USER", value_type = String)]
    pub role: Role,
}

/// The authenticated caller as the engine sees it: an opaque id plus the
/// role claim. The engine trusts both as given.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
