use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Catalog entry for a category of absence. Seeded once at startup and
/// read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveType {
    #[schema(example = "c3a2f6a0-1111-4f4e-9d7a-2a5be1c3d001")]
    pub id: String,
    #[schema(example = "Sick Leave")]
    pub name: String,
    pub description: Option<String>,
    /// Default yearly allotment copied into new balances at provisioning.
    #[schema(example = 12)]
    pub days_per_year: i64,
}
