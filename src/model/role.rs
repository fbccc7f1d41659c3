use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Role supplied by the identity provider. Role assignment policy (who gets
/// ADMIN) lives with the provider, not here.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }
}
