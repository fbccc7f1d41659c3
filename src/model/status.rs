use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Lifecycle status of a leave request.
///
/// PENDING is the only initial state. REJECTED and CANCELLED are terminal;
/// APPROVED can still move to CANCELLED (with the consumed days credited
/// back).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LeaveStatus::Rejected | LeaveStatus::Cancelled)
    }
}

// Stored as VARCHAR; decode by parsing the uppercase wire form.
impl sqlx::Type<sqlx::MySql> for LeaveStatus {
    fn type_info() -> sqlx::mysql::MySqlTypeInfo {
        <str as sqlx::Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
        <str as sqlx::Type<sqlx::MySql>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::MySql> for LeaveStatus {
    fn decode(
        value: sqlx::mysql::MySqlValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::MySql>>::decode(value)?;
        Ok(raw.parse::<LeaveStatus>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_form() {
        assert_eq!(LeaveStatus::Pending.to_string(), "PENDING");
        assert_eq!("CANCELLED".parse::<LeaveStatus>().unwrap(), LeaveStatus::Cancelled);
    }

    #[test]
    fn terminal_states() {
        assert!(LeaveStatus::Rejected.is_terminal());
        assert!(LeaveStatus::Cancelled.is_terminal());
        assert!(!LeaveStatus::Pending.is_terminal());
        assert!(!LeaveStatus::Approved.is_terminal());
    }
}
