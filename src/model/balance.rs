use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-user, per-leave-type, per-year counters of allotted vs. consumed days.
///
/// `remaining_days` is derived on read from the two stored counters; it is
/// never persisted, so it cannot go stale.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    pub id: String,
    pub user_id: String,
    pub leave_type_id: String,
    /// Display name of the leave type, joined in for read convenience.
    pub leave_type_name: String,
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = 12)]
    pub total_days: i64,
    #[schema(example = 3)]
    pub used_days: i64,
}

impl LeaveBalance {
    pub fn remaining_days(&self) -> i64 {
        self.total_days - self.used_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(total: i64, used: i64) -> LeaveBalance {
        LeaveBalance {
            id: "b1".into(),
            user_id: "u1".into(),
            leave_type_id: "t1".into(),
            leave_type_name: "Sick Leave".into(),
            year: 2025,
            total_days: total,
            used_days: used,
        }
    }

    #[test]
    fn remaining_is_recomputed_from_counters() {
        assert_eq!(balance(12, 0).remaining_days(), 12);
        assert_eq!(balance(12, 3).remaining_days(), 9);
        assert_eq!(balance(12, 12).remaining_days(), 0);
    }
}
