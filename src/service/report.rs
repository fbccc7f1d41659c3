use crate::error::LeaveError;
use crate::model::user::Actor;
use crate::service::LeaveService;
use crate::store::{LeaveStore, StatsRow, SummaryFilter, SummaryRow};

impl<S: LeaveStore> LeaveService<S> {
    /// Cross-product summary of users × leave types for a year, zero-filled
    /// where no requests or balance exist. Admin only.
    pub async fn summary_report(
        &self,
        actor: &Actor,
        filter: &SummaryFilter,
    ) -> Result<Vec<SummaryRow>, LeaveError> {
        if !actor.is_admin() {
            return Err(LeaveError::forbidden("Admin access required"));
        }
        self.store.summary_report(filter).await
    }

    /// Per-type statistics for a year. Admin only.
    pub async fn stats_report(&self, actor: &Actor, year: i32) -> Result<Vec<StatsRow>, LeaveError> {
        if !actor.is_admin() {
            return Err(LeaveError::forbidden("Admin access required"));
        }
        self.store.stats_report(year).await
    }
}
