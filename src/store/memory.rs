use std::sync::Mutex;

use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::error::LeaveError;
use crate::model::balance::LeaveBalance;
use crate::model::leave_type::LeaveType;
use crate::model::request::{LeaveRequest, LeaveRequestDetail, days_count_inclusive};
use crate::model::status::LeaveStatus;
use crate::model::user::{UserProfile, UserRecord};
use crate::store::{
    LeaveStore, LeaveTypeSeed, LedgerDelta, LedgerOp, NewLeaveRequest, Page, RequestFilter,
    StatsRow, StatusChange, SummaryFilter, SummaryRow,
};

#[derive(Default)]
struct State {
    types: Vec<LeaveType>,
    balances: Vec<LeaveBalance>,
    // Insertion order doubles as creation order; listings iterate in reverse.
    requests: Vec<LeaveRequest>,
    users: Vec<UserRecord>,
}

impl State {
    fn apply_usage(&mut self, user_id: &str, leave_type_id: &str, year: i32, days: i64) {
        if let Some(balance) = self.balances.iter_mut().find(|b| {
            b.user_id == user_id && b.leave_type_id == leave_type_id && b.year == year
        }) {
            balance.used_days += days;
        }
    }

    fn reverse_usage(&mut self, user_id: &str, leave_type_id: &str, year: i32, days: i64) {
        if let Some(balance) = self.balances.iter_mut().find(|b| {
            b.user_id == user_id && b.leave_type_id == leave_type_id && b.year == year
        }) {
            balance.used_days = (balance.used_days - days).max(0);
        }
    }

    fn detail(&self, request: &LeaveRequest) -> Option<LeaveRequestDetail> {
        let leave_type = self.types.iter().find(|t| t.id == request.leave_type_id)?;
        let user = self.users.iter().find(|u| u.id == request.user_id)?;
        let approved_by_name = request
            .approved_by
            .as_deref()
            .and_then(|id| self.users.iter().find(|u| u.id == id))
            .map(|u| u.display_name.clone());
        Some(LeaveRequestDetail {
            id: request.id.clone(),
            user_id: request.user_id.clone(),
            leave_type_id: request.leave_type_id.clone(),
            leave_type_name: leave_type.name.clone(),
            user_name: user.display_name.clone(),
            user_email: user.email.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            days_count: request.days_count,
            reason: request.reason.clone(),
            status: request.status,
            approved_by: request.approved_by.clone(),
            approved_by_name,
            approved_at: request.approved_at,
            rejection_reason: request.rejection_reason.clone(),
            created_at: request.created_at,
        })
    }

    fn matches(request: &LeaveRequest, user_id: Option<&str>, filter: &RequestFilter) -> bool {
        if let Some(user_id) = user_id.or(filter.user_id.as_deref()) {
            if request.user_id != user_id {
                return false;
            }
        }
        if let Some(status) = filter.status {
            if request.status != status {
                return false;
            }
        }
        if let Some(year) = filter.year {
            if request.start_date.year() != year {
                return false;
            }
        }
        true
    }
}

/// In-memory store with the same observable behavior as the MySQL store,
/// down to listing order and report shapes. Every store and engine test runs
/// against this.
#[derive(Default)]
pub struct InMemoryLeaveStore {
    state: Mutex<State>,
}

impl InMemoryLeaveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeaveStore for InMemoryLeaveStore {
    async fn leave_types(&self) -> Result<Vec<LeaveType>, LeaveError> {
        let state = self.state.lock().unwrap();
        let mut types = state.types.clone();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    async fn leave_type_by_id(&self, id: &str) -> Result<Option<LeaveType>, LeaveError> {
        let state = self.state.lock().unwrap();
        Ok(state.types.iter().find(|t| t.id == id).cloned())
    }

    async fn seed_leave_types(&self, catalog: &[LeaveTypeSeed]) -> Result<u64, LeaveError> {
        let mut state = self.state.lock().unwrap();
        let mut created = 0;
        for seed in catalog {
            if state.types.iter().any(|t| t.name == seed.name) {
                continue;
            }
            state.types.push(LeaveType {
                id: Uuid::new_v4().to_string(),
                name: seed.name.to_string(),
                description: Some(seed.description.to_string()),
                days_per_year: seed.days_per_year,
            });
            created += 1;
        }
        Ok(created)
    }

    async fn balance(
        &self,
        user_id: &str,
        leave_type_id: &str,
        year: i32,
    ) -> Result<Option<LeaveBalance>, LeaveError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .balances
            .iter()
            .find(|b| b.user_id == user_id && b.leave_type_id == leave_type_id && b.year == year)
            .cloned())
    }

    async fn balances_for_user(
        &self,
        user_id: &str,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError> {
        let state = self.state.lock().unwrap();
        let mut balances: Vec<LeaveBalance> = state
            .balances
            .iter()
            .filter(|b| b.user_id == user_id && b.year == year)
            .cloned()
            .collect();
        balances.sort_by(|a, b| a.leave_type_name.cmp(&b.leave_type_name));
        Ok(balances)
    }

    async fn apply_usage(
        &self,
        user_id: &str,
        leave_type_id: &str,
        year: i32,
        days: i64,
    ) -> Result<(), LeaveError> {
        let mut state = self.state.lock().unwrap();
        state.apply_usage(user_id, leave_type_id, year, days);
        Ok(())
    }

    async fn reverse_usage(
        &self,
        user_id: &str,
        leave_type_id: &str,
        year: i32,
        days: i64,
    ) -> Result<(), LeaveError> {
        let mut state = self.state.lock().unwrap();
        state.reverse_usage(user_id, leave_type_id, year, days);
        Ok(())
    }

    async fn provision_balances(&self, user_id: &str, year: i32) -> Result<u64, LeaveError> {
        let mut state = self.state.lock().unwrap();
        let mut created = 0;
        let types = state.types.clone();
        for leave_type in types {
            let exists = state.balances.iter().any(|b| {
                b.user_id == user_id && b.leave_type_id == leave_type.id && b.year == year
            });
            if exists {
                continue;
            }
            state.balances.push(LeaveBalance {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                leave_type_id: leave_type.id.clone(),
                leave_type_name: leave_type.name.clone(),
                year,
                total_days: leave_type.days_per_year,
                used_days: 0,
            });
            created += 1;
        }
        Ok(created)
    }

    async fn insert_request(&self, new: NewLeaveRequest) -> Result<String, LeaveError> {
        let mut state = self.state.lock().unwrap();
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        state.requests.push(LeaveRequest {
            id: id.clone(),
            user_id: new.user_id,
            leave_type_id: new.leave_type_id,
            start_date: new.start_date,
            end_date: new.end_date,
            days_count: days_count_inclusive(new.start_date, new.end_date),
            reason: new.reason,
            status: LeaveStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: Some(now),
            updated_at: Some(now),
        });
        Ok(id)
    }

    async fn request_by_id(&self, id: &str) -> Result<Option<LeaveRequestDetail>, LeaveError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .requests
            .iter()
            .find(|r| r.id == id)
            .and_then(|r| state.detail(r)))
    }

    async fn requests_for_user(
        &self,
        user_id: &str,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<Vec<LeaveRequestDetail>, LeaveError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .requests
            .iter()
            .rev()
            .filter(|r| State::matches(r, Some(user_id), filter))
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .filter_map(|r| state.detail(r))
            .collect())
    }

    async fn all_requests(
        &self,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<Vec<LeaveRequestDetail>, LeaveError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .requests
            .iter()
            .rev()
            .filter(|r| State::matches(r, None, filter))
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .filter_map(|r| state.detail(r))
            .collect())
    }

    async fn count_requests(
        &self,
        user_id: Option<&str>,
        filter: &RequestFilter,
    ) -> Result<i64, LeaveError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .requests
            .iter()
            .filter(|r| State::matches(r, user_id, filter))
            .count() as i64)
    }

    async fn transition_request(
        &self,
        id: &str,
        expected: LeaveStatus,
        change: StatusChange,
        ledger: Option<LedgerDelta>,
    ) -> Result<bool, LeaveError> {
        // Single lock scope stands in for the SQL transaction: the CAS and
        // the ledger delta are observed together or not at all.
        let mut state = self.state.lock().unwrap();

        let Some(index) = state.requests.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        if state.requests[index].status != expected {
            return Ok(false);
        }

        let request = &mut state.requests[index];
        request.status = change.to;
        if change.approved_by.is_some() {
            request.approved_by = change.approved_by;
        }
        if change.approved_at.is_some() {
            request.approved_at = change.approved_at;
        }
        if change.rejection_reason.is_some() {
            request.rejection_reason = change.rejection_reason;
        }
        request.updated_at = Some(Utc::now());

        if let Some(delta) = ledger {
            match delta.op {
                LedgerOp::Debit => {
                    state.apply_usage(&delta.user_id, &delta.leave_type_id, delta.year, delta.days)
                }
                LedgerOp::Credit => {
                    state.reverse_usage(&delta.user_id, &delta.leave_type_id, delta.year, delta.days)
                }
            }
        }

        Ok(true)
    }

    async fn summary_report(&self, filter: &SummaryFilter) -> Result<Vec<SummaryRow>, LeaveError> {
        let state = self.state.lock().unwrap();

        let mut users: Vec<&UserRecord> = state.users.iter().collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        let mut types: Vec<&LeaveType> = state.types.iter().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));

        let mut rows = Vec::new();
        for user in users {
            if let Some(wanted) = filter.user_id.as_deref() {
                if user.id != wanted {
                    continue;
                }
            }
            for leave_type in &types {
                let requests: Vec<&LeaveRequest> = state
                    .requests
                    .iter()
                    .filter(|r| {
                        r.user_id == user.id
                            && r.leave_type_id == leave_type.id
                            && r.start_date.year() == filter.year
                            && filter
                                .month
                                .map(|m| r.start_date.month() == m)
                                .unwrap_or(true)
                    })
                    .collect();

                // The month filter lives in the WHERE clause of the SQL
                // report, so cells with no request in that month drop out
                // entirely instead of being zero-filled.
                if filter.month.is_some() && requests.is_empty() {
                    continue;
                }

                let balance = state.balances.iter().find(|b| {
                    b.user_id == user.id && b.leave_type_id == leave_type.id && b.year == filter.year
                });

                let count = |status: LeaveStatus| {
                    requests.iter().filter(|r| r.status == status).count() as i64
                };
                rows.push(SummaryRow {
                    user_id: user.id.clone(),
                    display_name: user.display_name.clone(),
                    email: user.email.clone(),
                    leave_type: leave_type.name.clone(),
                    approved_count: count(LeaveStatus::Approved),
                    rejected_count: count(LeaveStatus::Rejected),
                    pending_count: count(LeaveStatus::Pending),
                    total_days_taken: requests
                        .iter()
                        .filter(|r| r.status == LeaveStatus::Approved)
                        .map(|r| r.days_count)
                        .sum(),
                    total_days: balance.map(|b| b.total_days).unwrap_or(0),
                    used_days: balance.map(|b| b.used_days).unwrap_or(0),
                    remaining_days: balance.map(|b| b.remaining_days()).unwrap_or(0),
                });
            }
        }
        Ok(rows)
    }

    async fn stats_report(&self, year: i32) -> Result<Vec<StatsRow>, LeaveError> {
        let state = self.state.lock().unwrap();

        let mut types: Vec<&LeaveType> = state.types.iter().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));

        let mut rows = Vec::new();
        for leave_type in types {
            let requests: Vec<&LeaveRequest> = state
                .requests
                .iter()
                .filter(|r| r.leave_type_id == leave_type.id && r.start_date.year() == year)
                .collect();

            let mut employees: Vec<&str> =
                requests.iter().map(|r| r.user_id.as_str()).collect();
            employees.sort_unstable();
            employees.dedup();

            let count = |status: LeaveStatus| {
                requests.iter().filter(|r| r.status == status).count() as i64
            };
            rows.push(StatsRow {
                leave_type: leave_type.name.clone(),
                employees_used: employees.len() as i64,
                total_days_taken: requests
                    .iter()
                    .filter(|r| r.status == LeaveStatus::Approved)
                    .map(|r| r.days_count)
                    .sum(),
                pending_requests: count(LeaveStatus::Pending),
                approved_requests: count(LeaveStatus::Approved),
                rejected_requests: count(LeaveStatus::Rejected),
            });
        }
        Ok(rows)
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<UserRecord, LeaveError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        if let Some(user) = state.users.iter_mut().find(|u| u.id == profile.id) {
            user.email = profile.email.clone();
            user.display_name = profile.display_name.clone();
            user.role = profile.role.to_string();
            user.last_login = Some(now);
            return Ok(user.clone());
        }
        let user = UserRecord {
            id: profile.id.clone(),
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            role: profile.role.to_string(),
            last_login: Some(now),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: &str) -> Result<Option<UserRecord>, LeaveError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::default_catalog;

    async fn seeded_store() -> (InMemoryLeaveStore, String) {
        let store = InMemoryLeaveStore::new();
        store.seed_leave_types(&default_catalog()).await.unwrap();
        let sick = store
            .leave_types()
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.name == "Sick Leave")
            .unwrap();
        (store, sick.id)
    }

    #[actix_web::test]
    async fn seeding_is_idempotent() {
        let store = InMemoryLeaveStore::new();
        assert_eq!(store.seed_leave_types(&default_catalog()).await.unwrap(), 4);
        assert_eq!(store.seed_leave_types(&default_catalog()).await.unwrap(), 0);
        assert_eq!(store.leave_types().await.unwrap().len(), 4);
    }

    #[actix_web::test]
    async fn provisioning_twice_creates_each_row_once() {
        let (store, _) = seeded_store().await;
        assert_eq!(store.provision_balances("u1", 2025).await.unwrap(), 4);
        assert_eq!(store.provision_balances("u1", 2025).await.unwrap(), 0);
        assert_eq!(store.balances_for_user("u1", 2025).await.unwrap().len(), 4);
    }

    #[actix_web::test]
    async fn provisioned_balance_copies_catalog_allotment() {
        let (store, sick) = seeded_store().await;
        store.provision_balances("u1", 2025).await.unwrap();
        let balance = store.balance("u1", &sick, 2025).await.unwrap().unwrap();
        assert_eq!(balance.total_days, 12);
        assert_eq!(balance.used_days, 0);
        assert_eq!(balance.remaining_days(), 12);
    }

    #[actix_web::test]
    async fn apply_usage_is_not_idempotent() {
        let (store, sick) = seeded_store().await;
        store.provision_balances("u1", 2025).await.unwrap();
        store.apply_usage("u1", &sick, 2025, 3).await.unwrap();
        store.apply_usage("u1", &sick, 2025, 3).await.unwrap();
        let balance = store.balance("u1", &sick, 2025).await.unwrap().unwrap();
        assert_eq!(balance.used_days, 6);
    }

    #[actix_web::test]
    async fn reverse_usage_floors_at_zero() {
        let (store, sick) = seeded_store().await;
        store.provision_balances("u1", 2025).await.unwrap();
        store.apply_usage("u1", &sick, 2025, 2).await.unwrap();
        store.reverse_usage("u1", &sick, 2025, 5).await.unwrap();
        let balance = store.balance("u1", &sick, 2025).await.unwrap().unwrap();
        assert_eq!(balance.used_days, 0);
        assert_eq!(balance.remaining_days(), balance.total_days);
    }

    #[actix_web::test]
    async fn balances_are_ordered_by_type_name() {
        let (store, _) = seeded_store().await;
        store.provision_balances("u1", 2025).await.unwrap();
        let names: Vec<String> = store
            .balances_for_user("u1", 2025)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.leave_type_name)
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
