use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::model::balance::LeaveBalance;
use crate::model::leave_type::LeaveType;
use crate::model::request::LeaveRequestDetail;
use crate::model::status::LeaveStatus;
use crate::model::user::Actor;
use crate::service::{LeaveService, current_year};
use crate::store::{
    LeaveStore, LedgerDelta, NewLeaveRequest, Page, RequestFilter, StatusChange,
};

/// Payload for creating a leave request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewRequestInput {
    pub leave_type_id: String,
    #[schema(example = "2025-03-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-03-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

impl<S: LeaveStore> LeaveService<S> {
    pub async fn leave_types(&self) -> Result<Vec<LeaveType>, LeaveError> {
        self.store.leave_types().await
    }

    /// Balances are visible to their owner and to admins.
    pub async fn balances(
        &self,
        actor: &Actor,
        user_id: &str,
        year: i32,
    ) -> Result<Vec<LeaveBalance>, LeaveError> {
        if actor.user_id != user_id && !actor.is_admin() {
            return Err(LeaveError::forbidden("Access denied"));
        }
        self.store.balances_for_user(user_id, year).await
    }

    /// Create a new request in PENDING state. Validates date ordering and
    /// that the leave type exists; balance sufficiency is checked at approval
    /// time, not here.
    pub async fn create_request(
        &self,
        actor: &Actor,
        input: NewRequestInput,
    ) -> Result<LeaveRequestDetail, LeaveError> {
        if input.start_date > input.end_date {
            return Err(LeaveError::invalid_input("Start date must be before end date"));
        }
        self.store
            .leave_type_by_id(&input.leave_type_id)
            .await?
            .ok_or(LeaveError::not_found("leave type"))?;

        let id = self
            .store
            .insert_request(NewLeaveRequest {
                user_id: actor.user_id.clone(),
                leave_type_id: input.leave_type_id,
                start_date: input.start_date,
                end_date: input.end_date,
                reason: input.reason,
            })
            .await?;

        self.store
            .request_by_id(&id)
            .await?
            .ok_or(LeaveError::not_found("leave request"))
    }

    /// Requests are visible to their owner and to admins.
    pub async fn get_request(
        &self,
        actor: &Actor,
        id: &str,
    ) -> Result<LeaveRequestDetail, LeaveError> {
        let request = self
            .store
            .request_by_id(id)
            .await?
            .ok_or(LeaveError::not_found("leave request"))?;
        if request.user_id != actor.user_id && !actor.is_admin() {
            return Err(LeaveError::forbidden("Access denied"));
        }
        Ok(request)
    }

    pub async fn my_requests(
        &self,
        actor: &Actor,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<(Vec<LeaveRequestDetail>, i64), LeaveError> {
        let rows = self
            .store
            .requests_for_user(&actor.user_id, filter, page)
            .await?;
        let total = self
            .store
            .count_requests(Some(&actor.user_id), filter)
            .await?;
        Ok((rows, total))
    }

    pub async fn all_requests(
        &self,
        actor: &Actor,
        filter: &RequestFilter,
        page: Page,
    ) -> Result<(Vec<LeaveRequestDetail>, i64), LeaveError> {
        if !actor.is_admin() {
            return Err(LeaveError::forbidden("Admin access required"));
        }
        let rows = self.store.all_requests(filter, page).await?;
        let total = self.store.count_requests(None, filter).await?;
        Ok((rows, total))
    }

    /// PENDING → APPROVED. Re-reads the current balance (never a snapshot
    /// from creation time), then debits it in the same transaction as the
    /// status CAS, so the ledger is touched exactly once per approval.
    pub async fn approve_request(
        &self,
        actor: &Actor,
        id: &str,
    ) -> Result<LeaveRequestDetail, LeaveError> {
        if !actor.is_admin() {
            return Err(LeaveError::forbidden("Admin access required"));
        }
        let request = self
            .store
            .request_by_id(id)
            .await?
            .ok_or(LeaveError::not_found("leave request"))?;
        if request.status != LeaveStatus::Pending {
            return Err(LeaveError::invalid_state("Only pending requests can be approved"));
        }

        let year = current_year();
        if let Some(balance) = self
            .store
            .balance(&request.user_id, &request.leave_type_id, year)
            .await?
        {
            // Inclusive boundary: remaining == requested approves.
            if balance.remaining_days() < request.days_count {
                return Err(LeaveError::InsufficientBalance {
                    remaining: balance.remaining_days(),
                    requested: request.days_count,
                });
            }
        }

        let change = StatusChange::approved(actor.user_id.clone(), Utc::now());
        let debit = LedgerDelta::debit(
            request.user_id.clone(),
            request.leave_type_id.clone(),
            year,
            request.days_count,
        );
        let won = self
            .store
            .transition_request(id, LeaveStatus::Pending, change, Some(debit))
            .await?;
        if !won {
            return Err(LeaveError::invalid_state("Leave request was modified concurrently"));
        }

        tracing::info!(request_id = %id, approver = %actor.user_id, "leave request approved");
        self.store
            .request_by_id(id)
            .await?
            .ok_or(LeaveError::not_found("leave request"))
    }

    /// PENDING → REJECTED. Never touches the ledger.
    pub async fn reject_request(
        &self,
        actor: &Actor,
        id: &str,
        reason: Option<String>,
    ) -> Result<LeaveRequestDetail, LeaveError> {
        if !actor.is_admin() {
            return Err(LeaveError::forbidden("Admin access required"));
        }
        let request = self
            .store
            .request_by_id(id)
            .await?
            .ok_or(LeaveError::not_found("leave request"))?;
        if request.status != LeaveStatus::Pending {
            return Err(LeaveError::invalid_state("Only pending requests can be rejected"));
        }

        let change = StatusChange::rejected(actor.user_id.clone(), Utc::now(), reason);
        let won = self
            .store
            .transition_request(id, LeaveStatus::Pending, change, None)
            .await?;
        if !won {
            return Err(LeaveError::invalid_state("Leave request was modified concurrently"));
        }

        self.store
            .request_by_id(id)
            .await?
            .ok_or(LeaveError::not_found("leave request"))
    }

    /// Owner-only cancellation. Leaving APPROVED credits the consumed days
    /// back; cancelling PENDING never touches a balance.
    pub async fn cancel_request(
        &self,
        actor: &Actor,
        id: &str,
    ) -> Result<LeaveRequestDetail, LeaveError> {
        let request = self
            .store
            .request_by_id(id)
            .await?
            .ok_or(LeaveError::not_found("leave request"))?;
        if request.user_id != actor.user_id {
            return Err(LeaveError::forbidden("You can only cancel your own requests"));
        }
        if request.status == LeaveStatus::Cancelled {
            return Err(LeaveError::invalid_state("Request already cancelled"));
        }

        let year = current_year();
        let credit = if request.status == LeaveStatus::Approved {
            if let Some(balance) = self
                .store
                .balance(&request.user_id, &request.leave_type_id, year)
                .await?
            {
                if balance.used_days < request.days_count {
                    // The floor will absorb this, but it usually means a
                    // reversal was applied twice somewhere.
                    tracing::warn!(
                        request_id = %id,
                        used_days = balance.used_days,
                        days_count = request.days_count,
                        "cancel credit exceeds recorded usage"
                    );
                }
            }
            Some(LedgerDelta::credit(
                request.user_id.clone(),
                request.leave_type_id.clone(),
                year,
                request.days_count,
            ))
        } else {
            None
        };

        let won = self
            .store
            .transition_request(id, request.status, StatusChange::cancelled(), credit)
            .await?;
        if !won {
            return Err(LeaveError::invalid_state("Leave request was modified concurrently"));
        }

        self.store
            .request_by_id(id)
            .await?
            .ok_or(LeaveError::not_found("leave request"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::model::user::UserProfile;
    use crate::store::default_catalog;
    use crate::store::memory::InMemoryLeaveStore;

    fn profile(id: &str, role: Role) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            display_name: id.to_string(),
            role,
        }
    }

    fn actor(id: &str, role: Role) -> Actor {
        Actor { user_id: id.to_string(), role }
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(current_year(), month, day).unwrap()
    }

    fn request_input(leave_type_id: &str, start: NaiveDate, end: NaiveDate) -> NewRequestInput {
        NewRequestInput {
            leave_type_id: leave_type_id.to_string(),
            start_date: start,
            end_date: end,
            reason: Some("family matters".to_string()),
        }
    }

    /// Store seeded with the default catalog, one provisioned user ("alice",
    /// Sick Leave total 12) and one admin ("boss").
    async fn setup() -> (LeaveService<InMemoryLeaveStore>, String) {
        let service = LeaveService::new(InMemoryLeaveStore::new());
        service
            .store()
            .seed_leave_types(&default_catalog())
            .await
            .unwrap();
        service.sync_user(&profile("alice", Role::User)).await.unwrap();
        service.sync_user(&profile("boss", Role::Admin)).await.unwrap();
        let sick = service
            .leave_types()
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.name == "Sick Leave")
            .unwrap();
        (service, sick.id)
    }

    async fn sick_balance(service: &LeaveService<InMemoryLeaveStore>, sick: &str) -> LeaveBalance {
        service
            .store()
            .balance("alice", sick, current_year())
            .await
            .unwrap()
            .unwrap()
    }

    #[actix_web::test]
    async fn create_computes_inclusive_day_count() {
        let (service, sick) = setup().await;
        let alice = actor("alice", Role::User);

        let three = service
            .create_request(&alice, request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();
        assert_eq!(three.days_count, 3);
        assert_eq!(three.status, LeaveStatus::Pending);

        let single = service
            .create_request(&alice, request_input(&sick, date(4, 7), date(4, 7)))
            .await
            .unwrap();
        assert_eq!(single.days_count, 1);
    }

    #[actix_web::test]
    async fn create_rejects_reversed_dates() {
        let (service, sick) = setup().await;
        let err = service
            .create_request(&actor("alice", Role::User), request_input(&sick, date(3, 5), date(3, 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::InvalidInput { .. }));
    }

    #[actix_web::test]
    async fn create_rejects_unknown_leave_type() {
        let (service, _) = setup().await;
        let err = service
            .create_request(
                &actor("alice", Role::User),
                request_input("no-such-type", date(3, 1), date(3, 2)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeaveError::NotFound { .. }));
    }

    #[actix_web::test]
    async fn approve_debits_exactly_days_count() {
        let (service, sick) = setup().await;
        let request = service
            .create_request(&actor("alice", Role::User), request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();

        let approved = service
            .approve_request(&actor("boss", Role::Admin), &request.id)
            .await
            .unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("boss"));
        assert!(approved.approved_at.is_some());

        let balance = sick_balance(&service, &sick).await;
        assert_eq!(balance.used_days, 3);
        assert_eq!(balance.remaining_days(), 9);
    }

    #[actix_web::test]
    async fn approve_then_cancel_restores_balance() {
        let (service, sick) = setup().await;
        let alice = actor("alice", Role::User);
        let request = service
            .create_request(&alice, request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();
        service
            .approve_request(&actor("boss", Role::Admin), &request.id)
            .await
            .unwrap();

        let cancelled = service.cancel_request(&alice, &request.id).await.unwrap();
        assert_eq!(cancelled.status, LeaveStatus::Cancelled);

        let balance = sick_balance(&service, &sick).await;
        assert_eq!(balance.used_days, 0);
        assert_eq!(balance.remaining_days(), 12);
    }

    #[actix_web::test]
    async fn approve_fails_on_insufficient_balance() {
        let (service, sick) = setup().await;
        // 13 inclusive days against a total of 12.
        let request = service
            .create_request(&actor("alice", Role::User), request_input(&sick, date(3, 1), date(3, 13)))
            .await
            .unwrap();

        let err = service
            .approve_request(&actor("boss", Role::Admin), &request.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LeaveError::InsufficientBalance { remaining: 12, requested: 13 }
        ));

        // No partial mutation: request still pending, ledger untouched.
        let balance = sick_balance(&service, &sick).await;
        assert_eq!(balance.used_days, 0);
        let request = service
            .get_request(&actor("alice", Role::User), &request.id)
            .await
            .unwrap();
        assert_eq!(request.status, LeaveStatus::Pending);
    }

    #[actix_web::test]
    async fn approve_at_exact_remaining_succeeds() {
        let (service, sick) = setup().await;
        // Exactly 12 inclusive days: the boundary is inclusive.
        let request = service
            .create_request(&actor("alice", Role::User), request_input(&sick, date(3, 1), date(3, 12)))
            .await
            .unwrap();

        service
            .approve_request(&actor("boss", Role::Admin), &request.id)
            .await
            .unwrap();
        let balance = sick_balance(&service, &sick).await;
        assert_eq!(balance.remaining_days(), 0);
    }

    #[actix_web::test]
    async fn approve_twice_fails_without_double_debit() {
        let (service, sick) = setup().await;
        let boss = actor("boss", Role::Admin);
        let request = service
            .create_request(&actor("alice", Role::User), request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();

        service.approve_request(&boss, &request.id).await.unwrap();
        let err = service.approve_request(&boss, &request.id).await.unwrap_err();
        assert!(matches!(err, LeaveError::InvalidState { .. }));

        let balance = sick_balance(&service, &sick).await;
        assert_eq!(balance.used_days, 3);
    }

    #[actix_web::test]
    async fn non_admin_cannot_approve_or_reject() {
        let (service, sick) = setup().await;
        let alice = actor("alice", Role::User);
        let request = service
            .create_request(&alice, request_input(&sick, date(3, 1), date(3, 2)))
            .await
            .unwrap();

        assert!(matches!(
            service.approve_request(&alice, &request.id).await.unwrap_err(),
            LeaveError::Forbidden { .. }
        ));
        assert!(matches!(
            service.reject_request(&alice, &request.id, None).await.unwrap_err(),
            LeaveError::Forbidden { .. }
        ));
    }

    #[actix_web::test]
    async fn reject_never_touches_the_ledger() {
        let (service, sick) = setup().await;
        let request = service
            .create_request(&actor("alice", Role::User), request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();

        let rejected = service
            .reject_request(&actor("boss", Role::Admin), &request.id, Some("short staffed".into()))
            .await
            .unwrap();
        assert_eq!(rejected.status, LeaveStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("short staffed"));

        let balance = sick_balance(&service, &sick).await;
        assert_eq!(balance.used_days, 0);
    }

    #[actix_web::test]
    async fn approve_after_reject_fails() {
        let (service, sick) = setup().await;
        let boss = actor("boss", Role::Admin);
        let request = service
            .create_request(&actor("alice", Role::User), request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();

        service.reject_request(&boss, &request.id, None).await.unwrap();
        let err = service.approve_request(&boss, &request.id).await.unwrap_err();
        assert!(matches!(err, LeaveError::InvalidState { .. }));
    }

    #[actix_web::test]
    async fn cancel_pending_changes_no_balance() {
        let (service, sick) = setup().await;
        let alice = actor("alice", Role::User);
        let request = service
            .create_request(&alice, request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();

        let cancelled = service.cancel_request(&alice, &request.id).await.unwrap();
        assert_eq!(cancelled.status, LeaveStatus::Cancelled);

        let balance = sick_balance(&service, &sick).await;
        assert_eq!(balance.used_days, 0);
        assert_eq!(balance.remaining_days(), 12);
    }

    #[actix_web::test]
    async fn cancel_requires_ownership() {
        let (service, sick) = setup().await;
        service.sync_user(&profile("mallory", Role::User)).await.unwrap();
        let request = service
            .create_request(&actor("alice", Role::User), request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();

        // Not even an admin can cancel on the owner's behalf.
        assert!(matches!(
            service.cancel_request(&actor("mallory", Role::User), &request.id).await.unwrap_err(),
            LeaveError::Forbidden { .. }
        ));
        assert!(matches!(
            service.cancel_request(&actor("boss", Role::Admin), &request.id).await.unwrap_err(),
            LeaveError::Forbidden { .. }
        ));
    }

    #[actix_web::test]
    async fn cancel_of_cancelled_request_fails() {
        let (service, sick) = setup().await;
        let alice = actor("alice", Role::User);
        let request = service
            .create_request(&alice, request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();

        service.cancel_request(&alice, &request.id).await.unwrap();
        let err = service.cancel_request(&alice, &request.id).await.unwrap_err();
        assert!(matches!(err, LeaveError::InvalidState { .. }));
    }

    #[actix_web::test]
    async fn sequential_approvals_share_one_balance() {
        let (service, sick) = setup().await;
        let alice = actor("alice", Role::User);
        let boss = actor("boss", Role::Admin);

        let first = service
            .create_request(&alice, request_input(&sick, date(2, 2), date(2, 6)))
            .await
            .unwrap();
        let second = service
            .create_request(&alice, request_input(&sick, date(5, 4), date(5, 8)))
            .await
            .unwrap();
        let third = service
            .create_request(&alice, request_input(&sick, date(8, 10), date(8, 12)))
            .await
            .unwrap();
        assert_eq!(first.days_count, 5);
        assert_eq!(second.days_count, 5);
        assert_eq!(third.days_count, 3);

        service.approve_request(&boss, &first.id).await.unwrap();
        service.approve_request(&boss, &second.id).await.unwrap();
        let balance = sick_balance(&service, &sick).await;
        assert_eq!(balance.used_days, 10);

        // The approval-time re-read sees the 10 days consumed above.
        let err = service.approve_request(&boss, &third.id).await.unwrap_err();
        assert!(matches!(
            err,
            LeaveError::InsufficientBalance { remaining: 2, requested: 3 }
        ));
    }

    #[actix_web::test]
    async fn get_request_is_owner_or_admin_only() {
        let (service, sick) = setup().await;
        service.sync_user(&profile("mallory", Role::User)).await.unwrap();
        let request = service
            .create_request(&actor("alice", Role::User), request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();

        service.get_request(&actor("alice", Role::User), &request.id).await.unwrap();
        service.get_request(&actor("boss", Role::Admin), &request.id).await.unwrap();
        assert!(matches!(
            service.get_request(&actor("mallory", Role::User), &request.id).await.unwrap_err(),
            LeaveError::Forbidden { .. }
        ));
    }

    #[actix_web::test]
    async fn listings_filter_and_paginate() {
        let (service, sick) = setup().await;
        let alice = actor("alice", Role::User);
        let boss = actor("boss", Role::Admin);

        let first = service
            .create_request(&alice, request_input(&sick, date(3, 1), date(3, 3)))
            .await
            .unwrap();
        let second = service
            .create_request(&alice, request_input(&sick, date(4, 1), date(4, 2)))
            .await
            .unwrap();
        service.approve_request(&boss, &first.id).await.unwrap();

        let pending_only = RequestFilter {
            status: Some(LeaveStatus::Pending),
            ..Default::default()
        };
        let (rows, total) = service
            .my_requests(&alice, &pending_only, Page::new(None, None))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, second.id);

        let (all, total) = service
            .all_requests(&boss, &RequestFilter::default(), Page::new(None, None))
            .await
            .unwrap();
        assert_eq!(total, 2);
        // Newest first.
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);

        assert!(matches!(
            service
                .all_requests(&alice, &RequestFilter::default(), Page::new(None, None))
                .await
                .unwrap_err(),
            LeaveError::Forbidden { .. }
        ));
    }

    #[actix_web::test]
    async fn balances_visible_to_owner_and_admin_only() {
        let (service, _) = setup().await;
        service.sync_user(&profile("mallory", Role::User)).await.unwrap();
        let year = current_year();

        let own = service
            .balances(&actor("alice", Role::User), "alice", year)
            .await
            .unwrap();
        assert_eq!(own.len(), 4);

        service
            .balances(&actor("boss", Role::Admin), "alice", year)
            .await
            .unwrap();
        assert!(matches!(
            service
                .balances(&actor("mallory", Role::User), "alice", year)
                .await
                .unwrap_err(),
            LeaveError::Forbidden { .. }
        ));
    }
}
