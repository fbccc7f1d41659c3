use crate::error::LeaveError;
use crate::model::user::{UserProfile, UserRecord};
use crate::service::{LeaveService, current_year};
use crate::store::LeaveStore;

impl<S: LeaveStore> LeaveService<S> {
    /// First-login sync: upsert the directory row from the identity claims
    /// and provision this year's balances. Retries are harmless; both halves
    /// are idempotent.
    pub async fn sync_user(&self, profile: &UserProfile) -> Result<UserRecord, LeaveError> {
        let user = self.store.upsert_user(profile).await?;
        let year = current_year();
        let created = self.store.provision_balances(&profile.id, year).await?;
        if created > 0 {
            tracing::info!(user_id = %profile.id, created, year, "provisioned leave balances");
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::store::default_catalog;
    use crate::store::memory::InMemoryLeaveStore;

    fn profile(id: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            display_name: id.to_string(),
            role: Role::User,
        }
    }

    #[actix_web::test]
    async fn sync_provisions_once_per_type() {
        let service = LeaveService::new(InMemoryLeaveStore::new());
        service
            .store()
            .seed_leave_types(&default_catalog())
            .await
            .unwrap();

        service.sync_user(&profile("alice")).await.unwrap();
        service.sync_user(&profile("alice")).await.unwrap();

        let balances = service
            .store()
            .balances_for_user("alice", current_year())
            .await
            .unwrap();
        assert_eq!(balances.len(), 4);
        assert!(balances.iter().all(|b| b.used_days == 0));
    }

    #[actix_web::test]
    async fn sync_refreshes_directory_fields() {
        let service = LeaveService::new(InMemoryLeaveStore::new());
        service
            .store()
            .seed_leave_types(&default_catalog())
            .await
            .unwrap();

        service.sync_user(&profile("alice")).await.unwrap();
        let renamed = UserProfile {
            display_name: "Alice A.".to_string(),
            ..profile("alice")
        };
        let user = service.sync_user(&renamed).await.unwrap();
        assert_eq!(user.display_name, "Alice A.");
    }
}
