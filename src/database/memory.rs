//! In-memory credential store for local development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Mutex;
use uuid::Uuid;

use super::models::{ActivityLogEntry, Identity, NewIdentity, ProfileShell};
use super::{CredentialStore, StoreError};
use crate::auth::models::UserType;

#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<Uuid, Identity>,
    by_email: DashMap<String, Uuid>,
    profiles: DashMap<Uuid, ProfileShell>,
    activity: Mutex<Vec<ActivityLogEntry>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, user_id: Uuid) -> Option<ProfileShell> {
        self.profiles.get(&user_id).map(|p| p.value().clone())
    }

    pub fn activity(&self) -> Vec<ActivityLogEntry> {
        self.activity
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn set_active(&self, user_id: Uuid, active: bool) {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.is_active = active;
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email_and_type(
        &self,
        email: &str,
        user_type: UserType,
    ) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .find_by_email(email)
            .await?
            .filter(|u| u.user_type == user_type && u.is_active))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .by_email
            .get(email)
            .and_then(|id| self.users.get(id.value()).map(|u| u.value().clone())))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn create_identity(
        &self,
        identity: NewIdentity,
        profile: ProfileShell,
    ) -> Result<Identity, StoreError> {
        let identity = identity.into_identity(Utc::now());
        // The email entry is held until all rows exist, which makes the insert atomic.
        match self.by_email.entry(identity.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail),
            Entry::Vacant(slot) => {
                self.users.insert(identity.id, identity.clone());
                self.profiles.insert(identity.id, profile);
                slot.insert(identity.id);
                Ok(identity)
            }
        }
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn append_activity_log(&self, entry: ActivityLogEntry) -> Result<(), StoreError> {
        self.activity
            .lock()
            .map_err(|_| StoreError::Pool("activity log lock poisoned".into()))?
            .push(entry);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ActivityAction;

    fn new_identity(email: &str, user_type: UserType) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            user_type,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            company_name: None,
            phone: None,
        }
    }

    #[tokio::test]
    async fn create_then_lookup() {
        let store = InMemoryCredentialStore::new();
        let created = store
            .create_identity(
                new_identity("a@x.com", UserType::Vendor),
                ProfileShell::pending_for(UserType::Vendor),
            )
            .await
            .unwrap();

        let by_type = store
            .find_by_email_and_type("a@x.com", UserType::Vendor)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_type.id, created.id);
        assert!(
            store
                .find_by_email_and_type("a@x.com", UserType::Distributor)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(store.find_by_id(created.id).await.unwrap().unwrap().email, "a@x.com");
        assert_eq!(
            store.profile(created.id),
            Some(ProfileShell::pending_for(UserType::Vendor))
        );
    }

    #[tokio::test]
    async fn duplicate_email_rejected_across_types() {
        let store = InMemoryCredentialStore::new();
        store
            .create_identity(
                new_identity("a@x.com", UserType::Vendor),
                ProfileShell::pending_for(UserType::Vendor),
            )
            .await
            .unwrap();

        let err = store
            .create_identity(
                new_identity("a@x.com", UserType::Distributor),
                ProfileShell::pending_for(UserType::Distributor),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn inactive_users_are_hidden_from_login_lookup() {
        let store = InMemoryCredentialStore::new();
        let created = store
            .create_identity(
                new_identity("a@x.com", UserType::Vendor),
                ProfileShell::pending_for(UserType::Vendor),
            )
            .await
            .unwrap();
        store.set_active(created.id, false);

        assert!(
            store
                .find_by_email_and_type("a@x.com", UserType::Vendor)
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.find_by_email("a@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn last_login_and_activity() {
        let store = InMemoryCredentialStore::new();
        let created = store
            .create_identity(
                new_identity("a@x.com", UserType::Vendor),
                ProfileShell::pending_for(UserType::Vendor),
            )
            .await
            .unwrap();
        let now = Utc::now();

        store.update_last_login(created.id, now).await.unwrap();
        store
            .append_activity_log(ActivityLogEntry::for_user(
                created.id,
                UserType::Vendor,
                ActivityAction::Login,
            ))
            .await
            .unwrap();

        assert_eq!(store.find_by_id(created.id).await.unwrap().unwrap().last_login, Some(now));
        assert_eq!(store.activity().len(), 1);
    }
}
