// ABOUTME: User directory: registration by email, listing, and detail with announcements resolved.
// ABOUTME: Registration is idempotent per email so a returning user keeps their id and set.

use std::sync::Arc;

use ulid::Ulid;

use crate::error::{BillboardError, StoreError};
use crate::model::{NewUser, User, UserDetail};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn DocumentStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<User>, BillboardError> {
        Ok(self.store.list_users().await?)
    }

    /// Return the user registered under `new_user.email`, creating it first if needed.
    pub async fn register(&self, new_user: NewUser) -> Result<User, BillboardError> {
        if let Some(existing) = self.store.find_user_by_email(&new_user.email).await? {
            return Ok(existing);
        }

        let user = User::new(new_user.name, new_user.email, new_user.avatar);
        match self.store.insert_user(&user).await {
            Ok(()) => {
                tracing::info!("registered user {} <{}>", user.id, user.email);
                Ok(user)
            }
            // Lost a race with another registration for the same email.
            Err(StoreError::Duplicate(_)) => self
                .store
                .find_user_by_email(&user.email)
                .await?
                .ok_or_else(|| BillboardError::user_not_found(user.email.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// The user with every id in `all_announcements` resolved to its document.
    pub async fn get_detail(&self, id: Ulid) -> Result<UserDetail, BillboardError> {
        let user = self
            .store
            .find_user(id)
            .await?
            .ok_or_else(|| BillboardError::user_not_found(id.to_string()))?;

        let ids: Vec<Ulid> = user.all_announcements.iter().copied().collect();
        let all_announcements = self.store.find_announcements(&ids).await?;
        if all_announcements.len() != ids.len() {
            tracing::warn!(
                "user {} references {} announcements but only {} exist",
                id,
                ids.len(),
                all_announcements.len()
            );
        }

        Ok(UserDetail {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar: user.avatar,
            all_announcements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::{ConsistencyManager, DEFAULT_TXN_TIMEOUT};
    use crate::memory::MemoryStore;
    use crate::model::AnnouncementFields;
    use crate::testing::StubUploader;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Grace".to_string(),
            email: email.to_string(),
            avatar: "https://img/grace.png".to_string(),
        }
    }

    #[tokio::test]
    async fn register_is_idempotent_per_email() {
        let users = UserDirectory::new(Arc::new(MemoryStore::new()));

        let first = users.register(new_user("grace@example.com")).await.unwrap();
        let second = users.register(new_user("grace@example.com")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(users.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn detail_resolves_announcements() {
        let store = Arc::new(MemoryStore::new());
        let users = UserDirectory::new(store.clone());
        let manager = ConsistencyManager::new(
            store.clone(),
            Arc::new(StubUploader::new()),
            DEFAULT_TXN_TIMEOUT,
        );

        let user = users.register(new_user("grace@example.com")).await.unwrap();
        let id = manager
            .create_announcement_for_user(
                "grace@example.com",
                AnnouncementFields {
                    title: "Compiler talk".to_string(),
                    description: "Friday".to_string(),
                    announcement_type: "event".to_string(),
                },
                "data:,x",
            )
            .await
            .unwrap();

        let detail = users.get_detail(user.id).await.unwrap();
        assert_eq!(detail.all_announcements.len(), 1);
        assert_eq!(detail.all_announcements[0].id, id);
    }

    #[tokio::test]
    async fn detail_of_unknown_user_is_not_found() {
        let users = UserDirectory::new(Arc::new(MemoryStore::new()));
        assert!(users.get_detail(Ulid::new()).await.unwrap_err().is_not_found());
    }
}
