// ABOUTME: In-memory DocumentStore used by tests and local runs without a database file.
// ABOUTME: A unit of work holds the collection lock and stages writes on a copy until commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use ulid::Ulid;

use crate::error::StoreError;
use crate::model::{Announcement, User};
use crate::query::AnnouncementQuery;
use crate::store::{DocumentStore, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct Collections {
    users: BTreeMap<Ulid, User>,
    announcements: BTreeMap<Ulid, Announcement>,
}

impl Collections {
    fn email_taken(&self, user: &User) -> bool {
        self.users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
    }
}

/// A DocumentStore backed by two maps behind a single async mutex.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored announcements. Handy for asserting nothing leaked.
    pub async fn announcement_count(&self) -> usize {
        self.inner.lock().await.announcements.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_user(&self, id: Ulid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let data = self.inner.lock().await;
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.inner.lock().await.users.values().cloned().collect())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut data = self.inner.lock().await;
        if data.users.contains_key(&user.id) || data.email_taken(user) {
            return Err(StoreError::Duplicate(user.email.clone()));
        }
        data.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_announcement(&self, id: Ulid) -> Result<Option<Announcement>, StoreError> {
        Ok(self.inner.lock().await.announcements.get(&id).cloned())
    }

    async fn find_announcements(&self, ids: &[Ulid]) -> Result<Vec<Announcement>, StoreError> {
        let data = self.inner.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| data.announcements.get(id).cloned())
            .collect())
    }

    async fn query_announcements(
        &self,
        query: &AnnouncementQuery,
    ) -> Result<(Vec<Announcement>, u64), StoreError> {
        let data = self.inner.lock().await;
        Ok(query.apply(data.announcements.values().cloned()))
    }

    async fn replace_announcement(&self, announcement: &Announcement) -> Result<bool, StoreError> {
        let mut data = self.inner.lock().await;
        match data.announcements.get_mut(&announcement.id) {
            Some(stored) => {
                stored.title = announcement.title.clone();
                stored.description = announcement.description.clone();
                stored.announcement_type = announcement.announcement_type.clone();
                stored.photo = announcement.photo.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, staged }))
    }
}

/// Staged writes over a snapshot of the collections. The guard keeps every
/// other reader and writer out until the unit of work is dropped.
struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Collections>,
    staged: Collections,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_user(&mut self, id: Ulid) -> Result<Option<User>, StoreError> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn insert_announcement(&mut self, announcement: &Announcement) -> Result<(), StoreError> {
        if self.staged.announcements.contains_key(&announcement.id) {
            return Err(StoreError::Duplicate(announcement.id.to_string()));
        }
        self.staged
            .announcements
            .insert(announcement.id, announcement.clone());
        Ok(())
    }

    async fn delete_announcement(&mut self, id: Ulid) -> Result<bool, StoreError> {
        Ok(self.staged.announcements.remove(&id).is_some())
    }

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        if self.staged.email_taken(user) {
            return Err(StoreError::Duplicate(user.email.clone()));
        }
        self.staged.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
