// ABOUTME: Ports for the document store: single-document reads/writes and units of work.
// ABOUTME: Backends (in-memory, SQLite) implement these traits; the core flows only see the traits.

use async_trait::async_trait;
use ulid::Ulid;

use crate::error::StoreError;
use crate::model::{Announcement, User};
use crate::query::AnnouncementQuery;

/// A document store holding the `User` and `Announcement` collections.
///
/// Reads and single-document writes are issued directly. Writes that must land
/// together go through [`DocumentStore::begin`], which returns a unit of work
/// that is invisible to other readers until it commits.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_user(&self, id: Ulid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Insert a new user. Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_announcement(&self, id: Ulid) -> Result<Option<Announcement>, StoreError>;

    /// Load the given announcements, skipping ids that no longer exist.
    async fn find_announcements(&self, ids: &[Ulid]) -> Result<Vec<Announcement>, StoreError>;

    /// Returns the requested page and the total number of filter matches.
    async fn query_announcements(
        &self,
        query: &AnnouncementQuery,
    ) -> Result<(Vec<Announcement>, u64), StoreError>;

    /// Overwrite title, description, type and photo of an existing announcement.
    /// The creator reference is never rewritten. Returns false if the id is unknown.
    async fn replace_announcement(&self, announcement: &Announcement) -> Result<bool, StoreError>;

    /// Start a unit of work. Only one unit of work is open at a time; readers
    /// wait for it to finish rather than observe its partial state.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Flush and release backend resources before process exit.
    async fn shutdown(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// A group of writes committed or aborted together.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// every write made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read a user as seen from inside this unit of work.
    async fn find_user(&mut self, id: Ulid) -> Result<Option<User>, StoreError>;

    async fn insert_announcement(&mut self, announcement: &Announcement) -> Result<(), StoreError>;

    /// Remove an announcement. Returns false if it did not exist.
    async fn delete_announcement(&mut self, id: Ulid) -> Result<bool, StoreError>;

    /// Persist the full user document, including its announcement set.
    async fn save_user(&mut self, user: &User) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn abort(self: Box<Self>) -> Result<(), StoreError>;
}
