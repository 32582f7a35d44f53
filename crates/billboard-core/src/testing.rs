// ABOUTME: Test utilities for billboard: stub uploaders and a fault-injecting store wrapper.
// ABOUTME: Used in tests to drive failures inside a unit of work without a real backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ulid::Ulid;

use crate::error::{StoreError, UploadError};
use crate::model::{Announcement, User};
use crate::query::AnnouncementQuery;
use crate::store::{DocumentStore, UnitOfWork};
use crate::upload::ImageUploader;

/// An uploader that returns a predictable URL for every upload and counts calls.
#[derive(Debug, Default)]
pub struct StubUploader {
    calls: AtomicUsize,
}

impl StubUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The URL returned for the n-th upload (1-based).
    pub fn url_for(n: usize) -> String {
        format!("https://images.test/upload/{}.png", n)
    }
}

#[async_trait]
impl ImageUploader for StubUploader {
    async fn upload(&self, _raw: &str) -> Result<String, UploadError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Self::url_for(n))
    }
}

/// An uploader whose every call fails.
#[derive(Debug, Default)]
pub struct FailingUploader;

#[async_trait]
impl ImageUploader for FailingUploader {
    async fn upload(&self, _raw: &str) -> Result<String, UploadError> {
        Err(UploadError::Failed("stub upload failure".to_string()))
    }
}

/// Where a [`FaultyStore`] should misbehave inside a unit of work.
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// `save_user` returns a backend error.
    FailSaveUser,
    /// `commit` returns a backend error without committing.
    FailCommit,
    /// `save_user` sleeps for the given duration before delegating.
    StallSaveUser(Duration),
}

/// Wraps a real store and injects a [`Fault`] into every unit of work it opens.
/// Plain reads and writes pass straight through.
pub struct FaultyStore {
    inner: Arc<dyn DocumentStore>,
    fault: Fault,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn DocumentStore>, fault: Fault) -> Self {
        Self { inner, fault }
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn find_user(&self, id: Ulid) -> Result<Option<User>, StoreError> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_email(email).await
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.inner.list_users().await
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner.insert_user(user).await
    }

    async fn find_announcement(&self, id: Ulid) -> Result<Option<Announcement>, StoreError> {
        self.inner.find_announcement(id).await
    }

    async fn find_announcements(&self, ids: &[Ulid]) -> Result<Vec<Announcement>, StoreError> {
        self.inner.find_announcements(ids).await
    }

    async fn query_announcements(
        &self,
        query: &AnnouncementQuery,
    ) -> Result<(Vec<Announcement>, u64), StoreError> {
        self.inner.query_announcements(query).await
    }

    async fn replace_announcement(&self, announcement: &Announcement) -> Result<bool, StoreError> {
        self.inner.replace_announcement(announcement).await
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FaultyUnitOfWork {
            inner,
            fault: self.fault,
        }))
    }
}

struct FaultyUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    fault: Fault,
}

#[async_trait]
impl UnitOfWork for FaultyUnitOfWork {
    async fn find_user(&mut self, id: Ulid) -> Result<Option<User>, StoreError> {
        self.inner.find_user(id).await
    }

    async fn insert_announcement(&mut self, announcement: &Announcement) -> Result<(), StoreError> {
        self.inner.insert_announcement(announcement).await
    }

    async fn delete_announcement(&mut self, id: Ulid) -> Result<bool, StoreError> {
        self.inner.delete_announcement(id).await
    }

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        match self.fault {
            Fault::FailSaveUser => Err(StoreError::Backend(
                "injected save_user failure".to_string(),
            )),
            Fault::StallSaveUser(delay) => {
                tokio::time::sleep(delay).await;
                self.inner.save_user(user).await
            }
            Fault::FailCommit => self.inner.save_user(user).await,
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        match self.fault {
            Fault::FailCommit => {
                self.inner.abort().await?;
                Err(StoreError::Backend("injected commit failure".to_string()))
            }
            _ => self.inner.commit().await,
        }
    }

    async fn abort(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.abort().await
    }
}
