// ABOUTME: Consistency manager keeping each announcement and its creator's back-references in sync.
// ABOUTME: Create and delete run their two writes inside one time-bounded unit of work.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ulid::Ulid;

use crate::error::{BillboardError, StoreError};
use crate::model::{Announcement, AnnouncementFields};
use crate::store::{DocumentStore, UnitOfWork};
use crate::upload::ImageUploader;

/// Default upper bound on how long a unit of work may stay open.
pub const DEFAULT_TXN_TIMEOUT: Duration = Duration::from_secs(5);

/// Orchestrates the writes that span the `Announcement` and `User` collections.
///
/// Invariant: a user's `all_announcements` contains an id exactly when that
/// announcement exists and names the user as creator. Both sides are written
/// in one unit of work so readers never see one without the other.
#[derive(Clone)]
pub struct ConsistencyManager {
    store: Arc<dyn DocumentStore>,
    uploader: Arc<dyn ImageUploader>,
    txn_timeout: Duration,
}

impl ConsistencyManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        uploader: Arc<dyn ImageUploader>,
        txn_timeout: Duration,
    ) -> Self {
        Self {
            store,
            uploader,
            txn_timeout,
        }
    }

    /// Create an announcement owned by the user with `creator_email`.
    ///
    /// The user lookup and the photo upload both happen before the unit of work
    /// opens, so an unknown email or a failed upload leaves the store untouched
    /// and no lock is held during the upload.
    pub async fn create_announcement_for_user(
        &self,
        creator_email: &str,
        fields: AnnouncementFields,
        raw_photo: &str,
    ) -> Result<Ulid, BillboardError> {
        let creator = self
            .store
            .find_user_by_email(creator_email)
            .await?
            .ok_or_else(|| BillboardError::user_not_found(creator_email))?;

        let photo = self.uploader.upload(raw_photo).await?;
        let announcement = Announcement::new(fields, photo, creator.id);
        let id = announcement.id;

        self.within_deadline(async {
            let mut uow = self.store.begin().await?;
            let staged = async {
                // Re-read inside the unit of work so a concurrent create for the
                // same user is not overwritten by a stale copy.
                let mut owner = uow
                    .find_user(creator.id)
                    .await?
                    .ok_or_else(|| BillboardError::user_not_found(creator_email))?;
                uow.insert_announcement(&announcement).await?;
                owner.link(id);
                uow.save_user(&owner).await?;
                Ok::<(), BillboardError>(())
            }
            .await;
            settle(uow, staged).await
        })
        .await?;

        tracing::info!("created announcement {} for user {}", id, creator.id);
        Ok(id)
    }

    /// Delete an announcement and remove it from its creator's set.
    ///
    /// A missing announcement is NotFound. A missing creator is an
    /// Inconsistency and nothing is deleted.
    pub async fn delete_announcement(&self, id: Ulid) -> Result<(), BillboardError> {
        let announcement = self
            .store
            .find_announcement(id)
            .await?
            .ok_or_else(|| BillboardError::announcement_not_found(id))?;
        let creator_id = announcement.creator;
        let dangling = BillboardError::Inconsistency {
            announcement: id,
            creator: creator_id,
        };

        if self.store.find_user(creator_id).await?.is_none() {
            tracing::error!("announcement {} has no creator {}", id, creator_id);
            return Err(dangling);
        }

        self.within_deadline(async {
            let mut uow = self.store.begin().await?;
            let staged = async {
                let mut creator = uow.find_user(creator_id).await?.ok_or(dangling)?;
                if !uow.delete_announcement(id).await? {
                    return Err(BillboardError::announcement_not_found(id));
                }
                creator.unlink(id);
                uow.save_user(&creator).await?;
                Ok::<(), BillboardError>(())
            }
            .await;
            settle(uow, staged).await
        })
        .await?;

        tracing::info!("deleted announcement {} of user {}", id, creator_id);
        Ok(())
    }

    /// Run a unit of work under the configured timeout. On expiry the future,
    /// and with it the open unit of work, is dropped, which aborts it.
    async fn within_deadline<T, F>(&self, work: F) -> Result<T, BillboardError>
    where
        F: Future<Output = Result<T, BillboardError>>,
    {
        match tokio::time::timeout(self.txn_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "unit of work exceeded {:?}; aborting",
                    self.txn_timeout
                );
                Err(StoreError::TransactionTimedOut(self.txn_timeout).into())
            }
        }
    }
}

/// Commit when every staged write succeeded, abort otherwise.
async fn settle(
    uow: Box<dyn UnitOfWork>,
    staged: Result<(), BillboardError>,
) -> Result<(), BillboardError> {
    match staged {
        Ok(()) => Ok(uow.commit().await?),
        Err(err) => {
            if let Err(abort_err) = uow.abort().await {
                tracing::warn!("abort after failed write also failed: {}", abort_err);
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::User;
    use crate::testing::{FailingUploader, Fault, FaultyStore, StubUploader};

    const EMAIL: &str = "ada@example.com";

    fn fields(title: &str) -> AnnouncementFields {
        AnnouncementFields {
            title: title.to_string(),
            description: "Some words".to_string(),
            announcement_type: "event".to_string(),
        }
    }

    async fn seeded_store() -> (Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let user = User::new("Ada".to_string(), EMAIL.to_string(), String::new());
        store.insert_user(&user).await.unwrap();
        (store, user)
    }

    fn manager(store: Arc<dyn DocumentStore>) -> ConsistencyManager {
        ConsistencyManager::new(store, Arc::new(StubUploader::new()), DEFAULT_TXN_TIMEOUT)
    }

    #[tokio::test]
    async fn create_links_both_sides() {
        let (store, user) = seeded_store().await;
        let mgr = manager(store.clone());

        let id = mgr
            .create_announcement_for_user(EMAIL, fields("Meetup"), "data:,img")
            .await
            .unwrap();

        let announcement = store.find_announcement(id).await.unwrap().unwrap();
        assert_eq!(announcement.creator, user.id);
        assert_eq!(announcement.photo, StubUploader::url_for(1));

        let owner = store.find_user(user.id).await.unwrap().unwrap();
        assert!(owner.owns(id));
    }

    #[tokio::test]
    async fn create_for_unknown_email_is_not_found_and_uploads_nothing() {
        let (store, _) = seeded_store().await;
        let uploader = Arc::new(StubUploader::new());
        let mgr = ConsistencyManager::new(store.clone(), uploader.clone(), DEFAULT_TXN_TIMEOUT);

        let err = mgr
            .create_announcement_for_user("nobody@example.com", fields("Ghost"), "data:,img")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "User not found");
        assert_eq!(uploader.calls(), 0);
        assert_eq!(store.announcement_count().await, 0);
    }

    #[tokio::test]
    async fn create_with_failed_upload_leaves_store_unchanged() {
        let (store, user) = seeded_store().await;
        let mgr =
            ConsistencyManager::new(store.clone(), Arc::new(FailingUploader), DEFAULT_TXN_TIMEOUT);

        let err = mgr
            .create_announcement_for_user(EMAIL, fields("Meetup"), "data:,img")
            .await
            .unwrap_err();

        assert!(matches!(err, BillboardError::Upload(_)));
        assert_eq!(store.announcement_count().await, 0);
        let owner = store.find_user(user.id).await.unwrap().unwrap();
        assert!(owner.all_announcements.is_empty());
    }

    #[tokio::test]
    async fn create_aborted_mid_transaction_persists_neither_side() {
        let (store, user) = seeded_store().await;
        let faulty = Arc::new(FaultyStore::new(store.clone(), Fault::FailSaveUser));
        let mgr = manager(faulty);

        let err = mgr
            .create_announcement_for_user(EMAIL, fields("Meetup"), "data:,img")
            .await
            .unwrap_err();

        assert!(matches!(err, BillboardError::Store(_)));
        assert_eq!(store.announcement_count().await, 0, "no orphan announcement");
        let owner = store.find_user(user.id).await.unwrap().unwrap();
        assert!(owner.all_announcements.is_empty());
    }

    #[tokio::test]
    async fn create_with_failed_commit_persists_neither_side() {
        let (store, user) = seeded_store().await;
        let mgr = manager(Arc::new(FaultyStore::new(store.clone(), Fault::FailCommit)));

        assert!(
            mgr.create_announcement_for_user(EMAIL, fields("Meetup"), "data:,img")
                .await
                .is_err()
        );

        assert_eq!(store.announcement_count().await, 0);
        let owner = store.find_user(user.id).await.unwrap().unwrap();
        assert!(owner.all_announcements.is_empty());
    }

    #[tokio::test]
    async fn transaction_timeout_aborts_and_releases_the_store() {
        let (store, user) = seeded_store().await;
        let faulty = Arc::new(FaultyStore::new(
            store.clone(),
            Fault::StallSaveUser(Duration::from_secs(30)),
        ));
        let mgr = ConsistencyManager::new(
            faulty,
            Arc::new(StubUploader::new()),
            Duration::from_millis(20),
        );

        let err = mgr
            .create_announcement_for_user(EMAIL, fields("Slow"), "data:,img")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BillboardError::Store(StoreError::TransactionTimedOut(_))
        ));
        // The lock was released and nothing was committed.
        assert_eq!(store.announcement_count().await, 0);
        let owner = store.find_user(user.id).await.unwrap().unwrap();
        assert!(owner.all_announcements.is_empty());
    }

    #[tokio::test]
    async fn delete_unlinks_both_sides() {
        let (store, user) = seeded_store().await;
        let mgr = manager(store.clone());
        let keep = mgr
            .create_announcement_for_user(EMAIL, fields("Keep"), "data:,a")
            .await
            .unwrap();
        let gone = mgr
            .create_announcement_for_user(EMAIL, fields("Gone"), "data:,b")
            .await
            .unwrap();

        mgr.delete_announcement(gone).await.unwrap();

        assert!(store.find_announcement(gone).await.unwrap().is_none());
        let owner = store.find_user(user.id).await.unwrap().unwrap();
        assert!(!owner.owns(gone));
        assert!(owner.owns(keep), "other announcements stay linked");
    }

    #[tokio::test]
    async fn second_delete_is_not_found_and_leaves_former_creator_alone() {
        let (store, user) = seeded_store().await;
        let mgr = manager(store.clone());
        let id = mgr
            .create_announcement_for_user(EMAIL, fields("Once"), "data:,a")
            .await
            .unwrap();
        let other = mgr
            .create_announcement_for_user(EMAIL, fields("Other"), "data:,b")
            .await
            .unwrap();

        mgr.delete_announcement(id).await.unwrap();
        let before = store.find_user(user.id).await.unwrap().unwrap();

        let err = mgr.delete_announcement(id).await.unwrap_err();
        assert!(err.is_not_found());

        let after = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(before, after);
        assert!(after.owns(other));
    }

    #[tokio::test]
    async fn delete_with_missing_creator_is_inconsistency() {
        let store = Arc::new(MemoryStore::new());
        let orphan = Announcement::new(
            fields("Orphan"),
            "https://img/o.png".to_string(),
            Ulid::new(),
        );
        let mut uow = store.begin().await.unwrap();
        uow.insert_announcement(&orphan).await.unwrap();
        uow.commit().await.unwrap();

        let err = manager(store.clone())
            .delete_announcement(orphan.id)
            .await
            .unwrap_err();

        assert!(matches!(err, BillboardError::Inconsistency { .. }));
        assert!(
            store.find_announcement(orphan.id).await.unwrap().is_some(),
            "nothing is removed when the creator is missing"
        );
    }

    #[tokio::test]
    async fn delete_aborted_mid_transaction_keeps_both_documents() {
        let (store, user) = seeded_store().await;
        let id = manager(store.clone())
            .create_announcement_for_user(EMAIL, fields("Sticky"), "data:,a")
            .await
            .unwrap();

        let faulty = manager(Arc::new(FaultyStore::new(store.clone(), Fault::FailSaveUser)));
        assert!(faulty.delete_announcement(id).await.is_err());

        assert!(store.find_announcement(id).await.unwrap().is_some());
        let owner = store.find_user(user.id).await.unwrap().unwrap();
        assert!(owner.owns(id));
    }

    #[tokio::test]
    async fn concurrent_creates_for_one_user_all_link() {
        let (store, user) = seeded_store().await;
        let mgr = manager(store.clone());

        let mut tasks = Vec::new();
        for i in 0..8 {
            let mgr = mgr.clone();
            tasks.push(tokio::spawn(async move {
                mgr.create_announcement_for_user(EMAIL, fields(&format!("Post {}", i)), "data:,x")
                    .await
                    .unwrap()
            }));
        }
        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }

        let owner = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(owner.all_announcements.len(), 8);
        assert!(ids.iter().all(|id| owner.owns(*id)));
    }
}
