// ABOUTME: Announcement repository: list with filter/page/sort, detail with creator, and update.
// ABOUTME: Update routes new photo data through the image uploader before storing the URL.

use std::sync::Arc;

use ulid::Ulid;

use crate::error::BillboardError;
use crate::model::{Announcement, AnnouncementDetail, AnnouncementPatch};
use crate::query::AnnouncementQuery;
use crate::store::DocumentStore;
use crate::upload::ImageUploader;

/// Read and update access to announcements. Creation and deletion live in
/// [`crate::ConsistencyManager`] because they also touch the creator.
#[derive(Clone)]
pub struct AnnouncementRepository {
    store: Arc<dyn DocumentStore>,
    uploader: Arc<dyn ImageUploader>,
}

impl AnnouncementRepository {
    pub fn new(store: Arc<dyn DocumentStore>, uploader: Arc<dyn ImageUploader>) -> Self {
        Self { store, uploader }
    }

    /// Returns the requested page and the number of announcements matching the
    /// filter, regardless of paging.
    pub async fn list(
        &self,
        query: &AnnouncementQuery,
    ) -> Result<(Vec<Announcement>, u64), BillboardError> {
        Ok(self.store.query_announcements(query).await?)
    }

    pub async fn get_by_id(&self, id: Ulid) -> Result<AnnouncementDetail, BillboardError> {
        let announcement = self
            .store
            .find_announcement(id)
            .await?
            .ok_or_else(|| BillboardError::announcement_not_found(id))?;

        let creator = self.store.find_user(announcement.creator).await?.ok_or(
            BillboardError::Inconsistency {
                announcement: id,
                creator: announcement.creator,
            },
        )?;

        Ok(announcement.populate(creator))
    }

    /// Apply `patch` and, when `raw_photo` is given, replace the photo with the
    /// uploaded URL. Without new photo data the stored URL is kept.
    pub async fn update_by_id(
        &self,
        id: Ulid,
        patch: AnnouncementPatch,
        raw_photo: Option<&str>,
    ) -> Result<Announcement, BillboardError> {
        let mut announcement = self
            .store
            .find_announcement(id)
            .await?
            .ok_or_else(|| BillboardError::announcement_not_found(id))?;

        if let Some(raw) = raw_photo {
            announcement.photo = self.uploader.upload(raw).await?;
        }
        patch.apply(&mut announcement);

        // The announcement may have been deleted while the photo uploaded.
        if !self.store.replace_announcement(&announcement).await? {
            return Err(BillboardError::announcement_not_found(id));
        }

        tracing::debug!("updated announcement {}", id);
        Ok(announcement)
    }
}
