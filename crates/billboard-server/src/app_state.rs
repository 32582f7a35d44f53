// ABOUTME: Shared application state for the billboard HTTP server.
// ABOUTME: Wires the store and uploader into the repository, write flows, and user directory.

use std::sync::Arc;
use std::time::Duration;

use billboard_core::{
    AnnouncementRepository, ConsistencyManager, DocumentStore, ImageUploader, UserDirectory,
};

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub announcements: AnnouncementRepository,
    pub consistency: ConsistencyManager,
    pub users: UserDirectory,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build every service over the same store and uploader. `txn_timeout`
    /// bounds each create/delete unit of work.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        uploader: Arc<dyn ImageUploader>,
        txn_timeout: Duration,
    ) -> Self {
        Self {
            announcements: AnnouncementRepository::new(store.clone(), uploader.clone()),
            consistency: ConsistencyManager::new(store.clone(), uploader, txn_timeout),
            users: UserDirectory::new(store),
        }
    }
}
