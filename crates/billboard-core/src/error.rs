// ABOUTME: Error taxonomy for billboard: not-found, upload, inconsistency, and store failures.
// ABOUTME: Backend crates convert their own errors into StoreError at the port boundary.

use std::time::Duration;

use thiserror::Error;
use ulid::Ulid;

/// Failures reported by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("corrupt document: {0}")]
    Corrupt(String),

    #[error("transaction exceeded {0:?} and was aborted")]
    TransactionTimedOut(Duration),
}

/// Failures reported by the image upload collaborator.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image upload is not configured")]
    NotConfigured,

    #[error("image upload failed: {0}")]
    Failed(String),

    #[error("invalid upload response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by the repository, consistency manager, and user directory.
#[derive(Debug, Error)]
pub enum BillboardError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, key: String },

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("announcement {announcement} references missing creator {creator}")]
    Inconsistency { announcement: Ulid, creator: Ulid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BillboardError {
    pub fn announcement_not_found(id: Ulid) -> Self {
        Self::NotFound {
            entity: "Announcement",
            key: id.to_string(),
        }
    }

    pub fn user_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "User",
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_only() {
        let err = BillboardError::user_not_found("nobody@example.com");
        assert_eq!(err.to_string(), "User not found");
        assert!(err.is_not_found());

        let err = BillboardError::announcement_not_found(Ulid::new());
        assert_eq!(err.to_string(), "Announcement not found");
    }

    #[test]
    fn store_and_upload_errors_pass_through() {
        let err: BillboardError = StoreError::Backend("disk full".to_string()).into();
        assert_eq!(err.to_string(), "store backend error: disk full");
        assert!(!err.is_not_found());

        let err: BillboardError = UploadError::NotConfigured.into();
        assert_eq!(err.to_string(), "image upload is not configured");
    }

    #[test]
    fn inconsistency_mentions_both_ids() {
        let announcement = Ulid::new();
        let creator = Ulid::new();
        let err = BillboardError::Inconsistency {
            announcement,
            creator,
        };
        let msg = err.to_string();
        assert!(msg.contains(&announcement.to_string()));
        assert!(msg.contains(&creator.to_string()));
    }
}
