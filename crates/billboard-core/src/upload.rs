// ABOUTME: Port for the image upload collaborator that turns raw image data into a durable URL.
// ABOUTME: Includes DisabledUploader, used when no upload service is configured.

use async_trait::async_trait;

use crate::error::UploadError;

/// Uploads raw or encoded image data (a data URI or remote URL) and returns
/// the hosted URL.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, raw: &str) -> Result<String, UploadError>;
}

/// Uploader that rejects every upload. Installed when credentials are missing
/// so the rest of the API keeps working.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledUploader;

#[async_trait]
impl ImageUploader for DisabledUploader {
    async fn upload(&self, _raw: &str) -> Result<String, UploadError> {
        Err(UploadError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_uploader_always_fails() {
        let err = DisabledUploader.upload("data:image/png;base64,AAAA").await.unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured));
    }
}
