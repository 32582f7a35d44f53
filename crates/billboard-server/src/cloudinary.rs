// ABOUTME: Cloudinary adapter implementing the ImageUploader port over its signed upload API.
// ABOUTME: Signs requests with SHA-256 and maps the JSON response to the hosted image URL.

use async_trait::async_trait;
use billboard_core::error::UploadError;
use billboard_core::upload::ImageUploader;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com";

/// Credentials and endpoint for the Cloudinary upload API.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
}

/// Uploads images with a signed `image/upload` request.
pub struct CloudinaryUploader {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryUploader {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    /// Signature over the signed parameters (only `timestamp` here) followed by the secret.
    pub fn sign(&self, timestamp: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("timestamp={}{}", timestamp, self.config.api_secret));
        hex::encode(hasher.finalize())
    }

    /// Extract the hosted URL from an upload response, preferring `secure_url`.
    pub fn parse_response(body: &Value) -> Result<String, UploadError> {
        body.get("secure_url")
            .or_else(|| body.get("url"))
            .and_then(|u| u.as_str())
            .filter(|u| !u.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| {
                UploadError::InvalidResponse("missing url in upload response".to_string())
            })
    }
}

#[async_trait]
impl ImageUploader for CloudinaryUploader {
    async fn upload(&self, raw: &str) -> Result<String, UploadError> {
        let timestamp = chrono::Utc::now().timestamp();
        let form = [
            ("file", raw.to_owned()),
            ("api_key", self.config.api_key.clone()),
            ("timestamp", timestamp.to_string()),
            ("signature", self.sign(timestamp)),
            ("signature_algorithm", "sha256".to_owned()),
        ];

        let response = self
            .client
            .post(self.upload_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| UploadError::Failed(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(UploadError::Failed(format!(
                "upload API error {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(format!("failed to parse JSON: {}", e)))?;

        let url = Self::parse_response(&body)?;
        tracing::debug!("uploaded image to {}", url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uploader(base_url: &str) -> CloudinaryUploader {
        CloudinaryUploader::new(CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key".to_string(),
            api_secret: "abcd".to_string(),
            base_url: base_url.to_string(),
        })
    }

    #[test]
    fn sign_is_sha256_of_timestamp_and_secret() {
        assert_eq!(
            uploader(DEFAULT_BASE_URL).sign(1_700_000_000),
            "29886ed878035abc09e29f7e8ce19b01d9f3caa3ad0851d5d5c2aaa5ab812369"
        );
    }

    #[test]
    fn upload_url_includes_cloud_name() {
        assert_eq!(
            uploader("https://api.cloudinary.com/").upload_url(),
            "https://api.cloudinary.com/v1_1/demo/image/upload"
        );
    }

    #[test]
    fn parse_response_prefers_secure_url() {
        let body = json!({
            "url": "http://res.cloudinary.com/demo/a.png",
            "secure_url": "https://res.cloudinary.com/demo/a.png"
        });
        assert_eq!(
            CloudinaryUploader::parse_response(&body).unwrap(),
            "https://res.cloudinary.com/demo/a.png"
        );

        let body = json!({ "url": "http://res.cloudinary.com/demo/b.png" });
        assert_eq!(
            CloudinaryUploader::parse_response(&body).unwrap(),
            "http://res.cloudinary.com/demo/b.png"
        );
    }

    #[test]
    fn parse_response_without_url_is_error() {
        let err = CloudinaryUploader::parse_response(&json!({ "error": { "message": "bad" } }))
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn upload_to_unreachable_host_fails() {
        // Port 9 on localhost is the discard port; nothing should be listening.
        let err = uploader("http://127.0.0.1:9").upload("data:,x").await.unwrap_err();
        assert!(matches!(err, UploadError::Failed(_)));
    }
}
