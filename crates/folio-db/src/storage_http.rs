//! Blob store backed by a hosted object-storage REST API.
//!
//! Speaks the Supabase Storage dialect:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | upload    | `POST /storage/v1/object/{bucket}/{path}` (raw body) |
//! | download  | `GET /storage/v1/object/{bucket}/{path}` |
//! | remove    | `DELETE /storage/v1/object/{bucket}` with `{"prefixes": [...]}` |
//! | exists    | `HEAD /storage/v1/object/{bucket}/{path}` |

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use serde_json::json;
use tracing::{debug, info};

use folio_core::defaults::PDF_BUCKET;
use folio_core::{BlobStore, Error, Result};

use crate::hosted::{error_message, HostedClient, HostedConfig};

/// Hosted object storage client for a single bucket.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: HostedClient,
    bucket: String,
}

impl HttpBlobStore {
    /// Create a store for the default `pdfs` bucket.
    pub fn new(config: HostedConfig) -> Result<Self> {
        Self::with_bucket(config, PDF_BUCKET)
    }

    pub fn with_bucket(config: HostedConfig, bucket: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        info!(
            subsystem = "storage",
            component = "http",
            base_url = %config.base_url,
            bucket = %bucket,
            "Initializing hosted blob store"
        );
        Ok(Self {
            client: HostedClient::new(config)?,
            bucket,
        })
    }

    fn object_url(&self, path: &str) -> Result<reqwest::Url> {
        let mut segments = vec!["storage", "v1", "object", self.bucket.as_str()];
        segments.extend(path.split('/'));
        self.client.url(segments)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, path: &str, data: &[u8], content_type: &str) -> Result<()> {
        debug!(
            subsystem = "storage",
            component = "http",
            storage_path = %path,
            file_size = data.len(),
            "Uploading blob"
        );
        let request = self
            .client
            .http()
            .post(self.object_url(path)?)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(data.to_vec());
        let response = self.client.authorize(request).send().await?;

        if !response.status().is_success() {
            return Err(Error::Storage(format!(
                "upload failed: {}",
                error_message(response).await
            )));
        }
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let request = self.client.http().get(self.object_url(path)?);
        let response = self.client.authorize(request).send().await?;

        match response.status() {
            s if s.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("blob {}", path))),
            _ => Err(Error::Storage(format!(
                "download failed: {}",
                error_message(response).await
            ))),
        }
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.client.url(["storage", "v1", "object", self.bucket.as_str()])?;
        let request = self
            .client
            .http()
            .delete(url)
            .json(&json!({ "prefixes": paths }));
        let response = self.client.authorize(request).send().await?;

        if !response.status().is_success() {
            return Err(Error::Storage(format!(
                "remove failed: {}",
                error_message(response).await
            )));
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let request = self.client.http().head(self.object_url(path)?);
        let response = self.client.authorize(request).send().await?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(false),
            s => Err(Error::Storage(format!("exists check failed: {}", s))),
        }
    }
}
