//! Shared client settings for the hosted storage/auth service.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;

use folio_core::defaults::HTTP_TIMEOUT_SECS;
use folio_core::{Error, Result};

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct HostedConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub base_url: String,
    /// Public (anon) API key sent as the `apikey` header.
    pub api_key: String,
    /// User access token; falls back to the API key when absent.
    pub access_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl HostedConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            access_token: None,
            timeout_seconds: HTTP_TIMEOUT_SECS,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// HTTP client bound to a [`HostedConfig`].
#[derive(Debug, Clone)]
pub(crate) struct HostedClient {
    client: Client,
    base: Url,
    config: HostedConfig,
}

impl HostedClient {
    pub(crate) fn new(config: HostedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        let base = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("Invalid API URL {}: {}", config.base_url, e)))?;
        Ok(Self {
            client,
            base,
            config,
        })
    }

    /// Build a URL from fixed and caller-supplied path segments; each segment
    /// is percent-encoded.
    pub(crate) fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("API URL cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the `apikey` and bearer authorization headers.
    pub(crate) fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let token = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.api_key);
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(token)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, alias = "msg")]
    error_description: Option<String>,
}

/// Extract a readable message from a non-success response.
pub(crate) async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.message.or(b.error_description).or(b.error))
        .unwrap_or(text);
    if detail.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_segments() {
        let client = HostedClient::new(HostedConfig::new("https://x.example.co/", "k")).unwrap();
        let url = client
            .url(["storage", "v1", "object", "pdfs", "p1", "1700-my paper.pdf"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://x.example.co/storage/v1/object/pdfs/p1/1700-my%20paper.pdf"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = HostedClient::new(HostedConfig::new("not a url", "k")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
