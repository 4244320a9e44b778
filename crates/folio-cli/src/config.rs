//! Runtime configuration read from the environment.
//!
//! Environment variables:
//!   DATABASE_URL             - PostgreSQL connection string
//!   FOLIO_STORAGE            - "filesystem" or "http" (default: "filesystem")
//!   FOLIO_STORAGE_PATH       - blob directory for filesystem storage
//!   FOLIO_API_URL            - hosted service URL (http storage)
//!   FOLIO_API_KEY            - hosted service public key (http storage)
//!   FOLIO_ACCESS_TOKEN       - user access token for the hosted service
//!   FOLIO_USER_ID            - fixed identity (the only source for filesystem storage)
//!   FOLIO_HTTP_TIMEOUT_SECS  - hosted request timeout
//!   FOLIO_MAX_PROJECTS       - project quota override
//!   FOLIO_MAX_FILE_BYTES     - file size quota override

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use uuid::Uuid;

use folio_core::defaults::{DATABASE_URL, FILE_STORAGE_PATH, HTTP_TIMEOUT_SECS};
use folio_core::{BlobStore, Error, IdentityProvider, QuotaPolicy, Result, StaticIdentity};
use folio_db::{FilesystemBackend, HostedConfig, HttpBlobStore, HttpIdentityProvider};

/// Where PDF blobs are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Filesystem,
    Http,
}

impl FromStr for StorageMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filesystem" | "fs" | "local" => Ok(Self::Filesystem),
            "http" | "hosted" => Ok(Self::Http),
            other => Err(Error::Config(format!(
                "FOLIO_STORAGE must be 'filesystem' or 'http', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub storage: StorageMode,
    pub storage_path: PathBuf,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub user_id: Option<Uuid>,
    pub http_timeout_secs: u64,
    pub quota: QuotaPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage = match get("FOLIO_STORAGE") {
            Some(v) => v.parse()?,
            None => StorageMode::Filesystem,
        };

        let user_id = get("FOLIO_USER_ID")
            .map(|v| {
                Uuid::parse_str(v.trim())
                    .map_err(|e| Error::Config(format!("FOLIO_USER_ID is not a UUID: {}", e)))
            })
            .transpose()?;

        let defaults = QuotaPolicy::default();
        let quota = QuotaPolicy {
            max_projects: parse_number(get("FOLIO_MAX_PROJECTS"), "FOLIO_MAX_PROJECTS")?
                .unwrap_or(defaults.max_projects),
            max_file_bytes: parse_number(get("FOLIO_MAX_FILE_BYTES"), "FOLIO_MAX_FILE_BYTES")?
                .unwrap_or(defaults.max_file_bytes),
            ..defaults
        };

        let config = Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DATABASE_URL.to_string()),
            storage,
            storage_path: get("FOLIO_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(FILE_STORAGE_PATH)),
            api_url: get("FOLIO_API_URL"),
            api_key: get("FOLIO_API_KEY"),
            access_token: get("FOLIO_ACCESS_TOKEN"),
            user_id,
            http_timeout_secs: parse_number(
                get("FOLIO_HTTP_TIMEOUT_SECS"),
                "FOLIO_HTTP_TIMEOUT_SECS",
            )?
            .unwrap_or(HTTP_TIMEOUT_SECS),
            quota,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage == StorageMode::Http && (self.api_url.is_none() || self.api_key.is_none())
        {
            return Err(Error::Config(
                "http storage requires FOLIO_API_URL and FOLIO_API_KEY".to_string(),
            ));
        }
        Ok(())
    }

    /// Hosted service settings, for http storage.
    pub fn hosted(&self) -> Result<HostedConfig> {
        let (Some(url), Some(key)) = (&self.api_url, &self.api_key) else {
            return Err(Error::Config(
                "FOLIO_API_URL and FOLIO_API_KEY are not set".to_string(),
            ));
        };
        let mut hosted = HostedConfig::new(url.clone(), key.clone());
        hosted.timeout_seconds = self.http_timeout_secs;
        if let Some(token) = &self.access_token {
            hosted = hosted.with_access_token(token.clone());
        }
        Ok(hosted)
    }

    pub fn blob_store(&self) -> Result<Arc<dyn BlobStore>> {
        match self.storage {
            StorageMode::Filesystem => {
                Ok(Arc::new(FilesystemBackend::new(self.storage_path.clone())))
            }
            StorageMode::Http => Ok(Arc::new(HttpBlobStore::new(self.hosted()?)?)),
        }
    }

    /// A fixed `FOLIO_USER_ID` wins. Otherwise http storage asks the hosted
    /// auth service, and filesystem storage acts anonymously.
    pub fn identity_provider(&self) -> Result<Arc<dyn IdentityProvider>> {
        if let Some(user_id) = self.user_id {
            return Ok(Arc::new(StaticIdentity::user(user_id)));
        }
        match self.storage {
            StorageMode::Http => Ok(Arc::new(HttpIdentityProvider::new(self.hosted()?)?)),
            StorageMode::Filesystem => Ok(Arc::new(StaticIdentity::anonymous())),
        }
    }
}

fn parse_number<T: FromStr>(value: Option<String>, key: &str) -> Result<Option<T>> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} must be a non-negative integer", key)))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.database_url, DATABASE_URL);
        assert_eq!(config.storage, StorageMode::Filesystem);
        assert_eq!(config.storage_path, PathBuf::from(FILE_STORAGE_PATH));
        assert_eq!(config.http_timeout_secs, HTTP_TIMEOUT_SECS);
        assert_eq!(config.quota, QuotaPolicy::default());
        assert!(config.user_id.is_none());
    }

    #[test]
    fn test_overrides() {
        let user = Uuid::new_v4();
        let user_str = user.to_string();
        let config = config(&[
            ("DATABASE_URL", "postgres://db/folio"),
            ("FOLIO_STORAGE_PATH", "/var/lib/folio"),
            ("FOLIO_USER_ID", &user_str),
            ("FOLIO_MAX_PROJECTS", "5"),
            ("FOLIO_MAX_FILE_BYTES", "2048"),
            ("FOLIO_HTTP_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.database_url, "postgres://db/folio");
        assert_eq!(config.storage_path, PathBuf::from("/var/lib/folio"));
        assert_eq!(config.user_id, Some(user));
        assert_eq!(config.quota.max_projects, 5);
        assert_eq!(config.quota.max_file_bytes, 2048);
        assert_eq!(
            config.quota.max_project_bytes,
            QuotaPolicy::default().max_project_bytes
        );
        assert_eq!(config.http_timeout_secs, 5);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config(&[("FOLIO_USER_ID", "  "), ("FOLIO_STORAGE", "")]).unwrap();
        assert!(config.user_id.is_none());
        assert_eq!(config.storage, StorageMode::Filesystem);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config(&[("FOLIO_STORAGE", "s3")]).unwrap_err(),
            Error::Config(_)
        ));
        assert!(matches!(
            config(&[("FOLIO_USER_ID", "not-a-uuid")]).unwrap_err(),
            Error::Config(_)
        ));
        assert!(matches!(
            config(&[("FOLIO_MAX_PROJECTS", "-1")]).unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn test_http_storage_requires_service_settings() {
        let err = config(&[("FOLIO_STORAGE", "http")]).unwrap_err();
        assert!(err.to_string().contains("FOLIO_API_URL"));

        let config = config(&[
            ("FOLIO_STORAGE", "HTTP"),
            ("FOLIO_API_URL", "https://example.test"),
            ("FOLIO_API_KEY", "anon"),
            ("FOLIO_ACCESS_TOKEN", "jwt"),
            ("FOLIO_HTTP_TIMEOUT_SECS", "7"),
        ])
        .unwrap();
        let hosted = config.hosted().unwrap();
        assert_eq!(hosted.base_url, "https://example.test");
        assert_eq!(hosted.access_token.as_deref(), Some("jwt"));
        assert_eq!(hosted.timeout_seconds, 7);
    }

    #[tokio::test]
    async fn test_filesystem_identity_without_user_is_anonymous() {
        let config = config(&[]).unwrap();
        let identity = config.identity_provider().unwrap();
        assert!(identity.current_identity().await.unwrap().is_none());

        let user = Uuid::new_v4();
        let user_str = user.to_string();
        let config = self::config(&[("FOLIO_USER_ID", &user_str)]).unwrap();
        let identity = config.identity_provider().unwrap();
        assert_eq!(
            identity.current_identity().await.unwrap().unwrap().user_id,
            user
        );
    }
}
