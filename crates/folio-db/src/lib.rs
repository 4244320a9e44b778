//! # folio-db
//!
//! Durable backends for folio.
//!
//! This crate provides:
//! - Connection pool management and schema migrations
//! - PostgreSQL repositories for projects, notes, mind maps and saved PDFs
//! - Blob stores: local filesystem and hosted object storage over HTTP
//! - An identity provider for the hosted auth service
//! - An in-memory backend for tests and demos
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_db::{Database, FilesystemBackend};
//! use folio_core::StaticIdentity;
//!
//! let db = Database::connect("postgres://localhost/folio").await?;
//! db.migrate().await?;
//! let backend = db.backend(
//!     FilesystemBackend::new("./folio-data/blobs"),
//!     StaticIdentity::user(user_id),
//! );
//! ```

pub mod auth;
pub mod file_storage;
pub mod hosted;
pub mod memory;
pub mod mindmap;
pub mod notes;
pub mod pool;
pub mod projects;
pub mod saved_pdfs;
pub mod storage_http;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use std::sync::Arc;

// Re-export core types
pub use folio_core::*;

pub use auth::HttpIdentityProvider;
pub use file_storage::FilesystemBackend;
pub use hosted::HostedConfig;
pub use memory::{Fault, MemoryBackend};
pub use mindmap::PgMindMapRepository;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig, PoolStats};
pub use projects::PgProjectRepository;
pub use saved_pdfs::PgSavedPdfRepository;
pub use storage_http::HttpBlobStore;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub projects: Arc<PgProjectRepository>,
    pub notes: Arc<PgNoteRepository>,
    pub mindmap: Arc<PgMindMapRepository>,
    pub pdfs: Arc<PgSavedPdfRepository>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            projects: Arc::new(PgProjectRepository::new(pool.clone())),
            notes: Arc::new(PgNoteRepository::new(pool.clone())),
            mindmap: Arc::new(PgMindMapRepository::new(pool.clone())),
            pdfs: Arc::new(PgSavedPdfRepository::new(pool.clone())),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Bundle the repositories with a blob store and identity provider.
    pub fn backend(
        &self,
        blobs: impl BlobStore + 'static,
        identity: impl IdentityProvider + 'static,
    ) -> Backend {
        self.backend_with(Arc::new(blobs), Arc::new(identity))
    }

    /// Like [`backend`](Self::backend), for collaborators that are already shared.
    pub fn backend_with(
        &self,
        blobs: Arc<dyn BlobStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Backend {
        Backend {
            projects: self.projects.clone(),
            notes: self.notes.clone(),
            mindmap: self.mindmap.clone(),
            pdfs: self.pdfs.clone(),
            blobs,
            identity,
        }
    }
}
