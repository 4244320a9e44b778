//! Core traits for folio's storage seams.
//!
//! The Sync Engine and Project Directory are written against these traits;
//! concrete backends (PostgreSQL, filesystem, hosted HTTP storage, in-memory)
//! live in `folio-db`.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// ROW STORE TRAITS
// =============================================================================

/// Repository for the `projects` table.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// List the owner's projects with derived counts, most recently updated first.
    async fn list_details(&self, owner_id: Uuid) -> Result<Vec<ProjectDetails>>;

    /// Number of projects the owner currently has.
    async fn count(&self, owner_id: Uuid) -> Result<usize>;

    /// Insert a project and return the stored row.
    async fn insert(&self, owner_id: Uuid, req: CreateProjectRequest) -> Result<Project>;

    /// Fetch one of the owner's projects. Another owner's project is `None`.
    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Project>>;

    /// Apply a partial update, refreshing `updated_at`, and return the stored
    /// row. Fails with `ProjectNotFound` unless the owner holds the project.
    async fn update(&self, owner_id: Uuid, id: Uuid, patch: &ProjectPatch) -> Result<Project>;

    /// Delete the owner's project row.
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()>;
}

/// Repository for the `notes` table.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert all rows in one call.
    async fn insert_bulk(&self, rows: Vec<NoteRow>) -> Result<()>;

    /// All notes of a project in display order.
    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<NoteRow>>;

    /// Delete every note of a project. Returns the number removed.
    async fn delete_for_project(&self, project_id: Uuid) -> Result<u64>;
}

/// Repository for the `mindmap_nodes` and `mindmap_edges` tables.
#[async_trait]
pub trait MindMapRepository: Send + Sync {
    async fn insert_nodes(&self, rows: Vec<NodeRow>) -> Result<()>;

    async fn insert_edges(&self, rows: Vec<EdgeRow>) -> Result<()>;

    async fn list_nodes(&self, project_id: Uuid) -> Result<Vec<NodeRow>>;

    /// Edges in insertion order.
    async fn list_edges(&self, project_id: Uuid) -> Result<Vec<EdgeRow>>;

    /// Delete every edge of a project. Returns the number removed.
    async fn delete_edges_for_project(&self, project_id: Uuid) -> Result<u64>;

    /// Delete every node of a project. Returns the number removed.
    async fn delete_nodes_for_project(&self, project_id: Uuid) -> Result<u64>;
}

/// Repository for the `saved_pdfs` table.
#[async_trait]
pub trait SavedPdfRepository: Send + Sync {
    async fn insert(&self, req: NewSavedPdf) -> Result<SavedPdf>;

    /// PDFs of a project, newest first.
    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<SavedPdf>>;

    /// Sum of `file_size` over the project's PDFs.
    async fn total_size(&self, project_id: Uuid) -> Result<u64>;

    /// Delete the given PDF rows. Returns the number removed.
    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64>;

    /// Delete every PDF row of a project. Returns the number removed.
    async fn delete_for_project(&self, project_id: Uuid) -> Result<u64>;
}

// =============================================================================
// BLOB STORE
// =============================================================================

/// Keyed binary object storage for PDF files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `path`.
    async fn upload(&self, path: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Read the object stored under `path`.
    async fn download(&self, path: &str) -> Result<Vec<u8>>;

    /// Remove a batch of objects. Missing keys are not an error.
    async fn remove(&self, paths: &[String]) -> Result<()>;

    /// Check if an object exists under `path`.
    async fn exists(&self, path: &str) -> Result<bool>;
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Supplies the currently authenticated identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means "not authenticated"; `Err` means the provider failed.
    async fn current_identity(&self) -> Result<Option<Identity>>;
}

/// Identity provider returning a fixed identity, or none.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    identity: Option<Identity>,
}

impl StaticIdentity {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn user(user_id: Uuid) -> Self {
        Self::new(Identity::new(user_id))
    }

    pub fn anonymous() -> Self {
        Self { identity: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_identity(&self) -> Result<Option<Identity>> {
        Ok(self.identity.clone())
    }
}

/// Resolve the identity or fail with "User not authenticated".
pub async fn require_identity(provider: &dyn IdentityProvider) -> Result<Identity> {
    provider
        .current_identity()
        .await?
        .ok_or_else(crate::Error::not_authenticated)
}

// =============================================================================
// BACKEND BUNDLE
// =============================================================================

/// Handles to every collaborator the sync layer talks to.
#[derive(Clone)]
pub struct Backend {
    pub projects: Arc<dyn ProjectRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub mindmap: Arc<dyn MindMapRepository>,
    pub pdfs: Arc<dyn SavedPdfRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_identity_user() {
        let id = Uuid::new_v4();
        let provider = StaticIdentity::user(id);
        let identity = require_identity(&provider).await.unwrap();
        assert_eq!(identity.user_id, id);
    }

    #[tokio::test]
    async fn test_static_identity_anonymous_is_unauthorized() {
        let provider = StaticIdentity::anonymous();
        let err = require_identity(&provider).await.unwrap_err();
        assert!(matches!(err, crate::Error::Unauthorized(_)));
        assert_eq!(err.to_string(), "User not authenticated");
    }
}
