//! Snapshot save/load/delete between a [`Workspace`] and a persisted project.
//!
//! Every protocol is a sequence of independent remote calls with no
//! surrounding transaction. A failure aborts the remaining steps and leaves
//! completed writes in place; an uploaded blob whose row insert failed stays
//! orphaned and is only logged.
//!
//! Each protocol first resolves the identity and confirms it owns the
//! project. A save writes the new PDF before touching the previous snapshot,
//! so a rejected or failed upload leaves the project as it was.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use folio_core::{
    require_identity, Backend, EdgeRow, Error, Identity, NewSavedPdf, NodeRow, NoteRow, PdfFile,
    Project, QuotaPolicy, Result, SavedPdf, Workspace, WorkspaceSnapshot,
};

/// Counts of what a save wrote or a load installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub pdf_name: Option<String>,
    pub notes: usize,
    pub nodes: usize,
    pub edges: usize,
}

/// Converts workspace snapshots to and from durable project records.
#[derive(Clone)]
pub struct SyncEngine {
    backend: Backend,
    quota: QuotaPolicy,
}

impl SyncEngine {
    pub fn new(backend: Backend) -> Self {
        Self::with_quota(backend, QuotaPolicy::default())
    }

    pub fn with_quota(backend: Backend, quota: QuotaPolicy) -> Self {
        Self { backend, quota }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn quota(&self) -> &QuotaPolicy {
        &self.quota
    }

    /// Sum of the byte sizes of the project's saved PDFs.
    pub async fn project_aggregate_size(&self, project_id: Uuid) -> Result<u64> {
        self.backend.pdfs.total_size(project_id).await
    }

    /// Write the workspace's PDF, notes and mind map into `project_id`,
    /// replacing whatever the project held before.
    ///
    /// The error of a failed save is also stored on the workspace. The
    /// loading flag is cleared on every exit path.
    pub async fn save_to_project(
        &self,
        workspace: &mut Workspace,
        project_id: Uuid,
    ) -> Result<SyncSummary> {
        workspace.set_loading(true);
        workspace.set_error(None);
        let start = Instant::now();

        let snapshot = workspace.snapshot();
        let result = self.save_snapshot(&snapshot, project_id).await;

        match &result {
            Ok(summary) => info!(
                subsystem = "sync",
                op = "save",
                project_id = %project_id,
                note_count = summary.notes,
                node_count = summary.nodes,
                edge_count = summary.edges,
                duration_ms = start.elapsed().as_millis() as u64,
                "Project saved"
            ),
            Err(e) => {
                warn!(
                    subsystem = "sync",
                    op = "save",
                    project_id = %project_id,
                    error = %e,
                    "Project save failed"
                );
                workspace.set_error(Some(e.to_string()));
            }
        }
        workspace.set_loading(false);
        result
    }

    async fn save_snapshot(
        &self,
        snapshot: &WorkspaceSnapshot,
        project_id: Uuid,
    ) -> Result<SyncSummary> {
        let identity = require_identity(self.backend.identity.as_ref()).await?;
        if let Some(pdf) = &snapshot.pdf_file {
            self.quota.ensure_can_admit_file(pdf.size())?;
        }
        self.owned_project(&identity, project_id).await?;

        let user_id = identity.user_id;
        let notes = snapshot
            .notes
            .iter()
            .map(|n| NoteRow::from_note(n, project_id, user_id))
            .collect::<Result<Vec<NoteRow>>>()?;
        let nodes: Vec<NodeRow> = snapshot
            .nodes
            .iter()
            .map(|n| NodeRow::from_node(n, project_id, user_id))
            .collect();
        let edges: Vec<EdgeRow> = snapshot
            .edges
            .iter()
            .map(|e| EdgeRow::from_edge(e, project_id, user_id))
            .collect();

        let previous = self.backend.pdfs.list_for_project(project_id).await?;
        let mut summary = SyncSummary::default();
        let mut new_key = None;

        if let Some(pdf) = &snapshot.pdf_file {
            let replaced: u64 = previous.iter().map(|p| p.file_size.max(0) as u64).sum();
            let retained = self
                .project_aggregate_size(project_id)
                .await?
                .saturating_sub(replaced);
            self.quota.ensure_can_admit_to_project(retained, pdf.size())?;

            let storage_path = storage_key(project_id, &pdf.name);
            self.backend
                .blobs
                .upload(&storage_path, &pdf.bytes, &pdf.content_type)
                .await?;
            debug!(
                subsystem = "sync",
                op = "save",
                storage_path = %storage_path,
                file_size = pdf.size(),
                "PDF uploaded"
            );

            self.backend
                .pdfs
                .insert(NewSavedPdf {
                    project_id,
                    name: pdf.name.clone(),
                    storage_path: storage_path.clone(),
                    file_size: pdf.size() as i64,
                })
                .await
                .inspect_err(|e| {
                    warn!(
                        subsystem = "sync",
                        op = "save",
                        storage_path = %storage_path,
                        error = %e,
                        "PDF row insert failed; uploaded blob is orphaned"
                    )
                })?;
            summary.pdf_name = Some(pdf.name.clone());
            new_key = Some(storage_path);
        }

        self.delete_workspace_rows(project_id).await?;

        if !notes.is_empty() {
            summary.notes = notes.len();
            self.backend.notes.insert_bulk(notes).await?;
        }
        if !nodes.is_empty() {
            summary.nodes = nodes.len();
            self.backend.mindmap.insert_nodes(nodes).await?;
        }
        if !edges.is_empty() {
            summary.edges = edges.len();
            self.backend.mindmap.insert_edges(edges).await?;
        }

        self.retire_pdfs(project_id, previous, new_key.as_deref())
            .await?;
        Ok(summary)
    }

    /// Drop the PDF rows a save superseded, then their blobs. A blob still
    /// referenced by the new row is kept.
    async fn retire_pdfs(
        &self,
        project_id: Uuid,
        previous: Vec<SavedPdf>,
        keep_key: Option<&str>,
    ) -> Result<()> {
        if previous.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = previous.iter().map(|p| p.id).collect();
        self.backend.pdfs.delete_many(&ids).await?;

        let keys: Vec<String> = previous
            .into_iter()
            .map(|p| p.storage_path)
            .filter(|k| Some(k.as_str()) != keep_key)
            .collect();
        self.remove_blobs(project_id, &keys).await;
        Ok(())
    }

    /// Fetch a project the current identity owns.
    ///
    /// Projects of other owners are reported as not found.
    pub async fn project(&self, project_id: Uuid) -> Result<Project> {
        let identity = require_identity(self.backend.identity.as_ref()).await?;
        self.owned_project(&identity, project_id).await
    }

    async fn owned_project(&self, identity: &Identity, project_id: Uuid) -> Result<Project> {
        self.backend
            .projects
            .get(identity.user_id, project_id)
            .await?
            .ok_or(Error::ProjectNotFound(project_id))
    }

    /// Replace the workspace's PDF, notes, nodes and edges with the project's
    /// persisted state. Steps run in that order; a failure keeps whatever was
    /// installed before it.
    pub async fn load_from_project(
        &self,
        workspace: &mut Workspace,
        project_id: Uuid,
    ) -> Result<SyncSummary> {
        workspace.set_loading(true);
        workspace.set_error(None);
        let start = Instant::now();

        let result = self.load_into(workspace, project_id).await;

        match &result {
            Ok(summary) => info!(
                subsystem = "sync",
                op = "load",
                project_id = %project_id,
                note_count = summary.notes,
                node_count = summary.nodes,
                edge_count = summary.edges,
                duration_ms = start.elapsed().as_millis() as u64,
                "Project loaded"
            ),
            Err(e) => {
                warn!(
                    subsystem = "sync",
                    op = "load",
                    project_id = %project_id,
                    error = %e,
                    "Project load failed"
                );
                workspace.set_error(Some(e.to_string()));
            }
        }
        workspace.set_loading(false);
        result
    }

    async fn load_into(&self, workspace: &mut Workspace, project_id: Uuid) -> Result<SyncSummary> {
        self.project(project_id).await?;
        let mut summary = SyncSummary::default();

        let newest = self
            .backend
            .pdfs
            .list_for_project(project_id)
            .await?
            .into_iter()
            .next();
        match newest {
            Some(saved) => {
                let bytes = self.backend.blobs.download(&saved.storage_path).await?;
                summary.pdf_name = Some(saved.name.clone());
                workspace.set_pdf_file(Some(PdfFile::from_storage(saved.name, bytes)))?;
            }
            None => workspace.set_pdf_file(None)?,
        }

        let notes: Vec<_> = self
            .backend
            .notes
            .list_for_project(project_id)
            .await?
            .into_iter()
            .map(NoteRow::into_note)
            .collect();
        summary.notes = notes.len();
        workspace.replace_notes(notes);

        let nodes: Vec<_> = self
            .backend
            .mindmap
            .list_nodes(project_id)
            .await?
            .into_iter()
            .map(NodeRow::into_node)
            .collect();
        summary.nodes = nodes.len();
        workspace.replace_nodes(nodes);

        let edges: Vec<_> = self
            .backend
            .mindmap
            .list_edges(project_id)
            .await?
            .into_iter()
            .map(EdgeRow::into_edge)
            .collect();
        summary.edges = edges.len();
        workspace.replace_edges(edges);

        Ok(summary)
    }

    /// Delete a project with all of its rows and blobs.
    ///
    /// Blob removal failure is logged and does not stop the project row from
    /// being deleted.
    pub async fn delete_project(&self, project_id: Uuid) -> Result<()> {
        let start = Instant::now();
        let identity = require_identity(self.backend.identity.as_ref()).await?;
        self.owned_project(&identity, project_id).await?;

        let keys = self.storage_keys(project_id).await?;
        self.delete_children(project_id).await?;
        self.remove_blobs(project_id, &keys).await;
        self.backend
            .projects
            .delete(identity.user_id, project_id)
            .await?;

        info!(
            subsystem = "sync",
            op = "delete",
            project_id = %project_id,
            blob_count = keys.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Project deleted"
        );
        Ok(())
    }

    async fn storage_keys(&self, project_id: Uuid) -> Result<Vec<String>> {
        Ok(self
            .backend
            .pdfs
            .list_for_project(project_id)
            .await?
            .into_iter()
            .map(|p| p.storage_path)
            .collect())
    }

    async fn delete_children(&self, project_id: Uuid) -> Result<()> {
        self.delete_workspace_rows(project_id).await?;
        let pdfs = self.backend.pdfs.delete_for_project(project_id).await?;
        debug!(
            subsystem = "sync",
            project_id = %project_id,
            pdf_count = pdfs,
            "PDF rows deleted"
        );
        Ok(())
    }

    /// Delete the project's notes, edges and nodes, in that order.
    async fn delete_workspace_rows(&self, project_id: Uuid) -> Result<()> {
        let notes = self.backend.notes.delete_for_project(project_id).await?;
        let edges = self.backend.mindmap.delete_edges_for_project(project_id).await?;
        let nodes = self.backend.mindmap.delete_nodes_for_project(project_id).await?;
        debug!(
            subsystem = "sync",
            project_id = %project_id,
            note_count = notes,
            edge_count = edges,
            node_count = nodes,
            "Workspace rows deleted"
        );
        Ok(())
    }

    async fn remove_blobs(&self, project_id: Uuid, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        if let Err(e) = self.backend.blobs.remove(keys).await {
            warn!(
                subsystem = "sync",
                project_id = %project_id,
                blob_count = keys.len(),
                error = %e,
                "Blob removal failed; objects are orphaned"
            );
        }
    }
}

/// Storage key `{project_id}/{unix_millis}-{filename}`. Path separators in
/// the filename are replaced so the key stays two segments deep.
pub fn storage_key(project_id: Uuid, file_name: &str) -> String {
    let name: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}/{}-{}", project_id, Utc::now().timestamp_millis(), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_shape() {
        let id = Uuid::nil();
        let key = storage_key(id, "thesis.pdf");
        let (prefix, rest) = key.split_once('/').unwrap();
        assert_eq!(prefix, id.to_string());
        let (millis, name) = rest.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert_eq!(name, "thesis.pdf");
    }

    #[test]
    fn test_storage_key_flattens_separators() {
        let key = storage_key(Uuid::nil(), "../etc/x.pdf");
        assert_eq!(key.matches('/').count(), 1);
        assert!(key.ends_with("-.._etc_x.pdf"));
    }
}
