//! In-memory backend for tests and demos.
//!
//! [`MemoryBackend`] implements every storage trait over shared in-process
//! state. Clones share that state, so one instance can be handed out as all
//! six collaborators of a [`Backend`] and inspected afterwards. Faults can be
//! armed per operation to exercise partial-failure paths.
//!
//! ```rust,ignore
//! let mem = MemoryBackend::new();
//! mem.fail_next(Fault::InsertNotes);
//! let backend = mem.backend(StaticIdentity::user(user_id));
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use folio_core::{
    new_v7, Backend, BlobStore, CreateProjectRequest, EdgeRow, Error, IdentityProvider,
    MindMapRepository, NewSavedPdf, NodeRow, NoteRepository, NoteRow, Project, ProjectDetails,
    ProjectPatch, ProjectRepository, Result, SavedPdf, SavedPdfRepository,
};

/// Operation that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    ListProjects,
    CountProjects,
    InsertProject,
    UpdateProject,
    DeleteProject,
    InsertNotes,
    ListNotes,
    InsertNodes,
    InsertEdges,
    ListNodes,
    ListEdges,
    InsertPdf,
    ListPdfs,
    DeletePdfs,
    Upload,
    Download,
    RemoveBlobs,
}

#[derive(Debug, Default)]
struct State {
    projects: Vec<(Uuid, Project)>,
    notes: Vec<NoteRow>,
    nodes: Vec<NodeRow>,
    edges: Vec<EdgeRow>,
    pdfs: Vec<SavedPdf>,
    blobs: HashMap<String, Vec<u8>>,
}

impl State {
    /// Mirror the child tables' foreign key on `projects(id)`.
    fn ensure_projects_exist(&self, project_ids: impl IntoIterator<Item = Uuid>) -> Result<()> {
        for project_id in project_ids {
            if !self.projects.iter().any(|(_, p)| p.id == project_id) {
                return Err(Error::Storage(format!(
                    "foreign key violation: project {} does not exist",
                    project_id
                )));
            }
        }
        Ok(())
    }
}

/// Shared in-memory implementation of the row store and blob store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
    faults: Arc<Mutex<HashSet<Fault>>>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle this store with an identity provider.
    pub fn backend(&self, identity: impl IdentityProvider + 'static) -> Backend {
        Backend {
            projects: Arc::new(self.clone()),
            notes: Arc::new(self.clone()),
            mindmap: Arc::new(self.clone()),
            pdfs: Arc::new(self.clone()),
            blobs: Arc::new(self.clone()),
            identity: Arc::new(identity),
        }
    }

    /// Make the next call of `fault`'s operation fail.
    pub fn fail_next(&self, fault: Fault) {
        lock(&self.faults).insert(fault);
    }

    /// Names of the operations called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    pub fn blob_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = lock(&self.state).blobs.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn blob(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.state).blobs.get(path).cloned()
    }

    pub fn project_ids(&self) -> Vec<Uuid> {
        lock(&self.state).projects.iter().map(|(_, p)| p.id).collect()
    }

    pub fn note_rows(&self, project_id: Uuid) -> Vec<NoteRow> {
        lock(&self.state)
            .notes
            .iter()
            .filter(|n| n.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn node_rows(&self, project_id: Uuid) -> Vec<NodeRow> {
        lock(&self.state)
            .nodes
            .iter()
            .filter(|n| n.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn edge_rows(&self, project_id: Uuid) -> Vec<EdgeRow> {
        lock(&self.state)
            .edges
            .iter()
            .filter(|e| e.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn pdf_rows(&self, project_id: Uuid) -> Vec<SavedPdf> {
        lock(&self.state)
            .pdfs
            .iter()
            .filter(|p| p.project_id == project_id)
            .cloned()
            .collect()
    }

    /// Record the call and fail it if a fault is armed for it.
    fn enter(&self, op: &'static str, fault: Fault) -> Result<()> {
        lock(&self.calls).push(op);
        if lock(&self.faults).remove(&fault) {
            return Err(Error::Storage(format!("injected failure in {}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for MemoryBackend {
    async fn list_details(&self, owner_id: Uuid) -> Result<Vec<ProjectDetails>> {
        self.enter("projects.list", Fault::ListProjects)?;
        let state = lock(&self.state);
        let mut details: Vec<ProjectDetails> = state
            .projects
            .iter()
            .rev()
            .filter(|(owner, _)| *owner == owner_id)
            .map(|(_, p)| {
                let pdfs = state.pdfs.iter().filter(|s| s.project_id == p.id);
                ProjectDetails {
                    project: p.clone(),
                    pdf_count: pdfs.clone().count() as i64,
                    note_count: state.notes.iter().filter(|n| n.project_id == p.id).count() as i64,
                    node_count: state.nodes.iter().filter(|n| n.project_id == p.id).count() as i64,
                    total_size: pdfs.map(|s| s.file_size).sum(),
                }
            })
            .collect();
        details.sort_by(|a, b| b.project.updated_at.cmp(&a.project.updated_at));
        Ok(details)
    }

    async fn count(&self, owner_id: Uuid) -> Result<usize> {
        self.enter("projects.count", Fault::CountProjects)?;
        Ok(lock(&self.state)
            .projects
            .iter()
            .filter(|(owner, _)| *owner == owner_id)
            .count())
    }

    async fn insert(&self, owner_id: Uuid, req: CreateProjectRequest) -> Result<Project> {
        self.enter("projects.insert", Fault::InsertProject)?;
        let now = Utc::now();
        let project = Project {
            id: new_v7(),
            name: req.name,
            description: req.description,
            created_at: now,
            updated_at: now,
        };
        lock(&self.state).projects.push((owner_id, project.clone()));
        Ok(project)
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Project>> {
        Ok(lock(&self.state)
            .projects
            .iter()
            .find(|(owner, p)| *owner == owner_id && p.id == id)
            .map(|(_, p)| p.clone()))
    }

    async fn update(&self, owner_id: Uuid, id: Uuid, patch: &ProjectPatch) -> Result<Project> {
        self.enter("projects.update", Fault::UpdateProject)?;
        let mut state = lock(&self.state);
        let (_, project) = state
            .projects
            .iter_mut()
            .find(|(owner, p)| *owner == owner_id && p.id == id)
            .ok_or(Error::ProjectNotFound(id))?;
        patch.apply_to(project);
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        self.enter("projects.delete", Fault::DeleteProject)?;
        let mut state = lock(&self.state);
        let before = state.projects.len();
        state
            .projects
            .retain(|(owner, p)| !(*owner == owner_id && p.id == id));
        if state.projects.len() == before {
            return Err(Error::ProjectNotFound(id));
        }
        // Mirror ON DELETE CASCADE.
        state.notes.retain(|n| n.project_id != id);
        state.nodes.retain(|n| n.project_id != id);
        state.edges.retain(|e| e.project_id != id);
        state.pdfs.retain(|p| p.project_id != id);
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for MemoryBackend {
    async fn insert_bulk(&self, rows: Vec<NoteRow>) -> Result<()> {
        self.enter("notes.insert", Fault::InsertNotes)?;
        let mut state = lock(&self.state);
        state.ensure_projects_exist(rows.iter().map(|r| r.project_id))?;
        state.notes.extend(rows);
        Ok(())
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<NoteRow>> {
        self.enter("notes.list", Fault::ListNotes)?;
        Ok(self.note_rows(project_id))
    }

    async fn delete_for_project(&self, project_id: Uuid) -> Result<u64> {
        lock(&self.calls).push("notes.delete");
        let mut state = lock(&self.state);
        let before = state.notes.len();
        state.notes.retain(|n| n.project_id != project_id);
        Ok((before - state.notes.len()) as u64)
    }
}

#[async_trait]
impl MindMapRepository for MemoryBackend {
    async fn insert_nodes(&self, rows: Vec<NodeRow>) -> Result<()> {
        self.enter("nodes.insert", Fault::InsertNodes)?;
        let mut state = lock(&self.state);
        state.ensure_projects_exist(rows.iter().map(|r| r.project_id))?;
        let mut seen: HashSet<(Uuid, String)> = state
            .nodes
            .iter()
            .map(|n| (n.project_id, n.id.clone()))
            .collect();
        for row in &rows {
            if !seen.insert((row.project_id, row.id.clone())) {
                return Err(Error::Storage(format!("duplicate node id {}", row.id)));
            }
        }
        state.nodes.extend(rows);
        Ok(())
    }

    async fn insert_edges(&self, rows: Vec<EdgeRow>) -> Result<()> {
        self.enter("edges.insert", Fault::InsertEdges)?;
        let mut state = lock(&self.state);
        state.ensure_projects_exist(rows.iter().map(|r| r.project_id))?;
        state.edges.extend(rows);
        Ok(())
    }

    async fn list_nodes(&self, project_id: Uuid) -> Result<Vec<NodeRow>> {
        self.enter("nodes.list", Fault::ListNodes)?;
        Ok(self.node_rows(project_id))
    }

    async fn list_edges(&self, project_id: Uuid) -> Result<Vec<EdgeRow>> {
        self.enter("edges.list", Fault::ListEdges)?;
        Ok(self.edge_rows(project_id))
    }

    async fn delete_edges_for_project(&self, project_id: Uuid) -> Result<u64> {
        lock(&self.calls).push("edges.delete");
        let mut state = lock(&self.state);
        let before = state.edges.len();
        state.edges.retain(|e| e.project_id != project_id);
        Ok((before - state.edges.len()) as u64)
    }

    async fn delete_nodes_for_project(&self, project_id: Uuid) -> Result<u64> {
        lock(&self.calls).push("nodes.delete");
        let mut state = lock(&self.state);
        let before = state.nodes.len();
        state.nodes.retain(|n| n.project_id != project_id);
        Ok((before - state.nodes.len()) as u64)
    }
}

#[async_trait]
impl SavedPdfRepository for MemoryBackend {
    async fn insert(&self, req: NewSavedPdf) -> Result<SavedPdf> {
        self.enter("pdfs.insert", Fault::InsertPdf)?;
        let pdf = SavedPdf {
            id: new_v7(),
            project_id: req.project_id,
            name: req.name,
            storage_path: req.storage_path,
            file_size: req.file_size,
            created_at: Utc::now(),
        };
        let mut state = lock(&self.state);
        state.ensure_projects_exist([pdf.project_id])?;
        state.pdfs.push(pdf.clone());
        Ok(pdf)
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<SavedPdf>> {
        self.enter("pdfs.list", Fault::ListPdfs)?;
        let mut pdfs = self.pdf_rows(project_id);
        pdfs.reverse();
        pdfs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pdfs)
    }

    async fn total_size(&self, project_id: Uuid) -> Result<u64> {
        Ok(self
            .pdf_rows(project_id)
            .iter()
            .map(|p| p.file_size.max(0) as u64)
            .sum())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64> {
        self.enter("pdfs.delete_many", Fault::DeletePdfs)?;
        let mut state = lock(&self.state);
        let before = state.pdfs.len();
        state.pdfs.retain(|p| !ids.contains(&p.id));
        Ok((before - state.pdfs.len()) as u64)
    }

    async fn delete_for_project(&self, project_id: Uuid) -> Result<u64> {
        lock(&self.calls).push("pdfs.delete");
        let mut state = lock(&self.state);
        let before = state.pdfs.len();
        state.pdfs.retain(|p| p.project_id != project_id);
        Ok((before - state.pdfs.len()) as u64)
    }
}

#[async_trait]
impl BlobStore for MemoryBackend {
    async fn upload(&self, path: &str, data: &[u8], _content_type: &str) -> Result<()> {
        self.enter("blobs.upload", Fault::Upload)?;
        lock(&self.state).blobs.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        self.enter("blobs.download", Fault::Download)?;
        self.blob(path)
            .ok_or_else(|| Error::NotFound(format!("blob {}", path)))
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        self.enter("blobs.remove", Fault::RemoveBlobs)?;
        let mut state = lock(&self.state);
        for path in paths {
            state.blobs.remove(path);
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(lock(&self.state).blobs.contains_key(path))
    }
}
