//! Application state: one workspace, the project list, and the engine that
//! moves snapshots between them.

use tokio::sync::broadcast;
use uuid::Uuid;

use folio_core::{Backend, Error, EventBus, EventEnvelope, QuotaPolicy, Result, Workspace};

use crate::directory::ProjectDirectory;
use crate::engine::{SyncEngine, SyncSummary};

/// Top-level state object for an editing session.
///
/// The workspace and directory publish on a single shared [`EventBus`].
pub struct App {
    workspace: Workspace,
    directory: ProjectDirectory,
    engine: SyncEngine,
    events: EventBus,
}

impl App {
    pub fn new(backend: Backend) -> Self {
        Self::with_quota(backend, QuotaPolicy::default())
    }

    pub fn with_quota(backend: Backend, quota: QuotaPolicy) -> Self {
        let events = EventBus::default();
        let engine = SyncEngine::with_quota(backend, quota);
        Self {
            workspace: Workspace::new(events.clone()).with_max_file_bytes(quota.max_file_bytes),
            directory: ProjectDirectory::new(engine.clone(), events.clone()),
            engine,
            events,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    pub fn directory(&self) -> &ProjectDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut ProjectDirectory {
        &mut self.directory
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    /// Persist the current workspace as a new project and make it current.
    ///
    /// Requires a PDF. The project row stays if the snapshot save fails; the
    /// returned error is the save's.
    pub async fn save_as_project(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Uuid> {
        if self.workspace.pdf_file().is_none() {
            return Err(Error::InvalidInput("Please upload a PDF first".to_string()));
        }

        let project_id = self.directory.create_project(name, description).await?;
        self.engine
            .save_to_project(&mut self.workspace, project_id)
            .await?;
        self.directory.fetch_projects().await?;

        let current = self.directory.find(project_id).map(|d| d.project.clone());
        self.directory.set_current_project(current);
        Ok(project_id)
    }

    /// Save the workspace into an existing project, replacing its contents.
    pub async fn save_to_project(&mut self, project_id: Uuid) -> Result<SyncSummary> {
        self.engine
            .save_to_project(&mut self.workspace, project_id)
            .await
    }

    /// Replace the workspace with a persisted project and mark it current.
    pub async fn open_project(&mut self, project_id: Uuid) -> Result<SyncSummary> {
        let project = self.engine.project(project_id).await?;

        let summary = self
            .engine
            .load_from_project(&mut self.workspace, project_id)
            .await?;
        self.directory.set_current_project(Some(project));
        Ok(summary)
    }

    /// Delete a project and clear the workspace.
    pub async fn delete_project(&mut self, project_id: Uuid) -> Result<()> {
        self.directory.delete_project(project_id).await?;
        self.workspace.reset_workspace();
        Ok(())
    }
}
