//! The authenticated user's project list.

use tracing::{info, warn};
use uuid::Uuid;

use folio_core::{
    require_identity, CreateProjectRequest, Error, EventBus, Project, ProjectDetails,
    ProjectPatch, Result, StoreEvent, StoreKind,
};

use crate::engine::SyncEngine;

/// Project list state plus the operations that keep it in step with the
/// durable store.
pub struct ProjectDirectory {
    engine: SyncEngine,
    projects: Vec<ProjectDetails>,
    current_project: Option<Project>,
    loading: bool,
    error: Option<String>,
    events: EventBus,
}

impl ProjectDirectory {
    pub fn new(engine: SyncEngine, events: EventBus) -> Self {
        Self {
            engine,
            projects: Vec::new(),
            current_project: None,
            loading: false,
            error: None,
            events,
        }
    }

    pub fn projects(&self) -> &[ProjectDetails] {
        &self.projects
    }

    pub fn find(&self, id: Uuid) -> Option<&ProjectDetails> {
        self.projects.iter().find(|p| p.id() == id)
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.current_project.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Load every project of the current identity, most recently updated first.
    pub async fn fetch_projects(&mut self) -> Result<()> {
        self.begin();
        let result = self.list_remote().await;
        if let Ok(projects) = &result {
            self.projects = projects.clone();
            self.emit_projects();
        }
        self.finish(result.map(|_| ()))
    }

    async fn list_remote(&self) -> Result<Vec<ProjectDetails>> {
        let backend = self.engine.backend();
        let identity = require_identity(backend.identity.as_ref()).await?;
        backend.projects.list_details(identity.user_id).await
    }

    /// Create a project and put it at the head of the list. Returns its id.
    ///
    /// The project-count quota is checked against the durable count, not the
    /// possibly stale local list.
    pub async fn create_project(
        &mut self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Uuid> {
        self.begin();
        let result = self.create_remote(name, description).await;
        let result = result.map(|project| {
            let id = project.id;
            info!(subsystem = "directory", op = "create", project_id = %id, "Project created");
            self.projects.insert(0, ProjectDetails::empty(project));
            self.emit_projects();
            id
        });
        self.finish(result)
    }

    async fn create_remote(&self, name: &str, description: Option<&str>) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Please enter a project name".to_string()));
        }
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let backend = self.engine.backend();
        let identity = require_identity(backend.identity.as_ref()).await?;
        let existing = backend.projects.count(identity.user_id).await?;
        self.engine.quota().ensure_can_create_project(existing)?;

        backend
            .projects
            .insert(
                identity.user_id,
                CreateProjectRequest {
                    name: name.to_string(),
                    description,
                },
            )
            .await
    }

    /// Apply a metadata patch remotely, then mirror the stored row locally.
    pub async fn update_project(&mut self, id: Uuid, patch: ProjectPatch) -> Result<()> {
        self.begin();
        let result = async {
            if let Some(name) = &patch.name {
                if name.trim().is_empty() {
                    return Err(Error::InvalidInput("Please enter a project name".to_string()));
                }
            }
            let backend = self.engine.backend();
            let identity = require_identity(backend.identity.as_ref()).await?;
            backend.projects.update(identity.user_id, id, &patch).await
        }
        .await;

        let result = result.map(|updated| {
            if let Some(entry) = self.projects.iter_mut().find(|p| p.id() == id) {
                entry.project = updated.clone();
            }
            self.emit_projects();
            if self.current_project.as_ref().is_some_and(|p| p.id == id) {
                self.current_project = Some(updated);
                self.emit_current();
            }
        });
        self.finish(result)
    }

    /// Delete a project with all of its records and files.
    pub async fn delete_project(&mut self, id: Uuid) -> Result<()> {
        self.begin();
        let result = self.engine.delete_project(id).await;
        let result = result.map(|()| {
            self.projects.retain(|p| p.id() != id);
            self.emit_projects();
            if self.current_project.as_ref().is_some_and(|p| p.id == id) {
                self.current_project = None;
                self.emit_current();
            }
        });
        self.finish(result)
    }

    pub fn set_current_project(&mut self, project: Option<Project>) {
        self.current_project = project;
        self.emit_current();
    }

    fn begin(&mut self) {
        self.set_loading(true);
        self.set_error(None);
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            warn!(subsystem = "directory", error = %e, "Project operation failed");
            self.set_error(Some(e.to_string()));
        }
        self.set_loading(false);
        result
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.events.emit(StoreEvent::LoadingChanged {
                store: StoreKind::Projects,
                loading,
            });
        }
    }

    fn set_error(&mut self, error: Option<String>) {
        if self.error != error {
            self.error = error.clone();
            self.events.emit(StoreEvent::ErrorChanged {
                store: StoreKind::Projects,
                error,
            });
        }
    }

    fn emit_projects(&self) {
        self.events.emit(StoreEvent::ProjectsChanged {
            count: self.projects.len(),
        });
    }

    fn emit_current(&self) {
        self.events.emit(StoreEvent::CurrentProjectChanged {
            project_id: self.current_project.as_ref().map(|p| p.id),
        });
    }
}
