//! Project repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use folio_core::{
    new_v7, CreateProjectRequest, Error, Project, ProjectDetails, ProjectPatch,
    ProjectRepository, Result,
};

/// PostgreSQL implementation of ProjectRepository.
pub struct PgProjectRepository {
    pool: Pool<Postgres>,
}

impl PgProjectRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn project_from_row(r: &PgRow) -> Project {
    Project {
        id: r.get("id"),
        name: r.get("name"),
        description: r.get("description"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn list_details(&self, owner_id: Uuid) -> Result<Vec<ProjectDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.description, p.created_at, p.updated_at,
                   (SELECT COUNT(*) FROM saved_pdfs s WHERE s.project_id = p.id) AS pdf_count,
                   (SELECT COUNT(*) FROM notes n WHERE n.project_id = p.id) AS note_count,
                   (SELECT COUNT(*) FROM mindmap_nodes m WHERE m.project_id = p.id) AS node_count,
                   COALESCE((SELECT SUM(s.file_size) FROM saved_pdfs s WHERE s.project_id = p.id), 0)::BIGINT AS total_size
            FROM projects p
            WHERE p.owner_id = $1
            ORDER BY p.updated_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|r| ProjectDetails {
                project: project_from_row(r),
                pdf_count: r.get("pdf_count"),
                note_count: r.get("note_count"),
                node_count: r.get("node_count"),
                total_size: r.get("total_size"),
            })
            .collect())
    }

    async fn count(&self, owner_id: Uuid) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count.max(0) as usize)
    }

    async fn insert(&self, owner_id: Uuid, req: CreateProjectRequest) -> Result<Project> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO projects (id, owner_id, name, description, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING id, name, description, created_at, updated_at",
        )
        .bind(new_v7())
        .bind(owner_id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(project_from_row(&row))
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query(
            "SELECT id, name, description, created_at, updated_at
             FROM projects
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(project_from_row))
    }

    async fn update(&self, owner_id: Uuid, id: Uuid, patch: &ProjectPatch) -> Result<Project> {
        let (set_description, description) = match &patch.description {
            Some(d) => (true, d.clone()),
            None => (false, None),
        };

        let row = sqlx::query(
            "UPDATE projects
             SET name = COALESCE($2, name),
                 description = CASE WHEN $3 THEN $4 ELSE description END,
                 updated_at = $5
             WHERE id = $1 AND owner_id = $6
             RETURNING id, name, description, created_at, updated_at",
        )
        .bind(id)
        .bind(&patch.name)
        .bind(set_description)
        .bind(description)
        .bind(Utc::now())
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref()
            .map(project_from_row)
            .ok_or(Error::ProjectNotFound(id))
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ProjectNotFound(id));
        }
        Ok(())
    }
}
