//! Saved PDF metadata repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use folio_core::{new_v7, Error, NewSavedPdf, Result, SavedPdf, SavedPdfRepository};

/// PostgreSQL implementation of SavedPdfRepository.
pub struct PgSavedPdfRepository {
    pool: Pool<Postgres>,
}

impl PgSavedPdfRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SavedPdfRepository for PgSavedPdfRepository {
    async fn insert(&self, req: NewSavedPdf) -> Result<SavedPdf> {
        let pdf = SavedPdf {
            id: new_v7(),
            project_id: req.project_id,
            name: req.name,
            storage_path: req.storage_path,
            file_size: req.file_size,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO saved_pdfs (id, project_id, name, storage_path, file_size, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(pdf.id)
        .bind(pdf.project_id)
        .bind(&pdf.name)
        .bind(&pdf.storage_path)
        .bind(pdf.file_size)
        .bind(pdf.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(pdf)
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<SavedPdf>> {
        let rows = sqlx::query(
            "SELECT id, project_id, name, storage_path, file_size, created_at
             FROM saved_pdfs
             WHERE project_id = $1
             ORDER BY created_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| SavedPdf {
                id: r.get("id"),
                project_id: r.get("project_id"),
                name: r.get("name"),
                storage_path: r.get("storage_path"),
                file_size: r.get("file_size"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    async fn total_size(&self, project_id: Uuid) -> Result<u64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(file_size), 0)::BIGINT FROM saved_pdfs WHERE project_id = $1",
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(total.max(0) as u64)
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM saved_pdfs WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    async fn delete_for_project(&self, project_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM saved_pdfs WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}
