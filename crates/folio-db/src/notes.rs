//! Note repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use folio_core::{Error, NoteRepository, NoteRow, Result};

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert_bulk(&self, rows: Vec<NoteRow>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for row in &rows {
            sqlx::query(
                "INSERT INTO notes (id, project_id, user_id, content, page_number, color, tags, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(row.id)
            .bind(row.project_id)
            .bind(row.user_id)
            .bind(&row.content)
            .bind(row.page_number)
            .bind(&row.color)
            .bind(&row.tags)
            .bind(row.created_at)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;

        Ok(())
    }

    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<NoteRow>> {
        let rows = sqlx::query(
            "SELECT id, project_id, user_id, content, page_number, color, tags, created_at
             FROM notes
             WHERE project_id = $1
             ORDER BY seq",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| NoteRow {
                id: r.get("id"),
                project_id: r.get("project_id"),
                user_id: r.get("user_id"),
                content: r.get("content"),
                page_number: r.get("page_number"),
                color: r.get("color"),
                tags: r.get("tags"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    async fn delete_for_project(&self, project_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notes WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}
