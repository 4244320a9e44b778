//! Mind-map node and edge repository implementation.
//!
//! Node position/data and edge style are stored as JSONB. Edges are keyed by
//! a surrogate `seq` column, so several edges may share one `id`.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use folio_core::{
    EdgeKind, EdgeRow, EdgeStyle, Error, MindMapRepository, NodeData, NodeKind, NodeRow,
    Position, Result,
};

/// PostgreSQL implementation of MindMapRepository.
pub struct PgMindMapRepository {
    pool: Pool<Postgres>,
}

impl PgMindMapRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn node_from_row(r: &PgRow) -> Result<NodeRow> {
    let kind: String = r.get("type");
    let position: serde_json::Value = r.get("position");
    let data: serde_json::Value = r.get("data");
    Ok(NodeRow {
        id: r.get("id"),
        project_id: r.get("project_id"),
        user_id: r.get("user_id"),
        kind: kind.parse::<NodeKind>().map_err(Error::Serialization)?,
        position: serde_json::from_value::<Position>(position)?,
        data: serde_json::from_value::<NodeData>(data)?,
    })
}

fn edge_from_row(r: &PgRow) -> Result<EdgeRow> {
    let kind: Option<String> = r.get("type");
    let style: Option<serde_json::Value> = r.get("style");
    Ok(EdgeRow {
        id: r.get("id"),
        project_id: r.get("project_id"),
        user_id: r.get("user_id"),
        source_id: r.get("source_id"),
        target_id: r.get("target_id"),
        kind: kind
            .map(|k| k.parse::<EdgeKind>())
            .transpose()
            .map_err(Error::Serialization)?,
        animated: r.get("animated"),
        style: style
            .map(serde_json::from_value::<EdgeStyle>)
            .transpose()?,
    })
}

#[async_trait]
impl MindMapRepository for PgMindMapRepository {
    async fn insert_nodes(&self, rows: Vec<NodeRow>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for row in &rows {
            sqlx::query(
                "INSERT INTO mindmap_nodes (id, project_id, user_id, type, position, data)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&row.id)
            .bind(row.project_id)
            .bind(row.user_id)
            .bind(row.kind.as_str())
            .bind(serde_json::to_value(row.position)?)
            .bind(serde_json::to_value(&row.data)?)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;

        Ok(())
    }

    async fn insert_edges(&self, rows: Vec<EdgeRow>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for row in &rows {
            let style = row.style.as_ref().map(serde_json::to_value).transpose()?;
            sqlx::query(
                "INSERT INTO mindmap_edges (id, project_id, user_id, source_id, target_id, type, animated, style)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(&row.id)
            .bind(row.project_id)
            .bind(row.user_id)
            .bind(&row.source_id)
            .bind(&row.target_id)
            .bind(row.kind.map(|k| k.as_str()))
            .bind(row.animated)
            .bind(style)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;

        Ok(())
    }

    async fn list_nodes(&self, project_id: Uuid) -> Result<Vec<NodeRow>> {
        let rows = sqlx::query(
            "SELECT id, project_id, user_id, type, position, data
             FROM mindmap_nodes
             WHERE project_id = $1
             ORDER BY seq",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(node_from_row).collect()
    }

    async fn list_edges(&self, project_id: Uuid) -> Result<Vec<EdgeRow>> {
        let rows = sqlx::query(
            "SELECT id, project_id, user_id, source_id, target_id, type, animated, style
             FROM mindmap_edges
             WHERE project_id = $1
             ORDER BY seq",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(edge_from_row).collect()
    }

    async fn delete_edges_for_project(&self, project_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM mindmap_edges WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    async fn delete_nodes_for_project(&self, project_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM mindmap_nodes WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}
