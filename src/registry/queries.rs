use super::models::*;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

const DOCUMENT_COLUMNS: &str = "id, name, path, collection, status, chunk_count, \
                                outline, error_message, created_date, completed_date";

pub struct DocumentQueries;

impl DocumentQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, new_document: NewDocument) -> Result<Document> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            "INSERT INTO documents (name, path, status, created_date) VALUES (?, ?, 'pending', ?)",
        )
        .bind(&new_document.name)
        .bind(&new_document.path)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create document")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created document"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Document>> {
        let result = sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get document by id")?;

        Ok(result)
    }

    /// The most recent document with the given name.
    #[inline]
    pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Document>> {
        let result = sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE name = ? ORDER BY created_date DESC, id DESC LIMIT 1",
            DOCUMENT_COLUMNS
        ))
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get document by name")?;

        Ok(result)
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents ORDER BY created_date DESC, id DESC",
            DOCUMENT_COLUMNS
        ))
        .fetch_all(pool)
        .await
        .context("Failed to list all documents")?;

        Ok(documents)
    }

    #[inline]
    pub async fn latest_completed(pool: &SqlitePool) -> Result<Option<Document>> {
        let result = sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE status = 'completed' \
             ORDER BY completed_date DESC, id DESC LIMIT 1",
            DOCUMENT_COLUMNS
        ))
        .fetch_optional(pool)
        .await
        .context("Failed to get latest completed document")?;

        Ok(result)
    }

    #[inline]
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        update: DocumentUpdate,
    ) -> Result<Option<Document>> {
        let mut query_parts = Vec::new();
        let mut query_values = Vec::new();

        if let Some(status) = update.status {
            query_parts.push("status = ?");
            query_values.push(status.as_db_str().to_string());
        }

        if let Some(collection) = update.collection {
            query_parts.push("collection = ?");
            query_values.push(collection);
        }

        if let Some(chunk_count) = update.chunk_count {
            query_parts.push("chunk_count = ?");
            query_values.push(chunk_count.to_string());
        }

        if let Some(outline) = update.outline {
            query_parts.push("outline = ?");
            query_values.push(outline);
        }

        if let Some(error) = update.error_message {
            query_parts.push("error_message = ?");
            query_values.push(error);
        }

        if let Some(completed_date) = update.completed_date {
            query_parts.push("completed_date = ?");
            query_values.push(completed_date.to_string());
        }

        if query_parts.is_empty() {
            debug!("No fields to update for document {}", id);
            return Self::get_by_id(pool, id).await;
        }

        let sql = format!(
            "UPDATE documents SET {} WHERE id = ?",
            query_parts.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for value in query_values {
            query = query.bind(value);
        }
        query = query.bind(id);

        query
            .execute(pool)
            .await
            .context("Failed to update document")?;

        Self::get_by_id(pool, id).await
    }

    #[inline]
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete document")?
            .rows_affected();

        Ok(rows > 0)
    }
}
