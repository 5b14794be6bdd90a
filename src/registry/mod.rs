// SQLite document registry
// Tracks ingested documents, their pipeline status, and which vector
// collection generation currently serves them

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::debug;

use crate::registry::models::{Document, DocumentUpdate, NewDocument};
use crate::registry::queries::DocumentQueries;


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    path TEXT NOT NULL,
    collection TEXT,
    status TEXT NOT NULL,
    chunk_count INTEGER NOT NULL DEFAULT 0,
    outline TEXT,
    error_message TEXT,
    created_date DATETIME NOT NULL,
    completed_date DATETIME
)
"#;

#[derive(Debug, Clone)]
pub struct Registry {
    pool: DbPool,
}

impl Registry {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let registry = Self { pool };
        registry.create_schema().await?;

        Ok(registry)
    }

    /// Open the registry under the given data directory, creating the
    /// directory if necessary.
    #[inline]
    pub async fn initialize_from_data_dir(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Self::new(data_dir.join("tutor.db")).await
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .context("Failed to create documents table")?;

        debug!("Registry schema ready");
        Ok(())
    }

    #[inline]
    pub async fn create_document(&self, new_document: NewDocument) -> Result<Document> {
        DocumentQueries::create(&self.pool, new_document).await
    }

    #[inline]
    pub async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        DocumentQueries::get_by_id(&self.pool, id).await
    }

    #[inline]
    pub async fn get_document_by_name(&self, name: &str) -> Result<Option<Document>> {
        DocumentQueries::get_by_name(&self.pool, name).await
    }

    #[inline]
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        DocumentQueries::list_all(&self.pool).await
    }

    /// The most recently completed document, which study and quiz sessions
    /// run against.
    #[inline]
    pub async fn latest_completed(&self) -> Result<Option<Document>> {
        DocumentQueries::latest_completed(&self.pool).await
    }

    #[inline]
    pub async fn update_document(&self, id: i64, update: DocumentUpdate) -> Result<Option<Document>> {
        DocumentQueries::update(&self.pool, id, update).await
    }

    #[inline]
    pub async fn delete_document(&self, id: i64) -> Result<bool> {
        DocumentQueries::delete(&self.pool, id).await
    }
}
