// LanceDB vector store module
// One table per document generation, named `<collection>_v<document-id>`


use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::{Result, TutorError};

/// Page size used when scrolling a whole collection.
const SCROLL_PAGE_SIZE: usize = 50;

/// A chunk with its embedding, ready to be written to a collection.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub id: u32,
    pub text: String,
    pub vector: Vec<f32>,
}

/// A chunk returned from a similarity query, highest score first.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: u32,
    pub text: String,
    /// Cosine similarity in `[0, 1]`, computed as `1 - distance`.
    pub score: f32,
}

/// Vector store backed by an embedded LanceDB database.
pub struct VectorStore {
    connection: Connection,
}

impl VectorStore {
    /// Open (or create) the vector database under the configured data
    /// directory.
    #[inline]
    pub async fn connect(config: &Config) -> Result<Self> {
        let db_path = config
            .vectors_path()
            .map_err(|e| TutorError::Store(format!("Failed to resolve vector store path: {}", e)))?;
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TutorError::Store(format!("Failed to create vector store directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| TutorError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self { connection })
    }

    /// Name of the collection generation for a given document.
    #[inline]
    pub fn generation_name(base: &str, document_id: i64) -> String {
        format!("{}_v{}", base, document_id)
    }

    /// Drop the collection if it exists and create it empty with the given
    /// vector dimension.
    #[inline]
    pub async fn recreate_collection(&self, name: &str, dimension: usize) -> Result<()> {
        self.drop_collection(name).await?;

        let schema = Self::create_schema(dimension);
        self.connection
            .create_empty_table(name, schema)
            .execute()
            .await
            .map_err(|e| {
                TutorError::Store(format!("Failed to create collection {}: {}", name, e))
            })?;

        info!(
            "Collection {} created with {} dimensions",
            name, dimension
        );
        Ok(())
    }

    /// Check whether a collection exists.
    #[inline]
    pub async fn collection_exists(&self, name: &str) -> Result<bool> {
        let names = self.table_names().await?;
        Ok(names.iter().any(|n| n == name))
    }

    /// Drop a collection if it exists; dropping a missing collection is not
    /// an error.
    #[inline]
    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        if self.collection_exists(name).await? {
            info!("Dropping collection {}", name);
            self.connection.drop_table(name).await.map_err(|e| {
                TutorError::Store(format!("Failed to drop collection {}: {}", name, e))
            })?;
        }
        Ok(())
    }

    /// List all collections in the store.
    #[inline]
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.table_names().await
    }

    /// Write chunks into a collection, replacing any rows that share an id.
    #[inline]
    pub async fn upsert(&self, name: &str, chunks: &[EmbeddedChunk]) -> Result<()> {
        if chunks.is_empty() {
            debug!("No chunks to upsert into {}", name);
            return Ok(());
        }

        let dimension = self.collection_dimension(name).await?;
        for chunk in chunks {
            if chunk.vector.len() != dimension {
                return Err(TutorError::Store(format!(
                    "Vector dimension mismatch for chunk {}: expected {}, got {}",
                    chunk.id,
                    dimension,
                    chunk.vector.len()
                )));
            }
        }

        let table = self.open_table(name).await?;

        // LanceDB has no native upsert; delete matching ids first.
        let ids: Vec<String> = chunks.iter().map(|c| c.id.to_string()).collect();
        let predicate = format!("id IN ({})", ids.join(", "));
        table.delete(&predicate).await.map_err(|e| {
            TutorError::Store(format!("Failed to delete existing chunks in {}: {}", name, e))
        })?;

        let record_batch = Self::create_record_batch(chunks, dimension)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table.add(reader).execute().await.map_err(|e| {
            TutorError::Store(format!("Failed to insert chunks into {}: {}", name, e))
        })?;

        debug!("Upserted {} chunks into {}", chunks.len(), name);
        Ok(())
    }

    /// Search a collection for the chunks most similar to the query vector.
    ///
    /// Returns at most `top_k` chunks with similarity of at least
    /// `min_score`, highest similarity first.
    #[inline]
    pub async fn query(
        &self,
        name: &str,
        query_vector: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredChunk>> {
        debug!("Searching {} with top_k={}", name, top_k);

        let table = self.open_table(name).await?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| TutorError::Store(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| TutorError::Store(format!("Failed to execute search: {}", e)))?;

        let mut scored = Self::collect_scored(results).await?;
        scored.retain(|chunk| chunk.score >= min_score);
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!("Search returned {} chunks above threshold", scored.len());
        Ok(scored)
    }

    /// Read every chunk in a collection, in ascending id order.
    #[inline]
    pub async fn scroll_all(&self, name: &str) -> Result<Vec<(u32, String)>> {
        let table = self.open_table(name).await?;

        let mut chunks = Vec::new();
        let mut offset = 0;
        loop {
            let results = table
                .query()
                .offset(offset)
                .limit(SCROLL_PAGE_SIZE)
                .execute()
                .await
                .map_err(|e| TutorError::Store(format!("Failed to scroll {}: {}", name, e)))?;

            let page = Self::collect_rows(results).await?;
            let page_len = page.len();
            chunks.extend(page);

            if page_len < SCROLL_PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        // Scan order is not guaranteed to follow insertion order.
        chunks.sort_by_key(|(id, _)| *id);

        debug!("Scrolled {} chunks from {}", chunks.len(), name);
        Ok(chunks)
    }

    /// Number of chunks in a collection.
    #[inline]
    pub async fn count(&self, name: &str) -> Result<usize> {
        let table = self.open_table(name).await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| TutorError::Store(format!("Failed to count rows in {}: {}", name, e)))
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| TutorError::Store(format!("Failed to list collections: {}", e)))
    }

    async fn open_table(&self, name: &str) -> Result<lancedb::Table> {
        self.connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| TutorError::Store(format!("Failed to open collection {}: {}", name, e)))
    }

    /// Read the vector dimension from a collection's schema.
    async fn collection_dimension(&self, name: &str) -> Result<usize> {
        let table = self.open_table(name).await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| TutorError::Store(format!("Failed to read schema of {}: {}", name, e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(TutorError::Store(format!(
            "Collection {} has no vector column",
            name
        )))
    }

    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::UInt32, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("text", DataType::Utf8, false),
        ]))
    }

    fn create_record_batch(chunks: &[EmbeddedChunk], dimension: usize) -> Result<RecordBatch> {
        let len = chunks.len();

        let mut ids = Vec::with_capacity(len);
        let mut texts = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * dimension);
        for chunk in chunks {
            ids.push(chunk.id);
            texts.push(chunk.text.as_str());
            flat_values.extend_from_slice(&chunk.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, dimension as i32, Arc::new(values_array), None)
                .map_err(|e| TutorError::Store(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(UInt32Array::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(texts)),
        ];

        RecordBatch::try_new(Self::create_schema(dimension), arrays)
            .map_err(|e| TutorError::Store(format!("Failed to create record batch: {}", e)))
    }

    async fn collect_scored(
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<ScoredChunk>> {
        let mut scored = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| TutorError::Store(format!("Failed to read result stream: {}", e)))?
        {
            let ids = Self::u32_column(&batch, "id")?;
            let texts = Self::string_column(&batch, "text")?;
            let distances = batch
                .column_by_name("_distance")
                .map(|col| col.as_any().downcast_ref::<Float32Array>());

            for row in 0..batch.num_rows() {
                let distance = distances
                    .flatten()
                    .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

                scored.push(ScoredChunk {
                    id: ids.value(row),
                    text: texts.value(row).to_string(),
                    score: 1.0 - distance,
                });
            }
        }

        Ok(scored)
    }

    async fn collect_rows(
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<(u32, String)>> {
        let mut rows = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| TutorError::Store(format!("Failed to read result stream: {}", e)))?
        {
            let ids = Self::u32_column(&batch, "id")?;
            let texts = Self::string_column(&batch, "text")?;

            for row in 0..batch.num_rows() {
                rows.push((ids.value(row), texts.value(row).to_string()));
            }
        }

        Ok(rows)
    }

    fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
        batch
            .column_by_name(name)
            .ok_or_else(|| TutorError::Store(format!("Missing {} column", name)))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| TutorError::Store(format!("Invalid {} column type", name)))
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
        batch
            .column_by_name(name)
            .ok_or_else(|| TutorError::Store(format!("Missing {} column", name)))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| TutorError::Store(format!("Invalid {} column type", name)))
    }
}
