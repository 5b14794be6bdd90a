// Document, study, and quiz pipelines
// Orchestrates extraction, chunking, embedding, storage, and generation

#[cfg(test)]
mod tests;

pub mod prompts;

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{info, warn};

use crate::chunker::chunk_text;
use crate::config::{Config, EmbeddingErrorPolicy};
use crate::extract::extract_text_from_pdf;
use crate::registry::Registry;
use crate::registry::models::{Document, DocumentStatus, DocumentUpdate, NewDocument};
use crate::store::{EmbeddedChunk, VectorStore};
use crate::{Result, TutorError};

/// Status line reported when `upload` is invoked without a file.
pub const NO_FILE_STATUS: &str = "Please upload a PDF.";

/// Status line reported after a successful ingestion.
pub const PROCESSED_STATUS: &str = "Document processed and stored!";

/// Embeds text into vectors. Implemented by [`crate::ollama::OllamaClient`];
/// tests substitute their own.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimension of the provider's model, established by embedding
    /// a fixed probe string.
    fn probe_dimension(&self) -> Result<usize>;
}

/// Runs a single chat completion against a named model.
pub trait Generator {
    fn generate(&self, model: &str, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Quiz difficulty; affects prompt phrasing only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Difficulty {
    Easy,
    Intermediate,
    Hard,
}

impl std::fmt::Display for Difficulty {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// Result of a document upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub status: String,
    pub outline: String,
    pub chunks: Vec<String>,
}

impl UploadOutcome {
    fn no_file() -> Self {
        Self {
            status: NO_FILE_STATUS.to_string(),
            outline: String::new(),
            chunks: Vec::new(),
        }
    }
}

/// Drives a document from PDF to a queryable, outlined collection, and
/// answers study/quiz requests against the most recent completed document.
pub struct TutorPipeline<'a, E, G> {
    config: &'a Config,
    registry: &'a Registry,
    store: &'a VectorStore,
    embedder: &'a E,
    generator: &'a G,
    show_progress: bool,
}

impl<'a, E: Embedder, G: Generator> TutorPipeline<'a, E, G> {
    #[inline]
    pub fn new(
        config: &'a Config,
        registry: &'a Registry,
        store: &'a VectorStore,
        embedder: &'a E,
        generator: &'a G,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            embedder,
            generator,
            show_progress: false,
        }
    }

    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Ingest a PDF: extract, chunk, embed, index into a fresh collection
    /// generation, and produce the outline.
    ///
    /// Called without a file, returns the fixed no-file outcome and touches
    /// no provider. On any failure, the document row is marked failed, the
    /// staging collection is dropped best-effort, and the error propagates;
    /// the previously active document stays queryable throughout.
    #[inline]
    pub async fn upload(&self, path: Option<&Path>) -> Result<UploadOutcome> {
        let Some(path) = path else {
            return Ok(UploadOutcome::no_file());
        };

        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
        let document = self
            .registry
            .create_document(NewDocument {
                name,
                path: path.display().to_string(),
            })
            .await
            .map_err(TutorError::Other)?;

        let collection =
            VectorStore::generation_name(&self.config.store.collection, document.id);

        match self.ingest(&document, path, &collection).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(drop_err) = self.store.drop_collection(&collection).await {
                    warn!("Failed to drop staging collection {}: {}", collection, drop_err);
                }
                if let Err(update_err) = self
                    .registry
                    .update_document(
                        document.id,
                        DocumentUpdate {
                            status: Some(DocumentStatus::Failed),
                            error_message: Some(e.to_string()),
                            ..DocumentUpdate::default()
                        },
                    )
                    .await
                {
                    warn!("Failed to mark document {} failed: {}", document.id, update_err);
                }
                Err(e)
            }
        }
    }

    async fn ingest(
        &self,
        document: &Document,
        path: &Path,
        collection: &str,
    ) -> Result<UploadOutcome> {
        self.set_status(document.id, DocumentStatus::Extracting).await?;
        let text = extract_text_from_pdf(path)?;
        let chunks = chunk_text(&text, &self.config.chunking)?;
        info!("Split {} into {} chunks", document.name, chunks.len());

        self.set_status(document.id, DocumentStatus::Indexing).await?;
        let dimension = self.embedder.probe_dimension()?;
        self.store.recreate_collection(collection, dimension).await?;

        let bar = if self.show_progress {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{bar:30} [{pos}/{len}] Embedding chunks")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut embedded = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            match self.embedder.embed(&chunk.text) {
                Ok(vector) => embedded.push(EmbeddedChunk {
                    id: chunk.index,
                    text: chunk.text.clone(),
                    vector,
                }),
                Err(e) => match self.config.ingest.on_embedding_error {
                    EmbeddingErrorPolicy::Abort => {
                        bar.abandon();
                        return Err(e);
                    }
                    EmbeddingErrorPolicy::Skip => {
                        warn!("Skipping chunk {}: {}", chunk.index, e);
                    }
                },
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        self.store.upsert(collection, &embedded).await?;
        info!(
            "Stored {} chunks in collection {}",
            embedded.len(),
            collection
        );

        self.set_status(document.id, DocumentStatus::Outlining).await?;
        // Outline from the store's view of the document, not the in-memory
        // chunk list.
        let stored = self.store.scroll_all(collection).await?;
        let outline = self.generate_outline(&stored)?;

        let chunk_texts: Vec<String> = stored.into_iter().map(|(_, text)| text).collect();

        self.registry
            .update_document(
                document.id,
                DocumentUpdate {
                    status: Some(DocumentStatus::Completed),
                    collection: Some(collection.to_string()),
                    chunk_count: Some(chunk_texts.len() as i64),
                    outline: Some(outline.clone()),
                    completed_date: Some(chrono::Utc::now().naive_utc()),
                    ..DocumentUpdate::default()
                },
            )
            .await
            .map_err(TutorError::Other)?;

        info!("Document {} is ready", document.name);
        Ok(UploadOutcome {
            status: PROCESSED_STATUS.to_string(),
            outline,
            chunks: chunk_texts,
        })
    }

    /// One keypoint summary per chunk, then a single synthesis call over the
    /// joined summaries.
    fn generate_outline(&self, chunks: &[(u32, String)]) -> Result<String> {
        let model = &self.config.ollama.chat_model;

        let mut summaries = Vec::with_capacity(chunks.len());
        for (_, text) in chunks {
            let summary = self.generator.generate(
                model,
                prompts::CHUNK_SUMMARY_SYSTEM,
                &prompts::chunk_summary_user(text),
            )?;
            summaries.push(summary);
        }

        self.generator.generate(
            model,
            prompts::OUTLINE_SYSTEM,
            &prompts::outline_synthesis_user(&summaries.join("   ")),
        )
    }

    /// Study a passage: retrieve the most similar chunks from the active
    /// document and produce one study summary per chunk, joined by blank
    /// lines. With no relevant chunks the summary call still runs once, with
    /// empty context.
    #[inline]
    pub async fn study(&self, passage: &str) -> Result<String> {
        let retrieved = self.retrieve(passage).await?;
        let model = &self.config.ollama.chat_model;

        if retrieved.is_empty() {
            return self
                .generator
                .generate(model, prompts::STUDY_SYSTEM, &prompts::study_user(""));
        }

        let mut summaries = Vec::with_capacity(retrieved.len());
        for text in &retrieved {
            let summary =
                self.generator
                    .generate(model, prompts::STUDY_SYSTEM, &prompts::study_user(text))?;
            summaries.push(summary);
        }

        Ok(summaries.join("\n\n"))
    }

    /// Generate multiple-choice questions about a passage, using retrieved
    /// chunks as context.
    #[inline]
    pub async fn quiz(&self, passage: &str, difficulty: Difficulty) -> Result<String> {
        let retrieved = self.retrieve(passage).await?;
        let context = retrieved.join("\n\n");

        let raw = self.generator.generate(
            &self.config.ollama.quiz_model,
            prompts::QUIZ_SYSTEM,
            &prompts::quiz_user(&context, &difficulty.to_string()),
        )?;

        Ok(prompts::strip_reasoning(&raw).to_string())
    }

    /// Top-k similarity retrieval against the active document's collection,
    /// in retrieval order.
    async fn retrieve(&self, passage: &str) -> Result<Vec<String>> {
        let document = self.active_document().await?;
        let collection = document.collection.ok_or_else(|| {
            TutorError::Pipeline(format!(
                "Document {} has no collection recorded",
                document.name
            ))
        })?;

        let query_vector = self.embedder.embed(passage)?;
        let scored = self
            .store
            .query(
                &collection,
                &query_vector,
                self.config.store.top_k,
                self.config.store.min_score,
            )
            .await?;

        Ok(scored.into_iter().map(|chunk| chunk.text).collect())
    }

    /// The most recently completed document.
    #[inline]
    pub async fn active_document(&self) -> Result<Document> {
        self.registry
            .latest_completed()
            .await
            .map_err(TutorError::Other)?
            .ok_or_else(|| {
                TutorError::Pipeline(
                    "No document has been processed yet. Run `pdf-tutor upload <pdf>` first."
                        .to_string(),
                )
            })
    }

    async fn set_status(&self, id: i64, status: DocumentStatus) -> Result<()> {
        self.registry
            .update_document(
                id,
                DocumentUpdate {
                    status: Some(status),
                    ..DocumentUpdate::default()
                },
            )
            .await
            .map_err(TutorError::Other)?;
        Ok(())
    }
}
