use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::ollama::OllamaClient;
use crate::pipeline::{Difficulty, TutorPipeline};
use crate::registry::Registry;
use crate::registry::models::Document;
use crate::store::VectorStore;

async fn open_registry(config: &Config) -> Result<Registry> {
    let data_dir = config.data_dir().context("Failed to resolve data directory")?;
    Registry::initialize_from_data_dir(&data_dir)
        .await
        .context("Failed to initialize document registry")
}

/// Find a document by numeric id or by name.
async fn find_document(registry: &Registry, identifier: &str) -> Result<Document> {
    let document = if let Ok(id) = identifier.parse::<i64>() {
        registry.get_document(id).await?
    } else {
        registry.get_document_by_name(identifier).await?
    };

    document.ok_or_else(|| anyhow::anyhow!("Document not found: {}", identifier))
}

/// Ingest a PDF document: extract, chunk, embed, index, and outline it.
#[inline]
pub async fn upload_document(path: PathBuf) -> Result<()> {
    info!("Uploading document: {}", path.display());

    let config = Config::load()?;
    let registry = open_registry(&config).await?;
    let store = VectorStore::connect(&config).await?;
    let client = OllamaClient::new(&config)?;

    let pipeline = TutorPipeline::new(&config, &registry, &store, &client, &client)
        .with_progress(true);
    let outcome = pipeline.upload(Some(&path)).await?;

    println!("✅ {}", outcome.status);
    println!("   Chunks stored: {}", outcome.chunks.len());
    println!();
    println!("Outline:");
    println!("{}", outcome.outline);

    Ok(())
}

/// Print the stored outline for a document (default: the active one).
#[inline]
pub async fn show_outline(identifier: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let registry = open_registry(&config).await?;

    let document = match identifier {
        Some(identifier) => find_document(&registry, &identifier).await?,
        None => registry
            .latest_completed()
            .await?
            .ok_or_else(|| anyhow::anyhow!("No document has been processed yet"))?,
    };

    match document.outline {
        Some(outline) => {
            println!("📖 Outline of {} (ID: {})", document.name, document.id);
            println!();
            println!("{}", outline);
        }
        None => {
            println!(
                "Document {} has no outline yet (status: {})",
                document.name, document.status
            );
        }
    }

    Ok(())
}

/// Generate a study summary for a passage against the active document.
#[inline]
pub async fn study_passage(passage: String) -> Result<()> {
    let config = Config::load()?;
    let registry = open_registry(&config).await?;
    let store = VectorStore::connect(&config).await?;
    let client = OllamaClient::new(&config)?;

    let pipeline = TutorPipeline::new(&config, &registry, &store, &client, &client);
    let document = pipeline.active_document().await?;
    println!("📚 Studying against: {}", document.name);
    println!();

    let summary = pipeline.study(&passage).await?;
    println!("{}", summary);

    Ok(())
}

/// Generate multiple-choice test questions for a passage.
#[inline]
pub async fn test_passage(passage: String, difficulty: Difficulty) -> Result<()> {
    let config = Config::load()?;
    let registry = open_registry(&config).await?;
    let store = VectorStore::connect(&config).await?;
    let client = OllamaClient::new(&config)?;

    let pipeline = TutorPipeline::new(&config, &registry, &store, &client, &client);
    let document = pipeline.active_document().await?;
    println!(
        "📝 Generating {} questions against: {}",
        difficulty, document.name
    );
    println!();

    let questions = pipeline.quiz(&passage, difficulty).await?;
    println!("{}", questions);

    Ok(())
}

/// List all ingested documents and their status.
#[inline]
pub async fn list_documents() -> Result<()> {
    let config = Config::load()?;
    let registry = open_registry(&config).await?;

    let documents = registry.list_documents().await?;

    if documents.is_empty() {
        println!("No documents have been uploaded yet.");
        println!("Use 'pdf-tutor upload <pdf>' to ingest one.");
        return Ok(());
    }

    println!("Documents ({} total):", documents.len());
    println!();

    for document in &documents {
        println!("📄 {} (ID: {})", document.name, document.id);
        println!("   Path: {}", document.path);
        println!("   Status: {}", document.status);

        if document.chunk_count > 0 {
            println!("   Chunks: {}", document.chunk_count);
        }
        if let Some(collection) = &document.collection {
            println!("   Collection: {}", collection);
        }
        if let Some(error) = &document.error_message {
            println!("   ⚠️  Error: {}", error);
        }
        if let Some(completed) = document.completed_date {
            println!("   Completed: {}", completed.format("%Y-%m-%d %H:%M:%S"));
        }
        println!(
            "   Created: {}",
            document.created_date.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }

    let completed = documents.iter().filter(|d| d.is_completed()).count();
    let failed = documents.iter().filter(|d| d.is_failed()).count();
    println!("Summary:");
    println!("  Total: {}", documents.len());
    println!("  Completed: {}", completed);
    println!("  Failed: {}", failed);

    Ok(())
}

/// Delete a document, its registry row, and its vector collection.
#[inline]
pub async fn delete_document(identifier: String) -> Result<()> {
    let config = Config::load()?;
    let registry = open_registry(&config).await?;
    let store = VectorStore::connect(&config).await?;

    let document = find_document(&registry, &identifier).await?;
    println!("Found document: {} (ID: {})", document.name, document.id);

    if let Some(collection) = &document.collection {
        store.drop_collection(collection).await?;
        println!("✓ Vector collection {} deleted", collection);
    }

    registry.delete_document(document.id).await?;
    println!("✓ Registry entry deleted");

    Ok(())
}

/// Show connectivity and pipeline status.
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 PDF Tutor Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🗄️  Registry Status:");
    let registry = match open_registry(&config).await {
        Ok(registry) => {
            println!("   ✅ SQLite: Connected");
            Some(registry)
        }
        Err(e) => {
            println!("   ❌ SQLite: Failed to connect - {}", e);
            None
        }
    };

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config) {
        Ok(client) => match client.health_check(&config) {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Embedding Model: {}", config.ollama.embedding_model);
                println!("   📋 Chat Model: {}", config.ollama.chat_model);
                println!("   📋 Quiz Model: {}", config.ollama.quiz_model);
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Connected but unhealthy - {}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Failed to connect - {}", e);
        }
    }

    println!("🔍 Vector Store Status:");
    let store = match VectorStore::connect(&config).await {
        Ok(store) => {
            println!("   ✅ LanceDB: Connected");
            Some(store)
        }
        Err(e) => {
            println!("   ❌ LanceDB: Failed to connect - {}", e);
            None
        }
    };

    if let Some(registry) = registry {
        println!();
        println!("📚 Document Overview:");
        match registry.list_documents().await {
            Ok(documents) => {
                if documents.is_empty() {
                    println!("   📭 No documents uploaded yet");
                } else {
                    let completed = documents.iter().filter(|d| d.is_completed()).count();
                    let failed = documents.iter().filter(|d| d.is_failed()).count();
                    let total_chunks: i64 = documents.iter().map(|d| d.chunk_count).sum();

                    println!("   📊 Total Documents: {}", documents.len());
                    println!("   ✅ Completed: {}", completed);
                    println!("   ❌ Failed: {}", failed);
                    println!("   📄 Total Chunks Indexed: {}", total_chunks);

                    if let Ok(Some(active)) = registry.latest_completed().await {
                        println!("   🎯 Active Document: {} (ID: {})", active.name, active.id);
                        if let (Some(store), Some(collection)) = (&store, &active.collection) {
                            match store.count(collection).await {
                                Ok(count) => {
                                    println!("   🔢 Active Collection Rows: {}", count);
                                }
                                Err(e) => {
                                    println!("   ⚠️  Active collection unreadable: {}", e);
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                println!("   ❌ Failed to load documents: {}", e);
            }
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'pdf-tutor upload <pdf>' to ingest a document");
    println!("   • Use 'pdf-tutor study <passage>' to get a study summary");
    println!("   • Use 'pdf-tutor test <passage>' to generate quiz questions");

    Ok(())
}
