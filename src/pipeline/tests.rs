use super::*;
use crate::extract::tests::write_test_pdf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;

const DIM: usize = 4;

/// Marker that makes the mock embedder produce a vector orthogonal to every
/// document chunk.
const UNRELATED: &str = "unrelated";

struct MockEmbedder {
    embed_calls: AtomicUsize,
    fail: AtomicBool,
    fail_on: Mutex<Option<String>>,
}

impl MockEmbedder {
    fn new() -> Self {
        Self {
            embed_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            fail_on: Mutex::new(None),
        }
    }

    fn calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn fail_on(&self, marker: &str) {
        *self.fail_on.lock().expect("lock poisoned") = Some(marker.to_string());
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(TutorError::Embedding("mock embedder down".to_string()));
        }
        let marker = self.fail_on.lock().expect("lock poisoned").clone();
        if let Some(marker) = marker {
            if text.contains(&marker) {
                return Err(TutorError::Embedding(format!(
                    "mock refuses text containing {}",
                    marker
                )));
            }
        }

        if text.contains(UNRELATED) {
            Ok(vec![0.0, 1.0, 0.0, 0.0])
        } else {
            Ok(vec![1.0, 0.0, 0.0, 0.0])
        }
    }

    fn probe_dimension(&self) -> crate::Result<usize> {
        Ok(DIM)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GenCall {
    model: String,
    system: String,
    user: String,
}

struct MockGenerator {
    calls: Mutex<Vec<GenCall>>,
    response: Mutex<String>,
}

impl MockGenerator {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            response: Mutex::new("generated text".to_string()),
        }
    }

    fn respond_with(&self, response: &str) {
        *self.response.lock().expect("lock poisoned") = response.to_string();
    }

    fn calls(&self) -> Vec<GenCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    fn reset(&self) {
        self.calls.lock().expect("lock poisoned").clear();
    }

    fn calls_with_system(&self, system: &str) -> usize {
        self.calls().iter().filter(|c| c.system == system).count()
    }
}

impl Generator for MockGenerator {
    fn generate(&self, model: &str, system_prompt: &str, user_prompt: &str) -> crate::Result<String> {
        self.calls.lock().expect("lock poisoned").push(GenCall {
            model: model.to_string(),
            system: system_prompt.to_string(),
            user: user_prompt.to_string(),
        });
        Ok(self.response.lock().expect("lock poisoned").clone())
    }
}

struct Fixture {
    config: Config,
    registry: Registry,
    store: VectorStore,
    embedder: MockEmbedder,
    generator: MockGenerator,
    _temp_dir: TempDir,
}

impl Fixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let config = Config {
            base_dir: Some(temp_dir.path().to_path_buf()),
            ..Config::default()
        };
        let registry = Registry::initialize_from_data_dir(temp_dir.path())
            .await
            .expect("registry opens");
        let store = VectorStore::connect(&config).await.expect("store connects");

        Self {
            config,
            registry,
            store,
            embedder: MockEmbedder::new(),
            generator: MockGenerator::new(),
            _temp_dir: temp_dir,
        }
    }

    fn pipeline(&self) -> TutorPipeline<'_, MockEmbedder, MockGenerator> {
        TutorPipeline::new(
            &self.config,
            &self.registry,
            &self.store,
            &self.embedder,
            &self.generator,
        )
    }

    fn pdf_path(&self, name: &str, pages: &[&str]) -> std::path::PathBuf {
        write_test_pdf(self._temp_dir.path(), name, pages)
    }
}

#[tokio::test]
async fn upload_without_file_is_a_fixed_outcome() {
    let fixture = Fixture::new().await;
    let pipeline = fixture.pipeline();

    let outcome = pipeline.upload(None).await.expect("upload succeeds");

    assert_eq!(outcome.status, NO_FILE_STATUS);
    assert!(outcome.outline.is_empty());
    assert!(outcome.chunks.is_empty());

    // No provider was touched and nothing was registered.
    assert_eq!(fixture.embedder.calls(), 0);
    assert!(fixture.generator.calls().is_empty());
    assert!(
        fixture
            .registry
            .list_documents()
            .await
            .expect("list succeeds")
            .is_empty()
    );
}

#[tokio::test]
async fn upload_small_document_end_to_end() {
    let fixture = Fixture::new().await;
    let pipeline = fixture.pipeline();
    let path = fixture.pdf_path("notes.pdf", &["the cell is the unit of life"]);

    fixture.generator.respond_with("1. Cells\n  1.1 Structure");
    let outcome = pipeline
        .upload(Some(&path))
        .await
        .expect("upload succeeds");

    assert_eq!(outcome.status, PROCESSED_STATUS);
    assert_eq!(outcome.outline, "1. Cells\n  1.1 Structure");
    assert_eq!(outcome.chunks.len(), 1);
    assert!(outcome.chunks[0].contains("unit of life"));

    let document = fixture
        .registry
        .get_document_by_name("notes")
        .await
        .expect("get succeeds")
        .expect("document exists");
    assert!(document.is_completed());
    assert_eq!(document.chunk_count, 1);
    assert_eq!(document.outline.as_deref(), Some("1. Cells\n  1.1 Structure"));

    let collection = document.collection.expect("collection recorded");
    assert_eq!(collection, format!("my_collection_v{}", document.id));
    assert_eq!(
        fixture.store.count(&collection).await.expect("count succeeds"),
        1
    );
}

#[tokio::test]
async fn upload_chunks_long_document_and_summarizes_each_chunk() {
    let fixture = Fixture::new().await;
    let pipeline = fixture.pipeline();

    // 2500 characters at 1000/200 must give exactly 3 chunks.
    let body = "abcdefghij".repeat(250);
    let path = fixture.pdf_path("long.pdf", &[&body]);

    let outcome = pipeline
        .upload(Some(&path))
        .await
        .expect("upload succeeds");
    assert_eq!(outcome.chunks.len(), 3);
    assert_eq!(outcome.chunks[0].len(), 1000);
    assert_eq!(outcome.chunks[1].len(), 1000);
    assert_eq!(outcome.chunks[2].len(), 900);

    // One keypoint summary per chunk plus one synthesis call.
    assert_eq!(
        fixture
            .generator
            .calls_with_system(prompts::CHUNK_SUMMARY_SYSTEM),
        3
    );
    assert_eq!(
        fixture.generator.calls_with_system(prompts::OUTLINE_SYSTEM),
        1
    );
    assert_eq!(fixture.generator.calls().len(), 4);

    // All outline calls go to the chat model.
    for call in fixture.generator.calls() {
        assert_eq!(call.model, fixture.config.ollama.chat_model);
    }
}

#[tokio::test]
async fn failed_upload_marks_document_and_keeps_previous_active() {
    let fixture = Fixture::new().await;
    let pipeline = fixture.pipeline();

    let first_path = fixture.pdf_path("good.pdf", &["stable knowledge"]);
    pipeline
        .upload(Some(&first_path))
        .await
        .expect("first upload succeeds");
    let first = pipeline
        .active_document()
        .await
        .expect("active document exists");

    // Second ingestion fails at the embedding stage (abort policy).
    fixture.embedder.fail_all();
    let second_path = fixture.pdf_path("bad.pdf", &["doomed content"]);
    let result = pipeline.upload(Some(&second_path)).await;
    assert!(matches!(result, Err(TutorError::Embedding(_))));

    let failed = fixture
        .registry
        .get_document_by_name("bad")
        .await
        .expect("get succeeds")
        .expect("document exists");
    assert!(failed.is_failed());
    assert!(
        failed
            .error_message
            .as_deref()
            .expect("error recorded")
            .contains("mock embedder down")
    );

    // The staging collection is gone and the first document is still active.
    let staging = format!("my_collection_v{}", failed.id);
    assert!(
        !fixture
            .store
            .collection_exists(&staging)
            .await
            .expect("exists check succeeds")
    );
    let active = pipeline
        .active_document()
        .await
        .expect("active document exists");
    assert_eq!(active.id, first.id);
}

#[tokio::test]
async fn skip_policy_drops_failing_chunks() {
    let fixture = Fixture::new().await;
    let config = Config {
        ingest: crate::config::IngestConfig {
            on_embedding_error: EmbeddingErrorPolicy::Skip,
        },
        ..fixture.config.clone()
    };
    let pipeline = TutorPipeline::new(
        &config,
        &fixture.registry,
        &fixture.store,
        &fixture.embedder,
        &fixture.generator,
    );

    // probe_dimension does not consume an embed call in the mock, so every
    // embed call maps to one chunk.
    fixture.embedder.fail_on("poison");
    let path = fixture.pdf_path("partial.pdf", &["healthy text", "poison text", "more text"]);

    let outcome = pipeline
        .upload(Some(&path))
        .await
        .expect("upload succeeds despite the bad chunk");
    assert_eq!(outcome.status, PROCESSED_STATUS);

    // The short pages collapse into one chunk containing the marker, so
    // everything is skipped and the document completes empty.
    let document = fixture
        .registry
        .get_document_by_name("partial")
        .await
        .expect("get succeeds")
        .expect("document exists");
    assert!(document.is_completed());
    assert_eq!(document.chunk_count, 0);
}

#[tokio::test]
async fn study_summarizes_each_retrieved_chunk() {
    let fixture = Fixture::new().await;
    let pipeline = fixture.pipeline();
    let path = fixture.pdf_path("study.pdf", &["photosynthesis converts light to energy"]);
    pipeline
        .upload(Some(&path))
        .await
        .expect("upload succeeds");
    fixture.generator.reset();
    fixture.generator.respond_with("a study summary");

    let summary = pipeline
        .study("photosynthesis")
        .await
        .expect("study succeeds");

    assert_eq!(summary, "a study summary");
    let calls = fixture.generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, prompts::STUDY_SYSTEM);
    assert_eq!(calls[0].model, fixture.config.ollama.chat_model);
    assert!(calls[0].user.contains("photosynthesis converts light"));
}

#[tokio::test]
async fn study_with_no_relevant_chunks_still_calls_once() {
    let fixture = Fixture::new().await;
    let pipeline = fixture.pipeline();
    let path = fixture.pdf_path("study.pdf", &["gravity bends spacetime"]);
    pipeline
        .upload(Some(&path))
        .await
        .expect("upload succeeds");
    fixture.generator.reset();

    // The passage embeds orthogonally to every chunk, so retrieval comes
    // back empty.
    let summary = pipeline
        .study("unrelated topic entirely")
        .await
        .expect("study succeeds");
    assert_eq!(summary, "generated text");

    let calls = fixture.generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].system, prompts::STUDY_SYSTEM);
    assert_eq!(calls[0].user, prompts::study_user(""));
}

#[tokio::test]
async fn study_without_document_is_a_pipeline_error() {
    let fixture = Fixture::new().await;
    let pipeline = fixture.pipeline();

    let result = pipeline.study("anything").await;
    assert!(matches!(result, Err(TutorError::Pipeline(_))));
    assert_eq!(fixture.embedder.calls(), 0);
    assert!(fixture.generator.calls().is_empty());
}

#[tokio::test]
async fn quiz_issues_one_call_with_difficulty_and_strips_reasoning() {
    let fixture = Fixture::new().await;
    let pipeline = fixture.pipeline();
    let path = fixture.pdf_path("quiz.pdf", &["mitochondria produce ATP"]);
    pipeline
        .upload(Some(&path))
        .await
        .expect("upload succeeds");
    fixture.generator.reset();
    fixture
        .generator
        .respond_with("<think>drafting questions</think>\n1. What produces ATP?");

    let questions = pipeline
        .quiz("mitochondria", Difficulty::Hard)
        .await
        .expect("quiz succeeds");
    assert_eq!(questions, "1. What produces ATP?");

    let calls = fixture.generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model, fixture.config.ollama.quiz_model);
    assert_eq!(calls[0].system, prompts::QUIZ_SYSTEM);
    assert!(calls[0].user.contains("3 hard-level multiple-choice questions"));
    assert!(calls[0].user.contains("mitochondria produce ATP"));
}

#[test]
fn difficulty_labels() {
    assert_eq!(Difficulty::Easy.to_string(), "easy");
    assert_eq!(Difficulty::Intermediate.to_string(), "intermediate");
    assert_eq!(Difficulty::Hard.to_string(), "hard");
}
