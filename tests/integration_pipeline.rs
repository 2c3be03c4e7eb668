//! End-to-end pipeline tests with deterministic mock embeddings.
//!
//! These cover the full flow from input files to the loadable zip artifact,
//! plus the fatal paths that must leave no artifact behind.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::tempdir;

use ragpack::{
    Artifact, CancelHandle, ChunkingConfig, Document, EmbedError, EmbeddingProvider,
    IndexPipeline, LoadOutcome, MockEmbeddingProvider, RagPackError, StatusSender, TaskIntent,
};

/// Fails any chunk whose text contains the marker; embeds the rest
/// deterministically.
struct PoisonedProvider {
    inner: MockEmbeddingProvider,
    marker: &'static str,
}

impl PoisonedProvider {
    fn new(marker: &'static str) -> Self {
        Self {
            inner: MockEmbeddingProvider::new(),
            marker,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for PoisonedProvider {
    fn name(&self) -> &str {
        "poisoned-mock"
    }

    async fn embed(&self, text: &str, intent: TaskIntent) -> Result<Vec<f32>, EmbedError> {
        if !self.marker.is_empty() && text.contains(self.marker) {
            return Err(EmbedError::Failed("simulated quota failure".to_string()));
        }
        self.inner.embed(text, intent).await
    }
}

struct DownProvider;

#[async_trait]
impl EmbeddingProvider for DownProvider {
    fn name(&self) -> &str {
        "down"
    }

    async fn embed(&self, _text: &str, _intent: TaskIntent) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Unavailable("dns resolution failed".to_string()))
    }
}

fn mock_pipeline() -> IndexPipeline {
    IndexPipeline::builder()
        .provider(Arc::new(MockEmbeddingProvider::new()))
        .build()
}

fn documents(count: usize) -> LoadOutcome {
    let docs = (0..count)
        .map(|i| {
            Document::new(
                format!("doc{i}.txt"),
                format!("Document number {i} talks about topic {} in a short paragraph.", i % 3),
            )
        })
        .collect();
    LoadOutcome::from_documents(docs)
}

#[tokio::test]
async fn full_run_from_directory_to_loadable_artifact() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    std::fs::write(
        input.path().join("alpha.txt"),
        "The first transcript covers the project kickoff meeting in detail.",
    )
    .unwrap();
    std::fs::write(
        input.path().join("beta.txt"),
        "The second transcript records the architecture review discussion.",
    )
    .unwrap();
    std::fs::write(input.path().join("broken.txt"), [0xffu8, 0xfe]).unwrap();

    let destination = output.path().join("index.zip");
    let outcome = mock_pipeline()
        .run_dir(input.path(), &destination)
        .await
        .unwrap();

    assert_eq!(outcome.documents_loaded, 2);
    assert_eq!(outcome.input_failures.len(), 1);
    assert!(outcome.input_failures[0].path.ends_with("broken.txt"));
    assert!(outcome.chunks_indexed >= 2);
    assert_eq!(outcome.artifact_path, destination);

    let artifact = Artifact::load(&destination).unwrap();
    assert_eq!(artifact.index.len(), outcome.chunks_indexed);
    assert_eq!(artifact.payload.docstore.len(), outcome.chunks_indexed);
    assert_eq!(
        artifact.payload.index_to_docstore_id.len(),
        outcome.chunks_indexed
    );

    // Every vector's own nearest neighbor is itself, and it resolves back to
    // a chunk from one of the input documents.
    for ordinal in 0..artifact.index.len() {
        let query = artifact.index.vector(ordinal).unwrap().to_vec();
        let hits = artifact.index.search(&query, 1);
        assert_eq!(hits[0].ordinal, ordinal);
        assert!(hits[0].distance.abs() < 1e-5);
        let chunk = artifact.payload.chunk_at(ordinal).unwrap();
        assert!(chunk.document == "alpha.txt" || chunk.document == "beta.txt");
    }
}

#[tokio::test]
async fn one_failure_out_of_ten_still_produces_nine_entries() {
    let pipeline = IndexPipeline::builder()
        .provider(Arc::new(PoisonedProvider::new("number 7")))
        .build();

    let output = tempdir().unwrap();
    let destination = output.path().join("index.zip");
    let outcome = pipeline.run(documents(10), &destination).await.unwrap();

    assert_eq!(outcome.chunks_indexed, 9);
    assert_eq!(outcome.report.attempted, 10);
    assert_eq!(outcome.report.failures.len(), 1);
    assert!(outcome.report.summary().contains("9 of 10"));

    let artifact = Artifact::load(&destination).unwrap();
    assert_eq!(artifact.index.len(), 9);
    let failed_id = outcome.report.failures[0].chunk_id;
    assert!(artifact.payload.docstore.get(failed_id).is_none());
    assert!(!artifact.payload.index_to_docstore_id.contains(&failed_id));
}

#[tokio::test]
async fn all_failures_abort_with_no_artifact() {
    let pipeline = IndexPipeline::builder()
        .provider(Arc::new(PoisonedProvider::new("Document")))
        .build();

    let output = tempdir().unwrap();
    let destination = output.path().join("index.zip");
    let err = pipeline.run(documents(3), &destination).await.unwrap_err();

    assert!(matches!(err, RagPackError::NoEmbeddingsProduced { failed: 3 }));
    assert!(!destination.exists(), "no artifact may exist after failure");
}

#[tokio::test]
async fn unavailable_service_aborts_with_no_artifact() {
    let pipeline = IndexPipeline::builder()
        .provider(Arc::new(DownProvider))
        .build();

    let output = tempdir().unwrap();
    let destination = output.path().join("index.zip");
    let err = pipeline.run(documents(3), &destination).await.unwrap_err();

    assert!(matches!(err, RagPackError::EmbeddingServiceUnavailable(_)));
    assert!(!destination.exists());
}

#[tokio::test]
async fn cancelled_run_produces_no_artifact() {
    let cancel = CancelHandle::new();
    let pipeline = IndexPipeline::builder()
        .provider(Arc::new(MockEmbeddingProvider::new()))
        .cancel_handle(cancel.clone())
        .build();
    cancel.cancel();

    let output = tempdir().unwrap();
    let destination = output.path().join("index.zip");
    let err = pipeline.run(documents(3), &destination).await.unwrap_err();

    assert!(matches!(err, RagPackError::Cancelled));
    assert!(!destination.exists());
}

#[tokio::test]
async fn invalid_chunking_config_is_rejected_before_any_work() {
    let pipeline = IndexPipeline::builder()
        .provider(Arc::new(MockEmbeddingProvider::new()))
        .chunking(ChunkingConfig {
            max_chunk_size: 100,
            overlap: 100,
        })
        .build();

    let output = tempdir().unwrap();
    let destination = output.path().join("index.zip");
    let err = pipeline.run(documents(1), &destination).await.unwrap_err();

    assert!(matches!(err, RagPackError::InvalidConfiguration(_)));
    assert!(!destination.exists());
}

#[tokio::test]
async fn reruns_on_identical_input_are_deterministic() {
    let output = tempdir().unwrap();
    let first_path = output.path().join("first.zip");
    let second_path = output.path().join("second.zip");

    mock_pipeline()
        .run(documents(4), &first_path)
        .await
        .unwrap();
    mock_pipeline()
        .run(documents(4), &second_path)
        .await
        .unwrap();

    let first = Artifact::load(&first_path).unwrap();
    let second = Artifact::load(&second_path).unwrap();

    assert_eq!(first.index, second.index);
    assert_eq!(first.payload, second.payload);
}

#[tokio::test]
async fn status_events_cover_every_stage() {
    let (status, mut rx) = StatusSender::channel();
    let pipeline = IndexPipeline::builder()
        .provider(Arc::new(MockEmbeddingProvider::new()))
        .status(status)
        .build();

    let output = tempdir().unwrap();
    pipeline
        .run(documents(2), &output.path().join("index.zip"))
        .await
        .unwrap();
    drop(pipeline);

    let mut scopes = Vec::new();
    while let Some(event) = rx.recv().await {
        scopes.push(event.scope);
    }
    for expected in ["ingest", "chunking", "embedding", "index", "artifact"] {
        assert!(
            scopes.iter().any(|scope| scope == expected),
            "missing status scope {expected}, got {scopes:?}"
        );
    }
}

#[tokio::test]
async fn chunk_ids_in_the_artifact_are_unique() {
    let pipeline = IndexPipeline::builder()
        .provider(Arc::new(MockEmbeddingProvider::new()))
        .chunking(ChunkingConfig {
            max_chunk_size: 40,
            overlap: 10,
        })
        .build();

    let docs = LoadOutcome::from_documents(vec![
        Document::new(
            "long1.txt",
            "A longer document that will certainly be split into several chunks by the small configured budget.",
        ),
        Document::new(
            "long2.txt",
            "Another longer document that also produces multiple chunks so ids must stay unique across documents.",
        ),
    ]);

    let output = tempdir().unwrap();
    let destination = output.path().join("index.zip");
    let outcome = pipeline.run(docs, &destination).await.unwrap();
    assert!(outcome.chunks_indexed > 2);

    let artifact = Artifact::load(&destination).unwrap();
    let mut ids = artifact.payload.index_to_docstore_id.clone();
    let before = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), before);
}
