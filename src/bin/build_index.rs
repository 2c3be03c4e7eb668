//! Command-line front-end for the indexing pipeline.
//!
//! Reads `.txt` files from an input directory, embeds them with the Google
//! provider (or the deterministic mock when `RAGPACK_MOCK_EMBEDDINGS=1`),
//! and writes the packaged index zip. Configuration comes from the
//! environment; a `.env` file is honored.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::FmtSubscriber;

use ragpack::{
    EmbeddingConfig, EmbeddingProvider, GoogleAiEmbeddingProvider, IndexPipeline,
    MockEmbeddingProvider, RagPackError, StatusSender,
};

#[tokio::main]
async fn main() -> Result<(), RagPackError> {
    init_tracing();

    let input_dir = env::var("RAGPACK_INPUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./transcripts"));
    let destination = env::var("RAGPACK_OUTPUT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./ragpack_index.zip"));
    let use_mock = env::var("RAGPACK_MOCK_EMBEDDINGS")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let provider: Arc<dyn EmbeddingProvider> = if use_mock {
        Arc::new(MockEmbeddingProvider::new())
    } else {
        let config = EmbeddingConfig::from_env()?;
        Arc::new(GoogleAiEmbeddingProvider::new(&config)?)
    };
    println!("Embedding provider: {}", provider.name());

    let (status, mut events) = StatusSender::channel();
    let pipeline = IndexPipeline::builder()
        .provider(provider)
        .status(status)
        .build();

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{event}");
        }
    });

    let result = pipeline.run_dir(&input_dir, &destination).await;
    drop(pipeline);
    let _ = printer.await;

    let outcome = result?;

    println!("\n✅ Index build complete!");
    println!("  documents loaded : {}", outcome.documents_loaded);
    println!("  chunks indexed   : {}", outcome.chunks_indexed);
    println!("  chunks failed    : {}", outcome.report.failures.len());
    println!("  inputs skipped   : {}", outcome.input_failures.len());
    for failure in &outcome.input_failures {
        println!("    ⏭︎ {}: {}", failure.path.display(), failure.reason);
    }
    println!("  artifact         : {}", outcome.artifact_path.display());

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
