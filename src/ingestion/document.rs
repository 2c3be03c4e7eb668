//! Document model and input loaders.
//!
//! Loading is deliberately forgiving: an unreadable or non-UTF-8 file is
//! recorded in the outcome and skipped, never fatal to the batch. Only the
//! single-file API surfaces [`RagPackError::InputUnreadable`] directly.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::types::RagPackError;

/// A named unit of raw input text, immutable once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// Source identifier, typically the file name.
    pub name: String,
    /// Full UTF-8 text of the document.
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// One input file that could not be turned into a [`Document`].
#[derive(Clone, Debug)]
pub struct InputFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of loading a batch of inputs: the documents that loaded plus the
/// per-file failures that were skipped.
#[derive(Clone, Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub failures: Vec<InputFailure>,
}

impl LoadOutcome {
    /// Wraps already-materialized documents, e.g. (filename, text) pairs
    /// handed over by an upload front-end.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self {
            documents,
            failures: Vec::new(),
        }
    }
}

/// Loads a single UTF-8 text file as a document.
pub async fn load_file(path: &Path) -> Result<Document, RagPackError> {
    let bytes = fs::read(path)
        .await
        .map_err(|err| RagPackError::InputUnreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    let text = String::from_utf8(bytes).map_err(|_| RagPackError::InputUnreadable {
        path: path.to_path_buf(),
        reason: "file is not valid UTF-8".to_string(),
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(Document::new(name, text))
}

/// Loads the given files, skipping and recording any that fail.
pub async fn load_files(paths: &[PathBuf]) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();
    for path in paths {
        match load_file(path).await {
            Ok(document) => outcome.documents.push(document),
            Err(RagPackError::InputUnreadable { path, reason }) => {
                tracing::warn!(path = %path.display(), %reason, "skipping unreadable input");
                outcome.failures.push(InputFailure { path, reason });
            }
            // load_file only produces InputUnreadable.
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping input");
                outcome.failures.push(InputFailure {
                    path: path.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    outcome
}

/// Loads every `.txt` file directly inside `dir`, sorted by file name so runs
/// over the same directory are deterministic.
pub async fn load_text_dir(dir: &Path) -> Result<LoadOutcome, RagPackError> {
    let mut entries = fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("txt") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(load_files(&paths).await)
}
