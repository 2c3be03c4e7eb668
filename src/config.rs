//! Run-scoped configuration for chunking and the embedding service.
//!
//! Credentials are injected through [`EmbeddingConfig`] rather than read from
//! process-global state inside the adapter; [`EmbeddingConfig::from_env`] is
//! the one place environment lookup happens, intended for binaries.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::RagPackError;

/// Default upper bound on characters per chunk.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 800;
/// Default number of characters shared between consecutive chunks.
pub const DEFAULT_OVERLAP: usize = 180;

/// Environment variable holding the Google AI API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

const DEFAULT_MODEL: &str = "models/text-embedding-004";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Parameters controlling how documents are split into chunks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Upper bound on characters per chunk. A chunk may exceed this only when
    /// a single unbreakable run of non-whitespace characters does.
    pub max_chunk_size: usize,
    /// Characters shared between consecutive chunks of the same document.
    /// Must be strictly smaller than `max_chunk_size`.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    /// Creates a validated configuration.
    pub fn new(max_chunk_size: usize, overlap: usize) -> Result<Self, RagPackError> {
        let config = Self {
            max_chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the constraints from the chunking contract. Called again by the
    /// pipeline before any work starts, so hand-constructed configs are also
    /// caught.
    pub fn validate(&self) -> Result<(), RagPackError> {
        if self.max_chunk_size == 0 {
            return Err(RagPackError::InvalidConfiguration(
                "max_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.max_chunk_size {
            return Err(RagPackError::InvalidConfiguration(format!(
                "overlap ({}) must be smaller than max_chunk_size ({})",
                self.overlap, self.max_chunk_size
            )));
        }
        Ok(())
    }
}

/// Connection settings for the embedding service, created once per run.
#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    /// API key for the embedding service.
    pub api_key: String,
    /// Model identifier, e.g. `models/text-embedding-004`.
    pub model: String,
    /// Base URL of the service API.
    pub endpoint: String,
    /// Per-call timeout. A timed-out call counts as a per-chunk failure.
    pub timeout: Duration,
    /// Attempt budget per call for transient failures (including the first).
    pub max_retries: usize,
    /// Upper bound on concurrently in-flight embedding calls.
    pub concurrency: usize,
}

impl EmbeddingConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            concurrency: 8,
        }
    }

    /// Reads the API key from `GOOGLE_API_KEY`, loading a `.env` file first
    /// when present.
    pub fn from_env() -> Result<Self, RagPackError> {
        dotenvy::dotenv().ok();
        let api_key = env::var(API_KEY_ENV).map_err(|_| {
            RagPackError::EmbeddingServiceUnavailable(format!("{API_KEY_ENV} is not set"))
        })?;
        Ok(Self::new(api_key))
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}
