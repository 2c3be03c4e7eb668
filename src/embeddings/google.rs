//! Google Generative AI embedding provider.
//!
//! Talks to the Generative Language API `embedContent` endpoint. The task
//! intent is forwarded as the API's `taskType` so asymmetric models produce
//! document-side vectors during indexing and query-side vectors at search
//! time.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::EmbeddingConfig;
use crate::embeddings::{EmbedError, EmbeddingProvider, TaskIntent};
use crate::types::RagPackError;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Embedding client for `models/text-embedding-004` and compatible models.
#[derive(Clone, Debug)]
pub struct GoogleAiEmbeddingProvider {
    client: Client,
    request_url: Url,
    model: String,
    api_key: String,
    max_retries: usize,
}

impl GoogleAiEmbeddingProvider {
    /// Builds the provider from run-scoped configuration.
    ///
    /// Fails with [`RagPackError::EmbeddingServiceUnavailable`] when the
    /// configuration can never produce a working client (blank key, bad
    /// endpoint), mirroring the fatal class of that error at call time.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RagPackError> {
        if config.api_key.trim().is_empty() {
            return Err(RagPackError::EmbeddingServiceUnavailable(
                "API key is empty".to_string(),
            ));
        }

        let base = Url::parse(config.endpoint.trim_end_matches('/')).map_err(|err| {
            RagPackError::EmbeddingServiceUnavailable(format!(
                "invalid endpoint '{}': {err}",
                config.endpoint
            ))
        })?;
        let request_url = Url::parse(&format!(
            "{}/{}:embedContent",
            base.as_str().trim_end_matches('/'),
            config.model
        ))
        .map_err(
            |err| {
                RagPackError::EmbeddingServiceUnavailable(format!(
                    "invalid model path '{}': {err}",
                    config.model
                ))
            },
        )?;

        let client = Client::builder()
            .timeout(config.timeout)
            .use_rustls_tls()
            .build()
            .map_err(|err| {
                RagPackError::EmbeddingServiceUnavailable(format!(
                    "failed to build HTTP client: {err}"
                ))
            })?;

        Ok(Self {
            client,
            request_url,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries.max(1),
        })
    }

    fn should_retry_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

#[async_trait]
impl EmbeddingProvider for GoogleAiEmbeddingProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str, intent: TaskIntent) -> Result<Vec<f32>, EmbedError> {
        let request = EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: vec![Part { text }],
            },
            task_type: task_type_label(intent),
        };

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = self
                .client
                .post(self.request_url.clone())
                .header(API_KEY_HEADER, &self.api_key)
                .json(&request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbedContentResponse = resp.json().await.map_err(|err| {
                            EmbedError::Failed(format!("malformed embedding response: {err}"))
                        })?;
                        if parsed.embedding.values.is_empty() {
                            return Err(EmbedError::Failed(
                                "service returned an empty vector".to_string(),
                            ));
                        }
                        return Ok(parsed.embedding.values);
                    }

                    // Credential problems make every future call pointless.
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(EmbedError::Unavailable(format!(
                            "request rejected with {status}"
                        )));
                    }

                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if Self::should_retry_status(status) && attempt < self.max_retries {
                        tracing::debug!(%status, attempt, "retrying embedding call");
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbedError::Failed(format!(
                        "embedding request failed ({status}): {body}"
                    )));
                }
                Err(err) => {
                    if err.is_connect() {
                        return Err(EmbedError::Unavailable(format!(
                            "cannot reach embedding service: {err}"
                        )));
                    }
                    if err.is_timeout() && attempt < self.max_retries {
                        tracing::debug!(attempt, "embedding call timed out, retrying");
                        tokio::time::sleep(Self::retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbedError::Failed(err.to_string()));
                }
            }
        }
    }
}

fn task_type_label(intent: TaskIntent) -> &'static str {
    match intent {
        TaskIntent::Document => "RETRIEVAL_DOCUMENT",
        TaskIntent::Query => "RETRIEVAL_QUERY",
    }
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_api_key_is_rejected_up_front() {
        let config = EmbeddingConfig::new("   ");
        let err = GoogleAiEmbeddingProvider::new(&config).unwrap_err();
        assert!(matches!(err, RagPackError::EmbeddingServiceUnavailable(_)));
    }

    #[test]
    fn task_types_match_the_api_contract() {
        assert_eq!(task_type_label(TaskIntent::Document), "RETRIEVAL_DOCUMENT");
        assert_eq!(task_type_label(TaskIntent::Query), "RETRIEVAL_QUERY");
    }

    #[test]
    fn request_url_includes_model_action() {
        let config = EmbeddingConfig::new("key");
        let provider = GoogleAiEmbeddingProvider::new(&config).unwrap();
        assert!(
            provider
                .request_url
                .as_str()
                .ends_with("/models/text-embedding-004:embedContent")
        );
    }
}
