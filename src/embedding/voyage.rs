use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{EmbeddingClient, EmbeddingClientError, RetryPolicy};
use crate::config::{Config, DEFAULT_BATCH_SIZE};

/// Failure of a single embedding request.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response ({status}): {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed response: {0}")]
    Payload(String),
}

/// Voyage AI embeddings client with bounded fixed-delay retries.
pub struct VoyageClient {
    client: Client,
    endpoint: String,
    model: String,
    retry: RetryPolicy,
    max_batch_size: usize,
}

impl VoyageClient {
    /// Build a client for `{base_url}/embeddings` authenticated with `api_key`.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
    ) -> Result<Self, EmbeddingClientError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(EmbeddingClientError::InvalidConfiguration(
                "missing embedding API key".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|err| EmbeddingClientError::InvalidConfiguration(err.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent("tgp-ingest/0.1")
            .default_headers(headers)
            .build()
            .map_err(|err| EmbeddingClientError::InvalidConfiguration(err.to_string()))?;

        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        let model = model.into();
        tracing::debug!(endpoint = %endpoint, model = %model, "Initialized embedding client");

        Ok(Self {
            client,
            endpoint,
            model,
            retry: RetryPolicy::default(),
            max_batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Build a client from the run configuration, including its retry settings.
    pub fn from_config(config: &Config) -> Result<Self, EmbeddingClientError> {
        Ok(Self::new(
            &config.voyage_api_key,
            &config.voyage_base_url,
            config.voyage_model.clone(),
        )?
        .with_retry_policy(RetryPolicy {
            max_attempts: config.embed_max_attempts,
            delay: config.embed_retry_delay,
        })
        .with_max_batch_size(config.batch_size))
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the per-request input limit.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    async fn request_once(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AttemptError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AttemptError::Status { status, body });
        }

        let payload: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|err| AttemptError::Payload(format!("{err}: {body}")))?;
        let Some(mut data) = payload.data else {
            let detail = payload.detail.or(payload.error).unwrap_or(Value::Null);
            return Err(AttemptError::Payload(format!("no data in response: {detail}")));
        };

        if data.len() != texts.len() {
            return Err(AttemptError::Payload(format!(
                "received {} embeddings for {} inputs",
                data.len(),
                texts.len()
            )));
        }

        if data.iter().all(|entry| entry.index.is_some()) {
            data.sort_by_key(|entry| entry.index);
        }
        Ok(data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingClient for VoyageClient {
    async fn generate_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > self.max_batch_size {
            return Err(EmbeddingClientError::BatchTooLarge {
                size: texts.len(),
                max: self.max_batch_size,
            });
        }

        tracing::debug!(model = %self.model, inputs = texts.len(), "Generating embeddings");
        self.retry
            .run(|_| self.request_once(texts))
            .await
            .map_err(|exhausted| {
                tracing::error!(
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "Embedding batch failed"
                );
                EmbeddingClientError::RetriesExhausted {
                    attempts: exhausted.attempts,
                    last_error: exhausted.last_error.to_string(),
                }
            })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Option<Vec<EmbeddingData>>,
    detail: Option<Value>,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;
    use std::time::Duration;

    fn client_for(server: &MockServer) -> VoyageClient {
        VoyageClient::new("test-key", &server.base_url(), "voyage-3")
            .expect("client")
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                delay: Duration::ZERO,
            })
    }

    fn texts(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn returns_vectors_in_input_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .header("authorization", "Bearer test-key")
                    .json_body(json!({ "model": "voyage-3", "input": ["first", "second"] }));
                then.status(200).json_body(json!({
                    "object": "list",
                    "data": [
                        { "object": "embedding", "embedding": [0.2, 0.2], "index": 1 },
                        { "object": "embedding", "embedding": [0.1, 0.1], "index": 0 }
                    ],
                    "model": "voyage-3"
                }));
            })
            .await;

        let vectors = client_for(&server)
            .generate_embeddings(&texts(&["first", "second"]))
            .await
            .expect("embeddings");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![0.1, 0.1], vec![0.2, 0.2]]);
    }

    #[tokio::test]
    async fn recovers_after_two_failures_with_ordered_vectors() {
        let server = MockServer::start_async().await;
        let failing = server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(503).body("overloaded");
            })
            .await;
        let client = VoyageClient::new("test-key", &server.base_url(), "voyage-3")
            .expect("client")
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(300),
            });
        let inputs = texts(&["first", "second", "third"]);

        // Swap in a healthy response while the client waits out its second retry delay.
        let recover = async {
            let mut failures = failing.hits_async().await;
            while failures < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                failures = failing.hits_async().await;
            }
            failing.delete_async().await;
            let healthy = server
                .mock_async(|when, then| {
                    when.method(POST)
                        .path("/embeddings")
                        .json_body(json!({ "model": "voyage-3", "input": ["first", "second", "third"] }));
                    then.status(200).json_body(json!({
                        "data": [
                            { "embedding": [3.0], "index": 2 },
                            { "embedding": [1.0], "index": 0 },
                            { "embedding": [2.0], "index": 1 }
                        ]
                    }));
                })
                .await;
            (failures, healthy)
        };

        let (result, (failures, healthy)) =
            tokio::join!(client.generate_embeddings(&inputs), recover);

        healthy.assert_hits_async(1).await;
        assert_eq!(failures + healthy.hits_async().await, 3);
        assert_eq!(
            result.expect("embeddings after retries"),
            vec![vec![1.0], vec![2.0], vec![3.0]]
        );
    }

    #[tokio::test]
    async fn persistent_failure_stops_after_three_attempts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(429).json_body(json!({ "detail": "rate limited" }));
            })
            .await;

        let error = client_for(&server)
            .generate_embeddings(&texts(&["a", "b"]))
            .await
            .unwrap_err();

        mock.assert_hits_async(3).await;
        match error {
            EmbeddingClientError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("429"), "{last_error}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_payload_with_success_status_is_a_failure() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(json!({ "detail": "model overloaded" }));
            })
            .await;

        let error = client_for(&server)
            .generate_embeddings(&texts(&["a"]))
            .await
            .unwrap_err();

        mock.assert_hits_async(3).await;
        assert!(error.to_string().contains("model overloaded"), "{error}");
    }

    #[tokio::test]
    async fn count_mismatch_is_a_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200)
                    .json_body(json!({ "data": [{ "embedding": [1.0], "index": 0 }] }));
            })
            .await;

        let error = client_for(&server)
            .generate_embeddings(&texts(&["a", "b"]))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("1 embeddings for 2 inputs"), "{error}");
    }

    #[tokio::test]
    async fn oversized_and_empty_batches_skip_the_network() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(json!({ "data": [] }));
            })
            .await;

        let client = client_for(&server).with_max_batch_size(2);
        let error = client
            .generate_embeddings(&texts(&["a", "b", "c"]))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            EmbeddingClientError::BatchTooLarge { size: 3, max: 2 }
        ));

        let empty = client.generate_embeddings(&[]).await.expect("empty batch");
        assert!(empty.is_empty());
        mock.assert_hits_async(0).await;
    }

    #[test]
    fn blank_api_key_is_rejected() {
        assert!(matches!(
            VoyageClient::new("  ", "https://api.voyageai.com/v1", "voyage-3"),
            Err(EmbeddingClientError::InvalidConfiguration(_))
        ));
    }
}
