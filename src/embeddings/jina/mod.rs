
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::{ApiKey, EmbeddingConfig};
use crate::embeddings::Embedder;
use crate::{RagError, Result};

/// Upper bound on a response body. A whole document is embedded in one
/// request, so responses grow with the chunk count.
pub const MAX_RESPONSE_BYTES: u64 = 1024 * 1024 * 1024;

/// Task flag sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmbeddingTask {
    #[serde(rename = "retrieval.passage")]
    Passage,
    #[serde(rename = "retrieval.query")]
    Query,
}

/// Client for the Jina AI embeddings endpoint
#[derive(Debug, Clone)]
pub struct JinaClient {
    api_url: Url,
    model: String,
    api_key: ApiKey,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    task: EmbeddingTask,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: serde_json::Value,
}

impl JinaClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig, api_key: ApiKey) -> Result<Self> {
        let api_url = config.api_url()?;

        // Status codes are inspected by hand so the API's error detail can be reported
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            api_url,
            model: config.model.clone(),
            api_key,
            agent,
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn embed(&self, task: EmbeddingTask, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(RagError::Embedding(
                "Cannot embed an empty list of texts".to_string(),
            ));
        }

        debug!(
            "Requesting {:?} embeddings for {} texts from {}",
            task,
            texts.len(),
            self.api_url
        );

        let request = EmbedRequest {
            model: &self.model,
            task,
            input: texts,
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            RagError::Embedding(format!("Failed to serialize embedding request: {}", e))
        })?;

        let response_text = self.post(&request_json)?;

        let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::Embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        let embeddings = order_embeddings(response.data, texts.len())?;

        debug!(
            "Received {} embeddings with {} dimensions",
            embeddings.len(),
            embeddings.first().map_or(0, Vec::len)
        );

        Ok(embeddings)
    }

    fn post(&self, body: &str) -> Result<String> {
        let mut response = self
            .agent
            .post(self.api_url.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .send(body)
            .map_err(|e| RagError::Network(format!("Request to {} failed: {}", self.api_url, e)))?;

        let status = response.status();
        let text = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_string()
            .map_err(|e| RagError::Network(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let detail = error_detail(&text);
            warn!("Embedding API returned HTTP {}: {}", status.as_u16(), detail);
            return Err(RagError::Embedding(format!(
                "API returned HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        Ok(text)
    }
}

impl Embedder for JinaClient {
    #[inline]
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed(EmbeddingTask::Passage, texts)
    }

    #[inline]
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(EmbeddingTask::Query, &[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("Response contained no embedding".to_string()))
    }
}

/// Put embeddings back in input order and check one arrived per input
fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(RagError::Embedding(format!(
            "Mismatch between request and response counts: {} vs {}",
            expected,
            data.len()
        )));
    }

    if data.iter().all(|item| item.index.is_some()) {
        data.sort_by_key(|item| item.index);
    }

    Ok(data.into_iter().map(|item| item.embedding).collect())
}

fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            detail: serde_json::Value::String(message),
        }) => message,
        Ok(ErrorResponse { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
