//! Client for the generative-language proxy
//!
//! All model traffic goes through the local proxy (`dadgar serve`), which
//! holds the provider credential. The client presents one request shape
//! for both streaming and batch calls, classifies failures into the
//! [`ApiError`] taxonomy, and retries transient failures on non-streaming
//! calls only.

pub mod error;
pub mod sse;

use std::collections::VecDeque;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Source;
pub use error::{ApiError, ERROR_CODE_HEADER};
use sse::SseDecoder;

const MAX_RETRIES: u32 = 3;
const INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Request body accepted by the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    #[serde(default)]
    pub stream: bool,
    /// A single text prompt; the proxy wraps it into the provider's
    /// nested contents structure.
    pub contents: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GenerationConfig>,
}

/// Optional configuration bag mirroring the provider SDK's config object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
}

impl GenerationConfig {
    /// Search-grounded call: Google Search tool on, no thinking budget.
    pub fn search() -> Self {
        Self {
            tools: Some(vec![Tool::google_search()]),
            thinking_budget: Some(0),
            ..Self::default()
        }
    }

    /// Structured call expecting JSON conforming to `schema`.
    pub fn json(schema: Value) -> Self {
        Self {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "googleSearch", skip_serializing_if = "Option::is_none")]
    pub google_search: Option<Value>,
}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: Some(Value::Object(Default::default())),
        }
    }
}

/// Provider response, with the proxy's flattened `text` convenience field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebChunk {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl GenerateResponse {
    /// Flattened text: the proxy's convenience field, or the first
    /// candidate's parts when talking to something that didn't add it.
    pub fn flat_text(&self) -> String {
        if !self.text.is_empty() {
            return self.text.clone();
        }
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Web citations attached by search grounding; chunks without a URI
    /// are dropped and a missing title falls back to the URI.
    pub fn sources(&self) -> Vec<Source> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref())
                    .filter_map(|web| {
                        let uri = web.uri.clone()?;
                        let title = web.title.clone().unwrap_or_else(|| uri.clone());
                        Some(Source { uri, title })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A search-grounded answer: markdown text plus its citations.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub text: String,
    pub sources: Vec<Source>,
}

/// Thin client over the proxy endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl GeminiClient {
    pub fn new(endpoint: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            model,
        }
    }

    /// One non-streaming call, no retry.
    async fn generate_once(&self, request: &GenerateRequest) -> Result<GenerateResponse, ApiError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Other(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| ApiError::Other(format!("malformed response: {}", e)))
    }

    /// Non-streaming call with up to three attempts and exponential
    /// backoff starting at one second. Non-transient failures (bad key,
    /// quota, bad request, permission) are returned immediately.
    pub async fn generate(
        &self,
        prompt: &str,
        config: Option<GenerationConfig>,
    ) -> Result<GenerateResponse, ApiError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            stream: false,
            contents: prompt.to_string(),
            config,
        };

        let mut last_error = ApiError::Other("no attempt made".to_string());
        for attempt in 1..=MAX_RETRIES {
            match self.generate_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!("generate attempt {} failed: {}", attempt, e);
                    if !e.is_transient() {
                        return Err(e);
                    }
                    last_error = e;
                    if attempt < MAX_RETRIES {
                        let delay = INITIAL_DELAY * 2u32.pow(attempt - 1);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(last_error)
    }

    /// Search-grounded call returning flattened text plus citations.
    pub async fn search(&self, prompt: &str) -> Result<SearchResult, ApiError> {
        let response = self.generate(prompt, Some(GenerationConfig::search())).await?;
        Ok(SearchResult {
            text: response.flat_text(),
            sources: response.sources(),
        })
    }

    /// Structured call: JSON response conforming to `schema`, fences
    /// stripped before deserialization.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: Value,
    ) -> Result<T, ApiError> {
        let response = self.generate(prompt, Some(GenerationConfig::json(schema))).await?;
        let text = response.flat_text();
        serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| ApiError::Other(format!("Received invalid data structure from AI: {}", e)))
    }

    /// Short suggestion call. Best-effort: every failure is swallowed and
    /// an empty list returned, so typing aids never surface errors.
    pub async fn suggestions(&self, query: &str, context_prompt: &str) -> Vec<String> {
        #[derive(Deserialize)]
        struct Suggestions {
            #[serde(default)]
            suggestions: Vec<String>,
        }

        let prompt = format!("{}: \"{}\"", context_prompt, query);
        let schema = serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "suggestions": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "A list of 3 to 5 concise suggestions related to the user input."
                }
            },
            "required": ["suggestions"]
        });
        let config = GenerationConfig {
            temperature: Some(0.5),
            max_output_tokens: Some(150),
            thinking_budget: Some(0),
            ..GenerationConfig::json(schema)
        };

        let request = GenerateRequest {
            model: self.model.clone(),
            stream: false,
            contents: prompt,
            config: Some(config),
        };

        match self.generate_once(&request).await {
            Ok(response) => {
                let clean = strip_code_fence(&response.flat_text()).to_string();
                match serde_json::from_str::<Suggestions>(&clean) {
                    Ok(parsed) => parsed.suggestions.into_iter().take(5).collect(),
                    Err(_) => Vec::new(),
                }
            }
            Err(e) => {
                tracing::debug!("suggestion fetch failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Open a streaming call. The returned stream is lazy and strictly
    /// ordered; it can be restarted by calling again but not resumed
    /// mid-flight, and streaming calls are never retried.
    pub async fn stream(&self, prompt: &str) -> Result<TextStream, ApiError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            stream: true,
            contents: prompt.to_string(),
            config: None,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Other(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(classify_failure(response).await);
        }

        Ok(TextStream {
            bytes: response.bytes_stream().boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        })
    }
}

/// Lazy sequence of incremental text deltas from one streaming call.
pub struct TextStream {
    bytes: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

impl TextStream {
    /// Next text delta, in arrival order. `None` marks the end.
    pub async fn next_chunk(&mut self) -> Result<Option<String>, ApiError> {
        loop {
            if let Some(text) = self.pending.pop_front() {
                return Ok(Some(text));
            }
            if self.done {
                return Ok(None);
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => {
                    for payload in self.decoder.feed(&chunk) {
                        if let Some(text) = extract_stream_text(&payload) {
                            self.pending.push_back(text);
                        }
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Err(ApiError::Other(format!("stream failed: {}", e)));
                }
                None => {
                    self.done = true;
                    if let Some(payload) = self.decoder.finish() {
                        if let Some(text) = extract_stream_text(&payload) {
                            self.pending.push_back(text);
                        }
                    }
                }
            }
        }
    }
}

/// Pull the text delta out of one SSE frame payload.
fn extract_stream_text(payload: &str) -> Option<String> {
    let frame: GenerateResponse = serde_json::from_str(payload).ok()?;
    let text = frame.flat_text();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Strip the ```json fences the model sometimes wraps structured output in.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed)
        .trim_start();
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim_end()
}

/// Read the structured error code header if the proxy attached one,
/// falling back to status + body classification of the forwarded
/// provider error.
async fn classify_failure(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let header_code = response
        .headers()
        .get(ERROR_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(ApiError::from_code);
    if let Some(err) = header_code {
        return err;
    }
    let body = response.text().await.unwrap_or_default();
    ApiError::from_status(status, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  [1]  "), "[1]");
    }

    #[test]
    fn flat_text_prefers_proxy_field_then_candidates() {
        let with_field: GenerateResponse =
            serde_json::from_str(r#"{"text":"flattened","candidates":[]}"#).unwrap();
        assert_eq!(with_field.flat_text(), "flattened");

        let nested: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(nested.flat_text(), "ab");
    }

    #[test]
    fn sources_drop_chunks_without_uri_and_default_title() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "groundingMetadata": {
                        "groundingChunks": [
                            {"web": {"uri": "https://a.example", "title": "A"}},
                            {"web": {"title": "no uri"}},
                            {"web": {"uri": "https://b.example"}},
                            {}
                        ]
                    }
                }]
            }"#,
        )
        .unwrap();

        let sources = response.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "A");
        assert_eq!(sources[1].title, "https://b.example");
    }

    #[test]
    fn stream_frame_text_extraction() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"hello "}]}}]}"#;
        assert_eq!(extract_stream_text(payload).as_deref(), Some("hello "));
        assert_eq!(extract_stream_text(r#"{"candidates":[]}"#), None);
        assert_eq!(extract_stream_text("not json"), None);
    }

    #[test]
    fn search_config_enables_tool_and_disables_thinking() {
        let config = GenerationConfig::search();
        assert!(config.tools.is_some());
        assert_eq!(config.thinking_budget, Some(0));
        let json = serde_json::to_value(&config).unwrap();
        assert!(json["tools"][0]["googleSearch"].is_object());
    }

    fn frame(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{}\"}}]}}}}]}}\r\n\r\n",
            text
        )
    }

    async fn collect_stream(wire: &[u8], chunk_size: usize) -> Vec<String> {
        let chunks: Vec<reqwest::Result<bytes::Bytes>> = wire
            .chunks(chunk_size)
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect();
        let mut stream = TextStream {
            bytes: futures::stream::iter(chunks).boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        };
        let mut out = Vec::new();
        while let Some(chunk) = stream.next_chunk().await.unwrap() {
            out.push(chunk);
        }
        out
    }

    #[tokio::test]
    async fn text_stream_is_invariant_to_chunk_boundaries() {
        let wire = format!("{}{}{}", frame("In the "), frame("matter of "), frame("the claim"));
        let reference = collect_stream(wire.as_bytes(), wire.len()).await;
        assert_eq!(reference, vec!["In the ", "matter of ", "the claim"]);

        for size in [1, 3, 7, 16] {
            assert_eq!(collect_stream(wire.as_bytes(), size).await, reference, "chunk size {}", size);
        }
    }

    #[tokio::test]
    async fn exhausted_text_stream_keeps_returning_none() {
        let wire = frame("only");
        let chunks: Vec<reqwest::Result<bytes::Bytes>> =
            vec![Ok(bytes::Bytes::from(wire.into_bytes()))];
        let mut stream = TextStream {
            bytes: futures::stream::iter(chunks).boxed(),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        };
        assert_eq!(stream.next_chunk().await.unwrap().as_deref(), Some("only"));
        assert_eq!(stream.next_chunk().await.unwrap(), None);
        assert_eq!(stream.next_chunk().await.unwrap(), None);
    }
}
