//! Credential-injecting proxy for the generative-language API
//!
//! The CLI and any browser frontend talk to this endpoint instead of the
//! provider, so the API key never leaves the server process. One route
//! accepts `{ model, stream, contents, config }`, rewrites it into the
//! provider's REST shape, and either returns the JSON response augmented
//! with a flattened `text` field or passes the SSE stream straight
//! through. Provider failures are forwarded verbatim with their status,
//! tagged with a structured `x-error-code` header.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::llm::{ApiError, GenerateRequest, ERROR_CODE_HEADER};

struct ProxyState {
    http: reqwest::Client,
    api_key: String,
    upstream: String,
}

/// Run the proxy until interrupted. The provider credential comes from
/// the `GEMINI_API_KEY` environment variable, never from a request.
pub async fn serve(config: &ProxyConfig) -> Result<()> {
    let api_key =
        std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY environment variable not set")?;

    let state = Arc::new(ProxyState {
        http: reqwest::Client::new(),
        api_key,
        upstream: config.upstream.trim_end_matches('/').to_string(),
    });

    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("proxy listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/healthz", get(|| async { "ok" }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn generate(
    State(state): State<Arc<ProxyState>>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    match forward(&state, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("proxy error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": { "message": format!("Proxy Error: {}", e) } })),
            )
                .into_response()
        }
    }
}

async fn forward(state: &ProxyState, request: GenerateRequest) -> Result<Response> {
    let url = format!(
        "{}/v1beta/models/{}:{}",
        state.upstream,
        request.model,
        method_path(request.stream)
    );
    let body = rest_body(&request);

    let upstream = state
        .http
        .post(&url)
        .header("x-goog-api-key", &state.api_key)
        .json(&body)
        .send()
        .await
        .context("Upstream request failed")?;

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if !status.is_success() {
        // Forward the provider's error body verbatim, tagged with the
        // structured code so clients need not sniff message text.
        let text = upstream.text().await.unwrap_or_default();
        let code = ApiError::from_status(status.as_u16(), &text).code();
        return Ok(Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .header(ERROR_CODE_HEADER, code)
            .body(Body::from(text))?);
    }

    if !request.stream {
        let mut value: Value = upstream
            .json()
            .await
            .context("Upstream returned malformed JSON")?;
        let text = value["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if let Value::Object(map) = &mut value {
            map.insert("text".to_string(), Value::String(text));
        }
        return Ok((status, Json(value)).into_response());
    }

    // Streaming: hand the SSE body through unchanged.
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/event-stream")
        .to_string();

    Ok(Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(upstream.bytes_stream()))?)
}

fn method_path(stream: bool) -> &'static str {
    if stream {
        "streamGenerateContent?alt=sse"
    } else {
        "generateContent"
    }
}

/// Map the SDK-style request onto the provider's REST body: the prompt is
/// wrapped into `contents`, tools and systemInstruction sit at the top
/// level, everything else goes into `generationConfig`.
fn rest_body(request: &GenerateRequest) -> Value {
    let mut body = json!({
        "contents": [{ "parts": [{ "text": request.contents }] }]
    });

    let Some(config) = &request.config else {
        return body;
    };
    let map = body.as_object_mut().expect("body is an object");

    if let Some(tools) = &config.tools {
        map.insert("tools".to_string(), json!(tools));
    }
    if let Some(instruction) = &config.system_instruction {
        map.insert(
            "systemInstruction".to_string(),
            json!({ "parts": [{ "text": instruction }] }),
        );
    }

    let mut generation = serde_json::Map::new();
    if let Some(v) = config.temperature {
        generation.insert("temperature".to_string(), json!(v));
    }
    if let Some(v) = config.top_k {
        generation.insert("topK".to_string(), json!(v));
    }
    if let Some(v) = config.top_p {
        generation.insert("topP".to_string(), json!(v));
    }
    if let Some(v) = config.max_output_tokens {
        generation.insert("maxOutputTokens".to_string(), json!(v));
    }
    if let Some(v) = &config.response_mime_type {
        generation.insert("responseMimeType".to_string(), json!(v));
    }
    if let Some(v) = &config.response_schema {
        generation.insert("responseSchema".to_string(), v.clone());
    }
    if let Some(v) = config.thinking_budget {
        generation.insert("thinkingConfig".to_string(), json!({ "thinkingBudget": v }));
    }
    if !generation.is_empty() {
        map.insert("generationConfig".to_string(), Value::Object(generation));
    }

    body
}
