//! Text extraction over an OpenAI-compatible `/chat/completions` endpoint.
//!
//! Works against hosted vision models and against a local Ollama server
//! (`http://localhost:11434/v1`), which speaks the same protocol.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::image::ImagePayload;
use super::prompt::{EXTRACTION_SYSTEM_PROMPT, EXTRACTION_USER_PROMPT, MAX_OUTPUT_TOKENS};
use super::ExtractionError;

/// Turns a report image into the three-line indicator text.
pub trait VisionClient: Send + Sync {
    fn extract_text(&self, image: &ImagePayload, timeout: Duration)
        -> Result<String, ExtractionError>;
}

// ──────────────────────────────────────────────
// ChatVisionClient
// ──────────────────────────────────────────────

pub struct ChatVisionClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl ChatVisionClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
    ) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| ExtractionError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Request body for /chat/completions
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

/// Response body from /chat/completions
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

fn build_request<'a>(model: &'a str, image: &ImagePayload) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageContent::Text(EXTRACTION_SYSTEM_PROMPT),
            },
            ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: EXTRACTION_USER_PROMPT,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                        },
                    },
                ]),
            },
        ],
        max_tokens: MAX_OUTPUT_TOKENS,
        temperature: 0.0,
    }
}

fn parse_response(body: &str) -> Result<String, ExtractionError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;
    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }
    Ok(text)
}

/// `Retry-After` in whole seconds. HTTP-date values are ignored.
fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

impl VisionClient for ChatVisionClient {
    fn extract_text(
        &self,
        image: &ImagePayload,
        timeout: Duration,
    ) -> Result<String, ExtractionError> {
        let _span = tracing::info_span!(
            "vision_extract",
            model = %self.model,
            image_bytes = image.byte_len,
        )
        .entered();
        let start = std::time::Instant::now();

        let mut request = self
            .client
            .post(self.endpoint())
            .timeout(timeout)
            .json(&build_request(&self.model, image));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout(timeout.as_secs())
            } else if e.is_connect() {
                ExtractionError::NotReachable(self.base_url.clone())
            } else {
                ExtractionError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ExtractionError::RateLimited {
                retry_after: retry_after_secs(response.headers()),
            });
        }
        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout(timeout.as_secs())
            } else {
                ExtractionError::Network(e.to_string())
            }
        })?;
        if !status.is_success() {
            return Err(ExtractionError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let text = parse_response(&body)?;
        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = text.len(),
            "Vision extraction complete"
        );
        Ok(text)
    }
}

// ──────────────────────────────────────────────
// MockVisionClient
// ──────────────────────────────────────────────

/// Mock vision client for testing: returns a configured response or error.
pub struct MockVisionClient {
    response: Mutex<Result<String, ExtractionError>>,
    calls: AtomicUsize,
}

impl MockVisionClient {
    pub fn new(text: &str) -> Self {
        Self {
            response: Mutex::new(Ok(text.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ExtractionError) -> Self {
        Self {
            response: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_response(&self, text: &str) {
        if let Ok(mut guard) = self.response.lock() {
            *guard = Ok(text.to_string());
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VisionClient for MockVisionClient {
    fn extract_text(
        &self,
        _image: &ImagePayload,
        _timeout: Duration,
    ) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .lock()
            .map_err(|_| ExtractionError::Network("mock lock poisoned".into()))?
            .clone()
    }
}
