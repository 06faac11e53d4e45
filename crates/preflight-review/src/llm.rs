use std::io::{BufRead, BufReader};
use std::time::Duration;

use preflight_core::{LlmConfig, PreflightError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use preflight_review::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage {
///     role: Role::User,
///     content: "Review this diff".into(),
/// };
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use preflight_review::llm::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// Streaming client for an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// Works with local servers (llama.cpp server, Ollama, vLLM) as well as
/// hosted providers. Requests always use `stream: true`.
///
/// # Examples
///
/// ```
/// use preflight_core::LlmConfig;
/// use preflight_review::llm::LlmClient;
///
/// let client = LlmClient::new(&LlmConfig::default()).unwrap();
/// assert_eq!(client.model(), "qwen3-30b-a3b-instruct");
/// ```
pub struct LlmClient {
    client: reqwest::blocking::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, PreflightError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PreflightError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Start a streamed completion and return its fragments.
    ///
    /// # Errors
    ///
    /// Returns [`PreflightError::SourceUnavailable`] if the endpoint cannot
    /// be reached or rejects the request.
    pub fn stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<LlmStream<BufReader<reqwest::blocking::Response>>, PreflightError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "stream": true,
        });

        let mut request = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        info!(%url, model = %self.config.model, "starting streamed completion");
        let response = request.json(&body).send().map_err(|e| {
            PreflightError::SourceUnavailable(format!("request to {url} failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().unwrap_or_default();
            return Err(PreflightError::SourceUnavailable(format!(
                "LLM API error {status}: {body_text}"
            )));
        }

        Ok(LlmStream::new(BufReader::new(response)))
    }
}

/// Server-sent event stream of completion fragments.
///
/// Yields the text of each `data:` event and ends at `data: [DONE]` or end
/// of input. An event carrying an `error` object ends the stream with
/// [`PreflightError::SourceUnavailable`]. After the first error it yields
/// nothing more.
pub struct LlmStream<R> {
    reader: R,
    done: bool,
}

impl<R: BufRead> LlmStream<R> {
    /// Wrap a reader positioned at the start of an SSE body.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for LlmStream<R> {
    type Item = Result<String, PreflightError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        while !self.done {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => self.done = true,
                Ok(_) => match parse_sse_line(&line) {
                    Ok(SseLine::Content(text)) => return Some(Ok(text)),
                    Ok(SseLine::Skip) => {}
                    Ok(SseLine::Done) => {
                        debug!("completion stream finished");
                        self.done = true;
                    }
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                Err(e) => {
                    self.done = true;
                    return Some(Err(PreflightError::Llm(format!(
                        "stream interrupted: {e}"
                    ))));
                }
            }
        }
        None
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Content(String),
    Skip,
    Done,
}

fn parse_sse_line(line: &str) -> Result<SseLine, PreflightError> {
    let Some(data) = line.trim_end().strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }

    let event: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| PreflightError::Llm(format!("malformed stream event: {e}")))?;
    if let Some(error) = event.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(PreflightError::SourceUnavailable(format!(
            "LLM API error mid-stream: {message}"
        )));
    }
    let choice = event.get("choices").and_then(|c| c.get(0));
    let text = choice
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .or_else(|| choice.and_then(|c| c.get("text")))
        .and_then(|t| t.as_str());

    match text {
        Some(t) if !t.is_empty() => Ok(SseLine::Content(t.to_string())),
        _ => Ok(SseLine::Skip),
    }
}
