//! Language model client and reply normalization.
//!
//! - [`AskAsync`]: the seam every model call goes through
//! - [`ChatClient`]: an OpenAI-compatible chat completions client
//! - [`generate`]: one call plus [`normalize`], which pulls the fenced HTML
//!   block out of the reply
//!
//! There is no retry here. A failed call fails the run, since a page cannot be
//! produced without the model's reply.

use crate::config::LlmConfig;
use crate::error::GenerationError;
use crate::models::{GenerationRequest, GenerationResult};
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Opening ```` ```html ```` fence through the closing fence, or through the
/// end of a reply cut off by the token ceiling.
static HTML_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```[ \t]*html[^\n]*\n(.*?)(?:```|\z)").unwrap());

/// Trait for async LLM interaction.
///
/// Implementors send a prompt with its sampling parameters and return the
/// model's free text.
pub trait AskAsync {
    async fn ask(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClient {
    client: Client,
    url: String,
    api_key: String,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient").field("url", &self.url).finish()
    }
}

impl ChatClient {
    pub fn new(client: Client, config: &LlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }
}

impl AskAsync for ChatClient {
    #[instrument(level = "info", skip_all, fields(model = %request.parameters.model))]
    async fn ask(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let t0 = Instant::now();
        let body = ChatCompletionRequest {
            model: &request.parameters.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt_text,
            }],
            max_tokens: request.parameters.max_tokens,
            temperature: request.parameters.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                %status,
                body = %truncate_for_log(&text, 300),
                "API call failed"
            );
            return Err(GenerationError::StatusCode(status, text));
        }

        let reply: ChatCompletionResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyReply)?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = content.len(),
            "API call succeeded"
        );
        Ok(content)
    }
}

/// Ask the model once and normalize its reply.
#[instrument(level = "info", skip_all)]
pub async fn generate<A: AskAsync>(
    api: &A,
    request: &GenerationRequest,
) -> Result<GenerationResult, GenerationError> {
    match api.ask(request).await {
        Ok(raw_text) => Ok(normalize(raw_text)),
        Err(e) => {
            error!(error = %e, "Generation failed");
            Err(e)
        }
    }
}

/// Pull the fenced HTML block out of a reply.
///
/// Without a fence the result carries `None` and callers work on the raw text.
pub fn normalize(raw_text: String) -> GenerationResult {
    let extracted_markup = HTML_FENCE
        .captures(&raw_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    if extracted_markup.is_none() {
        warn!(
            preview = %truncate_for_log(&raw_text, 200),
            "Reply has no html code fence; using raw text"
        );
    }
    GenerationResult {
        raw_text,
        extracted_markup,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ModelParameters;
    use std::sync::Mutex;

    /// Replays canned replies and records the prompts it was given.
    #[derive(Default)]
    pub(crate) struct FakeAsk {
        pub replies: Mutex<Vec<Result<String, GenerationError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FakeAsk {
        pub(crate) fn replying(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().map(|r| Ok(r.to_string())).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl AskAsync for FakeAsk {
        async fn ask(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(request.prompt_text.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(GenerationError::EmptyReply))
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt_text: "make a page".to_string(),
            parameters: ModelParameters {
                model: "test".to_string(),
                temperature: 1.0,
                max_tokens: 10,
            },
        }
    }

    #[test]
    fn test_normalize_extracts_fenced_block() {
        let raw = "Here you go!\n```html\n<!DOCTYPE html>\n<html><body>Hi</body></html>\n```\nEnjoy.";
        let result = normalize(raw.to_string());
        assert_eq!(
            result.extracted_markup.as_deref(),
            Some("<!DOCTYPE html>\n<html><body>Hi</body></html>\n")
        );
        assert_eq!(result.raw_text, raw);
    }

    #[test]
    fn test_normalize_uppercase_fence() {
        let result = normalize("```HTML\n<p>x</p>```".to_string());
        assert_eq!(result.extracted_markup.as_deref(), Some("<p>x</p>"));
    }

    #[test]
    fn test_normalize_takes_first_block() {
        let raw = "```html\n<p>one</p>\n```\n```html\n<p>two</p>\n```";
        let result = normalize(raw.to_string());
        assert_eq!(result.extracted_markup.as_deref(), Some("<p>one</p>\n"));
    }

    #[test]
    fn test_normalize_unterminated_fence() {
        let result = normalize("```html\n<html><body>cut off".to_string());
        assert_eq!(
            result.extracted_markup.as_deref(),
            Some("<html><body>cut off")
        );
    }

    #[test]
    fn test_normalize_without_fence() {
        let raw = "<html><body>No fence</body></html>";
        let result = normalize(raw.to_string());
        assert_eq!(result.extracted_markup, None);
        assert_eq!(result.markup(), raw);
    }

    #[test]
    fn test_normalize_ignores_other_languages() {
        let result = normalize("```css\nbody {}\n```".to_string());
        assert_eq!(result.extracted_markup, None);
    }

    #[tokio::test]
    async fn test_generate_normalizes_reply() {
        let api = FakeAsk::replying(vec!["```html\n<p>x</p>\n```"]);
        let result = generate(&api, &request()).await.unwrap();
        assert_eq!(result.extracted_markup.as_deref(), Some("<p>x</p>\n"));
        assert_eq!(*api.prompts.lock().unwrap(), vec!["make a page".to_string()]);
    }

    #[tokio::test]
    async fn test_generate_does_not_retry() {
        let api = FakeAsk::default();
        let err = generate(&api, &request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyReply));
        assert_eq!(api.prompts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_chat_client_url() {
        let config = LlmConfig {
            api_base: "http://localhost:8080/v1/".to_string(),
            ..LlmConfig::default()
        };
        let client = ChatClient::new(Client::new(), &config, "key");
        assert_eq!(client.url, "http://localhost:8080/v1/chat/completions");
    }
}
