//! OpenAI-compatible chat completions backend (Groq and similar).

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::core::types::{Message, ResponseFormat};
use crate::io::client::{CompletionClient, CompletionRequest, truncate_body};

/// Client for `POST {base_url}/chat/completions` with bearer auth.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    completions_url: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("completions_url", &self.completions_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<FormatSpec>,
}

#[derive(Debug, Serialize)]
struct FormatSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("build openai http client")?;
        Ok(Self {
            http,
            completions_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Read the API key from `api_key_env`.
    pub fn from_env(base_url: &str, model: &str, api_key_env: &str, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var(api_key_env)
            .with_context(|| format!("read api key from ${api_key_env}"))?;
        if api_key.trim().is_empty() {
            return Err(anyhow!("${api_key_env} is empty"));
        }
        Self::new(base_url, model, &api_key, timeout)
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> CompletionBody<'a> {
        CompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            response_format: match request.options.response_format {
                ResponseFormat::Json => Some(FormatSpec {
                    kind: "json_object",
                }),
            },
        }
    }
}

impl CompletionClient for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model, messages = request.messages.len(), final_call = request.options.is_final_call))]
    fn send(&self, request: &CompletionRequest) -> Result<String> {
        let response = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .with_context(|| format!("POST {}", self.completions_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(%status, "completion endpoint returned an error status");
            return Err(anyhow!(
                "completion endpoint returned {status}: {}",
                truncate_body(&body, 500)
            ));
        }

        let reply: CompletionReply = response.json().context("decode completion reply")?;
        let content = first_choice_content(reply)?;
        debug!(bytes = content.len(), "completion reply received");
        Ok(content)
    }
}

fn first_choice_content(reply: CompletionReply) -> Result<String> {
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| anyhow!("completion reply contained no choices"))
}
