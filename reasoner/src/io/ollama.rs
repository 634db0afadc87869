//! Ollama chat backend (`POST /api/chat`).

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::core::types::{Message, ResponseFormat};
use crate::io::client::{CompletionClient, CompletionRequest, truncate_body};

/// Client for a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    chat_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("build ollama http client")?;
        Ok(Self {
            http,
            chat_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatBody<'a> {
        ChatBody {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            format: match request.options.response_format {
                ResponseFormat::Json => Some("json"),
            },
            options: ChatOptions {
                temperature: request.options.temperature,
                num_predict: request.options.max_tokens,
            },
        }
    }
}

impl CompletionClient for OllamaClient {
    #[instrument(skip_all, fields(model = %self.model, messages = request.messages.len(), final_call = request.options.is_final_call))]
    fn send(&self, request: &CompletionRequest) -> Result<String> {
        let response = self
            .http
            .post(&self.chat_url)
            .json(&self.body(request))
            .send()
            .with_context(|| format!("POST {}", self.chat_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(%status, "ollama returned an error status");
            return Err(anyhow!(
                "ollama returned {status}: {}",
                truncate_body(&body, 500)
            ));
        }

        let reply: ChatReply = response.json().context("decode ollama reply")?;
        let content = extract_content(reply)?;
        debug!(bytes = content.len(), "ollama reply received");
        Ok(content)
    }
}

fn extract_content(reply: ChatReply) -> Result<String> {
    reply
        .message
        .map(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| anyhow!("ollama reply contained no message content"))
}
