//! Completion client abstraction.
//!
//! The [`CompletionClient`] trait decouples the reasoning loop from the
//! actual model backend (Ollama or an OpenAI-compatible API). Tests use
//! scripted clients that return predetermined replies without any network.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::core::types::{CallOptions, Message};
use crate::io::config::{Backend, ReasonerConfig};
use crate::io::ollama::OllamaClient;
use crate::io::openai::OpenAiClient;

/// Parameters for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Full transcript, replayed in order.
    pub messages: Vec<Message>,
    pub options: CallOptions,
}

/// Abstraction over completion backends.
///
/// Implementations must be stateless per call so one client can serve many
/// sessions. Any error is treated as a transport failure by the caller.
pub trait CompletionClient {
    /// Send the request and return the raw reply text.
    fn send(&self, request: &CompletionRequest) -> Result<String>;
}

impl<C: CompletionClient + ?Sized> CompletionClient for &C {
    fn send(&self, request: &CompletionRequest) -> Result<String> {
        (**self).send(request)
    }
}

impl<C: CompletionClient + ?Sized> CompletionClient for Box<C> {
    fn send(&self, request: &CompletionRequest) -> Result<String> {
        (**self).send(request)
    }
}

impl<C: CompletionClient + ?Sized> CompletionClient for Arc<C> {
    fn send(&self, request: &CompletionRequest) -> Result<String> {
        (**self).send(request)
    }
}

/// Shared, thread-safe client handle.
pub type SharedClient = Arc<dyn CompletionClient + Send + Sync>;

/// Build the backend selected by `config`.
pub fn build_client(config: &ReasonerConfig) -> Result<SharedClient> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let client: SharedClient = match config.backend {
        Backend::Ollama => Arc::new(OllamaClient::new(&config.base_url, &config.model, timeout)?),
        Backend::OpenAi => Arc::new(OpenAiClient::from_env(
            &config.base_url,
            &config.model,
            &config.api_key_env,
            timeout,
        )?),
    };
    Ok(client)
}

/// Keep the tail of an error body short enough for a log line.
pub(crate) fn truncate_body(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        return body.to_string();
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated {} bytes]", &body[..end], body.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CallOptions;

    struct Echo;

    impl CompletionClient for Echo {
        fn send(&self, request: &CompletionRequest) -> Result<String> {
            Ok(format!("{} messages", request.messages.len()))
        }
    }

    fn send_via<C: CompletionClient>(client: C, request: &CompletionRequest) -> String {
        client.send(request).expect("send")
    }

    #[test]
    fn references_and_shared_handles_delegate() {
        let request = CompletionRequest {
            messages: vec![Message::user("hi")],
            options: CallOptions::intermediate(300, 0.2),
        };
        let echo = Echo;
        assert_eq!(send_via(&echo, &request), "1 messages");

        let shared: SharedClient = Arc::new(Echo);
        assert_eq!(send_via(shared.clone(), &request), "1 messages");
        assert_eq!(send_via(Box::new(Echo), &request), "1 messages");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        assert_eq!(truncate_body("short", 10), "short");
        let truncated = truncate_body("ééééé", 3);
        assert!(truncated.starts_with("é..."));
        assert!(truncated.ends_with("[truncated 8 bytes]"));
    }

    #[test]
    fn builds_ollama_backend_by_default() {
        let client = build_client(&ReasonerConfig::default());
        assert!(client.is_ok());
    }
}
