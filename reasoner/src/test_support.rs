//! Test-only helpers: scripted completion clients and fast session settings.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::types::NextAction;
use crate::io::client::{CompletionClient, CompletionRequest};
use crate::retry::RetryPolicy;
use crate::session::SessionConfig;

/// One scripted client reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Returned verbatim as the raw reply text.
    Raw(String),
    /// Returned as a transport error with this message.
    Fail(String),
}

/// Client that replays a fixed queue of replies and records every request.
///
/// Once the queue is empty every call fails.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().expect("replies lock").len()
    }
}

impl CompletionClient for ScriptedClient {
    fn send(&self, request: &CompletionRequest) -> Result<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        match self.replies.lock().expect("replies lock").pop_front() {
            Some(ScriptedReply::Raw(raw)) => Ok(raw),
            Some(ScriptedReply::Fail(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted client exhausted")),
        }
    }
}

/// Client whose model never stops thinking.
#[derive(Debug, Default)]
pub struct ContinueForever;

impl CompletionClient for ContinueForever {
    fn send(&self, request: &CompletionRequest) -> Result<String> {
        if request.options.is_final_call {
            return Ok(
                serde_json::json!({"title": "Final Answer", "content": "gave up"}).to_string(),
            );
        }
        Ok(serde_json::json!({
            "title": format!("Step after {} messages", request.messages.len()),
            "content": "still thinking",
            "next_action": "continue",
        })
        .to_string())
    }
}

/// Intermediate reply with an explicit `next_action`.
pub fn step_reply(title: &str, content: &str, next: NextAction) -> ScriptedReply {
    ScriptedReply::Raw(
        serde_json::json!({
            "title": title,
            "content": content,
            "next_action": next,
        })
        .to_string(),
    )
}

/// Final-call reply.
pub fn final_reply(title: &str, content: &str) -> ScriptedReply {
    ScriptedReply::Raw(serde_json::json!({"title": title, "content": content}).to_string())
}

pub fn raw(text: &str) -> ScriptedReply {
    ScriptedReply::Raw(text.to_string())
}

pub fn fail(message: &str) -> ScriptedReply {
    ScriptedReply::Fail(message.to_string())
}

/// Default session settings with a 1ms backoff so retry paths run fast.
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
        },
        ..SessionConfig::default()
    }
}
