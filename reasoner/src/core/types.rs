//! Shared types for the reasoning loop.
//!
//! These types define stable contracts between the session controller, the
//! retrying caller, and completion backends. Field names on the serialized
//! forms match the wire format models are asked to produce.

use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the transcript replayed on every completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Model-declared continuation for an intermediate step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Continue,
    FinalAnswer,
}

/// Requested shape of the model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Json,
}

/// Per-call options forwarded to the completion backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub response_format: ResponseFormat,
    /// Final calls expect `{title, content}` without `next_action`.
    pub is_final_call: bool,
}

impl CallOptions {
    pub fn intermediate(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
            response_format: ResponseFormat::Json,
            is_final_call: false,
        }
    }

    pub fn final_call(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
            response_format: ResponseFormat::Json,
            is_final_call: true,
        }
    }
}

/// Validated reply of one completion call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPayload {
    pub title: String,
    pub content: String,
    /// Always present for intermediate calls, absent for the final call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<NextAction>,
}

/// Synthetic payload produced once every attempt of a call has failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    pub content: String,
    /// `Some(FinalAnswer)` for intermediate calls so the loop stops.
    pub next_action: Option<NextAction>,
}

impl ErrorPayload {
    pub const TITLE: &'static str = "Error";
}

/// Tagged outcome of a retrying call. Never represents a raised error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Step(StepPayload),
    Error(ErrorPayload),
}

impl Payload {
    pub fn title(&self) -> &str {
        match self {
            Payload::Step(step) => &step.title,
            Payload::Error(_) => ErrorPayload::TITLE,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Payload::Step(step) => &step.content,
            Payload::Error(err) => &err.content,
        }
    }

    pub fn next_action(&self) -> Option<NextAction> {
        match self {
            Payload::Step(step) => step.next_action,
            Payload::Error(err) => err.next_action,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Payload::Error(_))
    }

    /// Compact JSON in the same shape the model was asked to produce.
    pub fn to_json(&self) -> String {
        let mut value = serde_json::json!({
            "title": self.title(),
            "content": self.content(),
        });
        if let Some(next) = self.next_action() {
            value["next_action"] = serde_json::json!(next);
        }
        value.to_string()
    }
}

/// Classification of a recorded step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Intermediate,
    Final,
    Error,
}

/// One recorded unit of reasoning output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// 1-based position within the session.
    pub index: u32,
    pub title: String,
    pub content: String,
    #[serde(rename = "latency_secs", serialize_with = "serialize_secs")]
    pub latency: Duration,
    pub kind: StepKind,
}

fn serialize_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

/// Failure of a single attempt. Retried by the caller, never surfaced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Every attempt of one call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("gave up after {attempts} attempts: {last}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last: CallError,
}

impl RetryExhausted {
    /// Human-readable description placed in the synthetic error step.
    pub fn describe(&self, is_final: bool) -> String {
        let what = if is_final { "final answer" } else { "step" };
        format!(
            "Failed to generate {what} after {} attempts. Error: {}",
            self.attempts, self.last
        )
    }
}
