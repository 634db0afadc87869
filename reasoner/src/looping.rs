//! Drive a session to completion, reporting every transition.

use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::core::invariants::validate_session;
use crate::core::types::{StepKind, StepRecord};
use crate::io::client::CompletionClient;
use crate::session::{Advance, ReasoningSession};

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub steps: Vec<StepRecord>,
    #[serde(rename = "total_latency_secs", serialize_with = "serialize_secs")]
    pub total_latency: Duration,
    pub intermediate_steps: u32,
    /// Number of `advance` calls made by this invocation.
    pub transitions: u32,
    pub ended_in_error: bool,
    /// Invariant violations found in the finished session; empty when healthy.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

impl SessionSummary {
    /// The terminal record: the final answer, or the error that ended the session.
    pub fn answer(&self) -> Option<&StepRecord> {
        self.steps
            .last()
            .filter(|step| step.kind != StepKind::Intermediate)
    }
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

/// Call `advance` until the session is done, invoking `on_step` after every
/// transition. Always terminates: the step cap bounds the Thinking loop.
pub fn run_session<C: CompletionClient, F: FnMut(&Advance)>(
    session: &mut ReasoningSession<C>,
    mut on_step: F,
) -> SessionSummary {
    let mut transitions = 0u32;
    while !session.is_done() {
        let snapshot = session.advance();
        transitions += 1;
        on_step(&snapshot);
    }
    let violations = validate_session(
        session.steps(),
        session.total_latency(),
        session.config().step_cap,
        true,
    );
    for violation in &violations {
        warn!(%violation, "session invariant violated");
    }
    SessionSummary {
        violations,
        steps: session.steps().to_vec(),
        total_latency: session.total_latency(),
        intermediate_steps: session.intermediate_steps(),
        transitions,
        ended_in_error: session.ended_in_error(),
    }
}
