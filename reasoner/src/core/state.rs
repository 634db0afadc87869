//! Lifecycle states of a reasoning session and the Thinking exit rule.

use serde::Serialize;

use crate::core::types::{NextAction, Payload};

/// Session lifecycle. `Done` is the only terminal state; failures are data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Init,
    Thinking,
    Finalizing,
    Done,
}

/// Why the Thinking loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeReason {
    /// The model asked for the final answer.
    FinalAnswer,
    /// The intermediate step cap was reached.
    CapReached,
    /// The call failed after every retry.
    Error,
}

/// Decision taken after each Thinking iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkingVerdict {
    Continue,
    Finalize(FinalizeReason),
}

/// Decide whether Thinking continues after a step was recorded.
///
/// `intermediate_steps` already includes the step just recorded. The cap is
/// checked after the increment, so at most `step_cap` intermediate steps are
/// ever produced.
pub fn after_thinking(payload: &Payload, intermediate_steps: u32, step_cap: u32) -> ThinkingVerdict {
    if payload.is_error() {
        return ThinkingVerdict::Finalize(FinalizeReason::Error);
    }
    if payload.next_action() == Some(NextAction::FinalAnswer) {
        return ThinkingVerdict::Finalize(FinalizeReason::FinalAnswer);
    }
    if intermediate_steps >= step_cap {
        return ThinkingVerdict::Finalize(FinalizeReason::CapReached);
    }
    ThinkingVerdict::Continue
}
