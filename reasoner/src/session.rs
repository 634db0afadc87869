//! Reasoning session: the state machine driving one query to a final answer.
//!
//! A session is driven one transition at a time through [`ReasoningSession::advance`]:
//!
//! - `Init`/`Thinking`: one intermediate call, recorded as an Intermediate (or
//!   Error) step and echoed back into the transcript as an assistant message.
//! - `Finalizing`: one final-answer call, recorded as the Final step.
//! - `Done`: no further calls; the snapshot carries the total latency.
//!
//! Failures never escape: exhausted retries become Error steps and always lead
//! to `Done`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use tracing::{debug, info, instrument, warn};

use crate::core::budget::remaining_budget;
use crate::core::state::{SessionState, ThinkingVerdict, after_thinking};
use crate::core::transcript::Transcript;
use crate::core::types::{CallOptions, Message, StepKind, StepRecord};
use crate::io::client::CompletionClient;
use crate::io::config::ReasonerConfig;
use crate::io::prompt::{PromptBuilder, PromptSet};
use crate::retry::{RetryPolicy, RetryingCaller};

/// Limits and call settings for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Maximum number of Intermediate steps.
    pub step_cap: u32,
    pub intermediate_max_tokens: u32,
    pub final_max_tokens: u32,
    pub temperature: f32,
    pub retry: RetryPolicy,
    /// Wall-clock budget measured from `start_session`.
    pub timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            step_cap: 25,
            intermediate_max_tokens: 300,
            final_max_tokens: 200,
            temperature: 0.2,
            retry: RetryPolicy::default(),
            timeout: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.step_cap == 0 {
            bail!("step_cap must be > 0");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be > 0");
        }
        Ok(())
    }
}

impl From<&ReasonerConfig> for SessionConfig {
    fn from(cfg: &ReasonerConfig) -> Self {
        Self {
            step_cap: cfg.step_cap,
            intermediate_max_tokens: cfg.intermediate_max_tokens,
            final_max_tokens: cfg.final_max_tokens,
            temperature: cfg.temperature,
            retry: RetryPolicy {
                max_attempts: cfg.max_attempts,
                backoff: cfg.backoff(),
            },
            timeout: cfg.session_timeout(),
        }
    }
}

/// Cooperative cancellation signal, checked only between transitions.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Snapshot handed to the presenter after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub steps: Vec<StepRecord>,
    pub done: bool,
    /// Present only once the session is done.
    pub total_latency: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interruption {
    Cancelled,
    TimedOut,
}

/// Per-query session owning its transcript, steps, and lifecycle state.
#[derive(Debug)]
pub struct ReasoningSession<C> {
    state: SessionState,
    transcript: Transcript,
    steps: Vec<StepRecord>,
    intermediate_steps: u32,
    error_payloads: u32,
    caller: RetryingCaller<C>,
    config: SessionConfig,
    final_request: String,
    cancel: Option<CancelFlag>,
    deadline: Option<Instant>,
}

/// Handle returned by [`start_session`].
pub type SessionHandle<C> = ReasoningSession<C>;

/// Create a session for `prompt` in the `Init` state. No call is made yet.
///
/// Fails if `config` is invalid or the embedded prompt templates cannot be
/// rendered.
pub fn start_session<C: CompletionClient>(
    client: C,
    prompt: &str,
    config: &SessionConfig,
) -> Result<SessionHandle<C>> {
    config.validate()?;
    let prompts = PromptBuilder::new(config.step_cap).build()?;
    Ok(ReasoningSession::new(client, prompt, config.clone(), prompts))
}

impl<C: CompletionClient> ReasoningSession<C> {
    pub fn new(client: C, prompt: &str, config: SessionConfig, prompts: PromptSet) -> Self {
        let transcript = Transcript::seeded(&prompts.system, prompt, &prompts.acknowledgement);
        Self {
            state: SessionState::Init,
            transcript,
            steps: Vec::new(),
            intermediate_steps: 0,
            error_payloads: 0,
            caller: RetryingCaller::new(client, config.retry),
            deadline: config.timeout.map(|timeout| Instant::now() + timeout),
            config,
            final_request: prompts.final_request,
            cancel: None,
        }
    }

    /// Attach a cancellation flag.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Perform exactly one state transition and return a snapshot.
    ///
    /// Calling `advance` on a finished session is a no-op.
    #[instrument(skip_all, fields(state = ?self.state, steps = self.steps.len()))]
    pub fn advance(&mut self) -> Advance {
        match self.state {
            SessionState::Init => {
                info!("session started");
                self.state = SessionState::Thinking;
                self.think();
            }
            SessionState::Thinking => self.think(),
            SessionState::Finalizing => self.finalize(),
            SessionState::Done => {}
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> Advance {
        let done = self.is_done();
        Advance {
            steps: self.steps.clone(),
            done,
            total_latency: done.then(|| self.total_latency()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == SessionState::Done
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn prompt(&self) -> &str {
        self.transcript.prompt()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Sum of all step latencies.
    pub fn total_latency(&self) -> Duration {
        self.caller.total_latency()
    }

    pub fn intermediate_steps(&self) -> u32 {
        self.intermediate_steps
    }

    /// Number of calls that ended in a synthetic error payload.
    pub fn error_payloads(&self) -> u32 {
        self.error_payloads
    }

    /// True if any call failed or the session was interrupted.
    pub fn ended_in_error(&self) -> bool {
        self.error_payloads > 0 || self.steps.iter().any(|step| step.kind == StepKind::Error)
    }

    fn think(&mut self) {
        if self.interrupt_if_needed() {
            return;
        }

        let options =
            CallOptions::intermediate(self.config.intermediate_max_tokens, self.config.temperature);
        let result = self.caller.call(&self.transcript, &options);

        let kind = if result.payload.is_error() {
            self.error_payloads += 1;
            StepKind::Error
        } else {
            self.intermediate_steps += 1;
            StepKind::Intermediate
        };
        self.record(
            result.payload.title(),
            result.payload.content(),
            result.latency,
            kind,
        );
        self.transcript
            .push(Message::assistant(result.payload.to_json()));

        match after_thinking(&result.payload, self.intermediate_steps, self.config.step_cap) {
            ThinkingVerdict::Continue => {
                debug!(intermediate_steps = self.intermediate_steps, "continue thinking");
            }
            ThinkingVerdict::Finalize(reason) => {
                info!(?reason, intermediate_steps = self.intermediate_steps, "finalizing");
                self.state = SessionState::Finalizing;
            }
        }
    }

    fn finalize(&mut self) {
        if self.interrupt_if_needed() {
            return;
        }

        self.transcript
            .push(Message::user(self.final_request.clone()));
        let options = CallOptions::final_call(self.config.final_max_tokens, self.config.temperature);
        let result = self.caller.call(&self.transcript, &options);
        if result.payload.is_error() {
            self.error_payloads += 1;
        }
        self.record(
            result.payload.title(),
            result.payload.content(),
            result.latency,
            StepKind::Final,
        );

        self.state = SessionState::Done;
        info!(
            steps = self.steps.len(),
            total_ms = self.total_latency().as_millis() as u64,
            "session done"
        );
    }

    /// End the session with an Error step if cancelled or out of time.
    fn interrupt_if_needed(&mut self) -> bool {
        let Some(interruption) = self.interruption() else {
            return false;
        };
        let (title, content) = match interruption {
            Interruption::Cancelled => ("Cancelled", "The session was cancelled before completion."),
            Interruption::TimedOut => ("Timed out", "The session ran out of time before completion."),
        };
        warn!(?interruption, "session interrupted");
        self.record(title, content, Duration::ZERO, StepKind::Error);
        self.state = SessionState::Done;
        true
    }

    fn interruption(&self) -> Option<Interruption> {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Some(Interruption::Cancelled);
        }
        match self.deadline {
            Some(deadline) => match remaining_budget(deadline) {
                Ok(remaining) => {
                    debug!(remaining_ms = remaining.as_millis() as u64, "session budget");
                    None
                }
                Err(_) => Some(Interruption::TimedOut),
            },
            None => None,
        }
    }

    fn record(&mut self, title: &str, content: &str, latency: Duration, kind: StepKind) {
        self.steps.push(StepRecord {
            index: self.steps.len() as u32 + 1,
            title: title.to_string(),
            content: content.to_string(),
            latency,
            kind,
        });
    }
}
