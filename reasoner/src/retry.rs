//! Bounded-retry wrapper around a [`CompletionClient`].
//!
//! Transport failures and malformed replies are retried with a fixed backoff.
//! Once every attempt is spent the failure becomes an in-band
//! [`Payload::Error`]; nothing is ever propagated to the caller.

use std::thread;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::core::instrumentation::LatencyMeter;
use crate::core::payload::parse_payload;
use crate::core::transcript::Transcript;
use crate::core::types::{
    CallError, CallOptions, ErrorPayload, NextAction, Payload, RetryExhausted, StepPayload,
};
use crate::io::client::{CompletionClient, CompletionRequest};

/// Attempt bound and backoff for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Sleep between failed attempts. Not applied after the last attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Result of one call-with-retries span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub payload: Payload,
    /// Wall-clock time of the whole span, retries and backoff included.
    pub latency: Duration,
    pub attempts: u32,
}

/// Owns the client and the latency meter for one session.
#[derive(Debug)]
pub struct RetryingCaller<C> {
    client: C,
    policy: RetryPolicy,
    meter: LatencyMeter,
}

impl<C: CompletionClient> RetryingCaller<C> {
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            meter: LatencyMeter::new(),
        }
    }

    /// Call the client with the full transcript. Never fails.
    #[instrument(skip_all, fields(final_call = options.is_final_call, max_tokens = options.max_tokens, messages = transcript.len()))]
    pub fn call(&mut self, transcript: &Transcript, options: &CallOptions) -> CallResult {
        let request = CompletionRequest {
            messages: transcript.messages().to_vec(),
            options: options.clone(),
        };
        let client = &self.client;
        let policy = self.policy;
        let (outcome, latency) = self
            .meter
            .measure(|| call_with_retries(client, &request, policy));

        let is_final = options.is_final_call;
        match outcome {
            Ok((step, attempts)) => {
                debug!(attempts, title = %step.title, "call succeeded");
                CallResult {
                    payload: Payload::Step(step),
                    latency,
                    attempts,
                }
            }
            Err(exhausted) => {
                warn!(error = %exhausted, "call failed after all attempts");
                let attempts = exhausted.attempts;
                CallResult {
                    payload: Payload::Error(ErrorPayload {
                        content: exhausted.describe(is_final),
                        next_action: (!is_final).then_some(NextAction::FinalAnswer),
                    }),
                    latency,
                    attempts,
                }
            }
        }
    }

    /// Sum of every span measured so far.
    pub fn total_latency(&self) -> Duration {
        self.meter.total()
    }

    pub fn meter(&self) -> &LatencyMeter {
        &self.meter
    }
}

fn call_with_retries<C: CompletionClient>(
    client: &C,
    request: &CompletionRequest,
    policy: RetryPolicy,
) -> Result<(StepPayload, u32), RetryExhausted> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match attempt_once(client, request) {
            Ok(payload) => return Ok((payload, attempt)),
            Err(err) => {
                warn!(attempt, max_attempts, error = %err, "completion attempt failed");
                if attempt >= max_attempts {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                thread::sleep(policy.backoff);
            }
        }
    }
}

fn attempt_once<C: CompletionClient>(
    client: &C,
    request: &CompletionRequest,
) -> Result<StepPayload, CallError> {
    let raw = client
        .send(request)
        .map_err(|err| CallError::Transport(format!("{err:#}")))?;
    parse_payload(&raw, request.options.is_final_call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedClient, fail, final_reply, step_reply};
    use std::time::Instant;

    const BACKOFF: Duration = Duration::from_millis(20);

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff: BACKOFF,
        }
    }

    fn transcript() -> Transcript {
        Transcript::seeded("sys", "q", "ack")
    }

    #[test]
    fn succeeds_on_third_attempt_after_two_backoffs() {
        let client = ScriptedClient::new(vec![
            fail("connection reset"),
            fail("connection reset"),
            step_reply("Identify letters", "s t r", NextAction::Continue),
        ]);
        let mut caller = RetryingCaller::new(&client, policy());

        let start = Instant::now();
        let result = caller.call(&transcript(), &CallOptions::intermediate(300, 0.2));

        assert!(start.elapsed() >= BACKOFF * 2);
        assert!(result.latency >= BACKOFF * 2);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.payload.title(), "Identify letters");
        assert!(!result.payload.is_error());
        assert_eq!(client.calls(), 3);
        assert_eq!(caller.meter().spans(), 1);
    }

    #[test]
    fn exhausted_intermediate_call_forces_final_answer() {
        let client = ScriptedClient::new(vec![fail("503"), fail("503"), fail("503"), fail("503")]);
        let mut caller = RetryingCaller::new(&client, policy());

        let result = caller.call(&transcript(), &CallOptions::intermediate(300, 0.2));

        assert_eq!(client.calls(), 3);
        assert_eq!(result.attempts, 3);
        assert!(result.payload.is_error());
        assert_eq!(result.payload.title(), "Error");
        assert_eq!(result.payload.next_action(), Some(NextAction::FinalAnswer));
        assert!(
            result
                .payload
                .content()
                .starts_with("Failed to generate step after 3 attempts. Error: transport error: 503")
        );
    }

    #[test]
    fn exhausted_final_call_has_no_next_action() {
        let client = ScriptedClient::new(vec![fail("quota"), fail("quota"), fail("quota")]);
        let mut caller = RetryingCaller::new(&client, policy());

        let result = caller.call(&transcript(), &CallOptions::final_call(200, 0.2));

        assert!(result.payload.is_error());
        assert_eq!(result.payload.next_action(), None);
        assert!(result.payload.content().contains("final answer"));
    }

    #[test]
    fn malformed_reply_is_retried_like_transport_failure() {
        let client = ScriptedClient::new(vec![
            crate::test_support::raw("not json"),
            final_reply("Final Answer", "3"),
        ]);
        let mut caller = RetryingCaller::new(&client, policy());

        let result = caller.call(&transcript(), &CallOptions::final_call(200, 0.2));

        assert_eq!(result.attempts, 2);
        assert_eq!(result.payload.content(), "3");
    }

    #[test]
    fn no_backoff_after_last_attempt() {
        let client = ScriptedClient::new(vec![fail("down")]);
        let mut caller = RetryingCaller::new(
            &client,
            RetryPolicy {
                max_attempts: 1,
                backoff: Duration::from_secs(5),
            },
        );

        let result = caller.call(&transcript(), &CallOptions::intermediate(300, 0.2));

        assert!(result.latency < Duration::from_secs(5));
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn total_latency_sums_spans() {
        let client = ScriptedClient::new(vec![
            step_reply("a", "a", NextAction::Continue),
            final_reply("b", "b"),
        ]);
        let mut caller = RetryingCaller::new(&client, policy());

        let first = caller.call(&transcript(), &CallOptions::intermediate(300, 0.2));
        let second = caller.call(&transcript(), &CallOptions::final_call(200, 0.2));

        assert_eq!(caller.total_latency(), first.latency + second.latency);
    }

    #[test]
    fn request_carries_transcript_and_options() {
        let client = ScriptedClient::new(vec![final_reply("Final Answer", "ok")]);
        let mut caller = RetryingCaller::new(&client, policy());

        caller.call(&transcript(), &CallOptions::final_call(200, 0.2));

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 3);
        assert_eq!(requests[0].options.max_tokens, 200);
        assert!(requests[0].options.is_final_call);
    }
}
