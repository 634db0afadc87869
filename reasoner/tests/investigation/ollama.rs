//! Live checks against a local Ollama server.
//!
//! # Prerequisites
//!
//! - `ollama serve` listening on `http://localhost:11434` (or `OLLAMA_URL`)
//! - The model named by `OLLAMA_MODEL` pulled (default `llama3.1`)

use std::time::Duration;

use reasoner::core::payload::parse_payload;
use reasoner::core::types::{CallOptions, Message, StepKind};
use reasoner::io::client::{CompletionClient, CompletionRequest};
use reasoner::io::ollama::OllamaClient;
use reasoner::looping::run_session;
use reasoner::session::{SessionConfig, start_session};

fn client() -> OllamaClient {
    let base_url =
        std::env::var("OLLAMA_URL").unwrap_or_else(|_| "http://localhost:11434".to_string());
    let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.1".to_string());
    OllamaClient::new(&base_url, &model, Duration::from_secs(120)).expect("client")
}

/// A single JSON-mode call returns something the step schema accepts.
#[test]
#[ignore]
fn json_mode_reply_matches_step_schema() {
    let request = CompletionRequest {
        messages: vec![
            Message::system(
                "Reply with a JSON object with keys title, content, and next_action \
                 (\"continue\" or \"final_answer\").",
            ),
            Message::user("What is 2 + 2?"),
        ],
        options: CallOptions::intermediate(300, 0.2),
    };
    let raw = client().send(&request).expect("send");
    println!("raw reply: {raw}");
    parse_payload(&raw, false).expect("reply should match the step schema");
}

/// A full session finishes with a Final step.
#[test]
#[ignore]
fn strawberry_session_finishes() {
    let config = SessionConfig {
        step_cap: 6,
        ..SessionConfig::default()
    };
    let mut session = start_session(
        client(),
        "How many R's are in the word strawberry?",
        &config,
    )
    .expect("start");
    let summary = run_session(&mut session, |snapshot| {
        if let Some(step) = snapshot.steps.last() {
            println!("{:?}: {}", step.kind, step.title);
        }
    });

    assert_eq!(summary.steps.last().map(|s| s.kind), Some(StepKind::Final));
    println!("answer: {:?}", summary.answer().map(|s| &s.content));
}
