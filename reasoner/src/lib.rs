//! Iterative reasoning-chain controller for completion endpoints.
//!
//! A session asks a model for one reasoning step at a time, feeds each step
//! back into the transcript, and finishes with a forced final-answer call.
//! The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (data model, transcript, reply
//!   validation, lifecycle decisions, latency accounting). No I/O.
//! - **[`io`]**: Side-effecting edges (HTTP completion backends, config files,
//!   prompt templates, session export). Isolated behind traits for tests.
//!
//! Orchestration modules ([`retry`], [`session`], [`looping`]) combine the two
//! into a loop that always terminates with a Final or Error step.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod looping;
pub mod render;
pub mod retry;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
