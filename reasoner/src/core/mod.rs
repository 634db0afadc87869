//! Deterministic, pure logic shared by the reasoning loop.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod budget;
pub mod instrumentation;
pub mod invariants;
pub mod payload;
pub mod state;
pub mod transcript;
pub mod types;
