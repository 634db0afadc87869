//! I/O helpers: completion backends, configuration, prompts, and export.

pub mod client;
pub mod config;
pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod session_log;
