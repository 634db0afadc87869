//! Reasoner configuration stored as TOML.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Completion backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Backend {
    #[serde(rename = "ollama")]
    #[value(name = "ollama")]
    Ollama,
    #[serde(rename = "openai")]
    #[value(name = "openai")]
    OpenAi,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Ollama => "ollama",
            Backend::OpenAi => "openai",
        }
    }
}

/// Reasoner configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to the values the
/// reasoning loop was tuned with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReasonerConfig {
    pub backend: Backend,

    /// Model name sent with every request.
    pub model: String,

    /// Endpoint root, e.g. `http://localhost:11434` or
    /// `https://api.groq.com/openai/v1`.
    pub base_url: String,

    /// Environment variable holding the API key (openai backend only).
    pub api_key_env: String,

    /// Per-HTTP-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum number of intermediate steps before forced finalization.
    pub step_cap: u32,

    /// Attempts per call before a synthetic error step is produced.
    pub max_attempts: u32,

    /// Fixed sleep between failed attempts, in milliseconds.
    pub backoff_ms: u64,

    pub intermediate_max_tokens: u32,

    pub final_max_tokens: u32,

    pub temperature: f32,

    /// Optional wall-clock budget for a whole session, checked between steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_timeout_secs: Option<u64>,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Ollama,
            model: "llama3.1".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            request_timeout_secs: 60,
            step_cap: 25,
            max_attempts: 3,
            backoff_ms: 1000,
            intermediate_max_tokens: 300,
            final_max_tokens: 200,
            temperature: 0.2,
            session_timeout_secs: None,
        }
    }
}

impl ReasonerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(anyhow!("base_url must start with http:// or https://"));
        }
        if self.backend == Backend::OpenAi && self.api_key_env.trim().is_empty() {
            return Err(anyhow!("api_key_env must be set for the openai backend"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        if self.step_cap == 0 {
            return Err(anyhow!("step_cap must be > 0"));
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        if self.intermediate_max_tokens == 0 || self.final_max_tokens == 0 {
            return Err(anyhow!("max token limits must be > 0"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!("temperature must be within 0.0..=2.0"));
        }
        if self.session_timeout_secs == Some(0) {
            return Err(anyhow!("session_timeout_secs must be > 0 when set"));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn session_timeout(&self) -> Option<Duration> {
        self.session_timeout_secs.map(Duration::from_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ReasonerConfig::default()`.
pub fn load_config(path: &Path) -> Result<ReasonerConfig> {
    if !path.exists() {
        let cfg = ReasonerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ReasonerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ReasonerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
