//! Session export helpers. Write-only observability artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::transcript::Transcript;
use crate::core::types::StepRecord;

#[derive(Debug, Clone, Serialize)]
pub struct SessionMeta {
    pub model: String,
    pub backend: String,
    pub prompt: String,
    pub steps: usize,
    pub intermediate_steps: u32,
    pub total_latency_ms: u64,
    pub ended_in_error: bool,
}

#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub steps_path: PathBuf,
    pub transcript_path: PathBuf,
}

impl SessionPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            meta_path: dir.join("meta.json"),
            steps_path: dir.join("steps.json"),
            transcript_path: dir.join("transcript.json"),
        }
    }
}

pub struct SessionWriteRequest<'a> {
    pub dir: &'a Path,
    pub meta: &'a SessionMeta,
    pub steps: &'a [StepRecord],
    pub transcript: &'a Transcript,
}

pub fn write_session(request: &SessionWriteRequest<'_>) -> Result<SessionPaths> {
    let paths = SessionPaths::new(request.dir);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create session dir {}", paths.dir.display()))?;

    // Write in deterministic order to keep logs stable.
    write_json(&paths.meta_path, request.meta)?;
    write_json(&paths.steps_path, request.steps)?;
    write_json(&paths.transcript_path, request.transcript.messages())?;

    Ok(paths)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
