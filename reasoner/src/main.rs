//! Step-by-step reasoning chains over a completion endpoint.
//!
//! `reasoner ask` runs one session and prints each step as soon as it is
//! recorded, followed by the final answer and the total thinking time.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reasoner::exit_codes;
use reasoner::io::client::{CompletionClient, build_client};
use reasoner::io::config::{Backend, ReasonerConfig, load_config, write_config};
use reasoner::io::session_log::{SessionMeta, SessionWriteRequest, write_session};
use reasoner::logging;
use reasoner::looping::{SessionSummary, run_session};
use reasoner::render::{format_footer, format_step};
use reasoner::session::{Advance, CancelFlag, ReasoningSession, SessionConfig, start_session};
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = "reasoner.toml";

#[derive(Parser)]
#[command(
    name = "reasoner",
    version,
    about = "Step-by-step reasoning chains over a completion endpoint"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one reasoning session and print each step as it is produced.
    Ask(AskArgs),
    /// Write a default config file.
    Init {
        /// Path of the config file to create.
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct AskArgs {
    /// Question to reason about.
    prompt: String,
    /// Config file; defaults are used when it does not exist.
    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
    #[arg(long)]
    model: Option<String>,
    #[arg(long, value_enum)]
    backend: Option<Backend>,
    #[arg(long)]
    base_url: Option<String>,
    /// Maximum number of intermediate steps.
    #[arg(long)]
    step_cap: Option<u32>,
    /// Print the finished session as JSON instead of streaming steps.
    #[arg(long)]
    json: bool,
    /// Export meta, steps, and transcript into this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Ask(args) => cmd_ask(&args),
        Command::Init { config, force } => cmd_init(&config, force),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(path, &ReasonerConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_ask(args: &AskArgs) -> Result<i32> {
    let cfg = apply_overrides(load_config(&args.config)?, args)?;
    info!(backend = cfg.backend.as_str(), model = %cfg.model, "starting session");

    let client = build_client(&cfg)?;
    let cancel = CancelFlag::new();
    let mut session = start_session(client, &args.prompt, &SessionConfig::from(&cfg))?
        .with_cancel(cancel.clone());

    let mut stdout = std::io::stdout().lock();
    let summary = if args.json {
        let summary = run_session(&mut session, |_| {});
        let json = serde_json::to_string_pretty(&summary).context("serialize session summary")?;
        writeln!(stdout, "{json}").context("write session summary")?;
        summary
    } else {
        let summary = stream_session(&mut session, &cancel, &mut stdout)?;
        writeln!(stdout, "{}", format_footer(summary.total_latency)).context("write footer")?;
        summary
    };

    if let Some(dir) = &args.log_dir {
        let meta = session_meta(&cfg, &args.prompt, &summary);
        let paths = write_session(&SessionWriteRequest {
            dir,
            meta: &meta,
            steps: &summary.steps,
            transcript: session.transcript(),
        })?;
        info!(dir = %paths.dir.display(), "session exported");
    }

    if summary.ended_in_error {
        return Ok(exit_codes::ERRORED);
    }
    Ok(exit_codes::OK)
}

/// Writes each newly recorded step once.
struct StepPrinter<W> {
    out: W,
    printed: usize,
}

impl<W: Write> StepPrinter<W> {
    fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }

    fn print(&mut self, snapshot: &Advance) -> std::io::Result<()> {
        for step in &snapshot.steps[self.printed..] {
            writeln!(self.out, "{}", format_step(step))?;
            self.printed += 1;
        }
        self.out.flush()
    }
}

/// Run the session while streaming steps to `out`.
///
/// The first write failure cancels the session, so no further calls are made
/// once nobody can see the output.
fn stream_session<C: CompletionClient, W: Write>(
    session: &mut ReasoningSession<C>,
    cancel: &CancelFlag,
    out: W,
) -> Result<SessionSummary> {
    let mut printer = StepPrinter::new(out);
    let mut write_error = None;
    let summary = run_session(session, |snapshot| {
        if write_error.is_some() {
            return;
        }
        if let Err(err) = printer.print(snapshot) {
            warn!(error = %err, "output closed, cancelling session");
            cancel.cancel();
            write_error = Some(err);
        }
    });
    if let Some(err) = write_error {
        return Err(err).context("write step");
    }
    Ok(summary)
}

/// Apply CLI flags on top of the loaded config and re-validate.
fn apply_overrides(mut cfg: ReasonerConfig, args: &AskArgs) -> Result<ReasonerConfig> {
    if let Some(model) = &args.model {
        cfg.model = model.clone();
    }
    if let Some(backend) = args.backend {
        cfg.backend = backend;
    }
    if let Some(base_url) = &args.base_url {
        cfg.base_url = base_url.clone();
    }
    if let Some(step_cap) = args.step_cap {
        cfg.step_cap = step_cap;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn session_meta(cfg: &ReasonerConfig, prompt: &str, summary: &SessionSummary) -> SessionMeta {
    SessionMeta {
        model: cfg.model.clone(),
        backend: cfg.backend.as_str().to_string(),
        prompt: prompt.to_string(),
        steps: summary.steps.len(),
        intermediate_steps: summary.intermediate_steps,
        total_latency_ms: summary.total_latency.as_millis() as u64,
        ended_in_error: summary.ended_in_error,
    }
}
