mod api;
mod cli;
mod config;
mod course;
mod error;
mod filter;
mod logging;
mod profile;
mod session;
mod token;
mod views;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "courseguide",
    about = "Personalized course recommendations in your terminal"
)]
pub struct Args {
    #[arg(long, env = "COURSEGUIDE_API_URL", help = "Backend base URL")]
    pub base_url: Option<String>,

    #[arg(long, value_name = "MS", help = "HTTP timeout in milliseconds")]
    pub timeout_ms: Option<u64>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Where the signed-in session is kept")]
    pub session_file: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Log file (default: data directory)")]
    pub log_file: Option<PathBuf>,

    #[arg(long, help = "Keep the session in memory only (nothing written to disk)")]
    pub ephemeral: bool,

    #[arg(
        short = 'e',
        long = "exec",
        value_name = "COMMAND",
        action = clap::ArgAction::Append,
        help = "Run a command (e.g. '/courses') and exit; repeatable"
    )]
    pub exec: Vec<String>,

    #[arg(long, help = "Debug logging (HTTP requests and session changes)")]
    pub debug: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    if let Some(base_url) = &args.base_url {
        cfg.api.base_url = Some(base_url.clone());
    }
    if let Some(timeout_ms) = args.timeout_ms {
        cfg.api.timeout_ms = Some(timeout_ms);
    }
    if let Some(path) = &args.session_file {
        cfg.session.file = Some(path.clone());
    }
    if let Some(path) = &args.log_file {
        cfg.logging.file = Some(path.clone());
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        return Err(anyhow::anyhow!(
            "invalid configuration ({} error(s))",
            errors.len()
        ));
    }

    let filter = if args.debug { "debug" } else { cfg.log_filter() };
    let log_path = cfg
        .logging
        .file
        .clone()
        .unwrap_or_else(logging::default_log_path);
    if let Err(e) = logging::init_file(&log_path, filter) {
        logging::init_stderr(filter);
        tracing::warn!("could not log to {}: {}", log_path.display(), e);
    }
    tracing::debug!(
        base_url = cfg.base_url(),
        timeout_ms = cfg.timeout_ms(),
        "configuration loaded"
    );

    let session_path = cfg
        .session
        .file
        .clone()
        .unwrap_or_else(session::FileStorage::default_path);
    let storage: Box<dyn session::SessionStorage> = if args.ephemeral {
        Box::new(session::MemoryStorage::default())
    } else {
        let file = session::FileStorage::new(&session_path);
        tracing::debug!(path = %file.path().display(), "session file");
        Box::new(file)
    };
    let mut store = session::SessionStore::new(storage);
    store.restore();
    tracing::debug!(authenticated = store.is_authenticated(), "session restored");

    let client = api::Client::new(cfg.base_url(), cfg.timeout_ms());
    tracing::info!(base_url = client.base_url(), "backend client ready");

    let mut ctx = cli::Context::new(Box::new(client), store);
    if !args.ephemeral {
        ctx.history_path = session_path.parent().map(|dir| dir.join("history.txt"));
    }

    if args.exec.is_empty() {
        cli::run_repl(ctx)
    } else {
        cli::run_once(&ctx, &args.exec)
    }
}
