//! Log setup: a file under the data directory, falling back to stderr.
//!
//! Standard output belongs to the interactive views, so log lines never go
//! there.

use anyhow::Result;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// `<data-local-dir>/courseguide/courseguide.log`
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("courseguide"))
        .unwrap_or_else(|| PathBuf::from(".courseguide"))
        .join("courseguide.log")
}

/// Per-event writer: the shared log file, or stderr if it can't be cloned.
enum FileOrStderr {
    File(File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct LogFile(File);

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = FileOrStderr;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(FileOrStderr::File)
            .unwrap_or(FileOrStderr::Stderr)
    }
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Send logs to `path`, appending. Returns Err when the file cannot be
/// opened so the caller can fall back to [`init_stderr`].
pub fn init_file(path: &Path, default_directive: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_writer(LogFile(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {}", e))?;

    tracing::info!("logging to {}", path.display());
    Ok(())
}

pub fn init_stderr(default_directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}
