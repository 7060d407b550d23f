use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Lesson store sidecar for the Docente++ web UI. Speaks newline-delimited
/// JSON on stdin/stdout; logs go to stderr.
#[derive(Debug, Clone, Parser)]
#[command(name = "docented", version)]
pub struct Cli {
    /// Workspace directory to open at startup.
    #[arg(long, env = "DOCENTED_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// tracing filter directive.
    #[arg(long = "log", env = "DOCENTED_LOG", default_value = "docented=info,warn")]
    pub log_filter: String,

    /// How long a store call waits on a locked database before failing.
    #[arg(long, env = "DOCENTED_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    pub busy_timeout_ms: u64,
}

impl Cli {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

pub fn init_tracing(filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("docented=info,warn"));
    // stdout carries IPC responses.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
