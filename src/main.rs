mod analytics;
mod backup;
mod config;
mod db;
mod error;
mod events;
mod ipc;
mod ledger;
mod lessons;
mod model;
mod schedule;
mod session;
mod slots;
mod store;

use clap::Parser;
use serde_json::json;
use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};

fn write_line(stdout: &mut impl Write, value: &serde_json::Value) -> io::Result<()> {
    let line = serde_json::to_string(value).unwrap_or_else(|_| "{\"ok\":false}".to_string());
    writeln!(stdout, "{}", line)?;
    stdout.flush()
}

fn main() {
    let cli = config::Cli::parse();
    config::init_tracing(&cli.log_filter);

    let mut state = ipc::AppState::new(cli.busy_timeout());
    if let Some(path) = cli.workspace.as_deref() {
        if let Err(e) = state.open_workspace(path) {
            // The UI can still pick another workspace over IPC.
            error!(error = %format!("{e:#}"), "failed to open startup workspace");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "docented ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to answer with.
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                if write_line(&mut stdout, &resp).is_err() {
                    break;
                }
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let mut lines = state.take_events();
        lines.push(resp);
        if lines.iter().any(|v| write_line(&mut stdout, v).is_err()) {
            break;
        }
    }
}
