mod config;
mod dashboard;
mod db;
mod decode;
mod error;
mod ingest;
mod ipc;
mod logging;
mod normalize;
mod table;
#[cfg(test)]
mod test_xlsx;

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "examboardd")]
#[command(about = "Exam results ingestion and dashboard sidecar (JSON lines over stdio)")]
#[command(version)]
struct Cli {
    /// Workspace folder to open at startup (same as a `workspace.select` request)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Log filter, e.g. `examboardd=debug`. Falls back to EXAMBOARD_LOG.
    #[arg(long)]
    log: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.log.as_deref());

    let mut state = ipc::AppState::default();
    if let Some(path) = cli.workspace {
        if let Err(e) = ipc::select_workspace(&mut state, path) {
            let message = format!("{e:#}");
            error!(error = %message, "startup workspace could not be opened");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "examboardd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            // Can't reply with an id; answer anyway so the client isn't left waiting.
            Err(e) => ipc::bad_json(e.to_string()),
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed, shutting down");
}
