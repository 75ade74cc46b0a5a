//! Dockyard - headless host for the dockable workspace engine.
//!
//! Restores the saved workspace, signs in the demo user when asked, prints
//! the resulting layout as JSON and saves it again.

mod app;

use std::process::ExitCode;

use app::DockyardApp;
use dockyard_core::logging::{init_logging, log_dir, LogConfig};

fn main() -> ExitCode {
    let _logging_guard = init_logging(LogConfig::new(log_dir()));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Dockyard");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    let mut app = DockyardApp::new(runtime);
    app.restore();

    if std::env::args().any(|arg| arg == "--login") {
        app.sign_in("demo", "demo");
    }

    let state = app.store().state();
    match serde_json::to_string_pretty(&state.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Failed to render workspace"),
    }
    if let Some(error) = &state.ui.error {
        tracing::warn!(%error, "Workspace reported an error");
    }

    app.save();
    tracing::info!("Dockyard finished");
    ExitCode::SUCCESS
}
