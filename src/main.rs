use std::io::{self, Write};

use agentic_app::{cli::Cli, config::Config, error::AppError, session};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();

    let args = Cli::parse();
    let cfg = Config::load();

    let code = match session::launch(args, cfg).await {
        Ok(outcome) => {
            debug!(?outcome, "session finished");
            0
        }
        // already reported to the user and logged by the session
        Err(e @ AppError::MissingDataFile(_)) => e.exit_code(),
        Err(e @ AppError::ProjectRoot { .. }) => {
            error!("Failed to resolve the project root. Pass --project-root or set PROJECT_ROOT.");
            error!(error = ?e);
            e.exit_code()
        }
        Err(e) => {
            error!(error = ?e, "Unexpected error in the main execution loop.");
            e.exit_code()
        }
    };

    let _ = io::stdout().flush();
    // stdin may still be held by a blocking reader; exit without waiting on it
    std::process::exit(code);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agentic_app=debug,warn")),
        )
        .with_writer(io::stdout)
        .init();
}
