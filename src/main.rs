//! Binary entry point that loads the environment, installs logging and
//! launches the tour guide session.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use guidi::session;

#[tokio::main]
/// Bootstraps environment variables and diagnostics, then runs the session.
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    session::run_guide().await
}

/// Logs to stderr at `warn` unless `RUST_LOG` says otherwise, so
/// diagnostics stay out of the conversation on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
