use cadence::commands::Cli;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Structured logging only when explicitly requested; plain console
    // output otherwise (see libs::messages::macros).
    if std::env::var("CADENCE_DEBUG").is_ok() || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    Cli::menu().await
}
