//! Multi-Client TCP Chat Relay - Entry Point
//!
//! Parses configuration, binds the listener and runs the relay until Ctrl+C.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use multichat::{listener, AppError, Cli, Redactor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=multichat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("multichat=info")),
        )
        .init();

    let config = Cli::parse().into_config().map_err(AppError::from)?;
    let redactor = Redactor::new(config.safe_mode);

    let tcp = match listener::bind(&config).await {
        Ok(tcp) => tcp,
        Err(AppError::Bind { addr, source }) => {
            error!(
                port = config.port,
                error = %redactor.sensitive(&source),
                "Could not listen to port"
            );
            return Err(AppError::Bind { addr, source }.into());
        }
        Err(e) => return Err(e.into()),
    };

    tokio::select! {
        _ = listener::serve(tcp, config) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
