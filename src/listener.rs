//! TCP listener
//!
//! Binds the configured address, starts the ChatServer actor and spawns a
//! connection handler per accepted socket.

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::handler::{handle_connection, ConnectionSettings};
use crate::redact::Redactor;
use crate::server::ChatServer;

/// Bind the listening socket
///
/// The only fatal runtime error: nothing works without it.
pub async fn bind(config: &Config) -> Result<TcpListener, AppError> {
    let addr = config.bind_addr();
    TcpListener::bind(&addr)
        .await
        .map_err(|source| AppError::Bind { addr, source })
}

/// Run the relay on an already bound listener
///
/// Never returns; drop the future to stop accepting. A failed accept is
/// logged and skipped.
pub async fn serve(listener: TcpListener, config: Config) {
    let redactor = Redactor::new(config.safe_mode);
    let settings = ConnectionSettings::from(&config);

    // Bounded: readers wait for the server when it falls behind
    let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity);
    tokio::spawn(ChatServer::new(&config, event_rx).run());

    match listener.local_addr() {
        Ok(addr) => info!(port = addr.port(), "Listening to TCP connections"),
        Err(e) => warn!(error = %e, "Listening on unknown address"),
    }

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!(client = %redactor.sensitive(addr), "New TCP connection");
                let event_tx = event_tx.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, event_tx, settings).await {
                        warn!(
                            client = %redactor.sensitive(addr),
                            error = %e,
                            "Connection handler error"
                        );
                    }
                });
            }
            Err(e) => {
                error!(error = %redactor.sensitive(&e), "Could not accept a connection");
            }
        }
    }
}
