//! TCP connection handler
//!
//! Handles individual client connections: frames incoming bytes into
//! `Event::Message`s for the ChatServer and drains the connection's
//! outbound queue onto the socket.

use std::future::Future;
use std::io;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

use crate::client::Connection;
use crate::codec::ChatCodec;
use crate::config::{Config, Framing};
use crate::error::AppError;
use crate::message::Outbound;
use crate::redact::Redactor;
use crate::server::Event;

/// Per-connection settings taken from `Config`
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub framing: Framing,
    pub max_message_bytes: usize,
    pub outbound_queue_capacity: usize,
    pub write_timeout: Duration,
    pub redactor: Redactor,
}

impl From<&Config> for ConnectionSettings {
    fn from(config: &Config) -> Self {
        Self {
            framing: config.framing,
            max_message_bytes: config.max_message_bytes,
            outbound_queue_capacity: config.outbound_queue_capacity,
            write_timeout: config.write_timeout(),
            redactor: Redactor::new(config.safe_mode),
        }
    }
}

/// Handle a new TCP connection
///
/// Registers the connection with the ChatServer, then reads and writes
/// until the peer goes away, a write fails or times out, or the server
/// closes the connection. Always reports the disconnect.
pub async fn handle_connection(
    stream: TcpStream,
    events: mpsc::Sender<Event>,
    settings: ConnectionSettings,
) -> Result<(), AppError> {
    let peer = stream.peer_addr()?;
    let client = settings.redactor.sensitive(peer);
    let _ = stream.set_nodelay(true);

    let (read_half, write_half) = stream.into_split();
    let (out_tx, out_rx) = mpsc::channel(settings.outbound_queue_capacity);
    let conn = Connection::new(peer, out_tx);
    let shutdown = conn.shutdown_token();

    // Register with ChatServer
    if events
        .send(Event::Connected { conn: conn.clone() })
        .await
        .is_err()
    {
        return Err(AppError::ChannelSend);
    }

    let codec = ChatCodec::new(settings.framing, settings.max_message_bytes);
    let mut reader = FramedRead::new(read_half, codec.clone());
    let mut writer = FramedWrite::new(write_half, codec);

    let outcome = tokio::select! {
        result = read_messages(&mut reader, &conn, &events) => {
            debug!(client = %client, "Read side finished");
            result
        }
        result = write_frames(&mut writer, out_rx, settings.write_timeout) => {
            debug!(client = %client, "Write side finished");
            result
        }
        _ = shutdown.cancelled() => {
            debug!(client = %client, "Connection shut down by server");
            Ok(())
        }
    };

    // Drop both halves so the socket is closed before the server hears about it
    drop(reader);
    drop(writer);

    let _ = events.send(Event::Disconnected { conn }).await;

    outcome
}

/// Socket → ChatServer
///
/// Ends on EOF or read error. Waits (does not drop) when the event
/// channel is full.
async fn read_messages(
    reader: &mut FramedRead<OwnedReadHalf, ChatCodec>,
    conn: &Connection,
    events: &mpsc::Sender<Event>,
) -> Result<(), AppError> {
    while let Some(frame) = reader.next().await {
        let payload = match frame {
            Ok(payload) => payload,
            Err(e) => {
                debug!(connection = %conn.id, error = %e, "Read failed");
                return Ok(());
            }
        };

        events
            .send(Event::Message {
                conn: conn.clone(),
                payload,
            })
            .await
            .map_err(|_| AppError::ChannelSend)?;
    }
    Ok(())
}

/// Outbound queue → socket
///
/// Ends after a `Close` frame, or with an error when a write fails or
/// exceeds `write_timeout`.
async fn write_frames(
    writer: &mut FramedWrite<OwnedWriteHalf, ChatCodec>,
    mut outbound: mpsc::Receiver<Outbound>,
    write_timeout: Duration,
) -> Result<(), AppError> {
    while let Some(frame) = outbound.recv().await {
        match frame {
            Outbound::Data(data) => {
                with_timeout(write_timeout, writer.send(data)).await?;
            }
            Outbound::Close { notice } => {
                if let Some(notice) = notice {
                    with_timeout(write_timeout, writer.send(notice)).await?;
                }
                with_timeout(write_timeout, writer.close()).await?;
                break;
            }
        }
    }
    Ok(())
}

async fn with_timeout<F>(limit: Duration, write: F) -> Result<(), AppError>
where
    F: Future<Output = io::Result<()>>,
{
    match timeout(limit, write).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(AppError::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            "write timed out",
        ))),
    }
}
