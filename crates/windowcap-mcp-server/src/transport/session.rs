//! In-memory bridge between a network session and an rmcp service
//!
//! Each session runs its own [`WindowCapServer`] over a duplex byte stream
//! carrying newline-delimited JSON-RPC, exactly as the stdio transport would
//! see it. The transport pushes client messages in with
//! [`SessionBridge::send`] and drains server messages from the receiver
//! returned by [`SessionBridge::spawn`].
//!
//! Dropping every clone of the bridge (or cancelling its token) closes the
//! client side of the stream; the service sees EOF and stops. Nothing else
//! is shared between sessions except the dispatcher behind the server.

use rmcp::ServiceExt;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use crate::mcp::WindowCapServer;

/// Bytes buffered in each direction before the writer waits.
const DUPLEX_BUFFER: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct SessionBridge {
    id:      String,
    inbound: mpsc::UnboundedSender<String>,
    cancel:  CancellationToken,
}

impl SessionBridge {
    /// Starts the service for a new session.
    ///
    /// `parent` cancels the session along with the transport. The returned
    /// receiver yields one JSON-RPC message per item and ends when the
    /// service stops.
    pub fn spawn(
        id: String,
        server: WindowCapServer,
        parent: &CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let cancel = parent.child_token();
        let (client_side, server_side) = tokio::io::duplex(DUPLEX_BUFFER);
        let (client_read, mut client_write) = tokio::io::split(client_side);
        let (inbound, mut inbound_rx) = mpsc::unbounded_channel::<String>();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();

        let service_session = id.clone();
        tokio::spawn(async move {
            match server.serve(tokio::io::split(server_side)).await {
                Ok(running) => match running.waiting().await {
                    Ok(reason) => {
                        tracing::debug!(session = %service_session, ?reason, "session service stopped")
                    }
                    Err(e) => {
                        tracing::warn!(session = %service_session, error = %e, "session service panicked")
                    }
                },
                Err(e) => {
                    tracing::info!(session = %service_session, error = %e, "session ended before initialization")
                }
            }
        });

        let writer_cancel = cancel.clone();
        let writer_session = id.clone();
        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = writer_cancel.cancelled() => break,
                    message = inbound_rx.recv() => match message {
                        Some(message) => message,
                        None => break,
                    },
                };
                let mut line = message.into_bytes();
                line.push(b'\n');
                if let Err(e) = client_write.write_all(&line).await {
                    tracing::debug!(session = %writer_session, error = %e, "session input closed");
                    break;
                }
            }
            let _ = client_write.shutdown().await;
        });

        let reader_session = id.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(client_read).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => {
                        if outbound_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(session = %reader_session, error = %e, "session output closed");
                        break;
                    }
                }
            }
        });

        (
            Self {
                id,
                inbound,
                cancel,
            },
            outbound_rx,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queues one JSON-RPC message for the service. Returns `false` once the
    /// session has closed.
    pub fn send(&self, message: String) -> bool {
        !self.cancel.is_cancelled() && self.inbound.send(message).is_ok()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.inbound.is_closed()
    }
}
