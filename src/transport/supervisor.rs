//! Connection supervisor
//!
//! Keeps one bridge session alive: connect, pump frames until the bridge
//! closes, then reconnect unless the close reason was an explicit logout.

use super::bridge::{connection_update, BridgeFrame, OutboundFrame};
use super::{BridgeTransport, ConnectionUpdate, CredentialStore, DisconnectReason, TransportError};
use crate::dispatcher::DispatcherHandle;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Rejects overlapping `start` calls on the same supervisor
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

/// Held for the duration of a run; releases the guard on drop
pub struct RunToken<'a> {
    guard: &'a RunGuard,
}

impl RunGuard {
    pub fn try_acquire(&self) -> Option<RunToken<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunToken { guard: self })
    }

    #[allow(dead_code)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for RunToken<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

pub struct Supervisor {
    url: String,
    transport: Arc<BridgeTransport>,
    creds: CredentialStore,
    dispatcher: DispatcherHandle,
    reconnect_delay: Duration,
    guard: RunGuard,
}

impl Supervisor {
    pub fn new(
        url: impl Into<String>,
        transport: Arc<BridgeTransport>,
        creds: CredentialStore,
        dispatcher: DispatcherHandle,
    ) -> Self {
        Self {
            url: url.into(),
            transport,
            creds,
            dispatcher,
            reconnect_delay: RECONNECT_DELAY,
            guard: RunGuard::default(),
        }
    }

    #[allow(dead_code)] // Used by tests to keep reconnect loops fast
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run sessions until the bridge reports a logout.
    ///
    /// Connection failures and every other close reason lead to another
    /// attempt after `reconnect_delay`, indefinitely.
    pub async fn start(&self) -> Result<(), TransportError> {
        let Some(_running) = self.guard.try_acquire() else {
            tracing::warn!("Transport already running, ignoring start");
            return Err(TransportError::AlreadyRunning);
        };

        loop {
            tracing::info!(url = %self.url, "Connecting to transport bridge");

            let reason = match self.run_session().await {
                Ok(reason) => reason,
                Err(e) => {
                    tracing::warn!(error = %e, "Bridge session failed");
                    DisconnectReason::ConnectionLost
                }
            };

            if !reason.should_reconnect() {
                tracing::warn!(?reason, "Logged out; staying disconnected");
                return Ok(());
            }

            tracing::info!(
                ?reason,
                delay_ms = %self.reconnect_delay.as_millis(),
                "Connection closed, reconnecting"
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn run_session(&self) -> Result<DisconnectReason, TransportError> {
        let (socket, _) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        let (mut ws_tx, mut ws_rx) = socket.split();

        match self.creds.load().await {
            Ok(Some(creds)) => {
                let frame = OutboundFrame::Auth { creds: &creds }.encode()?;
                ws_tx.send(Message::text(frame)).await?;
            }
            Ok(None) => tracing::info!("No saved credentials; bridge will request pairing"),
            Err(e) => tracing::error!(error = %e, "Failed to load saved credentials"),
        }

        let mut outbound = self.transport.attach();

        let result = loop {
            tokio::select! {
                Some(frame) = outbound.recv() => {
                    if let Err(e) = ws_tx.send(Message::text(frame)).await {
                        break Err(e.into());
                    }
                }
                incoming = ws_rx.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reason) = self.handle_frame(&text).await {
                            break Ok(reason);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(DisconnectReason::ConnectionClosed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                },
            }
        };

        self.transport.detach();
        result
    }

    /// Handle one bridge frame; returns the close reason when the session ends
    async fn handle_frame(&self, text: &str) -> Option<DisconnectReason> {
        let frame = match BridgeFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed bridge frame");
                return None;
            }
        };

        match frame {
            BridgeFrame::Message(message) => {
                if let Err(e) = self.dispatcher.inbound(message).await {
                    tracing::error!(error = %e, "Dropping inbound message");
                }
                None
            }
            BridgeFrame::Connection { connection, reason } => match connection_update(connection, reason) {
                ConnectionUpdate::Connecting => {
                    tracing::info!("Bridge connecting");
                    None
                }
                ConnectionUpdate::Open => {
                    tracing::info!("Bridge connection open");
                    None
                }
                ConnectionUpdate::Close { reason } => Some(reason),
            },
            BridgeFrame::CredsUpdate { creds } => {
                if let Err(e) = self.creds.save(&creds).await {
                    tracing::error!(error = %e, "Failed to persist rotated credentials");
                }
                None
            }
        }
    }
}
