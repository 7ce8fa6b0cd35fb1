//! Chat transport boundary
//!
//! The chat protocol itself lives in an external bridge process. This
//! module holds the types the bot exchanges with it, the outbound trait the
//! dispatcher sends through, and the connection supervisor.

pub mod bridge;
pub mod creds;
pub mod supervisor;

pub use bridge::BridgeTransport;
pub use creds::{CredentialError, CredentialStore};
pub use supervisor::Supervisor;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("connection is already running")]
    AlreadyRunning,
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound side of the chat transport
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), TransportError> {
        (**self).send_text(jid, text).await
    }
}

// ============================================================================
// Inbound messages
// ============================================================================

/// A message event from the transport
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub remote_jid: String,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub message: Option<MessagePayload>,
}

/// Message body variants; anything unrecognized is ignored on decode
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(default)]
    pub extended_text_message: Option<ExtendedText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtendedText {
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundMessage {
    /// Best-effort plain text; unsupported payloads yield ""
    pub fn text(&self) -> &str {
        let Some(payload) = &self.message else {
            return "";
        };
        payload
            .conversation
            .as_deref()
            .or_else(|| {
                payload
                    .extended_text_message
                    .as_ref()
                    .and_then(|ext| ext.text.as_deref())
            })
            .unwrap_or("")
    }
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionUpdate {
    Connecting,
    Open,
    Close { reason: DisconnectReason },
}

/// Why the transport dropped, decoded from the bridge's status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "u16")]
pub enum DisconnectReason {
    /// The device was unlinked; reconnecting would need a new pairing
    LoggedOut,
    ConnectionLost,
    #[default]
    ConnectionClosed,
    ConnectionReplaced,
    RestartRequired,
    Other(u16),
}

impl From<u16> for DisconnectReason {
    fn from(code: u16) -> Self {
        match code {
            401 => Self::LoggedOut,
            408 => Self::ConnectionLost,
            428 => Self::ConnectionClosed,
            440 => Self::ConnectionReplaced,
            515 => Self::RestartRequired,
            other => Self::Other(other),
        }
    }
}

impl DisconnectReason {
    /// Everything except an explicit logout is worth reconnecting for
    pub fn should_reconnect(self) -> bool {
        !matches!(self, Self::LoggedOut)
    }
}
