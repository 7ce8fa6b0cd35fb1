//! JSON-over-WebSocket bridge adapter
//!
//! Frames are JSON text messages tagged by `type`:
//!
//! ```text
//! bridge -> bot  {"type":"message","remoteJid":..,"fromMe":..,"message":{..}}
//! bridge -> bot  {"type":"connection","connection":"close","reason":401}
//! bridge -> bot  {"type":"creds_update","creds":{..}}
//! bot -> bridge  {"type":"send_text","jid":..,"text":..}
//! bot -> bridge  {"type":"auth","creds":{..}}
//! ```

use super::{ConnectionUpdate, DisconnectReason, InboundMessage, Transport, TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Frames received from the bridge
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeFrame {
    Message(InboundMessage),
    Connection {
        connection: ConnectionState,
        #[serde(default)]
        reason: Option<DisconnectReason>,
    },
    CredsUpdate {
        creds: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    Close,
}

impl BridgeFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Lift a `connection` frame into a lifecycle update
pub fn connection_update(state: ConnectionState, reason: Option<DisconnectReason>) -> ConnectionUpdate {
    match state {
        ConnectionState::Connecting => ConnectionUpdate::Connecting,
        ConnectionState::Open => ConnectionUpdate::Open,
        ConnectionState::Close => ConnectionUpdate::Close {
            reason: reason.unwrap_or_default(),
        },
    }
}

/// Frames sent to the bridge
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame<'a> {
    SendText { jid: &'a str, text: &'a str },
    Auth { creds: &'a Value },
}

impl OutboundFrame<'_> {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Outbound half of the bridge connection
///
/// The supervisor attaches a fresh queue for each live session; sends made
/// while disconnected fail with `NotConnected` rather than buffering.
#[derive(Debug, Default)]
pub struct BridgeTransport {
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl BridgeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session; frames queued by `send_text` arrive on the receiver
    pub fn attach(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.outbound.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(tx);
        rx
    }

    pub fn detach(&self) {
        self.outbound
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
    }

    fn sender(&self) -> Option<mpsc::UnboundedSender<String>> {
        self.outbound
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), TransportError> {
        let frame = OutboundFrame::SendText { jid, text }.encode()?;
        let sender = self.sender().ok_or(TransportError::NotConnected)?;
        sender.send(frame).map_err(|_| TransportError::NotConnected)
    }
}
