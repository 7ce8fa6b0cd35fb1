//! Message dispatcher
//!
//! A single task owns the conversation store and the expiry timers and
//! consumes inbound messages and timer fires from one queue, in order.
//! Whichever of the two reaches the queue first is handled to completion
//! before the other.

mod event;
#[cfg(test)]
pub mod testing;

pub use event::Event;

use crate::expiry::ExpiryScheduler;
use crate::menu::{self, BOT_SUFFIX, INACTIVITY_NOTICE, WELCOME};
use crate::sink::{LogRow, LogSink};
use crate::state_machine::{transition, Effect};
use crate::store::ConversationStore;
use crate::transport::{InboundMessage, Transport};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error)]
#[error("dispatcher has stopped")]
pub struct DispatcherClosed;

/// Cloneable entry point used by the transport layer
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<Event>,
}

impl DispatcherHandle {
    pub async fn inbound(&self, message: InboundMessage) -> Result<(), DispatcherClosed> {
        self.tx
            .send(Event::Inbound(message))
            .await
            .map_err(|_| DispatcherClosed)
    }
}

pub struct Dispatcher<T: Transport> {
    transport: T,
    sink: LogSink,
    store: ConversationStore,
    expiry: ExpiryScheduler,
    events: mpsc::Receiver<Event>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, sink: LogSink, inactivity_timeout: Duration) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let expiry = ExpiryScheduler::new(inactivity_timeout, tx.downgrade());
        let dispatcher = Self {
            transport,
            sink,
            store: ConversationStore::new(),
            expiry,
            events: rx,
        };
        (dispatcher, DispatcherHandle { tx })
    }

    /// Process events until every `DispatcherHandle` has been dropped
    pub async fn run(mut self) {
        tracing::info!(sink_enabled = self.sink.is_enabled(), "Dispatcher started");

        while let Some(event) = self.events.recv().await {
            self.process_event(event).await;
        }

        self.expiry.cancel_all();
        tracing::info!(
            open_conversations = self.store.len(),
            "Dispatcher stopped"
        );
    }

    async fn process_event(&mut self, event: Event) {
        match event {
            Event::Inbound(message) => self.handle_inbound(message).await,
            Event::Expired { jid, generation } => self.handle_expired(&jid, generation).await,
        }
    }

    async fn handle_inbound(&mut self, message: InboundMessage) {
        if message.from_me {
            return;
        }

        let jid = message.remote_jid.as_str();
        let text = message.text();
        tracing::debug!(jid = %jid, text = %text, "Inbound message");
        self.sink.append(LogRow::user(jid, text));

        let (conversation, created) = self.store.get_or_create(jid);

        if created {
            tracing::info!(jid = %jid, "New conversation");
            self.expiry.reschedule(jid);
            self.send_reply(jid, WELCOME).await;
            self.send_reply(jid, &menu::MAIN.render()).await;
            return;
        }

        let result = transition(conversation, text);
        *conversation = result.conversation();
        self.expiry.reschedule(jid);

        if result.handoff {
            tracing::debug!(jid = %jid, "Conversation held by human agent");
        }

        for effect in result.effects {
            match effect {
                Effect::Reply { text } => self.send_reply(jid, &text).await,
                Effect::EndConversation => {
                    self.expiry.cancel(jid);
                    self.store.remove(jid);
                    tracing::info!(jid = %jid, "Conversation ended by user");
                }
            }
        }
    }

    async fn handle_expired(&mut self, jid: &str, generation: u64) {
        // Stale fires and fires for conversations already gone are no-ops
        if !self.expiry.take_if_current(jid, generation) || !self.store.exists(jid) {
            tracing::debug!(jid = %jid, generation, "Ignoring stale expiry");
            return;
        }

        self.send_direct(jid, INACTIVITY_NOTICE).await;
        self.store.remove(jid);
        tracing::info!(jid = %jid, "Conversation expired");
    }

    /// Send a bot reply with the attribution suffix
    async fn send_reply(&self, jid: &str, text: &str) {
        self.deliver(jid, format!("{text}{BOT_SUFFIX}")).await;
    }

    /// Send text verbatim
    async fn send_direct(&self, jid: &str, text: &str) {
        self.deliver(jid, text.to_string()).await;
    }

    async fn deliver(&self, jid: &str, text: String) {
        self.sink.append(LogRow::bot(jid, text.as_str()));
        if let Err(e) = self.transport.send_text(jid, &text).await {
            tracing::error!(jid = %jid, error = %e, "Failed to send message");
        }
    }
}
