//! Mock implementations for testing
//!
//! In-memory transport, sheet client and sleeper, plus a harness that
//! drives the dispatcher one event at a time.

use super::{Dispatcher, DispatcherHandle, Event};
use crate::expiry::INACTIVITY_TIMEOUT;
use crate::retry::{RetryPolicy, Sleeper};
use crate::sheets::{SheetClient, SheetsError};
use crate::sink::{LogRow, LogSink};
use crate::state_machine::Conversation;
use crate::transport::{InboundMessage, MessagePayload, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::field::{Field, Visit};
use tracing::Level;
use tracing_subscriber::layer::{Context, Layer};

// ============================================================================
// Mock Transport
// ============================================================================

/// Records every outbound send
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (they are still recorded)
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts_to(&self, jid: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| to == jid)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((jid.to_string(), text.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }
}

// ============================================================================
// Mock Sheet Client
// ============================================================================

/// Sheet client that fails with queued errors, then accepts rows
#[derive(Default)]
pub struct MockSheetClient {
    errors: Mutex<VecDeque<SheetsError>>,
    rows: Mutex<Vec<LogRow>>,
    attempts: AtomicU32,
    appended: Notify,
}

impl MockSheetClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next append with `error`
    pub fn queue_error(&self, error: SheetsError) {
        self.errors.lock().unwrap().push_back(error);
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<LogRow> {
        self.rows.lock().unwrap().clone()
    }

    /// Wait until at least `count` rows have been accepted
    pub async fn wait_for_rows(&self, count: usize) {
        loop {
            let notified = self.appended.notified();
            if self.rows.lock().unwrap().len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl SheetClient for MockSheetClient {
    async fn append_row(&self, row: &LogRow) -> Result<(), SheetsError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.rows.lock().unwrap().push(row.clone());
        self.appended.notify_waiters();
        Ok(())
    }
}

// ============================================================================
// Recording Sleeper
// ============================================================================

/// Records requested delays and returns immediately
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

// ============================================================================
// Warning Capture
// ============================================================================

/// Tracing layer that records the message of every WARN event
///
/// Install with `tracing::subscriber::set_default(registry().with(capture.clone()))`
/// on a current-thread test runtime.
#[derive(Clone, Default)]
pub struct WarnCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl WarnCapture {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl<S: tracing::Subscriber> Layer<S> for WarnCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.messages.lock().unwrap().push(visitor.0);
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Let spawned tasks (timers, sink writes) run to their next await point
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// A dispatcher handle wired to a bare receiver, for code that only posts
pub fn handle_pair() -> (DispatcherHandle, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(16);
    (DispatcherHandle { tx }, rx)
}

pub fn inbound_message(jid: &str, text: &str, from_me: bool) -> InboundMessage {
    InboundMessage {
        remote_jid: jid.to_string(),
        from_me,
        message: Some(MessagePayload {
            conversation: Some(text.to_string()),
            extended_text_message: None,
        }),
    }
}

/// Dispatcher over mocks, stepped manually instead of via `run`
pub struct TestDispatcher {
    pub dispatcher: Dispatcher<Arc<MockTransport>>,
    pub transport: Arc<MockTransport>,
    pub sheet: Arc<MockSheetClient>,
    /// Keeps the queue open so expiry timers can post into it
    _handle: DispatcherHandle,
}

impl TestDispatcher {
    pub fn new() -> Self {
        Self::with_sleeper(Arc::new(RecordingSleeper::default()))
    }

    /// Harness whose sink backs off through `sleeper`
    pub fn with_sleeper(sleeper: Arc<dyn Sleeper>) -> Self {
        let transport = Arc::new(MockTransport::new());
        let sheet = Arc::new(MockSheetClient::new());
        let sink = LogSink::with_retry(sheet.clone(), RetryPolicy::default(), sleeper);
        let (dispatcher, handle) = Dispatcher::new(transport.clone(), sink, INACTIVITY_TIMEOUT);

        Self {
            dispatcher,
            transport,
            sheet,
            _handle: handle,
        }
    }

    pub async fn dispatch(&mut self, message: InboundMessage) {
        self.dispatcher.process_event(Event::Inbound(message)).await;
    }

    pub async fn inbound(&mut self, jid: &str, text: &str) {
        self.dispatch(inbound_message(jid, text, false)).await;
    }

    /// Process every event already queued (timer fires); returns how many
    pub async fn drain(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.dispatcher.events.try_recv() {
            self.dispatcher.process_event(event).await;
            processed += 1;
        }
        processed
    }

    pub fn conversation(&self, jid: &str) -> Option<Conversation> {
        self.dispatcher.store.get(jid).copied()
    }
}
