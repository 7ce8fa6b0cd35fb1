//! Message logging sink
//!
//! Every inbound and outbound message becomes one spreadsheet row. Appends
//! are fire-and-forget: rows go onto a queue drained by a single worker,
//! which writes them in arrival order and retries each one with backoff
//! before moving on. A final failure is logged and the row dropped.
//! Message delivery never waits on the sheet.

use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::sheets::SheetClient;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Who wrote a logged message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderKind {
    User,
    Bot,
}

impl SenderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SenderKind::User => "user",
            SenderKind::Bot => "bot",
        }
    }
}

/// One spreadsheet row: timestamp, counterparty, text, sender kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    pub timestamp: DateTime<Utc>,
    pub counterparty: String,
    pub text: String,
    pub sender: SenderKind,
}

impl LogRow {
    pub fn new(counterparty: impl Into<String>, text: impl Into<String>, sender: SenderKind) -> Self {
        Self {
            timestamp: Utc::now(),
            counterparty: counterparty.into(),
            text: text.into(),
            sender,
        }
    }

    pub fn user(counterparty: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(counterparty, text, SenderKind::User)
    }

    pub fn bot(counterparty: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(counterparty, text, SenderKind::Bot)
    }

    /// Cell values in column order A..D
    pub fn cells(&self) -> [String; 4] {
        [
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.counterparty.clone(),
            self.text.clone(),
            self.sender.as_str().to_string(),
        ]
    }
}

struct SinkInner {
    client: Arc<dyn SheetClient>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl SinkInner {
    async fn write(&self, row: &LogRow) -> bool {
        let client = self.client.as_ref();
        let result = self
            .policy
            .run(self.sleeper.as_ref(), move |_attempt| client.append_row(row))
            .await;

        match result {
            Ok(()) => {
                tracing::debug!(jid = %row.counterparty, sender = row.sender.as_str(), "Logged message");
                true
            }
            Err(e) => {
                tracing::error!(
                    jid = %row.counterparty,
                    sender = row.sender.as_str(),
                    error = %e,
                    "Dropping log row"
                );
                false
            }
        }
    }
}

/// Handle to the logging sink; cheap to clone
#[derive(Clone)]
pub struct LogSink {
    inner: Option<Arc<SinkInner>>,
    queue: Option<mpsc::UnboundedSender<LogRow>>,
}

impl LogSink {
    pub fn new(client: Arc<dyn SheetClient>) -> Self {
        Self::with_retry(client, RetryPolicy::default(), Arc::new(TokioSleeper))
    }

    /// Build the sink and start its worker; must be called inside a runtime
    pub fn with_retry(client: Arc<dyn SheetClient>, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        let inner = Arc::new(SinkInner {
            client,
            policy,
            sleeper,
        });
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(inner.clone(), rx));

        Self {
            inner: Some(inner),
            queue: Some(tx),
        }
    }

    /// Sink used when the sheet client could not be set up; appends are no-ops
    pub fn disabled() -> Self {
        Self {
            inner: None,
            queue: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Queue a row without waiting for the write or its retries
    pub fn append(&self, row: LogRow) {
        let Some(queue) = &self.queue else {
            return;
        };
        if queue.send(row).is_err() {
            tracing::error!("Logging worker has stopped; dropping log row");
        }
    }

    /// Write a row inline, returning whether it eventually succeeded
    #[allow(dead_code)] // Used by tests to observe the retry outcome
    pub async fn append_and_wait(&self, row: LogRow) -> bool {
        match &self.inner {
            Some(inner) => inner.write(&row).await,
            None => false,
        }
    }
}

/// Write queued rows one at a time, so sheet order follows message order.
/// Ends once every `LogSink` clone has been dropped.
async fn run_worker(inner: Arc<SinkInner>, mut rows: mpsc::UnboundedReceiver<LogRow>) {
    while let Some(row) = rows.recv().await {
        inner.write(&row).await;
    }
    tracing::debug!("Logging worker stopped");
}
