//! Per-conversation inactivity timers
//!
//! Each counterparty has at most one pending single-shot timer. A timer
//! does not touch the store; it posts `Event::Expired` back into the
//! dispatcher's queue, tagged with a generation. Rescheduling bumps the
//! generation, so a fire that was already queued before the reschedule is
//! recognized as stale and ignored.

use crate::dispatcher::Event;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;

pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(120);

struct PendingExpiry {
    generation: u64,
    handle: AbortHandle,
}

pub struct ExpiryScheduler {
    timeout: Duration,
    /// Weak so pending timers don't keep the dispatcher loop alive
    events: mpsc::WeakSender<Event>,
    timers: HashMap<String, PendingExpiry>,
    next_generation: u64,
}

impl ExpiryScheduler {
    pub fn new(timeout: Duration, events: mpsc::WeakSender<Event>) -> Self {
        Self {
            timeout,
            events,
            timers: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Cancel any pending timer for `jid` and arm a fresh one.
    pub fn reschedule(&mut self, jid: &str) -> u64 {
        self.cancel(jid);

        self.next_generation += 1;
        let generation = self.next_generation;
        let deadline = Instant::now() + self.timeout;
        let events = self.events.clone();
        let id = jid.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(tx) = events.upgrade() {
                let _ = tx.send(Event::Expired { jid: id, generation }).await;
            }
        })
        .abort_handle();

        self.timers
            .insert(jid.to_string(), PendingExpiry { generation, handle });
        generation
    }

    /// Abort the pending timer for `jid`, if any.
    pub fn cancel(&mut self, jid: &str) -> bool {
        match self.timers.remove(jid) {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Consume a fired timer. Returns false for stale or unknown fires.
    pub fn take_if_current(&mut self, jid: &str, generation: u64) -> bool {
        match self.timers.get(jid) {
            Some(pending) if pending.generation == generation => {
                self.timers.remove(jid);
                true
            }
            _ => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, pending) in self.timers.drain() {
            pending.handle.abort();
        }
    }

    #[allow(dead_code)]
    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
