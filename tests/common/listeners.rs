//! Reusable listeners for integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use event_dispatcher::{CompletionSignal, Event, EventListener};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counts invocations, then signals completion
#[derive(Debug, Default)]
pub struct CountingListener {
    calls: AtomicUsize,
}

impl CountingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventListener for CountingListener {
    async fn execute(&self, _event: Arc<Event>, done: CompletionSignal) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        done.complete();
    }

    fn listener_name(&self) -> &str {
        "counting_listener"
    }
}

/// Appends its index to a shared list, then signals completion
#[derive(Debug)]
pub struct IndexRecorder {
    index: usize,
    seen: Arc<Mutex<Vec<usize>>>,
}

impl IndexRecorder {
    pub fn new(index: usize, seen: &Arc<Mutex<Vec<usize>>>) -> Arc<Self> {
        Arc::new(Self {
            index,
            seen: Arc::clone(seen),
        })
    }
}

#[async_trait]
impl EventListener for IndexRecorder {
    async fn execute(&self, _event: Arc<Event>, done: CompletionSignal) {
        self.seen.lock().push(self.index);
        done.complete();
    }

    fn listener_name(&self) -> &str {
        "index_recorder"
    }
}

/// Records the time it ran, then signals completion
#[derive(Debug, Default)]
pub struct TimestampRecorder {
    stamps: Mutex<Vec<DateTime<Utc>>>,
}

impl TimestampRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stamps(&self) -> Vec<DateTime<Utc>> {
        self.stamps.lock().clone()
    }
}

#[async_trait]
impl EventListener for TimestampRecorder {
    async fn execute(&self, _event: Arc<Event>, done: CompletionSignal) {
        self.stamps.lock().push(Utc::now());
        done.complete();
    }

    fn listener_name(&self) -> &str {
        "timestamp_recorder"
    }
}

/// Sleeps before counting and signalling
#[derive(Debug)]
pub struct SlowListener {
    delay: Duration,
    finished: AtomicUsize,
}

impl SlowListener {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            finished: AtomicUsize::new(0),
        })
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventListener for SlowListener {
    async fn execute(&self, _event: Arc<Event>, done: CompletionSignal) {
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        done.complete();
    }

    fn listener_name(&self) -> &str {
        "slow_listener"
    }
}

/// Holds its completion signal until [`release`](Self::release) is called
#[derive(Debug, Default)]
pub struct ManualListener {
    pending: Mutex<Vec<CompletionSignal>>,
}

impl ManualListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Complete every signal held so far
    pub fn release(&self) -> usize {
        let signals: Vec<CompletionSignal> = self.pending.lock().drain(..).collect();
        let released = signals.len();
        signals.into_iter().for_each(CompletionSignal::complete);
        released
    }
}

#[async_trait]
impl EventListener for ManualListener {
    async fn execute(&self, _event: Arc<Event>, done: CompletionSignal) {
        self.pending.lock().push(done);
    }

    fn listener_name(&self) -> &str {
        "manual_listener"
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
