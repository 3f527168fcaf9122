//! # Dispatcher
//!
//! Fans each dispatched event out to every listener registered under its name,
//! one tokio task per listener, and tracks the resulting invocations so callers
//! can pause them before they start or wait for them to finish.
//!
//! ## Locking
//!
//! All bookkeeping (listeners, pause gates, completion gates) lives behind one
//! `parking_lot::Mutex` that is only held for map updates, never across an
//! `.await`. Waiting on completion gates happens outside that lock, serialised
//! per event by an async mutex, so a slow listener only delays waiters on its
//! own event.

use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{debug, instrument, trace, warn};

use super::gates::{
    completion_gate, CompletionGate, CompletionSignal, GateOutcome, PauseGate, PauseSwitch,
};
use super::listener::{EventListener, FnListener};
use super::types::{Event, InvocationId};
use crate::config::DispatcherConfig;
use crate::error::{DispatcherError, DispatcherResult};
use crate::logging::{log_dispatcher_operation, log_error};

/// Slot holding the gate a waiter is currently blocked on; survives a cancelled wait
type WaiterSlot = Arc<tokio::sync::Mutex<Option<CompletionGate>>>;

#[derive(Default)]
struct DispatcherState {
    listeners: HashMap<String, Vec<Arc<dyn EventListener>>>,
    pause_gates: HashMap<String, HashSet<InvocationId>>,
    completion_gates: HashMap<String, VecDeque<CompletionGate>>,
    waiters: HashMap<String, WaiterSlot>,
}

struct DispatcherInner {
    config: DispatcherConfig,
    state: Mutex<DispatcherState>,
    pause: PauseSwitch,
    next_invocation: AtomicU64,
}

impl DispatcherInner {
    fn release_pause_gate(&self, name: &str, invocation_id: InvocationId) {
        let mut state = self.state.lock();
        if let Some(gates) = state.pause_gates.get_mut(name) {
            gates.remove(&invocation_id);
        }
    }

    fn next_completion_gate(&self, name: &str) -> Option<CompletionGate> {
        self.state
            .lock()
            .completion_gates
            .get_mut(name)
            .and_then(VecDeque::pop_front)
    }

    fn waiter_slot(&self, name: &str) -> WaiterSlot {
        let mut state = self.state.lock();
        Arc::clone(state.waiters.entry(name.to_string()).or_default())
    }
}

/// In-process event dispatcher
///
/// Cloning is cheap; clones share the same listeners, gates and pause state.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Create a dispatcher with default configuration
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher from an explicit configuration
    pub fn with_config(config: DispatcherConfig) -> Self {
        let pause = PauseSwitch::new(config.start_paused);
        debug!(
            dispatcher = %config.name,
            start_paused = config.start_paused,
            "Dispatcher created"
        );
        Self {
            inner: Arc::new(DispatcherInner {
                config,
                state: Mutex::new(DispatcherState::default()),
                pause,
                next_invocation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    /// Register a listener for `name`.
    ///
    /// Registering the same listener twice makes it run twice per dispatch.
    pub fn register_listener(&self, name: impl Into<String>, listener: Arc<dyn EventListener>) {
        let name = name.into();
        debug!(
            dispatcher = %self.inner.config.name,
            event = %name,
            listener = %listener.listener_name(),
            "Registered listener"
        );
        self.inner
            .state
            .lock()
            .listeners
            .entry(name)
            .or_default()
            .push(listener);
    }

    /// Register an async closure as a listener for `name`
    pub fn register_listener_fn<F, Fut>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(Arc<Event>, CompletionSignal) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.register_listener(name, Arc::new(FnListener::new(func)));
    }

    /// Number of listeners currently registered for `name`
    pub fn listener_count(&self, name: &str) -> usize {
        self.inner
            .state
            .lock()
            .listeners
            .get(name)
            .map_or(0, Vec::len)
    }

    /// Every event name the dispatcher has seen a registration or dispatch for
    pub fn event_names(&self) -> Vec<String> {
        let state = self.inner.state.lock();
        let mut names: Vec<String> = state
            .listeners
            .keys()
            .chain(state.pause_gates.keys())
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();
        names
    }

    /// Dispatch `event` to every listener registered for `name`.
    ///
    /// Spawns one task per listener and returns the number started without
    /// waiting for any of them. Listeners registered after this returns are not
    /// part of this dispatch.
    pub fn dispatch(&self, name: &str, event: Event) -> DispatcherResult<usize> {
        let runtime = Handle::try_current().map_err(|_| DispatcherError::no_runtime(name))?;
        let event = Arc::new(event);

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        let pause_gates = state.pause_gates.entry(name.to_string()).or_default();
        let listeners = match state.listeners.get(name) {
            Some(listeners) if !listeners.is_empty() => listeners,
            _ => {
                trace!(
                    dispatcher = %self.inner.config.name,
                    event = %name,
                    "No listeners registered for event"
                );
                return Ok(0);
            }
        };
        let completion_gates = state
            .completion_gates
            .entry(name.to_string())
            .or_default();

        for listener in listeners {
            let invocation_id =
                InvocationId(self.inner.next_invocation.fetch_add(1, Ordering::Relaxed));

            let pause_gate = self.inner.pause.gate(invocation_id);
            pause_gates.insert(invocation_id);

            let (signal, gate) = completion_gate(invocation_id);
            completion_gates.push_back(gate);

            runtime.spawn(run_invocation(
                Arc::downgrade(&self.inner),
                name.to_string(),
                Arc::clone(listener),
                Arc::clone(&event),
                pause_gate,
                signal,
            ));
        }

        debug!(
            dispatcher = %self.inner.config.name,
            event = %name,
            invocations = listeners.len(),
            paused = self.inner.pause.is_paused(),
            "Dispatched event"
        );
        Ok(listeners.len())
    }

    /// Pause dispatch. Invocations that have not yet started their listener hold
    /// until [`resume`](Self::resume); running ones are unaffected.
    pub fn pause(&self) {
        if self.inner.pause.pause() {
            log_dispatcher_operation(&self.inner.config.name, "pause", "paused", None);
        }
    }

    /// Release every held invocation. Returns `false` and does nothing if the
    /// dispatcher was not paused.
    pub fn resume(&self) -> bool {
        let held = self.pending_pause_gates();
        if !self.inner.pause.resume() {
            return false;
        }
        let details = format!("released up to {held} held invocations");
        log_dispatcher_operation(&self.inner.config.name, "resume", "resumed", Some(&details));
        true
    }

    pub fn is_paused(&self) -> bool {
        self.inner.pause.is_paused()
    }

    /// Wait until every recorded invocation of `name` has signalled completion.
    ///
    /// Gates appended by dispatches that happen while waiting are consumed too.
    /// Consumed gates are removed, so a second wait does not block on them.
    #[instrument(skip(self), fields(dispatcher = %self.inner.config.name))]
    pub async fn wait(&self, name: &str) -> WaitSummary {
        let slot = self.inner.waiter_slot(name);
        let mut current = slot.lock().await;
        let mut summary = WaitSummary::default();

        loop {
            if current.is_none() {
                *current = self.inner.next_completion_gate(name);
            }
            let Some(gate) = (*current).as_mut() else {
                break;
            };
            let outcome = self.resolve_gate(name, gate).await;
            summary.record(outcome);
            *current = None;
        }

        debug!(
            event = %name,
            completed = summary.completed,
            abandoned = summary.abandoned,
            "Wait finished"
        );
        summary
    }

    /// Wait for every event known to the dispatcher, in unspecified order
    pub async fn wait_all(&self) -> WaitSummary {
        let mut summary = WaitSummary::default();
        for name in self.waitable_event_names() {
            summary.merge(self.wait(&name).await);
        }
        summary
    }

    /// [`wait`](Self::wait) bounded by `timeout`.
    ///
    /// On timeout the gate being awaited stays recorded for the next waiter.
    pub async fn wait_timeout(
        &self,
        name: &str,
        timeout: Duration,
    ) -> DispatcherResult<WaitSummary> {
        tokio::time::timeout(timeout, self.wait(name))
            .await
            .map_err(|_| DispatcherError::wait_timed_out(name, timeout))
    }

    /// [`wait_all`](Self::wait_all) bounded by `timeout`
    pub async fn wait_all_timeout(&self, timeout: Duration) -> DispatcherResult<WaitSummary> {
        tokio::time::timeout(timeout, self.wait_all())
            .await
            .map_err(|_| DispatcherError::wait_all_timed_out(timeout))
    }

    /// Snapshot of the dispatcher's bookkeeping
    pub fn stats(&self) -> DispatcherStats {
        let state = self.inner.state.lock();

        let mut names: HashSet<&String> = state.listeners.keys().collect();
        names.extend(state.pause_gates.keys());
        names.extend(state.completion_gates.keys());

        let mut events: Vec<EventStats> = names
            .into_iter()
            .map(|name| EventStats {
                name: name.clone(),
                listeners: state.listeners.get(name).map_or(0, Vec::len),
                pending_pause_gates: state.pause_gates.get(name).map_or(0, HashSet::len),
                outstanding_completions: state
                    .completion_gates
                    .get(name)
                    .map_or(0, VecDeque::len),
            })
            .collect();
        events.sort_by(|a, b| a.name.cmp(&b.name));

        DispatcherStats {
            name: self.inner.config.name.clone(),
            paused: self.inner.pause.is_paused(),
            total_invocations: self.inner.next_invocation.load(Ordering::Relaxed),
            events,
        }
    }

    fn pending_pause_gates(&self) -> usize {
        self.inner
            .state
            .lock()
            .pause_gates
            .values()
            .map(HashSet::len)
            .sum()
    }

    fn waitable_event_names(&self) -> Vec<String> {
        let state = self.inner.state.lock();
        state
            .completion_gates
            .keys()
            .chain(state.waiters.keys())
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect()
    }

    async fn resolve_gate(&self, name: &str, gate: &mut CompletionGate) -> GateOutcome {
        let Some(threshold) = self.inner.config.slow_wait_warning() else {
            return gate.resolve().await;
        };

        let started = Instant::now();
        loop {
            let attempt = tokio::time::timeout(threshold, gate.resolve()).await;
            match attempt {
                Ok(outcome) => return outcome,
                Err(_) => warn!(
                    event = %name,
                    invocation_id = %gate.invocation_id(),
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Still waiting for listener to signal completion"
                ),
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("name", &self.inner.config.name)
            .field("paused", &self.inner.pause.is_paused())
            .field(
                "total_invocations",
                &self.inner.next_invocation.load(Ordering::Relaxed),
            )
            .finish()
    }
}

/// Body of one spawned listener invocation
///
/// Holds the dispatcher weakly so that dropping the last handle closes the
/// pause channel and releases held invocations.
async fn run_invocation(
    inner: Weak<DispatcherInner>,
    name: String,
    listener: Arc<dyn EventListener>,
    event: Arc<Event>,
    pause_gate: PauseGate,
    signal: CompletionSignal,
) {
    let invocation_id = pause_gate.invocation_id();
    let was_held = pause_gate.pass().await;
    if let Some(inner) = inner.upgrade() {
        inner.release_pause_gate(&name, invocation_id);
    }

    trace!(
        event = %name,
        invocation_id = %invocation_id,
        listener = %listener.listener_name(),
        was_held = was_held,
        "Running listener"
    );

    let result = AssertUnwindSafe(listener.execute(event, signal))
        .catch_unwind()
        .await;
    if result.is_err() {
        let context = format!("event={name} invocation_id={invocation_id}");
        log_error(
            listener.listener_name(),
            "execute",
            "listener panicked",
            Some(&context),
        );
    }
}

/// Outcome counts of a [`Dispatcher::wait`] or [`Dispatcher::wait_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitSummary {
    /// Gates whose listener called `complete()`
    pub completed: usize,
    /// Gates whose signal was dropped without completing
    pub abandoned: usize,
}

impl WaitSummary {
    /// Total gates consumed
    pub fn total(&self) -> usize {
        self.completed + self.abandoned
    }

    fn record(&mut self, outcome: GateOutcome) {
        match outcome {
            GateOutcome::Completed => self.completed += 1,
            GateOutcome::Abandoned => {
                warn!("Listener dropped its completion signal without completing");
                self.abandoned += 1;
            }
        }
    }

    fn merge(&mut self, other: WaitSummary) {
        self.completed += other.completed;
        self.abandoned += other.abandoned;
    }
}

/// Statistics about a dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherStats {
    pub name: String,
    pub paused: bool,
    /// Invocations created since construction
    pub total_invocations: u64,
    pub events: Vec<EventStats>,
}

impl DispatcherStats {
    pub fn event(&self, name: &str) -> Option<&EventStats> {
        self.events.iter().find(|event| event.name == name)
    }
}

/// Per-event bookkeeping counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventStats {
    pub name: String,
    pub listeners: usize,
    /// Invocations that have not yet passed their pause check
    pub pending_pause_gates: usize,
    /// Completion gates not yet consumed by a wait
    pub outstanding_completions: usize,
}
