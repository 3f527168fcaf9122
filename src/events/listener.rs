//! # Event Listeners
//!
//! Anything that can receive an event and a completion signal. Listener objects
//! implement [`EventListener`] directly; plain async closures are wrapped in
//! [`FnListener`]. Both are stored by the dispatcher as `Arc<dyn EventListener>`.
//!
//! ```rust
//! use event_dispatcher::{CompletionSignal, Event, EventListener};
//! use std::sync::Arc;
//!
//! struct AuditLog;
//!
//! #[async_trait::async_trait]
//! impl EventListener for AuditLog {
//!     async fn execute(&self, event: Arc<Event>, done: CompletionSignal) {
//!         println!("audit: {}", event.name);
//!         done.complete();
//!     }
//!
//!     fn listener_name(&self) -> &str {
//!         "audit_log"
//!     }
//! }
//! ```

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

use super::gates::CompletionSignal;
use super::types::Event;

/// Trait for event listeners
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Handle one dispatched event.
    ///
    /// Call `done.complete()` once finished if anyone waits on this event.
    async fn execute(&self, event: Arc<Event>, done: CompletionSignal);

    /// Get listener name for identification in logs and stats
    fn listener_name(&self) -> &str {
        "unnamed_listener"
    }
}

type ListenerFn = dyn Fn(Arc<Event>, CompletionSignal) -> BoxFuture<'static, ()> + Send + Sync;

/// Adapts an async closure into an [`EventListener`]
pub struct FnListener {
    name: String,
    func: Box<ListenerFn>,
}

impl FnListener {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(Arc<Event>, CompletionSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::named("fn_listener", func)
    }

    /// Create a closure listener reported under `name`
    pub fn named<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Arc<Event>, CompletionSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(move |event, done| func(event, done).boxed()),
        }
    }
}

impl std::fmt::Debug for FnListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnListener")
            .field("name", &self.name)
            .field("func", &"<Fn(Arc<Event>, CompletionSignal)>")
            .finish()
    }
}

#[async_trait]
impl EventListener for FnListener {
    async fn execute(&self, event: Arc<Event>, done: CompletionSignal) {
        (self.func)(event, done).await;
    }

    fn listener_name(&self) -> &str {
        &self.name
    }
}
