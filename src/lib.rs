#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Event Dispatcher
//!
//! In-process publish/subscribe dispatcher built on tokio.
//!
//! ## Overview
//!
//! Named events are broadcast to every listener registered for that name. Each
//! listener invocation runs as its own tokio task, so a single dispatch fans out
//! concurrently and returns immediately. Callers can pause and resume dispatch
//! globally, and block until the in-flight invocations for one event (or for all
//! events) have signalled completion.
//!
//! ## Module Organization
//!
//! - [`events`] - Dispatcher, listeners, events and the pause/completion gates
//! - [`config`] - Dispatcher configuration and file/environment loading
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured `tracing` initialization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use event_dispatcher::{Dispatcher, Event};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = Dispatcher::new();
//!
//! dispatcher.register_listener_fn("order.created", |event, done| async move {
//!     println!("order created: {}", event.data);
//!     done.complete();
//! });
//!
//! dispatcher.dispatch(
//!     "order.created",
//!     Event::new("order.created", serde_json::json!({"order_id": 42})),
//! )?;
//!
//! // Blocks until every listener invocation above has called `complete()`
//! dispatcher.wait("order.created").await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use crate::config::{ConfigLoader, DispatcherConfig};
pub use crate::error::{DispatcherError, DispatcherResult};
pub use crate::events::{
    CompletionSignal, Dispatcher, DispatcherStats, Event, EventListener, EventStats, FnListener,
    InvocationId, WaitSummary,
};
