//! # Event System
//!
//! The dispatcher and everything it hands to listeners.
//!
//! ```text
//! Dispatcher
//! ├── listeners         (event name -> Vec<Arc<dyn EventListener>>)
//! ├── pause gates       (event name -> invocations not yet past the pause check)
//! ├── completion gates  (event name -> gates not yet consumed by a wait)
//! └── pause state       (watch channel broadcast to every pending invocation)
//! ```

pub mod dispatcher;
pub mod gates;
pub mod listener;
pub mod types;

// Re-export key types for convenience
pub use dispatcher::{Dispatcher, DispatcherStats, EventStats, WaitSummary};
pub use gates::CompletionSignal;
pub use listener::{EventListener, FnListener};
pub use types::{Event, InvocationId};
