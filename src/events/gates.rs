//! # Invocation Gates
//!
//! Every listener invocation created by a dispatch gets two gates:
//!
//! - a **pause gate**, checked once by the invocation task before the listener
//!   body runs. While the dispatcher is paused the task parks on it.
//! - a **completion gate**, a one-shot pair. The listener holds the sending half
//!   ([`CompletionSignal`]) and waiters consume the receiving half.
//!
//! Pause state is broadcast over a `watch` channel carrying a resume
//! generation. A task that observes `paused` remembers the generation it saw and
//! proceeds once any later resume has bumped it, so a check that happens after a
//! resume can never miss that resume.

use tokio::sync::{oneshot, watch};
use tracing::trace;

use super::types::InvocationId;

/// Paused flag plus the number of resumes seen so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct PauseState {
    pub paused: bool,
    pub resume_generation: u64,
}

/// Owner side of the pause broadcast
#[derive(Debug)]
pub(crate) struct PauseSwitch {
    state: watch::Sender<PauseState>,
}

impl PauseSwitch {
    pub fn new(start_paused: bool) -> Self {
        let (state, _) = watch::channel(PauseState {
            paused: start_paused,
            resume_generation: 0,
        });
        Self { state }
    }

    /// Returns `false` if already paused
    pub fn pause(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.paused {
                return false;
            }
            state.paused = true;
            true
        })
    }

    /// Returns `false` (and notifies nobody) if not paused
    pub fn resume(&self) -> bool {
        self.state.send_if_modified(|state| {
            if !state.paused {
                return false;
            }
            state.paused = false;
            state.resume_generation += 1;
            true
        })
    }

    pub fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    pub fn gate(&self, invocation_id: InvocationId) -> PauseGate {
        PauseGate {
            invocation_id,
            state: self.state.subscribe(),
        }
    }
}

/// Single-use gate checked by an invocation task before running its listener
#[derive(Debug)]
pub(crate) struct PauseGate {
    invocation_id: InvocationId,
    state: watch::Receiver<PauseState>,
}

impl PauseGate {
    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// Read the pause flag once; if paused, park until the next resume.
    ///
    /// Returns whether the task was held.
    pub async fn pass(mut self) -> bool {
        let observed = *self.state.borrow_and_update();
        if !observed.paused {
            return false;
        }

        trace!(invocation_id = %self.invocation_id, "Invocation held at pause gate");
        let seen = observed.resume_generation;
        // Err means every dispatcher handle was dropped; nothing will resume us, so run.
        let _ = self
            .state
            .wait_for(|state| state.resume_generation != seen)
            .await;
        true
    }
}

/// How a completion gate resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateOutcome {
    /// The listener called [`CompletionSignal::complete`]
    Completed,
    /// The listener dropped its signal without completing (returned early or panicked)
    Abandoned,
}

/// Handed to a listener with each event; call [`complete`](Self::complete) when done.
///
/// Waiters on the event block until every signal of the dispatches they cover
/// has been completed or dropped. A listener that keeps the signal alive
/// without ever completing it blocks those waiters forever.
#[derive(Debug)]
pub struct CompletionSignal {
    sender: oneshot::Sender<()>,
    invocation_id: InvocationId,
}

impl CompletionSignal {
    /// Signal that this invocation is finished
    pub fn complete(self) {
        if self.sender.send(()).is_err() {
            trace!(invocation_id = %self.invocation_id, "Completion signal had no receiver");
        }
    }

    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }
}

/// Receiving half of a [`CompletionSignal`], held by the dispatcher until a wait consumes it
#[derive(Debug)]
pub(crate) struct CompletionGate {
    receiver: oneshot::Receiver<()>,
    invocation_id: InvocationId,
}

impl CompletionGate {
    pub fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// Cancel safe: dropping this future leaves the gate unresolved.
    pub async fn resolve(&mut self) -> GateOutcome {
        match (&mut self.receiver).await {
            Ok(()) => GateOutcome::Completed,
            Err(_) => GateOutcome::Abandoned,
        }
    }
}

pub(crate) fn completion_gate(invocation_id: InvocationId) -> (CompletionSignal, CompletionGate) {
    let (sender, receiver) = oneshot::channel();
    (
        CompletionSignal {
            sender,
            invocation_id,
        },
        CompletionGate {
            receiver,
            invocation_id,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_gate_passes_immediately() {
        let switch = PauseSwitch::new(false);
        let gate = switch.gate(InvocationId(1));
        assert!(!gate.pass().await);
    }

    #[tokio::test]
    async fn test_paused_gate_held_until_resume() {
        let switch = PauseSwitch::new(true);
        let gate = switch.gate(InvocationId(1));
        let handle = tokio::spawn(gate.pass());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        assert!(switch.resume());
        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_check_after_resume_does_not_block() {
        let switch = PauseSwitch::new(true);
        let gate = switch.gate(InvocationId(1));
        switch.resume();

        let passed = tokio::time::timeout(Duration::from_secs(1), gate.pass()).await;
        assert!(!passed.unwrap());
    }

    #[tokio::test]
    async fn test_repause_before_wakeup_still_releases() {
        let switch = PauseSwitch::new(true);
        let gate = switch.gate(InvocationId(1));
        let handle = tokio::spawn(gate.pass());
        tokio::time::sleep(Duration::from_millis(10)).await;

        switch.resume();
        switch.pause();

        let held = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(held);
        assert!(switch.is_paused());
    }

    #[test]
    fn test_resume_when_not_paused_is_noop() {
        let switch = PauseSwitch::new(false);
        assert!(!switch.resume());
        assert!(!switch.is_paused());
        assert!(switch.pause());
        assert!(!switch.pause());
    }

    #[tokio::test]
    async fn test_completion_outcomes() {
        let (signal, mut gate) = completion_gate(InvocationId(3));
        assert_eq!(signal.invocation_id(), gate.invocation_id());
        signal.complete();
        assert_eq!(gate.resolve().await, GateOutcome::Completed);

        let (signal, mut gate) = completion_gate(InvocationId(4));
        drop(signal);
        assert_eq!(gate.resolve().await, GateOutcome::Abandoned);
    }

    #[tokio::test]
    async fn test_resolve_survives_cancellation() {
        let (signal, mut gate) = completion_gate(InvocationId(5));

        let timed_out = tokio::time::timeout(Duration::from_millis(10), gate.resolve()).await;
        assert!(timed_out.is_err());

        signal.complete();
        assert_eq!(gate.resolve().await, GateOutcome::Completed);
    }
}
