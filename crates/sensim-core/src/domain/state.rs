//! Producer slot state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a producer slot.
///
/// State transitions:
/// - Starting -> Running -> Stopping -> Stopped
/// - Starting -> Running -> Faulted -> Starting (loop while not cancelled)
/// - Faulted -> Stopping (fault observed after cancellation)
/// - Starting -> Stopping (cancelled before the first run)
///
/// `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// A new producer instance is about to be spawned.
    Starting,

    /// The producer task is running.
    Running,

    /// The last run terminated abnormally.
    Faulted,

    /// The slot will not run again; final bookkeeping in progress.
    Stopping,

    /// Terminal.
    Stopped,
}

impl SlotState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, SlotState::Stopped)
    }

    /// Is `next` a legal successor of `self`?
    pub fn can_transition_to(self, next: SlotState) -> bool {
        use SlotState::*;
        matches!(
            (self, next),
            (Starting, Running)
                | (Starting, Stopping)
                | (Running, Faulted)
                | (Running, Stopping)
                | (Faulted, Starting)
                | (Faulted, Stopping)
                | (Stopping, Stopped)
        )
    }
}
