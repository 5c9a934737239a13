//! Producer slot record: state + restart history.

use serde::{Deserialize, Serialize};

use super::{ProducerId, SlotState};
use crate::error::SlotError;

/// A typed fault event: one abnormal termination of a producer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerFault {
    pub producer_id: ProducerId,

    /// 1-based run number within the slot that faulted.
    pub attempt: u32,

    /// Panic payload text (or a placeholder when the payload is not a string).
    pub message: String,
}

/// Bookkeeping for one producer slot, owned by its fault barrier.
///
/// All state changes go through `transition` so an illegal move (e.g. leaving `Stopped`)
/// surfaces as an error instead of silently corrupting the slot.
#[derive(Debug, Clone)]
pub struct Slot {
    pub id: ProducerId,
    pub state: SlotState,

    /// Number of runs started so far.
    pub attempts: u32,

    pub faults: Vec<ProducerFault>,
}

impl Slot {
    pub fn new(id: ProducerId) -> Self {
        Self {
            id,
            state: SlotState::Starting,
            attempts: 0,
            faults: Vec::new(),
        }
    }

    pub fn transition(&mut self, next: SlotState) -> Result<(), SlotError> {
        if !self.state.can_transition_to(next) {
            return Err(SlotError::InvalidTransition {
                id: self.id,
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(producer_id = %self.id, from = ?self.state, to = ?next, "slot transition");
        self.state = next;
        Ok(())
    }

    /// Starting -> Running, counting the attempt.
    pub fn start_run(&mut self) -> Result<(), SlotError> {
        self.transition(SlotState::Running)?;
        self.attempts += 1;
        Ok(())
    }

    /// Running -> Faulted, recording the fault event.
    pub fn record_fault(&mut self, message: String) -> Result<&ProducerFault, SlotError> {
        self.transition(SlotState::Faulted)?;
        self.faults.push(ProducerFault {
            producer_id: self.id,
            attempt: self.attempts,
            message,
        });
        // just pushed
        Ok(&self.faults[self.faults.len() - 1])
    }

    /// Restarts happen once per fault.
    pub fn restarts(&self) -> u32 {
        self.faults.len() as u32
    }

    /// Drive the slot to `Stopped` from wherever it is. Stopping twice is a no-op.
    pub fn stop(&mut self) -> Result<(), SlotError> {
        if self.state.is_terminal() {
            return Ok(());
        }
        if self.state != SlotState::Stopping {
            self.transition(SlotState::Stopping)?;
        }
        self.transition(SlotState::Stopped)
    }

    pub fn into_report(self, sent: u64) -> SlotReport {
        SlotReport {
            producer_id: self.id,
            state: self.state,
            sent,
            restarts: self.faults.len() as u32,
            faults: self.faults,
        }
    }
}

/// What a slot reports back to the coordinator when its fault barrier exits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotReport {
    pub producer_id: ProducerId,
    pub state: SlotState,

    /// Readings successfully enqueued, summed over every run of the slot.
    pub sent: u64,

    pub restarts: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<ProducerFault>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_slot_starts_in_starting() {
        let slot = Slot::new(ProducerId::new(1));
        assert_eq!(slot.state, SlotState::Starting);
        assert_eq!(slot.attempts, 0);
        assert_eq!(slot.restarts(), 0);
    }

    #[test]
    fn fault_then_restart_keeps_id_and_counts() {
        let mut slot = Slot::new(ProducerId::new(3));
        slot.start_run().unwrap();
        let fault = slot.record_fault("boom".to_string()).unwrap().clone();
        slot.transition(SlotState::Starting).unwrap();
        slot.start_run().unwrap();

        assert_eq!(fault.producer_id, ProducerId::new(3));
        assert_eq!(fault.attempt, 1);
        assert_eq!(slot.attempts, 2);
        assert_eq!(slot.restarts(), 1);
    }

    #[test]
    fn stop_from_running_and_from_faulted() {
        let mut running = Slot::new(ProducerId::new(1));
        running.start_run().unwrap();
        running.stop().unwrap();
        assert_eq!(running.state, SlotState::Stopped);

        let mut faulted = Slot::new(ProducerId::new(2));
        faulted.start_run().unwrap();
        faulted.record_fault("x".to_string()).unwrap();
        faulted.stop().unwrap();
        assert_eq!(faulted.state, SlotState::Stopped);
    }

    #[test]
    fn stopped_is_terminal() {
        let mut slot = Slot::new(ProducerId::new(1));
        slot.stop().unwrap();

        let err = slot.transition(SlotState::Starting).unwrap_err();
        assert!(matches!(
            err,
            SlotError::InvalidTransition { from: SlotState::Stopped, to: SlotState::Starting, .. }
        ));
    }

    #[test]
    fn stopping_twice_is_a_no_op() {
        let mut slot = Slot::new(ProducerId::new(4));
        slot.start_run().unwrap();
        slot.stop().unwrap();
        slot.stop().unwrap();
        assert_eq!(slot.state, SlotState::Stopped);
        assert_eq!(slot.restarts(), 0);
    }

    #[test]
    fn report_carries_faults() {
        let mut slot = Slot::new(ProducerId::new(9));
        slot.start_run().unwrap();
        slot.record_fault("a".to_string()).unwrap();
        slot.transition(SlotState::Starting).unwrap();
        slot.start_run().unwrap();
        slot.stop().unwrap();

        let report = slot.into_report(12);
        assert_eq!(report.sent, 12);
        assert_eq!(report.restarts, 1);
        assert_eq!(report.state, SlotState::Stopped);
        assert_eq!(report.faults[0].message, "a");
    }
}
