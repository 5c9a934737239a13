//! Domain identifiers (strongly-typed IDs).
//!
//! - `ProducerId`: 1-based slot number. Stable across restarts of the slot.
//! - `RunId`: ULID per simulation run, sortable by start time.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use crate::ports::Clock;

/// Identifier of a producer slot.
///
/// The id belongs to the slot, not to the task instance: a restarted producer keeps it.
/// Display is the bare number because it is embedded in broker subjects.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProducerId(u32);

impl ProducerId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ProducerId {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one simulation run.
///
/// Generated from a `Clock` so tests with `FixedClock` get a predictable timestamp part.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Ulid);

impl RunId {
    pub fn generate(clock: &dyn Clock) -> Self {
        let timestamp_ms = clock.now().timestamp_millis().max(0) as u64;
        Self(Ulid::from_parts(timestamp_ms, rand::random()))
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn producer_id_displays_as_plain_number() {
        assert_eq!(ProducerId::new(42).to_string(), "42");
        assert_eq!(ProducerId::from(7).get(), 7);
    }

    #[test]
    fn run_ids_are_unique() {
        let a = RunId::generate(&SystemClock);
        let b = RunId::generate(&SystemClock);
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("run-"));
    }

    #[test]
    fn run_id_timestamp_comes_from_clock() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id = RunId::generate(&FixedClock::new(fixed_time));

        assert_eq!(id.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
