use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::{ProducerId, SlotState};

/// Illegal move in the producer slot state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("invalid slot transition for producer {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: ProducerId,
        from: SlotState,
        to: SlotState,
    },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Other(String),
}
