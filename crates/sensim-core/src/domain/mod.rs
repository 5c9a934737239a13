//! Domain model (IDs, readings, producer slots).

pub mod ids;
pub mod reading;
pub mod slot;
pub mod state;

pub use ids::{ProducerId, RunId};
pub use reading::Reading;
pub use slot::{ProducerFault, Slot, SlotReport};
pub use state::SlotState;
