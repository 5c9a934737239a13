//! Ports - 抽象化レイヤー
//!
//! Interfaces to the collaborators the core does not implement itself:
//! the message broker, the metrics collector, wall-clock time and value sources.
//! In-process implementations live in `impls`.

pub mod broker;
pub mod clock;
pub mod metrics;
pub mod source;

pub use self::broker::{BrokerClient, PublishError};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::metrics::{Metrics, NoopMetrics};
pub use self::source::{Source, SourceFactory};
