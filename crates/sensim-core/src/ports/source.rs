//! Source port - where a producer's values come from.
//!
//! A `Source` is owned by exactly one producer task, so `sample` takes `&mut self`
//! and needs no locking. The factory is shared by all fault barriers and is asked for
//! a fresh source every time a slot (re)starts.

use crate::domain::ProducerId;

pub trait Source: Send + 'static {
    fn sample(&mut self) -> f64;
}

pub trait SourceFactory: Send + Sync {
    fn create(&self, id: ProducerId) -> Box<dyn Source>;
}
