//! UniformSource - the default value source, uniform over [0, 1).

use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::ProducerId;
use crate::ports::{Source, SourceFactory};

/// Private random state of one producer instance.
pub struct UniformSource {
    rng: StdRng,
}

impl UniformSource {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl Source for UniformSource {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// Hands out a fresh `UniformSource` per (re)start.
///
/// `from_entropy` seeds every source from the OS. `seeded` makes a whole run
/// reproducible while still giving each creation, restarts included, its own stream.
pub struct UniformSourceFactory {
    seed: Option<u64>,
    generation: AtomicU64,
}

impl UniformSourceFactory {
    pub fn from_entropy() -> Self {
        Self {
            seed: None,
            generation: AtomicU64::new(0),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            generation: AtomicU64::new(0),
        }
    }
}

impl Default for UniformSourceFactory {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl SourceFactory for UniformSourceFactory {
    fn create(&self, id: ProducerId) -> Box<dyn Source> {
        let rng = match self.seed {
            Some(seed) => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                let mixed = seed
                    ^ generation.wrapping_mul(0x9E37_79B9_7F4A_7C15)
                    ^ (u64::from(id.get()) << 32);
                StdRng::seed_from_u64(mixed)
            }
            None => StdRng::from_entropy(),
        };
        Box::new(UniformSource::new(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_in_unit_interval() {
        let factory = UniformSourceFactory::from_entropy();
        let mut source = factory.create(ProducerId::new(1));
        for _ in 0..10_000 {
            let v = source.sample();
            assert!((0.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn seeded_factories_are_reproducible() {
        let a = UniformSourceFactory::seeded(7);
        let b = UniformSourceFactory::seeded(7);

        let xs: Vec<f64> = (0..5).map(|_| a.create(ProducerId::new(1)).sample()).collect();
        let ys: Vec<f64> = (0..5).map(|_| b.create(ProducerId::new(1)).sample()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn restart_gets_fresh_state() {
        let factory = UniformSourceFactory::seeded(7);
        let mut first = factory.create(ProducerId::new(3));
        let mut second = factory.create(ProducerId::new(3));

        let xs: Vec<f64> = (0..4).map(|_| first.sample()).collect();
        let ys: Vec<f64> = (0..4).map(|_| second.sample()).collect();
        assert_ne!(xs, ys);
    }
}
