// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vector generators for [`GeneratorMap`](crate::GeneratorMap).
//!
//! A generator builds a fresh vector of a requested length. Any
//! `Fn(usize) -> V` closure is a generator, so a map of zero vectors is just
//! `GeneratorMap::new(SparseVector::new, 10)`.

use std::f64::consts::TAU;

use parking_lot::Mutex;
use rand::{seq::index, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    config::{GaussianConfig, RandomIndexConfig},
    error::Result,
    sparse_vector::SparseVector,
    vector::{DenseVector, Vector},
};

/// Builds vectors on demand.
pub trait VectorGenerator: Send + Sync {
    type Vector: Vector;

    /// A new vector of logical length `length`.
    fn generate(&self, length: usize) -> Self::Vector;
}

impl<F, V> VectorGenerator for F
where
    F: Fn(usize) -> V + Send + Sync,
    V: Vector,
{
    type Vector = V;

    fn generate(&self, length: usize) -> V {
        self(length)
    }
}

fn seeded_rng(seed: Option<u64>) -> Option<Mutex<ChaCha8Rng>> {
    seed.map(|s| Mutex::new(ChaCha8Rng::seed_from_u64(s)))
}

/// Random index vectors: a handful of randomly placed `+1`/`-1` entries,
/// zero everywhere else.
#[derive(Debug)]
pub struct RandomIndexGenerator {
    config: RandomIndexConfig,
    /// Shared seeded stream; `None` uses the calling thread's RNG.
    rng: Option<Mutex<ChaCha8Rng>>,
}

impl RandomIndexGenerator {
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn new(config: RandomIndexConfig) -> Result<Self> {
        config.validate()?;
        let rng = seeded_rng(config.seed);
        Ok(Self { config, rng })
    }

    #[must_use]
    pub const fn config(&self) -> &RandomIndexConfig {
        &self.config
    }

    /// Length configured for vectors of this generator.
    #[must_use]
    pub const fn vector_length(&self) -> usize {
        self.config.vector_length
    }

    fn non_zero_count<R: Rng + ?Sized>(&self, rng: &mut R, length: usize) -> usize {
        let base = self.config.non_zero_values;
        let variance = self.config.variance;
        let count = if variance == 0 {
            base
        } else {
            let low = base.saturating_sub(variance);
            rng.random_range(low..=base + variance)
        };
        count.min(length)
    }

    fn build<R: Rng + ?Sized>(&self, rng: &mut R, length: usize) -> SparseVector {
        // Stored positions are u32.
        let span = length.min(u32::MAX as usize + 1);
        let count = self.non_zero_count(rng, span);
        let mut positions: Vec<u32> = index::sample(rng, span, count)
            .into_iter()
            .map(|p| p as u32)
            .collect();
        positions.sort_unstable();
        let values = positions
            .iter()
            .map(|_| if rng.random_bool(0.5) { 1.0 } else { -1.0 })
            .collect();
        SparseVector::from_sorted_parts(length, positions, values)
    }
}

impl Default for RandomIndexGenerator {
    fn default() -> Self {
        Self {
            config: RandomIndexConfig::default(),
            rng: None,
        }
    }
}

impl VectorGenerator for RandomIndexGenerator {
    type Vector = SparseVector;

    fn generate(&self, length: usize) -> SparseVector {
        match &self.rng {
            Some(rng) => self.build(&mut *rng.lock(), length),
            None => self.build(&mut rand::rng(), length),
        }
    }
}

/// Dense vectors of independent `N(0, stdev^2)` samples.
#[derive(Debug)]
pub struct GaussianGenerator {
    config: GaussianConfig,
    rng: Option<Mutex<ChaCha8Rng>>,
}

impl GaussianGenerator {
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `stdev` is not finite and positive.
    pub fn new(config: GaussianConfig) -> Result<Self> {
        config.validate()?;
        let rng = seeded_rng(config.seed);
        Ok(Self { config, rng })
    }

    #[must_use]
    pub const fn stdev(&self) -> f64 {
        self.config.stdev
    }

    fn build<R: Rng + ?Sized>(&self, rng: &mut R, length: usize) -> DenseVector {
        (0..length)
            .map(|_| standard_normal(rng) * self.config.stdev)
            .collect::<Vec<_>>()
            .into()
    }
}

impl Default for GaussianGenerator {
    fn default() -> Self {
        Self {
            config: GaussianConfig::default(),
            rng: None,
        }
    }
}

/// One standard normal sample (Box-Muller).
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - [0, 1) keeps ln away from zero.
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

impl VectorGenerator for GaussianGenerator {
    type Vector = DenseVector;

    fn generate(&self, length: usize) -> DenseVector {
        match &self.rng {
            Some(rng) => self.build(&mut *rng.lock(), length),
            None => self.build(&mut rand::rng(), length),
        }
    }
}
