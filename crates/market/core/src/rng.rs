//! Random source abstraction for sampling and discount rolls.
//!
//! Production wires an OS-seeded generator; tests substitute a seeded
//! [`rand_chacha::ChaCha8Rng`] so allocations are reproducible. Any
//! [`rand::RngCore`] implementation qualifies through the blanket impl.

use rand::Rng;

/// Uniform draws consumed by the catalog sampler and the assignment engine.
pub trait RandomSource: Send {
    /// Uniform value in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `[0, bound)`. Returns 0 when `bound` is 0.
    fn below(&mut self, bound: usize) -> usize;
}

impl<R> RandomSource for R
where
    R: rand::RngCore + Send,
{
    fn unit(&mut self) -> f64 {
        self.random::<f64>()
    }

    fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.random_range(0..bound)
    }
}

/// Fisher-Yates shuffle driven by a [`RandomSource`].
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}
