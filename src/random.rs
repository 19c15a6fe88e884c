use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Source of every random decision made while building a video.
///
/// Seeded runs are fully reproducible: the same seed yields the same cell
/// order, font sizes and jitter.
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }

    /// Uniform pick in `[min, max)`
    pub fn font_size(&mut self, min: u32, max: u32) -> u32 {
        self.rng.gen_range(min..max)
    }

    /// Uniform pick in `[-amplitude, amplitude]`
    pub fn jitter(&mut self, amplitude: i32) -> i32 {
        if amplitude <= 0 {
            return 0;
        }
        self.rng.gen_range(-amplitude..=amplitude)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }
}
