use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rodio::Source;
use std::time::Duration;

use super::SAMPLE_RATE;

const STEP: f32 = 0.02;
const LEAK: f32 = 0.9999;
const AMPLITUDE: f32 = 0.3;

/// Brownian walk used as a noise bed by the "brown noise" and "rain"
/// soundscapes. Leaky so it cannot drift into a DC offset.
pub(crate) struct BrownianWalk {
    value: f32,
    rng: StdRng,
}

impl BrownianWalk {
    pub(crate) fn new(rng: StdRng) -> Self {
        Self { value: 0.0, rng }
    }

    /// Next position in [-1, 1].
    pub(crate) fn step(&mut self) -> f32 {
        let white: f32 = self.rng.gen_range(-1.0..1.0);
        self.value = ((self.value + white * STEP).clamp(-1.0, 1.0)) * LEAK;
        self.value
    }
}

/// Deep, rumbling noise (power falls 6 dB per octave).
pub struct BrownNoise {
    walk: BrownianWalk,
}

impl BrownNoise {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            walk: BrownianWalk::new(rng),
        }
    }
}

impl Default for BrownNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for BrownNoise {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.walk.step() * AMPLITUDE)
    }
}

impl Source for BrownNoise {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
