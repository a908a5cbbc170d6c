use rand::rngs::StdRng;
use rand::SeedableRng;
use rodio::Source;
use std::f32::consts::TAU;
use std::time::Duration;

use super::brown_noise::BrownianWalk;
use super::SAMPLE_RATE;

const AMPLITUDE: f32 = 0.4;
/// Swell rate of the rainfall intensity, in Hz.
const SWELL_HZ: f32 = 0.05;

/// Second-order band-pass (~3 kHz, Q ~0.7) in direct form I.
#[derive(Default)]
struct BandPass {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BandPass {
    const B0: f32 = 0.1;
    const B2: f32 = -0.1;
    const A1: f32 = -1.8;
    const A2: f32 = 0.85;

    fn filter(&mut self, input: f32) -> f32 {
        let output = Self::B0 * input + Self::B2 * self.x2 - Self::A1 * self.y1 - Self::A2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// Rain soundscape: band-passed brownian noise with a slow swell.
pub struct RainSound {
    walk: BrownianWalk,
    band: BandPass,
    swell_phase: f32,
}

impl RainSound {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            walk: BrownianWalk::new(rng),
            band: BandPass::default(),
            swell_phase: 0.0,
        }
    }
}

impl Default for RainSound {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for RainSound {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let bed = self.walk.step();
        let hiss = self.band.filter(bed);

        self.swell_phase = (self.swell_phase + TAU * SWELL_HZ / SAMPLE_RATE as f32) % TAU;
        let swell = 0.7 + 0.3 * self.swell_phase.sin();

        let mix = (hiss * 0.8 + bed * 0.2).clamp(-1.0, 1.0);
        Some(mix * swell * AMPLITUDE)
    }
}

impl Source for RainSound {
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
