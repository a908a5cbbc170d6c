use rodio::Source;
use std::f32::consts::TAU;
use std::time::Duration;

use super::SAMPLE_RATE;

const AMPLITUDE: f32 = 0.15;

/// Binaural beat soundscape.
/// Each ear gets its own carrier; the brain hears the difference as a slow
/// pulse (e.g. 200 Hz / 206 Hz gives a 6 Hz theta beat).
pub struct BinauralBeats {
    left_hz: f32,
    right_hz: f32,
    frame: u64,
    right_next: bool,
}

impl BinauralBeats {
    pub fn new(left_hz: f32, right_hz: f32) -> Self {
        Self {
            left_hz,
            right_hz,
            frame: 0,
            right_next: false,
        }
    }

    pub fn beat_hz(&self) -> f32 {
        (self.right_hz - self.left_hz).abs()
    }

    fn carrier(&self, hz: f32) -> f32 {
        // Wrap the phase per frame so precision holds over long sessions.
        let cycles = hz as f64 * self.frame as f64 / SAMPLE_RATE as f64;
        (TAU * cycles.fract() as f32).sin() * AMPLITUDE
    }
}

impl Iterator for BinauralBeats {
    type Item = f32;

    // Interleaved stereo: left sample then right sample of the same frame.
    fn next(&mut self) -> Option<Self::Item> {
        let sample = if self.right_next {
            let s = self.carrier(self.right_hz);
            self.frame = self.frame.wrapping_add(1);
            s
        } else {
            self.carrier(self.left_hz)
        };
        self.right_next = !self.right_next;
        Some(sample)
    }
}

impl Source for BinauralBeats {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
