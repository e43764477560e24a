//! One-pole lowpass for tone shaping.
//!
//! The classic leaky integrator:
//!
//! ```text
//! y[n] = x[n] * (1 - a) + y[n-1] * a,   a = exp(-TAU * cutoff / sample_rate)
//! ```
//!
//! 6 dB/octave, no resonance. It is what the reverb's shared tone filter and
//! the saturation tone shelf need - anything steeper colors the tail in ways
//! the controls do not promise.

use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy)]
pub struct OnePoleLowPass {
    coeff: f32,
    state: f32,
}

impl OnePoleLowPass {
    pub fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            coeff: 0.0,
            state: 0.0,
        };
        filter.set_cutoff(cutoff_hz, sample_rate);
        filter
    }

    /// Retune the cutoff. Cheap enough to call once per block.
    pub fn set_cutoff(&mut self, cutoff_hz: f32, sample_rate: f32) {
        let fc = cutoff_hz.clamp(1.0, sample_rate * 0.49);
        self.coeff = (-TAU * fc / sample_rate).exp();
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = input * (1.0 - self.coeff) + self.state * self.coeff;
        self.state
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}
