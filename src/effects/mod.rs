//! The effects bus: saturation, compression, reverb.
//!
//! Each unit processes the mixed voice bus in place, owns its parameters as
//! automated ramps, and blends its wet path against the dry input. The chain
//! runs once per block over the summed voices, never per voice.

/// Dynamic range compression with soft knee and makeup gain.
pub mod compressor;
/// Feed-forward multi-tap reverb.
pub mod reverb;
/// Soft-clipping harmonic saturation.
pub mod saturation;

pub use compressor::{CompressionMeter, Compressor};
pub use reverb::Reverb;
pub use saturation::Saturation;

use crate::context::RenderCtx;

/// A processor slotted into the effects bus.
pub trait Effect: Send {
    /// Process `buffer` in place. Sample `i` is at `ctx.sample_time(i)`.
    fn render_block(&mut self, buffer: &mut [f32], ctx: &RenderCtx);

    /// Clear internal signal state (delay lines, followers). Parameters keep
    /// their values.
    fn reset(&mut self);
}

/// Linear dry/wet blend.
#[inline]
pub(crate) fn crossfade(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}

/// The fixed bus: saturation into compression into reverb.
pub struct EffectsChain {
    pub saturation: Saturation,
    pub compressor: Compressor,
    pub reverb: Reverb,
}

impl EffectsChain {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            saturation: Saturation::new(sample_rate),
            compressor: Compressor::new(sample_rate),
            reverb: Reverb::new(sample_rate),
        }
    }
}

impl Effect for EffectsChain {
    fn render_block(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        self.saturation.render_block(buffer, ctx);
        self.compressor.render_block(buffer, ctx);
        self.reverb.render_block(buffer, ctx);
    }

    fn reset(&mut self) {
        self.saturation.reset();
        self.compressor.reset();
        self.reverb.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_processes_a_block_in_place() {
        let mut chain = EffectsChain::new(48_000.0);
        let ctx = RenderCtx::new(48_000.0, 0.0);

        let mut buffer: Vec<f32> = (0..512)
            .map(|n| (std::f32::consts::TAU * 440.0 * n as f32 / 48_000.0).sin() * 0.5)
            .collect();
        chain.render_block(&mut buffer, &ctx);

        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!(buffer.iter().any(|s| s.abs() > 0.0));
    }

    #[test]
    fn reset_clears_signal_state() {
        let mut chain = EffectsChain::new(48_000.0);
        let ctx = RenderCtx::new(48_000.0, 0.0);

        let mut buffer = vec![0.9f32; 256];
        chain.render_block(&mut buffer, &ctx);
        chain.reset();

        // Silence in must be silence out after a reset: no delay-line tails.
        let mut silent = vec![0.0f32; 4096];
        chain.render_block(&mut silent, &RenderCtx::new(48_000.0, 1.0));
        assert!(silent.iter().all(|s| s.abs() < 1e-6));
    }
}
