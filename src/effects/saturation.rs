//! Tape-style harmonic saturation.

/*
Saturation
==========

Soft clipping adds harmonics by compressing waveform peaks through the
transfer function

    f(x) = x / (1 + |x|)

`amount` scales a pre-gain drive into the curve: more drive pushes more of
the signal into the nonlinear region. Drive alone would also make the output
louder, so a compensation gain follows the curve. The curve itself already
flattens peaks, so full inverse compensation overcorrects; 1/sqrt(drive)
keeps perceived loudness roughly level across the amount range.

`tone` is a shelving stage after the nonlinearity: the wet signal splits at
a fixed crossover into a lowpass band and the remainder, and `tone` is the
gain on the remainder. 0 keeps only the lowpass band (darker), 1 passes the
shaped signal untouched (brighter).

Signal flow (feed-forward, per sample):

    in ──┬─ pre-gain ─ soft clip ─ compensate ─ shelf ──┐
         │                                              ├─ dry/wet ── out
         └──────────────────────────────────────────────┘
*/

use crate::automation::{AutomatedParam, PARAM_RAMP_SECS};
use crate::context::RenderCtx;
use crate::dsp::filter::OnePoleLowPass;
use crate::effects::{crossfade, Effect};
use crate::error::SynthError;
use crate::params::ParamId;

/// Drive at amount = 1.0 (amount maps linearly onto 1..=MAX_DRIVE).
const MAX_DRIVE: f32 = 10.0;
/// Crossover of the tone shelf.
const SHELF_CROSSOVER_HZ: f32 = 2_000.0;

/// Soft clip: smooth, tube-like peak compression.
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

pub struct Saturation {
    amount: AutomatedParam,
    tone: AutomatedParam,
    dry_wet: AutomatedParam,
    shelf_lowpass: OnePoleLowPass,
    sample_rate: f32,
}

impl Saturation {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            amount: AutomatedParam::new(0.2),
            tone: AutomatedParam::new(0.5),
            dry_wet: AutomatedParam::new(0.25),
            shelf_lowpass: OnePoleLowPass::new(SHELF_CROSSOVER_HZ, sample_rate),
            sample_rate,
        }
    }

    pub fn set_amount(&mut self, amount: f32, now: f64) -> Result<(), SynthError> {
        ParamId::SaturationAmount.validate(amount)?;
        self.amount.ramp_to(amount, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn set_tone(&mut self, tone: f32, now: f64) -> Result<(), SynthError> {
        ParamId::SaturationTone.validate(tone)?;
        self.tone.ramp_to(tone, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn set_dry_wet(&mut self, mix: f32, now: f64) -> Result<(), SynthError> {
        ParamId::SaturationDryWet.validate(mix)?;
        self.dry_wet.ramp_to(mix, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn amount(&self) -> f32 {
        self.amount.target()
    }

    pub fn tone(&self) -> f32 {
        self.tone.target()
    }

    pub fn dry_wet(&self) -> f32 {
        self.dry_wet.target()
    }
}

impl Effect for Saturation {
    fn render_block(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        debug_assert_eq!(self.sample_rate, ctx.sample_rate);

        for (i, sample) in buffer.iter_mut().enumerate() {
            let t = ctx.sample_time(i);
            let dry = *sample;

            let amount = self.amount.value_at(t);
            let drive = 1.0 + amount * (MAX_DRIVE - 1.0);
            let shaped = soft_clip(dry, drive) / drive.sqrt();

            // Shelf: lowpass band at unity, band above the crossover scaled
            // by tone.
            let low = self.shelf_lowpass.process(shaped);
            let tone = self.tone.value_at(t);
            let wet = low + (shaped - low) * tone;

            *sample = crossfade(dry, wet, self.dry_wet.value_at(t));
        }
    }

    fn reset(&mut self) {
        self.shelf_lowpass.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn sine_block(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|n| (std::f32::consts::TAU * 440.0 * n as f32 / SAMPLE_RATE).sin() * amplitude)
            .collect()
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }

    #[test]
    fn fully_dry_is_passthrough() {
        let mut sat = Saturation::new(SAMPLE_RATE);
        sat.set_dry_wet(0.0, 0.0).unwrap();

        let input = sine_block(4096, 0.8);
        let mut buffer = input.clone();
        // Render past the dry/wet ramp before comparing.
        sat.render_block(&mut buffer, &RenderCtx::new(SAMPLE_RATE, 0.0));
        let mut tail = input.clone();
        sat.render_block(&mut tail, &RenderCtx::new(SAMPLE_RATE, 1.0));

        for (out, inp) in tail.iter().zip(input.iter()) {
            assert!((out - inp).abs() < 1e-6, "dry path should be untouched");
        }
    }

    #[test]
    fn drive_does_not_raise_loudness() {
        let ctx = RenderCtx::new(SAMPLE_RATE, 10.0); // past all ramps

        let mut gentle = Saturation::new(SAMPLE_RATE);
        gentle.set_amount(0.0, 0.0).unwrap();
        gentle.set_dry_wet(1.0, 0.0).unwrap();
        let mut a = sine_block(8192, 0.7);
        gentle.render_block(&mut a, &ctx);

        let mut heavy = Saturation::new(SAMPLE_RATE);
        heavy.set_amount(1.0, 0.0).unwrap();
        heavy.set_dry_wet(1.0, 0.0).unwrap();
        let mut b = sine_block(8192, 0.7);
        heavy.render_block(&mut b, &ctx);

        // Compensation keeps max-amount output at or below a small margin
        // over the clean level.
        assert!(
            peak(&b) <= peak(&a) * 1.25,
            "amount raised loudness: {} vs {}",
            peak(&b),
            peak(&a)
        );
    }

    #[test]
    fn tone_darkens_at_zero() {
        let ctx = RenderCtx::new(SAMPLE_RATE, 10.0);

        let mut dark = Saturation::new(SAMPLE_RATE);
        dark.set_tone(0.0, 0.0).unwrap();
        dark.set_dry_wet(1.0, 0.0).unwrap();
        dark.set_amount(0.8, 0.0).unwrap();

        let mut bright = Saturation::new(SAMPLE_RATE);
        bright.set_tone(1.0, 0.0).unwrap();
        bright.set_dry_wet(1.0, 0.0).unwrap();
        bright.set_amount(0.8, 0.0).unwrap();

        // A high-frequency square exercises the shelf band.
        let input: Vec<f32> = (0..8192).map(|n| if n % 8 < 4 { 0.8 } else { -0.8 }).collect();

        let mut a = input.clone();
        dark.render_block(&mut a, &ctx);
        let mut b = input;
        bright.render_block(&mut b, &ctx);

        let energy = |buf: &[f32]| buf.iter().map(|x| x * x).sum::<f32>();
        assert!(energy(&a) < energy(&b), "tone=0 should remove treble energy");
    }

    #[test]
    fn rejects_out_of_range_without_mutation() {
        let mut sat = Saturation::new(SAMPLE_RATE);
        let before = sat.amount();
        assert!(sat.set_amount(1.5, 0.0).is_err());
        assert!(sat.set_tone(-0.1, 0.0).is_err());
        assert!(sat.set_dry_wet(2.0, 0.0).is_err());
        assert_eq!(sat.amount(), before);
    }

    #[test]
    fn output_is_bounded() {
        let mut sat = Saturation::new(SAMPLE_RATE);
        sat.set_amount(1.0, 0.0).unwrap();
        sat.set_dry_wet(1.0, 0.0).unwrap();

        let mut buffer = sine_block(8192, 1.0);
        sat.render_block(&mut buffer, &RenderCtx::new(SAMPLE_RATE, 0.0));
        assert!(buffer.iter().all(|s| s.is_finite() && s.abs() <= 1.0 + 1e-3));
    }
}
