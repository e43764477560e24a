//! Feed-forward multi-tap reverb.

/*
Reverb
======

Room reflections are approximated by reading one shared delay line at a
handful of staggered offsets:

    in ── pre-delay ──┬─ tap 1 ─ g1 ─┐
        (write once)  ├─ tap 2 ─ g2 ─┼─ (+) ─ tone lowpass ── wet
                      ├─ ...         │
                      └─ tap N ─ gN ─┘

  tap times     Prime-millisecond offsets (29, 37, 41, 43, 47, 53 ms) so no
                two taps share a common period and comb coloration stays
                spread out. `room_size` scales all of them together.

  tap gains     Exponential falloff derived from the decay time:

                    gain = 0.5 ^ (tap_delay / decay_time)

                Later taps are always quieter - the tail dies out the way a
                room does.

  pre-delay     Offsets every tap read, pushing the wet onset back to mimic
                the distance to the first reflection.

The topology is strictly feed-forward: the delay line holds only input
history, and nothing downstream writes back into it. Feeding the tone
filter's output back toward the pre-delay stage turns the network into an
unbounded accumulator; any future change that closes a loop here needs an
explicit gain-stability argument, not a listen test.
*/

use crate::automation::{AutomatedParam, PARAM_RAMP_SECS};
use crate::context::RenderCtx;
use crate::dsp::delay::DelayLine;
use crate::dsp::filter::OnePoleLowPass;
use crate::effects::{crossfade, Effect};
use crate::error::SynthError;
use crate::params::ParamId;

pub const TAP_COUNT: usize = 6;

/// Base tap offsets in milliseconds, mutually prime.
const TAP_DELAYS_MS: [f32; TAP_COUNT] = [29.0, 37.0, 41.0, 43.0, 47.0, 53.0];

/// Room-size maps linearly onto this scale range for all tap offsets.
const ROOM_SCALE_MIN: f32 = 0.25;
const ROOM_SCALE_MAX: f32 = 2.0;

pub struct Reverb {
    sample_rate: f32,
    line: DelayLine,
    tone_filter: OnePoleLowPass,

    decay_time: AutomatedParam,
    room_size: AutomatedParam,
    pre_delay: AutomatedParam,
    tone_hz: AutomatedParam,
    dry_wet: AutomatedParam,

    // Tap network, recomputed at block boundaries from the ramped params.
    tap_delay_samples: [usize; TAP_COUNT],
    tap_gains: [f32; TAP_COUNT],
    pre_delay_samples: usize,
    wet_norm: f32,
}

impl Reverb {
    pub fn new(sample_rate: f32) -> Self {
        // Enough history for max pre-delay plus the longest scaled tap.
        let max_pre = 1.0;
        let max_tap = TAP_DELAYS_MS[TAP_COUNT - 1] * 1e-3 * ROOM_SCALE_MAX;
        let capacity = ((max_pre + max_tap) * sample_rate) as usize + 8;

        let mut reverb = Self {
            sample_rate,
            line: DelayLine::new(capacity),
            tone_filter: OnePoleLowPass::new(8_000.0, sample_rate),
            decay_time: AutomatedParam::new(2.0),
            room_size: AutomatedParam::new(0.5),
            pre_delay: AutomatedParam::new(0.02),
            tone_hz: AutomatedParam::new(8_000.0),
            dry_wet: AutomatedParam::new(0.25),
            tap_delay_samples: [1; TAP_COUNT],
            tap_gains: [0.0; TAP_COUNT],
            pre_delay_samples: 0,
            wet_norm: 1.0,
        };
        reverb.configure(0.0);
        reverb
    }

    pub fn set_decay_time(&mut self, secs: f32, now: f64) -> Result<(), SynthError> {
        ParamId::ReverbDecayTime.validate(secs)?;
        self.decay_time.ramp_to(secs, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn set_room_size(&mut self, size: f32, now: f64) -> Result<(), SynthError> {
        ParamId::ReverbRoomSize.validate(size)?;
        self.room_size.ramp_to(size, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn set_pre_delay(&mut self, secs: f32, now: f64) -> Result<(), SynthError> {
        ParamId::ReverbPreDelay.validate(secs)?;
        self.pre_delay.ramp_to(secs, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn set_tone_hz(&mut self, hz: f32, now: f64) -> Result<(), SynthError> {
        ParamId::ReverbTone.validate(hz)?;
        self.tone_hz.ramp_to(hz, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn set_dry_wet(&mut self, mix: f32, now: f64) -> Result<(), SynthError> {
        ParamId::ReverbDryWet.validate(mix)?;
        self.dry_wet.ramp_to(mix, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn decay_time(&self) -> f32 {
        self.decay_time.target()
    }

    pub fn room_size(&self) -> f32 {
        self.room_size.target()
    }

    /// Current per-tap gains, ordered by tap delay. Strictly decreasing.
    pub fn tap_gains(&self) -> [f32; TAP_COUNT] {
        self.tap_gains
    }

    /// Resolve the ramped parameters at `time` and rebuild the tap network.
    fn configure(&mut self, time: f64) {
        let decay = self.decay_time.value_at(time).max(0.1);
        let room = self.room_size.value_at(time).clamp(0.0, 1.0);
        let scale = ROOM_SCALE_MIN + room * (ROOM_SCALE_MAX - ROOM_SCALE_MIN);

        let mut gain_sum = 0.0;
        for i in 0..TAP_COUNT {
            let delay_secs = TAP_DELAYS_MS[i] * 1e-3 * scale;
            self.tap_delay_samples[i] =
                ((delay_secs * self.sample_rate) as usize).max(1);
            // Exponential falloff: each tap is half as loud every
            // `decay_time` seconds of delay.
            self.tap_gains[i] = (-(delay_secs / decay)).exp2();
            gain_sum += self.tap_gains[i];
        }
        self.wet_norm = 1.0 / gain_sum.max(1.0);

        self.pre_delay_samples =
            (self.pre_delay.value_at(time).max(0.0) * self.sample_rate) as usize;
        self.tone_filter
            .set_cutoff(self.tone_hz.value_at(time), self.sample_rate);
    }
}

impl Effect for Reverb {
    fn render_block(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        self.configure(ctx.time);

        for (i, sample) in buffer.iter_mut().enumerate() {
            let dry = *sample;

            // Input history only - the wet path never writes back.
            self.line.push(dry);

            let mut wet = 0.0;
            for (delay, gain) in self.tap_delay_samples.iter().zip(self.tap_gains.iter()) {
                wet += gain * self.line.tap(self.pre_delay_samples + delay);
            }
            wet = self.tone_filter.process(wet * self.wet_norm);

            *sample = crossfade(dry, wet, self.dry_wet.value_at(ctx.sample_time(i)));
        }
    }

    fn reset(&mut self) {
        self.line.reset();
        self.tone_filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn tap_gains_strictly_decrease_with_delay() {
        let mut reverb = Reverb::new(SAMPLE_RATE);
        reverb.set_decay_time(2.0, 0.0).unwrap();
        reverb.set_room_size(0.5, 0.0).unwrap();

        // Render past the ramps so the network reflects the targets.
        let mut buffer = vec![0.0f32; 256];
        reverb.render_block(&mut buffer, &RenderCtx::new(SAMPLE_RATE, 1.0));

        let gains = reverb.tap_gains();
        for pair in gains.windows(2) {
            assert!(
                pair[0] > pair[1],
                "later (longer) taps must be quieter: {gains:?}"
            );
        }
        assert!(gains.iter().all(|g| *g > 0.0 && *g < 1.0));
    }

    #[test]
    fn no_unbounded_growth_under_sustained_input() {
        let mut reverb = Reverb::new(SAMPLE_RATE);
        reverb.set_room_size(1.0, 0.0).unwrap();
        reverb.set_decay_time(10.0, 0.0).unwrap();
        reverb.set_dry_wet(1.0, 0.0).unwrap();

        let mut time = 0.0;
        for _ in 0..200 {
            let mut buffer = vec![0.1f32; 256];
            reverb.render_block(&mut buffer, &RenderCtx::new(SAMPLE_RATE, time));
            time += 256.0 / SAMPLE_RATE as f64;
            for &s in &buffer {
                assert!(s.is_finite(), "reverb output should be finite");
                assert!(s.abs() < 2.0, "reverb output growing without bound: {s}");
            }
        }
    }

    #[test]
    fn impulse_produces_a_delayed_tail() {
        let mut reverb = Reverb::new(SAMPLE_RATE);
        reverb.set_pre_delay(0.0, 0.0).unwrap();
        reverb.set_dry_wet(1.0, 0.0).unwrap();

        // Settle the ramps first with silence.
        let mut silence = vec![0.0f32; 8192];
        reverb.render_block(&mut silence, &RenderCtx::new(SAMPLE_RATE, 0.0));

        let mut buffer = vec![0.0f32; 8192];
        buffer[0] = 1.0;
        reverb.render_block(&mut buffer, &RenderCtx::new(SAMPLE_RATE, 1.0));

        // The first tap sits near 29ms * scale; the echo must show up after
        // it, not at sample zero.
        let first_nonzero = buffer.iter().skip(1).position(|s| s.abs() > 1e-4);
        let idx = first_nonzero.expect("impulse should produce a tail") + 1;
        assert!(
            idx > 500,
            "wet path should be delayed by the tap network, got sample {idx}"
        );
    }

    #[test]
    fn pre_delay_pushes_the_tail_back() {
        let onset = |pre: f32| {
            let mut reverb = Reverb::new(SAMPLE_RATE);
            reverb.set_pre_delay(pre, 0.0).unwrap();
            reverb.set_dry_wet(1.0, 0.0).unwrap();
            let mut silence = vec![0.0f32; 8192];
            reverb.render_block(&mut silence, &RenderCtx::new(SAMPLE_RATE, 0.0));

            let mut buffer = vec![0.0f32; 32_768];
            buffer[0] = 1.0;
            reverb.render_block(&mut buffer, &RenderCtx::new(SAMPLE_RATE, 1.0));
            buffer
                .iter()
                .skip(1)
                .position(|s| s.abs() > 1e-4)
                .expect("tail expected")
        };

        let near = onset(0.0);
        let far = onset(0.25);
        assert!(
            far > near + (0.2 * SAMPLE_RATE) as usize,
            "pre-delay should shift the onset: {near} vs {far}"
        );
    }

    #[test]
    fn rejects_out_of_range_without_mutation() {
        let mut reverb = Reverb::new(SAMPLE_RATE);
        let decay_before = reverb.decay_time();
        assert!(reverb.set_decay_time(0.05, 0.0).is_err());
        assert!(reverb.set_decay_time(11.0, 0.0).is_err());
        assert_eq!(reverb.decay_time(), decay_before);
        assert!(reverb.set_room_size(1.5, 0.0).is_err());
        assert!(reverb.set_pre_delay(2.0, 0.0).is_err());
        assert!(reverb.set_tone_hz(50.0, 0.0).is_err());
    }
}
