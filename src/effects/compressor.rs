//! Feed-forward dynamics compressor with soft knee and automatic makeup.

/*
Compressor
==========

Three stages, all feed-forward:

  detector     A peak envelope follower tracks the input level. `attack`
               and `release` set how fast it rises toward and falls away
               from the signal (one-pole smoothing in each direction).

  gain computer  Works in dB. Below threshold: unity. Above: the overshoot
               is divided by `ratio`. `knee_db` widens the corner into a
               quadratic transition so the onset is gradual instead of a
               hard hinge.

  makeup       Compression removes level; the makeup stage restores an
               estimate of it:

                   makeup = -threshold * (1 - 1/ratio) / 2   (dB)

               the gain a full-scale signal loses, halved. Applied after
               reduction so heavier settings do not silently drop the bus.

The detector runs in linear amplitude and only the gain computer converts
to dB; one log per sample is the whole budget.
*/

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::automation::{AutomatedParam, PARAM_RAMP_SECS};
use crate::context::RenderCtx;
use crate::effects::{crossfade, Effect};
use crate::error::SynthError;
use crate::params::ParamId;

#[inline]
fn linear_to_db(linear: f32) -> f32 {
    if linear <= 1e-6 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}

#[inline]
fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Read-only view of the compressor's current gain reduction, safe to poll
/// from the control thread for UI metering.
#[derive(Debug, Clone)]
pub struct CompressionMeter {
    reduction_bits: Arc<AtomicU32>,
}

impl CompressionMeter {
    /// Current gain reduction in dB (0 = none). Updated once per block.
    pub fn gain_reduction_db(&self) -> f32 {
        f32::from_bits(self.reduction_bits.load(Ordering::Relaxed))
    }
}

pub struct Compressor {
    sample_rate: f32,

    threshold_db: AutomatedParam,
    ratio: AutomatedParam,
    knee_db: AutomatedParam,
    dry_wet: AutomatedParam,
    // Detector times shape the follower's own smoothing; they are validated
    // but applied directly (changing them cannot click).
    attack_secs: f32,
    release_secs: f32,

    envelope: f32,
    reduction_bits: Arc<AtomicU32>,
}

impl Compressor {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            threshold_db: AutomatedParam::new(-24.0),
            ratio: AutomatedParam::new(4.0),
            knee_db: AutomatedParam::new(6.0),
            dry_wet: AutomatedParam::new(1.0),
            attack_secs: 0.003,
            release_secs: 0.25,
            envelope: 0.0,
            reduction_bits: Arc::new(AtomicU32::new(0.0f32.to_bits())),
        }
    }

    pub fn set_threshold_db(&mut self, db: f32, now: f64) -> Result<(), SynthError> {
        ParamId::CompressionThreshold.validate(db)?;
        self.threshold_db.ramp_to(db, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn set_ratio(&mut self, ratio: f32, now: f64) -> Result<(), SynthError> {
        ParamId::CompressionRatio.validate(ratio)?;
        self.ratio.ramp_to(ratio, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn set_knee_db(&mut self, knee: f32, now: f64) -> Result<(), SynthError> {
        ParamId::CompressionKnee.validate(knee)?;
        self.knee_db.ramp_to(knee, now, PARAM_RAMP_SECS);
        Ok(())
    }

    pub fn set_attack(&mut self, secs: f32) -> Result<(), SynthError> {
        ParamId::CompressionAttack.validate(secs)?;
        self.attack_secs = secs;
        Ok(())
    }

    pub fn set_release(&mut self, secs: f32) -> Result<(), SynthError> {
        ParamId::CompressionRelease.validate(secs)?;
        self.release_secs = secs;
        Ok(())
    }

    pub fn set_dry_wet(&mut self, mix: f32, now: f64) -> Result<(), SynthError> {
        ParamId::CompressionDryWet.validate(mix)?;
        self.dry_wet.ramp_to(mix, now, PARAM_RAMP_SECS);
        Ok(())
    }

    /// Handle for UI metering of the current reduction.
    pub fn meter(&self) -> CompressionMeter {
        CompressionMeter {
            reduction_bits: Arc::clone(&self.reduction_bits),
        }
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db.target()
    }

    pub fn ratio(&self) -> f32 {
        self.ratio.target()
    }

    fn follower_coeff(&self, secs: f32) -> f32 {
        if secs <= 0.0 {
            0.0
        } else {
            (-1.0 / (secs * self.sample_rate)).exp()
        }
    }

    /// Gain change (dB, <= 0) for a detector level of `input_db`.
    fn compute_gain_db(input_db: f32, threshold: f32, ratio: f32, knee: f32) -> f32 {
        let slope = 1.0 - 1.0 / ratio;
        if knee <= 0.0 {
            if input_db <= threshold {
                0.0
            } else {
                (threshold - input_db) * slope
            }
        } else {
            let half_knee = knee * 0.5;
            if input_db <= threshold - half_knee {
                0.0
            } else if input_db >= threshold + half_knee {
                (threshold - input_db) * slope
            } else {
                // Quadratic transition through the knee.
                let over = input_db - threshold + half_knee;
                -slope * over * over / (2.0 * knee)
            }
        }
    }
}

impl Effect for Compressor {
    fn render_block(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        let attack_coeff = self.follower_coeff(self.attack_secs);
        let release_coeff = self.follower_coeff(self.release_secs);

        let mut last_reduction = 0.0;
        for (i, sample) in buffer.iter_mut().enumerate() {
            let t = ctx.sample_time(i);
            let dry = *sample;

            let level = dry.abs();
            let coeff = if level > self.envelope {
                attack_coeff
            } else {
                release_coeff
            };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * level;

            let threshold = self.threshold_db.value_at(t);
            let ratio = self.ratio.value_at(t).max(1.0);
            let knee = self.knee_db.value_at(t);

            let reduction_db =
                Self::compute_gain_db(linear_to_db(self.envelope), threshold, ratio, knee);
            let makeup_db = -threshold * (1.0 - 1.0 / ratio) * 0.5;

            let wet = dry * db_to_linear(reduction_db + makeup_db);
            *sample = crossfade(dry, wet, self.dry_wet.value_at(t));
            last_reduction = -reduction_db;
        }

        self.reduction_bits
            .store(last_reduction.to_bits(), Ordering::Relaxed);
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
        self.reduction_bits.store(0.0f32.to_bits(), Ordering::Relaxed);
    }
}
