//! ADSR envelope generator.

/*
ADSR Envelope
=============

Converts gate events (note on/off) into a time-scheduled gain curve:

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

Each timed stage is a linear segment from an ANCHORED start level to its
target. The anchor is what keeps the curve continuous: releasing mid-attack
snapshots the level the attack actually reached and ramps to zero from
there - never a downward jump to the sustain level or to a fixed constant.
This is the same anchor-then-ramp contract the automation primitive gives
every other audible parameter, realized here at per-sample granularity
because the envelope is its own scheduler.

Stage bookkeeping is elapsed/total samples with a start-level snapshot, so
every segment lands exactly on its target regardless of rounding.
*/

use serde::{Deserialize, Serialize};

use crate::MIN_TIME;

/// Envelope shape template. Also the preset wire form for the synthesis
/// section, so the field names are the serialized names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeParams {
    /// Seconds to ramp 0 -> 1.
    pub attack: f32,
    /// Seconds to ramp 1 -> sustain.
    pub decay: f32,
    /// Level held while the gate stays high (0.0 - 1.0).
    pub sustain: f32,
    /// Seconds to ramp current level -> 0 after the gate drops.
    pub release: f32,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

pub struct Envelope {
    params: EnvelopeParams,
    sample_rate: f32,

    stage: EnvelopeStage,
    level: f32,

    // Current timed segment: anchored start level, elapsed/total samples.
    segment_start_level: f32,
    segment_elapsed: u32,
    segment_total: u32,
}

impl Envelope {
    pub fn new(sample_rate: f32, params: EnvelopeParams) -> Self {
        Self {
            params,
            sample_rate,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            segment_start_level: 0.0,
            segment_elapsed: 0,
            segment_total: 1,
        }
    }

    fn segment_samples(&self, seconds: f32) -> u32 {
        (seconds.max(MIN_TIME) * self.sample_rate).round().max(1.0) as u32
    }

    fn enter(&mut self, stage: EnvelopeStage, seconds: f32) {
        self.stage = stage;
        self.segment_start_level = self.level;
        self.segment_elapsed = 0;
        self.segment_total = self.segment_samples(seconds);
    }

    /// Gate high: start the attack ramp.
    pub fn note_on(&mut self) {
        self.level = 0.0;
        self.enter(EnvelopeStage::Attack, self.params.attack);
    }

    /// Gate low: anchor the current level and ramp to zero over the release
    /// time. Releasing mid-attack or mid-decay starts from wherever the
    /// level actually is. No-op when idle, idempotent while releasing.
    pub fn note_off(&mut self) {
        if matches!(self.stage, EnvelopeStage::Idle | EnvelopeStage::Release) {
            return;
        }
        self.enter(EnvelopeStage::Release, self.params.release);
    }

    /// Advance one sample and return the new level.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }
            EnvelopeStage::Attack => {
                self.step_segment(1.0);
                if self.segment_elapsed >= self.segment_total {
                    self.level = 1.0;
                    self.enter(EnvelopeStage::Decay, self.params.decay);
                }
            }
            EnvelopeStage::Decay => {
                let target = self.params.sustain.clamp(0.0, 1.0);
                self.step_segment(target);
                if self.segment_elapsed >= self.segment_total {
                    self.level = target;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                self.level = self.params.sustain.clamp(0.0, 1.0);
            }
            EnvelopeStage::Release => {
                self.step_segment(0.0);
                if self.segment_elapsed >= self.segment_total {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    #[inline]
    fn step_segment(&mut self, target: f32) {
        self.segment_elapsed = self.segment_elapsed.saturating_add(1);
        let progress = self.segment_elapsed as f32 / self.segment_total as f32;
        self.level = self.segment_start_level + (target - self.segment_start_level) * progress.min(1.0);
    }

    /// Fill `buffer` with consecutive envelope levels.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// True while the envelope is producing output (not idle).
    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeStage::Idle)
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn params(&self) -> &EnvelopeParams {
        &self.params
    }
}
