//! A single playable note: oscillator bank, envelope, velocity gain.

/*
Voice Lifecycle
===============

    (new) ──trigger──→ sounding ──release──→ releasing ──tail ends──→ disposed
      │                   │
      └── re-trigger ─────┘   warned no-op: a voice fires exactly once

A voice is built fresh for every note-on by the manager's factory settings
and never restarted: its oscillators start together on `trigger` and stop
for good when the release tail ends. Re-use means a new Voice value. The
phase reported to callers follows the envelope stage while the voice is
sounding.

All pitch, detune, and gain updates are ramped (50 ms, 10 ms for velocity),
usable both before and during playback. Validation happens before any state
changes, so a rejected call leaves the voice exactly as it was.
*/

use crate::automation::{AutomatedParam, PARAM_RAMP_SECS, VELOCITY_RAMP_SECS};
use crate::context::RenderCtx;
use crate::dsp::envelope::{Envelope, EnvelopeParams, EnvelopeStage};
use crate::dsp::oscillator::{OscillatorBank, Waveform, OSC_COUNT};
use crate::error::SynthError;
use crate::params::check_range;

pub const MIN_FREQUENCY_HZ: f32 = 20.0;
pub const MAX_FREQUENCY_HZ: f32 = 20_000.0;
pub const MAX_VELOCITY: u8 = 127;

/// Largest per-oscillator detune offset, one octave either way.
const DETUNE_CENTS_LIMIT: f32 = 1_200.0;

/// Externally visible lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePhase {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
    Disposed,
}

/// The instrument design a manager stamps onto every new voice.
#[derive(Debug, Clone, Copy)]
pub struct VoiceSettings {
    pub waveform: Waveform,
    pub detune_cents: [f32; OSC_COUNT],
    pub envelope: EnvelopeParams,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            waveform: Waveform::default(),
            detune_cents: [-7.0, 0.0, 7.0],
            envelope: EnvelopeParams::default(),
        }
    }
}

impl VoiceSettings {
    /// Build a fresh, untriggered voice. Every note-on gets its own
    /// instance; nothing is pooled inside the voice itself.
    pub fn create_voice(
        &self,
        frequency: f32,
        velocity: u8,
        sample_rate: f32,
    ) -> Result<Voice, SynthError> {
        check_range("frequency", frequency, MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)?;
        if velocity > MAX_VELOCITY {
            return Err(SynthError::InvalidVelocity(velocity as u16));
        }

        Ok(Voice {
            frequency: AutomatedParam::new(frequency),
            velocity_gain: AutomatedParam::new(velocity as f32 / MAX_VELOCITY as f32),
            bank: OscillatorBank::new(self.waveform, self.detune_cents),
            envelope: Envelope::new(sample_rate, self.envelope),
            sample_rate,
            triggered: false,
            released: false,
        })
    }
}

pub struct Voice {
    frequency: AutomatedParam,
    velocity_gain: AutomatedParam,
    bank: OscillatorBank,
    envelope: Envelope,
    sample_rate: f32,
    triggered: bool,
    released: bool,
}

impl Voice {
    /// Start the oscillators and the envelope together. Returns `true` if
    /// the voice actually started. A voice fires exactly once; calling this
    /// again is a warned no-op that leaves the sounding note untouched.
    pub fn trigger(&mut self, _now: f64) -> bool {
        if self.triggered {
            log::warn!("voice already triggered; ignoring re-trigger");
            return false;
        }
        self.triggered = true;
        self.envelope.note_on();
        true
    }

    /// Anchor the current envelope level and ramp to silence over the
    /// release time. Idempotent while already releasing.
    pub fn release(&mut self, _now: f64) {
        if !self.triggered {
            log::warn!("release on a voice that was never triggered");
            return;
        }
        self.released = true;
        self.envelope.note_off();
    }

    /// Ramped re-pitch, valid before or during playback.
    pub fn set_frequency(&mut self, hz: f32, now: f64) -> Result<(), SynthError> {
        check_range("frequency", hz, MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)?;
        self.frequency.ramp_to(hz, now, PARAM_RAMP_SECS);
        Ok(())
    }

    /// Ramped velocity update; tighter ramp so key dynamics stay snappy.
    pub fn set_velocity(&mut self, velocity: u8, now: f64) -> Result<(), SynthError> {
        if velocity > MAX_VELOCITY {
            return Err(SynthError::InvalidVelocity(velocity as u16));
        }
        self.velocity_gain.ramp_to(
            velocity as f32 / MAX_VELOCITY as f32,
            now,
            VELOCITY_RAMP_SECS,
        );
        Ok(())
    }

    /// Ramped per-oscillator detune. The slice length must match the
    /// oscillator count; every offset is checked before any of them moves.
    pub fn set_detune(&mut self, cents: &[f32], now: f64) -> Result<(), SynthError> {
        if cents.len() != OSC_COUNT {
            return Err(SynthError::DetuneLength {
                expected: OSC_COUNT,
                got: cents.len(),
            });
        }
        let mut target = [0.0f32; OSC_COUNT];
        for (slot, &value) in target.iter_mut().zip(cents.iter()) {
            check_range("detune", value, -DETUNE_CENTS_LIMIT, DETUNE_CENTS_LIMIT)?;
            *slot = value;
        }
        self.bank.ramp_detune(&target, now);
        Ok(())
    }

    /// Sum the voice into `out` (velocity-scaled, envelope-shaped).
    pub fn render_add(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        debug_assert_eq!(self.sample_rate, ctx.sample_rate);

        for (i, out_sample) in out.iter_mut().enumerate() {
            let t = ctx.sample_time(i);
            let level = self.envelope.next_sample();
            if level == 0.0 {
                continue;
            }
            let frequency = self.frequency.value_at(t);
            let sample = self.bank.next_sample(frequency, t, ctx.sample_rate);
            *out_sample += sample * level * self.velocity_gain.value_at(t);
        }
    }

    /// True from trigger until the release tail has fully decayed.
    pub fn is_playing(&self) -> bool {
        self.triggered && self.envelope.is_active()
    }

    /// True once the release tail has ended; the owner can drop the voice.
    pub fn is_finished(&self) -> bool {
        self.triggered && self.released && !self.envelope.is_active()
    }

    pub fn phase(&self) -> VoicePhase {
        if !self.triggered {
            return VoicePhase::Idle;
        }
        match self.envelope.stage() {
            EnvelopeStage::Idle => VoicePhase::Disposed,
            EnvelopeStage::Attack => VoicePhase::Attack,
            EnvelopeStage::Decay => VoicePhase::Decay,
            EnvelopeStage::Sustain => VoicePhase::Sustain,
            EnvelopeStage::Release => VoicePhase::Release,
        }
    }

    pub fn envelope_level(&self) -> f32 {
        self.envelope.level()
    }

    pub fn frequency(&self) -> f32 {
        self.frequency.target()
    }
}
