//! Oscillators and the detuned bank that gives a voice its width.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::automation::{AutomatedParam, PARAM_RAMP_SECS};

/*
Oscillator Bank
===============

A single oscillator sounds thin. Classic "supersaw"/chorus-style patches run
a small stack of identical oscillators, each shifted a few cents off the
note's pitch. The shifted copies drift in and out of phase with each other,
which the ear hears as width and movement.

  detune (cents)   1 semitone = 100 cents. The pitch multiplier for a detune
                   of c cents is 2^(c/1200).

  bank             OSC_COUNT oscillators sharing one base frequency, each
                   with its own detune offset, summed and normalized by the
                   count so the stack does not clip downstream stages.

Detune offsets are automated parameters: re-detuning a sounding voice ramps
over the standard 50 ms rather than stepping, so the pitch glides instead of
clicking.
*/

/// Number of oscillators in a voice's bank.
pub const OSC_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Sawtooth,
    Square,
    Triangle,
}

impl Default for Waveform {
    fn default() -> Self {
        Waveform::Sawtooth
    }
}

/// Phase-accumulator oscillator.
///
/// Output precedes the phase step, so sample `n` of a sine at constant
/// frequency `f` equals `sin(TAU * f * n / sample_rate)`.
#[derive(Debug, Clone, Copy)]
pub struct OscillatorBlock {
    waveform: Waveform,
    phase: f32, // cycles, wraps in [0, 1)
}

impl OscillatorBlock {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let out = match self.waveform {
            Waveform::Sine => (TAU * self.phase).sin(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => {
                // 0 -> 1 -> 0 -> -1 -> 0 over one cycle
                4.0 * (self.phase - (self.phase + 0.5).floor()).abs() - 1.0
            }
        };

        self.phase += frequency / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        out
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// A stack of detuned oscillators sharing one base frequency.
#[derive(Debug, Clone)]
pub struct OscillatorBank {
    oscillators: [OscillatorBlock; OSC_COUNT],
    detune_cents: [AutomatedParam; OSC_COUNT],
}

impl OscillatorBank {
    pub fn new(waveform: Waveform, detune_cents: [f32; OSC_COUNT]) -> Self {
        Self {
            oscillators: [OscillatorBlock::new(waveform); OSC_COUNT],
            detune_cents: detune_cents.map(AutomatedParam::new),
        }
    }

    /// Ramp each oscillator's detune to a new offset over the standard ramp.
    pub fn ramp_detune(&mut self, cents: &[f32; OSC_COUNT], start_time: f64) {
        for (param, &target) in self.detune_cents.iter_mut().zip(cents.iter()) {
            param.ramp_to(target, start_time, PARAM_RAMP_SECS);
        }
    }

    /// Current detune targets, one per oscillator.
    pub fn detune_targets(&self) -> [f32; OSC_COUNT] {
        let mut out = [0.0; OSC_COUNT];
        for (o, p) in out.iter_mut().zip(self.detune_cents.iter()) {
            *o = p.target();
        }
        out
    }

    /// Sum the bank at `base_frequency`, resolving detune ramps at `time`.
    #[inline]
    pub fn next_sample(&mut self, base_frequency: f32, time: f64, sample_rate: f32) -> f32 {
        let mut sum = 0.0;
        for (osc, detune) in self.oscillators.iter_mut().zip(self.detune_cents.iter()) {
            let cents = detune.value_at(time);
            let freq = base_frequency * (cents / 1200.0).exp2();
            sum += osc.next_sample(freq, sample_rate);
        }
        sum / OSC_COUNT as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn valid_sine() {
        let mut osc = OscillatorBlock::new(Waveform::Sine);
        let frequency = 440.0;

        let mut buffer = vec![0.0f32; 128];
        for sample in buffer.iter_mut() {
            *sample = osc.next_sample(frequency, SAMPLE_RATE);
        }

        // sample n should be sin(2pi f n / sr)
        let sample_index = 12;
        let expected = (TAU * frequency * sample_index as f32 / SAMPLE_RATE).sin();
        let actual = buffer[sample_index];
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn waveforms_stay_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Sawtooth,
            Waveform::Square,
            Waveform::Triangle,
        ] {
            let mut osc = OscillatorBlock::new(waveform);
            for _ in 0..2048 {
                let s = osc.next_sample(997.0, SAMPLE_RATE);
                assert!(s.is_finite());
                assert!(s.abs() <= 1.0 + 1e-6, "{waveform:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn bank_without_detune_matches_single_oscillator() {
        let mut bank = OscillatorBank::new(Waveform::Sine, [0.0; OSC_COUNT]);
        let mut reference = OscillatorBlock::new(Waveform::Sine);

        for n in 0..512 {
            let t = n as f64 / SAMPLE_RATE as f64;
            let banked = bank.next_sample(440.0, t, SAMPLE_RATE);
            let single = reference.next_sample(440.0, SAMPLE_RATE);
            assert!(
                (banked - single).abs() < 1e-5,
                "sample {n}: bank {banked} vs single {single}"
            );
        }
    }

    #[test]
    fn detuned_bank_is_normalized() {
        let mut bank = OscillatorBank::new(Waveform::Sawtooth, [-12.0, 0.0, 12.0]);
        for n in 0..4096 {
            let t = n as f64 / SAMPLE_RATE as f64;
            let s = bank.next_sample(220.0, t, SAMPLE_RATE);
            assert!(s.abs() <= 1.0 + 1e-6, "bank output clipped: {s}");
        }
    }

    #[test]
    fn ramped_detune_lands_on_target() {
        let mut bank = OscillatorBank::new(Waveform::Sine, [0.0; OSC_COUNT]);
        bank.ramp_detune(&[-7.0, 0.0, 7.0], 0.0);

        // Run well past the ramp.
        for n in 0..8192 {
            let t = n as f64 / SAMPLE_RATE as f64;
            bank.next_sample(440.0, t, SAMPLE_RATE);
        }
        assert_eq!(bank.detune_targets(), [-7.0, 0.0, 7.0]);
    }
}
