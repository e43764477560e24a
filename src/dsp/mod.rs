//! Low-level DSP primitives used by voices and the effects bus.
//!
//! These components are allocation-free after construction and realtime-safe,
//! so they can live directly inside voice and effect structs. They stay
//! focused on the signal math; scheduling and parameter plumbing belong to
//! the layers above.

/// Multi-tap delay line (reverb taps, pre-delay).
pub mod delay;
/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// One-pole lowpass used for tone shaping.
pub mod filter;
/// Audio-band oscillators and the detuned bank.
pub mod oscillator;

pub use envelope::{EnvelopeParams, EnvelopeStage};
pub use oscillator::Waveform;
