//! Error taxonomy for the engine's control surface.
//!
//! Validation errors are raised synchronously on the control thread, before
//! any state mutation. Structural errors cover malformed presets and unknown
//! parameter paths. Recoverable conditions (re-triggering a sounding voice,
//! a full voice pool) are warnings via `log`, not errors; the engine keeps
//! its prior valid state.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    /// A numeric parameter fell outside its documented range. Nothing was
    /// applied.
    #[error("{param} out of range: {value} (expected {min} to {max})")]
    OutOfRange {
        param: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Velocity must be a 7-bit MIDI value.
    #[error("velocity {0} out of range (expected 0 to 127)")]
    InvalidVelocity(u16),

    /// Detune updates must provide one value per oscillator.
    #[error("detune array has {got} entries, expected {expected}")]
    DetuneLength { expected: usize, got: usize },

    /// A dotted parameter path did not resolve to a known parameter.
    #[error("unknown parameter path: {0:?}")]
    UnknownParameter(String),

    /// Preset JSON failed to parse or was missing required fields.
    #[error("malformed preset: {0}")]
    MalformedPreset(String),

    /// The control-to-render command queue was full; the command was not
    /// enqueued. Retry after the next rendered block.
    #[error("command queue full, dropped {0}")]
    CommandQueueFull(&'static str),
}
