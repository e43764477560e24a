//! Parameter identifiers, dotted-path parsing, and validation ranges.
//!
//! The UI speaks dotted paths ("effects.reverb.decayTime"); everything past
//! the boundary speaks `ParamId`. Parsing happens exactly once, on the
//! control thread, and unknown paths fail loudly. Each identifier carries
//! its inclusive range, and the same range check backs live setters and
//! preset import, so there is a single definition of "valid" per parameter.

use std::fmt;
use std::str::FromStr;

use crate::error::SynthError;

/// Closed set of externally addressable parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    MasterVolume,

    SynthDetune,
    SynthAttack,
    SynthDecay,
    SynthSustain,
    SynthRelease,

    SaturationAmount,
    SaturationTone,
    SaturationDryWet,

    CompressionThreshold,
    CompressionRatio,
    CompressionAttack,
    CompressionRelease,
    CompressionKnee,
    CompressionDryWet,

    ReverbDecayTime,
    ReverbRoomSize,
    ReverbPreDelay,
    ReverbTone,
    ReverbDryWet,
}

/// A validated, timestamped parameter change headed for the render thread.
#[derive(Debug, Clone, Copy)]
pub struct ParameterChange {
    pub param: ParamId,
    pub value: f32,
    /// Control-thread engine time when the change was requested. The render
    /// thread starts the ramp at `max(timestamp, block start)`.
    pub timestamp: f64,
}

impl ParamId {
    /// Inclusive validation range.
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamId::MasterVolume => (0.0, 1.0),

            ParamId::SynthDetune => (0.0, 100.0),
            ParamId::SynthAttack => (0.001, 5.0),
            ParamId::SynthDecay => (0.001, 5.0),
            ParamId::SynthSustain => (0.0, 1.0),
            ParamId::SynthRelease => (0.001, 10.0),

            ParamId::SaturationAmount => (0.0, 1.0),
            ParamId::SaturationTone => (0.0, 1.0),
            ParamId::SaturationDryWet => (0.0, 1.0),

            ParamId::CompressionThreshold => (-100.0, 0.0),
            ParamId::CompressionRatio => (1.0, 20.0),
            ParamId::CompressionAttack => (0.0, 1.0),
            ParamId::CompressionRelease => (0.0, 2.0),
            ParamId::CompressionKnee => (0.0, 40.0),
            ParamId::CompressionDryWet => (0.0, 1.0),

            ParamId::ReverbDecayTime => (0.1, 10.0),
            ParamId::ReverbRoomSize => (0.0, 1.0),
            ParamId::ReverbPreDelay => (0.0, 1.0),
            ParamId::ReverbTone => (100.0, 20_000.0),
            ParamId::ReverbDryWet => (0.0, 1.0),
        }
    }

    /// Reject values outside the documented range before anything mutates.
    pub fn validate(self, value: f32) -> Result<(), SynthError> {
        let (min, max) = self.range();
        check_range(self.path(), value, min, max)
    }

    /// The dotted wire form of this parameter.
    pub fn path(self) -> &'static str {
        match self {
            ParamId::MasterVolume => "masterVolume",

            ParamId::SynthDetune => "synthesis.detune",
            ParamId::SynthAttack => "synthesis.attack",
            ParamId::SynthDecay => "synthesis.decay",
            ParamId::SynthSustain => "synthesis.sustain",
            ParamId::SynthRelease => "synthesis.release",

            ParamId::SaturationAmount => "effects.saturation.amount",
            ParamId::SaturationTone => "effects.saturation.tone",
            ParamId::SaturationDryWet => "effects.saturation.dryWet",

            ParamId::CompressionThreshold => "effects.compression.thresholdDb",
            ParamId::CompressionRatio => "effects.compression.ratio",
            ParamId::CompressionAttack => "effects.compression.attack",
            ParamId::CompressionRelease => "effects.compression.release",
            ParamId::CompressionKnee => "effects.compression.kneeDb",
            ParamId::CompressionDryWet => "effects.compression.dryWet",

            ParamId::ReverbDecayTime => "effects.reverb.decayTime",
            ParamId::ReverbRoomSize => "effects.reverb.roomSize",
            ParamId::ReverbPreDelay => "effects.reverb.preDelay",
            ParamId::ReverbTone => "effects.reverb.toneHz",
            ParamId::ReverbDryWet => "effects.reverb.dryWet",
        }
    }

    /// Every addressable parameter, for enumeration in UIs and tests.
    pub const ALL: [ParamId; 20] = [
        ParamId::MasterVolume,
        ParamId::SynthDetune,
        ParamId::SynthAttack,
        ParamId::SynthDecay,
        ParamId::SynthSustain,
        ParamId::SynthRelease,
        ParamId::SaturationAmount,
        ParamId::SaturationTone,
        ParamId::SaturationDryWet,
        ParamId::CompressionThreshold,
        ParamId::CompressionRatio,
        ParamId::CompressionAttack,
        ParamId::CompressionRelease,
        ParamId::CompressionKnee,
        ParamId::CompressionDryWet,
        ParamId::ReverbDecayTime,
        ParamId::ReverbRoomSize,
        ParamId::ReverbPreDelay,
        ParamId::ReverbTone,
        ParamId::ReverbDryWet,
    ];
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for ParamId {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamId::ALL
            .iter()
            .copied()
            .find(|id| id.path() == s)
            .ok_or_else(|| SynthError::UnknownParameter(s.to_string()))
    }
}

/// Shared range check: every numeric setter in the engine funnels through
/// this so rejection happens before any state mutation, with one message
/// shape.
pub fn check_range(param: &'static str, value: f32, min: f32, max: f32) -> Result<(), SynthError> {
    if !value.is_finite() || value < min || value > max {
        return Err(SynthError::OutOfRange {
            param,
            value: value as f64,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(())
}
