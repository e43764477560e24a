//! Preset persistence and the engine's parameter state snapshot.
//!
//! A preset is the JSON wire form of the full parameter state plus an id
//! and a display name. Import parses, then validates every field with the
//! same ranges the live setters use; nothing is applied unless the whole
//! record passes. Export serializes the same shape back, and the two
//! round-trip exactly.

use serde::{Deserialize, Serialize};

use crate::error::SynthError;
use crate::params::ParamId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisSettings {
    /// Detune spread in cents: the outer oscillators sit this far below and
    /// above the note.
    pub detune: f32,
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SaturationSettings {
    pub amount: f32,
    pub tone: f32,
    pub dry_wet: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompressionSettings {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack: f32,
    pub release: f32,
    pub knee_db: f32,
    pub dry_wet: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReverbSettings {
    pub decay_time: f32,
    pub room_size: f32,
    pub pre_delay: f32,
    pub tone_hz: f32,
    pub dry_wet: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EffectsSettings {
    pub saturation: SaturationSettings,
    pub compression: CompressionSettings,
    pub reverb: ReverbSettings,
}

/// The engine's complete externally addressable parameter state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineState {
    pub synthesis: SynthesisSettings,
    pub effects: EffectsSettings,
    pub master_volume: f32,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            synthesis: SynthesisSettings {
                detune: 7.0,
                attack: 0.01,
                decay: 0.1,
                sustain: 0.7,
                release: 0.3,
            },
            effects: EffectsSettings {
                saturation: SaturationSettings {
                    amount: 0.2,
                    tone: 0.5,
                    dry_wet: 0.25,
                },
                compression: CompressionSettings {
                    threshold_db: -24.0,
                    ratio: 4.0,
                    attack: 0.003,
                    release: 0.25,
                    knee_db: 6.0,
                    dry_wet: 1.0,
                },
                reverb: ReverbSettings {
                    decay_time: 2.0,
                    room_size: 0.5,
                    pre_delay: 0.02,
                    tone_hz: 8_000.0,
                    dry_wet: 0.25,
                },
            },
            master_volume: 0.8,
        }
    }
}

impl EngineState {
    /// Read the value behind a parameter identifier.
    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::MasterVolume => self.master_volume,

            ParamId::SynthDetune => self.synthesis.detune,
            ParamId::SynthAttack => self.synthesis.attack,
            ParamId::SynthDecay => self.synthesis.decay,
            ParamId::SynthSustain => self.synthesis.sustain,
            ParamId::SynthRelease => self.synthesis.release,

            ParamId::SaturationAmount => self.effects.saturation.amount,
            ParamId::SaturationTone => self.effects.saturation.tone,
            ParamId::SaturationDryWet => self.effects.saturation.dry_wet,

            ParamId::CompressionThreshold => self.effects.compression.threshold_db,
            ParamId::CompressionRatio => self.effects.compression.ratio,
            ParamId::CompressionAttack => self.effects.compression.attack,
            ParamId::CompressionRelease => self.effects.compression.release,
            ParamId::CompressionKnee => self.effects.compression.knee_db,
            ParamId::CompressionDryWet => self.effects.compression.dry_wet,

            ParamId::ReverbDecayTime => self.effects.reverb.decay_time,
            ParamId::ReverbRoomSize => self.effects.reverb.room_size,
            ParamId::ReverbPreDelay => self.effects.reverb.pre_delay,
            ParamId::ReverbTone => self.effects.reverb.tone_hz,
            ParamId::ReverbDryWet => self.effects.reverb.dry_wet,
        }
    }

    /// Write the value behind a parameter identifier. The caller validates
    /// first; this is a plain field store.
    pub fn set(&mut self, id: ParamId, value: f32) {
        match id {
            ParamId::MasterVolume => self.master_volume = value,

            ParamId::SynthDetune => self.synthesis.detune = value,
            ParamId::SynthAttack => self.synthesis.attack = value,
            ParamId::SynthDecay => self.synthesis.decay = value,
            ParamId::SynthSustain => self.synthesis.sustain = value,
            ParamId::SynthRelease => self.synthesis.release = value,

            ParamId::SaturationAmount => self.effects.saturation.amount = value,
            ParamId::SaturationTone => self.effects.saturation.tone = value,
            ParamId::SaturationDryWet => self.effects.saturation.dry_wet = value,

            ParamId::CompressionThreshold => self.effects.compression.threshold_db = value,
            ParamId::CompressionRatio => self.effects.compression.ratio = value,
            ParamId::CompressionAttack => self.effects.compression.attack = value,
            ParamId::CompressionRelease => self.effects.compression.release = value,
            ParamId::CompressionKnee => self.effects.compression.knee_db = value,
            ParamId::CompressionDryWet => self.effects.compression.dry_wet = value,

            ParamId::ReverbDecayTime => self.effects.reverb.decay_time = value,
            ParamId::ReverbRoomSize => self.effects.reverb.room_size = value,
            ParamId::ReverbPreDelay => self.effects.reverb.pre_delay = value,
            ParamId::ReverbTone => self.effects.reverb.tone_hz = value,
            ParamId::ReverbDryWet => self.effects.reverb.dry_wet = value,
        }
    }

    /// Check every field against its documented range.
    pub fn validate(&self) -> Result<(), SynthError> {
        for id in ParamId::ALL {
            id.validate(self.get(id))?;
        }
        Ok(())
    }
}

/// The persisted form: parameter state plus identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub synthesis: SynthesisSettings,
    pub effects: EffectsSettings,
    pub master_volume: f32,
}

impl Preset {
    pub fn from_state(id: impl Into<String>, name: impl Into<String>, state: &EngineState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            synthesis: state.synthesis,
            effects: state.effects,
            master_volume: state.master_volume,
        }
    }

    pub fn to_state(&self) -> EngineState {
        EngineState {
            synthesis: self.synthesis,
            effects: self.effects,
            master_volume: self.master_volume,
        }
    }

    /// Validate every field with the live-setter ranges. Nothing about the
    /// preset is applied here; a failed preset changes nothing anywhere.
    pub fn validate(&self) -> Result<(), SynthError> {
        self.to_state().validate()
    }
}

/// Parse and validate a preset from its JSON wire form.
pub fn import_preset(json: &str) -> Result<Preset, SynthError> {
    let preset: Preset =
        serde_json::from_str(json).map_err(|e| SynthError::MalformedPreset(e.to_string()))?;
    preset.validate()?;
    Ok(preset)
}

/// Serialize a preset to its JSON wire form.
pub fn export_preset(preset: &Preset) -> Result<String, SynthError> {
    serde_json::to_string_pretty(preset).map_err(|e| SynthError::MalformedPreset(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_preset() -> Preset {
        let mut state = EngineState::default();
        state.set(ParamId::ReverbDecayTime, 3.5);
        state.set(ParamId::SaturationAmount, 0.6);
        Preset::from_state("preset-001", "Warm Pad", &state)
    }

    #[test]
    fn json_round_trip_is_exact() {
        let preset = sample_preset();
        let json = export_preset(&preset).unwrap();
        let back = import_preset(&json).unwrap();
        assert_eq!(back, preset);
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = export_preset(&sample_preset()).unwrap();
        for key in [
            "masterVolume",
            "decayTime",
            "roomSize",
            "preDelay",
            "toneHz",
            "thresholdDb",
            "kneeDb",
            "dryWet",
        ] {
            assert!(json.contains(key), "missing wire key {key}: {json}");
        }
        assert!(!json.contains("master_volume"));
    }

    #[test]
    fn missing_field_is_a_structural_error() {
        let mut json: serde_json::Value =
            serde_json::from_str(&export_preset(&sample_preset()).unwrap()).unwrap();
        json.as_object_mut().unwrap().remove("synthesis");
        let err = import_preset(&json.to_string()).unwrap_err();
        assert!(matches!(err, SynthError::MalformedPreset(_)));
    }

    #[test]
    fn unknown_field_is_a_structural_error() {
        let mut json: serde_json::Value =
            serde_json::from_str(&export_preset(&sample_preset()).unwrap()).unwrap();
        json.as_object_mut()
            .unwrap()
            .insert("wowFlutter".into(), 0.5.into());
        assert!(import_preset(&json.to_string()).is_err());
    }

    #[test]
    fn out_of_range_field_is_a_validation_error() {
        let mut preset = sample_preset();
        preset.effects.compression.ratio = 25.0;
        let json = serde_json::to_string(&preset).unwrap();
        let err = import_preset(&json).unwrap_err();
        assert!(
            matches!(err, SynthError::OutOfRange { .. }),
            "wrong error: {err:?}"
        );
    }

    #[test]
    fn default_state_is_valid() {
        assert!(EngineState::default().validate().is_ok());
    }

    #[test]
    fn get_set_cover_every_parameter() {
        let mut state = EngineState::default();
        for (i, id) in ParamId::ALL.iter().enumerate() {
            let (min, max) = id.range();
            let value = min + (max - min) * (i as f32 / ParamId::ALL.len() as f32);
            state.set(*id, value);
            assert_eq!(state.get(*id), value, "{id} did not round-trip");
        }
    }
}
