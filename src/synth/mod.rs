// Purpose: voice management, polyphony, and the control/render split.
// This layer sits above the DSP primitives and the effects bus.

pub mod controller;
pub mod manager;
pub mod message;
pub mod voice;

pub use controller::SynthController;
pub use manager::{VoiceManager, VoiceStatus};
pub use message::EngineCommand;
pub use voice::{Voice, VoicePhase, VoiceSettings};

use rtrb::RingBuffer;

use crate::context::AudioContext;
use crate::preset::EngineState;

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub max_voices: usize,
    pub command_queue_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            max_voices: 32,
            command_queue_size: 256,
        }
    }
}

/// Build the two halves of the engine: the control-side handle and the
/// render-side manager. Hand the manager to the audio callback and keep the
/// controller wherever note events and parameter changes come from.
pub fn build_engine(config: EngineConfig) -> (SynthController, VoiceManager) {
    let (tx, rx) = RingBuffer::new(config.command_queue_size.max(16));
    let context = AudioContext::new(config.sample_rate);
    let initial = EngineState::default();

    let manager = VoiceManager::new(context.clone(), config.max_voices, rx, &initial);
    let controller = SynthController::new(tx, context, initial, manager.compression_meter());

    (controller, manager)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_440() {
        assert!((midi_note_to_freq(69) - 440.0).abs() < 1e-3);
        assert!((midi_note_to_freq(81) - 880.0).abs() < 1e-2);
        assert!((midi_note_to_freq(57) - 220.0).abs() < 1e-2);
    }
}
