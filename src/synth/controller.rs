//! Control-side handle: validation, state mirror, command enqueueing.

/*
The controller is the UI-facing half of the engine. It never touches
samples; it validates each request synchronously, updates its own mirror of
the parameter state, and enqueues a command the render thread applies at
the next block boundary. That ordering gives the engine its concurrency
contract: one writer per queue end, no locks, and at most one block of
latency between a set and its first audible effect.

Validation lives here so errors surface to the caller on the thread that
made the mistake, before anything is enqueued. The mirror is therefore
always a valid state, and `get_state` is a plain copy of it - the render
thread is never asked.
*/

use rtrb::Producer;

use crate::context::AudioContext;
use crate::dsp::envelope::EnvelopeParams;
use crate::effects::CompressionMeter;
use crate::error::SynthError;
use crate::params::{ParamId, ParameterChange};
use crate::preset::{EngineState, Preset};
use crate::synth::message::EngineCommand;
use crate::synth::midi_note_to_freq;
use crate::synth::voice::{MAX_FREQUENCY_HZ, MAX_VELOCITY, MIN_FREQUENCY_HZ};

pub struct SynthController {
    commands: Producer<EngineCommand>,
    context: AudioContext,
    state: EngineState,
    meter: CompressionMeter,
}

impl SynthController {
    pub(crate) fn new(
        commands: Producer<EngineCommand>,
        context: AudioContext,
        state: EngineState,
        meter: CompressionMeter,
    ) -> Self {
        Self {
            commands,
            context,
            state,
            meter,
        }
    }

    fn push(&mut self, command: EngineCommand, what: &'static str) -> Result<(), SynthError> {
        self.commands
            .push(command)
            .map_err(|_| SynthError::CommandQueueFull(what))
    }

    /// Start a new voice for `note`. A note already sounding keeps its old
    /// voice; this adds another.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Result<(), SynthError> {
        if velocity > MAX_VELOCITY {
            return Err(SynthError::InvalidVelocity(velocity as u16));
        }
        let frequency = midi_note_to_freq(note);
        crate::params::check_range("frequency", frequency, MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)?;
        self.push(EngineCommand::NoteOn { note, velocity }, "note on")
    }

    /// Release every voice sounding for `note`.
    pub fn note_off(&mut self, note: u8) -> Result<(), SynthError> {
        self.push(EngineCommand::NoteOff { note }, "note off")
    }

    /// Release everything at once.
    pub fn stop_all(&mut self) -> Result<(), SynthError> {
        self.push(EngineCommand::AllNotesOff, "stop all")
    }

    /// Route a dotted parameter path ("effects.reverb.decayTime") to its
    /// setter. Unknown paths and out-of-range values fail here, before any
    /// state - mirror or graph - changes.
    pub fn set_parameter(&mut self, path: &str, value: f32) -> Result<(), SynthError> {
        let id: ParamId = path.parse()?;
        self.set_parameter_id(id, value)
    }

    /// Same as [`set_parameter`](Self::set_parameter) for callers already
    /// holding a [`ParamId`].
    pub fn set_parameter_id(&mut self, id: ParamId, value: f32) -> Result<(), SynthError> {
        id.validate(value)?;
        self.push(
            EngineCommand::SetParam(ParameterChange {
                param: id,
                value,
                timestamp: self.context.now(),
            }),
            "parameter change",
        )?;
        self.state.set(id, value);
        Ok(())
    }

    /// Update the envelope template used by future triggers. Sounding notes
    /// keep the curve they started with.
    pub fn set_envelope(&mut self, params: EnvelopeParams) -> Result<(), SynthError> {
        let fields = [
            (ParamId::SynthAttack, params.attack),
            (ParamId::SynthDecay, params.decay),
            (ParamId::SynthSustain, params.sustain),
            (ParamId::SynthRelease, params.release),
        ];
        // Validate everything and reserve queue space before the first
        // change goes out, so the template never half-updates.
        for (id, value) in fields {
            id.validate(value)?;
        }
        if self.commands.slots() < fields.len() {
            return Err(SynthError::CommandQueueFull("envelope"));
        }
        for (id, value) in fields {
            self.set_parameter_id(id, value)?;
        }
        Ok(())
    }

    /// Snapshot of the full parameter state.
    pub fn get_state(&self) -> EngineState {
        self.state
    }

    /// Compressor gain reduction in dB, for metering.
    pub fn gain_reduction_db(&self) -> f32 {
        self.meter.gain_reduction_db()
    }

    /// Validate the whole preset, then apply it all-or-nothing. On any
    /// error - including a command queue too full to take every change -
    /// neither the mirror nor the graph moves.
    pub fn apply_preset(&mut self, preset: &Preset) -> Result<(), SynthError> {
        preset.validate()?;
        let new_state = preset.to_state();

        if self.commands.slots() < ParamId::ALL.len() {
            return Err(SynthError::CommandQueueFull("preset"));
        }
        let timestamp = self.context.now();
        for id in ParamId::ALL {
            let value = new_state.get(id);
            // Capacity was checked above; these pushes cannot fail.
            self.push(
                EngineCommand::SetParam(ParameterChange {
                    param: id,
                    value,
                    timestamp,
                }),
                "preset",
            )?;
        }
        self.state = new_state;
        Ok(())
    }

    /// Capture the current state as a named preset.
    pub fn snapshot_preset(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Preset {
        Preset::from_state(id, name, &self.state)
    }
}
