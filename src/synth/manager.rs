//! Render-side owner of voices and the effects bus.

/*
Voice Manager
=============

Owns everything the render thread touches: the voice pool, the effects
chain, the master gain, and the engine clock. Once per block it

  1. drains the command queue (note events, parameter changes),
  2. sums every active voice into the bus,
  3. vacates slots whose release tail has ended,
  4. runs the effects chain over the bus,
  5. applies the ramped master gain and advances the clock.

Per note id the lifecycle is

    absent → sounding (note on) → releasing (note off) → absent (tail ends)

Note-ons never steal: a re-struck key gets a brand-new voice while the old
one finishes its own envelope, so the same note id can briefly map to more
than one live voice. Slots are pre-allocated; writing a freshly built Voice
value into a free slot allocates nothing, which keeps the render callback
allocation-free. If every slot is busy the note is dropped with a warning -
stealing would cut a tail short, blocking is not an option here.

Disposal is driven by the envelope: a slot empties on the first block after
the voice's release ramp reaches zero, never immediately on note-off.
*/

use rtrb::Consumer;

use crate::automation::{AutomatedParam, PARAM_RAMP_SECS};
use crate::context::{AudioContext, RenderCtx};
use crate::dsp::oscillator::Waveform;
use crate::effects::{CompressionMeter, Effect, EffectsChain};
use crate::params::{ParamId, ParameterChange};
use crate::preset::EngineState;
use crate::synth::message::EngineCommand;
use crate::synth::voice::{Voice, VoicePhase, VoiceSettings};
use crate::synth::midi_note_to_freq;
use crate::MAX_BLOCK_SIZE;

struct ActiveVoice {
    note: u8,
    voice: Voice,
}

/// Status of one live voice, for UIs and tests.
#[derive(Debug, Clone, Copy)]
pub struct VoiceStatus {
    pub note: u8,
    pub phase: VoicePhase,
    pub envelope_level: f32,
    pub is_playing: bool,
}

pub struct VoiceManager {
    context: AudioContext,
    slots: Vec<Option<ActiveVoice>>,
    settings: VoiceSettings,
    effects: EffectsChain,
    master_gain: AutomatedParam,
    commands: Consumer<EngineCommand>,
}

impl VoiceManager {
    pub(crate) fn new(
        context: AudioContext,
        max_voices: usize,
        commands: Consumer<EngineCommand>,
        initial: &EngineState,
    ) -> Self {
        let sample_rate = context.sample_rate();
        let mut slots = Vec::with_capacity(max_voices.max(1));
        slots.resize_with(max_voices.max(1), || None);

        let mut manager = Self {
            context,
            slots,
            settings: VoiceSettings::default(),
            effects: EffectsChain::new(sample_rate),
            master_gain: AutomatedParam::new(initial.master_volume),
            commands,
        };
        // Bring every unit in line with the initial state before the first
        // block; at time zero the ramps resolve immediately.
        for id in ParamId::ALL {
            manager.apply_change(ParameterChange {
                param: id,
                value: initial.get(id),
                timestamp: 0.0,
            });
        }
        manager
    }

    /// Pull samples for one output block. `out` may be any length; it is
    /// processed in chunks of at most [`MAX_BLOCK_SIZE`].
    pub fn render_block(&mut self, out: &mut [f32]) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_chunk(chunk);
        }
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        let now = self.context.now();
        self.drain_commands(now);

        let ctx = RenderCtx::new(self.context.sample_rate(), now);

        out.fill(0.0);
        for slot in self.slots.iter_mut() {
            if let Some(active) = slot.as_mut() {
                active.voice.render_add(out, &ctx);
            }
            if slot.as_ref().is_some_and(|a| a.voice.is_finished()) {
                *slot = None;
            }
        }

        self.effects.render_block(out, &ctx);

        for (i, sample) in out.iter_mut().enumerate() {
            *sample *= self.master_gain.value_at(ctx.sample_time(i));
        }

        self.context.advance(out.len());
    }

    fn drain_commands(&mut self, now: f64) {
        while let Ok(command) = self.commands.pop() {
            match command {
                EngineCommand::NoteOn { note, velocity } => self.note_on(note, velocity, now),
                EngineCommand::NoteOff { note } => self.note_off(note, now),
                EngineCommand::AllNotesOff => {
                    for slot in self.slots.iter_mut().flatten() {
                        if slot.voice.is_playing() {
                            slot.voice.release(now);
                        }
                    }
                }
                EngineCommand::SetParam(change) => self.apply_change(change),
            }
        }
    }

    fn note_on(&mut self, note: u8, velocity: u8, now: f64) {
        let frequency = midi_note_to_freq(note);
        let voice = match self
            .settings
            .create_voice(frequency, velocity, self.context.sample_rate())
        {
            Ok(voice) => voice,
            // The control side validates before enqueueing, so this only
            // fires for callers bypassing the controller.
            Err(err) => {
                log::warn!("dropping note {note}: {err}");
                return;
            }
        };

        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                let mut active = ActiveVoice { note, voice };
                active.voice.trigger(now);
                *slot = Some(active);
            }
            None => {
                log::warn!("voice pool exhausted ({} voices), dropping note {note}", self.slots.len());
            }
        }
    }

    fn note_off(&mut self, note: u8, now: f64) {
        let mut found = false;
        for slot in self.slots.iter_mut().flatten() {
            if slot.note == note && slot.voice.is_playing() {
                slot.voice.release(now);
                found = true;
            }
        }
        if !found {
            log::warn!("note off for silent note {note}");
        }
    }

    fn apply_change(&mut self, change: ParameterChange) {
        let now = self.context.now();
        // The control thread stamps with its (slightly stale) view of the
        // clock; never start a ramp in the past.
        let start = change.timestamp.max(now);
        let value = change.value;

        let result = match change.param {
            ParamId::MasterVolume => {
                self.master_gain.ramp_to(value, start, PARAM_RAMP_SECS);
                Ok(())
            }

            ParamId::SynthDetune => {
                let spread = [-value, 0.0, value];
                self.settings.detune_cents = spread;
                // Live voices glide to the new width; future voices start
                // there.
                for slot in self.slots.iter_mut().flatten() {
                    if let Err(err) = slot.voice.set_detune(&spread, start) {
                        log::warn!("live detune rejected: {err}");
                    }
                }
                Ok(())
            }
            // Envelope fields shape future triggers only; a sounding note
            // keeps the curve it started with.
            ParamId::SynthAttack => {
                self.settings.envelope.attack = value;
                Ok(())
            }
            ParamId::SynthDecay => {
                self.settings.envelope.decay = value;
                Ok(())
            }
            ParamId::SynthSustain => {
                self.settings.envelope.sustain = value;
                Ok(())
            }
            ParamId::SynthRelease => {
                self.settings.envelope.release = value;
                Ok(())
            }

            ParamId::SaturationAmount => self.effects.saturation.set_amount(value, start),
            ParamId::SaturationTone => self.effects.saturation.set_tone(value, start),
            ParamId::SaturationDryWet => self.effects.saturation.set_dry_wet(value, start),

            ParamId::CompressionThreshold => {
                self.effects.compressor.set_threshold_db(value, start)
            }
            ParamId::CompressionRatio => self.effects.compressor.set_ratio(value, start),
            ParamId::CompressionAttack => self.effects.compressor.set_attack(value),
            ParamId::CompressionRelease => self.effects.compressor.set_release(value),
            ParamId::CompressionKnee => self.effects.compressor.set_knee_db(value, start),
            ParamId::CompressionDryWet => self.effects.compressor.set_dry_wet(value, start),

            ParamId::ReverbDecayTime => self.effects.reverb.set_decay_time(value, start),
            ParamId::ReverbRoomSize => self.effects.reverb.set_room_size(value, start),
            ParamId::ReverbPreDelay => self.effects.reverb.set_pre_delay(value, start),
            ParamId::ReverbTone => self.effects.reverb.set_tone_hz(value, start),
            ParamId::ReverbDryWet => self.effects.reverb.set_dry_wet(value, start),
        };

        if let Err(err) = result {
            // Unreachable through the controller, which validates first.
            log::warn!("rejected parameter change for {}: {err}", change.param);
        }
    }

    /// Pick the oscillator waveform stamped onto future voices. Part of
    /// host setup, not the realtime parameter surface.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.settings.waveform = waveform;
    }

    /// Handle for polling the compressor's gain reduction.
    pub fn compression_meter(&self) -> CompressionMeter {
        self.effects.compressor.meter()
    }

    pub fn active_voice_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// True while any live voice is bound to `note`.
    pub fn is_note_active(&self, note: u8) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|active| active.note == note)
    }

    /// Status of every live voice, for UIs and tests.
    pub fn voice_statuses(&self) -> Vec<VoiceStatus> {
        self.slots
            .iter()
            .flatten()
            .map(|active| VoiceStatus {
                note: active.note,
                phase: active.voice.phase(),
                envelope_level: active.voice.envelope_level(),
                is_playing: active.voice.is_playing(),
            })
            .collect()
    }

    /// The envelope template future triggers will use.
    pub fn voice_settings(&self) -> &VoiceSettings {
        &self.settings
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }
}
