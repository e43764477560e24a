//! cpal-backed output sink.
//!
//! The engine itself is sink-agnostic: it renders mono blocks on demand.
//! This adapter connects a [`VoiceManager`] to the default output device and
//! fans the mono bus out across the device's channels. The returned
//! [`OutputStream`] owns the device callback; the caller keeps it alive for
//! as long as audio should run and simply drops it to stop. Build the
//! engine with [`default_output_sample_rate`] so the clock matches the
//! device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::synth::VoiceManager;
use crate::MAX_BLOCK_SIZE;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("no output device available")]
    NoDevice,
    #[error("querying stream config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),
    #[error("building stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("starting stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

/// A live connection from the engine to the output device.
pub struct OutputStream {
    _stream: cpal::Stream,
    sample_rate: f32,
    channels: u16,
}

impl OutputStream {
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Sample rate of the default output device, for building the engine.
pub fn default_output_sample_rate() -> Result<f32, OutputError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
    let config = device.default_output_config()?;
    Ok(config.sample_rate().0 as f32)
}

/// Attach `manager` to the default output device and start pulling blocks.
pub fn start(mut manager: VoiceManager) -> Result<OutputStream, OutputError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(OutputError::NoDevice)?;

    let supported = device.default_output_config()?;
    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(OutputError::UnsupportedFormat(supported.sample_format()));
    }
    let config: cpal::StreamConfig = supported.config();
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0 as f32;

    // Scratch for the mono bus, sized once; the callback never allocates.
    let mut mono = vec![0.0f32; MAX_BLOCK_SIZE];

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frames in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
                let frame_count = frames.len() / channels;
                let block = &mut mono[..frame_count];
                manager.render_block(block);
                for (frame, &sample) in frames.chunks_mut(channels).zip(block.iter()) {
                    frame.fill(sample);
                }
            }
        },
        |err| log::error!("output stream error: {err}"),
        None,
    )?;
    stream.play()?;

    Ok(OutputStream {
        _stream: stream,
        sample_rate,
        channels: config.channels,
    })
}
