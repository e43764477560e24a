pub mod automation; // Scheduled parameter ramps (click-free mutation)
pub mod context;
pub mod dsp;
pub mod effects; // Saturation, compression, reverb bus
pub mod error;
#[cfg(feature = "output")]
pub mod io;
pub mod params;
pub mod preset;
pub mod synth; // Voice management and polyphony

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;

pub use error::SynthError;
pub use synth::{EngineConfig, SynthController, VoiceManager};
