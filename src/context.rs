//! Explicit audio context: sample rate plus the engine's sample clock.
//!
//! The context is created once at startup and handed to the voice manager by
//! value; there is no process-wide singleton. The render thread is the only
//! writer of the clock (it advances once per block); the control thread reads
//! it to timestamp parameter changes. One atomic, one writer, many readers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AudioContext {
    sample_rate: f32,
    frames: Arc<AtomicU64>,
}

impl AudioContext {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current engine time in seconds, derived from frames rendered so far.
    pub fn now(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    /// Advance the clock. Called by the render thread only, once per block.
    pub(crate) fn advance(&self, frames: usize) {
        self.frames.fetch_add(frames as u64, Ordering::AcqRel);
    }
}

/// Per-block rendering context: where in time this block starts.
///
/// Sample `i` of the block sits at `time + i / sample_rate`.
pub struct RenderCtx {
    pub sample_rate: f32,
    pub time: f64,
}

impl RenderCtx {
    pub fn new(sample_rate: f32, time: f64) -> Self {
        Self { sample_rate, time }
    }

    /// Time of sample `i` within this block, in seconds.
    #[inline]
    pub fn sample_time(&self, i: usize) -> f64 {
        self.time + i as f64 / self.sample_rate as f64
    }
}
