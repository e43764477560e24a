// Purpose - external interfaces: the audio output sink.

pub mod output;

pub use output::{default_output_sample_rate, start, OutputError, OutputStream};
