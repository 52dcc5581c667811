//! Real-time waveform visualization for a list of playable tracks.
//!
//! Each list item gets a [`render::WaveformVisualizer`] fed by a process-wide
//! [`audio::AudioGraphRegistry`], so any number of views of one track share a
//! single analyser.

pub mod audio;
pub mod config;
pub mod error;
pub mod interaction;
pub mod media;
pub mod playback;
pub mod render;
pub mod synth;

pub use error::{VisualizerError, VisualizerResult};
