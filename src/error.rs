//! Error types for the visualizer core

use thiserror::Error;

use crate::media::MediaHandle;

/// Errors raised while wiring or driving a waveform visualizer.
///
/// None of these are fatal to playback: the render loop logs them and
/// degrades to a static surface.
#[derive(Error, Debug)]
pub enum VisualizerError {
    /// The host cannot provide audio graph primitives
    #[error("Audio graph is not supported on this host: {0}")]
    EnvironmentUnsupported(String),

    /// No media element could be resolved for the handle
    #[error("Media element not available: {0}")]
    ResourceUnavailable(MediaHandle),

    /// The media element already feeds a source node
    #[error("Media element {0} is already connected to the audio graph")]
    DuplicateConnection(MediaHandle),

    /// A play command was rejected by the media element
    #[error("Playback command failed: {0}")]
    PlaybackCommand(String),

    /// Analyser settings out of range
    #[error("Invalid analyser configuration: {0}")]
    InvalidAnalyser(String),

    /// Color string that could not be parsed
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

/// Result type for visualizer operations
pub type VisualizerResult<T> = Result<T, VisualizerError>;
