//! Media element seams
//!
//! The surrounding list UI owns the playable elements. The visualizer core
//! only ever sees them through [`MediaElement`], resolved once by the
//! collaborator and passed in.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::VisualizerResult;

/// Stable identifier of a playable media element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaHandle(String);

impl MediaHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Handle of the audio element rendered for a catalog track
    pub fn for_track(track_id: &str) -> Self {
        Self(format!("audio-{}", track_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Lifecycle notifications queued by a media element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Play,
    Pause,
    Ended,
    TimeUpdate,
    LoadedMetadata,
}

/// A playable media resource.
///
/// `render` is called from the audio thread once the element is wired into
/// the audio graph; everything else from the UI thread.
pub trait MediaElement: Send + Sync {
    /// Playback position in seconds
    fn current_time(&self) -> f64;

    /// Total length in seconds, 0 when unknown
    fn duration(&self) -> f64;

    /// Move the playback position
    fn set_current_time(&self, seconds: f64);

    fn is_paused(&self) -> bool;

    /// Start or resume playback
    fn play(&self) -> VisualizerResult<()>;

    fn pause(&self);

    /// Produce the next block of mono samples, advancing playback.
    /// Paused elements write silence.
    fn render(&self, out: &mut [f32], sample_rate: u32);

    /// Take the events queued since the last call
    fn drain_events(&self) -> Vec<MediaEvent> {
        Vec::new()
    }
}

/// Duration as reported to the visualizer: unknown or infinite becomes 0
pub fn known_duration(element: &dyn MediaElement) -> f64 {
    let duration = element.duration();
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

/// Resolves handles to the elements the list currently renders
pub trait MediaResolver {
    fn resolve(&self, handle: &MediaHandle) -> Option<Arc<dyn MediaElement>>;
}

/// In-memory set of media elements keyed by handle
#[derive(Default)]
pub struct MediaLibrary {
    elements: HashMap<MediaHandle, Arc<dyn MediaElement>>,
    order: Vec<MediaHandle>,
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: MediaHandle, element: Arc<dyn MediaElement>) {
        if self.elements.insert(handle.clone(), element).is_none() {
            self.order.push(handle);
        }
    }

    /// Handles in insertion order
    pub fn handles(&self) -> &[MediaHandle] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl MediaResolver for MediaLibrary {
    fn resolve(&self, handle: &MediaHandle) -> Option<Arc<dyn MediaElement>> {
        self.elements.get(handle).cloned()
    }
}
