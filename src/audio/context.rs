//! Shared audio context: source nodes, routing and the output destination

use std::sync::{Arc, Mutex};

use crate::config::AnalyserConfig;
use crate::error::{VisualizerError, VisualizerResult};
use crate::media::{MediaElement, MediaHandle};

use super::analyser::AnalyserNode;

/// Provider of audio graph primitives
pub trait AudioHost: Send + Sync {
    fn create_context(&self) -> VisualizerResult<AudioContext>;
}

/// Host whose destination is pulled by the caller instead of a device
pub struct OfflineHost {
    pub sample_rate: u32,
    pub analyser: AnalyserConfig,
}

impl OfflineHost {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            analyser: AnalyserConfig::default(),
        }
    }
}

impl AudioHost for OfflineHost {
    fn create_context(&self) -> VisualizerResult<AudioContext> {
        Ok(AudioContext::new(self.sample_rate, self.analyser.clone()))
    }
}

/// Host without any audio support
pub struct UnsupportedHost;

impl AudioHost for UnsupportedHost {
    fn create_context(&self) -> VisualizerResult<AudioContext> {
        Err(VisualizerError::EnvironmentUnsupported(
            "no audio graph available".to_string(),
        ))
    }
}

/// A media element captured as a graph input
pub struct SourceNode {
    handle: MediaHandle,
    element: Arc<dyn MediaElement>,
}

impl SourceNode {
    pub fn handle(&self) -> &MediaHandle {
        &self.handle
    }

    pub fn element(&self) -> &Arc<dyn MediaElement> {
        &self.element
    }
}

struct Route {
    source: Arc<SourceNode>,
    analyser: Arc<AnalyserNode>,
}

struct Mix {
    routes: Vec<Route>,
    scratch: Vec<f32>,
}

/// Final sink of the graph. Every routed source is rendered through its
/// analyser and summed into the output block.
pub struct Destination {
    sample_rate: u32,
    mix: Mutex<Mix>,
}

impl Destination {
    fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            mix: Mutex::new(Mix {
                routes: Vec::new(),
                scratch: Vec::new(),
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Connect source -> analyser -> destination
    pub fn route(&self, source: Arc<SourceNode>, analyser: Arc<AnalyserNode>) {
        if let Ok(mut mix) = self.mix.lock() {
            mix.routes.push(Route { source, analyser });
        }
    }

    pub fn route_count(&self) -> usize {
        self.mix.lock().map(|m| m.routes.len()).unwrap_or(0)
    }

    /// Render the next mono block
    pub fn render(&self, out: &mut [f32]) {
        out.fill(0.0);
        let Ok(mut mix) = self.mix.lock() else {
            return;
        };
        let Mix { routes, scratch } = &mut *mix;
        scratch.resize(out.len(), 0.0);

        for route in routes.iter() {
            route.source.element.render(scratch, self.sample_rate);
            route.analyser.push_samples(scratch);
            for (o, s) in out.iter_mut().zip(scratch.iter()) {
                *o += *s;
            }
        }

        for o in out.iter_mut() {
            *o = o.clamp(-1.0, 1.0);
        }
    }
}

pub struct AudioContext {
    sample_rate: u32,
    analyser_config: AnalyserConfig,
    destination: Arc<Destination>,
    /// Elements already captured by a source node
    captured: Mutex<Vec<Arc<dyn MediaElement>>>,
}

impl AudioContext {
    pub fn new(sample_rate: u32, analyser_config: AnalyserConfig) -> Self {
        Self {
            sample_rate,
            analyser_config,
            destination: Arc::new(Destination::new(sample_rate)),
            captured: Mutex::new(Vec::new()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn destination(&self) -> &Arc<Destination> {
        &self.destination
    }

    /// Capture `element` as a source. An element can only ever be captured
    /// once per context.
    pub fn create_media_source(
        &self,
        handle: &MediaHandle,
        element: &Arc<dyn MediaElement>,
    ) -> VisualizerResult<Arc<SourceNode>> {
        let mut captured = self
            .captured
            .lock()
            .map_err(|_| VisualizerError::EnvironmentUnsupported("context poisoned".to_string()))?;
        if captured.iter().any(|c| Arc::ptr_eq(c, element)) {
            return Err(VisualizerError::DuplicateConnection(handle.clone()));
        }
        captured.push(Arc::clone(element));

        Ok(Arc::new(SourceNode {
            handle: handle.clone(),
            element: Arc::clone(element),
        }))
    }

    pub fn create_analyser(&self, fft_size: usize) -> VisualizerResult<Arc<AnalyserNode>> {
        AnalyserNode::new(fft_size, &self.analyser_config).map(Arc::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analyser::FFT_SIZE;
    use crate::synth::{SynthTrack, TrackRecipe};

    fn element() -> Arc<dyn MediaElement> {
        Arc::new(SynthTrack::new(TrackRecipe::default()))
    }

    #[test]
    fn test_unsupported_host() {
        assert!(matches!(
            UnsupportedHost.create_context(),
            Err(VisualizerError::EnvironmentUnsupported(_))
        ));
    }

    #[test]
    fn test_second_source_for_element_fails() {
        let context = OfflineHost::new(8000).create_context().unwrap();
        let track = element();
        let handle = MediaHandle::from("audio-1");

        assert!(context.create_media_source(&handle, &track).is_ok());
        assert!(matches!(
            context.create_media_source(&MediaHandle::from("alias"), &track),
            Err(VisualizerError::DuplicateConnection(h)) if h.as_str() == "alias"
        ));
        assert!(context.create_media_source(&handle, &element()).is_ok());
    }

    #[test]
    fn test_routed_source_feeds_analyser_and_output() {
        let context = OfflineHost::new(8000).create_context().unwrap();
        let track = element();
        let source = context
            .create_media_source(&MediaHandle::from("audio-1"), &track)
            .unwrap();
        let analyser = context.create_analyser(FFT_SIZE).unwrap();
        context.destination().route(source, Arc::clone(&analyser));

        track.play().unwrap();
        let mut block = vec![0.0f32; 512];
        context.destination().render(&mut block);
        assert!(block.iter().any(|&s| s != 0.0));
        assert!(block.iter().all(|s| (-1.0..=1.0).contains(s)));

        let mut bins = vec![0u8; analyser.frequency_bin_count()];
        analyser.get_byte_frequency_data(&mut bins);
        assert!(bins.iter().any(|&b| b > 0));
    }

    #[test]
    fn test_paused_source_renders_silence() {
        let context = OfflineHost::new(8000).create_context().unwrap();
        let track = element();
        let source = context
            .create_media_source(&MediaHandle::from("audio-1"), &track)
            .unwrap();
        let analyser = context.create_analyser(FFT_SIZE).unwrap();
        context.destination().route(source, analyser);

        let mut block = vec![1.0f32; 256];
        context.destination().render(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));
        assert_eq!(context.destination().route_count(), 1);
    }
}
