//! Process-wide audio graph registry
//!
//! Maps each media handle to the single source/analyser pair wired for it,
//! and owns the one shared [`AudioContext`]. Both are created lazily and
//! live until the process exits: capturing a media element is irreversible,
//! so an entry is kept even after every visualizer showing it has unmounted.
//! A later remount, or another view of the same track, picks the existing
//! entry back up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::error::{VisualizerError, VisualizerResult};
use crate::media::{MediaElement, MediaHandle};

use super::analyser::{AnalyserNode, FFT_SIZE};
use super::context::{AudioContext, AudioHost, SourceNode};

/// Source, analyser and reusable byte buffer for one media handle
pub struct AudioGraphEntry {
    handle: MediaHandle,
    source: Arc<SourceNode>,
    analyser: Arc<AnalyserNode>,
    samples: Mutex<Vec<u8>>,
}

impl AudioGraphEntry {
    pub fn handle(&self) -> &MediaHandle {
        &self.handle
    }

    pub fn source(&self) -> &Arc<SourceNode> {
        &self.source
    }

    pub fn analyser(&self) -> &Arc<AnalyserNode> {
        &self.analyser
    }

    pub fn bin_count(&self) -> usize {
        self.analyser.frequency_bin_count()
    }

    /// Refresh the shared byte buffer from the analyser and lend it to `f`.
    ///
    /// Every reader of this entry shares the buffer; the slice is only valid
    /// until the next refresh.
    pub fn read_frequency_data<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let mut samples = lock_ignoring_poison(&self.samples);
        self.analyser.get_byte_frequency_data(&mut samples);
        f(&samples)
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct AudioGraphRegistry {
    host: Box<dyn AudioHost>,
    /// `None` once creation has failed; never retried
    context: OnceLock<Option<Arc<AudioContext>>>,
    entries: Mutex<HashMap<MediaHandle, Arc<AudioGraphEntry>>>,
}

static GLOBAL: OnceLock<Arc<AudioGraphRegistry>> = OnceLock::new();

impl AudioGraphRegistry {
    pub fn new(host: Box<dyn AudioHost>) -> Self {
        Self {
            host,
            context: OnceLock::new(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Install the process-wide registry. The first call wins; later calls
    /// return the registry that is already installed.
    pub fn install_global(host: Box<dyn AudioHost>) -> Arc<AudioGraphRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(AudioGraphRegistry::new(host))))
    }

    pub fn global() -> Option<Arc<AudioGraphRegistry>> {
        GLOBAL.get().cloned()
    }

    /// The shared context, created on first use
    pub fn context(&self) -> VisualizerResult<Arc<AudioContext>> {
        let context = self.context.get_or_init(|| match self.host.create_context() {
            Ok(context) => {
                log::info!(
                    "Audio context created at {} Hz",
                    context.sample_rate()
                );
                Some(Arc::new(context))
            }
            Err(e) => {
                log::warn!("Audio context unavailable: {}", e);
                None
            }
        });
        context.clone().ok_or_else(|| {
            VisualizerError::EnvironmentUnsupported("audio context creation failed".to_string())
        })
    }

    /// Return the entry for `handle`, wiring `element` into the graph the
    /// first time the handle is seen.
    pub fn get_or_create_entry(
        &self,
        handle: &MediaHandle,
        element: Option<&Arc<dyn MediaElement>>,
    ) -> VisualizerResult<Arc<AudioGraphEntry>> {
        // Held across check-and-create so one handle never gets two sources
        let mut entries = lock_ignoring_poison(&self.entries);
        if let Some(entry) = entries.get(handle) {
            return Ok(Arc::clone(entry));
        }

        let element = element.ok_or_else(|| VisualizerError::ResourceUnavailable(handle.clone()))?;
        let context = self.context()?;

        // Analyser first: a failed capture cannot be undone
        let analyser = context.create_analyser(FFT_SIZE)?;
        let source = context.create_media_source(handle, element)?;
        context
            .destination()
            .route(Arc::clone(&source), Arc::clone(&analyser));

        let entry = Arc::new(AudioGraphEntry {
            handle: handle.clone(),
            samples: Mutex::new(vec![0; analyser.frequency_bin_count()]),
            source,
            analyser,
        });
        entries.insert(handle.clone(), Arc::clone(&entry));
        log::debug!("Audio graph entry created for {}", handle);
        Ok(entry)
    }

    pub fn entry(&self, handle: &MediaHandle) -> Option<Arc<AudioGraphEntry>> {
        lock_ignoring_poison(&self.entries).get(handle).cloned()
    }

    pub fn len(&self) -> usize {
        lock_ignoring_poison(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::context::{OfflineHost, UnsupportedHost};
    use crate::synth::{SynthTrack, TrackRecipe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct CountingHost {
        calls: Arc<AtomicUsize>,
        supported: bool,
    }

    impl AudioHost for CountingHost {
        fn create_context(&self) -> VisualizerResult<AudioContext> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.supported {
                OfflineHost::new(8000).create_context()
            } else {
                UnsupportedHost.create_context()
            }
        }
    }

    fn counting(supported: bool) -> (AudioGraphRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let host = CountingHost {
            calls: Arc::clone(&calls),
            supported,
        };
        (AudioGraphRegistry::new(Box::new(host)), calls)
    }

    fn element() -> Arc<dyn MediaElement> {
        Arc::new(SynthTrack::new(TrackRecipe::default()))
    }

    #[test]
    fn test_same_handle_yields_same_entry() {
        let registry = AudioGraphRegistry::new(Box::new(OfflineHost::new(8000)));
        let handle = MediaHandle::from("audio-1");
        let track = element();

        let first = registry.get_or_create_entry(&handle, Some(&track)).unwrap();
        let second = registry.get_or_create_entry(&handle, Some(&track)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(first.bin_count(), 128);
    }

    #[test]
    fn test_existing_entry_needs_no_element() {
        let registry = AudioGraphRegistry::new(Box::new(OfflineHost::new(8000)));
        let handle = MediaHandle::from("audio-1");
        let created = registry.get_or_create_entry(&handle, Some(&element())).unwrap();
        let again = registry.get_or_create_entry(&handle, None).unwrap();
        assert!(Arc::ptr_eq(&created, &again));
    }

    #[test]
    fn test_missing_element_is_unavailable() {
        let registry = AudioGraphRegistry::new(Box::new(OfflineHost::new(8000)));
        let result = registry.get_or_create_entry(&MediaHandle::from("track-9"), None);
        assert!(matches!(result, Err(VisualizerError::ResourceUnavailable(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_creation_yields_one_entry() {
        let (registry, calls) = counting(true);
        let registry = Arc::new(registry);
        let handle = MediaHandle::from("track-9");
        let track = element();

        let workers: Vec<_> = (0..2)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let handle = handle.clone();
                let track = Arc::clone(&track);
                thread::spawn(move || registry.get_or_create_entry(&handle, Some(&track)).unwrap())
            })
            .collect();
        let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        assert!(Arc::ptr_eq(&results[0], &results[1]));
        assert_eq!(registry.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.context().unwrap().destination().route_count(), 1);
    }

    #[test]
    fn test_context_created_once() {
        let (registry, calls) = counting(true);
        for id in ["a", "b", "c"] {
            registry
                .get_or_create_entry(&MediaHandle::from(id), Some(&element()))
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_unsupported_host_is_not_retried() {
        let (registry, calls) = counting(false);
        for _ in 0..3 {
            let result = registry.get_or_create_entry(&MediaHandle::from("a"), Some(&element()));
            assert!(matches!(
                result,
                Err(VisualizerError::EnvironmentUnsupported(_))
            ));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_element_shared_by_two_handles_is_rejected() {
        let registry = AudioGraphRegistry::new(Box::new(OfflineHost::new(8000)));
        let track = element();
        registry
            .get_or_create_entry(&MediaHandle::from("audio-1"), Some(&track))
            .unwrap();
        let result = registry.get_or_create_entry(&MediaHandle::from("alias"), Some(&track));
        assert!(matches!(result, Err(VisualizerError::DuplicateConnection(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_analyser_failure_leaves_element_free() {
        let mut host = OfflineHost::new(8000);
        host.analyser.smoothing = 1.0;
        let registry = AudioGraphRegistry::new(Box::new(host));
        let handle = MediaHandle::from("audio-1");
        let track = element();

        for _ in 0..2 {
            let result = registry.get_or_create_entry(&handle, Some(&track));
            assert!(matches!(result, Err(VisualizerError::InvalidAnalyser(_))));
        }
        assert!(registry.is_empty());
        assert_eq!(registry.context().unwrap().destination().route_count(), 0);
    }

    #[test]
    fn test_frequency_data_follows_playback() {
        let registry = AudioGraphRegistry::new(Box::new(OfflineHost::new(8000)));
        let track = element();
        let entry = registry
            .get_or_create_entry(&MediaHandle::from("audio-1"), Some(&track))
            .unwrap();

        assert!(entry.read_frequency_data(|bins| bins.iter().all(|&b| b == 0)));

        track.play().unwrap();
        let mut block = vec![0.0f32; 1024];
        registry.context().unwrap().destination().render(&mut block);
        let loud = entry.read_frequency_data(|bins| bins.iter().filter(|&&b| b > 0).count());
        assert!(loud > 0);
    }

    #[test]
    fn test_global_registry_installs_once() {
        let first = AudioGraphRegistry::install_global(Box::new(OfflineHost::new(8000)));
        let second = AudioGraphRegistry::install_global(Box::new(UnsupportedHost));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &AudioGraphRegistry::global().unwrap()));
    }
}
