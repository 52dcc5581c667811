//! Track list playback policy
//!
//! At most one track is active. Starting another track pauses the active one,
//! seeking an inactive track starts it, and a rejected play command leaves the
//! list showing the track as paused.

use crate::media::{MediaEvent, MediaHandle, MediaResolver};

#[derive(Debug, Default)]
pub struct PlaybackCoordinator {
    active: Option<MediaHandle>,
    playing: bool,
}

impl PlaybackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track that currently owns playback, playing or paused
    pub fn active(&self) -> Option<&MediaHandle> {
        self.active.as_ref()
    }

    /// Whether `handle` is the active track and playing
    pub fn is_playing(&self, handle: &MediaHandle) -> bool {
        self.playing && self.active.as_ref() == Some(handle)
    }

    /// Play/pause button of a list row
    pub fn toggle(&mut self, handle: &MediaHandle, media: &dyn MediaResolver) {
        if self.active.as_ref() == Some(handle) {
            if self.playing {
                if let Some(element) = media.resolve(handle) {
                    element.pause();
                }
                self.playing = false;
            } else {
                self.start(handle, media);
            }
            return;
        }

        self.pause_active(media);
        self.active = Some(handle.clone());
        self.start(handle, media);
    }

    /// A visualizer moved `handle` to `time`; an inactive track starts
    /// playing from there.
    pub fn seek(&mut self, handle: &MediaHandle, time: f64, media: &dyn MediaResolver) {
        let Some(element) = media.resolve(handle) else {
            log::warn!("Seek on {} ignored: no media element", handle);
            return;
        };
        element.set_current_time(time);

        if self.active.as_ref() != Some(handle) {
            self.pause_active(media);
            self.active = Some(handle.clone());
            self.start(handle, media);
        }
    }

    /// Follow lifecycle events of the elements
    pub fn handle_event(&mut self, handle: &MediaHandle, event: MediaEvent) {
        if self.active.as_ref() != Some(handle) {
            return;
        }
        match event {
            MediaEvent::Ended | MediaEvent::Pause => self.playing = false,
            MediaEvent::Play => self.playing = true,
            MediaEvent::TimeUpdate | MediaEvent::LoadedMetadata => {}
        }
    }

    fn pause_active(&mut self, media: &dyn MediaResolver) {
        if let Some(previous) = self.active.take() {
            if let Some(element) = media.resolve(&previous) {
                element.pause();
            }
        }
        self.playing = false;
    }

    fn start(&mut self, handle: &MediaHandle, media: &dyn MediaResolver) {
        let Some(element) = media.resolve(handle) else {
            log::error!("Error playing audio: no media element for {}", handle);
            self.playing = false;
            return;
        };
        match element.play() {
            Ok(()) => self.playing = true,
            Err(e) => {
                log::error!("Error playing audio {}: {}", handle, e);
                self.playing = false;
            }
        }
    }
}
