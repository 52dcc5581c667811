//! Per-item waveform visualizer
//!
//! Two states: Static (paused pattern, repainted on demand) and Animating (one
//! frame per scheduler tick, each pulling fresh analyser data). The audio
//! graph entry is shared through the registry and outlives the visualizer.

use std::rc::Rc;
use std::sync::Arc;

use crate::audio::{AudioGraphEntry, AudioGraphRegistry};
use crate::config::RenderStyle;
use crate::interaction::{self, SurfaceLayout, VisualizerState};
use crate::media::{known_duration, MediaElement, MediaEvent, MediaHandle};

use super::paint::{self, Overlay};
use super::scheduler::{FrameScheduler, FrameToken};
use super::surface::DrawList;

/// Callback told where the user seeked to, in seconds
pub type SeekCallback = Box<dyn FnMut(f64)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Static,
    Animating(FrameToken),
    Unmounted,
}

pub struct WaveformVisualizer {
    handle: MediaHandle,
    element: Option<Arc<dyn MediaElement>>,
    entry: Option<Arc<AudioGraphEntry>>,
    scheduler: Rc<dyn FrameScheduler>,
    style: RenderStyle,
    layout: SurfaceLayout,
    surface: DrawList,
    state: VisualizerState,
    loop_state: LoopState,
    on_seek: Option<SeekCallback>,
}

impl WaveformVisualizer {
    /// Mount a visualizer for `handle`. `element` is the media element the
    /// list resolved for the handle, if any.
    pub fn mount(
        handle: MediaHandle,
        element: Option<Arc<dyn MediaElement>>,
        registry: &AudioGraphRegistry,
        scheduler: Rc<dyn FrameScheduler>,
        style: RenderStyle,
    ) -> Self {
        let entry = match registry.get_or_create_entry(&handle, element.as_ref()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Visualization unavailable for {}: {}", handle, e);
                None
            }
        };

        let layout = SurfaceLayout::new(0.0, 0.0, style.height);
        let mut visualizer = Self {
            handle,
            element,
            entry,
            scheduler,
            surface: DrawList::new(layout.width, layout.height),
            layout,
            style,
            state: VisualizerState::default(),
            loop_state: LoopState::Static,
            on_seek: None,
        };
        visualizer.sync_time();
        visualizer.paint_static();
        visualizer
    }

    pub fn with_seek_callback(mut self, on_seek: SeekCallback) -> Self {
        self.on_seek = Some(on_seek);
        self
    }

    pub fn handle(&self) -> &MediaHandle {
        &self.handle
    }

    pub fn state(&self) -> &VisualizerState {
        &self.state
    }

    /// Latest painted frame
    pub fn surface(&self) -> &DrawList {
        &self.surface
    }

    pub fn layout(&self) -> &SurfaceLayout {
        &self.layout
    }

    /// Whether live audio data backs this visualizer
    pub fn is_available(&self) -> bool {
        self.entry.is_some()
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.loop_state, LoopState::Animating(_))
    }

    pub fn set_playing(&mut self, playing: bool) {
        match (self.loop_state, playing) {
            (LoopState::Static, true) if self.entry.is_some() => {
                let token = self.scheduler.request_frame();
                self.loop_state = LoopState::Animating(token);
            }
            (LoopState::Animating(token), false) => {
                self.scheduler.cancel_frame(token);
                self.loop_state = LoopState::Static;
                self.paint_static();
            }
            _ => {}
        }
    }

    /// Deliver a due frame; tokens this visualizer is not waiting on are
    /// ignored.
    pub fn on_frame(&mut self, token: FrameToken) {
        if self.loop_state != LoopState::Animating(token) {
            return;
        }
        self.paint_animated();
        self.loop_state = LoopState::Animating(self.scheduler.request_frame());
    }

    pub fn on_media_event(&mut self, event: MediaEvent) {
        log::trace!("{}: {:?}", self.handle, event);
        self.sync_time();
        self.repaint_if_static();
    }

    /// Resize observer: follow the container's layout
    pub fn observe_layout(&mut self, layout: SurfaceLayout) {
        let height = if layout.height > 0.0 {
            layout.height
        } else {
            self.style.height
        };
        let layout = SurfaceLayout { height, ..layout };
        if layout == self.layout {
            return;
        }
        self.layout = layout;
        self.surface.resize(layout.width, layout.height);
        self.repaint_if_static();
    }

    pub fn pointer_enter(&mut self) {
        self.state.is_hovering = true;
        self.repaint_if_static();
    }

    pub fn pointer_leave(&mut self) {
        self.state.is_hovering = false;
        self.repaint_if_static();
    }

    pub fn pointer_move(&mut self, x: f64) {
        self.state.hover_position_px = interaction::hover_offset(x, &self.layout);
        if self.state.is_hovering {
            self.repaint_if_static();
        }
    }

    /// Seek to the time under the pointer. Returns the new position, or
    /// `None` while the duration is unknown.
    pub fn pointer_click(&mut self, x: f64) -> Option<f64> {
        let element = self.element.as_ref()?;
        let seek_time = interaction::seek_time(x, &self.layout, self.state.duration)?;

        element.set_current_time(seek_time);
        self.state.current_time = seek_time;
        if let Some(on_seek) = self.on_seek.as_mut() {
            on_seek(seek_time);
        }
        self.repaint_if_static();
        Some(seek_time)
    }

    /// Stop this instance's loop, leaving a static frame behind. The shared
    /// graph entry stays registered.
    pub fn unmount(&mut self) {
        if let LoopState::Animating(token) = self.loop_state {
            self.scheduler.cancel_frame(token);
            self.paint_static();
        }
        self.loop_state = LoopState::Unmounted;
    }

    fn sync_time(&mut self) {
        if let Some(element) = &self.element {
            self.state.current_time = element.current_time();
            self.state.duration = known_duration(element.as_ref());
        }
    }

    fn overlay(&self) -> Overlay {
        Overlay {
            current_time: self.state.current_time,
            duration: self.state.duration,
            hover: self.state.hover(),
        }
    }

    fn repaint_if_static(&mut self) {
        if self.loop_state == LoopState::Static {
            self.paint_static();
        }
    }

    fn paint_static(&mut self) {
        let overlay = self.overlay();
        paint::paint_static(&mut self.surface, &self.style, &overlay);
    }

    fn paint_animated(&mut self) {
        let overlay = self.overlay();
        let Some(entry) = self.entry.as_ref() else {
            paint::paint_static(&mut self.surface, &self.style, &overlay);
            return;
        };
        let surface = &mut self.surface;
        let style = &self.style;
        entry.read_frequency_data(|samples| {
            paint::paint_spectrum(surface, samples, style, &overlay);
        });
    }
}

impl Drop for WaveformVisualizer {
    fn drop(&mut self) {
        self.unmount();
    }
}
