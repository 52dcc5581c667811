//! Pointer handling over a visualizer surface
//!
//! Pure geometry: pointer coordinates in, seek time and hover offset out.
//! The visualizer applies the results to its own state.

/// Where the surface sits in pointer coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SurfaceLayout {
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceLayout {
    pub fn new(left: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            width,
            height,
        }
    }
}

/// Per-instance playback and pointer state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VisualizerState {
    pub current_time: f64,
    pub duration: f64,
    pub is_hovering: bool,
    pub hover_position_px: f64,
}

impl VisualizerState {
    /// Hover line position when the pointer is over the surface
    pub fn hover(&self) -> Option<f64> {
        self.is_hovering.then_some(self.hover_position_px)
    }
}

/// Pointer x relative to the surface's left edge
pub fn hover_offset(x: f64, layout: &SurfaceLayout) -> f64 {
    x - layout.left
}

/// Fraction of the surface width left of `x`, clamped to [0, 1]
pub fn seek_fraction(x: f64, layout: &SurfaceLayout) -> f64 {
    if layout.width <= 0.0 {
        return 0.0;
    }
    (hover_offset(x, layout) / layout.width).clamp(0.0, 1.0)
}

/// Playback time under the pointer, `None` while the duration is unknown
pub fn seek_time(x: f64, layout: &SurfaceLayout, duration: f64) -> Option<f64> {
    if duration > 0.0 && layout.width > 0.0 {
        Some(seek_fraction(x, layout) * duration)
    } else {
        None
    }
}
