//! Frame painters: live mirrored spectrum, paused pattern and overlays

use crate::config::RenderStyle;

use super::surface::{Rgba, Surface};

/// Upper bound on bars per half of the mirrored spectrum
pub const MAX_BARS: usize = 128;
/// Bars in the paused pattern
pub const STATIC_BARS: usize = 40;
/// Tallest bar relative to the surface height
pub const HEIGHT_SCALE: f64 = 0.8;
/// Gap between bars relative to the slot width
pub const BAR_SPACING: f64 = 0.2;

const PROGRESS_FILL: Rgba = Rgba::rgba(255, 255, 255, 0.5);
const POSITION_LINE: Rgba = Rgba::WHITE;
const POSITION_LINE_WIDTH: f64 = 2.0;
const HOVER_LINE: Rgba = Rgba::rgba(255, 255, 255, 0.7);
const HOVER_LINE_WIDTH: f64 = 1.0;

/// Playback position and pointer state drawn over the bars
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Overlay {
    pub current_time: f64,
    pub duration: f64,
    pub hover: Option<f64>,
}

/// Bars per half for a sample vector of `len` bins
pub fn bar_count(len: usize) -> usize {
    MAX_BARS.min(len / 2)
}

pub fn bar_height(sample: u8, surface_height: f64) -> f64 {
    sample as f64 / 255.0 * surface_height * HEIGHT_SCALE
}

/// Slots of bar `i` on the left and right halves
pub fn mirrored_slots(i: usize, bars: usize) -> (usize, usize) {
    (bars - i - 1, bars + i)
}

/// Paused pattern height of bar `i`; depends on the index alone
pub fn static_bar_height(i: usize, surface_height: f64) -> f64 {
    let level = (i as f64 * 0.5).sin() * 0.5 + 0.2;
    level.max(0.0) * surface_height * HEIGHT_SCALE
}

/// x of the position indicator, `None` while the duration is unknown
pub fn position_x(current_time: f64, duration: f64, width: f64) -> Option<f64> {
    if duration > 0.0 {
        Some((current_time / duration).clamp(0.0, 1.0) * width)
    } else {
        None
    }
}

fn begin_frame(surface: &mut impl Surface, style: &RenderStyle) {
    surface.clear();
    if let Some(background) = style.fill() {
        surface.fill_rect(0.0, 0.0, surface.width(), surface.height(), background);
    }
}

fn bar(surface: &mut impl Surface, slot: usize, slot_width: f64, height: f64, color: Rgba) {
    let drawn_width = slot_width - slot_width * BAR_SPACING;
    let surface_height = surface.height();
    surface.fill_rect(
        slot as f64 * slot_width,
        surface_height - height,
        drawn_width,
        height,
        color,
    );
}

fn paint_overlays(surface: &mut impl Surface, overlay: &Overlay) {
    let (width, height) = (surface.width(), surface.height());
    if let Some(x) = position_x(overlay.current_time, overlay.duration, width) {
        surface.fill_rect(0.0, 0.0, x, height, PROGRESS_FILL);
        surface.vertical_line(x, POSITION_LINE_WIDTH, POSITION_LINE);
    }
    if let Some(x) = overlay.hover {
        surface.vertical_line(x, HOVER_LINE_WIDTH, HOVER_LINE);
    }
}

/// Paint one live frame from analyser bins
pub fn paint_spectrum(
    surface: &mut impl Surface,
    samples: &[u8],
    style: &RenderStyle,
    overlay: &Overlay,
) {
    begin_frame(surface, style);

    let bars = bar_count(samples.len());
    if bars > 0 {
        let height = surface.height();
        // Right half starts at the right edge and is clipped by the surface
        let slot_width = surface.width() / bars as f64;
        for (i, &sample) in samples.iter().take(bars).enumerate() {
            let h = bar_height(sample, height);
            let (left, right) = mirrored_slots(i, bars);
            bar(surface, left, slot_width, h, style.color);
            bar(surface, right, slot_width, h, style.color);
        }
    }

    paint_overlays(surface, overlay);
}

/// Paint the paused pattern
pub fn paint_static(surface: &mut impl Surface, style: &RenderStyle, overlay: &Overlay) {
    begin_frame(surface, style);

    let height = surface.height();
    let slot_width = surface.width() / STATIC_BARS as f64;
    for i in 0..STATIC_BARS {
        bar(surface, i, slot_width, static_bar_height(i, height), style.color);
    }

    paint_overlays(surface, overlay);
}
