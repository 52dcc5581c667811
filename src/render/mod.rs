use ratatui::{layout::Rect, Frame};

pub mod paint;
pub mod raster;
pub mod scheduler;
pub mod surface;
pub mod visualizer;

pub use raster::Raster;
pub use scheduler::{FrameScheduler, FrameStepper, FrameToken};
pub use surface::{DrawCommand, DrawList, Rgba, Surface};
pub use visualizer::{SeekCallback, WaveformVisualizer};

/// Present a visualizer's latest frame in a terminal area
pub fn draw_visualizer(f: &mut Frame, area: Rect, visualizer: &WaveformVisualizer, base: Rgba) {
    let raster = Raster::from_draw_list(visualizer.surface(), base);
    f.render_widget(&raster, area);
}
