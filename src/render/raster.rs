//! Software rasterizer for recorded frames, plus a ratatui widget that shows
//! the pixels with half-block cells (two pixel rows per terminal row).

use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

use super::surface::{DrawCommand, DrawList, Rgba, Surface};

/// Opaque RGB pixels, row-major
#[derive(Debug, Clone)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<[f32; 3]>,
}

fn channels(color: Rgba) -> [f32; 3] {
    [color.r as f32, color.g as f32, color.b as f32]
}

/// Overlap of [a0, a1) with the unit cell starting at `cell`
fn coverage(a0: f64, a1: f64, cell: usize) -> f64 {
    let lo = a0.max(cell as f64);
    let hi = a1.min(cell as f64 + 1.0);
    (hi - lo).max(0.0)
}

impl Raster {
    pub fn new(width: usize, height: usize, base: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![channels(base); width * height],
        }
    }

    /// Rasterize `list` over an opaque `base` color
    pub fn from_draw_list(list: &DrawList, base: Rgba) -> Self {
        let mut raster = Self::new(
            list.width().ceil() as usize,
            list.height().ceil() as usize,
            base,
        );
        for command in list.commands() {
            match *command {
                DrawCommand::FillRect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => raster.fill_rect(x, y, width, height, color),
                DrawCommand::VerticalLine {
                    x,
                    line_width,
                    color,
                } => {
                    let h = raster.height as f64;
                    raster.fill_rect(x - line_width / 2.0, 0.0, line_width, h, color)
                }
            }
        }
        raster
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let [r, g, b] = self.pixels[y * self.width + x];
        Some([r.round() as u8, g.round() as u8, b.round() as u8])
    }

    /// Blend `color` over the rectangle, weighting partly covered pixels by
    /// their covered area
    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let (x1, y1) = (x + width, y + height);
        let col_start = x.floor().max(0.0) as usize;
        let col_end = (x1.ceil().max(0.0) as usize).min(self.width);
        let row_start = y.floor().max(0.0) as usize;
        let row_end = (y1.ceil().max(0.0) as usize).min(self.height);
        let src = channels(color);

        for row in row_start..row_end {
            let cover_y = coverage(y, y1, row);
            for col in col_start..col_end {
                let alpha = (coverage(x, x1, col) * cover_y) as f32 * color.a;
                if alpha <= 0.0 {
                    continue;
                }
                let pixel = &mut self.pixels[row * self.width + col];
                for (dst, s) in pixel.iter_mut().zip(src.iter()) {
                    *dst = s * alpha + *dst * (1.0 - alpha);
                }
            }
        }
    }
}

impl Widget for &Raster {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rgb = |p: Option<[u8; 3]>| p.map(|[r, g, b]| Color::Rgb(r, g, b));
        for row in 0..area.height {
            for col in 0..area.width {
                let (x, top) = (col as usize, row as usize * 2);
                let Some(upper) = rgb(self.pixel(x, top)) else {
                    continue;
                };
                let lower = rgb(self.pixel(x, top + 1));
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_char('▀').set_fg(upper);
                    if let Some(lower) = lower {
                        cell.set_bg(lower);
                    }
                }
            }
        }
    }
}
