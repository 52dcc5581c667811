//! Drawing surface abstraction and the recording surface used by hosts

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VisualizerError;

/// Straight-alpha RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in [0, 1]
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const TRANSPARENT: Rgba = Rgba::rgba(0, 0, 0, 0.0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba::rgba(
            byte(0)?,
            byte(2)?,
            byte(4)?,
            byte(6)? as f32 / 255.0,
        )),
        _ => None,
    }
}

fn parse_functional(body: &str, with_alpha: bool) -> Option<Rgba> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }
    let channel = |s: &str| s.parse::<u8>().ok();
    let a = if with_alpha {
        let a = parts[3].parse::<f32>().ok()?;
        if !(0.0..=1.0).contains(&a) {
            return None;
        }
        a
    } else {
        1.0
    };
    Some(Rgba::rgba(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        a,
    ))
}

impl FromStr for Rgba {
    type Err = VisualizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        let parsed = if text == "transparent" {
            Some(Rgba::TRANSPARENT)
        } else if let Some(hex) = text.strip_prefix('#') {
            parse_hex(hex)
        } else if let Some(body) = text.strip_prefix("rgba(").and_then(|b| b.strip_suffix(')')) {
            parse_functional(body, true)
        } else if let Some(body) = text.strip_prefix("rgb(").and_then(|b| b.strip_suffix(')')) {
            parse_functional(body, false)
        } else {
            None
        };
        parsed.ok_or_else(|| VisualizerError::InvalidColor(s.to_string()))
    }
}

impl TryFrom<String> for Rgba {
    type Error = VisualizerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

/// Something the render loop can paint on. Coordinates are pixels with the
/// origin at the top-left corner.
pub trait Surface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;

    /// Erase everything; starts a new frame
    fn clear(&mut self);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba);

    /// Full-height line centered on `x`
    fn vertical_line(&mut self, x: f64, line_width: f64, color: Rgba);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Rgba,
    },
    VerticalLine {
        x: f64,
        line_width: f64,
        color: Rgba,
    },
}

/// Recording surface holding the commands of the most recent frame
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    width: f64,
    height: f64,
    commands: Vec<DrawCommand>,
    frames: u64,
}

impl DrawList {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Change the pixel size; drops whatever was drawn
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.commands.clear();
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of frames started with `clear`
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Filled rectangles of the current frame
    pub fn rects(&self) -> impl Iterator<Item = (f64, f64, f64, f64, Rgba)> + '_ {
        self.commands.iter().filter_map(|c| match *c {
            DrawCommand::FillRect {
                x,
                y,
                width,
                height,
                color,
            } => Some((x, y, width, height, color)),
            _ => None,
        })
    }

    /// Vertical lines of the current frame
    pub fn lines(&self) -> impl Iterator<Item = (f64, f64, Rgba)> + '_ {
        self.commands.iter().filter_map(|c| match *c {
            DrawCommand::VerticalLine {
                x,
                line_width,
                color,
            } => Some((x, line_width, color)),
            _ => None,
        })
    }
}

impl Surface for DrawList {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.frames += 1;
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba) {
        if width <= 0.0 || height <= 0.0 || color.is_transparent() {
            return;
        }
        self.commands.push(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn vertical_line(&mut self, x: f64, line_width: f64, color: Rgba) {
        if line_width <= 0.0 || color.is_transparent() {
            return;
        }
        self.commands.push(DrawCommand::VerticalLine {
            x,
            line_width,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!("#0ea5e9".parse::<Rgba>().unwrap(), Rgba::rgb(14, 165, 233));
        assert_eq!("#FFFFFF".parse::<Rgba>().unwrap(), Rgba::WHITE);
        let translucent: Rgba = "#ff000080".parse().unwrap();
        assert_eq!((translucent.r, translucent.g, translucent.b), (255, 0, 0));
        assert!((translucent.a - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_functional_colors() {
        assert_eq!(
            "rgba(255, 255, 255, 0.5)".parse::<Rgba>().unwrap(),
            Rgba::rgba(255, 255, 255, 0.5)
        );
        assert_eq!("rgb(1,2,3)".parse::<Rgba>().unwrap(), Rgba::rgb(1, 2, 3));
        assert!("transparent".parse::<Rgba>().unwrap().is_transparent());
    }

    #[test]
    fn test_reject_invalid_colors() {
        for bad in ["", "#12345", "#gggggg", "rgba(1,2,3)", "rgb(300,0,0)", "rgba(0,0,0,2)", "blue"] {
            assert!(bad.parse::<Rgba>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_color_display_parses_back() {
        for color in [Rgba::rgb(14, 165, 233), Rgba::rgba(255, 255, 255, 0.7)] {
            assert_eq!(color.to_string().parse::<Rgba>().unwrap(), color);
        }
    }

    #[test]
    fn test_draw_list_counts_frames() {
        let mut list = DrawList::new(100.0, 40.0);
        list.clear();
        list.fill_rect(0.0, 0.0, 10.0, 10.0, Rgba::WHITE);
        list.vertical_line(5.0, 2.0, Rgba::WHITE);
        assert_eq!(list.commands().len(), 2);
        assert_eq!(list.frame_count(), 1);

        list.clear();
        assert!(list.commands().is_empty());
        assert_eq!(list.frame_count(), 2);
    }

    #[test]
    fn test_draw_list_skips_invisible_shapes() {
        let mut list = DrawList::new(100.0, 40.0);
        list.fill_rect(0.0, 0.0, 0.0, 10.0, Rgba::WHITE);
        list.fill_rect(0.0, 0.0, 10.0, -1.0, Rgba::WHITE);
        list.fill_rect(0.0, 0.0, 10.0, 10.0, Rgba::TRANSPARENT);
        list.vertical_line(1.0, 0.0, Rgba::WHITE);
        assert!(list.commands().is_empty());
    }
}
