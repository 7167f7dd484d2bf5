//! Drawing surface abstraction for register documents.
//!
//! The renderer speaks millimetres with a top-left origin, the same space the
//! register geometry is defined in; back-ends translate into their native
//! coordinates. Keeping the surface behind a trait keeps layout geometry
//! testable without a PDF in the loop.

use anyhow::Result;
use image::RgbaImage;

pub const MM_PER_PT: f32 = 25.4 / 72.0;

/// Axis-aligned rectangle in millimetres, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectMm {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectMm {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

#[cfg(test)]
impl RectMm {
    pub fn contains(&self, other: &RectMm) -> bool {
        const EPS: f32 = 1e-3;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.x + other.w <= self.x + self.w + EPS
            && other.y + other.h <= self.y + self.h + EPS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    /// Symbol font used for the check-mark fallback glyph.
    Symbol,
}

/// Marker drawn in a signature cell when no image could be placed.
pub const CHECK_GLYPH: &str = "\u{2713}";

pub trait Canvas {
    /// Page size in millimetres.
    fn page_size(&self) -> (f32, f32);
    /// Start a new page; the drawing cursor is the caller's concern.
    fn add_page(&mut self);
    fn set_font(&mut self, font: Font, size: f32);
    fn set_line_width(&mut self, width: f32);
    /// Draw `text` with its baseline at (x, y).
    fn text(&mut self, text: &str, x: f32, y: f32);
    /// Width of `text` in millimetres at the current font size.
    fn text_width(&self, text: &str) -> f32;
    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32);
    /// Stroke the outline of a rectangle.
    fn rect(&mut self, rect: RectMm);
    /// Place a raster image into `rect`, stretching to fill it.
    fn image(&mut self, image: &RgbaImage, rect: RectMm) -> Result<()>;
    /// Restrict subsequent drawing to `rect` until the matching [`pop_clip`].
    ///
    /// [`pop_clip`]: Canvas::pop_clip
    fn push_clip(&mut self, rect: RectMm);
    fn pop_clip(&mut self);
}

/// Approximate Helvetica advance width in millimetres. Close enough to centre
/// the short labels and readings the registers draw.
pub(crate) fn approx_text_width(text: &str, size: f32) -> f32 {
    let units: f32 = text.chars().map(glyph_units).sum();
    units * size * MM_PER_PT
}

fn glyph_units(ch: char) -> f32 {
    match ch {
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '/' | ' ' | '-' => 0.33,
        'm' | 'M' | 'W' | 'w' => 0.88,
        '\u{b0}' => 0.4,
        ch if ch.is_ascii_digit() => 0.56,
        ch if ch.is_ascii_uppercase() => 0.69,
        _ => 0.52,
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! In-memory canvas that records draw operations for layout assertions.

    use super::{approx_text_width, Canvas, Font, RectMm};
    use anyhow::Result;
    use image::RgbaImage;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Page,
        Text { text: String, x: f32, y: f32 },
        Rect(RectMm),
        Line { x1: f32, y1: f32, x2: f32, y2: f32 },
        Image(RectMm),
        PushClip(RectMm),
        PopClip,
    }

    pub struct RecordingCanvas {
        pub ops: Vec<Op>,
        size: (f32, f32),
        font_size: f32,
        pub fail_images: bool,
    }

    impl RecordingCanvas {
        pub fn a4_landscape() -> Self {
            Self {
                ops: Vec::new(),
                size: (297.0, 210.0),
                font_size: 10.0,
                fail_images: false,
            }
        }

        pub fn a4_portrait() -> Self {
            Self {
                ops: Vec::new(),
                size: (210.0, 297.0),
                font_size: 10.0,
                fail_images: false,
            }
        }

        pub fn texts(&self) -> Vec<(&str, f32, f32)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text { text, x, y } => Some((text.as_str(), *x, *y)),
                    _ => None,
                })
                .collect()
        }

        pub fn images(&self) -> Vec<RectMm> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Image(rect) => Some(*rect),
                    _ => None,
                })
                .collect()
        }

        pub fn page_count(&self) -> usize {
            1 + self
                .ops
                .iter()
                .filter(|op| matches!(op, Op::Page))
                .count()
        }
    }

    impl Canvas for RecordingCanvas {
        fn page_size(&self) -> (f32, f32) {
            self.size
        }

        fn add_page(&mut self) {
            self.ops.push(Op::Page);
        }

        fn set_font(&mut self, _font: Font, size: f32) {
            self.font_size = size;
        }

        fn set_line_width(&mut self, _width: f32) {}

        fn text(&mut self, text: &str, x: f32, y: f32) {
            self.ops.push(Op::Text {
                text: text.to_string(),
                x,
                y,
            });
        }

        fn text_width(&self, text: &str) -> f32 {
            approx_text_width(text, self.font_size)
        }

        fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
            self.ops.push(Op::Line { x1, y1, x2, y2 });
        }

        fn rect(&mut self, rect: RectMm) {
            self.ops.push(Op::Rect(rect));
        }

        fn image(&mut self, _image: &RgbaImage, rect: RectMm) -> Result<()> {
            if self.fail_images {
                anyhow::bail!("image drawing disabled for this test");
            }
            self.ops.push(Op::Image(rect));
            Ok(())
        }

        fn push_clip(&mut self, rect: RectMm) {
            self.ops.push(Op::PushClip(rect));
        }

        fn pop_clip(&mut self) {
            self.ops.push(Op::PopClip);
        }
    }
}
