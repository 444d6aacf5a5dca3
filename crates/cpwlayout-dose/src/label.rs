//! Cell labels in a seven-segment stroke font.
//!
//! Every stroke is a solid [`Straight`](cpwlayout_core::Straight) run, so a
//! label is plain polygons on one layer and needs no font files. Digits,
//! `.`, `/`, `-` and space are supported; any other character is left
//! blank.

use serde::{Deserialize, Serialize};

use cpwlayout_core::{positive, CanvasId, Cursor, DrawError, LayerId, LayerRoles, Library, Point};

const A: u8 = 1 << 0; // top
const B: u8 = 1 << 1; // upper right
const C: u8 = 1 << 2; // lower right
const D: u8 = 1 << 3; // bottom
const E: u8 = 1 << 4; // lower left
const F: u8 = 1 << 5; // upper left
const G: u8 = 1 << 6; // middle

#[derive(Debug, Clone, Copy, PartialEq)]
enum Glyph {
    Segments(u8),
    Dot,
    Slash,
    Space,
}

fn glyph(c: char) -> Glyph {
    let segments = match c {
        '0' => A | B | C | D | E | F,
        '1' => B | C,
        '2' => A | B | G | E | D,
        '3' => A | B | G | C | D,
        '4' => F | G | B | C,
        '5' => A | F | G | C | D,
        '6' => A | F | G | E | D | C,
        '7' => A | B | C,
        '8' => A | B | C | D | E | F | G,
        '9' => A | B | C | D | F | G,
        '-' => G,
        '.' => return Glyph::Dot,
        '/' => return Glyph::Slash,
        ' ' => return Glyph::Space,
        other => {
            log::warn!("no glyph for {other:?}, leaving it blank");
            return Glyph::Space;
        }
    };
    Glyph::Segments(segments)
}

/// Glyph box dimensions for a cap height of `size`.
struct Metrics {
    width: f64,
    height: f64,
    stroke: f64,
    spacing: f64,
}

impl Metrics {
    fn new(size: f64) -> Self {
        Self {
            width: 0.6 * size,
            height: size,
            stroke: 0.15 * size,
            spacing: 0.25 * size,
        }
    }

    fn advance(&self, glyph: Glyph) -> f64 {
        match glyph {
            Glyph::Dot => self.stroke,
            Glyph::Segments(_) | Glyph::Slash | Glyph::Space => self.width,
        }
    }
}

/// Width of `text` set at cap height `size`, from the left edge of the first
/// glyph box to the right edge of the last.
pub fn text_width(text: &str, size: f64) -> f64 {
    let m = Metrics::new(size);
    let glyphs: f64 = text.chars().map(|c| m.advance(glyph(c))).sum();
    let gaps = text.chars().count().saturating_sub(1) as f64;
    glyphs + gaps * m.spacing
}

/// Label drawn above each grid cell: centered on the cell's x, baseline
/// `offset_y` above the cell center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellLabel {
    /// Cap height, um.
    pub size: f64,
    pub offset_y: f64,
}

impl Default for CellLabel {
    fn default() -> Self {
        Self {
            size: 6.0,
            offset_y: 25.0,
        }
    }
}

impl CellLabel {
    pub fn draw(
        &self,
        lib: &mut Library,
        canvas: CanvasId,
        layer: LayerId,
        cell: Point,
        text: &str,
    ) -> Result<(), DrawError> {
        let size = positive("label size", self.size)?;
        let anchor = Point::new(
            cell.x - text_width(text, size) / 2.0,
            cell.y + self.offset_y,
        );
        draw_text(lib, canvas, layer, anchor, size, text)
    }
}

/// Draw `text` with the left end of its baseline at `origin`.
pub fn draw_text(
    lib: &mut Library,
    canvas: CanvasId,
    layer: LayerId,
    origin: Point,
    size: f64,
    text: &str,
) -> Result<(), DrawError> {
    let m = Metrics::new(positive("text size", size)?);
    let mut pen = Pen {
        lib,
        canvas,
        roles: LayerRoles::new(layer, layer),
        half: m.stroke / 2.0,
    };
    let mut x = origin.x;
    for c in text.chars() {
        let g = glyph(c);
        let at = |dx: f64, dy: f64| Point::new(x + dx, origin.y + dy);
        match g {
            Glyph::Segments(bits) => {
                let (w, h, t) = (m.width, m.height, m.stroke);
                let mid = h / 2.0;
                let strokes = [
                    (A, at(0.0, h - t / 2.0), 0.0, w),
                    (B, at(w - t / 2.0, mid), 90.0, mid),
                    (C, at(w - t / 2.0, 0.0), 90.0, mid),
                    (D, at(0.0, t / 2.0), 0.0, w),
                    (E, at(t / 2.0, 0.0), 90.0, mid),
                    (F, at(t / 2.0, mid), 90.0, mid),
                    (G, at(0.0, mid), 0.0, w),
                ];
                for (bit, start, heading, length) in strokes {
                    if bits & bit != 0 {
                        pen.stroke(start, heading, length)?;
                    }
                }
            }
            Glyph::Dot => pen.stroke(at(0.0, m.stroke / 2.0), 0.0, m.stroke)?,
            Glyph::Slash => {
                let run = m.width - m.stroke;
                let heading = m.height.atan2(run).to_degrees();
                pen.stroke(at(m.stroke / 2.0, 0.0), heading, run.hypot(m.height))?;
            }
            Glyph::Space => {}
        }
        x += m.advance(g) + m.spacing;
    }
    Ok(())
}

struct Pen<'a> {
    lib: &'a mut Library,
    canvas: CanvasId,
    roles: LayerRoles,
    half: f64,
}

impl Pen<'_> {
    fn stroke(&mut self, start: Point, heading: f64, length: f64) -> Result<(), DrawError> {
        Cursor::at(self.canvas, start, heading).straight(self.lib, &self.roles, 0.0, self.half, length)
    }
}
