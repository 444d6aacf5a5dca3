//! Pure CPW geometry in the cursor's local frame.
//!
//! Local frame: x runs forward along the line, y is the transverse axis with
//! positive values to the left of the direction of travel. Every shape is a
//! set of bands, each band a strip between two transverse offsets, tagged
//! with the layer role it is emitted on.

use crate::error::{non_negative, DrawError};
use crate::geometry::{sin_cos_deg, Point};
use crate::LayerRole;

/// Cross-section of a straight run or a bend, fixed once from the
/// caller's `(pinw, gapw)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossSection {
    /// Center conductor of width `pinw` flanked by two gaps of width `gapw`.
    Standard { pinw: f64, gapw: f64 },
    /// One solid strip of width `2 * half_width` on the conductor role.
    Solid { half_width: f64 },
}

impl CrossSection {
    /// `pinw > 0` selects standard CPW, `pinw == 0` a solid strip of width
    /// `2 * gapw`.
    pub fn new(pinw: f64, gapw: f64) -> Result<Self, DrawError> {
        let pinw = non_negative("pinw", pinw)?;
        let gapw = non_negative("gapw", gapw)?;
        if pinw > 0.0 {
            Ok(CrossSection::Standard { pinw, gapw })
        } else if gapw > 0.0 {
            Ok(CrossSection::Solid { half_width: gapw })
        } else {
            Err(DrawError::EmptyCrossSection)
        }
    }

    /// Distance from the centerline to the outermost edge.
    pub fn outer_half_width(&self) -> f64 {
        match *self {
            CrossSection::Standard { pinw, gapw } => pinw / 2.0 + gapw,
            CrossSection::Solid { half_width } => half_width,
        }
    }

    pub fn bands(&self) -> Vec<Band> {
        match *self {
            CrossSection::Standard { pinw, gapw } => standard_bands(pinw, gapw).to_vec(),
            CrossSection::Solid { half_width } => vec![solid_band(half_width)],
        }
    }
}

/// Cross-section pair of a linear taper. The mode is decided by the two pin
/// widths alone: both zero is a solid taper, anything else is standard
/// along the whole length (a zero pin width at one end is then just a
/// conductor band that closes to a point).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaperSection {
    Standard {
        start_pinw: f64,
        stop_pinw: f64,
        start_gapw: f64,
        stop_gapw: f64,
    },
    Solid {
        start_half_width: f64,
        stop_half_width: f64,
    },
}

impl TaperSection {
    pub fn new(
        start_pinw: f64,
        stop_pinw: f64,
        start_gapw: f64,
        stop_gapw: f64,
    ) -> Result<Self, DrawError> {
        let start_pinw = non_negative("start_pinw", start_pinw)?;
        let stop_pinw = non_negative("stop_pinw", stop_pinw)?;
        let start_gapw = non_negative("start_gapw", start_gapw)?;
        let stop_gapw = non_negative("stop_gapw", stop_gapw)?;

        if start_pinw > 0.0 || stop_pinw > 0.0 {
            Ok(TaperSection::Standard {
                start_pinw,
                stop_pinw,
                start_gapw,
                stop_gapw,
            })
        } else if start_gapw > 0.0 || stop_gapw > 0.0 {
            Ok(TaperSection::Solid {
                start_half_width: start_gapw,
                stop_half_width: stop_gapw,
            })
        } else {
            Err(DrawError::EmptyCrossSection)
        }
    }

    /// Bands at the start and stop ends, index-aligned.
    pub fn end_bands(&self) -> (Vec<Band>, Vec<Band>) {
        match *self {
            TaperSection::Standard {
                start_pinw,
                stop_pinw,
                start_gapw,
                stop_gapw,
            } => (
                standard_bands(start_pinw, start_gapw).to_vec(),
                standard_bands(stop_pinw, stop_gapw).to_vec(),
            ),
            TaperSection::Solid {
                start_half_width,
                stop_half_width,
            } => (
                vec![solid_band(start_half_width)],
                vec![solid_band(stop_half_width)],
            ),
        }
    }
}

/// A strip between two transverse offsets, `right <= left`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub role: LayerRole,
    pub right: f64,
    pub left: f64,
}

impl Band {
    pub fn width(&self) -> f64 {
        self.left - self.right
    }
}

fn standard_bands(pinw: f64, gapw: f64) -> [Band; 3] {
    let half = pinw / 2.0;
    [
        Band {
            role: LayerRole::Conductor,
            right: -half,
            left: half,
        },
        Band {
            role: LayerRole::Gap,
            right: -(half + gapw),
            left: -half,
        },
        Band {
            role: LayerRole::Gap,
            right: half,
            left: half + gapw,
        },
    ]
}

fn solid_band(half_width: f64) -> Band {
    Band {
        role: LayerRole::Conductor,
        right: -half_width,
        left: half_width,
    }
}

/// A polygon in the local frame, not yet bound to a concrete layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalShape {
    pub role: LayerRole,
    pub vertices: Vec<Point>,
}

/// One rectangle per non-empty band, `length` long.
pub fn straight(section: &CrossSection, length: f64) -> Vec<LocalShape> {
    section
        .bands()
        .into_iter()
        .filter(|band| band.width() > 0.0)
        .map(|band| LocalShape {
            role: band.role,
            vertices: vec![
                Point::new(0.0, band.right),
                Point::new(length, band.right),
                Point::new(length, band.left),
                Point::new(0.0, band.left),
            ],
        })
        .collect()
}

/// One quad per band whose width is non-zero at either end. Edges are
/// straight, so a single quad represents the linear interpolation exactly.
pub fn linear_taper(section: &TaperSection, length: f64) -> Vec<LocalShape> {
    let (start, stop) = section.end_bands();
    start
        .iter()
        .zip(&stop)
        .filter(|(a, b)| a.width() > 0.0 || b.width() > 0.0)
        .map(|(a, b)| LocalShape {
            role: a.role,
            vertices: vec![
                Point::new(0.0, a.right),
                Point::new(length, b.right),
                Point::new(length, b.left),
                Point::new(0.0, a.left),
            ],
        })
        .collect()
}

/// Center of the bend arc in the local frame: `radius` to the left for a
/// positive (counter-clockwise) turn, to the right for a negative one.
pub fn bend_center(angle: f64, radius: f64) -> Point {
    Point::new(0.0, angle.signum() * radius)
}

/// `segments` annulus-sector pieces per band. Piece `k` is the band's start
/// edge rotated about the arc center by `angle * k / segments` and
/// `angle * (k + 1) / segments`; each step angle is computed directly, never
/// accumulated.
pub fn bend(section: &CrossSection, angle: f64, radius: f64, segments: usize) -> Vec<LocalShape> {
    if angle == 0.0 {
        return Vec::new();
    }
    let center = bend_center(angle, radius);
    let step = |k: usize| angle * k as f64 / segments as f64;

    let mut shapes = Vec::with_capacity(segments * 3);
    for band in section.bands().into_iter().filter(|b| b.width() > 0.0) {
        let right = Point::new(0.0, band.right);
        let left = Point::new(0.0, band.left);
        for k in 0..segments {
            let (a0, a1) = (step(k), step(k + 1));
            shapes.push(LocalShape {
                role: band.role,
                vertices: vec![
                    right.rotated_about(&center, a0),
                    right.rotated_about(&center, a1),
                    left.rotated_about(&center, a1),
                    left.rotated_about(&center, a0),
                ],
            });
        }
    }
    shapes
}

/// Exact end point of the centerline arc, as a local (forward, transverse)
/// offset. Independent of the segment count used for the polygons.
pub fn bend_end_offset(angle: f64, radius: f64) -> (f64, f64) {
    let (sin_a, cos_a) = sin_cos_deg(angle);
    let sign = angle.signum();
    (sign * radius * sin_a, sign * radius * (1.0 - cos_a))
}
