use serde::{Deserialize, Serialize};

use crate::LayerId;

/// A 2D point in layout coordinates (micrometers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Rotate about the origin by `degrees`, counter-clockwise.
    pub fn rotated(&self, degrees: f64) -> Self {
        let (sin_r, cos_r) = sin_cos_deg(degrees);
        Self {
            x: self.x * cos_r - self.y * sin_r,
            y: self.x * sin_r + self.y * cos_r,
        }
    }

    /// Rotate about `center` by `degrees`, counter-clockwise.
    pub fn rotated_about(&self, center: &Point, degrees: f64) -> Self {
        Point::new(self.x - center.x, self.y - center.y)
            .rotated(degrees)
            .translate(center.x, center.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Sine and cosine of an angle in degrees.
///
/// Quarter turns come back exact so that runs drawn at 0/90/180/270 degrees
/// stay exactly axis-aligned.
pub fn sin_cos_deg(degrees: f64) -> (f64, f64) {
    let turn = degrees.rem_euclid(360.0);
    if turn == 0.0 {
        (0.0, 1.0)
    } else if turn == 90.0 {
        (1.0, 0.0)
    } else if turn == 180.0 {
        (0.0, -1.0)
    } else if turn == 270.0 {
        (-1.0, 0.0)
    } else {
        degrees.to_radians().sin_cos()
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// A `width` x `height` box centered on `center`.
    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self {
            min: Point::new(center.x - width / 2.0, center.y - height / 2.0),
            max: Point::new(center.x + width / 2.0, center.y + height / 2.0),
        }
    }

    /// A `width` x `height` box with its lower-left corner at the origin.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self {
            min: Point::ORIGIN,
            max: Point::new(width, height),
        }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_bbox(&self, other: &BBox) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

/// A simple polygon: a closed ring of vertices (first != last, closing edge
/// implicit) tagged with the layer it was emitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub layer: LayerId,
    pub vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(layer: LayerId, vertices: Vec<Point>) -> Self {
        Self { layer, vertices }
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Signed area (shoelace); positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            layer: self.layer,
            vertices: self.vertices.iter().map(|p| p.translate(dx, dy)).collect(),
        }
    }
}
