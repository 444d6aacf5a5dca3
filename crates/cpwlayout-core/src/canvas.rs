use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BBox, Polygon};
use crate::LayerId;

/// Unique canvas identifier.
pub type CanvasId = Uuid;

/// A named drawing region of fixed extents.
///
/// Polygons are kept in insertion order, which is also the order they are
/// exported in. Once inserted a polygon is never modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    pub id: CanvasId,
    pub name: String,
    /// Declared drawing area. Geometry outside it is kept but flagged at export.
    pub extents: BBox,
    polygons: Vec<Polygon>,
}

impl Canvas {
    pub fn new(name: &str, extents: BBox) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            extents,
            polygons: Vec::new(),
        }
    }

    pub fn insert(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    pub fn extend<I: IntoIterator<Item = Polygon>>(&mut self, polygons: I) {
        self.polygons.extend(polygons);
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Consume the canvas, handing back its polygons in insertion order.
    pub fn into_polygons(self) -> Vec<Polygon> {
        self.polygons
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Bounding box of everything drawn so far.
    pub fn bbox(&self) -> Option<BBox> {
        self.polygons
            .iter()
            .filter_map(|p| p.bbox())
            .reduce(|acc, bb| acc.union(&bb))
    }

    pub fn polygons_on_layer(&self, layer: LayerId) -> Vec<&Polygon> {
        self.polygons.iter().filter(|p| p.layer == layer).collect()
    }

    /// Distinct layers in first-use order.
    pub fn layers(&self) -> Vec<LayerId> {
        let mut layers: Vec<LayerId> = Vec::new();
        for p in &self.polygons {
            if !layers.contains(&p.layer) {
                layers.push(p.layer);
            }
        }
        layers
    }

    pub fn exceeds_extents(&self) -> bool {
        self.bbox()
            .is_some_and(|bb| !self.extents.contains_bbox(&bb))
    }
}
