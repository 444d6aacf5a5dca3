use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{Canvas, CanvasId};
use crate::error::DrawError;
use crate::geometry::BBox;

/// An ordered collection of canvases, exported together as one GDS library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    /// Library identifier.
    pub id: Uuid,
    /// Library name (GDS LIBNAME).
    pub name: String,
    /// Canvases in creation order; export follows this order.
    canvases: Vec<Canvas>,
}

impl Library {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            canvases: Vec::new(),
        }
    }

    // ── Canvas management ────────────────────────────────────────────

    /// Create an empty canvas and return its handle.
    pub fn create_canvas(&mut self, name: &str, extents: BBox) -> CanvasId {
        self.add_canvas(Canvas::new(name, extents))
    }

    pub fn add_canvas(&mut self, canvas: Canvas) -> CanvasId {
        let id = canvas.id;
        log::debug!("library '{}': added canvas '{}'", self.name, canvas.name);
        self.canvases.push(canvas);
        id
    }

    pub fn canvas(&self, id: &CanvasId) -> Option<&Canvas> {
        self.canvases.iter().find(|c| c.id == *id)
    }

    pub fn canvas_mut(&mut self, id: &CanvasId) -> Option<&mut Canvas> {
        self.canvases.iter_mut().find(|c| c.id == *id)
    }

    /// Like [`Library::canvas_mut`], with a missing canvas reported as an error.
    pub fn try_canvas_mut(&mut self, id: &CanvasId) -> Result<&mut Canvas, DrawError> {
        self.canvas_mut(id).ok_or(DrawError::UnknownCanvas(*id))
    }

    pub fn remove_canvas(&mut self, id: &CanvasId) -> Option<Canvas> {
        let index = self.canvases.iter().position(|c| c.id == *id)?;
        Some(self.canvases.remove(index))
    }

    pub fn find_canvas_by_name(&self, name: &str) -> Option<&Canvas> {
        self.canvases.iter().find(|c| c.name == name)
    }

    pub fn canvas_count(&self) -> usize {
        self.canvases.len()
    }

    pub fn canvases(&self) -> impl Iterator<Item = &Canvas> {
        self.canvases.iter()
    }

    pub fn polygon_count(&self) -> usize {
        self.canvases.iter().map(Canvas::polygon_count).sum()
    }
}
