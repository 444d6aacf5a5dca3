use serde::{Deserialize, Serialize};

use crate::canvas::CanvasId;
use crate::error::{finite, DrawError};
use crate::geometry::Point;

/// Normalize a heading into [0, 360).
pub fn normalize_heading(degrees: f64) -> f64 {
    let h = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

/// Position plus heading. Heading is in degrees, 0 = +x, counter-clockwise
/// positive, always kept in [0, 360).
///
/// Fields are only reachable through constructors that normalize the
/// heading; deserialized poses are also checked for finiteness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoseFields")]
pub struct Pose {
    position: Point,
    heading: f64,
}

#[derive(Deserialize)]
struct PoseFields {
    position: Point,
    heading: f64,
}

impl TryFrom<PoseFields> for Pose {
    type Error = DrawError;

    fn try_from(fields: PoseFields) -> Result<Self, DrawError> {
        Pose::try_new(fields.position, fields.heading)
    }
}

impl Pose {
    pub fn new(position: Point, heading: f64) -> Self {
        Self {
            position,
            heading: normalize_heading(heading),
        }
    }

    /// Like [`Pose::new`], rejecting non-finite coordinates or heading.
    pub fn try_new(position: Point, heading: f64) -> Result<Self, DrawError> {
        let pose = Self::new(position, heading);
        pose.check_finite()?;
        Ok(pose)
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn check_finite(&self) -> Result<(), DrawError> {
        finite("position.x", self.position.x)?;
        finite("position.y", self.position.y)?;
        finite("heading", self.heading)?;
        Ok(())
    }

    /// Map a point from this pose's local frame (x forward, y to the left)
    /// into canvas coordinates: rotate by the heading, then translate.
    pub fn to_canvas(&self, local: &Point) -> Point {
        local
            .rotated(self.heading)
            .translate(self.position.x, self.position.y)
    }

    /// The pose reached by moving `forward`/`transverse` in the local frame
    /// and then turning by `turn` degrees.
    pub fn advanced(&self, forward: f64, transverse: f64, turn: f64) -> Pose {
        Pose::new(
            self.to_canvas(&Point::new(forward, transverse)),
            self.heading + turn,
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Point::ORIGIN, 0.0)
    }
}

/// The stateful drawing frame. Each drawing call emits geometry relative to
/// the current pose into the cursor's canvas, then moves the cursor to the
/// end of what it drew.
#[derive(Debug, Clone)]
pub struct Cursor {
    canvas: CanvasId,
    pose: Pose,
    saved: Vec<Pose>,
}

impl Cursor {
    pub fn new(canvas: CanvasId, start: Pose) -> Self {
        Self {
            canvas,
            pose: start,
            saved: Vec::new(),
        }
    }

    pub fn at(canvas: CanvasId, position: Point, heading: f64) -> Self {
        Self::new(canvas, Pose::new(position, heading))
    }

    pub fn canvas(&self) -> CanvasId {
        self.canvas
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn position(&self) -> Point {
        self.pose.position
    }

    pub fn heading(&self) -> f64 {
        self.pose.heading
    }

    /// Teleport to `position` without drawing.
    pub fn set_position(&mut self, position: Point) -> Result<(), DrawError> {
        finite("position.x", position.x)?;
        finite("position.y", position.y)?;
        self.pose.position = position;
        Ok(())
    }

    /// Point the cursor at `heading` degrees without drawing.
    pub fn set_heading(&mut self, heading: f64) -> Result<(), DrawError> {
        finite("heading", heading)?;
        self.pose.heading = normalize_heading(heading);
        Ok(())
    }

    /// Move forward by `length` without drawing anything.
    pub fn skip(&mut self, length: f64) -> Result<(), DrawError> {
        finite("length", length)?;
        self.advance(length, 0.0, 0.0);
        Ok(())
    }

    /// Push the current pose so it can be returned to later.
    pub fn save_pose(&mut self) {
        self.saved.push(self.pose);
    }

    /// Pop the most recently saved pose and jump back to it. Returns `false`
    /// (and leaves the cursor alone) when nothing was saved.
    pub fn restore_pose(&mut self) -> bool {
        match self.saved.pop() {
            Some(pose) => {
                self.pose = pose;
                true
            }
            None => false,
        }
    }

    /// Compose the frame: position += rotate((forward, transverse), heading),
    /// heading += turn.
    pub(crate) fn advance(&mut self, forward: f64, transverse: f64, turn: f64) {
        self.pose = self.pose.advanced(forward, transverse, turn);
    }
}
