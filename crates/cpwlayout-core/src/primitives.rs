use std::fmt;

use crate::cursor::Cursor;
use crate::error::{finite, positive, DrawError};
use crate::geometry::Polygon;
use crate::kernel::{self, CrossSection, LocalShape, TaperSection};
use crate::layer::LayerRoles;
use crate::library::Library;

/// Segment count used by [`Bend`] unless overridden.
pub const DEFAULT_BEND_SEGMENTS: usize = 60;

/// Everything a primitive contributes, computed up front: the local-frame
/// shapes to emit and the rigid motion to apply to the cursor afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub shapes: Vec<LocalShape>,
    pub forward: f64,
    pub transverse: f64,
    pub turn: f64,
}

/// A drawing primitive that can be issued on a [`Cursor`].
pub trait Primitive: fmt::Debug {
    /// Validate parameters and compute the full plan. No side effects.
    fn plan(&self) -> Result<Plan, DrawError>;
    /// Short human-readable description, used in logs.
    fn description(&self) -> String;
}

// ── Straight ─────────────────────────────────────────────────────────

/// Straight CPW run along the cursor heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Straight {
    pub pinw: f64,
    pub gapw: f64,
    pub length: f64,
}

impl Straight {
    pub fn new(pinw: f64, gapw: f64, length: f64) -> Self {
        Self { pinw, gapw, length }
    }
}

impl Primitive for Straight {
    fn plan(&self) -> Result<Plan, DrawError> {
        let section = CrossSection::new(self.pinw, self.gapw)?;
        let length = positive("length", self.length)?;
        Ok(Plan {
            shapes: kernel::straight(&section, length),
            forward: length,
            transverse: 0.0,
            turn: 0.0,
        })
    }

    fn description(&self) -> String {
        format!(
            "straight pinw={} gapw={} length={}",
            self.pinw, self.gapw, self.length
        )
    }
}

// ── Linear taper ─────────────────────────────────────────────────────

/// Straight run whose widths vary linearly from the start to the stop values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTaper {
    pub length: f64,
    pub start_pinw: f64,
    pub stop_pinw: f64,
    pub start_gapw: f64,
    pub stop_gapw: f64,
}

impl LinearTaper {
    pub fn new(length: f64, start_pinw: f64, stop_pinw: f64, start_gapw: f64, stop_gapw: f64) -> Self {
        Self {
            length,
            start_pinw,
            stop_pinw,
            start_gapw,
            stop_gapw,
        }
    }
}

impl Primitive for LinearTaper {
    fn plan(&self) -> Result<Plan, DrawError> {
        let section = TaperSection::new(
            self.start_pinw,
            self.stop_pinw,
            self.start_gapw,
            self.stop_gapw,
        )?;
        let length = positive("length", self.length)?;
        Ok(Plan {
            shapes: kernel::linear_taper(&section, length),
            forward: length,
            transverse: 0.0,
            turn: 0.0,
        })
    }

    fn description(&self) -> String {
        format!(
            "taper pinw={}->{} gapw={}->{} length={}",
            self.start_pinw, self.stop_pinw, self.start_gapw, self.stop_gapw, self.length
        )
    }
}

// ── Bend ─────────────────────────────────────────────────────────────

/// Circular-arc CPW bend. Positive angles turn left (counter-clockwise).
///
/// Angles beyond a full turn are accepted and simply keep winding. The
/// radius is not checked against the outer half-width; a smaller radius
/// folds the inner band over the arc center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bend {
    pub angle: f64,
    pub pinw: f64,
    pub gapw: f64,
    pub radius: f64,
    pub segments: usize,
}

impl Bend {
    pub fn new(angle: f64, pinw: f64, gapw: f64, radius: f64) -> Self {
        Self {
            angle,
            pinw,
            gapw,
            radius,
            segments: DEFAULT_BEND_SEGMENTS,
        }
    }

    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }
}

impl Primitive for Bend {
    fn plan(&self) -> Result<Plan, DrawError> {
        let angle = finite("angle", self.angle)?;
        let section = CrossSection::new(self.pinw, self.gapw)?;
        let radius = positive("radius", self.radius)?;
        if self.segments == 0 {
            return Err(DrawError::InvalidSegmentCount(self.segments));
        }

        // geometry and end pose come from the same arc parameters but are
        // computed independently; the pose never depends on `segments`
        let shapes = kernel::bend(&section, angle, radius, self.segments);
        let (forward, transverse) = if angle == 0.0 {
            (0.0, 0.0)
        } else {
            kernel::bend_end_offset(angle, radius)
        };
        Ok(Plan {
            shapes,
            forward,
            transverse,
            turn: angle,
        })
    }

    fn description(&self) -> String {
        format!(
            "bend angle={} pinw={} gapw={} radius={} n={}",
            self.angle, self.pinw, self.gapw, self.radius, self.segments
        )
    }
}

// ── Issuing primitives on a cursor ───────────────────────────────────

impl Cursor {
    /// Emit `primitive` at the current pose into this cursor's canvas, with
    /// layer roles resolved through `roles` right now, then advance the
    /// cursor to the primitive's end pose.
    ///
    /// All-or-nothing: on error neither the cursor nor the canvas changed.
    pub fn draw(
        &mut self,
        library: &mut Library,
        roles: &LayerRoles,
        primitive: &dyn Primitive,
    ) -> Result<(), DrawError> {
        let pose = self.pose();
        pose.check_finite()?;
        let plan = primitive.plan()?;
        let polygons: Vec<Polygon> = plan
            .shapes
            .into_iter()
            .map(|shape| {
                Polygon::new(
                    roles.get(shape.role),
                    shape.vertices.iter().map(|v| pose.to_canvas(v)).collect(),
                )
            })
            .collect();

        let canvas = library.try_canvas_mut(&self.canvas())?;
        log::debug!(
            "canvas '{}': {} -> {} polygon(s)",
            canvas.name,
            primitive.description(),
            polygons.len()
        );
        canvas.extend(polygons);
        self.advance(plan.forward, plan.transverse, plan.turn);
        Ok(())
    }

    pub fn straight(
        &mut self,
        library: &mut Library,
        roles: &LayerRoles,
        pinw: f64,
        gapw: f64,
        length: f64,
    ) -> Result<(), DrawError> {
        self.draw(library, roles, &Straight::new(pinw, gapw, length))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn linear_taper(
        &mut self,
        library: &mut Library,
        roles: &LayerRoles,
        length: f64,
        start_pinw: f64,
        stop_pinw: f64,
        start_gapw: f64,
        stop_gapw: f64,
    ) -> Result<(), DrawError> {
        let taper = LinearTaper::new(length, start_pinw, stop_pinw, start_gapw, stop_gapw);
        self.draw(library, roles, &taper)
    }

    /// Bend with [`DEFAULT_BEND_SEGMENTS`] pieces per band.
    pub fn bend(
        &mut self,
        library: &mut Library,
        roles: &LayerRoles,
        angle: f64,
        pinw: f64,
        gapw: f64,
        radius: f64,
    ) -> Result<(), DrawError> {
        self.draw(library, roles, &Bend::new(angle, pinw, gapw, radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasId;
    use crate::cursor::Pose;
    use crate::geometry::{BBox, Point};
    use crate::layer::{LayerId, LayerRole};
    use uuid::Uuid;

    const PIN: LayerId = LayerId::new(1, 0);
    const GAP: LayerId = LayerId::new(2, 0);

    fn setup() -> (Library, CanvasId) {
        let mut lib = Library::new("test");
        let id = lib.create_canvas("chip", BBox::centered(Point::ORIGIN, 1e4, 1e4));
        (lib, id)
    }

    fn polygons(lib: &Library, id: CanvasId) -> Vec<Polygon> {
        lib.canvas(&id).unwrap().polygons().to_vec()
    }

    fn assert_pose_close(a: Pose, b: Pose) {
        assert!(a.position().distance_to(&b.position()) < 1e-9, "{a:?} vs {b:?}");
        assert_eq!(a.heading(), b.heading());
    }

    #[test]
    fn test_straight_standard_mode() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let mut cursor = Cursor::at(id, Point::ORIGIN, 0.0);
        cursor.straight(&mut lib, &roles, 10.0, 5.0, 100.0).unwrap();

        let polys = polygons(&lib, id);
        assert_eq!(polys.len(), 3);
        let pins: Vec<_> = polys.iter().filter(|p| p.layer == PIN).collect();
        let gaps: Vec<_> = polys.iter().filter(|p| p.layer == GAP).collect();
        assert_eq!(pins.len(), 1);
        assert_eq!(gaps.len(), 2);

        let pin = pins[0].bbox().unwrap();
        assert!((pin.width() - 100.0).abs() < 1e-12);
        assert!((pin.height() - 10.0).abs() < 1e-12);
        assert!(pin.center().y.abs() < 1e-12);

        let g0 = gaps[0].bbox().unwrap();
        let g1 = gaps[1].bbox().unwrap();
        assert!((g0.width() - 100.0).abs() < 1e-12);
        assert!((g0.height() - 5.0).abs() < 1e-12);
        assert!((g1.height() - 5.0).abs() < 1e-12);
        assert!((g0.center().y + g1.center().y).abs() < 1e-12);
        assert!((g0.center().y.abs() - 7.5).abs() < 1e-12);

        assert_eq!(cursor.position(), Point::new(100.0, 0.0));
        assert_eq!(cursor.heading(), 0.0);
    }

    #[test]
    fn test_straight_solid_mode_follows_conductor_role() {
        let (mut lib, id) = setup();
        let mut roles = LayerRoles::default();
        let mut cursor = Cursor::at(id, Point::ORIGIN, 0.0);

        cursor.straight(&mut lib, &roles, 0.0, 5.0, 100.0).unwrap();
        {
            let gap_only = roles.route_conductor_to_gap();
            cursor.straight(&mut lib, &gap_only, 0.0, 5.0, 100.0).unwrap();
        }

        let polys = polygons(&lib, id);
        assert_eq!(polys.len(), 2);
        assert_eq!(polys[0].layer, PIN);
        assert_eq!(polys[1].layer, GAP);
        for p in &polys {
            let bb = p.bbox().unwrap();
            assert!((bb.width() - 100.0).abs() < 1e-12);
            assert!((bb.height() - 10.0).abs() < 1e-12);
        }
        assert_eq!(roles.conductor, PIN);
    }

    #[test]
    fn test_solid_taper_drawn_gap_only() {
        let (mut lib, id) = setup();
        let mut roles = LayerRoles::default();
        let mut cursor = Cursor::at(id, Point::ORIGIN, 0.0);
        {
            let gap_only = roles.route_conductor_to_gap();
            cursor
                .linear_taper(&mut lib, &gap_only, 5.0, 0.0, 0.0, 2.5, 0.1)
                .unwrap();
        }

        let polys = polygons(&lib, id);
        assert_eq!(polys.len(), 1);
        assert!(polys.iter().all(|p| p.layer == GAP));

        let v = &polys[0].vertices;
        let start_width = (v[3].y - v[0].y).abs();
        let stop_width = (v[2].y - v[1].y).abs();
        assert!((start_width - 5.0).abs() < 1e-12);
        assert!((stop_width - 0.2).abs() < 1e-12);
        assert!((v[1].x - 5.0).abs() < 1e-12);
        assert_eq!(cursor.position(), Point::new(5.0, 0.0));
    }

    #[test]
    fn test_solid_taper_defaults_to_conductor_role() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let mut cursor = Cursor::at(id, Point::ORIGIN, 0.0);
        cursor
            .linear_taper(&mut lib, &roles, 5.0, 0.0, 0.0, 2.5, 0.1)
            .unwrap();
        let polys = polygons(&lib, id);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].layer, PIN);
    }

    #[test]
    fn test_taper_all_mode_combinations() {
        // (start_pinw, stop_pinw, expected polygons, expected conductor polygons)
        let cases = [
            (0.0, 0.0, 1, 1),
            (0.0, 4.0, 3, 1),
            (4.0, 0.0, 3, 1),
            (4.0, 2.0, 3, 1),
        ];
        for (start_pinw, stop_pinw, total, pins) in cases {
            let (mut lib, id) = setup();
            let roles = LayerRoles::default();
            let mut cursor = Cursor::at(id, Point::new(3.0, 4.0), 90.0);
            cursor
                .linear_taper(&mut lib, &roles, 10.0, start_pinw, stop_pinw, 3.0, 1.0)
                .unwrap();
            let polys = polygons(&lib, id);
            assert_eq!(polys.len(), total, "pinw {start_pinw}->{stop_pinw}");
            assert_eq!(polys.iter().filter(|p| p.layer == PIN).count(), pins);
            assert!(polys.iter().all(|p| p.vertex_count() == 4));
            assert_eq!(cursor.position(), Point::new(3.0, 14.0));
        }
    }

    #[test]
    fn test_four_quarter_bends_close_the_loop() {
        for start_heading in [0.0, 30.0, 271.5] {
            let (mut lib, id) = setup();
            let roles = LayerRoles::default();
            let start = Pose::new(Point::new(12.0, -7.0), start_heading);
            let mut cursor = Cursor::new(id, start);
            for _ in 0..4 {
                cursor.bend(&mut lib, &roles, 90.0, 10.0, 5.0, 50.0).unwrap();
            }
            assert_pose_close(cursor.pose(), start);
        }
    }

    #[test]
    fn test_opposite_bends_restore_pose() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let start = Pose::new(Point::new(1.0, 2.0), 15.0);
        let mut cursor = Cursor::new(id, start);
        cursor.bend(&mut lib, &roles, -90.0, 10.0, 5.0, 40.0).unwrap();
        assert_eq!(cursor.heading(), 285.0);
        cursor.bend(&mut lib, &roles, 90.0, 10.0, 5.0, 40.0).unwrap();
        assert_eq!(cursor.heading(), start.heading());
        assert!(cursor.position().distance_to(&start.position()) > 1.0);

        // the pair is an S-bend: heading restored, displaced by 2R sideways
        // and 2R forward; the mirrored pair cancels it
        let (mut lib, id) = setup();
        let mut cursor = Cursor::new(id, start);
        cursor.bend(&mut lib, &roles, -90.0, 10.0, 5.0, 40.0).unwrap();
        cursor.bend(&mut lib, &roles, 90.0, 10.0, 5.0, 40.0).unwrap();
        cursor.bend(&mut lib, &roles, 90.0, 10.0, 5.0, 40.0).unwrap();
        cursor.bend(&mut lib, &roles, -90.0, 10.0, 5.0, 40.0).unwrap();
        let expected = start.advanced(160.0, 0.0, 0.0);
        assert_pose_close(cursor.pose(), expected);
    }

    #[test]
    fn test_bend_end_pose_independent_of_segments() {
        let mut poses = Vec::new();
        for n in [1, 2, 7, 60, 500] {
            let (mut lib, id) = setup();
            let roles = LayerRoles::default();
            let mut cursor = Cursor::at(id, Point::new(5.0, 5.0), 33.0);
            let bend = Bend::new(-127.5, 4.0, 2.0, 25.0).with_segments(n);
            cursor.draw(&mut lib, &roles, &bend).unwrap();
            assert_eq!(lib.polygon_count(), 3 * n);
            poses.push(cursor.pose());
        }
        assert!(poses.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_bend_end_pose_matches_arc_geometry() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let mut cursor = Cursor::at(id, Point::new(-3.0, 8.0), 200.0);
        cursor.bend(&mut lib, &roles, 75.0, 6.0, 2.0, 30.0).unwrap();

        // the last conductor piece ends on the chord through the end pose
        let polys = polygons(&lib, id);
        let last_pin = polys.iter().filter(|p| p.layer == PIN).last().unwrap();
        let end_mid = Point::new(
            (last_pin.vertices[1].x + last_pin.vertices[2].x) / 2.0,
            (last_pin.vertices[1].y + last_pin.vertices[2].y) / 2.0,
        );
        assert!(end_mid.distance_to(&cursor.position()) < 1e-9);
        assert_eq!(cursor.heading(), 275.0);
    }

    #[test]
    fn test_chaining_composes_declared_motions() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let start = Pose::new(Point::new(-100.0, 20.0), 10.0);
        let mut cursor = Cursor::new(id, start);

        cursor.straight(&mut lib, &roles, 10.0, 5.0, 100.0).unwrap();
        cursor.bend(&mut lib, &roles, 45.0, 10.0, 5.0, 60.0).unwrap();
        cursor
            .linear_taper(&mut lib, &roles, 20.0, 10.0, 4.0, 5.0, 2.0)
            .unwrap();
        cursor
            .draw(&mut lib, &roles, &Bend::new(-120.0, 4.0, 2.0, 30.0).with_segments(3))
            .unwrap();

        let (s1, c1) = crate::geometry::sin_cos_deg(45.0);
        let (s2, c2) = crate::geometry::sin_cos_deg(-120.0);
        let expected = start
            .advanced(100.0, 0.0, 0.0)
            .advanced(60.0 * s1, 60.0 * (1.0 - c1), 45.0)
            .advanced(20.0, 0.0, 0.0)
            .advanced(-30.0 * s2, -30.0 * (1.0 - c2), -120.0);
        assert_pose_close(cursor.pose(), expected);
        assert_eq!(cursor.heading(), 295.0);
    }

    #[test]
    fn test_rejected_calls_leave_cursor_and_canvas_untouched() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let mut cursor = Cursor::at(id, Point::new(0.1, 0.2), 33.3);
        cursor.straight(&mut lib, &roles, 10.0, 5.0, 10.0).unwrap();
        let before = cursor.pose();
        let count = lib.polygon_count();

        let bad: Vec<Box<dyn Primitive>> = vec![
            Box::new(Straight::new(10.0, 5.0, 0.0)),
            Box::new(Straight::new(10.0, -5.0, 10.0)),
            Box::new(Straight::new(0.0, 0.0, 10.0)),
            Box::new(LinearTaper::new(-1.0, 1.0, 1.0, 1.0, 1.0)),
            Box::new(LinearTaper::new(5.0, 1.0, -0.5, 1.0, 1.0)),
            Box::new(Bend::new(90.0, 10.0, 5.0, 0.0)),
            Box::new(Bend::new(90.0, 10.0, 5.0, 50.0).with_segments(0)),
            Box::new(Bend::new(f64::NAN, 10.0, 5.0, 50.0)),
        ];
        for prim in &bad {
            assert!(cursor.draw(&mut lib, &roles, prim.as_ref()).is_err(), "{prim:?}");
            assert_eq!(cursor.position().x.to_bits(), before.position().x.to_bits());
            assert_eq!(cursor.position().y.to_bits(), before.position().y.to_bits());
            assert_eq!(cursor.heading().to_bits(), before.heading().to_bits());
            assert_eq!(lib.polygon_count(), count);
        }
    }

    #[test]
    fn test_error_names_offending_parameter() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let mut cursor = Cursor::at(id, Point::ORIGIN, 0.0);
        let err = cursor.straight(&mut lib, &roles, 10.0, 5.0, 0.0).unwrap_err();
        assert!(matches!(err, DrawError::InvalidParameter { name: "length", .. }));
        let err = cursor
            .draw(&mut lib, &roles, &Bend::new(90.0, 1.0, 1.0, 5.0).with_segments(0))
            .unwrap_err();
        assert_eq!(err, DrawError::InvalidSegmentCount(0));
    }

    #[test]
    fn test_unknown_canvas_rejected_atomically() {
        let (mut lib, _) = setup();
        let roles = LayerRoles::default();
        let ghost = Uuid::new_v4();
        let mut cursor = Cursor::at(ghost, Point::ORIGIN, 0.0);
        let err = cursor.straight(&mut lib, &roles, 1.0, 1.0, 1.0).unwrap_err();
        assert_eq!(err, DrawError::UnknownCanvas(ghost));
        assert_eq!(cursor.pose(), Pose::default());
    }

    #[test]
    fn test_non_finite_start_pose_never_reaches_canvas() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let mut cursor = Cursor::new(id, Pose::new(Point::new(f64::NAN, 0.0), 0.0));
        let err = cursor.straight(&mut lib, &roles, 1.0, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, DrawError::InvalidParameter { name: "position.x", .. }));
        assert!(polygons(&lib, id).is_empty());
    }

    #[test]
    fn test_role_reassignment_is_not_retroactive() {
        let (mut lib, id) = setup();
        let mut roles = LayerRoles::default();
        let l1 = LayerId::new(10, 0);
        let l2 = LayerId::new(20, 3);
        let mut cursor = Cursor::at(id, Point::ORIGIN, 0.0);

        roles.set(LayerRole::Conductor, l1);
        cursor.straight(&mut lib, &roles, 0.0, 1.0, 5.0).unwrap();
        roles.set(LayerRole::Conductor, l2);
        cursor.straight(&mut lib, &roles, 0.0, 1.0, 5.0).unwrap();

        let polys = polygons(&lib, id);
        assert_eq!(polys[0].layer, l1);
        assert_eq!(polys[1].layer, l2);
    }

    #[test]
    fn test_zero_angle_bend_is_noop() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let mut cursor = Cursor::at(id, Point::new(1.0, 1.0), 45.0);
        cursor.bend(&mut lib, &roles, 0.0, 10.0, 5.0, 50.0).unwrap();
        assert_eq!(lib.polygon_count(), 0);
        assert_eq!(cursor.pose(), Pose::new(Point::new(1.0, 1.0), 45.0));
    }

    #[test]
    fn test_bend_beyond_full_turn_accepted() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let mut cursor = Cursor::at(id, Point::ORIGIN, 0.0);
        cursor.bend(&mut lib, &roles, 450.0, 2.0, 1.0, 10.0).unwrap();
        assert_eq!(cursor.heading(), 90.0);
        assert!(cursor.position().distance_to(&Point::new(10.0, 10.0)) < 1e-9);
    }

    #[test]
    fn test_multiple_cursors_share_a_canvas() {
        let (mut lib, id) = setup();
        let roles = LayerRoles::default();
        let mut a = Cursor::at(id, Point::ORIGIN, 0.0);
        let mut b = Cursor::at(id, Point::new(0.0, 100.0), 180.0);
        a.straight(&mut lib, &roles, 10.0, 5.0, 50.0).unwrap();
        b.straight(&mut lib, &roles, 0.0, 5.0, 50.0).unwrap();
        assert_eq!(lib.polygon_count(), 4);
        assert_eq!(a.position(), Point::new(50.0, 0.0));
        assert_eq!(b.position(), Point::new(-50.0, 100.0));
    }
}
