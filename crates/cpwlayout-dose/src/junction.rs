//! Junction drawers.
//!
//! Every junction is drawn with fresh cursors starting at the origin,
//! through the public drawing primitives only. Conductor bands land on the
//! fullcut (pin) layer and undercut borders on the gap layer; undercut
//! regions with no fullcut counterpart (bridges, edge borders, paddles) are
//! drawn as solid sections with the conductor role routed to the gap layer.

use serde::{Deserialize, Serialize};

use cpwlayout_core::{positive, CanvasId, Cursor, DrawError, LayerId, LayerRoles, Library, Point, Pose};

/// What a grid cell asks a drawer for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JunctionSpec {
    /// Thin-section (lead) width, um.
    pub width: f64,
    /// Junction gap, um.
    pub gap: f64,
    /// Fullcut layer.
    pub pin_layer: LayerId,
    /// Undercut layer.
    pub gap_layer: LayerId,
}

impl JunctionSpec {
    fn roles(&self) -> LayerRoles {
        LayerRoles::new(self.pin_layer, self.gap_layer)
    }
}

/// Draws one junction, centered anywhere, into `canvas`.
///
/// Implemented for plain closures so that grids can be driven by custom
/// drawing code.
pub trait JunctionDrawer {
    fn draw(&self, lib: &mut Library, canvas: CanvasId, spec: &JunctionSpec) -> Result<(), DrawError>;
}

impl<F> JunctionDrawer for F
where
    F: Fn(&mut Library, CanvasId, &JunctionSpec) -> Result<(), DrawError>,
{
    fn draw(&self, lib: &mut Library, canvas: CanvasId, spec: &JunctionSpec) -> Result<(), DrawError> {
        self(lib, canvas, spec)
    }
}

// ── Geometry parameters ──────────────────────────────────────────────

/// Dolan bridge junction dimensions, um.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JunctionGeometry {
    pub bar_width: f64,
    pub bar_length: f64,
    pub taper_length: f64,
    pub thin_length: f64,
    /// Undercut border width around the fullcut shape.
    pub undercut: f64,
    /// Minimum width of the thin section right of the gap.
    pub right_width: f64,
}

impl Default for JunctionGeometry {
    fn default() -> Self {
        Self {
            bar_width: 5.0,
            bar_length: 1.0,
            taper_length: 2.0,
            thin_length: 0.8,
            undercut: 0.3,
            right_width: 2.0,
        }
    }
}

/// Manhattan cross junction dimensions, um.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManhattanGeometry {
    pub bandage_width: f64,
    pub bandage_length: f64,
    /// Length of each angled lead.
    pub lead_length: f64,
    pub horizontal_offset: f64,
    pub vertical_offset: f64,
    pub paddle_width: f64,
    pub paddle_length: f64,
    pub undercut: f64,
}

impl Default for ManhattanGeometry {
    fn default() -> Self {
        Self {
            bandage_width: 0.2,
            bandage_length: 20.0,
            lead_length: 12.5,
            horizontal_offset: 1.5,
            vertical_offset: 1.0,
            paddle_width: 1.0,
            paddle_length: 1.5,
            undercut: 0.3,
        }
    }
}

// ── Junction kinds ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunctionKind {
    /// Single Dolan bridge junction.
    #[default]
    Dolan,
    /// `junctions` Dolan junctions in series.
    DolanArray { junctions: usize },
    /// Manhattan cross junction; the spec's gap is ignored.
    Manhattan,
}

/// A junction kind bound to concrete dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JunctionStyle {
    pub kind: JunctionKind,
    pub dolan: JunctionGeometry,
    pub manhattan: ManhattanGeometry,
}

impl JunctionDrawer for JunctionStyle {
    fn draw(&self, lib: &mut Library, canvas: CanvasId, spec: &JunctionSpec) -> Result<(), DrawError> {
        match self.kind {
            JunctionKind::Dolan => draw_dolan(lib, canvas, spec, &self.dolan),
            JunctionKind::DolanArray { junctions } => {
                draw_dolan_array(lib, canvas, spec, &self.dolan, junctions)
            }
            JunctionKind::Manhattan => draw_manhattan(lib, canvas, spec, &self.manhattan),
        }
    }
}

/// Solid strip routed to the gap layer.
fn undercut_strip(
    cursor: &mut Cursor,
    lib: &mut Library,
    roles: &mut LayerRoles,
    half_width: f64,
    length: f64,
) -> Result<(), DrawError> {
    let gap_only = roles.route_conductor_to_gap();
    cursor.straight(lib, &gap_only, 0.0, half_width, length)
}

// ── Dolan ────────────────────────────────────────────────────────────

/// Dolan bridge junction, left to right along +x:
/// edge | bar | taper | thin | bridge | thin | taper | bar | edge.
///
/// The right thin section is `geometry.right_width` wide even when the left
/// one is wider; the bridge border covers the wider of the two.
pub fn draw_dolan(
    lib: &mut Library,
    canvas: CanvasId,
    spec: &JunctionSpec,
    geometry: &JunctionGeometry,
) -> Result<(), DrawError> {
    dolan_chain(lib, canvas, spec, geometry, 1, geometry.right_width)
}

/// `junctions` Dolan junctions in series. Inner electrodes are as long as
/// the gap; only the last bridge is widened to the right thin width, which
/// is never narrower than `spec.width`.
pub fn draw_dolan_array(
    lib: &mut Library,
    canvas: CanvasId,
    spec: &JunctionSpec,
    geometry: &JunctionGeometry,
    junctions: usize,
) -> Result<(), DrawError> {
    let right_width = spec.width.max(geometry.right_width);
    dolan_chain(lib, canvas, spec, geometry, junctions, right_width)
}

fn dolan_chain(
    lib: &mut Library,
    canvas: CanvasId,
    spec: &JunctionSpec,
    geometry: &JunctionGeometry,
    junctions: usize,
    right_width: f64,
) -> Result<(), DrawError> {
    if junctions == 0 {
        return Err(DrawError::InvalidParameter {
            name: "junctions",
            expected: "at least 1",
            value: 0.0,
        });
    }
    let width = positive("width", spec.width)?;
    let gap = positive("gap", spec.gap)?;
    let right_width = positive("right_width", right_width)?;
    let g = geometry;
    let bridge_width = width.max(right_width);
    let uc = g.undercut;
    let border = uc / 2.0;

    let mut roles = spec.roles();
    let mut cursor = Cursor::at(canvas, Point::ORIGIN, 0.0);

    if uc > 0.0 {
        undercut_strip(&mut cursor, lib, &mut roles, (g.bar_width + uc) / 2.0, uc)?;
    }
    cursor.straight(lib, &roles, g.bar_width, border, g.bar_length)?;
    cursor.linear_taper(lib, &roles, g.taper_length, g.bar_width, width, border, border)?;
    cursor.straight(lib, &roles, width, border, g.thin_length)?;

    for _ in 1..junctions {
        undercut_strip(&mut cursor, lib, &mut roles, (width + uc) / 2.0, gap)?;
        cursor.straight(lib, &roles, width, border, gap)?;
    }
    undercut_strip(&mut cursor, lib, &mut roles, (bridge_width + uc) / 2.0, gap)?;

    cursor.straight(lib, &roles, right_width, border, g.thin_length)?;
    cursor.linear_taper(lib, &roles, g.taper_length, right_width, g.bar_width, border, border)?;
    cursor.straight(lib, &roles, g.bar_width, border, g.bar_length)?;
    if uc > 0.0 {
        undercut_strip(&mut cursor, lib, &mut roles, (g.bar_width + uc) / 2.0, uc)?;
    }

    log::trace!(
        "dolan x{} width={} gap={} ends at {:?}",
        junctions,
        width,
        gap,
        cursor.position()
    );
    Ok(())
}

// ── Manhattan ────────────────────────────────────────────────────────

/// Two horizontal bandage leads plus two leads at 45 and 135 degrees whose
/// crossing forms the junction.
pub fn draw_manhattan(
    lib: &mut Library,
    canvas: CanvasId,
    spec: &JunctionSpec,
    geometry: &ManhattanGeometry,
) -> Result<(), DrawError> {
    let width = positive("width", spec.width)?;
    let g = geometry;
    let mut roles = spec.roles();
    let h = g.horizontal_offset;
    let v = g.vertical_offset;

    let leads = [
        (Point::new(-h - g.bandage_length / 2.0, 0.0), g.bandage_width, g.bandage_length, 0.0),
        (Point::new(h + g.bandage_length / 2.0, -v), g.bandage_width, g.bandage_length, 0.0),
        (Point::new(-2.0 * h, 2.0 * h / 3.0), width, g.lead_length, 45.0),
        (Point::new(2.0 * h, h - v), width, g.lead_length, 135.0),
    ];
    for (center, lead_width, length, direction) in leads {
        draw_lead(lib, canvas, &mut roles, g, center, lead_width, length, direction)?;
    }
    Ok(())
}

/// Fullcut rectangle centered on `center`, with undercut paddles over both
/// ends and undercut strips along both sides between the paddles.
#[allow(clippy::too_many_arguments)]
fn draw_lead(
    lib: &mut Library,
    canvas: CanvasId,
    roles: &mut LayerRoles,
    g: &ManhattanGeometry,
    center: Point,
    width: f64,
    length: f64,
    direction: f64,
) -> Result<(), DrawError> {
    let frame = Pose::new(center, direction);
    let cursor_at = |forward: f64, transverse: f64| {
        Cursor::new(canvas, frame.advanced(forward, transverse, 0.0))
    };
    let half = length / 2.0;
    let paddle = g.paddle_length;

    cursor_at(-half, 0.0).straight(lib, roles, 0.0, width / 2.0, length)?;

    let gap_only = roles.route_conductor_to_gap();
    cursor_at(-half - paddle / 2.0, 0.0).straight(lib, &gap_only, 0.0, g.paddle_width / 2.0, paddle)?;
    let side_offset = width / 2.0 + g.undercut / 4.0;
    for side in [-1.0, 1.0] {
        cursor_at(-half + paddle / 2.0, side * side_offset).straight(
            lib,
            &gap_only,
            0.0,
            g.undercut / 4.0,
            length - paddle,
        )?;
    }
    cursor_at(half - paddle / 2.0, 0.0).straight(lib, &gap_only, 0.0, g.paddle_width / 2.0, paddle)?;
    Ok(())
}
