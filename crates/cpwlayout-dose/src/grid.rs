//! Junction grids: placement of many junctions over a sweep of doses or
//! geometry.
//!
//! Column index `i` runs along +x and row index `j` along +y, both starting
//! at the grid's `position` and stepping by `spacing`.

use serde::{Deserialize, Serialize};

use cpwlayout_core::{
    BBox, CanvasId, Cursor, DrawError, LayerId, LayerRoles, Library, Point,
};

use crate::dose_table::{DoseArrayNote, DoseEntry, DoseKind, DoseTable};
use crate::error::DoseError;
use crate::junction::{JunctionDrawer, JunctionGeometry, JunctionKind, JunctionSpec, JunctionStyle};
use crate::label::CellLabel;

/// Undercut doses are recorded four times higher than requested, the
/// scaling the exposure software applies to undercut layers.
pub const UNDERCUT_DOSE_FACTOR: f64 = 4.0;

/// `n` evenly spaced values from `start` to `stop` inclusive. A single value
/// is `start`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|k| if k == n - 1 { stop } else { start + step * k as f64 })
                .collect()
        }
    }
}

// ── Cell placement ───────────────────────────────────────────────────

/// Square marker drawn around each grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellFrame {
    pub size: f64,
    /// Vertical offset of the frame center above the junction center.
    pub offset_y: f64,
    pub layer: LayerId,
}

impl Default for CellFrame {
    fn default() -> Self {
        Self {
            size: 80.0,
            offset_y: 10.0,
            layer: LayerId::new(1, 0),
        }
    }
}

impl CellFrame {
    fn draw(&self, lib: &mut Library, canvas: CanvasId, center: Point) -> Result<(), DrawError> {
        let roles = LayerRoles::new(self.layer, self.layer);
        let half = self.size / 2.0;
        let start = Point::new(center.x - half, center.y + self.offset_y);
        Cursor::at(canvas, start, 0.0).straight(lib, &roles, 0.0, half, self.size)
    }
}

/// Draw one junction with its own cursor in a scratch canvas, then move it
/// into `canvas` with its bounding box centered on `center`.
pub fn place_junction(
    lib: &mut Library,
    canvas: CanvasId,
    drawer: &dyn JunctionDrawer,
    spec: &JunctionSpec,
    center: Point,
) -> Result<(), DrawError> {
    let mut scratch = Library::new("scratch");
    let cell = scratch.create_canvas("cell", BBox::centered(Point::ORIGIN, 0.0, 0.0));
    drawer.draw(&mut scratch, cell, spec)?;
    let junction = scratch.remove_canvas(&cell).ok_or(DrawError::UnknownCanvas(cell))?;

    let Some(bb) = junction.bbox() else {
        return Ok(());
    };
    let origin = bb.center();
    let (dx, dy) = (center.x - origin.x, center.y - origin.y);
    let target = lib.try_canvas_mut(&canvas)?;
    target.extend(junction.into_polygons().into_iter().map(|p| p.translated(dx, dy)));
    Ok(())
}

struct Lattice {
    position: Point,
    spacing: f64,
}

impl Lattice {
    fn cell(&self, col: usize, row: usize) -> Point {
        Point::new(
            self.position.x + col as f64 * self.spacing,
            self.position.y + row as f64 * self.spacing,
        )
    }
}

fn check_count(grid: &str, what: &str, n: usize) -> Result<(), DoseError> {
    if n == 0 {
        return Err(DoseError::grid(grid, format!("{what} must be at least 1")));
    }
    Ok(())
}

fn check_finite(grid: &str, what: &str, values: &[f64]) -> Result<(), DoseError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(DoseError::grid(grid, format!("{what} must be finite")))
    }
}

/// Layer numbers `base .. base + n`, rejected when they leave the GDS range.
fn layer_run(grid: &str, what: &str, base: u16, n: usize) -> Result<Vec<u16>, DoseError> {
    (0..n)
        .map(|k| {
            u16::try_from(k)
                .ok()
                .and_then(|k| base.checked_add(k))
                .ok_or_else(|| {
                    DoseError::grid(grid, format!("{what} layers {base}+{n} exceed {}", u16::MAX))
                })
        })
        .collect()
}

// ── Grids ────────────────────────────────────────────────────────────

/// Fixed geometry, fullcut dose swept over columns and undercut dose over
/// rows. Every column and every row gets its own layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoseTestGrid {
    pub name: String,
    pub junction: JunctionKind,
    pub width: f64,
    pub gap: f64,
    pub fullcut_doses: (f64, f64),
    pub undercut_doses: (f64, f64),
    pub n_rows: usize,
    pub n_cols: usize,
    pub spacing: f64,
    pub position: Point,
    pub base_fullcut_layer: u16,
    pub base_undercut_layer: u16,
    pub clearing_layer: u16,
    pub clearing_dose: f64,
    pub frame: Option<CellFrame>,
    /// `fullcut/undercut` dose label, drawn on the clearing layer.
    pub label: Option<CellLabel>,
}

impl Default for DoseTestGrid {
    fn default() -> Self {
        Self {
            name: "dose_test".into(),
            junction: JunctionKind::Dolan,
            width: 0.2,
            gap: 0.2,
            fullcut_doses: (500.0, 2000.0),
            undercut_doses: (200.0, 800.0),
            n_rows: 6,
            n_cols: 12,
            spacing: 400.0,
            position: Point::ORIGIN,
            base_fullcut_layer: 200,
            base_undercut_layer: 600,
            clearing_layer: 2,
            clearing_dose: 3000.0,
            frame: Some(CellFrame::default()),
            label: Some(CellLabel::default()),
        }
    }
}

impl DoseTestGrid {
    /// Draw the grid and return its dose entries: the clearing dose first,
    /// then each layer the first time it is used.
    pub fn draw(
        &self,
        lib: &mut Library,
        canvas: CanvasId,
        drawer: &dyn JunctionDrawer,
    ) -> Result<Vec<DoseEntry>, DoseError> {
        let name = self.name.as_str();
        check_count(name, "n_rows", self.n_rows)?;
        check_count(name, "n_cols", self.n_cols)?;
        check_finite(
            name,
            "doses and spacing",
            &[
                self.fullcut_doses.0,
                self.fullcut_doses.1,
                self.undercut_doses.0,
                self.undercut_doses.1,
                self.spacing,
            ],
        )?;
        let fc_layers = layer_run(name, "fullcut", self.base_fullcut_layer, self.n_cols)?;
        let uc_layers = layer_run(name, "undercut", self.base_undercut_layer, self.n_rows)?;
        let fc_doses = linspace(self.fullcut_doses.0, self.fullcut_doses.1, self.n_cols);
        let uc_doses = linspace(self.undercut_doses.0, self.undercut_doses.1, self.n_rows);

        let lattice = Lattice {
            position: self.position,
            spacing: self.spacing,
        };
        let mut doses = DoseTable::new();
        doses.push(DoseEntry::new(self.clearing_layer, self.clearing_dose, DoseKind::Clearing));

        for (i, (&fc_layer, &fc_dose)) in fc_layers.iter().zip(&fc_doses).enumerate() {
            for (j, (&uc_layer, &uc_dose)) in uc_layers.iter().zip(&uc_doses).enumerate() {
                let center = lattice.cell(i, j);
                let spec = JunctionSpec {
                    width: self.width,
                    gap: self.gap,
                    pin_layer: fc_layer.into(),
                    gap_layer: uc_layer.into(),
                };
                place_junction(lib, canvas, drawer, &spec, center)?;
                if let Some(label) = &self.label {
                    let text = format!("{fc_dose:.0}/{uc_dose:.0}");
                    label.draw(lib, canvas, self.clearing_layer.into(), center, &text)?;
                }
                if let Some(frame) = &self.frame {
                    frame.draw(lib, canvas, center)?;
                }

                if !doses.contains_layer(fc_layer) {
                    doses.push(DoseEntry::new(fc_layer, fc_dose, DoseKind::Fullcut));
                }
                if !doses.contains_layer(uc_layer) {
                    doses.push(DoseEntry::new(
                        uc_layer,
                        uc_dose * UNDERCUT_DOSE_FACTOR,
                        DoseKind::Undercut,
                    ));
                }
            }
        }
        log::info!(
            "dose test '{}': {}x{} junctions, layers {}.. / {}..",
            self.name,
            self.n_cols,
            self.n_rows,
            self.base_fullcut_layer,
            self.base_undercut_layer
        );
        Ok(doses.entries().to_vec())
    }
}

/// Fixed doses on one layer pair, width swept over columns and gap over
/// rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoseArrayGrid {
    pub name: String,
    pub junction: JunctionKind,
    pub fullcut_dose: f64,
    pub undercut_dose: f64,
    pub widths: (f64, f64),
    pub gaps: (f64, f64),
    pub n_rows: usize,
    pub n_cols: usize,
    pub spacing: f64,
    pub position: Point,
    pub pin_layer: u16,
    pub gap_layer: u16,
    pub frame: Option<CellFrame>,
    /// `width/gap` label.
    pub label: Option<CellLabel>,
    pub label_layer: u16,
}

impl Default for DoseArrayGrid {
    fn default() -> Self {
        Self {
            name: "dose_array".into(),
            junction: JunctionKind::Dolan,
            fullcut_dose: 1450.0,
            undercut_dose: 350.0,
            widths: (0.1, 0.4),
            gaps: (0.1, 0.4),
            n_rows: 5,
            n_cols: 5,
            spacing: 400.0,
            position: Point::ORIGIN,
            pin_layer: 20,
            gap_layer: 60,
            frame: Some(CellFrame::default()),
            label: Some(CellLabel::default()),
            label_layer: 2,
        }
    }
}

impl DoseArrayGrid {
    pub fn draw(
        &self,
        lib: &mut Library,
        canvas: CanvasId,
        drawer: &dyn JunctionDrawer,
    ) -> Result<(), DoseError> {
        let name = self.name.as_str();
        check_count(name, "n_rows", self.n_rows)?;
        check_count(name, "n_cols", self.n_cols)?;
        check_finite(name, "spacing", &[self.spacing])?;
        let lattice = Lattice {
            position: self.position,
            spacing: self.spacing,
        };

        let widths = linspace(self.widths.0, self.widths.1, self.n_cols);
        let gaps = linspace(self.gaps.0, self.gaps.1, self.n_rows);
        for (i, &width) in widths.iter().enumerate() {
            for (j, &gap) in gaps.iter().enumerate() {
                let center = lattice.cell(i, j);
                let spec = JunctionSpec {
                    width,
                    gap,
                    pin_layer: self.pin_layer.into(),
                    gap_layer: self.gap_layer.into(),
                };
                place_junction(lib, canvas, drawer, &spec, center)?;
                if let Some(label) = &self.label {
                    let text = format!("{width:.2}/{gap:.2}");
                    label.draw(lib, canvas, self.label_layer.into(), center, &text)?;
                }
                if let Some(frame) = &self.frame {
                    frame.draw(lib, canvas, center)?;
                }
            }
        }
        log::info!(
            "dose array '{}': {}x{} junctions on layers {}/{}",
            self.name,
            self.n_cols,
            self.n_rows,
            self.pin_layer,
            self.gap_layer
        );
        Ok(())
    }

    /// Entries added unless the layers already carry a dose.
    pub fn dose_entries(&self) -> [DoseEntry; 2] {
        [
            DoseEntry::new(self.pin_layer, self.fullcut_dose, DoseKind::Fullcut),
            DoseEntry::new(
                self.gap_layer,
                self.undercut_dose * UNDERCUT_DOSE_FACTOR,
                DoseKind::Undercut,
            ),
        ]
    }

    pub fn note(&self) -> DoseArrayNote {
        DoseArrayNote {
            name: self.name.clone(),
            pin_layer: self.pin_layer,
            gap_layer: self.gap_layer,
            fullcut_dose: self.fullcut_dose,
            undercut_dose: self.undercut_dose,
        }
    }
}

/// Dolan junctions with width swept over columns and undercut border over
/// rows, at a fixed gap. Records no doses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndercutTestGrid {
    pub name: String,
    pub widths: (f64, f64),
    pub undercuts: (f64, f64),
    pub gap: f64,
    pub n_rows: usize,
    pub n_cols: usize,
    pub spacing: f64,
    pub position: Point,
    pub pin_layer: u16,
    pub gap_layer: u16,
}

impl Default for UndercutTestGrid {
    fn default() -> Self {
        Self {
            name: "undercut_test".into(),
            widths: (0.1, 0.4),
            undercuts: (0.2, 0.5),
            gap: 0.2,
            n_rows: 5,
            n_cols: 5,
            spacing: 50.0,
            position: Point::ORIGIN,
            pin_layer: 20,
            gap_layer: 60,
        }
    }
}

impl UndercutTestGrid {
    /// `geometry` supplies every Dolan dimension except the undercut border.
    pub fn draw(
        &self,
        lib: &mut Library,
        canvas: CanvasId,
        geometry: &JunctionGeometry,
    ) -> Result<(), DoseError> {
        let name = self.name.as_str();
        check_count(name, "n_rows", self.n_rows)?;
        check_count(name, "n_cols", self.n_cols)?;
        check_finite(name, "spacing", &[self.spacing])?;
        let lattice = Lattice {
            position: self.position,
            spacing: self.spacing,
        };

        let widths = linspace(self.widths.0, self.widths.1, self.n_cols);
        let undercuts = linspace(self.undercuts.0, self.undercuts.1, self.n_rows);
        for (i, &width) in widths.iter().enumerate() {
            for (j, &undercut) in undercuts.iter().enumerate() {
                let style = JunctionStyle {
                    kind: JunctionKind::Dolan,
                    dolan: JunctionGeometry { undercut, ..*geometry },
                    ..JunctionStyle::default()
                };
                let spec = JunctionSpec {
                    width,
                    gap: self.gap,
                    pin_layer: self.pin_layer.into(),
                    gap_layer: self.gap_layer.into(),
                };
                place_junction(lib, canvas, &style, &spec, lattice.cell(i, j))?;
            }
        }
        log::info!("undercut test '{}': {}x{} junctions", self.name, self.n_cols, self.n_rows);
        Ok(())
    }
}

/// One-dimensional width sweep at fixed doses, wrapped onto a new row every
/// `n_cols` junctions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidthSweepGrid {
    pub name: String,
    pub junction: JunctionKind,
    pub widths: (f64, f64),
    /// Ignored by Manhattan junctions.
    pub gap: f64,
    pub n_junctions: usize,
    pub n_cols: usize,
    pub spacing: f64,
    pub position: Point,
    pub fullcut_dose: f64,
    pub undercut_dose: f64,
    pub pin_layer: u16,
    pub gap_layer: u16,
    pub frame: Option<CellFrame>,
    /// Width label.
    pub label: Option<CellLabel>,
    pub label_layer: u16,
}

impl Default for WidthSweepGrid {
    fn default() -> Self {
        Self {
            name: "width_sweep".into(),
            junction: JunctionKind::Manhattan,
            widths: (0.1, 0.5),
            gap: 0.2,
            n_junctions: 20,
            n_cols: 10,
            spacing: 500.0,
            position: Point::ORIGIN,
            fullcut_dose: 1450.0,
            undercut_dose: 350.0,
            pin_layer: 20,
            gap_layer: 60,
            frame: Some(CellFrame::default()),
            label: Some(CellLabel::default()),
            label_layer: 2,
        }
    }
}

impl WidthSweepGrid {
    pub fn draw(
        &self,
        lib: &mut Library,
        canvas: CanvasId,
        drawer: &dyn JunctionDrawer,
    ) -> Result<(), DoseError> {
        let name = self.name.as_str();
        check_count(name, "n_junctions", self.n_junctions)?;
        check_count(name, "n_cols", self.n_cols)?;
        check_finite(name, "spacing", &[self.spacing])?;
        let lattice = Lattice {
            position: self.position,
            spacing: self.spacing,
        };

        let widths = linspace(self.widths.0, self.widths.1, self.n_junctions);
        for (k, &width) in widths.iter().enumerate() {
            let center = lattice.cell(k % self.n_cols, k / self.n_cols);
            let spec = JunctionSpec {
                width,
                gap: self.gap,
                pin_layer: self.pin_layer.into(),
                gap_layer: self.gap_layer.into(),
            };
            place_junction(lib, canvas, drawer, &spec, center)?;
            if let Some(label) = &self.label {
                label.draw(lib, canvas, self.label_layer.into(), center, &format!("{width:.2}"))?;
            }
            if let Some(frame) = &self.frame {
                frame.draw(lib, canvas, center)?;
            }
        }
        log::info!(
            "width sweep '{}': {} junctions, {} per row",
            self.name,
            self.n_junctions,
            self.n_cols
        );
        Ok(())
    }

    pub fn dose_entries(&self) -> [DoseEntry; 2] {
        [
            DoseEntry::new(self.pin_layer, self.fullcut_dose, DoseKind::Fullcut),
            DoseEntry::new(
                self.gap_layer,
                self.undercut_dose * UNDERCUT_DOSE_FACTOR,
                DoseKind::Undercut,
            ),
        ]
    }
}

/// Any grid, as written in a chip config (`"type": "dose_test"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GridSpec {
    DoseTest(DoseTestGrid),
    DoseArray(DoseArrayGrid),
    UndercutTest(UndercutTestGrid),
    WidthSweep(WidthSweepGrid),
}

impl GridSpec {
    pub fn name(&self) -> &str {
        match self {
            GridSpec::DoseTest(g) => &g.name,
            GridSpec::DoseArray(g) => &g.name,
            GridSpec::UndercutTest(g) => &g.name,
            GridSpec::WidthSweep(g) => &g.name,
        }
    }

    /// Draw the grid with junction dimensions from `geometry` and record
    /// its doses in `doses`.
    pub fn draw(
        &self,
        lib: &mut Library,
        canvas: CanvasId,
        geometry: &JunctionStyle,
        doses: &mut DoseTable,
    ) -> Result<(), DoseError> {
        let style = |kind| JunctionStyle { kind, ..*geometry };
        match self {
            GridSpec::DoseTest(grid) => {
                let entries = grid.draw(lib, canvas, &style(grid.junction))?;
                doses.extend(entries);
            }
            GridSpec::DoseArray(grid) => {
                grid.draw(lib, canvas, &style(grid.junction))?;
                push_missing(doses, grid.dose_entries());
                doses.push_array_note(grid.note());
            }
            GridSpec::UndercutTest(grid) => grid.draw(lib, canvas, &geometry.dolan)?,
            GridSpec::WidthSweep(grid) => {
                grid.draw(lib, canvas, &style(grid.junction))?;
                push_missing(doses, grid.dose_entries());
            }
        }
        Ok(())
    }
}

fn push_missing(doses: &mut DoseTable, entries: [DoseEntry; 2]) {
    for entry in entries {
        if !doses.contains_layer(entry.layer) {
            doses.push(entry);
        }
    }
}
