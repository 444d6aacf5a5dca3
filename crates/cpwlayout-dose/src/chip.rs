use std::fs;
use std::path::{Path, PathBuf};

use cpwlayout_core::{BBox, Canvas, CanvasId, Cursor, LayerId, LayerRoles, Library, Point};
use cpwlayout_io::{export_library, ExportSettings};

use crate::dose_table::DoseTable;
use crate::error::DoseError;
use crate::grid::GridSpec;
use crate::junction::JunctionStyle;

/// Layer of the chip outline.
pub const BOUNDARY_LAYER: LayerId = LayerId::new(0, 0);

/// A dose-test chip: one canvas centered on the origin holding the chip
/// outline and every grid added to it, plus the dose table collected along
/// the way.
#[derive(Debug)]
pub struct DoseChip {
    library: Library,
    canvas: CanvasId,
    doses: DoseTable,
    geometry: JunctionStyle,
}

impl DoseChip {
    pub fn new(name: &str, width: f64, height: f64) -> Result<Self, DoseError> {
        let mut library = Library::new(name);
        let canvas = library.create_canvas(name, BBox::centered(Point::ORIGIN, width, height));
        let roles = LayerRoles::new(BOUNDARY_LAYER, BOUNDARY_LAYER);
        Cursor::at(canvas, Point::new(-width / 2.0, 0.0), 0.0).straight(
            &mut library,
            &roles,
            0.0,
            height / 2.0,
            width,
        )?;
        log::info!("chip '{}': {} x {} um", name, width, height);
        Ok(Self {
            library,
            canvas,
            doses: DoseTable::new(),
            geometry: JunctionStyle::default(),
        })
    }

    /// Junction dimensions used by grids added from now on.
    pub fn with_geometry(mut self, geometry: JunctionStyle) -> Self {
        self.geometry = geometry;
        self
    }

    /// Draw `grid` onto the chip. A grid that fails leaves the chip and its
    /// dose table untouched.
    pub fn add_grid(&mut self, grid: &GridSpec) -> Result<(), DoseError> {
        let staging = self
            .library
            .create_canvas(grid.name(), BBox::centered(Point::ORIGIN, 0.0, 0.0));
        let mut doses = self.doses.clone();
        let outcome = grid.draw(&mut self.library, staging, &self.geometry, &mut doses);
        let drawn = self.library.remove_canvas(&staging);
        outcome?;

        if let Some(drawn) = drawn {
            let count = drawn.polygon_count();
            self.library
                .try_canvas_mut(&self.canvas)?
                .extend(drawn.into_polygons());
            log::debug!("grid '{}' placed {} polygon(s)", grid.name(), count);
        }
        self.doses = doses;
        Ok(())
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.library.canvas(&self.canvas)
    }

    pub fn dose_table(&self) -> &DoseTable {
        &self.doses
    }

    /// Write the GDS file to `path` and the dose table next to it as
    /// `<stem>_dose_table.txt`. Returns the dose table path. The table is
    /// only written once the GDS stream has been encoded and saved.
    pub fn save(&self, path: impl AsRef<Path>, settings: &ExportSettings) -> Result<PathBuf, DoseError> {
        let path = path.as_ref();
        export_library(&self.library, path, settings)?;
        let table_path = dose_table_path(path);
        fs::write(&table_path, self.doses.to_text())?;
        log::info!("dose table written to {}", table_path.display());
        Ok(table_path)
    }
}

/// `chip.gds` -> `chip_dose_table.txt`, in the same directory.
pub fn dose_table_path(gds_path: &Path) -> PathBuf {
    let stem = gds_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dose_chip".to_string());
    gds_path.with_file_name(format!("{stem}_dose_table.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{DoseArrayGrid, DoseTestGrid, UndercutTestGrid};
    use cpwlayout_io::GdsReader;

    #[test]
    fn test_new_chip_has_boundary() {
        let chip = DoseChip::new("DOSE_CHIP", 5000.0, 4000.0).unwrap();
        let canvas = chip.canvas().unwrap();
        assert_eq!(canvas.polygon_count(), 1);
        let bb = canvas.bbox().unwrap();
        assert_eq!(bb, BBox::centered(Point::ORIGIN, 5000.0, 4000.0));
        assert_eq!(canvas.polygons()[0].layer, BOUNDARY_LAYER);
        assert!(chip.dose_table().is_empty());
    }

    #[test]
    fn test_invalid_chip_size() {
        assert!(DoseChip::new("bad", 0.0, 100.0).is_err());
    }

    #[test]
    fn test_add_grid_moves_geometry_onto_chip() {
        let mut chip = DoseChip::new("chip", 5000.0, 5000.0).unwrap();
        let grid = GridSpec::DoseTest(DoseTestGrid {
            n_rows: 2,
            n_cols: 2,
            label: None,
            ..DoseTestGrid::default()
        });
        chip.add_grid(&grid).unwrap();

        assert_eq!(chip.library().canvas_count(), 1);
        // boundary + 4 Dolan junctions + 4 frames
        assert_eq!(chip.canvas().unwrap().polygon_count(), 1 + 4 * 21 + 4);
        let layers: Vec<u16> = chip.dose_table().unique().iter().map(|e| e.layer).collect();
        assert_eq!(layers, vec![2, 200, 201, 600, 601]);
    }

    #[test]
    fn test_failed_grid_leaves_chip_untouched() {
        let mut chip = DoseChip::new("chip", 5000.0, 5000.0).unwrap();
        // second cell has a zero gap
        let grid = GridSpec::DoseArray(DoseArrayGrid {
            n_rows: 2,
            n_cols: 1,
            gaps: (0.2, 0.0),
            ..DoseArrayGrid::default()
        });
        assert!(matches!(chip.add_grid(&grid), Err(DoseError::Draw(_))));
        assert_eq!(chip.library().canvas_count(), 1);
        assert_eq!(chip.canvas().unwrap().polygon_count(), 1);
        assert!(chip.dose_table().is_empty());
        assert!(chip.dose_table().array_notes().is_empty());
    }

    #[test]
    fn test_dose_table_path() {
        assert_eq!(
            dose_table_path(Path::new("out/chip.gds")),
            PathBuf::from("out/chip_dose_table.txt")
        );
    }

    #[test]
    fn test_save_writes_gds_and_table() {
        let mut chip = DoseChip::new("SAVE_TEST", 2000.0, 2000.0).unwrap();
        chip.add_grid(&GridSpec::UndercutTest(UndercutTestGrid {
            n_rows: 1,
            n_cols: 2,
            ..UndercutTestGrid::default()
        }))
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save_test.gds");
        let table = chip.save(&path, &ExportSettings::default()).unwrap();
        assert_eq!(table, dir.path().join("save_test_dose_table.txt"));

        let read = GdsReader::new(fs::File::open(&path).unwrap()).read().unwrap();
        assert_eq!(read.name, "SAVE_TEST");
        assert_eq!(read.polygon_count(), 1 + 2 * 21);
        let text = fs::read_to_string(&table).unwrap();
        assert_eq!(text, "# DOSE TABLE\n# Layer, Dose (uC/cm^2)\n");
    }

    #[test]
    fn test_failed_save_keeps_previous_output() {
        // outline corners at 5e8 um do not fit 32-bit database units
        let chip = DoseChip::new("HUGE", 1e9, 1e9).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.gds");
        fs::write(&path, b"previous export").unwrap();

        let err = chip.save(&path, &ExportSettings::default()).unwrap_err();
        assert!(matches!(err, DoseError::Gds(_)));
        assert_eq!(fs::read(&path).unwrap(), b"previous export");
        assert!(!dose_table_path(&path).exists());
    }
}
