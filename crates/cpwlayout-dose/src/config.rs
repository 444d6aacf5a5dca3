use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cpwlayout_io::ExportSettings;

use crate::chip::DoseChip;
use crate::error::DoseError;
use crate::grid::GridSpec;
use crate::junction::{JunctionGeometry, JunctionStyle, ManhattanGeometry};

/// A whole chip as described in a JSON file.
///
/// ```json
/// {
///   "name": "DOSE_CHIP",
///   "size": [7000, 7000],
///   "grids": [
///     {"type": "dose_test", "n_rows": 15, "n_cols": 15, "spacing": 50,
///      "position": {"x": -3400, "y": 2600}}
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipConfig {
    pub name: String,
    /// Chip width and height, um.
    pub size: (f64, f64),
    /// GDS output path; the command line takes precedence.
    pub output: Option<PathBuf>,
    pub junction_geometry: JunctionGeometry,
    pub manhattan_geometry: ManhattanGeometry,
    pub export: ExportSettings,
    pub grids: Vec<GridSpec>,
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            name: "DOSE_CHIP".into(),
            size: (5000.0, 5000.0),
            output: None,
            junction_geometry: JunctionGeometry::default(),
            manhattan_geometry: ManhattanGeometry::default(),
            export: ExportSettings::default(),
            grids: Vec::new(),
        }
    }
}

impl ChipConfig {
    pub fn from_json(json: &str) -> Result<Self, DoseError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DoseError> {
        let path = path.as_ref();
        let config = Self::from_json(&fs::read_to_string(path)?)?;
        log::debug!("loaded chip config {} ({} grids)", path.display(), config.grids.len());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, DoseError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the chip, adding grids in order.
    pub fn build(&self) -> Result<DoseChip, DoseError> {
        let geometry = JunctionStyle {
            dolan: self.junction_geometry,
            manhattan: self.manhattan_geometry,
            ..JunctionStyle::default()
        };
        let mut chip = DoseChip::new(&self.name, self.size.0, self.size.1)?.with_geometry(geometry);
        for grid in &self.grids {
            chip.add_grid(grid)?;
        }
        Ok(chip)
    }
}
