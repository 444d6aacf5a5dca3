//! # cpwlayout Dose
//!
//! Electron-beam dose test chips built on the cpwlayout drawing engine.
//! Josephson junctions (Dolan bridge, Dolan series arrays, Manhattan
//! crosses) are drawn with the CPW primitives and laid out in grids that
//! sweep exposure dose or junction geometry. Each chip is saved as a GDS-II
//! file plus a plain-text layer/dose table.

pub mod chip;
pub mod config;
pub mod dose_table;
pub mod error;
pub mod grid;
pub mod junction;
pub mod label;

pub use chip::{dose_table_path, DoseChip};
pub use config::ChipConfig;
pub use dose_table::{DoseArrayNote, DoseEntry, DoseKind, DoseTable};
pub use error::DoseError;
pub use grid::{
    linspace, place_junction, CellFrame, DoseArrayGrid, DoseTestGrid, GridSpec, UndercutTestGrid,
    WidthSweepGrid,
};
pub use junction::{
    draw_dolan, draw_dolan_array, draw_manhattan, JunctionDrawer, JunctionGeometry, JunctionKind,
    JunctionSpec, JunctionStyle, ManhattanGeometry,
};
pub use label::{draw_text, text_width, CellLabel};
