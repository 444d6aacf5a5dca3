//! # cpwlayout I/O
//!
//! GDS-II export of cpwlayout libraries, plus a boundary-only reader used to
//! check exported streams.

pub mod export;
pub mod gds;

pub use export::{export_canvas, export_library, ExportSettings};
pub use gds::{GdsError, GdsReader, GdsWriter};
