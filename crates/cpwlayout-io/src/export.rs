use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cpwlayout_core::{Canvas, CanvasId, Library};

use crate::gds::{GdsError, GdsWriter};

/// Settings applied when a library is written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Database unit in micrometers; coordinates are rounded to it.
    pub db_unit_um: f64,
    /// LIBNAME override. The library's own name is used when unset.
    pub library_name: Option<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            db_unit_um: 0.001, // 1nm database unit
            library_name: None,
        }
    }
}

impl ExportSettings {
    fn library_name<'a>(&'a self, lib: &'a Library) -> &'a str {
        self.library_name.as_deref().unwrap_or(&lib.name)
    }
}

/// Encode the whole stream in memory and only then replace `path`, so a
/// rejected polygon leaves any existing file untouched.
fn write_stream<'a, I>(
    path: &Path,
    name: &str,
    canvases: I,
    settings: &ExportSettings,
) -> Result<(), GdsError>
where
    I: IntoIterator<Item = &'a Canvas>,
{
    let mut writer = GdsWriter::new(Vec::new()).with_db_unit(settings.db_unit_um);
    writer.write_canvases(name, canvases)?;
    fs::write(path, writer.into_inner())?;
    Ok(())
}

/// Write every canvas of `lib` to a GDS-II file at `path`.
pub fn export_library(
    lib: &Library,
    path: impl AsRef<Path>,
    settings: &ExportSettings,
) -> Result<(), GdsError> {
    let path = path.as_ref();
    write_stream(path, settings.library_name(lib), lib.canvases(), settings)?;
    log::info!(
        "exported {} canvas(es), {} polygons to {}",
        lib.canvas_count(),
        lib.polygon_count(),
        path.display()
    );
    Ok(())
}

/// Write a single canvas of `lib` to a GDS-II file at `path`.
pub fn export_canvas(
    lib: &Library,
    canvas: CanvasId,
    path: impl AsRef<Path>,
    settings: &ExportSettings,
) -> Result<(), GdsError> {
    let path = path.as_ref();
    let canvas = lib.canvas(&canvas).ok_or(GdsError::UnknownCanvas(canvas))?;
    write_stream(path, settings.library_name(lib), std::iter::once(canvas), settings)?;
    log::info!(
        "exported canvas '{}' ({} polygons) to {}",
        canvas.name,
        canvas.polygon_count(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gds::GdsReader;
    use cpwlayout_core::{BBox, Cursor, LayerId, LayerRoles, Point, Polygon};
    use std::fs::File;

    fn two_canvas_library() -> (Library, CanvasId) {
        let mut lib = Library::new("two");
        let roles = LayerRoles::default();
        let a = lib.create_canvas("a", BBox::from_size(100.0, 100.0));
        let b = lib.create_canvas("b", BBox::from_size(100.0, 100.0));
        Cursor::at(a, Point::new(0.0, 50.0), 0.0)
            .straight(&mut lib, &roles, 10.0, 5.0, 100.0)
            .unwrap();
        Cursor::at(b, Point::new(0.0, 50.0), 0.0)
            .straight(&mut lib, &roles, 0.0, 5.0, 50.0)
            .unwrap();
        (lib, b)
    }

    #[test]
    fn test_settings_defaults_and_json() {
        let settings = ExportSettings::default();
        assert_eq!(settings.db_unit_um, 0.001);
        let parsed: ExportSettings = serde_json::from_str(r#"{"library_name": "mask"}"#).unwrap();
        assert_eq!(parsed.db_unit_um, 0.001);
        assert_eq!(parsed.library_name.as_deref(), Some("mask"));
    }

    #[test]
    fn test_export_library_writes_all_canvases() {
        let (lib, _) = two_canvas_library();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.gds");
        export_library(&lib, &path, &ExportSettings::default()).unwrap();

        let read = GdsReader::new(File::open(&path).unwrap()).read().unwrap();
        assert_eq!(read.name, "two");
        let names: Vec<&str> = read.canvases().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(read.polygon_count(), 4);
    }

    #[test]
    fn test_export_single_canvas() {
        let (lib, b) = two_canvas_library();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.gds");
        let settings = ExportSettings {
            library_name: Some("only_b".into()),
            ..ExportSettings::default()
        };
        export_canvas(&lib, b, &path, &settings).unwrap();

        let read = GdsReader::new(File::open(&path).unwrap()).read().unwrap();
        assert_eq!(read.name, "only_b");
        assert_eq!(read.canvas_count(), 1);
        assert_eq!(read.polygon_count(), 1);
    }

    #[test]
    fn test_export_unknown_canvas() {
        let (lib, _) = two_canvas_library();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ghost.gds");
        let ghost = CanvasId::nil();
        let err = export_canvas(&lib, ghost, &path, &ExportSettings::default()).unwrap_err();
        assert!(matches!(err, GdsError::UnknownCanvas(id) if id == ghost));
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_export_keeps_existing_file() {
        let (mut lib, b) = two_canvas_library();
        lib.canvas_mut(&b).unwrap().insert(Polygon::new(
            LayerId::new(1, 0),
            vec![Point::new(0.0, 0.0), Point::new(1e9, 0.0), Point::new(0.0, 1.0)],
        ));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chip.gds");
        std::fs::write(&path, b"previous export").unwrap();

        let err = export_library(&lib, &path, &ExportSettings::default()).unwrap_err();
        assert!(matches!(err, GdsError::CoordinateOverflow(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"previous export");

        let err = export_canvas(&lib, b, &path, &ExportSettings::default()).unwrap_err();
        assert!(matches!(err, GdsError::CoordinateOverflow(_)));
        assert_eq!(std::fs::read(&path).unwrap(), b"previous export");
    }
}
