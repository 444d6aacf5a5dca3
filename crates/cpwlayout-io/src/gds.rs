//! GDS-II stream writer and boundary reader.
//!
//! GDS-II is the binary format mask shops consume. Every record is
//! `[2-byte length][2-byte record type][payload]`; a library is
//! HEADER, BGNLIB, LIBNAME, UNITS, then one BGNSTR ... ENDSTR block per
//! structure and a final ENDLIB.
//!
//! Each canvas becomes one structure and each polygon one BOUNDARY element.
//! The reader only understands BOUNDARY elements, which is all the writer
//! produces; other element kinds are skipped.

use std::io::{self, Read, Write};

use thiserror::Error;

use cpwlayout_core::{BBox, Canvas, CanvasId, LayerId, Library, Point, Polygon};

// ── GDS-II Record Types ──────────────────────────────────────────────

mod record_type {
    pub const HEADER: u16 = 0x0002;
    pub const BGNLIB: u16 = 0x0102;
    pub const LIBNAME: u16 = 0x0206;
    pub const UNITS: u16 = 0x0305;
    pub const ENDLIB: u16 = 0x0400;
    pub const BGNSTR: u16 = 0x0502;
    pub const STRNAME: u16 = 0x0606;
    pub const ENDSTR: u16 = 0x0700;
    pub const BOUNDARY: u16 = 0x0800;
    pub const PATH: u16 = 0x0900;
    pub const SREF: u16 = 0x0A00;
    pub const AREF: u16 = 0x0B00;
    pub const TEXT: u16 = 0x0C00;
    pub const LAYER: u16 = 0x0D02;
    pub const DATATYPE: u16 = 0x0E02;
    pub const XY: u16 = 0x1003;
    pub const ENDEL: u16 = 0x1100;
    pub const NODE: u16 = 0x1500;
    pub const BOX: u16 = 0x2D00;
}

/// Stream format version written in HEADER.
pub const GDS_VERSION: i16 = 600;

/// Largest vertex count a BOUNDARY may carry (the closing point excluded).
pub const MAX_BOUNDARY_VERTICES: usize = 8190;

/// BGNLIB/BGNSTR modification and access time. Fixed, so that exporting
/// the same library twice yields identical bytes.
const TIMESTAMP: [i16; 12] = [2000, 1, 1, 0, 0, 0, 2000, 1, 1, 0, 0, 0];

const MAX_RECORD_LEN: usize = u16::MAX as usize;

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum GdsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid GDS-II record at offset {offset}: {message}")]
    InvalidRecord { offset: u64, message: String },

    #[error("Unexpected record type 0x{record_type:04X}, expected 0x{expected:04X}")]
    UnexpectedRecord { record_type: u16, expected: u16 },

    #[error("Invalid database unit {0} um: expected a finite value > 0")]
    InvalidDbUnit(f64),

    #[error("Coordinate {0} is not finite")]
    InvalidCoordinates(f64),

    #[error("Coordinate {0} um does not fit a 32-bit database coordinate")]
    CoordinateOverflow(f64),

    #[error("Polygon on layer {layer} has {count} vertices, at most 8190 allowed")]
    TooManyVertices { layer: LayerId, count: usize },

    #[error("Record of {0} bytes exceeds the GDS-II record size limit")]
    RecordTooLong(usize),

    #[error("Canvas {0} does not exist in this library")]
    UnknownCanvas(CanvasId),
}

// ── GDS-II Record ─────────────────────────────────────────────────────

#[derive(Debug)]
struct GdsRecord {
    record_type: u16,
    offset: u64,
    data: Vec<u8>,
}

impl GdsRecord {
    fn as_i16_vec(&self) -> Vec<i16> {
        self.data
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]))
            .collect()
    }

    fn as_i32_vec(&self) -> Vec<i32> {
        self.data
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn as_string(&self) -> String {
        let s: String = self.data.iter().map(|&b| b as char).collect();
        s.trim_end_matches('\0').to_string()
    }

    fn as_f64_vec(&self) -> Vec<f64> {
        self.data
            .chunks_exact(8)
            .map(|c| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(c);
                gds_real8_to_f64(&bytes)
            })
            .collect()
    }

    fn first_u16(&self) -> Result<u16, GdsError> {
        self.as_i16_vec()
            .first()
            .map(|&v| v as u16)
            .ok_or_else(|| self.invalid("missing 16-bit value"))
    }

    fn invalid(&self, message: &str) -> GdsError {
        GdsError::InvalidRecord {
            offset: self.offset,
            message: format!("record 0x{:04X}: {}", self.record_type, message),
        }
    }
}

/// Convert GDS-II excess-64 real format to IEEE 754 f64.
fn gds_real8_to_f64(bytes: &[u8; 8]) -> f64 {
    if bytes.iter().all(|&b| b == 0) {
        return 0.0;
    }

    let sign = if bytes[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    let exponent = (bytes[0] & 0x7F) as i32 - 64;

    let mut mantissa: u64 = 0;
    for &b in &bytes[1..] {
        mantissa = (mantissa << 8) | (b as u64);
    }

    let mantissa_f = mantissa as f64 / (1u64 << 56) as f64;
    sign * mantissa_f * 16.0_f64.powi(exponent)
}

/// Convert IEEE 754 f64 to GDS-II excess-64 real format.
fn f64_to_gds_real8(value: f64) -> [u8; 8] {
    if value == 0.0 {
        return [0u8; 8];
    }

    let sign_bit: u8 = if value < 0.0 { 0x80 } else { 0x00 };
    let mut val = value.abs();

    // normalize so that 1/16 <= val < 1
    let mut exponent: i32 = 0;
    while val >= 1.0 && exponent < 63 {
        val /= 16.0;
        exponent += 1;
    }
    while val < 1.0 / 16.0 && exponent > -64 {
        val *= 16.0;
        exponent -= 1;
    }

    let mut mantissa = (val * (1u64 << 56) as f64).round() as u64;
    if mantissa >= 1u64 << 56 {
        mantissa >>= 4;
        exponent += 1;
    }
    let exp_byte = sign_bit | ((exponent + 64) as u8 & 0x7F);

    let mut result = [0u8; 8];
    result[0] = exp_byte;
    result[1..].copy_from_slice(&mantissa.to_be_bytes()[1..]);
    result
}

fn check_db_unit(db_unit_um: f64) -> Result<f64, GdsError> {
    if db_unit_um.is_finite() && db_unit_um > 0.0 {
        Ok(db_unit_um)
    } else {
        Err(GdsError::InvalidDbUnit(db_unit_um))
    }
}

// ── GDS-II Writer ─────────────────────────────────────────────────────

pub struct GdsWriter<W: Write> {
    writer: W,
    db_unit_um: f64,
}

impl<W: Write> GdsWriter<W> {
    /// Writer with a 1 nm database unit.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            db_unit_um: 0.001,
        }
    }

    pub fn with_db_unit(mut self, db_unit_um: f64) -> Self {
        self.db_unit_um = db_unit_um;
        self
    }

    /// Write every canvas of `lib`, in library order.
    pub fn write_library(&mut self, lib: &Library) -> Result<(), GdsError> {
        self.write_canvases(&lib.name, lib.canvases())
    }

    /// Write a library named `name` holding the given canvases.
    pub fn write_canvases<'a, I>(&mut self, name: &str, canvases: I) -> Result<(), GdsError>
    where
        I: IntoIterator<Item = &'a Canvas>,
    {
        check_db_unit(self.db_unit_um)?;
        self.write_i16_record(record_type::HEADER, &[GDS_VERSION])?;
        self.write_i16_record(record_type::BGNLIB, &TIMESTAMP)?;
        self.write_string_record(record_type::LIBNAME, name)?;
        // user unit = 1 um: db unit in user units, then db unit in meters
        self.write_real8_record(
            record_type::UNITS,
            &[self.db_unit_um, self.db_unit_um * 1e-6],
        )?;

        for canvas in canvases {
            self.write_structure(canvas)?;
        }

        self.write_record(record_type::ENDLIB, &[])?;
        self.writer.flush()?;
        Ok(())
    }

    /// Hand back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record_type: u16, data: &[u8]) -> Result<(), GdsError> {
        let total_len = data.len() + 4;
        if total_len > MAX_RECORD_LEN {
            return Err(GdsError::RecordTooLong(total_len));
        }
        self.writer.write_all(&(total_len as u16).to_be_bytes())?;
        self.writer.write_all(&record_type.to_be_bytes())?;
        if !data.is_empty() {
            self.writer.write_all(data)?;
        }
        Ok(())
    }

    fn write_i16_record(&mut self, record_type: u16, values: &[i16]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_record(record_type, &data)
    }

    fn write_i32_record(&mut self, record_type: u16, values: &[i32]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_record(record_type, &data)
    }

    fn write_string_record(&mut self, record_type: u16, s: &str) -> Result<(), GdsError> {
        let mut data: Vec<u8> = s.bytes().collect();
        // GDS strings must be even length
        if data.len() % 2 != 0 {
            data.push(0);
        }
        self.write_record(record_type, &data)
    }

    fn write_real8_record(&mut self, record_type: u16, values: &[f64]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| f64_to_gds_real8(*v)).collect();
        self.write_record(record_type, &data)
    }

    fn write_structure(&mut self, canvas: &Canvas) -> Result<(), GdsError> {
        if canvas.exceeds_extents() {
            log::warn!(
                "canvas '{}' has geometry outside its extents {:?}",
                canvas.name,
                canvas.extents
            );
        }

        self.write_i16_record(record_type::BGNSTR, &TIMESTAMP)?;
        self.write_string_record(record_type::STRNAME, &canvas.name)?;
        for polygon in canvas.polygons() {
            self.write_boundary(polygon)?;
        }
        self.write_record(record_type::ENDSTR, &[])?;
        log::debug!(
            "wrote structure '{}' ({} polygons)",
            canvas.name,
            canvas.polygon_count()
        );
        Ok(())
    }

    fn to_db(&self, value: f64) -> Result<i32, GdsError> {
        if !value.is_finite() {
            return Err(GdsError::InvalidCoordinates(value));
        }
        let scaled = (value / self.db_unit_um).round();
        if scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
            return Err(GdsError::CoordinateOverflow(value));
        }
        Ok(scaled as i32)
    }

    fn write_boundary(&mut self, polygon: &Polygon) -> Result<(), GdsError> {
        let count = polygon.vertex_count();
        if count > MAX_BOUNDARY_VERTICES {
            return Err(GdsError::TooManyVertices {
                layer: polygon.layer,
                count,
            });
        }

        let mut coords: Vec<i32> = Vec::with_capacity(2 * (count + 1));
        for p in polygon.vertices.iter().chain(polygon.vertices.first()) {
            coords.push(self.to_db(p.x)?);
            coords.push(self.to_db(p.y)?);
        }

        self.write_record(record_type::BOUNDARY, &[])?;
        self.write_i16_record(record_type::LAYER, &[polygon.layer.layer as i16])?;
        self.write_i16_record(record_type::DATATYPE, &[polygon.layer.datatype as i16])?;
        self.write_i32_record(record_type::XY, &coords)?;
        self.write_record(record_type::ENDEL, &[])?;
        Ok(())
    }
}

// ── GDS-II Reader ─────────────────────────────────────────────────────

pub struct GdsReader<R: Read> {
    reader: R,
    offset: u64,
    db_unit_um: f64,
}

impl<R: Read> GdsReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            db_unit_um: 0.001,
        }
    }

    /// Database unit in micrometers, as declared by the stream's UNITS record.
    pub fn db_unit_um(&self) -> f64 {
        self.db_unit_um
    }

    /// Read the whole stream into a [`Library`], one canvas per structure.
    /// A canvas's extents are the bounding box of what it contains.
    pub fn read(&mut self) -> Result<Library, GdsError> {
        let mut lib = Library::new("imported");

        let header = self.expect_record()?;
        if header.record_type != record_type::HEADER {
            return Err(GdsError::UnexpectedRecord {
                record_type: header.record_type,
                expected: record_type::HEADER,
            });
        }
        log::info!("GDS-II version: {}", header.first_u16()?);

        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::LIBNAME => {
                    lib.name = rec.as_string();
                }
                record_type::UNITS => {
                    let units = rec.as_f64_vec();
                    if units.len() < 2 {
                        return Err(rec.invalid("UNITS needs two values"));
                    }
                    self.db_unit_um = check_db_unit(units[1] * 1e6)?;
                    log::info!("Database unit: {} um", self.db_unit_um);
                }
                record_type::BGNSTR => {
                    let canvas = self.read_structure()?;
                    lib.add_canvas(canvas);
                }
                record_type::ENDLIB => break,
                _ => {}
            }
        }

        log::info!(
            "Read library '{}': {} structures, {} polygons",
            lib.name,
            lib.canvas_count(),
            lib.polygon_count()
        );
        Ok(lib)
    }

    fn read_record(&mut self) -> Result<Option<GdsRecord>, GdsError> {
        let offset = self.offset;
        let mut len_buf = [0u8; 2];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(GdsError::Io(e)),
        }

        let total_len = u16::from_be_bytes(len_buf) as usize;
        if total_len < 4 {
            return Err(GdsError::InvalidRecord {
                offset,
                message: format!("Record length {} is too small", total_len),
            });
        }

        let mut type_buf = [0u8; 2];
        self.reader.read_exact(&mut type_buf)?;
        let record_type = u16::from_be_bytes(type_buf);

        let mut data = vec![0u8; total_len - 4];
        self.reader.read_exact(&mut data)?;
        self.offset += total_len as u64;

        Ok(Some(GdsRecord {
            record_type,
            offset,
            data,
        }))
    }

    fn expect_record(&mut self) -> Result<GdsRecord, GdsError> {
        self.read_record()?.ok_or(GdsError::InvalidRecord {
            offset: self.offset,
            message: "Unexpected end of stream".into(),
        })
    }

    fn read_structure(&mut self) -> Result<Canvas, GdsError> {
        let mut name = String::from("unnamed");
        let mut polygons = Vec::new();

        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::STRNAME => {
                    name = rec.as_string();
                }
                record_type::BOUNDARY => {
                    if let Some(polygon) = self.read_boundary()? {
                        polygons.push(polygon);
                    }
                }
                record_type::PATH
                | record_type::SREF
                | record_type::AREF
                | record_type::TEXT
                | record_type::NODE
                | record_type::BOX => {
                    log::debug!("skipping element 0x{:04X} in '{}'", rec.record_type, name);
                    self.skip_to_endel()?;
                }
                record_type::ENDSTR => break,
                _ => {}
            }
        }

        let extents = polygons
            .iter()
            .filter_map(Polygon::bbox)
            .reduce(|acc, bb| acc.union(&bb))
            .unwrap_or(BBox::new(Point::ORIGIN, Point::ORIGIN));
        let mut canvas = Canvas::new(&name, extents);
        canvas.extend(polygons);
        Ok(canvas)
    }

    fn read_boundary(&mut self) -> Result<Option<Polygon>, GdsError> {
        let mut layer: u16 = 0;
        let mut datatype: u16 = 0;
        let mut points: Vec<Point> = Vec::new();

        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::LAYER => layer = rec.first_u16()?,
                record_type::DATATYPE => datatype = rec.first_u16()?,
                record_type::XY => {
                    if rec.data.len() % 8 != 0 {
                        return Err(rec.invalid("XY payload is not a whole number of points"));
                    }
                    let coords = rec.as_i32_vec();
                    points.extend(coords.chunks_exact(2).map(|pair| {
                        Point::new(
                            pair[0] as f64 * self.db_unit_um,
                            pair[1] as f64 * self.db_unit_um,
                        )
                    }));
                }
                record_type::ENDEL => break,
                _ => {}
            }
        }

        // GDS boundaries repeat the first point; remove it
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        if points.is_empty() {
            return Ok(None);
        }
        Ok(Some(Polygon::new(LayerId::new(layer, datatype), points)))
    }

    fn skip_to_endel(&mut self) -> Result<(), GdsError> {
        loop {
            let rec = self.expect_record()?;
            if rec.record_type == record_type::ENDEL {
                return Ok(());
            }
        }
    }
}
