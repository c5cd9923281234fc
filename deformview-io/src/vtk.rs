//! Legacy VTK format support
//!
//! Reads `DATASET POLYDATA` files in ASCII or BINARY encoding, including the
//! 5.x `OFFSETS`/`CONNECTIVITY` cell layout. Every scalar, vector, normal,
//! texture-coordinate, tensor and field array in `POINT_DATA` is loaded.
//! `CELL_DATA` sections are parsed and skipped.

use crate::{IoError, MeshReader, MeshWriter};
use deformview_core::{DataArray, PolyData, Point3f, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Data encoding of a legacy VTK file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VtkEncoding {
    Ascii,
    Binary,
}

/// Header information of a legacy VTK file
#[derive(Debug, Clone, PartialEq)]
pub struct VtkHeader {
    pub version: String,
    pub title: String,
    pub encoding: VtkEncoding,
    pub dataset: String,
}

/// Write options for legacy VTK files
#[derive(Debug, Clone)]
pub struct VtkWriteOptions {
    pub encoding: VtkEncoding,
    pub title: String,
}

impl Default for VtkWriteOptions {
    fn default() -> Self {
        Self {
            encoding: VtkEncoding::Ascii,
            title: "deformview".to_string(),
        }
    }
}

pub struct VtkReader;
pub struct VtkWriter;

impl MeshReader for VtkReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<PolyData> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => IoError::Io(e),
        })?;
        let (_, mesh) = Self::read_bytes(&data)?;
        Ok(mesh)
    }
}

impl MeshWriter for VtkWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &PolyData, path: P) -> Result<()> {
        Self::write_with_options(mesh, path, &VtkWriteOptions::default())
    }
}

/// Attribute section currently being parsed
#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Geometry,
    PointData(usize),
    CellData(usize),
}

impl VtkReader {
    /// Parse a complete legacy VTK file held in memory
    pub fn read_bytes(data: &[u8]) -> std::result::Result<(VtkHeader, PolyData), IoError> {
        let mut cursor = Cursor::new(data);
        let header = read_header(&mut cursor)?;
        if !header.dataset.eq_ignore_ascii_case("POLYDATA") {
            return Err(IoError::InvalidFormat {
                format: format!("dataset {} (only POLYDATA is supported)", header.dataset),
            });
        }
        cursor.encoding = header.encoding;

        let mut mesh = PolyData::new();
        let mut section = Section::Geometry;

        while let Some(keyword) = cursor.token()? {
            match keyword.to_ascii_uppercase().as_str() {
                "POINTS" => {
                    let n = cursor.usize_token("POINTS count")?;
                    let dtype = DataType::parse(&cursor.required_token("POINTS type")?)?;
                    let count = cursor.product(n, 3, "POINTS")?;
                    let values = cursor.values(count, dtype, "POINTS")?;
                    mesh.points = values
                        .chunks_exact(3)
                        .map(|c| Point3f::new(c[0] as f32, c[1] as f32, c[2] as f32))
                        .collect();
                }
                "POLYGONS" => {
                    for cell in read_cells(&mut cursor, "POLYGONS")? {
                        mesh.add_polygon(&cell);
                    }
                }
                "TRIANGLE_STRIPS" => {
                    for strip in read_cells(&mut cursor, "TRIANGLE_STRIPS")? {
                        for i in 2..strip.len() {
                            if i % 2 == 0 {
                                mesh.polys.push([strip[i - 2], strip[i - 1], strip[i]]);
                            } else {
                                mesh.polys.push([strip[i - 1], strip[i - 2], strip[i]]);
                            }
                        }
                    }
                }
                "VERTICES" | "LINES" => {
                    let skipped = read_cells(&mut cursor, &keyword)?;
                    debug!("vtk: ignoring {} {} cells", skipped.len(), keyword);
                }
                "POINT_DATA" => {
                    section = Section::PointData(cursor.usize_token("POINT_DATA count")?);
                }
                "CELL_DATA" => {
                    section = Section::CellData(cursor.usize_token("CELL_DATA count")?);
                }
                "METADATA" => cursor.skip_metadata()?,
                "FIELD" if section == Section::Geometry => {
                    // Dataset-level field data, not attached to points
                    for array in read_field(&mut cursor, 0)? {
                        debug!("vtk: ignoring dataset field array '{}'", array.name);
                    }
                }
                _ => {
                    let tuples = match section {
                        Section::PointData(n) | Section::CellData(n) => n,
                        Section::Geometry => {
                            return Err(cursor.error(format!("unexpected keyword '{}'", keyword)));
                        }
                    };
                    let attribute = read_attribute(&mut cursor, &keyword, tuples)?;
                    if let Section::PointData(_) = section {
                        attach_point_attribute(&mut mesh, attribute)?;
                    }
                }
            }
        }

        mesh.validate().map_err(|e| cursor.error(e.to_string()))?;
        Ok((header, mesh))
    }
}

impl VtkWriter {
    /// Write a mesh with explicit options
    pub fn write_with_options<P: AsRef<Path>>(
        mesh: &PolyData,
        path: P,
        options: &VtkWriteOptions,
    ) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(mesh, &mut writer, options)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a mesh to any writer
    pub fn write_to<W: Write>(mesh: &PolyData, w: &mut W, options: &VtkWriteOptions) -> Result<()> {
        let binary = options.encoding == VtkEncoding::Binary;
        writeln!(w, "# vtk DataFile Version 3.0")?;
        writeln!(w, "{}", options.title.lines().next().unwrap_or(""))?;
        writeln!(w, "{}", if binary { "BINARY" } else { "ASCII" })?;
        writeln!(w, "DATASET POLYDATA")?;

        writeln!(w, "POINTS {} float", mesh.points.len())?;
        let coords: Vec<f32> = mesh.points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        write_floats(w, &coords, 3, binary)?;

        if !mesh.polys.is_empty() {
            writeln!(w, "POLYGONS {} {}", mesh.polys.len(), mesh.polys.len() * 4)?;
            if binary {
                for face in &mesh.polys {
                    for v in [3, face[0], face[1], face[2]] {
                        w.write_all(&(v as i32).to_be_bytes())?;
                    }
                }
                writeln!(w)?;
            } else {
                for face in &mesh.polys {
                    writeln!(w, "3 {} {} {}", face[0], face[1], face[2])?;
                }
            }
        }

        let pd = &mesh.point_data;
        if pd.is_empty() {
            return Ok(());
        }
        writeln!(w, "POINT_DATA {}", mesh.points.len())?;

        let vectors = pd.vectors().map(|a| a.name.clone());
        let normals = pd.normals().map(|a| a.name.clone());
        let mut field_arrays = Vec::new();
        // Active scalars first so a reader picks them as the default colouring
        let mut ordered: Vec<&DataArray> = pd.scalars().into_iter().collect();
        ordered.extend(pd.arrays().iter().filter(|a| Some(&a.name) != pd.scalars().map(|s| &s.name)));

        for array in ordered {
            let name = encode_name(&array.name);
            if array.components == 1 {
                writeln!(w, "SCALARS {} float 1", name)?;
                writeln!(w, "LOOKUP_TABLE default")?;
                write_floats(w, &array.values, 1, binary)?;
            } else if Some(&array.name) == vectors.as_ref() {
                writeln!(w, "VECTORS {} float", name)?;
                write_floats(w, &array.values, 3, binary)?;
            } else if Some(&array.name) == normals.as_ref() {
                writeln!(w, "NORMALS {} float", name)?;
                write_floats(w, &array.values, 3, binary)?;
            } else {
                field_arrays.push(array);
            }
        }

        if !field_arrays.is_empty() {
            writeln!(w, "FIELD FieldData {}", field_arrays.len())?;
            for array in field_arrays {
                writeln!(
                    w,
                    "{} {} {} float",
                    encode_name(&array.name),
                    array.components,
                    array.len()
                )?;
                write_floats(w, &array.values, array.components, binary)?;
            }
        }

        Ok(())
    }
}

fn write_floats<W: Write>(w: &mut W, values: &[f32], per_line: usize, binary: bool) -> Result<()> {
    if binary {
        for v in values {
            w.write_all(&v.to_be_bytes())?;
        }
        writeln!(w)?;
    } else {
        for chunk in values.chunks(per_line.max(1)) {
            let line: Vec<String> = chunk.iter().map(|v| v.to_string()).collect();
            writeln!(w, "{}", line.join(" "))?;
        }
    }
    Ok(())
}

/// Names with spaces are stored with `%20` in legacy files
fn encode_name(name: &str) -> String {
    name.replace('%', "%25").replace(' ', "%20")
}

fn decode_name(name: &str) -> String {
    name.replace("%20", " ").replace("%25", "%")
}

/// A parsed attribute block before it is attached to the mesh
enum Attribute {
    Scalars(DataArray),
    Vectors(DataArray),
    Normals(DataArray),
    Other(Vec<DataArray>),
}

fn attach_point_attribute(mesh: &mut PolyData, attribute: Attribute) -> std::result::Result<(), IoError> {
    let n = mesh.points.len();
    let check = |array: &DataArray| {
        if array.len() == n {
            Ok(())
        } else {
            Err(IoError::ParseError {
                offset: 0,
                message: format!(
                    "point array '{}' has {} tuples for {} points",
                    array.name,
                    array.len(),
                    n
                ),
            })
        }
    };
    match attribute {
        Attribute::Scalars(array) => {
            check(&array)?;
            let first = mesh.point_data.scalars().is_none();
            let name = array.name.clone();
            mesh.point_data.add_array(array);
            if first {
                mesh.point_data.set_active_scalars(&name);
            }
        }
        Attribute::Vectors(array) => {
            check(&array)?;
            let first = !mesh.point_data.has_active_vectors();
            let name = array.name.clone();
            mesh.point_data.add_array(array);
            if first {
                mesh.point_data.set_active_vectors(&name);
            }
        }
        Attribute::Normals(array) => {
            check(&array)?;
            let name = array.name.clone();
            mesh.point_data.add_array(array);
            mesh.point_data.set_active_normals(&name);
        }
        Attribute::Other(arrays) => {
            for array in arrays {
                check(&array)?;
                mesh.point_data.add_array(array);
            }
        }
    }
    Ok(())
}

fn read_attribute(cursor: &mut Cursor, keyword: &str, tuples: usize) -> std::result::Result<Attribute, IoError> {
    match keyword.to_ascii_uppercase().as_str() {
        "SCALARS" => {
            let name = decode_name(&cursor.required_token("SCALARS name")?);
            let dtype = DataType::parse(&cursor.required_token("SCALARS type")?)?;
            // Optional component count, then optional LOOKUP_TABLE line
            let mut components = 1;
            let mut next = cursor.peek_token()?;
            if let Some(t) = &next {
                if let Ok(c) = t.parse::<usize>() {
                    components = c;
                    cursor.token()?;
                    next = cursor.peek_token()?;
                }
            }
            if next.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("LOOKUP_TABLE")) {
                cursor.token()?;
                cursor.required_token("LOOKUP_TABLE name")?;
            }
            let count = cursor.product(tuples, components, "SCALARS")?;
            let values = cursor.values(count, dtype, "SCALARS")?;
            Ok(Attribute::Scalars(to_array(name, components, values)?))
        }
        "COLOR_SCALARS" => {
            let name = decode_name(&cursor.required_token("COLOR_SCALARS name")?);
            let components = cursor.usize_token("COLOR_SCALARS count")?;
            let dtype = if cursor.encoding == VtkEncoding::Binary {
                DataType::UChar
            } else {
                DataType::Float
            };
            let count = cursor.product(tuples, components, "COLOR_SCALARS")?;
            let mut values = cursor.values(count, dtype, "COLOR_SCALARS")?;
            if dtype == DataType::UChar {
                values.iter_mut().for_each(|v| *v /= 255.0);
            }
            Ok(Attribute::Other(vec![to_array(name, components, values)?]))
        }
        "LOOKUP_TABLE" => {
            cursor.required_token("LOOKUP_TABLE name")?;
            let size = cursor.usize_token("LOOKUP_TABLE size")?;
            let dtype = if cursor.encoding == VtkEncoding::Binary {
                DataType::UChar
            } else {
                DataType::Float
            };
            let count = cursor.product(size, 4, "LOOKUP_TABLE")?;
            cursor.values(count, dtype, "LOOKUP_TABLE")?;
            Ok(Attribute::Other(Vec::new()))
        }
        "VECTORS" | "NORMALS" => {
            let name = decode_name(&cursor.required_token("attribute name")?);
            let dtype = DataType::parse(&cursor.required_token("attribute type")?)?;
            let count = cursor.product(tuples, 3, keyword)?;
            let values = cursor.values(count, dtype, keyword)?;
            let array = to_array(name, 3, values)?;
            if keyword.eq_ignore_ascii_case("VECTORS") {
                Ok(Attribute::Vectors(array))
            } else {
                Ok(Attribute::Normals(array))
            }
        }
        "TEXTURE_COORDINATES" => {
            let name = decode_name(&cursor.required_token("TEXTURE_COORDINATES name")?);
            let dim = cursor.usize_token("TEXTURE_COORDINATES dimension")?;
            let dtype = DataType::parse(&cursor.required_token("TEXTURE_COORDINATES type")?)?;
            let count = cursor.product(tuples, dim, "TEXTURE_COORDINATES")?;
            let values = cursor.values(count, dtype, "TEXTURE_COORDINATES")?;
            Ok(Attribute::Other(vec![to_array(name, dim, values)?]))
        }
        "TENSORS" | "TENSORS6" => {
            let width = if keyword.eq_ignore_ascii_case("TENSORS") { 9 } else { 6 };
            let name = decode_name(&cursor.required_token("TENSORS name")?);
            let dtype = DataType::parse(&cursor.required_token("TENSORS type")?)?;
            let count = cursor.product(tuples, width, "TENSORS")?;
            let values = cursor.values(count, dtype, "TENSORS")?;
            Ok(Attribute::Other(vec![to_array(name, width, values)?]))
        }
        "FIELD" => Ok(Attribute::Other(read_field(cursor, tuples)?)),
        "METADATA" => {
            cursor.skip_metadata()?;
            Ok(Attribute::Other(Vec::new()))
        }
        other => Err(cursor.error(format!("unknown attribute keyword '{}'", other))),
    }
}

/// `FIELD name n` followed by `n` arrays of `name components tuples type`
fn read_field(cursor: &mut Cursor, _expected_tuples: usize) -> std::result::Result<Vec<DataArray>, IoError> {
    cursor.required_token("FIELD name")?;
    let count = cursor.usize_token("FIELD array count")?;
    let mut arrays = Vec::new();
    for _ in 0..count {
        let name = cursor.required_token("field array name")?;
        if name == "NULL_ARRAY" {
            continue;
        }
        let components = cursor.usize_token("field array components")?;
        let tuples = cursor.usize_token("field array tuples")?;
        let dtype = DataType::parse(&cursor.required_token("field array type")?)?;
        let total = cursor.product(components, tuples, "FIELD array")?;
        let values = cursor.values(total, dtype, "FIELD array")?;
        if cursor.peek_token()?.as_deref() == Some("METADATA") {
            cursor.token()?;
            cursor.skip_metadata()?;
        }
        arrays.push(to_array(decode_name(&name), components, values)?);
    }
    Ok(arrays)
}

fn to_array(name: String, components: usize, values: Vec<f64>) -> std::result::Result<DataArray, IoError> {
    DataArray::new(name, components, values.into_iter().map(|v| v as f32).collect()).map_err(|e| {
        IoError::ParseError {
            offset: 0,
            message: e.to_string(),
        }
    })
}

/// Read a cell block in either the classic `n size` layout or the
/// `OFFSETS`/`CONNECTIVITY` layout
fn read_cells(cursor: &mut Cursor, keyword: &str) -> std::result::Result<Vec<Vec<usize>>, IoError> {
    let n = cursor.usize_token("cell count")?;
    let size = cursor.usize_token("cell list size")?;

    if cursor.peek_token()?.as_deref() == Some("OFFSETS") {
        cursor.token()?;
        let dtype = DataType::parse(&cursor.required_token("OFFSETS type")?)?;
        // In this layout the first number is the offset count (cells + 1)
        let offsets = cursor.values(n, dtype, "OFFSETS")?;
        cursor.expect_token("CONNECTIVITY")?;
        let dtype = DataType::parse(&cursor.required_token("CONNECTIVITY type")?)?;
        let connectivity = cursor.values(size, dtype, "CONNECTIVITY")?;
        let mut cells = Vec::new();
        for w in offsets.windows(2) {
            let start = cursor.index(w[0], "OFFSETS")?;
            let end = cursor.index(w[1], "OFFSETS")?;
            if start > end || end > connectivity.len() {
                return Err(cursor.error(format!("{} offsets out of range", keyword)));
            }
            let cell = connectivity[start..end]
                .iter()
                .map(|&i| cursor.index(i, "CONNECTIVITY"))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            cells.push(cell);
        }
        return Ok(cells);
    }

    let flat = cursor.values(size, DataType::Int, keyword)?;
    let mut cells = Vec::new();
    let mut i = 0;
    for _ in 0..n {
        let count = flat
            .get(i)
            .ok_or_else(|| cursor.error(format!("{} list is shorter than declared", keyword)))?;
        let count = cursor.index(*count, keyword)?;
        let end = match (i + 1).checked_add(count) {
            Some(end) if end <= flat.len() => end,
            _ => return Err(cursor.error(format!("{} list is shorter than declared", keyword))),
        };
        let cell = flat[i + 1..end]
            .iter()
            .map(|&v| cursor.index(v, keyword))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        cells.push(cell);
        i = end;
    }
    Ok(cells)
}

fn read_header(cursor: &mut Cursor) -> std::result::Result<VtkHeader, IoError> {
    let first = cursor.line("version line")?;
    let version = first
        .trim()
        .strip_prefix("# vtk DataFile Version")
        .ok_or_else(|| IoError::InvalidFormat {
            format: "missing '# vtk DataFile Version' header".to_string(),
        })?
        .trim()
        .to_string();
    let title = cursor.line("title line")?.trim_end().to_string();
    let encoding = match cursor.required_token("encoding")?.to_ascii_uppercase().as_str() {
        "ASCII" => VtkEncoding::Ascii,
        "BINARY" => VtkEncoding::Binary,
        other => {
            return Err(IoError::InvalidFormat {
                format: format!("unknown encoding '{}'", other),
            })
        }
    };
    cursor.expect_token("DATASET")?;
    let dataset = cursor.required_token("dataset type")?;
    Ok(VtkHeader {
        version,
        title,
        encoding,
        dataset,
    })
}

/// Numeric types that may appear in a legacy file
#[derive(Debug, Clone, Copy, PartialEq)]
enum DataType {
    Bit,
    UChar,
    Char,
    UShort,
    Short,
    UInt,
    Int,
    ULong,
    Long,
    Float,
    Double,
}

impl DataType {
    fn parse(s: &str) -> std::result::Result<Self, IoError> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "bit" => DataType::Bit,
            "unsigned_char" | "vtktypeuint8" => DataType::UChar,
            "char" | "vtktypeint8" => DataType::Char,
            "unsigned_short" | "vtktypeuint16" => DataType::UShort,
            "short" | "vtktypeint16" => DataType::Short,
            "unsigned_int" | "vtktypeuint32" => DataType::UInt,
            "int" | "vtktypeint32" => DataType::Int,
            "unsigned_long" | "vtktypeuint64" => DataType::ULong,
            "long" | "vtktypeint64" | "vtkidtype" => DataType::Long,
            "float" | "vtktypefloat32" => DataType::Float,
            "double" | "vtktypefloat64" => DataType::Double,
            other => {
                return Err(IoError::InvalidFormat {
                    format: format!("unknown data type '{}'", other),
                })
            }
        })
    }

    fn size(self) -> usize {
        match self {
            DataType::Bit | DataType::UChar | DataType::Char => 1,
            DataType::UShort | DataType::Short => 2,
            DataType::UInt | DataType::Int | DataType::Float => 4,
            DataType::ULong | DataType::Long | DataType::Double => 8,
        }
    }

    fn decode_be(self, b: &[u8]) -> f64 {
        match self {
            DataType::Bit | DataType::UChar => b[0] as f64,
            DataType::Char => b[0] as i8 as f64,
            DataType::UShort => u16::from_be_bytes([b[0], b[1]]) as f64,
            DataType::Short => i16::from_be_bytes([b[0], b[1]]) as f64,
            DataType::UInt => u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64,
            DataType::Int => i32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64,
            DataType::Float => f32::from_be_bytes([b[0], b[1], b[2], b[3]]) as f64,
            DataType::ULong => u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64,
            DataType::Long => i64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64,
            DataType::Double => f64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]),
        }
    }
}

/// Byte cursor mixing whitespace-separated tokens with raw big-endian blocks
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    encoding: VtkEncoding,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            encoding: VtkEncoding::Ascii,
        }
    }

    fn error(&self, message: String) -> IoError {
        IoError::ParseError {
            offset: self.pos,
            message,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.data.len() && self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Next token, or `None` at end of input
    fn token(&mut self) -> std::result::Result<Option<String>, IoError> {
        self.skip_whitespace();
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let start = self.pos;
        while self.pos < self.data.len() && !self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .map(|s| Some(s.to_string()))
            .map_err(|_| self.error("token is not valid UTF-8".to_string()))
    }

    /// Look at the next token without consuming it. In binary files this may
    /// land on raw payload bytes, which read as no token.
    fn peek_token(&mut self) -> std::result::Result<Option<String>, IoError> {
        let saved = self.pos;
        let token = self.token().unwrap_or(None);
        self.pos = saved;
        Ok(token)
    }

    fn required_token(&mut self, context: &str) -> std::result::Result<String, IoError> {
        self.token()?.ok_or_else(|| IoError::UnexpectedEof {
            context: context.to_string(),
        })
    }

    fn expect_token(&mut self, expected: &str) -> std::result::Result<(), IoError> {
        let token = self.required_token(expected)?;
        if token.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}', found '{}'", expected, token)))
        }
    }

    /// `a * b` for header-declared sizes
    fn product(&self, a: usize, b: usize, context: &str) -> std::result::Result<usize, IoError> {
        a.checked_mul(b)
            .ok_or_else(|| self.error(format!("{} size {} x {} overflows", context, a, b)))
    }

    /// A cell index or offset: a non-negative whole number
    fn index(&self, value: f64, context: &str) -> std::result::Result<usize, IoError> {
        if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
            Ok(value as usize)
        } else {
            Err(self.error(format!("invalid {} index {}", context, value)))
        }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn usize_token(&mut self, context: &str) -> std::result::Result<usize, IoError> {
        let token = self.required_token(context)?;
        token
            .parse()
            .map_err(|_| self.error(format!("invalid {}: '{}'", context, token)))
    }

    /// Rest of the current line, without the terminator
    fn line(&mut self, context: &str) -> std::result::Result<String, IoError> {
        if self.pos >= self.data.len() {
            return Err(IoError::UnexpectedEof {
                context: context.to_string(),
            });
        }
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
            self.pos += 1;
        }
        let line = String::from_utf8_lossy(&self.data[start..self.pos]).trim_end_matches('\r').to_string();
        if self.pos < self.data.len() {
            self.pos += 1;
        }
        Ok(line)
    }

    /// `METADATA` blocks run until the next blank line
    fn skip_metadata(&mut self) -> std::result::Result<(), IoError> {
        // finish the METADATA line itself
        self.line("METADATA")?;
        while self.pos < self.data.len() {
            if self.line("METADATA")?.trim().is_empty() {
                break;
            }
        }
        Ok(())
    }

    fn values(&mut self, count: usize, dtype: DataType, context: &str) -> std::result::Result<Vec<f64>, IoError> {
        match self.encoding {
            VtkEncoding::Ascii => {
                // every ASCII value takes at least one byte
                let mut values = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    let token = self.required_token(context)?;
                    let v = parse_number(&token)
                        .ok_or_else(|| self.error(format!("invalid number '{}' in {}", token, context)))?;
                    values.push(v);
                }
                Ok(values)
            }
            VtkEncoding::Binary => {
                if dtype == DataType::Bit {
                    return Err(IoError::InvalidFormat {
                        format: "binary bit arrays are not supported".to_string(),
                    });
                }
                // Binary payload starts after the end of the declaring line
                while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
                    self.pos += 1;
                }
                self.pos += 1;
                let width = dtype.size();
                let end = match count.checked_mul(width).and_then(|n| self.pos.checked_add(n)) {
                    Some(end) if end <= self.data.len() => end,
                    _ => {
                        return Err(IoError::UnexpectedEof {
                            context: context.to_string(),
                        })
                    }
                };
                let values = self.data[self.pos..end]
                    .chunks_exact(width)
                    .map(|b| dtype.decode_be(b))
                    .collect();
                self.pos = end;
                Ok(values)
            }
        }
    }
}

fn parse_number(token: &str) -> Option<f64> {
    match token.to_ascii_lowercase().as_str() {
        "nan" | "-nan" => Some(f64::NAN),
        "inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use deformview_core::Vector3f;

    const ASCII_QUAD: &str = r#"# vtk DataFile Version 3.0
quad with fields
ASCII
DATASET POLYDATA
POINTS 4 float
0 0 0  1 0 0
1 1 0  0 1 0
POLYGONS 1 5
4 0 1 2 3
CELL_DATA 2
SCALARS cell_id int 1
LOOKUP_TABLE default
0 1
POINT_DATA 4
SCALARS temperature float 1
LOOKUP_TABLE default
10.0 20.0 30.0 -5.0
VECTORS displacement float
0 0 1  0 0 1  0 0 2  0 0 0
NORMALS Normals float
0 0 1 0 0 1 0 0 1 0 0 1
FIELD FieldData 1
wall%20shear 2 4 double
1 2 3 4 5 6 7 8
"#;

    #[test]
    fn test_read_ascii_polydata() {
        let (header, mesh) = VtkReader::read_bytes(ASCII_QUAD.as_bytes()).unwrap();
        assert_eq!(header.version, "3.0");
        assert_eq!(header.title, "quad with fields");
        assert_eq!(header.encoding, VtkEncoding::Ascii);
        assert_eq!(mesh.point_count(), 4);
        assert_eq!(mesh.polys, vec![[0, 1, 2], [0, 2, 3]]);

        let pd = &mesh.point_data;
        assert_eq!(
            pd.array_names(),
            vec!["temperature", "displacement", "Normals", "wall shear"]
        );
        assert_eq!(pd.scalars().unwrap().name, "temperature");
        assert_eq!(pd.vectors().unwrap().name, "displacement");
        assert_eq!(pd.normals().unwrap().name, "Normals");
        assert_eq!(mesh.scalar_range(), Some((-5.0, 30.0)));
        assert_eq!(pd.get("wall shear").unwrap().components, 2);
        // cell data is not attached to points
        assert!(pd.get("cell_id").is_none());
    }

    #[test]
    fn test_read_new_style_cells() {
        let text = "# vtk DataFile Version 5.1\nt\nASCII\nDATASET POLYDATA\nPOINTS 4 float\n0 0 0 1 0 0 1 1 0 0 1 0\nPOLYGONS 3 6\nOFFSETS vtktypeint64\n0 3 6\nCONNECTIVITY vtktypeint64\n0 1 2 0 2 3\n";
        let (_, mesh) = VtkReader::read_bytes(text.as_bytes()).unwrap();
        assert_eq!(mesh.polys, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_triangle_strips() {
        let text = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 4 float\n0 0 0 1 0 0 0 1 0 1 1 0\nTRIANGLE_STRIPS 1 5\n4 0 1 2 3\n";
        let (_, mesh) = VtkReader::read_bytes(text.as_bytes()).unwrap();
        assert_eq!(mesh.polys, vec![[0, 1, 2], [2, 1, 3]]);
    }

    #[test]
    fn test_rejects_other_datasets() {
        let text = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET UNSTRUCTURED_GRID\n";
        assert!(matches!(
            VtkReader::read_bytes(text.as_bytes()),
            Err(IoError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_header() {
        assert!(VtkReader::read_bytes(b"POINTS 1 float\n0 0 0\n").is_err());
    }

    #[test]
    fn test_truncated_points_is_error() {
        let text = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 2 float\n0 0 0 1\n";
        assert!(matches!(
            VtkReader::read_bytes(text.as_bytes()),
            Err(IoError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_huge_declared_counts_are_errors() {
        let ascii = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 2000000000000000000 float\n0 0 0\n";
        assert!(matches!(
            VtkReader::read_bytes(ascii.as_bytes()),
            Err(IoError::UnexpectedEof { .. })
        ));

        let binary = "# vtk DataFile Version 3.0\nt\nBINARY\nDATASET POLYDATA\nPOINTS 2000000000000000000 float\n\0\0\0\0";
        assert!(matches!(
            VtkReader::read_bytes(binary.as_bytes()),
            Err(IoError::UnexpectedEof { .. })
        ));

        let cells = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 3 float\n0 0 0 1 0 0 0 1 0\nPOLYGONS 2000000000000000000 4\n3 0 1 2\n";
        assert!(matches!(VtkReader::read_bytes(cells.as_bytes()), Err(IoError::ParseError { .. })));

        let field = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 1 float\n0 0 0\nPOINT_DATA 1\nFIELD FieldData 2000000000000000000\nf 1 1 float\n1\n";
        assert!(matches!(
            VtkReader::read_bytes(field.as_bytes()),
            Err(IoError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_overflowing_sizes_are_errors() {
        let points = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 18446744073709551615 float\n0 0 0\n";
        assert!(matches!(VtkReader::read_bytes(points.as_bytes()), Err(IoError::ParseError { .. })));

        let field = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 1 float\n0 0 0\nPOINT_DATA 1\nFIELD FieldData 1\nf 18446744073709551615 2 float\n1\n";
        assert!(matches!(VtkReader::read_bytes(field.as_bytes()), Err(IoError::ParseError { .. })));
    }

    #[test]
    fn test_negative_or_fractional_connectivity_is_error() {
        let head = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 3 float\n0 0 0 1 0 0 0 1 0\n";
        for cells in [
            "POLYGONS 1 4\n3 -1 1 2\n",
            "POLYGONS 1 4\n3 0 1.5 2\n",
            "POLYGONS 1 4\n-3 0 1 2\n",
            "POLYGONS 2 3\nOFFSETS vtktypeint64\n0 3\nCONNECTIVITY vtktypeint64\n0 -1 2\n",
            "POLYGONS 2 3\nOFFSETS vtktypeint64\n-1 3\nCONNECTIVITY vtktypeint64\n0 1 2\n",
        ] {
            let text = format!("{}{}", head, cells);
            assert!(
                matches!(VtkReader::read_bytes(text.as_bytes()), Err(IoError::ParseError { .. })),
                "accepted {:?}",
                cells
            );
        }
    }

    #[test]
    fn test_out_of_range_index_is_error() {
        let text = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET POLYDATA\nPOINTS 3 float\n0 0 0 1 0 0 0 1 0\nPOLYGONS 1 4\n3 0 1 7\n";
        assert!(VtkReader::read_bytes(text.as_bytes()).is_err());
    }

    fn mesh_with_fields() -> PolyData {
        let mut mesh = PolyData::from_points_and_polys(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.5, 0.0, 0.0),
                Point3f::new(0.0, 2.5, -1.0),
            ],
            vec![[0, 1, 2]],
        );
        mesh.add_point_array(DataArray::scalars("pressure", vec![0.5, 1.5, -2.0])).unwrap();
        mesh.add_point_array(DataArray::vectors(
            "velocity",
            &[Vector3f::x(), Vector3f::y(), Vector3f::new(0.25, 0.5, 0.75)],
        ))
        .unwrap();
        mesh.point_data.set_active_scalars("pressure");
        mesh.point_data.set_active_vectors("velocity");
        mesh
    }

    #[test]
    fn test_binary_write_then_read() {
        let mesh = mesh_with_fields();
        let mut bytes = Vec::new();
        let options = VtkWriteOptions {
            encoding: VtkEncoding::Binary,
            ..Default::default()
        };
        VtkWriter::write_to(&mesh, &mut bytes, &options).unwrap();
        let (header, read) = VtkReader::read_bytes(&bytes).unwrap();
        assert_eq!(header.encoding, VtkEncoding::Binary);
        assert_eq!(read.points, mesh.points);
        assert_eq!(read.polys, mesh.polys);
        assert_eq!(read.point_data.scalars().unwrap().values, vec![0.5, 1.5, -2.0]);
        let v = read.point_data.vectors().unwrap().vector(2).unwrap();
        assert_relative_eq!(v.z, 0.75);
    }

    #[test]
    fn test_ascii_file_on_disk() {
        let temp_file = std::env::temp_dir().join("deformview_vtk_ascii_test.vtk");
        let mesh = mesh_with_fields();
        VtkWriter::write_mesh(&mesh, &temp_file).unwrap();
        let read = VtkReader::read_mesh(&temp_file).unwrap();
        assert_eq!(read.point_data.array_names(), vec!["pressure", "velocity"]);
        assert_eq!(read.point_data.vectors().unwrap().name, "velocity");
        let _ = std::fs::remove_file(temp_file);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = VtkReader::read_mesh("/definitely/not/here.vtk").unwrap_err();
        assert!(err.to_string().contains("here.vtk"));
    }
}
