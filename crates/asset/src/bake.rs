//! Binary mesh artifact: tangent-augmented triangle soup plus the named
//! sub-range tables and material library reference.
//!
//! Layout, little-endian throughout:
//!
//! ```text
//! i32              vertex count
//! vertex * count   pos 3xf32, normal 3xf32, uv 2xf32, tangent 4xf32 (48 B)
//! i32              object count
//! object * count   start i32, end i32, name string, material string
//! i32              group count
//! group * count    start i32, end i32, name string, material string
//! string           material library name ("" when absent)
//! ```
//!
//! Strings are an i32 byte length followed by UTF-8 bytes, no
//! terminator. The artifact carries no index buffer; vertices `3k`,
//! `3k+1`, `3k+2` form triangle `k`.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use crate::error::{AssetError, AssetResult};
use crate::mesh::{BakedVertex, GroupRange, MeshData, SubRange};
use crate::tangent::bake_tangents;

/// Fully baked model as stored on disk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BakedModel {
    pub vertices: Vec<BakedVertex>,
    pub objects: Vec<SubRange>,
    pub groups: Vec<SubRange>,
    pub mtllib: Option<String>,
}

/// Run the full bake on parsed mesh data: expand with tangents and carry
/// the sub-range tables over.
pub fn bake_model(mesh: MeshData) -> AssetResult<BakedModel> {
    let vertices = bake_tangents(&mesh)?;
    Ok(BakedModel {
        vertices,
        objects: mesh.objects,
        groups: mesh.groups.into_iter().map(GroupRange::into_range).collect(),
        mtllib: mesh.mtllib,
    })
}

/// Serialize a baked model to disk. The file is created only once the
/// model is fully assembled in memory; a failed bake leaves no partial
/// artifact behind.
pub fn save_bake(model: &BakedModel, path: impl AsRef<Path>) -> AssetResult<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_bake(model, &mut writer)?;
    writer.flush()?;
    log::info!(
        "Wrote bake {}: {} vertices, {} objects, {} groups",
        path.display(),
        model.vertices.len(),
        model.objects.len(),
        model.groups.len()
    );
    Ok(())
}

/// Deserialize a baked model from disk.
pub fn load_bake(path: impl AsRef<Path>) -> AssetResult<BakedModel> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let model = read_bake(&mut reader)?;
    log::info!(
        "Loaded bake {}: {} vertices, {} objects, {} groups",
        path.display(),
        model.vertices.len(),
        model.objects.len(),
        model.groups.len()
    );
    Ok(model)
}

pub fn write_bake<W: Write>(model: &BakedModel, writer: &mut W) -> AssetResult<()> {
    write_i32(writer, count_i32(model.vertices.len(), "vertex count")?)?;
    for vertex in &model.vertices {
        write_f32s(writer, &vertex.position)?;
        write_f32s(writer, &vertex.normal)?;
        write_f32s(writer, &vertex.uv)?;
        write_f32s(writer, &vertex.tangent)?;
    }

    write_i32(writer, count_i32(model.objects.len(), "object count")?)?;
    for range in &model.objects {
        write_range(writer, range)?;
    }
    write_i32(writer, count_i32(model.groups.len(), "group count")?)?;
    for range in &model.groups {
        write_range(writer, range)?;
    }

    write_string(writer, model.mtllib.as_deref().unwrap_or(""))?;
    Ok(())
}

pub fn read_bake<R: Read>(reader: &mut R) -> AssetResult<BakedModel> {
    let mut reader = BakeReader::new(reader);

    let vertex_count = reader.read_count("vertex count")?;
    let mut vertices = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        vertices.push(BakedVertex {
            position: reader.read_f32s("vertex position")?,
            normal: reader.read_f32s("vertex normal")?,
            uv: reader.read_f32s("vertex uv")?,
            tangent: reader.read_f32s("vertex tangent")?,
        });
    }

    let object_count = reader.read_count("object count")?;
    let mut objects = Vec::with_capacity(object_count);
    for _ in 0..object_count {
        objects.push(reader.read_range("object table")?);
    }

    let group_count = reader.read_count("group count")?;
    let mut groups = Vec::with_capacity(group_count);
    for _ in 0..group_count {
        groups.push(reader.read_range("group table")?);
    }

    let name = reader.read_string("material library name")?;
    let mtllib = if name.is_empty() { None } else { Some(name) };

    Ok(BakedModel {
        vertices,
        objects,
        groups,
        mtllib,
    })
}

fn write_range<W: Write>(writer: &mut W, range: &SubRange) -> AssetResult<()> {
    write_i32(writer, range.start)?;
    write_i32(writer, range.end)?;
    write_string(writer, &range.name)?;
    write_string(writer, &range.material)?;
    Ok(())
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> AssetResult<()> {
    write_i32(writer, count_i32(value.len(), "string length")?)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn write_i32<W: Write>(writer: &mut W, value: i32) -> AssetResult<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_f32s<W: Write>(writer: &mut W, values: &[f32]) -> AssetResult<()> {
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn count_i32(len: usize, what: &str) -> AssetResult<i32> {
    i32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} {len} does not fit an i32 field"),
        )
        .into()
    })
}

/// Reading side, tracking the byte offset so corruption errors can point
/// at the offending field.
struct BakeReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> BakeReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    fn fill(&mut self, buf: &mut [u8], what: &str) -> AssetResult<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(AssetError::CorruptBake {
                offset: self.offset,
                message: format!("truncated while reading {what}"),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn read_i32(&mut self, what: &str) -> AssetResult<i32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf, what)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_count(&mut self, what: &str) -> AssetResult<usize> {
        let at = self.offset;
        let value = self.read_i32(what)?;
        usize::try_from(value).map_err(|_| AssetError::CorruptBake {
            offset: at,
            message: format!("negative {what} {value}"),
        })
    }

    fn read_f32s<const N: usize>(&mut self, what: &str) -> AssetResult<[f32; N]> {
        let mut buf = [0u8; 4];
        let mut out = [0.0f32; N];
        for value in &mut out {
            self.fill(&mut buf, what)?;
            *value = f32::from_le_bytes(buf);
        }
        Ok(out)
    }

    fn read_string(&mut self, what: &str) -> AssetResult<String> {
        let at = self.offset;
        let len = self.read_count(what)?;
        let mut buf = vec![0u8; len];
        self.fill(&mut buf, what)?;
        String::from_utf8(buf).map_err(|_| AssetError::CorruptBake {
            offset: at,
            message: format!("{what} is not valid UTF-8"),
        })
    }

    fn read_range(&mut self, what: &str) -> AssetResult<SubRange> {
        Ok(SubRange {
            start: self.read_i32(what)?,
            end: self.read_i32(what)?,
            name: self.read_string(what)?,
            material: self.read_string(what)?,
        })
    }
}
