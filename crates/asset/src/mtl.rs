//! Wavefront MTL material library parser.
//!
//! Only the properties the renderer consumes are modeled: ambient,
//! diffuse and specular colors, specular exponent, opacity and the
//! diffuse texture map.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
    str::SplitWhitespace,
};

use crate::error::{AssetError, AssetResult};
use crate::obj::{name_after, parse_f32};

/// A named material described by one `newmtl` block.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub specular_exponent: f32,
    pub opacity: f32,
    /// Diffuse map path, resolved relative to the library file.
    pub diffuse_map: Option<PathBuf>,
}

impl Material {
    fn new(name: String) -> Self {
        Self {
            name,
            ambient: [0.0; 3],
            diffuse: [0.0; 3],
            specular: [0.0; 3],
            specular_exponent: 0.0,
            opacity: 1.0,
            diffuse_map: None,
        }
    }
}

/// Load every material from a library file. `None` yields an empty list,
/// matching meshes that declare no `mtllib`.
pub fn load_mtl_lib(path: Option<&Path>) -> AssetResult<Vec<Material>> {
    match path {
        Some(path) => load_mtl_from_path(path),
        None => Ok(Vec::new()),
    }
}

/// Load a material library from a file path. `map_Kd` paths resolve
/// against the library file's directory, not the working directory.
pub fn load_mtl_from_path(path: impl AsRef<Path>) -> AssetResult<Vec<Material>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let materials = parse_mtl(BufReader::new(file), base_dir)?;
    log::info!(
        "Loaded MTL {}: {} materials",
        path.display(),
        materials.len()
    );
    Ok(materials)
}

/// Convenience helper to parse an MTL string literal.
pub fn load_mtl_from_str(contents: &str, base_dir: &Path) -> AssetResult<Vec<Material>> {
    parse_mtl(io::Cursor::new(contents), base_dir)
}

fn parse_mtl<R: BufRead>(reader: R, base_dir: &Path) -> AssetResult<Vec<Material>> {
    let mut materials: Vec<Material> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else { continue };

        match tag {
            "newmtl" => {
                let name = name_after(tag, trimmed, line_no)?;
                materials.push(Material::new(name));
            }
            "Ka" => current(&mut materials, line_no)?.ambient = parse_color(&mut parts, line_no)?,
            "Kd" => current(&mut materials, line_no)?.diffuse = parse_color(&mut parts, line_no)?,
            "Ks" => current(&mut materials, line_no)?.specular = parse_color(&mut parts, line_no)?,
            "Ns" => {
                current(&mut materials, line_no)?.specular_exponent =
                    parse_f32(parts.next(), line_no, "specular exponent")?;
            }
            "d" => {
                current(&mut materials, line_no)?.opacity =
                    parse_f32(parts.next(), line_no, "opacity")?;
            }
            "map_Kd" => {
                let relative = name_after(tag, trimmed, line_no)?;
                current(&mut materials, line_no)?.diffuse_map = Some(base_dir.join(relative));
            }
            _ => {
                // Unrecognized property lines are ignored.
            }
        }
    }

    Ok(materials)
}

/// The definition currently being filled in, addressed by ordinal. A
/// property line before any `newmtl` has no owner and is rejected.
fn current<'a>(materials: &'a mut [Material], line_no: usize) -> AssetResult<&'a mut Material> {
    materials.last_mut().ok_or_else(|| {
        AssetError::malformed(line_no, "material property before any 'newmtl'")
    })
}

fn parse_color(parts: &mut SplitWhitespace, line_no: usize) -> AssetResult<[f32; 3]> {
    let r = parse_f32(parts.next(), line_no, "red channel")?;
    let g = parse_f32(parts.next(), line_no, "green channel")?;
    let b = parse_f32(parts.next(), line_no, "blue channel")?;
    Ok([r, g, b])
}
