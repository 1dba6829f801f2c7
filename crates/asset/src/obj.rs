//! Wavefront OBJ parser producing deduplicated, indexed mesh data with
//! named object/group sub-ranges.
//!
//! Faces must be triangles; n-gons are rejected rather than triangulated.
//! Relative (negative) indices are not supported.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use crate::error::{AssetError, AssetResult};
use crate::mesh::{GroupRange, MeshData, MeshVertex, SubRange};

/// One corner of one face as written in the source text. Indices are
/// 1-based; a missing texcoord or normal stays `None`. This triple is the
/// deduplication key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct FaceRef {
    position: u32,
    texcoord: Option<u32>,
    normal: Option<u32>,
}

/// An `o`/`g` scope that the next marker of the same kind (or end of
/// input) has not yet closed.
struct OpenRange {
    name: String,
    start: i32,
    material: Option<String>,
}

impl OpenRange {
    fn new(name: String, corner_count: usize) -> Self {
        Self {
            name,
            start: corner_count as i32,
            material: None,
        }
    }

    fn close(self, corner_count: usize) -> SubRange {
        SubRange {
            name: self.name,
            start: self.start,
            end: corner_count as i32 - 1,
            material: self.material.unwrap_or_default(),
        }
    }

    fn close_group(self, object: Option<u32>, corner_count: usize) -> GroupRange {
        let range = self.close(corner_count);
        GroupRange {
            name: range.name,
            object,
            start: range.start,
            end: range.end,
            material: range.material,
        }
    }
}

/// Load an OBJ mesh from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> AssetResult<MeshData> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mesh = parse_obj(BufReader::new(file))?;
    log::info!(
        "Loaded OBJ {}: {} vertices, {} triangles, {} objects, {} groups",
        path.display(),
        mesh.vertices.len(),
        mesh.triangle_count(),
        mesh.objects.len(),
        mesh.groups.len()
    );
    Ok(mesh)
}

/// Load an OBJ mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R) -> AssetResult<MeshData> {
    parse_obj(reader)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> AssetResult<MeshData> {
    parse_obj(io::Cursor::new(contents))
}

fn parse_obj<R: BufRead>(reader: R) -> AssetResult<MeshData> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();

    // Raw corner references in face order, resolved and deduplicated in a
    // second pass once the attribute tables are complete. The line number
    // rides along for second-pass diagnostics.
    let mut corners: Vec<(FaceRef, usize)> = Vec::new();

    let mut objects: Vec<SubRange> = Vec::new();
    let mut groups: Vec<GroupRange> = Vec::new();
    let mut open_object: Option<OpenRange> = None;
    let mut open_group: Option<(OpenRange, Option<u32>)> = None;
    let mut objects_opened: u32 = 0;
    let mut mtllib: Option<String> = None;

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
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                positions.push([x, y, z]);
            }
            "vn" => {
                let x = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let y = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let z = parse_f32(parts.next(), line_no, "nz coordinate")?;
                normals.push([x, y, z]);
            }
            "vt" => {
                // A third component is allowed in the source but ignored.
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                texcoords.push([u, v]);
            }
            "f" => {
                let tokens: Vec<&str> = parts.collect();
                if tokens.len() != 3 {
                    return Err(AssetError::malformed(
                        line_no,
                        format!(
                            "face has {} corners; only triangles are supported",
                            tokens.len()
                        ),
                    ));
                }
                for token in tokens {
                    corners.push((parse_face_ref(token, line_no)?, line_no));
                }
            }
            "o" => {
                let name = name_after(tag, trimmed, line_no)?;
                if let Some(open) = open_object.take() {
                    objects.push(open.close(corners.len()));
                }
                open_object = Some(OpenRange::new(name, corners.len()));
                objects_opened += 1;
            }
            "g" => {
                let name = name_after(tag, trimmed, line_no)?;
                if let Some((open, object)) = open_group.take() {
                    groups.push(open.close_group(object, corners.len()));
                }
                open_group = Some((
                    OpenRange::new(name, corners.len()),
                    objects_opened.checked_sub(1),
                ));
            }
            "usemtl" => {
                let name = name_after(tag, trimmed, line_no)?;
                if let Some(open) = open_object.as_mut() {
                    open.material = Some(name.clone());
                }
                if let Some((open, _)) = open_group.as_mut() {
                    open.material = Some(name);
                }
            }
            "mtllib" => {
                // Repeated directives: the last one wins.
                mtllib = Some(name_after(tag, trimmed, line_no)?);
            }
            _ => {
                // Other directives (s, comments, ...) are ignored.
            }
        }
    }

    if let Some(open) = open_object.take() {
        objects.push(open.close(corners.len()));
    }
    if let Some((open, object)) = open_group.take() {
        groups.push(open.close_group(object, corners.len()));
    }

    let (vertices, indices) = deduplicate(&corners, &positions, &texcoords, &normals)?;

    Ok(MeshData {
        vertices,
        indices,
        objects,
        groups,
        mtllib,
    })
}

/// Walk the raw corner list in face order, allocating one dense output
/// vertex per distinct `FaceRef` and one index entry per occurrence.
fn deduplicate(
    corners: &[(FaceRef, usize)],
    positions: &[[f32; 3]],
    texcoords: &[[f32; 2]],
    normals: &[[f32; 3]],
) -> AssetResult<(Vec<MeshVertex>, Vec<u32>)> {
    let mut unique: HashMap<FaceRef, u32> = HashMap::new();
    let mut vertices: Vec<MeshVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::with_capacity(corners.len());

    for &(corner, line_no) in corners {
        let index = match unique.get(&corner) {
            Some(&index) => index,
            None => {
                let vertex = resolve_corner(corner, positions, texcoords, normals, line_no)?;
                let index = u32::try_from(vertices.len()).map_err(|_| {
                    AssetError::malformed(line_no, "too many unique vertices for a u32 index")
                })?;
                vertices.push(vertex);
                unique.insert(corner, index);
                index
            }
        };
        indices.push(index);
    }

    Ok((vertices, indices))
}

fn resolve_corner(
    corner: FaceRef,
    positions: &[[f32; 3]],
    texcoords: &[[f32; 2]],
    normals: &[[f32; 3]],
    line_no: usize,
) -> AssetResult<MeshVertex> {
    let position = lookup(positions, corner.position, line_no, "position")?;
    let uv = match corner.texcoord {
        Some(index) => lookup(texcoords, index, line_no, "texcoord")?,
        None => [0.0, 0.0],
    };
    let normal = match corner.normal {
        Some(index) => lookup(normals, index, line_no, "normal")?,
        None => [0.0, 0.0, 1.0],
    };
    Ok(MeshVertex::new(position, normal, uv))
}

fn lookup<T: Copy>(table: &[T], index: u32, line_no: usize, what: &str) -> AssetResult<T> {
    table.get(index as usize - 1).copied().ok_or_else(|| {
        AssetError::malformed(
            line_no,
            format!("{what} index {index} out of range ({} declared)", table.len()),
        )
    })
}

fn parse_face_ref(token: &str, line_no: usize) -> AssetResult<FaceRef> {
    let mut segments = token.split('/');
    let position = match segments.next() {
        Some(s) if !s.is_empty() => parse_index(s, line_no, "position")?,
        _ => {
            return Err(AssetError::malformed(
                line_no,
                format!("malformed face corner '{token}'"),
            ));
        }
    };
    let texcoord = match segments.next() {
        Some("") | None => None,
        Some(s) => Some(parse_index(s, line_no, "texcoord")?),
    };
    let normal = match segments.next() {
        Some("") | None => None,
        Some(s) => Some(parse_index(s, line_no, "normal")?),
    };
    if segments.next().is_some() {
        return Err(AssetError::malformed(
            line_no,
            format!("malformed face corner '{token}'"),
        ));
    }
    Ok(FaceRef {
        position,
        texcoord,
        normal,
    })
}

fn parse_index(token: &str, line_no: usize, what: &str) -> AssetResult<u32> {
    let index: u32 = token.parse().map_err(|_| {
        AssetError::malformed(line_no, format!("invalid {what} index '{token}'"))
    })?;
    if index == 0 {
        return Err(AssetError::malformed(
            line_no,
            format!("{what} index is 1-based; found 0"),
        ));
    }
    Ok(index)
}

pub(crate) fn parse_f32(value: Option<&str>, line_no: usize, what: &str) -> AssetResult<f32> {
    let token =
        value.ok_or_else(|| AssetError::malformed(line_no, format!("missing {what}")))?;
    token
        .parse::<f32>()
        .map_err(|_| AssetError::malformed(line_no, format!("invalid {what} '{token}'")))
}

/// Remainder of the line after its leading tag, preserving interior
/// spaces (object and material names may contain them).
pub(crate) fn name_after(tag: &str, line: &str, line_no: usize) -> AssetResult<String> {
    let rest = line[tag.len()..].trim();
    if rest.is_empty() {
        return Err(AssetError::malformed(
            line_no,
            format!("missing name after '{tag}'"),
        ));
    }
    Ok(rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let mesh = load_obj_from_str(src).expect("parse triangle");
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!(mesh.is_valid());
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[1].uv, [1.0, 0.0]);
        assert_eq!(mesh.vertices[1].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn repeated_triangle_reuses_vertices() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
            f 1/1/1 2/2/1 3/3/1
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn distinct_attribute_triples_stay_distinct() {
        // Same position, different texcoord/normal presence.
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            f 1/1/1 2/1/1 3/1/1
            f 1//1 2/1/1 3/1/1
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        // `1/1/1` and `1//1` are different keys even though they resolve
        // to the same position.
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.indices[3], 3);
    }

    #[test]
    fn quad_face_is_rejected() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 1.0 1.0 0.0
            v 0.0 1.0 0.0
            f 1 2 3 4
        "#;
        let err = load_obj_from_str(src).unwrap_err();
        assert!(matches!(err, AssetError::MalformedGeometry { line: 6, .. }));
    }

    #[test]
    fn dangling_position_index_is_rejected() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            f 1 2 9
        "#;
        let err = load_obj_from_str(src).unwrap_err();
        assert!(matches!(err, AssetError::MalformedGeometry { line: 4, .. }));
    }

    #[test]
    fn extra_corner_segment_is_rejected() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            f 1/1/1/1 2/1/1 3/1/1
        "#;
        let err = load_obj_from_str(src).unwrap_err();
        assert!(matches!(err, AssetError::MalformedGeometry { line: 5, .. }));
    }

    #[test]
    fn negative_index_is_rejected() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            f -1 -2 -3
        "#;
        assert!(load_obj_from_str(src).is_err());
    }

    #[test]
    fn bad_float_is_rejected() {
        let err = load_obj_from_str("v 0.0 oops 0.0").unwrap_err();
        assert!(matches!(err, AssetError::MalformedGeometry { line: 1, .. }));
    }

    #[test]
    fn missing_attributes_get_defaults() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            f 1 2 3
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        assert_eq!(mesh.vertices[0].uv, [0.0, 0.0]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn object_ranges_close_on_next_marker() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            o first
            usemtl red
            f 1 2 3
            f 1 2 3
            o second
            usemtl blue
            f 1 2 3
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        assert_eq!(mesh.objects.len(), 2);

        let first = &mesh.objects[0];
        assert_eq!(first.name, "first");
        assert_eq!((first.start, first.end), (0, 5));
        assert_eq!(first.material, "red");

        let second = &mesh.objects[1];
        assert_eq!(second.name, "second");
        assert_eq!((second.start, second.end), (6, 8));
        assert_eq!(second.material, "blue");

        // Contiguous markers partition the whole index array.
        assert_eq!(mesh.indices.len(), 9);
    }

    #[test]
    fn object_marker_does_not_close_group() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            o first
            g walls
            f 1 2 3
            o second
            f 1 2 3
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        // The group stays open across the `o second` boundary and closes
        // at end of input, spanning both objects' faces.
        assert_eq!(mesh.groups.len(), 1);
        let group = &mesh.groups[0];
        assert_eq!(group.name, "walls");
        assert_eq!((group.start, group.end), (0, 5));
        assert_eq!(group.object, Some(0));

        assert_eq!(mesh.objects.len(), 2);
        assert_eq!((mesh.objects[0].start, mesh.objects[0].end), (0, 2));
        assert_eq!((mesh.objects[1].start, mesh.objects[1].end), (3, 5));
    }

    #[test]
    fn group_before_any_object_is_tolerated() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            g loose
            usemtl mat
            f 1 2 3
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        assert!(mesh.objects.is_empty());
        assert_eq!(mesh.groups.len(), 1);
        assert_eq!(mesh.groups[0].object, None);
        assert_eq!(mesh.groups[0].material, "mat");
    }

    #[test]
    fn usemtl_without_open_range_is_tolerated() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            usemtl stray
            f 1 2 3
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        assert!(mesh.objects.is_empty());
        assert!(mesh.groups.is_empty());
    }

    #[test]
    fn empty_object_range() {
        let src = r#"
            o nothing
            o also_nothing
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        assert_eq!(mesh.objects.len(), 2);
        assert!(mesh.objects[0].is_empty());
        assert_eq!((mesh.objects[0].start, mesh.objects[0].end), (0, -1));
    }

    #[test]
    fn last_mtllib_wins() {
        let src = r#"
            mtllib first.mtl
            mtllib second.mtl
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        assert_eq!(mesh.mtllib.as_deref(), Some("second.mtl"));
    }

    #[test]
    fn names_keep_interior_spaces() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            o left arm
            f 1 2 3
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        assert_eq!(mesh.objects[0].name, "left arm");
    }

    #[test]
    fn vt_third_component_is_ignored() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vt 0.25 0.75 0.0
            f 1/1 2/1 3/1
        "#;
        let mesh = load_obj_from_str(src).expect("parse");
        assert_eq!(mesh.vertices[0].uv, [0.25, 0.75]);
    }
}
