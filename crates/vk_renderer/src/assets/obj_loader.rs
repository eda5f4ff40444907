//! OBJ file loader for 3D models
//!
//! Reads positions, texture coordinates and polygon faces; normals and
//! material statements are skipped since the viewer's shaders don't use
//! them. Faces are fan-triangulated and identical vertices are merged.

use crate::render::mesh::{Mesh, MeshBuilder, Vertex};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Colour given to every loaded vertex; the texture supplies the real colour
const VERTEX_COLOUR: [f32; 3] = [1.0, 1.0, 1.0];

/// OBJ parse errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed statement
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What was wrong
        message: String,
    },
    /// File parsed but is unusable
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// OBJ model loader
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file and return a deduplicated mesh
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, ObjError> {
        let path = path.as_ref();
        let mesh = Self::parse(BufReader::new(File::open(path)?))?;
        log::info!(
            "Loaded model {}: {} unique vertices, {} indices",
            path.display(),
            mesh.vertices.len(),
            mesh.indices.len()
        );
        Ok(mesh)
    }

    /// Parse OBJ text from any buffered reader
    pub fn parse<R: BufRead>(reader: R) -> Result<Mesh, ObjError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut builder = MeshBuilder::new();

        for (line_index, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = line_index + 1;
            let mut parts = line.split_whitespace();

            match parts.next() {
                Some("v") => positions.push(parse_floats::<3>(parts, line_no, "vertex")?),
                Some("vt") => {
                    let [u, v] = parse_floats::<2>(parts, line_no, "texture coordinate")?;
                    // OBJ puts v=0 at the bottom, Vulkan samples with v=0 at the top
                    tex_coords.push([u, 1.0 - v]);
                }
                Some("f") => {
                    let corners = parts
                        .map(|corner| {
                            let (pos_idx, tex_idx) = parse_corner(corner, line_no, positions.len(), tex_coords.len())?;
                            let tex_coord = tex_idx.map_or([0.0, 0.0], |i| tex_coords[i]);
                            Ok(Vertex::new(positions[pos_idx], VERTEX_COLOUR, tex_coord))
                        })
                        .collect::<Result<Vec<_>, ObjError>>()?;

                    if corners.len() < 3 {
                        return Err(ObjError::ParseError {
                            line: line_no,
                            message: format!("face has {} corners, need at least 3", corners.len()),
                        });
                    }

                    for i in 1..corners.len() - 1 {
                        builder.push(corners[0]);
                        builder.push(corners[i]);
                        builder.push(corners[i + 1]);
                    }
                }
                _ => {}
            }
        }

        let mesh = builder.build();
        if mesh.is_empty() {
            return Err(ObjError::InvalidFormat("No faces found in OBJ data".to_string()));
        }
        Ok(mesh)
    }
}

fn parse_floats<const N: usize>(
    mut parts: std::str::SplitWhitespace<'_>,
    line: usize,
    what: &str,
) -> Result<[f32; N], ObjError> {
    let mut out = [0.0; N];
    for value in &mut out {
        let token = parts.next().ok_or_else(|| ObjError::ParseError {
            line,
            message: format!("{what} needs {N} components"),
        })?;
        *value = token.parse().map_err(|_| ObjError::ParseError {
            line,
            message: format!("invalid {what} component '{token}'"),
        })?;
    }
    Ok(out)
}

/// Parse `p`, `p/t`, `p//n` or `p/t/n` into zero-based position and texcoord indices
fn parse_corner(
    corner: &str,
    line: usize,
    position_count: usize,
    tex_count: usize,
) -> Result<(usize, Option<usize>), ObjError> {
    let mut fields = corner.split('/');
    let position = fields.next().unwrap_or_default();
    let tex = fields.next().filter(|t| !t.is_empty());

    let position = resolve_index(position, position_count, line)?;
    let tex = tex.map(|t| resolve_index(t, tex_count, line)).transpose()?;
    Ok((position, tex))
}

/// OBJ indices are 1-based; negative values count back from the latest element
fn resolve_index(token: &str, count: usize, line: usize) -> Result<usize, ObjError> {
    let raw: i64 = token.parse().map_err(|_| ObjError::ParseError {
        line,
        message: format!("invalid index '{token}'"),
    })?;

    let resolved = match raw {
        0 => None,
        r if r > 0 => usize::try_from(r - 1).ok(),
        r => usize::try_from(count as i64 + r).ok(),
    };

    resolved.filter(|&i| i < count).ok_or_else(|| ObjError::ParseError {
        line,
        message: format!("index {raw} out of range (have {count})"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD: &str = "\
# two triangles sharing an edge
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

    fn parse(text: &str) -> Result<Mesh, ObjError> {
        ObjLoader::parse(Cursor::new(text))
    }

    #[test]
    fn test_shared_corners_are_deduplicated() {
        let mesh = parse(QUAD).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_texture_v_is_flipped_and_colour_is_white() {
        let mesh = parse(QUAD).unwrap();
        assert_eq!(mesh.vertices[0].tex_coord, [0.0, 1.0]);
        assert_eq!(mesh.vertices[2].tex_coord, [1.0, 0.0]);
        assert!(mesh.vertices.iter().all(|v| v.colour == [1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_same_position_different_uv_stays_separate() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 1\nf 1/1 2/1 3/1\nf 1/2 2/1 3/1\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 1, 2]);
    }

    #[test]
    fn test_polygon_is_fan_triangulated() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv -1 0.5 0\nf 1 2 3 4 5\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_texcoords_default_to_zero() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1//1 2//1 3//1\n";
        let mesh = parse(text).unwrap();
        assert!(mesh.vertices.iter().all(|v| v.tex_coord == [0.0, 0.0]));
    }

    #[test]
    fn test_out_of_range_index_reports_line() {
        let text = "v 0 0 0\nv 1 0 0\nf 1 2 3\n";
        match parse(text) {
            Err(ObjError::ParseError { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_number_is_rejected() {
        assert!(matches!(parse("v 0 zero 0\n"), Err(ObjError::ParseError { line: 1, .. })));
    }

    #[test]
    fn test_no_faces_is_invalid() {
        assert!(matches!(parse("v 0 0 0\n"), Err(ObjError::InvalidFormat(_))));
    }
}
