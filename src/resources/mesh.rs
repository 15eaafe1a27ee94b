use std::io::{BufReader, Cursor};

use crate::data_structures::model::Vertex;

/// Geometry of a mesh file flattened into one vertex and one index list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Parses OBJ text. Faces are triangulated and every object of the file is
    /// appended to the same lists. Material libraries are not loaded.
    ///
    /// With `flip_uv` the V coordinate is mirrored (`v' = 1 - v`).
    pub fn parse_obj(text: &str, flip_uv: bool) -> anyhow::Result<Self> {
        let mut reader = BufReader::new(Cursor::new(text.as_bytes()));
        let (models, _materials) = tobj::load_obj_buf(
            &mut reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Err(tobj::LoadError::OpenFileFailed),
        )?;
        Ok(Self::from_models(&models, flip_uv))
    }

    pub fn from_models(models: &[tobj::Model], flip_uv: bool) -> Self {
        let mut mesh = MeshData::default();
        for m in models {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend((0..m.mesh.positions.len() / 3).map(|i| {
                let v = m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f);
                Vertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    uv: [
                        m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                        if flip_uv { 1.0 - v } else { v },
                    ],
                }
            }));
            mesh.indices.extend(m.mesh.indices.iter().map(|index| base + index));
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
o quad
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
f 1/1 2/2 3/3 4/4
";

    #[test]
    fn quads_are_triangulated() {
        let mesh = MeshData::parse_obj(QUAD, false).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.vertices[2], Vertex::new(1.0, 1.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn flip_uv_mirrors_v() {
        let mesh = MeshData::parse_obj(QUAD, true).unwrap();
        assert_eq!(mesh.vertices[0].uv, [0.0, 1.0]);
        assert_eq!(mesh.vertices[2].uv, [1.0, 0.0]);
    }

    #[test]
    fn objects_share_one_index_space() {
        let two = format!("{QUAD}{}", QUAD.replace("o quad", "o second").replace("f 1/1 2/2 3/3 4/4", "f 5/5 6/6 7/7"));
        let mesh = MeshData::parse_obj(&two, false).unwrap();
        assert_eq!(mesh.vertices.len(), 7);
        assert!(mesh.indices.iter().all(|&index| (index as usize) < mesh.vertices.len()));
    }
}
