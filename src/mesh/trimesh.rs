//! Indexed triangle mesh.

use nalgebra::Point3;

use crate::error::{MeshError, Result};

/// A triangle mesh stored as a vertex position array and a face index array.
///
/// Faces are counter-clockwise when seen from the side their normal points
/// to. Construction validates indices, so every algorithm downstream can index
/// `vertices` with any face entry without further checks.
///
/// # Example
///
/// ```
/// use quadfield::mesh::TriMesh;
/// use nalgebra::Point3;
///
/// let mesh = TriMesh::new(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
///     vec![[0, 1, 2]],
/// )
/// .unwrap();
/// assert_eq!(mesh.num_faces(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TriMesh {
    vertices: Vec<Point3<f64>>,
    faces: Vec<[usize; 3]>,
}

impl TriMesh {
    /// Build a mesh from positions and triangles.
    ///
    /// Fails with [`MeshError::EmptyMesh`] when there are no faces,
    /// [`MeshError::InvalidVertexIndex`] for out-of-range indices and
    /// [`MeshError::DegenerateFace`] for a face that repeats a vertex.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Result<Self> {
        if faces.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        for (fi, face) in faces.iter().enumerate() {
            for &vi in face {
                if vi >= vertices.len() {
                    return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(MeshError::DegenerateFace { face: fi });
            }
        }

        Ok(Self { vertices, faces })
    }

    /// Vertex positions.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Triangle vertex indices.
    #[inline]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Position of vertex `v`.
    #[inline]
    pub fn position(&self, v: usize) -> Point3<f64> {
        self.vertices[v]
    }

    /// Vertex indices of face `f`.
    #[inline]
    pub fn face(&self, f: usize) -> [usize; 3] {
        self.faces[f]
    }

    /// Corner positions of face `f`.
    #[inline]
    pub fn face_positions(&self, f: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[f];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.vertices {
            min = min.inf(p);
            max = max.sup(p);
        }
        Some((min, max))
    }

    /// Length of the bounding box diagonal, or 0 for an empty vertex set.
    pub fn bounding_box_diagonal(&self) -> f64 {
        self.bounding_box()
            .map(|(min, max)| (max - min).norm())
            .unwrap_or(0.0)
    }

    /// Number of vertices referenced by at least one face.
    pub fn num_referenced_vertices(&self) -> usize {
        let mut used = vec![false; self.vertices.len()];
        for face in &self.faces {
            for &v in face {
                used[v] = true;
            }
        }
        used.into_iter().filter(|&u| u).count()
    }
}
