//! Cut a mesh open along seam edges.
//!
//! Every vertex whose face fan is split by seams into several sectors gets
//! one copy per sector. The first sector keeps the original index; the
//! others get fresh indices appended after the original vertices. All
//! copies are counted before anything is allocated.

use log::debug;
use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeCursor, TriMesh, TriangleAdjacency, VertexFaces};

use super::seams::SeamFlags;

/// A mesh cut open along seams.
#[derive(Debug, Clone)]
pub struct CutMesh {
    /// Original vertices followed by the duplicates.
    pub vertices: Vec<Point3<f64>>,
    /// Faces of the original mesh, re-indexed into `vertices`.
    pub faces: Vec<[usize; 3]>,
    /// Original vertex of every cut vertex.
    pub original_vertex: Vec<usize>,
    /// Number of copies added for every original vertex.
    pub duplicates: Vec<usize>,
}

impl CutMesh {
    /// Number of cut vertices, duplicates included.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Validated mesh with the cut topology.
    pub fn to_trimesh(&self) -> Result<TriMesh> {
        TriMesh::new(self.vertices.clone(), self.faces.clone())
    }
}

/// Split the fan of a vertex into sectors.
///
/// Returns the sector of every `(face, corner)` pair around the vertex and the
/// number of sectors.
fn fan_sectors(
    incident: &[(usize, usize)],
    adjacency: &TriangleAdjacency,
    seams: &SeamFlags,
) -> (Vec<((usize, usize), usize)>, usize) {
    let is_split =
        |c: &HalfEdgeCursor| c.is_border(adjacency) || seams.is_seam(c.face, c.edge);

    let mut assigned: Vec<((usize, usize), usize)> = Vec::with_capacity(incident.len());
    let mut sectors = 0;

    // Several fans meet at a non-manifold vertex; each one is walked separately.
    while let Some(&(f0, c0)) = incident
        .iter()
        .find(|(f, _)| !assigned.iter().any(|((g, _), _)| g == f))
    {
        let start = HalfEdgeCursor::at_corner(f0, c0);

        // Look for a split; the walk is bounded by the number of faces at v.
        let mut split = None;
        let mut cursor = start;
        for _ in 0..incident.len() {
            if is_split(&cursor) {
                split = Some(cursor);
                break;
            }
            cursor = cursor.next_fan_edge(adjacency);
            if cursor == start {
                break;
            }
        }

        let Some(last) = split else {
            // Unbroken fan: one sector.
            let mut cursor = start;
            for _ in 0..incident.len() {
                assigned.push(((cursor.face, cursor.corner()), sectors));
                cursor = cursor.next_fan_edge(adjacency);
                if cursor == start {
                    break;
                }
            }
            sectors += 1;
            continue;
        };

        // Walk from just after the split back around to it.
        let mut cursor = last.next_fan_edge(adjacency);
        for _ in 0..incident.len() {
            debug_assert!(!cursor.reverse);
            assigned.push(((cursor.face, cursor.corner()), sectors));
            if cursor == last {
                break;
            }
            if is_split(&cursor) {
                sectors += 1;
            }
            cursor = cursor.next_fan_edge(adjacency);
        }
        sectors += 1;
    }

    (assigned, sectors)
}

/// Cut `mesh` along `seams` and along its boundary.
///
/// A fan that is split at `s` places yields `s` sectors (one if it is not
/// split at all, or split only once). Boundary edges always split.
///
/// # Errors
///
/// [`MeshError::InvalidInput`] if `seams` or `adjacency` do not match the mesh.
pub fn cut_mesh(
    mesh: &TriMesh,
    adjacency: &TriangleAdjacency,
    seams: &SeamFlags,
) -> Result<CutMesh> {
    let nf = mesh.num_faces();
    let nv = mesh.num_vertices();
    if seams.num_faces() != nf {
        return Err(MeshError::length_mismatch("seams", nf, seams.num_faces()));
    }
    if adjacency.num_faces() != nf {
        return Err(MeshError::length_mismatch("adjacency", nf, adjacency.num_faces()));
    }

    let vertex_faces = VertexFaces::new(mesh.faces(), nv);
    let mut corner_sector = vec![[0usize; 3]; nf];
    let mut duplicates = vec![0usize; nv];

    for (v, dup) in duplicates.iter_mut().enumerate() {
        let incident = vertex_faces.of(v);
        if incident.is_empty() {
            continue;
        }
        let (assigned, sectors) = fan_sectors(incident, adjacency, seams);
        for ((f, c), s) in assigned {
            corner_sector[f][c] = s;
        }
        *dup = sectors - 1;
    }

    // First copy index of every vertex's duplicates.
    let mut base = vec![0usize; nv];
    let mut next = nv;
    for v in 0..nv {
        base[v] = next;
        next += duplicates[v];
    }

    let mut vertices = mesh.vertices().to_vec();
    vertices.reserve(next - nv);
    let mut original_vertex: Vec<usize> = (0..nv).collect();
    original_vertex.reserve(next - nv);
    for v in 0..nv {
        for _ in 0..duplicates[v] {
            vertices.push(mesh.position(v));
            original_vertex.push(v);
        }
    }

    let faces = mesh
        .faces()
        .iter()
        .zip(&corner_sector)
        .map(|(face, sectors)| {
            let mut cut = [0; 3];
            for c in 0..3 {
                cut[c] = match sectors[c] {
                    0 => face[c],
                    s => base[face[c]] + s - 1,
                };
            }
            cut
        })
        .collect();

    debug!(
        "cut mesh: {} vertices, {} added along seams",
        vertices.len(),
        next - nv
    );

    Ok(CutMesh {
        vertices,
        faces,
        original_vertex,
        duplicates,
    })
}
