//! Face-based adjacency tables.
//!
//! [`TriangleAdjacency`] answers "which face lies across edge `k` of face `f`,
//! and which local edge does it use to refer back". Edge `k` of a face runs
//! from corner `k` to corner `(k + 1) % 3`. [`VertexFaces`] lists the faces
//! around each vertex and [`EdgeTopology`] numbers the undirected edges.

use std::collections::HashMap;

use crate::error::{MeshError, Result};

use super::TriMesh;

/// Triangle-triangle adjacency (the `TT`/`TTi` pair).
///
/// Boundary edges have no neighbor. The table is symmetric: if
/// `across(f, k) == Some((g, j))` then `across(g, j) == Some((f, k))`.
#[derive(Debug, Clone)]
pub struct TriangleAdjacency {
    across: Vec<[Option<(usize, usize)>; 3]>,
}

impl TriangleAdjacency {
    /// Build the adjacency of a validated mesh.
    pub fn new(mesh: &TriMesh) -> Result<Self> {
        Self::from_faces(mesh.faces())
    }

    /// Build the adjacency of a raw face list.
    ///
    /// Fails with [`MeshError::NonManifoldEdge`] if a directed edge occurs
    /// twice, which happens for edges with more than two faces and for
    /// inconsistently oriented neighbors.
    pub fn from_faces(faces: &[[usize; 3]]) -> Result<Self> {
        let mut edge_map: HashMap<(usize, usize), (usize, usize)> =
            HashMap::with_capacity(faces.len() * 3);

        for (f, face) in faces.iter().enumerate() {
            for k in 0..3 {
                let a = face[k];
                let b = face[(k + 1) % 3];
                if edge_map.insert((a, b), (f, k)).is_some() {
                    return Err(MeshError::NonManifoldEdge { v0: a, v1: b });
                }
            }
        }

        let across = faces
            .iter()
            .map(|face| {
                let mut row = [None; 3];
                for (k, slot) in row.iter_mut().enumerate() {
                    let a = face[k];
                    let b = face[(k + 1) % 3];
                    *slot = edge_map.get(&(b, a)).copied();
                }
                row
            })
            .collect();

        Ok(Self { across })
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.across.len()
    }

    /// Face and local edge on the other side of edge `k` of face `f`.
    #[inline]
    pub fn across(&self, f: usize, k: usize) -> Option<(usize, usize)> {
        self.across[f][k]
    }

    /// Face on the other side of edge `k` of face `f` (`TT`).
    #[inline]
    pub fn neighbor(&self, f: usize, k: usize) -> Option<usize> {
        self.across[f][k].map(|(g, _)| g)
    }

    /// Local edge index the neighbor uses for the shared edge (`TTi`).
    #[inline]
    pub fn inverse_edge(&self, f: usize, k: usize) -> Option<usize> {
        self.across[f][k].map(|(_, j)| j)
    }

    /// Whether edge `k` of face `f` lies on the mesh boundary.
    #[inline]
    pub fn is_boundary_edge(&self, f: usize, k: usize) -> bool {
        self.across[f][k].is_none()
    }

    /// Label every face with its connected component.
    ///
    /// Returns the per-face labels and the number of components.
    pub fn components(&self) -> (Vec<usize>, usize) {
        let mut label = vec![usize::MAX; self.across.len()];
        let mut count = 0;
        let mut stack = Vec::new();

        for seed in 0..self.across.len() {
            if label[seed] != usize::MAX {
                continue;
            }
            label[seed] = count;
            stack.push(seed);
            while let Some(f) = stack.pop() {
                for (g, _) in self.across[f].iter().flatten() {
                    if label[*g] == usize::MAX {
                        label[*g] = count;
                        stack.push(*g);
                    }
                }
            }
            count += 1;
        }

        (label, count)
    }

    /// Flag vertices that touch a boundary edge.
    pub fn boundary_vertices(&self, faces: &[[usize; 3]], num_vertices: usize) -> Vec<bool> {
        let mut boundary = vec![false; num_vertices];
        for (f, face) in faces.iter().enumerate() {
            for k in 0..3 {
                if self.across[f][k].is_none() {
                    boundary[face[k]] = true;
                    boundary[face[(k + 1) % 3]] = true;
                }
            }
        }
        boundary
    }
}

/// Vertex-face adjacency (the `VF`/`VFi` pair).
#[derive(Debug, Clone)]
pub struct VertexFaces {
    incident: Vec<Vec<(usize, usize)>>,
}

impl VertexFaces {
    /// Collect, for every vertex, the `(face, corner)` pairs that reference it.
    pub fn new(faces: &[[usize; 3]], num_vertices: usize) -> Self {
        let mut incident = vec![Vec::new(); num_vertices];
        for (f, face) in faces.iter().enumerate() {
            for (corner, &v) in face.iter().enumerate() {
                incident[v].push((f, corner));
            }
        }
        Self { incident }
    }

    /// `(face, corner)` pairs around vertex `v`, in face order.
    #[inline]
    pub fn of(&self, v: usize) -> &[(usize, usize)] {
        &self.incident[v]
    }

    /// First `(face, corner)` pair of vertex `v`, if it is referenced at all.
    #[inline]
    pub fn first(&self, v: usize) -> Option<(usize, usize)> {
        self.incident[v].first().copied()
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.incident.len()
    }
}

/// Undirected edge numbering (`EV`, `FE`, `EF`).
///
/// `ev[e]` stores the endpoints with the smaller index first. `ef[e][0]` is
/// the face in which the edge runs from `ev[e][0]` to `ev[e][1]`, `ef[e][1]`
/// the face in which it runs the other way; either is `None` on the boundary.
#[derive(Debug, Clone)]
pub struct EdgeTopology {
    ev: Vec<[usize; 2]>,
    fe: Vec<[usize; 3]>,
    ef: Vec<[Option<usize>; 2]>,
}

impl EdgeTopology {
    /// Number the edges of a mesh.
    pub fn new(faces: &[[usize; 3]], adjacency: &TriangleAdjacency) -> Self {
        let mut ev = Vec::new();
        let mut ef = Vec::new();
        let mut fe = vec![[usize::MAX; 3]; faces.len()];

        for (f, face) in faces.iter().enumerate() {
            for k in 0..3 {
                if fe[f][k] != usize::MAX {
                    continue;
                }
                let a = face[k];
                let b = face[(k + 1) % 3];
                let e = ev.len();
                fe[f][k] = e;

                let other = adjacency.across(f, k);
                if let Some((g, j)) = other {
                    fe[g][j] = e;
                }

                // Face f traverses a -> b.
                if a < b {
                    ev.push([a, b]);
                    ef.push([Some(f), other.map(|(g, _)| g)]);
                } else {
                    ev.push([b, a]);
                    ef.push([other.map(|(g, _)| g), Some(f)]);
                }
            }
        }

        Self { ev, fe, ef }
    }

    /// Number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.ev.len()
    }

    /// Endpoints of edge `e`, smaller index first.
    #[inline]
    pub fn vertices(&self, e: usize) -> [usize; 2] {
        self.ev[e]
    }

    /// Faces of edge `e` as `[left, right]`.
    #[inline]
    pub fn faces(&self, e: usize) -> [Option<usize>; 2] {
        self.ef[e]
    }

    /// Edge id of local edge `k` of face `f`.
    #[inline]
    pub fn face_edge(&self, f: usize, k: usize) -> usize {
        self.fe[f][k]
    }

    /// Whether edge `e` has a single incident face.
    #[inline]
    pub fn is_boundary(&self, e: usize) -> bool {
        self.ef[e][0].is_none() || self.ef[e][1].is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::fixtures::{cube, grid, single_triangle, two_triangles};
    use proptest::prelude::*;

    fn assert_symmetric(adj: &TriangleAdjacency) {
        for f in 0..adj.num_faces() {
            for k in 0..3 {
                if let Some((g, j)) = adj.across(f, k) {
                    assert_eq!(adj.across(g, j), Some((f, k)), "asymmetric at ({}, {})", f, k);
                }
            }
        }
    }

    #[test]
    fn test_single_triangle_all_boundary() {
        let mesh = single_triangle();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        for k in 0..3 {
            assert!(adj.is_boundary_edge(0, k));
            assert_eq!(adj.neighbor(0, k), None);
        }
        assert!(adj
            .boundary_vertices(mesh.faces(), mesh.num_vertices())
            .iter()
            .all(|&b| b));
    }

    #[test]
    fn test_two_triangles_share_edge() {
        let mesh = two_triangles();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        // Face 0 = [0, 1, 2], face 1 = [2, 1, 3]; shared edge 1 -> 2.
        assert_eq!(adj.across(0, 1), Some((1, 0)));
        assert_eq!(adj.across(1, 0), Some((0, 1)));
        assert_symmetric(&adj);
    }

    #[test]
    fn test_closed_mesh_has_no_boundary() {
        let mesh = cube();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        for f in 0..mesh.num_faces() {
            for k in 0..3 {
                assert!(!adj.is_boundary_edge(f, k));
            }
        }
        assert_symmetric(&adj);
        let (_, count) = adj.components();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_non_manifold_edge_rejected() {
        let faces = vec![[0, 1, 2], [0, 1, 3]];
        match TriangleAdjacency::from_faces(&faces).unwrap_err() {
            MeshError::NonManifoldEdge { v0: 0, v1: 1 } => (),
            e => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn test_components() {
        let faces = vec![[0, 1, 2], [3, 4, 5], [2, 1, 6]];
        let adj = TriangleAdjacency::from_faces(&faces).unwrap();
        let (labels, count) = adj.components();
        assert_eq!(count, 2);
        assert_eq!(labels[0], labels[2]);
        assert_ne!(labels[0], labels[1]);
    }

    #[test]
    fn test_vertex_faces() {
        let mesh = two_triangles();
        let vf = VertexFaces::new(mesh.faces(), mesh.num_vertices());
        assert_eq!(vf.of(1), &[(0, 1), (1, 1)]);
        assert_eq!(vf.of(3), &[(1, 2)]);
        assert_eq!(vf.first(0), Some((0, 0)));
    }

    #[test]
    fn test_edge_topology_orientation() {
        let mesh = grid(3);
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let edges = EdgeTopology::new(mesh.faces(), &adj);

        // Euler: V - E + F = 1 for a disk.
        let chi =
            mesh.num_vertices() as i64 - edges.num_edges() as i64 + mesh.num_faces() as i64;
        assert_eq!(chi, 1);

        for e in 0..edges.num_edges() {
            let [a, b] = edges.vertices(e);
            assert!(a < b);
            let [left, right] = edges.faces(e);
            if let Some(f) = left {
                let face = mesh.face(f);
                assert!((0..3).any(|k| face[k] == a && face[(k + 1) % 3] == b));
            }
            if let Some(f) = right {
                let face = mesh.face(f);
                assert!((0..3).any(|k| face[k] == b && face[(k + 1) % 3] == a));
            }
        }

        for f in 0..mesh.num_faces() {
            for k in 0..3 {
                let e = edges.face_edge(f, k);
                assert_eq!(edges.is_boundary(e), adj.is_boundary_edge(f, k));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_grid_adjacency_symmetric(n in 1usize..8) {
            let mesh = grid(n);
            let adj = TriangleAdjacency::new(&mesh).unwrap();
            assert_symmetric(&adj);
            let boundary_edges = (0..mesh.num_faces())
                .flat_map(|f| (0..3).map(move |k| (f, k)))
                .filter(|&(f, k)| adj.is_boundary_edge(f, k))
                .count();
            prop_assert_eq!(boundary_edges, 4 * n);
        }
    }
}
