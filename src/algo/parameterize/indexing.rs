//! Seam curves and their transition constraints.
//!
//! Interior seam edges are chained into maximal curves that run between
//! branch points, curve ends and singularities. Every curve owns one integer
//! translation, shared by all the vertex pairs along it.

use log::debug;

use crate::algo::cut::{CutMesh, SeamFlags};
use crate::error::{MeshError, Result};
use crate::mesh::{TriMesh, TriangleAdjacency};

/// A matched pair of cut vertices on the two sides of a seam.
///
/// The parametrization must satisfy `rotate(mismatch) · uv(vertex) -
/// uv(matched) + t = 0`, where `t` is the translation of `integer_var` and
/// `rotate(m)` turns by `-m` quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeamConstraint {
    /// Cut vertex on the side where the curve runs forward.
    pub vertex: usize,
    /// The copy of the same original vertex on the other side.
    pub matched: usize,
    /// Quarter turns from the first side's field to the second's.
    pub mismatch: usize,
    /// Curve (and integer translation) this pair belongs to.
    pub integer_var: usize,
}

/// Seam curves of a cut mesh.
#[derive(Debug, Clone, Default)]
pub struct VertexIndexing {
    /// Original-vertex sequence of every curve. Closed loops repeat their
    /// first vertex at the end.
    pub curves: Vec<Vec<usize>>,
    /// Transition constraints, curve by curve.
    pub constraints: Vec<SeamConstraint>,
}

impl VertexIndexing {
    /// Number of integer translation variables (one per curve).
    #[inline]
    pub fn num_integer_vars(&self) -> usize {
        self.curves.len()
    }

    /// Chain the seams of `mesh` into curves.
    ///
    /// Start vertices are those with a seam degree other than 2 and the
    /// singular ones. Each walk consumes one seam edge at a time and stops at
    /// the next start vertex; seam loops without any start vertex are walked
    /// afterwards. Every pair along a curve is read from the face in which
    /// the seam edge runs from the earlier to the later vertex, so all rows
    /// of a curve take their first vertex from the same side.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidInput`] if the inputs do not describe the same mesh.
    pub fn new(
        mesh: &TriMesh,
        adjacency: &TriangleAdjacency,
        cut: &CutMesh,
        seams: &SeamFlags,
        mismatch: &[[usize; 3]],
        is_singular: &[bool],
    ) -> Result<Self> {
        let nf = mesh.num_faces();
        let nv = mesh.num_vertices();
        if cut.num_faces() != nf {
            return Err(MeshError::length_mismatch("cut mesh faces", nf, cut.num_faces()));
        }
        if seams.num_faces() != nf {
            return Err(MeshError::length_mismatch("seams", nf, seams.num_faces()));
        }
        if mismatch.len() != nf {
            return Err(MeshError::length_mismatch("mismatch", nf, mismatch.len()));
        }
        if is_singular.len() != nv {
            return Err(MeshError::length_mismatch("singularities", nv, is_singular.len()));
        }

        let faces = mesh.faces();

        // Interior seam edges, stored once, and the seam neighbors of every vertex.
        let mut edges: Vec<(usize, usize)> = Vec::new();
        let mut neighbors: Vec<Vec<(usize, usize)>> = vec![Vec::new(); nv];
        for (f, face) in faces.iter().enumerate() {
            for k in 0..3 {
                let Some(twin) = adjacency.across(f, k) else {
                    continue;
                };
                if !seams.is_seam(f, k) || twin < (f, k) {
                    continue;
                }
                let a = face[k];
                let b = face[(k + 1) % 3];
                let id = edges.len();
                edges.push((f, k));
                neighbors[a].push((b, id));
                neighbors[b].push((a, id));
            }
        }

        let is_start: Vec<bool> = (0..nv)
            .map(|v| {
                let degree = neighbors[v].len();
                degree > 0 && (degree != 2 || is_singular[v])
            })
            .collect();

        let mut consumed = vec![false; edges.len()];
        let mut curves: Vec<Vec<(usize, Option<usize>)>> = Vec::new();

        let walk = |from: usize, consumed: &mut Vec<bool>| {
            let mut curve = vec![(from, None)];
            let mut current = from;
            loop {
                let next = neighbors[current]
                    .iter()
                    .find(|&&(_, id)| !consumed[id])
                    .copied();
                let Some((w, id)) = next else {
                    break;
                };
                consumed[id] = true;
                curve.push((w, Some(id)));
                current = w;
                if is_start[w] || w == from {
                    break;
                }
            }
            curve
        };

        for v in 0..nv {
            if !is_start[v] {
                continue;
            }
            while neighbors[v].iter().any(|&(_, id)| !consumed[id]) {
                curves.push(walk(v, &mut consumed));
            }
        }
        // Closed loops through regular vertices only.
        for v in 0..nv {
            while neighbors[v].iter().any(|&(_, id)| !consumed[id]) {
                curves.push(walk(v, &mut consumed));
            }
        }

        let mut constraints = Vec::new();
        for (var, curve) in curves.iter().enumerate() {
            for i in 1..curve.len() {
                let (prev, _) = curve[i - 1];
                let Some(id) = curve[i].1 else {
                    continue;
                };
                let (f, k) = edges[id];
                // Face in which the edge runs prev -> current.
                let (f, k) = if faces[f][k] == prev {
                    (f, k)
                } else {
                    adjacency.across(f, k).unwrap_or((f, k))
                };
                let Some((ff, kk)) = adjacency.across(f, k) else {
                    continue;
                };

                let v0 = cut.faces[f][k];
                let v1 = cut.faces[f][(k + 1) % 3];
                let v1p = cut.faces[ff][kk];
                let v0p = cut.faces[ff][(kk + 1) % 3];
                let mm = mismatch[f][k];

                constraints.push(SeamConstraint {
                    vertex: v0,
                    matched: v0p,
                    mismatch: mm,
                    integer_var: var,
                });
                if i + 1 == curve.len() {
                    constraints.push(SeamConstraint {
                        vertex: v1,
                        matched: v1p,
                        mismatch: mm,
                        integer_var: var,
                    });
                }
            }
        }

        let curves: Vec<Vec<usize>> = curves
            .into_iter()
            .map(|c| c.into_iter().map(|(v, _)| v).collect())
            .collect();

        debug!(
            "{} seam edges chained into {} curves, {} transition pairs",
            edges.len(),
            curves.len(),
            constraints.len()
        );

        Ok(Self {
            curves,
            constraints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::cut::{cut_mesh, cut_mesh_from_singularities};
    use crate::mesh::fixtures::{cube, grid, two_triangles};

    fn index(
        mesh: &TriMesh,
        seams: &SeamFlags,
        mismatch: &[[usize; 3]],
        singular: &[bool],
    ) -> (CutMesh, VertexIndexing) {
        let adj = TriangleAdjacency::new(mesh).unwrap();
        let cut = cut_mesh(mesh, &adj, seams).unwrap();
        let indexing = VertexIndexing::new(mesh, &adj, &cut, seams, mismatch, singular).unwrap();
        (cut, indexing)
    }

    fn assert_pairs_match(cut: &CutMesh, indexing: &VertexIndexing) {
        for c in &indexing.constraints {
            assert_eq!(cut.original_vertex[c.vertex], cut.original_vertex[c.matched]);
            assert!(c.integer_var < indexing.num_integer_vars());
        }
    }

    #[test]
    fn test_single_seam_edge() {
        let mesh = two_triangles();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let mismatch = vec![[0, 1, 0], [3, 0, 0]];
        let seams = cut_mesh_from_singularities(&mesh, &adj, &mismatch).unwrap();
        let (cut, indexing) = index(&mesh, &seams, &mismatch, &[false; 4]);

        assert_eq!(indexing.num_integer_vars(), 1);
        assert_eq!(indexing.curves[0], vec![1, 2]);
        assert_eq!(indexing.constraints.len(), 2);
        assert_pairs_match(&cut, &indexing);
        assert!(indexing.constraints.iter().all(|c| c.vertex != c.matched));
        // Vertex 1 -> 2 runs forward in face 0, where the mismatch is 1.
        assert!(indexing.constraints.iter().all(|c| c.mismatch == 1));
        assert_eq!(cut.original_vertex[indexing.constraints[0].vertex], 1);
        assert_eq!(cut.original_vertex[indexing.constraints[1].vertex], 2);
    }

    #[test]
    fn test_every_seam_edge_consumed_once() {
        let mesh = cube();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let mut mismatch = vec![[0; 3]; mesh.num_faces()];
        for (f, face) in mesh.faces().iter().enumerate() {
            for k in 0..3 {
                if face[k] == 0 && face[(k + 1) % 3] == 2 {
                    mismatch[f][k] = 1;
                    let (g, j) = adj.across(f, k).unwrap();
                    mismatch[g][j] = 3;
                }
            }
        }
        let seams = cut_mesh_from_singularities(&mesh, &adj, &mismatch).unwrap();
        let (cut, indexing) = index(&mesh, &seams, &mismatch, &[true; 8]);

        let walked: usize = indexing.curves.iter().map(|c| c.len() - 1).sum();
        assert_eq!(walked, seams.num_interior_seams(&adj));
        // One pair per walked edge plus the closing pair of each curve.
        assert_eq!(indexing.constraints.len(), walked + indexing.curves.len());
        assert_pairs_match(&cut, &indexing);
    }

    #[test]
    fn test_closed_loop_without_start_vertex() {
        // Cut out the central cell of a 3x3 grid; none of its corners is a
        // branch point.
        let mesh = grid(3);
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let ring = [5, 6, 10, 9];
        let mut seams = SeamFlags::none(mesh.num_faces());
        for (f, face) in mesh.faces().iter().enumerate() {
            for k in 0..3 {
                let a = face[k];
                let b = face[(k + 1) % 3];
                let on_ring = (0..4).any(|i| {
                    let (p, q) = (ring[i], ring[(i + 1) % 4]);
                    (a, b) == (p, q) || (a, b) == (q, p)
                });
                if on_ring {
                    seams.set(&adj, f, k, true);
                }
            }
        }
        let mismatch = vec![[0; 3]; mesh.num_faces()];
        let (cut, indexing) = index(&mesh, &seams, &mismatch, &vec![false; 16]);

        assert_eq!(indexing.num_integer_vars(), 1);
        let curve = &indexing.curves[0];
        assert_eq!(curve.len(), 5);
        assert_eq!(curve.first(), curve.last());
        assert_eq!(indexing.constraints.len(), 5);
        assert_pairs_match(&cut, &indexing);
        assert!(indexing.constraints.iter().all(|c| c.vertex != c.matched));
    }

    #[test]
    fn test_singular_vertex_splits_curve() {
        let mesh = grid(3);
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        // Horizontal seam through interior vertices 5 and 6, from boundary
        // vertex 4 to boundary vertex 7.
        let mut seams = SeamFlags::none(mesh.num_faces());
        for (f, face) in mesh.faces().iter().enumerate() {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                let (lo, hi) = (a.min(b), a.max(b));
                if (4..7).contains(&lo) && hi == lo + 1 {
                    seams.set(&adj, f, k, true);
                }
            }
        }
        let mismatch = vec![[0; 3]; mesh.num_faces()];
        let mut singular = vec![false; 16];

        let (_, plain) = index(&mesh, &seams, &mismatch, &singular);
        assert_eq!(plain.num_integer_vars(), 1);

        singular[5] = true;
        let (cut, split) = index(&mesh, &seams, &mismatch, &singular);
        assert_eq!(split.num_integer_vars(), 2);
        assert_pairs_match(&cut, &split);
    }
}
