//! Seam graph extraction.
//!
//! A field with singularities can only be integrated on a simply connected
//! domain. The seam graph is a set of mesh edges that, once cut open, leaves
//! every connected piece a topological disk while still containing every
//! edge across which the field jumps.

use std::collections::VecDeque;

use log::debug;

use crate::error::{MeshError, Result};
use crate::mesh::{TriMesh, TriangleAdjacency, VertexFaces};

/// One flag per directed face-edge; `true` marks a cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeamFlags {
    flags: Vec<[bool; 3]>,
}

impl SeamFlags {
    /// No edge is cut.
    pub fn none(num_faces: usize) -> Self {
        Self {
            flags: vec![[false; 3]; num_faces],
        }
    }

    /// Every edge is cut.
    pub fn all(num_faces: usize) -> Self {
        Self {
            flags: vec![[true; 3]; num_faces],
        }
    }

    /// Wrap per-face flags.
    pub fn from_vec(flags: Vec<[bool; 3]>) -> Self {
        Self { flags }
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.flags.len()
    }

    /// Whether edge `k` of face `f` is cut.
    #[inline]
    pub fn is_seam(&self, f: usize, k: usize) -> bool {
        self.flags[f][k]
    }

    /// Set the flag of edge `k` of face `f` and of its twin.
    pub fn set(&mut self, adjacency: &TriangleAdjacency, f: usize, k: usize, value: bool) {
        self.flags[f][k] = value;
        if let Some((g, j)) = adjacency.across(f, k) {
            self.flags[g][j] = value;
        }
    }

    /// Raw per-face flags.
    pub fn as_slice(&self) -> &[[bool; 3]] {
        &self.flags
    }

    /// Number of undirected interior edges flagged as seams.
    pub fn num_interior_seams(&self, adjacency: &TriangleAdjacency) -> usize {
        let mut count = 0;
        for (f, row) in self.flags.iter().enumerate() {
            for (k, &seam) in row.iter().enumerate() {
                if let Some(twin) = adjacency.across(f, k) {
                    if seam && (f, k) < twin {
                        count += 1;
                    }
                }
            }
        }
        count
    }
}

/// Whether the field jumps across edge `k` of face `f`.
fn is_rotational(mismatch: &[[usize; 3]], adjacency: &TriangleAdjacency, f: usize, k: usize) -> bool {
    match adjacency.across(f, k) {
        Some((g, j)) => mismatch[f][k] != 0 || mismatch[g][j] != 0,
        None => false,
    }
}

/// Compute the seam graph of a field from its per-edge mismatch.
///
/// 1. Flood fill the dual graph across edges whose mismatch is zero on both
///    sides, clearing the flag of every crossed edge. The fill re-seeds at
///    every face it has not reached yet.
/// 2. Retract dangling seam edges: an edge whose endpoint has exactly one
///    incident seam edge is cleared, unless the field jumps across it or it
///    lies on the boundary. Vertices are processed from a work queue, so the
///    pass terminates after at most one clear per edge.
/// 3. Flag every edge with nonzero mismatch as a seam.
///
/// Boundary edges stay flagged and count toward the seam degree of their
/// endpoints.
///
/// # Errors
///
/// [`MeshError::InvalidInput`] if `mismatch` does not have one row per face.
pub fn cut_mesh_from_singularities(
    mesh: &TriMesh,
    adjacency: &TriangleAdjacency,
    mismatch: &[[usize; 3]],
) -> Result<SeamFlags> {
    let nf = mesh.num_faces();
    if mismatch.len() != nf {
        return Err(MeshError::length_mismatch("mismatch", nf, mismatch.len()));
    }
    if adjacency.num_faces() != nf {
        return Err(MeshError::length_mismatch("adjacency", nf, adjacency.num_faces()));
    }

    let mut seams = SeamFlags::all(nf);

    // Flood fill.
    let mut visited = vec![false; nf];
    let mut queue = VecDeque::new();
    for seed in 0..nf {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);
        while let Some(f) = queue.pop_front() {
            for k in 0..3 {
                let Some((g, _)) = adjacency.across(f, k) else {
                    continue;
                };
                if !visited[g] && !is_rotational(mismatch, adjacency, f, k) {
                    seams.set(adjacency, f, k, false);
                    visited[g] = true;
                    queue.push_back(g);
                }
            }
        }
    }
    let after_fill = seams.num_interior_seams(adjacency);

    // Retraction.
    let faces = mesh.faces();
    let vertex_faces = VertexFaces::new(faces, mesh.num_vertices());
    let mut degree = vec![0usize; mesh.num_vertices()];
    for (f, face) in faces.iter().enumerate() {
        for k in 0..3 {
            let counted_here = match adjacency.across(f, k) {
                Some(twin) => (f, k) < twin,
                None => true,
            };
            if seams.is_seam(f, k) && counted_here {
                degree[face[k]] += 1;
                degree[face[(k + 1) % 3]] += 1;
            }
        }
    }

    let mut work: VecDeque<usize> = (0..mesh.num_vertices()).filter(|&v| degree[v] == 1).collect();
    let mut retracted = 0;
    while let Some(v) = work.pop_front() {
        if degree[v] != 1 {
            continue;
        }
        // The single seam edge at v, as seen from any face that has it.
        let edge = vertex_faces.of(v).iter().find_map(|&(f, c)| {
            [c, (c + 2) % 3]
                .into_iter()
                .find(|&k| seams.is_seam(f, k))
                .map(|k| (f, k))
        });
        let Some((f, k)) = edge else {
            continue;
        };
        if adjacency.is_boundary_edge(f, k) || is_rotational(mismatch, adjacency, f, k) {
            continue;
        }

        seams.set(adjacency, f, k, false);
        retracted += 1;
        let a = faces[f][k];
        let b = faces[f][(k + 1) % 3];
        degree[a] -= 1;
        degree[b] -= 1;
        let other = if a == v { b } else { a };
        if degree[other] == 1 {
            work.push_back(other);
        }
    }

    // Jumps can never be glued.
    for f in 0..nf {
        for k in 0..3 {
            if is_rotational(mismatch, adjacency, f, k) {
                seams.set(adjacency, f, k, true);
            }
        }
    }

    debug!(
        "seam graph: {} interior edges after flood fill, {} retracted, {} remaining",
        after_fill,
        retracted,
        seams.num_interior_seams(adjacency)
    );
    Ok(seams)
}
