//! Singularities of a combed field.
//!
//! The index of a vertex is the number of turns the field makes while
//! walking once around the vertex, following the closest representative
//! across every edge. It is the sum of the residual rotations across the
//! incident edges plus the angle defect, divided by `2π`, and is always a
//! multiple of `1/K`.

use std::f64::consts::PI;

use log::debug;

use crate::error::{MeshError, Result};
use crate::mesh::geometry::{angle_defects, face_normals};
use crate::mesh::{TriMesh, TriangleAdjacency};

use super::comb::{FieldSymmetry, FrameField};
use super::mismatch::transported_angle;

/// Per-vertex singularity index.
#[derive(Debug, Clone, PartialEq)]
pub struct Singularities {
    /// Index in full turns; a multiple of `1/K`, zero on the boundary.
    pub index: Vec<f64>,
    /// Whether the index is nonzero.
    pub is_singular: Vec<bool>,
}

impl Singularities {
    /// All vertices flagged regular.
    pub fn none(num_vertices: usize) -> Self {
        Self {
            index: vec![0.0; num_vertices],
            is_singular: vec![false; num_vertices],
        }
    }

    /// Indices of the singular vertices, in increasing order.
    pub fn singular_vertices(&self) -> impl Iterator<Item = usize> + '_ {
        self.is_singular
            .iter()
            .enumerate()
            .filter_map(|(v, &s)| s.then_some(v))
    }

    /// Number of singular vertices.
    pub fn count(&self) -> usize {
        self.is_singular.iter().filter(|&&s| s).count()
    }
}

/// Find the singular vertices of a combed field.
///
/// Every interior edge contributes the residual rotation `δ` between the
/// two faces' closest representatives, with `-δ` at the start vertex and
/// `+δ` at the end vertex of the edge as seen from the face processed
/// first. The integer part of each crossing is taken from `mismatch`.
/// Boundary and unreferenced vertices get index 0.
///
/// # Errors
///
/// - [`MeshError::InvalidInput`] if `field` or `mismatch` do not match the mesh,
///   or a mismatch value is out of range (odd values for a line field)
/// - [`MeshError::DegenerateGeometry`] for zero-area faces
pub fn find_singularities(
    mesh: &TriMesh,
    adjacency: &TriangleAdjacency,
    field: &FrameField,
    mismatch: &[[usize; 3]],
    symmetry: FieldSymmetry,
) -> Result<Singularities> {
    field.check(mesh)?;
    let nf = mesh.num_faces();
    if mismatch.len() != nf {
        return Err(MeshError::length_mismatch("mismatch", nf, mismatch.len()));
    }
    // Mismatch counts quarter turns, so a line field only allows 0 and 2.
    let scale = 4 / symmetry.order();
    if let Some(m) = mismatch.iter().flatten().find(|&&m| m >= 4 || m % scale != 0) {
        return Err(MeshError::InvalidInput(format!(
            "mismatch value {} out of range for a {}-fold field",
            m,
            symmetry.order()
        )));
    }

    let normals = face_normals(mesh)?;
    let order = symmetry.order() as i64;
    let scale = scale as i64;
    let step = symmetry.step();

    let mut acc = vec![0.0; mesh.num_vertices()];
    for (f, face) in mesh.faces().iter().enumerate() {
        for k in 0..3 {
            let Some((g, j)) = adjacency.across(f, k) else {
                continue;
            };
            if (g, j) < (f, k) || g == f {
                continue;
            }

            let angle = transported_angle(&normals, field, f, g);
            let residue = mismatch[f][k] as i64 / scale;
            let turns = ((angle / step - residue as f64) / order as f64).round() as i64;
            let i = residue + order * turns;
            let delta = angle - i as f64 * step;

            acc[face[k]] -= delta;
            acc[face[(k + 1) % 3]] += delta;
        }
    }

    let defects = angle_defects(mesh);
    let boundary = adjacency.boundary_vertices(mesh.faces(), mesh.num_vertices());
    let mut referenced = vec![false; mesh.num_vertices()];
    for face in mesh.faces() {
        for &v in face {
            referenced[v] = true;
        }
    }

    let k = order as f64;
    let index: Vec<f64> = (0..mesh.num_vertices())
        .map(|v| {
            if boundary[v] || !referenced[v] {
                0.0
            } else {
                let turns = (acc[v] + defects[v]) / (2.0 * PI);
                (turns * k).round() / k
            }
        })
        .collect();
    let is_singular: Vec<bool> = index.iter().map(|i| i.abs() > 0.5 / k).collect();

    let result = Singularities { index, is_singular };
    debug!("{} singular vertices", result.count());
    Ok(result)
}
