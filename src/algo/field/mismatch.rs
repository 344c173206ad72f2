//! Integer mismatch of a combed field across mesh edges.
//!
//! For every directed face-edge `(f, k)` the mismatch counts how many
//! symmetry steps (quarter turns for cross fields, half turns for line
//! fields) separate the representative on `f` from the representative of
//! the face across edge `k`, after transporting it into `f`'s tangent plane.

use log::debug;
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::error::{MeshError, Result};
use crate::mesh::geometry::{face_normals, rotation_matrix_from_directions};
use crate::mesh::{TriMesh, TriangleAdjacency};

use super::comb::{comb, FieldSymmetry, FrameField};

/// Angle of `g`'s first direction, transported into `f`'s tangent plane, in
/// the `(pd1, pd2)` basis of `f`.
pub(crate) fn transported_angle(
    normals: &[Vector3<f64>],
    field: &FrameField,
    f: usize,
    g: usize,
) -> f64 {
    let rotation = rotation_matrix_from_directions(&normals[g], &normals[f]);
    let d = rotation * field.pd1[g];
    let d = d.try_normalize(0.0).unwrap_or(d);
    d.dot(&field.pd2[f]).atan2(d.dot(&field.pd1[f]))
}

/// Nearest whole number of symmetry steps in `angle`.
#[inline]
pub(crate) fn nearest_step(angle: f64, symmetry: FieldSymmetry) -> i64 {
    (angle / symmetry.step() + 0.5).floor() as i64
}

/// Mismatch of every directed face-edge.
///
/// Cross fields give values in `0..4`, line fields `0` or `2`. Boundary
/// edges have mismatch 0. When `is_combed` is false the field is combed
/// first; the mismatch of an uncombed field is not meaningful.
///
/// # Errors
///
/// - [`MeshError::InvalidInput`] if the field or adjacency do not match `mesh`
/// - [`MeshError::DegenerateGeometry`] for zero-area faces
pub fn field_mismatch(
    mesh: &TriMesh,
    adjacency: &TriangleAdjacency,
    field: &FrameField,
    symmetry: FieldSymmetry,
    is_combed: bool,
) -> Result<Vec<[usize; 3]>> {
    field.check(mesh)?;
    if adjacency.num_faces() != mesh.num_faces() {
        return Err(MeshError::length_mismatch(
            "adjacency",
            mesh.num_faces(),
            adjacency.num_faces(),
        ));
    }

    let combed;
    let field = if is_combed {
        field
    } else {
        combed = comb(mesh, adjacency, &field.pd1, symmetry)?;
        &combed
    };

    let normals = face_normals(mesh)?;
    let order = symmetry.order() as i64;
    let scale = 4 / symmetry.order();

    let mismatch: Vec<[usize; 3]> = (0..mesh.num_faces())
        .into_par_iter()
        .map(|f| {
            let mut row = [0; 3];
            for (k, slot) in row.iter_mut().enumerate() {
                *slot = match adjacency.neighbor(f, k) {
                    Some(g) if g != f => {
                        let i = nearest_step(transported_angle(&normals, field, f, g), symmetry);
                        i.rem_euclid(order) as usize * scale
                    }
                    _ => 0,
                };
            }
            row
        })
        .collect();

    let rotational = mismatch.iter().flatten().filter(|&&m| m != 0).count();
    debug!("{} directed face-edges with nonzero mismatch", rotational);

    Ok(mismatch)
}

/// Mismatch of a cross field (values in `0..4`).
pub fn cross_field_mismatch(
    mesh: &TriMesh,
    adjacency: &TriangleAdjacency,
    field: &FrameField,
    is_combed: bool,
) -> Result<Vec<[usize; 3]>> {
    field_mismatch(mesh, adjacency, field, FieldSymmetry::Cross, is_combed)
}

/// Mismatch of a line field (values `0` or `2`).
pub fn line_field_mismatch(
    mesh: &TriMesh,
    adjacency: &TriangleAdjacency,
    field: &FrameField,
    is_combed: bool,
) -> Result<Vec<[usize; 3]>> {
    field_mismatch(mesh, adjacency, field, FieldSymmetry::Line, is_combed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::cut::cut_mesh_from_singularities;
    use crate::algo::field::comb_cross_field;
    use crate::mesh::fixtures::{fan, grid, two_triangles};

    fn rotated_pair(degrees: f64) -> FrameField {
        let t = degrees.to_radians();
        let d1 = Vector3::new(t.cos(), t.sin(), 0.0);
        FrameField {
            pd1: vec![Vector3::x(), d1],
            pd2: vec![Vector3::y(), Vector3::z().cross(&d1)],
        }
    }

    #[test]
    fn test_rotated_neighbor_has_unit_mismatch() {
        let mesh = two_triangles();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let field = rotated_pair(50.0);
        let mm = cross_field_mismatch(&mesh, &adj, &field, true).unwrap();

        // The shared edge is edge 1 of face 0 and edge 0 of face 1.
        assert_eq!(mm[0][1], 1);
        assert_eq!(mm[1][0], 3);
        for (f, k) in [(0, 0), (0, 2), (1, 1), (1, 2)] {
            assert_eq!(mm[f][k], 0, "boundary edge ({}, {})", f, k);
        }
    }

    #[test]
    fn test_half_step_rotation_rounds_up_and_stays_a_seam() {
        let mesh = two_triangles();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let field = rotated_pair(45.0);
        let mm = cross_field_mismatch(&mesh, &adj, &field, true).unwrap();
        assert_eq!(mm[0][1], 1);

        let seams = cut_mesh_from_singularities(&mesh, &adj, &mm).unwrap();
        assert!(seams.is_seam(0, 1));
        assert!(seams.is_seam(1, 0));
    }

    #[test]
    fn test_combing_first_removes_tree_mismatch() {
        let mesh = two_triangles();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let field = rotated_pair(50.0);
        let mm = cross_field_mismatch(&mesh, &adj, &field, false).unwrap();
        assert!(mm.iter().flatten().all(|&m| m == 0));
    }

    #[test]
    fn test_line_field_half_turn() {
        let mesh = two_triangles();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let field = rotated_pair(170.0);
        let mm = line_field_mismatch(&mesh, &adj, &field, true).unwrap();
        assert_eq!(mm[0][1], 2);
        assert_eq!(mm[1][0], 2);

        let small = rotated_pair(30.0);
        let mm = line_field_mismatch(&mesh, &adj, &small, true).unwrap();
        assert_eq!(mm[0][1], 0);
    }

    #[test]
    fn test_mismatch_is_deterministic() {
        let mesh = grid(4);
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let field: Vec<_> = (0..mesh.num_faces())
            .map(|f| {
                let t = 0.4 * f as f64;
                Vector3::new(t.cos(), t.sin(), 0.0)
            })
            .collect();
        let combed = comb_cross_field(&mesh, &adj, &field).unwrap();
        let a = cross_field_mismatch(&mesh, &adj, &combed, true).unwrap();
        let b = cross_field_mismatch(&mesh, &adj, &combed, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_regular_fan_mismatch_sums_to_zero() {
        let mesh = fan(6, 0.3);
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        // Project a constant direction onto every face, then scramble the
        // representatives by quarter turns.
        let normals = face_normals(&mesh).unwrap();
        let field: Vec<_> = normals
            .iter()
            .enumerate()
            .map(|(f, n)| {
                let d = Vector3::x() - n * n.x;
                FieldSymmetry::Cross.representative(&d, n, f)
            })
            .collect();
        let combed = comb_cross_field(&mesh, &adj, &field).unwrap();
        let mm = cross_field_mismatch(&mesh, &adj, &combed, true).unwrap();

        // Face i = [0, i+1, i+2] meets face i+1 across its edge 2.
        let total: usize = (0..mesh.num_faces()).map(|f| mm[f][2]).sum();
        assert_eq!(total % 4, 0);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mesh = two_triangles();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let field = FrameField {
            pd1: vec![Vector3::x()],
            pd2: vec![Vector3::y()],
        };
        assert!(matches!(
            cross_field_mismatch(&mesh, &adj, &field, true),
            Err(MeshError::InvalidInput(_))
        ));
    }
}
