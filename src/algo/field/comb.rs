//! Combing of rotationally symmetric fields.
//!
//! A cross field stores one of four equivalent directions per face, a line
//! field one of two. Combing picks, face by face, the representative that
//! best agrees with an already combed neighbor, so that the field varies
//! smoothly across every edge of a spanning tree of the dual graph.

use std::collections::VecDeque;
use std::f64::consts::{FRAC_PI_2, PI};

use log::debug;
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::error::{MeshError, Result};
use crate::mesh::geometry::{face_normals, local_frames, rotation_matrix_from_directions};
use crate::mesh::{TriMesh, TriangleAdjacency};

/// Rotational symmetry of a direction field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSymmetry {
    /// Directions are defined up to a half turn (`K = 2`).
    Line,
    /// Directions are defined up to a quarter turn (`K = 4`).
    Cross,
}

impl FieldSymmetry {
    /// Number of equivalent representatives `K`.
    #[inline]
    pub fn order(self) -> usize {
        match self {
            FieldSymmetry::Line => 2,
            FieldSymmetry::Cross => 4,
        }
    }

    /// Angle between consecutive representatives.
    #[inline]
    pub fn step(self) -> f64 {
        match self {
            FieldSymmetry::Line => PI,
            FieldSymmetry::Cross => FRAC_PI_2,
        }
    }

    /// Representative `i` of direction `a` on a face with unit normal `n`,
    /// counting counter-clockwise.
    #[inline]
    pub fn representative(self, a: &Vector3<f64>, n: &Vector3<f64>, i: usize) -> Vector3<f64> {
        match (self, i % self.order()) {
            (_, 0) => *a,
            (FieldSymmetry::Line, _) => -a,
            (FieldSymmetry::Cross, 1) => n.cross(a),
            (FieldSymmetry::Cross, 2) => -a,
            (FieldSymmetry::Cross, _) => -n.cross(a),
        }
    }
}

/// Per-face pair of tangent directions.
///
/// For a combed cross or line field `pd2` is `pd1` turned a quarter turn
/// counter-clockwise. [`comb_frame_field`] produces general frames where
/// `pd2` is the clockwise neighbor of `pd1` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameField {
    /// First direction of every face.
    pub pd1: Vec<Vector3<f64>>,
    /// Second direction of every face.
    pub pd2: Vec<Vector3<f64>>,
}

impl FrameField {
    /// Number of faces covered by the field.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.pd1.len()
    }

    pub(crate) fn check(&self, mesh: &TriMesh) -> Result<()> {
        if self.pd1.len() != mesh.num_faces() {
            return Err(MeshError::length_mismatch("pd1", mesh.num_faces(), self.pd1.len()));
        }
        if self.pd2.len() != mesh.num_faces() {
            return Err(MeshError::length_mismatch("pd2", mesh.num_faces(), self.pd2.len()));
        }
        Ok(())
    }
}

fn unit_directions(directions: &[Vector3<f64>]) -> Result<Vec<Vector3<f64>>> {
    directions
        .iter()
        .enumerate()
        .map(|(f, d)| {
            d.try_normalize(1e-300)
                .ok_or(MeshError::DegenerateGeometry { face: f })
        })
        .collect()
}

/// Comb a field with the given symmetry.
///
/// Faces are visited breadth-first from face 0, re-seeding at the first
/// unvisited face of every further component. The combed direction of a
/// visited face is rotated into the tangent plane of each unvisited
/// neighbor, and the neighbor keeps whichever of its own `K`
/// representatives has the largest dot product with it. The stored vector
/// is always the neighbor's own (normalized) direction, never the
/// transported one. Ties go to the representative that comes first in
/// counter-clockwise order.
///
/// # Arguments
///
/// * `mesh` - The mesh the field lives on
/// * `adjacency` - Face adjacency of `mesh`
/// * `directions` - One tangent direction per face
/// * `symmetry` - Line or cross symmetry
///
/// # Errors
///
/// - [`MeshError::InvalidInput`] if `directions` does not have one entry per face
/// - [`MeshError::DegenerateGeometry`] for a zero-area face or a zero direction
pub fn comb(
    mesh: &TriMesh,
    adjacency: &TriangleAdjacency,
    directions: &[Vector3<f64>],
    symmetry: FieldSymmetry,
) -> Result<FrameField> {
    let nf = mesh.num_faces();
    if directions.len() != nf {
        return Err(MeshError::length_mismatch("field", nf, directions.len()));
    }
    if adjacency.num_faces() != nf {
        return Err(MeshError::length_mismatch("adjacency", nf, adjacency.num_faces()));
    }

    let normals = face_normals(mesh)?;
    let own = unit_directions(directions)?;

    let mut combed = own.clone();
    let mut visited = vec![false; nf];
    let mut queue = VecDeque::new();
    let mut components = 0;
    let mut changed = 0;

    for seed in 0..nf {
        if visited[seed] {
            continue;
        }
        components += 1;
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(f0) = queue.pop_front() {
            for k in 0..3 {
                let Some(f1) = adjacency.neighbor(f0, k) else {
                    continue;
                };
                if visited[f1] {
                    continue;
                }

                let rotation = rotation_matrix_from_directions(&normals[f0], &normals[f1]);
                let transported = rotation * combed[f0];

                let mut best = 0;
                let mut best_dot = f64::NEG_INFINITY;
                for i in 0..symmetry.order() {
                    let candidate = symmetry.representative(&own[f1], &normals[f1], i);
                    let dot = candidate.dot(&transported);
                    if dot > best_dot {
                        best_dot = dot;
                        best = i;
                    }
                }
                if best != 0 {
                    changed += 1;
                }
                combed[f1] = symmetry.representative(&own[f1], &normals[f1], best);

                visited[f1] = true;
                queue.push_back(f1);
            }
        }
    }

    debug!(
        "combed {} faces in {} components, {} representatives changed",
        nf, components, changed
    );

    let pd2 = combed
        .par_iter()
        .zip(normals.par_iter())
        .map(|(d, n)| n.cross(d))
        .collect();
    Ok(FrameField { pd1: combed, pd2 })
}

/// Comb a cross field (four-fold symmetry).
pub fn comb_cross_field(
    mesh: &TriMesh,
    adjacency: &TriangleAdjacency,
    directions: &[Vector3<f64>],
) -> Result<FrameField> {
    comb(mesh, adjacency, directions, FieldSymmetry::Cross)
}

/// Comb a line field (two-fold symmetry).
pub fn comb_line_field(
    mesh: &TriMesh,
    adjacency: &TriangleAdjacency,
    directions: &[Vector3<f64>],
) -> Result<FrameField> {
    comb(mesh, adjacency, directions, FieldSymmetry::Line)
}

/// Bisectors of a general frame field.
///
/// Both directions are expressed as angles in the face's local frame,
/// wrapped to `[0, 2π)`, and averaged. The result is a cross field whose
/// `pd1` is the bisector and whose `pd2` is the bisector turned a quarter
/// turn counter-clockwise.
pub fn frame_field_bisectors(mesh: &TriMesh, field: &FrameField) -> Result<FrameField> {
    field.check(mesh)?;
    let frames = local_frames(mesh)?;

    let (pd1, pd2) = frames
        .par_iter()
        .zip(field.pd1.par_iter().zip(field.pd2.par_iter()))
        .map(|(frame, (d1, d2))| {
            let a1 = frame.angle_of(d1).rem_euclid(2.0 * PI);
            let a2 = frame.angle_of(d2).rem_euclid(2.0 * PI);
            let b = ((a1 + a2) / 2.0).rem_euclid(2.0 * PI);
            (frame.direction(b), frame.direction(b + FRAC_PI_2))
        })
        .unzip();

    Ok(FrameField { pd1, pd2 })
}

/// Orient a general frame field after its bisectors.
///
/// For every face the four directions `±pd1, ±pd2` are measured
/// counter-clockwise from the combed bisector. The first one reached
/// becomes the combed first direction and the last one reached becomes the
/// combed second direction, so the bisector sits between them.
pub fn comb_frame_field(
    mesh: &TriMesh,
    field: &FrameField,
    combed_bisectors: &FrameField,
) -> Result<FrameField> {
    field.check(mesh)?;
    combed_bisectors.check(mesh)?;
    let frames = local_frames(mesh)?;

    let (pd1, pd2) = (0..mesh.num_faces())
        .into_par_iter()
        .map(|f| {
            let frame = &frames[f];
            let directions = [field.pd1[f], field.pd2[f], -field.pd1[f], -field.pd2[f]];
            let reference = frame.angle_of(&combed_bisectors.pd1[f]);

            let angles = directions.map(|d| (frame.angle_of(&d) - reference).rem_euclid(2.0 * PI));
            let mut first = 0;
            let mut last = 0;
            for i in 1..4 {
                if angles[i] < angles[first] {
                    first = i;
                }
                if angles[i] > angles[last] {
                    last = i;
                }
            }
            (directions[first], directions[last])
        })
        .unzip();

    Ok(FrameField { pd1, pd2 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::fixtures::{cube, grid, two_triangles};
    use nalgebra::Rotation3;

    fn noisy_grid_field(n: usize) -> (TriMesh, Vec<Vector3<f64>>) {
        let mesh = grid(n);
        // Every face points roughly along x, but in a scrambled representative.
        let field = (0..mesh.num_faces())
            .map(|f| {
                let wobble = 0.1 * ((f * 7 % 5) as f64 - 2.0) / 2.0;
                let base = Vector3::new(wobble.cos(), wobble.sin(), 0.0);
                let quarter = Rotation3::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
                let mut d = base;
                for _ in 0..(f % 4) {
                    d = quarter * d;
                }
                d
            })
            .collect();
        (mesh, field)
    }

    #[test]
    fn test_representatives() {
        let a = Vector3::x();
        let n = Vector3::z();
        let cross: Vec<_> = (0..4).map(|i| FieldSymmetry::Cross.representative(&a, &n, i)).collect();
        assert_eq!(cross[1], Vector3::y());
        assert_eq!(cross[2], -Vector3::x());
        assert_eq!(cross[3], -Vector3::y());
        assert_eq!(FieldSymmetry::Line.representative(&a, &n, 1), -a);
        assert!((FieldSymmetry::Cross.step() * 4.0 - 2.0 * PI).abs() < 1e-15);
    }

    #[test]
    fn test_comb_aligns_scrambled_cross_field() {
        let (mesh, field) = noisy_grid_field(4);
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let combed = comb_cross_field(&mesh, &adj, &field).unwrap();

        for d in &combed.pd1 {
            assert!(d.x > 0.9, "face not aligned with +x: {:?}", d);
            assert!((d.norm() - 1.0).abs() < 1e-12);
        }
        for (d1, d2) in combed.pd1.iter().zip(&combed.pd2) {
            assert!((d1.cross(d2) - Vector3::z()).norm() < 1e-12);
        }
    }

    #[test]
    fn test_comb_is_idempotent() {
        let mesh = cube();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let frames = local_frames(&mesh).unwrap();
        let field: Vec<_> = frames.iter().map(|fr| fr.direction(0.3)).collect();

        let once = comb_cross_field(&mesh, &adj, &field).unwrap();
        let twice = comb_cross_field(&mesh, &adj, &once.pd1).unwrap();
        for (a, b) in once.pd1.iter().zip(&twice.pd1) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_line_field_flips_only() {
        let mesh = two_triangles();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let field = vec![Vector3::x(), Vector3::new(-1.0, 0.2, 0.0)];
        let combed = comb_line_field(&mesh, &adj, &field).unwrap();
        assert_eq!(combed.pd1[0], Vector3::x());
        assert!(combed.pd1[1].x > 0.0);
        assert!((combed.pd1[1] + field[1].normalize()).norm() < 1e-12);
    }

    #[test]
    fn test_disconnected_components_are_combed() {
        let mesh = TriMesh::new(
            vec![
                nalgebra::Point3::new(0.0, 0.0, 0.0),
                nalgebra::Point3::new(1.0, 0.0, 0.0),
                nalgebra::Point3::new(0.0, 1.0, 0.0),
                nalgebra::Point3::new(5.0, 0.0, 0.0),
                nalgebra::Point3::new(6.0, 0.0, 0.0),
                nalgebra::Point3::new(5.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        )
        .unwrap();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let field = vec![Vector3::x(), Vector3::y()];
        let combed = comb_cross_field(&mesh, &adj, &field).unwrap();
        assert_eq!(combed.pd1, field);
    }

    #[test]
    fn test_zero_direction_rejected() {
        let mesh = two_triangles();
        let adj = TriangleAdjacency::new(&mesh).unwrap();
        let field = vec![Vector3::x(), Vector3::zeros()];
        assert!(matches!(
            comb_cross_field(&mesh, &adj, &field),
            Err(MeshError::DegenerateGeometry { face: 1 })
        ));
        assert!(matches!(
            comb_cross_field(&mesh, &adj, &field[..1]),
            Err(MeshError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_bisectors_and_frame_combing() {
        let mesh = two_triangles();
        let field = FrameField {
            pd1: vec![Vector3::x(); 2],
            pd2: vec![Vector3::y(); 2],
        };
        let bis = frame_field_bisectors(&mesh, &field).unwrap();
        let diag = Vector3::new(1.0, 1.0, 0.0).normalize();
        for (b1, b2) in bis.pd1.iter().zip(&bis.pd2) {
            assert!((b1 - diag).norm() < 1e-12);
            assert!((Vector3::z().cross(b1) - b2).norm() < 1e-12);
        }

        // Going counter-clockwise from the bisector at 45 degrees, +y comes
        // first and +x last.
        let combed = comb_frame_field(&mesh, &field, &bis).unwrap();
        for f in 0..2 {
            assert!((combed.pd1[f] - Vector3::y()).norm() < 1e-12);
            assert!((combed.pd2[f] - Vector3::x()).norm() < 1e-12);
        }
    }
}
