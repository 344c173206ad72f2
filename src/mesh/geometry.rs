//! Per-face and per-vertex geometric quantities.
//!
//! Per-face quantities are independent of each other and are computed with
//! rayon parallel iterators.

use std::f64::consts::PI;

use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};
use rayon::prelude::*;

use crate::error::{MeshError, Result};

use super::TriMesh;

/// Dot product threshold below which two unit directions count as equal
/// (or opposite) in [`rotation_matrix_from_directions`].
const PARALLEL_EPSILON: f64 = 1e-8;

/// Orthonormal tangent frame of a face.
///
/// `b1` follows the first edge of the face, `normal` is the unit face normal
/// and `b2 = normal x b1`, so `(b1, b2, normal)` is right-handed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    /// First tangent axis.
    pub b1: Vector3<f64>,
    /// Second tangent axis.
    pub b2: Vector3<f64>,
    /// Unit normal.
    pub normal: Vector3<f64>,
}

impl LocalFrame {
    /// Angle of a tangent vector, measured counter-clockwise from `b1`.
    #[inline]
    pub fn angle_of(&self, v: &Vector3<f64>) -> f64 {
        v.dot(&self.b2).atan2(v.dot(&self.b1))
    }

    /// Unit tangent vector at `angle` from `b1`.
    #[inline]
    pub fn direction(&self, angle: f64) -> Vector3<f64> {
        self.b1 * angle.cos() + self.b2 * angle.sin()
    }
}

fn degenerate_cross(e1: &Vector3<f64>, e2: &Vector3<f64>) -> Option<Vector3<f64>> {
    let n = e1.cross(e2);
    let scale = e1.norm() * e2.norm();
    if scale == 0.0 || n.norm() <= 1e-14 * scale {
        None
    } else {
        Some(n)
    }
}

/// Unit normal of every face.
///
/// Fails with [`MeshError::DegenerateGeometry`] on the first zero-area face.
pub fn face_normals(mesh: &TriMesh) -> Result<Vec<Vector3<f64>>> {
    (0..mesh.num_faces())
        .into_par_iter()
        .map(|f| {
            let [p0, p1, p2] = mesh.face_positions(f);
            degenerate_cross(&(p1 - p0), &(p2 - p0))
                .map(|n| n.normalize())
                .ok_or(MeshError::DegenerateGeometry { face: f })
        })
        .collect()
}

/// Tangent frame of every face.
pub fn local_frames(mesh: &TriMesh) -> Result<Vec<LocalFrame>> {
    (0..mesh.num_faces())
        .into_par_iter()
        .map(|f| {
            let [p0, p1, p2] = mesh.face_positions(f);
            let e1 = p1 - p0;
            let normal = degenerate_cross(&e1, &(p2 - p0))
                .ok_or(MeshError::DegenerateGeometry { face: f })?
                .normalize();
            let b1 = e1.normalize();
            let b2 = normal.cross(&b1).normalize();
            Ok(LocalFrame { b1, b2, normal })
        })
        .collect()
}

/// Twice the area of every face.
pub fn double_areas(mesh: &TriMesh) -> Vec<f64> {
    (0..mesh.num_faces())
        .into_par_iter()
        .map(|f| {
            let [p0, p1, p2] = mesh.face_positions(f);
            (p1 - p0).cross(&(p2 - p0)).norm()
        })
        .collect()
}

/// Gradients of the three linear hat functions of a triangle.
///
/// Entry `i` is the gradient of the function that is 1 at corner `i` and 0
/// at the other two. Returns `None` for a zero-area triangle.
pub fn hat_gradients(p: &[Point3<f64>; 3]) -> Option<[Vector3<f64>; 3]> {
    let n = degenerate_cross(&(p[1] - p[0]), &(p[2] - p[0]))?;
    let double_area = n.norm();
    let unit = n / double_area;

    let mut grads = [Vector3::zeros(); 3];
    for (i, g) in grads.iter_mut().enumerate() {
        let opposite = p[(i + 2) % 3] - p[(i + 1) % 3];
        *g = unit.cross(&opposite) / double_area;
    }
    Some(grads)
}

/// Interior angle at `a` in triangle `(a, b, c)`.
pub fn triangle_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ab = (b - a).normalize();
    let ac = (c - a).normalize();
    let dot = ab.dot(&ac).clamp(-1.0, 1.0);
    dot.acos()
}

/// Angle defect `2π - Σ angles` of every vertex (discrete Gaussian curvature).
///
/// Unreferenced vertices get `2π`; boundary vertices get the same formula and
/// are expected to be masked by the caller.
pub fn angle_defects(mesh: &TriMesh) -> Vec<f64> {
    let mut defect = vec![2.0 * PI; mesh.num_vertices()];
    for face in mesh.faces() {
        for k in 0..3 {
            let a = mesh.position(face[k]);
            let b = mesh.position(face[(k + 1) % 3]);
            let c = mesh.position(face[(k + 2) % 3]);
            defect[face[k]] -= triangle_angle(&a, &b, &c);
        }
    }
    defect
}

/// Rotation that maps direction `from` onto direction `to`.
///
/// Neither input needs to be normalized. Nearly equal directions give the
/// identity; nearly opposite ones give a half turn about an axis
/// perpendicular to `from`. Zero vectors give the identity.
pub fn rotation_matrix_from_directions(from: &Vector3<f64>, to: &Vector3<f64>) -> Matrix3<f64> {
    let (Some(a), Some(b)) = (from.try_normalize(0.0), to.try_normalize(0.0)) else {
        return Matrix3::identity();
    };

    let dot = a.dot(&b);
    if dot > 1.0 - PARALLEL_EPSILON {
        return Matrix3::identity();
    }
    if dot < -1.0 + PARALLEL_EPSILON {
        // Any axis orthogonal to `a` works; pick the one least aligned with it.
        let helper = if a.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let axis = Unit::new_normalize(a.cross(&helper));
        return Rotation3::from_axis_angle(&axis, PI).into_inner();
    }

    let axis = Unit::new_normalize(a.cross(&b));
    Rotation3::from_axis_angle(&axis, dot.clamp(-1.0, 1.0).acos()).into_inner()
}
