//! N-RoSy field interpolation.
//!
//! Interpolates an N-fold rotationally symmetric direction field from a few
//! constrained faces. Every face carries an angle in its local frame and
//! every interior edge an integer period jump; the smoothness energy
//!
//! ```text
//! Σ_e (θ_i - θ_j + k_e + p_e · 2π/N)²
//! ```
//!
//! is minimized with the jumps rounded to integers. `k_e` is the angle
//! between the local frames of the two faces of edge `e`.
//!
//! # References
//!
//! - Bommes, D., Zimmer, H., & Kobbelt, L. (2009). "Mixed-integer
//!   quadrangulation." ACM SIGGRAPH.

use std::collections::VecDeque;
use std::f64::consts::PI;

use log::{debug, info};
use nalgebra::{DVector, Vector3};

use crate::algo::field::FrameField;
use crate::algo::solver::{
    ConstrainedSystem, CsrMatrix, GreedyRounding, MixedIntegerSolver, RoundingOptions,
};
use crate::error::{MeshError, Result};
use crate::mesh::geometry::{angle_defects, local_frames, rotation_matrix_from_directions};
use crate::mesh::{EdgeTopology, LocalFrame, TriMesh, TriangleAdjacency};

/// Options for [`NRosyField::solve`].
#[derive(Debug, Clone)]
pub struct NRosyOptions {
    /// Rotational symmetry of the field.
    pub n: usize,
    /// Blend between smoothness (0) and soft constraints (towards 1).
    pub soft_alpha: f64,
    /// Options of the mixed-integer solve.
    pub rounding: RoundingOptions,
}

impl Default for NRosyOptions {
    fn default() -> Self {
        Self {
            n: 4,
            soft_alpha: 0.5,
            rounding: RoundingOptions::default(),
        }
    }
}

impl NRosyOptions {
    /// Set the symmetry order.
    pub fn with_n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    /// Set the soft constraint weight.
    pub fn with_soft_alpha(mut self, alpha: f64) -> Self {
        self.soft_alpha = alpha;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(MeshError::invalid_param("n", self.n, "must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.soft_alpha) {
            return Err(MeshError::invalid_param(
                "soft_alpha",
                self.soft_alpha,
                "must lie in [0, 1)",
            ));
        }
        Ok(())
    }
}

/// Solver state: mesh topology, per-edge frame rotations and constraints.
#[derive(Debug, Clone)]
pub struct NRosyField {
    adjacency: TriangleAdjacency,
    edges: EdgeTopology,
    frames: Vec<LocalFrame>,
    /// Frame rotation from the left to the right face of every interior edge.
    k: Vec<f64>,
    defects: Vec<f64>,
    faces: Vec<[usize; 3]>,
    hard: Vec<Option<f64>>,
    soft: Vec<(f64, f64)>,
}

impl NRosyField {
    /// Prepare the field solver for `mesh`.
    ///
    /// # Errors
    ///
    /// - [`MeshError::EmptyMesh`] for a mesh without faces
    /// - [`MeshError::NonManifoldEdge`] from the adjacency builder
    /// - [`MeshError::DegenerateGeometry`] for a zero-area face
    pub fn new(mesh: &TriMesh) -> Result<Self> {
        if mesh.num_faces() == 0 {
            return Err(MeshError::EmptyMesh);
        }
        let adjacency = TriangleAdjacency::new(mesh)?;
        let edges = EdgeTopology::new(mesh.faces(), &adjacency);
        let frames = local_frames(mesh)?;

        let k = (0..edges.num_edges())
            .map(|e| match edges.faces(e) {
                [Some(i), Some(j)] => {
                    let r = rotation_matrix_from_directions(&frames[i].normal, &frames[j].normal);
                    frames[j].angle_of(&(r * frames[i].b1))
                }
                _ => 0.0,
            })
            .collect();

        let nf = mesh.num_faces();
        Ok(Self {
            adjacency,
            edges,
            frames,
            k,
            defects: angle_defects(mesh),
            faces: mesh.faces().to_vec(),
            hard: vec![None; nf],
            soft: vec![(0.0, 0.0); nf],
        })
    }

    /// Number of faces of the underlying mesh.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    fn local_angle(&self, face: usize, direction: &Vector3<f64>) -> Result<f64> {
        if face >= self.num_faces() {
            return Err(MeshError::InvalidInput(format!(
                "constrained face {} out of range for {} faces",
                face,
                self.num_faces()
            )));
        }
        let frame = &self.frames[face];
        let tangent = direction - frame.normal * direction.dot(&frame.normal);
        if tangent.norm() <= 1e-12 * direction.norm().max(1.0) {
            return Err(MeshError::DegenerateGeometry { face });
        }
        Ok(frame.angle_of(&tangent))
    }

    /// Fix the field of `face` to `direction` (projected onto the face).
    pub fn set_hard(&mut self, face: usize, direction: &Vector3<f64>) -> Result<()> {
        self.hard[face] = Some(self.local_angle(face, direction)?);
        Ok(())
    }

    /// Pull the field of `face` towards `direction` with `weight`.
    pub fn set_soft(&mut self, face: usize, weight: f64, direction: &Vector3<f64>) -> Result<()> {
        let angle = self.local_angle(face, direction)?;
        self.soft[face] = (weight, angle);
        Ok(())
    }

    /// Remove every constraint.
    pub fn reset_constraints(&mut self) {
        self.hard.iter_mut().for_each(|h| *h = None);
        self.soft.iter_mut().for_each(|s| *s = (0.0, 0.0));
    }

    fn is_constrained(&self, f: usize) -> bool {
        self.hard[f].is_some() || self.soft[f].0 != 0.0
    }

    /// Jumps fixed before the solve.
    ///
    /// A breadth-first search from the constrained faces fixes the jump of
    /// every edge it crosses (and of every boundary edge it meets) to zero.
    /// Jumps between two hard faces are determined by their angles.
    fn reduce_space(&self, n: usize) -> Vec<Option<i64>> {
        let nf = self.num_faces();
        let mut fixed = vec![None; self.edges.num_edges()];
        let starting: Vec<bool> = (0..nf).map(|f| self.is_constrained(f)).collect();
        let mut visited = vec![false; nf];
        let mut queue: VecDeque<usize> = (0..nf).filter(|&f| starting[f]).collect();

        while let Some(c) = queue.pop_front() {
            visited[c] = true;
            for k in 0..3 {
                let e = self.edges.face_edge(c, k);
                match self.adjacency.neighbor(c, k) {
                    Some(g) => {
                        if !visited[g] && !starting[g] {
                            fixed[e] = Some(0);
                            visited[g] = true;
                            queue.push_back(g);
                        }
                    }
                    None => fixed[e] = Some(0),
                }
            }
        }

        let step = 2.0 * PI / n as f64;
        for e in 0..self.edges.num_edges() {
            if let [Some(i), Some(j)] = self.edges.faces(e) {
                if let (Some(hi), Some(hj)) = (self.hard[i], self.hard[j]) {
                    fixed[e] = Some(((hj - hi - self.k[e]) / step).round() as i64);
                }
            }
        }
        fixed
    }

    /// Interpolate the field.
    ///
    /// # Errors
    ///
    /// - [`MeshError::MissingConstraints`] if no face is constrained
    /// - [`MeshError::InvalidParameter`] for invalid options
    /// - Errors of the mixed-integer solver are propagated
    pub fn solve(&self, options: &NRosyOptions) -> Result<NRosyResult> {
        options.validate()?;
        let nf = self.num_faces();
        if !(0..nf).any(|f| self.is_constrained(f)) {
            return Err(MeshError::MissingConstraints);
        }
        let n = options.n;
        let step = 2.0 * PI / n as f64;

        let mut jumps = self.reduce_space(n);

        // Edges carrying energy: interior, not between two hard faces.
        let active: Vec<(usize, usize, usize)> = (0..self.edges.num_edges())
            .filter_map(|e| match self.edges.faces(e) {
                [Some(i), Some(j)] if !(self.hard[i].is_some() && self.hard[j].is_some()) => {
                    Some((e, i, j))
                }
                _ => None,
            })
            .collect();

        let mut has_energy: Vec<bool> = (0..nf).map(|f| self.soft[f].0 != 0.0).collect();
        for &(_, i, j) in &active {
            has_energy[i] = true;
            has_energy[j] = true;
        }

        let mut angle_var = vec![None; nf];
        let mut count = 0;
        for f in 0..nf {
            if self.hard[f].is_none() && has_energy[f] {
                angle_var[f] = Some(count);
                count += 1;
            }
        }
        let num_angles = count;
        let mut jump_var = vec![None; self.edges.num_edges()];
        for &(e, _, _) in &active {
            if jumps[e].is_none() {
                jump_var[e] = Some(count);
                count += 1;
            }
        }

        let mut triplets = Vec::with_capacity(9 * active.len());
        let mut rhs = DVector::zeros(count);
        for &(e, i, j) in &active {
            // Residual θ_i - θ_j + k + p·step as a·x + c.
            let mut terms: Vec<(usize, f64)> = Vec::with_capacity(3);
            let mut constant = self.k[e];
            match (angle_var[i], self.hard[i]) {
                (Some(var), _) => terms.push((var, 1.0)),
                (None, hard) => constant += hard.unwrap_or(0.0),
            }
            match (angle_var[j], self.hard[j]) {
                (Some(var), _) => terms.push((var, -1.0)),
                (None, hard) => constant -= hard.unwrap_or(0.0),
            }
            match (jump_var[e], jumps[e]) {
                (Some(var), _) => terms.push((var, step)),
                (None, fixed) => constant += fixed.unwrap_or(0) as f64 * step,
            }
            for &(r, ar) in &terms {
                for &(c, ac) in &terms {
                    triplets.push((r, c, 2.0 * ar * ac));
                }
                rhs[r] -= 2.0 * ar * constant;
            }
        }

        let has_soft = self.soft.iter().any(|&(w, _)| w != 0.0);
        if has_soft {
            let alpha = options.soft_alpha;
            for t in &mut triplets {
                t.2 *= 1.0 - alpha;
            }
            rhs *= 1.0 - alpha;
            for f in 0..nf {
                let (w, angle) = self.soft[f];
                if let Some(var) = angle_var[f] {
                    if w != 0.0 {
                        triplets.push((var, var, alpha * w));
                        rhs[var] += alpha * w * angle;
                    }
                }
            }
        }

        let to_round: Vec<usize> = (num_angles..count).collect();
        debug!(
            "nrosy: {} angle unknowns, {} free jumps, {} active edges",
            num_angles,
            to_round.len(),
            active.len()
        );

        let matrix = CsrMatrix::from_triplets(count, count, triplets);
        let system = ConstrainedSystem::new(matrix, rhs, Vec::new())?;
        let x = GreedyRounding::new(options.rounding.clone()).solve(&system, &to_round)?;

        let angles: Vec<f64> = (0..nf)
            .map(|f| match (angle_var[f], self.hard[f]) {
                (Some(var), _) => x[var],
                (None, hard) => hard.unwrap_or(0.0),
            })
            .collect();
        for (e, var) in jump_var.iter().enumerate() {
            if let Some(var) = var {
                jumps[e] = Some(x[*var].round() as i64);
            }
        }
        let jumps: Vec<i64> = jumps.into_iter().map(|p| p.unwrap_or(0)).collect();

        let singularity_index = self.find_cones(&jumps, n);
        let result = NRosyResult {
            n,
            angles,
            jumps,
            frames: self.frames.clone(),
            singularity_index,
        };
        info!(
            "nrosy: {}-fold field with {} singular vertices",
            n,
            result.singular_vertices().count()
        );
        Ok(result)
    }

    /// Per-vertex index, in full turns.
    fn find_cones(&self, jumps: &[i64], n: usize) -> Vec<f64> {
        let nv = self.defects.len();
        let mut acc = vec![0.0; nv];
        for e in 0..self.edges.num_edges() {
            if !self.edges.is_boundary(e) {
                let [v0, v1] = self.edges.vertices(e);
                acc[v0] += self.k[e];
                acc[v1] -= self.k[e];
            }
        }

        let mut index: Vec<f64> = acc
            .iter()
            .zip(&self.defects)
            .map(|(a, d)| ((a + d) / (2.0 * PI)).round())
            .collect();
        for e in 0..self.edges.num_edges() {
            if !self.edges.is_boundary(e) {
                let [v0, v1] = self.edges.vertices(e);
                index[v0] += jumps[e] as f64 / n as f64;
                index[v1] -= jumps[e] as f64 / n as f64;
            }
        }

        let mut referenced = vec![false; nv];
        for face in &self.faces {
            for &v in face {
                referenced[v] = true;
            }
        }
        let boundary = self.adjacency.boundary_vertices(&self.faces, nv);
        for v in 0..nv {
            if boundary[v] || !referenced[v] {
                index[v] = 0.0;
            }
        }
        index
    }
}

/// Output of an N-RoSy solve.
#[derive(Debug, Clone)]
pub struct NRosyResult {
    n: usize,
    /// Field angle of every face in its local frame.
    pub angles: Vec<f64>,
    /// Integer period jump of every edge; zero on the boundary.
    pub jumps: Vec<i64>,
    frames: Vec<LocalFrame>,
    /// Index of every vertex in full turns, a multiple of `1/N`.
    pub singularity_index: Vec<f64>,
}

impl NRosyResult {
    /// Symmetry order.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Unit field vector of every face.
    pub fn field_per_face(&self) -> Vec<Vector3<f64>> {
        self.frames
            .iter()
            .zip(&self.angles)
            .map(|(frame, &a)| frame.direction(a))
            .collect()
    }

    /// All `N` directions of face `f`, counter-clockwise from the stored one.
    pub fn representatives(&self, f: usize) -> Vec<Vector3<f64>> {
        let step = 2.0 * PI / self.n as f64;
        (0..self.n)
            .map(|i| self.frames[f].direction(self.angles[f] + i as f64 * step))
            .collect()
    }

    /// The field as a frame `(v, n × v)` per face.
    pub fn frame_field(&self) -> FrameField {
        let pd1 = self.field_per_face();
        let pd2 = self
            .frames
            .iter()
            .zip(&pd1)
            .map(|(frame, v)| frame.normal.cross(v).normalize())
            .collect();
        FrameField { pd1, pd2 }
    }

    /// Vertices with a nonzero index.
    pub fn singular_vertices(&self) -> impl Iterator<Item = usize> + '_ {
        let threshold = 0.5 / self.n as f64;
        self.singularity_index
            .iter()
            .enumerate()
            .filter_map(move |(v, &i)| (i.abs() > threshold).then_some(v))
    }
}

/// Interpolate an N-RoSy field from hard and soft face constraints.
///
/// `hard` pairs a face with the direction it must follow; `soft` adds a
/// weight to each pair. Directions are projected onto their face.
///
/// # Arguments
///
/// * `mesh` - The mesh the field lives on
/// * `hard` - `(face, direction)` hard constraints
/// * `soft` - `(face, weight, direction)` soft constraints
/// * `options` - Symmetry, soft weight and solver options
///
/// # Errors
///
/// - [`MeshError::MissingConstraints`] if there are no constraints
/// - [`MeshError::InvalidInput`] for a constraint on a missing face
/// - [`MeshError::DegenerateGeometry`] for a constraint normal to its face
///
/// # Example
///
/// ```no_run
/// use quadfield::prelude::*;
/// use quadfield::algo::nrosy::{nrosy, NRosyOptions};
///
/// let mesh: TriMesh = quadfield::io::load("input.obj").unwrap();
/// let hard = [(0, Vector3::new(1.0, 0.0, 0.0))];
/// let field = nrosy(&mesh, &hard, &[], &NRosyOptions::default()).unwrap();
/// println!("{} singularities", field.singular_vertices().count());
/// ```
pub fn nrosy(
    mesh: &TriMesh,
    hard: &[(usize, Vector3<f64>)],
    soft: &[(usize, f64, Vector3<f64>)],
    options: &NRosyOptions,
) -> Result<NRosyResult> {
    let mut field = NRosyField::new(mesh)?;
    for (face, direction) in hard {
        field.set_hard(*face, direction)?;
    }
    for (face, weight, direction) in soft {
        field.set_soft(*face, *weight, direction)?;
    }
    field.solve(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::fixtures::{cube, grid, octahedron};

    fn assert_multiple_of(value: f64, unit: f64) {
        let r = value / unit;
        assert!((r - r.round()).abs() < 1e-9, "{} is not a multiple of {}", value, unit);
    }

    #[test]
    fn test_flat_grid_is_parallel() {
        let mesh = grid(4);
        let result = nrosy(&mesh, &[(0, Vector3::x())], &[], &NRosyOptions::default()).unwrap();

        for f in 0..mesh.num_faces() {
            let best = result
                .representatives(f)
                .iter()
                .map(|d| d.dot(&Vector3::x()))
                .fold(f64::NEG_INFINITY, f64::max);
            assert!((best - 1.0).abs() < 1e-6, "face {} drifted", f);
        }
        assert_eq!(result.singular_vertices().count(), 0);
    }

    #[test]
    fn test_hard_constraints_respected() {
        let mesh = grid(3);
        let d0 = Vector3::new(1.0, 1.0, 0.0);
        let d1 = Vector3::new(0.3, -1.0, 0.0);
        let hard = [(0, d0), (mesh.num_faces() - 1, d1)];
        let result = nrosy(&mesh, &hard, &[], &NRosyOptions::default()).unwrap();
        let field = result.field_per_face();
        assert!((field[0].dot(&d0.normalize()) - 1.0).abs() < 1e-9);
        assert!((field[mesh.num_faces() - 1].dot(&d1.normalize()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_closed_meshes_index_sum() {
        for mesh in [octahedron(), cube()] {
            let [a, b, _] = mesh.face_positions(0);
            let result = nrosy(&mesh, &[(0, b - a)], &[], &NRosyOptions::default()).unwrap();
            let sum: f64 = result.singularity_index.iter().sum();
            assert!((sum - 2.0).abs() < 1e-9);
            for &i in &result.singularity_index {
                assert_multiple_of(i, 0.25);
            }
            assert!(result.singular_vertices().count() > 0);
        }
    }

    #[test]
    fn test_line_field_index_sum() {
        let mesh = octahedron();
        let options = NRosyOptions::default().with_n(2);
        let result = nrosy(&mesh, &[(3, Vector3::z())], &[], &options).unwrap();
        let sum: f64 = result.singularity_index.iter().sum();
        assert!((sum - 2.0).abs() < 1e-9);
        for &i in &result.singularity_index {
            assert_multiple_of(i, 0.5);
        }
        assert_eq!(result.representatives(0).len(), 2);
    }

    #[test]
    fn test_soft_constraint_pulls_field() {
        let mesh = grid(3);
        let target = Vector3::new(1.0, 2.0, 0.0).normalize();
        let result = nrosy(&mesh, &[], &[(4, 1.0, target)], &NRosyOptions::default()).unwrap();
        let best = result
            .representatives(4)
            .iter()
            .map(|d| d.dot(&target))
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(best > 0.99);
    }

    #[test]
    fn test_frame_field_is_orthonormal() {
        let mesh = cube();
        let result = nrosy(&mesh, &[(2, Vector3::y())], &[], &NRosyOptions::default()).unwrap();
        let frame = result.frame_field();
        for f in 0..mesh.num_faces() {
            assert!((frame.pd1[f].norm() - 1.0).abs() < 1e-9);
            assert!(frame.pd1[f].dot(&frame.pd2[f]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_reduce_space_fixes_a_spanning_tree() {
        let mesh = grid(3);
        let mut field = NRosyField::new(&mesh).unwrap();
        field.set_hard(0, &Vector3::x()).unwrap();
        let fixed = field.reduce_space(4);

        let interior = (0..field.edges.num_edges())
            .filter(|&e| !field.edges.is_boundary(e))
            .count();
        let fixed_interior = (0..field.edges.num_edges())
            .filter(|&e| !field.edges.is_boundary(e) && fixed[e].is_some())
            .count();
        assert_eq!(fixed_interior, mesh.num_faces() - 1);
        assert!(interior > fixed_interior);
        assert!(fixed.iter().flatten().all(|&p| p == 0));
    }

    #[test]
    fn test_errors() {
        let mesh = grid(2);
        assert!(matches!(
            nrosy(&mesh, &[], &[], &NRosyOptions::default()),
            Err(MeshError::MissingConstraints)
        ));
        assert!(matches!(
            nrosy(&mesh, &[(0, Vector3::x())], &[], &NRosyOptions::default().with_n(0)),
            Err(MeshError::InvalidParameter { name: "n", .. })
        ));
        assert!(matches!(
            nrosy(&mesh, &[(0, Vector3::x())], &[], &NRosyOptions::default().with_soft_alpha(1.0)),
            Err(MeshError::InvalidParameter { .. })
        ));
        assert!(matches!(
            nrosy(&mesh, &[(99, Vector3::x())], &[], &NRosyOptions::default()),
            Err(MeshError::InvalidInput(_))
        ));
        assert!(matches!(
            nrosy(&mesh, &[(0, Vector3::z())], &[], &NRosyOptions::default()),
            Err(MeshError::DegenerateGeometry { face: 0 })
        ));
    }
}
