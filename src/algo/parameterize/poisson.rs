//! Assembly of the seamless Poisson system.
//!
//! Unknowns are interleaved per cut vertex (`u` at `2i`, `v` at `2i + 1`),
//! followed by one `(t_u, t_v)` translation pair per seam curve. The energy
//! fits the per-face gradient of `u` to the first field direction and the
//! gradient of `v` to the negated second direction, weighted by area and
//! stiffness. Seam transitions, pinned vertices and sharp features enter as
//! equality rows.

use log::debug;
use nalgebra::{DVector, Point2, Vector3};
use rayon::prelude::*;

use crate::algo::cut::CutMesh;
use crate::algo::field::FrameField;
use crate::algo::solver::{ConstrainedSystem, CsrMatrix, LinearConstraint, MixedIntegerSolver};
use crate::error::{MeshError, Result};
use crate::mesh::geometry::hat_gradients;
use crate::mesh::{TriMesh, VertexFaces};

use super::indexing::{SeamConstraint, VertexIndexing};
use super::miq::MiqOptions;

/// Diagonal regularizer on the translation unknowns.
const TRANSLATION_PENALTY: f64 = 1e-6;

/// `(cos, sin)` of a turn by `-mismatch` quarter turns.
fn quarter_turn(mismatch: usize) -> (f64, f64) {
    match mismatch % 4 {
        0 => (1.0, 0.0),
        1 => (0.0, -1.0),
        2 => (-1.0, 0.0),
        _ => (0.0, 1.0),
    }
}

/// Everything the system is built from.
#[derive(Debug, Clone, Copy)]
pub struct PoissonInput<'a> {
    /// The uncut mesh.
    pub mesh: &'a TriMesh,
    /// The mesh cut open along its seams.
    pub cut: &'a CutMesh,
    /// Seam curves of `cut`.
    pub indexing: &'a VertexIndexing,
    /// Combed field, first direction along `u`, second against `v`.
    pub field: &'a FrameField,
    /// Singular flag of every original vertex.
    pub is_singular: &'a [bool],
}

/// Assembled mixed-integer system of a seamless parametrization.
#[derive(Debug, Clone)]
pub struct PoissonSystem {
    system: ConstrainedSystem,
    to_round: Vec<usize>,
    num_cut_vertices: usize,
    num_integer_vars: usize,
}

impl PoissonSystem {
    /// Assemble the system for per-face `stiffness` weights.
    ///
    /// The target gradient length is `options.gradient_size` divided by the
    /// bounding box diagonal of the mesh.
    ///
    /// # Errors
    ///
    /// - [`MeshError::InvalidInput`] if the inputs disagree in size or a
    ///   pinned, rounded or soft-constrained vertex is out of range or not
    ///   referenced by any face
    /// - [`MeshError::DegenerateGeometry`] for a zero-area face
    pub fn assemble(
        input: &PoissonInput<'_>,
        stiffness: &[f64],
        options: &MiqOptions,
    ) -> Result<Self> {
        let PoissonInput {
            mesh,
            cut,
            indexing,
            field,
            is_singular,
        } = *input;
        let nf = mesh.num_faces();
        let nv = mesh.num_vertices();
        field.check(mesh)?;
        if stiffness.len() != nf {
            return Err(MeshError::length_mismatch("stiffness", nf, stiffness.len()));
        }
        if is_singular.len() != nv {
            return Err(MeshError::length_mismatch("singularities", nv, is_singular.len()));
        }
        if cut.num_faces() != nf {
            return Err(MeshError::length_mismatch("cut mesh faces", nf, cut.num_faces()));
        }

        let diagonal = mesh.bounding_box_diagonal();
        if diagonal <= 0.0 {
            return Err(MeshError::DegenerateGeometry { face: 0 });
        }
        let scale = options.gradient_size / diagonal;

        let n = cut.num_vertices();
        let num_integer_vars = indexing.num_integer_vars();
        let size = 2 * (n + num_integer_vars);
        let translation = |var: usize| 2 * (n + var);

        // Per-face gradient blocks.
        let blocks = (0..nf)
            .into_par_iter()
            .map(|f| {
                let corners = cut.faces[f];
                let positions = corners.map(|v| cut.vertices[v]);
                let grads = hat_gradients(&positions)
                    .ok_or(MeshError::DegenerateGeometry { face: f })?;
                let e1 = positions[1] - positions[0];
                let e2 = positions[2] - positions[0];
                let area = 0.5 * e1.cross(&e2).norm();
                let weight = area * stiffness[f];
                let pd1: Vector3<f64> = field.pd1[f];
                let pd2: Vector3<f64> = field.pd2[f];

                let mut triplets = Vec::with_capacity(18);
                let mut rhs = [(0usize, 0.0f64); 6];
                for a in 0..3 {
                    let va = corners[a];
                    for b in 0..3 {
                        let vb = corners[b];
                        let value = weight * grads[a].dot(&grads[b]);
                        triplets.push((2 * va, 2 * vb, value));
                        triplets.push((2 * va + 1, 2 * vb + 1, value));
                    }
                    rhs[2 * a] = (2 * va, weight * scale * grads[a].dot(&pd1));
                    rhs[2 * a + 1] = (2 * va + 1, -weight * scale * grads[a].dot(&pd2));
                }
                Ok((triplets, rhs))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut triplets = Vec::with_capacity(18 * nf + 2 * num_integer_vars);
        let mut rhs = DVector::zeros(size);
        for (block, block_rhs) in blocks {
            triplets.extend(block);
            for (i, value) in block_rhs {
                rhs[i] += value;
            }
        }
        for var in 0..num_integer_vars {
            triplets.push((translation(var), translation(var), TRANSLATION_PENALTY));
            triplets.push((translation(var) + 1, translation(var) + 1, TRANSLATION_PENALTY));
        }

        let vertex_faces = VertexFaces::new(mesh.faces(), nv);
        let first_copy = |v: usize, what: &str| -> Result<usize> {
            if v >= nv {
                return Err(MeshError::InvalidInput(format!(
                    "{} vertex {} out of range for {} vertices",
                    what, v, nv
                )));
            }
            vertex_faces
                .first(v)
                .map(|(f, c)| cut.faces[f][c])
                .ok_or_else(|| {
                    MeshError::InvalidInput(format!(
                        "{} vertex {} is not referenced by any face",
                        what, v
                    ))
                })
        };

        for soft in &options.soft_constraints {
            let c = first_copy(soft.vertex, "soft-constrained")?;
            triplets.push((2 * c, 2 * c, soft.weight));
            triplets.push((2 * c + 1, 2 * c + 1, soft.weight));
            rhs[2 * c] += soft.weight * soft.u;
            rhs[2 * c + 1] += soft.weight * soft.v;
        }

        let mut constraints = Vec::with_capacity(2 * indexing.constraints.len() + 2);
        for &SeamConstraint {
            vertex,
            matched,
            mismatch,
            integer_var,
        } in &indexing.constraints
        {
            let (a, b) = quarter_turn(mismatch);
            let t = translation(integer_var);
            constraints.push(LinearConstraint::new(
                vec![(2 * vertex, a), (2 * vertex + 1, -b), (2 * matched, -1.0), (t, 1.0)],
                0.0,
            ));
            constraints.push(LinearConstraint::new(
                vec![(2 * vertex, b), (2 * vertex + 1, a), (2 * matched + 1, -1.0), (t + 1, 1.0)],
                0.0,
            ));
        }

        let mut to_round = Vec::new();
        for &(f, k) in &options.hard_features {
            if f >= nf || k > 2 {
                return Err(MeshError::InvalidInput(format!(
                    "sharp edge ({}, {}) out of range for {} faces",
                    f, k, nf
                )));
            }
            let v1 = cut.faces[f][k];
            let v2 = cut.faces[f][(k + 1) % 3];
            let e = (cut.vertices[v2] - cut.vertices[v1]).try_normalize(0.0);
            let (d1, d2) = match e {
                Some(e) => (
                    e.dot(&field.pd1[f].normalize()).abs(),
                    e.dot(&field.pd2[f].normalize()).abs(),
                ),
                None => return Err(MeshError::DegenerateGeometry { face: f }),
            };
            let offset = usize::from(d1 > d2);
            to_round.push(2 * v1 + offset);
            to_round.push(2 * v2 + offset);
            constraints.push(LinearConstraint::new(
                vec![(2 * v1 + offset, 1.0), (2 * v2 + offset, -1.0)],
                0.0,
            ));
        }

        // Pinned vertices, or a single anchor at the origin.
        if options.pinned.is_empty() {
            let anchor = is_singular.iter().position(|&s| s).unwrap_or(0);
            let c = first_copy(anchor, "anchor")?;
            constraints.push(LinearConstraint::fix(2 * c, 0.0));
            constraints.push(LinearConstraint::fix(2 * c + 1, 0.0));
        } else {
            for pin in &options.pinned {
                let c = first_copy(pin.vertex, "pinned")?;
                constraints.push(LinearConstraint::fix(2 * c, pin.u));
                constraints.push(LinearConstraint::fix(2 * c + 1, pin.v));
            }
        }

        // Cut vertices that no face references have no energy at all.
        let mut referenced = vec![false; n];
        for face in &cut.faces {
            for &v in face {
                referenced[v] = true;
            }
        }
        for (v, _) in referenced.iter().enumerate().filter(|&(_, &r)| !r) {
            constraints.push(LinearConstraint::fix(2 * v, 0.0));
            constraints.push(LinearConstraint::fix(2 * v + 1, 0.0));
        }

        if options.integer_rounding {
            for var in 0..num_integer_vars {
                to_round.push(translation(var));
                to_round.push(translation(var) + 1);
            }
            for &v in &options.round_vertices {
                let c = first_copy(v, "rounded")?;
                to_round.push(2 * c);
                to_round.push(2 * c + 1);
            }
        }
        if options.singularity_rounding {
            for (v, _) in is_singular.iter().enumerate().filter(|&(_, &s)| s) {
                if let Some((f, c)) = vertex_faces.first(v) {
                    let copy = cut.faces[f][c];
                    to_round.push(2 * copy);
                    to_round.push(2 * copy + 1);
                }
            }
        }
        to_round.sort_unstable();
        to_round.dedup();

        debug!(
            "poisson system: {} unknowns, {} constraint rows, {} to round, gradient scale {:.4}",
            size,
            constraints.len(),
            to_round.len(),
            scale
        );

        let matrix = CsrMatrix::from_triplets(size, size, triplets);
        Ok(Self {
            system: ConstrainedSystem::new(matrix, rhs, constraints)?,
            to_round,
            num_cut_vertices: n,
            num_integer_vars,
        })
    }

    /// The assembled system.
    pub fn system(&self) -> &ConstrainedSystem {
        &self.system
    }

    /// Unknowns that must end up integer, sorted.
    pub fn to_round(&self) -> &[usize] {
        &self.to_round
    }

    /// Number of cut vertices, each owning a `(u, v)` pair.
    #[inline]
    pub fn num_cut_vertices(&self) -> usize {
        self.num_cut_vertices
    }

    /// Number of seam translation pairs.
    #[inline]
    pub fn num_integer_vars(&self) -> usize {
        self.num_integer_vars
    }

    /// Solve and return the coordinates of every cut vertex.
    pub fn solve<S: MixedIntegerSolver>(&self, solver: &S) -> Result<Vec<Point2<f64>>> {
        let x = solver.solve(&self.system, &self.to_round)?;
        Ok((0..self.num_cut_vertices)
            .map(|i| Point2::new(x[2 * i], x[2 * i + 1]))
            .collect())
    }
}
