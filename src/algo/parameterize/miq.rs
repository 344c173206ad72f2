//! Mixed-integer quadrangulation.
//!
//! Computes a global parametrization whose gradients follow a combed cross
//! (or frame) field and whose coordinates match across every seam up to a
//! rotation by the field mismatch and an integer translation. Integer grid
//! lines of the result can be traced into a quad mesh.
//!
//! # References
//!
//! - Bommes, D., Zimmer, H., & Kobbelt, L. (2009). "Mixed-integer
//!   quadrangulation." ACM SIGGRAPH.

use log::{debug, info};
use nalgebra::Point2;
use rayon::prelude::*;

use crate::algo::cut::{cut_mesh, cut_mesh_from_singularities, CutMesh, SeamFlags};
use crate::algo::field::{
    comb_cross_field, comb_frame_field, cross_field_mismatch, find_singularities,
    frame_field_bisectors, FieldSymmetry, FrameField, Singularities,
};
use crate::algo::solver::{GreedyRounding, RoundingOptions, SolverOptions};
use crate::error::{MeshError, Result};
use crate::mesh::geometry::hat_gradients;
use crate::mesh::{TriMesh, TriangleAdjacency};

use super::indexing::VertexIndexing;
use super::poisson::{PoissonInput, PoissonSystem};
use super::uv::SeamlessUv;

/// Weight of the distortion Laplacian in the stiffness update.
const STIFFENING_RATE: f64 = 1.0;

/// Distortion reported for faces with no area.
const DEGENERATE_DISTORTION: f64 = 10.0;

/// A vertex pinned to a specific parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinnedVertex {
    /// The original vertex index to pin.
    pub vertex: usize,
    /// The fixed U coordinate.
    pub u: f64,
    /// The fixed V coordinate.
    pub v: f64,
}

impl PinnedVertex {
    /// Create a new pinned vertex.
    pub fn new(vertex: usize, u: f64, v: f64) -> Self {
        Self { vertex, u, v }
    }
}

/// A vertex softly pulled toward a parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftConstraint {
    /// The original vertex index.
    pub vertex: usize,
    /// Target U coordinate.
    pub u: f64,
    /// Target V coordinate.
    pub v: f64,
    /// Penalty weight in `[0, 1]`.
    pub weight: f64,
}

/// Options for [`miq`].
#[derive(Debug, Clone)]
pub struct MiqOptions {
    /// Target gradient length relative to the bounding box diagonal; roughly
    /// the number of quads along the diagonal.
    pub gradient_size: f64,
    /// Upper bound on the stiffness added to a face in one iteration.
    pub stiffness: f64,
    /// Round all integer unknowns at once instead of greedily.
    pub direct_rounding: bool,
    /// Number of stiffening iterations; zero solves once.
    pub iterations: usize,
    /// Gauss-Seidel sweeps after each greedy rounding step.
    pub local_iterations: usize,
    /// Round the seam translations (and `round_vertices`).
    pub integer_rounding: bool,
    /// Round the coordinates of singular vertices.
    pub singularity_rounding: bool,
    /// Extra vertices whose coordinates are rounded.
    pub round_vertices: Vec<usize>,
    /// Sharp edges as `(face, local edge)` pairs.
    pub hard_features: Vec<(usize, usize)>,
    /// Hard positional constraints. When empty, one vertex is pinned at the
    /// origin.
    pub pinned: Vec<PinnedVertex>,
    /// Soft positional constraints.
    pub soft_constraints: Vec<SoftConstraint>,
    /// Inner linear solver options.
    pub solver: SolverOptions,
}

impl Default for MiqOptions {
    fn default() -> Self {
        Self {
            gradient_size: 30.0,
            stiffness: 5.0,
            direct_rounding: false,
            iterations: 5,
            local_iterations: 5,
            integer_rounding: true,
            singularity_rounding: true,
            round_vertices: Vec::new(),
            hard_features: Vec::new(),
            pinned: Vec::new(),
            soft_constraints: Vec::new(),
            solver: SolverOptions::default(),
        }
    }
}

impl MiqOptions {
    /// Set the target gradient size.
    pub fn with_gradient_size(mut self, gradient_size: f64) -> Self {
        self.gradient_size = gradient_size;
        self
    }

    /// Set the number of stiffening iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Round everything at once.
    pub fn with_direct_rounding(mut self, direct: bool) -> Self {
        self.direct_rounding = direct;
        self
    }

    /// Pin vertices to fixed coordinates.
    pub fn with_pinned(mut self, pinned: Vec<PinnedVertex>) -> Self {
        self.pinned = pinned;
        self
    }

    /// Add sharp feature edges.
    pub fn with_hard_features(mut self, edges: Vec<(usize, usize)>) -> Self {
        self.hard_features = edges;
        self
    }

    /// Add soft constraints.
    pub fn with_soft_constraints(mut self, constraints: Vec<SoftConstraint>) -> Self {
        self.soft_constraints = constraints;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.gradient_size > 0.0 && self.gradient_size.is_finite()) {
            return Err(MeshError::invalid_param(
                "gradient_size",
                self.gradient_size,
                "must be positive",
            ));
        }
        if !(self.stiffness >= 0.0 && self.stiffness.is_finite()) {
            return Err(MeshError::invalid_param(
                "stiffness",
                self.stiffness,
                "must be non-negative",
            ));
        }
        if let Some(bad) = self
            .soft_constraints
            .iter()
            .find(|c| !(0.0..=1.0).contains(&c.weight))
        {
            return Err(MeshError::invalid_param(
                "soft constraint weight",
                bad.weight,
                "must lie in [0, 1]",
            ));
        }
        Ok(())
    }

    fn rounding(&self) -> RoundingOptions {
        RoundingOptions {
            direct_rounding: self.direct_rounding,
            local_iterations: self.local_iterations,
            solver: self.solver.clone(),
            ..RoundingOptions::default()
        }
    }
}

/// Output of [`miq`].
#[derive(Debug, Clone)]
pub struct MiqResult {
    /// Coordinates of every cut vertex, indexed by the cut faces.
    pub uv: SeamlessUv,
    /// The cut mesh the coordinates live on.
    pub cut: CutMesh,
    /// Number of seam curves (integer translation pairs).
    pub num_curves: usize,
    /// Faces with non-positive area in the parameter domain.
    pub flipped_faces: usize,
    /// Solves performed.
    pub iterations: usize,
}

/// Distortion `|σ1/h - 1| + |σ2/h - 1|` of face `f`, with the singular
/// values negated on flipped faces.
fn distortion(cut: &CutMesh, uv: &SeamlessUv, f: usize, h: f64) -> f64 {
    let positions = cut.faces[f].map(|v| cut.vertices[v]);
    let Some(grads) = hat_gradients(&positions) else {
        return DEGENERATE_DISTORTION;
    };
    let corners = uv.face_uvs(f);
    let du = grads[0] * corners[0].x + grads[1] * corners[1].x + grads[2] * corners[2].x;
    let dv = grads[0] * corners[0].y + grads[1] * corners[1].y + grads[2] * corners[2].y;

    // Eigenvalues of the first fundamental form.
    let i00 = du.dot(&du);
    let i01 = du.dot(&dv);
    let i11 = dv.dot(&dv);
    let trace = i00 + i11;
    let root = ((i00 - i11).powi(2) + 4.0 * i01 * i01).max(0.0).sqrt();
    let mut low = 0.5 * (trace - root);
    if low.abs() < 1e-8 {
        low = 0.0;
    }
    let sigma1 = (0.5 * (trace + root)).sqrt();
    let sigma2 = low.max(0.0).sqrt();

    let tau = if uv.is_flipped(f) { -1.0 } else { 1.0 };
    let factor = tau / h;
    (factor * sigma1 - 1.0).abs() + (factor * sigma2 - 1.0).abs()
}

/// Raise the stiffness of faces where the distortion varies sharply.
fn stiffen(
    adjacency: &TriangleAdjacency,
    cut: &CutMesh,
    uv: &SeamlessUv,
    h: f64,
    cap: f64,
    stiffness: &mut [f64],
) {
    let dist: Vec<f64> = (0..cut.num_faces())
        .into_par_iter()
        .map(|f| distortion(cut, uv, f, h))
        .collect();

    let mut max_laplacian = 0.0f64;
    for (f, s) in stiffness.iter_mut().enumerate() {
        let laplacian: f64 = (0..3)
            .filter_map(|k| adjacency.neighbor(f, k))
            .map(|g| dist[f] - dist[g])
            .sum();
        max_laplacian = max_laplacian.max(laplacian.abs());
        *s += (STIFFENING_RATE * laplacian.abs()).min(cap);
    }
    debug!(
        "stiffening: max distortion {:.4}, max laplacian {:.4}",
        dist.iter().copied().fold(0.0, f64::max),
        max_laplacian
    );
}

/// Compute a seamless parametrization from an already combed field.
///
/// `field` must be combed consistently with `mismatch`, with `pd2` the
/// clockwise neighbor of `pd1` (as produced by [`comb_frame_field`]).
/// `seams` is usually the output of [`cut_mesh_from_singularities`].
///
/// Each iteration assembles and solves the Poisson system; if any face
/// comes out flipped, the stiffness of faces with rapidly changing
/// distortion is raised and the system solved again.
///
/// # Arguments
///
/// * `mesh` - A connected triangle mesh
/// * `field` - Combed frame field, one pair of directions per face
/// * `mismatch` - Per-edge quarter-turn mismatch of the combed field
/// * `singularities` - Singular vertices of the field
/// * `seams` - Edges along which the mesh is cut
/// * `options` - Solver options
///
/// # Errors
///
/// - [`MeshError::DisconnectedMesh`] if the mesh has several components
/// - [`MeshError::InvalidInput`] if any per-face or per-vertex input has the wrong size
/// - [`MeshError::InvalidParameter`] for invalid options
/// - Errors of the linear solver are propagated
pub fn miq(
    mesh: &TriMesh,
    field: &FrameField,
    mismatch: &[[usize; 3]],
    singularities: &Singularities,
    seams: &SeamFlags,
    options: &MiqOptions,
) -> Result<MiqResult> {
    options.validate()?;
    field.check(mesh)?;
    let nv = mesh.num_vertices();
    if singularities.is_singular.len() != nv {
        return Err(MeshError::length_mismatch(
            "singularities",
            nv,
            singularities.is_singular.len(),
        ));
    }

    let adjacency = TriangleAdjacency::new(mesh)?;
    let (_, components) = adjacency.components();
    if components > 1 {
        return Err(MeshError::DisconnectedMesh { components });
    }

    let cut = cut_mesh(mesh, &adjacency, seams)?;
    let indexing = VertexIndexing::new(
        mesh,
        &adjacency,
        &cut,
        seams,
        mismatch,
        &singularities.is_singular,
    )?;
    let input = PoissonInput {
        mesh,
        cut: &cut,
        indexing: &indexing,
        field,
        is_singular: &singularities.is_singular,
    };

    let solver = GreedyRounding::new(options.rounding());
    let h = options.gradient_size / mesh.bounding_box_diagonal();
    let rounds = options.iterations.max(1);
    let mut stiffness = vec![1.0; mesh.num_faces()];

    let mut uv = SeamlessUv::new(Vec::new(), cut.faces.clone());
    let mut flipped = 0;
    let mut iterations = 0;
    for round in 0..rounds {
        let system = PoissonSystem::assemble(&input, &stiffness, options)?;
        let coords: Vec<Point2<f64>> = system.solve(&solver)?;
        uv = SeamlessUv::new(coords, cut.faces.clone());
        flipped = uv.num_flipped();
        iterations += 1;
        debug!("miq iteration {}: {} flipped faces", round, flipped);

        if flipped == 0 || round + 1 == rounds {
            break;
        }
        stiffen(&adjacency, &cut, &uv, h, options.stiffness, &mut stiffness);
    }

    info!(
        "miq: {} cut vertices, {} seam curves, {} flipped faces after {} solves",
        cut.num_vertices(),
        indexing.num_integer_vars(),
        flipped,
        iterations
    );

    Ok(MiqResult {
        uv,
        cut,
        num_curves: indexing.num_integer_vars(),
        flipped_faces: flipped,
        iterations,
    })
}

/// Compute a seamless parametrization from a raw frame field.
///
/// Runs the whole pipeline: the bisectors of the field are combed as a
/// cross field, their mismatch and singularities define the seams, the
/// frame field is combed after its bisectors, and [`miq`] solves.
///
/// # Errors
///
/// Same as [`miq`], plus [`MeshError::DegenerateGeometry`] for a zero field
/// vector or a zero-area face.
pub fn miq_from_frame_field(
    mesh: &TriMesh,
    field: &FrameField,
    options: &MiqOptions,
) -> Result<MiqResult> {
    field.check(mesh)?;
    let adjacency = TriangleAdjacency::new(mesh)?;

    let bisectors = frame_field_bisectors(mesh, field)?;
    let combed_bisectors = comb_cross_field(mesh, &adjacency, &bisectors.pd1)?;
    let mismatch = cross_field_mismatch(mesh, &adjacency, &combed_bisectors, true)?;
    let singularities = find_singularities(
        mesh,
        &adjacency,
        &combed_bisectors,
        &mismatch,
        FieldSymmetry::Cross,
    )?;
    let seams = cut_mesh_from_singularities(mesh, &adjacency, &mismatch)?;
    let combed = comb_frame_field(mesh, field, &combed_bisectors)?;

    info!(
        "frame field: {} singular vertices, {} seam edges",
        singularities.count(),
        seams.num_interior_seams(&adjacency)
    );

    miq(mesh, &combed, &mismatch, &singularities, &seams, options)
}
