//! Error types for quadfield.
//!
//! Every stage of the pipeline validates its inputs up front and reports
//! failures through [`MeshError`]; nothing is retried internally.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur while building fields, cutting meshes and solving
/// parametrizations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// An edge has more than two incident faces, or two faces traverse it in
    /// the same direction.
    #[error("edge ({v0}, {v1}) is not manifold")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// Input arrays do not match the mesh they are supposed to describe.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation needs a connected mesh.
    #[error("mesh has {components} connected components, expected 1")]
    DisconnectedMesh {
        /// Number of connected components found.
        components: usize,
    },

    /// A face has zero area, or a tangent vector on it has zero length.
    #[error("degenerate geometry at face {face}")]
    DegenerateGeometry {
        /// The face index.
        face: usize,
    },

    /// A linear system has a zero (or negative) pivot.
    #[error("singular matrix (zero pivot at row {row})")]
    SingularMatrix {
        /// Row of the offending pivot.
        row: usize,
    },

    /// A linear equality constraint contradicts the ones before it.
    #[error("linear constraint {constraint} is inconsistent with earlier constraints")]
    InconsistentConstraints {
        /// Index of the offending constraint.
        constraint: usize,
    },

    /// A field solve was requested without any constraint to anchor it.
    #[error("at least one constrained face is required")]
    MissingConstraints,

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Algorithm failed to converge.
    #[error("algorithm failed to converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an error for a per-face (or per-vertex) array whose length does
    /// not match the mesh.
    pub(crate) fn length_mismatch(what: &str, expected: usize, actual: usize) -> Self {
        MeshError::InvalidInput(format!(
            "{} has {} entries, expected {}",
            what, actual, expected
        ))
    }
}
