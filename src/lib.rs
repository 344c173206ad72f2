//! # Quadfield
//!
//! Cross fields and seamless parametrizations for triangle meshes.
//!
//! Quadfield implements the field-aligned parametrization pipeline used for
//! quad meshing: interpolate or import a cross field, comb it, locate its
//! singularities, cut the mesh open along seams through them, and solve a
//! mixed-integer Poisson problem for UV coordinates whose integer grid is
//! continuous across every seam.
//!
//! ## Features
//!
//! - **Plain indexed meshes**: [`TriMesh`](mesh::TriMesh) with separate
//!   adjacency tables
//! - **N-RoSy interpolation** from hard and soft face constraints
//! - **Field combing, mismatch and singularity detection** for line, cross
//!   and frame fields
//! - **Seam extraction and cutting**
//! - **Mixed-integer quadrangulation** with greedy rounding and stiffening
//! - **File formats**: OBJ (with seamless UVs) and STL
//!
//! ## Quick Start
//!
//! ```no_run
//! use quadfield::prelude::*;
//!
//! let mesh: TriMesh = quadfield::io::load("model.obj").unwrap();
//!
//! // Interpolate a smooth cross field from one constrained face
//! let hard = [(0, Vector3::new(1.0, 0.0, 0.0))];
//! let field = nrosy(&mesh, &hard, &[], &NRosyOptions::default()).unwrap();
//!
//! // Seamless parametrization
//! let result = miq_from_frame_field(&mesh, &field.frame_field(), &MiqOptions::default()).unwrap();
//! quadfield::io::obj::save_with_uvs(&mesh, &result.cut, &result.uv, "out.obj").unwrap();
//! ```
//!
//! ## Step by Step
//!
//! The individual stages are public as well:
//!
//! ```
//! use quadfield::prelude::*;
//! use quadfield::algo::cut::{cut_mesh, cut_mesh_from_singularities};
//! use quadfield::algo::field::{comb_cross_field, cross_field_mismatch, find_singularities, FieldSymmetry};
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mesh = TriMesh::new(vertices, vec![[0, 1, 2], [0, 2, 3]]).unwrap();
//! let adjacency = TriangleAdjacency::new(&mesh).unwrap();
//!
//! let field = vec![Vector3::x(); 2];
//! let combed = comb_cross_field(&mesh, &adjacency, &field).unwrap();
//! let mismatch = cross_field_mismatch(&mesh, &adjacency, &combed, true).unwrap();
//! let singular = find_singularities(&mesh, &adjacency, &combed, &mismatch, FieldSymmetry::Cross).unwrap();
//! assert_eq!(singular.count(), 0);
//!
//! let seams = cut_mesh_from_singularities(&mesh, &adjacency, &mismatch).unwrap();
//! let cut = cut_mesh(&mesh, &adjacency, &seams).unwrap();
//! assert_eq!(cut.num_faces(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;

pub use error::{MeshError, Result};

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use quadfield::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::field::{FieldSymmetry, FrameField};
    pub use crate::algo::nrosy::{nrosy, NRosyOptions, NRosyResult};
    pub use crate::algo::parameterize::{miq, miq_from_frame_field, MiqOptions, MiqResult, SeamlessUv};
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{TriMesh, TriangleAdjacency};
    pub use nalgebra::{Point2, Point3, Vector3};
}

// Re-export nalgebra types for convenience
pub use nalgebra;
