//! Seamless global parametrization.
//!
//! This module turns a combed cross (or frame) field into UV coordinates on
//! the mesh cut open along its seams. Across every seam the coordinates of
//! the two sides agree up to a quarter-turn rotation and an integer
//! translation, so integer iso-lines run continuously over the whole
//! surface.
//!
//! # Stages
//!
//! - [`VertexIndexing`]: chain seam edges into curves and pair up the cut
//!   vertices on both sides
//! - [`PoissonSystem`]: assemble the gradient-fitting energy and the
//!   transition constraints
//! - [`miq`]: solve with greedy integer rounding and stiffening
//!
//! # Example
//!
//! ```no_run
//! use quadfield::prelude::*;
//! use quadfield::algo::parameterize::{miq_from_frame_field, MiqOptions};
//!
//! let mesh: TriMesh = quadfield::io::load("input.obj").unwrap();
//! # let field: quadfield::algo::field::FrameField = unimplemented!();
//! let result = miq_from_frame_field(&mesh, &field, &MiqOptions::default()).unwrap();
//! println!("{} flipped faces", result.flipped_faces);
//! ```

mod indexing;
mod miq;
mod poisson;
mod uv;

pub use indexing::{SeamConstraint, VertexIndexing};
pub use miq::{miq, miq_from_frame_field, MiqOptions, MiqResult, PinnedVertex, SoftConstraint};
pub use poisson::{PoissonInput, PoissonSystem};
pub use uv::SeamlessUv;
