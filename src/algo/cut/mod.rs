//! Seam extraction and mesh cutting.
//!
//! [`cut_mesh_from_singularities`] turns the per-edge mismatch of a combed
//! field into a seam graph, and [`cut_mesh`] duplicates vertices along it so
//! that seams become boundary.

mod cutter;
mod seams;

pub use cutter::{cut_mesh, CutMesh};
pub use seams::{cut_mesh_from_singularities, SeamFlags};
