//! Rotationally symmetric direction fields on triangle meshes.
//!
//! The stages run in order:
//!
//! 1. [`comb`]: pick consistent representatives face by face
//! 2. [`field_mismatch`]: classify the integer jump across every edge
//! 3. [`find_singularities`]: turn the jumps into per-vertex indices
//!
//! General (non-orthogonal) frame fields go through their bisectors
//! ([`frame_field_bisectors`]) for the first three stages and are oriented
//! afterwards with [`comb_frame_field`].

mod comb;
mod mismatch;
mod singularity;

pub use comb::{
    comb, comb_cross_field, comb_frame_field, comb_line_field, frame_field_bisectors,
    FieldSymmetry, FrameField,
};
pub use mismatch::{cross_field_mismatch, field_mismatch, line_field_mismatch};
pub use singularity::{find_singularities, Singularities};
