//! Field and parametrization algorithms.
//!
//! The quad-meshing pipeline runs through these modules in order:
//!
//! - **N-RoSy**: interpolate a smooth N-fold direction field from a few
//!   constrained faces ([`nrosy`])
//! - **Fields**: comb a cross field, measure per-edge mismatch and locate
//!   singular vertices ([`field`])
//! - **Cutting**: extract seams through the singularities and cut the mesh
//!   open ([`cut`])
//! - **Parametrization**: solve the mixed-integer Poisson problem for
//!   seamless UVs ([`parameterize`])
//!
//! [`solver`] holds the sparse linear algebra shared by the field and
//! parametrization solvers.

pub mod cut;
pub mod field;
pub mod nrosy;
pub mod parameterize;
pub mod solver;
