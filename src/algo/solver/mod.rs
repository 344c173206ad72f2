//! Sparse linear algebra for the field and parameterization solvers.
//!
//! - [`sparse`]: CSR matrices, Jacobi-preconditioned conjugate gradients and
//!   Gauss-Seidel relaxation
//! - [`constrained`]: linear equality constraints and their elimination
//! - [`mixed_integer`]: greedy rounding of integer variables

pub mod constrained;
pub mod mixed_integer;
pub mod sparse;

pub use constrained::{ConstrainedSystem, Elimination, LinearConstraint};
pub use mixed_integer::{GreedyRounding, MixedIntegerSolver, RoundingOptions};
pub use sparse::{conjugate_gradient, CsrMatrix, SolverOptions};
