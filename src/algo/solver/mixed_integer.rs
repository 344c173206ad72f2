//! Greedy mixed-integer rounding.
//!
//! Minimizes a convex quadratic subject to linear equalities while forcing a
//! subset of variables to integer values. Rounding is greedy: solve the
//! relaxed problem, fix the variables that are closest to an integer, and
//! re-solve with those held fixed until none are left.

use log::{debug, warn};
use nalgebra::DVector;

use crate::error::{MeshError, Result};

use super::constrained::{ConstrainedSystem, Elimination};
use super::sparse::{conjugate_gradient, gauss_seidel, relative_residual, CsrMatrix, SolverOptions};

/// Solver for `min ½xᵀAx - bᵀx` under linear equalities with integer
/// variables.
pub trait MixedIntegerSolver {
    /// Solve `system`, returning a full solution in which every variable of
    /// `to_round` holds an integer value, unless a constraint forces a
    /// fractional one.
    fn solve(&self, system: &ConstrainedSystem, to_round: &[usize]) -> Result<DVector<f64>>;
}

/// Options for [`GreedyRounding`].
#[derive(Debug, Clone)]
pub struct RoundingOptions {
    /// Round every integer variable at once after a single relaxed solve.
    pub direct_rounding: bool,
    /// Variables whose distance to the nearest integer is within this value
    /// are rounded together with the best candidate.
    pub multiple_rounding_threshold: f64,
    /// Gauss-Seidel sweeps tried before falling back to a full solve after
    /// each rounding step.
    pub local_iterations: usize,
    /// Inner linear solver options.
    pub solver: SolverOptions,
}

impl Default for RoundingOptions {
    fn default() -> Self {
        Self {
            direct_rounding: false,
            multiple_rounding_threshold: 0.05,
            local_iterations: 20,
            solver: SolverOptions::default(),
        }
    }
}

/// Greedy rounding on top of constraint elimination and conjugate gradients.
#[derive(Debug, Clone, Default)]
pub struct GreedyRounding {
    options: RoundingOptions,
}

impl GreedyRounding {
    /// Create a solver with the given options.
    pub fn new(options: RoundingOptions) -> Self {
        Self { options }
    }

    /// Rounding options.
    pub fn options(&self) -> &RoundingOptions {
        &self.options
    }

    /// Solve `k y = g` with the entries in `fixed` held at their values.
    fn solve_with_fixed(
        &self,
        k: &CsrMatrix,
        g: &DVector<f64>,
        fixed: &[Option<f64>],
        warm_start: Option<&DVector<f64>>,
    ) -> Result<DVector<f64>> {
        let m = g.len();
        let mut compact = vec![usize::MAX; m];
        let mut free = Vec::new();
        for (i, value) in fixed.iter().enumerate() {
            if value.is_none() {
                compact[i] = free.len();
                free.push(i);
            }
        }

        let mut full = DVector::from_iterator(m, fixed.iter().map(|v| v.unwrap_or(0.0)));
        if free.is_empty() {
            return Ok(full);
        }

        let mut rhs = DVector::from_iterator(free.len(), free.iter().map(|&i| g[i]));
        let mut triplets = Vec::new();
        for (i, j, v) in k.triplets() {
            let ci = compact[i];
            if ci == usize::MAX {
                continue;
            }
            match fixed[j] {
                Some(value) => rhs[ci] -= v * value,
                None => triplets.push((ci, compact[j], v)),
            }
        }
        let sub = CsrMatrix::from_triplets(free.len(), free.len(), triplets);

        let x = match warm_start {
            Some(warm) => {
                let mut x = DVector::from_iterator(free.len(), free.iter().map(|&i| warm[i]));
                if self.options.local_iterations > 0 {
                    gauss_seidel(&sub, &rhs, &mut x, self.options.local_iterations)?;
                }
                if relative_residual(&sub, &rhs, &x) > self.options.solver.tolerance {
                    x = conjugate_gradient(&sub, &rhs, Some(&x), &self.options.solver)?;
                }
                x
            }
            None => conjugate_gradient(&sub, &rhs, None, &self.options.solver)?,
        };

        for (c, &i) in free.iter().enumerate() {
            full[i] = x[c];
        }
        Ok(full)
    }
}

impl MixedIntegerSolver for GreedyRounding {
    fn solve(&self, system: &ConstrainedSystem, to_round: &[usize]) -> Result<DVector<f64>> {
        let n = system.num_variables();
        if let Some(&bad) = to_round.iter().find(|&&i| i >= n) {
            return Err(MeshError::InvalidInput(format!(
                "rounding variable {} out of range for {} unknowns",
                bad, n
            )));
        }

        let mut protected = vec![false; n];
        for &i in to_round {
            protected[i] = true;
        }

        let elimination = Elimination::new(n, &system.constraints, &protected)?;
        let (k, g) = elimination.reduce(&system.matrix, &system.rhs);

        let mut round_ids = Vec::with_capacity(to_round.len());
        let mut skipped = 0;
        for &i in to_round {
            match elimination.reduced_index(i) {
                Some(y) => round_ids.push(y),
                None if !elimination.is_integral(i, &protected) => skipped += 1,
                None => (),
            }
        }
        round_ids.sort_unstable();
        round_ids.dedup();
        if skipped > 0 {
            warn!(
                "{} rounding variables are determined by constraints and were not rounded",
                skipped
            );
        }

        debug!(
            "mixed-integer solve: {} unknowns, {} free, {} to round",
            n,
            elimination.num_free(),
            round_ids.len()
        );

        let mut fixed: Vec<Option<f64>> = vec![None; elimination.num_free()];
        let mut y = self.solve_with_fixed(&k, &g, &fixed, None)?;

        if self.options.direct_rounding {
            for &id in &round_ids {
                fixed[id] = Some(y[id].round());
            }
            y = self.solve_with_fixed(&k, &g, &fixed, Some(&y))?;
        } else {
            let mut remaining = round_ids;
            let mut steps = 0;
            while !remaining.is_empty() {
                let distance = |id: usize| (y[id] - y[id].round()).abs();
                let best = remaining
                    .iter()
                    .map(|&id| distance(id))
                    .fold(f64::INFINITY, f64::min);
                let limit = best.max(self.options.multiple_rounding_threshold);

                for &id in &remaining {
                    if distance(id) <= limit {
                        fixed[id] = Some(y[id].round());
                    }
                }
                remaining.retain(|&id| fixed[id].is_none());

                y = self.solve_with_fixed(&k, &g, &fixed, Some(&y))?;
                steps += 1;
            }
            debug!("greedy rounding finished after {} steps", steps);
        }

        Ok(elimination.expand(&y))
    }
}
