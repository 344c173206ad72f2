//! Linear equality constraints and their elimination.
//!
//! A [`ConstrainedSystem`] is the normal-equation form `A x = b` of a convex
//! quadratic energy together with equality rows `Σ c_j x_j = d`. The rows are
//! removed by sparse Gaussian elimination: each row picks one pivot variable,
//! which is rewritten as an affine function of the variables that remain
//! free. Substituting that map into the energy gives a smaller SPD system
//! over the free variables only.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use nalgebra::DVector;

use crate::error::{MeshError, Result};

use super::sparse::CsrMatrix;

/// Coefficients below this magnitude are dropped during elimination.
const DROP_TOLERANCE: f64 = 1e-12;

/// Linear equality `Σ coefficients[i].1 * x[coefficients[i].0] = rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    /// `(variable, coefficient)` pairs; repeated variables are summed.
    pub coefficients: Vec<(usize, f64)>,
    /// Right-hand side.
    pub rhs: f64,
}

impl LinearConstraint {
    /// Create a constraint.
    pub fn new(coefficients: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self { coefficients, rhs }
    }

    /// Constraint pinning variable `var` to `value`.
    pub fn fix(var: usize, value: f64) -> Self {
        Self::new(vec![(var, 1.0)], value)
    }
}

/// Normal equations `A x = b` plus linear equality constraints.
#[derive(Debug, Clone)]
pub struct ConstrainedSystem {
    /// Symmetric positive semi-definite system matrix.
    pub matrix: CsrMatrix,
    /// Right-hand side.
    pub rhs: DVector<f64>,
    /// Equality constraints.
    pub constraints: Vec<LinearConstraint>,
}

impl ConstrainedSystem {
    /// Bundle a system, checking that all dimensions agree.
    pub fn new(
        matrix: CsrMatrix,
        rhs: DVector<f64>,
        constraints: Vec<LinearConstraint>,
    ) -> Result<Self> {
        let n = rhs.len();
        if matrix.nrows() != n || matrix.ncols() != n {
            return Err(MeshError::InvalidInput(format!(
                "system matrix is {}x{} but the right-hand side has {} entries",
                matrix.nrows(),
                matrix.ncols(),
                n
            )));
        }
        for (ci, c) in constraints.iter().enumerate() {
            if let Some(&(var, _)) = c.coefficients.iter().find(|(var, _)| *var >= n) {
                return Err(MeshError::InvalidInput(format!(
                    "constraint {} references variable {} of {}",
                    ci, var, n
                )));
            }
        }
        Ok(Self {
            matrix,
            rhs,
            constraints,
        })
    }

    /// Number of unknowns.
    #[inline]
    pub fn num_variables(&self) -> usize {
        self.rhs.len()
    }
}

#[derive(Debug, Clone, Default)]
struct AffineExpr {
    terms: BTreeMap<usize, f64>,
    constant: f64,
}

impl AffineExpr {
    fn add_scaled(&mut self, other: &AffineExpr, scale: f64) {
        for (&j, &c) in &other.terms {
            *self.terms.entry(j).or_insert(0.0) += scale * c;
        }
        self.constant += scale * other.constant;
    }

    fn prune(&mut self) {
        self.terms.retain(|_, c| c.abs() > DROP_TOLERANCE);
    }
}

/// Pivot candidate while eliminating one constraint row.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    var: usize,
    magnitude: f64,
    free_choice: bool,
    integral: bool,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        let rank = (self.free_choice, self.integral);
        let other_rank = (other.free_choice, other.integral);
        if rank != other_rank {
            rank > other_rank
        } else {
            self.magnitude > other.magnitude
        }
    }
}

fn is_integer(x: f64) -> bool {
    (x - x.round()).abs() < 1e-9
}

/// Whether solving `row` for `pivot` gives integer coefficients and constant.
fn keeps_integrality(row: &AffineExpr, pivot: usize, coefficient: f64) -> bool {
    is_integer(row.constant / coefficient)
        && row
            .terms
            .iter()
            .all(|(&j, &c)| j == pivot || is_integer(c / coefficient))
}

/// Affine map `x = T y + d` from free variables `y` to all variables `x`.
#[derive(Debug, Clone)]
pub struct Elimination {
    eliminated: Vec<Option<AffineExpr>>,
    /// Eliminated variables that are integral combinations of protected free
    /// variables plus an integer constant.
    integral: Vec<bool>,
    reduced: Vec<Option<usize>>,
    num_free: usize,
}

impl Elimination {
    /// Eliminate `constraints` over `num_variables` unknowns.
    ///
    /// Pivots avoid variables flagged in `protected` whenever the row has any
    /// other choice. Among the remaining candidates a pivot that divides every
    /// other coefficient and the constant comes first, so a row over
    /// protected variables only leaves its pivot integral once the others
    /// are rounded. Ties go to the largest coefficient. Redundant rows are
    /// skipped; contradictory ones fail with
    /// [`MeshError::InconsistentConstraints`].
    pub fn new(
        num_variables: usize,
        constraints: &[LinearConstraint],
        protected: &[bool],
    ) -> Result<Self> {
        let mut eliminated: Vec<Option<AffineExpr>> = vec![None; num_variables];
        // Free variable -> eliminated variables whose expression mentions it.
        let mut users: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut integral = vec![false; num_variables];
        let mut redundant = 0;

        for (ci, constraint) in constraints.iter().enumerate() {
            let mut row = AffineExpr {
                terms: BTreeMap::new(),
                constant: -constraint.rhs,
            };
            for &(j, c) in &constraint.coefficients {
                match &eliminated[j] {
                    Some(expr) => row.add_scaled(expr, c),
                    None => *row.terms.entry(j).or_insert(0.0) += c,
                }
            }
            row.prune();

            let is_protected = |j: usize| protected.get(j).copied().unwrap_or(false);
            let all_protected = row.terms.keys().all(|&j| is_protected(j));
            let pivot = row
                .terms
                .iter()
                .map(|(&j, &c)| Candidate {
                    var: j,
                    magnitude: c.abs(),
                    free_choice: !is_protected(j),
                    integral: keeps_integrality(&row, j, c),
                })
                .fold(None::<Candidate>, |best, candidate| match best {
                    Some(b) if !candidate.beats(&b) => Some(b),
                    _ => Some(candidate),
                });

            let Some(Candidate {
                var: p,
                free_choice,
                integral: pivot_integral,
                ..
            }) = pivot
            else {
                if row.constant.abs() > 1e-9 * constraint.rhs.abs().max(1.0) {
                    return Err(MeshError::InconsistentConstraints { constraint: ci });
                }
                redundant += 1;
                continue;
            };
            if !free_choice {
                debug!("constraint {} eliminates rounded variable {}", ci, p);
            }
            let expr_integral = all_protected && pivot_integral;

            let cp = row.terms.remove(&p).unwrap_or(1.0);
            let expr = AffineExpr {
                terms: row.terms.iter().map(|(&j, &c)| (j, -c / cp)).collect(),
                constant: -row.constant / cp,
            };

            // Keep every stored expression in terms of free variables only.
            if let Some(list) = users.remove(&p) {
                for e in list {
                    if let Some(target) = eliminated[e].as_mut() {
                        if let Some(coef) = target.terms.remove(&p) {
                            target.add_scaled(&expr, coef);
                            integral[e] = integral[e] && expr_integral;
                            target.prune();
                            for &j in expr.terms.keys() {
                                users.entry(j).or_default().push(e);
                            }
                        }
                    }
                }
            }
            for &j in expr.terms.keys() {
                users.entry(j).or_default().push(p);
            }
            eliminated[p] = Some(expr);
            integral[p] = expr_integral;
        }

        if redundant > 0 {
            debug!("skipped {} redundant constraint rows", redundant);
        }

        let mut reduced = vec![None; num_variables];
        let mut num_free = 0;
        for (i, slot) in reduced.iter_mut().enumerate() {
            if eliminated[i].is_none() {
                *slot = Some(num_free);
                num_free += 1;
            }
        }

        Ok(Self {
            eliminated,
            integral,
            reduced,
            num_free,
        })
    }

    /// Number of free variables.
    #[inline]
    pub fn num_free(&self) -> usize {
        self.num_free
    }

    /// Number of original variables.
    #[inline]
    pub fn num_variables(&self) -> usize {
        self.reduced.len()
    }

    /// Index of original variable `var` among the free variables, if free.
    #[inline]
    pub fn reduced_index(&self, var: usize) -> Option<usize> {
        self.reduced[var]
    }

    /// Whether `var` takes an integer value whenever every protected free
    /// variable does. True for protected free variables and for variables
    /// eliminated through rows over protected variables with an integral
    /// pivot.
    pub fn is_integral(&self, var: usize, protected: &[bool]) -> bool {
        match self.reduced[var] {
            Some(_) => protected.get(var).copied().unwrap_or(false),
            None => self.integral[var],
        }
    }

    /// Row of the map for variable `i`: `(free index, coefficient)` pairs and
    /// a constant.
    fn map_row(&self, i: usize) -> (Vec<(usize, f64)>, f64) {
        match (&self.eliminated[i], self.reduced[i]) {
            (Some(expr), _) => (
                expr.terms
                    .iter()
                    .filter_map(|(&j, &c)| self.reduced[j].map(|y| (y, c)))
                    .collect(),
                expr.constant,
            ),
            (None, Some(y)) => (vec![(y, 1.0)], 0.0),
            (None, None) => (Vec::new(), 0.0),
        }
    }

    /// Full solution `x = T y + d` from free values `y`.
    pub fn expand(&self, y: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.num_variables(),
            (0..self.num_variables()).map(|i| {
                let (terms, constant) = self.map_row(i);
                constant + terms.iter().map(|&(j, c)| c * y[j]).sum::<f64>()
            }),
        )
    }

    /// Reduced normal equations `Tᵀ A T y = Tᵀ (b - A d)`.
    pub fn reduce(&self, a: &CsrMatrix, b: &DVector<f64>) -> (CsrMatrix, DVector<f64>) {
        let rows: Vec<(Vec<(usize, f64)>, f64)> =
            (0..self.num_variables()).map(|i| self.map_row(i)).collect();

        let d = DVector::from_iterator(self.num_variables(), rows.iter().map(|(_, c)| *c));
        let residual = b - a.mul_vec(&d);

        let mut triplets = Vec::with_capacity(a.nnz());
        for (i, j, v) in a.triplets() {
            for &(yi, ci) in &rows[i].0 {
                for &(yj, cj) in &rows[j].0 {
                    triplets.push((yi, yj, ci * v * cj));
                }
            }
        }

        let mut g = DVector::zeros(self.num_free);
        for (i, (terms, _)) in rows.iter().enumerate() {
            for &(y, c) in terms {
                g[y] += c * residual[i];
            }
        }

        let k = CsrMatrix::from_triplets(self.num_free, self.num_free, triplets);
        if k.nnz() == 0 && self.num_free > 0 {
            warn!("reduced system has no entries");
        }
        (k, g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_eliminates_variable() {
        let elim = Elimination::new(3, &[LinearConstraint::fix(1, 2.5)], &[false; 3]).unwrap();
        assert_eq!(elim.num_free(), 2);
        assert_eq!(elim.reduced_index(1), None);
        assert_eq!(elim.reduced_index(2), Some(1));

        let x = elim.expand(&DVector::from_vec(vec![1.0, 3.0]));
        assert_eq!(x, DVector::from_vec(vec![1.0, 2.5, 3.0]));
    }

    #[test]
    fn test_chained_constraints_resolve_to_free_variables() {
        // x1 = x0 + 1, x2 = x1 + 1, x3 = x2 + x1.
        let constraints = vec![
            LinearConstraint::new(vec![(1, 1.0), (0, -1.0)], 1.0),
            LinearConstraint::new(vec![(2, 1.0), (1, -1.0)], 1.0),
            LinearConstraint::new(vec![(3, 1.0), (2, -1.0), (1, -1.0)], 0.0),
        ];
        // Protect x0 so it is never chosen as a pivot.
        let protected = [true, false, false, false];
        let elim = Elimination::new(4, &constraints, &protected).unwrap();
        assert_eq!(elim.num_free(), 1);
        assert_eq!(elim.reduced_index(0), Some(0));

        let x = elim.expand(&DVector::from_vec(vec![2.0]));
        assert!((x[1] - 3.0).abs() < 1e-12);
        assert!((x[2] - 4.0).abs() < 1e-12);
        assert!((x[3] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_protected_rows_pivot_on_dividing_coefficient() {
        // -x0 - x1 + x2 = 0 and x0 - x1 + x3 = 0, all protected. After the
        // first row the second reads -2 x1 + x2 + x3 = 0; solving it for x1
        // would introduce halves.
        let constraints = vec![
            LinearConstraint::new(vec![(0, -1.0), (1, -1.0), (2, 1.0)], 0.0),
            LinearConstraint::new(vec![(0, 1.0), (1, -1.0), (3, 1.0)], 0.0),
        ];
        let protected = [true; 4];
        let elim = Elimination::new(4, &constraints, &protected).unwrap();
        assert_eq!(elim.num_free(), 2);
        assert!(elim.reduced_index(1).is_some());
        assert!((0..4).all(|i| elim.is_integral(i, &protected)));

        let mut y = DVector::zeros(2);
        y[elim.reduced_index(1).unwrap()] = 3.0;
        let x = elim.expand(&y);
        assert!(x.iter().all(|v| (v - v.round()).abs() < 1e-12));
    }

    #[test]
    fn test_fractional_pin_is_not_integral() {
        let protected = [true, false];
        let elim = Elimination::new(2, &[LinearConstraint::fix(0, 0.5)], &protected).unwrap();
        assert!(!elim.is_integral(0, &protected));
        assert!(!elim.is_integral(1, &protected));
    }

    #[test]
    fn test_redundant_and_inconsistent_rows() {
        let redundant = vec![
            LinearConstraint::new(vec![(0, 1.0), (1, -1.0)], 0.0),
            LinearConstraint::new(vec![(0, 2.0), (1, -2.0)], 0.0),
        ];
        let elim = Elimination::new(2, &redundant, &[false; 2]).unwrap();
        assert_eq!(elim.num_free(), 1);

        let inconsistent = vec![
            LinearConstraint::new(vec![(0, 1.0), (1, -1.0)], 0.0),
            LinearConstraint::new(vec![(0, 1.0), (1, -1.0)], 1.0),
        ];
        match Elimination::new(2, &inconsistent, &[false; 2]).unwrap_err() {
            MeshError::InconsistentConstraints { constraint: 1 } => (),
            e => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn test_reduce_matches_substitution() {
        // Energy (x0 - 1)^2 + (x1 - 3)^2 subject to x0 = x1: optimum x0 = x1 = 2.
        let a = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (1, 1, 1.0)]);
        let b = DVector::from_vec(vec![1.0, 3.0]);
        let elim = Elimination::new(
            2,
            &[LinearConstraint::new(vec![(0, 1.0), (1, -1.0)], 0.0)],
            &[false; 2],
        )
        .unwrap();
        let (k, g) = elim.reduce(&a, &b);
        assert_eq!(k.nrows(), 1);
        let y = g[0] / k.get(0, 0);
        let x = elim.expand(&DVector::from_vec(vec![y]));
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_system_validation() {
        let a = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (1, 1, 1.0)]);
        let result = ConstrainedSystem::new(
            a,
            DVector::zeros(2),
            vec![LinearConstraint::fix(5, 0.0)],
        );
        assert!(matches!(result, Err(MeshError::InvalidInput(_))));
    }
}
