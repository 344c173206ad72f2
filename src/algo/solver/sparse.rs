//! Compressed sparse row matrices and iterative solvers.
//!
//! Matrices are assembled from `(row, col, value)` triplets with duplicates
//! summed, then solved with Jacobi-preconditioned conjugate gradients or
//! relaxed with Gauss-Seidel sweeps.

use nalgebra::DVector;

use crate::error::{MeshError, Result};

/// Options shared by the iterative solvers.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Maximum number of conjugate gradient iterations.
    pub max_iterations: usize,
    /// Convergence tolerance on the relative residual `|b - Ax| / |b|`.
    pub tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 20_000,
            tolerance: 1e-10,
        }
    }
}

impl SolverOptions {
    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }
}

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    /// `row_ptr[i]..row_ptr[i + 1]` is the range of row `i` in `col_idx`/`values`.
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries at the same (row, col) are summed. Column indices are
    /// sorted within each row.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut row_ptr = vec![0usize; rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in triplets {
            debug_assert!(row < rows && col < cols, "triplet out of range");
            if last == Some((row, col)) {
                if let Some(acc) = values.last_mut() {
                    *acc += val;
                }
            } else {
                col_idx.push(col);
                values.push(val);
                row_ptr[row + 1] += 1;
                last = Some((row, col));
            }
        }

        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored `(col, value)` pairs of row `i`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// All stored entries as `(row, col, value)`.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.rows).flat_map(move |i| self.row(i).map(move |(j, v)| (i, j, v)))
    }

    /// Entry at `(i, j)`, zero if not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        match self.col_idx[range.clone()].binary_search(&j) {
            Ok(pos) => self.values[range.start + pos],
            Err(_) => 0.0,
        }
    }

    /// Main diagonal.
    pub fn diagonal(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.rows.min(self.cols),
            (0..self.rows.min(self.cols)).map(|i| self.get(i, i)),
        )
    }

    /// Multiply matrix by vector: y = A * x.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");

        DVector::from_iterator(
            self.rows,
            (0..self.rows).map(|i| self.row(i).map(|(j, v)| v * x[j]).sum::<f64>()),
        )
    }
}

fn inverse_diagonal(a: &CsrMatrix) -> Result<DVector<f64>> {
    let diag = a.diagonal();
    for (row, &d) in diag.iter().enumerate() {
        if !(d > 0.0) {
            return Err(MeshError::SingularMatrix { row });
        }
    }
    Ok(diag.map(|d| 1.0 / d))
}

/// Solve A*x = b with Jacobi-preconditioned conjugate gradients.
///
/// `a` must be symmetric positive definite; a non-positive diagonal entry is
/// reported as [`MeshError::SingularMatrix`] and a breakdown or exhausted
/// iteration budget as [`MeshError::ConvergenceFailed`].
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    options: &SolverOptions,
) -> Result<DVector<f64>> {
    let n = b.len();
    assert_eq!(a.nrows(), n, "Matrix-vector dimension mismatch");
    assert_eq!(a.ncols(), n, "Matrix must be square");

    let inv_diag = inverse_diagonal(a)?;

    let b_norm = b.norm();
    if b_norm == 0.0 {
        return Ok(DVector::zeros(n));
    }

    let mut x = match x0 {
        Some(x0) => x0.clone(),
        None => DVector::zeros(n),
    };

    let mut r = b - a.mul_vec(&x);
    if r.norm() / b_norm < options.tolerance {
        return Ok(x);
    }

    let mut z = r.component_mul(&inv_diag);
    let mut p = z.clone();
    let mut rz = r.dot(&z);

    for iter in 0..options.max_iterations {
        let ap = a.mul_vec(&p);
        let p_ap = p.dot(&ap);
        if !(p_ap > 0.0) || !p_ap.is_finite() {
            return Err(MeshError::ConvergenceFailed { iterations: iter });
        }
        let alpha = rz / p_ap;

        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        if r.norm() / b_norm < options.tolerance {
            return Ok(x);
        }

        z = r.component_mul(&inv_diag);
        let rz_new = r.dot(&z);
        let beta = rz_new / rz;
        p = &z + beta * &p;
        rz = rz_new;
    }

    Err(MeshError::ConvergenceFailed {
        iterations: options.max_iterations,
    })
}

/// Run `sweeps` in-place Gauss-Seidel sweeps on A*x = b.
pub fn gauss_seidel(a: &CsrMatrix, b: &DVector<f64>, x: &mut DVector<f64>, sweeps: usize) -> Result<()> {
    assert_eq!(a.nrows(), b.len(), "Matrix-vector dimension mismatch");
    let inv_diag = inverse_diagonal(a)?;

    for _ in 0..sweeps {
        for i in 0..a.nrows() {
            let off_diag: f64 = a
                .row(i)
                .filter(|&(j, _)| j != i)
                .map(|(j, v)| v * x[j])
                .sum();
            x[i] = (b[i] - off_diag) * inv_diag[i];
        }
    }
    Ok(())
}

/// Relative residual `|b - Ax| / |b|` (absolute when `b` is zero).
pub fn relative_residual(a: &CsrMatrix, b: &DVector<f64>, x: &DVector<f64>) -> f64 {
    let r = (b - a.mul_vec(x)).norm();
    let b_norm = b.norm();
    if b_norm > 0.0 {
        r / b_norm
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spd_2x2() -> CsrMatrix {
        // [ 4  1 ]
        // [ 1  3 ]
        CsrMatrix::from_triplets(2, 2, vec![(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)])
    }

    #[test]
    fn test_csr_from_triplets_with_duplicates() {
        let triplets = vec![
            (1, 1, 3.0),
            (0, 0, 2.0),
            (0, 1, 1.0),
            (0, 0, 2.0),
            (1, 0, 1.0),
        ];
        let a = CsrMatrix::from_triplets(2, 2, triplets);

        assert_eq!(a.nnz(), 4);
        assert_eq!(a.get(0, 0), 4.0);
        assert_eq!(a.get(1, 0), 1.0);
        assert_eq!(a.diagonal(), DVector::from_vec(vec![4.0, 3.0]));
    }

    #[test]
    fn test_csr_empty_rows() {
        let a = CsrMatrix::from_triplets(4, 4, vec![(2, 3, 5.0)]);
        assert_eq!(a.row(0).count(), 0);
        assert_eq!(a.row(3).count(), 0);
        assert_eq!(a.get(2, 3), 5.0);
        assert_eq!(a.get(3, 2), 0.0);
        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 1.0, 1.0, 2.0]));
        assert_eq!(y, DVector::from_vec(vec![0.0, 0.0, 10.0, 0.0]));
    }

    #[test]
    fn test_cg_simple() {
        // Solution: x = 1/11, y = 7/11
        let a = spd_2x2();
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let x = conjugate_gradient(&a, &b, None, &SolverOptions::default()).unwrap();

        assert!((x[0] - 1.0 / 11.0).abs() < 1e-8);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-8);
        assert!(relative_residual(&a, &b, &x) < 1e-8);
    }

    #[test]
    fn test_cg_badly_scaled() {
        // Jacobi preconditioning handles rows that differ by many orders of magnitude.
        let a = CsrMatrix::from_triplets(
            3,
            3,
            vec![
                (0, 0, 1e6),
                (0, 1, 1.0),
                (1, 0, 1.0),
                (1, 1, 2.0),
                (1, 2, -1.0),
                (2, 1, -1.0),
                (2, 2, 1e-6 + 1.0),
            ],
        );
        let b = DVector::from_vec(vec![1.0, 0.0, 1.0]);
        let x = conjugate_gradient(&a, &b, None, &SolverOptions::default()).unwrap();
        assert!(relative_residual(&a, &b, &x) < 1e-9);
    }

    #[test]
    fn test_cg_rejects_zero_diagonal() {
        let a = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0)]);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        match conjugate_gradient(&a, &b, None, &SolverOptions::default()).unwrap_err() {
            MeshError::SingularMatrix { row: 1 } => (),
            e => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn test_cg_iteration_budget() {
        let n = 50;
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 2.0));
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
                triplets.push((i + 1, i, -1.0));
            }
        }
        let a = CsrMatrix::from_triplets(n, n, triplets);
        let b = DVector::from_element(n, 1.0);
        let options = SolverOptions::default().with_max_iterations(2);
        assert!(matches!(
            conjugate_gradient(&a, &b, None, &options),
            Err(MeshError::ConvergenceFailed { iterations: 2 })
        ));
    }

    #[test]
    fn test_gauss_seidel_converges() {
        let a = spd_2x2();
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let mut x = DVector::zeros(2);
        gauss_seidel(&a, &b, &mut x, 50).unwrap();
        assert!((x[0] - 1.0 / 11.0).abs() < 1e-10);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-10);
    }
}
