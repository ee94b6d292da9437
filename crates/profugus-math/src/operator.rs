// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Linear Operators
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Operator capability shared by matrices, preconditioners and solvers.
//!
//! Multivectors are `(len, num_vectors)` arrays: each column is one vector.

use ndarray::{ArrayView2, ArrayViewMut2};
use profugus_types::require;

/// `y = Op(x)` on vectors and multivectors.
pub trait LinearOperator {
    /// Length of `y`.
    fn rows(&self) -> usize;

    /// Length of `x`.
    fn cols(&self) -> usize;

    fn apply_vec(&self, x: &[f64], y: &mut [f64]);

    /// Column-by-column application; implementors with a faster block
    /// kernel may override.
    fn apply(&self, x: ArrayView2<'_, f64>, mut y: ArrayViewMut2<'_, f64>) {
        require!(x.nrows() == self.cols());
        require!(y.nrows() == self.rows());
        require!(x.ncols() == y.ncols());
        let mut xin = vec![0.0; self.cols()];
        let mut yout = vec![0.0; self.rows()];
        for (xc, mut yc) in x.columns().into_iter().zip(y.columns_mut()) {
            for (dst, &src) in xin.iter_mut().zip(xc.iter()) {
                *dst = src;
            }
            self.apply_vec(&xin, &mut yout);
            for (dst, &src) in yc.iter_mut().zip(yout.iter()) {
                *dst = src;
            }
        }
    }
}

/// `y = x`.
#[derive(Debug, Clone, Copy)]
pub struct IdentityOperator {
    pub size: usize,
}

impl LinearOperator for IdentityOperator {
    fn rows(&self) -> usize {
        self.size
    }

    fn cols(&self) -> usize {
        self.size
    }

    fn apply_vec(&self, x: &[f64], y: &mut [f64]) {
        y.copy_from_slice(x);
    }
}

/// `y = D⁻¹ x` for a stored diagonal.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inv_diag: Vec<f64>,
}

impl JacobiPreconditioner {
    /// Zero diagonal entries are treated as one.
    pub fn new(diagonal: &[f64]) -> Self {
        let inv_diag = diagonal
            .iter()
            .map(|&d| if d != 0.0 { 1.0 / d } else { 1.0 })
            .collect();
        JacobiPreconditioner { inv_diag }
    }
}

impl LinearOperator for JacobiPreconditioner {
    fn rows(&self) -> usize {
        self.inv_diag.len()
    }

    fn cols(&self) -> usize {
        self.inv_diag.len()
    }

    fn apply_vec(&self, x: &[f64], y: &mut [f64]) {
        for ((yi, &xi), &di) in y.iter_mut().zip(x).zip(&self.inv_diag) {
            *yi = di * xi;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_multivector_apply_per_column() {
        let op = JacobiPreconditioner::new(&[2.0, 4.0, 0.0]);
        let x = Array2::from_shape_vec((3, 2), vec![2.0, 1.0, 4.0, 2.0, 5.0, 3.0]).unwrap();
        let mut y = Array2::zeros((3, 2));
        op.apply(x.view(), y.view_mut());
        assert_eq!(y.column(0).to_vec(), vec![1.0, 1.0, 5.0]);
        assert_eq!(y.column(1).to_vec(), vec![0.5, 0.5, 3.0]);
    }

    #[test]
    fn test_identity() {
        let op = IdentityOperator { size: 3 };
        let mut y = [0.0; 3];
        op.apply_vec(&[1.0, 2.0, 3.0], &mut y);
        assert_eq!(y, [1.0, 2.0, 3.0]);
    }
}
