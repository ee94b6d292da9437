// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Power Iteration
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Dominant-eigenpair power iteration for non-negative operators.
//!
//! The eigenvalue estimate is the ratio of successive source sums,
//! `k = Σ(T x) / Σ x`, which is what reactor k-eigenvalue iterations use.

use log::{debug, warn};
use profugus_types::config::EigenParams;
use profugus_types::require;

use crate::linalg::vec_norm_inf;

/// Power-iteration settings.
#[derive(Debug, Clone)]
pub struct PowerIteration {
    /// Relative tolerance on k and on the eigenvector (default: 1e-6)
    pub tolerance: f64,
    /// Default: 500
    pub max_itr: usize,
}

impl Default for PowerIteration {
    fn default() -> Self {
        PowerIteration {
            tolerance: 1e-6,
            max_itr: 500,
        }
    }
}

impl From<&EigenParams> for PowerIteration {
    fn from(p: &EigenParams) -> Self {
        PowerIteration {
            tolerance: p.tolerance,
            max_itr: p.max_itr,
        }
    }
}

/// Result of an eigenvalue iteration.
#[derive(Debug, Clone)]
pub struct EigenResult {
    pub keff: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl PowerIteration {
    /// Iterate `x ← T x / k` from `x`; `apply` computes `y = T x`.
    ///
    /// On return `x` holds the last eigenvector iterate, scaled so that
    /// `Σ x` is unchanged from the initial guess.
    pub fn solve(
        &self,
        apply: &mut dyn FnMut(&[f64], &mut [f64]),
        x: &mut [f64],
        k_init: f64,
    ) -> EigenResult {
        require!(!x.is_empty());
        require!(k_init > 0.0);
        let norm_sum: f64 = x.iter().sum();
        require!(norm_sum != 0.0);

        let mut y = vec![0.0; x.len()];
        let mut keff = k_init;
        for it in 1..=self.max_itr {
            apply(x, &mut y);
            let x_sum: f64 = x.iter().sum();
            let y_sum: f64 = y.iter().sum();
            let k_new = y_sum / x_sum;
            if !k_new.is_finite() || k_new == 0.0 {
                warn!("Power iteration produced k = {k_new} at iteration {it}");
                return EigenResult {
                    keff: k_new,
                    iterations: it,
                    converged: false,
                };
            }

            let scale = norm_sum / y_sum;
            let mut diff = 0.0_f64;
            for (xi, yi) in x.iter_mut().zip(&y) {
                let next = yi * scale;
                diff = diff.max((next - *xi).abs());
                *xi = next;
            }
            let dk = (k_new - keff).abs();
            keff = k_new;
            debug!("power iteration {it}: k = {keff:.8}, dk = {dk:.3e}");

            if dk <= self.tolerance * keff.abs() && diff <= self.tolerance * vec_norm_inf(x) {
                return EigenResult {
                    keff,
                    iterations: it,
                    converged: true,
                };
            }
        }

        warn!(
            "Power iteration did not converge in {} iterations (k = {keff:.6})",
            self.max_itr
        );
        EigenResult {
            keff,
            iterations: self.max_itr,
            converged: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagonal_dominant_eigenvalue() {
        let diag = [3.0, 1.0, 0.5];
        let mut apply = |x: &[f64], y: &mut [f64]| {
            for i in 0..3 {
                y[i] = diag[i] * x[i];
            }
        };
        let mut x = vec![1.0; 3];
        let solver = PowerIteration {
            tolerance: 1e-10,
            max_itr: 500,
        };
        let result = solver.solve(&mut apply, &mut x, 1.0);
        assert!(result.converged);
        assert!((result.keff - 3.0).abs() < 1e-8, "k = {}", result.keff);
        assert!(x[1].abs() < 1e-6 && x[2].abs() < 1e-6);
        assert!((x.iter().sum::<f64>() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_two_by_two_positive_matrix() {
        // [[2,1],[1,2]] has eigenvalues 3 and 1
        let mut apply = |x: &[f64], y: &mut [f64]| {
            y[0] = 2.0 * x[0] + x[1];
            y[1] = x[0] + 2.0 * x[1];
        };
        let mut x = vec![1.0, 0.2];
        let result = PowerIteration::default().solve(&mut apply, &mut x, 1.0);
        assert!(result.converged);
        assert!((result.keff - 3.0).abs() < 1e-5);
        assert!((x[0] - x[1]).abs() < 1e-5);
    }

    #[test]
    fn test_iteration_cap_reports_not_converged() {
        let mut apply = |x: &[f64], y: &mut [f64]| {
            y[0] = 1.0 * x[0];
            y[1] = 0.999 * x[1];
        };
        let mut x = vec![1.0, 1.0];
        let solver = PowerIteration {
            tolerance: 1e-12,
            max_itr: 5,
        };
        let result = solver.solve(&mut apply, &mut x, 1.0);
        assert!(!result.converged);
        assert_eq!(result.iterations, 5);
    }
}
