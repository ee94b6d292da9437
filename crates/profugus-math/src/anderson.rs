// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Anderson Acceleration
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Anderson mixing for fixed-point problems `x = G(x)`.
//!
//! The operator reports the residual `f(x) = G(x) - x`. With history
//! differences `ΔX`, `ΔF` over the last `m` iterates, each step solves the
//! small least-squares problem `min ‖f_k - ΔF γ‖` through an SVD
//! pseudoinverse and updates
//!
//! ```text
//! x_{k+1} = x_k + β f_k - (ΔX + β ΔF) γ
//! ```

use std::collections::VecDeque;

use log::{debug, warn};
use ndarray::{Array1, Array2};
use profugus_types::config::AndersonParams;
use profugus_types::error::ProfugusResult;
use profugus_types::require;

use crate::linalg::{pinv_svd, vec_norm, vec_sub};

/// Residual operator of a fixed-point map.
pub trait FixedPointOperator {
    fn size(&self) -> usize;

    /// `f = G(x) - x`.
    fn apply(&mut self, x: &[f64], f: &mut [f64]) -> ProfugusResult<()>;
}

/// Anderson mixing settings.
#[derive(Debug, Clone)]
pub struct AndersonConfig {
    /// History depth m (default: 5)
    pub depth: usize,
    /// Maximum operator applications after the first (default: 20)
    pub max_itr: usize,
    /// Absolute tolerance on ‖f‖₂ (default: 1e-3)
    pub tolerance: f64,
    /// Mixing factor β (default: 1.0)
    pub beta: f64,
}

impl Default for AndersonConfig {
    fn default() -> Self {
        AndersonConfig {
            depth: 5,
            max_itr: 20,
            tolerance: 1e-3,
            beta: 1.0,
        }
    }
}

impl From<&AndersonParams> for AndersonConfig {
    fn from(p: &AndersonParams) -> Self {
        AndersonConfig {
            depth: p.depth,
            max_itr: p.max_itr,
            tolerance: p.tolerance,
            beta: p.beta,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AndersonResult {
    pub iterations: usize,
    /// ‖f‖₂ at the returned iterate.
    pub residual: f64,
    pub converged: bool,
}

/// Relative singular-value cutoff of the least-squares step.
const SV_RELATIVE_CUTOFF: f64 = 1e-12;

/// Run Anderson mixing from `x`; the final iterate is left in `x`.
///
/// Errors from the operator abort the solve; non-convergence does not.
pub fn anderson_solve(
    op: &mut dyn FixedPointOperator,
    x: &mut [f64],
    config: &AndersonConfig,
) -> ProfugusResult<AndersonResult> {
    let n = op.size();
    require!(x.len() == n);
    require!(config.depth > 0);

    let mut f = vec![0.0; n];
    op.apply(x, &mut f)?;
    let mut res = vec_norm(&f);
    debug!("anderson 0: |f| = {res:.4e}");
    if res <= config.tolerance {
        return Ok(AndersonResult {
            iterations: 0,
            residual: res,
            converged: true,
        });
    }

    let mut dx_hist: VecDeque<Vec<f64>> = VecDeque::with_capacity(config.depth);
    let mut df_hist: VecDeque<Vec<f64>> = VecDeque::with_capacity(config.depth);
    let mut x_new = vec![0.0; n];
    let mut f_new = vec![0.0; n];

    for it in 1..=config.max_itr {
        for i in 0..n {
            x_new[i] = x[i] + config.beta * f[i];
        }
        if !df_hist.is_empty() {
            let gamma = least_squares_coefficients(&df_hist, &f);
            for (j, g) in gamma.iter().enumerate() {
                let (dx, df) = (&dx_hist[j], &df_hist[j]);
                for i in 0..n {
                    x_new[i] -= g * (dx[i] + config.beta * df[i]);
                }
            }
        }

        op.apply(&x_new, &mut f_new)?;

        if dx_hist.len() == config.depth {
            dx_hist.pop_front();
            df_hist.pop_front();
        }
        let mut dx = vec![0.0; n];
        let mut df = vec![0.0; n];
        vec_sub(&x_new, x, &mut dx);
        vec_sub(&f_new, &f, &mut df);
        dx_hist.push_back(dx);
        df_hist.push_back(df);

        x.copy_from_slice(&x_new);
        f.copy_from_slice(&f_new);
        res = vec_norm(&f);
        debug!("anderson {it}: |f| = {res:.4e}, history = {}", df_hist.len());

        if !res.is_finite() {
            warn!("Anderson residual became non-finite at iteration {it}");
            return Ok(AndersonResult {
                iterations: it,
                residual: res,
                converged: false,
            });
        }
        if res <= config.tolerance {
            return Ok(AndersonResult {
                iterations: it,
                residual: res,
                converged: true,
            });
        }
    }

    warn!(
        "Anderson solve did not converge in {} iterations (|f| = {res:.4e})",
        config.max_itr
    );
    Ok(AndersonResult {
        iterations: config.max_itr,
        residual: res,
        converged: false,
    })
}

/// γ = pinv(ΔF) f.
fn least_squares_coefficients(df_hist: &VecDeque<Vec<f64>>, f: &[f64]) -> Array1<f64> {
    let n = f.len();
    let m = df_hist.len();
    let mut df = Array2::zeros((n, m));
    for (j, col) in df_hist.iter().enumerate() {
        for i in 0..n {
            df[[i, j]] = col[i];
        }
    }
    let scale = df.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let pinv = pinv_svd(&df, SV_RELATIVE_CUTOFF * scale.max(f64::MIN_POSITIVE));
    pinv.dot(&Array1::from_vec(f.to_vec()))
}
