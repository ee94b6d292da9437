//! Dense helpers: BLAS-1 kernels on slices, small SVD and pseudoinverse.

use ndarray::{Array1, Array2};

// ───────────────────────── BLAS-like helpers ─────────────────────────

/// Euclidean (L2) norm of a slice.
#[inline]
pub fn vec_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Dot product.
#[inline]
pub fn vec_dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// `y = y + alpha * x` (axpy).
#[inline]
pub fn vec_axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

/// `y = alpha * x` (scale-copy).
#[inline]
pub fn vec_scale(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi = alpha * xi;
    }
}

/// `out = a - b`.
#[inline]
pub fn vec_sub(a: &[f64], b: &[f64], out: &mut [f64]) {
    for ((oi, &ai), &bi) in out.iter_mut().zip(a.iter()).zip(b.iter()) {
        *oi = ai - bi;
    }
}

/// Sum of absolute values.
#[inline]
pub fn vec_norm1(v: &[f64]) -> f64 {
    v.iter().map(|x| x.abs()).sum()
}

/// Largest absolute value.
#[inline]
pub fn vec_norm_inf(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

// ───────────────────────────── SVD ───────────────────────────────────

const JACOBI_SWEEPS: usize = 100;

/// `[a_p, a_q] ← [c a_p - s a_q, s a_p + c a_q]` over the columns p, q.
fn rotate_columns(a: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    for mut row in a.rows_mut() {
        let (ap, aq) = (row[p], row[q]);
        row[p] = c * ap - s * aq;
        row[q] = s * ap + c * aq;
    }
}

/// Rotate the symmetric `g` in the (p, q) plane so that `g[p,q] = 0`,
/// accumulating the rotation into `v`.
fn jacobi_rotate(g: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize) {
    let theta = (g[[q, q]] - g[[p, p]]) / (2.0 * g[[p, q]]);
    let t = theta.signum() / (theta.abs() + theta.hypot(1.0));
    let c = 1.0 / t.hypot(1.0);
    let s = t * c;

    rotate_columns(g, p, q, c, s);
    rotate_columns(v, p, q, c, s);
    for mut col in g.columns_mut() {
        let (gp, gq) = (col[p], col[q]);
        col[p] = c * gp - s * gq;
        col[q] = s * gp + c * gq;
    }
    g[[p, q]] = 0.0;
    g[[q, p]] = 0.0;
}

/// Thin SVD `A = U diag(σ) Vᵀ` of a small matrix from the one-sided
/// eigenproblem of the Gram matrix `AᵀA`, σ descending.
///
/// Squaring the condition number is acceptable for the few-column history
/// matrices of the Anderson least-squares step, which is all this serves.
pub fn svd_small(a: &Array2<f64>) -> (Array2<f64>, Array1<f64>, Array2<f64>) {
    let (m, n) = a.dim();
    let k = m.min(n);
    let mut gram = a.t().dot(a);
    let mut v = Array2::eye(n);

    for _ in 0..JACOBI_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| ((p + 1)..n).map(move |q| (p, q)))
            .map(|(p, q)| gram[[p, q]].abs())
            .sum();
        if off < 1e-14 {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if gram[[p, q]].abs() >= 1e-15 {
                    jacobi_rotate(&mut gram, &mut v, p, q);
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| gram[[j, j]].total_cmp(&gram[[i, i]]));
    order.truncate(k);

    let sigma = Array1::from_iter(order.iter().map(|&c| gram[[c, c]].max(0.0).sqrt()));
    let vt = Array2::from_shape_fn((k, n), |(idx, j)| v[[j, order[idx]]]);
    let mut u = Array2::zeros((m, k));
    for (idx, &s) in sigma.iter().enumerate() {
        if s > 1e-14 {
            let col = a.dot(&vt.row(idx)) / s;
            u.column_mut(idx).assign(&col);
        }
    }
    (u, sigma, vt)
}

/// Pseudoinverse `V Σ⁺ Uᵀ`, dropping singular values at or below
/// `sv_cutoff`.
pub fn pinv_svd(a: &Array2<f64>, sv_cutoff: f64) -> Array2<f64> {
    let (u, sigma, vt) = svd_small(a);
    let (m, n) = a.dim();
    let mut result = Array2::zeros((n, m));
    for (idx, &s) in sigma.iter().enumerate() {
        if s <= sv_cutoff {
            continue;
        }
        let vi = vt.row(idx);
        let ui = u.column(idx);
        for i in 0..n {
            for j in 0..m {
                result[[i, j]] += vi[i] * ui[j] / s;
            }
        }
    }
    result
}
