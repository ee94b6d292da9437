// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — GMRES
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Restarted, left-preconditioned GMRES(m) on a [`LinearOperator`].
//!
//! Each cycle runs Arnoldi with modified Gram-Schmidt on `M⁻¹ A`, keeps the
//! Hessenberg columns triangular with Givens rotations as they arrive and
//! reads the residual estimate off the rotated right-hand side. The
//! tolerance is relative to the first preconditioned residual `‖M⁻¹ r₀‖`.

use crate::linalg::{vec_axpy, vec_dot, vec_norm, vec_scale, vec_sub};
use crate::operator::LinearOperator;

const BREAKDOWN: f64 = 1e-300;

#[derive(Debug, Clone)]
pub struct GmresConfig {
    /// Krylov dimension per cycle (default: 30)
    pub restart: usize,
    /// Operator applications summed over all cycles (default: 1000)
    pub max_iter: usize,
    /// Relative preconditioned residual (default: 1e-8)
    pub tol: f64,
}

impl Default for GmresConfig {
    fn default() -> Self {
        GmresConfig {
            restart: 30,
            max_iter: 1000,
            tol: 1e-8,
        }
    }
}

/// Outcome of an iterative solve.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// Operator applications performed.
    pub iterations: usize,
    /// `‖b - A x‖₂` on exit.
    pub residual: f64,
    pub converged: bool,
}

impl SolveResult {
    fn trivial(residual: f64) -> Self {
        SolveResult {
            iterations: 0,
            residual,
            converged: true,
        }
    }
}

/// Plane rotation `[c -s; s c]` chosen to annihilate the second entry.
#[derive(Clone, Copy)]
struct Rotation {
    c: f64,
    s: f64,
}

impl Rotation {
    fn zeroing(a: f64, b: f64) -> Self {
        if b.abs() < BREAKDOWN {
            return Rotation { c: 1.0, s: 0.0 };
        }
        let r = a.hypot(b);
        Rotation { c: a / r, s: -b / r }
    }

    #[inline]
    fn rotate(&self, v: &mut [f64], i: usize) {
        let (a, b) = (v[i], v[i + 1]);
        v[i] = self.c * a - self.s * b;
        v[i + 1] = self.s * a + self.c * b;
    }
}

/// One restart cycle's Krylov basis and triangularised Hessenberg columns.
struct Arnoldi {
    basis: Vec<Vec<f64>>,
    columns: Vec<Vec<f64>>,
    rotations: Vec<Rotation>,
    /// Rotated `β e₁`; `|g[j]|` is the current residual estimate.
    g: Vec<f64>,
}

impl Arnoldi {
    fn new(z: &[f64], beta: f64, m: usize) -> Self {
        let mut v0 = vec![0.0; z.len()];
        vec_scale(1.0 / beta, z, &mut v0);
        let mut g = vec![0.0; m + 1];
        g[0] = beta;
        Arnoldi {
            basis: vec![v0],
            columns: Vec::with_capacity(m),
            rotations: Vec::with_capacity(m),
            g,
        }
    }

    fn len(&self) -> usize {
        self.columns.len()
    }

    /// Orthogonalise `w = M⁻¹ A v_j` against the basis and fold the new
    /// column in. Returns the subdiagonal entry `h_{j+1,j}`.
    fn extend(&mut self, mut w: Vec<f64>) -> f64 {
        let j = self.columns.len();
        let mut h = vec![0.0; j + 2];
        for (i, v) in self.basis.iter().enumerate() {
            h[i] = vec_dot(&w, v);
            vec_axpy(-h[i], v, &mut w);
        }
        let subdiag = vec_norm(&w);
        h[j + 1] = subdiag;
        if subdiag > BREAKDOWN {
            let inv = 1.0 / subdiag;
            w.iter_mut().for_each(|x| *x *= inv);
        }
        self.basis.push(w);

        for (i, rot) in self.rotations.iter().enumerate() {
            rot.rotate(&mut h, i);
        }
        let rot = Rotation::zeroing(h[j], h[j + 1]);
        rot.rotate(&mut h, j);
        rot.rotate(&mut self.g, j);
        self.rotations.push(rot);
        self.columns.push(h);
        subdiag
    }

    fn residual_estimate(&self) -> f64 {
        self.g[self.len()].abs()
    }

    /// `x += V y` with `R y = g` solved by back substitution.
    fn update(&self, x: &mut [f64]) {
        let k = self.len();
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let tail: f64 = ((i + 1)..k).map(|j| self.columns[j][i] * y[j]).sum();
            let diag = self.columns[i][i];
            y[i] = if diag.abs() > BREAKDOWN {
                (self.g[i] - tail) / diag
            } else {
                0.0
            };
        }
        for (yi, v) in y.iter().zip(&self.basis) {
            vec_axpy(*yi, v, x);
        }
    }
}

fn residual(a: &dyn LinearOperator, b: &[f64], x: &[f64], work: &mut [f64], r: &mut [f64]) {
    a.apply_vec(x, work);
    vec_sub(b, work, r);
}

fn precondition(prec: Option<&dyn LinearOperator>, r: &[f64], z: &mut [f64]) {
    match prec {
        Some(m) => m.apply_vec(r, z),
        None => z.copy_from_slice(r),
    }
}

/// Solve `A x = b`; `x` holds the initial guess on entry.
pub fn gmres_solve(
    a: &dyn LinearOperator,
    prec: Option<&dyn LinearOperator>,
    b: &[f64],
    x: &mut [f64],
    config: &GmresConfig,
) -> SolveResult {
    let n = b.len();
    debug_assert_eq!(x.len(), n);
    debug_assert_eq!(a.rows(), n);
    if n == 0 {
        return SolveResult::trivial(0.0);
    }

    let m = config.restart.clamp(1, n);
    let mut work = vec![0.0; n];
    let mut r = vec![0.0; n];
    let mut z = vec![0.0; n];

    residual(a, b, x, &mut work, &mut r);
    precondition(prec, &r, &mut z);
    let initial = vec_norm(&z);
    if initial < BREAKDOWN {
        return SolveResult::trivial(vec_norm(&r));
    }
    let target = config.tol * initial;

    let mut iterations = 0;
    let mut converged = false;
    while iterations < config.max_iter && !converged {
        residual(a, b, x, &mut work, &mut r);
        precondition(prec, &r, &mut z);
        let beta = vec_norm(&z);
        if beta <= target || beta < BREAKDOWN {
            converged = true;
            break;
        }

        let mut arnoldi = Arnoldi::new(&z, beta, m);
        while arnoldi.len() < m && iterations < config.max_iter {
            iterations += 1;
            a.apply_vec(&arnoldi.basis[arnoldi.len()], &mut work);
            let mut w = vec![0.0; n];
            precondition(prec, &work, &mut w);
            let subdiag = arnoldi.extend(w);
            if arnoldi.residual_estimate() < target || subdiag < BREAKDOWN {
                converged = true;
                break;
            }
        }
        arnoldi.update(x);
    }

    residual(a, b, x, &mut work, &mut r);
    SolveResult {
        iterations,
        residual: vec_norm(&r),
        converged,
    }
}

// ═══════════════════════════════ tests ═══════════════════════════════
