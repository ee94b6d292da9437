// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Solver Builders
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Linear solvers selected by name from a [`SolverParams`] block.
//!
//! A solver wrapped in [`SolverOperator`] is itself a [`LinearOperator`]
//! (`y ≈ A⁻¹ x` from a zero guess), which is how smoothers and inner
//! solves are plugged into multigrid levels and preconditioners.

use std::rc::Rc;

use profugus_types::config::{PreconditionerType, SolverParams, SolverType};
use profugus_types::error::{ProfugusError, ProfugusResult};

use crate::gmres::{gmres_solve, GmresConfig, SolveResult};
use crate::linalg::{vec_axpy, vec_norm, vec_sub};
use crate::operator::{JacobiPreconditioner, LinearOperator};
use crate::sparse::Matrix;

pub trait LinearSolver {
    /// Solve `A x = b`; `x` holds the initial guess.
    fn solve(&self, b: &[f64], x: &mut [f64]) -> SolveResult;

    fn size(&self) -> usize;
}

/// Damped preconditioned Richardson: `x += ω M⁻¹ (b - A x)`.
///
/// With `tolerance == 0` it runs exactly `max_itr` sweeps and reports
/// converged, which makes it a fixed-cost smoother.
pub struct Richardson {
    op: Rc<dyn LinearOperator>,
    prec: Option<Rc<dyn LinearOperator>>,
    max_itr: usize,
    tolerance: f64,
    damping: f64,
}

impl Richardson {
    pub fn new(
        op: Rc<dyn LinearOperator>,
        prec: Option<Rc<dyn LinearOperator>>,
        params: &SolverParams,
    ) -> Self {
        Richardson {
            op,
            prec,
            max_itr: params.max_itr,
            tolerance: params.tolerance,
            damping: params.damping,
        }
    }
}

impl LinearSolver for Richardson {
    fn solve(&self, b: &[f64], x: &mut [f64]) -> SolveResult {
        let n = b.len();
        let mut ax = vec![0.0; n];
        let mut r = vec![0.0; n];
        let mut z = vec![0.0; n];

        let b_norm = vec_norm(b);
        let mut res_norm = f64::INFINITY;
        for it in 0..self.max_itr {
            self.op.apply_vec(x, &mut ax);
            vec_sub(b, &ax, &mut r);
            res_norm = vec_norm(&r);
            if self.tolerance > 0.0 && res_norm <= self.tolerance * b_norm {
                return SolveResult {
                    iterations: it,
                    residual: res_norm,
                    converged: true,
                };
            }
            match &self.prec {
                Some(m) => m.apply_vec(&r, &mut z),
                None => z.copy_from_slice(&r),
            }
            vec_axpy(self.damping, &z, x);
        }
        if self.tolerance > 0.0 {
            self.op.apply_vec(x, &mut ax);
            vec_sub(b, &ax, &mut r);
            res_norm = vec_norm(&r);
        }
        SolveResult {
            iterations: self.max_itr,
            residual: res_norm,
            converged: self.tolerance == 0.0 || res_norm <= self.tolerance * b_norm,
        }
    }

    fn size(&self) -> usize {
        self.op.rows()
    }
}

pub struct Gmres {
    op: Rc<dyn LinearOperator>,
    prec: Option<Rc<dyn LinearOperator>>,
    config: GmresConfig,
}

impl Gmres {
    pub fn new(
        op: Rc<dyn LinearOperator>,
        prec: Option<Rc<dyn LinearOperator>>,
        params: &SolverParams,
    ) -> Self {
        Gmres {
            op,
            prec,
            config: GmresConfig {
                restart: params.restart,
                max_iter: params.max_itr,
                tol: params.tolerance,
            },
        }
    }
}

impl LinearSolver for Gmres {
    fn solve(&self, b: &[f64], x: &mut [f64]) -> SolveResult {
        gmres_solve(self.op.as_ref(), self.prec.as_deref(), b, x, &self.config)
    }

    fn size(&self) -> usize {
        self.op.rows()
    }
}

/// `y = solve(A y = x)` from a zero initial guess.
pub struct SolverOperator {
    solver: Box<dyn LinearSolver>,
}

impl SolverOperator {
    pub fn new(solver: Box<dyn LinearSolver>) -> Self {
        SolverOperator { solver }
    }
}

impl LinearOperator for SolverOperator {
    fn rows(&self) -> usize {
        self.solver.size()
    }

    fn cols(&self) -> usize {
        self.solver.size()
    }

    fn apply_vec(&self, x: &[f64], y: &mut [f64]) {
        y.fill(0.0);
        self.solver.solve(x, y);
    }
}

/// Build the solver named in `params` around `op`.
pub fn build_solver(
    params: &SolverParams,
    op: Rc<dyn LinearOperator>,
    prec: Option<Rc<dyn LinearOperator>>,
) -> Box<dyn LinearSolver> {
    match params.solver_type {
        SolverType::Gmres => Box::new(Gmres::new(op, prec, params)),
        SolverType::Richardson => Box::new(Richardson::new(op, prec, params)),
    }
}

/// Build a matrix-based preconditioner. Multigrid needs the full problem
/// hierarchy and is assembled by the caller.
pub fn build_preconditioner(
    kind: PreconditionerType,
    matrix: &Matrix,
) -> ProfugusResult<Option<Rc<dyn LinearOperator>>> {
    match kind {
        PreconditionerType::None => Ok(None),
        PreconditionerType::Jacobi => Ok(Some(Rc::new(JacobiPreconditioner::new(
            &matrix.diagonal(),
        )))),
        PreconditionerType::Multigrid => Err(ProfugusError::ConfigError(
            "Multigrid preconditioner requires the energy hierarchy".to_string(),
        )),
    }
}
