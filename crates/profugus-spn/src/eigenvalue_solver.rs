// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — SPN Eigenvalue Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! k-eigenvalue of `A φ = (1/k) B φ` by power iteration on `A⁻¹ B`.
//!
//! Every outer iteration is one fission-source evaluation and one inner
//! linear solve with the configured solver and preconditioner.

use std::cell::Cell;
use std::rc::Rc;

use log::{info, warn};
use profugus_math::eigen::{EigenResult, PowerIteration};
use profugus_math::operator::LinearOperator;
use profugus_math::solvers::{build_solver, LinearSolver};
use profugus_types::config::ProblemParams;
use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::require;

use crate::fixed_source_solver::build_system_preconditioner;
use crate::linear_system::LinearSystemFv;
use crate::state::State;

pub struct EigenvalueSolver {
    system: Rc<LinearSystemFv>,
    inner: Box<dyn LinearSolver>,
    power: PowerIteration,
    k_init: f64,
}

impl EigenvalueSolver {
    pub fn new(params: &ProblemParams, system: Rc<LinearSystemFv>) -> ProfugusResult<Self> {
        let prec = build_system_preconditioner(params, &system)?;
        let inner = build_solver(&params.linear_solver, system.get_operator(), prec);
        Ok(EigenvalueSolver {
            system,
            inner,
            power: PowerIteration::from(&params.eigen),
            k_init: params.eigen.k_init,
        })
    }

    pub fn system(&self) -> &Rc<LinearSystemFv> {
        &self.system
    }

    /// Solve for the fundamental mode. A non-zero flux in `state` is the
    /// initial guess, otherwise a flat one is used; on return `state` holds
    /// the eigenvector.
    pub fn solve(&self, state: &mut State) -> ProfugusResult<EigenResult> {
        let n = self.system.get_map().size();
        require!(state.values().len() == n);

        let mut x = if state.values().iter().any(|&v| v != 0.0) {
            state.values().to_vec()
        } else {
            vec![1.0; n]
        };

        let fission = self.system.get_fission_matrix();
        let mut source = vec![0.0; n];
        let unconverged_inner = Cell::new(0usize);
        let mut apply = |x: &[f64], y: &mut [f64]| {
            fission.apply_vec(x, &mut source);
            y.fill(0.0);
            if !self.inner.solve(&source, y).converged {
                unconverged_inner.set(unconverged_inner.get() + 1);
            }
        };
        let result = self.power.solve(&mut apply, &mut x, self.k_init);

        if unconverged_inner.get() > 0 {
            warn!(
                "{} inner solves did not converge during the eigenvalue iteration",
                unconverged_inner.get()
            );
        }
        if !result.keff.is_finite() || result.keff <= 0.0 {
            return Err(ProfugusError::SolverDiverged {
                iteration: result.iterations,
                message: format!("k-eigenvalue estimate {} is not positive", result.keff),
            });
        }
        if result.converged {
            info!(
                "k-eigenvalue {:.8} converged in {} iterations",
                result.keff, result.iterations
            );
        }

        state.values_mut().copy_from_slice(&x);
        Ok(result)
    }
}
