// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Time-Dependent Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Backward-Euler SPN: `(A + V/(vΔt)) φⁿ⁺¹ = q V + V φⁿ/(vΔt)`.
//!
//! [`TimeDependentSolver::solve`] handles a single external source with a
//! zero initial guess; [`TimeDependentSolver::step`] adds the previous
//! flux as history source and advances the step counter.

use std::rc::Rc;

use log::{info, warn};
use profugus_math::gmres::SolveResult;
use profugus_math::solvers::{build_solver, LinearSolver};
use profugus_types::config::ProblemParams;
use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::require;

use crate::fixed_source_solver::build_system_preconditioner;
use crate::linear_system::LinearSystemFv;
use crate::state::State;
use crate::timestep::Timestep;

pub struct TimeDependentSolver {
    system: Rc<LinearSystemFv>,
    solver: Box<dyn LinearSolver>,
    timestep: Timestep,
}

impl TimeDependentSolver {
    /// `system` must have been assembled with
    /// [`LinearSystemFv::time_dependent`].
    pub fn new(params: &ProblemParams, system: Rc<LinearSystemFv>) -> ProfugusResult<Self> {
        if params.adjoint || system.is_adjoint() {
            return Err(ProfugusError::ConfigError(
                "Adjoint is not supported in time-dependent SPN".to_string(),
            ));
        }
        let timestep = system.timestep().cloned().ok_or_else(|| {
            ProfugusError::ConfigError("Linear system has no timestep".to_string())
        })?;
        let prec = build_system_preconditioner(params, &system)?;
        let solver = build_solver(&params.linear_solver, system.get_operator(), prec);
        Ok(TimeDependentSolver {
            system,
            solver,
            timestep,
        })
    }

    pub fn system(&self) -> &Rc<LinearSystemFv> {
        &self.system
    }

    pub fn timestep(&self) -> &Timestep {
        &self.timestep
    }

    /// Solve for the external source `q` (`q_g V` per unknown) from a zero
    /// initial guess.
    pub fn solve(&self, q: &[f64], state: &mut State) -> SolveResult {
        require!(q.len() == self.system.get_map().size());
        require!(state.values().len() == q.len());
        state.values_mut().fill(0.0);
        let result = self.solver.solve(q, state.values_mut());
        if !result.converged {
            warn!(
                "Time-dependent solve did not converge in {} iterations (residual {:.3e})",
                result.iterations, result.residual
            );
        }
        result
    }

    /// Advance `state` from `tⁿ` to `tⁿ⁺¹` under the external source `q`.
    pub fn step(&mut self, q: &[f64], state: &mut State) -> SolveResult {
        let rhs = self.history_source(q, state);
        let result = self.solver.solve(&rhs, state.values_mut());
        if result.converged {
            info!(
                "Step {} (t = {:.4e} s) converged in {} iterations",
                self.timestep.cycle(),
                self.timestep.time() + self.timestep.dt(),
                result.iterations
            );
        } else {
            warn!(
                "Step {} did not converge in {} iterations (residual {:.3e})",
                self.timestep.cycle(),
                result.iterations,
                result.residual
            );
        }
        self.timestep.advance();
        result
    }

    fn history_source(&self, q: &[f64], state: &State) -> Vec<f64> {
        let map = self.system.get_map();
        let mesh = self.system.mesh();
        require!(q.len() == map.size());
        require!(state.values().len() == map.size());

        let mut rhs = q.to_vec();
        for cell in 0..map.num_cells {
            let (i, j, k) = mesh.ijk_of(cell);
            let v = mesh.volume(i, j, k);
            for g in 0..map.num_groups {
                let row = map.index(cell, g);
                rhs[row] += self.timestep.coefficient(g) * v * state.flux(cell, g);
            }
        }
        rhs
    }
}
