// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Fixed-Source Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `A φ = q` for an external isotropic source.

use std::rc::Rc;

use log::{info, warn};
use profugus_math::gmres::SolveResult;
use profugus_math::operator::LinearOperator;
use profugus_math::solvers::{build_preconditioner, build_solver, LinearSolver};
use profugus_types::config::{PreconditionerType, ProblemParams};
use profugus_types::error::ProfugusResult;
use profugus_types::require;

use crate::energy_multigrid::EnergyMultigrid;
use crate::linear_system::LinearSystemFv;
use crate::state::State;

/// Preconditioner named by the `Linear Solver` block; multigrid builds the
/// energy hierarchy below `system`.
pub fn build_system_preconditioner(
    params: &ProblemParams,
    system: &LinearSystemFv,
) -> ProfugusResult<Option<Rc<dyn LinearOperator>>> {
    match params.linear_solver.preconditioner {
        PreconditionerType::Multigrid => {
            Ok(Some(Rc::new(EnergyMultigrid::new(params, system)?)))
        }
        kind => build_preconditioner(kind, system.get_matrix()),
    }
}

pub struct FixedSourceSolver {
    system: Rc<LinearSystemFv>,
    solver: Box<dyn LinearSolver>,
    rhs: Vec<f64>,
}

impl FixedSourceSolver {
    pub fn new(params: &ProblemParams, system: Rc<LinearSystemFv>) -> ProfugusResult<Self> {
        let prec = build_system_preconditioner(params, &system)?;
        let solver = build_solver(&params.linear_solver, system.get_operator(), prec);
        let rhs = system.build_rhs()?;
        Ok(FixedSourceSolver {
            system,
            solver,
            rhs,
        })
    }

    pub fn system(&self) -> &Rc<LinearSystemFv> {
        &self.system
    }

    /// Solve into `state`, using its current flux as the initial guess.
    pub fn solve(&self, state: &mut State) -> SolveResult {
        require!(state.values().len() == self.rhs.len());
        let result = self.solver.solve(&self.rhs, state.values_mut());
        if result.converged {
            info!(
                "Fixed-source solve converged in {} iterations (residual {:.3e})",
                result.iterations, result.residual
            );
        } else {
            warn!(
                "Fixed-source solve did not converge in {} iterations (residual {:.3e})",
                result.iterations, result.residual
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use profugus_types::config::SolverParams;
    use profugus_types::state::CartesianMesh;
    use profugus_types::xs::{CrossSections, MaterialXs};
    use std::sync::Arc;

    use crate::dimensions::Dimensions;
    use crate::mat_db::MatDb;

    fn system(params: &ProblemParams, c: f64) -> Rc<LinearSystemFv> {
        let mut scat = Array2::zeros((1, 1));
        scat[[0, 0]] = c;
        let mut xs = CrossSections::new(1, 0);
        xs.add(MaterialXs::absorber("m", vec![1.0], scat)).unwrap();
        let mesh = CartesianMesh::uniform([4, 3, 2], [0.5, 1.0, 2.0]).unwrap();
        let mat = MatDb::new(Arc::new(xs), vec![0; 24]).unwrap();
        Rc::new(LinearSystemFv::new(params, Dimensions::new(1).unwrap(), Arc::new(mat), Arc::new(mesh)).unwrap())
    }

    fn params(prec: PreconditionerType) -> ProblemParams {
        ProblemParams {
            source_strength: 2.0,
            linear_solver: SolverParams {
                tolerance: 1e-10,
                preconditioner: prec,
                ..SolverParams::default()
            },
            ..ProblemParams::default()
        }
    }

    #[test]
    fn test_infinite_medium_flux_every_preconditioner() {
        // reflecting box: φ = q / Σa = 2 / 0.4
        for prec in [
            PreconditionerType::None,
            PreconditionerType::Jacobi,
            PreconditionerType::Multigrid,
        ] {
            let p = params(prec);
            let solver = FixedSourceSolver::new(&p, system(&p, 0.6)).unwrap();
            let mut state = State::new(solver.system().get_map());
            let result = solver.solve(&mut state);
            assert!(result.converged, "{prec:?}: residual {}", result.residual);
            for &phi in state.values() {
                assert!((phi - 5.0).abs() < 1e-7, "{prec:?}: φ = {phi}");
            }
        }
    }

    #[test]
    fn test_vacuum_flux_peaks_in_the_centre() {
        let p = ProblemParams {
            boundary: profugus_types::config::BoundaryKind::Vacuum,
            ..params(PreconditionerType::Jacobi)
        };
        let solver = FixedSourceSolver::new(&p, system(&p, 0.6)).unwrap();
        let mut state = State::new(solver.system().get_map());
        assert!(solver.solve(&mut state).converged);
        let mesh = solver.system().mesh();
        let corner = state.flux(mesh.cardinal(0, 0, 0), 0);
        let inner = state.flux(mesh.cardinal(1, 1, 0), 0);
        assert!(inner > corner, "{inner} <= {corner}");
        assert!(state.values().iter().all(|&v| v > 0.0 && v < 5.0));
    }
}
