// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Problem Execution
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Dispatch a set-up problem to the SPN or Monte Carlo solvers.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use log::info;
use profugus_comm::{Communicator, LocalCluster, SerialComm};
use profugus_mc::geometry::MeshGeometry;
use profugus_mc::keff_solver::{AndersonSolver, KCodeSolver, KeffResult};
use profugus_mc::physics::Physics;
use profugus_spn::dimensions::Dimensions;
use profugus_spn::eigenvalue_solver::EigenvalueSolver;
use profugus_spn::fixed_source_solver::FixedSourceSolver;
use profugus_spn::linear_system::LinearSystemFv;
use profugus_spn::state::State;
use profugus_spn::time_dependent_solver::TimeDependentSolver;
use profugus_spn::timestep::Timestep;
use profugus_types::config::{KeffSolverType, McParams, ProblemMode, ProblemType};
use profugus_types::error::{ProfugusError, ProfugusResult};
use serde::Serialize;

use crate::problem_builder::ProblemBuilder;

#[derive(Debug, Clone, Serialize)]
pub struct SpnOutput {
    pub mode: ProblemMode,
    /// Absent in fixed-source mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keff: Option<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Time reached; time-dependent mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    pub flux: State,
}

#[derive(Debug, Clone, Serialize)]
pub struct McOutput {
    pub nodes: usize,
    pub result: KeffResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutput {
    Spn(SpnOutput),
    Mc(McOutput),
}

/// Run the problem. `nodes` is the number of Monte Carlo ranks; SPN runs
/// on one.
pub fn run(builder: &ProblemBuilder, nodes: usize) -> ProfugusResult<RunOutput> {
    let start = Instant::now();
    let output = match builder.params().problem_type {
        ProblemType::Spn => RunOutput::Spn(run_spn(builder)?),
        ProblemType::Mc => RunOutput::Mc(run_mc(builder, nodes)?),
    };
    info!("Run finished in {:.3} s", start.elapsed().as_secs_f64());
    Ok(output)
}

fn run_spn(builder: &ProblemBuilder) -> ProfugusResult<SpnOutput> {
    let params = builder.params();
    let dims = Dimensions::new(params.spn_order)?;
    let mat = Arc::new(builder.mat_db()?);
    let mesh = Arc::clone(builder.mesh());
    let system = match (params.problem_mode, &params.timestep) {
        (ProblemMode::TimeDependent, Some(ts)) => {
            let timestep = Timestep::from_params(ts, mat.num_groups())?;
            LinearSystemFv::time_dependent(params, dims, mat, mesh, timestep)?
        }
        (ProblemMode::TimeDependent, None) => {
            return Err(ProfugusError::ConfigError(
                "timestep control block not defined in input.".to_string(),
            ))
        }
        _ => LinearSystemFv::new(params, dims, mat, mesh)?,
    };
    let system = Rc::new(system);
    if let Some(path) = params.matrix_file.as_deref() {
        system.write_matrix_file(path)?;
        info!("Wrote operator to {path}");
    }

    let mut state = State::new(system.get_map());
    match params.problem_mode {
        ProblemMode::Fixed => {
            let solver = FixedSourceSolver::new(params, system)?;
            let result = solver.solve(&mut state);
            Ok(SpnOutput {
                mode: ProblemMode::Fixed,
                keff: None,
                iterations: result.iterations,
                converged: result.converged,
                time: None,
                flux: state,
            })
        }
        ProblemMode::Eigenvalue => {
            let solver = EigenvalueSolver::new(params, system)?;
            let result = solver.solve(&mut state)?;
            Ok(SpnOutput {
                mode: ProblemMode::Eigenvalue,
                keff: Some(result.keff),
                iterations: result.iterations,
                converged: result.converged,
                time: None,
                flux: state,
            })
        }
        ProblemMode::TimeDependent => {
            let num_steps = params.timestep.as_ref().map_or(1, |ts| ts.num_steps);
            let mut solver = TimeDependentSolver::new(params, system)?;
            let q = solver.system().build_rhs()?;
            let mut iterations = 0;
            let mut converged = true;
            for _ in 0..num_steps {
                let result = solver.step(&q, &mut state);
                iterations += result.iterations;
                converged &= result.converged;
            }
            Ok(SpnOutput {
                mode: ProblemMode::TimeDependent,
                keff: None,
                iterations,
                converged,
                time: Some(solver.timestep().time()),
                flux: state,
            })
        }
    }
}

fn solve_keff(
    geometry: &Arc<MeshGeometry>,
    physics: &Arc<Physics>,
    comm: Rc<dyn Communicator>,
    params: &McParams,
) -> ProfugusResult<KeffResult> {
    match params.solver {
        KeffSolverType::Kcode => {
            KCodeSolver::new(Arc::clone(geometry), Arc::clone(physics), comm, params)?.solve()
        }
        KeffSolverType::Anderson => {
            AndersonSolver::new(Arc::clone(geometry), Arc::clone(physics), comm, params)?.solve()
        }
    }
}

fn run_mc(builder: &ProblemBuilder, nodes: usize) -> ProfugusResult<McOutput> {
    let params = builder.params();
    if params.problem_mode != ProblemMode::Eigenvalue {
        return Err(ProfugusError::ConfigError(format!(
            "{:?} Monte Carlo is not supported; use eigenvalue mode",
            params.problem_mode
        )));
    }
    if nodes == 0 {
        return Err(ProfugusError::ConfigError(
            "Need at least one node".to_string(),
        ));
    }

    let geometry = Arc::new(MeshGeometry::new(
        Arc::clone(builder.mesh()),
        builder.matids().to_vec(),
        params.reflecting_faces(),
    )?);
    let physics = Arc::new(Physics::new(Arc::clone(builder.xs())));
    info!(
        "Monte Carlo {:?} on {nodes} node(s), {} particles per cycle",
        params.mc.solver, params.mc.np
    );

    let result = if nodes == 1 {
        solve_keff(&geometry, &physics, Rc::new(SerialComm::new()), &params.mc)?
    } else {
        let results = LocalCluster::run(nodes, |comm| {
            solve_keff(&geometry, &physics, comm, &params.mc)
        });
        let mut master = None;
        for result in results {
            let result = result?;
            if master.is_none() {
                master = Some(result);
            }
        }
        master.ok_or_else(|| ProfugusError::Comm("Cluster returned no results".to_string()))?
    };

    Ok(McOutput { nodes, result })
}

/// Write `output` as pretty-printed JSON.
pub fn write_output(path: impl AsRef<Path>, output: &RunOutput) -> ProfugusResult<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, output)?;
    Ok(())
}
