// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — k-Eigenvalue Solvers
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Monte Carlo k-eigenvalue drivers.
//!
//! - [`KCodeSolver`]: classic power iteration over inactive then active
//!   cycles, with optional fission-density and fission-matrix tallies
//! - [`AndersonSolver`]: a few power iterations, then Anderson mixing of
//!   the `[g, k]` fixed point

use std::rc::Rc;
use std::sync::Arc;

use log::{info, warn};
use profugus_comm::Communicator;
use profugus_math::anderson::{anderson_solve, AndersonConfig};
use profugus_math::eigen::PowerIteration;
use profugus_types::config::McParams;
use profugus_types::error::{ProfugusError, ProfugusResult};
use serde::Serialize;

use crate::anderson_operator::{build_eigen_mesh, AndersonOperator};
use crate::fission_source::FissionSource;
use crate::geometry::MeshGeometry;
use crate::physics::Physics;
use crate::tally::{FissionMatrixTally, FissionTally, KeffTally, Tallier};
use crate::transporter::SourceTransporter;

/// Dominant eigenpair of the tallied fission matrix.
#[derive(Debug, Clone, Serialize)]
pub struct FissionMatrixSummary {
    pub num_cells: usize,
    pub num_entries: usize,
    pub keff: f64,
    pub converged: bool,
    pub source_shape: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeffResult {
    pub keff: f64,
    pub std_dev: f64,
    pub num_active_cycles: usize,
    pub cycle_estimates: Vec<f64>,
    pub converged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anderson_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fission_density: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fission_matrix: Option<FissionMatrixSummary>,
}

fn validate(params: &McParams) -> ProfugusResult<()> {
    if params.np == 0 {
        return Err(ProfugusError::ConfigError(
            "MC needs at least one particle per cycle".to_string(),
        ));
    }
    if params.keff_init <= 0.0 {
        return Err(ProfugusError::ConfigError(format!(
            "Initial keff must be positive, got {}",
            params.keff_init
        )));
    }
    Ok(())
}

fn build_source(
    geometry: &Arc<MeshGeometry>,
    physics: &Arc<Physics>,
    comm: &Rc<dyn Communicator>,
    params: &McParams,
) -> FissionSource {
    let mut source = FissionSource::new(
        Arc::clone(geometry),
        Arc::clone(physics),
        Rc::clone(comm),
        params.np,
    );
    if let Some(kde) = params.kde.as_ref() {
        source.set_kde(kde);
    }
    source
}

// ---------------------------------------------------------------------------
// k-code
// ---------------------------------------------------------------------------

pub struct KCodeSolver {
    transporter: SourceTransporter,
    source: FissionSource,
    comm: Rc<dyn Communicator>,
    params: McParams,
}

impl KCodeSolver {
    pub fn new(
        geometry: Arc<MeshGeometry>,
        physics: Arc<Physics>,
        comm: Rc<dyn Communicator>,
        params: &McParams,
    ) -> ProfugusResult<Self> {
        validate(params)?;
        if params.num_cycles <= params.num_inactive_cycles {
            return Err(ProfugusError::ConfigError(format!(
                "num_cycles ({}) must exceed num_inactive_cycles ({})",
                params.num_cycles, params.num_inactive_cycles
            )));
        }

        let mut tallier = Tallier::new();
        tallier.set_keff_tally(KeffTally::new(Rc::clone(&comm), params.keff_init));
        let eigen_mesh = build_eigen_mesh(&geometry, params.eigen_mesh)?;
        tallier.set_fission_tally(FissionTally::new(Rc::clone(&comm), eigen_mesh));
        if params.fission_matrix {
            tallier.set_fission_matrix_tally(FissionMatrixTally::new(
                Rc::clone(&comm),
                geometry.num_cells(),
            ));
        }

        let source = build_source(&geometry, &physics, &comm, params);
        let mut transporter =
            SourceTransporter::new(geometry, physics, Rc::clone(&comm), params.seed);
        transporter.set_tallier(tallier);

        Ok(KCodeSolver {
            transporter,
            source,
            comm,
            params: params.clone(),
        })
    }

    pub fn tallier(&self) -> &Tallier {
        self.transporter.tallier()
    }

    /// Run all cycles. Collective.
    pub fn solve(&mut self) -> ProfugusResult<KeffResult> {
        let master = self.comm.node() == 0;
        self.source.build_initial_source()?;
        let mut keff = self.params.keff_init;

        if master {
            info!(
                "k-code: {} particles, {} inactive + {} active cycles",
                self.params.np,
                self.params.num_inactive_cycles,
                self.params.num_cycles - self.params.num_inactive_cycles
            );
        }

        for cycle in 0..self.params.num_cycles {
            if cycle == self.params.num_inactive_cycles {
                self.transporter.tallier_mut().begin_active_cycles();
            }

            let mut sites = Vec::new();
            self.transporter.solve(&mut self.source, keff, &mut sites);
            self.transporter.tallier_mut().end_cycle();

            let Some(tally) = self.transporter.tallier().keff() else {
                return Err(ProfugusError::ConfigError("keff tally missing".to_string()));
            };
            keff = tally.latest();
            if master {
                let phase = if cycle < self.params.num_inactive_cycles { "inactive" } else { "active" };
                info!(
                    "cycle {:>4} ({phase:>8}): k = {keff:.5}  k_track = {:.5}  mean = {:.5} ± {:.5}",
                    cycle,
                    tally.latest_track(),
                    tally.mean(),
                    tally.std_dev()
                );
            }
            if !(keff > 0.0 && keff.is_finite()) {
                return Err(ProfugusError::SolverDiverged {
                    iteration: cycle,
                    message: format!("cycle estimate of k is {keff}"),
                });
            }
            self.source.build_source(sites)?;
        }

        let fission_matrix = match self.transporter.tallier_mut().fission_matrix_mut() {
            Some(fm) => {
                fm.build_matrix();
                let mut shape = Vec::new();
                let eig = fm.dominant_eigenpair(&PowerIteration::default(), &mut shape);
                if !eig.converged {
                    warn!("Fission-matrix power iteration did not converge");
                }
                Some(FissionMatrixSummary {
                    num_cells: fm.processor().n(),
                    num_entries: fm.processor().graph().len(),
                    keff: eig.keff,
                    converged: eig.converged,
                    source_shape: shape,
                })
            }
            None => None,
        };

        let tallier = self.transporter.tallier();
        let (mean, std_dev, estimates) = match tallier.keff() {
            Some(k) => (k.mean(), k.std_dev(), k.cycle_estimates().to_vec()),
            None => (keff, 0.0, Vec::new()),
        };
        if master {
            info!("k-code done: keff = {mean:.5} ± {std_dev:.5}");
        }

        Ok(KeffResult {
            keff: mean,
            std_dev,
            num_active_cycles: estimates.len(),
            cycle_estimates: estimates,
            converged: true,
            anderson_iterations: None,
            fission_density: tallier.fission().map(|f| f.density()),
            fission_matrix,
        })
    }
}

// ---------------------------------------------------------------------------
// Anderson
// ---------------------------------------------------------------------------

pub struct AndersonSolver {
    operator: AndersonOperator,
    comm: Rc<dyn Communicator>,
    params: McParams,
}

impl AndersonSolver {
    pub fn new(
        geometry: Arc<MeshGeometry>,
        physics: Arc<Physics>,
        comm: Rc<dyn Communicator>,
        params: &McParams,
    ) -> ProfugusResult<Self> {
        validate(params)?;
        if params.anderson.num_inactive_cycles == 0 {
            return Err(ProfugusError::ConfigError(
                "Anderson needs at least one power iteration to seed the source".to_string(),
            ));
        }
        let eigen_mesh = build_eigen_mesh(&geometry, params.eigen_mesh)?;
        let source = build_source(&geometry, &physics, &comm, params);
        let transporter = SourceTransporter::new(geometry, physics, Rc::clone(&comm), params.seed);
        let operator = AndersonOperator::new(transporter, source, Rc::clone(&comm), eigen_mesh);
        Ok(AndersonSolver {
            operator,
            comm,
            params: params.clone(),
        })
    }

    pub fn operator(&self) -> &AndersonOperator {
        &self.operator
    }

    /// Collective.
    pub fn solve(&mut self) -> ProfugusResult<KeffResult> {
        let master = self.comm.node() == 0;
        let op = &mut self.operator;
        op.build_tallies(self.params.keff_init);
        op.source_mut().build_initial_source()?;

        let mut keff = self.params.keff_init;
        let mut estimates = Vec::with_capacity(self.params.anderson.num_inactive_cycles);
        for cycle in 0..self.params.anderson.num_inactive_cycles {
            op.iterate(keff);
            keff = op.latest_keff();
            estimates.push(keff);
            if master {
                info!("power iteration {cycle:>3}: k = {keff:.5}");
            }
            op.update_source()?;
        }

        let mut v = op.initialize_anderson();
        let config = AndersonConfig::from(&self.params.anderson);
        let result = anderson_solve(&mut *op, &mut v, &config)?;
        if !result.converged {
            warn!(
                "Anderson k-eigenvalue solve stopped at |f| = {:.3e} after {} iterations; using last iterate",
                result.residual, result.iterations
            );
        }
        let keff = op.finalize_anderson(&v)?;
        if master {
            info!(
                "Anderson done: keff = {keff:.5} after {} iterations (|f| = {:.3e})",
                result.iterations, result.residual
            );
        }

        let n = v.len() - 1;
        Ok(KeffResult {
            keff,
            std_dev: 0.0,
            num_active_cycles: 0,
            cycle_estimates: estimates,
            converged: result.converged,
            anderson_iterations: Some(result.iterations),
            fission_density: Some(v[..n].to_vec()),
            fission_matrix: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use profugus_comm::{LocalCluster, SerialComm};
    use profugus_types::config::{AndersonParams, KeffSolverType};
    use profugus_types::state::CartesianMesh;
    use profugus_types::xs::{CrossSections, MaterialXs};

    fn one_group(c: f64, nusigf: f64) -> Arc<Physics> {
        let mut scat = Array2::zeros((1, 1));
        scat[[0, 0]] = c;
        let mut xs = CrossSections::new(1, 0);
        xs.add(MaterialXs {
            name: "fuel".to_string(),
            total: vec![1.0],
            sigma_f: vec![nusigf / 2.4],
            nu_sigma_f: vec![nusigf],
            chi: vec![1.0],
            scattering: vec![scat],
        })
        .unwrap();
        Arc::new(Physics::new(Arc::new(xs)))
    }

    fn reflected_box() -> Arc<MeshGeometry> {
        let mesh = CartesianMesh::uniform([2, 2, 2], [1.0, 1.0, 1.0]).unwrap();
        Arc::new(MeshGeometry::new(Arc::new(mesh), vec![0; 8], [true; 6]).unwrap())
    }

    fn params(np: usize) -> McParams {
        McParams {
            np,
            num_cycles: 12,
            num_inactive_cycles: 4,
            seed: 2024,
            keff_init: 1.0,
            solver: KeffSolverType::Kcode,
            fission_matrix: true,
            eigen_mesh: None,
            anderson: AndersonParams::default(),
            kde: None,
        }
    }

    #[test]
    fn test_kcode_infinite_medium() {
        // k_inf = 0.5 / (1 - 0.6) = 1.25
        let comm: Rc<dyn Communicator> = Rc::new(SerialComm::new());
        let mut solver = KCodeSolver::new(reflected_box(), one_group(0.6, 0.5), comm, &params(1000)).unwrap();
        let result = solver.solve().unwrap();
        assert_eq!(result.num_active_cycles, 8);
        assert!((result.keff - 1.25).abs() < 0.04, "k = {}", result.keff);
        assert!(result.std_dev > 0.0 && result.std_dev < 0.05);

        let fm = result.fission_matrix.unwrap();
        assert_eq!(fm.num_cells, 8);
        assert!((fm.keff - 1.25).abs() < 0.06, "fission matrix k = {}", fm.keff);
        let density = result.fission_density.unwrap();
        assert!((density.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_kcode_requires_active_cycles() {
        let comm: Rc<dyn Communicator> = Rc::new(SerialComm::new());
        let mut p = params(10);
        p.num_cycles = 4;
        let err = KCodeSolver::new(reflected_box(), one_group(0.6, 0.5), comm, &p).err();
        assert!(matches!(err, Some(ProfugusError::ConfigError(_))));
    }

    #[test]
    fn test_kcode_identical_on_every_rank() {
        let results = LocalCluster::run(2, |comm| {
            let mut p = params(400);
            p.fission_matrix = false;
            let mut solver = KCodeSolver::new(reflected_box(), one_group(0.6, 0.5), comm, &p).unwrap();
            solver.solve().unwrap().keff
        });
        assert_eq!(results[0], results[1]);
        assert!((results[0] - 1.25).abs() < 0.06, "k = {}", results[0]);
    }

    #[test]
    fn test_kcode_fission_matrix_on_two_ranks() {
        let results = LocalCluster::run(2, |comm| {
            let mut solver =
                KCodeSolver::new(reflected_box(), one_group(0.6, 0.5), comm, &params(400)).unwrap();
            let result = solver.solve().unwrap();
            let fm = result.fission_matrix.unwrap();
            (result.keff, fm.num_entries, fm.keff, fm.source_shape)
        });
        assert_eq!(results[0], results[1]);
        let (k, entries, fm_k, shape) = &results[0];
        assert!((k - 1.25).abs() < 0.06, "k = {k}");
        assert!(*entries > 0 && *entries <= 64);
        assert!((fm_k - 1.25).abs() < 0.1, "fission matrix k = {fm_k}");
        assert_eq!(shape.len(), 8);
    }

    #[test]
    fn test_kcode_fission_matrix_with_idle_ranks() {
        // fewer particles than ranks: some ranks never tally an entry
        let results = LocalCluster::run(8, |comm| {
            let mut p = params(5);
            p.num_cycles = 2;
            p.num_inactive_cycles = 0;
            let mut solver = KCodeSolver::new(reflected_box(), one_group(0.6, 2.0), comm, &p).unwrap();
            let result = solver.solve().unwrap();
            let fm = result.fission_matrix.unwrap();
            (result.keff, fm.num_cells, fm.num_entries)
        });
        for r in &results[1..] {
            assert_eq!(r, &results[0]);
        }
        let (k, cells, entries) = results[0];
        assert!(k > 0.0);
        assert_eq!(cells, 8);
        assert!(entries > 0);
    }

    #[test]
    fn test_anderson_infinite_medium() {
        let comm: Rc<dyn Communicator> = Rc::new(SerialComm::new());
        let mut p = params(2000);
        p.solver = KeffSolverType::Anderson;
        p.eigen_mesh = Some([2, 1, 1]);
        p.anderson = AndersonParams {
            depth: 3,
            max_itr: 6,
            tolerance: 1e-2,
            beta: 1.0,
            num_inactive_cycles: 3,
        };
        let mut solver = AndersonSolver::new(reflected_box(), one_group(0.6, 0.5), comm, &p).unwrap();
        let result = solver.solve().unwrap();
        assert!((result.keff - 1.25).abs() < 0.06, "k = {}", result.keff);
        assert!(result.anderson_iterations.unwrap() <= 6);
        let g = result.fission_density.unwrap();
        assert_eq!(g.len(), 2);
        assert!(g.iter().all(|&x| x > 0.3 && x < 0.7), "{g:?}");
    }
}
