// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Energy Multigrid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Multigrid in energy: a V-cycle preconditioner over successively
//! group-collapsed copies of the same spatial problem.
//!
//! Implements:
//! - **Coarsening**: `Coarse Factor` fine groups per coarse group, leftover
//!   groups form one partial group, until a single group remains or
//!   `Max Depth` coarse levels exist
//! - **Restriction / prolongation**: group average and injection (from
//!   [`crate::energy_grid_transfer`])
//! - **Smoother**: any solver of the `Smoother` block, preconditioned by its
//!   own preconditioner or by the level diagonal
//!
//! The cycle starts by restricting, not smoothing, so that back-to-back
//! cycles smooth the finest level once between them.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use log::debug;
use profugus_math::operator::{JacobiPreconditioner, LinearOperator};
use profugus_math::solvers::{build_preconditioner, build_solver, LinearSolver};
use profugus_math::sparse::Matrix;
use profugus_types::config::{MultigridParams, ProblemParams, SolverParams};
use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::require;

use crate::energy_collapse::collapse_all_mats;
use crate::energy_grid_transfer::{EnergyProlongation, EnergyRestriction};
use crate::linear_system::{LinearSystemFv, UnknownMap};

#[derive(Debug, Clone)]
struct LevelVectors {
    solution: Vec<f64>,
    residual: Vec<f64>,
    rhs: Vec<f64>,
}

impl LevelVectors {
    fn new(n: usize) -> Self {
        LevelVectors {
            solution: vec![0.0; n],
            residual: vec![0.0; n],
            rhs: vec![0.0; n],
        }
    }
}

/// One energy level of the hierarchy.
struct Level {
    operator: Rc<dyn LinearOperator>,
    map: UnknownMap,
    smoother: Box<dyn LinearSolver>,
    preconditioner: Option<Rc<dyn LinearOperator>>,
    /// To the next coarser level; absent on the coarsest.
    restriction: Option<EnergyRestriction>,
    /// From the next coarser level; absent on the coarsest.
    prolongation: Option<EnergyProlongation>,
    vectors: RefCell<LevelVectors>,
}

impl Level {
    fn new(matrix: &Rc<Matrix>, map: UnknownMap, params: &SolverParams) -> ProfugusResult<Self> {
        let operator: Rc<dyn LinearOperator> = matrix.clone();
        let preconditioner = build_preconditioner(params.preconditioner, matrix)?;
        let smoother = build_smoother(params, &operator, preconditioner.clone(), matrix);
        Ok(Level {
            operator,
            map,
            smoother,
            preconditioner,
            restriction: None,
            prolongation: None,
            vectors: RefCell::new(LevelVectors::new(map.size())),
        })
    }
}

fn build_smoother(
    params: &SolverParams,
    operator: &Rc<dyn LinearOperator>,
    preconditioner: Option<Rc<dyn LinearOperator>>,
    matrix: &Matrix,
) -> Box<dyn LinearSolver> {
    let prec = preconditioner
        .unwrap_or_else(|| Rc::new(JacobiPreconditioner::new(&matrix.diagonal())));
    build_solver(params, Rc::clone(operator), Some(prec))
}

/// Group counts of every level for `num_groups` fine groups, with the
/// collapse vector leading to each coarse level.
pub fn plan_levels(num_groups: usize, coarse_factor: usize, max_depth: usize) -> Vec<(usize, Vec<usize>)> {
    require!(coarse_factor > 1);
    require!(max_depth > 0);
    let mut plan = vec![(num_groups, Vec::new())];
    let mut new_groups = num_groups;
    let mut level = 0;
    loop {
        level += 1;
        let old_groups = new_groups;
        new_groups = old_groups / coarse_factor;
        let mut collapse = vec![coarse_factor; new_groups];
        let extra = old_groups % coarse_factor;
        if extra > 0 {
            new_groups += 1;
            collapse.push(extra);
        }
        plan.push((new_groups, collapse));
        if new_groups == 1 || level == max_depth {
            break;
        }
    }
    plan
}

/// Energy multigrid V-cycle, usable as a preconditioner.
pub struct EnergyMultigrid {
    levels: Vec<Level>,
}

impl EnergyMultigrid {
    /// Build the hierarchy below `fine` using the `Preconditioner` block of
    /// `params`.
    pub fn new(params: &ProblemParams, fine: &LinearSystemFv) -> ProfugusResult<Self> {
        let mg: &MultigridParams = &params.preconditioner;
        if mg.coarse_factor < 2 {
            return Err(ProfugusError::ConfigError(format!(
                "Coarse Factor must be at least 2, got {}",
                mg.coarse_factor
            )));
        }
        if mg.max_depth == 0 {
            return Err(ProfugusError::ConfigError(
                "Max Depth must be at least 1".to_string(),
            ));
        }

        let plan = plan_levels(fine.get_map().num_groups, mg.coarse_factor, mg.max_depth);
        let mut levels = vec![Level::new(fine.get_matrix(), fine.get_map(), &mg.smoother)?];
        let mut mat = Arc::clone(fine.mat_db());
        let mut last_matrix = Rc::clone(fine.get_matrix());
        let mut timestep = fine.timestep().cloned();

        for (_, collapse) in plan.iter().skip(1) {
            let weights = vec![1.0; mat.num_groups()];
            mat = Arc::new(collapse_all_mats(&mat, collapse, &weights)?);
            timestep = timestep.map(|t| t.collapse(collapse));
            let system = LinearSystemFv::build(
                params,
                fine.dimensions(),
                Arc::clone(&mat),
                Arc::clone(fine.mesh()),
                timestep.clone(),
            )?;

            let coarse_map = system.get_map();
            let finer = levels.last_mut().ok_or_else(|| {
                ProfugusError::ConfigError("Energy multigrid has no fine level".to_string())
            })?;
            finer.restriction = Some(EnergyRestriction::new(finer.map, coarse_map, collapse));
            finer.prolongation = Some(EnergyProlongation::new(coarse_map, finer.map, collapse));

            levels.push(Level::new(system.get_matrix(), coarse_map, &mg.smoother)?);
            last_matrix = Rc::clone(system.get_matrix());
        }

        if let Some(coarse) = &mg.coarse_solver {
            let coarsest = levels.last_mut().ok_or_else(|| {
                ProfugusError::ConfigError("Energy multigrid has no coarse level".to_string())
            })?;
            let prec = build_preconditioner(coarse.preconditioner, &last_matrix)?
                .or_else(|| coarsest.preconditioner.clone());
            coarsest.smoother = build_smoother(coarse, &coarsest.operator, prec, &last_matrix);
        }

        let groups: Vec<usize> = levels.iter().map(|l| l.map.num_groups).collect();
        debug!("Energy multigrid levels (groups): {groups:?}");
        if groups.last().is_some_and(|&g| g > 1) {
            debug!(
                "Energy multigrid stopped at Max Depth {} with {} coarse groups",
                mg.max_depth,
                groups[groups.len() - 1]
            );
        }

        Ok(EnergyMultigrid { levels })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Groups on each level, finest first.
    pub fn level_groups(&self) -> Vec<usize> {
        self.levels.iter().map(|l| l.map.num_groups).collect()
    }

    fn v_cycle(&self, x: &[f64], y: &mut [f64]) {
        let num_levels = self.levels.len();
        {
            let mut top = self.levels[0].vectors.borrow_mut();
            top.residual.copy_from_slice(x);
            top.rhs.copy_from_slice(x);
            top.solution.fill(0.0);
        }

        // downward leg
        for il in 1..num_levels {
            let finer = &self.levels[il - 1];
            let level = &self.levels[il];
            let fv = finer.vectors.borrow();
            let mut v = level.vectors.borrow_mut();
            let v = &mut *v;

            if let Some(r) = &finer.restriction {
                r.apply_vec(&fv.residual, &mut v.rhs);
            }
            v.solution.fill(0.0);
            level.smoother.solve(&v.rhs, &mut v.solution);

            if il != num_levels - 1 {
                level.operator.apply_vec(&v.solution, &mut v.residual);
                for (r, b) in v.residual.iter_mut().zip(&v.rhs) {
                    *r = b - *r;
                }
            }
        }

        // upward leg
        for il in (0..num_levels - 1).rev() {
            let level = &self.levels[il];
            let cv = self.levels[il + 1].vectors.borrow();
            let mut v = level.vectors.borrow_mut();
            let v = &mut *v;

            if let Some(p) = &level.prolongation {
                p.apply_vec(&cv.solution, &mut v.residual);
            }
            for (s, c) in v.solution.iter_mut().zip(&v.residual) {
                *s += c;
            }
            level.smoother.solve(&v.rhs, &mut v.solution);
        }

        y.copy_from_slice(&self.levels[0].vectors.borrow().solution);
    }
}

impl LinearOperator for EnergyMultigrid {
    fn rows(&self) -> usize {
        self.levels[0].map.size()
    }

    fn cols(&self) -> usize {
        self.levels[0].map.size()
    }

    fn apply_vec(&self, x: &[f64], y: &mut [f64]) {
        require!(x.len() == self.cols());
        require!(y.len() == self.rows());
        self.v_cycle(x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use profugus_math::gmres::{gmres_solve, GmresConfig};
    use profugus_types::config::{MatrixBackend, SolverType};
    use profugus_types::state::CartesianMesh;
    use profugus_types::xs::{CrossSections, MaterialXs, XsLibrary};

    use crate::dimensions::Dimensions;
    use crate::mat_db::MatDb;

    const XS_5GRP: &str = include_str!("../../../data/xs_5grp.json");

    /// 4x4x4 checkerboard of fuel and moderator, reflecting in x and y.
    fn five_group_system(params: &ProblemParams) -> LinearSystemFv {
        let lib = XsLibrary::from_json(XS_5GRP).unwrap();
        let names = vec!["fuel".to_string(), "moderator".to_string()];
        let xs = lib.build(&names, 0, 0, 4).unwrap();
        let mesh = CartesianMesh::uniform([4, 4, 4], [1.0, 1.0, 10.0]).unwrap();
        let matids = (0..64).map(|c| (c % 4 + (c / 4) % 4) % 2).collect();
        let mat = MatDb::new(Arc::new(xs), matids).unwrap();
        LinearSystemFv::new(params, Dimensions::new(1).unwrap(), Arc::new(mat), Arc::new(mesh)).unwrap()
    }

    fn params() -> ProblemParams {
        ProblemParams {
            reflect: Some([true, true, true, true, false, false]),
            ..ProblemParams::default()
        }
    }

    #[test]
    fn test_level_plan() {
        let groups = |p: &[(usize, Vec<usize>)]| p.iter().map(|l| l.0).collect::<Vec<_>>();
        let plan = plan_levels(5, 2, 10);
        assert_eq!(groups(&plan), vec![5, 3, 2, 1]);
        assert_eq!(plan[1].1, vec![2, 2, 1]);
        assert_eq!(plan[2].1, vec![2, 1]);
        assert_eq!(plan[3].1, vec![2]);

        assert_eq!(groups(&plan_levels(12, 3, 10)), vec![12, 4, 2, 1]);
        // max depth reached with more than one group left
        assert_eq!(groups(&plan_levels(5, 2, 2)), vec![5, 3, 2]);
        // a one-group problem still gets one coarse level
        assert_eq!(groups(&plan_levels(1, 2, 10)), vec![1, 1]);
    }

    #[test]
    fn test_hierarchy_matches_plan() {
        let p = params();
        let sys = five_group_system(&p);
        let mg = EnergyMultigrid::new(&p, &sys).unwrap();
        assert_eq!(mg.num_levels(), 4);
        assert_eq!(mg.level_groups(), vec![5, 3, 2, 1]);

        let shallow = ProblemParams {
            preconditioner: MultigridParams {
                max_depth: 1,
                ..MultigridParams::default()
            },
            ..params()
        };
        let mg = EnergyMultigrid::new(&shallow, &sys).unwrap();
        assert_eq!(mg.level_groups(), vec![5, 3]);
    }

    #[test]
    fn test_apply_constant_vector_is_finite() {
        let p = params();
        let sys = five_group_system(&p);
        let mg = EnergyMultigrid::new(&p, &sys).unwrap();
        let n = mg.rows();
        let x = vec![1.0; n];
        let mut y = vec![0.0; n];
        mg.apply_vec(&x, &mut y);
        let norm = y.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!(norm.is_finite() && norm > 0.0, "norm = {norm}");

        // applying twice gives the same answer: no state leaks between calls
        let mut y2 = vec![0.0; n];
        mg.apply_vec(&x, &mut y2);
        assert_eq!(y, y2);
    }

    #[test]
    fn test_multivector_columns_independent() {
        let p = params();
        let sys = five_group_system(&p);
        let mg = EnergyMultigrid::new(&p, &sys).unwrap();
        let n = mg.rows();
        let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { 1.0 } else { (i % 7) as f64 });
        let mut y = Array2::zeros((n, 2));
        mg.apply(x.view(), y.view_mut());

        let mut single = vec![0.0; n];
        mg.apply_vec(&x.column(1).to_vec(), &mut single);
        for (a, b) in y.column(1).iter().zip(&single) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_backends_give_same_cycle() {
        let csr = params();
        let dense = ProblemParams {
            backend: MatrixBackend::Dense,
            ..params()
        };
        let a = EnergyMultigrid::new(&csr, &five_group_system(&csr)).unwrap();
        let b = EnergyMultigrid::new(&dense, &five_group_system(&dense)).unwrap();
        let n = a.rows();
        let x: Vec<f64> = (0..n).map(|i| 1.0 + (i % 5) as f64).collect();
        let (mut ya, mut yb) = (vec![0.0; n], vec![0.0; n]);
        a.apply_vec(&x, &mut ya);
        b.apply_vec(&x, &mut yb);
        for (u, v) in ya.iter().zip(&yb) {
            assert!((u - v).abs() <= 1e-12 * (1.0 + u.abs()), "{u} vs {v}");
        }
    }

    #[test]
    fn test_preconditioned_gmres_needs_fewer_iterations() {
        let p = params();
        let sys = five_group_system(&p);
        let mg = EnergyMultigrid::new(&p, &sys).unwrap();
        let a = sys.get_operator();
        let b = sys.build_rhs().unwrap();
        let config = GmresConfig {
            restart: 30,
            max_iter: 2000,
            tol: 1e-8,
        };

        let mut x0 = vec![0.0; b.len()];
        let plain = gmres_solve(a.as_ref(), None, &b, &mut x0, &config);
        let mut x1 = vec![0.0; b.len()];
        let precond = gmres_solve(a.as_ref(), Some(&mg as &dyn LinearOperator), &b, &mut x1, &config);

        assert!(precond.converged, "residual {}", precond.residual);
        assert!(
            precond.iterations < plain.iterations,
            "multigrid {} vs none {}",
            precond.iterations,
            plain.iterations
        );
    }

    #[test]
    fn test_single_group_with_exact_coarse_solve_inverts() {
        let mut scat = Array2::zeros((1, 1));
        scat[[0, 0]] = 0.6;
        let mut xs = CrossSections::new(1, 0);
        xs.add(MaterialXs::absorber("m", vec![1.0], scat)).unwrap();
        let mesh = CartesianMesh::uniform([3, 3, 2], [1.0, 1.0, 1.0]).unwrap();
        let mat = MatDb::new(Arc::new(xs), vec![0; 18]).unwrap();
        let p = ProblemParams {
            boundary: profugus_types::config::BoundaryKind::Vacuum,
            preconditioner: MultigridParams {
                coarse_solver: Some(SolverParams {
                    solver_type: SolverType::Gmres,
                    tolerance: 1e-13,
                    ..SolverParams::default()
                }),
                ..MultigridParams::default()
            },
            ..ProblemParams::default()
        };
        let sys = LinearSystemFv::new(&p, Dimensions::new(1).unwrap(), Arc::new(mat), Arc::new(mesh)).unwrap();
        let mg = EnergyMultigrid::new(&p, &sys).unwrap();
        assert_eq!(mg.level_groups(), vec![1, 1]);

        let x: Vec<f64> = (0..18).map(|i| 1.0 + i as f64).collect();
        let mut y = vec![0.0; 18];
        mg.apply_vec(&x, &mut y);
        let mut ay = vec![0.0; 18];
        sys.get_operator().apply_vec(&y, &mut ay);
        for (u, v) in ay.iter().zip(&x) {
            assert!((u - v).abs() < 1e-9 * v.abs(), "{u} vs {v}");
        }
    }

    #[test]
    fn test_bad_coarse_factor() {
        let p = ProblemParams {
            preconditioner: MultigridParams {
                coarse_factor: 1,
                ..MultigridParams::default()
            },
            ..params()
        };
        let sys = five_group_system(&params());
        assert!(EnergyMultigrid::new(&p, &sys).is_err());
    }
}
