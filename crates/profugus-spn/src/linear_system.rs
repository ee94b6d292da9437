// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Finite-Volume Linear System
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Multigroup SP1 equations on a Cartesian mesh, cell-centred finite volume.
//!
//! For every cell `c` and group `g`:
//!
//! ```text
//! Σ_faces J_f · A_f + (Σt,g - Σs,g←g) φ_g V - Σ_{g'≠g} Σs,g←g' φ_g' V = q_g V
//! ```
//!
//! with `D = 1 / (3 Σt)` and the face current built from the harmonic mean
//! of the two half-cell conductances. Reflecting faces carry no current;
//! vacuum faces use the Marshak condition `J = φ_s / 2`.
//!
//! The loss operator `A` holds leakage, removal and in-scatter; the fission
//! operator `B` holds `χ_g νΣf,g'`. Unknowns are ordered cell-major:
//! `index(cell, g) = cell · Ng + g`.
//!
//! A time-dependent system adds the implicit-Euler term `V / (v_g Δt)` to
//! every diagonal of `A`. The adjoint system stores `Aᵀ` and `Bᵀ`.

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use log::debug;
use profugus_math::operator::LinearOperator;
use profugus_math::sparse::Matrix;
use profugus_types::config::{MatrixBackend, ProblemParams};
use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::state::{Axis, CartesianMesh};

use crate::dimensions::Dimensions;
use crate::mat_db::MatDb;
use crate::timestep::Timestep;

/// Layout of the unknown vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMap {
    pub num_cells: usize,
    pub num_groups: usize,
}

impl UnknownMap {
    #[inline]
    pub fn index(&self, cell: usize, g: usize) -> usize {
        cell * self.num_groups + g
    }

    pub fn size(&self) -> usize {
        self.num_cells * self.num_groups
    }
}

pub struct LinearSystemFv {
    dim: Dimensions,
    mat: Arc<MatDb>,
    mesh: Arc<CartesianMesh>,
    map: UnknownMap,
    reflect: [bool; 6],
    operator: Rc<Matrix>,
    fission: Rc<Matrix>,
    source_strength: f64,
    source_spectrum: Option<Vec<f64>>,
    timestep: Option<Timestep>,
    adjoint: bool,
}

impl LinearSystemFv {
    /// Assemble `A` and `B` for `mat` on `mesh`.
    pub fn new(
        params: &ProblemParams,
        dim: Dimensions,
        mat: Arc<MatDb>,
        mesh: Arc<CartesianMesh>,
    ) -> ProfugusResult<Self> {
        Self::build(params, dim, mat, mesh, None)
    }

    /// Assemble the system of one implicit-Euler step of `timestep`.
    pub fn time_dependent(
        params: &ProblemParams,
        dim: Dimensions,
        mat: Arc<MatDb>,
        mesh: Arc<CartesianMesh>,
        timestep: Timestep,
    ) -> ProfugusResult<Self> {
        if params.adjoint {
            return Err(ProfugusError::ConfigError(
                "Adjoint is not supported in time-dependent SPN".to_string(),
            ));
        }
        if timestep.num_groups() != mat.num_groups() {
            return Err(ProfugusError::ConfigError(format!(
                "Timestep has {} group speeds, problem has {} groups",
                timestep.num_groups(),
                mat.num_groups()
            )));
        }
        Self::build(params, dim, mat, mesh, Some(timestep))
    }

    /// Steady system when `timestep` is absent.
    pub(crate) fn build(
        params: &ProblemParams,
        dim: Dimensions,
        mat: Arc<MatDb>,
        mesh: Arc<CartesianMesh>,
        timestep: Option<Timestep>,
    ) -> ProfugusResult<Self> {
        if params.eqn_type != "fv" {
            return Err(ProfugusError::ConfigError(format!(
                "Equation type '{}' is not supported; only fv is available",
                params.eqn_type
            )));
        }
        if dim.spn_order() != 1 {
            return Err(ProfugusError::ConfigError(format!(
                "SP{} equations are not supported; only SP1 is available",
                dim.spn_order()
            )));
        }
        if mat.num_cells() != mesh.num_cells() {
            return Err(ProfugusError::ConfigError(format!(
                "Material map covers {} cells, mesh has {}",
                mat.num_cells(),
                mesh.num_cells()
            )));
        }

        let map = UnknownMap {
            num_cells: mesh.num_cells(),
            num_groups: mat.num_groups(),
        };
        let reflect = params.reflecting_faces();
        let (mut a, mut b) = assemble(&mat, &mesh, map, &reflect, timestep.as_ref());
        if params.adjoint {
            for t in a.iter_mut().chain(b.iter_mut()) {
                *t = (t.1, t.0, t.2);
            }
        }
        let n = map.size();
        let operator = Matrix::from_triplets(params.backend, n, n, a)?;
        let fission = Matrix::from_triplets(params.backend, n, n, b)?;
        debug!(
            "FV system: {} cells x {} groups, backend {:?}{}{}",
            map.num_cells,
            map.num_groups,
            params.backend,
            if params.adjoint { ", adjoint" } else { "" },
            if timestep.is_some() { ", time-dependent" } else { "" }
        );

        Ok(LinearSystemFv {
            dim,
            mat,
            mesh,
            map,
            reflect,
            operator: Rc::new(operator),
            fission: Rc::new(fission),
            source_strength: params.source_strength,
            source_spectrum: params.source_spectrum.clone(),
            timestep,
            adjoint: params.adjoint,
        })
    }

    /// Step of a time-dependent system.
    pub fn timestep(&self) -> Option<&Timestep> {
        self.timestep.as_ref()
    }

    pub fn is_adjoint(&self) -> bool {
        self.adjoint
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dim
    }

    pub fn mat_db(&self) -> &Arc<MatDb> {
        &self.mat
    }

    pub fn mesh(&self) -> &Arc<CartesianMesh> {
        &self.mesh
    }

    pub fn reflecting_faces(&self) -> [bool; 6] {
        self.reflect
    }

    pub fn get_map(&self) -> UnknownMap {
        self.map
    }

    pub fn backend(&self) -> MatrixBackend {
        self.operator.backend()
    }

    /// Loss operator `A`.
    pub fn get_matrix(&self) -> &Rc<Matrix> {
        &self.operator
    }

    pub fn get_operator(&self) -> Rc<dyn LinearOperator> {
        self.operator.clone()
    }

    /// Fission operator `B`.
    pub fn get_fission_matrix(&self) -> &Rc<Matrix> {
        &self.fission
    }

    /// Uniform isotropic external source, `q_g V` per unknown.
    pub fn build_rhs(&self) -> ProfugusResult<Vec<f64>> {
        let ng = self.map.num_groups;
        let spectrum = match &self.source_spectrum {
            Some(s) if s.len() != ng => {
                return Err(ProfugusError::ConfigError(format!(
                    "Source spectrum has {} groups, problem has {ng}",
                    s.len()
                )))
            }
            Some(s) => s.clone(),
            None => vec![1.0 / ng as f64; ng],
        };

        let mut rhs = vec![0.0; self.map.size()];
        for cell in 0..self.map.num_cells {
            let (i, j, k) = self.mesh.ijk_of(cell);
            let v = self.mesh.volume(i, j, k);
            for (g, &s) in spectrum.iter().enumerate() {
                rhs[self.map.index(cell, g)] = self.source_strength * s * v;
            }
        }
        Ok(rhs)
    }

    /// Dump `A` in Matrix Market format.
    pub fn write_matrix_file(&self, path: impl AsRef<Path>) -> ProfugusResult<()> {
        self.operator.write_matrix_market(path)
    }

    /// Dump `A`, `B` and the source as `<prefix>_A.mtx`, `<prefix>_B.mtx`
    /// and `<prefix>_q.mtx`.
    pub fn write_problem_to_file(&self, prefix: &str) -> ProfugusResult<()> {
        self.operator.write_matrix_market(format!("{prefix}_A.mtx"))?;
        self.fission.write_matrix_market(format!("{prefix}_B.mtx"))?;
        let rhs = self.build_rhs()?;
        let n = rhs.len();
        let column = rhs
            .into_iter()
            .enumerate()
            .filter(|(_, v)| *v != 0.0)
            .map(|(r, v)| (r, 0, v))
            .collect();
        Matrix::from_triplets(MatrixBackend::Csr, n, 1, column)?
            .write_matrix_market(format!("{prefix}_q.mtx"))
    }
}

type Triplets = Vec<(usize, usize, f64)>;

fn assemble(
    mat: &MatDb,
    mesh: &CartesianMesh,
    map: UnknownMap,
    reflect: &[bool; 6],
    timestep: Option<&Timestep>,
) -> (Triplets, Triplets) {
    let xs = mat.xs();
    let ng = map.num_groups;
    let mut a = Vec::with_capacity(map.size() * (ng + 6));
    let mut b = Vec::new();

    let diffusion = |cell: usize, g: usize| 1.0 / (3.0 * xs.total(mat.matid(cell), g));

    for cell in 0..map.num_cells {
        let (i, j, k) = mesh.ijk_of(cell);
        let ijk = [i, j, k];
        let widths = [
            mesh.width(Axis::X, i),
            mesh.width(Axis::Y, j),
            mesh.width(Axis::Z, k),
        ];
        let volume = mesh.volume(i, j, k);
        let m = mat.matid(cell);
        let material = xs.material(m);
        let scat = &material.scattering[0];

        for g in 0..ng {
            let row = map.index(cell, g);

            // removal and in-scatter
            a.push((row, row, (material.total[g] - scat[[g, g]]) * volume));
            if let Some(ts) = timestep {
                a.push((row, row, ts.coefficient(g) * volume));
            }
            for gp in (0..ng).filter(|&gp| gp != g) {
                if scat[[g, gp]] != 0.0 {
                    a.push((row, map.index(cell, gp), -scat[[g, gp]] * volume));
                }
            }

            // fission
            if material.chi[g] > 0.0 {
                for gp in 0..ng {
                    let nsf = material.nu_sigma_f[gp];
                    if nsf > 0.0 {
                        b.push((row, map.index(cell, gp), material.chi[g] * nsf * volume));
                    }
                }
            }

            // leakage
            let d = diffusion(cell, g);
            for axis in Axis::ALL {
                let ax = axis.index();
                let area = widths[(ax + 1) % 3] * widths[(ax + 2) % 3];
                let delta = widths[ax];
                let n_along = mesh.num_cells_along(axis);

                for (side, face) in [(-1i64, 2 * ax), (1, 2 * ax + 1)] {
                    let pos = ijk[ax] as i64 + side;
                    if pos < 0 || pos >= n_along as i64 {
                        if !reflect[face] {
                            let alpha = 2.0 * d / delta;
                            a.push((row, row, area * alpha / (2.0 * alpha + 1.0)));
                        }
                        continue;
                    }
                    let mut nijk = ijk;
                    nijk[ax] = pos as usize;
                    let nbr = mesh.cardinal(nijk[0], nijk[1], nijk[2]);
                    let d_n = diffusion(nbr, g);
                    let delta_n = mesh.width(axis, nijk[ax]);
                    let coupling = area * 2.0 * d * d_n / (d * delta_n + d_n * delta);
                    a.push((row, row, coupling));
                    a.push((row, map.index(nbr, g), -coupling));
                }
            }
        }
    }
    (a, b)
}
