// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Anderson Operator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! A transport cycle as a fixed-point map for Anderson mixing.
//!
//! The unknown is `v = [g_0 .. g_{N-1}, k]`, with `g` the fission density
//! on a Cartesian eigen mesh. `g` is replicated on every node: restriction
//! global-sums it, so the mixing step runs redundantly and identically
//! everywhere while each application of the operator is collective.

use std::rc::Rc;
use std::sync::Arc;

use log::debug;
use profugus_comm::{CommExt, Communicator};
use profugus_math::anderson::FixedPointOperator;
use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::state::{Axis, CartesianMesh};
use profugus_types::{ensure, require};

use crate::fission_source::{FissionSite, FissionSiteContainer, FissionSource};
use crate::geometry::MeshGeometry;
use crate::tally::KeffTally;
use crate::transporter::SourceTransporter;

/// Uniform eigen mesh over the geometry bounds, or the geometry mesh
/// itself when no dimensions are given.
pub fn build_eigen_mesh(
    geometry: &MeshGeometry,
    dims: Option<[usize; 3]>,
) -> ProfugusResult<Arc<CartesianMesh>> {
    let Some(dims) = dims else {
        return Ok(Arc::clone(geometry.mesh()));
    };
    let mesh = geometry.mesh();
    let (lo, hi) = (mesh.lower(), mesh.upper());
    let mut edges: Vec<Vec<f64>> = Vec::with_capacity(3);
    for axis in Axis::ALL {
        let a = axis.index();
        let n = dims[a];
        if n == 0 {
            return Err(ProfugusError::ConfigError(format!(
                "Eigen mesh needs at least one cell along axis {a}"
            )));
        }
        let dx = (hi[a] - lo[a]) / n as f64;
        let mut e: Vec<f64> = (0..=n).map(|i| lo[a] + i as f64 * dx).collect();
        // pin the last edge so it covers the geometry exactly
        e[n] = hi[a];
        edges.push(e);
    }
    let z = edges.pop().unwrap_or_default();
    let y = edges.pop().unwrap_or_default();
    let x = edges.pop().unwrap_or_default();
    Ok(Arc::new(CartesianMesh::new(x, y, z)?))
}

pub struct AndersonOperator {
    transporter: SourceTransporter,
    source: FissionSource,
    comm: Rc<dyn Communicator>,
    mesh: Arc<CartesianMesh>,
    /// Bank of the last transport cycle.
    fission_sites: FissionSiteContainer,
    np: f64,
    tallies_built: bool,
}

impl AndersonOperator {
    pub fn new(
        transporter: SourceTransporter,
        source: FissionSource,
        comm: Rc<dyn Communicator>,
        eigen_mesh: Arc<CartesianMesh>,
    ) -> Self {
        let np = source.np() as f64;
        AndersonOperator {
            transporter,
            source,
            comm,
            mesh: eigen_mesh,
            fission_sites: Vec::new(),
            np,
            tallies_built: false,
        }
    }

    pub fn transporter(&self) -> &SourceTransporter {
        &self.transporter
    }

    pub fn source(&self) -> &FissionSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut FissionSource {
        &mut self.source
    }

    pub fn eigen_mesh(&self) -> &Arc<CartesianMesh> {
        &self.mesh
    }

    /// Register the keff tally. Must run before the first [`Self::iterate`].
    pub fn build_tallies(&mut self, keff_init: f64) {
        let tally = KeffTally::new(Rc::clone(&self.comm), keff_init);
        self.transporter.tallier_mut().set_keff_tally(tally);
        self.tallies_built = true;
    }

    /// Collision estimate of k from the last cycle.
    pub fn latest_keff(&self) -> f64 {
        self.transporter
            .tallier()
            .keff()
            .map_or(0.0, |k| k.latest())
    }

    /// One transport cycle at eigenvalue `k` into a fresh fission bank.
    /// Collective.
    pub fn iterate(&mut self, k: f64) {
        require!(self.tallies_built, "build_tallies must precede iterate");
        self.fission_sites.clear();
        self.transporter
            .solve(&mut self.source, k, &mut self.fission_sites);
        self.transporter.tallier_mut().end_cycle();
    }

    /// Make the last bank the source of the next cycle. Collective.
    pub fn update_source(&mut self) -> ProfugusResult<()> {
        let sites = std::mem::take(&mut self.fission_sites);
        self.source.build_source(sites)
    }

    /// Reweight `sites` so that eigen cell `c` carries `g[c] · Np` in
    /// total, shared evenly by its sites on all nodes. Collective.
    pub fn prolongate(&self, g: &[f64], sites: &mut [FissionSite]) {
        let n = self.mesh.num_cells();
        require!(g.len() == n);

        let cells: Vec<Option<usize>> = sites
            .iter()
            .map(|s| self.mesh.cell_containing(&s.r))
            .collect();
        let mut count = vec![0.0; n];
        for c in cells.iter().flatten() {
            count[*c] += 1.0;
        }
        self.comm.global_sum(&mut count);

        for (site, cell) in sites.iter_mut().zip(&cells) {
            site.weight = match cell {
                Some(c) if count[*c] > 0.0 => g[*c].max(0.0) * self.np / count[*c],
                _ => 0.0,
            };
        }
    }

    /// `g[c] = Σ weight in c / Np`, summed over all nodes. Collective.
    pub fn restrict(&self, sites: &[FissionSite], g: &mut [f64]) {
        let n = self.mesh.num_cells();
        require!(g.len() == n);
        g.fill(0.0);
        for site in sites {
            if let Some(c) = self.mesh.cell_containing(&site.r) {
                g[c] += site.weight;
            }
        }
        self.comm.global_sum(g);
        g.iter_mut().for_each(|v| *v /= self.np);
    }

    /// `[g, k]` from the current source and the latest k estimate.
    ///
    /// The source must already have been rebuilt from a transport cycle.
    pub fn initialize_anderson(&mut self) -> Vec<f64> {
        require!(
            !self.source.is_initial(),
            "Anderson needs a source built from a fission bank"
        );
        let n = self.mesh.num_cells();
        self.fission_sites = self.source.sites().clone();

        let mut v = vec![0.0; n + 1];
        self.restrict(&self.fission_sites, &mut v[..n]);
        let sum: f64 = v[..n].iter().sum();
        require!(sum > 0.0);
        v[..n].iter_mut().for_each(|x| *x /= sum);
        v[n] = self.latest_keff();
        ensure!(v[n] > 0.0);
        v
    }

    /// Install the density of `v` into the source and return its k.
    pub fn finalize_anderson(&mut self, v: &[f64]) -> ProfugusResult<f64> {
        let n = self.mesh.num_cells();
        require!(v.len() == n + 1);
        let mut sites = std::mem::take(&mut self.fission_sites);
        self.prolongate(&v[..n], &mut sites);
        self.fission_sites = sites;
        self.update_source()?;
        Ok(v[n])
    }
}

impl FixedPointOperator for AndersonOperator {
    fn size(&self) -> usize {
        self.mesh.num_cells() + 1
    }

    fn apply(&mut self, x: &[f64], f: &mut [f64]) -> ProfugusResult<()> {
        let n = self.mesh.num_cells();
        require!(x.len() == n + 1 && f.len() == n + 1);
        let (g, k) = (&x[..n], x[n]);
        if !(k > 0.0 && k.is_finite()) {
            return Err(ProfugusError::SolverDiverged {
                iteration: self.transporter.cycle() as usize,
                message: format!("Anderson proposed eigenvalue {k}"),
            });
        }

        let mut sites = std::mem::take(&mut self.fission_sites);
        self.prolongate(g, &mut sites);
        self.fission_sites = sites;
        self.update_source()?;
        self.iterate(k);

        let mut g_new = vec![0.0; n];
        self.restrict(&self.fission_sites, &mut g_new);
        let sum: f64 = g_new.iter().sum();
        if sum <= 0.0 {
            return Err(ProfugusError::PhysicsViolation(
                "Transport cycle produced no fission sites".to_string(),
            ));
        }
        let k_new = k * sum;

        for c in 0..n {
            f[c] = g_new[c] / sum - g[c];
        }
        f[n] = k_new - k;
        debug!("anderson apply: k = {k:.6} -> {k_new:.6}");
        Ok(())
    }
}
