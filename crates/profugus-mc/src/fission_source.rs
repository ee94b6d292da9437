// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Fission Source
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fission-site bank and the per-cycle source built from it.
//!
//! The first cycle samples `Np` particles uniformly over the fissionable
//! part of the mesh. Later cycles draw births from the bank of the
//! previous cycle by systematic sampling over the whole bank, with the
//! local particle count scaled so that the global count stays `Np`.

use std::rc::Rc;
use std::sync::Arc;

use log::debug;
use profugus_comm::domain::local_histories;
use profugus_comm::{CommExt, Communicator};
use profugus_types::config::KdeParams;
use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::state::SpaceVector;
use profugus_types::{ensure, insist, require};
use rand::Rng;

use crate::geometry::MeshGeometry;
use crate::kde::KdeKernel;
use crate::particle::Particle;
use crate::physics::{sample_isotropic, Physics};

/// Fission neutron banked at a collision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FissionSite {
    /// Geometry cell of the collision.
    pub cell: usize,
    pub r: SpaceVector,
    pub weight: f64,
}

pub type FissionSiteContainer = Vec<FissionSite>;

/// Rejection attempts per initial-source particle.
const MAX_INITIAL_TRIES: usize = 10_000;

/// Bank slot of local particle `index` when `np_local` births are drawn
/// from `len` sites: the midpoint of stratum `index` of `len / np_local`
/// slots, so every part of the bank is visited whether `np_local` is
/// above or below `len`.
pub(crate) fn bank_index(index: usize, np_local: usize, len: usize) -> usize {
    require!(index < np_local && len > 0);
    (2 * index + 1) * len / (2 * np_local)
}

pub struct FissionSource {
    geometry: Arc<MeshGeometry>,
    physics: Arc<Physics>,
    comm: Rc<dyn Communicator>,
    /// Requested global particles per cycle.
    np: usize,
    sites: FissionSiteContainer,
    np_local: usize,
    np_total: usize,
    first_history: usize,
    weight_scale: f64,
    initial: bool,
    kde: Option<KdeKernel>,
}

impl FissionSource {
    pub fn new(
        geometry: Arc<MeshGeometry>,
        physics: Arc<Physics>,
        comm: Rc<dyn Communicator>,
        np: usize,
    ) -> Self {
        require!(np > 0);
        FissionSource {
            geometry,
            physics,
            comm,
            np,
            sites: Vec::new(),
            np_local: 0,
            np_total: 0,
            first_history: 0,
            weight_scale: 1.0,
            initial: true,
            kde: None,
        }
    }

    /// Resample banked positions with a Gaussian kernel.
    pub fn set_kde(&mut self, params: &KdeParams) {
        self.kde = Some(KdeKernel::new(Arc::clone(&self.geometry), params));
    }

    pub fn kde(&self) -> Option<&KdeKernel> {
        self.kde.as_ref()
    }

    pub fn geometry(&self) -> &Arc<MeshGeometry> {
        &self.geometry
    }

    /// Uniform source over fissionable cells; `Np` split over the nodes.
    pub fn build_initial_source(&mut self) -> ProfugusResult<()> {
        let any_fissionable = self
            .geometry
            .matids()
            .iter()
            .any(|&m| self.physics.is_fissionable(m));
        if !any_fissionable {
            return Err(ProfugusError::ConfigError(
                "No fissionable material in the geometry for the initial source".to_string(),
            ));
        }

        let slice = local_histories(self.np, self.comm.node(), self.comm.nodes())?;
        self.sites.clear();
        self.initial = true;
        self.np_local = slice.count();
        self.np_total = self.np;
        self.first_history = slice.start;
        self.weight_scale = 1.0;

        debug!(
            "initial source on node {}: {} of {} particles",
            self.comm.node(),
            self.np_local,
            self.np_total
        );
        Ok(())
    }

    /// Replace the source with a new fission bank. Collective.
    ///
    /// Fails when the bank is empty on every node.
    pub fn build_source(&mut self, sites: FissionSiteContainer) -> ProfugusResult<()> {
        let local_weight: f64 = sites.iter().map(|s| s.weight).sum();
        let global_weight = self.comm.sum_scalar(local_weight);
        if global_weight <= 0.0 {
            return Err(ProfugusError::PhysicsViolation(
                "Fission source is empty on all nodes".to_string(),
            ));
        }

        let share = self.np as f64 * local_weight / global_weight;
        self.np_local = if sites.is_empty() { 0 } else { share.round() as usize };
        self.weight_scale = if self.np_local > 0 {
            self.np as f64 / global_weight * sites.len() as f64 / self.np_local as f64
        } else {
            1.0
        };

        let counts = self.comm.gather_all(&[self.np_local]);
        self.np_total = counts.iter().map(|c| c[0]).sum();
        self.first_history = counts[..self.comm.node()].iter().map(|c| c[0]).sum();

        self.sites = sites;
        self.initial = false;

        if let Some(kde) = self.kde.as_mut() {
            kde.calc_bandwidths(&self.sites, self.comm.as_ref());
        }

        debug!(
            "source on node {}: {} sites, {} particles, {} global",
            self.comm.node(),
            self.sites.len(),
            self.np_local,
            self.np_total
        );
        ensure!(self.np_local == 0 || !self.sites.is_empty());
        Ok(())
    }

    /// Particle `index` (local, `0..num_to_transport()`) of this cycle.
    pub fn get_particle<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) -> Particle {
        require!(index < self.np_local);

        let (r, cell, weight) = if self.initial {
            let (r, cell) = self.sample_initial_position(rng);
            (r, cell, 1.0)
        } else {
            let site = self.sites[bank_index(index, self.np_local, self.sites.len())];
            let r = match self.kde.as_mut() {
                Some(kde) => kde.sample_position(site.r, site.cell, rng),
                None => site.r,
            };
            (r, site.cell, site.weight * self.weight_scale)
        };

        let dir = sample_isotropic(rng);
        let mut p = Particle::new(0, weight);
        self.geometry.initialize(r, dir, &mut p.geo);
        p.matid = self.geometry.matid(&p.geo);
        p.birth_cell = cell;
        p.group = self.physics.sample_group_from_chi(p.matid, rng);
        p
    }

    fn sample_initial_position<R: Rng + ?Sized>(&self, rng: &mut R) -> (SpaceVector, usize) {
        let mesh = self.geometry.mesh();
        let (lo, hi) = (mesh.lower(), mesh.upper());
        let mut tries = 0;
        loop {
            tries += 1;
            insist!(
                tries <= MAX_INITIAL_TRIES,
                "no fissionable point found in {} tries",
                MAX_INITIAL_TRIES
            );
            let mut r = [0.0; 3];
            for a in 0..3 {
                r[a] = lo[a] + rng.gen::<f64>() * (hi[a] - lo[a]);
            }
            if let Some(cell) = mesh.cell_containing(&r) {
                if self.physics.is_fissionable(self.geometry.matids()[cell]) {
                    return (r, cell);
                }
            }
        }
    }

    /// Local particles this cycle.
    pub fn num_to_transport(&self) -> usize {
        self.np_local
    }

    /// Particles this cycle summed over all nodes.
    pub fn total_num_to_transport(&self) -> usize {
        self.np_total
    }

    /// Global index of local particle 0.
    pub fn first_history(&self) -> usize {
        self.first_history
    }

    pub fn np(&self) -> usize {
        self.np
    }

    pub fn is_empty(&self) -> bool {
        self.np_local == 0
    }

    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub fn sites(&self) -> &FissionSiteContainer {
        &self.sites
    }

    /// Move the bank out, leaving the source empty of sites.
    pub fn take_sites(&mut self) -> FissionSiteContainer {
        std::mem::take(&mut self.sites)
    }
}
