// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Source Transporter
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One transport cycle: every local source particle tracked to death.
//!
//! Births are drawn sequentially from the source. Each history then gets
//! its own RNG seeded from the global history index and is tracked as an
//! independent rayon task; scores come back in history order. A cycle is
//! therefore reproducible for any thread count.

use std::rc::Rc;
use std::sync::Arc;

use log::debug;
use profugus_comm::Communicator;
use profugus_types::constants::HUGE_DISTANCE;
use profugus_types::require;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::fission_source::{FissionSiteContainer, FissionSource};
use crate::geometry::{BoundaryState, MeshGeometry};
use crate::particle::Particle;
use crate::physics::Physics;
use crate::tally::{FissionEvent, HistoryScore, Tallier};

/// Stride between RNG streams of consecutive histories.
const RNG_STRIDE: u64 = 152_917;

pub struct SourceTransporter {
    geometry: Arc<MeshGeometry>,
    physics: Arc<Physics>,
    comm: Rc<dyn Communicator>,
    tallier: Tallier,
    seed: u64,
    cycle: u64,
}

impl SourceTransporter {
    pub fn new(
        geometry: Arc<MeshGeometry>,
        physics: Arc<Physics>,
        comm: Rc<dyn Communicator>,
        seed: u64,
    ) -> Self {
        SourceTransporter {
            geometry,
            physics,
            comm,
            tallier: Tallier::new(),
            seed,
            cycle: 0,
        }
    }

    pub fn set_tallier(&mut self, tallier: Tallier) {
        self.tallier = tallier;
    }

    pub fn tallier(&self) -> &Tallier {
        &self.tallier
    }

    pub fn tallier_mut(&mut self) -> &mut Tallier {
        &mut self.tallier
    }

    pub fn geometry(&self) -> &Arc<MeshGeometry> {
        &self.geometry
    }

    pub fn physics(&self) -> &Arc<Physics> {
        &self.physics
    }

    /// Cycles transported so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Transport the local source at eigenvalue `keff`, appending the new
    /// fission sites in history order. Returns the number of histories.
    ///
    /// Tallies see every history; closing the cycle is left to the caller.
    pub fn solve(
        &mut self,
        source: &mut FissionSource,
        keff: f64,
        fission_sites: &mut FissionSiteContainer,
    ) -> usize {
        require!(keff > 0.0);
        let n = source.num_to_transport();
        let stream_base = self
            .cycle
            .wrapping_mul(source.total_num_to_transport() as u64)
            .wrapping_add(source.first_history() as u64);

        let births: Vec<(Particle, StdRng)> = (0..n)
            .map(|i| {
                let stream = stream_base.wrapping_add(i as u64);
                let mut rng =
                    StdRng::seed_from_u64(self.seed.wrapping_add(stream.wrapping_mul(RNG_STRIDE)));
                let p = source.get_particle(i, &mut rng);
                (p, rng)
            })
            .collect();

        let geometry = self.geometry.as_ref();
        let physics = self.physics.as_ref();
        let scores: Vec<HistoryScore> = births
            .into_par_iter()
            .map(|(p, mut rng)| track_history(geometry, physics, keff, p, &mut rng))
            .collect();

        let before = fission_sites.len();
        for score in &scores {
            self.tallier.end_history(score);
            fission_sites.extend_from_slice(&score.sites);
        }

        debug!(
            "cycle {} on node {}: {} histories, {} fission sites",
            self.cycle,
            self.comm.node(),
            n,
            fission_sites.len() - before
        );
        self.cycle += 1;
        n
    }
}

/// Track one particle from birth to death.
pub fn track_history<R: Rng + ?Sized>(
    geometry: &MeshGeometry,
    physics: &Physics,
    keff: f64,
    mut p: Particle,
    rng: &mut R,
) -> HistoryScore {
    let mut score = HistoryScore {
        birth_cell: p.birth_cell,
        birth_weight: p.weight,
        ..HistoryScore::default()
    };

    while p.alive() {
        let sigma_t = physics.total(p.matid, p.group);
        let d_col = if sigma_t > 0.0 {
            -(1.0 - rng.gen::<f64>()).ln() / sigma_t
        } else {
            HUGE_DISTANCE
        };
        let d_bnd = geometry.distance_to_boundary(&mut p.geo);

        let step = d_col.min(d_bnd);
        score.k_track += p.weight * step * physics.nusigf(p.matid, p.group);

        if d_bnd <= d_col {
            geometry.move_to_surface(&mut p.geo);
            match geometry.boundary_state(&p.geo) {
                BoundaryState::Outside => p.kill(),
                BoundaryState::Reflect => {
                    geometry.reflect(&mut p.geo);
                }
                BoundaryState::Inside => p.matid = geometry.matid(&p.geo),
            }
            continue;
        }

        geometry.move_to_point(d_col, &mut p.geo);
        let cell = geometry.cell(&p.geo);
        let nusigf = physics.nusigf(p.matid, p.group);
        if nusigf > 0.0 {
            let value = p.weight * nusigf / sigma_t;
            score.k_collision += value;
            score.production.push(FissionEvent {
                cell,
                r: p.geo.pos,
                value,
            });
            physics.sample_fission_site(&p, cell, &mut score.sites, keff, rng);
        }
        physics.collide(&mut p, rng);
    }
    score
}
