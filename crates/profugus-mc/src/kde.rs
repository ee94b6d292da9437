// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Kernel Density Estimator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Gaussian kernel resampling of fission-site positions.
//!
//! Bandwidth per geometry cell follows Silverman's rule,
//! `h = c · σ · N^e`, from the global set of sites in the cell.

use std::sync::Arc;

use log::debug;
use profugus_comm::{CommExt, Communicator};
use profugus_types::config::KdeParams;
use profugus_types::require;
use profugus_types::state::SpaceVector;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::fission_source::FissionSite;
use crate::geometry::MeshGeometry;

#[derive(Debug, Clone)]
pub struct KdeKernel {
    geometry: Arc<MeshGeometry>,
    coefficient: f64,
    exponent: f64,
    bandwidths: Vec<f64>,
    num_sampled: u64,
    num_accepted: u64,
}

impl KdeKernel {
    pub fn new(geometry: Arc<MeshGeometry>, params: &KdeParams) -> Self {
        require!(params.coefficient > 0.0);
        let n = geometry.num_cells();
        KdeKernel {
            geometry,
            coefficient: params.coefficient,
            exponent: params.exponent,
            bandwidths: vec![0.0; n],
            num_sampled: 0,
            num_accepted: 0,
        }
    }

    pub fn set_bandwidth(&mut self, cell: usize, bandwidth: f64) {
        require!(cell < self.bandwidths.len());
        require!(bandwidth >= 0.0);
        self.bandwidths[cell] = bandwidth;
    }

    pub fn bandwidth(&self, cell: usize) -> f64 {
        self.bandwidths[cell]
    }

    pub fn get_bandwidths(&self) -> &[f64] {
        &self.bandwidths
    }

    /// Recompute every cell bandwidth from the sites on all ranks.
    /// Collective.
    pub fn calc_bandwidths(&mut self, sites: &[FissionSite], comm: &dyn Communicator) {
        let n = self.bandwidths.len();
        let (cells, coords) = communicate_sites(sites, comm);

        let mut count = vec![0usize; n];
        let mut sum = vec![[0.0; 3]; n];
        let mut sum_sq = vec![[0.0; 3]; n];
        for (c, r) in cells.iter().zip(&coords) {
            count[*c] += 1;
            for a in 0..3 {
                sum[*c][a] += r[a];
                sum_sq[*c][a] += r[a] * r[a];
            }
        }

        for cell in 0..n {
            let m = count[cell];
            if m < 2 {
                self.bandwidths[cell] = 0.0;
                continue;
            }
            let mf = m as f64;
            let mean_var = (0..3)
                .map(|a| {
                    let mean = sum[cell][a] / mf;
                    (sum_sq[cell][a] / mf - mean * mean).max(0.0)
                })
                .sum::<f64>()
                / 3.0;
            self.bandwidths[cell] = self.coefficient * mean_var.sqrt() * mf.powf(self.exponent);
        }
        debug!(
            "KDE bandwidths from {} sites over {} cells",
            cells.len(),
            count.iter().filter(|&&c| c > 0).count()
        );
    }

    /// Gaussian perturbation of `orig`; the original point is kept when the
    /// sample leaves `cell`.
    pub fn sample_position<R: Rng + ?Sized>(
        &mut self,
        orig: SpaceVector,
        cell: usize,
        rng: &mut R,
    ) -> SpaceVector {
        let h = self.bandwidths[cell];
        if h == 0.0 {
            return orig;
        }
        self.num_sampled += 1;
        let mut r = orig;
        for x in r.iter_mut() {
            let z: f64 = rng.sample(StandardNormal);
            *x += h * z;
        }
        if self.geometry.mesh().cell_containing(&r) == Some(cell) {
            self.num_accepted += 1;
            r
        } else {
            orig
        }
    }

    /// Fraction of perturbed samples that stayed in their cell.
    pub fn acceptance_fraction(&self) -> f64 {
        if self.num_sampled == 0 {
            return 1.0;
        }
        self.num_accepted as f64 / self.num_sampled as f64
    }
}

/// Site cells and positions from every rank, concatenated in rank order.
pub fn communicate_sites(
    sites: &[FissionSite],
    comm: &dyn Communicator,
) -> (Vec<usize>, Vec<SpaceVector>) {
    let local_cells: Vec<usize> = sites.iter().map(|s| s.cell).collect();
    let local_coords: Vec<f64> = sites.iter().flat_map(|s| s.r).collect();

    let cells: Vec<usize> = comm.gather_all(&local_cells).concat();
    let coords: Vec<SpaceVector> = comm
        .gather_all(&local_coords)
        .concat()
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect();
    require!(cells.len() == coords.len());
    (cells, coords)
}
