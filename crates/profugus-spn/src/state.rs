// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — SPN State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::Serialize;

use crate::linear_system::UnknownMap;

/// Multigroup scalar flux, one value per (cell, group).
#[derive(Debug, Clone, Serialize)]
pub struct State {
    num_cells: usize,
    num_groups: usize,
    flux: Vec<f64>,
}

impl State {
    pub fn new(map: UnknownMap) -> Self {
        State {
            num_cells: map.num_cells,
            num_groups: map.num_groups,
            flux: vec![0.0; map.size()],
        }
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    #[inline]
    pub fn flux(&self, cell: usize, g: usize) -> f64 {
        self.flux[cell * self.num_groups + g]
    }

    /// Flat flux vector in unknown order.
    pub fn values(&self) -> &[f64] {
        &self.flux
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.flux
    }

    /// Flux of group `g` over all cells.
    pub fn group_flux(&self, g: usize) -> Vec<f64> {
        (0..self.num_cells).map(|c| self.flux(c, g)).collect()
    }

    /// Flux summed over groups, per cell.
    pub fn total_flux(&self) -> Vec<f64> {
        self.flux
            .chunks(self.num_groups)
            .map(|groups| groups.iter().sum())
            .collect()
    }
}
