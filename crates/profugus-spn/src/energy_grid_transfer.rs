// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Energy Grid Transfer
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Restriction and prolongation between two energy-group structures on
//! the same spatial mesh.
//!
//! Restriction averages the fine groups of each coarse group; prolongation
//! injects the coarse value into every fine group it covers. Both act cell
//! by cell and follow the [`UnknownMap`] ordering.

use std::ops::Range;

use profugus_math::operator::LinearOperator;
use profugus_types::require;

use crate::energy_collapse::group_ranges;
use crate::linear_system::UnknownMap;

/// Fine → coarse, `y[c, G] = mean_{g∈G} x[c, g]`.
#[derive(Debug, Clone)]
pub struct EnergyRestriction {
    fine: UnknownMap,
    coarse: UnknownMap,
    ranges: Vec<Range<usize>>,
}

impl EnergyRestriction {
    pub fn new(fine: UnknownMap, coarse: UnknownMap, collapse: &[usize]) -> Self {
        require!(fine.num_cells == coarse.num_cells);
        require!(collapse.len() == coarse.num_groups);
        require!(collapse.iter().sum::<usize>() == fine.num_groups);
        EnergyRestriction {
            fine,
            coarse,
            ranges: group_ranges(collapse),
        }
    }
}

impl LinearOperator for EnergyRestriction {
    fn rows(&self) -> usize {
        self.coarse.size()
    }

    fn cols(&self) -> usize {
        self.fine.size()
    }

    fn apply_vec(&self, x: &[f64], y: &mut [f64]) {
        require!(x.len() == self.cols());
        require!(y.len() == self.rows());
        for cell in 0..self.fine.num_cells {
            for (cg, range) in self.ranges.iter().enumerate() {
                let sum: f64 = range.clone().map(|g| x[self.fine.index(cell, g)]).sum();
                y[self.coarse.index(cell, cg)] = sum / range.len() as f64;
            }
        }
    }
}

/// Coarse → fine, `y[c, g] = x[c, G(g)]`.
#[derive(Debug, Clone)]
pub struct EnergyProlongation {
    coarse: UnknownMap,
    fine: UnknownMap,
    ranges: Vec<Range<usize>>,
}

impl EnergyProlongation {
    pub fn new(coarse: UnknownMap, fine: UnknownMap, collapse: &[usize]) -> Self {
        require!(fine.num_cells == coarse.num_cells);
        require!(collapse.len() == coarse.num_groups);
        require!(collapse.iter().sum::<usize>() == fine.num_groups);
        EnergyProlongation {
            coarse,
            fine,
            ranges: group_ranges(collapse),
        }
    }
}

impl LinearOperator for EnergyProlongation {
    fn rows(&self) -> usize {
        self.fine.size()
    }

    fn cols(&self) -> usize {
        self.coarse.size()
    }

    fn apply_vec(&self, x: &[f64], y: &mut [f64]) {
        require!(x.len() == self.cols());
        require!(y.len() == self.rows());
        for cell in 0..self.fine.num_cells {
            for (cg, range) in self.ranges.iter().enumerate() {
                let value = x[self.coarse.index(cell, cg)];
                for g in range.clone() {
                    y[self.fine.index(cell, g)] = value;
                }
            }
        }
    }
}
