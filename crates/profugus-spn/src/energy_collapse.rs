// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Energy Collapse
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Collapse multigroup cross sections onto a coarser group structure.
//!
//! `collapse[G]` consecutive fine groups form coarse group `G`. Within a
//! coarse group every reaction is averaged with the fine-group `weights`
//! (a flux spectrum, or ones):
//!
//! - totals and fission cross sections: weighted mean
//! - `chi`: summed, so the coarse spectrum stays normalised
//! - scattering `G ← G'`: `Σ_{g∈G} Σ_{g'∈G'} w_g' σ(g ← g') / Σ_{g'∈G'} w_g'`

use std::ops::Range;
use std::sync::Arc;

use ndarray::Array2;
use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::xs::{CrossSections, MaterialXs};

use crate::mat_db::MatDb;

/// Fine-group range of every coarse group.
pub fn group_ranges(collapse: &[usize]) -> Vec<Range<usize>> {
    let mut start = 0;
    collapse
        .iter()
        .map(|&n| {
            let r = start..start + n;
            start += n;
            r
        })
        .collect()
}

fn weighted_mean(values: &[f64], weights: &[f64], range: &Range<usize>, wsum: f64) -> f64 {
    range.clone().map(|g| weights[g] * values[g]).sum::<f64>() / wsum
}

fn collapse_material(
    mat: &MaterialXs,
    ranges: &[Range<usize>],
    weights: &[f64],
    wsums: &[f64],
) -> MaterialXs {
    let ncg = ranges.len();
    let mean = |values: &[f64]| -> Vec<f64> {
        ranges
            .iter()
            .zip(wsums)
            .map(|(r, &ws)| weighted_mean(values, weights, r, ws))
            .collect()
    };

    let chi = ranges
        .iter()
        .map(|r| r.clone().map(|g| mat.chi[g]).sum())
        .collect();

    let scattering = mat
        .scattering
        .iter()
        .map(|fine| {
            let mut coarse = Array2::zeros((ncg, ncg));
            for (to, to_range) in ranges.iter().enumerate() {
                for (from, from_range) in ranges.iter().enumerate() {
                    let mut sum = 0.0;
                    for g_from in from_range.clone() {
                        let out: f64 = to_range.clone().map(|g_to| fine[[g_to, g_from]]).sum();
                        sum += weights[g_from] * out;
                    }
                    coarse[[to, from]] = sum / wsums[from];
                }
            }
            coarse
        })
        .collect();

    MaterialXs {
        name: mat.name.clone(),
        total: mean(&mat.total),
        sigma_f: mean(&mat.sigma_f),
        nu_sigma_f: mean(&mat.nu_sigma_f),
        chi,
        scattering,
    }
}

/// Collapse every material of `mat_db`; cell material ids are unchanged.
pub fn collapse_all_mats(mat_db: &MatDb, collapse: &[usize], weights: &[f64]) -> ProfugusResult<MatDb> {
    let xs = mat_db.xs();
    let ng = xs.num_groups();
    if collapse.iter().sum::<usize>() != ng || collapse.contains(&0) {
        return Err(ProfugusError::ConfigError(format!(
            "Collapse vector {collapse:?} does not partition {ng} groups"
        )));
    }
    if weights.len() != ng {
        return Err(ProfugusError::ConfigError(format!(
            "Collapse weights have {} entries, expected {ng}",
            weights.len()
        )));
    }

    let ranges = group_ranges(collapse);
    let wsums: Vec<f64> = ranges.iter().map(|r| weights[r.clone()].iter().sum()).collect();
    if let Some(g) = wsums.iter().position(|&w| w <= 0.0) {
        return Err(ProfugusError::ConfigError(format!(
            "Collapse weights of coarse group {g} sum to zero"
        )));
    }

    let mut coarse = CrossSections::new(ranges.len(), xs.pn_order());
    if let Some(bounds) = xs.group_bounds() {
        let mut cb: Vec<f64> = ranges.iter().map(|r| bounds[r.start]).collect();
        cb.push(bounds[ng]);
        coarse.set_group_bounds(cb)?;
    }
    for mat in xs.materials() {
        coarse.add(collapse_material(mat, &ranges, weights, &wsums))?;
    }

    MatDb::new(Arc::new(coarse), mat_db.matids().to_vec())
}
