// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Property-Based Tests (proptest) for profugus-spn
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for profugus-spn using proptest.
//!
//! Covers: energy collapse reaction-rate conservation, grid transfer
//! round trip, multigrid level planning.

use std::sync::Arc;

use ndarray::Array2;
use profugus_math::operator::LinearOperator;
use profugus_spn::energy_collapse::collapse_all_mats;
use profugus_spn::energy_grid_transfer::{EnergyProlongation, EnergyRestriction};
use profugus_spn::energy_multigrid::plan_levels;
use profugus_spn::linear_system::UnknownMap;
use profugus_spn::mat_db::MatDb;
use profugus_types::xs::{CrossSections, MaterialXs};
use proptest::prelude::*;

/// Random partition of `ng` groups into consecutive blocks.
fn partition(ng: usize, cuts: &[bool]) -> Vec<usize> {
    let mut collapse = Vec::new();
    let mut run = 1;
    for &cut in cuts.iter().take(ng - 1) {
        if cut {
            collapse.push(run);
            run = 1;
        } else {
            run += 1;
        }
    }
    collapse.push(run);
    collapse
}

fn material(ng: usize, seed: &[f64]) -> MaterialXs {
    let v = |k: usize| seed[k % seed.len()];
    let mut scat = Array2::zeros((ng, ng));
    for from in 0..ng {
        for to in from..ng {
            scat[[to, from]] = 0.1 * v(3 * from + to) / (ng as f64);
        }
    }
    MaterialXs {
        name: "m".to_string(),
        total: (0..ng).map(|g| 0.5 + v(g)).collect(),
        sigma_f: (0..ng).map(|g| 0.01 * v(g + 1)).collect(),
        nu_sigma_f: (0..ng).map(|g| 0.025 * v(g + 1)).collect(),
        chi: (0..ng).map(|g| if g == 0 { 1.0 } else { 0.0 }).collect(),
        scattering: vec![scat],
    }
}

// ── Energy Collapse ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Weighted reaction rates survive collapsing: Σ_G W_G σ_G = Σ_g w_g σ_g.
    #[test]
    fn collapse_conserves_reaction_rates(
        ng in 1usize..9,
        cuts in prop::collection::vec(any::<bool>(), 8),
        weights in prop::collection::vec(0.1f64..3.0, 8),
        seed in prop::collection::vec(0.1f64..2.0, 5),
    ) {
        let collapse = partition(ng, &cuts);
        let w = &weights[..ng];
        let mut xs = CrossSections::new(ng, 0);
        xs.add(material(ng, &seed)).unwrap();
        let fine = MatDb::new(Arc::new(xs), vec![0; 3]).unwrap();
        let coarse = collapse_all_mats(&fine, &collapse, w).unwrap();

        let f = fine.xs().material(0);
        let c = coarse.xs().material(0);
        let mut start = 0;
        let mut coarse_total = 0.0;
        let mut coarse_out = 0.0;
        for (cg, &n) in collapse.iter().enumerate() {
            let wg: f64 = w[start..start + n].iter().sum();
            coarse_total += wg * c.total[cg];
            coarse_out += wg * c.scattering[0].column(cg).sum();
            start += n;
        }
        let fine_total: f64 = (0..ng).map(|g| w[g] * f.total[g]).sum();
        let fine_out: f64 = (0..ng).map(|g| w[g] * f.scattering[0].column(g).sum()).sum();
        prop_assert!((coarse_total - fine_total).abs() < 1e-12 * fine_total);
        prop_assert!((coarse_out - fine_out).abs() < 1e-12 * (1.0 + fine_out));
        prop_assert!((c.chi.iter().sum::<f64>() - 1.0).abs() < 1e-14);
    }

    /// Restricting an injected coarse vector returns it unchanged.
    #[test]
    fn restrict_prolong_round_trip(
        ng in 1usize..9,
        cells in 1usize..5,
        cuts in prop::collection::vec(any::<bool>(), 8),
        values in prop::collection::vec(-5.0f64..5.0, 40),
    ) {
        let collapse = partition(ng, &cuts);
        let fine = UnknownMap { num_cells: cells, num_groups: ng };
        let coarse = UnknownMap { num_cells: cells, num_groups: collapse.len() };
        let p = EnergyProlongation::new(coarse, fine, &collapse);
        let r = EnergyRestriction::new(fine, coarse, &collapse);

        let x = &values[..coarse.size()];
        let mut y = vec![0.0; fine.size()];
        let mut back = vec![0.0; coarse.size()];
        p.apply_vec(x, &mut y);
        r.apply_vec(&y, &mut back);
        for (a, b) in back.iter().zip(x) {
            prop_assert!((a - b).abs() < 1e-12);
        }
    }
}

// ── Level Planning ───────────────────────────────────────────────────

proptest! {
    /// Every collapse vector partitions the previous level's groups and the
    /// hierarchy stops at one group or at the depth limit.
    #[test]
    fn level_plan_is_consistent(ng in 1usize..64, factor in 2usize..6, depth in 1usize..12) {
        let plan = plan_levels(ng, factor, depth);
        prop_assert_eq!(plan[0].0, ng);
        for pair in plan.windows(2) {
            let (prev, _) = &pair[0];
            let (groups, collapse) = &pair[1];
            prop_assert_eq!(collapse.iter().sum::<usize>(), *prev);
            prop_assert_eq!(collapse.len(), *groups);
            prop_assert!(collapse.iter().all(|&n| n >= 1 && n <= factor));
        }
        let coarse_levels = plan.len() - 1;
        prop_assert!(coarse_levels <= depth);
        let last = plan[plan.len() - 1].0;
        prop_assert!(last == 1 || coarse_levels == depth);
    }
}
