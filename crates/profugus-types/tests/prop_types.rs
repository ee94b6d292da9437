// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Property-Based Tests (proptest) for profugus-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for profugus-types using proptest.
//!
//! Covers: CartesianMesh indexing and lookup, configuration defaults
//! surviving a serialization roundtrip.

use profugus_types::config::ProblemParams;
use profugus_types::state::{Axis, CartesianMesh};
use proptest::prelude::*;

// ── CartesianMesh ─────────────────────────────────────────────────────

proptest! {
    /// Cardinal index and (i, j, k) are inverse maps.
    #[test]
    fn cardinal_roundtrip(
        nx in 1usize..12,
        ny in 1usize..12,
        nz in 1usize..12,
    ) {
        let mesh = CartesianMesh::uniform([nx, ny, nz], [1.0, 1.0, 1.0]).unwrap();
        prop_assert_eq!(mesh.num_cells(), nx * ny * nz);
        for cell in 0..mesh.num_cells() {
            let (i, j, k) = mesh.ijk_of(cell);
            prop_assert!(i < nx && j < ny && k < nz);
            prop_assert_eq!(mesh.cardinal(i, j, k), cell);
        }
    }

    /// A point strictly inside the box is found in the cell whose edges
    /// bracket it.
    #[test]
    fn interior_points_are_bracketed(
        n in 1usize..20,
        width in 0.1f64..5.0,
        frac in 0.0f64..1.0,
    ) {
        let mesh = CartesianMesh::uniform([n, 1, 1], [width, 1.0, 1.0]).unwrap();
        let x = frac * n as f64 * width;
        let i = mesh.find_along(Axis::X, x);
        prop_assert!(i >= 0 && (i as usize) < n);
        let e = mesh.edges(Axis::X);
        prop_assert!(e[i as usize] <= x + 1e-12);
        prop_assert!(x <= e[i as usize + 1] + 1e-12);
    }

    /// Points outside the box map to -1 or N.
    #[test]
    fn exterior_points_flagged(
        n in 1usize..20,
        offset in 1e-6f64..10.0,
    ) {
        let mesh = CartesianMesh::uniform([n, 1, 1], [1.0, 1.0, 1.0]).unwrap();
        prop_assert_eq!(mesh.find_along(Axis::X, -offset), -1);
        prop_assert_eq!(mesh.find_along(Axis::X, n as f64 + offset), n as i32);
    }

    /// Cell volumes sum to the box volume.
    #[test]
    fn volumes_sum_to_box(
        nx in 1usize..6,
        ny in 1usize..6,
        nz in 1usize..6,
        dx in 0.1f64..3.0,
        dy in 0.1f64..3.0,
        dz in 0.1f64..3.0,
    ) {
        let mesh = CartesianMesh::uniform([nx, ny, nz], [dx, dy, dz]).unwrap();
        let total: f64 = (0..mesh.num_cells())
            .map(|c| {
                let (i, j, k) = mesh.ijk_of(c);
                mesh.volume(i, j, k)
            })
            .sum();
        let expected = nx as f64 * dx * ny as f64 * dy * nz as f64 * dz;
        prop_assert!((total - expected).abs() < 1e-9 * expected.max(1.0));
    }
}

// ── Configuration ─────────────────────────────────────────────────────

proptest! {
    /// Multigrid settings survive a JSON roundtrip.
    #[test]
    fn problem_params_roundtrip(
        coarse_factor in 2usize..8,
        max_depth in 1usize..12,
        np in 1usize..100_000,
    ) {
        let mut params = ProblemParams::default();
        params.preconditioner.coarse_factor = coarse_factor;
        params.preconditioner.max_depth = max_depth;
        params.mc.np = np;
        let json = serde_json::to_string(&params).unwrap();
        let back: ProblemParams = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.preconditioner.coarse_factor, coarse_factor);
        prop_assert_eq!(back.preconditioner.max_depth, max_depth);
        prop_assert_eq!(back.mc.np, np);
        prop_assert_eq!(back.spn_order, 1);
    }
}
