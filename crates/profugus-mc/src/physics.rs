// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Multigroup Physics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Analog multigroup collision physics.
//!
//! A collision either scatters (probability `Σs,out(g) / Σt(g)`) into a
//! group sampled from column `g` of the P0 matrix with an isotropic
//! direction, or absorbs. Fission sites are banked at the collision point
//! before the collision outcome is sampled.

use std::f64::consts::PI;
use std::sync::Arc;

use profugus_types::require;
use profugus_types::state::SpaceVector;
use profugus_types::xs::CrossSections;
use rand::Rng;

use crate::fission_source::FissionSite;
use crate::particle::Particle;

#[derive(Debug, Clone)]
pub struct Physics {
    xs: Arc<CrossSections>,
    /// Outscatter `Σ_g' Σs0(g' ← g)` per material and group.
    scatter_out: Vec<Vec<f64>>,
}

impl Physics {
    pub fn new(xs: Arc<CrossSections>) -> Self {
        let scatter_out = xs
            .materials()
            .iter()
            .map(|m| {
                let s0 = &m.scattering[0];
                (0..xs.num_groups()).map(|g| s0.column(g).sum()).collect()
            })
            .collect();
        Physics { xs, scatter_out }
    }

    pub fn xs(&self) -> &Arc<CrossSections> {
        &self.xs
    }

    pub fn num_groups(&self) -> usize {
        self.xs.num_groups()
    }

    #[inline]
    pub fn total(&self, matid: usize, g: usize) -> f64 {
        self.xs.total(matid, g)
    }

    /// Probability that a collision in group `g` is a scatter.
    #[inline]
    pub fn scattering_ratio(&self, matid: usize, g: usize) -> f64 {
        self.scatter_out[matid][g] / self.xs.total(matid, g)
    }

    #[inline]
    pub fn nusigf(&self, matid: usize, g: usize) -> f64 {
        self.xs.nu_sigma_f(matid, g)
    }

    pub fn is_fissionable(&self, matid: usize) -> bool {
        self.xs.material(matid).is_fissionable()
    }

    /// Sample an analog collision at the particle's current position.
    pub fn collide<R: Rng + ?Sized>(&self, p: &mut Particle, rng: &mut R) {
        require!(p.alive());
        let (m, g) = (p.matid, p.group);
        if rng.gen::<f64>() >= self.scattering_ratio(m, g) {
            p.kill();
            return;
        }

        let column = self.xs.scattering(m, 0).column(g);
        p.group = sample_cdf(column.iter().copied(), self.scatter_out[m][g], rng);
        p.geo.dir = sample_isotropic(rng);
    }

    /// Bank `floor(w νΣf / (Σt k) + ξ)` sites at the collision point in
    /// geometry cell `cell`. Returns the number banked.
    pub fn sample_fission_site<R: Rng + ?Sized>(
        &self,
        p: &Particle,
        cell: usize,
        sites: &mut Vec<FissionSite>,
        keff: f64,
        rng: &mut R,
    ) -> usize {
        require!(keff > 0.0);
        let (m, g) = (p.matid, p.group);
        let nusigf = self.nusigf(m, g);
        if nusigf == 0.0 {
            return 0;
        }
        let expected = p.weight * nusigf / (self.total(m, g) * keff);
        let n = (expected + rng.gen::<f64>()).floor() as usize;
        for _ in 0..n {
            sites.push(FissionSite {
                cell,
                r: p.geo.pos,
                weight: 1.0,
            });
        }
        n
    }

    /// Birth group from the fission spectrum of `matid`.
    pub fn sample_group_from_chi<R: Rng + ?Sized>(&self, matid: usize, rng: &mut R) -> usize {
        let chi = &self.xs.material(matid).chi;
        let total: f64 = chi.iter().sum();
        require!(total > 0.0, "material {matid} has no fission spectrum");
        sample_cdf(chi.iter().copied(), total, rng)
    }
}

/// Uniform direction on the unit sphere.
pub fn sample_isotropic<R: Rng + ?Sized>(rng: &mut R) -> SpaceVector {
    let mu: f64 = 2.0 * rng.gen::<f64>() - 1.0;
    let phi = 2.0 * PI * rng.gen::<f64>();
    let s = (1.0 - mu * mu).max(0.0).sqrt();
    [s * phi.cos(), s * phi.sin(), mu]
}

/// Index sampled from unnormalised weights summing to `total`.
fn sample_cdf<R: Rng + ?Sized>(
    weights: impl Iterator<Item = f64>,
    total: f64,
    rng: &mut R,
) -> usize {
    let target = rng.gen::<f64>() * total;
    let mut acc = 0.0;
    let mut last_nonzero = 0;
    for (i, w) in weights.enumerate() {
        if w > 0.0 {
            last_nonzero = i;
        }
        acc += w;
        if target < acc {
            return i;
        }
    }
    last_nonzero
}

#[cfg(test)]
mod tests {
    use super::*;
    use profugus_types::soft_equiv::soft_equiv;
    use profugus_types::state::magnitude;
    use profugus_types::xs::XsLibrary;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const XS_5GRP: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../data/xs_5grp.json"
    ));

    fn five_group() -> Physics {
        let lib = XsLibrary::from_json(XS_5GRP).unwrap();
        let mats = vec!["moderator".to_string(), "fuel".to_string()];
        Physics::new(Arc::new(lib.build(&mats, 0, 0, 4).unwrap()))
    }

    #[test]
    fn test_five_group_regression() {
        let physics = five_group();
        assert_eq!(physics.num_groups(), 5);

        let total_0 = [5.2, 11.4, 18.2, 29.9, 27.3];
        let total_1 = [5.3, 11.8, 20.0, 35.6, 37.1];
        let out = [2.6, 8.3, 13.7, 17.8, 12.0];
        let nusigf_1 = [0.24, 0.96, 4.32, 13.68, 23.52];

        for g in 0..5 {
            assert!(soft_equiv(physics.total(0, g), total_0[g]), "total(0,{g})");
            assert!(soft_equiv(physics.total(1, g), total_1[g]), "total(1,{g})");
            assert!(
                soft_equiv(physics.scattering_ratio(0, g), out[g] / total_0[g]),
                "scattering_ratio(0,{g}) = {}",
                physics.scattering_ratio(0, g)
            );
            assert!(
                soft_equiv(physics.scattering_ratio(1, g), out[g] / total_1[g]),
                "scattering_ratio(1,{g})"
            );
            assert_eq!(physics.nusigf(0, g), 0.0);
            assert!(soft_equiv(physics.nusigf(1, g), nusigf_1[g]), "nusigf(1,{g})");
        }

        assert_eq!(physics.total(0, 0), 5.2);
        assert!(soft_equiv(physics.scattering_ratio(0, 0), 2.6 / 5.2));
        assert_eq!(physics.total(1, 0), 5.3);
        assert_eq!(physics.nusigf(1, 0), 0.24);
        assert!(!physics.is_fissionable(0));
        assert!(physics.is_fissionable(1));
    }

    #[test]
    fn test_collision_outcomes_follow_scattering_ratio() {
        let physics = five_group();
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 20_000;
        let mut scatters = 0;
        let mut downscatter_to = [0usize; 5];
        for _ in 0..trials {
            let mut p = Particle::new(0, 1.0);
            p.matid = 0;
            p.geo.dir = [0.0, 0.0, 1.0];
            physics.collide(&mut p, &mut rng);
            if p.alive() {
                scatters += 1;
                downscatter_to[p.group] += 1;
                assert!((magnitude(&p.geo.dir) - 1.0).abs() < 1e-12);
            }
        }
        let frac = scatters as f64 / trials as f64;
        assert!((frac - 0.5).abs() < 0.02, "scatter fraction {frac}");
        // from group 0: 1.2 / 0.9 / 0.4 / 0.1 / 0.0 out of 2.6
        assert_eq!(downscatter_to[4], 0);
        let p0 = downscatter_to[0] as f64 / scatters as f64;
        assert!((p0 - 1.2 / 2.6).abs() < 0.03, "P(0->0) = {p0}");
    }

    #[test]
    fn test_fission_site_expectation() {
        let physics = five_group();
        let mut rng = StdRng::seed_from_u64(7);
        let mut p = Particle::new(4, 1.0);
        p.matid = 1;
        p.geo.pos = [0.1, 0.2, 0.3];
        let mut sites = Vec::new();
        let trials = 10_000;
        for _ in 0..trials {
            physics.sample_fission_site(&p, 5, &mut sites, 1.0, &mut rng);
        }
        let mean = sites.len() as f64 / trials as f64;
        let expected = 23.52 / 37.1;
        assert!((mean - expected).abs() < 0.02, "mean {mean} vs {expected}");
        assert!(sites.iter().all(|s| s.cell == 5 && s.r == [0.1, 0.2, 0.3]));

        // no sites from a non-fissile material
        p.matid = 0;
        assert_eq!(physics.sample_fission_site(&p, 0, &mut sites, 1.0, &mut rng), 0);
    }

    #[test]
    fn test_chi_sampling_stays_in_spectrum() {
        let physics = five_group();
        let mut rng = StdRng::seed_from_u64(3);
        let mut counts = [0usize; 5];
        for _ in 0..5000 {
            counts[physics.sample_group_from_chi(1, &mut rng)] += 1;
        }
        assert_eq!(counts[3] + counts[4], 0);
        assert!(counts[1] > counts[2]);
    }

    #[test]
    fn test_isotropic_directions_are_unit() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut mean = [0.0; 3];
        for _ in 0..4000 {
            let d = sample_isotropic(&mut rng);
            assert!((magnitude(&d) - 1.0).abs() < 1e-12);
            for a in 0..3 {
                mean[a] += d[a] / 4000.0;
            }
        }
        assert!(mean.iter().all(|m| m.abs() < 0.05), "{mean:?}");
    }
}
