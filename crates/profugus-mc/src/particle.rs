// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Particle
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::geometry::GeoState;

/// A multigroup neutron history in flight.
#[derive(Debug, Clone)]
pub struct Particle {
    pub geo: GeoState,
    pub group: usize,
    pub weight: f64,
    pub matid: usize,
    /// Geometry cell the history started in.
    pub birth_cell: usize,
    alive: bool,
}

impl Particle {
    pub fn new(group: usize, weight: f64) -> Self {
        Particle {
            geo: GeoState::default(),
            group,
            weight,
            matid: 0,
            birth_cell: 0,
            alive: true,
        }
    }

    #[inline]
    pub fn alive(&self) -> bool {
        self.alive
    }

    #[inline]
    pub fn kill(&mut self) {
        self.alive = false;
    }

    #[inline]
    pub fn live(&mut self) {
        self.alive = true;
    }
}
