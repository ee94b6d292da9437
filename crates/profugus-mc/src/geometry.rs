// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Mesh Geometry
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Ray tracking through a structured Cartesian mesh.
//!
//! A particle's [`GeoState`] carries logical cell indices in `[-1, N]` per
//! axis, so a particle that has left the mesh still has a well-defined
//! cell just outside it. Every step is
//!
//! ```text
//! distance_to_boundary  →  move_to_surface | move_to_point
//!                          └→ reflect (reflecting face) / escape
//! ```
//!
//! Geometric invariant violations are tracking bugs and abort through the
//! contract macros.

use std::sync::Arc;

use profugus_types::constants::{
    DIRECTION_TOLERANCE, FACE_TOLERANCE, HUGE_DISTANCE, REFLECT_TOLERANCE,
};
use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::state::{dot, magnitude, normalize, Axis, CartesianMesh, Ijk, SpaceVector};
use profugus_types::{check, ensure, require};

/// Mesh face a particle is crossing or reflecting from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Face {
    #[default]
    None,
    MinusX,
    PlusX,
    MinusY,
    PlusY,
    MinusZ,
    PlusZ,
}

impl Face {
    /// Face crossed when leaving a cell along `axis` in direction `positive`.
    pub fn crossing(axis: Axis, positive: bool) -> Face {
        match (axis, positive) {
            (Axis::X, false) => Face::MinusX,
            (Axis::X, true) => Face::PlusX,
            (Axis::Y, false) => Face::MinusY,
            (Axis::Y, true) => Face::PlusY,
            (Axis::Z, false) => Face::MinusZ,
            (Axis::Z, true) => Face::PlusZ,
        }
    }

    /// Position in the `[-x, +x, -y, +y, -z, +z]` flag order.
    pub fn index(self) -> Option<usize> {
        match self {
            Face::None => None,
            Face::MinusX => Some(0),
            Face::PlusX => Some(1),
            Face::MinusY => Some(2),
            Face::PlusY => Some(3),
            Face::MinusZ => Some(4),
            Face::PlusZ => Some(5),
        }
    }

    /// Outward unit normal, or the zero vector for [`Face::None`].
    pub fn normal(self) -> SpaceVector {
        match self {
            Face::None => [0.0, 0.0, 0.0],
            Face::MinusX => [-1.0, 0.0, 0.0],
            Face::PlusX => [1.0, 0.0, 0.0],
            Face::MinusY => [0.0, -1.0, 0.0],
            Face::PlusY => [0.0, 1.0, 0.0],
            Face::MinusZ => [0.0, 0.0, -1.0],
            Face::PlusZ => [0.0, 0.0, 1.0],
        }
    }
}

/// Where a particle is with respect to the mesh boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryState {
    Inside,
    Reflect,
    Outside,
}

/// Per-particle tracking state.
#[derive(Debug, Clone, Default)]
pub struct GeoState {
    pub pos: SpaceVector,
    pub dir: SpaceVector,
    pub ijk: Ijk,
    pub next_ijk: Ijk,
    pub next_dist: f64,
    pub next_face: Face,
    pub exiting_face: Face,
    pub reflecting_face: Face,
}

/// Cartesian mesh plus per-cell material ids and reflecting faces.
#[derive(Debug, Clone)]
pub struct MeshGeometry {
    mesh: Arc<CartesianMesh>,
    matids: Vec<usize>,
    reflect: [bool; 6],
}

impl MeshGeometry {
    /// `reflect` flags are ordered `[-x, +x, -y, +y, -z, +z]`.
    pub fn new(
        mesh: Arc<CartesianMesh>,
        matids: Vec<usize>,
        reflect: [bool; 6],
    ) -> ProfugusResult<Self> {
        if matids.len() != mesh.num_cells() {
            return Err(ProfugusError::ConfigError(format!(
                "Geometry has {} cells but {} material ids",
                mesh.num_cells(),
                matids.len()
            )));
        }
        Ok(MeshGeometry {
            mesh,
            matids,
            reflect,
        })
    }

    pub fn mesh(&self) -> &Arc<CartesianMesh> {
        &self.mesh
    }

    pub fn matids(&self) -> &[usize] {
        &self.matids
    }

    pub fn num_cells(&self) -> usize {
        self.mesh.num_cells()
    }

    pub fn reflecting_faces(&self) -> [bool; 6] {
        self.reflect
    }

    /// Place a particle at `r` moving along `d` (normalised here).
    pub fn initialize(&self, r: SpaceVector, d: SpaceVector, state: &mut GeoState) {
        state.pos = r;
        state.dir = d;
        normalize(&mut state.dir);
        require!(
            (magnitude(&state.dir) - 1.0).abs() < DIRECTION_TOLERANCE,
            "direction {:?} cannot be normalised",
            d
        );

        state.ijk = self.mesh.find(&r);
        state.next_ijk = state.ijk;
        state.next_dist = 0.0;
        state.next_face = Face::None;
        state.exiting_face = Face::None;
        state.reflecting_face = Face::None;

        for axis in Axis::ALL {
            let n = self.mesh.num_cells_along(axis) as i32;
            let v = state.ijk.get(axis);
            ensure!(v >= -1 && v <= n);
        }
    }

    /// Distance to the next mesh face along the current direction.
    ///
    /// Stores the distance, the face and the cell behind it in `state`.
    /// Ties between axes go to the earlier axis (X, then Y, then Z).
    pub fn distance_to_boundary(&self, state: &mut GeoState) -> f64 {
        check!((magnitude(&state.dir) - 1.0).abs() < DIRECTION_TOLERANCE);

        let mut dist = HUGE_DISTANCE;
        let mut next_ijk = state.ijk;
        let mut next_face = Face::None;
        let mut width = 0.0;

        for axis in Axis::ALL {
            let a = axis.index();
            let edges = self.mesh.edges(axis);
            let n = self.mesh.num_cells_along(axis) as i32;
            let i = state.ijk.get(axis);
            let d = state.dir[a];

            let positive = d > 0.0 && i < n;
            let negative = d < 0.0 && i > -1;
            let none = !positive && !negative;
            check!(u8::from(positive) + u8::from(negative) + u8::from(none) == 1);

            let axis_dist = if positive {
                (edges[(i + 1) as usize] - state.pos[a]) / d
            } else if negative {
                (edges[i as usize] - state.pos[a]) / d
            } else {
                HUGE_DISTANCE
            };

            if axis_dist < dist {
                dist = axis_dist;
                next_ijk = state.ijk;
                next_ijk.set(axis, if positive { i + 1 } else { i - 1 });
                next_face = Face::crossing(axis, positive);
                let c = i.clamp(0, n - 1) as usize;
                width = edges[c + 1] - edges[c];
            }
        }

        // a particle sitting on a face can see a round-off negative distance
        if dist < 0.0 && dist > -FACE_TOLERANCE * width {
            dist = 0.0;
        }
        state.next_dist = dist;
        state.next_ijk = next_ijk;
        state.next_face = next_face;

        ensure!(dist >= 0.0);
        dist
    }

    /// Move to the face found by the last [`Self::distance_to_boundary`].
    ///
    /// Leaving the mesh through a reflecting face keeps the particle in the
    /// boundary cell and flags the face; any other exit leaves it outside.
    pub fn move_to_surface(&self, state: &mut GeoState) {
        require!(state.next_dist < HUGE_DISTANCE);
        require!(state.next_face != Face::None);

        self.advance(state.next_dist, state);
        state.exiting_face = state.next_face;
        state.reflecting_face = Face::None;

        if self.mesh.is_inside(&state.next_ijk) {
            state.ijk = state.next_ijk;
            return;
        }

        let reflecting = state
            .exiting_face
            .index()
            .map(|f| self.reflect[f])
            .unwrap_or(false);
        if reflecting && self.mesh.is_inside(&state.ijk) {
            state.reflecting_face = state.exiting_face;
        } else {
            state.ijk = state.next_ijk;
        }
    }

    /// Move `d` along the direction without leaving the current cell.
    pub fn move_to_point(&self, d: f64, state: &mut GeoState) {
        require!(d >= 0.0);
        self.advance(d, state);
        state.exiting_face = Face::None;
        state.reflecting_face = Face::None;
    }

    /// Mirror the direction about the reflecting face.
    ///
    /// Returns `false` (and does nothing) unless the particle is flagged on
    /// a reflecting face.
    pub fn reflect(&self, state: &mut GeoState) -> bool {
        check!((magnitude(&state.dir) - 1.0).abs() < DIRECTION_TOLERANCE);
        if state.reflecting_face == Face::None {
            return false;
        }

        let n = state.reflecting_face.normal();
        let dn = dot(&state.dir, &n);
        for a in 0..3 {
            state.dir[a] -= 2.0 * dn * n[a];
        }
        state.reflecting_face = Face::None;

        ensure!((magnitude(&state.dir) - 1.0).abs() < REFLECT_TOLERANCE);
        true
    }

    /// Outward normal of the face being crossed, zero when not on a face.
    pub fn normal(&self, state: &GeoState) -> SpaceVector {
        state.exiting_face.normal()
    }

    pub fn boundary_state(&self, state: &GeoState) -> BoundaryState {
        if state.reflecting_face != Face::None {
            BoundaryState::Reflect
        } else if self.mesh.is_inside(&state.ijk) {
            BoundaryState::Inside
        } else {
            BoundaryState::Outside
        }
    }

    /// Cardinal index of the current cell; the particle must be inside.
    pub fn cell(&self, state: &GeoState) -> usize {
        require!(self.mesh.is_inside(&state.ijk));
        self.mesh.cardinal(
            state.ijk.i as usize,
            state.ijk.j as usize,
            state.ijk.k as usize,
        )
    }

    pub fn matid(&self, state: &GeoState) -> usize {
        self.matids[self.cell(state)]
    }

    pub fn position<'a>(&self, state: &'a GeoState) -> &'a SpaceVector {
        &state.pos
    }

    pub fn direction<'a>(&self, state: &'a GeoState) -> &'a SpaceVector {
        &state.dir
    }

    /// Rotate the direction by polar cosine `costheta` and azimuth `phi`
    /// about the current direction.
    pub fn change_direction(&self, costheta: f64, phi: f64, state: &mut GeoState) {
        require!((-1.0..=1.0).contains(&costheta));
        let [u, v, w] = state.dir;
        let sintheta = (1.0 - costheta * costheta).max(0.0).sqrt();
        let (sinphi, cosphi) = phi.sin_cos();
        let a = (1.0 - w * w).max(0.0).sqrt();

        state.dir = if a < 1.0e-10 {
            // parallel to z: any perpendicular frame will do
            [sintheta * cosphi, sintheta * sinphi, costheta * w.signum()]
        } else {
            [
                costheta * u + sintheta * (u * w * cosphi - v * sinphi) / a,
                costheta * v + sintheta * (v * w * cosphi + u * sinphi) / a,
                costheta * w - a * sintheta * cosphi,
            ]
        };
        normalize(&mut state.dir);
        ensure!((magnitude(&state.dir) - 1.0).abs() < DIRECTION_TOLERANCE);
    }

    fn advance(&self, d: f64, state: &mut GeoState) {
        for a in 0..3 {
            state.pos[a] += d * state.dir[a];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_mesh(n: usize, reflect: [bool; 6]) -> MeshGeometry {
        let mesh = Arc::new(CartesianMesh::uniform([n, n, n], [1.0, 1.0, 1.0]).unwrap());
        MeshGeometry::new(mesh, vec![0; n * n * n], reflect).unwrap()
    }

    #[test]
    fn test_distance_to_nearest_face() {
        let geo = unit_mesh(4, [false; 6]);
        let mut s = GeoState::default();
        geo.initialize([0.5, 0.5, 0.5], [1.0, 0.0, 0.0], &mut s);
        assert_eq!(s.ijk, Ijk::new(0, 0, 0));
        let d = geo.distance_to_boundary(&mut s);
        assert!((d - 0.5).abs() < 1e-15, "d = {d}");
        assert_eq!(s.next_ijk, Ijk::new(1, 0, 0));
        assert_eq!(s.next_face, Face::PlusX);
    }

    #[test]
    fn test_oblique_distance_and_tie_break() {
        let geo = unit_mesh(3, [false; 6]);
        let mut s = GeoState::default();
        let c = 1.0 / 3.0_f64.sqrt();
        geo.initialize([1.5, 1.5, 1.5], [c, c, c], &mut s);
        let d = geo.distance_to_boundary(&mut s);
        assert!((d - 0.5 / c).abs() < 1e-12);
        // equal distances on all axes: X wins
        assert_eq!(s.next_face, Face::PlusX);
        assert_eq!(s.next_ijk, Ijk::new(2, 1, 1));
    }

    #[test]
    fn test_negative_direction() {
        let geo = unit_mesh(4, [false; 6]);
        let mut s = GeoState::default();
        geo.initialize([2.25, 0.5, 3.9], [0.0, 0.0, -1.0], &mut s);
        let d = geo.distance_to_boundary(&mut s);
        assert!((d - 0.9).abs() < 1e-12);
        assert_eq!(s.next_face, Face::MinusZ);
        assert_eq!(s.next_ijk, Ijk::new(2, 0, 2));
    }

    #[test]
    fn test_initialize_normalises_and_allows_outside() {
        let geo = unit_mesh(2, [false; 6]);
        let mut s = GeoState::default();
        geo.initialize([-0.5, 1.0, 2.5], [2.0, 0.0, 0.0], &mut s);
        assert_eq!(s.dir, [1.0, 0.0, 0.0]);
        assert_eq!(s.ijk, Ijk::new(-1, 1, 2));
        assert_eq!(geo.boundary_state(&s), BoundaryState::Outside);
    }

    #[test]
    fn test_reflect_plus_x() {
        let geo = unit_mesh(2, [true; 6]);
        let mut s = GeoState::default();
        geo.initialize([1.5, 0.5, 0.5], [1.0, 0.0, 0.0], &mut s);
        geo.distance_to_boundary(&mut s);
        geo.move_to_surface(&mut s);
        assert_eq!(geo.boundary_state(&s), BoundaryState::Reflect);
        assert_eq!(s.ijk, Ijk::new(1, 0, 0));
        assert_eq!(geo.normal(&s), [1.0, 0.0, 0.0]);

        assert!(geo.reflect(&mut s));
        assert_eq!(s.dir, [-1.0, 0.0, 0.0]);
        assert!((magnitude(&s.dir) - 1.0).abs() < 1e-6);
        assert_eq!(geo.boundary_state(&s), BoundaryState::Inside);
        // nothing left to reflect
        assert!(!geo.reflect(&mut s));
    }

    #[test]
    fn test_oblique_reflection_preserves_norm() {
        let geo = unit_mesh(1, [true; 6]);
        let mut s = GeoState::default();
        geo.initialize([0.5, 0.5, 0.5], [0.3, -0.4, 0.5], &mut s);
        let before = s.dir;
        geo.distance_to_boundary(&mut s);
        geo.move_to_surface(&mut s);
        let face = s.reflecting_face;
        assert!(geo.reflect(&mut s));
        let axis = match face {
            Face::MinusX | Face::PlusX => 0,
            Face::MinusY | Face::PlusY => 1,
            _ => 2,
        };
        for a in 0..3 {
            let expected = if a == axis { -before[a] } else { before[a] };
            assert!((s.dir[a] - expected).abs() < 1e-12);
        }
        assert!((magnitude(&s.dir) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_vacuum_face_escapes() {
        let geo = unit_mesh(2, [false; 6]);
        let mut s = GeoState::default();
        geo.initialize([0.5, 0.5, 0.5], [0.0, -1.0, 0.0], &mut s);
        geo.distance_to_boundary(&mut s);
        geo.move_to_surface(&mut s);
        assert_eq!(geo.boundary_state(&s), BoundaryState::Outside);
        assert_eq!(s.ijk, Ijk::new(0, -1, 0));
        assert_eq!(s.exiting_face, Face::MinusY);
        assert!(!geo.reflect(&mut s));
    }

    #[test]
    fn test_interior_crossing_updates_cell() {
        let geo = unit_mesh(3, [false; 6]);
        let mut s = GeoState::default();
        geo.initialize([0.5, 0.5, 0.5], [0.0, 1.0, 0.0], &mut s);
        geo.distance_to_boundary(&mut s);
        geo.move_to_surface(&mut s);
        assert_eq!(geo.boundary_state(&s), BoundaryState::Inside);
        assert_eq!(geo.cell(&s), 3);
        assert!((s.pos[1] - 1.0).abs() < 1e-15);
        // from the face, the next boundary is a full cell away
        let d = geo.distance_to_boundary(&mut s);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_move_to_point_and_normal() {
        let geo = unit_mesh(2, [false; 6]);
        let mut s = GeoState::default();
        geo.initialize([0.1, 0.1, 0.1], [0.0, 0.0, 1.0], &mut s);
        geo.move_to_point(0.3, &mut s);
        assert!((s.pos[2] - 0.4).abs() < 1e-15);
        assert_eq!(geo.normal(&s), [0.0, 0.0, 0.0]);
        assert_eq!(geo.cell(&s), 0);
    }

    #[test]
    fn test_change_direction_angle() {
        let geo = unit_mesh(1, [false; 6]);
        let mut s = GeoState::default();
        geo.initialize([0.5, 0.5, 0.5], [0.6, 0.0, 0.8], &mut s);
        let before = s.dir;
        geo.change_direction(0.25, 1.1, &mut s);
        assert!((dot(&before, &s.dir) - 0.25).abs() < 1e-12);
        // along z
        geo.initialize([0.5, 0.5, 0.5], [0.0, 0.0, 1.0], &mut s);
        geo.change_direction(-0.5, 0.0, &mut s);
        assert!((s.dir[2] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_matids_rejected() {
        let mesh = Arc::new(CartesianMesh::uniform([2, 2, 1], [1.0, 1.0, 1.0]).unwrap());
        assert!(MeshGeometry::new(mesh, vec![0; 3], [false; 6]).is_err());
    }

    #[test]
    #[should_panic(expected = "Assertion")]
    fn test_cell_outside_is_contract_violation() {
        let geo = unit_mesh(1, [false; 6]);
        let mut s = GeoState::default();
        geo.initialize([5.0, 0.5, 0.5], [1.0, 0.0, 0.0], &mut s);
        let _ = geo.cell(&s);
    }

    #[test]
    fn test_round_off_behind_face_is_clamped() {
        let geo = unit_mesh(4, [false; 6]);
        let mut s = GeoState::default();
        geo.initialize([0.5, 0.5, 0.5], [1.0, 0.0, 0.0], &mut s);
        s.pos[0] = 1.0 + 1e-13;
        assert_eq!(geo.distance_to_boundary(&mut s), 0.0);
        assert_eq!(s.next_face, Face::PlusX);
    }

    #[test]
    #[should_panic(expected = "Assertion")]
    fn test_position_past_face_is_contract_violation() {
        let geo = unit_mesh(4, [false; 6]);
        let mut s = GeoState::default();
        geo.initialize([0.5, 0.5, 0.5], [1.0, 0.0, 0.0], &mut s);
        // cell index no longer matches the position
        s.pos[0] = 1.7;
        let _ = geo.distance_to_boundary(&mut s);
    }
}
