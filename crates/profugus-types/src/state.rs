// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{ProfugusError, ProfugusResult};

/// Position or direction in 3D space.
pub type SpaceVector = [f64; 3];

#[inline]
pub fn dot(a: &SpaceVector, b: &SpaceVector) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn magnitude(v: &SpaceVector) -> f64 {
    dot(v, v).sqrt()
}

/// Scale `v` to unit length. A zero vector is left untouched.
#[inline]
pub fn normalize(v: &mut SpaceVector) {
    let norm = magnitude(v);
    if norm > 0.0 {
        let inv = 1.0 / norm;
        v[0] *= inv;
        v[1] *= inv;
        v[2] *= inv;
    }
}

/// Cartesian axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Logical (i, j, k) cell coordinates.
///
/// Components range over `[-1, N]`: `-1` and `N` mean "just outside" the
/// mesh on the low and high side of that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Ijk {
    pub i: i32,
    pub j: i32,
    pub k: i32,
}

impl Ijk {
    pub fn new(i: i32, j: i32, k: i32) -> Self {
        Ijk { i, j, k }
    }

    #[inline]
    pub fn get(&self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.i,
            Axis::Y => self.j,
            Axis::Z => self.k,
        }
    }

    #[inline]
    pub fn set(&mut self, axis: Axis, value: i32) {
        match axis {
            Axis::X => self.i = value,
            Axis::Y => self.j = value,
            Axis::Z => self.k = value,
        }
    }
}

/// Structured Cartesian mesh defined by its cell edges on each axis.
///
/// Cells are numbered with i fastest: `cell = i + Nx * (j + Ny * k)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CartesianMesh {
    edges: [Vec<f64>; 3],
}

impl CartesianMesh {
    /// Build from explicit edges. Each axis needs at least two strictly
    /// increasing, finite edges.
    pub fn new(x_edges: Vec<f64>, y_edges: Vec<f64>, z_edges: Vec<f64>) -> ProfugusResult<Self> {
        let edges = [x_edges, y_edges, z_edges];
        for (axis, e) in edges.iter().enumerate() {
            if e.len() < 2 {
                return Err(ProfugusError::ConfigError(format!(
                    "Mesh axis {axis} needs at least 2 edges, got {}",
                    e.len()
                )));
            }
            if e.iter().any(|v| !v.is_finite()) {
                return Err(ProfugusError::ConfigError(format!(
                    "Mesh axis {axis} has non-finite edges"
                )));
            }
            if e.windows(2).any(|w| w[1] <= w[0]) {
                return Err(ProfugusError::ConfigError(format!(
                    "Mesh axis {axis} edges must be strictly increasing"
                )));
            }
        }
        Ok(CartesianMesh { edges })
    }

    /// Uniform mesh with `cells[d]` cells of width `delta[d]` starting at 0.
    pub fn uniform(cells: [usize; 3], delta: [f64; 3]) -> ProfugusResult<Self> {
        let axis_edges =
            |n: usize, d: f64| -> Vec<f64> { (0..=n).map(|i| i as f64 * d).collect() };
        if delta.iter().any(|&d| !d.is_finite() || d <= 0.0) {
            return Err(ProfugusError::ConfigError(format!(
                "Uniform mesh cell widths must be finite and > 0, got {delta:?}"
            )));
        }
        CartesianMesh::new(
            axis_edges(cells[0], delta[0]),
            axis_edges(cells[1], delta[1]),
            axis_edges(cells[2], delta[2]),
        )
    }

    #[inline]
    pub fn edges(&self, axis: Axis) -> &[f64] {
        &self.edges[axis.index()]
    }

    #[inline]
    pub fn num_cells_along(&self, axis: Axis) -> usize {
        self.edges[axis.index()].len() - 1
    }

    pub fn num_cells(&self) -> usize {
        Axis::ALL
            .iter()
            .map(|&a| self.num_cells_along(a))
            .product()
    }

    /// Width of cell `i` along `axis`.
    #[inline]
    pub fn width(&self, axis: Axis, i: usize) -> f64 {
        let e = &self.edges[axis.index()];
        e[i + 1] - e[i]
    }

    pub fn volume(&self, i: usize, j: usize, k: usize) -> f64 {
        self.width(Axis::X, i) * self.width(Axis::Y, j) * self.width(Axis::Z, k)
    }

    pub fn lower(&self) -> SpaceVector {
        [self.edges[0][0], self.edges[1][0], self.edges[2][0]]
    }

    pub fn upper(&self) -> SpaceVector {
        [
            *self.edges[0].last().unwrap_or(&0.0),
            *self.edges[1].last().unwrap_or(&0.0),
            *self.edges[2].last().unwrap_or(&0.0),
        ]
    }

    /// Cardinal cell index of in-mesh logical coordinates.
    #[inline]
    pub fn cardinal(&self, i: usize, j: usize, k: usize) -> usize {
        let nx = self.num_cells_along(Axis::X);
        let ny = self.num_cells_along(Axis::Y);
        i + nx * (j + ny * k)
    }

    /// Logical coordinates of a cardinal cell index.
    #[inline]
    pub fn ijk_of(&self, cell: usize) -> (usize, usize, usize) {
        let nx = self.num_cells_along(Axis::X);
        let ny = self.num_cells_along(Axis::Y);
        (cell % nx, (cell / nx) % ny, cell / (nx * ny))
    }

    /// Cell index along one axis for coordinate `x`.
    ///
    /// Returns `-1` below the first edge and `N` above the last; a point
    /// exactly on the last edge belongs to the last cell.
    pub fn find_along(&self, axis: Axis, x: f64) -> i32 {
        let e = &self.edges[axis.index()];
        let n = e.len() - 1;
        if x < e[0] {
            return -1;
        }
        if x > e[n] {
            return n as i32;
        }
        if x == e[n] {
            return n as i32 - 1;
        }
        (e.partition_point(|&edge| edge <= x) - 1) as i32
    }

    /// Logical coordinates of the cell enclosing `r` (possibly outside).
    pub fn find(&self, r: &SpaceVector) -> Ijk {
        Ijk::new(
            self.find_along(Axis::X, r[0]),
            self.find_along(Axis::Y, r[1]),
            self.find_along(Axis::Z, r[2]),
        )
    }

    /// True when all components are inside `[0, N)`.
    pub fn is_inside(&self, ijk: &Ijk) -> bool {
        Axis::ALL.iter().all(|&a| {
            let v = ijk.get(a);
            v >= 0 && (v as usize) < self.num_cells_along(a)
        })
    }

    /// Cardinal index of the cell containing `r`, if inside the mesh.
    pub fn cell_containing(&self, r: &SpaceVector) -> Option<usize> {
        let ijk = self.find(r);
        if self.is_inside(&ijk) {
            Some(self.cardinal(ijk.i as usize, ijk.j as usize, ijk.k as usize))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_mesh_counts() {
        let mesh = CartesianMesh::uniform([4, 3, 2], [1.0, 2.0, 10.0]).unwrap();
        assert_eq!(mesh.num_cells_along(Axis::X), 4);
        assert_eq!(mesh.num_cells_along(Axis::Y), 3);
        assert_eq!(mesh.num_cells_along(Axis::Z), 2);
        assert_eq!(mesh.num_cells(), 24);
        assert!((mesh.volume(0, 0, 0) - 20.0).abs() < 1e-12);
        assert_eq!(mesh.upper(), [4.0, 6.0, 20.0]);
    }

    #[test]
    fn test_cardinal_roundtrip() {
        let mesh = CartesianMesh::uniform([3, 4, 5], [1.0, 1.0, 1.0]).unwrap();
        for cell in 0..mesh.num_cells() {
            let (i, j, k) = mesh.ijk_of(cell);
            assert_eq!(mesh.cardinal(i, j, k), cell);
        }
        assert_eq!(mesh.cardinal(1, 2, 3), 1 + 3 * (2 + 4 * 3));
    }

    #[test]
    fn test_find_along_outside_and_edges() {
        let mesh = CartesianMesh::uniform([4, 4, 4], [1.0, 1.0, 1.0]).unwrap();
        assert_eq!(mesh.find_along(Axis::X, -0.5), -1);
        assert_eq!(mesh.find_along(Axis::X, 0.0), 0);
        assert_eq!(mesh.find_along(Axis::X, 0.5), 0);
        assert_eq!(mesh.find_along(Axis::X, 1.0), 1);
        assert_eq!(mesh.find_along(Axis::X, 4.0), 3);
        assert_eq!(mesh.find_along(Axis::X, 4.5), 4);
        assert!(mesh.cell_containing(&[5.0, 0.5, 0.5]).is_none());
        assert_eq!(mesh.cell_containing(&[1.5, 0.5, 0.5]), Some(1));
    }

    #[test]
    fn test_rejects_bad_edges() {
        assert!(CartesianMesh::new(vec![0.0], vec![0.0, 1.0], vec![0.0, 1.0]).is_err());
        assert!(CartesianMesh::new(vec![0.0, 0.0], vec![0.0, 1.0], vec![0.0, 1.0]).is_err());
        assert!(CartesianMesh::uniform([2, 2, 2], [1.0, -1.0, 1.0]).is_err());
    }

    #[test]
    fn test_normalize() {
        let mut v = [3.0, 0.0, 4.0];
        normalize(&mut v);
        assert!((magnitude(&v) - 1.0).abs() < 1e-15);
        assert!((v[0] - 0.6).abs() < 1e-15);
    }
}
