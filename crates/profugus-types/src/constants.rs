// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Sentinel distance for an axis the particle is not moving toward.
pub const HUGE_DISTANCE: f64 = 99e99;

/// Tolerance on |Ω| at geometry entry points.
pub const DIRECTION_TOLERANCE: f64 = 1.0e-5;

/// Tolerance on |Ω| across a reflection.
pub const REFLECT_TOLERANCE: f64 = 1.0e-6;

/// Largest negative face distance, relative to the cell width, that is
/// treated as round-off and clamped to zero.
pub const FACE_TOLERANCE: f64 = 1.0e-10;

/// Message tag carrying a graph size in the fission-matrix reduction.
pub const SIZE_TAG: u32 = 800;

/// Message tag carrying graph (dest, src) pairs.
pub const GRAPH_TAG: u32 = 801;

/// Default relative tolerance for soft equivalence.
pub const SOFT_EQUIV_EPS: f64 = 1.0e-12;

/// Largest supported SPN order.
pub const MAX_SPN_ORDER: usize = 7;
