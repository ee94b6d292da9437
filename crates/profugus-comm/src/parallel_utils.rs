// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Parallel Utilities
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use profugus_types::soft_equiv::soft_equiv_eps;

use crate::communicator::{CommExt, Communicator};

/// Default tolerance of [`check_global_equiv_float`].
pub const GLOBAL_EQUIV_EPS: f64 = 1.0e-8;

/// True on every node when all nodes hold the same integer.
pub fn check_global_equiv_int<C: Communicator + ?Sized>(comm: &C, local: i64) -> bool {
    let mut reference = [local];
    comm.broadcast(&mut reference, 0);
    let mismatch = i64::from(reference[0] != local);
    comm.sum_scalar(mismatch) == 0
}

/// True on every node when all nodes hold values soft-equivalent to node
/// 0's within `eps`.
pub fn check_global_equiv_float<C: Communicator + ?Sized>(comm: &C, local: f64, eps: f64) -> bool {
    let mut reference = [local];
    comm.broadcast(&mut reference, 0);
    let mismatch = i64::from(!soft_equiv_eps(local, reference[0], eps));
    comm.sum_scalar(mismatch) == 0
}
