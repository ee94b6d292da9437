// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Soft Equivalence
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::SOFT_EQUIV_EPS;

/// Relative equality: `|value - reference| < eps * |reference|`, falling
/// back to an absolute test when `reference` is zero.
#[inline]
pub fn soft_equiv_eps(value: f64, reference: f64, eps: f64) -> bool {
    if reference == 0.0 {
        return value.abs() < eps;
    }
    (value - reference).abs() < eps * reference.abs()
}

#[inline]
pub fn soft_equiv(value: f64, reference: f64) -> bool {
    soft_equiv_eps(value, reference, SOFT_EQUIV_EPS)
}

/// Element-wise [`soft_equiv_eps`]; slices of different length are never
/// equivalent.
pub fn soft_equiv_slice(values: &[f64], reference: &[f64], eps: f64) -> bool {
    values.len() == reference.len()
        && values
            .iter()
            .zip(reference)
            .all(|(&v, &r)| soft_equiv_eps(v, r, eps))
}
