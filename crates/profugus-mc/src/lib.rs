// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — MC
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
pub mod anderson_operator;
pub mod fission_matrix;
pub mod fission_source;
pub mod geometry;
pub mod kde;
pub mod keff_solver;
pub mod particle;
pub mod physics;
pub mod tally;
pub mod transporter;
