// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#[macro_use]
pub mod dbc;

pub mod config;
pub mod constants;
pub mod error;
pub mod soft_equiv;
pub mod state;
pub mod xs;
