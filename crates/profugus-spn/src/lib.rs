// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — SPN
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
pub mod dimensions;
pub mod eigenvalue_solver;
pub mod energy_collapse;
pub mod energy_grid_transfer;
pub mod energy_multigrid;
pub mod fixed_source_solver;
pub mod linear_system;
pub mod mat_db;
pub mod state;
pub mod time_dependent_solver;
pub mod timestep;
