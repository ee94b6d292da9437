// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
pub mod problem_builder;
pub mod run;

pub use problem_builder::ProblemBuilder;
pub use run::{run, write_output, RunOutput};
