// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Comm
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
pub mod cluster;
pub mod communicator;
pub mod domain;
pub mod parallel_utils;
pub mod topology;

pub use cluster::{LocalCluster, ThreadComm};
pub use communicator::{CommExt, Communicator, Datum, Payload, SerialComm};
