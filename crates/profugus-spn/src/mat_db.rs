// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Material Database
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::sync::Arc;

use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::xs::CrossSections;

/// Cross sections plus the material id of every mesh cell.
#[derive(Debug, Clone)]
pub struct MatDb {
    xs: Arc<CrossSections>,
    matids: Vec<usize>,
}

impl MatDb {
    pub fn new(xs: Arc<CrossSections>, matids: Vec<usize>) -> ProfugusResult<Self> {
        if let Some((cell, &m)) = matids.iter().enumerate().find(|&(_, &m)| m >= xs.num_mat()) {
            return Err(ProfugusError::ConfigError(format!(
                "Cell {cell} has material id {m}, only {} materials defined",
                xs.num_mat()
            )));
        }
        Ok(MatDb { xs, matids })
    }

    pub fn xs(&self) -> &Arc<CrossSections> {
        &self.xs
    }

    #[inline]
    pub fn matid(&self, cell: usize) -> usize {
        self.matids[cell]
    }

    pub fn matids(&self) -> &[usize] {
        &self.matids
    }

    pub fn num_cells(&self) -> usize {
        self.matids.len()
    }

    pub fn num_groups(&self) -> usize {
        self.xs.num_groups()
    }
}
