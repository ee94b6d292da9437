// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — SPN Dimensions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use profugus_types::constants::MAX_SPN_ORDER;
use profugus_types::error::{ProfugusError, ProfugusResult};

/// SPN solver dimensions: order N and the equation/moment counts it
/// implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    spn: usize,
    num_eqs: usize,
}

impl Dimensions {
    pub fn new(spn_order: usize) -> ProfugusResult<Self> {
        if spn_order == 0 || spn_order % 2 == 0 || spn_order > MAX_SPN_ORDER {
            return Err(ProfugusError::ConfigError(format!(
                "SPN order must be one of 1, 3, 5, 7; got {spn_order}"
            )));
        }
        Ok(Dimensions {
            spn: spn_order,
            num_eqs: (spn_order + 1) / 2,
        })
    }

    pub fn spn_order(&self) -> usize {
        self.spn
    }

    pub fn num_equations(&self) -> usize {
        self.num_eqs
    }

    pub fn num_moments(&self) -> usize {
        self.spn + 1
    }

    pub const fn max_num_equations() -> usize {
        4
    }
}
