// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Timestep
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Implicit-Euler step length and group speeds.

use profugus_types::config::TimestepParams;
use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::require;

use crate::energy_collapse::group_ranges;

#[derive(Debug, Clone, PartialEq)]
pub struct Timestep {
    dt: f64,
    cycle: usize,
    inv_velocity: Vec<f64>,
}

impl Timestep {
    /// Step `dt` with group speeds `velocity`. Starts at cycle 1.
    pub fn new(dt: f64, velocity: &[f64]) -> ProfugusResult<Self> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(ProfugusError::ConfigError(format!(
                "timestep control: dt must be positive, got {dt}"
            )));
        }
        if let Some(v) = velocity.iter().find(|&&v| !(v > 0.0 && v.is_finite())) {
            return Err(ProfugusError::ConfigError(format!(
                "timestep control: group speeds must be positive, got {v}"
            )));
        }
        Ok(Timestep {
            dt,
            cycle: 1,
            inv_velocity: velocity.iter().map(|v| 1.0 / v).collect(),
        })
    }

    /// Build from the `timestep control` block for `num_groups` groups.
    pub fn from_params(params: &TimestepParams, num_groups: usize) -> ProfugusResult<Self> {
        match &params.velocity {
            Some(v) if v.len() != num_groups => Err(ProfugusError::ConfigError(format!(
                "timestep control: {} group speeds for {num_groups} groups",
                v.len()
            ))),
            Some(v) => Timestep::new(params.dt, v),
            None => Timestep::new(params.dt, &vec![1.0; num_groups]),
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// 1-based step counter.
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Time reached by the completed steps.
    pub fn time(&self) -> f64 {
        self.dt * (self.cycle - 1) as f64
    }

    pub fn num_groups(&self) -> usize {
        self.inv_velocity.len()
    }

    /// `1 / (v_g dt)`.
    pub fn coefficient(&self, g: usize) -> f64 {
        self.inv_velocity[g] / self.dt
    }

    pub fn advance(&mut self) {
        self.cycle += 1;
    }

    /// Same step on a collapsed group structure; `1/v` is averaged within
    /// each coarse group.
    pub fn collapse(&self, collapse: &[usize]) -> Self {
        require!(collapse.iter().sum::<usize>() == self.num_groups());
        let inv_velocity = group_ranges(collapse)
            .into_iter()
            .map(|r| {
                let n = r.len() as f64;
                self.inv_velocity[r].iter().sum::<f64>() / n
            })
            .collect();
        Timestep {
            dt: self.dt,
            cycle: self.cycle,
            inv_velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficients_and_cycle() {
        let mut ts = Timestep::new(0.5, &[2.0, 4.0]).unwrap();
        assert_eq!(ts.cycle(), 1);
        assert!((ts.coefficient(0) - 1.0).abs() < 1e-15);
        assert!((ts.coefficient(1) - 0.5).abs() < 1e-15);
        ts.advance();
        assert_eq!(ts.cycle(), 2);
        assert!((ts.time() - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Timestep::new(0.0, &[1.0]).is_err());
        assert!(Timestep::new(-1.0, &[1.0]).is_err());
        assert!(Timestep::new(1.0, &[1.0, 0.0]).is_err());
        let params = TimestepParams {
            velocity: Some(vec![1.0, 2.0]),
            ..TimestepParams::new(1.0)
        };
        assert!(Timestep::from_params(&params, 3).is_err());
        assert_eq!(Timestep::from_params(&TimestepParams::new(1.0), 3).unwrap().num_groups(), 3);
    }

    #[test]
    fn test_collapse_averages_inverse_speed() {
        let ts = Timestep::new(1.0, &[1.0, 0.5, 0.25]).unwrap();
        let coarse = ts.collapse(&[2, 1]);
        assert_eq!(coarse.num_groups(), 2);
        assert!((coarse.coefficient(0) - 1.5).abs() < 1e-15);
        assert!((coarse.coefficient(1) - 4.0).abs() < 1e-15);
    }
}
