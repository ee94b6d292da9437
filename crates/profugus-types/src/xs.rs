// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Cross Sections
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Multigroup cross sections.
//!
//! Scattering matrices are stored per Legendre moment as `scat[l][(to, from)]`,
//! so column `g` holds everything scattering out of group `g`.

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{ProfugusError, ProfugusResult};

/// Cross sections of a single material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialXs {
    pub name: String,
    pub total: Vec<f64>,
    pub sigma_f: Vec<f64>,
    pub nu_sigma_f: Vec<f64>,
    pub chi: Vec<f64>,
    /// One `(to, from)` matrix per moment `0..=pn_order`.
    pub scattering: Vec<Array2<f64>>,
}

impl MaterialXs {
    /// Non-fissile material with the given total and P0 scattering.
    pub fn absorber(name: &str, total: Vec<f64>, scat0: Array2<f64>) -> Self {
        let ng = total.len();
        MaterialXs {
            name: name.to_string(),
            total,
            sigma_f: vec![0.0; ng],
            nu_sigma_f: vec![0.0; ng],
            chi: vec![0.0; ng],
            scattering: vec![scat0],
        }
    }

    pub fn is_fissionable(&self) -> bool {
        self.nu_sigma_f.iter().any(|&v| v > 0.0)
    }

    fn validate(&self, num_groups: usize, pn_order: usize) -> ProfugusResult<()> {
        let bad = |what: &str| {
            Err(ProfugusError::ConfigError(format!(
                "Material '{}': {what}",
                self.name
            )))
        };
        for (label, data) in [
            ("sigma_t", &self.total),
            ("sigma_f", &self.sigma_f),
            ("nu_sigma_f", &self.nu_sigma_f),
            ("chi", &self.chi),
        ] {
            if data.len() != num_groups {
                return bad(&format!(
                    "{label} has {} groups, expected {num_groups}",
                    data.len()
                ));
            }
            if data.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return bad(&format!("{label} must be finite and non-negative"));
            }
        }
        if self.total.iter().any(|&t| t <= 0.0) {
            return bad("sigma_t must be > 0 in every group");
        }
        if self.scattering.len() != pn_order + 1 {
            return bad(&format!(
                "{} scattering moments, expected {}",
                self.scattering.len(),
                pn_order + 1
            ));
        }
        for m in &self.scattering {
            if m.dim() != (num_groups, num_groups) {
                return bad(&format!("scattering matrix shape {:?}", m.dim()));
            }
        }
        Ok(())
    }
}

/// Cross sections for all materials of a problem.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSections {
    num_groups: usize,
    pn_order: usize,
    group_bounds: Option<Vec<f64>>,
    materials: Vec<MaterialXs>,
}

impl CrossSections {
    pub fn new(num_groups: usize, pn_order: usize) -> Self {
        CrossSections {
            num_groups,
            pn_order,
            group_bounds: None,
            materials: Vec::new(),
        }
    }

    /// Add a material; its id is the insertion index.
    pub fn add(&mut self, mat: MaterialXs) -> ProfugusResult<usize> {
        mat.validate(self.num_groups, self.pn_order)?;
        self.materials.push(mat);
        Ok(self.materials.len() - 1)
    }

    pub fn set_group_bounds(&mut self, bounds: Vec<f64>) -> ProfugusResult<()> {
        if bounds.len() != self.num_groups + 1 {
            return Err(ProfugusError::ConfigError(format!(
                "Group bounds need {} entries, got {}",
                self.num_groups + 1,
                bounds.len()
            )));
        }
        self.group_bounds = Some(bounds);
        Ok(())
    }

    #[inline]
    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    #[inline]
    pub fn pn_order(&self) -> usize {
        self.pn_order
    }

    #[inline]
    pub fn num_mat(&self) -> usize {
        self.materials.len()
    }

    pub fn group_bounds(&self) -> Option<&[f64]> {
        self.group_bounds.as_deref()
    }

    #[inline]
    pub fn material(&self, matid: usize) -> &MaterialXs {
        require!(matid < self.materials.len());
        &self.materials[matid]
    }

    pub fn materials(&self) -> &[MaterialXs] {
        &self.materials
    }

    #[inline]
    pub fn total(&self, matid: usize, g: usize) -> f64 {
        self.material(matid).total[g]
    }

    #[inline]
    pub fn nu_sigma_f(&self, matid: usize, g: usize) -> f64 {
        self.material(matid).nu_sigma_f[g]
    }

    #[inline]
    pub fn sigma_f(&self, matid: usize, g: usize) -> f64 {
        self.material(matid).sigma_f[g]
    }

    #[inline]
    pub fn chi(&self, matid: usize, g: usize) -> f64 {
        self.material(matid).chi[g]
    }

    /// Scattering matrix of moment `l`, indexed `(to, from)`.
    #[inline]
    pub fn scattering(&self, matid: usize, l: usize) -> &Array2<f64> {
        &self.material(matid).scattering[l]
    }
}

// ─────────────────────────────────────────────────────────────────────
// JSON library
// ─────────────────────────────────────────────────────────────────────

/// On-disk material record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialRecord {
    pub sigma_t: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma_f: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nu_sigma_f: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chi: Option<Vec<f64>>,
    /// `scattering[l][to][from]`
    pub scattering: Vec<Vec<Vec<f64>>>,
}

/// Cross-section library as stored in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XsLibrary {
    #[serde(rename = "num groups")]
    pub num_groups: usize,
    #[serde(rename = "pn order")]
    pub pn_order: usize,
    #[serde(rename = "group bounds", default, skip_serializing_if = "Option::is_none")]
    pub group_bounds: Option<Vec<f64>>,
    pub materials: BTreeMap<String, MaterialRecord>,
}

impl XsLibrary {
    pub fn from_file(path: impl AsRef<Path>) -> ProfugusResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> ProfugusResult<Self> {
        let lib: Self = serde_json::from_str(contents)?;
        Ok(lib)
    }

    /// Build cross sections for `mat_list` (material id = list index),
    /// keeping moments `0..=pn_order` and groups `g_first..=g_last`.
    pub fn build(
        &self,
        mat_list: &[String],
        pn_order: usize,
        g_first: usize,
        g_last: usize,
    ) -> ProfugusResult<CrossSections> {
        if pn_order > self.pn_order {
            return Err(ProfugusError::ConfigError(format!(
                "Requested Pn scattering order of {pn_order} is greater than available \
                 data Pn order of {}",
                self.pn_order
            )));
        }
        if g_last < g_first {
            return Err(ProfugusError::ConfigError(format!(
                "Energy group range is empty: g_first = {g_first} > g_last = {g_last}"
            )));
        }
        let ng = 1 + g_last - g_first;
        if ng > self.num_groups || g_last >= self.num_groups {
            return Err(ProfugusError::ConfigError(format!(
                "Energy group range exceeds number of groups in data, \
                 1 + g_last - g_first = {ng} > {}",
                self.num_groups
            )));
        }

        let groups = g_first..=g_last;
        let slice = |v: &[f64]| -> Vec<f64> { v[groups.clone()].to_vec() };

        let mut xs = CrossSections::new(ng, pn_order);
        if let Some(bounds) = &self.group_bounds {
            xs.set_group_bounds(bounds[g_first..=g_last + 1].to_vec())?;
        }

        for name in mat_list {
            let rec = self.materials.get(name).ok_or_else(|| {
                ProfugusError::ConfigError(format!(
                    "Material '{name}' not found in cross-section library"
                ))
            })?;
            let full = self.num_groups;
            let check_len = |label: &str, v: &[f64]| -> ProfugusResult<()> {
                if v.len() != full {
                    return Err(ProfugusError::ConfigError(format!(
                        "Material '{name}': {label} has {} groups, library has {full}",
                        v.len()
                    )));
                }
                Ok(())
            };
            check_len("sigma_t", &rec.sigma_t)?;
            let zeros = vec![0.0; full];
            let sigma_f = rec.sigma_f.as_deref().unwrap_or(&zeros);
            let nu_sigma_f = rec.nu_sigma_f.as_deref().unwrap_or(&zeros);
            let chi = rec.chi.as_deref().unwrap_or(&zeros);
            check_len("sigma_f", sigma_f)?;
            check_len("nu_sigma_f", nu_sigma_f)?;
            check_len("chi", chi)?;

            if rec.scattering.len() < pn_order + 1 {
                return Err(ProfugusError::ConfigError(format!(
                    "Material '{name}' has {} scattering moments, need {}",
                    rec.scattering.len(),
                    pn_order + 1
                )));
            }
            let mut scattering = Vec::with_capacity(pn_order + 1);
            for (l, moment) in rec.scattering.iter().take(pn_order + 1).enumerate() {
                if moment.len() != full || moment.iter().any(|row| row.len() != full) {
                    return Err(ProfugusError::ConfigError(format!(
                        "Material '{name}': P{l} scattering matrix is not {full}x{full}"
                    )));
                }
                let m = Array2::from_shape_fn((ng, ng), |(to, from)| {
                    moment[g_first + to][g_first + from]
                });
                scattering.push(m);
            }

            xs.add(MaterialXs {
                name: name.clone(),
                total: slice(&rec.sigma_t),
                sigma_f: slice(sigma_f),
                nu_sigma_f: slice(nu_sigma_f),
                chi: slice(chi),
                scattering,
            })?;
        }
        Ok(xs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIB: &str = r#"{
        "num groups": 3,
        "pn order": 1,
        "group bounds": [2.0e7, 1.0e5, 1.0, 1.0e-5],
        "materials": {
            "fuel": {
                "sigma_t": [1.0, 2.0, 3.0],
                "nu_sigma_f": [0.1, 0.2, 0.3],
                "sigma_f": [0.04, 0.08, 0.12],
                "chi": [0.9, 0.1, 0.0],
                "scattering": [
                    [[0.5, 0.0, 0.0], [0.3, 1.0, 0.0], [0.0, 0.5, 2.0]],
                    [[0.05, 0.0, 0.0], [0.0, 0.1, 0.0], [0.0, 0.0, 0.2]]
                ]
            },
            "mod": {
                "sigma_t": [1.5, 2.5, 3.5],
                "scattering": [
                    [[1.0, 0.0, 0.0], [0.4, 2.0, 0.0], [0.0, 0.4, 3.0]]
                ]
            }
        }
    }"#;

    #[test]
    fn test_build_full_library() {
        let lib = XsLibrary::from_json(LIB).unwrap();
        let mats = vec!["fuel".to_string()];
        let xs = lib.build(&mats, 1, 0, 2).unwrap();
        assert_eq!(xs.num_groups(), 3);
        assert_eq!(xs.num_mat(), 1);
        assert!(xs.material(0).is_fissionable());
        assert!((xs.total(0, 1) - 2.0).abs() < 1e-15);
        assert!((xs.scattering(0, 0)[(1, 0)] - 0.3).abs() < 1e-15);
        assert!((xs.scattering(0, 1)[(2, 2)] - 0.2).abs() < 1e-15);
        assert_eq!(xs.group_bounds().unwrap().len(), 4);
    }

    #[test]
    fn test_build_group_subset() {
        let lib = XsLibrary::from_json(LIB).unwrap();
        let mats = vec!["fuel".to_string(), "mod".to_string()];
        let xs = lib.build(&mats, 0, 1, 2).unwrap();
        assert_eq!(xs.num_groups(), 2);
        assert!((xs.total(1, 0) - 2.5).abs() < 1e-15);
        assert!((xs.scattering(1, 0)[(1, 0)] - 0.4).abs() < 1e-15);
        assert!(!xs.material(1).is_fissionable());
        assert_eq!(xs.group_bounds().unwrap(), &[1.0e5, 1.0, 1.0e-5]);
    }

    #[test]
    fn test_pn_order_too_high() {
        let lib = XsLibrary::from_json(LIB).unwrap();
        let err = lib
            .build(&["fuel".to_string()], 3, 0, 2)
            .unwrap_err()
            .to_string();
        assert!(err.contains("Requested Pn scattering order of 3"), "{err}");
    }

    #[test]
    fn test_group_range_too_wide() {
        let lib = XsLibrary::from_json(LIB).unwrap();
        let err = lib
            .build(&["fuel".to_string()], 0, 0, 3)
            .unwrap_err()
            .to_string();
        assert!(err.contains("1 + g_last - g_first = 4 > 3"), "{err}");
    }

    #[test]
    fn test_missing_moment_for_material() {
        let lib = XsLibrary::from_json(LIB).unwrap();
        assert!(lib.build(&["mod".to_string()], 1, 0, 2).is_err());
        assert!(lib.build(&["steel".to_string()], 0, 0, 2).is_err());
    }

    #[test]
    fn test_rejects_nonpositive_total() {
        let mut xs = CrossSections::new(2, 0);
        let m = MaterialXs::absorber("void", vec![0.0, 1.0], Array2::zeros((2, 2)));
        assert!(xs.add(m).is_err());
    }
}
