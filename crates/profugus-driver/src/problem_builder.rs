// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Problem Builder
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Core model → mesh, material ids and cross sections.
//!
//! The radial layout is a core map of assemblies, each a map of pins, each
//! pin split into `radial mesh × radial mesh` cells. All maps are entered
//! `[j][i]`, so `i` is the column index. Axially the core is a stack of
//! levels, each with its own core map, height and cell count.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use profugus_spn::mat_db::MatDb;
use profugus_types::config::{
    AssemblyBlock, CoreBlock, MaterialBlock, MeshBlock, ProblemInput, ProblemParams,
};
use profugus_types::error::{ProfugusError, ProfugusResult};
use profugus_types::soft_equiv::soft_equiv_eps;
use profugus_types::state::{Axis, CartesianMesh};
use profugus_types::xs::{CrossSections, XsLibrary};
use profugus_types::check;

fn config_error<T>(message: String) -> ProfugusResult<T> {
    Err(ProfugusError::ConfigError(message))
}

/// Radial and axial dimensions of the core model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CoreDims {
    /// Assemblies along (x, y).
    assemblies: [usize; 2],
    /// Pins per assembly along (x, y).
    pins: [usize; 2],
    radial_mesh: usize,
}

impl CoreDims {
    fn cells(&self, axis: usize) -> usize {
        self.radial_mesh * self.pins[axis] * self.assemblies[axis]
    }
}

/// A fully set-up problem.
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    params: ProblemParams,
    mesh: Arc<CartesianMesh>,
    matids: Vec<usize>,
    xs: Arc<CrossSections>,
    mat_list: Vec<String>,
}

impl ProblemBuilder {
    /// Read and set up a JSON input; a relative `xs library` path resolves
    /// against the input file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> ProfugusResult<Self> {
        let path = path.as_ref();
        let input = ProblemInput::from_file(path)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::setup(&input, &base)
    }

    pub fn setup(input: &ProblemInput, base_dir: &Path) -> ProfugusResult<Self> {
        input.validate()?;
        let (Some(core), Some(assemblies), Some(material), Some(mesh_db), Some(params)) = (
            &input.core,
            &input.assemblies,
            &input.material,
            &input.mesh,
            &input.problem,
        ) else {
            return config_error("Incomplete problem input".to_string());
        };

        let dims = core_dims(core, assemblies, mesh_db)?;
        let mesh = build_mesh(core, assemblies, mesh_db, dims)?;
        let matids = build_matids(core, assemblies, material, mesh_db, dims)?;
        let xs = build_xs(material, params, base_dir)?;
        info!(
            "Problem: {} x {} x {} cells, {} materials, {} groups",
            mesh.num_cells_along(Axis::X),
            mesh.num_cells_along(Axis::Y),
            mesh.num_cells_along(Axis::Z),
            xs.num_mat(),
            xs.num_groups()
        );

        Ok(ProblemBuilder {
            params: params.clone(),
            mesh: Arc::new(mesh),
            matids,
            xs: Arc::new(xs),
            mat_list: material.mat_list.clone(),
        })
    }

    pub fn params(&self) -> &ProblemParams {
        &self.params
    }

    pub fn mesh(&self) -> &Arc<CartesianMesh> {
        &self.mesh
    }

    pub fn matids(&self) -> &[usize] {
        &self.matids
    }

    pub fn xs(&self) -> &Arc<CrossSections> {
        &self.xs
    }

    pub fn mat_list(&self) -> &[String] {
        &self.mat_list
    }

    pub fn mat_db(&self) -> ProfugusResult<MatDb> {
        MatDb::new(Arc::clone(&self.xs), self.matids.clone())
    }
}

fn lookup<'a>(
    maps: &'a BTreeMap<String, Vec<Vec<usize>>>,
    name: &str,
    block: &str,
) -> ProfugusResult<&'a Vec<Vec<usize>>> {
    maps.get(name).ok_or_else(|| {
        ProfugusError::ConfigError(format!("Map '{name}' not defined in {block} block"))
    })
}

/// Rows and columns of a `[j][i]` map, requiring every row to be equal.
fn map_shape(map: &[Vec<usize>], name: &str) -> ProfugusResult<[usize; 2]> {
    let rows = map.len();
    let cols = map.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 || map.iter().any(|row| row.len() != cols) {
        return config_error(format!("Map '{name}' must be a non-empty rectangle"));
    }
    Ok([cols, rows])
}

fn core_dims(core: &CoreBlock, assemblies: &AssemblyBlock, mesh: &MeshBlock) -> ProfugusResult<CoreDims> {
    let Some(first_level) = core.axial_list.first() else {
        return config_error("CORE axial list is empty".to_string());
    };
    if core.axial_list.len() != core.axial_height.len() {
        return config_error(format!(
            "CORE axial list has {} levels but axial height has {}",
            core.axial_list.len(),
            core.axial_height.len()
        ));
    }
    if mesh.axial_mesh.len() != core.axial_height.len() {
        return config_error(format!(
            "MESH axial mesh has {} levels, CORE has {}",
            mesh.axial_mesh.len(),
            core.axial_height.len()
        ));
    }
    if mesh.radial_mesh == 0 {
        return config_error("MESH radial mesh must be positive".to_string());
    }
    if mesh.symmetry != "full" {
        return config_error(format!(
            "Mesh symmetry '{}' is not supported; only full",
            mesh.symmetry
        ));
    }
    if assemblies.pin_pitch <= 0.0 {
        return config_error("ASSEMBLIES pin pitch must be positive".to_string());
    }

    let core_map = lookup(&core.maps, first_level, "CORE")?;
    let Some(first_assembly) = assemblies.assembly_list.first() else {
        return config_error("ASSEMBLIES assembly list is empty".to_string());
    };
    let pin_map = lookup(&assemblies.maps, first_assembly, "ASSEMBLIES")?;

    Ok(CoreDims {
        assemblies: map_shape(core_map, first_level)?,
        pins: map_shape(pin_map, first_assembly)?,
        radial_mesh: mesh.radial_mesh,
    })
}

fn build_mesh(
    core: &CoreBlock,
    assemblies: &AssemblyBlock,
    mesh: &MeshBlock,
    dims: CoreDims,
) -> ProfugusResult<CartesianMesh> {
    let delta = assemblies.pin_pitch / dims.radial_mesh as f64;
    let radial = |n: usize| (0..=n).map(|i| i as f64 * delta).collect::<Vec<_>>();

    let mut z_edges = vec![0.0];
    for (&height, &cells) in core.axial_height.iter().zip(&mesh.axial_mesh) {
        if height <= 0.0 || cells == 0 {
            return config_error(format!(
                "Axial level of height {height} with {cells} cells"
            ));
        }
        let dz = height / cells as f64;
        for _ in 0..cells {
            let top = z_edges[z_edges.len() - 1] + dz;
            z_edges.push(top);
        }
    }
    let height: f64 = core.axial_height.iter().sum();
    check!(soft_equiv_eps(height, z_edges[z_edges.len() - 1], 1.0e-12));

    debug!(
        "Core: {:?} assemblies of {:?} pins, pitch {}, {} cells per pin",
        dims.assemblies, dims.pins, assemblies.pin_pitch, dims.radial_mesh
    );
    CartesianMesh::new(radial(dims.cells(0)), radial(dims.cells(1)), z_edges)
}

/// Material ids of one axial level, indexed `[j][i]` over the radial mesh.
fn axial_matids(
    core_map: &[Vec<usize>],
    level_name: &str,
    assemblies: &AssemblyBlock,
    num_mats: usize,
    dims: CoreDims,
) -> ProfugusResult<Vec<Vec<usize>>> {
    if map_shape(core_map, level_name)? != dims.assemblies {
        return config_error(format!(
            "Core map '{level_name}' does not match the first core map's shape"
        ));
    }
    let rm = dims.radial_mesh;
    let mut matids = vec![vec![0; dims.cells(0)]; dims.cells(1)];

    for (aj, row) in core_map.iter().enumerate() {
        let aoff_y = rm * dims.pins[1] * aj;
        for (ai, &assembly) in row.iter().enumerate() {
            let Some(name) = assemblies.assembly_list.get(assembly) else {
                return config_error(format!(
                    "Core map '{level_name}' refers to assembly {assembly}, only {} defined",
                    assemblies.assembly_list.len()
                ));
            };
            let pin_map = lookup(&assemblies.maps, name, "ASSEMBLIES")?;
            if map_shape(pin_map, name)? != dims.pins {
                return config_error(format!(
                    "Assembly '{name}' does not match the first assembly's pin layout"
                ));
            }
            let aoff_x = rm * dims.pins[0] * ai;

            for (pj, pins) in pin_map.iter().enumerate() {
                let poff_y = aoff_y + rm * pj;
                for (pi, &matid) in pins.iter().enumerate() {
                    if matid >= num_mats {
                        return config_error(format!(
                            "Assembly '{name}' uses material {matid}, mat list has {num_mats}"
                        ));
                    }
                    let poff_x = aoff_x + rm * pi;
                    for row in &mut matids[poff_y..poff_y + rm] {
                        row[poff_x..poff_x + rm].fill(matid);
                    }
                }
            }
        }
    }
    Ok(matids)
}

fn build_matids(
    core: &CoreBlock,
    assemblies: &AssemblyBlock,
    material: &MaterialBlock,
    mesh: &MeshBlock,
    dims: CoreDims,
) -> ProfugusResult<Vec<usize>> {
    let (nx, ny) = (dims.cells(0), dims.cells(1));
    let nz: usize = mesh.axial_mesh.iter().sum();
    let mut matids = Vec::with_capacity(nx * ny * nz);

    // cardinal order i + nx (j + ny k): stack the levels bottom-up
    for (level, &cells) in core.axial_list.iter().zip(&mesh.axial_mesh) {
        let core_map = lookup(&core.maps, level, "CORE")?;
        let plane = axial_matids(core_map, level, assemblies, material.mat_list.len(), dims)?;
        for _ in 0..cells {
            for row in &plane {
                matids.extend_from_slice(row);
            }
        }
    }
    Ok(matids)
}

fn build_xs(material: &MaterialBlock, params: &ProblemParams, base_dir: &Path) -> ProfugusResult<CrossSections> {
    let Some(library) = &material.xs_library else {
        return config_error("Inline cross sections not implemented yet.".to_string());
    };
    let path = {
        let p = PathBuf::from(library);
        if p.is_relative() {
            base_dir.join(p)
        } else {
            p
        }
    };
    let lib = XsLibrary::from_file(&path)?;

    let pn_order = params.pn_order.unwrap_or(lib.pn_order);
    let g_first = params.g_first.unwrap_or(0);
    let g_last = params.g_last.unwrap_or(lib.num_groups.saturating_sub(1));
    debug!(
        "Cross sections from {}: Pn {pn_order}, groups {g_first}..={g_last}",
        path.display()
    );
    lib.build(&material.mat_list, pn_order, g_first, g_last)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"{
        "CORE": {
            "axial list": ["lower", "upper"],
            "axial height": [10.0, 4.0],
            "lower": [[0, 1]],
            "upper": [[1, 1]]
        },
        "ASSEMBLIES": {
            "assembly list": ["fuel", "water"],
            "pin pitch": 1.2,
            "fuel": [[0, 1], [0, 0]],
            "water": [[1, 1], [1, 1]]
        },
        "MATERIAL": { "mat list": ["fuel", "moderator"], "xs library": "xs_5grp.json" },
        "MESH": { "radial mesh": 2, "axial mesh": [2, 1] },
        "PROBLEM": { "g_last": 2 }
    }"#;

    fn data_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data")
    }

    fn input() -> ProblemInput {
        serde_json::from_str(INPUT).unwrap()
    }

    #[test]
    fn test_mesh_dimensions() {
        let b = ProblemBuilder::setup(&input(), &data_dir()).unwrap();
        let mesh = b.mesh();
        // 2 assemblies x 2 pins x 2 cells along x, 1 x 2 x 2 along y
        assert_eq!(mesh.num_cells_along(Axis::X), 8);
        assert_eq!(mesh.num_cells_along(Axis::Y), 4);
        assert_eq!(mesh.num_cells_along(Axis::Z), 3);
        assert!((mesh.upper()[0] - 4.8).abs() < 1e-12);
        assert!((mesh.upper()[1] - 2.4).abs() < 1e-12);
        assert!((mesh.upper()[2] - 14.0).abs() < 1e-12);
        assert!((mesh.width(Axis::Z, 2) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_matid_layout() {
        let b = ProblemBuilder::setup(&input(), &data_dir()).unwrap();
        let mesh = b.mesh();
        let m = |i, j, k| b.matids()[mesh.cardinal(i, j, k)];
        // lower level, fuel assembly pin (0, 0) covers cells i, j in 0..2
        assert_eq!(m(0, 0, 0), 0);
        assert_eq!(m(1, 1, 1), 0);
        // pin (i = 1, j = 0) of the fuel assembly is moderator
        assert_eq!(m(2, 0, 0), 1);
        assert_eq!(m(3, 1, 0), 1);
        // second row of pins is all fuel
        assert_eq!(m(2, 2, 0), 0);
        // water assembly
        assert_eq!(m(5, 0, 0), 1);
        // upper level is water everywhere
        assert!((0..8).all(|i| m(i, 0, 2) == 1));
        assert_eq!(b.matids().len(), 8 * 4 * 3);
    }

    #[test]
    fn test_group_range_applied() {
        let b = ProblemBuilder::setup(&input(), &data_dir()).unwrap();
        assert_eq!(b.xs().num_groups(), 3);
        assert_eq!(b.xs().num_mat(), 2);
        assert_eq!(b.mat_db().unwrap().num_cells(), 96);
    }

    #[test]
    fn test_missing_library_is_reported() {
        let mut inp = input();
        if let Some(m) = inp.material.as_mut() {
            m.xs_library = None;
        }
        let err = ProblemBuilder::setup(&inp, &data_dir()).unwrap_err().to_string();
        assert!(err.contains("Inline cross sections not implemented yet."), "{err}");
    }

    #[test]
    fn test_pn_and_group_limits() {
        let mut inp = input();
        if let Some(p) = inp.problem.as_mut() {
            p.pn_order = Some(3);
        }
        let err = ProblemBuilder::setup(&inp, &data_dir()).unwrap_err().to_string();
        assert!(err.contains("greater than available data Pn order of 0"), "{err}");

        let mut inp = input();
        if let Some(p) = inp.problem.as_mut() {
            p.g_last = Some(7);
        }
        let err = ProblemBuilder::setup(&inp, &data_dir()).unwrap_err().to_string();
        assert!(err.contains("Energy group range exceeds"), "{err}");
    }

    #[test]
    fn test_bad_maps() {
        let mut inp = input();
        if let Some(a) = inp.assemblies.as_mut() {
            a.maps.insert("water".to_string(), vec![vec![1, 1, 1], vec![1, 1, 1]]);
        }
        assert!(ProblemBuilder::setup(&inp, &data_dir()).is_err());

        let mut inp = input();
        if let Some(a) = inp.assemblies.as_mut() {
            a.maps.insert("fuel".to_string(), vec![vec![0, 5], vec![0, 0]]);
        }
        let err = ProblemBuilder::setup(&inp, &data_dir()).unwrap_err().to_string();
        assert!(err.contains("uses material 5"), "{err}");

        let mut inp = input();
        inp.mesh = None;
        let err = ProblemBuilder::setup(&inp, &data_dir()).unwrap_err().to_string();
        assert!(err.contains("MESH block not defined in input."), "{err}");
    }
}
