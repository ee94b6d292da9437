// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ProfugusError, ProfugusResult};

/// Top-level problem input.
///
/// Every block is optional at parse time so that a missing one is reported
/// by [`ProblemInput::validate`] with the block name rather than by serde.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemInput {
    #[serde(rename = "CORE", default, skip_serializing_if = "Option::is_none")]
    pub core: Option<CoreBlock>,
    #[serde(rename = "ASSEMBLIES", default, skip_serializing_if = "Option::is_none")]
    pub assemblies: Option<AssemblyBlock>,
    #[serde(rename = "MATERIAL", default, skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialBlock>,
    #[serde(rename = "MESH", default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshBlock>,
    #[serde(rename = "PROBLEM", default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<ProblemParams>,
}

/// Axial stack of core maps. Each name in `axial list` refers to a 2D map
/// of assembly indices stored alongside, entered `[j][i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreBlock {
    #[serde(rename = "axial list")]
    pub axial_list: Vec<String>,
    #[serde(rename = "axial height")]
    pub axial_height: Vec<f64>,
    #[serde(flatten)]
    pub maps: BTreeMap<String, Vec<Vec<usize>>>,
}

/// Assembly pin maps, entered `[j][i]`; entries are indices into `mat list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyBlock {
    #[serde(rename = "assembly list")]
    pub assembly_list: Vec<String>,
    #[serde(rename = "pin pitch")]
    pub pin_pitch: f64,
    #[serde(flatten)]
    pub maps: BTreeMap<String, Vec<Vec<usize>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialBlock {
    #[serde(rename = "mat list")]
    pub mat_list: Vec<String>,
    /// Path to a JSON cross-section library. Relative paths resolve against
    /// the input file's directory.
    #[serde(rename = "xs library", default, skip_serializing_if = "Option::is_none")]
    pub xs_library: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshBlock {
    /// Mesh cells per pin along x and y.
    #[serde(rename = "radial mesh")]
    pub radial_mesh: usize,
    /// Mesh cells per axial level.
    #[serde(rename = "axial mesh")]
    pub axial_mesh: Vec<usize>,
    #[serde(default = "default_symmetry")]
    pub symmetry: String,
}

fn default_symmetry() -> String {
    "full".to_string()
}

// ─────────────────────────────────────────────────────────────────────
// PROBLEM block
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemType {
    Spn,
    Mc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemMode {
    Fixed,
    Eigenvalue,
    /// Implicit-Euler steps with a fixed source; needs `timestep control`.
    #[serde(rename = "time_dependent")]
    TimeDependent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    Reflect,
    Vacuum,
}

/// Storage backend for assembled operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixBackend {
    Csr,
    Dense,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemParams {
    /// Default: spn
    #[serde(default = "default_problem_type")]
    pub problem_type: ProblemType,
    /// Default: eigenvalue
    #[serde(default = "default_problem_mode")]
    pub problem_mode: ProblemMode,
    /// Scattering order; defaults to the library order.
    #[serde(rename = "Pn_order", default, skip_serializing_if = "Option::is_none")]
    pub pn_order: Option<usize>,
    /// First library group kept (default: 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g_first: Option<usize>,
    /// Last library group kept (default: last)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g_last: Option<usize>,
    /// Default: 1
    #[serde(rename = "SPn_order", default = "default_spn_order")]
    pub spn_order: usize,
    /// Spatial discretisation. Only "fv" is defined.
    #[serde(default = "default_eqn_type")]
    pub eqn_type: String,
    /// Default: reflect
    #[serde(default = "default_boundary")]
    pub boundary: BoundaryKind,
    /// Per-face reflecting flags (-x, +x, -y, +y, -z, +z). Only read when
    /// `boundary` is reflect; absent means all faces reflect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflect: Option<[bool; 6]>,
    /// Default: csr
    #[serde(default = "default_backend")]
    pub backend: MatrixBackend,
    /// Isotropic external source strength per cm^3 (fixed-source mode).
    #[serde(default = "default_source_strength")]
    pub source_strength: f64,
    /// Group spectrum of the external source; uniform when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_spectrum: Option<Vec<f64>>,
    /// Assemble the adjoint operators (default: false). Not available for
    /// time-dependent problems.
    #[serde(default)]
    pub adjoint: bool,
    #[serde(rename = "timestep control", default, skip_serializing_if = "Option::is_none")]
    pub timestep: Option<TimestepParams>,
    /// Write the assembled operator to this Matrix Market file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_file: Option<String>,
    #[serde(rename = "Linear Solver", default)]
    pub linear_solver: SolverParams,
    #[serde(rename = "Preconditioner", default)]
    pub preconditioner: MultigridParams,
    #[serde(rename = "Eigenvalue Solver", default)]
    pub eigen: EigenParams,
    #[serde(rename = "MC", default)]
    pub mc: McParams,
}

fn default_problem_type() -> ProblemType {
    ProblemType::Spn
}
fn default_problem_mode() -> ProblemMode {
    ProblemMode::Eigenvalue
}
fn default_spn_order() -> usize {
    1
}
fn default_eqn_type() -> String {
    "fv".to_string()
}
fn default_boundary() -> BoundaryKind {
    BoundaryKind::Reflect
}
fn default_backend() -> MatrixBackend {
    MatrixBackend::Csr
}
fn default_source_strength() -> f64 {
    1.0
}

impl Default for ProblemParams {
    fn default() -> Self {
        ProblemParams {
            problem_type: default_problem_type(),
            problem_mode: default_problem_mode(),
            pn_order: None,
            g_first: None,
            g_last: None,
            spn_order: default_spn_order(),
            eqn_type: default_eqn_type(),
            boundary: default_boundary(),
            reflect: None,
            backend: default_backend(),
            source_strength: default_source_strength(),
            source_spectrum: None,
            adjoint: false,
            timestep: None,
            matrix_file: None,
            linear_solver: SolverParams::default(),
            preconditioner: MultigridParams::default(),
            eigen: EigenParams::default(),
            mc: McParams::default(),
        }
    }
}

impl ProblemParams {
    /// Reflecting flags per face, resolved from `boundary` and `reflect`.
    pub fn reflecting_faces(&self) -> [bool; 6] {
        match self.boundary {
            BoundaryKind::Vacuum => [false; 6],
            BoundaryKind::Reflect => self.reflect.unwrap_or([true; 6]),
        }
    }
}

/// Time-step settings for time-dependent SPN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestepParams {
    /// Step length in seconds; must be positive.
    pub dt: f64,
    /// Default: 1
    #[serde(default = "default_num_steps")]
    pub num_steps: usize,
    /// Group speeds in cm/s; unit speeds when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec<f64>>,
}

fn default_num_steps() -> usize {
    1
}

impl TimestepParams {
    pub fn new(dt: f64) -> Self {
        TimestepParams {
            dt,
            num_steps: default_num_steps(),
            velocity: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Solver blocks
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverType {
    Gmres,
    Richardson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreconditionerType {
    None,
    Jacobi,
    Multigrid,
}

/// Iterative linear-solver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverParams {
    /// Default: gmres
    #[serde(default = "default_solver_type")]
    pub solver_type: SolverType,
    /// Default: 1000
    #[serde(default = "default_max_itr")]
    pub max_itr: usize,
    /// Relative residual tolerance (default: 1e-8). Zero runs exactly
    /// `max_itr` iterations.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// GMRES restart length (default: 30)
    #[serde(default = "default_restart")]
    pub restart: usize,
    /// Richardson damping factor (default: 1.0)
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Default: none
    #[serde(default = "default_preconditioner")]
    pub preconditioner: PreconditionerType,
}

fn default_solver_type() -> SolverType {
    SolverType::Gmres
}
fn default_max_itr() -> usize {
    1000
}
fn default_tolerance() -> f64 {
    1e-8
}
fn default_restart() -> usize {
    30
}
fn default_damping() -> f64 {
    1.0
}
fn default_preconditioner() -> PreconditionerType {
    PreconditionerType::None
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            solver_type: default_solver_type(),
            max_itr: default_max_itr(),
            tolerance: default_tolerance(),
            restart: default_restart(),
            damping: default_damping(),
            preconditioner: default_preconditioner(),
        }
    }
}

impl SolverParams {
    /// Fixed-sweep damped-Jacobi smoother used on multigrid levels.
    pub fn smoother() -> Self {
        SolverParams {
            solver_type: SolverType::Richardson,
            max_itr: 2,
            tolerance: 0.0,
            restart: default_restart(),
            damping: 0.8,
            preconditioner: PreconditionerType::Jacobi,
        }
    }
}

/// Energy multigrid preconditioner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultigridParams {
    /// Groups merged per coarse group (default: 2)
    #[serde(rename = "Coarse Factor", default = "default_coarse_factor")]
    pub coarse_factor: usize,
    /// Maximum number of levels (default: 10)
    #[serde(rename = "Max Depth", default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(rename = "Smoother", default = "SolverParams::smoother")]
    pub smoother: SolverParams,
    /// Replaces the smoother on the coarsest level when present.
    #[serde(rename = "Coarse Solver", default, skip_serializing_if = "Option::is_none")]
    pub coarse_solver: Option<SolverParams>,
}

fn default_coarse_factor() -> usize {
    2
}
fn default_max_depth() -> usize {
    10
}

impl Default for MultigridParams {
    fn default() -> Self {
        MultigridParams {
            coarse_factor: default_coarse_factor(),
            max_depth: default_max_depth(),
            smoother: SolverParams::smoother(),
            coarse_solver: None,
        }
    }
}

/// k-eigenvalue iteration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EigenParams {
    /// Default: 1e-6
    #[serde(default = "default_eigen_tolerance")]
    pub tolerance: f64,
    /// Default: 500
    #[serde(default = "default_eigen_max_itr")]
    pub max_itr: usize,
    /// Default: 1.0
    #[serde(default = "default_k_init")]
    pub k_init: f64,
}

fn default_eigen_tolerance() -> f64 {
    1e-6
}
fn default_eigen_max_itr() -> usize {
    500
}
fn default_k_init() -> f64 {
    1.0
}

impl Default for EigenParams {
    fn default() -> Self {
        EigenParams {
            tolerance: default_eigen_tolerance(),
            max_itr: default_eigen_max_itr(),
            k_init: default_k_init(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// MC block
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeffSolverType {
    Kcode,
    Anderson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McParams {
    /// Global particles per cycle (default: 1000)
    #[serde(rename = "Np", default = "default_np")]
    pub np: usize,
    /// Total cycles (default: 50)
    #[serde(default = "default_num_cycles")]
    pub num_cycles: usize,
    /// Inactive cycles (default: 10)
    #[serde(default = "default_num_inactive")]
    pub num_inactive_cycles: usize,
    /// Default: 12345
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Default: 1.0
    #[serde(default = "default_k_init")]
    pub keff_init: f64,
    /// Default: kcode
    #[serde(default = "default_keff_solver")]
    pub solver: KeffSolverType,
    /// Tally the fission matrix over active cycles (default: false)
    #[serde(default)]
    pub fission_matrix: bool,
    /// Eigen-mesh cells per axis for the fission-density vector; the
    /// problem mesh when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eigen_mesh: Option<[usize; 3]>,
    #[serde(default)]
    pub anderson: AndersonParams,
    /// Kernel-density resampling of fission sites; off when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kde: Option<KdeParams>,
}

fn default_np() -> usize {
    1000
}
fn default_num_cycles() -> usize {
    50
}
fn default_num_inactive() -> usize {
    10
}
fn default_seed() -> u64 {
    12345
}
fn default_keff_solver() -> KeffSolverType {
    KeffSolverType::Kcode
}

impl Default for McParams {
    fn default() -> Self {
        McParams {
            np: default_np(),
            num_cycles: default_num_cycles(),
            num_inactive_cycles: default_num_inactive(),
            seed: default_seed(),
            keff_init: default_k_init(),
            solver: default_keff_solver(),
            fission_matrix: false,
            eigen_mesh: None,
            anderson: AndersonParams::default(),
            kde: None,
        }
    }
}

/// Anderson-accelerated eigenvalue iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndersonParams {
    /// History depth m (default: 5)
    #[serde(default = "default_anderson_depth")]
    pub depth: usize,
    /// Default: 20
    #[serde(default = "default_anderson_max_itr")]
    pub max_itr: usize,
    /// Residual tolerance (default: 1e-3)
    #[serde(default = "default_anderson_tolerance")]
    pub tolerance: f64,
    /// Mixing factor (default: 1.0)
    #[serde(default = "default_anderson_beta")]
    pub beta: f64,
    /// Power iterations before Anderson starts (default: 3)
    #[serde(default = "default_anderson_inactive")]
    pub num_inactive_cycles: usize,
}

fn default_anderson_depth() -> usize {
    5
}
fn default_anderson_max_itr() -> usize {
    20
}
fn default_anderson_tolerance() -> f64 {
    1e-3
}
fn default_anderson_beta() -> f64 {
    1.0
}
fn default_anderson_inactive() -> usize {
    3
}

impl Default for AndersonParams {
    fn default() -> Self {
        AndersonParams {
            depth: default_anderson_depth(),
            max_itr: default_anderson_max_itr(),
            tolerance: default_anderson_tolerance(),
            beta: default_anderson_beta(),
            num_inactive_cycles: default_anderson_inactive(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdeParams {
    /// Bandwidth coefficient (default: 1.06)
    #[serde(default = "default_kde_coefficient")]
    pub coefficient: f64,
    /// Exponent on the site count (default: -0.2)
    #[serde(default = "default_kde_exponent")]
    pub exponent: f64,
}

fn default_kde_coefficient() -> f64 {
    1.06
}
fn default_kde_exponent() -> f64 {
    -0.20
}

impl Default for KdeParams {
    fn default() -> Self {
        KdeParams {
            coefficient: default_kde_coefficient(),
            exponent: default_kde_exponent(),
        }
    }
}

impl ProblemInput {
    /// Load from JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProfugusResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let input: Self = serde_json::from_str(&contents)?;
        Ok(input)
    }

    /// Check that every block is present, in input order.
    pub fn validate(&self) -> ProfugusResult<()> {
        let missing = |name: &str| {
            Err(ProfugusError::ConfigError(format!(
                "{name} block not defined in input."
            )))
        };
        if self.core.is_none() {
            return missing("CORE");
        }
        if self.assemblies.is_none() {
            return missing("ASSEMBLIES");
        }
        if self.material.is_none() {
            return missing("MATERIAL");
        }
        if self.mesh.is_none() {
            return missing("MESH");
        }
        let Some(problem) = &self.problem else {
            return missing("PROBLEM");
        };
        if problem.problem_mode == ProblemMode::TimeDependent {
            let Some(ts) = &problem.timestep else {
                return missing("timestep control");
            };
            if !(ts.dt > 0.0 && ts.dt.is_finite()) {
                return Err(ProfugusError::ConfigError(format!(
                    "timestep control: dt must be positive, got {}",
                    ts.dt
                )));
            }
        }
        Ok(())
    }
}
