// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Tallies
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-cycle tallies for k-eigenvalue transport.
//!
//! Tracking produces one [`HistoryScore`] per history. The [`Tallier`]
//! folds them in history order, so the accumulated sums do not depend on
//! how histories were spread over threads.

use std::rc::Rc;
use std::sync::Arc;

use log::debug;
use profugus_comm::{CommExt, Communicator};
use profugus_math::eigen::{EigenResult, PowerIteration};
use profugus_types::require;
use profugus_types::state::{CartesianMesh, SpaceVector};

use crate::fission_matrix::{FissionMatrixProcessor, SparseMatrix};
use crate::fission_source::FissionSite;

/// Expected fission neutrons `w νΣf/Σt` produced at one collision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FissionEvent {
    pub cell: usize,
    pub r: SpaceVector,
    pub value: f64,
}

/// Everything one history contributes to the cycle.
#[derive(Debug, Clone, Default)]
pub struct HistoryScore {
    pub birth_cell: usize,
    pub birth_weight: f64,
    /// Collision estimator of fission production.
    pub k_collision: f64,
    /// Track-length estimator of fission production.
    pub k_track: f64,
    pub production: Vec<FissionEvent>,
    pub sites: Vec<FissionSite>,
}

// ---------------------------------------------------------------------------
// keff
// ---------------------------------------------------------------------------

/// Collision and track-length estimates of k per cycle.
pub struct KeffTally {
    comm: Rc<dyn Communicator>,
    cycle_collision: f64,
    cycle_track: f64,
    cycle_weight: f64,
    latest: f64,
    latest_track: f64,
    active: bool,
    estimates: Vec<f64>,
}

impl KeffTally {
    pub fn new(comm: Rc<dyn Communicator>, keff_init: f64) -> Self {
        KeffTally {
            comm,
            cycle_collision: 0.0,
            cycle_track: 0.0,
            cycle_weight: 0.0,
            latest: keff_init,
            latest_track: keff_init,
            active: false,
            estimates: Vec::new(),
        }
    }

    pub fn end_history(&mut self, score: &HistoryScore) {
        self.cycle_collision += score.k_collision;
        self.cycle_track += score.k_track;
        self.cycle_weight += score.birth_weight;
    }

    /// Reduce the cycle sums over all nodes. Collective.
    ///
    /// Production is normalised by the global source weight, which is the
    /// global number of histories for unit-weight sources.
    pub fn end_cycle(&mut self) {
        let mut sums = [self.cycle_collision, self.cycle_track, self.cycle_weight];
        self.comm.global_sum(&mut sums);
        require!(sums[2] > 0.0, "no source weight transported this cycle");

        self.latest = sums[0] / sums[2];
        self.latest_track = sums[1] / sums[2];
        if self.active {
            self.estimates.push(self.latest);
        }
        self.cycle_collision = 0.0;
        self.cycle_track = 0.0;
        self.cycle_weight = 0.0;
    }

    pub fn begin_active_cycles(&mut self) {
        self.active = true;
        self.estimates.clear();
    }

    /// Collision estimate of the last completed cycle.
    pub fn latest(&self) -> f64 {
        self.latest
    }

    pub fn latest_track(&self) -> f64 {
        self.latest_track
    }

    pub fn num_active_cycles(&self) -> usize {
        self.estimates.len()
    }

    pub fn cycle_estimates(&self) -> &[f64] {
        &self.estimates
    }

    /// Mean over active cycles, or the latest estimate before any.
    pub fn mean(&self) -> f64 {
        if self.estimates.is_empty() {
            return self.latest;
        }
        self.estimates.iter().sum::<f64>() / self.estimates.len() as f64
    }

    /// Variance of the mean over active cycles.
    pub fn variance(&self) -> f64 {
        let n = self.estimates.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let ss: f64 = self.estimates.iter().map(|k| (k - mean).powi(2)).sum();
        ss / (n * (n - 1)) as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn reset(&mut self) {
        self.cycle_collision = 0.0;
        self.cycle_track = 0.0;
        self.cycle_weight = 0.0;
        self.active = false;
        self.estimates.clear();
    }
}

// ---------------------------------------------------------------------------
// Fission density
// ---------------------------------------------------------------------------

/// Fission production on a Cartesian eigen mesh, summed over active cycles.
pub struct FissionTally {
    comm: Rc<dyn Communicator>,
    mesh: Arc<CartesianMesh>,
    cycle: Vec<f64>,
    accumulated: Vec<f64>,
    num_cycles: usize,
}

impl FissionTally {
    pub fn new(comm: Rc<dyn Communicator>, mesh: Arc<CartesianMesh>) -> Self {
        let n = mesh.num_cells();
        FissionTally {
            comm,
            mesh,
            cycle: vec![0.0; n],
            accumulated: vec![0.0; n],
            num_cycles: 0,
        }
    }

    pub fn mesh(&self) -> &Arc<CartesianMesh> {
        &self.mesh
    }

    pub fn end_history(&mut self, score: &HistoryScore) {
        for event in &score.production {
            if let Some(c) = self.mesh.cell_containing(&event.r) {
                self.cycle[c] += event.value;
            }
        }
    }

    /// Collective.
    pub fn end_cycle(&mut self) {
        self.comm.global_sum(&mut self.cycle);
        for (acc, v) in self.accumulated.iter_mut().zip(self.cycle.iter_mut()) {
            *acc += *v;
            *v = 0.0;
        }
        self.num_cycles += 1;
    }

    /// Accumulated density normalised to unit sum (zeros before any cycle).
    pub fn density(&self) -> Vec<f64> {
        let total: f64 = self.accumulated.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.accumulated.len()];
        }
        self.accumulated.iter().map(|v| v / total).collect()
    }

    pub fn num_cycles(&self) -> usize {
        self.num_cycles
    }

    pub fn reset(&mut self) {
        self.cycle.fill(0.0);
        self.accumulated.fill(0.0);
        self.num_cycles = 0;
    }
}

// ---------------------------------------------------------------------------
// Fission matrix
// ---------------------------------------------------------------------------

/// Birth-cell to production-cell transfer matrix over geometry cells.
pub struct FissionMatrixTally {
    processor: FissionMatrixProcessor,
    local: SparseMatrix,
    denominator: Vec<f64>,
}

impl FissionMatrixTally {
    pub fn new(comm: Rc<dyn Communicator>, num_cells: usize) -> Self {
        require!(num_cells > 0);
        FissionMatrixTally {
            processor: FissionMatrixProcessor::new(comm),
            local: SparseMatrix::new(),
            denominator: vec![0.0; num_cells],
        }
    }

    pub fn end_history(&mut self, score: &HistoryScore) {
        let src = score.birth_cell;
        self.denominator[src] += score.birth_weight;
        for event in &score.production {
            *self.local.entry((event.cell, src)).or_insert(0.0) += event.value;
        }
    }

    /// Domain-local entries tallied so far.
    pub fn local(&self) -> &SparseMatrix {
        &self.local
    }

    /// Reduce and normalise over all nodes. Collective.
    pub fn build_matrix(&mut self) {
        self.processor.build_matrix(&self.local, &self.denominator);
    }

    pub fn processor(&self) -> &FissionMatrixProcessor {
        &self.processor
    }

    /// Dominant eigenpair of the built matrix; `x` returns the normalised
    /// fission-source shape over geometry cells.
    pub fn dominant_eigenpair(&self, solver: &PowerIteration, x: &mut Vec<f64>) -> EigenResult {
        let n = self.processor.n();
        require!(n > 0, "fission matrix has not been built");
        x.clear();
        x.resize(n, 1.0 / n as f64);
        let processor = &self.processor;
        let mut apply = |v: &[f64], y: &mut [f64]| processor.apply(v, y);
        let result = solver.solve(&mut apply, x, 1.0);
        let sum: f64 = x.iter().sum();
        if sum > 0.0 {
            x.iter_mut().for_each(|v| *v /= sum);
        }
        result
    }

    pub fn reset(&mut self) {
        self.local.clear();
        self.denominator.fill(0.0);
        self.processor.reset();
    }
}

// ---------------------------------------------------------------------------
// Tallier
// ---------------------------------------------------------------------------

/// Owns the active tallies and dispatches history and cycle events.
#[derive(Default)]
pub struct Tallier {
    keff: Option<KeffTally>,
    fission: Option<FissionTally>,
    fission_matrix: Option<FissionMatrixTally>,
    active: bool,
}

impl Tallier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_keff_tally(&mut self, tally: KeffTally) {
        self.keff = Some(tally);
    }

    pub fn set_fission_tally(&mut self, tally: FissionTally) {
        self.fission = Some(tally);
    }

    pub fn set_fission_matrix_tally(&mut self, tally: FissionMatrixTally) {
        self.fission_matrix = Some(tally);
    }

    pub fn keff(&self) -> Option<&KeffTally> {
        self.keff.as_ref()
    }

    pub fn fission(&self) -> Option<&FissionTally> {
        self.fission.as_ref()
    }

    pub fn fission_matrix(&self) -> Option<&FissionMatrixTally> {
        self.fission_matrix.as_ref()
    }

    pub fn fission_matrix_mut(&mut self) -> Option<&mut FissionMatrixTally> {
        self.fission_matrix.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Switch from inactive to active cycles.
    pub fn begin_active_cycles(&mut self) {
        self.active = true;
        if let Some(k) = self.keff.as_mut() {
            k.begin_active_cycles();
        }
        debug!("tallies switched to active cycles");
    }

    /// The keff tally scores every cycle; the others only active cycles.
    pub fn end_history(&mut self, score: &HistoryScore) {
        if let Some(k) = self.keff.as_mut() {
            k.end_history(score);
        }
        if !self.active {
            return;
        }
        if let Some(f) = self.fission.as_mut() {
            f.end_history(score);
        }
        if let Some(fm) = self.fission_matrix.as_mut() {
            fm.end_history(score);
        }
    }

    /// Collective.
    pub fn end_cycle(&mut self) {
        if let Some(k) = self.keff.as_mut() {
            k.end_cycle();
        }
        if self.active {
            if let Some(f) = self.fission.as_mut() {
                f.end_cycle();
            }
        }
    }

    pub fn reset(&mut self) {
        self.active = false;
        if let Some(k) = self.keff.as_mut() {
            k.reset();
        }
        if let Some(f) = self.fission.as_mut() {
            f.reset();
        }
        if let Some(fm) = self.fission_matrix.as_mut() {
            fm.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profugus_comm::{LocalCluster, SerialComm};

    fn serial() -> Rc<dyn Communicator> {
        Rc::new(SerialComm::new())
    }

    fn score(birth_cell: usize, k: f64, events: &[(usize, f64)]) -> HistoryScore {
        HistoryScore {
            birth_cell,
            birth_weight: 1.0,
            k_collision: k,
            k_track: 0.5 * k,
            production: events
                .iter()
                .map(|&(cell, value)| FissionEvent {
                    cell,
                    r: [cell as f64 + 0.5, 0.5, 0.5],
                    value,
                })
                .collect(),
            sites: Vec::new(),
        }
    }

    #[test]
    fn test_keff_cycle_estimate_and_statistics() {
        let mut tally = KeffTally::new(serial(), 1.0);
        tally.begin_active_cycles();
        for k in [0.9, 1.1, 1.0, 1.2] {
            // two histories per cycle
            tally.end_history(&score(0, k, &[]));
            tally.end_history(&score(0, k, &[]));
            tally.end_cycle();
            assert!((tally.latest() - k).abs() < 1e-15);
            assert!((tally.latest_track() - 0.5 * k).abs() < 1e-15);
        }
        assert_eq!(tally.num_active_cycles(), 4);
        assert!((tally.mean() - 1.05).abs() < 1e-14);
        // sample variance 0.05/3, over n = 4
        let expected = 0.05 / 3.0 / 4.0;
        assert!((tally.variance() - expected).abs() < 1e-14, "{}", tally.variance());
    }

    #[test]
    fn test_inactive_cycles_are_not_averaged() {
        let mut tally = KeffTally::new(serial(), 1.0);
        tally.end_history(&score(0, 3.0, &[]));
        tally.end_cycle();
        assert_eq!(tally.latest(), 3.0);
        assert_eq!(tally.num_active_cycles(), 0);
        assert_eq!(tally.mean(), 3.0);
    }

    #[test]
    fn test_keff_reduced_over_nodes() {
        let results = LocalCluster::run(4, |comm| {
            let node = comm.node();
            let mut tally = KeffTally::new(comm, 1.0);
            // node n transports n + 1 histories scoring n each
            for _ in 0..=node {
                tally.end_history(&score(0, node as f64, &[]));
            }
            tally.end_cycle();
            tally.latest()
        });
        // (0 + 2 + 6 + 12) / 10
        for k in results {
            assert!((k - 2.0).abs() < 1e-15);
        }
    }

    #[test]
    fn test_fission_tally_density() {
        let mesh = Arc::new(CartesianMesh::uniform([2, 1, 1], [1.0, 1.0, 1.0]).unwrap());
        let mut tally = FissionTally::new(serial(), mesh);
        tally.end_history(&score(0, 1.0, &[(0, 1.0), (1, 3.0)]));
        tally.end_cycle();
        assert_eq!(tally.density(), vec![0.25, 0.75]);
        assert_eq!(tally.num_cycles(), 1);
        tally.reset();
        assert_eq!(tally.density(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_fission_matrix_tally_columns() {
        let mut tally = FissionMatrixTally::new(serial(), 2);
        // cell 0 births: half stay, half go to cell 1; cell 1 births stay
        for _ in 0..4 {
            tally.end_history(&score(0, 1.0, &[(0, 0.5), (1, 0.5)]));
            tally.end_history(&score(1, 1.0, &[(1, 1.0)]));
        }
        assert_eq!(tally.local().len(), 3);
        tally.build_matrix();
        let fm = tally.processor();
        assert_eq!(fm.graph(), &vec![(0, 0), (1, 0), (1, 1)]);
        assert_eq!(fm.matrix(), &[0.5, 0.5, 1.0]);

        let mut shape = Vec::new();
        let result = tally.dominant_eigenpair(&PowerIteration::default(), &mut shape);
        assert!(result.converged);
        assert!((result.keff - 1.0).abs() < 1e-6, "k = {}", result.keff);
        assert!(shape[1] > 0.999, "{shape:?}");
    }

    #[test]
    fn test_tallier_dispatch() {
        let mut tallier = Tallier::new();
        tallier.set_keff_tally(KeffTally::new(serial(), 1.0));
        tallier.set_fission_matrix_tally(FissionMatrixTally::new(serial(), 2));

        tallier.end_history(&score(0, 2.0, &[(0, 2.0)]));
        tallier.end_cycle();
        assert!(tallier.fission_matrix().unwrap().local().is_empty());
        assert_eq!(tallier.keff().unwrap().latest(), 2.0);

        tallier.begin_active_cycles();
        tallier.end_history(&score(0, 1.0, &[(0, 1.0)]));
        tallier.end_cycle();
        assert_eq!(tallier.fission_matrix().unwrap().local().len(), 1);
        assert_eq!(tallier.keff().unwrap().num_active_cycles(), 1);

        tallier.reset();
        assert!(!tallier.is_active());
        assert!(tallier.fission_matrix().unwrap().local().is_empty());
    }
}
