// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Fission Matrix Processor
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Global reduction of domain-local sparse fission matrices.
//!
//! Each domain tallies a sparse `(dest, src) → value` map. Building the
//! global matrix is a bottom-up merge over the binary process tree:
//!
//! 1. sort the local keys into a local ordered graph;
//! 2. internal nodes receive their children's graphs (sizes on tag 800,
//!    pairs on tag 801) and merge them with sort + dedup, then forward the
//!    union to their parent;
//! 3. the root broadcasts the union, so every domain holds the same
//!    canonical graph;
//! 4. each domain merge-joins its local graph against the global one and
//!    scatters its values into a global-length vector;
//! 5. values and denominators are sum-reduced over all domains;
//! 6. every entry is divided by `denominator[src]`.
//!
//! After [`FissionMatrixProcessor::build_matrix`] the graph is strictly
//! sorted and duplicate-free, and `matrix()[n]` is the entry at
//! `graph()[n]`. The graph depends only on the union of the local key
//! sets, so it is identical for any number of domains.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use profugus_comm::topology::{NodeKind, ProcessTopology};
use profugus_comm::{CommExt, Communicator};
use profugus_types::constants::{GRAPH_TAG, SIZE_TAG};
use profugus_types::{check, ensure, insist, require};

/// Domain-local fission matrix, keyed by `(dest_cell, src_cell)`.
pub type SparseMatrix = HashMap<(usize, usize), f64>;

/// Sorted, duplicate-free `(dest, src)` fill pattern.
pub type OrderedGraph = Vec<(usize, usize)>;

/// Builds and holds the globally reduced, normalised fission matrix.
pub struct FissionMatrixProcessor {
    comm: Rc<dyn Communicator>,
    topology: ProcessTopology,
    graph: OrderedGraph,
    matrix: Vec<f64>,
    denominator: Vec<f64>,
}

impl FissionMatrixProcessor {
    pub fn new(comm: Rc<dyn Communicator>) -> Self {
        let topology = ProcessTopology::new(comm.node(), comm.nodes());
        FissionMatrixProcessor {
            comm,
            topology,
            graph: Vec::new(),
            matrix: Vec::new(),
            denominator: Vec::new(),
        }
    }

    /// Reduce the local map and denominator into the global normalised
    /// matrix. Collective: every domain must call it.
    ///
    /// `local_denominator.len()` is the number of fission-matrix cells N.
    /// An empty local map contributes nothing to the global matrix.
    pub fn build_matrix(&mut self, local: &SparseMatrix, local_denominator: &[f64]) {
        let n = local_denominator.len();
        require!(local.len() <= n * n);

        self.reset();

        // local canonical ordering
        let mut local_graph: OrderedGraph = local.keys().copied().collect();
        local_graph.sort_unstable();
        check!(local_graph.iter().all(|&(d, s)| d < n && s < n));

        let mut graph = self.reduce(&local_graph);
        self.broadcast_graph(&mut graph);
        check!(graph.windows(2).all(|w| w[0] < w[1]));
        self.graph = graph;

        self.matrix = scatter(&local_graph, local, &self.graph);

        self.denominator = local_denominator.to_vec();
        self.denominator.resize(n, 0.0);
        self.comm.global_sum(&mut self.matrix);
        self.comm.global_sum(&mut self.denominator);

        for (value, &(_, src)) in self.matrix.iter_mut().zip(&self.graph) {
            let denom = self.denominator[src];
            require!(
                denom > 0.0,
                "source cell {src} has fission production but starting weight {denom}"
            );
            *value /= denom;
        }

        debug!(
            "fission matrix on node {}: {} local entries, {} global entries, N = {n}",
            self.comm.node(),
            local_graph.len(),
            self.graph.len()
        );
        ensure!(self.matrix.len() == self.graph.len());
    }

    /// Tree merge of local graphs; the full union ends up on the root.
    fn reduce(&self, local_graph: &[(usize, usize)]) -> OrderedGraph {
        let mut graph = local_graph.to_vec();

        if self.topology.kind() == NodeKind::Internal {
            for child in self.topology.children() {
                let other = self.receive_graph(child);
                merge(&mut graph, other);
            }
        }

        if let Some(parent) = self.topology.parent() {
            self.send_graph(&graph, parent);
        }
        graph
    }

    /// Replace every node's graph with the root's: size first, then pairs.
    fn broadcast_graph(&self, graph: &mut OrderedGraph) {
        if self.comm.nodes() == 1 {
            return;
        }
        let mut size = [graph.len()];
        self.comm.broadcast(&mut size, 0);

        let mut flat = if self.topology.is_root() {
            flatten(graph)
        } else {
            vec![0usize; 2 * size[0]]
        };
        self.comm.broadcast(&mut flat, 0);
        *graph = unflatten(&flat);
    }

    fn send_graph(&self, graph: &[(usize, usize)], dest: usize) {
        self.comm.send(&[graph.len()], dest, SIZE_TAG);
        self.comm.send(&flatten(graph), dest, GRAPH_TAG);
    }

    fn receive_graph(&self, source: usize) -> OrderedGraph {
        let size: Vec<usize> = self.comm.receive(source, SIZE_TAG);
        insist!(
            size.len() == 1,
            "size message from node {source} has {} entries",
            size.len()
        );
        let flat: Vec<usize> = self.comm.receive(source, GRAPH_TAG);
        insist!(
            flat.len() == 2 * size[0],
            "node {source} announced {} pairs but sent {} indices",
            size[0],
            flat.len()
        );
        unflatten(&flat)
    }

    /// Drop the graph and matrix of the last build.
    pub fn reset(&mut self) {
        self.graph.clear();
        self.matrix.clear();
        self.denominator.clear();
        ensure!(self.graph.is_empty() && self.matrix.is_empty());
    }

    pub fn graph(&self) -> &OrderedGraph {
        &self.graph
    }

    pub fn matrix(&self) -> &[f64] {
        &self.matrix
    }

    /// Globally reduced starting weight per source cell.
    pub fn denominator(&self) -> &[f64] {
        &self.denominator
    }

    /// Number of fission-matrix cells.
    pub fn n(&self) -> usize {
        self.denominator.len()
    }

    /// `y = F x` with the built matrix.
    pub fn apply(&self, x: &[f64], y: &mut [f64]) {
        require!(x.len() == self.n() && y.len() == self.n());
        y.fill(0.0);
        for (&(dest, src), &value) in self.graph.iter().zip(&self.matrix) {
            y[dest] += value * x[src];
        }
    }
}

/// Union of two graphs, sorted and without duplicates.
fn merge(graph: &mut OrderedGraph, other: OrderedGraph) {
    graph.extend(other);
    graph.sort_unstable();
    graph.dedup();
}

/// Place local values at their positions in the global graph.
///
/// Both graphs are sorted by the same ordering, so one forward pass over
/// the global graph finds every local entry.
fn scatter(local_graph: &[(usize, usize)], local: &SparseMatrix, global: &[(usize, usize)]) -> Vec<f64> {
    let mut out = vec![0.0; global.len()];
    let mut g = 0;
    for key in local_graph {
        while g < global.len() && global[g] < *key {
            g += 1;
        }
        insist!(
            g < global.len() && global[g] == *key,
            "local fission-matrix entry {:?} missing from the global graph",
            key
        );
        out[g] = local[key];
        g += 1;
    }
    out
}

fn flatten(graph: &[(usize, usize)]) -> Vec<usize> {
    graph.iter().flat_map(|&(d, s)| [d, s]).collect()
}

fn unflatten(flat: &[usize]) -> OrderedGraph {
    flat.chunks_exact(2).map(|p| (p[0], p[1])).collect()
}
