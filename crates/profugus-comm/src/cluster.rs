// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Thread Cluster
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Several ranks inside one process, one OS thread per rank.
//!
//! Each ordered pair of ranks owns an unbounded `crossbeam-channel`, so
//! sends never block and per-pair ordering is FIFO. Ranks run on dedicated
//! scoped threads rather than a work-stealing pool because receives block.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;
use profugus_types::dbc::contract_violation_msg;
use profugus_types::require;

use crate::communicator::{Communicator, Payload};

type Envelope = (u32, Payload);

/// Communicator for one rank of a [`LocalCluster`].
pub struct ThreadComm {
    node: usize,
    nodes: usize,
    /// Indexed by destination.
    outboxes: Vec<Sender<Envelope>>,
    /// Indexed by source.
    inboxes: Vec<Receiver<Envelope>>,
    /// Messages already pulled off an inbox while looking for another tag.
    pending: RefCell<Vec<VecDeque<Envelope>>>,
}

impl ThreadComm {
    /// Wire up `nodes` communicators, index = rank.
    pub fn create_group(nodes: usize) -> Vec<ThreadComm> {
        require!(nodes > 0);
        let mut outboxes: Vec<Vec<Sender<Envelope>>> =
            (0..nodes).map(|_| Vec::with_capacity(nodes)).collect();
        let mut inboxes: Vec<Vec<Receiver<Envelope>>> =
            (0..nodes).map(|_| Vec::with_capacity(nodes)).collect();
        for src in 0..nodes {
            for inbox in inboxes.iter_mut() {
                let (tx, rx) = unbounded();
                outboxes[src].push(tx);
                inbox.push(rx);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(node, (outboxes, inboxes))| ThreadComm {
                node,
                nodes,
                outboxes,
                inboxes,
                pending: RefCell::new((0..nodes).map(|_| VecDeque::new()).collect()),
            })
            .collect()
    }
}

impl Communicator for ThreadComm {
    fn node(&self) -> usize {
        self.node
    }

    fn nodes(&self) -> usize {
        self.nodes
    }

    fn send_payload(&self, payload: Payload, dest: usize, tag: u32) {
        require!(dest < self.nodes);
        trace!(
            "node {} -> {dest}: tag {tag}, {} entries",
            self.node,
            payload.len()
        );
        if self.outboxes[dest].send((tag, payload)).is_err() {
            contract_violation_msg(
                "receiver alive",
                &format!("node {dest} hung up before node {} could send", self.node),
                file!(),
                line!(),
            );
        }
    }

    fn receive_payload(&self, source: usize, tag: u32) -> Payload {
        require!(source < self.nodes);
        {
            let mut pending = self.pending.borrow_mut();
            let queue = &mut pending[source];
            let pos = queue.iter().position(|(t, _)| *t == tag);
            if let Some((_, payload)) = pos.and_then(|p| queue.remove(p)) {
                return payload;
            }
        }
        loop {
            match self.inboxes[source].recv() {
                Ok((t, payload)) if t == tag => return payload,
                Ok(other) => self.pending.borrow_mut()[source].push_back(other),
                Err(_) => contract_violation_msg(
                    "sender alive",
                    &format!(
                        "node {source} exited while node {} waited on tag {tag}",
                        self.node
                    ),
                    file!(),
                    line!(),
                ),
            }
        }
    }
}

/// Runs a closure on every rank of an in-process cluster.
pub struct LocalCluster;

impl LocalCluster {
    /// Run `f` on `nodes` ranks and return the per-rank results in rank
    /// order. A panic on any rank is re-raised on the caller.
    pub fn run<F, R>(nodes: usize, f: F) -> Vec<R>
    where
        F: Fn(Rc<dyn Communicator>) -> R + Sync,
        R: Send,
    {
        let comms = ThreadComm::create_group(nodes);
        let f = &f;
        std::thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    scope.spawn(move || {
                        let comm: Rc<dyn Communicator> = Rc::new(comm);
                        f(comm)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(r) => r,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}
