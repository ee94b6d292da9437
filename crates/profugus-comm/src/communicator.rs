// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Communicator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Explicit message-passing communicator.
//!
//! Backends implement blocking point-to-point transfer of typed payloads
//! with integer tags. Collectives are layered on top in [`CommExt`], so
//! every backend gets the same deterministic reduction order: node 0
//! accumulates contributions in rank order and broadcasts the result.
//!
//! Messages between an ordered pair of nodes are delivered in send order;
//! a receive for tag `t` skips (and keeps) earlier messages with other tags.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ops::AddAssign;

use profugus_types::dbc::contract_violation_msg;
use profugus_types::{insist, require};

/// Tag used by [`CommExt::broadcast`].
pub const BROADCAST_TAG: u32 = 9001;
/// Tag used by the reductions.
pub const REDUCE_TAG: u32 = 9002;
/// Tag used by [`CommExt::gather_all`].
pub const GATHER_TAG: u32 = 9003;

/// Wire representation of a message body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Int(v) => v.len(),
            Payload::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plain values that can travel in a [`Payload`].
pub trait Datum: Copy + Send + 'static {
    fn pack(data: &[Self]) -> Payload;
    fn unpack(payload: Payload) -> Vec<Self>;
}

impl Datum for f64 {
    fn pack(data: &[Self]) -> Payload {
        Payload::Float(data.to_vec())
    }

    fn unpack(payload: Payload) -> Vec<Self> {
        match payload {
            Payload::Float(v) => v,
            Payload::Int(_) => contract_violation_msg(
                "payload is Float",
                "received integer payload where floats were expected",
                file!(),
                line!(),
            ),
        }
    }
}

macro_rules! int_datum {
    ($($t:ty),*) => {$(
        impl Datum for $t {
            fn pack(data: &[Self]) -> Payload {
                Payload::Int(data.iter().map(|&v| v as i64).collect())
            }

            fn unpack(payload: Payload) -> Vec<Self> {
                match payload {
                    Payload::Int(v) => v.into_iter().map(|x| x as $t).collect(),
                    Payload::Float(_) => contract_violation_msg(
                        "payload is Int",
                        "received float payload where integers were expected",
                        file!(),
                        line!(),
                    ),
                }
            }
        }
    )*};
}

int_datum!(i32, i64, u32, u64, usize);

/// Point-to-point message passing between `nodes()` ranks.
pub trait Communicator {
    /// Rank of this process, in `0..nodes()`.
    fn node(&self) -> usize;

    fn nodes(&self) -> usize;

    /// Blocking-semantics send; may return before the message is received.
    fn send_payload(&self, payload: Payload, dest: usize, tag: u32);

    /// Block until a message with `tag` from `source` arrives.
    fn receive_payload(&self, source: usize, tag: u32) -> Payload;
}

/// Typed messaging and collectives for every [`Communicator`].
pub trait CommExt: Communicator {
    fn send<T: Datum>(&self, data: &[T], dest: usize, tag: u32) {
        require!(dest < self.nodes());
        self.send_payload(T::pack(data), dest, tag);
    }

    fn receive<T: Datum>(&self, source: usize, tag: u32) -> Vec<T> {
        require!(source < self.nodes());
        T::unpack(self.receive_payload(source, tag))
    }

    /// Receive into a buffer whose length must match the message.
    fn receive_into<T: Datum>(&self, buffer: &mut [T], source: usize, tag: u32) {
        let data: Vec<T> = self.receive(source, tag);
        insist!(
            data.len() == buffer.len(),
            "message from node {source} (tag {tag}) has {} entries, buffer holds {}",
            data.len(),
            buffer.len()
        );
        buffer.copy_from_slice(&data);
    }

    /// Copy `root`'s buffer into every other node's buffer of equal length.
    fn broadcast<T: Datum>(&self, data: &mut [T], root: usize) {
        require!(root < self.nodes());
        if self.nodes() == 1 {
            return;
        }
        if self.node() == root {
            for dest in (0..self.nodes()).filter(|&n| n != root) {
                self.send(data, dest, BROADCAST_TAG);
            }
        } else {
            self.receive_into(data, root, BROADCAST_TAG);
        }
    }

    /// Element-wise sum over all nodes; every node ends with the same result.
    fn global_sum<T: Datum + AddAssign>(&self, data: &mut [T]) {
        if self.nodes() == 1 {
            return;
        }
        if self.node() == 0 {
            for source in 1..self.nodes() {
                let part: Vec<T> = self.receive(source, REDUCE_TAG);
                insist!(
                    part.len() == data.len(),
                    "global_sum length mismatch: node {source} sent {}, expected {}",
                    part.len(),
                    data.len()
                );
                for (d, p) in data.iter_mut().zip(part) {
                    *d += p;
                }
            }
        } else {
            self.send(data, 0, REDUCE_TAG);
        }
        self.broadcast(data, 0);
    }

    /// Element-wise maximum over all nodes.
    fn global_max<T: Datum + PartialOrd>(&self, data: &mut [T]) {
        if self.nodes() == 1 {
            return;
        }
        if self.node() == 0 {
            for source in 1..self.nodes() {
                let part: Vec<T> = self.receive(source, REDUCE_TAG);
                insist!(
                    part.len() == data.len(),
                    "global_max length mismatch: node {source} sent {}, expected {}",
                    part.len(),
                    data.len()
                );
                for (d, p) in data.iter_mut().zip(part) {
                    if p > *d {
                        *d = p;
                    }
                }
            }
        } else {
            self.send(data, 0, REDUCE_TAG);
        }
        self.broadcast(data, 0);
    }

    /// Scalar convenience over [`CommExt::global_sum`].
    fn sum_scalar<T: Datum + AddAssign>(&self, value: T) -> T {
        let mut buf = [value];
        self.global_sum(&mut buf);
        buf[0]
    }

    fn max_scalar<T: Datum + PartialOrd>(&self, value: T) -> T {
        let mut buf = [value];
        self.global_max(&mut buf);
        buf[0]
    }

    fn barrier(&self) {
        let mut token = [0_i64];
        self.global_sum(&mut token);
    }

    /// Every node receives every node's contribution, indexed by rank.
    fn gather_all<T: Datum>(&self, local: &[T]) -> Vec<Vec<T>> {
        let nodes = self.nodes();
        if nodes == 1 {
            return vec![local.to_vec()];
        }

        if self.node() == 0 {
            let mut counts = vec![local.len(); 1];
            let mut flat: Vec<T> = local.to_vec();
            for source in 1..nodes {
                let part: Vec<T> = self.receive(source, GATHER_TAG);
                counts.push(part.len());
                flat.extend(part);
            }
            for dest in 1..nodes {
                self.send(&counts, dest, GATHER_TAG);
                self.send(&flat, dest, GATHER_TAG);
            }
            split_counts(flat, &counts)
        } else {
            self.send(local, 0, GATHER_TAG);
            let counts: Vec<usize> = self.receive(0, GATHER_TAG);
            let flat: Vec<T> = self.receive(0, GATHER_TAG);
            split_counts(flat, &counts)
        }
    }
}

impl<C: Communicator + ?Sized> CommExt for C {}

fn split_counts<T: Datum>(flat: Vec<T>, counts: &[usize]) -> Vec<Vec<T>> {
    insist!(
        flat.len() == counts.iter().sum::<usize>(),
        "gathered {} entries, counts total {}",
        flat.len(),
        counts.iter().sum::<usize>()
    );
    let mut out = Vec::with_capacity(counts.len());
    let mut it = flat.into_iter();
    for &c in counts {
        out.push(it.by_ref().take(c).collect());
    }
    out
}

// ─────────────────────────────────────────────────────────────────────
// Serial backend
// ─────────────────────────────────────────────────────────────────────

/// Single-node communicator. Messages sent to self are queued.
#[derive(Debug, Default)]
pub struct SerialComm {
    queue: RefCell<VecDeque<(u32, Payload)>>,
}

impl SerialComm {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Communicator for SerialComm {
    fn node(&self) -> usize {
        0
    }

    fn nodes(&self) -> usize {
        1
    }

    fn send_payload(&self, payload: Payload, dest: usize, tag: u32) {
        require!(dest == 0);
        self.queue.borrow_mut().push_back((tag, payload));
    }

    fn receive_payload(&self, source: usize, tag: u32) -> Payload {
        require!(source == 0);
        let mut queue = self.queue.borrow_mut();
        let pos = queue.iter().position(|(t, _)| *t == tag);
        match pos.and_then(|p| queue.remove(p)) {
            Some((_, payload)) => payload,
            None => contract_violation_msg(
                "message queued",
                &format!("serial receive with tag {tag} would block forever"),
                file!(),
                line!(),
            ),
        }
    }
}
