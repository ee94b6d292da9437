// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Process Topology
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Complete binary tree over ranks, used for tree reductions.
//!
//! Node `n` has parent `(n - 1) / 2` and children `2n + 1`, `2n + 2`;
//! rank 0 is the root.

use profugus_types::require;

/// Whether a node has at least one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessTopology {
    node: usize,
    nodes: usize,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

impl ProcessTopology {
    pub fn new(node: usize, nodes: usize) -> Self {
        require!(node < nodes);
        let child = |c: usize| if c < nodes { Some(c) } else { None };
        ProcessTopology {
            node,
            nodes,
            parent: if node == 0 { None } else { Some((node - 1) / 2) },
            left: child(2 * node + 1),
            right: child(2 * node + 2),
        }
    }

    pub fn node(&self) -> usize {
        self.node
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// `None` on the root.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn left_child(&self) -> Option<usize> {
        self.left
    }

    pub fn right_child(&self) -> Option<usize> {
        self.right
    }

    /// Existing children, left first.
    pub fn children(&self) -> impl Iterator<Item = usize> {
        self.left.into_iter().chain(self.right)
    }

    pub fn kind(&self) -> NodeKind {
        if self.left.is_some() {
            NodeKind::Internal
        } else {
            NodeKind::External
        }
    }

    pub fn is_root(&self) -> bool {
        self.node == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_node_is_external_root() {
        let t = ProcessTopology::new(0, 1);
        assert!(t.is_root());
        assert_eq!(t.parent(), None);
        assert_eq!(t.kind(), NodeKind::External);
        assert_eq!(t.children().count(), 0);
    }

    #[test]
    fn test_four_nodes() {
        let root = ProcessTopology::new(0, 4);
        assert_eq!(root.children().collect::<Vec<_>>(), vec![1, 2]);

        let one = ProcessTopology::new(1, 4);
        assert_eq!(one.parent(), Some(0));
        assert_eq!(one.left_child(), Some(3));
        assert_eq!(one.right_child(), None);
        assert_eq!(one.kind(), NodeKind::Internal);

        let two = ProcessTopology::new(2, 4);
        assert_eq!(two.parent(), Some(0));
        assert_eq!(two.kind(), NodeKind::External);

        let three = ProcessTopology::new(3, 4);
        assert_eq!(three.parent(), Some(1));
    }

    #[test]
    fn test_every_non_root_is_its_parents_child() {
        for nodes in 1..20 {
            for node in 1..nodes {
                let t = ProcessTopology::new(node, nodes);
                let parent = t.parent().map(|p| ProcessTopology::new(p, nodes));
                assert!(
                    parent.is_some_and(|p| p.children().any(|c| c == node)),
                    "node {node} of {nodes} is orphaned"
                );
            }
        }
    }
}
