// ─────────────────────────────────────────────────────────────────────
// Profugus-RS — Work Decomposition
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Deterministic split of particle histories across ranks.

use std::ops::Range;

use profugus_types::error::{ProfugusError, ProfugusResult};

/// Contiguous block of global history indices owned by one rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySlice {
    pub node: usize,
    pub nodes: usize,
    pub total: usize,
    pub start: usize,
    pub end: usize,
}

impl HistorySlice {
    pub fn count(&self) -> usize {
        self.end - self.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Per-rank counts summing to `total`; the remainder goes to low ranks.
pub fn balanced_split(total: usize, nodes: usize) -> Vec<usize> {
    let base = total / nodes.max(1);
    let rem = total % nodes.max(1);
    (0..nodes).map(|i| base + usize::from(i < rem)).collect()
}

pub fn decompose_histories(total: usize, nodes: usize) -> ProfugusResult<Vec<HistorySlice>> {
    if nodes < 1 {
        return Err(ProfugusError::Comm(
            "History decomposition requires nodes >= 1".to_string(),
        ));
    }
    let mut out = Vec::with_capacity(nodes);
    let mut cursor = 0usize;
    for (node, count) in balanced_split(total, nodes).into_iter().enumerate() {
        out.push(HistorySlice {
            node,
            nodes,
            total,
            start: cursor,
            end: cursor + count,
        });
        cursor += count;
    }
    Ok(out)
}

/// The slice owned by `node`.
pub fn local_histories(total: usize, node: usize, nodes: usize) -> ProfugusResult<HistorySlice> {
    if node >= nodes {
        return Err(ProfugusError::Comm(format!(
            "node {node} out of range for {nodes} nodes"
        )));
    }
    let mut slices = decompose_histories(total, nodes)?;
    Ok(slices.swap_remove(node))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_covers_all_histories() {
        let slices = decompose_histories(17, 4).unwrap();
        assert_eq!(slices.len(), 4);
        assert_eq!(slices[0].start, 0);
        assert_eq!(slices.last().unwrap().end, 17);
        let covered: usize = slices.iter().map(|s| s.count()).sum();
        assert_eq!(covered, 17);
        assert_eq!(slices[0].count(), 5);
        assert_eq!(slices[3].count(), 4);
    }

    #[test]
    fn test_more_nodes_than_histories() {
        let counts = balanced_split(2, 4);
        assert_eq!(counts, vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_rejects_zero_nodes() {
        assert!(decompose_histories(10, 0).is_err());
        assert!(local_histories(10, 3, 3).is_err());
    }

    #[test]
    fn test_local_matches_decomposition() {
        let all = decompose_histories(1001, 7).unwrap();
        for (node, slice) in all.iter().enumerate() {
            assert_eq!(&local_histories(1001, node, 7).unwrap(), slice);
        }
    }
}
