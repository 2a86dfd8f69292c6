use rand::{rngs::StdRng, Rng};

use crate::grid::NodeIndex;

/// Defines a heuristic for the choice of a node to collapse.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum NodeSelectionHeuristic {
    /// The node with the minimum count of possible terrain types remaining will be chosen at each selection iteration. If multiple nodes have the same value, one of them is picked uniformly at random.
    #[default]
    MinimumEntropy,
    /// A random node with no special features (except not being collapsed yet) will be chosen at each selection iteration.
    ///
    /// Causes a much higher contradiction rate than [`NodeSelectionHeuristic::MinimumEntropy`].
    Random,
}

impl NodeSelectionHeuristic {
    /// Picks a node according to the heuristic, among the nodes not yet collapsed and with at least one possible terrain.
    ///
    /// `candidates_counts[node]` is the number of terrain types still possible on `node`, and `collapsed[node]` tells if it was already collapsed.
    ///
    /// Returns `None` if there is no such node left.
    pub(crate) fn select_node<C>(
        &self,
        candidates_counts: &[usize],
        collapsed: C,
        rng: &mut StdRng,
    ) -> Option<NodeIndex>
    where
        C: Fn(NodeIndex) -> bool,
    {
        let mut min = usize::MAX;
        // All the nodes sharing the current minimum
        let mut candidates = Vec::new();
        for (index, &count) in candidates_counts.iter().enumerate() {
            if count == 0 || collapsed(index) {
                continue;
            }
            match self {
                NodeSelectionHeuristic::MinimumEntropy => {
                    if count < min {
                        min = count;
                        candidates.clear();
                        candidates.push(index);
                    } else if count == min {
                        candidates.push(index);
                    }
                }
                NodeSelectionHeuristic::Random => candidates.push(index),
            }
        }
        match candidates.len() {
            0 => None,
            1 => Some(candidates[0]),
            len => Some(candidates[rng.gen_range(0..len)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{rngs::StdRng, SeedableRng};

    use super::NodeSelectionHeuristic;

    #[test]
    fn minimum_entropy_ignores_collapsed_and_empty_nodes() {
        let mut rng = StdRng::seed_from_u64(0);
        let counts = vec![1, 0, 3, 2];
        let selected =
            NodeSelectionHeuristic::MinimumEntropy.select_node(&counts, |node| node == 0, &mut rng);
        assert_eq!(selected, Some(3));
    }

    #[test]
    fn minimum_entropy_breaks_ties_among_all_minimums() {
        let mut rng = StdRng::seed_from_u64(42);
        let counts = vec![2, 6, 2, 4, 2];
        let mut picked = HashSet::new();
        for _ in 0..200 {
            let node = NodeSelectionHeuristic::MinimumEntropy
                .select_node(&counts, |_| false, &mut rng)
                .unwrap();
            picked.insert(node);
        }
        assert_eq!(picked, HashSet::from([0, 2, 4]));
    }

    #[test]
    fn no_node_left() {
        let mut rng = StdRng::seed_from_u64(0);
        let counts = vec![1, 1];
        for heuristic in [NodeSelectionHeuristic::MinimumEntropy, NodeSelectionHeuristic::Random] {
            assert_eq!(heuristic.select_node(&counts, |_| true, &mut rng), None);
        }
    }
}
