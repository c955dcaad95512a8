//! Property tests for structural invariants.

use daglearn_core::engine::cache::ScoreKey;
use daglearn_core::{DagState, VarId};
use proptest::prelude::*;

const VARS: u32 = 6;
const MAX_PARENTS: usize = 3;

proptest! {
    /// No sequence of attempted mutations, legal or rejected, may ever
    /// leave the graph cyclic or over the in-degree cap.
    #[test]
    fn mutations_never_break_acyclicity(
        ops in proptest::collection::vec((0u32..VARS, 0u32..VARS, 0u8..3), 0..80)
    ) {
        let mut dag = DagState::new(VARS as usize, MAX_PARENTS);
        for (p, c, kind) in ops {
            let (p, c) = (VarId(p), VarId(c));
            // Rejections are routine; the invariant must hold either way.
            let _ = match kind {
                0 => dag.add_edge(p, c),
                1 => dag.remove_edge(p, c),
                _ => dag.reverse_edge(p, c),
            };
            prop_assert!(dag.topological_order().is_some(), "cycle after mutation");
            for v in 0..VARS {
                prop_assert!(dag.in_degree(VarId(v)) <= MAX_PARENTS);
            }
        }
    }

    /// Edge count always matches the enumerated edges.
    #[test]
    fn edge_count_matches_enumeration(
        ops in proptest::collection::vec((0u32..VARS, 0u32..VARS, 0u8..2), 0..60)
    ) {
        let mut dag = DagState::new(VARS as usize, MAX_PARENTS);
        for (p, c, kind) in ops {
            let _ = match kind {
                0 => dag.add_edge(VarId(p), VarId(c)),
                _ => dag.remove_edge(VarId(p), VarId(c)),
            };
        }
        prop_assert_eq!(dag.edges().len(), dag.edge_count());
    }

    /// Cache keys canonicalize the parent set: any discovery order of the
    /// same parents maps to the same key.
    #[test]
    fn score_key_is_order_insensitive(
        mut parents in proptest::collection::vec(0u32..32, 0..5),
        child in 32u32..40
    ) {
        parents.sort_unstable();
        parents.dedup();
        let forward: Vec<VarId> = parents.iter().map(|&v| VarId(v)).collect();
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = ScoreKey::new(VarId(child), &forward);
        let b = ScoreKey::new(VarId(child), &reversed);
        prop_assert_eq!(a, b);
    }
}
