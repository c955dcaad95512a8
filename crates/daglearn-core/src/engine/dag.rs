//! Mutable DAG state with cycle-safe edge mutation.
//!
//! ## Design
//!
//! Variables live in an arena addressed by `VarId` index; adjacency is a
//! pair of mirrored index sets (parents per child, children per parent),
//! both kept sorted for deterministic iteration. There are no back-pointers
//! that could silently form cycles: every `add_edge` / `reverse_edge` runs
//! an explicit reachability check from the proposed child back to the
//! proposed parent before committing, and every mutation either commits
//! whole or leaves the graph exactly as it was.

use smallvec::SmallVec;

use crate::engine::dataset::VarId;
use crate::engine::errors::LearnError;

/// Sorted parent set of one variable. Small by construction: the in-degree
/// cap keeps these tiny.
pub type ParentVec = SmallVec<[VarId; 4]>;

type ChildVec = SmallVec<[VarId; 8]>;

/// A directed acyclic graph over a fixed set of variables.
///
/// Mutated exclusively by the search controller; read by the scorer and the
/// serializer. Acyclic at all times callers observe it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagState {
    parents: Vec<ParentVec>,
    children: Vec<ChildVec>,
    max_parents: usize,
    edge_count: usize,
}

impl DagState {
    /// Creates an empty graph over `num_vars` variables with the given
    /// in-degree cap.
    pub fn new(num_vars: usize, max_parents: usize) -> Self {
        DagState {
            parents: vec![ParentVec::new(); num_vars],
            children: vec![ChildVec::new(); num_vars],
            max_parents,
            edge_count: 0,
        }
    }

    /// Number of variables in the arena.
    pub fn num_vars(&self) -> usize {
        self.parents.len()
    }

    /// Number of directed edges currently present.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// The configured maximum in-degree.
    pub fn max_parents(&self) -> usize {
        self.max_parents
    }

    /// Current parent set of a variable, sorted.
    pub fn parents(&self, v: VarId) -> &[VarId] {
        &self.parents[v.index()]
    }

    /// Current children of a variable, sorted.
    pub fn children(&self, v: VarId) -> &[VarId] {
        &self.children[v.index()]
    }

    /// Current in-degree of a variable.
    pub fn in_degree(&self, v: VarId) -> usize {
        self.parents[v.index()].len()
    }

    /// Whether the edge `parent -> child` is present.
    pub fn has_edge(&self, parent: VarId, child: VarId) -> bool {
        self.parents[child.index()].binary_search(&parent).is_ok()
    }

    fn check_var(&self, v: VarId) -> Result<(), LearnError> {
        if v.index() >= self.parents.len() {
            return Err(LearnError::Internal(format!(
                "variable {:?} outside arena of {} variables",
                v,
                self.parents.len()
            )));
        }
        Ok(())
    }

    /// Whether `to` is reachable from `from` along directed edges.
    ///
    /// Iterative DFS over the children index sets; used as the pre-commit
    /// cycle check (adding `p -> c` closes a cycle iff `p` is reachable
    /// from `c`).
    pub fn is_reachable(&self, from: VarId, to: VarId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = vec![false; self.parents.len()];
        let mut stack: SmallVec<[VarId; 16]> = SmallVec::new();
        visited[from.index()] = true;
        stack.push(from);
        while let Some(v) = stack.pop() {
            for &c in self.children(v) {
                if c == to {
                    return true;
                }
                if !visited[c.index()] {
                    visited[c.index()] = true;
                    stack.push(c);
                }
            }
        }
        false
    }

    /// Whether adding `parent -> child` would close a directed cycle.
    pub fn would_create_cycle(&self, parent: VarId, child: VarId) -> bool {
        parent == child || self.is_reachable(child, parent)
    }

    /// Whether reversing `parent -> child` would close a directed cycle.
    ///
    /// True iff some path from `parent` to `child` other than the direct
    /// edge exists; that path plus the reversed edge would form a cycle.
    pub fn reversal_creates_cycle(&self, parent: VarId, child: VarId) -> bool {
        let mut visited = vec![false; self.parents.len()];
        let mut stack: SmallVec<[VarId; 16]> = SmallVec::new();
        visited[parent.index()] = true;
        // Seed with every child of `parent` except the edge under reversal.
        for &c in self.children(parent) {
            if c != child && !visited[c.index()] {
                visited[c.index()] = true;
                stack.push(c);
            }
        }
        while let Some(v) = stack.pop() {
            for &c in self.children(v) {
                if c == child {
                    return true;
                }
                if !visited[c.index()] {
                    visited[c.index()] = true;
                    stack.push(c);
                }
            }
        }
        false
    }

    fn insert_sorted<A: smallvec::Array<Item = VarId>>(set: &mut SmallVec<A>, v: VarId) {
        if let Err(pos) = set.binary_search(&v) {
            set.insert(pos, v);
        }
    }

    fn remove_sorted<A: smallvec::Array<Item = VarId>>(set: &mut SmallVec<A>, v: VarId) -> bool {
        match set.binary_search(&v) {
            Ok(pos) => {
                set.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Adds the edge `parent -> child`.
    ///
    /// Rejected (graph unchanged) when the edge would close a cycle, when
    /// the child already carries the maximum in-degree, or when the edge is
    /// already present.
    pub fn add_edge(&mut self, parent: VarId, child: VarId) -> Result<(), LearnError> {
        self.check_var(parent)?;
        self.check_var(child)?;
        if self.has_edge(parent, child) {
            return Err(LearnError::Domain(format!(
                "edge {:?} -> {:?} already present",
                parent, child
            )));
        }
        if self.in_degree(child) >= self.max_parents {
            return Err(LearnError::DegreeLimit(format!(
                "variable {:?} already has {} parents (maximum {})",
                child,
                self.in_degree(child),
                self.max_parents
            )));
        }
        if self.would_create_cycle(parent, child) {
            return Err(LearnError::Cycle(format!(
                "edge {:?} -> {:?} would close a directed cycle",
                parent, child
            )));
        }
        Self::insert_sorted(&mut self.parents[child.index()], parent);
        Self::insert_sorted(&mut self.children[parent.index()], child);
        self.edge_count += 1;
        Ok(())
    }

    /// Removes the edge `parent -> child`. Removal can never create a cycle.
    pub fn remove_edge(&mut self, parent: VarId, child: VarId) -> Result<(), LearnError> {
        self.check_var(parent)?;
        self.check_var(child)?;
        if !Self::remove_sorted(&mut self.parents[child.index()], parent) {
            return Err(LearnError::Domain(format!(
                "edge {:?} -> {:?} not present",
                parent, child
            )));
        }
        Self::remove_sorted(&mut self.children[parent.index()], child);
        self.edge_count -= 1;
        Ok(())
    }

    /// Reverses the edge `parent -> child` into `child -> parent`.
    ///
    /// All checks run before anything is touched, so a rejection leaves the
    /// graph exactly as it was.
    pub fn reverse_edge(&mut self, parent: VarId, child: VarId) -> Result<(), LearnError> {
        self.check_var(parent)?;
        self.check_var(child)?;
        if !self.has_edge(parent, child) {
            return Err(LearnError::Domain(format!(
                "edge {:?} -> {:?} not present",
                parent, child
            )));
        }
        if self.in_degree(parent) >= self.max_parents {
            return Err(LearnError::DegreeLimit(format!(
                "variable {:?} already has {} parents (maximum {})",
                parent,
                self.in_degree(parent),
                self.max_parents
            )));
        }
        if self.reversal_creates_cycle(parent, child) {
            return Err(LearnError::Cycle(format!(
                "reversing {:?} -> {:?} would close a directed cycle",
                parent, child
            )));
        }
        Self::remove_sorted(&mut self.parents[child.index()], parent);
        Self::remove_sorted(&mut self.children[parent.index()], child);
        Self::insert_sorted(&mut self.parents[parent.index()], child);
        Self::insert_sorted(&mut self.children[child.index()], parent);
        Ok(())
    }

    /// All edges as `(parent, child)` pairs: parents in variable order,
    /// children sorted within each parent. Deterministic.
    pub fn edges(&self) -> Vec<(VarId, VarId)> {
        let mut out = Vec::with_capacity(self.edge_count);
        for (p, children) in self.children.iter().enumerate() {
            for &c in children {
                out.push((VarId(p as u32), c));
            }
        }
        out
    }

    /// A topological ordering of the variables, or `None` if a cycle exists.
    ///
    /// Kahn's algorithm with smallest-index-first tie-breaking, so the
    /// ordering is deterministic. A `None` here means the acyclicity
    /// invariant was broken, which no public mutation permits.
    pub fn topological_order(&self) -> Option<Vec<VarId>> {
        let n = self.parents.len();
        let mut remaining: Vec<usize> = self.parents.iter().map(|p| p.len()).collect();
        let mut ready: Vec<VarId> = (0..n)
            .filter(|&v| remaining[v] == 0)
            .map(|v| VarId(v as u32))
            .collect();
        // Max-heap behavior on a sorted vec popped from the back gives
        // smallest-first; keep it sorted descending.
        ready.sort_unstable_by(|a, b| b.cmp(a));

        let mut order = Vec::with_capacity(n);
        while let Some(v) = ready.pop() {
            order.push(v);
            for &c in self.children(v) {
                remaining[c.index()] -= 1;
                if remaining[c.index()] == 0 {
                    let pos = ready.binary_search_by(|x| c.cmp(x)).unwrap_or_else(|p| p);
                    ready.insert(pos, c);
                }
            }
        }
        (order.len() == n).then_some(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: u32) -> VarId {
        VarId(i)
    }

    #[test]
    fn add_and_remove_maintain_mirrored_indexes() {
        let mut dag = DagState::new(3, 2);
        dag.add_edge(v(0), v(2)).expect("add");
        dag.add_edge(v(1), v(2)).expect("add");
        assert_eq!(dag.parents(v(2)), &[v(0), v(1)]);
        assert_eq!(dag.children(v(0)), &[v(2)]);
        assert_eq!(dag.edge_count(), 2);

        dag.remove_edge(v(0), v(2)).expect("remove");
        assert_eq!(dag.parents(v(2)), &[v(1)]);
        assert!(dag.children(v(0)).is_empty());
        assert_eq!(dag.edge_count(), 1);
    }

    #[test]
    fn cycle_is_rejected_and_graph_unchanged() {
        let mut dag = DagState::new(3, 3);
        dag.add_edge(v(0), v(1)).expect("add");
        dag.add_edge(v(1), v(2)).expect("add");

        let before = dag.clone();
        let err = dag.add_edge(v(2), v(0)).expect_err("must reject");
        assert!(matches!(err, LearnError::Cycle(_)));
        assert_eq!(dag, before);

        let err = dag.add_edge(v(0), v(0)).expect_err("self loop");
        assert!(matches!(err, LearnError::Cycle(_)));
        assert_eq!(dag, before);
    }

    #[test]
    fn degree_limit_is_enforced() {
        let mut dag = DagState::new(4, 2);
        dag.add_edge(v(0), v(3)).expect("add");
        dag.add_edge(v(1), v(3)).expect("add");
        let err = dag.add_edge(v(2), v(3)).expect_err("must reject");
        assert!(matches!(err, LearnError::DegreeLimit(_)));
        assert_eq!(dag.in_degree(v(3)), 2);
    }

    #[test]
    fn reversal_checks_alternate_paths() {
        // 0 -> 1 -> 2 and 0 -> 2: reversing 0 -> 2 is fine, reversing
        // 0 -> 1 is fine, but with the diamond closed a second path blocks.
        let mut dag = DagState::new(3, 3);
        dag.add_edge(v(0), v(1)).expect("add");
        dag.add_edge(v(1), v(2)).expect("add");
        dag.add_edge(v(0), v(2)).expect("add");

        // Path 0 -> 1 -> 2 exists besides the direct edge, so reversing
        // 0 -> 2 into 2 -> 0 would close 0 -> 1 -> 2 -> 0.
        let before = dag.clone();
        let err = dag.reverse_edge(v(0), v(2)).expect_err("must reject");
        assert!(matches!(err, LearnError::Cycle(_)));
        assert_eq!(dag, before);

        // Reversing the leaf edge is legal.
        dag.reverse_edge(v(1), v(2)).expect("reverse");
        assert!(dag.has_edge(v(2), v(1)));
        assert!(!dag.has_edge(v(1), v(2)));
        assert!(dag.topological_order().is_some());
    }

    #[test]
    fn reversal_respects_new_parent_degree() {
        let mut dag = DagState::new(4, 1);
        dag.add_edge(v(0), v(1)).expect("add");
        dag.add_edge(v(2), v(3)).expect("add");
        // Reversing 2 -> 3 would give 2 a parent; 2 has none, fine.
        dag.reverse_edge(v(2), v(3)).expect("reverse");
        // Reversing 0 -> 1 would give 0 a second... 0 has no parents; fine.
        dag.reverse_edge(v(0), v(1)).expect("reverse");
        // Now 1 -> 0 and 3 -> 2. Reversing 3 -> 2 gives 3 a parent; 3 has
        // none, so the degree cap of 1 still admits it.
        dag.reverse_edge(v(3), v(2)).expect("reverse");
    }

    #[test]
    fn topological_order_is_deterministic_smallest_first() {
        let mut dag = DagState::new(4, 3);
        dag.add_edge(v(3), v(0)).expect("add");
        dag.add_edge(v(3), v(1)).expect("add");
        let order = dag.topological_order().expect("acyclic");
        assert_eq!(order, vec![v(2), v(3), v(0), v(1)]);
    }

    #[test]
    fn edges_enumerate_in_parent_then_child_order() {
        let mut dag = DagState::new(3, 3);
        dag.add_edge(v(1), v(0)).expect("add");
        dag.add_edge(v(0), v(2)).expect("add");
        dag.add_edge(v(1), v(2)).expect("add");
        assert_eq!(
            dag.edges(),
            vec![(v(0), v(2)), (v(1), v(0)), (v(1), v(2))]
        );
    }
}
