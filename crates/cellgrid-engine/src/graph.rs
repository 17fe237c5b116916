//! Dependency bookkeeping over the sheet's cell map.
//!
//! Edges live in the cells themselves as position sets; the functions here
//! are the traversals: cycle search before a write commits and cache
//! invalidation after edges are rewired.

use core::fmt;
use std::collections::{HashMap, HashSet, VecDeque};

use cellgrid_model::CellRef;

use crate::cell::Cell;

/// A write was rejected because it would close a dependency cycle.
///
/// `path` is the data-flow chain the write would have closed, from the
/// written cell through its dependents back to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub path: Vec<CellRef>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circular reference: ")?;
        for (idx, cell) in self.path.iter().enumerate() {
            if idx > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{cell}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CycleError {}

/// Counts useful for asserting the graph representation in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    /// Occupied positions, including materialized empty cells.
    pub cells: usize,
    pub formula_cells: usize,
    /// Dependency edges (each counted once, on the successor side).
    pub edges: usize,
}

/// Would writing a formula referencing `references` into `origin` close a
/// cycle?
///
/// BFS from `origin` along **successor** edges: reaching any referenced cell
/// means that cell (transitively) depends on `origin`, so the new edge back
/// into `origin` would complete a loop. The search runs on the pre-commit
/// graph, which is acyclic, so it terminates in O(V + E) of the reachable
/// sub-graph. Returns the closed data-flow path for the error message.
pub(crate) fn find_cycle(
    cells: &HashMap<CellRef, Cell>,
    origin: CellRef,
    references: &[CellRef],
) -> Option<Vec<CellRef>> {
    if references.is_empty() {
        return None;
    }

    let targets: HashSet<CellRef> = references.iter().copied().collect();
    let mut seen: HashSet<CellRef> = HashSet::new();
    let mut parent: HashMap<CellRef, CellRef> = HashMap::new();
    let mut queue: VecDeque<CellRef> = VecDeque::new();

    seen.insert(origin);
    queue.push_back(origin);

    while let Some(cur) = queue.pop_front() {
        if targets.contains(&cur) {
            let mut path = Vec::new();
            let mut node = cur;
            path.push(node);
            while let Some(&prev) = parent.get(&node) {
                path.push(prev);
                node = prev;
            }
            path.reverse();
            // Close the loop with the edge the write would have added.
            path.push(origin);
            return Some(path);
        }

        let Some(cell) = cells.get(&cur) else {
            continue;
        };
        for &succ in &cell.successors {
            if seen.insert(succ) {
                parent.insert(succ, cur);
                queue.push_back(succ);
            }
        }
    }

    None
}

/// Clear the memoized value of `origin` and of every cell downstream of it.
///
/// Forward BFS over successor edges, pruning below any cell that had no
/// memo: a clean cell's dependents are transitively clean, so there is
/// nothing further to clear on that branch. Must run after edge rewiring so
/// freshly attached dependents are covered.
pub(crate) fn invalidate_from(cells: &HashMap<CellRef, Cell>, origin: CellRef) {
    let mut cleared = 0usize;
    let mut queue: VecDeque<CellRef> = VecDeque::new();

    if let Some(cell) = cells.get(&origin) {
        if cell.invalidate() {
            cleared += 1;
        }
        queue.extend(cell.successors.iter().copied());
    }

    while let Some(cur) = queue.pop_front() {
        let Some(cell) = cells.get(&cur) else {
            continue;
        };
        if cell.invalidate() {
            cleared += 1;
            queue.extend(cell.successors.iter().copied());
        }
    }

    if cleared > 0 {
        log::trace!("invalidated {cleared} memoized value(s) downstream of {origin}");
    }
}

pub(crate) fn stats(cells: &HashMap<CellRef, Cell>) -> GraphStats {
    GraphStats {
        cells: cells.len(),
        formula_cells: cells.values().filter(|c| c.is_formula()).count(),
        edges: cells.values().map(|c| c.successors.len()).sum(),
    }
}
