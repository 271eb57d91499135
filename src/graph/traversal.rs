//! Depth-first traversals over the index adjacency lists.
//!
//! All traversals use an explicit work stack of `(node, next_successor)`
//! frames instead of recursion, so deep or cyclic import graphs cannot
//! exhaust the call stack.

use super::types::NodeIndex;

/// Find simple cycles with a visited set and an on-stack position table.
///
/// Each back edge closes exactly one cycle: the stack slice from the
/// re-encountered node to the current node. Fully explored nodes are never
/// re-entered, so the search terminates on any graph.
pub fn find_cycles(adjacency: &[Vec<NodeIndex>]) -> Vec<Vec<NodeIndex>> {
    let n = adjacency.len();
    let mut visited = vec![false; n];
    let mut stack_pos: Vec<Option<usize>> = vec![None; n];
    let mut cycles = Vec::new();

    for start in 0..n {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        stack_pos[start] = Some(0);
        let mut work: Vec<(NodeIndex, usize)> = vec![(start, 0)];

        while let Some(top) = work.last_mut() {
            let node = top.0;
            let succ = adjacency[node].get(top.1).copied();
            top.1 += 1;

            match succ {
                Some(next) => {
                    if let Some(pos) = stack_pos[next] {
                        cycles.push(work[pos..].iter().map(|(idx, _)| *idx).collect());
                    } else if !visited[next] {
                        visited[next] = true;
                        stack_pos[next] = Some(work.len());
                        work.push((next, 0));
                    }
                }
                None => {
                    work.pop();
                    stack_pos[node] = None;
                }
            }
        }
    }

    cycles
}

/// Output of [`enumerate_paths`].
#[derive(Debug, Default)]
pub struct PathSearch {
    /// Every simple path (at least one edge) ending at a target.
    pub paths: Vec<Vec<NodeIndex>>,
    /// Longest simple chain seen, in edges. A lower bound when `truncated`.
    pub max_depth: usize,
    /// The expansion budget ran out before the search finished.
    pub truncated: bool,
}

/// Enumerate all simple paths from each start whose last node satisfies `is_target`.
///
/// A node may appear at most once within one path but may appear in many
/// paths. Paths continue past targets, so a path through two targets yields
/// one result per distinct terminating node. Path length is unbounded; only
/// `max_expansions` node expansions across all starts may stop the search,
/// and stopping sets `truncated`.
pub fn enumerate_paths(
    adjacency: &[Vec<NodeIndex>],
    starts: &[NodeIndex],
    is_target: impl Fn(NodeIndex) -> bool,
    max_expansions: usize,
) -> PathSearch {
    let mut search = PathSearch::default();
    let mut on_path = vec![false; adjacency.len()];
    let mut expansions = 0usize;

    'starts: for &start in starts {
        on_path[start] = true;
        let mut work: Vec<(NodeIndex, usize)> = vec![(start, 0)];

        while let Some(top) = work.last_mut() {
            let node = top.0;
            let succ = adjacency[node].get(top.1).copied();
            top.1 += 1;

            match succ {
                Some(next) if !on_path[next] => {
                    expansions += 1;
                    if expansions > max_expansions {
                        search.truncated = true;
                        for (idx, _) in work.drain(..) {
                            on_path[idx] = false;
                        }
                        break 'starts;
                    }
                    on_path[next] = true;
                    work.push((next, 0));
                    search.max_depth = search.max_depth.max(work.len() - 1);
                    if is_target(next) {
                        search.paths.push(work.iter().map(|(idx, _)| *idx).collect());
                    }
                }
                Some(_) => {}
                None => {
                    work.pop();
                    on_path[node] = false;
                }
            }
        }
    }

    search
}
