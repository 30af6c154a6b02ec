//! Lower bound on the pieces an assembly through each node needs.
//!
//! An assembly opened by a first node `s` has to reach the copy of `s` one lap later. For
//! every node the table holds the fewest pieces (real plus synthetic) of any such lap that
//! passes through it. Nodes whose bound exceeds the fragment budget cannot be part of an
//! assembly and are dropped before the search runs.

use crate::libs::junction::synth_count;
use crate::libs::node::Node;

const UNREACHABLE: usize = usize::MAX;

/// Per-node minimum piece count, indexed like the start-sorted node arena.
///
/// Filled once per first node with a forward and a backward pass over its lap, then
/// read-only, so it can be shared across search workers.
#[derive(Debug, Clone)]
pub struct CompletionTable {
    pieces: Vec<usize>,
}

impl CompletionTable {
    /// `nodes` must be sorted by start.
    pub fn new(nodes: &[Node], target_len: usize, max_synth: usize) -> Self {
        debug_assert!(nodes.windows(2).all(|w| w[0].start <= w[1].start));

        let mut pieces = vec![UNREACHABLE; nodes.len()];

        for first in 0..nodes.len() {
            if nodes[first].start >= target_len {
                break;
            }

            let close_at = nodes[first].start + target_len;
            let Some(close) = ((first + 1)..nodes.len()).find(|&j| {
                nodes[j].start == close_at && nodes[j].unique_id == nodes[first].unique_id
            }) else {
                continue;
            };
            let lap = &nodes[first..=close];
            let last = lap.len() - 1;

            // pieces from the first node up to and including each node
            let mut head = vec![UNREACHABLE; lap.len()];
            head[0] = 1;
            for j in 1..last {
                for i in 0..j {
                    if head[i] != UNREACHABLE {
                        head[j] = head[j].min(head[i] + synth_count(&lap[i], &lap[j], max_synth) + 1);
                    }
                }
            }

            // pieces after each node until the lap closes; the closing copy adds none
            let mut tail = vec![UNREACHABLE; lap.len()];
            tail[last] = 0;
            for i in (0..last).rev() {
                for j in (i + 1)..=last {
                    if tail[j] != UNREACHABLE {
                        let node = usize::from(j != last);
                        tail[i] = tail[i].min(synth_count(&lap[i], &lap[j], max_synth) + node + tail[j]);
                    }
                }
            }

            for k in 0..last {
                if head[k] != UNREACHABLE && tail[k] != UNREACHABLE {
                    pieces[first + k] = pieces[first + k].min(head[k] + tail[k]);
                }
            }
            // the copy closes every lap opened by the first node
            if tail[0] != UNREACHABLE {
                pieces[close] = pieces[close].min(head[0] + tail[0]);
            }
        }

        CompletionTable { pieces }
    }

    /// `None` when no lap passes through the node.
    pub fn get(&self, idx: usize) -> Option<usize> {
        match self.pieces[idx] {
            UNREACHABLE => None,
            n => Some(n),
        }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

/// Sorts nodes by start, longer first on ties.
pub fn sort_nodes(nodes: &mut [Node]) {
    nodes.sort_by(|a, b| a.start.cmp(&b.start).then(b.len().cmp(&a.len())));
}

/// Keeps the nodes that lie on some lap of at most `max_count` pieces.
pub fn prune(nodes: Vec<Node>, table: &CompletionTable, max_count: usize) -> Vec<Node> {
    nodes
        .into_iter()
        .enumerate()
        .filter(|(i, _)| table.get(*i).is_some_and(|pieces| pieces <= max_count))
        .map(|(_, node)| node)
        .collect()
}
