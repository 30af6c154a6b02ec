//! Path construction over the node arena.
//!
//! An assembly grows one node at a time along the tripled target, from a first node that
//! starts before `target_len`, until it reaches the copy of its first node one full turn
//! later. Each step yields a new assembly, so branches share their prefix without aliasing.

use itertools::Itertools;
use rayon::prelude::*;
use std::cmp::Ordering;

use crate::libs::config::Config;
use crate::libs::junction::{distance, junction_cost, synth_count};
use crate::libs::node::Node;

/// Non-overlapping candidates a single step may still bridge by synthesis, at least.
pub const SYNTH_REACH_MIN: usize = 5;

/// A partial or complete assembly, as indexes into the node arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    /// Nodes in build order; the first one is also the closing node.
    pub nodes: Vec<usize>,
    /// Sum of the junction costs so far.
    pub cost: f64,
    /// Synthetic pieces needed across all junctions so far.
    pub synths: usize,
    /// The path has come back around to its first node.
    pub complete: bool,
}

impl Assembly {
    pub fn new(first: usize) -> Self {
        Assembly {
            nodes: vec![first],
            cost: 0.0,
            synths: 0,
            complete: false,
        }
    }

    /// Real plus synthetic pieces.
    pub fn len(&self) -> usize {
        self.nodes.len() + self.synths
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> usize {
        self.nodes[0]
    }

    /// The most recently added node.
    pub fn head(&self) -> usize {
        self.nodes[self.nodes.len() - 1]
    }

    /// Whether a node with the same unique id is already placed.
    pub fn contains(&self, arena: &[Node], node: &Node) -> bool {
        self.nodes
            .iter()
            .any(|&idx| arena[idx].unique_id == node.unique_id)
    }

    /// Joins `idx` after the head.
    ///
    /// Returns `None` when the node is already placed or the fragment budget would be
    /// exceeded. Joining the copy of the first node closes the assembly; that junction is
    /// charged like any other but adds no node.
    pub fn add(&self, idx: usize, arena: &[Node], config: &Config) -> Option<Assembly> {
        let head = &arena[self.head()];
        let node = &arena[idx];
        let max_count = config.fragments.max_count;

        let synths = synth_count(head, node, config.synthesis.max_length);
        let cost = self.cost + junction_cost(head, node, config);

        if node.unique_id == arena[self.first()].unique_id {
            if self.len() + synths > max_count {
                return None;
            }
            return Some(Assembly {
                nodes: self.nodes.clone(),
                cost,
                synths: self.synths + synths,
                complete: true,
            });
        }

        if self.contains(arena, node) || self.len() + synths + 1 > max_count {
            return None;
        }

        let mut nodes = Vec::with_capacity(self.nodes.len() + 1);
        nodes.extend_from_slice(&self.nodes);
        nodes.push(idx);

        Some(Assembly {
            nodes,
            cost,
            synths: self.synths + synths,
            complete: false,
        })
    }

    /// Bases of the target covered from the first node to the end of the head.
    pub fn span(&self, arena: &[Node]) -> usize {
        arena[self.head()].end.saturating_sub(arena[self.first()].start)
    }

    /// Same key for every rotation of one circular plan.
    pub fn rotation_key(&self, arena: &[Node]) -> Vec<String> {
        self.nodes
            .iter()
            .map(|&idx| arena[idx].unique_id.clone())
            .sorted()
            .collect()
    }
}

/// Indexes of the nodes `head` can be joined to, in start order.
///
/// Nodes overlapping the head by `min_homology` are always reachable. Past them, up to
/// `synth_budget` nodes are reachable through synthesis. The scan stops at the first node
/// that is neither, or that starts beyond `limit`.
pub fn reach(arena: &[Node], head: usize, limit: usize, min_homology: usize, synth_budget: usize) -> Vec<usize> {
    let mut reachable = vec![];
    let mut budget = synth_budget;

    for idx in (head + 1)..arena.len() {
        let node = &arena[idx];
        if node.start > limit {
            break;
        }

        if distance(&arena[head], node) <= -(min_homology as isize) {
            reachable.push(idx);
        } else if budget > 0 {
            budget -= 1;
            reachable.push(idx);
        } else {
            break;
        }
    }

    reachable
}

/// Result of a search.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub complete: Vec<Assembly>,
    /// Partial assembly that got furthest around the target, for diagnostics.
    pub closest: Option<Assembly>,
}

/// Finds every complete assembly within `config.fragments.max_count` pieces.
///
/// `arena` must be sorted by start and already pruned. Each first node is explored on its
/// own rayon task; nothing is shared between them but the read-only arena.
pub fn search(arena: &[Node], target_len: usize, config: &Config) -> SearchOutcome {
    let synth_budget = SYNTH_REACH_MIN.max(arena.len() / 20);

    let outcomes: Vec<SearchOutcome> = (0..arena.len())
        .into_par_iter()
        .filter(|&idx| arena[idx].start < target_len)
        .map(|idx| explore(arena, idx, target_len, synth_budget, config))
        .collect();

    let mut merged = SearchOutcome::default();
    for outcome in outcomes {
        merged.complete.extend(outcome.complete);
        if let Some(partial) = outcome.closest {
            merged.closest = closer(arena, merged.closest.take(), partial);
        }
    }

    tracing::debug!(
        nodes = arena.len(),
        complete = merged.complete.len(),
        "assembly search finished"
    );

    merged
}

/// Depth-first walk of every assembly opened by `first`.
fn explore(arena: &[Node], first: usize, target_len: usize, synth_budget: usize, config: &Config) -> SearchOutcome {
    let limit = arena[first].start + target_len;
    let min_homology = config.fragments.min_homology;

    let mut outcome = SearchOutcome::default();
    let mut stack = vec![Assembly::new(first)];

    while let Some(assembly) = stack.pop() {
        for idx in reach(arena, assembly.head(), limit, min_homology, synth_budget) {
            if let Some(next) = assembly.add(idx, arena, config) {
                if next.complete {
                    outcome.complete.push(next);
                } else {
                    stack.push(next);
                }
            }
        }

        outcome.closest = closer(arena, outcome.closest.take(), assembly);
    }

    outcome
}

fn closer(arena: &[Node], current: Option<Assembly>, other: Assembly) -> Option<Assembly> {
    match current {
        None => Some(other),
        Some(current) => {
            let ord = other
                .span(arena)
                .cmp(&current.span(arena))
                .then(current.cost.total_cmp(&other.cost));
            if ord == Ordering::Greater {
                Some(other)
            } else {
                Some(current)
            }
        }
    }
}

fn by_cost(a: &Assembly, b: &Assembly) -> Ordering {
    a.cost.total_cmp(&b.cost).then(a.len().cmp(&b.len()))
}

/// The cheapest assembly, fewer pieces on ties.
pub fn best(assemblies: &[Assembly]) -> Option<&Assembly> {
    assemblies.iter().min_by(|a, b| by_cost(a, b))
}

/// Assemblies from cheapest to dearest, one per circular plan.
pub fn rank(assemblies: &[Assembly], arena: &[Node]) -> Vec<Assembly> {
    assemblies
        .iter()
        .sorted_by(|a, b| by_cost(a, b))
        .unique_by(|a| a.rotation_key(arena))
        .cloned()
        .collect()
}
