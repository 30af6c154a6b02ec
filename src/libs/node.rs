use crate::libs::matches::Match;

/// A candidate building piece derived from one match.
///
/// Nodes live in one arena (`Vec<Node>`) for the whole search and are addressed by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Source entry in the database, also used to scope off-target scans.
    pub id: String,
    pub seq: String,
    /// `start % target_len` followed by the source id.
    ///
    /// The same physical match seen on each copy of the tripled target shares this id, while
    /// distinct entries starting at the same offset keep distinct ones.
    pub unique_id: String,
    /// Start on the tripled target.
    pub start: usize,
    /// End on the tripled target, exclusive.
    pub end: usize,
    /// Price of obtaining the source, zero when it is on hand.
    pub cost: f64,
}

impl Node {
    pub fn new<F>(m: &Match, target_len: usize, cost_lookup: F) -> Self
    where
        F: Fn(&str) -> f64,
    {
        Node {
            id: m.source_id.clone(),
            seq: m.sequence.to_uppercase(),
            unique_id: format!("{}{}", m.start % target_len, m.source_id),
            start: m.start,
            end: m.end,
            cost: cost_lookup(&m.source_id),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maps matches to nodes one for one, keeping their order.
pub fn build<F>(matches: &[Match], target_len: usize, cost_lookup: F) -> Vec<Node>
where
    F: Fn(&str) -> f64,
{
    matches
        .iter()
        .map(|m| Node::new(m, target_len, &cost_lookup))
        .collect()
}
