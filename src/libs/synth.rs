use crate::libs::config::Config;
use crate::libs::fragment::{Fragment, FragmentKind};
use crate::libs::junction::{distance, synth_count};
use crate::libs::node::Node;
use crate::libs::seq::circular_slice;

/// Synthetic fragments that bridge the gap from `a` to `b`.
///
/// Each piece carries `min_homology` bp on both sides, so the first overlaps `a`, the last
/// overlaps `b`, and neighbours overlap each other by exactly `min_homology`. Pieces are cut
/// from the circular `target`. Empty when PCR can close the junction.
pub fn synthesize(a: &Node, b: &Node, target: &str, config: &Config) -> Vec<Fragment> {
    let count = synth_count(a, b, config.synthesis.max_length);
    if count == 0 {
        return vec![];
    }

    let homology = config.fragments.min_homology as isize;
    let gap = distance(a, b) as usize;
    let core = config.synthesis.min_length.max(gap.div_ceil(count)) as isize;
    let piece_len = core + 2 * homology;

    (0..count)
        .map(|k| {
            let start = a.end as isize - homology + k as isize * (core + homology);
            let seq = circular_slice(target, start, start + piece_len);

            Fragment {
                id: format!("{}-synthetic-{}", a.id, k + 1),
                cost: config.synth_cost(seq.len()) + a.cost,
                seq,
                source_id: String::new(),
                kind: FragmentKind::Synthetic,
                primers: None,
            }
        })
        .collect()
}
