//! Cost of joining two neighbouring nodes.
//!
//! A junction is closed either by PCR, with primers adding homology arms, or by
//! synthesizing the sequence between the nodes.

use crate::libs::config::Config;
use crate::libs::node::Node;

/// Largest gap (bp) primer tails can still close.
pub const PCR_MAX_GAP: isize = 5;

/// Two primers of about 20 bp each.
pub const PRIMER_PAIR_BP: usize = 40;

/// Bases from the end of `a` to the start of `b`; negative when they overlap.
///
/// `a` must precede `b` along the build direction.
pub fn distance(a: &Node, b: &Node) -> isize {
    b.start as isize - a.end as isize
}

/// Number of synthetic pieces needed between `a` and `b` with nothing in between.
pub fn synth_count(a: &Node, b: &Node, max_synth: usize) -> usize {
    let dist = distance(a, b);
    if dist <= PCR_MAX_GAP {
        return 0;
    }

    (dist.max(1) as usize).div_ceil(max_synth)
}

/// Monetary cost of getting from `a` to `b`, charged with `b`'s acquisition cost.
///
/// PCR is used whenever the gap allows it; it is far cheaper than synthesis.
pub fn junction_cost(a: &Node, b: &Node, config: &Config) -> f64 {
    let dist = distance(a, b);
    let min_homology = config.fragments.min_homology;
    let bp_cost = config.pcr.bp_cost;

    if dist <= PCR_MAX_GAP {
        if dist < -(min_homology as isize) {
            // enough existing overlap, plain primers
            return PRIMER_PAIR_BP as f64 * bp_cost + b.cost;
        }

        // primers carry the missing homology
        return (PRIMER_PAIR_BP + min_homology) as f64 * bp_cost + b.cost;
    }

    // the gap plus homology on the synthetic piece
    let synth_len = min_homology + dist as usize;
    config.synth_cost(synth_len) + b.cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::matches::Match;
    use approx::assert_relative_eq;

    fn node(start: usize, end: usize, cost: f64) -> Node {
        Node::new(&Match::new("src", "", start, end), 10_000, |_| cost)
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(&node(0, 100, 0.0), &node(150, 300, 0.0)), 50);
        assert_eq!(distance(&node(0, 100, 0.0), &node(80, 300, 0.0)), -20);
    }

    #[test]
    fn test_synth_count_threshold() {
        let a = node(0, 100, 0.0);
        for gap in [-50, -1, 0, 1, 5] {
            let b = node((100 + gap) as usize, 400, 0.0);
            assert_eq!(synth_count(&a, &b, 500), 0, "gap {}", gap);
        }

        assert_eq!(synth_count(&a, &node(106, 400, 0.0), 500), 1);
        assert_eq!(synth_count(&a, &node(600, 900, 0.0), 500), 1);
        assert_eq!(synth_count(&a, &node(601, 900, 0.0), 500), 2);
        // exact multiples
        assert_eq!(synth_count(&a, &node(1600, 1900, 0.0), 500), 3);
    }

    #[test]
    fn test_junction_cost_pcr() {
        let config = Config::default();
        let a = node(0, 100, 0.0);

        // ample overlap: two plain primers, plus the incoming node's cost
        let cost = junction_cost(&a, &node(50, 400, 65.0), &config);
        assert_relative_eq!(cost, 40.0 * 0.6 + 65.0);

        // small overlap or small gap: homology on the primers
        let cost = junction_cost(&a, &node(90, 400, 0.0), &config);
        assert_relative_eq!(cost, 60.0 * 0.6);
        let cost = junction_cost(&a, &node(102, 400, 0.0), &config);
        assert_relative_eq!(cost, 60.0 * 0.6);
    }

    #[test]
    fn test_junction_cost_synthesis() {
        let config = Config::default();
        let a = node(0, 100, 0.0);

        // 400 bp gap + 20 bp homology sits in the first tier
        let cost = junction_cost(&a, &node(500, 900, 0.0), &config);
        assert_relative_eq!(cost, 89.0);

        let cost = junction_cost(&a, &node(1000, 1400, 65.0), &config);
        assert_relative_eq!(cost, 149.0 + 65.0);
    }
}
