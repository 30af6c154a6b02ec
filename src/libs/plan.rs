//! From matches to an ordered list of fragments.
//!
//! `prepare` runs the pure stages (filter, nodes, completion table, pruning, search).
//! `Planner::plan` then walks the ranked assemblies and turns the first one whose primers
//! check out into fragments.

use rayon::prelude::*;
use std::time::Duration;

use crate::libs::assembly::{rank, search, Assembly, SearchOutcome};
use crate::libs::config::Config;
use crate::libs::error::DefragError;
use crate::libs::estimate::{prune, sort_nodes, CompletionTable};
use crate::libs::external::retry_once;
use crate::libs::fragment::{Fragment, FragmentKind};
use crate::libs::junction::PRIMER_PAIR_BP;
use crate::libs::matches::{filter, Match};
use crate::libs::mismatch::{BlastScanner, MismatchScanner};
use crate::libs::node::{self, Node};
use crate::libs::primer::{Primer3, PrimerDesigner, PrimerJob, PrimerPair};
use crate::libs::seq::circular_slice;
use crate::libs::synth::synthesize;

/// Nodes and search results for one target.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Start-sorted, pruned node arena the assemblies index into.
    pub nodes: Vec<Node>,
    pub outcome: SearchOutcome,
}

impl Prepared {
    /// Distinct complete assemblies, cheapest first.
    pub fn ranked(&self) -> Vec<Assembly> {
        rank(&self.outcome.complete, &self.nodes)
    }

    pub fn infeasible(&self, max_count: usize) -> DefragError {
        DefragError::NoFeasibleAssembly {
            max_count,
            closest_cost: self.outcome.closest.as_ref().map(|a| a.cost),
            closest_count: self.outcome.closest.as_ref().map(|a| a.len()),
        }
    }
}

/// Runs every stage up to and including the search.
pub fn prepare(matches: &[Match], target: &str, config: &Config) -> Result<Prepared, DefragError> {
    let target_len = target.len();
    let min_match = config.fragments.min_match;
    let max_count = config.fragments.max_count;

    let properized = filter(matches, min_match);
    tracing::debug!(matches = matches.len(), kept = properized.len(), "filtered matches");
    if properized.is_empty() || target_len == 0 {
        return Err(DefragError::NoUsableMatches { min_match });
    }

    let mut nodes = node::build(&properized, target_len, |id| config.acquisition_cost(id));
    sort_nodes(&mut nodes);

    let table = CompletionTable::new(&nodes, target_len, config.synthesis.max_length);
    let nodes = prune(nodes, &table, max_count);
    tracing::debug!(nodes = nodes.len(), "pruned nodes");

    let outcome = search(&nodes, target_len, config);
    Ok(Prepared { nodes, outcome })
}

/// Turns search results into fragments, with optional primer design and off-target scans.
pub struct Planner {
    config: Config,
    designer: Option<Box<dyn PrimerDesigner>>,
    scanner: Option<Box<dyn MismatchScanner>>,
    pool: rayon::ThreadPool,
}

impl Planner {
    /// A planner that derives PCR fragments from the template alone.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.tools.parallel)
            .build()?;

        Ok(Planner {
            config,
            designer: None,
            scanner: None,
            pool,
        })
    }

    /// primer3 for primers, plus BLAST when a database is configured.
    pub fn with_tools(config: Config) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.tools.timeout_secs);
        let designer = Primer3 {
            exe: config.tools.primer3.clone(),
            config_dir: config.pcr.primer3_config.clone(),
            timeout,
        };
        let scanner = config.tools.database.as_ref().map(|db| BlastScanner {
            blastn: config.tools.blastn.clone(),
            blastdbcmd: config.tools.blastdbcmd.clone(),
            db: db.clone(),
            min_bp: config.pcr.offtarget_min_bp,
            timeout,
        });

        let mut planner = Planner::new(config)?.designer(Box::new(designer));
        if let Some(scanner) = scanner {
            planner = planner.scanner(Box::new(scanner));
        }
        Ok(planner)
    }

    pub fn designer(mut self, designer: Box<dyn PrimerDesigner>) -> Self {
        self.designer = Some(designer);
        self
    }

    pub fn scanner(mut self, scanner: Box<dyn MismatchScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fragments of the cheapest assembly whose primers pass.
    ///
    /// Primer penalties and off-target hits move on to the next-ranked assembly. Tool
    /// failures end the run.
    pub fn plan(&self, matches: &[Match], target: &str) -> Result<Vec<Fragment>, DefragError> {
        let prepared = prepare(matches, target, &self.config)?;
        let ranked = prepared.ranked();
        tracing::debug!(assemblies = ranked.len(), "ranked assemblies");

        let mut last_err = None;
        for (i, assembly) in ranked.iter().enumerate() {
            match self.fill(assembly, &prepared.nodes, target) {
                Ok(fragments) => {
                    tracing::info!(
                        rank = i + 1,
                        fragments = fragments.len(),
                        synthetic = assembly.synths,
                        cost = assembly.cost,
                        "selected assembly"
                    );
                    return Ok(fragments);
                }
                Err(e @ DefragError::PrimerPenaltyExceeded { .. })
                | Err(e @ DefragError::OffTargetMismatch { .. }) => {
                    tracing::warn!(rank = i + 1, error = %e, "assembly rejected, trying the next one");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| prepared.infeasible(self.config.fragments.max_count)))
    }

    /// Fragments for one assembly, in build order, each followed by the synthetic pieces
    /// bridging it to the next.
    pub fn fill(&self, assembly: &Assembly, arena: &[Node], target: &str) -> Result<Vec<Fragment>, DefragError> {
        let target_len = target.len();
        let ring: Vec<&Node> = assembly.nodes.iter().map(|&idx| &arena[idx]).collect();

        if ring.len() == 1 && assembly.synths == 0 && ring[0].len() >= target_len {
            let node = ring[0];
            return Ok(vec![Fragment {
                id: node.id.clone(),
                seq: circular_slice(target, node.start as isize, (node.start + target_len) as isize),
                source_id: node.id.clone(),
                kind: FragmentKind::Existing,
                cost: node.cost,
                primers: None,
            }]);
        }

        let triples = neighbourhoods(&ring, target_len);
        let jobs: Vec<PrimerJob> = triples
            .iter()
            .map(|(upstream, node, downstream)| PrimerJob {
                upstream,
                node,
                downstream,
                target,
                min_homology: self.config.fragments.min_homology,
                max_synth: self.config.synthesis.max_length,
            })
            .collect();

        let primers: Vec<Option<PrimerPair>> = match &self.designer {
            Some(designer) => self.pool.install(|| {
                jobs.par_iter()
                    .map(|job| self.primers_for(designer.as_ref(), job).map(Some))
                    .collect::<Result<Vec<_>, _>>()
            })?,
            None => vec![None; jobs.len()],
        };

        let mut fragments = vec![];
        for (job, pair) in jobs.iter().zip(primers) {
            let (add_left, add_right) = job.added();
            let node = job.node;

            let primer_bp = match &pair {
                Some(pair) => pair.bp(),
                None => PRIMER_PAIR_BP + add_left + add_right,
            };
            fragments.push(Fragment {
                id: node.id.clone(),
                seq: circular_slice(
                    target,
                    node.start as isize - add_left as isize,
                    (node.end + add_right) as isize,
                ),
                source_id: node.id.clone(),
                kind: FragmentKind::Pcr,
                cost: primer_bp as f64 * self.config.pcr.bp_cost + node.cost,
                primers: pair,
            });

            fragments.extend(synthesize(node, job.downstream, target, &self.config));
        }

        Ok(fragments)
    }

    fn primers_for(&self, designer: &dyn PrimerDesigner, job: &PrimerJob) -> Result<PrimerPair, DefragError> {
        let node_id = &job.node.id;
        let pair = retry_once(|| designer.design(job))?;

        let max = self.config.pcr.max_pair_penalty;
        if pair.pair_penalty() > max {
            return Err(DefragError::PrimerPenaltyExceeded {
                node_id: node_id.clone(),
                penalty: pair.pair_penalty(),
                max,
            });
        }

        if let Some(scanner) = &self.scanner {
            for primer in [&pair.left, &pair.right] {
                if let Some(site) = retry_once(|| scanner.scan(&primer.seq, node_id))? {
                    return Err(DefragError::OffTargetMismatch {
                        node_id: node_id.clone(),
                        primer: primer.seq.clone(),
                        source_id: site.source_id,
                        start: site.start,
                        end: site.end,
                    });
                }
            }
        }

        tracing::debug!(node = %node_id, penalty = pair.pair_penalty(), "designed primers");
        Ok(pair)
    }
}

/// `(upstream, node, downstream)` for every node of a circular assembly, placed so each
/// triple reads forward along the tripled target. The first node is moved one lap on so its
/// upstream, the last node, precedes it.
fn neighbourhoods(ring: &[&Node], target_len: usize) -> Vec<(Node, Node, Node)> {
    let k = ring.len();
    let lap = |node: &Node, laps: usize| {
        let mut moved = node.clone();
        moved.start += laps * target_len;
        moved.end += laps * target_len;
        moved
    };

    (0..k)
        .map(|i| {
            if i == 0 {
                let downstream = if k > 1 { lap(ring[1], 1) } else { lap(ring[0], 2) };
                (ring[k - 1].clone(), lap(ring[0], 1), downstream)
            } else {
                let downstream = if i + 1 < k { ring[i + 1].clone() } else { lap(ring[0], 1) };
                (ring[i - 1].clone(), ring[i].clone(), downstream)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::config::SynthTier;
    use crate::libs::primer::Primer;
    use approx::assert_relative_eq;

    fn config() -> Config {
        let mut config = Config::default();
        config.fragments.min_match = 100;
        config.fragments.min_homology = 20;
        config.synthesis.min_length = 100;
        config.synthesis.max_length = 500;
        config.synthesis.cost = vec![SynthTier {
            max_length: 3000,
            cost: 0.5,
            fixed: false,
        }];
        config.pcr.bp_cost = 0.1;
        config.tools.parallel = 2;
        config
    }

    fn target(len: usize) -> String {
        (0..len)
            .map(|i| ['A', 'C', 'G', 'T'][(i * 7 + i / 5 + i / 11) % 4])
            .collect()
    }

    fn tripled(spans: &[(&str, usize, usize)], target_len: usize) -> Vec<Match> {
        let mut matches = vec![];
        for lap in 0..3 {
            for (id, start, end) in spans {
                let offset = lap * target_len;
                matches.push(Match::new(id, "", start + offset, end + offset));
            }
        }
        matches
    }

    fn tiles() -> Vec<Match> {
        tripled(&[("a", 0, 332), ("b", 334, 666), ("c", 668, 998)], 1000)
    }

    struct FixedDesigner {
        penalty: f64,
    }

    impl PrimerDesigner for FixedDesigner {
        fn design(&self, _job: &PrimerJob) -> Result<PrimerPair, DefragError> {
            let primer = |seq: &str, strand| Primer {
                seq: seq.to_string(),
                strand,
                tm: 60.0,
                gc: 50.0,
                penalty: self.penalty / 2.0,
                pair_penalty: self.penalty,
            };
            Ok(PrimerPair {
                left: primer("ATGACCATGATTACGCCAAG", true),
                right: primer("GTAAAACGACGGCCAGTG", false),
            })
        }
    }

    /// Flags every primer designed for `source`.
    struct FlagSource {
        source: String,
    }

    impl MismatchScanner for FlagSource {
        fn scan(&self, primer: &str, source_id: &str) -> Result<Option<Match>, DefragError> {
            if source_id == self.source {
                Ok(Some(Match::new(source_id, primer, 10, 30)))
            } else {
                Ok(None)
            }
        }
    }

    #[test]
    fn test_tiles_three_pcr_fragments() {
        let target = target(1000);
        let planner = Planner::new(config()).unwrap();
        let fragments = planner.plan(&tiles(), &target).unwrap();

        assert_eq!(fragments.len(), 3);
        assert!(fragments.iter().all(|f| f.kind == FragmentKind::Pcr));

        let mut ids: Vec<&str> = fragments.iter().map(|f| f.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a", "b", "c"]);

        // each 2 bp gap is split with 10 bp of homology added on either side
        let a = fragments.iter().find(|f| f.id == "a").unwrap();
        assert_eq!(a.seq, circular_slice(&target, -12, 344));
        assert_relative_eq!(a.cost, (40 + 12 + 12) as f64 * 0.1);
    }

    #[test]
    fn test_gap_bridged_by_one_synthetic_piece() {
        let target = target(1400);
        let matches = tripled(&[("A", 0, 400), ("B", 900, 1402)], 1400);
        let planner = Planner::new(config()).unwrap();
        let fragments = planner.plan(&matches, &target).unwrap();

        let synthetic: Vec<&Fragment> = fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Synthetic)
            .collect();
        assert_eq!(synthetic.len(), 1);
        assert!(synthetic[0].seq.len() >= 100 + 2 * 20);
        assert_eq!(synthetic[0].id, "A-synthetic-1");
        assert_eq!(fragments.len(), 3);
    }

    #[test]
    fn test_contained_match_removed() {
        let target = target(1000);
        let mut matches = tiles();
        matches.push(Match::new("inner", "", 1400, 1600));
        let prepared = prepare(&matches, &target, &config()).unwrap();
        assert!(prepared.nodes.iter().all(|n| n.id != "inner"));
    }

    #[test]
    fn test_whole_target_is_existing() {
        let target = target(1000);
        let matches = tripled(&[("pWhole", 0, 1000)], 1000);
        let planner = Planner::new(config()).unwrap();
        let fragments = planner.plan(&matches, &target).unwrap();

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].kind, FragmentKind::Existing);
        assert_eq!(fragments[0].seq, target);
    }

    #[test]
    fn test_no_usable_matches() {
        let target = target(1000);
        let matches = vec![Match::new("tiny", "", 0, 50)];
        let err = Planner::new(config()).unwrap().plan(&matches, &target).unwrap_err();
        assert!(matches!(err, DefragError::NoUsableMatches { min_match: 100 }));
    }

    #[test]
    fn test_infeasible_reports_closest() {
        let target = target(1000);
        let matches = tripled(&[("A", 0, 600)], 1000);
        let mut config = config();
        config.fragments.max_count = 1;
        let err = Planner::new(config).unwrap().plan(&matches, &target).unwrap_err();
        match err {
            DefragError::NoFeasibleAssembly { max_count, .. } => assert_eq!(max_count, 1),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_designed_primers_attached() {
        let target = target(1000);
        let planner = Planner::new(config())
            .unwrap()
            .designer(Box::new(FixedDesigner { penalty: 1.5 }));
        let fragments = planner.plan(&tiles(), &target).unwrap();

        assert_eq!(fragments.len(), 3);
        for frag in &fragments {
            let pair = frag.primers.as_ref().unwrap();
            assert_relative_eq!(pair.pair_penalty(), 1.5);
            assert_relative_eq!(frag.cost, 38.0 * 0.1);
        }
    }

    #[test]
    fn test_penalty_exceeded() {
        let target = target(1000);
        let planner = Planner::new(config())
            .unwrap()
            .designer(Box::new(FixedDesigner { penalty: 45.0 }));
        let err = planner.plan(&tiles(), &target).unwrap_err();
        assert!(matches!(err, DefragError::PrimerPenaltyExceeded { .. }));
    }

    #[test]
    fn test_offtarget_falls_through_to_next_assembly() {
        let target = target(1000);
        let planner = Planner::new(config())
            .unwrap()
            .designer(Box::new(FixedDesigner { penalty: 1.0 }))
            .scanner(Box::new(FlagSource {
                source: "b".to_string(),
            }));
        let fragments = planner.plan(&tiles(), &target).unwrap();

        // the PCR-only plan needs b, the next one bridges its span by synthesis
        assert!(fragments.iter().all(|f| f.id != "b"));
        assert!(fragments.iter().any(|f| f.kind == FragmentKind::Synthetic));
    }

    #[test]
    fn test_neighbourhoods_read_forward() {
        let target_len = 1000;
        let a = Node::new(&Match::new("a", "", 0, 332), target_len, |_| 0.0);
        let b = Node::new(&Match::new("b", "", 334, 666), target_len, |_| 0.0);
        let c = Node::new(&Match::new("c", "", 668, 998), target_len, |_| 0.0);

        let triples = neighbourhoods(&[&a, &b, &c], target_len);
        assert_eq!(triples.len(), 3);
        for (up, node, down) in &triples {
            assert!(up.start < node.start);
            assert!(node.start < down.start);
        }
        assert_eq!(triples[0].1.start, 1000);
        assert_eq!(triples[2].2.start, 1000);
    }
}
