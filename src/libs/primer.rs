//! Primer design for the PCR fragments of a chosen assembly.
//!
//! Primers on a node add whatever homology its neighbours do not already share with it.
//! The design itself is delegated to primer3 through Boulder-IO files.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::libs::error::DefragError;
use crate::libs::external;
use crate::libs::junction::{distance, synth_count};
use crate::libs::node::Node;

const PRIMER_MIN: usize = 18;
const PRIMER_OPT: usize = 20;
const PRIMER_MAX: usize = 23;
/// primer3 refuses primers longer than this.
const PRIMER_CEILING: usize = 36;

#[derive(Debug, Clone, PartialEq)]
pub struct Primer {
    pub seq: String,
    /// `true` for the forward (left) primer.
    pub strand: bool,
    pub tm: f64,
    pub gc: f64,
    pub penalty: f64,
    pub pair_penalty: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimerPair {
    pub left: Primer,
    pub right: Primer,
}

impl PrimerPair {
    pub fn pair_penalty(&self) -> f64 {
        self.left.pair_penalty
    }

    pub fn bp(&self) -> usize {
        self.left.seq.len() + self.right.seq.len()
    }
}

/// A node with its neighbours in the final assembly.
#[derive(Debug, Clone, Copy)]
pub struct PrimerJob<'a> {
    pub upstream: &'a Node,
    pub node: &'a Node,
    pub downstream: &'a Node,
    /// The plain, untripled target.
    pub target: &'a str,
    pub min_homology: usize,
    pub max_synth: usize,
}

impl PrimerJob<'_> {
    /// Bases the primers add on the left and right of the node.
    pub fn added(&self) -> (usize, usize) {
        (
            homology_to_add(self.upstream, self.node, self.min_homology, self.max_synth),
            homology_to_add(self.node, self.downstream, self.min_homology, self.max_synth),
        )
    }
}

/// Designs a primer pair for one node.
pub trait PrimerDesigner: Sync {
    fn design(&self, job: &PrimerJob) -> Result<PrimerPair, DefragError>;
}

/// Bases the node on one side of a PCR junction adds toward the other.
///
/// Synthetic junctions bring their own homology. Otherwise each side adds half of
/// `min_homology` on top of any gap; ample existing overlap needs nothing.
pub fn homology_to_add(left: &Node, right: &Node, min_homology: usize, max_synth: usize) -> usize {
    if synth_count(left, right, max_synth) > 0 {
        return 0;
    }

    let dist = distance(left, right);
    if dist > -(min_homology as isize) {
        (dist + (min_homology / 2) as isize).max(0) as usize
    } else {
        0
    }
}

/// primer3 backed designer.
#[derive(Debug, Clone)]
pub struct Primer3 {
    pub exe: String,
    /// `PRIMER_THERMODYNAMIC_PARAMETERS_PATH`, with its trailing separator.
    pub config_dir: Option<String>,
    pub timeout: Duration,
}

impl Primer3 {
    /// Boulder-IO settings for `job`.
    ///
    /// The template is the tripled target; the included region is the node widened by the
    /// homology it must add, moved onto the middle copy. Primer sizes grow with the added
    /// bases, capped at primer3's limit.
    pub fn input(&self, job: &PrimerJob) -> String {
        let target_len = job.target.len();
        let (add_left, add_right) = job.added();

        let start = (job.node.start as isize - add_left as isize).rem_euclid(target_len as isize) as usize + target_len;
        let length = (job.node.len() + add_left + add_right).min(3 * target_len - start);

        let mut max_added = add_left.max(add_right);
        let (mut p_min, mut p_opt, mut p_max) = (PRIMER_MIN, PRIMER_OPT, PRIMER_MAX);
        if max_added > 0 {
            max_added = (max_added + 2).min(PRIMER_CEILING - PRIMER_MAX);
            p_min += max_added;
            p_opt += max_added;
            p_max += max_added;
        }

        let mut settings: Vec<(&str, String)> = vec![];
        if let Some(dir) = &self.config_dir {
            settings.push(("PRIMER_THERMODYNAMIC_PARAMETERS_PATH", dir.clone()));
        }
        settings.extend([
            ("PRIMER_NUM_RETURN", "1".to_string()),
            ("PRIMER_TASK", "pick_cloning_primers".to_string()),
            ("PRIMER_PICK_ANYWAY", "1".to_string()),
            ("SEQUENCE_ID", job.node.id.clone()),
            ("SEQUENCE_TEMPLATE", job.target.repeat(3)),
            ("SEQUENCE_INCLUDED_REGION", format!("{},{}", start, length)),
            ("PRIMER_MIN_SIZE", p_min.to_string()),
            ("PRIMER_OPT_SIZE", p_opt.to_string()),
            ("PRIMER_MAX_SIZE", p_max.to_string()),
        ]);

        let mut content = String::new();
        for (key, value) in settings {
            content.push_str(&format!("{}={}\n", key, value));
        }
        content.push_str("=\n");
        content
    }
}

impl PrimerDesigner for Primer3 {
    fn design(&self, job: &PrimerJob) -> Result<PrimerPair, DefragError> {
        let fail = |cause: String| DefragError::tool(&self.exe, &job.node.id, cause);

        let mut input = NamedTempFile::new().map_err(|e| fail(e.to_string()))?;
        input
            .write_all(self.input(job).as_bytes())
            .map_err(|e| fail(format!("failed to write input: {}", e)))?;

        let args = vec![
            "-strict_tags".to_string(),
            input.path().to_string_lossy().to_string(),
        ];
        let output = external::run(&self.exe, &args, &job.node.id, self.timeout)?;

        parse(&output).map_err(fail)
    }
}

/// Reads the first primer pair out of primer3's Boulder-IO output.
pub fn parse(output: &str) -> Result<PrimerPair, String> {
    let results: HashMap<&str, &str> = output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();

    if let Some(err) = results.get("PRIMER_ERROR").filter(|e| !e.is_empty()) {
        return Err(format!("primer3 error: {}", err));
    }

    let number = |key: String| -> Result<f64, String> {
        let value = results
            .get(key.as_str())
            .ok_or_else(|| format!("missing {} in primer3 output", key))?;
        value
            .parse::<f64>()
            .map_err(|e| format!("bad {} {:?}: {}", key, value, e))
    };

    let pair_penalty = number("PRIMER_PAIR_0_PENALTY".to_string())?;
    let primer = |side: &str| -> Result<Primer, String> {
        let seq_key = format!("PRIMER_{}_0_SEQUENCE", side);
        let seq = results
            .get(seq_key.as_str())
            .ok_or_else(|| format!("missing {} in primer3 output", seq_key))?;

        Ok(Primer {
            seq: seq.to_string(),
            strand: side == "LEFT",
            tm: number(format!("PRIMER_{}_0_TM", side))?,
            gc: number(format!("PRIMER_{}_0_GC_PERCENT", side))?,
            penalty: number(format!("PRIMER_{}_0_PENALTY", side))?,
            pair_penalty,
        })
    };

    Ok(PrimerPair {
        left: primer("LEFT")?,
        right: primer("RIGHT")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::matches::Match;
    use approx::assert_relative_eq;

    fn node(id: &str, start: usize, end: usize) -> Node {
        Node::new(&Match::new(id, "", start, end), 1000, |_| 0.0)
    }

    #[test]
    fn test_homology_to_add() {
        let a = node("a", 0, 400);
        // plenty of overlap
        assert_eq!(homology_to_add(&a, &node("b", 300, 800), 20, 500), 0);
        // 5 bp gap: gap plus half the homology
        assert_eq!(homology_to_add(&a, &node("b", 405, 800), 20, 500), 15);
        // small overlap
        assert_eq!(homology_to_add(&a, &node("b", 395, 800), 20, 500), 5);
        // overlap just short of min_homology never goes negative
        assert_eq!(homology_to_add(&a, &node("b", 385, 800), 20, 500), 0);
        // bridged by synthesis
        assert_eq!(homology_to_add(&a, &node("b", 700, 800), 20, 500), 0);
    }

    #[test]
    fn test_input_region_and_sizes() {
        let target = "ACGT".repeat(250);
        let up = node("up", 0, 300);
        let this = node("this", 302, 700);
        let down = node("down", 600, 1100);
        let job = PrimerJob {
            upstream: &up,
            node: &this,
            downstream: &down,
            target: &target,
            min_homology: 20,
            max_synth: 500,
        };
        assert_eq!(job.added(), (12, 0));

        let p3 = Primer3 {
            exe: "primer3_core".to_string(),
            config_dir: Some("/opt/primer3_config/".to_string()),
            timeout: Duration::from_secs(10),
        };
        let input = p3.input(&job);
        let lines: Vec<&str> = input.lines().collect();

        assert_eq!(lines[0], "PRIMER_THERMODYNAMIC_PARAMETERS_PATH=/opt/primer3_config/");
        assert!(lines.contains(&"SEQUENCE_INCLUDED_REGION=1290,410"));
        // 12 added bp plus 2, capped so the longest primer stays at 36
        assert!(lines.contains(&"PRIMER_MIN_SIZE=31"));
        assert!(lines.contains(&"PRIMER_OPT_SIZE=33"));
        assert!(lines.contains(&"PRIMER_MAX_SIZE=36"));
        assert!(lines.contains(&"SEQUENCE_ID=this"));
        assert_eq!(*lines.last().unwrap(), "=");

        let template = lines
            .iter()
            .find_map(|l| l.strip_prefix("SEQUENCE_TEMPLATE="))
            .unwrap();
        assert_eq!(template.len(), 3000);
    }

    #[test]
    fn test_input_default_sizes() {
        let target = "ACGT".repeat(250);
        let up = node("up", 0, 400);
        let this = node("this", 300, 700);
        let down = node("down", 600, 1100);
        let job = PrimerJob {
            upstream: &up,
            node: &this,
            downstream: &down,
            target: &target,
            min_homology: 20,
            max_synth: 500,
        };
        let p3 = Primer3 {
            exe: "primer3_core".to_string(),
            config_dir: None,
            timeout: Duration::from_secs(10),
        };
        let input = p3.input(&job);

        assert!(!input.contains("PRIMER_THERMODYNAMIC_PARAMETERS_PATH"));
        assert!(input.contains("PRIMER_MIN_SIZE=18\n"));
        assert!(input.contains("PRIMER_MAX_SIZE=23\n"));
        assert!(input.contains("SEQUENCE_INCLUDED_REGION=1300,400\n"));
    }

    #[test]
    fn test_parse() {
        let output = "\
SEQUENCE_ID=pSource
PRIMER_PAIR_0_PENALTY=0.8123
PRIMER_LEFT_0_SEQUENCE=ATGACCATGATTACGCCAAG
PRIMER_RIGHT_0_SEQUENCE=GTAAAACGACGGCCAGT
PRIMER_LEFT_0_PENALTY=0.4
PRIMER_RIGHT_0_PENALTY=0.4123
PRIMER_LEFT_0_TM=59.6
PRIMER_RIGHT_0_TM=60.2
PRIMER_LEFT_0_GC_PERCENT=45.0
PRIMER_RIGHT_0_GC_PERCENT=52.9
=
";
        let pair = parse(output).unwrap();
        assert_eq!(pair.left.seq, "ATGACCATGATTACGCCAAG");
        assert!(pair.left.strand);
        assert!(!pair.right.strand);
        assert_relative_eq!(pair.right.tm, 60.2);
        assert_relative_eq!(pair.left.gc, 45.0);
        assert_relative_eq!(pair.pair_penalty(), 0.8123);
        assert_eq!(pair.bp(), 37);
    }

    #[test]
    fn test_parse_errors() {
        let err = parse("PRIMER_ERROR=SEQUENCE_INCLUDED_REGION too long\n=\n").unwrap_err();
        assert!(err.contains("too long"));

        let err = parse("PRIMER_PAIR_0_PENALTY=1.0\n=\n").unwrap_err();
        assert!(err.contains("PRIMER_LEFT_0_SEQUENCE"));

        let err = parse("PRIMER_PAIR_0_PENALTY=abc\n=\n").unwrap_err();
        assert!(err.contains("bad PRIMER_PAIR_0_PENALTY"));
    }
}
