use std::io::BufRead;

/// One alignment of a database source against the tripled target.
///
/// Positions are 0-based and half-open on a target that was repeated end to end, so a
/// source crossing the origin of the circular target is an ordinary interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub source_id: String,
    pub sequence: String,
    pub start: usize,
    pub end: usize,
}

impl Match {
    pub fn new(source_id: &str, sequence: &str, start: usize, end: usize) -> Self {
        Match {
            source_id: source_id.to_string(),
            sequence: sequence.to_string(),
            start,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes matches that are too short or that lie within a longer match.
///
/// The result is sorted by start. A match sharing its end with a longer, earlier-starting
/// match is dropped along with fully contained ones. Filtering is idempotent.
///
/// ```
/// use defrag::libs::matches::{filter, Match};
///
/// let matches = vec![
///     Match::new("inner", "", 120, 300),
///     Match::new("outer", "", 100, 400),
///     Match::new("short", "", 500, 510),
/// ];
/// let kept = filter(&matches, 50);
/// assert_eq!(kept.len(), 1);
/// assert_eq!(kept[0].source_id, "outer");
/// ```
pub fn filter(matches: &[Match], min_match: usize) -> Vec<Match> {
    let mut large_enough: Vec<&Match> = matches.iter().filter(|m| m.len() >= min_match).collect();

    // larger first on equal starts, so the sweep keeps it
    large_enough.sort_by(|a, b| a.start.cmp(&b.start).then(b.len().cmp(&a.len())));

    let mut properized: Vec<Match> = Vec::with_capacity(large_enough.len());
    for m in large_enough {
        match properized.last() {
            Some(last) if m.end <= last.end => {}
            _ => properized.push(m.clone()),
        }
    }

    properized
}

/// Parses a tab-separated match list: `source_id  start  end  sequence`.
///
/// Blank lines and lines starting with `#` are skipped. An empty list is not an error.
pub fn read_matches<R: BufRead>(reader: R) -> anyhow::Result<Vec<Match>> {
    let mut matches = vec![];

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            anyhow::bail!("line {}: expected at least 3 tab-separated fields", i + 1);
        }

        let start: usize = fields[1]
            .parse()
            .map_err(|e| anyhow::anyhow!("line {}: bad start {:?}: {}", i + 1, fields[1], e))?;
        let end: usize = fields[2]
            .parse()
            .map_err(|e| anyhow::anyhow!("line {}: bad end {:?}: {}", i + 1, fields[2], e))?;
        if end < start {
            anyhow::bail!("line {}: end {} before start {}", i + 1, end, start);
        }

        let sequence = fields.get(3).copied().unwrap_or("");
        matches.push(Match::new(fields[0], sequence, start, end));
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(id: &str, start: usize, end: usize) -> Match {
        Match::new(id, "", start, end)
    }

    #[test]
    fn test_filter_drops_short() {
        let kept = filter(&[m("a", 0, 10), m("b", 20, 120)], 50);
        assert_eq!(kept, vec![m("b", 20, 120)]);
    }

    #[test]
    fn test_filter_contained() {
        // a single match inside another leaves only the larger
        let kept = filter(&[m("small", 150, 250), m("large", 100, 400)], 10);
        assert_eq!(kept, vec![m("large", 100, 400)]);
    }

    #[test]
    fn test_filter_same_start_keeps_longer() {
        let kept = filter(&[m("short", 100, 200), m("long", 100, 300)], 10);
        assert_eq!(kept, vec![m("long", 100, 300)]);
    }

    #[test]
    fn test_filter_shared_end() {
        let kept = filter(&[m("late", 200, 400), m("early", 100, 400)], 10);
        assert_eq!(kept, vec![m("early", 100, 400)]);
    }

    #[test]
    fn test_filter_overlapping_kept_sorted() {
        let kept = filter(&[m("c", 300, 600), m("a", 0, 200), m("b", 150, 400)], 10);
        let ids: Vec<_> = kept.iter().map(|m| m.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_filter_empty() {
        assert!(filter(&[], 10).is_empty());
        assert!(filter(&[m("a", 0, 5)], 10).is_empty());
    }

    #[test]
    fn test_read_matches() {
        let input = "\
# source\tstart\tend\tsequence
addgene:1\t0\t4\tACGT

igem:2\t10\t12\tGG
bare\t5\t9
";
        let matches = read_matches(input.as_bytes()).unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0], Match::new("addgene:1", "ACGT", 0, 4));
        assert_eq!(matches[1].len(), 2);
        assert_eq!(matches[2].sequence, "");
    }

    #[test]
    fn test_read_matches_errors() {
        assert!(read_matches("a\t1\n".as_bytes()).is_err());
        assert!(read_matches("a\tx\t3\n".as_bytes()).is_err());
        assert!(read_matches("a\t9\t3\n".as_bytes()).is_err());
    }
}
