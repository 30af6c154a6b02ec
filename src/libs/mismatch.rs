//! Off-target checks for designed primers.

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::libs::error::DefragError;
use crate::libs::external;
use crate::libs::matches::Match;

/// Tabular columns requested from blastn, in order.
pub const BLAST_FIELDS: &str = "sseqid qstart qend sstart send mismatch gaps";

/// Looks for places a primer binds besides its intended site.
pub trait MismatchScanner: Sync {
    /// The first unintended binding site of `primer` inside `source_id`, if any.
    fn scan(&self, primer: &str, source_id: &str) -> Result<Option<Match>, DefragError>;
}

/// One line of blastn tabular output.
#[derive(Debug, Clone, PartialEq)]
pub struct BlastHit {
    pub subject: String,
    /// 1-based, inclusive.
    pub qstart: usize,
    pub qend: usize,
    pub sstart: usize,
    pub send: usize,
    pub mismatch: usize,
    pub gaps: usize,
}

impl BlastHit {
    pub fn identical(&self) -> usize {
        (self.qend + 1)
            .saturating_sub(self.qstart)
            .saturating_sub(self.mismatch + self.gaps)
    }

    /// 0-based half-open range on the subject, whatever the strand.
    pub fn subject_range(&self) -> (usize, usize) {
        let lo = self.sstart.min(self.send);
        let hi = self.sstart.max(self.send);
        (lo.saturating_sub(1), hi)
    }
}

/// BLAST+ backed scanner. The primer's parent is pulled out of `db` and the primer is aligned
/// against it alone.
#[derive(Debug, Clone)]
pub struct BlastScanner {
    pub blastn: String,
    pub blastdbcmd: String,
    pub db: String,
    /// Identical bases a hit needs to count as a binding site.
    pub min_bp: usize,
    pub timeout: Duration,
}

impl BlastScanner {
    fn temp_fasta(&self, content: &str, source_id: &str) -> Result<NamedTempFile, DefragError> {
        let fail = |e: std::io::Error| DefragError::tool(&self.blastn, source_id, e);
        let mut file = NamedTempFile::new().map_err(fail)?;
        file.write_all(content.as_bytes()).map_err(fail)?;
        file.flush().map_err(fail)?;
        Ok(file)
    }
}

impl MismatchScanner for BlastScanner {
    fn scan(&self, primer: &str, source_id: &str) -> Result<Option<Match>, DefragError> {
        let parent = external::run(
            &self.blastdbcmd,
            &[
                "-db".to_string(),
                self.db.clone(),
                "-entry".to_string(),
                source_id.to_string(),
                "-outfmt".to_string(),
                "%f".to_string(),
            ],
            source_id,
            self.timeout,
        )?;
        let subject = self.temp_fasta(&parent, source_id)?;
        let query = self.temp_fasta(&format!(">primer\n{}\n", primer), source_id)?;

        let output = external::run(
            &self.blastn,
            &[
                "-task".to_string(),
                "blastn-short".to_string(),
                "-query".to_string(),
                query.path().to_string_lossy().to_string(),
                "-subject".to_string(),
                subject.path().to_string_lossy().to_string(),
                "-outfmt".to_string(),
                format!("6 {}", BLAST_FIELDS),
            ],
            source_id,
            self.timeout,
        )?;

        let hits = parse_hits(&output).map_err(|e| DefragError::tool(&self.blastn, source_id, e))?;
        Ok(find_offtarget(&hits, primer, self.min_bp))
    }
}

/// Parses blastn `-outfmt "6 sseqid qstart qend sstart send mismatch gaps"`.
pub fn parse_hits(output: &str) -> Result<Vec<BlastHit>, String> {
    let mut hits = vec![];

    for line in output.lines() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            return Err(format!("expected 7 blast columns, got {}: {}", fields.len(), line));
        }

        let num = |i: usize| -> Result<usize, String> {
            fields[i]
                .trim()
                .parse::<usize>()
                .map_err(|e| format!("bad blast column {} {:?}: {}", i + 1, fields[i], e))
        };

        hits.push(BlastHit {
            subject: fields[0].to_string(),
            qstart: num(1)?,
            qend: num(2)?,
            sstart: num(3)?,
            send: num(4)?,
            mismatch: num(5)?,
            gaps: num(6)?,
        });
    }

    Ok(hits)
}

/// Hits that end at the primer's 3' end with at least `min_bp` identical bases.
pub fn binding_sites<'a>(hits: &'a [BlastHit], primer_len: usize, min_bp: usize) -> Vec<&'a BlastHit> {
    hits.iter()
        .filter(|h| h.qend == primer_len && h.identical() >= min_bp)
        .collect()
}

/// The intended site is one binding site; any further one is reported.
pub fn find_offtarget(hits: &[BlastHit], primer: &str, min_bp: usize) -> Option<Match> {
    let sites = binding_sites(hits, primer.len(), min_bp);
    if sites.len() < 2 {
        return None;
    }

    let site = sites
        .iter()
        .max_by_key(|h| (h.mismatch + h.gaps, h.sstart))
        .copied()?;
    let (start, end) = site.subject_range();
    Some(Match::new(&site.subject, primer, start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMER: &str = "ATGACCATGATTACGCCAAG";

    #[test]
    fn test_parse_hits() {
        let output = "\
pUC19\t1\t20\t146\t165\t0\t0
pUC19\t6\t20\t2010\t1996\t1\t0
";
        let hits = parse_hits(output).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].identical(), 20);
        assert_eq!(hits[1].identical(), 14);
        assert_eq!(hits[0].subject_range(), (145, 165));
        // minus strand hits report the range ascending
        assert_eq!(hits[1].subject_range(), (1995, 2010));
    }

    #[test]
    fn test_parse_hits_rejects_short_lines() {
        assert!(parse_hits("pUC19\t1\t20\n").is_err());
        assert!(parse_hits("pUC19\t1\tx\t1\t20\t0\t0\n").is_err());
        assert!(parse_hits("").unwrap().is_empty());
    }

    #[test]
    fn test_single_site_is_clean() {
        let hits = parse_hits("pUC19\t1\t20\t146\t165\t0\t0\n").unwrap();
        assert!(find_offtarget(&hits, PRIMER, 12).is_none());
    }

    #[test]
    fn test_second_site_is_offtarget() {
        let output = "\
pUC19\t1\t20\t146\t165\t0\t0
pUC19\t5\t20\t812\t827\t2\t0
";
        let hits = parse_hits(output).unwrap();
        let site = find_offtarget(&hits, PRIMER, 12).unwrap();
        assert_eq!(site.source_id, "pUC19");
        assert_eq!((site.start, site.end), (811, 827));
    }

    #[test]
    fn test_hits_away_from_3_prime_ignored() {
        let output = "\
pUC19\t1\t20\t146\t165\t0\t0
pUC19\t1\t15\t900\t914\t0\t0
pUC19\t10\t20\t300\t310\t0\t0
";
        let hits = parse_hits(output).unwrap();
        // the second stops short of the 3' end, the third has only 11 identical bases
        assert_eq!(binding_sites(&hits, PRIMER.len(), 12).len(), 1);
        assert!(find_offtarget(&hits, PRIMER, 12).is_none());
    }
}
