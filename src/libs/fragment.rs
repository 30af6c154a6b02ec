use std::fmt;
use std::io::Write;

use crate::libs::primer::PrimerPair;

/// How a fragment is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Used as is; the source already is the target.
    Existing,
    /// Amplified from its source with primers.
    Pcr,
    /// Ordered from a synthesis vendor.
    Synthetic,
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FragmentKind::Existing => "existing",
            FragmentKind::Pcr => "pcr",
            FragmentKind::Synthetic => "synthetic",
        };
        write!(f, "{}", name)
    }
}

/// One piece of a finished build plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub id: String,
    pub seq: String,
    /// Database entry the fragment comes from; empty for synthetic pieces.
    pub source_id: String,
    pub kind: FragmentKind,
    pub cost: f64,
    pub primers: Option<PrimerPair>,
}

/// Writes fragments as FASTA, one record per fragment.
pub fn write_fasta<W: Write>(writer: W, fragments: &[Fragment]) -> anyhow::Result<()> {
    let mut fa_out = noodles_fasta::io::writer::Builder::default()
        .set_line_base_count(80)
        .build_from_writer(writer);

    for frag in fragments {
        let definition = noodles_fasta::record::Definition::new(frag.id.clone(), None);
        let sequence = noodles_fasta::record::Sequence::from(frag.seq.clone().into_bytes());
        fa_out.write_record(&noodles_fasta::Record::new(definition, sequence))?;
    }

    Ok(())
}

/// Writes a tab-separated summary: id, kind, source, length, cost, primers.
pub fn write_summary<W: Write>(mut writer: W, fragments: &[Fragment]) -> anyhow::Result<()> {
    writer.write_fmt(format_args!("#id\tkind\tsource\tlength\tcost\tprimers\n"))?;

    for frag in fragments {
        let source = if frag.source_id.is_empty() {
            "-"
        } else {
            frag.source_id.as_str()
        };
        let primers = match &frag.primers {
            Some(pair) => format!("{},{}", pair.left.seq, pair.right.seq),
            None => "-".to_string(),
        };
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{}\t{:.2}\t{}\n",
            frag.id,
            frag.kind,
            source,
            frag.seq.len(),
            frag.cost,
            primers
        ))?;
    }
    writer.flush()?;

    Ok(())
}
