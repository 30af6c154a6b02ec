use std::io::{BufRead, BufReader, BufWriter, Write};

/// Opens `input` for buffered reading; `stdin` reads standard input and a `.gz` suffix
/// is decompressed on the fly.
///
/// ```
/// use std::io::BufRead;
/// let reader = defrag::reader("tests/defrag/tiles.tsv").unwrap();
/// let lines: Vec<_> = reader.lines().collect();
/// assert!(!lines.is_empty());
/// ```
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("could not open {}: {}", path.display(), e))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

pub fn writer(output: &str) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .map_err(|e| anyhow::anyhow!("could not create {}: {}", output, e))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}

/// Reads the first record of a FASTA file as `(name, upper-cased sequence)`.
pub fn read_target(input: &str) -> anyhow::Result<(String, String)> {
    let mut fa_in = noodles_fasta::io::Reader::new(reader(input)?);

    match fa_in.records().next() {
        Some(result) => {
            let record = result?;
            let name = String::from_utf8(record.name().into())?;
            let seq = String::from_utf8(record.sequence().as_ref().to_vec())?.to_uppercase();
            if seq.is_empty() {
                anyhow::bail!("target {} in {} is empty", name, input);
            }
            Ok((name, seq))
        }
        None => anyhow::bail!("no FASTA record found in {}", input),
    }
}
