use clap::{Arg, ArgMatches, Command};
use std::io::Write;

use defrag::libs::matches::{filter, read_matches};

pub fn make_subcommand() -> Command {
    let cmd = Command::new("filter")
        .about("Drop short and contained matches")
        .after_help(
            r###"
Keeps matches of at least --min-match bp that are not covered by a longer match, sorted by
start. Running filter on its own output changes nothing.

Examples:
  defrag filter tests/defrag/tiles.tsv
  defrag filter --min-match 500 matches.tsv -o kept.tsv
"###,
        )
        .arg(
            Arg::new("infile")
                .help("Matches TSV, `stdin` for standard input")
                .default_value("stdin")
                .index(1),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        );

    super::config_args(cmd)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let config = super::load_config(args)?;
    let reader = defrag::reader(args.get_one::<String>("infile").unwrap())?;
    let mut writer = defrag::writer(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    let matches = read_matches(reader)?;
    let kept = filter(&matches, config.fragments.min_match);
    tracing::info!(read = matches.len(), kept = kept.len(), "filtered matches");

    for m in &kept {
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{}\n",
            m.source_id, m.start, m.end, m.sequence
        ))?;
    }
    writer.flush()?;

    Ok(())
}
