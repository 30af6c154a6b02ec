use clap::{Arg, ArgAction, ArgMatches, Command};

use defrag::libs::fragment::{write_fasta, write_summary};
use defrag::libs::matches::read_matches;
use defrag::libs::plan::Planner;

pub fn make_subcommand() -> Command {
    let cmd = Command::new("build")
        .about("Write the fragments of the cheapest feasible assembly")
        .after_help(
            r###"
Searches for assemblies, then designs primers for the PCR fragments of the cheapest one with
primer3. With --db, each primer is also checked with BLAST+ against its source; an assembly
whose primers fail is replaced by the next one.

* --no-primers skips primer3 and BLAST; PCR fragments are cut from the target
* --summary writes one line per fragment: id kind source length cost primers

Examples:
  defrag build --no-primers tests/defrag/tiles.fa tests/defrag/tiles.tsv
  defrag build target.fa matches.tsv --db addgene -o fragments.fa --summary plan.tsv
"###,
        )
        .arg(
            Arg::new("target")
                .required(true)
                .index(1)
                .help("Target FASTA; the first record is used"),
        )
        .arg(
            Arg::new("matches")
                .required(true)
                .index(2)
                .help("Matches TSV"),
        )
        .arg(
            Arg::new("no_primers")
                .long("no-primers")
                .action(ArgAction::SetTrue)
                .help("Don't run primer3 or BLAST"),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .num_args(1)
                .help("Also write a TSV summary of the fragments"),
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
    let (name, target) = defrag::read_target(args.get_one::<String>("target").unwrap())?;
    let matches = read_matches(defrag::reader(args.get_one::<String>("matches").unwrap())?)?;

    //----------------------------
    // Ops
    //----------------------------
    let planner = if args.get_flag("no_primers") {
        Planner::new(config)?
    } else {
        Planner::with_tools(config)?
    };
    let fragments = planner.plan(&matches, &target)?;

    let total: f64 = fragments.iter().map(|f| f.cost).sum();
    tracing::info!(target = %name, fragments = fragments.len(), cost = total, "plan written");

    //----------------------------
    // Output
    //----------------------------
    write_fasta(defrag::writer(args.get_one::<String>("outfile").unwrap())?, &fragments)?;
    if let Some(summary) = args.get_one::<String>("summary") {
        write_summary(defrag::writer(summary)?, &fragments)?;
    }

    Ok(())
}
