use clap::{Arg, ArgMatches, Command};
use itertools::Itertools;
use std::io::Write;

use defrag::libs::matches::read_matches;
use defrag::libs::plan::prepare;

pub fn make_subcommand() -> Command {
    let cmd = Command::new("search")
        .about("List every distinct assembly, cheapest first")
        .after_help(
            r###"
Columns:
  rank  cost  fragments  synthetic  nodes

`fragments` counts real and synthetic pieces. `nodes` lists `source:start-end` in build
order, positions on the tripled target. Rotations of one circular plan are listed once.

Examples:
  defrag search tests/defrag/tiles.fa tests/defrag/tiles.tsv
  defrag search --max-count 4 target.fa matches.tsv -o assemblies.tsv
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
    let prepared = prepare(&matches, &target, &config)?;
    let ranked = prepared.ranked();
    if ranked.is_empty() {
        return Err(prepared.infeasible(config.fragments.max_count).into());
    }
    tracing::info!(target = %name, assemblies = ranked.len(), "search done");

    //----------------------------
    // Output
    //----------------------------
    let mut writer = defrag::writer(args.get_one::<String>("outfile").unwrap())?;
    writer.write_fmt(format_args!("#rank\tcost\tfragments\tsynthetic\tnodes\n"))?;
    for (i, assembly) in ranked.iter().enumerate() {
        let nodes = assembly
            .nodes
            .iter()
            .map(|&idx| {
                let node = &prepared.nodes[idx];
                format!("{}:{}-{}", node.id, node.start, node.end)
            })
            .join(",");
        writer.write_fmt(format_args!(
            "{}\t{:.2}\t{}\t{}\t{}\n",
            i + 1,
            assembly.cost,
            assembly.len(),
            assembly.synths,
            nodes
        ))?;
    }
    writer.flush()?;

    Ok(())
}
