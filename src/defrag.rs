extern crate clap;
use clap::*;

mod cmd_defrag;

fn main() -> anyhow::Result<()> {
    let app = Command::new("defrag")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`defrag` - Plan the cheapest build of a circular DNA target")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("More log output on stderr; repeat for debug and trace"),
        )
        .subcommand(cmd_defrag::filter::make_subcommand())
        .subcommand(cmd_defrag::search::make_subcommand())
        .subcommand(cmd_defrag::build::make_subcommand())
        .after_help(
            r###"Subcommands:

* filter - Drop short and contained matches
* search - List every distinct assembly, cheapest first
* build  - Write the fragments of the cheapest feasible assembly

Matches are tab-separated `source_id start end [sequence]` lines, with positions on the
target repeated three times end to end.

Log level comes from -v/-vv/-vvv, or RUST_LOG when no -v is given.

"###,
        );

    let matches = app.get_matches();
    init_logging(matches.get_count("verbose"));

    match matches.subcommand() {
        Some(("filter", sub_matches)) => cmd_defrag::filter::execute(sub_matches),
        Some(("search", sub_matches)) => cmd_defrag::search::execute(sub_matches),
        Some(("build", sub_matches)) => cmd_defrag::build::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
