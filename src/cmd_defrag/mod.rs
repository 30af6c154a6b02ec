//! Subcommand modules for the `defrag` binary.

use clap::{value_parser, Arg, ArgMatches, Command};
use std::path::Path;

use defrag::libs::config::{Config, Overrides};

pub mod build;
pub mod filter;
pub mod search;

/// `--config` and the flags that override it.
pub fn config_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("config")
            .long("config")
            .short('c')
            .num_args(1)
            .help("TOML config file; built-in defaults otherwise"),
    )
    .arg(
        Arg::new("min_match")
            .long("min-match")
            .num_args(1)
            .value_parser(value_parser!(usize))
            .help("Drop matches shorter than this"),
    )
    .arg(
        Arg::new("max_count")
            .long("max-count")
            .num_args(1)
            .value_parser(value_parser!(usize))
            .help("Most fragments, real plus synthetic, in one assembly"),
    )
    .arg(
        Arg::new("min_homology")
            .long("min-homology")
            .num_args(1)
            .value_parser(value_parser!(usize))
            .help("Overlap needed between neighbouring fragments"),
    )
    .arg(
        Arg::new("parallel")
            .long("parallel")
            .short('p')
            .num_args(1)
            .value_parser(value_parser!(usize))
            .help("Number of threads for external tools"),
    )
    .arg(
        Arg::new("timeout")
            .long("timeout")
            .num_args(1)
            .value_parser(value_parser!(u64))
            .help("Seconds before an external tool is killed"),
    )
    .arg(
        Arg::new("db")
            .long("db")
            .num_args(1)
            .help("BLAST database of the match sources, for off-target checks"),
    )
}

/// Config from `--config`, then the command line overrides.
pub fn load_config(args: &ArgMatches) -> anyhow::Result<Config> {
    let overrides = Overrides {
        min_match: args.get_one::<usize>("min_match").copied(),
        max_count: args.get_one::<usize>("max_count").copied(),
        min_homology: args.get_one::<usize>("min_homology").copied(),
        parallel: args.get_one::<usize>("parallel").copied(),
        timeout_secs: args.get_one::<u64>("timeout").copied(),
        database: args.get_one::<String>("db").cloned(),
    };
    let path = args.get_one::<String>("config").map(Path::new);

    Ok(Config::load(path, &overrides)?)
}
