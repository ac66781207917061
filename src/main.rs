mod cli {
    pub(crate) mod batch;
    pub(crate) mod common;
    pub(crate) mod contacts;
    pub(crate) mod dssp;
    pub(crate) mod interface;
    pub(crate) mod sasa;
}

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity of the program:
    /// -v for info, -vv for debug, and -vvv for trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Residue contacts between two chains
    Contacts(cli::contacts::Args),
    /// Accessible and excluded surface areas of the chains, alone and together
    Sasa(cli::sasa::Args),
    /// Buried interface area between two chains from POPS
    Interface(cli::interface::Args),
    /// Secondary structure and accessibility from DSSP
    Dssp(cli::dssp::Args),
    /// Run several analyses for many structures in parallel
    Batch(cli::batch::Args),
}

fn main() {
    let args = Cli::parse();

    let level = match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &args.command {
        Commands::Contacts(args) => cli::contacts::run(args),
        Commands::Sasa(args) => cli::sasa::run(args),
        Commands::Interface(args) => cli::interface::run(args),
        Commands::Dssp(args) => cli::dssp::run(args),
        Commands::Batch(args) => cli::batch::run(args),
    };
    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}
