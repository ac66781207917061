use super::common::{EngineArgs, OutputArgs};
use clap::Parser;
use ppi_surface::{contacts_to_df, distances_to_df, AnalysisError, Mutation, Result};
use tracing::{info, trace};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Chain whose residues are listed, defaults to the first chain of interest
    #[arg(long = "from")]
    from_chain: Option<String>,

    /// Partner chain, defaults to the second chain of interest
    #[arg(long = "to")]
    to_chain: Option<String>,

    /// Distance cutoff in Å, defaults to the configured value
    #[arg(short, long = "dist-cutoff")]
    dist_cutoff: Option<f64>,

    /// Also write the shortest inter-chain distance of every residue
    #[arg(long = "distances", default_value_t = false)]
    distances: bool,

    /// Only report the shortest distance of this residue of the first chain, e.g. Q61L
    #[arg(short, long, requires = "distances")]
    mutation: Option<String>,
}

pub(crate) fn run(args: &Args) -> Result<()> {
    trace!("{args:?}");
    let engine = args.engine.build_engine()?;
    let chains = engine.chains();

    let from_chain = args.from_chain.as_deref().unwrap_or(chains[0].as_str());
    let to_chain = match (&args.to_chain, chains.get(1)) {
        (Some(c), _) => c.as_str(),
        (None, Some(c)) => c.as_str(),
        (None, None) => {
            return Err(AnalysisError::Configuration(
                "Contacts need a second chain, use --to or list two chains".to_string(),
            ))
        }
    };

    let contacts = engine.contacts(from_chain, to_chain, args.dist_cutoff)?;
    let mut df_contacts = contacts_to_df(&contacts)?;
    info!(
        "Found {} contacting residue pairs between chains {from_chain} and {to_chain}\n{}",
        contacts.pair_count(),
        df_contacts
    );
    args.output.save(&mut df_contacts, "contacts")?;

    if args.distances {
        let mutation = args
            .mutation
            .as_deref()
            .map(str::parse::<Mutation>)
            .transpose()?;
        // A mutation refers to a residue of the first chain
        let chain = mutation.as_ref().map(|_| from_chain);
        let distances = engine.interchain_distances(chain, mutation.as_ref())?;
        let mut df_distances = distances_to_df(&distances)?;
        args.output.save(&mut df_distances, "interchain_distances")?;
    }
    Ok(())
}
