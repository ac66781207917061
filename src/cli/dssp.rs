use super::common::{EngineArgs, OutputArgs};
use clap::Parser;
use ppi_surface::{secondary_structure_to_df, Result};
use tracing::{debug, trace};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    output: OutputArgs,
}

pub(crate) fn run(args: &Args) -> Result<()> {
    trace!("{args:?}");
    let engine = args.engine.build_engine()?;
    let dssp = engine.secondary_structure()?;
    for chain in dssp.by_chain() {
        debug!(">{}\n{}", chain.chain, chain.structure);
    }

    let mut df = secondary_structure_to_df(&dssp)?;
    args.output.save(&mut df, "dssp")
}
