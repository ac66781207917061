use super::common::{EngineArgs, OutputArgs};
use clap::Parser;
use ppi_surface::{interface_area_to_df, Result};
use tracing::{trace, warn};

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
    let area = engine.interface_area()?;
    if area.is_zero() {
        warn!("POPS failed, the interface area is reported as zero");
    }

    let mut df = interface_area_to_df(engine.chains(), &area)?;
    args.output.save(&mut df, "interface_area")
}
