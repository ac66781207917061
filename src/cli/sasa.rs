use super::common::{EngineArgs, OutputArgs};
use clap::Parser;
use ppi_surface::{buried_to_df, surface_area_to_df, Result, SurfaceAreaRow};
use tracing::{info, trace};

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Write the raw rows of the surface area program instead of per-residue sums
    #[arg(long = "raw", default_value_t = false)]
    raw: bool,
}

pub(crate) fn run(args: &Args) -> Result<()> {
    trace!("{args:?}");
    let engine = args.engine.build_engine()?;
    let areas = engine.surface_area()?;

    let (separate, together): (Vec<SurfaceAreaRow>, Vec<SurfaceAreaRow>) = if args.raw {
        (areas.separate.rows.clone(), areas.together.rows.clone())
    } else {
        (areas.separate.by_residue(), areas.together.by_residue())
    };
    let mut df_separate = surface_area_to_df(&separate)?;
    let mut df_together = surface_area_to_df(&together)?;
    args.output.save(&mut df_separate, "sasa_separate")?;
    args.output.save(&mut df_together, "sasa_together")?;

    let mut df_chains = surface_area_to_df(
        &[areas.separate.by_chain(), areas.together.by_chain()].concat(),
    )?;
    info!("Accessible area per chain, separate then together\n{df_chains}");
    args.output.save(&mut df_chains, "sasa_chains")?;

    if engine.chains().len() > 1 {
        let mut df_buried = buried_to_df(&areas.buried_by_residue())?;
        args.output.save(&mut df_buried, "sasa_buried")?;
    }
    Ok(())
}
