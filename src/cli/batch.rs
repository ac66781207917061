use super::common::{save_in, OutputArgs};
use clap::Parser;
use ppi_surface::{
    buried_to_df, contacts_to_df, interface_area_to_df, parse_chains, run_with_threads,
    safe_name, secondary_structure_to_df, surface_area_to_df, EngineConfig, Result,
    StructureAnalysis, SurfaceAreaBackendKind, WorkDir,
};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, trace, warn};

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Analysis {
    Contacts,
    Sasa,
    Interface,
    Dssp,
}

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub(crate) struct Args {
    /// PDB files to be analyzed, one job each
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Chains of interest, e.g. A,B
    #[arg(short, long)]
    chains: String,

    /// Base directory, every job works in its own subdirectory
    #[arg(short, long = "work-dir", default_value = "ppi-surface-work")]
    work_dir: PathBuf,

    /// TOML file with tool locations and settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Surface area program, overrides the configuration file
    #[arg(short, long)]
    backend: Option<SurfaceAreaBackendKind>,

    /// Analyses to run for each job
    #[arg(short, long, value_delimiter = ',', default_values_t = [Analysis::Contacts, Analysis::Sasa, Analysis::Interface, Analysis::Dssp])]
    analyses: Vec<Analysis>,

    #[command(flatten)]
    output: OutputArgs,

    /// Number of jobs to run at the same time
    #[arg(short = 'j', long = "num-threads", default_value_t = 1)]
    num_threads: usize,
}

impl std::fmt::Display for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Analysis::Contacts => write!(f, "contacts"),
            Analysis::Sasa => write!(f, "sasa"),
            Analysis::Interface => write!(f, "interface"),
            Analysis::Dssp => write!(f, "dssp"),
        }
    }
}

/// Job name derived from the file name, safe to use as a directory name.
fn job_id(input: &Path) -> String {
    let id = input
        .file_stem()
        .map(|s| safe_name(&s.to_string_lossy()))
        .unwrap_or_default();
    if id.is_empty() {
        "job".to_string()
    } else {
        id
    }
}

/// One distinct job name per input. Repeated names get a `_2`, `_3`, ... suffix.
fn job_ids(inputs: &[PathBuf]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let base = job_id(input);
            let mut id = base.clone();
            let mut n = 1;
            while !taken.insert(id.clone()) {
                n += 1;
                id = format!("{base}_{n}");
            }
            id
        })
        .collect()
}

pub(crate) fn run(args: &Args) -> Result<()> {
    trace!("{args:?}");
    let chains = parse_chains(&args.chains)?;
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(backend) = args.backend {
        config.surface_area_backend = backend;
    }

    let ids = job_ids(&args.inputs);
    let failed: Vec<String> = run_with_threads(args.num_threads, || {
        debug!("Using {} thread(s)", rayon::current_num_threads());
        args.inputs
            .par_iter()
            .zip(ids.par_iter())
            .filter_map(|(input, id)| match run_job(args, &config, &chains, input, id) {
                Ok(()) => None,
                Err(e) => {
                    if e.is_reschedulable() {
                        warn!("Job {id} should be rescheduled: {e}");
                    } else {
                        error!("Job {id} failed: {e}");
                    }
                    Some(id.clone())
                }
            })
            .collect()
    });

    info!(
        "Finished {} of {} jobs",
        args.inputs.len() - failed.len(),
        args.inputs.len()
    );
    if !failed.is_empty() {
        warn!("Failed jobs: {}", failed.join(", "));
    }
    Ok(())
}

fn run_job(
    args: &Args,
    config: &EngineConfig,
    chains: &[String],
    input: &Path,
    id: &str,
) -> Result<()> {
    let workdir = WorkDir::for_job(&args.work_dir, id)?;
    let engine = StructureAnalysis::new(config.clone(), workdir, input, chains)?;
    let output_dir = args.output.output.join(id);
    let format = args.output.output_format;

    for analysis in &args.analyses {
        debug!("Running {analysis} for job {id}");
        match analysis {
            Analysis::Contacts => {
                let Some(to_chain) = chains.get(1) else {
                    warn!("Job {id}: contacts need two chains, skipping");
                    continue;
                };
                let contacts = engine.contacts(&chains[0], to_chain, None)?;
                save_in(&output_dir, &mut contacts_to_df(&contacts)?, "contacts", format)?;
            }
            Analysis::Sasa => {
                let areas = engine.surface_area()?;
                save_in(
                    &output_dir,
                    &mut surface_area_to_df(&areas.separate.by_residue())?,
                    "sasa_separate",
                    format,
                )?;
                save_in(
                    &output_dir,
                    &mut surface_area_to_df(&areas.together.by_residue())?,
                    "sasa_together",
                    format,
                )?;
                save_in(
                    &output_dir,
                    &mut buried_to_df(&areas.buried_by_residue())?,
                    "sasa_buried",
                    format,
                )?;
            }
            Analysis::Interface => {
                if chains.len() != 2 {
                    warn!("Job {id}: interface area needs exactly two chains, skipping");
                    continue;
                }
                let area = engine.interface_area()?;
                save_in(
                    &output_dir,
                    &mut interface_area_to_df(chains, &area)?,
                    "interface_area",
                    format,
                )?;
            }
            Analysis::Dssp => {
                let dssp = engine.secondary_structure()?;
                save_in(&output_dir, &mut secondary_structure_to_df(&dssp)?, "dssp", format)?;
            }
        }
    }
    info!("Job {id} done");
    Ok(())
}
