use clap::Parser;
use polars::prelude::DataFrame;
use ppi_surface::{
    parse_chains, write_df_to_file, DataFrameFileType, EngineConfig, Result, StructureAnalysis,
    SurfaceAreaBackendKind, WorkDir,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Options shared by every command that analyses a structure.
#[derive(Parser, Debug, Clone)]
pub(crate) struct EngineArgs {
    /// Path to the PDB file to be analyzed
    #[arg(short, long)]
    pub input: PathBuf,

    /// Chains of interest, e.g. A,B
    #[arg(short, long)]
    pub chains: String,

    /// Working directory for the split structures and the tool reports
    #[arg(short, long = "work-dir", default_value = "ppi-surface-work")]
    pub work_dir: PathBuf,

    /// TOML file with tool locations and settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Surface area program, overrides the configuration file
    #[arg(short, long)]
    pub backend: Option<SurfaceAreaBackendKind>,
}

/// Where and how results are written.
#[derive(Parser, Debug, Clone)]
pub(crate) struct OutputArgs {
    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output file type
    #[arg(short = 't', long, default_value_t = DataFrameFileType::Csv)]
    pub output_format: DataFrameFileType,
}

impl EngineArgs {
    pub fn load_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };
        if let Some(backend) = self.backend {
            config.surface_area_backend = backend;
        }
        trace!("{config:?}");
        Ok(config)
    }

    /// Prepare the structure inside `workdir`.
    pub fn build_engine_in(&self, workdir: WorkDir) -> Result<StructureAnalysis> {
        let chains = parse_chains(&self.chains)?;
        debug!("Using working directory {}", workdir.path().display());
        StructureAnalysis::new(self.load_config()?, workdir, &self.input, &chains)
    }

    pub fn build_engine(&self) -> Result<StructureAnalysis> {
        self.build_engine_in(WorkDir::new(&self.work_dir)?)
    }
}

impl OutputArgs {
    /// Write `df` as `<output>/<name>.<ext>`.
    pub fn save(&self, df: &mut DataFrame, name: &str) -> Result<()> {
        save_in(&self.output, df, name, self.output_format)
    }
}

pub(crate) fn save_in(
    dir: &Path,
    df: &mut DataFrame,
    name: &str,
    format: DataFrameFileType,
) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let output_file = dir.join(name).with_extension(format.to_string());
    write_df_to_file(df, &output_file, format)?;
    info!("Results saved to {}", output_file.display());
    Ok(())
}
