use crate::config::EngineConfig;
use crate::contacts::{find_contacts, shortest_interchain_distances, ContactMap, Mutation, ResidueDistance};
use crate::dssp::{DsspRunner, SecondaryStructure};
use crate::error::Result;
use crate::interface::{InterfaceArea, InterfaceAreaCalculator};
use crate::sasa::{SurfaceAreaBackend, SurfaceAreaComparison};
use crate::structure::PreparedStructure;
use crate::workdir::WorkDir;
use std::path::Path;
use tracing::{debug, info};

/// Analyses of one structure, bound to a private working directory.
///
/// The structure is prepared once when the engine is built. Every analysis then runs on
/// the files written to the working directory.
pub struct StructureAnalysis {
    config: EngineConfig,
    workdir: WorkDir,
    prepared: PreparedStructure,
    surface_area: Box<dyn SurfaceAreaBackend>,
}

impl StructureAnalysis {
    pub fn new(config: EngineConfig, workdir: WorkDir, source: &Path, chains: &[String]) -> Result<Self> {
        let surface_area = config.surface_area_backend.build(&config)?;
        info!(
            "Preparing chains {} of {} in {}",
            chains.join(","),
            source.display(),
            workdir.path().display()
        );
        let prepared = PreparedStructure::prepare(source, chains, &workdir)?;
        debug!("Surface areas will be computed with {}", surface_area.name());
        Ok(Self {
            config,
            workdir,
            prepared,
            surface_area,
        })
    }

    pub fn workdir(&self) -> &WorkDir {
        &self.workdir
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn structure(&self) -> &PreparedStructure {
        &self.prepared
    }

    pub fn chains(&self) -> &[String] {
        self.prepared.chains()
    }

    /// Residue contacts from `chain1` to `chain2`, with the configured cutoff unless given.
    pub fn contacts(&self, chain1: &str, chain2: &str, cutoff: Option<f64>) -> Result<ContactMap> {
        let cutoff = cutoff.unwrap_or(self.config.contact_cutoff);
        find_contacts(self.prepared.structure(), chain1, chain2, cutoff)
    }

    /// Shortest distance of each residue to the other chains of interest.
    pub fn interchain_distances(
        &self,
        chain: Option<&str>,
        mutation: Option<&Mutation>,
    ) -> Result<Vec<ResidueDistance>> {
        shortest_interchain_distances(self.prepared.structure(), chain, mutation)
    }

    /// Surface areas of the chains of interest, separately and together.
    pub fn surface_area(&self) -> Result<SurfaceAreaComparison> {
        SurfaceAreaComparison::compute(self.surface_area.as_ref(), &self.workdir, &self.prepared)
    }

    /// Buried area between the two chains of interest.
    pub fn interface_area(&self) -> Result<InterfaceArea> {
        InterfaceAreaCalculator::new(&self.config.tools.pops).compute(&self.workdir, &self.prepared)
    }

    /// DSSP assignment of the chains-of-interest file.
    pub fn secondary_structure(&self) -> Result<SecondaryStructure> {
        DsspRunner::new(&self.config.tools.dssp, self.config.dssp_retry)
            .compute(&self.workdir, self.prepared.combined_file())
    }
}
