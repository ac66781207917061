//! Solvent accessible and excluded surface areas computed by external programs.
//!
//! Each back end turns one structure file of the working directory into a
//! [`SurfaceAreaReport`] of typed rows. Reports are then folded per residue or per chain.
pub mod msms;
pub mod naccess;
pub mod pops;
pub mod reference;

pub use msms::MsmsBackend;
pub use naccess::NaccessBackend;
pub use pops::PopsAtomBackend;
pub use reference::ReferenceSurfaceTable;

use crate::config::EngineConfig;
use crate::error::{AnalysisError, Result};
use crate::structure::PreparedStructure;
use crate::workdir::WorkDir;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// An external program computing surface areas for a structure file.
pub trait SurfaceAreaBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Compute the areas of `file_name`, which must already exist inside `workdir`.
    fn compute(&self, workdir: &WorkDir, file_name: &str) -> Result<SurfaceAreaReport>;
}

/// Available surface area back ends.
#[derive(
    clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceAreaBackendKind {
    /// Per-residue side chain accessibility
    Naccess,
    /// Per-atom accessible and excluded areas
    #[default]
    Msms,
    /// Per-atom accessibility folded into per-residue percentages
    Pops,
}

impl fmt::Display for SurfaceAreaBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SurfaceAreaBackendKind::Naccess => write!(f, "naccess"),
            SurfaceAreaBackendKind::Msms => write!(f, "msms"),
            SurfaceAreaBackendKind::Pops => write!(f, "pops"),
        }
    }
}

impl std::str::FromStr for SurfaceAreaBackendKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "naccess" => Ok(Self::Naccess),
            "msms" => Ok(Self::Msms),
            "pops" => Ok(Self::Pops),
            other => Err(AnalysisError::Configuration(format!(
                "Unknown surface area program '{other}'"
            ))),
        }
    }
}

impl SurfaceAreaBackendKind {
    /// Instantiate the back end with the tool locations of `config`.
    pub fn build(self, config: &EngineConfig) -> Result<Box<dyn SurfaceAreaBackend>> {
        let backend: Box<dyn SurfaceAreaBackend> = match self {
            SurfaceAreaBackendKind::Naccess => Box::new(NaccessBackend::new(&config.tools.naccess)),
            SurfaceAreaBackendKind::Msms => {
                let reference = match &config.reference_table {
                    Some(path) => ReferenceSurfaceTable::from_file(path)?,
                    None => ReferenceSurfaceTable::default(),
                };
                Box::new(MsmsBackend::new(
                    &config.tools.pdb_to_xyzrn,
                    &config.tools.msms,
                    config.probe_radius,
                    reference,
                ))
            }
            SurfaceAreaBackendKind::Pops => Box::new(PopsAtomBackend::new(&config.tools.pops)),
        };
        Ok(backend)
    }
}

/// What a row of a [`SurfaceAreaReport`] describes.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaScope {
    Chain,
    Residue {
        name: String,
        number: String,
    },
    Atom {
        residue_name: String,
        residue_number: String,
        atom_name: String,
        serial: usize,
    },
}

impl AreaScope {
    /// Residue name and number, `None` for whole chains.
    pub fn residue(&self) -> Option<(&str, &str)> {
        match self {
            AreaScope::Chain => None,
            AreaScope::Residue { name, number } => Some((name, number)),
            AreaScope::Atom {
                residue_name,
                residue_number,
                ..
            } => Some((residue_name, residue_number)),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AreaScope::Chain => "chain",
            AreaScope::Residue { .. } => "residue",
            AreaScope::Atom { .. } => "atom",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceAreaRow {
    pub chain: String,
    pub scope: AreaScope,
    /// Solvent accessible area in Å²
    pub abs_sasa: f64,
    /// Solvent excluded area in Å², if the back end reports it
    pub abs_sesa: Option<f64>,
    /// Accessible area relative to the reference, in percent
    pub rel_sasa: Option<f64>,
}

/// Rows produced by one or more back end runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceAreaReport {
    pub rows: Vec<SurfaceAreaRow>,
    /// Table the relative areas of atom rows were computed with
    pub reference: Option<ReferenceSurfaceTable>,
}

fn add_optional(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

impl SurfaceAreaReport {
    pub fn new(rows: Vec<SurfaceAreaRow>) -> Self {
        Self {
            rows,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: ReferenceSurfaceTable) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Append the rows of another report.
    pub fn extend(&mut self, other: SurfaceAreaReport) {
        self.rows.extend(other.rows);
        if self.reference.is_none() {
            self.reference = other.reference;
        }
    }

    /// Sum the rows per (chain, residue name, residue number), keeping first-seen order.
    /// Chain level rows are dropped.
    ///
    /// With a reference table the relative area is taken from the summed accessible area,
    /// otherwise the relative values of the rows are added up.
    pub fn by_residue(&self) -> Vec<SurfaceAreaRow> {
        let mut index: HashMap<(String, String, String), usize> = HashMap::new();
        let mut residues: Vec<SurfaceAreaRow> = Vec::new();
        for row in &self.rows {
            let Some((name, number)) = row.scope.residue() else {
                continue;
            };
            let key = (row.chain.clone(), name.to_string(), number.to_string());
            match index.get(&key) {
                Some(&idx) => {
                    let acc = &mut residues[idx];
                    acc.abs_sasa += row.abs_sasa;
                    acc.abs_sesa = add_optional(acc.abs_sesa, row.abs_sesa);
                    acc.rel_sasa = add_optional(acc.rel_sasa, row.rel_sasa);
                }
                None => {
                    index.insert(key, residues.len());
                    residues.push(SurfaceAreaRow {
                        chain: row.chain.clone(),
                        scope: AreaScope::Residue {
                            name: name.to_string(),
                            number: number.to_string(),
                        },
                        ..row.clone()
                    });
                }
            }
        }
        if let Some(reference) = &self.reference {
            for row in &mut residues {
                if let AreaScope::Residue { name, .. } = &row.scope {
                    row.rel_sasa = Some(reference.relative(name, row.abs_sasa));
                }
            }
        }
        residues
    }

    /// Total absolute areas per chain, in first-seen order.
    pub fn by_chain(&self) -> Vec<SurfaceAreaRow> {
        let mut chains: Vec<SurfaceAreaRow> = Vec::new();
        for row in self.by_residue() {
            match chains.iter_mut().find(|c| c.chain == row.chain) {
                Some(acc) => {
                    acc.abs_sasa += row.abs_sasa;
                    acc.abs_sesa = add_optional(acc.abs_sesa, row.abs_sesa);
                }
                None => chains.push(SurfaceAreaRow {
                    chain: row.chain,
                    scope: AreaScope::Chain,
                    abs_sasa: row.abs_sasa,
                    abs_sesa: row.abs_sesa,
                    rel_sasa: None,
                }),
            }
        }
        chains
    }

    /// Relative accessibility of every residue, grouped by chain in residue order.
    pub fn relative_by_chain(&self) -> Vec<(String, Vec<Option<f64>>)> {
        let mut chains: Vec<(String, Vec<Option<f64>>)> = Vec::new();
        for row in self.by_residue() {
            match chains.iter_mut().find(|(c, _)| *c == row.chain) {
                Some((_, values)) => values.push(row.rel_sasa),
                None => chains.push((row.chain, vec![row.rel_sasa])),
            }
        }
        chains
    }
}

/// Area of a residue with its chain alone and within the complex.
#[derive(Debug, Clone, PartialEq)]
pub struct BuriedArea {
    pub chain: String,
    pub residue_name: String,
    pub residue_number: String,
    pub separate: f64,
    pub together: f64,
}

impl BuriedArea {
    /// Accessible area lost when the chains come together
    pub fn buried(&self) -> f64 {
        self.separate - self.together
    }
}

/// Surface areas of the chains of interest run one by one and run together.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceAreaComparison {
    /// Chain files, concatenated in chain selection order
    pub separate: SurfaceAreaReport,
    /// The chains-of-interest file
    pub together: SurfaceAreaReport,
}

impl SurfaceAreaComparison {
    /// Run `backend` on every chain file and on the combined file of `prepared`.
    ///
    /// With a single chain of interest both sides come from the same run.
    pub fn compute(
        backend: &dyn SurfaceAreaBackend,
        workdir: &WorkDir,
        prepared: &PreparedStructure,
    ) -> Result<Self> {
        let mut separate = SurfaceAreaReport::default();
        for file in prepared.chain_files() {
            debug!("Running {} on {file}", backend.name());
            separate.extend(backend.compute(workdir, &file)?);
        }

        let together = if prepared.chains().len() > 1 {
            debug!("Running {} on {}", backend.name(), prepared.combined_file());
            backend.compute(workdir, prepared.combined_file())?
        } else {
            separate.clone()
        };
        info!(
            "Computed surface areas with {} for chains {}",
            backend.name(),
            prepared.chains().join(",")
        );
        Ok(Self { separate, together })
    }

    /// Per residue accessible area of the separate chains against the complex.
    pub fn buried_by_residue(&self) -> Vec<BuriedArea> {
        let together: HashMap<(String, String, String), f64> = self
            .together
            .by_residue()
            .into_iter()
            .filter_map(|row| {
                let (name, number) = row.scope.residue()?;
                Some(((row.chain.clone(), name.to_string(), number.to_string()), row.abs_sasa))
            })
            .collect();

        self.separate
            .by_residue()
            .into_iter()
            .filter_map(|row| {
                let (name, number) = row.scope.residue()?;
                let key = (row.chain.clone(), name.to_string(), number.to_string());
                together.get(&key).map(|&t| BuriedArea {
                    chain: row.chain.clone(),
                    residue_name: name.to_string(),
                    residue_number: number.to_string(),
                    separate: row.abs_sasa,
                    together: t,
                })
            })
            .collect()
    }
}

/// One row per area record, atom columns left empty for residues and chains.
pub fn surface_area_to_df(rows: &[SurfaceAreaRow]) -> Result<DataFrame> {
    let atom = |row: &SurfaceAreaRow| match &row.scope {
        AreaScope::Atom {
            atom_name, serial, ..
        } => (Some(atom_name.clone()), Some(*serial as u32)),
        _ => (None, None),
    };
    let df = df!(
        "scope" => rows.iter().map(|r| r.scope.label()).collect::<Vec<&str>>(),
        "chain" => rows.iter().map(|r| r.chain.clone()).collect::<Vec<String>>(),
        "resn" => rows.iter().map(|r| r.scope.residue().map(|(n, _)| n.to_string())).collect::<Vec<Option<String>>>(),
        "resi" => rows.iter().map(|r| r.scope.residue().map(|(_, i)| i.to_string())).collect::<Vec<Option<String>>>(),
        "atomn" => rows.iter().map(|r| atom(r).0).collect::<Vec<Option<String>>>(),
        "atomi" => rows.iter().map(|r| atom(r).1).collect::<Vec<Option<u32>>>(),
        "abs_sasa" => rows.iter().map(|r| r.abs_sasa).collect::<Vec<f64>>(),
        "abs_sesa" => rows.iter().map(|r| r.abs_sesa).collect::<Vec<Option<f64>>>(),
        "rel_sasa" => rows.iter().map(|r| r.rel_sasa).collect::<Vec<Option<f64>>>(),
    )?;
    Ok(df)
}

/// Per residue buried accessible area.
pub fn buried_to_df(buried: &[BuriedArea]) -> Result<DataFrame> {
    let df = df!(
        "chain" => buried.iter().map(|b| b.chain.clone()).collect::<Vec<String>>(),
        "resn" => buried.iter().map(|b| b.residue_name.clone()).collect::<Vec<String>>(),
        "resi" => buried.iter().map(|b| b.residue_number.clone()).collect::<Vec<String>>(),
        "sasa_separate" => buried.iter().map(|b| b.separate).collect::<Vec<f64>>(),
        "sasa_together" => buried.iter().map(|b| b.together).collect::<Vec<f64>>(),
        "buried" => buried.iter().map(|b| b.buried()).collect::<Vec<f64>>(),
    )?;
    Ok(df)
}
