//! # ppi-surface
//!
//! Residue contacts, surface areas, interface areas and secondary structure of protein
//! complexes.
//!
//! A [`StructureAnalysis`] is built for one structure file, a set of chains of interest
//! and a private [`WorkDir`]. Building it splits the structure into per-chain files; the
//! analyses then run external programs (NACCESS, MSMS, POPS, DSSP) on those files and
//! parse their reports into typed records. Every record converts to a Polars DataFrame.
//!
//! ```no_run
//! use ppi_surface::{EngineConfig, StructureAnalysis, WorkDir};
//! use std::path::Path;
//!
//! let chains = vec!["A".to_string(), "B".to_string()];
//! let workdir = WorkDir::for_job("/tmp/ppi", "job-1").unwrap();
//! let engine =
//!     StructureAnalysis::new(EngineConfig::default(), workdir, Path::new("complex.pdb"), &chains)
//!         .unwrap();
//! let contacts = engine.contacts("A", "B", None).unwrap();
//! println!("{} residues of A touch B", contacts.len());
//! ```

mod chains;
pub mod config;
pub mod contacts;
pub mod dssp;
mod engine;
mod error;
pub mod interface;
mod residues;
pub mod retry;
pub mod sasa;
pub mod structure;
pub mod tools;
mod utils;
mod workdir;

pub use chains::{find_chain, ChainExt};
pub use config::{EngineConfig, ToolPaths};
pub use contacts::{
    contacts_to_df, distances_to_df, find_contacts, shortest_interchain_distances, ContactMap,
    ContactPartner, Mutation, ResidueContacts, ResidueDistance,
};
pub use dssp::{
    parse_dssp, secondary_structure_to_df, ChainSecondaryStructure, DsspRunner,
    SecondaryStructure, SecondaryStructureEntry,
};
pub use engine::StructureAnalysis;
pub use error::{AnalysisError, Result};
pub use interface::{interface_area_to_df, InterfaceArea, InterfaceAreaCalculator};
pub use residues::{three_to_one, ResidueExt, ResidueKey};
pub use retry::RetryPolicy;
pub use sasa::{
    buried_to_df, surface_area_to_df, AreaScope, BuriedArea, ReferenceSurfaceTable,
    SurfaceAreaBackend, SurfaceAreaBackendKind, SurfaceAreaComparison, SurfaceAreaReport,
    SurfaceAreaRow,
};
pub use structure::PreparedStructure;
pub use utils::{
    load_model, load_model_from_str, log_pdb_errors, parse_chains, run_with_threads, save_model,
    write_df_to_file, DataFrameFileType,
};
pub use workdir::{safe_name, WorkDir};
