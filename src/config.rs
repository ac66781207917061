//! Engine configuration: external tool locations and tunables.
//!
//! Every field has a default so an empty TOML document is a valid configuration:
//!
//! ```toml
//! surface_area_backend = "msms"
//! probe_radius = 1.4
//!
//! [tools]
//! dssp = "/opt/dssp/bin/mkdssp"
//!
//! [dssp_retry]
//! max_attempts = 5
//! cooldown_secs = 60
//! ```

use crate::error::{AnalysisError, Result};
use crate::retry::RetryPolicy;
use crate::sasa::SurfaceAreaBackendKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default distance cutoff (Å) for residue contacts.
pub const DEFAULT_CONTACT_CUTOFF: f64 = 5.0;
/// Default solvent probe radius (Å).
pub const DEFAULT_PROBE_RADIUS: f64 = 1.4;

/// Programs invoked by the engine. Bare names are looked up on `PATH`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub naccess: PathBuf,
    pub pdb_to_xyzrn: PathBuf,
    pub msms: PathBuf,
    pub pops: PathBuf,
    pub dssp: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            naccess: PathBuf::from("naccess"),
            pdb_to_xyzrn: PathBuf::from("pdb_to_xyzrn"),
            msms: PathBuf::from("msms"),
            pops: PathBuf::from("pops"),
            dssp: PathBuf::from("dssp"),
        }
    }
}

impl ToolPaths {
    /// Resolve every tool inside a single directory of binaries.
    pub fn in_dir(dir: &Path) -> Self {
        let defaults = Self::default();
        Self {
            naccess: dir.join(defaults.naccess),
            pdb_to_xyzrn: dir.join(defaults.pdb_to_xyzrn),
            msms: dir.join(defaults.msms),
            pops: dir.join(defaults.pops),
            dssp: dir.join(defaults.dssp),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tools: ToolPaths,
    /// Back end used by the surface area analysis
    pub surface_area_backend: SurfaceAreaBackendKind,
    /// Probe radius passed to MSMS
    pub probe_radius: f64,
    /// Distance cutoff used when none is given to the contact search
    pub contact_cutoff: f64,
    /// Reference accessibilities in `standard.data` layout; built-in values when absent
    pub reference_table: Option<PathBuf>,
    /// Retry budget for DSSP
    pub dssp_retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            surface_area_backend: SurfaceAreaBackendKind::default(),
            probe_radius: DEFAULT_PROBE_RADIUS,
            contact_cutoff: DEFAULT_CONTACT_CUTOFF,
            reference_table: None,
            dssp_retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AnalysisError::Configuration(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AnalysisError::Configuration(msg) => {
                AnalysisError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }
}
