use super::{AreaScope, SurfaceAreaBackend, SurfaceAreaReport, SurfaceAreaRow};
use crate::error::{AnalysisError, Result};
use crate::tools::ExternalTool;
use crate::workdir::{tool_stem, WorkDir};
use std::path::Path;
use tracing::debug;

/// Per-residue accessibility from the NACCESS `.rsa` report.
#[derive(Debug, Clone)]
pub struct NaccessBackend {
    naccess: ExternalTool,
}

impl NaccessBackend {
    pub fn new(program: &Path) -> Self {
        Self {
            naccess: ExternalTool::new("naccess", program),
        }
    }
}

impl SurfaceAreaBackend for NaccessBackend {
    fn name(&self) -> &'static str {
        self.naccess.name()
    }

    fn compute(&self, workdir: &WorkDir, file_name: &str) -> Result<SurfaceAreaReport> {
        workdir.existing(file_name)?;
        let output = self.naccess.run_checked(workdir, [file_name])?;
        debug!("naccess finished: {}", output.last_line().unwrap_or_default());

        let rsa = workdir.file_with_extension(tool_stem(file_name), "rsa")?;
        if !rsa.is_file() {
            return Err(AnalysisError::ToolInvocation {
                tool: self.name().to_string(),
                status: output.status,
                message: format!("no report written to {}", rsa.display()),
            });
        }
        let content = std::fs::read_to_string(&rsa)?;
        parse_rsa(&content, &rsa).map(SurfaceAreaReport::new)
    }
}

/// Read the `RES` lines of an `.rsa` report.
///
/// Columns: `RES`, residue name, chain, number, then absolute and relative values for
/// all atoms, side chain, main chain, non-polar and polar atoms. Side chain values are kept.
pub(crate) fn parse_rsa(content: &str, source: &Path) -> Result<Vec<SurfaceAreaRow>> {
    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() != Some(&"RES") {
            continue;
        }
        if fields.len() != 14 {
            return Err(AnalysisError::parse(
                source,
                idx + 1,
                format!("expected 14 fields in a RES line, found {}", fields.len()),
            ));
        }
        let abs_sasa: f64 = fields[6].parse().map_err(|_| {
            AnalysisError::parse(source, idx + 1, format!("bad side chain area '{}'", fields[6]))
        })?;
        let rel_sasa = match fields[7] {
            "N/A" => None,
            value => Some(value.parse::<f64>().map_err(|_| {
                AnalysisError::parse(source, idx + 1, format!("bad relative area '{value}'"))
            })?),
        };
        rows.push(SurfaceAreaRow {
            chain: fields[2].to_string(),
            scope: AreaScope::Residue {
                name: fields[1].to_string(),
                number: fields[3].to_string(),
            },
            abs_sasa,
            abs_sesa: None,
            rel_sasa,
        });
    }
    Ok(rows)
}
