use super::{AreaScope, SurfaceAreaBackend, SurfaceAreaReport, SurfaceAreaRow};
use crate::error::{AnalysisError, Result};
use crate::tools::ExternalTool;
use crate::workdir::{tool_stem, WorkDir};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Backbone atoms left out of the per-residue sums. CA is kept.
const BACKBONE_ATOMS: [&str; 3] = ["N", "C", "O"];

/// Per-residue relative accessibility from the atom table of POPS.
#[derive(Debug, Clone)]
pub struct PopsAtomBackend {
    pops: ExternalTool,
}

impl PopsAtomBackend {
    pub fn new(program: &Path) -> Self {
        Self {
            pops: ExternalTool::new("pops", program),
        }
    }
}

impl SurfaceAreaBackend for PopsAtomBackend {
    fn name(&self) -> &'static str {
        self.pops.name()
    }

    fn compute(&self, workdir: &WorkDir, file_name: &str) -> Result<SurfaceAreaReport> {
        workdir.existing(file_name)?;
        let out_name = format!("{}.out", tool_stem(file_name));
        let output = self.pops.run(
            workdir,
            [
                "--noHeaderOut",
                "--noTotalOut",
                "--atomOut",
                "--pdb",
                file_name,
                "--popsOut",
                out_name.as_str(),
            ],
        )?;
        // POPS may exit non-zero after a complete calculation
        if !output.terminated_cleanly() {
            return Err(output.into_error());
        }
        if !output.stderr.trim().is_empty() {
            warn!("pops reported problems for {file_name}: {}", output.stderr.trim());
        }

        let out = workdir.existing(&out_name).map_err(|_| AnalysisError::ToolInvocation {
            tool: self.name().to_string(),
            status: output.status,
            message: format!("no atom table written to {out_name}"),
        })?;
        let content = std::fs::read_to_string(&out)?;
        parse_atom_table(&content, &out).map(SurfaceAreaReport::new)
    }
}

/// Fold the 11-column atom rows of a POPS table into residues.
///
/// Columns: serial, atom, residue name, chain, residue number, SASA, four per-type
/// columns, and the atom surface. The relative value is SASA over surface in percent.
pub(crate) fn parse_atom_table(content: &str, source: &Path) -> Result<Vec<SurfaceAreaRow>> {
    struct Sums {
        chain: String,
        name: String,
        number: String,
        sasa: f64,
        surface: f64,
    }

    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut residues: Vec<Sums> = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 11 {
            continue;
        }
        if BACKBONE_ATOMS.contains(&fields[1]) {
            continue;
        }
        let number = |i: usize| -> Result<f64> {
            fields[i].parse().map_err(|_| {
                AnalysisError::parse(source, idx + 1, format!("'{}' is not a number", fields[i]))
            })
        };
        let (sasa, surface) = (number(5)?, number(10)?);

        let key = (fields[3].to_string(), fields[4].to_string());
        let pos = *index.entry(key).or_insert_with(|| {
            residues.push(Sums {
                chain: fields[3].to_string(),
                name: fields[2].to_string(),
                number: fields[4].to_string(),
                sasa: 0.0,
                surface: 0.0,
            });
            residues.len() - 1
        });
        residues[pos].sasa += sasa;
        residues[pos].surface += surface;
    }

    Ok(residues
        .into_iter()
        .map(|r| SurfaceAreaRow {
            chain: r.chain,
            scope: AreaScope::Residue {
                name: r.name,
                number: r.number,
            },
            abs_sasa: r.sasa,
            abs_sesa: None,
            rel_sasa: (r.surface > 0.0).then(|| r.sasa / r.surface * 100.0),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_tools::write_script;

    const TABLE: &str = "\
    1    N  ALA  A     1   10.00   1  0  0  0   20.00
    2   CA  ALA  A     1    5.00   1  0  0  0   10.00
    3   CB  ALA  A     1   15.00   1  0  0  0   30.00
    4    C  ALA  A     1    7.00   1  0  0  0    7.00
    5    N  GLY  A     2    2.00   1  0  0  0    4.00
    6   CA  GLY  A     2    0.00   1  0  0  0    0.00
";

    #[test]
    fn test_parse_atom_table() {
        let rows = parse_atom_table(TABLE, Path::new("A.out")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].scope.residue(), Some(("ALA", "1")));
        assert_eq!(rows[0].abs_sasa, 20.0);
        assert_eq!(rows[0].rel_sasa, Some(50.0));
        // Only the backbone N has surface and it is skipped
        assert_eq!(rows[1].rel_sasa, None);
    }

    #[test]
    fn test_run_pops_atoms() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        std::fs::write(wd.path().join("A.pdb"), "END\n").unwrap();
        std::fs::write(bin.path().join("fixture.out"), TABLE).unwrap();
        let script = write_script(
            bin.path(),
            "pops",
            &format!(
                "test \"$5\" = A.pdb || exit 2\ncp {} \"$7\"\necho 'Clean termination'\nexit 1",
                bin.path().join("fixture.out").display()
            ),
        );

        let report = PopsAtomBackend::new(&script).compute(&wd, "A.pdb").unwrap();
        assert_eq!(report.rows.len(), 2);
    }

    #[test]
    fn test_unclean_termination() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        std::fs::write(wd.path().join("A.pdb"), "END\n").unwrap();
        let script = write_script(bin.path(), "pops", "echo 'Segmentation fault' >&2\nexit 139");

        let err = PopsAtomBackend::new(&script).compute(&wd, "A.pdb").unwrap_err();
        assert!(matches!(err, AnalysisError::ToolInvocation { status: Some(139), .. }));
    }
}
