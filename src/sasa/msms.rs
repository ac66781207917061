use super::{AreaScope, ReferenceSurfaceTable, SurfaceAreaBackend, SurfaceAreaReport, SurfaceAreaRow};
use crate::error::{AnalysisError, Result};
use crate::tools::ExternalTool;
use crate::workdir::{tool_stem, WorkDir};
use std::path::Path;
use tracing::debug;

/// Per-atom accessible and excluded areas from MSMS.
///
/// The structure is first converted to an `.xyzrn` atom listing by `pdb_to_xyzrn`.
#[derive(Debug, Clone)]
pub struct MsmsBackend {
    pdb_to_xyzrn: ExternalTool,
    msms: ExternalTool,
    probe_radius: f64,
    reference: ReferenceSurfaceTable,
}

impl MsmsBackend {
    pub fn new(
        pdb_to_xyzrn: &Path,
        msms: &Path,
        probe_radius: f64,
        reference: ReferenceSurfaceTable,
    ) -> Self {
        Self {
            pdb_to_xyzrn: ExternalTool::new("pdb_to_xyzrn", pdb_to_xyzrn),
            msms: ExternalTool::new("msms", msms),
            probe_radius,
            reference,
        }
    }
}

impl SurfaceAreaBackend for MsmsBackend {
    fn name(&self) -> &'static str {
        self.msms.name()
    }

    fn compute(&self, workdir: &WorkDir, file_name: &str) -> Result<SurfaceAreaReport> {
        workdir.existing(file_name)?;
        let stem = tool_stem(file_name);

        let listing = self.pdb_to_xyzrn.run_checked(workdir, [file_name])?;
        let xyzrn_name = format!("{stem}.xyzrn");
        std::fs::write(workdir.file(&xyzrn_name)?, listing.stdout.as_bytes())?;
        debug!("Wrote {} atoms to {xyzrn_name}", listing.stdout.lines().count());

        let area_name = format!("{stem}.area");
        let probe_radius = self.probe_radius.to_string();
        let output = self.msms.run_checked(
            workdir,
            [
                "-probe_radius",
                probe_radius.as_str(),
                "-surface",
                "ases",
                "-if",
                xyzrn_name.as_str(),
                "-af",
                area_name.as_str(),
            ],
        )?;

        let area = workdir.file(&area_name)?;
        if !area.is_file() {
            return Err(AnalysisError::ToolInvocation {
                tool: self.name().to_string(),
                status: output.status,
                message: format!("no atom areas written to {}", area.display()),
            });
        }
        let content = std::fs::read_to_string(&area)?;
        let rows = parse_area(&content, &area, &self.reference)?;
        Ok(SurfaceAreaReport::new(rows).with_reference(self.reference.clone()))
    }
}

/// Read an MSMS `.area` file.
///
/// After a header line, every row holds the 0-based atom index, the excluded and the
/// accessible area and an `atom_resname_resnum_chain` label.
pub(crate) fn parse_area(
    content: &str,
    source: &Path,
    reference: &ReferenceSurfaceTable,
) -> Result<Vec<SurfaceAreaRow>> {
    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate().skip(1) {
        let line_no = idx + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 4 {
            return Err(AnalysisError::parse(
                source,
                line_no,
                format!("expected 4 fields, found {}", fields.len()),
            ));
        }
        let number = |i: usize| -> Result<f64> {
            fields[i].parse().map_err(|_| {
                AnalysisError::parse(source, line_no, format!("'{}' is not a number", fields[i]))
            })
        };
        let index: usize = fields[0].parse().map_err(|_| {
            AnalysisError::parse(source, line_no, format!("bad atom index '{}'", fields[0]))
        })?;
        let abs_sesa = number(1)?;
        let abs_sasa = number(2)?;

        let label: Vec<&str> = fields[3].split('_').collect();
        if label.len() < 4 {
            return Err(AnalysisError::parse(
                source,
                line_no,
                format!("'{}' is not an atom_resname_resnum_chain label", fields[3]),
            ));
        }
        let residue_name = label[1].trim().to_string();
        rows.push(SurfaceAreaRow {
            chain: label[3].to_string(),
            rel_sasa: Some(reference.relative(&residue_name, abs_sasa)),
            scope: AreaScope::Atom {
                residue_name,
                residue_number: label[2].to_string(),
                atom_name: label[0].trim().to_string(),
                serial: index + 1,
            },
            abs_sasa,
            abs_sesa: Some(abs_sesa),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_tools::write_script;

    const AREA: &str = "\
    Atom Ses_A2 Sas_A2
    0   10.000   25.000 N_ALA_1_A
    1    5.000   25.000 CA_ALA_1_A
    2    1.000    4.000 N_MSE_2_A
";

    fn reference() -> ReferenceSurfaceTable {
        ReferenceSurfaceTable::parse("header\nx x x ALA 100.0\n", Path::new("standard.data")).unwrap()
    }

    #[test]
    fn test_parse_area() {
        let rows = parse_area(AREA, Path::new("A.area"), &reference()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0].scope,
            AreaScope::Atom {
                residue_name: "ALA".to_string(),
                residue_number: "1".to_string(),
                atom_name: "N".to_string(),
                serial: 1,
            }
        );
        assert_eq!(rows[0].abs_sesa, Some(10.0));
        assert_eq!(rows[0].abs_sasa, 25.0);
        assert_eq!(rows[0].rel_sasa, Some(25.0));
        // No reference for MSE
        assert_eq!(rows[2].rel_sasa, Some(100.0));

        let residues = SurfaceAreaReport::new(rows)
            .with_reference(reference())
            .by_residue();
        assert_eq!(residues[0].abs_sasa, 50.0);
        assert_eq!(residues[0].rel_sasa, Some(50.0));
        assert_eq!(residues[0].abs_sesa, Some(15.0));
        assert_eq!(residues[1].rel_sasa, Some(100.0));
    }

    #[test]
    fn test_bad_label() {
        let err = parse_area("header\n 0 1.0 2.0 N_ALA\n", Path::new("A.area"), &reference())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Parse { line: 2, .. }), "{err}");
    }

    #[test]
    fn test_run_msms() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        std::fs::write(wd.path().join("AB.pdb"), "END\n").unwrap();
        std::fs::write(bin.path().join("fixture.area"), AREA).unwrap();

        let to_xyzrn = write_script(
            bin.path(),
            "pdb_to_xyzrn",
            "test -f \"$1\" || exit 2\necho '1.0 2.0 3.0 1.65 1 N_ALA_1_A'",
        );
        // msms -probe_radius r -surface ases -if in -af out
        let msms = write_script(
            bin.path(),
            "msms",
            &format!(
                "test \"$2\" = 1.4 || exit 3\ntest -s \"$6\" || exit 4\ncp {} \"$8\"",
                bin.path().join("fixture.area").display()
            ),
        );

        let backend = MsmsBackend::new(&to_xyzrn, &msms, 1.4, reference());
        let report = backend.compute(&wd, "AB.pdb").unwrap();
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.reference, Some(reference()));
        let xyzrn = std::fs::read_to_string(wd.path().join("AB.xyzrn")).unwrap();
        assert!(xyzrn.contains("N_ALA_1_A"));
    }

    #[test]
    fn test_conversion_failure() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        std::fs::write(wd.path().join("A.pdb"), "END\n").unwrap();
        let to_xyzrn = write_script(bin.path(), "pdb_to_xyzrn", "echo 'no atoms' >&2\nexit 1");
        let msms = write_script(bin.path(), "msms", "exit 0");

        let err = MsmsBackend::new(&to_xyzrn, &msms, 1.4, reference())
            .compute(&wd, "A.pdb")
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ToolInvocation { ref tool, status: Some(1), .. } if tool == "pdb_to_xyzrn"
        ));
    }
}
