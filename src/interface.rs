//! Buried interface area from POPS runs on the complex and on each partner.

use crate::error::{AnalysisError, Result};
use crate::structure::PreparedStructure;
use crate::tools::{ExternalTool, ToolOutput};
use crate::workdir::{tool_stem, WorkDir};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, error, info};

/// Printed by POPS when atoms overlap, the areas are unreliable in that case.
const ATOM_DISTANCE_WARNING: &str =
    "Warning: Atom distance too short! Probably incorrect POPS results!";

/// Surface area split by atom type, in Å².
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InterfaceArea {
    pub hydrophobic: f64,
    pub hydrophilic: f64,
    pub total: f64,
}

impl InterfaceArea {
    /// Returned when POPS failed and no area could be computed.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Half of the area the two partners lose when they form `complex`.
    pub fn buried(first: &Self, second: &Self, complex: &Self) -> Self {
        let half_diff = |a: f64, b: f64, c: f64| (a + b - c) / 2.0;
        Self {
            hydrophobic: half_diff(first.hydrophobic, second.hydrophobic, complex.hydrophobic),
            hydrophilic: half_diff(first.hydrophilic, second.hydrophilic, complex.hydrophilic),
            total: half_diff(first.total, second.total, complex.total),
        }
    }
}

/// Runs `pops --chainOut` and reads the summary areas.
#[derive(Debug, Clone)]
pub struct InterfaceAreaCalculator {
    pops: ExternalTool,
}

impl InterfaceAreaCalculator {
    pub fn new(program: &Path) -> Self {
        Self {
            pops: ExternalTool::new("pops", program),
        }
    }

    /// Interface area between the two chains of interest.
    ///
    /// A POPS run that exits non-zero without announcing a clean termination gives
    /// [`InterfaceArea::zero`] instead of an error. A POPS that cannot be started, or a
    /// run that leaves no area summary behind, is still an error.
    pub fn compute(&self, workdir: &WorkDir, prepared: &PreparedStructure) -> Result<InterfaceArea> {
        let chain_files = prepared.chain_files();
        if chain_files.len() != 2 {
            return Err(AnalysisError::Configuration(format!(
                "Interface area needs exactly two chains, got {}",
                prepared.chains().join(",")
            )));
        }

        let mut areas = Vec::with_capacity(3);
        for file in [
            prepared.combined_file(),
            chain_files[0].as_str(),
            chain_files[1].as_str(),
        ] {
            match self.total_area(workdir, file)? {
                Some(area) => areas.push(area),
                None => return Ok(InterfaceArea::zero()),
            }
        }
        let interface = InterfaceArea::buried(&areas[1], &areas[2], &areas[0]);
        info!(
            "Interface area of {}: {:.2} Å² ({:.2} hydrophobic, {:.2} hydrophilic)",
            prepared.chains().join("/"),
            interface.total,
            interface.hydrophobic,
            interface.hydrophilic
        );
        Ok(interface)
    }

    /// Summary areas of one file, `None` after a failed POPS run.
    fn total_area(&self, workdir: &WorkDir, file_name: &str) -> Result<Option<InterfaceArea>> {
        workdir.existing(file_name)?;
        let out_name = format!("{}.out", tool_stem(file_name));
        let output = self.pops.run(
            workdir,
            ["--chainOut", "--pdb", file_name, "--popsOut", out_name.as_str()],
        )?;
        if output.stderr.contains(ATOM_DISTANCE_WARNING) {
            error!("{ATOM_DISTANCE_WARNING} ({file_name})");
        }
        if failed(&output) {
            error!("POPS failed on {file_name}: {output}");
            return Ok(None);
        }
        debug!("pops exit status {:?} for {file_name}", output.status);

        let out = workdir.existing(&out_name).map_err(|_| AnalysisError::ToolInvocation {
            tool: self.pops.name().to_string(),
            status: output.status,
            message: format!("no areas written to {out_name}"),
        })?;
        let content = std::fs::read_to_string(&out)?;
        parse_area_summary(&content, &out).map(Some)
    }
}

fn failed(output: &ToolOutput) -> bool {
    !output.success() && !output.terminated_cleanly()
}

/// Read the `hydrophobic:`, `hydrophilic:` and `total:` lines of a POPS summary.
/// The last occurrence of each wins.
pub(crate) fn parse_area_summary(content: &str, source: &Path) -> Result<InterfaceArea> {
    let (mut hydrophobic, mut hydrophilic, mut total) = (None, None, None);
    for (idx, line) in content.lines().enumerate() {
        let key = line.split(' ').next().unwrap_or_default();
        let slot = match key {
            "hydrophobic:" => &mut hydrophobic,
            "hydrophilic:" => &mut hydrophilic,
            "total:" => &mut total,
            _ => continue,
        };
        let value = line.split_whitespace().nth(1).ok_or_else(|| {
            AnalysisError::parse(source, idx + 1, format!("no value after '{key}'"))
        })?;
        *slot = Some(value.parse::<f64>().map_err(|_| {
            AnalysisError::parse(source, idx + 1, format!("'{value}' is not a number"))
        })?);
    }

    let require = |value: Option<f64>, key: &str| {
        value.ok_or_else(|| AnalysisError::parse(source, 0, format!("missing '{key}' line")))
    };
    Ok(InterfaceArea {
        hydrophobic: require(hydrophobic, "hydrophobic:")?,
        hydrophilic: require(hydrophilic, "hydrophilic:")?,
        total: require(total, "total:")?,
    })
}

pub fn interface_area_to_df(chains: &[String], area: &InterfaceArea) -> Result<DataFrame> {
    let df = df!(
        "chains" => [chains.join(",")],
        "hydrophobic" => [area.hydrophobic],
        "hydrophilic" => [area.hydrophilic],
        "total" => [area.total],
    )?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_tools::write_script;
    use crate::utils::test_data;

    fn summary(hydrophobic: f64, hydrophilic: f64, total: f64) -> String {
        format!(
            "=== SUMMARY ===\nhydrophobic: {hydrophobic:.2}\nhydrophilic: {hydrophilic:.2}\ntotal: {total:.2}\n"
        )
    }

    #[test]
    fn test_buried_identity() {
        let first = InterfaceArea {
            hydrophobic: 10.0,
            hydrophilic: 10.0,
            total: 10.0,
        };
        let second = InterfaceArea {
            hydrophobic: 12.0,
            hydrophilic: 12.0,
            total: 12.0,
        };
        let complex = InterfaceArea {
            hydrophobic: 18.0,
            hydrophilic: 18.0,
            total: 18.0,
        };
        let buried = InterfaceArea::buried(&first, &second, &complex);
        assert_eq!(buried.hydrophobic, 2.0);
        assert_eq!(buried.hydrophilic, 2.0);
        assert_eq!(buried.total, 2.0);
    }

    #[test]
    fn test_parse_summary() {
        let content = "hydrophobic: 1.0\nhydrophilic: 2.0\ntotal: 3.0\n  total: 99.0\ntotal: 4.5\n";
        let area = parse_area_summary(content, Path::new("AB.out")).unwrap();
        assert_eq!(
            area,
            InterfaceArea {
                hydrophobic: 1.0,
                hydrophilic: 2.0,
                total: 4.5
            }
        );
    }

    #[test]
    fn test_missing_key() {
        let err = parse_area_summary("hydrophobic: 1.0\ntotal: 3.0\n", Path::new("AB.out")).unwrap_err();
        assert!(matches!(err, AnalysisError::Parse { .. }));
    }

    fn prepared(wd: &WorkDir) -> PreparedStructure {
        let chains = vec!["A".to_string(), "B".to_string()];
        PreparedStructure::prepare(&test_data("two_chains.pdb"), &chains, wd).unwrap()
    }

    /// A fake `pops --chainOut --pdb X.pdb --popsOut X.out` copying `<X>.summary` from `bin`.
    fn fake_pops(bin: &Path, tail: &str) -> std::path::PathBuf {
        for (stem, areas) in [
            ("AB", (18.0, 18.0, 36.0)),
            ("A", (10.0, 8.0, 18.0)),
            ("B", (12.0, 14.0, 26.0)),
        ] {
            std::fs::write(
                bin.join(format!("{stem}.summary")),
                summary(areas.0, areas.1, areas.2),
            )
            .unwrap();
        }
        write_script(
            bin,
            "pops",
            &format!(
                "cp {}/\"${{3%.pdb}}.summary\" \"$5\"\n{tail}",
                bin.display()
            ),
        )
    }

    #[test]
    fn test_interface_area() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        let prepared = prepared(&wd);
        // Non-zero exit after a complete run is fine
        let pops = fake_pops(bin.path(), "echo 'Clean termination'\nexit 1");

        let area = InterfaceAreaCalculator::new(&pops)
            .compute(&wd, &prepared)
            .unwrap();
        assert_eq!(area.hydrophobic, 2.0);
        assert_eq!(area.hydrophilic, 2.0);
        assert_eq!(area.total, 4.0);
        assert!(wd.path().join("AB.out").is_file());
    }

    #[test]
    fn test_failed_pops_gives_zero() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        let prepared = prepared(&wd);
        let pops = fake_pops(
            bin.path(),
            &format!("echo '{ATOM_DISTANCE_WARNING}' >&2\necho 'Aborted'\nexit 2"),
        );

        let area = InterfaceAreaCalculator::new(&pops)
            .compute(&wd, &prepared)
            .unwrap();
        assert!(area.is_zero());
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        let prepared = prepared(&wd);
        let err = InterfaceAreaCalculator::new(Path::new("/nonexistent/pops"))
            .compute(&wd, &prepared)
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ToolInvocation { status: None, .. }
        ));
    }

    #[test]
    fn test_needs_two_chains() {
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        let prepared =
            PreparedStructure::prepare(&test_data("two_chains.pdb"), &["A".to_string()], &wd)
                .unwrap();
        let err = InterfaceAreaCalculator::new(Path::new("pops"))
            .compute(&wd, &prepared)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
    }

    #[test]
    fn test_interface_area_to_df() {
        let df = interface_area_to_df(&["A".to_string(), "B".to_string()], &InterfaceArea::zero())
            .unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 4);
    }
}
