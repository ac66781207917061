//! Secondary structure and accessibility assigned by DSSP.

use crate::error::{AnalysisError, Result};
use crate::retry::{Exhausted, RetryPolicy};
use crate::tools::ExternalTool;
use crate::workdir::WorkDir;
use polars::prelude::*;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// DSSP output file inside the working directory.
pub const DSSP_OUTPUT: &str = "dssp_results.txt";

/// Printed by DSSP when it cannot get a thread, usually on a crowded node.
const RESOURCE_ERROR: &str = "boost::thread_resource_error";

/// One residue of the DSSP table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryStructureEntry {
    pub residue_number: i32,
    pub insertion_code: Option<char>,
    pub chain: String,
    pub amino_acid: char,
    /// DSSP structure code, `-` when none was assigned
    pub structure: char,
    /// Accessible surface in Å²
    pub accessibility: i32,
}

/// Structure string and accessibilities of one chain, residue by residue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSecondaryStructure {
    pub chain: String,
    pub structure: String,
    pub accessibility: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondaryStructure {
    pub entries: Vec<SecondaryStructureEntry>,
}

impl SecondaryStructure {
    /// Entries grouped per chain, chains in order of first appearance.
    pub fn by_chain(&self) -> Vec<ChainSecondaryStructure> {
        let mut chains: Vec<ChainSecondaryStructure> = Vec::new();
        for entry in &self.entries {
            let idx = match chains.iter().position(|c| c.chain == entry.chain) {
                Some(idx) => idx,
                None => {
                    chains.push(ChainSecondaryStructure {
                        chain: entry.chain.clone(),
                        structure: String::new(),
                        accessibility: Vec::new(),
                    });
                    chains.len() - 1
                }
            };
            chains[idx].structure.push(entry.structure);
            chains[idx].accessibility.push(entry.accessibility);
        }
        chains
    }
}

/// Runs DSSP on the chains of interest, retrying failed runs.
#[derive(Debug, Clone)]
pub struct DsspRunner {
    dssp: ExternalTool,
    retry: RetryPolicy,
}

impl DsspRunner {
    pub fn new(program: &Path, retry: RetryPolicy) -> Self {
        Self {
            dssp: ExternalTool::new("dssp", program),
            retry,
        }
    }

    /// Assign secondary structure to `file_name`, waiting the retry cooldown between attempts.
    pub fn compute(&self, workdir: &WorkDir, file_name: &str) -> Result<SecondaryStructure> {
        self.compute_with_sleep(workdir, file_name, std::thread::sleep)
    }

    /// Same as [`DsspRunner::compute`], with a caller-provided way of waiting.
    ///
    /// When every attempt fails with the thread resource error, [`AnalysisError::Resource`]
    /// is returned, whatever the exit status. Any other failure only produces a warning and
    /// the output of the last attempt is read. A program that cannot be started is not retried.
    pub fn compute_with_sleep<S>(
        &self,
        workdir: &WorkDir,
        file_name: &str,
        sleep: S,
    ) -> Result<SecondaryStructure>
    where
        S: FnMut(Duration),
    {
        workdir.existing(file_name)?;
        let output_file = workdir.file(DSSP_OUTPUT)?;
        if output_file.is_file() {
            std::fs::remove_file(&output_file)?;
        }

        // Outer `Ok` ends the retries: either DSSP ran fine or it could not be started.
        let result = self.retry.run_with_sleep(sleep, |attempt| {
            debug!("dssp attempt {attempt}");
            match self.dssp.run(workdir, ["-i", file_name, "-o", DSSP_OUTPUT]) {
                Ok(output) if output.success() => Ok(Ok(output)),
                Ok(output) => Err(output),
                Err(e) => Ok(Err(e)),
            }
        });

        match result {
            Ok(Ok(_)) => info!("dssp finished for {file_name}"),
            Ok(Err(e)) => return Err(e),
            Err(Exhausted { attempts, last }) => {
                // The exit status is lost when the uncaught exception aborts the process.
                if last.stderr.contains(RESOURCE_ERROR) || last.stdout.contains(RESOURCE_ERROR) {
                    return Err(AnalysisError::Resource {
                        tool: last.tool.to_string(),
                        message: last.diagnostics().to_string(),
                    });
                }
                warn!("dssp failed {attempts} times on {file_name} ({last}); reading its last output");
            }
        }

        if !output_file.is_file() {
            return Err(AnalysisError::ToolInvocation {
                tool: self.dssp.name().to_string(),
                status: None,
                message: format!("no output written to {}", output_file.display()),
            });
        }
        let content = std::fs::read_to_string(&output_file)?;
        parse_dssp(&content, &output_file)
    }
}

fn column(line: &str, idx: usize) -> Option<char> {
    line.as_bytes().get(idx).map(|b| *b as char)
}

/// Read the residue table of a DSSP file.
///
/// Fixed columns: residue number `5..10`, insertion code `10`, chain `11`, amino acid
/// `13`, structure `16` and accessibility `34..38`. Chain breaks are skipped.
pub fn parse_dssp(content: &str, source: &Path) -> Result<SecondaryStructure> {
    let mut entries = Vec::new();
    let mut in_table = false;
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 {
            continue;
        }
        if tokens[1] == "RESIDUE" {
            in_table = true;
            continue;
        }
        if !in_table {
            continue;
        }

        let err = |reason: &str| AnalysisError::parse(source, line_no, reason);
        match column(line, 9) {
            Some(' ') => continue,
            Some(_) => {}
            None => return Err(err("line too short")),
        }

        let residue_number: i32 = line
            .get(5..10)
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| err("bad residue number"))?;
        let insertion_code = column(line, 10).filter(|c| *c != ' ');
        let chain = column(line, 11).ok_or_else(|| err("no chain id"))?;
        let amino_acid = column(line, 13).ok_or_else(|| err("no amino acid"))?;
        let structure = match column(line, 16).ok_or_else(|| err("no structure code"))? {
            ' ' => '-',
            code => code,
        };
        let accessibility = parse_accessibility(line).ok_or_else(|| err("bad accessibility"))?;

        entries.push(SecondaryStructureEntry {
            residue_number,
            insertion_code,
            chain: chain.to_string(),
            amino_acid,
            structure,
            accessibility,
        });
    }
    Ok(SecondaryStructure { entries })
}

/// Accessibility in columns `34..38`.
///
/// Residue numbers above 9999 push the following columns to the right. The shift is the
/// distance from column 34 to the next blank.
fn parse_accessibility(line: &str) -> Option<i32> {
    let field = |start: usize| line.get(start..start + 4).and_then(|s| s.trim().parse().ok());
    if let Some(acc) = field(34) {
        return Some(acc);
    }
    match column(line, 34) {
        Some(' ') | None => None,
        Some(_) => {
            let shift = line.get(34..)?.find(' ')?;
            field(34 + shift)
        }
    }
}

pub fn secondary_structure_to_df(dssp: &SecondaryStructure) -> Result<DataFrame> {
    let e = &dssp.entries;
    let df = df!(
        "chain" => e.iter().map(|x| x.chain.clone()).collect::<Vec<String>>(),
        "resi" => e.iter().map(|x| x.residue_number).collect::<Vec<i32>>(),
        "insertion" => e.iter().map(|x| x.insertion_code.map(String::from).unwrap_or_default()).collect::<Vec<String>>(),
        "resn" => e.iter().map(|x| x.amino_acid.to_string()).collect::<Vec<String>>(),
        "ss" => e.iter().map(|x| x.structure.to_string()).collect::<Vec<String>>(),
        "acc" => e.iter().map(|x| x.accessibility).collect::<Vec<i32>>(),
    )?;
    Ok(df)
}
