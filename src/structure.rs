//! Normalising an input model and splitting it into the files the external tools read.

use crate::chains::{find_chain, is_placeholder_id, ChainExt};
use crate::error::{AnalysisError, Result};
use crate::utils::{load_model, load_model_from_str, log_pdb_errors, save_model};
use crate::workdir::{safe_name, WorkDir};
use pdbtbx::*;
use std::path::Path;
use tracing::debug;

/// A structure split into per-chain and chains-of-interest files inside a [`WorkDir`].
#[derive(Debug, Clone)]
pub struct PreparedStructure {
    /// Chains of interest in the order they were requested
    chains: Vec<String>,
    /// Model restricted to the chains of interest
    structure: PDB,
    /// File name of the complete renamed model
    full_file: String,
    /// File name of the chains-of-interest model
    combined_file: String,
}

impl PreparedStructure {
    /// Load the first model of `source`, fix placeholder chain ids and write
    ///
    /// - the whole renamed model,
    /// - the chains of interest together (`AB.pdb`) if more than one chain was requested,
    /// - every chain of interest on its own (`A.pdb`, `B.pdb`).
    pub fn prepare(source: &Path, chains: &[String], workdir: &WorkDir) -> Result<Self> {
        if chains.is_empty() {
            return Err(AnalysisError::Configuration(
                "At least one chain of interest is required".to_string(),
            ));
        }

        let (mut pdb, warnings) = read_source(source, &chains[0])?;
        log_pdb_errors(&warnings);

        let ids: Vec<String> = pdb.chains().map(|c| c.id().to_string()).collect();
        for (idx, new_id) in placeholder_renames(&ids, &chains[0]) {
            if let Some(chain) = pdb.chains_mut().nth(idx) {
                debug!("Renaming chain '{}' to '{new_id}'", chain.id());
                chain.set_id(&new_id);
            }
        }

        for chain_id in chains {
            if find_chain(&pdb, chain_id).is_none() {
                return Err(AnalysisError::Configuration(format!(
                    "Chain {chain_id} was not found in {}",
                    source.display()
                )));
            }
        }
        for chain in pdb.chains() {
            debug!(">{}\n{}", chain.id(), chain.pdb_seq());
        }

        let combined_file = combined_file_name(chains);
        let full_file = full_file_name(source, chains, &combined_file);
        debug!(
            "Saving the complete model to {}",
            workdir.path().join(&full_file).display()
        );
        save_model(&pdb, &workdir.file(&full_file)?)?;

        let structure = select_chains(&pdb, chains);
        if chains.len() > 1 {
            debug!("Saving only the chains of interest: {}", chains.join(","));
            save_model(&structure, &workdir.file(&combined_file)?)?;
        }
        for chain_id in chains {
            debug!("Saving chain {chain_id} separately");
            let single = select_chains(&pdb, std::slice::from_ref(chain_id));
            save_model(&single, &workdir.file(&chain_file_name(chain_id))?)?;
        }

        Ok(Self {
            chains: chains.to_vec(),
            structure,
            full_file,
            combined_file,
        })
    }

    pub fn chains(&self) -> &[String] {
        &self.chains
    }

    /// Model holding only the chains of interest.
    pub fn structure(&self) -> &PDB {
        &self.structure
    }

    pub fn full_file(&self) -> &str {
        &self.full_file
    }

    /// Name of the file with all chains of interest. Same as the chain file for one chain.
    pub fn combined_file(&self) -> &str {
        &self.combined_file
    }

    /// Names of the per-chain files, in chain order.
    pub fn chain_files(&self) -> Vec<String> {
        self.chains.iter().map(|c| chain_file_name(c)).collect()
    }
}

pub(crate) fn chain_file_name(chain_id: &str) -> String {
    format!("{chain_id}.pdb")
}

pub(crate) fn combined_file_name(chains: &[String]) -> String {
    format!("{}.pdb", chains.concat())
}

/// Name of the complete model: the source file name unless it clashes with a chain file.
fn full_file_name(source: &Path, chains: &[String], combined_file: &str) -> String {
    let stem = source
        .file_stem()
        .map(|s| safe_name(&s.to_string_lossy()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "model".to_string());
    let name = format!("{stem}.pdb");
    if name == combined_file || chains.iter().any(|c| chain_file_name(c) == name) {
        format!("full_{name}")
    } else {
        name
    }
}

/// Copy of `pdb` with only the chains in `chains`.
fn select_chains(pdb: &PDB, chains: &[String]) -> PDB {
    let mut selected = pdb.clone();
    selected.remove_chains_by(|chain| !chains.iter().any(|c| c == chain.id()));
    selected
}

/// Load `source`. PDB text gets its placeholder chain ids replaced before parsing.
fn read_source(source: &Path, first_requested: &str) -> Result<(PDB, Vec<PDBError>)> {
    let extension = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    if !matches!(extension.as_deref(), Some("pdb" | "pdb1" | "ent")) {
        return load_model(source);
    }
    let content = std::fs::read_to_string(source)?;
    match relabel_placeholder_chains(&content, first_requested) {
        Some(relabelled) => {
            debug!("Assigned chain ids to the unnamed chains of {}", source.display());
            load_model_from_str(&relabelled, source)
        }
        None => load_model_from_str(&content, source),
    }
}

/// Give the atoms of PDB text without real chain ids their final chain id.
///
/// Chains are the `TER` separated blocks of the first model. A lone block takes
/// `first_requested`, two blocks become `A` and `B`. Returns `None` when any atom has a
/// real chain id or there is another number of blocks.
pub(crate) fn relabel_placeholder_chains(content: &str, first_requested: &str) -> Option<String> {
    let mut blocks: Vec<Option<usize>> = Vec::new();
    let mut block = 0;
    let mut open = false;
    let mut in_first_model = true;
    for line in content.lines() {
        let record = line.get(..6).unwrap_or(line).trim_end();
        let mut assigned = None;
        if in_first_model {
            match record {
                "ATOM" | "HETATM" => {
                    if !is_placeholder_id(line.get(21..22).unwrap_or("")) {
                        return None;
                    }
                    open = true;
                    assigned = Some(block);
                }
                "TER" if open => {
                    block += 1;
                    open = false;
                }
                "ENDMDL" => in_first_model = false,
                _ => {}
            }
        }
        blocks.push(assigned);
    }

    let ids: Vec<&str> = match block + usize::from(open) {
        1 if first_requested.len() == 1 => vec![first_requested],
        2 => vec!["A", "B"],
        _ => return None,
    };

    let mut relabelled = String::with_capacity(content.len());
    for (line, assigned) in content.lines().zip(blocks) {
        match assigned {
            Some(b) if line.len() > 21 => {
                relabelled.push_str(line.get(..21)?);
                relabelled.push_str(ids[b]);
                relabelled.push_str(line.get(22..)?);
            }
            Some(b) => relabelled.push_str(&format!("{line:<21}{}", ids[b])),
            None => relabelled.push_str(line),
        }
        relabelled.push('\n');
    }
    Some(relabelled)
}

/// New identifiers for chains that only carry placeholder ids, as `(chain index, id)`.
///
/// A lone placeholder chain takes the first requested id; two placeholder chains become
/// `A` and `B` in file order. Anything else is left alone.
pub(crate) fn placeholder_renames(ids: &[String], first_requested: &str) -> Vec<(usize, String)> {
    match ids {
        [only] if is_placeholder_id(only) => vec![(0, first_requested.to_string())],
        [first, second] if is_placeholder_id(first) && is_placeholder_id(second) => {
            vec![(0, "A".to_string()), (1, "B".to_string())]
        }
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::residues::ResidueExt;
    use crate::utils::test_data;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_placeholder_renames() {
        assert_eq!(
            placeholder_renames(&ids(&[""]), "H"),
            vec![(0, "H".to_string())]
        );
        assert_eq!(
            placeholder_renames(&ids(&["0", "0"]), "H"),
            vec![(0, "A".to_string()), (1, "B".to_string())]
        );
        assert!(placeholder_renames(&ids(&["A"]), "H").is_empty());
        assert!(placeholder_renames(&ids(&["0", "B"]), "H").is_empty());
        assert!(placeholder_renames(&ids(&["", "", ""]), "H").is_empty());
    }

    #[test]
    fn test_relabel_placeholder_chains() {
        let atom = |chain: char| format!("ATOM      1  CA  ALA {chain}   1       1.000   0.000   0.000");
        let single = format!("{}\nEND\n", atom(' '));
        let relabelled = relabel_placeholder_chains(&single, "H").unwrap();
        assert_eq!(relabelled.lines().next().unwrap().get(21..22), Some("H"));

        let two = format!("{}\nTER\n{}\nTER\nEND\n", atom('0'), atom('0'));
        let relabelled = relabel_placeholder_chains(&two, "H").unwrap();
        let ids: Vec<&str> = relabelled
            .lines()
            .filter(|l| l.starts_with("ATOM"))
            .map(|l| &l[21..22])
            .collect();
        assert_eq!(ids, vec!["A", "B"]);

        assert!(relabel_placeholder_chains(&format!("{}\n", atom('A')), "H").is_none());
        let three = format!("{0}\nTER\n{0}\nTER\n{0}\n", atom('0'));
        assert!(relabel_placeholder_chains(&three, "H").is_none());
        assert!(relabel_placeholder_chains(&single, "HL").is_none());
    }

    #[test]
    fn test_two_unnamed_chains_become_a_and_b() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(tmp.path()).unwrap();
        let prepared = PreparedStructure::prepare(
            &test_data("two_placeholder_chains.pdb"),
            &ids(&["A", "B"]),
            &wd,
        )
        .unwrap();

        let chain_a = find_chain(prepared.structure(), "A").unwrap();
        let chain_b = find_chain(prepared.structure(), "B").unwrap();
        assert_eq!(chain_a.pdb_seq(), "AG");
        assert_eq!(chain_b.pdb_seq(), "SL");
        assert_eq!(chain_a.atom_count(), 4);
        let (reloaded, _) = load_model(&wd.path().join("B.pdb")).unwrap();
        assert_eq!(find_chain(&reloaded, "B").unwrap().residue_count(), 2);
    }

    #[test]
    fn test_source_name_with_spaces() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("my model+h.pdb");
        std::fs::copy(test_data("two_chains.pdb"), &input).unwrap();
        let wd = WorkDir::new(tmp.path().join("work")).unwrap();

        let prepared = PreparedStructure::prepare(&input, &ids(&["A", "B"]), &wd).unwrap();
        assert_eq!(prepared.full_file(), "my_model_h.pdb");
        assert!(wd.path().join("my_model_h.pdb").is_file());
    }

    #[test]
    fn test_split_files() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(tmp.path()).unwrap();
        let prepared =
            PreparedStructure::prepare(&test_data("two_chains.pdb"), &ids(&["A", "B"]), &wd)
                .unwrap();

        for name in ["two_chains.pdb", "AB.pdb", "A.pdb", "B.pdb"] {
            assert!(wd.path().join(name).is_file(), "{name} was not written");
        }
        assert_eq!(prepared.combined_file(), "AB.pdb");
        assert_eq!(prepared.chain_files(), vec!["A.pdb", "B.pdb"]);
        assert_eq!(prepared.structure().chain_count(), 2);
    }

    #[test]
    fn test_chain_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(tmp.path()).unwrap();
        let (original, _) = load_model(&test_data("two_chains.pdb")).unwrap();
        PreparedStructure::prepare(&test_data("two_chains.pdb"), &ids(&["A", "B"]), &wd).unwrap();

        let (reloaded, _) = load_model(&wd.path().join("A.pdb")).unwrap();
        assert_eq!(reloaded.chain_count(), 1);

        let before = find_chain(&original, "A").unwrap();
        let after = find_chain(&reloaded, "A").unwrap();
        let positions =
            |c: &Chain| c.residues().map(|r| r.position()).collect::<Vec<String>>();
        assert_eq!(positions(before), positions(after));

        let coords = |c: &Chain| c.residues().flat_map(|r| r.coords()).collect::<Vec<_>>();
        let (a, b) = (coords(before), coords(after));
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter().zip(b.iter()) {
            for k in 0..3 {
                assert!((p[k] - q[k]).abs() < 1e-6, "{p:?} != {q:?}");
            }
        }
    }

    #[test]
    fn test_single_blank_chain_is_renamed() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(tmp.path()).unwrap();
        let prepared =
            PreparedStructure::prepare(&test_data("blank_chain.pdb"), &ids(&["H"]), &wd).unwrap();

        assert_eq!(prepared.combined_file(), "H.pdb");
        assert!(wd.path().join("H.pdb").is_file());
        assert!(find_chain(prepared.structure(), "H").is_some());
        let (reloaded, _) = load_model(&wd.path().join("blank_chain.pdb")).unwrap();
        assert!(find_chain(&reloaded, "H").is_some());
    }

    #[test]
    fn test_missing_chain() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(tmp.path()).unwrap();
        let err = PreparedStructure::prepare(&test_data("two_chains.pdb"), &ids(&["A", "C"]), &wd)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)), "{err}");
    }

    #[test]
    fn test_full_file_name_clash() {
        let chains = ids(&["A"]);
        assert_eq!(
            full_file_name(Path::new("/data/A.pdb"), &chains, "A.pdb"),
            "full_A.pdb"
        );
        assert_eq!(
            full_file_name(Path::new("/data/model.ent"), &chains, "A.pdb"),
            "model.pdb"
        );
    }
}
