//! Residue contacts between two chains and shortest inter-chain distances.

use crate::chains::{find_chain, ChainExt};
use crate::error::{AnalysisError, Result};
use crate::residues::{ResidueExt, ResidueKey};
use nalgebra::Point3;
use pdbtbx::*;
use polars::prelude::*;
use rstar::{primitives::GeomWithData, RTree};
use std::collections::BTreeMap;
use tracing::debug;

/// Atom position tagged with the index of its residue.
type IndexedAtom = GeomWithData<[f64; 3], usize>;

/// A residue of the second chain close to a residue of the first chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactPartner {
    pub residue: ResidueKey,
    /// Minimum all-atom distance between the two residues
    pub distance: f64,
}

/// All partners of one residue, in the order they appear in the partner chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueContacts {
    pub residue: ResidueKey,
    pub partners: Vec<ContactPartner>,
}

/// Contacts from the residues of `from_chain` to the residues of `to_chain`.
///
/// Residues are listed in chain order and residues without partners are left out.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactMap {
    pub from_chain: String,
    pub to_chain: String,
    pub cutoff: f64,
    entries: Vec<ResidueContacts>,
}

impl ContactMap {
    pub fn iter(&self) -> std::slice::Iter<'_, ResidueContacts> {
        self.entries.iter()
    }

    /// Partners of one residue, `None` if it has none.
    pub fn get(&self, residue: &ResidueKey) -> Option<&[ContactPartner]> {
        self.entries
            .iter()
            .find(|e| &e.residue == residue)
            .map(|e| e.partners.as_slice())
    }

    /// Number of residues with at least one partner
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of residue pairs in contact
    pub fn pair_count(&self) -> usize {
        self.entries.iter().map(|e| e.partners.len()).sum()
    }
}

impl<'a> IntoIterator for &'a ContactMap {
    type Item = &'a ResidueContacts;
    type IntoIter = std::slice::Iter<'a, ResidueContacts>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Eligible residue with its atom positions.
struct ResidueAtoms {
    key: ResidueKey,
    atoms: Vec<Point3<f64>>,
}

fn residue_atoms(chain: &Chain) -> Vec<ResidueAtoms> {
    chain
        .eligible_residues()
        .into_iter()
        .filter_map(|res| {
            res.key().map(|key| ResidueAtoms {
                key,
                atoms: res.coords().into_iter().map(Point3::from).collect(),
            })
        })
        .collect()
}

fn build_tree<'a>(residues: impl IntoIterator<Item = (usize, &'a ResidueAtoms)>) -> RTree<IndexedAtom> {
    let atoms = residues
        .into_iter()
        .flat_map(|(idx, res)| {
            res.atoms
                .iter()
                .map(move |p| IndexedAtom::new([p.x, p.y, p.z], idx))
        })
        .collect();
    RTree::bulk_load(atoms)
}

fn required_chain<'a>(pdb: &'a PDB, chain_id: &str) -> Result<&'a Chain> {
    find_chain(pdb, chain_id)
        .ok_or_else(|| AnalysisError::Configuration(format!("Chain {chain_id} is not in the model")))
}

/// Find every residue pair across two chains with at least one atom pair closer than `cutoff`.
///
/// Only standard amino acids from ATOM records take part. Each partner carries the
/// minimum distance over all atom pairs of the two residues.
pub fn find_contacts(pdb: &PDB, chain1: &str, chain2: &str, cutoff: f64) -> Result<ContactMap> {
    let first = residue_atoms(required_chain(pdb, chain1)?);
    let second = residue_atoms(required_chain(pdb, chain2)?);
    let tree = build_tree(second.iter().enumerate());
    let max_dist_squared = cutoff * cutoff;

    let entries: Vec<ResidueContacts> = first
        .iter()
        .filter_map(|res| {
            // Keyed by the partner's index so partners come out in chain order
            let mut closest: BTreeMap<usize, f64> = BTreeMap::new();
            for p in &res.atoms {
                for hit in tree.locate_within_distance([p.x, p.y, p.z], max_dist_squared) {
                    let dist = nalgebra::distance(p, &Point3::from(*hit.geom()));
                    closest
                        .entry(hit.data)
                        .and_modify(|d| *d = d.min(dist))
                        .or_insert(dist);
                }
            }
            let partners: Vec<ContactPartner> = closest
                .into_iter()
                .filter(|(_, dist)| *dist < cutoff)
                .map(|(idx, distance)| ContactPartner {
                    residue: second[idx].key.clone(),
                    distance,
                })
                .collect();
            (!partners.is_empty()).then(|| ResidueContacts {
                residue: res.key.clone(),
                partners,
            })
        })
        .collect();

    debug!(
        "Found {} residues of chain {chain1} within {cutoff} Å of chain {chain2}",
        entries.len()
    );
    Ok(ContactMap {
        from_chain: chain1.to_string(),
        to_chain: chain2.to_string(),
        cutoff,
        entries,
    })
}

/// A point mutation such as `Q61L`: wild type, position with insertion code, mutant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub wild_type: char,
    pub position: String,
    pub mutant: char,
}

impl std::str::FromStr for Mutation {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        match (chars.next(), chars.next_back()) {
            (Some(wild_type), Some(mutant))
                if wild_type.is_ascii_alphabetic()
                    && mutant.is_ascii_alphabetic()
                    && chars.as_str().starts_with(|c: char| c.is_ascii_digit() || c == '-') =>
            {
                Ok(Self {
                    wild_type,
                    position: chars.as_str().to_string(),
                    mutant,
                })
            }
            _ => Err(AnalysisError::Configuration(format!(
                "'{s}' is not a mutation like Q61L"
            ))),
        }
    }
}

/// Shortest distance from one residue to any residue of another chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueDistance {
    pub chain: String,
    pub residue: ResidueKey,
    /// `None` when the model has no other chain
    pub distance: Option<f64>,
}

/// For each eligible residue, the minimum distance to any eligible residue of another chain.
///
/// `chain` limits the result to one chain and `mutation` to the mutated residue. A residue
/// at the mutated position that is neither the wild type nor the mutant is an error.
pub fn shortest_interchain_distances(
    pdb: &PDB,
    chain: Option<&str>,
    mutation: Option<&Mutation>,
) -> Result<Vec<ResidueDistance>> {
    if let Some(chain_id) = chain {
        required_chain(pdb, chain_id)?;
    }
    let chains: Vec<(String, Vec<ResidueAtoms>)> = pdb
        .chains()
        .map(|c| (c.id().to_string(), residue_atoms(c)))
        .collect();

    let mut distances = Vec::new();
    for (idx, (chain_id, residues)) in chains.iter().enumerate() {
        if chain.is_some_and(|c| c != chain_id.as_str()) {
            continue;
        }
        let others = chains
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != idx)
            .flat_map(|(_, (_, res))| res.iter())
            .map(|res| (0, res));
        let tree = build_tree(others);

        for res in residues {
            if let Some(m) = mutation {
                if res.key.position != m.position {
                    continue;
                }
                if res.key.aa != m.wild_type && res.key.aa != m.mutant {
                    return Err(AnalysisError::Configuration(format!(
                        "Residue {} of chain {chain_id} matches neither side of {}{}{}",
                        res.key, m.wild_type, m.position, m.mutant
                    )));
                }
            }
            let distance = res
                .atoms
                .iter()
                .filter_map(|p| {
                    tree.nearest_neighbor(&[p.x, p.y, p.z])
                        .map(|hit| nalgebra::distance(p, &Point3::from(*hit.geom())))
                })
                .reduce(f64::min);
            distances.push(ResidueDistance {
                chain: chain_id.clone(),
                residue: res.key.clone(),
                distance,
            });
        }
    }
    Ok(distances)
}

/// Flatten a [`ContactMap`] into one row per residue pair.
pub fn contacts_to_df(contacts: &ContactMap) -> Result<DataFrame> {
    let pairs: Vec<(&ResidueKey, &ContactPartner)> = contacts
        .iter()
        .flat_map(|e| e.partners.iter().map(move |p| (&e.residue, p)))
        .collect();
    let df = df!(
        "from_chain" => pairs.iter().map(|_| contacts.from_chain.clone()).collect::<Vec<String>>(),
        "from_resi" => pairs.iter().map(|(r, _)| r.position.clone()).collect::<Vec<String>>(),
        "from_resn" => pairs.iter().map(|(r, _)| r.aa.to_string()).collect::<Vec<String>>(),
        "to_chain" => pairs.iter().map(|_| contacts.to_chain.clone()).collect::<Vec<String>>(),
        "to_resi" => pairs.iter().map(|(_, p)| p.residue.position.clone()).collect::<Vec<String>>(),
        "to_resn" => pairs.iter().map(|(_, p)| p.residue.aa.to_string()).collect::<Vec<String>>(),
        "distance" => pairs.iter().map(|(_, p)| p.distance).collect::<Vec<f64>>(),
    )?;
    Ok(df)
}

/// One row per residue with its shortest inter-chain distance.
pub fn distances_to_df(distances: &[ResidueDistance]) -> Result<DataFrame> {
    let df = df!(
        "chain" => distances.iter().map(|d| d.chain.clone()).collect::<Vec<String>>(),
        "resi" => distances.iter().map(|d| d.residue.position.clone()).collect::<Vec<String>>(),
        "resn" => distances.iter().map(|d| d.residue.aa.to_string()).collect::<Vec<String>>(),
        "distance" => distances.iter().map(|d| d.distance).collect::<Vec<Option<f64>>>(),
    )?;
    Ok(df)
}
