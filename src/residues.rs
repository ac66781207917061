use pdbtbx::*;
use std::fmt;

/// Residue position and type as reported in analysis results, e.g. `61A` + `Q`.
#[derive(Debug, Hash, PartialEq, Eq, Clone, PartialOrd, Ord)]
pub struct ResidueKey {
    /// Sequence number followed by the insertion code, if any
    pub position: String,
    /// One-letter amino acid code
    pub aa: char,
}

impl ResidueKey {
    pub fn new(position: impl Into<String>, aa: char) -> Self {
        Self {
            position: position.into(),
            aa,
        }
    }
}

impl fmt::Display for ResidueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.aa, self.position)
    }
}

/// Convert a three-letter amino acid name into its one-letter code.
/// Only the 20 standard amino acids are recognised.
pub fn three_to_one(name: &str) -> Option<char> {
    let aa = match name.trim().to_uppercase().as_str() {
        "ALA" => 'A',
        "ARG" => 'R',
        "ASN" => 'N',
        "ASP" => 'D',
        "CYS" => 'C',
        "GLN" => 'Q',
        "GLU" => 'E',
        "GLY" => 'G',
        "HIS" => 'H',
        "ILE" => 'I',
        "LEU" => 'L',
        "LYS" => 'K',
        "MET" => 'M',
        "PHE" => 'F',
        "PRO" => 'P',
        "SER" => 'S',
        "THR" => 'T',
        "TRP" => 'W',
        "TYR" => 'Y',
        "VAL" => 'V',
        _ => return None,
    };
    Some(aa)
}

pub trait ResidueExt {
    /// The residue one-letter code, or `None` if it's not a standard amino acid.
    fn resn(&self) -> Option<char>;

    /// Sequence number and insertion code, e.g. `"61"` or `"61A"`.
    fn position(&self) -> String;

    /// Whether any atom of the residue comes from a HETATM record.
    fn is_hetero(&self) -> bool;

    /// Standard amino acid from ATOM records, i.e. usable for contacts and areas.
    fn is_eligible(&self) -> bool;

    /// Position and one-letter code of an eligible residue.
    fn key(&self) -> Option<ResidueKey>;

    /// Atom coordinates of the residue. Of the alternative locations only the first one
    /// listed is used, so every atom has a single position.
    fn coords(&self) -> Vec<[f64; 3]>;
}

impl ResidueExt for Residue {
    fn resn(&self) -> Option<char> {
        self.name().and_then(three_to_one)
    }

    fn position(&self) -> String {
        let (resi, insertion) = self.id();
        format!("{resi}{}", insertion.unwrap_or("").trim())
    }

    fn is_hetero(&self) -> bool {
        self.atoms().any(|atom| atom.hetero())
    }

    fn is_eligible(&self) -> bool {
        self.resn().is_some() && !self.is_hetero()
    }

    fn key(&self) -> Option<ResidueKey> {
        if self.is_hetero() {
            return None;
        }
        self.resn().map(|aa| ResidueKey::new(self.position(), aa))
    }

    fn coords(&self) -> Vec<[f64; 3]> {
        let first_alt = self.conformers().find_map(|c| c.alternative_location());
        self.conformers()
            .filter(|c| c.alternative_location().is_none() || c.alternative_location() == first_alt)
            .flat_map(|c| c.atoms())
            .map(|atom| {
                let (x, y, z) = atom.pos();
                [x, y, z]
            })
            .collect()
    }
}
