use crate::residues::ResidueExt;
use pdbtbx::*;

/// Chain identifiers that structure files use when no real chain id was assigned.
pub(crate) fn is_placeholder_id(id: &str) -> bool {
    matches!(id.trim(), "" | "0")
}

pub trait ChainExt {
    /// One-letter sequence of the chain, `X` for anything that isn't a standard amino acid.
    fn pdb_seq(&self) -> String;

    /// Residues that take part in contact and area analyses, in chain order.
    fn eligible_residues(&self) -> Vec<&Residue>;
}

impl ChainExt for Chain {
    fn pdb_seq(&self) -> String {
        self.residues().map(|res| res.resn().unwrap_or('X')).collect()
    }

    fn eligible_residues(&self) -> Vec<&Residue> {
        self.residues().filter(|res| res.is_eligible()).collect()
    }
}

/// Look up a chain of the (first) model by id.
pub fn find_chain<'a>(pdb: &'a PDB, chain_id: &str) -> Option<&'a Chain> {
    pdb.chains().find(|c| c.id() == chain_id)
}
