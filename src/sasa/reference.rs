use crate::error::{AnalysisError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Side chain accessibility of residue X in an ALA-X-ALA tripeptide, as tabulated by NACCESS.
const ALA_X_ALA: [(&str, f64); 20] = [
    ("ALA", 107.95),
    ("ARG", 238.76),
    ("ASN", 143.94),
    ("ASP", 140.39),
    ("CYS", 134.28),
    ("GLN", 178.50),
    ("GLU", 172.25),
    ("GLY", 80.10),
    ("HIS", 182.88),
    ("ILE", 175.12),
    ("LEU", 178.63),
    ("LYS", 200.81),
    ("MET", 194.15),
    ("PHE", 199.48),
    ("PRO", 136.13),
    ("SER", 116.50),
    ("THR", 139.27),
    ("TRP", 249.36),
    ("TYR", 212.76),
    ("VAL", 151.44),
];

/// Reference accessible area per residue type, used to turn absolute areas into percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSurfaceTable {
    values: HashMap<String, f64>,
}

impl Default for ReferenceSurfaceTable {
    fn default() -> Self {
        Self {
            values: ALA_X_ALA
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }
}

impl ReferenceSurfaceTable {
    /// Read a `standard.data` table.
    ///
    /// The first line is a header. Every other line has the residue type in its fourth
    /// and the reference area in its fifth whitespace separated field.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    pub(crate) fn parse(content: &str, source: &Path) -> Result<Self> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 5 {
                return Err(AnalysisError::parse(
                    source,
                    idx + 1,
                    format!("expected at least 5 fields, found {}", fields.len()),
                ));
            }
            let value: f64 = fields[4].parse().map_err(|_| {
                AnalysisError::parse(source, idx + 1, format!("'{}' is not a number", fields[4]))
            })?;
            values.insert(fields[3].to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, residue_name: &str) -> Option<f64> {
        self.values.get(residue_name).copied()
    }

    /// `abs_area` as a percentage of the reference for `residue_name`.
    ///
    /// Residue types without a usable reference count as fully exposed.
    pub fn relative(&self, residue_name: &str, abs_area: f64) -> f64 {
        match self.get(residue_name) {
            Some(reference) if reference > 0.0 => abs_area / reference * 100.0,
            _ => 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_area() {
        let table = ReferenceSurfaceTable::parse(
            "header line\nATOM x y ALA 100.0\n",
            Path::new("standard.data"),
        )
        .unwrap();
        assert_eq!(table.relative("ALA", 50.0), 50.0);
        assert_eq!(table.relative("MSE", 12.5), 100.0);
    }

    #[test]
    fn test_builtin_values() {
        let table = ReferenceSurfaceTable::default();
        assert_eq!(table.get("GLY"), Some(80.10));
        assert_eq!(table.get("HOH"), None);
        assert!((table.relative("ALA", 107.95) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_bad_table() {
        let err = ReferenceSurfaceTable::parse("header\nA B C ALA oops\n", Path::new("standard.data"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Parse { line: 2, .. }), "{err}");

        let err = ReferenceSurfaceTable::parse("header\nA B ALA\n", Path::new("standard.data"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Parse { .. }));
    }

    #[test]
    fn test_header_is_skipped() {
        let table = ReferenceSurfaceTable::parse(
            "A B C HDR 1.0\n\nA B C GLY 80.0\n",
            Path::new("standard.data"),
        )
        .unwrap();
        assert_eq!(table.get("HDR"), None);
        assert_eq!(table.get("GLY"), Some(80.0));
    }
}
