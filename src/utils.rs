use crate::error::{AnalysisError, Result};
use pdbtbx::{PDBError, PDB};
use polars::prelude::*;
use std::path::Path;
use tracing::{error, warn};

/// Open an atomic data file with [`pdbtbx::ReadOptions`], keeping only the first model.
///
/// Non-fatal problems found while reading are returned alongside the structure.
pub fn load_model(input_file: &Path) -> Result<(PDB, Vec<PDBError>)> {
    let path_str = input_file.to_string_lossy();
    pdbtbx::ReadOptions::default()
        .set_only_atomic_coords(true)
        .set_only_first_model(true)
        .set_level(pdbtbx::StrictnessLevel::Loose)
        .read(path_str.as_ref())
        .map_err(|errors| AnalysisError::Structure {
            path: input_file.to_path_buf(),
            message: join_pdb_errors(&errors),
        })
}

/// Same as [`load_model`] for PDB formatted text that is already in memory.
///
/// `source` is only used in error messages.
pub fn load_model_from_str(content: &str, source: &Path) -> Result<(PDB, Vec<PDBError>)> {
    pdbtbx::ReadOptions::default()
        .set_format(pdbtbx::Format::Pdb)
        .set_only_atomic_coords(true)
        .set_only_first_model(true)
        .set_level(pdbtbx::StrictnessLevel::Loose)
        .read_raw(std::io::BufReader::new(content.as_bytes()))
        .map_err(|errors| AnalysisError::Structure {
            path: source.to_path_buf(),
            message: join_pdb_errors(&errors),
        })
}

/// Write a structure in PDB format.
pub fn save_model(pdb: &PDB, output_file: &Path) -> Result<()> {
    let path_str = output_file.to_string_lossy();
    pdbtbx::save(pdb, path_str.as_ref(), pdbtbx::StrictnessLevel::Loose).map_err(|errors| {
        AnalysisError::Structure {
            path: output_file.to_path_buf(),
            message: join_pdb_errors(&errors),
        }
    })
}

/// Report the warnings collected while reading a structure.
pub fn log_pdb_errors(errors: &[PDBError]) {
    for e in errors {
        match e.level() {
            pdbtbx::ErrorLevel::BreakingError => error!("{e}"),
            pdbtbx::ErrorLevel::InvalidatingError => error!("{e}"),
            _ => warn!("{e}"),
        }
    }
}

fn join_pdb_errors(errors: &[PDBError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse a comma separated list of chain identifiers, e.g. `A,B`.
/// Order is kept and duplicates are dropped.
pub fn parse_chains(chains: &str) -> Result<Vec<String>> {
    let mut selection: Vec<String> = Vec::new();
    for c in chains.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if !selection.iter().any(|s| s == c) {
            selection.push(c.to_string());
        }
    }
    if selection.is_empty() {
        return Err(AnalysisError::Configuration(format!(
            "No chains of interest in '{chains}'"
        )));
    }
    Ok(selection)
}

/// Run `f` inside a dedicated Rayon thread pool. Zero threads means all cores.
pub fn run_with_threads<T, F>(num_threads: usize, f: F) -> T
where
    F: FnOnce() -> T + Send,
    T: Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
    {
        Ok(pool) => pool.install(f),
        Err(e) => {
            warn!("Failed to build a thread pool ({e}); using the global pool");
            f()
        }
    }
}

/// Write a DataFrame to a file of the given type. The extension is set from `file_type`.
pub fn write_df_to_file(
    df: &mut DataFrame,
    file_path: &Path,
    file_type: DataFrameFileType,
) -> Result<()> {
    let file_suffix = file_type.to_string();
    let mut file = std::fs::File::create(file_path.with_extension(file_suffix))?;
    match file_type {
        DataFrameFileType::Csv => {
            CsvWriter::new(&mut file).finish(df)?;
        }
        DataFrameFileType::Parquet => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
        DataFrameFileType::Json => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::Json)
                .finish(df)?;
        }
        DataFrameFileType::NDJson => {
            JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::JsonLines)
                .finish(df)?;
        }
    }
    Ok(())
}

/// File format for writing DataFrames.
#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum DataFrameFileType {
    /// Comma-separated values
    Csv,
    /// Parquet columnar storage
    Parquet,
    /// Standard JSON
    Json,
    /// Newline-delimited JSON
    NDJson,
}

impl std::fmt::Display for DataFrameFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DataFrameFileType::Csv => write!(f, "csv"),
            DataFrameFileType::Parquet => write!(f, "parquet"),
            DataFrameFileType::Json => write!(f, "json"),
            DataFrameFileType::NDJson => write!(f, "ndjson"),
        }
    }
}

/// Path of a file in the crate's `test-data` directory.
#[cfg(test)]
pub(crate) fn test_data(name: &str) -> std::path::PathBuf {
    let root = env!("CARGO_MANIFEST_DIR");
    Path::new(root).join("test-data").join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn good_chain_lists() {
        assert_eq!(parse_chains("A,B").unwrap(), vec!["A", "B"]);
        assert_eq!(parse_chains(" B , A ").unwrap(), vec!["B", "A"]);
        assert_eq!(parse_chains("A,A,B,").unwrap(), vec!["A", "B"]);
        assert_eq!(parse_chains("H").unwrap(), vec!["H"]);
    }

    #[test]
    fn empty_chain_list() {
        assert!(matches!(
            parse_chains(" , "),
            Err(AnalysisError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_only_first_model() {
        let (pdb, _) = load_model(&test_data("two_models.pdb")).unwrap();
        assert_eq!(pdb.model_count(), 1);
        let x = pdb.atoms().next().unwrap().pos().0;
        assert!((x - 1.0).abs() < 1e-6, "atom from the second model was kept");
    }

    #[test]
    fn test_missing_file() {
        let err = load_model(&test_data("does_not_exist.pdb")).unwrap_err();
        assert!(matches!(err, AnalysisError::Structure { .. }));
    }

    #[test]
    fn test_write_csv() {
        let tmp = tempfile::tempdir().unwrap();
        let mut df = df!("chain" => ["A", "B"], "sasa" => [1.0f64, 2.0]).unwrap();
        write_df_to_file(&mut df, &tmp.path().join("out"), DataFrameFileType::Csv).unwrap();
        let content = std::fs::read_to_string(tmp.path().join("out.csv")).unwrap();
        assert!(content.starts_with("chain,sasa"));
    }

    #[test]
    fn test_run_with_threads() {
        let n = run_with_threads(2, rayon::current_num_threads);
        assert_eq!(n, 2);
    }
}
