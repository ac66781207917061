//! Private working directory of one analysis job.
//!
//! All chain splits, intermediate atom listings and tool reports are written here.
//! Concurrent jobs must never share a [`WorkDir`].

use crate::error::{AnalysisError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Use (and create if needed) `root` as the working directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    /// A working directory for `job_id` below a shared `base` directory.
    pub fn for_job(base: impl AsRef<Path>, job_id: &str) -> Result<Self> {
        check_name(job_id)?;
        Self::new(base.as_ref().join(job_id))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of a file inside the working directory. `name` must be a plain file name.
    pub fn file(&self, name: &str) -> Result<PathBuf> {
        check_name(name)?;
        Ok(self.root.join(name))
    }

    /// Path of `<stem>.<extension>` inside the working directory.
    pub fn file_with_extension(&self, stem: &str, extension: &str) -> Result<PathBuf> {
        self.file(&format!("{stem}.{extension}"))
    }

    /// Like [`WorkDir::file`], but the file has to exist already.
    pub fn existing(&self, name: &str) -> Result<PathBuf> {
        let path = self.file(name)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(AnalysisError::MissingInput(path))
        }
    }
}

/// Reject anything that could escape the working directory.
fn check_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(AnalysisError::Configuration(format!(
            "'{name}' is not a valid file name inside the working directory"
        )))
    }
}

/// `name` with every character that [`WorkDir`] file names cannot hold replaced by `_`.
pub fn safe_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect()
}

/// File stem used by the tools: everything before the first `.`.
pub(crate) fn tool_stem(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_paths_inside_root() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(tmp.path()).unwrap();
        let path = wd.file_with_extension("AB", "pdb").unwrap();
        assert_eq!(path, wd.path().join("AB.pdb"));
    }

    #[test]
    fn rejects_escaping_names() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(tmp.path()).unwrap();
        for name in ["", "..", "../x.pdb", "a/b.pdb", "x y.pdb"] {
            assert!(
                matches!(wd.file(name), Err(AnalysisError::Configuration(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn jobs_get_disjoint_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let a = WorkDir::for_job(tmp.path(), "job-1").unwrap();
        let b = WorkDir::for_job(tmp.path(), "job-2").unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir() && b.path().is_dir());
        assert!(WorkDir::for_job(tmp.path(), "../escape").is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(tmp.path()).unwrap();
        assert!(matches!(
            wd.existing("A.pdb"),
            Err(AnalysisError::MissingInput(_))
        ));
        std::fs::write(wd.path().join("A.pdb"), "END\n").unwrap();
        assert!(wd.existing("A.pdb").is_ok());
    }

    #[test]
    fn safe_names_are_accepted() {
        let tmp = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(tmp.path()).unwrap();
        assert_eq!(safe_name("model v2+h:1"), "model_v2_h_1");
        assert_eq!(safe_name("a.b"), "a_b");
        let name = format!("{}.pdb", safe_name("x y"));
        assert!(wd.file(&name).is_ok());
    }

    #[test]
    fn stem_stops_at_first_dot() {
        assert_eq!(tool_stem("AB.pdb"), "AB");
        assert_eq!(tool_stem("model.v2.pdb"), "model");
    }
}
