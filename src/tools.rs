//! Running external programs inside a working directory.

use crate::error::{AnalysisError, Result};
use crate::workdir::WorkDir;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, trace};

/// Line printed last on stdout by POPS when the calculation went through.
pub(crate) const CLEAN_TERMINATION: &str = "Clean termination";

/// An external program with a human readable name for diagnostics.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    name: &'static str,
    program: PathBuf,
}

/// Captured result of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool: &'static str,
    /// Exit code, `None` if the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExternalTool {
    pub fn new(name: &'static str, program: impl Into<PathBuf>) -> Self {
        Self {
            name,
            program: program.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the tool with `workdir` as its current directory and wait for it to finish.
    ///
    /// Only a failure to start the process is an error here; the exit status is left
    /// to the caller because some tools report success through their output instead.
    pub fn run<I, S>(&self, workdir: &WorkDir, args: I) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command.args(args).current_dir(workdir.path());
        debug!("{} command: {command:?}", self.name);

        let output = command.output().map_err(|e| AnalysisError::ToolInvocation {
            tool: self.name.to_string(),
            status: None,
            message: format!("could not start {}: {e}", self.program.display()),
        })?;

        let result = ToolOutput {
            tool: self.name,
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("{} exit status: {:?}", self.name, result.status);
        trace!("{} stdout:\n{}", self.name, result.stdout);
        trace!("{} stderr:\n{}", self.name, result.stderr);
        Ok(result)
    }

    /// Run the tool and turn a non-zero exit into [`AnalysisError::ToolInvocation`].
    pub fn run_checked<I, S>(&self, workdir: &WorkDir, args: I) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.run(workdir, args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(output.into_error())
        }
    }
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Last non-empty line written to stdout.
    pub fn last_line(&self) -> Option<&str> {
        self.stdout.lines().rev().find(|l| !l.trim().is_empty())
    }

    /// Whether the tool announced a clean termination on its last stdout line.
    pub fn terminated_cleanly(&self) -> bool {
        self.last_line().map(str::trim) == Some(CLEAN_TERMINATION)
    }

    /// Diagnostic text: stderr, or stdout when stderr is empty.
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }

    pub fn into_error(self) -> AnalysisError {
        AnalysisError::ToolInvocation {
            tool: self.tool.to_string(),
            status: self.status,
            message: self.diagnostics().to_string(),
        }
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{tool} exited with {status:?}: {diag}",
            tool = self.tool,
            status = self.status,
            diag = self.diagnostics()
        )
    }
}


#[cfg(test)]
mod tests {
    use super::test_tools::write_script;
    use super::*;

    #[test]
    fn captures_output_and_status() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        let script = write_script(
            bin.path(),
            "fake",
            "echo \"args: $@\"\necho 'Clean termination'\necho 'oops' >&2\nexit 3",
        );

        let output = ExternalTool::new("fake", script)
            .run(&wd, ["--pdb", "A.pdb"])
            .unwrap();
        assert_eq!(output.status, Some(3));
        assert!(!output.success());
        assert!(output.stdout.contains("args: --pdb A.pdb"));
        assert!(output.terminated_cleanly());
        assert_eq!(output.diagnostics(), "oops");
    }

    #[test]
    fn runs_inside_the_working_directory() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        let script = write_script(bin.path(), "touching", "touch marker.txt");

        ExternalTool::new("touching", script)
            .run_checked(&wd, Vec::<&str>::new())
            .unwrap();
        assert!(wd.path().join("marker.txt").is_file());
    }

    #[test]
    fn non_zero_exit_is_a_tool_error() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        let script = write_script(bin.path(), "failing", "echo 'bad input' >&2\nexit 1");

        let err = ExternalTool::new("failing", script)
            .run_checked(&wd, ["x"])
            .unwrap_err();
        match err {
            AnalysisError::ToolInvocation {
                tool,
                status,
                message,
            } => {
                assert_eq!(tool, "failing");
                assert_eq!(status, Some(1));
                assert_eq!(message, "bad input");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn missing_program_is_a_tool_error() {
        let work = tempfile::tempdir().unwrap();
        let wd = WorkDir::new(work.path()).unwrap();
        let err = ExternalTool::new("ghost", "/nonexistent/ghost-tool")
            .run(&wd, ["x"])
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ToolInvocation { status: None, .. }
        ));
    }
}
