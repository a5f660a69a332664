//! External process execution.
//!
//! Everything hangar does to a virtual machine goes through a hypervisor
//! control executable. This module is the single place that spawns them:
//! a synchronous run that captures output and reports the exit status as
//! data. A failing child is not an error here; callers interpret the status.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Exit code reported when the child was terminated by a signal and no
/// status is available.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Captured result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit status (`UNKNOWN_EXIT_CODE` if killed by a signal).
    pub status: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the child exited with status zero.
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Run an external command to completion, capturing its output.
///
/// Returns `Err` only when the executable cannot be spawned at all
/// (missing binary, permission problem). A child that runs and exits
/// non-zero is reported through [`CommandOutput::status`].
pub fn run(program: &Path, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
    tracing::debug!(program = %program.display(), ?args, "running command");

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .map_err(|e| Error::spawn(program.display().to_string(), e.to_string()))?;

    let result = CommandOutput {
        status: output.status.code().unwrap_or(UNKNOWN_EXIT_CODE),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    tracing::debug!(
        program = %program.display(),
        status = result.status,
        "command finished"
    );

    Ok(result)
}

/// Run an external command with inherited stdio, returning its exit status.
///
/// Used for interactive sessions (ssh) and for scp where the child should
/// own the terminal.
pub fn run_interactive(program: &Path, args: &[&str]) -> Result<i32> {
    tracing::debug!(program = %program.display(), ?args, "running interactive command");

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| Error::spawn(program.display().to_string(), e.to_string()))?;

    Ok(status.code().unwrap_or(UNKNOWN_EXIT_CODE))
}

/// Locate an executable by name.
///
/// An absolute or relative path is checked directly; a bare name is searched
/// on `PATH`. Returns `None` when nothing matches, which drivers surface as
/// an environment fault rather than a backend failure.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_stdout() {
        let out = run(Path::new("/bin/sh"), &["-c", "echo hello"], None).unwrap();
        assert_eq!(out.status, 0);
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn test_run_captures_stderr_and_status() {
        let out = run(
            Path::new("/bin/sh"),
            &["-c", "echo oops >&2; exit 3"],
            None,
        )
        .unwrap();
        assert_eq!(out.status, 3);
        assert!(!out.success());
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn test_run_nonzero_exit_is_not_an_error() {
        // The contract: callers interpret status, run() never raises for it.
        let out = run(Path::new("/bin/sh"), &["-c", "exit 1"], None).unwrap();
        assert_eq!(out.status, 1);
    }

    #[test]
    fn test_run_missing_executable_is_spawn_error() {
        let err = run(Path::new("/nonexistent/hypervisor-ctl"), &[], None).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[test]
    fn test_run_respects_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = run(Path::new("/bin/sh"), &["-c", "pwd"], Some(dir.path())).unwrap();
        let reported = std::fs::canonicalize(out.stdout.trim()).unwrap();
        let expected = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(reported, expected);
    }

    #[test]
    fn test_find_executable_on_path() {
        assert!(find_executable("sh").is_some());
    }

    #[test]
    fn test_find_executable_missing() {
        assert!(find_executable("definitely-not-a-real-binary-9c4").is_none());
    }

    #[test]
    fn test_find_executable_direct_path() {
        assert!(find_executable("/bin/sh").is_some());
        assert!(find_executable("/bin/definitely-not-sh").is_none());
    }
}
