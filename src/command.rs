//! Run external programs (`git`, `gh`) and capture their output
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::errors::{OrgMoverError, OrgMoverErrorKind};

/// Output of a finished external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub status: Option<i32>,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// An external command to run
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    /// Program to execute
    program: OsString,

    /// Arguments passed to the program
    args: Vec<OsString>,

    /// Working directory
    cwd: Option<PathBuf>,

    /// Extra environment variables, never shown in error messages
    envs: Vec<(OsString, OsString)>,
}

impl ExternalCommand {
    /// Create a command for `program`
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: vec![],
            cwd: None,
            envs: vec![],
        }
    }

    /// Add one argument
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set an environment variable for the child process
    pub fn env<K: AsRef<OsStr>, V: AsRef<OsStr>>(mut self, key: K, value: V) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Run the command from `dir`
    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Program and arguments joined by spaces, as a shell would show them
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command and return its output whatever the exit status
    /// # Errors
    /// Error if the program can't be spawned
    pub async fn output(&self) -> Result<CommandOutput, OrgMoverError> {
        log::debug!("Running `{}`", self.display());
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        let output = command.output().await.map_err(|e| {
            OrgMoverError::new(OrgMoverErrorKind::Io)
                .with_text(&format!("Unable to run `{}`: {e}", self.display()))
        })?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run the command and fail when it exits with a non-zero status
    /// # Errors
    /// Error if the program can't be spawned or doesn't succeed
    pub async fn checked(&self) -> Result<CommandOutput, OrgMoverError> {
        let output = self.output().await?;
        if !output.success() {
            return Err(OrgMoverError::new(OrgMoverErrorKind::Command).with_text(&format!(
                "Command failed: {}\n{}",
                self.display(),
                output.stderr.trim()
            )));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let cmd = ExternalCommand::new("git")
            .args(["clone", "--mirror"])
            .arg("https://github.com/acme/tool.git")
            .env("SECRET", "hidden");
        assert_eq!(
            cmd.display(),
            "git clone --mirror https://github.com/acme/tool.git"
        );
    }

    #[tokio::test]
    async fn unchecked_returns_failing_status() {
        let output = ExternalCommand::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .output()
            .await
            .unwrap();
        assert_eq!(output.status, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn checked_fails_with_command_and_stderr() {
        let err = ExternalCommand::new("sh")
            .args(["-c", "echo boom >&2; exit 1"])
            .checked()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &OrgMoverErrorKind::Command);
        let text = err.to_string();
        assert!(text.contains("Command failed: sh -c"));
        assert!(text.contains("boom"));
    }

    #[tokio::test]
    async fn checked_passes_env_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let output = ExternalCommand::new("sh")
            .args(["-c", "echo \"$ORG_MOVER_TEST\"; pwd"])
            .env("ORG_MOVER_TEST", "value")
            .current_dir(dir.path())
            .checked()
            .await
            .unwrap();
        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("value"));
        let pwd = PathBuf::from(lines.next().unwrap());
        assert_eq!(
            pwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let err = ExternalCommand::new("org-mover-no-such-binary")
            .output()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &OrgMoverErrorKind::Io);
    }
}
