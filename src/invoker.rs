//! Runs `VBoxManage` and captures what it printed.
//!
//! A nonzero exit status is returned as data. Callers decide whether it is a
//! failure; the only error here is not being able to start the process.

use std::path::PathBuf;

use crate::error::BoxerError;

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Trimmed stderr, falling back to stdout for tools that report errors there.
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }

    /// Turn a nonzero exit into `CommandFailed`.
    pub fn check(self, args: &[String]) -> Result<Self, BoxerError> {
        if self.success() {
            Ok(self)
        } else {
            Err(BoxerError::CommandFailed {
                command: describe(args),
                stderr: self.error_text(),
            })
        }
    }
}

#[allow(async_fn_in_trait)] // trait is internal-only
pub trait Invoker {
    /// Spawn one process with `args`, wait for it, return its output.
    async fn invoke(&self, args: &[String]) -> Result<CommandOutput, BoxerError>;
}

/// The real `VBoxManage` executable.
#[derive(Debug, Clone)]
pub struct VBoxManage {
    program: PathBuf,
}

impl VBoxManage {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Invoker for VBoxManage {
    async fn invoke(&self, args: &[String]) -> Result<CommandOutput, BoxerError> {
        tracing::debug!(program = %self.program.display(), ?args, "invoking");

        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|source| BoxerError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(status = ?result.status, "command finished");
        Ok(result)
    }
}

/// Build an owned argument vector from string slices.
pub fn argv<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Short human label for a command: `VBoxManage startvm`.
pub fn describe(args: &[String]) -> String {
    match args.first() {
        Some(sub) => format!("VBoxManage {sub}"),
        None => "VBoxManage".to_string(),
    }
}
