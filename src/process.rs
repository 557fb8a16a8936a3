//! External program execution.
//!
//! Every command is logged at debug level with secrets redacted, and its
//! output is captured as lossy UTF-8.

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};
use crate::redact::Redactor;

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stderr if present, otherwise stdout, trimmed.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs external programs for one CI invocation.
#[derive(Debug, Clone, Default)]
pub struct Shell {
    redactor: Redactor,
}

impl Shell {
    /// Creates a shell that redacts the given secrets from logs and errors.
    pub fn new(redactor: Redactor) -> Self {
        Self { redactor }
    }

    /// Runs `program` and captures its output without checking the exit status.
    pub fn output(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
        tracing::debug!(
            command = %self.redactor.command_line(program, args),
            cwd = %cwd.display(),
            "running command"
        );

        let output = Command::new(program)
            .current_dir(cwd)
            .args(args)
            .output()
            .map_err(|e| Error::Command {
                program: program.to_string(),
                reason: format!("failed to start: {}", e),
            })?;

        let result = CommandOutput {
            success: output.status.success(),
            stdout: self.redactor.redact(&String::from_utf8_lossy(&output.stdout)),
            stderr: self.redactor.redact(&String::from_utf8_lossy(&output.stderr)),
        };

        tracing::debug!(program, success = result.success, "command finished");
        Ok(result)
    }

    /// Runs `program` and returns its stdout, failing on a non-zero exit.
    pub fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<String> {
        let output = self.output(program, args, cwd)?;
        if !output.success {
            return Err(Error::Command {
                program: program.to_string(),
                reason: output.failure_detail(),
            });
        }
        Ok(output.stdout)
    }

    /// Runs a command line through `sh -c`.
    pub fn run_script(&self, script: &str, cwd: &Path) -> Result<String> {
        self.run("sh", &["-c", script], cwd)
    }
}
