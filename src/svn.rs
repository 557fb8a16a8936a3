//! Subversion client wrapper.
//!
//! Wraps the `svn` CLI for the WordPress develop fixtures checkout and the
//! WordPress.org plugin registry deploy.

use std::path::Path;

use crate::error::{Error, Result};
use crate::process::Shell;

/// One line of `svn status` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// First status column (`?` unversioned, `!` missing, `A` added, ...).
    pub code: char,
    /// Path relative to the working copy.
    pub path: String,
}

impl StatusEntry {
    /// Returns true if the item is versioned but gone from disk.
    pub fn is_missing(&self) -> bool {
        self.code == '!'
    }
}

/// Parses `svn status` output.
///
/// Status flags occupy the first seven columns, followed by a space and the path.
pub fn parse_status(output: &str) -> Vec<StatusEntry> {
    output
        .lines()
        .filter_map(|line| {
            let code = line.chars().next()?;
            let path = line.get(8..)?.trim();
            if path.is_empty() {
                return None;
            }
            Some(StatusEntry {
                code,
                path: path.to_string(),
            })
        })
        .collect()
}

/// Credentials for committing to a remote repository.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Client for running `svn` commands.
#[derive(Debug, Clone)]
pub struct SvnClient {
    shell: Shell,
}

impl SvnClient {
    /// Creates a client running commands through `shell`.
    pub fn new(shell: Shell) -> Self {
        Self { shell }
    }

    fn svn(&self, cwd: &Path, args: &[&str], what: &str) -> Result<String> {
        let output = self.shell.output("svn", args, cwd)?;
        if !output.success {
            return Err(Error::Svn(format!(
                "failed to {}: {}",
                what,
                output.failure_detail()
            )));
        }
        Ok(output.stdout)
    }

    fn path_arg<'a>(path: &'a Path, what: &str) -> Result<&'a str> {
        path.to_str().ok_or_else(|| {
            Error::Svn(format!(
                "{} path is not valid UTF-8: {}",
                what,
                path.display()
            ))
        })
    }

    /// Checks out `url` into `dest`.
    pub fn checkout(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_str = Self::path_arg(dest, "checkout")?;
        let cwd = dest.parent().unwrap_or(dest);
        tracing::info!(url, dest = %dest.display(), "svn checkout");
        self.svn(cwd, &["co", url, dest_str], "check out")?;
        Ok(())
    }

    /// Quietly checks out `url` into `dest` without externals.
    pub fn checkout_quiet(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_str = Self::path_arg(dest, "checkout")?;
        let cwd = dest.parent().unwrap_or(dest);
        tracing::info!(url, dest = %dest.display(), "svn checkout");
        self.svn(
            cwd,
            &["co", "--quiet", "--ignore-externals", url, dest_str],
            "check out",
        )?;
        Ok(())
    }

    /// Copies `from` to `to` inside the working copy (e.g. trunk to a tag).
    pub fn copy(&self, working_copy: &Path, from: &str, to: &str) -> Result<()> {
        self.svn(working_copy, &["cp", from, to], "copy")?;
        Ok(())
    }

    /// Schedules every unversioned file in the working copy for addition.
    pub fn add_all(&self, working_copy: &Path) -> Result<()> {
        self.svn(working_copy, &["add", "--force", "."], "add files")?;
        Ok(())
    }

    /// Returns the working copy status.
    pub fn status(&self, working_copy: &Path) -> Result<Vec<StatusEntry>> {
        let output = self.svn(working_copy, &["status"], "read status")?;
        Ok(parse_status(&output))
    }

    /// Schedules `paths` for deletion.
    pub fn remove(&self, working_copy: &Path, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["rm"];
        args.extend(paths.iter().map(String::as_str));
        self.svn(working_copy, &args, "remove files")?;
        Ok(())
    }

    /// Schedules deletion of every versioned file missing from disk.
    ///
    /// Returns the removed paths.
    pub fn remove_missing(&self, working_copy: &Path) -> Result<Vec<String>> {
        let missing: Vec<String> = self
            .status(working_copy)?
            .into_iter()
            .filter(StatusEntry::is_missing)
            .map(|entry| entry.path)
            .collect();

        self.remove(working_copy, &missing)?;
        Ok(missing)
    }

    /// Commits the working copy.
    pub fn commit(
        &self,
        working_copy: &Path,
        message: &str,
        credentials: Option<Credentials<'_>>,
    ) -> Result<String> {
        let mut args = vec!["ci"];
        if let Some(credentials) = credentials {
            args.extend([
                "--no-auth-cache",
                "--username",
                credentials.username,
                "--password",
                credentials.password,
            ]);
        }
        args.extend(["-m", message]);
        self.svn(working_copy, &args, "commit")
    }
}
