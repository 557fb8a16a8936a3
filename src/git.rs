//! Git queries for change detection.

use std::path::Path;

use crate::error::{Error, Result};
use crate::process::Shell;

/// Branch names accepted as the default branch, in preference order.
pub const DEFAULT_BRANCHES: &[&str] = &["main", "master"];

fn git(shell: &Shell, repo: &Path, args: &[&str], what: &str) -> Result<String> {
    let output = shell.output("git", args, repo)?;
    if !output.success {
        return Err(Error::Git(format!(
            "failed to {}: {}",
            what,
            output.failure_detail()
        )));
    }
    Ok(output.stdout)
}

/// Returns the local default branch (`main`, else `master`).
pub fn default_branch(shell: &Shell, repo: &Path) -> Result<String> {
    let output = git(
        shell,
        repo,
        &["branch", "--format=%(refname:short)"],
        "list branches",
    )?;
    let branches: Vec<&str> = output.lines().map(str::trim).collect();

    DEFAULT_BRANCHES
        .iter()
        .find(|candidate| branches.contains(*candidate))
        .map(|branch| branch.to_string())
        .ok_or_else(|| Error::Git("no local 'main' or 'master' branch found".to_string()))
}

/// Returns the merge base of `HEAD` and `branch`.
pub fn merge_base(shell: &Shell, repo: &Path, branch: &str) -> Result<String> {
    let output = git(shell, repo, &["merge-base", "HEAD", branch], "find merge base")?;
    Ok(output.trim().to_string())
}

/// Files changed in the working tree since `base`.
pub fn changed_files_since(shell: &Shell, repo: &Path, base: &str) -> Result<Vec<String>> {
    let output = git(shell, repo, &["diff", "--name-only", base], "diff")?;
    Ok(output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Files changed since this branch diverged from the default branch.
pub fn changed_files_against_default_branch(shell: &Shell, repo: &Path) -> Result<Vec<String>> {
    let branch = default_branch(shell, repo)?;
    let base = merge_base(shell, repo, &branch)?;
    tracing::debug!(branch = %branch, base = %base, "diffing against default branch");
    changed_files_since(shell, repo, &base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn git_cmd(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .current_dir(dir)
            .args(args)
            .output()
            .expect("failed to run git");
        assert!(status.status.success(), "git {:?} failed", args);
    }

    fn create_test_repo(branch: &str) -> TempDir {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        git_cmd(temp_dir.path(), &["init", "-b", branch]);
        git_cmd(temp_dir.path(), &["config", "user.email", "test@test.com"]);
        git_cmd(temp_dir.path(), &["config", "user.name", "Test"]);
        std::fs::write(temp_dir.path().join("README.md"), "# Test\n").unwrap();
        git_cmd(temp_dir.path(), &["add", "-A"]);
        git_cmd(temp_dir.path(), &["commit", "-m", "Initial"]);
        temp_dir
    }

    fn commit_file(dir: &Path, path: &str) {
        let full = dir.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, "change\n").unwrap();
        git_cmd(dir, &["add", "-A"]);
        git_cmd(dir, &["commit", "-m", path]);
    }

    #[test]
    fn default_branch_prefers_main() {
        let repo = create_test_repo("main");
        git_cmd(repo.path(), &["branch", "master"]);
        assert_eq!(default_branch(&Shell::default(), repo.path()).unwrap(), "main");
    }

    #[test]
    fn default_branch_falls_back_to_master() {
        let repo = create_test_repo("master");
        assert_eq!(
            default_branch(&Shell::default(), repo.path()).unwrap(),
            "master"
        );
    }

    #[test]
    fn default_branch_missing_is_git_error() {
        let repo = create_test_repo("trunk");
        let err = default_branch(&Shell::default(), repo.path()).unwrap_err();
        assert!(matches!(err, Error::Git(_)));
    }

    #[test]
    fn changed_files_cover_branch_commits_and_worktree() {
        let repo = create_test_repo("main");
        git_cmd(repo.path(), &["checkout", "-b", "feature"]);
        commit_file(repo.path(), "src/blocks/heading/index.js");
        std::fs::write(repo.path().join("README.md"), "# Changed\n").unwrap();

        let mut files =
            changed_files_against_default_branch(&Shell::default(), repo.path()).unwrap();
        files.sort();

        assert_eq!(files, vec!["README.md", "src/blocks/heading/index.js"]);
    }

    #[test]
    fn no_changes_gives_empty_list() {
        let repo = create_test_repo("main");
        let files =
            changed_files_against_default_branch(&Shell::default(), repo.path()).unwrap();
        assert!(files.is_empty());
    }
}
