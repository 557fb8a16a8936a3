//! CircleCI job environment.
//!
//! Read once per process in `main` and passed down explicitly. Accessors for
//! required values fail with [`Error::Config`] naming the missing variable.

use std::path::PathBuf;

use crate::error::{Error, Result};

pub const GH_AUTH_TOKEN: &str = "GH_AUTH_TOKEN";
pub const CIRCLE_PROJECT_USERNAME: &str = "CIRCLE_PROJECT_USERNAME";
pub const CIRCLE_PROJECT_REPONAME: &str = "CIRCLE_PROJECT_REPONAME";
pub const CIRCLE_BRANCH: &str = "CIRCLE_BRANCH";
pub const CIRCLE_PULL_REQUEST: &str = "CIRCLE_PULL_REQUEST";
pub const CIRCLE_JOB: &str = "CIRCLE_JOB";
pub const CIRCLE_TAG: &str = "CIRCLE_TAG";
pub const CIRCLE_SHA1: &str = "CIRCLE_SHA1";
pub const WP_ORG_USERNAME: &str = "WP_ORG_USERNAME";
pub const WP_ORG_PASSWORD: &str = "WP_ORG_PASSWORD";

/// Environment of the current CI job.
#[derive(Debug, Clone, Default)]
pub struct CiEnv {
    pub gh_auth_token: Option<String>,
    pub project_username: Option<String>,
    pub project_reponame: Option<String>,
    pub branch: Option<String>,
    pub pull_request: Option<String>,
    pub job: Option<String>,
    pub tag: Option<String>,
    pub sha1: Option<String>,
    pub wp_org_username: Option<String>,
    pub wp_org_password: Option<String>,
    pub home: Option<PathBuf>,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| Error::Config(format!("{} environment variable is not set", name)))
}

impl CiEnv {
    /// Reads the job environment. Empty variables count as unset.
    pub fn from_env() -> Self {
        Self {
            gh_auth_token: var(GH_AUTH_TOKEN),
            project_username: var(CIRCLE_PROJECT_USERNAME),
            project_reponame: var(CIRCLE_PROJECT_REPONAME),
            branch: var(CIRCLE_BRANCH),
            pull_request: var(CIRCLE_PULL_REQUEST),
            job: var(CIRCLE_JOB),
            tag: var(CIRCLE_TAG),
            sha1: var(CIRCLE_SHA1),
            wp_org_username: var(WP_ORG_USERNAME),
            wp_org_password: var(WP_ORG_PASSWORD),
            home: var("HOME").map(PathBuf::from),
        }
    }

    /// Sets the project owner and repository.
    pub fn with_project(mut self, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        self.project_username = Some(owner.into());
        self.project_reponame = Some(repo.into());
        self
    }

    /// Sets the pull request URL.
    pub fn with_pull_request(mut self, url: impl Into<String>) -> Self {
        self.pull_request = Some(url.into());
        self
    }

    /// Sets the GitHub token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.gh_auth_token = Some(token.into());
        self
    }

    /// Sets the home directory.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn github_token(&self) -> Result<&str> {
        required(&self.gh_auth_token, GH_AUTH_TOKEN)
    }

    pub fn owner(&self) -> Result<&str> {
        required(&self.project_username, CIRCLE_PROJECT_USERNAME)
    }

    pub fn repo(&self) -> Result<&str> {
        required(&self.project_reponame, CIRCLE_PROJECT_REPONAME)
    }

    pub fn branch(&self) -> Result<&str> {
        required(&self.branch, CIRCLE_BRANCH)
    }

    pub fn tag(&self) -> Result<&str> {
        required(&self.tag, CIRCLE_TAG)
    }

    pub fn sha1(&self) -> Result<&str> {
        required(&self.sha1, CIRCLE_SHA1)
    }

    pub fn wp_org_credentials(&self) -> Result<(&str, &str)> {
        Ok((
            required(&self.wp_org_username, WP_ORG_USERNAME)?,
            required(&self.wp_org_password, WP_ORG_PASSWORD)?,
        ))
    }

    /// Home directory of the CI user.
    pub fn home_dir(&self) -> Result<PathBuf> {
        self.home
            .clone()
            .ok_or_else(|| Error::Config("HOME environment variable is not set".to_string()))
    }

    /// Pull request number, taken from the last segment of `CIRCLE_PULL_REQUEST`.
    ///
    /// e.g. `https://github.com/godaddy-wordpress/coblocks/pull/756/` gives 756.
    pub fn pull_request_number(&self) -> Result<u64> {
        let url = self.pull_request.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "this does not appear to be a pull request ({} is not set)",
                CIRCLE_PULL_REQUEST
            ))
        })?;

        let trimmed = url.trim_end_matches('/');
        let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);

        segment.parse().map_err(|_| {
            Error::Config(format!(
                "cannot read a pull request number from {}='{}'",
                CIRCLE_PULL_REQUEST, url
            ))
        })
    }
}
