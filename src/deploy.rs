//! Release deployment to the WordPress.org plugin SVN repository and GitHub.

use std::path::{Path, PathBuf};

use crate::ci_env::{CiEnv, GH_AUTH_TOKEN, WP_ORG_PASSWORD};
use crate::config::PluginConfig;
use crate::error::{Error, Result};
use crate::process::Shell;
use crate::redact::Redactor;
use crate::svn::{Credentials, SvnClient};

/// Heading that starts the changelog section of `readme.txt`.
pub const CHANGELOG_HEADING: &str = "== Changelog ==";

/// Returns the text after the changelog heading, if present.
pub fn extract_changelog(readme: &str) -> Option<&str> {
    readme
        .split_once(CHANGELOG_HEADING)
        .map(|(_, changelog)| changelog.trim())
}

/// Replaces `dest` with a recursive copy of `src`.
///
/// Returns the number of files copied.
pub fn replace_dir(src: &Path, dest: &Path) -> Result<usize> {
    if !src.is_dir() {
        return Err(Error::Config(format!(
            "source directory does not exist: {}",
            src.display()
        )));
    }

    match std::fs::remove_dir_all(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let mut copied = 0;
    for entry in walkdir::WalkDir::new(src) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    tracing::debug!(
        src = %src.display(),
        dest = %dest.display(),
        files = copied,
        "copied directory"
    );
    Ok(copied)
}

/// A tagged release, read from the CI environment.
#[derive(Debug, Clone)]
pub struct Release {
    pub tag: String,
    pub owner: String,
    pub repo: String,
    pub sha1: String,
    pub github_token: String,
    pub svn_username: String,
    pub svn_password: String,
}

impl Release {
    /// Reads the release from `env`, failing on the first missing variable.
    pub fn from_env(env: &CiEnv) -> Result<Self> {
        let (svn_username, svn_password) = env.wp_org_credentials()?;
        Ok(Self {
            tag: env.tag()?.to_string(),
            owner: env.owner()?.to_string(),
            repo: env.repo()?.to_string(),
            sha1: env.sha1()?.to_string(),
            github_token: env.github_token()?.to_string(),
            svn_username: svn_username.to_string(),
            svn_password: svn_password.to_string(),
        })
    }

    /// Redactor hiding this release's credentials.
    pub fn redactor(&self) -> Redactor {
        Redactor::new()
            .with_secret(GH_AUTH_TOKEN, self.github_token.as_str())
            .with_secret(WP_ORG_PASSWORD, self.svn_password.as_str())
    }

    fn credentials(&self) -> Credentials<'_> {
        Credentials {
            username: &self.svn_username,
            password: &self.svn_password,
        }
    }

    /// Arguments for `ghr`, publishing `artifacts` with `changelog` as the body.
    pub fn ghr_args<'a>(&'a self, changelog: &'a str, artifacts: &'a str) -> Vec<&'a str> {
        vec![
            "-t",
            self.github_token.as_str(),
            "-u",
            self.owner.as_str(),
            "-r",
            self.repo.as_str(),
            "-c",
            self.sha1.as_str(),
            "-b",
            changelog,
            "-delete",
            self.tag.as_str(),
            artifacts,
        ]
    }
}

/// Where deployment reads from and writes to.
#[derive(Debug, Clone)]
pub struct DeployPaths {
    /// Project checkout holding the build and assets directories.
    pub project_dir: PathBuf,
    /// Plugin readme with the changelog.
    pub readme: PathBuf,
    /// SVN working copy.
    pub working_copy: PathBuf,
}

impl DeployPaths {
    /// Default CircleCI layout: project in `~/project`, working copy in `~/{slug}`.
    pub fn for_home(home: &Path, project_dir: &Path, plugin: &PluginConfig) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            readme: home.join("project").join("readme.txt"),
            working_copy: home.join(&plugin.slug),
        }
    }
}

/// Publishes a tagged release.
pub struct Deployer {
    shell: Shell,
    svn: SvnClient,
    plugin: PluginConfig,
}

impl Deployer {
    pub fn new(shell: Shell, plugin: PluginConfig) -> Self {
        Self {
            svn: SvnClient::new(shell.clone()),
            shell,
            plugin,
        }
    }

    /// Commits the built plugin to SVN as trunk and a new tag, then creates
    /// the GitHub release.
    pub fn deploy(&self, release: &Release, paths: &DeployPaths) -> Result<()> {
        let wc = &paths.working_copy;
        tracing::info!(tag = %release.tag, slug = %self.plugin.slug, "deploying release");

        self.svn.checkout(&self.plugin.svn_url(), wc)?;
        self.stage(release, paths)?;

        let message = format!("Deploy version {} of {}", release.tag, self.plugin.name);
        let output = self.svn.commit(wc, &message, Some(release.credentials()))?;
        tracing::info!(output = %output.trim(), "committed to WordPress.org");

        self.publish_github_release(release, paths)
    }

    /// Brings the working copy in line with the build and tags it.
    pub fn stage(&self, release: &Release, paths: &DeployPaths) -> Result<()> {
        let wc = &paths.working_copy;

        let build = paths.project_dir.join(&self.plugin.build_dir).join(&self.plugin.slug);
        let files = replace_dir(&build, &wc.join("trunk"))?;
        tracing::info!(files, "replaced trunk");

        let assets = paths.project_dir.join(&self.plugin.assets_dir);
        let files = replace_dir(&assets, &wc.join("assets"))?;
        tracing::info!(files, "replaced assets");

        self.svn.add_all(wc)?;
        let removed = self.svn.remove_missing(wc)?;
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "scheduled removed files for deletion");
        }

        self.svn.copy(wc, "trunk", &format!("tags/{}", release.tag))?;
        tracing::info!(tag = %release.tag, "tagged trunk");
        Ok(())
    }

    fn publish_github_release(&self, release: &Release, paths: &DeployPaths) -> Result<()> {
        let readme = std::fs::read_to_string(&paths.readme).map_err(|e| {
            Error::Config(format!("cannot read '{}': {}", paths.readme.display(), e))
        })?;
        let changelog = match extract_changelog(&readme) {
            Some(changelog) => changelog,
            None => {
                tracing::warn!(
                    readme = %paths.readme.display(),
                    "no changelog section, using whole readme"
                );
                readme.trim()
            }
        };

        let artifacts = self.plugin.release_artifacts.to_str().ok_or_else(|| {
            Error::Config(format!(
                "artifacts path is not valid UTF-8: {}",
                self.plugin.release_artifacts.display()
            ))
        })?;

        let output = self
            .shell
            .run("ghr", &release.ghr_args(changelog, artifacts), &paths.project_dir)?;
        tracing::info!(tag = %release.tag, output = %output.trim(), "published GitHub release");
        Ok(())
    }
}
