//! Project configuration and validation.
//!
//! Settings that differ between plugins (slug, bot account, spec layout,
//! e2e database) live in an optional `plugin-ci.toml` at the project root.
//! Every field has a default, so a missing file means "CoBlocks defaults".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::specs::{SpecSelector, DEFAULT_CATEGORIES, DEFAULT_SPEC_STRING_PATH, DEFAULT_SPEC_SUFFIX};
use crate::version::Endpoints;

/// File name looked up in the project root.
pub const CONFIG_FILE: &str = "plugin-ci.toml";

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merges another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

/// The plugin being built and deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// WordPress.org slug, also the SVN repository name.
    pub slug: String,
    /// Human readable name used in commit messages.
    pub name: String,
    /// Root of the WordPress.org plugin SVN host.
    pub svn_root: String,
    /// Directory containing `{slug}/`, the built plugin.
    pub build_dir: PathBuf,
    /// WordPress.org banner/icon assets.
    pub assets_dir: PathBuf,
    /// Files attached to the GitHub release.
    pub release_artifacts: PathBuf,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            slug: "coblocks".to_string(),
            name: "CoBlocks".to_string(),
            svn_root: "http://svn.wp-plugins.org".to_string(),
            build_dir: PathBuf::from("build"),
            assets_dir: PathBuf::from(".wordpress-org"),
            release_artifacts: PathBuf::from("/tmp/artifacts"),
        }
    }
}

impl PluginConfig {
    /// URL of the plugin's SVN repository.
    pub fn svn_url(&self) -> String {
        format!("{}/{}", self.svn_root.trim_end_matches('/'), self.slug)
    }
}

/// Spec selection layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecsConfig {
    /// Tracked source directories.
    pub categories: Vec<String>,
    /// Glob appended to each feature directory.
    pub suffix: String,
    /// Where the spec string is written.
    pub output: PathBuf,
}

impl Default for SpecsConfig {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            suffix: DEFAULT_SPEC_SUFFIX.to_string(),
            output: PathBuf::from(DEFAULT_SPEC_STRING_PATH),
        }
    }
}

impl SpecsConfig {
    /// Builds a selector for this layout.
    pub fn selector(&self) -> SpecSelector {
        SpecSelector::new(self.categories.clone(), self.suffix.clone())
    }
}

/// GitHub and CircleCI endpoints and identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub REST API root.
    pub api_url: String,
    /// Account whose comments are updated in place.
    pub bot_login: String,
    /// CircleCI v1.1 API root.
    pub circleci_api_url: String,
    /// Workflow job producing the plugin zip artifact.
    pub build_job: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            bot_login: "godaddy-wordpress-bot".to_string(),
            circleci_api_url: "https://circleci.com/api/v1.1".to_string(),
            build_job: "build".to_string(),
        }
    }
}

/// Test database provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database created for Cypress runs.
    pub e2e_database: String,
    /// CircleCI jobs that get the e2e database instead of the named one.
    pub e2e_jobs: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            e2e_database: "coblocks".to_string(),
            e2e_jobs: vec!["e2e-firefox".to_string(), "e2e-chrome".to_string()],
        }
    }
}

impl DatabaseConfig {
    /// Returns true if `job` provisions the e2e database.
    pub fn is_e2e_job(&self, job: Option<&str>) -> bool {
        job.is_some_and(|job| self.e2e_jobs.iter().any(|j| j == job))
    }
}

/// Complete project configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub plugin: PluginConfig,
    pub specs: SpecsConfig,
    pub github: GitHubConfig,
    pub database: DatabaseConfig,
    pub wordpress: Endpoints,
}

impl ProjectConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("invalid {}: {}", CONFIG_FILE, e)))
    }

    /// Loads configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Loads `plugin-ci.toml` from `dir`, or defaults if it does not exist.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading project config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn is_sql_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Validate for PluginConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.slug.trim().is_empty() {
            result.add_error("plugin.slug cannot be empty");
        } else if self.slug.contains('/') {
            result.add_error(format!("plugin.slug '{}' must not contain '/'", self.slug));
        }

        if !is_http_url(&self.svn_root) {
            result.add_error(format!("plugin.svn_root '{}' is not an http(s) URL", self.svn_root));
        }

        if self.name.trim().is_empty() {
            result.add_warning("plugin.name is empty, deploy commit messages will be terse");
        }

        result
    }
}

impl Validate for SpecsConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.categories.is_empty() {
            result.add_warning("specs.categories is empty, no spec will ever be selected");
        }

        for category in &self.categories {
            if category.trim_matches('/').is_empty() {
                result.add_error("specs.categories contains an empty category");
            }
        }

        if self.suffix.trim().is_empty() {
            result.add_error("specs.suffix cannot be empty");
        }

        result
    }
}

impl Validate for GitHubConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !is_http_url(&self.api_url) {
            result.add_error(format!("github.api_url '{}' is not an http(s) URL", self.api_url));
        }

        if !is_http_url(&self.circleci_api_url) {
            result.add_error(format!(
                "github.circleci_api_url '{}' is not an http(s) URL",
                self.circleci_api_url
            ));
        }

        if self.bot_login.trim().is_empty() {
            result.add_warning(
                "github.bot_login is empty, existing comments will never be updated",
            );
        }

        result
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        // Interpolated into CREATE DATABASE.
        if !is_sql_identifier(&self.e2e_database) {
            result.add_error(format!(
                "database.e2e_database '{}' must be alphanumeric or '_'",
                self.e2e_database
            ));
        }

        result
    }
}

impl Validate for Endpoints {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        for (name, url) in [
            ("wordpress.develop_svn", &self.develop_svn),
            ("wordpress.downloads", &self.downloads),
            ("wordpress.nightly_archive", &self.nightly_archive),
            ("wordpress.version_check", &self.version_check),
        ] {
            if !is_http_url(url) {
                result.add_error(format!("{} '{}' is not an http(s) URL", name, url));
            }
        }

        result
    }
}

impl Validate for ProjectConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        result.merge(self.plugin.validate());
        result.merge(self.specs.validate());
        result.merge(self.github.validate());
        result.merge(self.database.validate());
        result.merge(self.wordpress.validate());
        result
    }
}
