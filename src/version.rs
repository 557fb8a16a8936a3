//! WordPress version resolution.
//!
//! Maps a requested WordPress version onto the develop.svn.wordpress.org path
//! that holds the matching PHPUnit fixtures, and onto the core archive to
//! download. Resolution is a pure function over strings; fetching the
//! version-check payload used as a fallback is the caller's job.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn pre_release_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]+\.[0-9]+)-(beta|RC)[0-9]+$").expect("pre-release pattern is valid")
    })
}

fn branch_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+\.[0-9]+$").expect("branch pattern is valid"))
}

fn release_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+\.[0-9]+\.[0-9]+").expect("release pattern is valid"))
}

fn latest_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[0-9]+\.[0-9]+(\.[0-9]+)?").expect("latest pattern is valid"))
}

/// Remote locations used to turn a resolved version into URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Root of the WordPress develop SVN repository.
    pub develop_svn: String,
    /// Base URL serving `{archive}.zip` core downloads.
    pub downloads: String,
    /// Nightly build archive, used when resolving to trunk.
    pub nightly_archive: String,
    /// Version-check endpoint whose payload names the latest release.
    pub version_check: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            develop_svn: "https://develop.svn.wordpress.org".to_string(),
            downloads: "https://wordpress.org".to_string(),
            nightly_archive: "https://wordpress.org/nightly-builds/wordpress-latest.zip"
                .to_string(),
            version_check: "http://api.wordpress.org/core/version-check/1.7/".to_string(),
        }
    }
}

/// Classification of a requested version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// `x.y-betaN` or `x.y-RCN`; `base` is `x.y`.
    PreRelease { base: String },
    /// `x.y`, a release branch.
    Branch(String),
    /// Anything containing `x.y.z`.
    Release(String),
    /// `nightly` or `trunk`.
    Nightly,
    /// Anything else, `latest` included.
    Latest,
}

impl VersionSpec {
    /// Classifies `requested`, trying each form in resolution order.
    pub fn parse(requested: &str) -> Self {
        if let Some(captures) = pre_release_pattern().captures(requested) {
            return VersionSpec::PreRelease {
                base: captures[1].to_string(),
            };
        }

        if branch_pattern().is_match(requested) {
            return VersionSpec::Branch(requested.to_string());
        }

        if release_pattern().is_match(requested) {
            return VersionSpec::Release(requested.to_string());
        }

        if requested == "nightly" || requested == "trunk" {
            return VersionSpec::Nightly;
        }

        VersionSpec::Latest
    }

    /// Returns true when resolution depends on the version-check payload.
    pub fn needs_latest_descriptor(&self) -> bool {
        matches!(self, VersionSpec::Latest)
    }
}

/// The rule that produced a [`ResolvedVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    PreRelease,
    Branch,
    Release,
    Nightly,
    Latest,
}

/// Where to fetch fixtures and core for a requested version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVersion {
    /// Path inside the develop SVN repository (`branches/5.9`, `tags/6.1.2`, `trunk`).
    pub tag_path: String,
    /// Archive stem for the core download, `None` for trunk/nightly.
    pub archive: Option<String>,
    /// Which rule fired.
    pub rule: ResolutionRule,
}

impl ResolvedVersion {
    fn branch(version: &str, rule: ResolutionRule) -> Self {
        Self {
            tag_path: format!("branches/{}", version),
            archive: Some(format!("wordpress-{}", version)),
            rule,
        }
    }

    /// Returns true when core comes from the nightly build.
    pub fn is_nightly(&self) -> bool {
        self.archive.is_none()
    }

    /// URL of the PHPUnit fixture directory `dir` (`includes` or `data`).
    pub fn tests_checkout_url(&self, endpoints: &Endpoints, dir: &str) -> String {
        format!(
            "{}/{}/tests/phpunit/{}/",
            endpoints.develop_svn, self.tag_path, dir
        )
    }

    /// URL of the `wp-tests-config-sample.php` template for this version.
    pub fn config_template_url(&self, endpoints: &Endpoints) -> String {
        format!(
            "{}/{}/wp-tests-config-sample.php",
            endpoints.develop_svn, self.tag_path
        )
    }

    /// URL of the core archive, or the nightly build when resolving to trunk.
    pub fn core_download_url(&self, endpoints: &Endpoints) -> String {
        match &self.archive {
            Some(archive) => format!("{}/{}.zip", endpoints.downloads, archive),
            None => endpoints.nightly_archive.clone(),
        }
    }
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.archive {
            Some(archive) => write!(f, "{} ({})", self.tag_path, archive),
            None => write!(f, "{} (nightly)", self.tag_path),
        }
    }
}

/// Resolves `requested` to a tag path and archive name.
///
/// `latest_descriptor` is the raw version-check payload; it is only consulted
/// when `requested` matches none of the explicit forms. A `.0` in a full
/// version is removed at its first occurrence, so `6.1.0` becomes `6.1`
/// (and, as a known quirk, `6.0.1` also becomes `6.1`).
pub fn resolve(requested: &str, latest_descriptor: &str) -> Result<ResolvedVersion> {
    match VersionSpec::parse(requested) {
        VersionSpec::PreRelease { base } => {
            Ok(ResolvedVersion::branch(&base, ResolutionRule::PreRelease))
        }
        VersionSpec::Branch(version) => {
            Ok(ResolvedVersion::branch(&version, ResolutionRule::Branch))
        }
        VersionSpec::Release(version) => {
            let tag = version.replacen(".0", "", 1);
            Ok(ResolvedVersion {
                tag_path: format!("tags/{}", tag),
                archive: Some(format!("wordpress-{}", tag)),
                rule: ResolutionRule::Release,
            })
        }
        VersionSpec::Nightly => Ok(ResolvedVersion {
            tag_path: "trunk".to_string(),
            archive: None,
            rule: ResolutionRule::Nightly,
        }),
        VersionSpec::Latest => latest_pattern()
            .find(latest_descriptor)
            .map(|found| ResolvedVersion {
                tag_path: format!("tags/{}", found.as_str()),
                archive: Some("latest".to_string()),
                rule: ResolutionRule::Latest,
            })
            .ok_or_else(|| Error::VersionParse(requested.to_string())),
    }
}
