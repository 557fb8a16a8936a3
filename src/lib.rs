//! plugin-ci - CI automation for a WordPress plugin
//!
//! This library provides the steps run by the plugin's CircleCI jobs: PHPUnit
//! test environment installation, Cypress spec selection from changed files,
//! pull request comments for build artifacts and performance results, and
//! release deployment to WordPress.org and GitHub.

pub mod archive;
pub mod ci_env;
pub mod circleci;
pub mod comment;
pub mod config;
pub mod debug;
pub mod deploy;
pub mod deps;
pub mod error;
pub mod git;
pub mod github;
pub mod http;
pub mod install;
pub mod process;
pub mod redact;
pub mod specs;
pub mod svn;
pub mod template;
pub mod version;

pub use error::{Error, Result};

pub use ci_env::CiEnv;
pub use circleci::{Artifact, BuildSummary, CircleCiClient};
pub use comment::{CommentAction, CommentKind, CommentPoster};
pub use config::{
    DatabaseConfig, GitHubConfig, PluginConfig, ProjectConfig, SpecsConfig, Validate,
    ValidationResult,
};
pub use deploy::{extract_changelog, DeployPaths, Deployer, Release};
pub use github::{CommentApi, GitHubClient, IssueComment};
pub use http::HttpClient;
pub use install::{InstallOptions, InstallPaths, Installer};
pub use process::{CommandOutput, Shell};
pub use redact::Redactor;
pub use specs::{
    select_specs, write_spec_string, SpecGlob, SpecOutcome, SpecSelection, SpecSelector,
};
pub use svn::SvnClient;
pub use template::TestsConfig;
pub use version::{resolve, Endpoints, ResolvedVersion, VersionSpec};
