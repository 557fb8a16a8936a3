//! Error types for the plugin CI tooling.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for CI operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (arguments, environment, config file).
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested WordPress version matched no resolution rule.
    #[error("unable to parse WordPress version from '{0}'")]
    VersionParse(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected response from {url}: {status}")]
    HttpStatus { url: String, status: u16 },

    /// A zip archive could not be read or extracted.
    #[error("archive error for {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    /// Git operation failed.
    #[error("git operation failed: {0}")]
    Git(String),

    /// Subversion operation failed.
    #[error("svn operation failed: {0}")]
    Svn(String),

    /// Any other external program exited unsuccessfully.
    #[error("command '{program}' failed: {reason}")]
    Command { program: String, reason: String },

    /// GitHub API operation failed.
    #[error("GitHub operation failed: {0}")]
    GitHub(String),

    /// CircleCI API lookup failed.
    #[error("CircleCI operation failed: {0}")]
    CircleCi(String),

    /// Database provisioning failed.
    #[error("database setup failed: {0}")]
    Database(String),
}

/// Result type alias for CI operations.
pub type Result<T> = std::result::Result<T, Error>;
