//! Pull request comments for build artifacts and performance results.
//!
//! Each kind of comment is posted once per pull request and then edited in
//! place: the bot's previous comment is found by its marker text.

use std::path::Path;

use crate::error::Result;
use crate::github::{find_bot_comment, CommentApi};

/// Marker identifying the artifact download comment.
pub const ARTIFACT_MARKER: &str = "Download";

/// Marker identifying the performance results comment.
pub const PERFORMANCE_MARKER: &str = "Performance Test Results";

/// What to comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentKind {
    /// Link to the plugin zip built for the pull request.
    Artifact { repo: String, url: String },
    /// Editor performance results.
    Performance { results: String },
}

impl CommentKind {
    /// Text used to recognise a previous comment of this kind.
    pub fn marker(&self) -> &'static str {
        match self {
            CommentKind::Artifact { .. } => ARTIFACT_MARKER,
            CommentKind::Performance { .. } => PERFORMANCE_MARKER,
        }
    }

    /// The comment body.
    pub fn body(&self) -> String {
        match self {
            CommentKind::Artifact { repo, url } => format!("Download {}.zip: {}", repo, url),
            CommentKind::Performance { results } => {
                format!("## {}: \r\n{}", PERFORMANCE_MARKER, results)
            }
        }
    }
}

/// What happened on the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentAction {
    /// An existing bot comment was edited.
    Updated { id: u64, url: String },
    /// A new comment was posted.
    Created { id: u64, url: String },
}

/// Reads performance results, turning literal `\r\n` escapes into line breaks.
pub fn read_performance_results(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)?;
    Ok(raw.replace("\\r\\n", "\r\n"))
}

/// Posts or updates comments as the bot account.
pub struct CommentPoster<'a> {
    api: &'a dyn CommentApi,
    bot_login: String,
}

impl<'a> CommentPoster<'a> {
    /// Creates a poster that edits comments authored by `bot_login`.
    pub fn new(api: &'a dyn CommentApi, bot_login: impl Into<String>) -> Self {
        Self {
            api,
            bot_login: bot_login.into(),
        }
    }

    /// Verifies the token and returns the authenticated login.
    pub async fn authenticate(&self) -> Result<String> {
        let login = self.api.authenticated_user().await?;
        tracing::info!(login = %login, "authenticated with GitHub");
        Ok(login)
    }

    /// Updates the bot's previous comment of this kind on `pr`, or posts a new one.
    ///
    /// A failed update falls back to posting a new comment.
    pub async fn upsert(&self, pr: u64, kind: &CommentKind) -> Result<CommentAction> {
        let body = kind.body();
        let comments = self.api.list_comments(pr).await?;

        match find_bot_comment(&comments, &self.bot_login, kind.marker()) {
            Some(existing) => match self.api.update_comment(existing.id, &body).await {
                Ok(updated) => {
                    tracing::info!(
                        id = updated.id,
                        url = %updated.html_url,
                        "updated existing comment"
                    );
                    return Ok(CommentAction::Updated {
                        id: updated.id,
                        url: updated.html_url,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        id = existing.id,
                        error = %e,
                        "unable to update existing comment"
                    );
                }
            },
            None => {
                tracing::info!(pr, marker = kind.marker(), "no existing comment found");
            }
        }

        let created = self.api.create_comment(pr, &body).await?;
        tracing::info!(id = created.id, url = %created.html_url, "comment created");
        Ok(CommentAction::Created {
            id: created.id,
            url: created.html_url,
        })
    }
}
