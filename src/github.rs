//! GitHub REST client for pull request comments.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Comments requested per page when listing.
const PER_PAGE: usize = 100;

/// A GitHub account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

/// A comment on an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub html_url: String,
}

/// Reads a string field that the API may send as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl IssueComment {
    /// Login of the comment author, if known.
    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

/// Pull request comment operations.
#[async_trait]
pub trait CommentApi: Send + Sync {
    /// Returns the login of the authenticated account.
    async fn authenticated_user(&self) -> Result<String>;

    /// Lists every comment on pull request `pr`.
    async fn list_comments(&self, pr: u64) -> Result<Vec<IssueComment>>;

    /// Replaces the body of comment `id`.
    async fn update_comment(&self, id: u64, body: &str) -> Result<IssueComment>;

    /// Adds a comment to pull request `pr`.
    async fn create_comment(&self, pr: u64, body: &str) -> Result<IssueComment>;
}

/// Returns the first comment by `bot_login` whose body contains `marker`.
pub fn find_bot_comment<'a>(
    comments: &'a [IssueComment],
    bot_login: &str,
    marker: &str,
) -> Option<&'a IssueComment> {
    comments
        .iter()
        .find(|c| c.author() == Some(bot_login) && c.body.contains(marker))
}

/// GitHub REST client scoped to one repository.
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
    owner: String,
    repo: String,
}

impl GitHubClient {
    /// Creates a client for `owner/repo` authenticating with `token`.
    pub fn new(
        api_url: &str,
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("plugin-ci/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_url, self.owner, self.repo, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        expected: StatusCode,
    ) -> Result<T> {
        tracing::debug!(method = %method, url, "GitHub request");

        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(body) = body {
            request = request.json(&CommentBody { body });
        }

        let response = request.send().await?;
        let status = response.status();
        if status != expected {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::GitHub(format!(
                "{} {} returned {} (expected {}): {}",
                method,
                url,
                status.as_u16(),
                expected.as_u16(),
                detail.trim()
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CommentApi for GitHubClient {
    async fn authenticated_user(&self) -> Result<String> {
        let url = format!("{}/user", self.api_url);
        let user: User = self.send(Method::GET, &url, None, StatusCode::OK).await?;
        Ok(user.login)
    }

    async fn list_comments(&self, pr: u64) -> Result<Vec<IssueComment>> {
        let mut comments = Vec::new();
        let mut page = 1;

        loop {
            let url = self.repo_url(&format!(
                "issues/{}/comments?per_page={}&page={}",
                pr, PER_PAGE, page
            ));
            let batch: Vec<IssueComment> =
                self.send(Method::GET, &url, None, StatusCode::OK).await?;
            let done = batch.len() < PER_PAGE;
            comments.extend(batch);
            if done {
                break;
            }
            page += 1;
        }

        Ok(comments)
    }

    async fn update_comment(&self, id: u64, body: &str) -> Result<IssueComment> {
        let url = self.repo_url(&format!("issues/comments/{}", id));
        self.send(Method::PATCH, &url, Some(body), StatusCode::OK)
            .await
    }

    async fn create_comment(&self, pr: u64, body: &str) -> Result<IssueComment> {
        let url = self.repo_url(&format!("issues/{}/comments", pr));
        self.send(Method::POST, &url, Some(body), StatusCode::CREATED)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: u64, login: &str, body: &str) -> IssueComment {
        IssueComment {
            id,
            body: body.to_string(),
            user: Some(User {
                login: login.to_string(),
            }),
            html_url: format!("https://github.com/o/r/pull/1#issuecomment-{}", id),
        }
    }

    #[test]
    fn finds_bot_comment_with_marker() {
        let comments = vec![
            comment(1, "someone", "Download coblocks.zip: https://example.com/a.zip"),
            comment(2, "godaddy-wordpress-bot", "## Performance Test Results: ..."),
            comment(3, "godaddy-wordpress-bot", "Download coblocks.zip: https://example.com/b.zip"),
        ];

        let found = find_bot_comment(&comments, "godaddy-wordpress-bot", "Download").unwrap();
        assert_eq!(found.id, 3);
    }

    #[test]
    fn no_bot_comment() {
        let comments = vec![comment(1, "someone", "Download")];
        assert!(find_bot_comment(&comments, "godaddy-wordpress-bot", "Download").is_none());
    }

    #[test]
    fn comment_without_user_is_skipped() {
        let comments: Vec<IssueComment> =
            serde_json::from_str(r#"[{"id": 9, "body": "Download", "user": null}]"#).unwrap();
        assert!(comments[0].author().is_none());
        assert!(find_bot_comment(&comments, "godaddy-wordpress-bot", "Download").is_none());
    }

    #[test]
    fn null_body_does_not_break_listing() {
        let comments: Vec<IssueComment> = serde_json::from_str(
            r#"[
                {"id": 1, "body": null, "user": {"login": "bot"}, "html_url": null},
                {"id": 2, "body": "Download coblocks.zip: https://a", "user": {"login": "bot"}}
            ]"#,
        )
        .unwrap();

        assert_eq!(comments[0].body, "");
        assert_eq!(comments[0].html_url, "");
        let found = find_bot_comment(&comments, "bot", "Download").unwrap();
        assert_eq!(found.id, 2);
    }

    #[test]
    fn repo_urls_are_scoped() {
        let client =
            GitHubClient::new("https://api.github.com/", "token", "godaddy-wordpress", "coblocks")
                .unwrap();
        assert_eq!(
            client.repo_url("issues/756/comments"),
            "https://api.github.com/repos/godaddy-wordpress/coblocks/issues/756/comments"
        );
    }
}
