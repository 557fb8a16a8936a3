//! HTTP downloads.

use std::path::Path;

use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Browser-like agent; wordpress.org answers 403 to unknown clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 Chrome/96 Safari/537";

/// Plain HTTP client for file and text downloads.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Creates a client sending [`BROWSER_USER_AGENT`].
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Fetches `url` as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "fetching");
        Ok(self.get(url).await?.text().await?)
    }

    /// Fetches `url` and decodes the JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!(url, "fetching json");
        Ok(self.get(url).await?.json().await?)
    }

    /// Streams `url` into the file at `dest`, creating parent directories.
    ///
    /// Returns the number of bytes written.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        tracing::info!(url, dest = %dest.display(), "downloading");

        let mut response = self.get(url).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(url, bytes = written, "download complete");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn client_builds() {
        assert!(HttpClient::new().is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn fetches_version_check() {
        let client = HttpClient::new().unwrap();
        let body = client
            .fetch_text("http://api.wordpress.org/core/version-check/1.7/")
            .await
            .unwrap();
        assert!(crate::version::resolve("latest", &body).is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn missing_file_is_status_error() {
        let dir = TempDir::new().unwrap();
        let client = HttpClient::new().unwrap();
        let err = client
            .download(
                "https://wordpress.org/wordpress-0.0.0-missing.zip",
                &dir.path().join("missing.zip"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
    }
}
