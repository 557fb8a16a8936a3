//! CircleCI v1.1 API lookups for build artifacts.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::http::HttpClient;

/// Workflow metadata attached to a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    #[serde(default)]
    pub job_name: Option<String>,
}

/// A recent build of the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub build_num: u64,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub workflows: Option<WorkflowInfo>,
}

impl BuildSummary {
    fn job_name(&self) -> Option<&str> {
        self.workflows.as_ref()?.job_name.as_deref()
    }
}

/// An artifact stored by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub url: String,
}

/// Returns the most recent build of `job` on `branch`.
///
/// The API lists builds newest first.
pub fn find_build<'a>(
    builds: &'a [BuildSummary],
    job: &str,
    branch: &str,
) -> Option<&'a BuildSummary> {
    builds
        .iter()
        .find(|build| build.job_name() == Some(job) && build.branch.as_deref() == Some(branch))
}

/// Client for a single CircleCI project.
pub struct CircleCiClient {
    http: HttpClient,
    project_url: String,
}

impl CircleCiClient {
    /// Creates a client for the GitHub-hosted project `owner/repo`.
    pub fn new(http: HttpClient, api_url: &str, owner: &str, repo: &str) -> Self {
        Self {
            http,
            project_url: format!("{}/project/gh/{}/{}", api_url.trim_end_matches('/'), owner, repo),
        }
    }

    /// Lists recent builds of the project.
    pub async fn recent_builds(&self) -> Result<Vec<BuildSummary>> {
        self.http.fetch_json(&self.project_url).await
    }

    /// Lists the artifacts of `build_num`.
    pub async fn artifacts(&self, build_num: u64) -> Result<Vec<Artifact>> {
        let url = format!("{}/{}/artifacts", self.project_url, build_num);
        self.http.fetch_json(&url).await
    }

    /// URL of the first artifact of the latest `job` build on `branch`.
    pub async fn build_artifact_url(&self, job: &str, branch: &str) -> Result<String> {
        let builds = self.recent_builds().await?;
        let build = find_build(&builds, job, branch).ok_or_else(|| {
            Error::CircleCi(format!("could not find a '{}' job on branch '{}'", job, branch))
        })?;

        tracing::info!(build_num = build.build_num, job, branch, "found build job");

        let artifacts = self.artifacts(build.build_num).await?;
        artifacts
            .into_iter()
            .next()
            .map(|artifact| artifact.url)
            .ok_or_else(|| {
                Error::CircleCi(format!("build {} has no artifacts", build.build_num))
            })
    }
}
