//! Release pull requests on GitHub.
//!
//! A release is requested by opening a pull request from a fresh branch that
//! carries one empty commit on top of the target's base branch. CI picks up
//! the `release/<level>` label and does the actual version bump.

use std::time::Duration;

use async_trait::async_trait;
use seaman_core::workflow::ReleaseLevel;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::{GitHubConfig, ReleaseTarget};
use crate::error::ServerError;

const USER_AGENT: &str = concat!("seaman/", env!("CARGO_PKG_VERSION"));

/// A pull request opened for a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
}

/// Opens release pull requests.
#[async_trait]
pub trait ReleaseService: Send + Sync {
    /// Creates the release branch and pull request for `target`.
    async fn create_release_pr(
        &self,
        target: &ReleaseTarget,
        level: ReleaseLevel,
    ) -> Result<PullRequest, ServerError>;
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitCommit {
    sha: String,
    tree: GitObject,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
}

/// Branch name for a release requested at `unix_ts`.
pub fn release_branch(level: ReleaseLevel, unix_ts: i64) -> String {
    format!("bot/release/{level}-{unix_ts}")
}

/// GitHub REST binding of [`ReleaseService`].
#[derive(Debug, Clone)]
pub struct GitHubReleaseClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl GitHubReleaseClient {
    /// Creates a client whose requests time out after `config.timeout_secs`.
    ///
    /// Each request of the release chain is bounded on its own, so a stalled
    /// call fails with `ServerError::Remote` before the handler timeout fires.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the HTTP client cannot be built.
    pub fn new(config: &GitHubConfig) -> Result<Self, ServerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServerError::Config(format!("Cannot build GitHub client: {e}")))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.access_token.clone(),
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, ServerError> {
        let what = format!("{method} {path}");
        let mut request = self
            .http
            .request(method, format!("{}{path}", self.api_base))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ServerError::Remote(format!("{what}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServerError::Remote(format!("{what}: HTTP {status}: {body}")));
        }
        resp.json()
            .await
            .map_err(|e| ServerError::Remote(format!("{what}: bad response: {e}")))
    }
}

#[async_trait]
impl ReleaseService for GitHubReleaseClient {
    async fn create_release_pr(
        &self,
        target: &ReleaseTarget,
        level: ReleaseLevel,
    ) -> Result<PullRequest, ServerError> {
        let repo = &target.repository;
        let base = &target.base_branch;

        let head: GitRef = self
            .call(
                reqwest::Method::GET,
                &format!("/repos/{repo}/git/ref/heads/{base}"),
                None,
            )
            .await?;
        let base_commit: GitCommit = self
            .call(
                reqwest::Method::GET,
                &format!("/repos/{repo}/git/commits/{}", head.object.sha),
                None,
            )
            .await?;
        debug!(repo, base, sha = %base_commit.sha, "Resolved base branch head");

        let commit: GitCommit = self
            .call(
                reqwest::Method::POST,
                &format!("/repos/{repo}/git/commits"),
                Some(&json!({
                    "message": format!("Release ({level})"),
                    "tree": base_commit.tree.sha,
                    "parents": [base_commit.sha],
                })),
            )
            .await?;

        let branch = release_branch(level, chrono::Utc::now().timestamp());
        let _: serde_json::Value = self
            .call(
                reqwest::Method::POST,
                &format!("/repos/{repo}/git/refs"),
                Some(&json!({
                    "ref": format!("refs/heads/{branch}"),
                    "sha": commit.sha,
                })),
            )
            .await?;

        let pull: PullResponse = self
            .call(
                reqwest::Method::POST,
                &format!("/repos/{repo}/pulls"),
                Some(&json!({
                    "title": format!("Release ({level})"),
                    "head": branch,
                    "base": base,
                    "body": format!("Requested from chat: {level} release of `{repo}`."),
                })),
            )
            .await?;

        let _: serde_json::Value = self
            .call(
                reqwest::Method::POST,
                &format!("/repos/{repo}/issues/{}/labels", pull.number),
                Some(&json!({ "labels": [format!("release/{level}")] })),
            )
            .await?;

        info!(repo, number = pull.number, %branch, "Opened release pull request");
        Ok(PullRequest {
            number: pull.number,
            url: pull.html_url,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_name_release_branch() {
        assert_eq!(
            release_branch(ReleaseLevel::Minor, 1_700_000_000),
            "bot/release/minor-1700000000"
        );
    }

    #[test]
    fn test_should_trim_api_base() {
        let client = GitHubReleaseClient::new(&GitHubConfig {
            access_token: "ghp_test".into(),
            api_base: "https://github.example.com/api/v3/".into(),
            timeout_secs: 5,
        })
        .expect("client");
        assert_eq!(client.api_base, "https://github.example.com/api/v3");
    }

    #[tokio::test]
    async fn test_should_fail_release_when_github_is_unreachable() {
        let client = GitHubReleaseClient::new(&GitHubConfig {
            access_token: "ghp_test".into(),
            api_base: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
        })
        .expect("client");
        let target = ReleaseTarget {
            repository: "org/app".into(),
            base_branch: "main".into(),
        };

        let err = client
            .create_release_pr(&target, ReleaseLevel::Patch)
            .await
            .unwrap_err();

        assert!(matches!(err, ServerError::Remote(_)));
        assert!(err.to_string().contains("/repos/org/app/git/ref/heads/main"));
    }

    #[test]
    fn test_should_parse_ref_and_commit() {
        let r: GitRef =
            serde_json::from_str(r#"{"ref":"refs/heads/main","object":{"sha":"abc","type":"commit"}}"#)
                .expect("parse ref");
        assert_eq!(r.object.sha, "abc");

        let c: GitCommit =
            serde_json::from_str(r#"{"sha":"abc","tree":{"sha":"def"},"parents":[]}"#)
                .expect("parse commit");
        assert_eq!(c.tree.sha, "def");
    }

    #[test]
    fn test_should_parse_pull_response() {
        let p: PullResponse = serde_json::from_str(
            r#"{"number":7,"html_url":"https://github.com/org/app/pull/7","state":"open"}"#,
        )
        .expect("parse");
        assert_eq!(p.number, 7);
        assert!(p.html_url.ends_with("/pull/7"));
    }
}
