use anyhow::{anyhow, Context, Result};
use colored::*;
use serde::Deserialize;

use crate::branch::BranchName;
use crate::error::GitxError;

const API_ROOT: &str = "https://api.github.com";

/// The slice of a pull-request payload the workflow needs. List, get and
/// create responses all deserialize into this.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    pub issue_url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub commits_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestCommit {
    pub sha: String,
    #[serde(default)]
    pub parents: Vec<CommitRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// Issue-search hit; the search API returns a different shape than the
/// pulls API.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestSearchResult {
    pub html_url: String,
    pub title: String,
    pub user: SearchUser,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    items: Vec<PullRequestSearchResult>,
}

#[derive(Debug)]
pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
}

impl GitHubClient {
    /// Create a client from the environment token, falling back to the gh
    /// CLI's stored token.
    pub fn new() -> Result<Self> {
        let token = match std::env::var("GITHUB_TOKEN") {
            Ok(token) if !token.is_empty() => token,
            _ => gh_cli_token()?,
        };

        let client = reqwest::Client::builder()
            .user_agent(concat!("gitx/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, token })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.decorate(self.client.get(url))
    }

    fn decorate(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
    }

    /// Open a pull request titled after the branch.
    pub async fn create_pull_request(
        &self,
        repo: &str,
        branch: &BranchName,
        base: &BranchName,
        body: &str,
    ) -> Result<PullRequest> {
        println!(
            "Creating pull request for {} against {} in {}",
            branch.to_string().green(),
            base.to_string().green(),
            repo
        );

        let payload = serde_json::json!({
            "title": branch.as_str(),
            "base": base.as_str(),
            "head": branch.as_str(),
            "body": body,
        });

        let response = self
            .decorate(self.client.post(format!("{API_ROOT}/repos/{repo}/pulls")))
            .json(&payload)
            .send()
            .await
            .context("Failed to send create pull request request")?;
        let response = check_response(response, "create pull request").await?;
        response
            .json()
            .await
            .context("Failed to parse pull request response")
    }

    /// Open pull requests whose head is `branch`.
    pub async fn pull_requests_for_branch(
        &self,
        repo: &str,
        branch: &BranchName,
    ) -> Result<Vec<PullRequest>> {
        let owner = repo
            .split('/')
            .next()
            .ok_or_else(|| anyhow!("Malformed repository slug: {repo}"))?;
        let url = format!(
            "{API_ROOT}/repos/{repo}/pulls?head={owner}:{branch}&state=open"
        );

        let response = self
            .get(&url)
            .send()
            .await
            .context("Failed to list pull requests")?;
        let response = check_response(response, "list pull requests").await?;
        response
            .json()
            .await
            .context("Failed to parse pull request list")
    }

    /// The one open pull request for a branch, if any. More than one match
    /// is ambiguous and refused.
    pub async fn current_pull_request(
        &self,
        repo: &str,
        branch: &BranchName,
    ) -> Result<Option<PullRequest>> {
        let mut matches = self.pull_requests_for_branch(repo, branch).await?;
        if matches.len() > 1 {
            return Err(GitxError::MultiplePullRequests {
                branch: branch.to_string(),
            }
            .into());
        }
        Ok(matches.pop())
    }

    pub async fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequest> {
        let url = format!("{API_ROOT}/repos/{repo}/pulls/{number}");
        let response = self
            .get(&url)
            .send()
            .await
            .context("Failed to fetch pull request")?;
        let response = check_response(response, "fetch pull request").await?;
        response
            .json()
            .await
            .context("Failed to parse pull request response")
    }

    pub async fn pull_request_commits(&self, pr: &PullRequest) -> Result<Vec<PullRequestCommit>> {
        let url = pr
            .commits_url
            .as_deref()
            .ok_or_else(|| anyhow!("Pull request #{} has no commits URL", pr.number))?;
        let response = self
            .get(url)
            .send()
            .await
            .context("Failed to fetch pull request commits")?;
        let response = check_response(response, "fetch pull request commits").await?;
        response
            .json()
            .await
            .context("Failed to parse pull request commits")
    }

    /// Reassign the issue behind a pull request. Callers treat failure as
    /// non-fatal.
    pub async fn assign_pull_request(&self, pr: &PullRequest, assignee: &str) -> Result<()> {
        let payload = serde_json::json!({ "assignee": assignee });
        let response = self
            .decorate(self.client.patch(&pr.issue_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send assignment request")?;
        check_response(response, "assign pull request").await?;
        Ok(())
    }

    pub async fn comment_on_pull_request(&self, pr: &PullRequest, body: &str) -> Result<()> {
        let url = format!("{}/comments", pr.issue_url);
        let payload = serde_json::json!({ "body": body });
        let response = self
            .decorate(self.client.post(&url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send comment")?;
        check_response(response, "comment on pull request").await?;
        Ok(())
    }

    /// Pull requests referencing a commit, via the issue search API.
    pub async fn search_pull_requests(
        &self,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<PullRequestSearchResult>> {
        let url = format!("{API_ROOT}/search/issues?q={sha}+type:pr+repo:{repo}");
        let response = self
            .get(&url)
            .send()
            .await
            .context("Failed to search pull requests")?;
        let response = check_response(response, "search pull requests").await?;
        let results: SearchResults = response
            .json()
            .await
            .context("Failed to parse search results")?;
        Ok(results.items)
    }
}

fn gh_cli_token() -> Result<String> {
    let output = std::process::Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context(
            "GITHUB_TOKEN environment variable not set and gh CLI unavailable. \
             Run: export GITHUB_TOKEN=<your-token> or: gh auth login",
        )?;
    if output.status.success() {
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }
    Err(anyhow!(
        "GitHub authentication not configured. \
         Run: export GITHUB_TOKEN=<your-token> or: gh auth login"
    ))
}

/// Surface the service's own error message when it sends one.
async fn check_response(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let detail = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&detail)
        .ok()
        .and_then(|value| value["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{action} returned status {status}"));
    Err(GitxError::GitHubRequestFailed { message }.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_parse() {
        let json = r#"{
            "number": 59,
            "html_url": "https://github.com/acme/widgets/pull/59",
            "issue_url": "https://api.github.com/repos/acme/widgets/issues/59",
            "body": "Fix the cart",
            "commits_url": "https://api.github.com/repos/acme/widgets/pulls/59/commits"
        }"#;
        let pr: PullRequest = serde_json::from_str(json).expect("valid pull request");
        assert_eq!(pr.number, 59);
        assert_eq!(pr.body.as_deref(), Some("Fix the cart"));
    }

    #[test]
    fn test_pull_request_parse_tolerates_missing_optional_fields() {
        let json = r#"{
            "number": 60,
            "html_url": "https://github.com/acme/widgets/pull/60",
            "issue_url": "https://api.github.com/repos/acme/widgets/issues/60"
        }"#;
        let pr: PullRequest = serde_json::from_str(json).expect("valid pull request");
        assert!(pr.body.is_none());
        assert!(pr.commits_url.is_none());
    }

    #[test]
    fn test_commit_parse_counts_parents() {
        let json = r#"[
            {"sha": "aaa", "parents": [{"sha": "p1"}]},
            {"sha": "bbb", "parents": [{"sha": "p1"}, {"sha": "p2"}]}
        ]"#;
        let commits: Vec<PullRequestCommit> = serde_json::from_str(json).expect("valid commits");
        assert_eq!(commits[0].parents.len(), 1);
        assert_eq!(commits[1].parents.len(), 2);
    }

    #[test]
    fn test_search_results_parse() {
        let json = r#"{
            "total_count": 1,
            "items": [{
                "html_url": "https://github.com/acme/widgets/pull/61",
                "title": "Fix rounding",
                "user": {"login": "sam"},
                "created_at": "2025-11-02T10:00:00Z"
            }]
        }"#;
        let results: SearchResults = serde_json::from_str(json).expect("valid search results");
        assert_eq!(results.items.len(), 1);
        assert_eq!(results.items[0].user.login, "sam");
    }
}
