//! The collaboration capability the workflow reports through.
//!
//! Workflow commands announce what happened either on the branch's pull
//! request or on the team broadcast stream. The engine only sees this
//! trait; the live implementation builds the HTTP clients lazily so
//! purely local commands never touch credentials. Tests substitute a
//! recording gateway.

use anyhow::Result;

use crate::branch::BranchName;
use crate::github::{GitHubClient, PullRequest, PullRequestCommit, PullRequestSearchResult};
use crate::messaging::{MessageClient, MessageParams};

#[allow(async_fn_in_trait)]
pub trait CollaborationGateway {
    /// Post to the broadcast stream; returns the message permalink.
    async fn post_message(&self, body: &str, params: MessageParams) -> Result<String>;

    async fn create_pull_request(
        &self,
        repo: &str,
        branch: &BranchName,
        base: &BranchName,
        body: &str,
    ) -> Result<PullRequest>;

    /// The one open pull request for a branch, if any; ambiguous matches
    /// are an error.
    async fn current_pull_request(
        &self,
        repo: &str,
        branch: &BranchName,
    ) -> Result<Option<PullRequest>>;

    async fn assign_pull_request(&self, pr: &PullRequest, assignee: &str) -> Result<()>;

    async fn comment_on_pull_request(&self, pr: &PullRequest, body: &str) -> Result<()>;

    async fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequest>;

    async fn pull_request_commits(&self, pr: &PullRequest) -> Result<Vec<PullRequestCommit>>;

    async fn search_pull_requests(
        &self,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<PullRequestSearchResult>>;
}

/// Production gateway over the real services.
#[derive(Debug, Default)]
pub struct LiveGateway;

impl LiveGateway {
    pub fn new() -> Self {
        Self
    }
}

impl CollaborationGateway for LiveGateway {
    async fn post_message(&self, body: &str, params: MessageParams) -> Result<String> {
        let client = MessageClient::load().await?;
        let posted = client.post(body, &params).await?;
        println!("Message has been posted: {}", posted.permalink_url);
        Ok(posted.permalink_url)
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        branch: &BranchName,
        base: &BranchName,
        body: &str,
    ) -> Result<PullRequest> {
        GitHubClient::new()?
            .create_pull_request(repo, branch, base, body)
            .await
    }

    async fn current_pull_request(
        &self,
        repo: &str,
        branch: &BranchName,
    ) -> Result<Option<PullRequest>> {
        GitHubClient::new()?.current_pull_request(repo, branch).await
    }

    async fn assign_pull_request(&self, pr: &PullRequest, assignee: &str) -> Result<()> {
        GitHubClient::new()?.assign_pull_request(pr, assignee).await
    }

    async fn comment_on_pull_request(&self, pr: &PullRequest, body: &str) -> Result<()> {
        GitHubClient::new()?.comment_on_pull_request(pr, body).await
    }

    async fn pull_request(&self, repo: &str, number: u64) -> Result<PullRequest> {
        GitHubClient::new()?.pull_request(repo, number).await
    }

    async fn pull_request_commits(&self, pr: &PullRequest) -> Result<Vec<PullRequestCommit>> {
        GitHubClient::new()?.pull_request_commits(pr).await
    }

    async fn search_pull_requests(
        &self,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<PullRequestSearchResult>> {
        GitHubClient::new()?.search_pull_requests(repo, sha).await
    }
}
