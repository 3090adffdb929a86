//! GitHub REST integration: pull-request creation, lookup, assignment,
//! comments and commit search.

mod client;

pub use client::{
    CommitRef, GitHubClient, PullRequest, PullRequestCommit, PullRequestSearchResult, SearchUser,
};

use anyhow::{anyhow, Result};

/// Verify some form of GitHub authentication is available before a command
/// that needs the API.
pub fn check_auth() -> Result<()> {
    if std::env::var("GITHUB_TOKEN").is_ok() {
        return Ok(());
    }

    let gh_status = std::process::Command::new("gh")
        .args(["auth", "status"])
        .output();

    match gh_status {
        Ok(output) if output.status.success() => Ok(()),
        _ => Err(anyhow!(
            "GitHub authentication not configured. \
             \n\nOption 1: Set environment variable\n  export GITHUB_TOKEN=<your-token>\n\n\
             Option 2: Use GitHub CLI\n  gh auth login"
        )),
    }
}
