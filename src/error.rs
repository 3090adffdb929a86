use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitxError {
    #[error("Git operation failed: {0}")]
    GitError(#[from] git2::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cannot {action} protected branch: {branch}")]
    ProtectedBranch { branch: String, action: String },

    #[error("Only aggregate branches are allowed for integration: {}", .allowed.join(", "))]
    IntegrationNotAllowed { allowed: Vec<String> },

    #[error("Only aggregate branches are allowed to be reset: {}", .allowed.join(", "))]
    NukeNotAllowed { allowed: Vec<String> },

    #[error("Cannot release {branch} unless it has already been promoted separately to {staging_branch} and the build has passed")]
    StagingGate {
        branch: String,
        staging_branch: String,
    },

    #[error("Multiple open pull requests found for branch: {branch}")]
    MultiplePullRequests { branch: String },

    #[error("No open pull request found for branch: {branch}")]
    PullRequestNotFound { branch: String },

    #[error("Invalid branch name: {name}")]
    InvalidBranchName { name: String },

    #[error("Required git command failed: {command}{}", .status.map(|s| format!(" (exit status {s})")).unwrap_or_default())]
    RequiredCommandFailed { command: String, status: Option<i32> },

    #[error("Cherry-pick aborted: {sha}")]
    CherryPickAborted { sha: String },

    #[error("GitHub request failed: {message}")]
    GitHubRequestFailed { message: String },

    #[error("Message could not be posted: {message}")]
    MessagePostFailed { message: String },
}

pub type Result<T> = std::result::Result<T, GitxError>;
