//! gitx - Opinionated git branch-workflow automation
//!
//! Automates a feature-branch workflow built around a shared base branch,
//! aggregate integration branches (prototype, staging) and their
//! last-known-good mirrors, with team announcements for the risky
//! transitions.

pub mod branch;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod git;
pub mod github;
pub mod messaging;
pub mod prompt;
pub mod workflow;

// Re-export commonly used types
pub use branch::BranchName;
pub use config::WorkflowConfig;
pub use error::GitxError;
pub use gateway::{CollaborationGateway, LiveGateway};
pub use git::{BranchListing, GitManager, GitRunner, ShellGitRunner};
pub use prompt::{Prompt, TerminalPrompt};
pub use workflow::WorkflowEngine;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Default base branch name
    pub const DEFAULT_BASE_BRANCH: &str = "master";

    /// Default staging integration branch
    pub const DEFAULT_STAGING_BRANCH: &str = "staging";

    /// Default prototype integration branch
    pub const DEFAULT_PROTOTYPE_BRANCH: &str = "prototype";

    /// Default group mentioned in team announcements
    pub const DEFAULT_DEVELOPER_GROUP: &str = "developers";

    /// Default config file location, relative to the repository root
    pub const DEFAULT_CONFIG_FILE: &str = "config/gitx.yml";
}
