use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(
    name = "gitx",
    version,
    about = "Opinionated git branch-workflow automation",
    long_about = "Automates a feature-branch workflow: cut branches from a shared base, integrate them into aggregate branches (prototype, staging), release to base, and keep the branch namespace tidy. Risky transitions announce themselves to the team.",
    disable_version_flag = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Skip posting messages and pull-request comments
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Update the current branch with the latest remote and base changes
    Update,

    /// Start a new feature branch from a fresh base checkout
    Start {
        /// Name of the branch to create (prompted for if not specified)
        name: Option<String>,
    },

    /// Push the current branch and set up remote tracking
    Share,

    /// Set up remote tracking for the current branch
    Track,

    /// Merge the current branch into an aggregate branch
    Integrate {
        /// Aggregate branch to integrate into (default: prototype)
        target: Option<String>,
    },

    /// Integrate the current branch into staging (deprecated; use integrate)
    Promote,

    /// Merge the current branch into base and flow it through staging
    Release,

    /// Reset an aggregate branch to a known-good state
    Nuke {
        /// Aggregate branch to reset
        branch: String,

        /// Branch to reset to (prompted for if not specified)
        #[arg(long)]
        destination: Option<String>,
    },

    /// Delete local and remote branches that have been merged into base
    Cleanup,

    /// Show branches merged into one branch but not another
    Branchdiff {
        /// Branch to inspect (default: current branch)
        branch: Option<String>,

        /// Branch to compare against (default: base)
        other: Option<String>,
    },

    /// Create a pull request for the current branch
    Createpr {
        /// Pull request description (opens $EDITOR if not specified)
        #[arg(short = 'd', long)]
        description: Option<String>,
    },

    /// Assign the current branch's open pull request to a reviewer
    Assignpr {
        /// GitHub login to assign
        assignee: String,
    },

    /// Create a pull request and announce it for review
    Reviewrequest {
        /// Pull request description (opens $EDITOR if not specified)
        #[arg(short = 'd', long)]
        description: Option<String>,

        /// GitHub login to assign
        #[arg(short = 'a', long)]
        assignee: Option<String>,
    },

    /// Find pull requests referencing a commit
    Findpr {
        /// Commit sha to search for
        sha: String,
    },

    /// Cherry-pick a merged pull request onto a maintenance branch
    Backportpr {
        /// Number of the pull request to backport
        number: u64,

        /// Maintenance branch to backport onto (for example v1.x)
        branch: String,
    },

    /// Generate shell completions for gitx
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
