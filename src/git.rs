//! Git execution boundary.
//!
//! The workflow engine never spawns git directly: every operation is a
//! discrete, named method on [`GitManager`], rendered onto a [`GitRunner`].
//! The production runner spawns the system `git` binary with an argument
//! vector and uses libgit2 for in-process reads; tests substitute a runner
//! that records the command stream.

use anyhow::{Context, Result};
use colored::*;
use git2::Repository;
use std::process::Command;

use crate::branch::BranchName;
use crate::config::WorkflowConfig;
use crate::error::GitxError;

/// Capability to execute git.
///
/// `run` is for mutating commands and streams git's own output to the
/// terminal; `capture` is for read-only commands whose stdout gets parsed.
/// Call sites that tolerate failure (deleting a branch that may not exist,
/// pulling a branch not yet on the remote) discard the result explicitly;
/// everywhere else a failure is a [`GitxError::RequiredCommandFailed`] that
/// aborts the command in flight.
pub trait GitRunner {
    fn run(&mut self, args: &[&str]) -> Result<()>;
    fn capture(&mut self, args: &[&str]) -> Result<String>;
    fn current_branch(&self) -> Result<BranchName>;
    fn repo_slug(&self) -> Result<String>;
}

/// Runner backed by the system `git` binary in the current working
/// directory.
#[derive(Debug, Default)]
pub struct ShellGitRunner;

impl ShellGitRunner {
    pub fn new() -> Self {
        Self
    }

    fn find_repository(&self) -> Result<Repository> {
        Repository::discover(".").context("Not inside a git repository")
    }
}

impl GitRunner for ShellGitRunner {
    fn run(&mut self, args: &[&str]) -> Result<()> {
        let rendered = render_command(args);
        println!("{}", rendered.green());

        let status = Command::new("git")
            .args(args)
            .status()
            .context("Failed to execute git command")?;

        if status.success() {
            Ok(())
        } else {
            Err(GitxError::RequiredCommandFailed {
                command: rendered,
                status: status.code(),
            }
            .into())
        }
    }

    fn capture(&mut self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .output()
            .context("Failed to execute git command")?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(GitxError::RequiredCommandFailed {
                command: render_command(args),
                status: output.status.code(),
            }
            .into())
        }
    }

    fn current_branch(&self) -> Result<BranchName> {
        let repo = self.find_repository()?;
        let head = repo.head()?;
        head.shorthand()
            .map(BranchName::new)
            .ok_or_else(|| anyhow::anyhow!("Could not determine current branch"))
    }

    fn repo_slug(&self) -> Result<String> {
        let repo = self.find_repository()?;
        let remote = repo.find_remote("origin").context("No origin remote configured")?;
        let url = remote.url().context("Remote URL not found")?;
        slug_from_url(url).ok_or_else(|| anyhow::anyhow!("Could not parse repository from {url}"))
    }
}

fn render_command(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}

/// `owner/repo` from a remote URL: trailing `.git` stripped, last two
/// path segments joined. Handles both SSH and HTTPS forms.
pub fn slug_from_url(url: &str) -> Option<String> {
    let trimmed = url.strip_suffix(".git").unwrap_or(url);
    let segments: Vec<&str> = trimmed
        .split(|c| c == ':' || c == '/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() < 2 {
        return None;
    }
    Some(segments[segments.len() - 2..].join("/"))
}

/// Scope and filter for a branch listing.
#[derive(Debug, Clone, Default)]
pub struct BranchListing {
    pub remote: bool,
    pub merged: Option<MergedInto>,
}

#[derive(Debug, Clone)]
pub enum MergedInto {
    /// `--merged` with no ref: merged into whatever is checked out.
    Head,
    Ref(String),
}

impl BranchListing {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn remote() -> Self {
        Self {
            remote: true,
            merged: None,
        }
    }

    pub fn merged_into_head(mut self) -> Self {
        self.merged = Some(MergedInto::Head);
        self
    }

    pub fn merged_into(mut self, reference: impl Into<String>) -> Self {
        self.merged = Some(MergedInto::Ref(reference.into()));
        self
    }
}

/// Named git operations over an injected runner.
///
/// Owns a copy of the resolved config so listings can exclude reserved
/// names without consulting anything else.
#[derive(Debug)]
pub struct GitManager<R: GitRunner> {
    runner: R,
    config: WorkflowConfig,
}

impl<R: GitRunner> GitManager<R> {
    pub fn new(runner: R, config: WorkflowConfig) -> Self {
        Self { runner, config }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn current_branch(&self) -> Result<BranchName> {
        self.runner.current_branch()
    }

    pub fn repo_slug(&self) -> Result<String> {
        self.runner.repo_slug()
    }

    pub fn checkout(&mut self, branch: impl AsRef<str>) -> Result<()> {
        self.runner.run(&["checkout", branch.as_ref()])
    }

    pub fn create_branch(&mut self, branch: impl AsRef<str>) -> Result<()> {
        self.runner.run(&["checkout", "-b", branch.as_ref()])
    }

    pub fn pull(&mut self) -> Result<()> {
        self.runner.run(&["pull"])
    }

    pub fn pull_remote_branch(&mut self, branch: impl AsRef<str>) -> Result<()> {
        self.runner.run(&["pull", "origin", branch.as_ref()])
    }

    /// Merge a local ref into the checked-out branch. Merge conflicts
    /// surface here and must propagate.
    pub fn pull_local_ref(&mut self, branch: impl AsRef<str>) -> Result<()> {
        self.runner.run(&["pull", ".", branch.as_ref()])
    }

    pub fn push_head(&mut self) -> Result<()> {
        self.runner.run(&["push", "origin", "HEAD"])
    }

    pub fn push_branch(&mut self, branch: impl AsRef<str>) -> Result<()> {
        self.runner.run(&["push", "origin", branch.as_ref()])
    }

    /// Safe deletion of a merged local branch (`-d`). Cleanup uses this;
    /// refresh and nuke use the force form.
    pub fn delete_local_branch(&mut self, branch: impl AsRef<str>) -> Result<()> {
        self.runner.run(&["branch", "-d", branch.as_ref()])
    }

    pub fn force_delete_local_branch(&mut self, branch: impl AsRef<str>) -> Result<()> {
        self.runner.run(&["branch", "-D", branch.as_ref()])
    }

    pub fn delete_remote_branch(&mut self, branch: impl AsRef<str>) -> Result<()> {
        self.runner.run(&["push", "origin", "--delete", branch.as_ref()])
    }

    pub fn fetch(&mut self) -> Result<()> {
        self.runner.run(&["fetch", "origin"])
    }

    pub fn prune_remote(&mut self) -> Result<()> {
        self.runner.run(&["remote", "prune", "origin"])
    }

    pub fn track_branch(&mut self, branch: impl AsRef<str>) -> Result<()> {
        let branch = branch.as_ref();
        let upstream = format!("--set-upstream-to=origin/{branch}");
        self.runner.run(&["branch", &upstream, branch])
    }

    pub fn cherry_pick(&mut self, shas: &[String]) -> Result<()> {
        let mut args = vec!["cherry-pick"];
        args.extend(shas.iter().map(String::as_str));
        self.runner.run(&args)
    }

    pub fn cherry_pick_abort(&mut self) -> Result<()> {
        self.runner.run(&["cherry-pick", "--abort"])
    }

    /// Push the branch and set it to track its origin counterpart.
    pub fn share_branch(&mut self, branch: &BranchName) -> Result<()> {
        self.push_branch(branch)?;
        self.track_branch(branch)
    }

    /// Replace any local copy of the branch with the remote state. The
    /// local delete is best-effort (the branch may not exist locally yet).
    pub fn refresh_from_remote(&mut self, branch: impl AsRef<str>) -> Result<()> {
        let branch = branch.as_ref();
        self.force_delete_local_branch(branch).ok();
        self.fetch()?;
        self.checkout(branch)
    }

    /// List branches in the given scope, cleaned of formatting markers and
    /// remote prefixes, deduplicated, with reserved names excluded.
    pub fn branches(&mut self, listing: BranchListing) -> Result<Vec<BranchName>> {
        let merged_ref;
        let mut args = vec!["branch"];
        if listing.remote {
            args.push("-r");
        }
        match &listing.merged {
            Some(MergedInto::Head) => args.push("--merged"),
            Some(MergedInto::Ref(reference)) => {
                merged_ref = reference.clone();
                args.push("--merged");
                args.push(&merged_ref);
            }
            None => {}
        }

        let output = self.runner.capture(&args)?;
        Ok(parse_branch_listing(&output, listing.remote)
            .into_iter()
            .filter(|name| !self.config.is_reserved(name))
            .map(BranchName::new)
            .collect())
    }

    /// Raw remote branch names, reserved names included. Used for collision
    /// checks when naming a new branch.
    pub fn remote_branch_names(&mut self) -> Result<Vec<BranchName>> {
        let output = self.runner.capture(&["branch", "-r"])?;
        Ok(parse_branch_listing(&output, true)
            .into_iter()
            .map(BranchName::new)
            .collect())
    }

    /// Remote branches merged into `branch` but not into `other`.
    pub fn branch_difference(
        &mut self,
        branch: &BranchName,
        other: &BranchName,
    ) -> Result<Vec<BranchName>> {
        let ours = self.branches(BranchListing::remote().merged_into(format!("origin/{branch}")))?;
        let theirs = self.branches(BranchListing::remote().merged_into(format!("origin/{other}")))?;
        Ok(ours.into_iter().filter(|b| !theirs.contains(b)).collect())
    }

    pub fn diff_numstat(&mut self, range: &str) -> Result<String> {
        self.runner.capture(&["diff", "--numstat", range])
    }

    pub fn diff_shortstat(&mut self, range: &str) -> Result<String> {
        self.runner.capture(&["diff", "--shortstat", range])
    }
}

/// Strip the current-branch asterisk and whitespace, keep the first token
/// per line (collapsing `origin/HEAD -> origin/master` to `origin/HEAD`),
/// drop the remote prefix for remote listings, and deduplicate preserving
/// order.
fn parse_branch_listing(output: &str, remote: bool) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in output.lines() {
        let cleaned = line.replace('*', " ");
        let Some(token) = cleaned.split_whitespace().next() else {
            continue;
        };
        let name = if remote {
            token.split_once('/').map(|(_, rest)| rest).unwrap_or(token)
        } else {
            token
        };
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;

    struct FixedOutput(String);

    impl GitRunner for FixedOutput {
        fn run(&mut self, _args: &[&str]) -> Result<()> {
            Ok(())
        }

        fn capture(&mut self, _args: &[&str]) -> Result<String> {
            Ok(self.0.clone())
        }

        fn current_branch(&self) -> Result<BranchName> {
            Ok(BranchName::new("FOO"))
        }

        fn repo_slug(&self) -> Result<String> {
            Ok("acme/widgets".to_string())
        }
    }

    #[test]
    fn test_parse_local_listing_strips_current_marker() {
        let parsed = parse_branch_listing("* FOO\n  staging\n  dev-bar\n", false);
        assert_eq!(parsed, vec!["FOO", "staging", "dev-bar"]);
    }

    #[test]
    fn test_parse_remote_listing_strips_prefix_and_head_arrow() {
        let output = "  origin/HEAD -> origin/master\n  origin/master\n  origin/dev-foo\n";
        let parsed = parse_branch_listing(output, true);
        assert_eq!(parsed, vec!["HEAD", "master", "dev-foo"]);
    }

    #[test]
    fn test_parse_listing_deduplicates_preserving_order() {
        let parsed = parse_branch_listing("  dev-b\n  dev-a\n  dev-b\n", false);
        assert_eq!(parsed, vec!["dev-b", "dev-a"]);
    }

    #[test]
    fn test_parse_remote_listing_keeps_nested_name() {
        let parsed = parse_branch_listing("  origin/feature/checkout\n", true);
        assert_eq!(parsed, vec!["feature/checkout"]);
    }

    #[test]
    fn test_branches_excludes_reserved_names() {
        let output = "  origin/HEAD -> origin/master\n  origin/master\n  origin/staging\n  origin/dev-foo\n  origin/last_known_good_master\n";
        let mut git = GitManager::new(FixedOutput(output.to_string()), WorkflowConfig::default());
        let branches = git.branches(BranchListing::remote()).unwrap();
        assert_eq!(branches, vec![BranchName::new("dev-foo")]);
    }

    #[test]
    fn test_slug_from_https_url() {
        assert_eq!(
            slug_from_url("https://github.com/acme/widgets.git").as_deref(),
            Some("acme/widgets")
        );
    }

    #[test]
    fn test_slug_from_ssh_url() {
        assert_eq!(
            slug_from_url("git@github.com:acme/widgets.git").as_deref(),
            Some("acme/widgets")
        );
    }

    #[test]
    fn test_slug_without_git_suffix() {
        assert_eq!(
            slug_from_url("https://github.com/acme/widgets").as_deref(),
            Some("acme/widgets")
        );
    }

    #[test]
    fn test_slug_rejects_bare_host() {
        assert_eq!(slug_from_url("widgets"), None);
    }
}
