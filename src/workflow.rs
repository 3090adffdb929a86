//! The branch-workflow state machine.
//!
//! Commands compose three injected capabilities: git (through
//! [`GitManager`]), the collaboration gateway, and the prompt. The working
//! directory is shared mutable state, so steps run in documented order and
//! a required git failure aborts the command where it stands; there is no
//! rollback. Best-effort git calls discard their result explicitly.

use anyhow::Result;
use colored::*;

use crate::branch::BranchName;
use crate::changelog;
use crate::config::WorkflowConfig;
use crate::error::GitxError;
use crate::gateway::CollaborationGateway;
use crate::git::{BranchListing, GitManager, GitRunner};
use crate::github::PullRequest;
use crate::messaging::MessageParams;
use crate::prompt::{editor_input, Prompt};

const PULL_REQUEST_TEMPLATE: &str = "\n\n\
# Describe your pull request\n\
# Use GitHub flavored Markdown\n\
# Why not include a screenshot? Format: ![title](url)\n";

const REVIEW_REQUEST_MESSAGE_TYPE: &str = "review_request";

pub struct WorkflowEngine<R: GitRunner, G: CollaborationGateway, P: Prompt> {
    git: GitManager<R>,
    gateway: G,
    prompt: P,
    config: WorkflowConfig,
    quiet: bool,
}

impl<R: GitRunner, G: CollaborationGateway, P: Prompt> WorkflowEngine<R, G, P> {
    pub fn new(runner: R, gateway: G, prompt: P, config: WorkflowConfig, quiet: bool) -> Self {
        Self {
            git: GitManager::new(runner, config.clone()),
            gateway,
            prompt,
            config,
            quiet,
        }
    }

    pub fn git(&self) -> &GitManager<R> {
        &self.git
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Synchronize the current branch with the remote: pick up its own
    /// remote changes when it has any, fold in base, push.
    pub fn update(&mut self) -> Result<()> {
        let branch = self.git.current_branch()?;
        self.update_branch(&branch)
    }

    fn update_branch(&mut self, branch: &BranchName) -> Result<()> {
        println!(
            "🔄 Updating {} with the latest changes from {}",
            branch.to_string().green(),
            self.config.base_branch.to_string().green()
        );
        // The branch may not exist on the remote yet.
        self.git.pull_remote_branch(branch).ok();
        let base = self.config.base_branch.clone();
        self.git.pull_remote_branch(&base)?;
        self.git.push_head()
    }

    /// Cut a new feature branch from a fresh base checkout.
    pub async fn start(&mut self, name: Option<String>) -> Result<()> {
        let existing = self.git.remote_branch_names()?;
        let branch = match name {
            Some(name) => {
                let branch = BranchName::validated(name.trim())?;
                if existing.contains(&branch) {
                    return Err(GitxError::InvalidBranchName {
                        name: branch.to_string(),
                    }
                    .into());
                }
                branch
            }
            None => self.prompt_for_branch_name(&existing)?,
        };

        println!("🌱 Starting work on {}", branch.to_string().green());
        let base = self.config.base_branch.clone();
        self.git.checkout(&base)?;
        self.git.pull()?;
        self.git.create_branch(&branch)?;

        self.report_broadcast(
            format!("#worklog starting work on {branch} #scgitx"),
            MessageParams::default(),
        )
        .await
    }

    fn prompt_for_branch_name(&self, existing: &[BranchName]) -> Result<BranchName> {
        let examples = self.branch_name_examples(existing);
        let question = format!(
            "What would you like to name your branch? (ex: {})",
            examples.join(", ")
        );
        loop {
            let answer = self.prompt.ask(&question)?;
            match BranchName::validated(answer.trim()) {
                Ok(branch) if !existing.contains(&branch) => return Ok(branch),
                _ => println!(
                    "{}",
                    "This branch name is either already taken, or is not a valid branch name"
                        .yellow()
                ),
            }
        }
    }

    fn branch_name_examples(&self, existing: &[BranchName]) -> Vec<String> {
        let mut examples: Vec<String> = existing
            .iter()
            .filter(|branch| !self.config.is_reserved(branch))
            .take(2)
            .map(|branch| branch.to_string())
            .collect();
        if examples.is_empty() {
            examples = vec![
                "fix-cart-rounding".to_string(),
                "api-timeout-retry".to_string(),
            ];
        }
        examples
    }

    /// Push the current branch and set up remote tracking.
    pub fn share(&mut self) -> Result<()> {
        let branch = self.git.current_branch()?;
        self.git.share_branch(&branch)
    }

    /// Set up remote tracking for the current branch.
    pub fn track(&mut self) -> Result<()> {
        let branch = self.git.current_branch()?;
        self.git.track_branch(&branch)
    }

    /// Merge the current branch into an aggregate branch (prototype by
    /// default). Integrating into staging cascades into prototype.
    pub async fn integrate(&mut self, target: Option<BranchName>) -> Result<()> {
        let branch = self.git.current_branch()?;
        let target = target.unwrap_or_else(|| self.config.prototype_branch.clone());

        self.assert_integration_allowed(&branch, &target)?;
        self.update_branch(&branch)?;
        self.integrate_branch(&branch, &target)?;
        if target == self.config.staging_branch {
            // The cascade leaves staging checked out.
            self.git.checkout(&branch)?;
        }

        self.report_integration(&branch, &target).await
    }

    fn assert_integration_allowed(&self, source: &BranchName, target: &BranchName) -> Result<()> {
        let aggregate = self.config.is_aggregate(target);
        if !aggregate && *target != self.config.base_branch {
            return Err(GitxError::IntegrationNotAllowed {
                allowed: self.config.aggregate_branch_names(),
            }
            .into());
        }
        if !aggregate {
            self.config.assert_not_protected(source, "integrate")?;
        }
        Ok(())
    }

    /// Merge `source` into a freshly refreshed `target`, push, and return
    /// to `source`. Integration always happens against the latest remote
    /// state, never a stale local copy.
    fn integrate_branch(&mut self, source: &BranchName, target: &BranchName) -> Result<()> {
        println!(
            "🔀 Integrating {} into {}",
            source.to_string().green(),
            target.to_string().green()
        );
        self.git.refresh_from_remote(target)?;
        self.git.pull_local_ref(source)?;
        self.git.push_head()?;
        self.git.checkout(source)?;

        if *target == self.config.staging_branch {
            let staging = self.config.staging_branch.clone();
            let prototype = self.config.prototype_branch.clone();
            self.integrate_branch(&staging, &prototype)?;
        }
        Ok(())
    }

    async fn report_integration(&mut self, branch: &BranchName, target: &BranchName) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        let body = format!("#worklog integrating {branch} into {target} #scgitx");
        if self.config.use_pr_comments {
            self.comment_or_warn(branch, &body).await
        } else {
            self.gateway
                .post_message(&body, MessageParams::default())
                .await?;
            Ok(())
        }
    }

    /// Comment on the branch's open pull request; having several open is
    /// ambiguous and fails, having none just warns.
    async fn comment_or_warn(&mut self, branch: &BranchName, body: &str) -> Result<()> {
        let repo = self.git.repo_slug()?;
        match self.gateway.current_pull_request(&repo, branch).await? {
            Some(pr) => self.gateway.comment_on_pull_request(&pr, body).await,
            None => {
                println!(
                    "{}",
                    format!("No open pull request found for {branch}; skipping comment").yellow()
                );
                Ok(())
            }
        }
    }

    /// Deprecated spelling of `integrate staging`.
    pub async fn promote(&mut self) -> Result<()> {
        println!(
            "{}",
            "DEPRECATED: promote will be removed in a future release; use: gitx integrate staging"
                .red()
        );
        let staging = self.config.staging_branch.clone();
        self.integrate(Some(staging)).await
    }

    /// Merge the current branch into base and push it out, then flow the
    /// change through staging (and, via the cascade, prototype) and prune
    /// merged branches.
    pub async fn release(&mut self) -> Result<()> {
        let branch = self.git.current_branch()?;
        self.config.assert_not_protected(&branch, "release")?;
        if self.config.enforce_staging_before_release {
            self.assert_in_last_known_good_staging(&branch)?;
        }

        let question = format!("Release {} to {}?", branch, self.config.base_branch);
        if !self.prompt.confirm(&question)? {
            return Ok(());
        }

        println!(
            "🚀 Releasing {} to {}",
            branch.to_string().green(),
            self.config.base_branch.to_string().green()
        );
        self.update_branch(&branch)?;
        let base = self.config.base_branch.clone();
        self.git.checkout(&base)?;
        self.git.pull_remote_branch(&base)?;
        self.git.pull_local_ref(&branch)?;
        self.git.push_head()?;

        let staging = self.config.staging_branch.clone();
        self.integrate_branch(&base, &staging)?;
        self.cleanup()?;

        self.report_release(&branch).await
    }

    /// The staging gate: the branch must already be merged into the remote
    /// last-known-good staging branch. Evaluation refreshes that branch
    /// and always returns to the branch under review.
    fn assert_in_last_known_good_staging(&mut self, branch: &BranchName) -> Result<()> {
        let last_known_good = self.config.last_known_good_staging_branch.clone();
        self.git.refresh_from_remote(&last_known_good)?;
        let merged = self.git.branches(BranchListing::remote().merged_into_head());
        let gate = match merged {
            Ok(branches) if branches.contains(branch) => Ok(()),
            Ok(_) => Err(GitxError::StagingGate {
                branch: branch.to_string(),
                staging_branch: self.config.staging_branch.to_string(),
            }
            .into()),
            Err(err) => Err(err),
        };
        self.git.checkout(branch)?;
        gate
    }

    async fn report_release(&mut self, branch: &BranchName) -> Result<()> {
        if self.quiet || self.config.use_pr_comments {
            // In comment mode the merged pull request itself is the signal.
            return Ok(());
        }
        let body = format!(
            "#worklog releasing {branch} to {} #scgitx",
            self.config.base_branch
        );
        self.gateway
            .post_message(&body, MessageParams::default())
            .await?;
        Ok(())
    }

    /// Reset an aggregate branch (and its last-known-good shadow) to a
    /// known-good branch, reporting which branches' work the reset dropped.
    pub async fn nuke(&mut self, bad_branch: String, destination: Option<String>) -> Result<()> {
        let bad_branch = BranchName::new(bad_branch);
        let default_good = bad_branch.last_known_good();

        let answer = match destination {
            Some(destination) => destination,
            None => self.prompt.ask(&format!(
                "What branch do you want to reset {bad_branch} to? (default: {default_good})"
            ))?,
        };
        let answer = answer.trim();
        let good_branch = if answer.is_empty() {
            default_good.clone()
        } else if answer.starts_with("last_known_good_") {
            BranchName::new(answer)
        } else {
            BranchName::new(format!("last_known_good_{answer}"))
        };

        let removed = self.nuke_branch(&bad_branch, &good_branch)?;
        let shadow = bad_branch.last_known_good();
        self.nuke_branch(&shadow, &good_branch)?;

        let body = nuke_message(
            &bad_branch,
            &good_branch,
            &self.config.developer_group,
            &removed,
        );
        self.report_broadcast(body, MessageParams::default()).await
    }

    /// Core reset: recreate `branch` from `head_branch`'s remote state.
    /// Returns the remote branches whose work was present in `branch` but
    /// not in `head_branch`, computed before anything is destroyed.
    pub fn nuke_branch(
        &mut self,
        branch: &BranchName,
        head_branch: &BranchName,
    ) -> Result<Vec<BranchName>> {
        if branch == head_branch {
            return Ok(Vec::new());
        }
        if !self.config.is_aggregate(branch) {
            return Err(GitxError::NukeNotAllowed {
                allowed: self.config.aggregate_branch_names(),
            }
            .into());
        }

        println!(
            "💣 Resetting {} to {}",
            branch.to_string().green(),
            head_branch.to_string().green()
        );
        let base = self.config.base_branch.clone();
        self.git.checkout(&base)?;
        self.git.refresh_from_remote(head_branch)?;

        let removed = self.git.branch_difference(branch, head_branch)?;

        // The doomed branch may exist in neither place.
        self.git.force_delete_local_branch(branch).ok();
        self.git.delete_remote_branch(branch).ok();

        self.git.create_branch(branch)?;
        self.git.share_branch(branch)?;
        self.git.checkout(&base)?;

        Ok(removed)
    }

    /// Prune branches fully merged into base, both remotely and locally.
    pub fn cleanup(&mut self) -> Result<()> {
        let base = self.config.base_branch.clone();
        self.git.checkout(&base)?;
        self.git.pull()?;
        self.git.prune_remote()?;

        println!(
            "🧹 Deleting branches that have been merged into {}",
            base.to_string().green()
        );
        let remote_merged = self.git.branches(BranchListing::remote().merged_into_head())?;
        for branch in remote_merged {
            if self.config.protected_for(&branch) {
                continue;
            }
            self.git.delete_remote_branch(&branch)?;
        }
        let local_merged = self.git.branches(BranchListing::local().merged_into_head())?;
        for branch in local_merged {
            if self.config.protected_for(&branch) {
                continue;
            }
            self.git.delete_local_branch(&branch)?;
        }
        Ok(())
    }

    /// Remote branches merged into `branch` but not into `other`.
    pub fn branch_diff(&mut self, branch: Option<String>, other: Option<String>) -> Result<()> {
        let branch = match branch {
            Some(name) => BranchName::new(name),
            None => self.git.current_branch()?,
        };
        let other = other
            .map(BranchName::new)
            .unwrap_or_else(|| self.config.base_branch.clone());

        self.git.fetch()?;
        let difference = self.git.branch_difference(&branch, &other)?;
        if difference.is_empty() {
            println!(
                "{}",
                format!("No branches found in {branch} that are not also in {other}").yellow()
            );
        } else {
            println!("Branches in {branch} and not in {other}:");
            for name in difference {
                println!("* {name}");
            }
        }
        Ok(())
    }

    /// Open a pull request for the current branch.
    pub async fn create_pr(&mut self, description: Option<String>) -> Result<()> {
        let branch = self.git.current_branch()?;
        self.update_branch(&branch)?;
        let repo = self.git.repo_slug()?;
        let body = self.resolve_description(description)?;
        let base = self.config.base_branch.clone();
        let pr = self
            .gateway
            .create_pull_request(&repo, &branch, &base, &body)
            .await?;
        println!("Pull request created: {}", pr.html_url.green());
        Ok(())
    }

    /// Hand the current branch's open pull request to a reviewer.
    pub async fn assign_pr(&mut self, assignee: String) -> Result<()> {
        let branch = self.git.current_branch()?;
        let repo = self.git.repo_slug()?;
        let pr = self
            .gateway
            .current_pull_request(&repo, &branch)
            .await?
            .ok_or_else(|| GitxError::PullRequestNotFound {
                branch: branch.to_string(),
            })?;
        self.assign_best_effort(&pr, &assignee).await;
        self.report_review_request(&branch, &pr, None).await
    }

    /// Open a pull request and announce it for review in one step.
    pub async fn review_request(
        &mut self,
        description: Option<String>,
        assignee: Option<String>,
    ) -> Result<()> {
        let branch = self.git.current_branch()?;
        self.update_branch(&branch)?;
        let repo = self.git.repo_slug()?;
        let description = self.resolve_description(description)?;
        let base = self.config.base_branch.clone();
        let pr = self
            .gateway
            .create_pull_request(&repo, &branch, &base, &description)
            .await?;
        println!("Pull request created: {}", pr.html_url.green());

        if let Some(assignee) = assignee {
            self.assign_best_effort(&pr, &assignee).await;
        }
        let excerpt = description_excerpt(&description);
        self.report_review_request(&branch, &pr, excerpt.as_deref())
            .await
    }

    /// Find pull requests referencing a commit.
    pub async fn find_pr(&mut self, sha: String) -> Result<()> {
        let repo = self.git.repo_slug()?;
        let results = self.gateway.search_pull_requests(&repo, &sha).await?;
        if results.is_empty() {
            println!("{}", format!("No results found for {sha}").yellow());
            return Ok(());
        }
        for item in results {
            println!(
                "\n{}\n\t{}\n\t{} opened {}",
                item.html_url.green(),
                item.title,
                item.user.login,
                item.created_at
            );
        }
        Ok(())
    }

    /// Cherry-pick a merged pull request onto a maintenance branch and
    /// open a pull request for the backport. The maintenance branch acts
    /// as the base for the whole flow; the resulting `backport_*` branch
    /// is retained after merge.
    pub async fn backport_pr(&mut self, number: u64, maintenance_branch: String) -> Result<()> {
        let repo = self.git.repo_slug()?;
        let pr = self.gateway.pull_request(&repo, number).await?;
        let commits = self.gateway.pull_request_commits(&pr).await?;
        // Merge commits would drag in unrelated history.
        let shas: Vec<String> = commits
            .into_iter()
            .filter(|commit| commit.parents.len() == 1)
            .map(|commit| commit.sha)
            .collect();

        let maintenance = BranchName::new(maintenance_branch);
        let backport_branch = BranchName::new(format!("backport_{number}_to_{maintenance}"));

        self.git.refresh_from_remote(&maintenance)?;
        self.git.create_branch(&backport_branch)?;
        self.cherry_pick_with_prompt(&shas)?;
        self.git.push_head()?;

        let body = format!(
            "Backport #{number} to https://github.com/{repo}/tree/{maintenance}\n***\n{}",
            pr.body.unwrap_or_default()
        );
        let backport_pr = self
            .gateway
            .create_pull_request(&repo, &backport_branch, &maintenance, &body)
            .await?;
        println!("Pull request created: {}", backport_pr.html_url.green());

        if self.quiet {
            return Ok(());
        }
        let report = format!(
            "#reviewrequest backport #{number} to {maintenance} #scgitx\n\n/cc @{}",
            self.config.developer_group
        );
        if self.config.use_pr_comments {
            self.gateway
                .comment_on_pull_request(&backport_pr, &report)
                .await
        } else {
            self.gateway
                .post_message(
                    &report,
                    MessageParams {
                        url: Some(backport_pr.html_url.clone()),
                        message_type: Some(REVIEW_REQUEST_MESSAGE_TYPE.to_string()),
                    },
                )
                .await?;
            Ok(())
        }
    }

    fn cherry_pick_with_prompt(&mut self, shas: &[String]) -> Result<()> {
        if shas.is_empty() {
            return Ok(());
        }
        if self.git.cherry_pick(shas).is_err() {
            let proceed = self.prompt.confirm(
                "Error during cherry-pick. Manually resolve conflicts, run `git cherry-pick --continue`, then confirm to proceed",
            )?;
            if !proceed {
                self.git.cherry_pick_abort().ok();
                return Err(GitxError::CherryPickAborted {
                    sha: shas.join(" "),
                }
                .into());
            }
        }
        Ok(())
    }

    fn resolve_description(&self, description: Option<String>) -> Result<String> {
        match description {
            Some(description) => Ok(description),
            None => editor_input(PULL_REQUEST_TEMPLATE),
        }
    }

    async fn assign_best_effort(&self, pr: &PullRequest, assignee: &str) {
        if let Err(err) = self.gateway.assign_pull_request(pr, assignee).await {
            println!("{}", format!("Failed to assign pull request: {err}").red());
        }
    }

    async fn report_review_request(
        &mut self,
        branch: &BranchName,
        pr: &PullRequest,
        excerpt: Option<&str>,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        let summary = self.changelog_summary(branch)?;
        let body = review_request_message(branch, &self.config.developer_group, excerpt, &summary);
        if self.config.use_pr_comments {
            self.gateway.comment_on_pull_request(pr, &body).await
        } else {
            self.gateway
                .post_message(
                    &body,
                    MessageParams {
                        url: Some(pr.html_url.clone()),
                        message_type: Some(REVIEW_REQUEST_MESSAGE_TYPE.to_string()),
                    },
                )
                .await?;
            Ok(())
        }
    }

    fn changelog_summary(&mut self, branch: &BranchName) -> Result<String> {
        let range = format!("origin/{}...{}", self.config.base_branch, branch);
        let numstat = self.git.diff_numstat(&range)?;
        let shortstat = self.git.diff_shortstat(&range)?;
        Ok(changelog::summarize(&numstat, &shortstat))
    }

    async fn report_broadcast(&mut self, body: String, params: MessageParams) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.gateway.post_message(&body, params).await?;
        Ok(())
    }
}

/// `#worklog` reset announcement, with the affected branches enumerated
/// when the reset actually dropped work.
fn nuke_message(
    bad_branch: &BranchName,
    good_branch: &BranchName,
    developer_group: &str,
    removed: &[BranchName],
) -> String {
    let mut lines = vec![
        format!("#worklog resetting {bad_branch} branch to {good_branch} #scgitx"),
        format!("/cc @{developer_group}"),
    ];
    if !removed.is_empty() {
        lines.push(String::new());
        lines.push("the following branches were affected:".to_string());
        for branch in removed {
            lines.push(format!("* {branch}"));
        }
    }
    lines.join("\n")
}

fn review_request_message(
    branch: &BranchName,
    developer_group: &str,
    excerpt: Option<&str>,
    changelog_summary: &str,
) -> String {
    let mut sections = vec![
        format!("#reviewrequest for {branch} #scgitx"),
        format!("/cc @{developer_group}"),
    ];
    if let Some(excerpt) = excerpt {
        sections.push(excerpt.to_string());
    }
    if !changelog_summary.is_empty() {
        sections.push(changelog_summary.to_string());
    }
    sections.join("\n\n")
}

/// First five lines of a pull-request description, for the announcement.
fn description_excerpt(description: &str) -> Option<String> {
    let excerpt = description
        .lines()
        .take(5)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    if excerpt.is_empty() {
        None
    } else {
        Some(excerpt)
    }
}
