use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::VecDeque;

use gitx::branch::BranchName;
use gitx::config::{ConfigFile, WorkflowConfig};
use gitx::gateway::CollaborationGateway;
use gitx::git::GitRunner;
use gitx::github::{CommitRef, PullRequest, PullRequestCommit, PullRequestSearchResult, SearchUser};
use gitx::messaging::MessageParams;
use gitx::prompt::Prompt;
use gitx::workflow::WorkflowEngine;

/// Runner that records every mutating git command as its rendered string
/// and serves scripted output for read-only commands. Scripted failures
/// match the exact rendered command; captures match by prefix.
pub struct RecordingRunner {
    commands: Vec<String>,
    captures: Vec<(String, String)>,
    failures: Vec<String>,
    current_branch: BranchName,
    repo_slug: String,
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            captures: Vec::new(),
            failures: Vec::new(),
            current_branch: BranchName::new("FOO"),
            repo_slug: "acme/widgets".to_string(),
        }
    }

    pub fn with_current_branch(mut self, branch: &str) -> Self {
        self.current_branch = BranchName::new(branch);
        self
    }

    pub fn with_capture(mut self, command_prefix: &str, output: &str) -> Self {
        self.captures
            .push((command_prefix.to_string(), output.to_string()));
        self
    }

    pub fn with_failure(mut self, command: &str) -> Self {
        self.failures.push(command.to_string());
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

impl GitRunner for RecordingRunner {
    fn run(&mut self, args: &[&str]) -> Result<()> {
        let rendered = format!("git {}", args.join(" "));
        self.commands.push(rendered.clone());
        if self.failures.iter().any(|f| *f == rendered) {
            return Err(gitx::GitxError::RequiredCommandFailed {
                command: rendered,
                status: Some(1),
            }
            .into());
        }
        Ok(())
    }

    fn capture(&mut self, args: &[&str]) -> Result<String> {
        let rendered = format!("git {}", args.join(" "));
        let output = self
            .captures
            .iter()
            .find(|(prefix, _)| rendered.starts_with(prefix))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        Ok(output)
    }

    fn current_branch(&self) -> Result<BranchName> {
        Ok(self.current_branch.clone())
    }

    fn repo_slug(&self) -> Result<String> {
        Ok(self.repo_slug.clone())
    }
}

/// Prompt with queued answers; an unscripted question fails the test.
#[derive(Default)]
pub struct ScriptedPrompt {
    confirmations: RefCell<VecDeque<bool>>,
    answers: RefCell<VecDeque<String>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirmation(self, answer: bool) -> Self {
        self.confirmations.borrow_mut().push_back(answer);
        self
    }

    pub fn with_answer(self, answer: &str) -> Self {
        self.answers.borrow_mut().push_back(answer.to_string());
        self
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        self.confirmations
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("Unscripted confirmation prompt: {question}"))
    }

    fn ask(&self, question: &str) -> Result<String> {
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("Unscripted input prompt: {question}"))
    }
}

#[derive(Debug, Clone)]
pub struct PostedMessageRecord {
    pub body: String,
    pub url: Option<String>,
    pub message_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedPullRequestRecord {
    pub repo: String,
    pub branch: String,
    pub base: String,
    pub body: String,
}

/// Gateway that records calls and serves scripted pull requests.
#[derive(Default)]
pub struct RecordingGateway {
    pub messages: RefCell<Vec<PostedMessageRecord>>,
    pub comments: RefCell<Vec<(u64, String)>>,
    pub assignments: RefCell<Vec<(u64, String)>>,
    pub created: RefCell<Vec<CreatedPullRequestRecord>>,
    pub searches: RefCell<Vec<(String, String)>>,
    open_pr: Option<PullRequest>,
    pull_request: Option<PullRequest>,
    commits: Vec<PullRequestCommit>,
    search_results: Vec<PullRequestSearchResult>,
    fail_assignments: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_open_pr(mut self, pr: PullRequest) -> Self {
        self.open_pr = Some(pr);
        self
    }

    pub fn with_pull_request(mut self, pr: PullRequest) -> Self {
        self.pull_request = Some(pr);
        self
    }

    pub fn with_commits(mut self, commits: Vec<PullRequestCommit>) -> Self {
        self.commits = commits;
        self
    }

    pub fn with_search_results(mut self, results: Vec<PullRequestSearchResult>) -> Self {
        self.search_results = results;
        self
    }

    pub fn with_failing_assignments(mut self) -> Self {
        self.fail_assignments = true;
        self
    }
}

impl CollaborationGateway for RecordingGateway {
    async fn post_message(&self, body: &str, params: MessageParams) -> Result<String> {
        self.messages.borrow_mut().push(PostedMessageRecord {
            body: body.to_string(),
            url: params.url,
            message_type: params.message_type,
        });
        Ok("https://stream.example.com/messages/1".to_string())
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        branch: &BranchName,
        base: &BranchName,
        body: &str,
    ) -> Result<PullRequest> {
        self.created.borrow_mut().push(CreatedPullRequestRecord {
            repo: repo.to_string(),
            branch: branch.to_string(),
            base: base.to_string(),
            body: body.to_string(),
        });
        Ok(pull_request(42, Some(body)))
    }

    async fn current_pull_request(
        &self,
        _repo: &str,
        _branch: &BranchName,
    ) -> Result<Option<PullRequest>> {
        Ok(self.open_pr.clone())
    }

    async fn assign_pull_request(&self, pr: &PullRequest, assignee: &str) -> Result<()> {
        if self.fail_assignments {
            return Err(anyhow!("assignment rejected"));
        }
        self.assignments
            .borrow_mut()
            .push((pr.number, assignee.to_string()));
        Ok(())
    }

    async fn comment_on_pull_request(&self, pr: &PullRequest, body: &str) -> Result<()> {
        self.comments
            .borrow_mut()
            .push((pr.number, body.to_string()));
        Ok(())
    }

    async fn pull_request(&self, _repo: &str, number: u64) -> Result<PullRequest> {
        self.pull_request
            .clone()
            .ok_or_else(|| anyhow!("No scripted pull request #{number}"))
    }

    async fn pull_request_commits(&self, _pr: &PullRequest) -> Result<Vec<PullRequestCommit>> {
        Ok(self.commits.clone())
    }

    async fn search_pull_requests(
        &self,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<PullRequestSearchResult>> {
        self.searches
            .borrow_mut()
            .push((repo.to_string(), sha.to_string()));
        Ok(self.search_results.clone())
    }
}

/// A pull request as the service would return it.
pub fn pull_request(number: u64, body: Option<&str>) -> PullRequest {
    PullRequest {
        number,
        html_url: format!("https://github.com/acme/widgets/pull/{number}"),
        issue_url: format!("https://api.github.com/repos/acme/widgets/issues/{number}"),
        body: body.map(str::to_string),
        commits_url: Some(format!(
            "https://api.github.com/repos/acme/widgets/pulls/{number}/commits"
        )),
    }
}

pub fn search_result(number: u64, title: &str, login: &str) -> PullRequestSearchResult {
    PullRequestSearchResult {
        html_url: format!("https://github.com/acme/widgets/pull/{number}"),
        title: title.to_string(),
        user: SearchUser {
            login: login.to_string(),
        },
        created_at: "2025-11-02T10:00:00Z".to_string(),
    }
}

pub fn commit(sha: &str, parent_count: usize) -> PullRequestCommit {
    PullRequestCommit {
        sha: sha.to_string(),
        parents: (0..parent_count)
            .map(|i| CommitRef {
                sha: format!("parent{i}"),
            })
            .collect(),
    }
}

/// Resolved config built from a mutated [`ConfigFile`], mirroring how the
/// production loader works.
pub fn config_with(mutate: impl FnOnce(&mut ConfigFile)) -> WorkflowConfig {
    let mut file = ConfigFile::default();
    mutate(&mut file);
    WorkflowConfig::resolve(file, None)
}

pub type TestEngine = WorkflowEngine<RecordingRunner, RecordingGateway, ScriptedPrompt>;

pub fn engine(
    runner: RecordingRunner,
    gateway: RecordingGateway,
    prompt: ScriptedPrompt,
) -> TestEngine {
    WorkflowEngine::new(runner, gateway, prompt, WorkflowConfig::default(), false)
}

pub fn engine_with_config(
    runner: RecordingRunner,
    gateway: RecordingGateway,
    prompt: ScriptedPrompt,
    config: WorkflowConfig,
) -> TestEngine {
    WorkflowEngine::new(runner, gateway, prompt, config, false)
}

pub fn quiet_engine(
    runner: RecordingRunner,
    gateway: RecordingGateway,
    prompt: ScriptedPrompt,
) -> TestEngine {
    WorkflowEngine::new(runner, gateway, prompt, WorkflowConfig::default(), true)
}
