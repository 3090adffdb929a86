use anyhow::{Context, Result};
use clap::Parser;
use clap_complete::Shell;
use colored::*;

use gitx::branch::BranchName;
use gitx::cli::{Cli, Commands};
use gitx::config::WorkflowConfig;
use gitx::gateway::LiveGateway;
use gitx::git::ShellGitRunner;
use gitx::github;
use gitx::prompt::TerminalPrompt;
use gitx::workflow::WorkflowEngine;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{}", format!("{err:#}").red());
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    if let Commands::Completion { shell } = &command {
        handle_completion_command(shell);
        return Ok(());
    }

    if requires_github(&command) {
        github::check_auth()?;
    }

    let config = WorkflowConfig::load()
        .await
        .context("Failed to load gitx configuration")?;
    let mut engine = WorkflowEngine::new(
        ShellGitRunner::new(),
        LiveGateway::new(),
        TerminalPrompt::new(),
        config,
        cli.quiet,
    );

    match command {
        Commands::Update => engine.update(),
        Commands::Start { name } => engine.start(name).await,
        Commands::Share => engine.share(),
        Commands::Track => engine.track(),
        Commands::Integrate { target } => engine.integrate(target.map(BranchName::new)).await,
        Commands::Promote => engine.promote().await,
        Commands::Release => engine.release().await,
        Commands::Nuke {
            branch,
            destination,
        } => engine.nuke(branch, destination).await,
        Commands::Cleanup => engine.cleanup(),
        Commands::Branchdiff { branch, other } => engine.branch_diff(branch, other),
        Commands::Createpr { description } => engine.create_pr(description).await,
        Commands::Assignpr { assignee } => engine.assign_pr(assignee).await,
        Commands::Reviewrequest {
            description,
            assignee,
        } => engine.review_request(description, assignee).await,
        Commands::Findpr { sha } => engine.find_pr(sha).await,
        Commands::Backportpr { number, branch } => engine.backport_pr(number, branch).await,
        // Handled before the engine is built.
        Commands::Completion { .. } => Ok(()),
    }
}

/// Commands that talk to the GitHub API fail fast when no authentication
/// is configured, before any git commands run.
fn requires_github(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Createpr { .. }
            | Commands::Assignpr { .. }
            | Commands::Reviewrequest { .. }
            | Commands::Findpr { .. }
            | Commands::Backportpr { .. }
    )
}

fn handle_completion_command(shell: &Shell) {
    use clap::CommandFactory;
    use clap_complete::{generate, Generator};
    use std::io;

    fn print_completions<G: Generator>(gen: G, cmd: &mut clap::Command) {
        generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    }

    let mut cmd = Cli::command();
    print_completions(*shell, &mut cmd);
}
