//! Interactive input capability.
//!
//! The workflow engine asks questions through the [`Prompt`] trait so the
//! state machine stays testable without a terminal. The production
//! implementation is dialoguer; tests script their answers.

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input};
use std::env;
use std::io::Write;
use std::process::Command;

pub trait Prompt {
    fn confirm(&self, question: &str) -> Result<bool>;
    fn ask(&self, question: &str) -> Result<String>;
}

/// Dialoguer-backed prompt for real terminal sessions.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }

    fn ask(&self, question: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")
    }
}

/// Collect free-form text through `$EDITOR` (falling back to `$VISUAL`,
/// then `vi`) seeded with `initial_text`. Markdown comment lines (`# ...`)
/// are blanked out of the result, matching the seeded instructions.
pub fn editor_input(initial_text: &str) -> Result<String> {
    let mut file = tempfile::Builder::new()
        .prefix("gitx-description-")
        .suffix(".md")
        .tempfile()
        .context("Failed to create scratch file for editor")?;
    file.write_all(initial_text.as_bytes())?;
    file.flush()?;

    let editor = env::var("EDITOR")
        .or_else(|_| env::var("VISUAL"))
        .unwrap_or_else(|_| "vi".to_string());
    // $EDITOR may carry flags ("code --wait"); the first token is the
    // program.
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi");
    let status = Command::new(program)
        .args(parts)
        .arg(file.path())
        .status()
        .with_context(|| format!("Failed to launch editor {editor}"))?;
    if !status.success() {
        anyhow::bail!("Editor {editor} exited with failure");
    }

    let contents = std::fs::read_to_string(file.path())?;
    Ok(strip_comment_lines(&contents))
}

fn strip_comment_lines(text: &str) -> String {
    text.lines()
        .map(|line| if line.starts_with('#') { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
