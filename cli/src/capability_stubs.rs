//! Capability implementations the CLI does not wire to a real backend.
//!
//! A coding agent and an LLM client necessarily call out to a network
//! model; the block-lifecycle engine's own Non-goals rule out the core
//! from doing so itself, so this binary's default wiring surfaces a clear
//! configuration error instead of silently no-opping. A real deployment
//! swaps these two for an actual agent/model integration at the call site
//! in `main.rs`.

use async_trait::async_trait;
use tac_core::capabilities::{CodingAgent, LlmClient, LlmMessage, ProjectIndexer, TestRunOutcome, TestRunner, VersionControl};
use tac_core::error::{OrchestratorError, Result};
use tac_core::models::ProtoBlock;

fn not_wired(capability: &str) -> OrchestratorError {
    OrchestratorError::configuration(format!(
        "no {capability} implementation is configured; wire a real one in tac-cli::main before running `make`"
    ))
}

/// Stand-in for `--no-git`: every operation is a no-op, `complete_diff`
/// reports an empty diff. Used only when `OrchestratorConfig::no_git` is
/// set, which `OrchestratorConfig::validate` already guarantees cannot
/// coexist with the `plausibility` trusty agent.
pub struct NullVersionControl;

#[async_trait]
impl VersionControl for NullVersionControl {
    async fn current_branch(&self) -> Result<String> {
        Ok(String::new())
    }
    async fn checkout(&self, _branch: &str, _create: bool) -> Result<()> {
        Ok(())
    }
    async fn status(&self, _ignore_untracked: bool) -> Result<(bool, String)> {
        Ok((true, String::new()))
    }
    async fn complete_diff(&self) -> Result<String> {
        Ok(String::new())
    }
    async fn commit(&self, _message: &str) -> Result<()> {
        Ok(())
    }
    async fn revert_all_changes_and_clean_untracked(&self) -> Result<()> {
        Ok(())
    }
}

pub struct UnconfiguredCodingAgent;

#[async_trait]
impl CodingAgent for UnconfiguredCodingAgent {
    async fn run(&self, _protoblock: &ProtoBlock, _previous_analysis: Option<&str>) -> Result<()> {
        Err(not_wired("coding agent"))
    }
}

pub struct UnconfiguredLlmClient;

#[async_trait]
impl LlmClient for UnconfiguredLlmClient {
    async fn text_complete(&self, _messages: &[LlmMessage], _model_hint: Option<&str>, _reasoning_effort: Option<&str>) -> Result<String> {
        Err(not_wired("LLM client"))
    }

    async fn vision_complete(&self, _messages: &[LlmMessage], _image_path: &str, _model_hint: Option<&str>) -> Result<String> {
        Err(not_wired("LLM client"))
    }
}

/// Runs a configurable shell command against `path` and reports success by
/// exit code, per spec §6.3 (0 = all passed, 5 = none collected, treated
/// as pass).
pub struct ShellTestRunner {
    command: String,
}

impl ShellTestRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

#[async_trait]
impl TestRunner for ShellTestRunner {
    async fn run_tests(&self, path: &str) -> Result<TestRunOutcome> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .arg("--")
            .arg(path)
            .output()
            .await
            .map_err(|e| OrchestratorError::infrastructure(format!("failed to spawn test command '{}': {e}", self.command)))?;

        let raw_output = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let code = output.status.code().unwrap_or(-1);
        let all_passed = code == 0 || code == 5;

        Ok(TestRunOutcome { all_passed, raw_output, collected_test_names: Vec::new() })
    }
}

/// Walks `root` and emits one `###FILE:` summary block per file, per spec
/// §6.5's output shape. The "summary" is the first line of the file; a
/// real deployment would replace this with an LLM-written summary and
/// `.gitignore`-aware, hash-based incremental refresh.
pub struct WalkingProjectIndexer {
    root: std::path::PathBuf,
}

impl WalkingProjectIndexer {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ProjectIndexer for WalkingProjectIndexer {
    async fn get_codebase_summary(&self) -> Result<String> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || walk_summary(&root))
            .await
            .map_err(|e| OrchestratorError::infrastructure(format!("indexer task panicked: {e}")))?
    }

    async fn refresh_index(&self) -> Result<()> {
        Ok(())
    }
}

fn walk_summary(root: &std::path::Path) -> Result<String> {
    let mut blocks = Vec::new();
    for entry in walkdir(root)? {
        let relative = entry.strip_prefix(root).unwrap_or(&entry).display().to_string();
        let first_line = std::fs::read_to_string(&entry)
            .ok()
            .and_then(|content| content.lines().next().map(str::to_string))
            .unwrap_or_default();
        blocks.push(format!("###FILE: {relative}\n{first_line}\n###END_FILE"));
    }
    Ok(blocks.join("\n"))
}

fn walkdir(root: &std::path::Path) -> Result<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| OrchestratorError::infrastructure(format!("failed to read directory {}: {e}", dir.display())))?;
        for entry in entries {
            let entry = entry.map_err(|e| OrchestratorError::infrastructure(format!("failed to read directory entry: {e}")))?;
            let path = entry.path();
            if path.is_dir() {
                if path.file_name().and_then(|n| n.to_str()) != Some(".git") {
                    stack.push(path);
                }
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
