//! Trait interfaces for the external collaborators named in spec §6. Each
//! is a capability boundary: the block lifecycle engine depends only on
//! these traits, never on a concrete LLM client, VCS shell, or subprocess
//! runner.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ProtoBlock, TrustyAgentResult};

/// Drives a language-model-backed agent that edits files on disk.
///
/// # Contract
/// - May read any file in `protoblock.context_files` or
///   `protoblock.write_files`; must not modify anything outside
///   `write_files`.
/// - On successful return, files are left in a parseable state -- the
///   verifier pipeline runs immediately afterwards.
/// - `previous_analysis` is `None` on the first attempt of a block, and
///   `Some(text)` on every retry, carrying the prior attempt's failure
///   analysis.
///
/// # Errors
/// Returns `Err` on any unrecoverable failure (process exit nonzero,
/// timeout); the executor treats this identically to a failing `pytest`
/// agent.
#[async_trait]
pub trait CodingAgent: Send + Sync {
    async fn run(&self, protoblock: &ProtoBlock, previous_analysis: Option<&str>) -> Result<()>;
}

/// Version-control shell: branch, commit, diff, revert, clean.
///
/// # Errors
/// Every operation fails loudly on the underlying VCS returning a
/// nonzero/error status. `revert_all_changes_and_clean_untracked` is
/// idempotent: calling it on an already-clean tree is a no-op success.
#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn current_branch(&self) -> Result<String>;

    async fn checkout(&self, branch: &str, create: bool) -> Result<()>;

    /// Returns `(clean, branch_name)`. `ignore_untracked` controls whether
    /// untracked files count against cleanliness.
    async fn status(&self, ignore_untracked: bool) -> Result<(bool, String)>;

    async fn complete_diff(&self) -> Result<String>;

    async fn commit(&self, message: &str) -> Result<()>;

    async fn revert_all_changes_and_clean_untracked(&self) -> Result<()>;
}

/// Outcome of one test-runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunOutcome {
    pub all_passed: bool,
    pub raw_output: String,
    pub collected_test_names: Vec<String>,
}

/// Subprocess driver for the project's unit-test suite.
///
/// # Errors
/// Exit code 0 maps to `all_passed = true`; exit code 5 ("no tests
/// collected") also maps to `all_passed = true` per spec §6.3; any other
/// exit code maps to `all_passed = false`. Process-launch failures
/// surface as `Err`.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run_tests(&self, path: &str) -> Result<TestRunOutcome>;
}

/// One chat-style message in an LLM request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: LlmRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: LlmRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: LlmRole::Assistant, content: content.into() }
    }
}

/// Text and vision completion endpoints. Treated purely as request/response
/// boundaries -- no model or provider specifics live in this trait.
///
/// Implementations that reject a system role must transparently fold any
/// leading `System` message into the first `User` message followed by a
/// synthetic `Assistant` "Understood." turn, per spec §6.4.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn text_complete(
        &self,
        messages: &[LlmMessage],
        model_hint: Option<&str>,
        reasoning_effort: Option<&str>,
    ) -> Result<String>;

    async fn vision_complete(
        &self,
        messages: &[LlmMessage],
        image_path: &str,
        model_hint: Option<&str>,
    ) -> Result<String>;
}

/// Read-only codebase summary source.
///
/// # Errors
/// `refresh_index` surfaces an `Err` on filesystem errors encountered
/// while walking the tree or hashing files; a summary request failure for
/// one file must not abort the whole refresh.
#[async_trait]
pub trait ProjectIndexer: Send + Sync {
    async fn get_codebase_summary(&self) -> Result<String>;

    async fn refresh_index(&self) -> Result<()>;
}

/// Pluggable verifier invoked post-edit.
///
/// # Contract
/// `check` must never propagate an exception-equivalent: internal failures
/// are caught and converted into a `TrustyAgentResult` carrying an `error`
/// component, per spec §7's propagation rule.
#[async_trait]
pub trait TrustyAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, protoblock: &ProtoBlock, codebase_snapshot: &str, code_diff: &str) -> TrustyAgentResult;
}

/// Capability sub-trait for stateful before/after agents (`web_compare`,
/// `web_reference`). The executor calls `capture_before_state` ahead of
/// the coding agent's `run`, then `check` afterwards. This models the
/// source's multiple inheritance (`ComparativeTrustyAgent extends
/// TrustyAgent`) as a Rust capability sub-interface instead.
#[async_trait]
pub trait ComparativeTrustyAgent: TrustyAgent {
    async fn capture_before_state(&self, protoblock: &ProtoBlock) -> Result<()>;
}
