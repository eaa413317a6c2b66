//! Mock implementations of the `tac-core` capability traits.
//!
//! Each mock follows the same shape as `MockTaskRepository`: thread-safe
//! state behind `parking_lot::Mutex`, error injection that consumes itself
//! on use, and call-history tracking with an `assert_called` helper.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tac_core::capabilities::{
    CodingAgent, LlmClient, LlmMessage, ProjectIndexer, TestRunOutcome, TestRunner, VersionControl,
};
use tac_core::error::{OrchestratorError, Result};
use tac_core::models::ProtoBlock;

/// Shared call-history / error-injection bookkeeping, composed into each
/// mock below instead of duplicated per-struct.
#[derive(Default)]
struct CallLog {
    error_injection: Mutex<Option<OrchestratorError>>,
    call_history: Mutex<Vec<String>>,
}

impl CallLog {
    fn inject_error(&self, error: OrchestratorError) {
        *self.error_injection.lock() = Some(error);
    }

    fn clear_error(&self) {
        *self.error_injection.lock() = None;
    }

    fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    fn clear_history(&self) {
        self.call_history.lock().clear();
    }

    fn assert_called(&self, method: &str) {
        let history = self.call_history.lock();
        assert!(
            history.iter().any(|call| call.contains(method)),
            "Method '{method}' was not called. Call history: {:?}",
            *history
        );
    }

    fn check_error_injection(&self) -> Result<()> {
        let mut error_opt = self.error_injection.lock();
        if let Some(error) = error_opt.take() {
            return Err(error);
        }
        Ok(())
    }

    fn record_call(&self, method: &str) {
        self.call_history.lock().push(format!("{method}()"));
    }

    fn record_call_with_params(&self, method: &str, params: &str) {
        self.call_history.lock().push(format!("{method}({params})"));
    }
}

/// Mock [`CodingAgent`]: records the protoblocks it was asked to apply and
/// optionally mutates a shared "files written" ledger so tests can assert
/// on which paths were touched.
pub struct MockCodingAgent {
    log: CallLog,
    written_files: Arc<Mutex<Vec<String>>>,
}

impl Default for MockCodingAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCodingAgent {
    pub fn new() -> Self {
        Self { log: CallLog::default(), written_files: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn inject_error(&self, error: OrchestratorError) {
        self.log.inject_error(error);
    }
    pub fn clear_error(&self) {
        self.log.clear_error();
    }
    pub fn call_history(&self) -> Vec<String> {
        self.log.call_history()
    }
    pub fn clear_history(&self) {
        self.log.clear_history();
    }
    pub fn assert_called(&self, method: &str) {
        self.log.assert_called(method);
    }
    pub fn written_files(&self) -> Vec<String> {
        self.written_files.lock().clone()
    }
}

#[async_trait]
impl CodingAgent for MockCodingAgent {
    async fn run(&self, protoblock: &ProtoBlock, previous_analysis: Option<&str>) -> Result<()> {
        self.log.record_call_with_params(
            "run",
            &format!("block_id={}, retry={}", protoblock.block_id, previous_analysis.is_some()),
        );
        self.log.check_error_injection()?;
        self.written_files.lock().extend(protoblock.write_files.iter().cloned());
        Ok(())
    }
}

/// Mock [`VersionControl`]: an in-memory branch/commit/diff/dirty-flag
/// model sufficient to exercise `BlockProcessor`/`MultiBlockOrchestrator`
/// without a real git repository.
pub struct MockVersionControl {
    log: CallLog,
    current_branch: Mutex<String>,
    commits: Mutex<Vec<String>>,
    dirty: Mutex<bool>,
    diff: Mutex<String>,
    revert_count: Mutex<u32>,
}

impl MockVersionControl {
    pub fn new(starting_branch: impl Into<String>) -> Self {
        Self {
            log: CallLog::default(),
            current_branch: Mutex::new(starting_branch.into()),
            commits: Mutex::new(Vec::new()),
            dirty: Mutex::new(false),
            diff: Mutex::new(String::new()),
            revert_count: Mutex::new(0),
        }
    }

    pub fn inject_error(&self, error: OrchestratorError) {
        self.log.inject_error(error);
    }
    pub fn clear_error(&self) {
        self.log.clear_error();
    }
    pub fn call_history(&self) -> Vec<String> {
        self.log.call_history()
    }
    pub fn assert_called(&self, method: &str) {
        self.log.assert_called(method);
    }

    pub fn set_dirty(&self, dirty: bool) {
        *self.dirty.lock() = dirty;
    }

    pub fn set_diff(&self, diff: impl Into<String>) {
        *self.diff.lock() = diff.into();
    }

    pub fn commits(&self) -> Vec<String> {
        self.commits.lock().clone()
    }

    pub fn revert_count(&self) -> u32 {
        *self.revert_count.lock()
    }
}

#[async_trait]
impl VersionControl for MockVersionControl {
    async fn current_branch(&self) -> Result<String> {
        self.log.record_call("current_branch");
        self.log.check_error_injection()?;
        Ok(self.current_branch.lock().clone())
    }

    async fn checkout(&self, branch: &str, create: bool) -> Result<()> {
        self.log.record_call_with_params("checkout", &format!("branch={branch}, create={create}"));
        self.log.check_error_injection()?;
        *self.current_branch.lock() = branch.to_string();
        Ok(())
    }

    async fn status(&self, ignore_untracked: bool) -> Result<(bool, String)> {
        self.log.record_call_with_params("status", &format!("ignore_untracked={ignore_untracked}"));
        self.log.check_error_injection()?;
        Ok((!*self.dirty.lock(), self.current_branch.lock().clone()))
    }

    async fn complete_diff(&self) -> Result<String> {
        self.log.record_call("complete_diff");
        self.log.check_error_injection()?;
        Ok(self.diff.lock().clone())
    }

    async fn commit(&self, message: &str) -> Result<()> {
        self.log.record_call_with_params("commit", &format!("message={message}"));
        self.log.check_error_injection()?;
        self.commits.lock().push(message.to_string());
        Ok(())
    }

    async fn revert_all_changes_and_clean_untracked(&self) -> Result<()> {
        self.log.record_call("revert_all_changes_and_clean_untracked");
        self.log.check_error_injection()?;
        *self.revert_count.lock() += 1;
        *self.dirty.lock() = false;
        *self.diff.lock() = String::new();
        Ok(())
    }
}

/// Mock [`TestRunner`]: returns a scripted outcome, optionally a different
/// one per call for simulating "fails then passes on retry".
pub struct MockTestRunner {
    log: CallLog,
    outcomes: Mutex<Vec<TestRunOutcome>>,
}

impl MockTestRunner {
    pub fn new(outcomes: Vec<TestRunOutcome>) -> Self {
        Self { log: CallLog::default(), outcomes: Mutex::new(outcomes) }
    }

    pub fn always_passing() -> Self {
        Self::new(vec![TestRunOutcome { all_passed: true, raw_output: String::new(), collected_test_names: Vec::new() }])
    }

    pub fn call_history(&self) -> Vec<String> {
        self.log.call_history()
    }
}

#[async_trait]
impl TestRunner for MockTestRunner {
    async fn run_tests(&self, path: &str) -> Result<TestRunOutcome> {
        self.log.record_call_with_params("run_tests", &format!("path={path}"));
        self.log.check_error_injection()?;
        let mut outcomes = self.outcomes.lock();
        if outcomes.len() > 1 {
            Ok(outcomes.remove(0))
        } else {
            Ok(outcomes.first().cloned().unwrap_or(TestRunOutcome {
                all_passed: true,
                raw_output: String::new(),
                collected_test_names: Vec::new(),
            }))
        }
    }
}

/// Mock [`LlmClient`]: replays a fixed queue of `text_complete` responses
/// in order, recording every prompt it was given.
pub struct MockLlmClient {
    log: CallLog,
    responses: Mutex<Vec<String>>,
    vision_responses: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self { log: CallLog::default(), responses: Mutex::new(responses), vision_responses: Mutex::new(Vec::new()) }
    }

    pub fn with_vision_responses(mut self, responses: Vec<String>) -> Self {
        self.vision_responses = Mutex::new(responses);
        self
    }

    pub fn inject_error(&self, error: OrchestratorError) {
        self.log.inject_error(error);
    }
    pub fn clear_error(&self) {
        self.log.clear_error();
    }
    pub fn call_history(&self) -> Vec<String> {
        self.log.call_history()
    }
    pub fn assert_called(&self, method: &str) {
        self.log.assert_called(method);
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn text_complete(
        &self,
        messages: &[LlmMessage],
        _model_hint: Option<&str>,
        _reasoning_effort: Option<&str>,
    ) -> Result<String> {
        self.log.record_call_with_params("text_complete", &format!("messages={}", messages.len()));
        self.log.check_error_injection()?;
        let mut responses = self.responses.lock();
        if responses.is_empty() {
            return Err(OrchestratorError::infrastructure("MockLlmClient: no scripted response left"));
        }
        Ok(responses.remove(0))
    }

    async fn vision_complete(&self, messages: &[LlmMessage], image_path: &str, _model_hint: Option<&str>) -> Result<String> {
        self.log.record_call_with_params("vision_complete", &format!("messages={}, image={image_path}", messages.len()));
        self.log.check_error_injection()?;
        let mut responses = self.vision_responses.lock();
        if responses.is_empty() {
            return Err(OrchestratorError::infrastructure("MockLlmClient: no scripted vision response left"));
        }
        Ok(responses.remove(0))
    }
}

/// Mock [`ProjectIndexer`]: a static or per-refresh codebase summary.
pub struct MockProjectIndexer {
    log: CallLog,
    summaries: Mutex<Vec<String>>,
}

impl MockProjectIndexer {
    pub fn new(summary: impl Into<String>) -> Self {
        Self { log: CallLog::default(), summaries: Mutex::new(vec![summary.into()]) }
    }

    pub fn with_summaries(summaries: Vec<String>) -> Self {
        Self { log: CallLog::default(), summaries: Mutex::new(summaries) }
    }

    pub fn call_history(&self) -> Vec<String> {
        self.log.call_history()
    }
}

#[async_trait]
impl ProjectIndexer for MockProjectIndexer {
    async fn get_codebase_summary(&self) -> Result<String> {
        self.log.record_call("get_codebase_summary");
        self.log.check_error_injection()?;
        let summaries = self.summaries.lock();
        Ok(summaries.last().cloned().unwrap_or_default())
    }

    async fn refresh_index(&self) -> Result<()> {
        self.log.record_call("refresh_index");
        self.log.check_error_injection()?;
        let mut summaries = self.summaries.lock();
        if summaries.len() > 1 {
            summaries.remove(0);
        }
        Ok(())
    }
}
