//! Retry loop around the generator and executor, with revert between
//! attempts (spec §4.3).

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::capabilities::{CodingAgent, LlmClient, VersionControl};
use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::executor::{BlockExecutor, ExecutionOutcome, ResolvedTrustyAgent};
use crate::generator::ProtoBlockGenerator;
use crate::models::ProtoBlock;
use crate::registry::TrustyAgentRegistry;

/// Drives the generate -> execute -> (commit | revert+regenerate) state
/// machine for one logical block.
pub struct BlockProcessor<'a> {
    pub llm: &'a dyn LlmClient,
    pub coding_agent: &'a dyn CodingAgent,
    pub vcs: &'a dyn VersionControl,
    pub registry: &'a TrustyAgentRegistry,
    pub config: &'a OrchestratorConfig,
    /// Directory each generated protoblock is persisted to as
    /// `.tac_protoblock_<block_id>.json` (spec §3/§6.6).
    pub persist_dir: &'a Path,
    /// When `config.halt_after_fail` is set, `run_loop` awaits a
    /// notification on this handle between attempts instead of retrying
    /// immediately. The caller drives the external resume signal (CLI
    /// prompt, UI button, test harness) and calls `notify_one()`.
    pub resume_signal: Option<Arc<Notify>>,
}

impl<'a> BlockProcessor<'a> {
    /// Run the retry loop for `instructions` against `codebase_summary`.
    /// `resolve_agent` resolves a trusty-agent name to its implementation,
    /// as required by [`BlockExecutor::execute_block`].
    ///
    /// Returns `Ok(true)` on eventual success, `Ok(false)` if the attempt
    /// budget is exhausted without success. VCS errors (dirty tree at
    /// entry, failed branch setup, failed revert) are fatal and surface as
    /// `Err`.
    pub async fn run_loop(
        &self,
        instructions: &str,
        codebase_summary: &str,
        resolve_agent: impl Fn(&str) -> Option<ResolvedTrustyAgent<'_>>,
    ) -> Result<bool> {
        let (clean, _branch) = self.vcs.status(true).await?;
        if !clean {
            return Err(OrchestratorError::vcs_error("working tree is dirty; refusing to start"));
        }

        let mut block = ProtoBlockGenerator::generate(
            instructions,
            codebase_summary,
            self.llm,
            self.registry,
            self.config,
            self.persist_dir,
            None,
            None,
        )
        .await?;

        self.setup_branch(&block).await?;

        let mut previous_analysis: Option<String> = None;

        for attempt in 1..=self.config.max_attempts {
            block.attempt_number = attempt;

            if attempt > 1 {
                if self.config.halt_after_fail {
                    if let Some(signal) = &self.resume_signal {
                        tracing::info!(attempt, "halt_after_fail: waiting for resume signal");
                        signal.notified().await;
                    }
                }
                self.vcs.revert_all_changes_and_clean_untracked().await?;
                block = ProtoBlockGenerator::generate(
                    instructions,
                    codebase_summary,
                    self.llm,
                    self.registry,
                    self.config,
                    self.persist_dir,
                    Some(&block.block_id),
                    previous_analysis.as_deref(),
                )
                .await?;
                block.attempt_number = attempt;
            }

            let outcome: ExecutionOutcome = BlockExecutor::execute_block(
                &mut block,
                previous_analysis.as_deref(),
                codebase_summary,
                self.coding_agent,
                self.vcs,
                self.registry,
                &resolve_agent,
            )
            .await;

            if outcome.success {
                self.vcs.commit(&block.commit_message).await?;
                return Ok(true);
            }

            tracing::warn!(attempt, failure_type = %outcome.failure_type, "attempt failed");
            previous_analysis = Some(outcome.error_analysis);
        }

        Ok(false)
    }

    /// Reuse the current branch if already on a `tac/*` branch; otherwise
    /// create/switch to the protoblock's branch. Runs once per logical
    /// block.
    async fn setup_branch(&self, block: &ProtoBlock) -> Result<()> {
        let current = self.vcs.current_branch().await?;
        if current.starts_with("tac/") {
            tracing::info!(branch = %current, "reusing existing tac branch");
            return Ok(());
        }
        self.vcs.checkout(&block.branch_name, true).await?;
        let (clean, _) = self.vcs.status(true).await?;
        if !clean {
            return Err(OrchestratorError::vcs_error("branch setup left a dirty tree"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::TrustyAgent;
    use crate::models::{TrustyAgentResult, TrustyComponent};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    struct ScriptedLlm {
        responses: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn text_complete(
            &self,
            _messages: &[crate::capabilities::LlmMessage],
            _model_hint: Option<&str>,
            _reasoning_effort: Option<&str>,
        ) -> Result<String> {
            let mut responses = self.responses.lock().await;
            Ok(responses.remove(0).to_string())
        }

        async fn vision_complete(
            &self,
            _messages: &[crate::capabilities::LlmMessage],
            _image_path: &str,
            _model_hint: Option<&str>,
        ) -> Result<String> {
            Ok(String::new())
        }
    }

    struct NoopCodingAgent;

    #[async_trait]
    impl CodingAgent for NoopCodingAgent {
        async fn run(&self, _protoblock: &ProtoBlock, _previous_analysis: Option<&str>) -> Result<()> {
            Ok(())
        }
    }

    struct ScriptedVcs {
        current_branch: Mutex<String>,
        commits: Mutex<Vec<String>>,
        reverts: AtomicU32,
    }

    impl ScriptedVcs {
        fn new() -> Self {
            Self {
                current_branch: Mutex::new("main".to_string()),
                commits: Mutex::new(Vec::new()),
                reverts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl VersionControl for ScriptedVcs {
        async fn current_branch(&self) -> Result<String> {
            Ok(self.current_branch.lock().await.clone())
        }
        async fn checkout(&self, branch: &str, _create: bool) -> Result<()> {
            *self.current_branch.lock().await = branch.to_string();
            Ok(())
        }
        async fn status(&self, _ignore_untracked: bool) -> Result<(bool, String)> {
            Ok((true, self.current_branch.lock().await.clone()))
        }
        async fn complete_diff(&self) -> Result<String> {
            Ok("diff --git a/mathutils.py".to_string())
        }
        async fn commit(&self, message: &str) -> Result<()> {
            self.commits.lock().await.push(message.to_string());
            Ok(())
        }
        async fn revert_all_changes_and_clean_untracked(&self) -> Result<()> {
            self.reverts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ScriptedTrustyAgent {
        name: String,
        outcomes: Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl TrustyAgent for ScriptedTrustyAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn check(&self, _protoblock: &ProtoBlock, _codebase_snapshot: &str, _code_diff: &str) -> TrustyAgentResult {
            let succeeds = self.outcomes.lock().await.remove(0);
            if succeeds {
                TrustyAgentResult::success(&self.name, "ok")
            } else {
                TrustyAgentResult::failure(&self.name, "pytest failed").with_component(TrustyComponent::Error {
                    message: "pytest failed".to_string(),
                    error_type: "pytest failure".to_string(),
                    stacktrace: None,
                })
            }
        }
    }

    const GENESIS_RESPONSE: &str = r#"{"task":"add is_even","write_files":["mathutils.py"],"context_files":[],"commit_message":"add is_even","branch_name":"is-even","trusty_agents":["pytest"],"trusty_agent_prompts":{}}"#;

    #[tokio::test]
    async fn test_happy_path_single_attempt_commits_once() {
        let llm = ScriptedLlm { responses: Mutex::new(vec![GENESIS_RESPONSE]) };
        let coding_agent = NoopCodingAgent;
        let vcs = ScriptedVcs::new();
        let registry = TrustyAgentRegistry::with_builtins();
        let config = OrchestratorConfig { max_attempts: 2, ..Default::default() };
        let pytest = ScriptedTrustyAgent { name: "pytest".to_string(), outcomes: Mutex::new(vec![true]) };
        let tmp = tempfile::tempdir().unwrap();

        let processor = BlockProcessor {
            llm: &llm,
            coding_agent: &coding_agent,
            vcs: &vcs,
            registry: &registry,
            config: &config,
            persist_dir: tmp.path(),
            resume_signal: None,
        };

        let result = processor
            .run_loop("add is_even", "###FILE: mathutils.py", |name| {
                if name == "pytest" {
                    Some(ResolvedTrustyAgent::Plain(&pytest))
                } else {
                    None
                }
            })
            .await
            .unwrap();

        assert!(result);
        assert_eq!(vcs.commits.lock().await.len(), 1);
        assert_eq!(vcs.reverts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_then_success_on_retry() {
        let llm = ScriptedLlm { responses: Mutex::new(vec![GENESIS_RESPONSE, GENESIS_RESPONSE]) };
        let coding_agent = NoopCodingAgent;
        let vcs = ScriptedVcs::new();
        let registry = TrustyAgentRegistry::with_builtins();
        let config = OrchestratorConfig { max_attempts: 2, ..Default::default() };
        let pytest = ScriptedTrustyAgent { name: "pytest".to_string(), outcomes: Mutex::new(vec![false, true]) };
        let tmp = tempfile::tempdir().unwrap();

        let processor = BlockProcessor {
            llm: &llm,
            coding_agent: &coding_agent,
            vcs: &vcs,
            registry: &registry,
            config: &config,
            persist_dir: tmp.path(),
            resume_signal: None,
        };

        let result = processor
            .run_loop("implement factorial", "###FILE: mathutils.py", |name| {
                if name == "pytest" {
                    Some(ResolvedTrustyAgent::Plain(&pytest))
                } else {
                    None
                }
            })
            .await
            .unwrap();

        assert!(result);
        assert_eq!(vcs.commits.lock().await.len(), 1);
        assert_eq!(vcs.reverts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_budget_exhausted_returns_false_without_commit() {
        let llm = ScriptedLlm { responses: Mutex::new(vec![GENESIS_RESPONSE, GENESIS_RESPONSE]) };
        let coding_agent = NoopCodingAgent;
        let vcs = ScriptedVcs::new();
        let registry = TrustyAgentRegistry::with_builtins();
        let config = OrchestratorConfig { max_attempts: 2, ..Default::default() };
        let pytest = ScriptedTrustyAgent { name: "pytest".to_string(), outcomes: Mutex::new(vec![false, false]) };
        let tmp = tempfile::tempdir().unwrap();

        let processor = BlockProcessor {
            llm: &llm,
            coding_agent: &coding_agent,
            vcs: &vcs,
            registry: &registry,
            config: &config,
            persist_dir: tmp.path(),
            resume_signal: None,
        };

        let result = processor
            .run_loop("do something hard", "###FILE: mathutils.py", |name| {
                if name == "pytest" {
                    Some(ResolvedTrustyAgent::Plain(&pytest))
                } else {
                    None
                }
            })
            .await
            .unwrap();

        assert!(!result);
        assert!(vcs.commits.lock().await.is_empty());
        assert_eq!(vcs.reverts.load(Ordering::SeqCst), 1);
        assert_ne!(vcs.current_branch().await.unwrap(), "main");
    }

    #[tokio::test]
    async fn test_dirty_tree_aborts_before_any_llm_call() {
        struct AlwaysDirtyVcs;
        #[async_trait]
        impl VersionControl for AlwaysDirtyVcs {
            async fn current_branch(&self) -> Result<String> {
                Ok("main".to_string())
            }
            async fn checkout(&self, _branch: &str, _create: bool) -> Result<()> {
                Ok(())
            }
            async fn status(&self, _ignore_untracked: bool) -> Result<(bool, String)> {
                Ok((false, "main".to_string()))
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

        struct PanicsIfCalledLlm;
        #[async_trait]
        impl LlmClient for PanicsIfCalledLlm {
            async fn text_complete(
                &self,
                _messages: &[crate::capabilities::LlmMessage],
                _model_hint: Option<&str>,
                _reasoning_effort: Option<&str>,
            ) -> Result<String> {
                panic!("LLM must not be called when the tree is dirty");
            }
            async fn vision_complete(
                &self,
                _messages: &[crate::capabilities::LlmMessage],
                _image_path: &str,
                _model_hint: Option<&str>,
            ) -> Result<String> {
                panic!("LLM must not be called when the tree is dirty");
            }
        }

        let llm = PanicsIfCalledLlm;
        let coding_agent = NoopCodingAgent;
        let vcs = AlwaysDirtyVcs;
        let registry = TrustyAgentRegistry::with_builtins();
        let config = OrchestratorConfig::default();
        let tmp = tempfile::tempdir().unwrap();

        let processor = BlockProcessor {
            llm: &llm,
            coding_agent: &coding_agent,
            vcs: &vcs,
            registry: &registry,
            config: &config,
            persist_dir: tmp.path(),
            resume_signal: None,
        };

        let result = processor.run_loop("anything", "###FILE: x.py", |_| None).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().is_vcs());
    }
}
