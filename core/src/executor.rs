//! One attempt: invoke the coding agent, collect the diff, run the trusty
//! pipeline (spec §4.2).

use crate::capabilities::{CodingAgent, ComparativeTrustyAgent, TrustyAgent, VersionControl};
use crate::models::ProtoBlock;
use crate::registry::TrustyAgentRegistry;

/// The result of one `BlockExecutor::execute_block` call -- the Rust
/// expression of the source's `(success, error_analysis, failure_type)`
/// tuple contract (spec §4.2, confirmed by
/// `tests/test_block_executor.py`'s asserted return shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub error_analysis: String,
    pub failure_type: String,
}

impl ExecutionOutcome {
    pub fn success() -> Self {
        Self { success: true, error_analysis: String::new(), failure_type: String::new() }
    }

    pub fn failure(error_analysis: impl Into<String>, failure_type: impl Into<String>) -> Self {
        Self { success: false, error_analysis: error_analysis.into(), failure_type: failure_type.into() }
    }
}

/// One agent resolved from the registry, with its comparative capability
/// (if any) attached so the executor can invoke `capture_before_state`
/// without downcasting.
pub enum ResolvedTrustyAgent<'a> {
    Plain(&'a dyn TrustyAgent),
    Comparative(&'a dyn ComparativeTrustyAgent),
}

impl<'a> ResolvedTrustyAgent<'a> {
    fn as_trusty_agent(&self) -> &dyn TrustyAgent {
        match self {
            Self::Plain(agent) => *agent,
            // `ComparativeTrustyAgent: TrustyAgent` lets the compiler
            // upcast the trait object directly.
            Self::Comparative(agent) => *agent,
        }
    }
}

pub struct BlockExecutor;

impl BlockExecutor {
    /// Run one attempt. `codebase_snapshot` is the indexer's file-content
    /// summary, distinct from the diff `complete_diff` returns -- some
    /// trusty agents need to read beyond what changed this attempt.
    /// `resolve_agent` maps a trusty-agent name (from
    /// `protoblock.trusty_agents`, already ordered pytest-first/
    /// plausibility-last) to its resolved implementation; callers build
    /// this from the registry plus their own agent instances.
    pub async fn execute_block<'a>(
        protoblock: &mut ProtoBlock,
        previous_analysis: Option<&str>,
        codebase_snapshot: &str,
        coding_agent: &dyn CodingAgent,
        vcs: &dyn VersionControl,
        registry: &TrustyAgentRegistry,
        resolve_agent: impl Fn(&str) -> Option<ResolvedTrustyAgent<'a>>,
    ) -> ExecutionOutcome {
        // Comparative agents capture their "before" state ahead of the
        // coding agent's edits.
        for name in &protoblock.trusty_agents {
            if registry.is_comparative(name) {
                if let Some(ResolvedTrustyAgent::Comparative(agent)) = resolve_agent(name) {
                    if let Err(e) = agent.capture_before_state(protoblock).await {
                        tracing::error!(agent = %name, error = %e, "failed to capture before-state");
                        return ExecutionOutcome::failure(e.to_string(), format!("{name} setup failure"));
                    }
                }
            }
        }

        if let Err(e) = coding_agent.run(protoblock, previous_analysis).await {
            tracing::warn!(error = %e, "coding agent failed");
            return ExecutionOutcome::failure(e.to_string(), "coding_agent failure".to_string());
        }

        let diff = match vcs.complete_diff().await {
            Ok(diff) => diff,
            Err(e) => return ExecutionOutcome::failure(e.to_string(), "vcs failure".to_string()),
        };

        // Defensive re-sort: pytest first, plausibility last, regardless of
        // what order the caller's list happens to be in.
        let ordered = ProtoBlock::normalise_trusty_agents(protoblock.trusty_agents.clone());

        for name in &ordered {
            let Some(resolved) = resolve_agent(name) else {
                tracing::warn!(agent = %name, "no implementation registered for trusty agent, skipping");
                continue;
            };
            let agent = resolved.as_trusty_agent();

            let result = agent.check(protoblock, codebase_snapshot, &diff).await;
            let failed = !result.success;
            let analysis = result.analysis_text();
            let failure_type = result.failure_type();
            protoblock.record_result(name.clone(), result);

            if failed {
                // First failing agent aborts the pipeline; agents after it
                // in `ordered` are never invoked this attempt.
                return ExecutionOutcome::failure(analysis, failure_type);
            }
        }

        ExecutionOutcome::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::TrustyAgentResult;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct DummyCodingAgent {
        fails: bool,
    }

    #[async_trait]
    impl CodingAgent for DummyCodingAgent {
        async fn run(&self, _protoblock: &ProtoBlock, _previous_analysis: Option<&str>) -> Result<()> {
            if self.fails {
                Err(crate::error::OrchestratorError::coding_agent_failed("boom"))
            } else {
                Ok(())
            }
        }
    }

    struct DummyVcs;

    #[async_trait]
    impl VersionControl for DummyVcs {
        async fn current_branch(&self) -> Result<String> {
            Ok("tac/feature/x".to_string())
        }
        async fn checkout(&self, _branch: &str, _create: bool) -> Result<()> {
            Ok(())
        }
        async fn status(&self, _ignore_untracked: bool) -> Result<(bool, String)> {
            Ok((true, "tac/feature/x".to_string()))
        }
        async fn complete_diff(&self) -> Result<String> {
            Ok("diff --git a/mathutils.py".to_string())
        }
        async fn commit(&self, _message: &str) -> Result<()> {
            Ok(())
        }
        async fn revert_all_changes_and_clean_untracked(&self) -> Result<()> {
            Ok(())
        }
    }

    struct DummyTrustyAgent {
        name: String,
        succeeds: bool,
    }

    #[async_trait]
    impl TrustyAgent for DummyTrustyAgent {
        fn name(&self) -> &str {
            &self.name
        }

        async fn check(&self, _protoblock: &ProtoBlock, _codebase_snapshot: &str, _code_diff: &str) -> TrustyAgentResult {
            if self.succeeds {
                TrustyAgentResult::success(&self.name, "ok")
            } else {
                TrustyAgentResult::failure(&self.name, "dummy failure analysis").with_component(
                    crate::models::TrustyComponent::Error {
                        message: "dummy failure analysis".to_string(),
                        error_type: "dummy failure type".to_string(),
                        stacktrace: None,
                    },
                )
            }
        }
    }

    fn make_block(agents: Vec<&str>) -> ProtoBlock {
        ProtoBlock::new(
            "blk0001".to_string(),
            "add is_even".to_string(),
            vec!["mathutils.py".to_string()],
            vec![],
            "tac: add is_even".to_string(),
            "tac/feature/is-even".to_string(),
            agents.into_iter().map(String::from).collect(),
            HashMap::new(),
            None,
            1,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_all_agents_pass_returns_success_tuple() {
        let mut block = make_block(vec!["pytest"]);
        let coding_agent = DummyCodingAgent { fails: false };
        let vcs = DummyVcs;
        let registry = TrustyAgentRegistry::with_builtins();
        let pytest = DummyTrustyAgent { name: "pytest".to_string(), succeeds: true };

        let outcome = BlockExecutor::execute_block(&mut block, None, "###FILE: mathutils.py", &coding_agent, &vcs, &registry, |name| {
            if name == "pytest" {
                Some(ResolvedTrustyAgent::Plain(&pytest))
            } else {
                None
            }
        })
        .await;

        assert_eq!(outcome, ExecutionOutcome::success());
    }

    #[tokio::test]
    async fn test_first_agent_failure_returns_its_failure_type() {
        let mut block = make_block(vec!["pytest", "plausibility"]);
        let coding_agent = DummyCodingAgent { fails: false };
        let vcs = DummyVcs;
        let registry = TrustyAgentRegistry::with_builtins();
        let pytest = DummyTrustyAgent { name: "pytest".to_string(), succeeds: false };
        let plausibility = DummyTrustyAgent { name: "plausibility".to_string(), succeeds: true };

        let outcome = BlockExecutor::execute_block(&mut block, None, "###FILE: mathutils.py", &coding_agent, &vcs, &registry, |name| {
            match name {
                "pytest" => Some(ResolvedTrustyAgent::Plain(&pytest)),
                "plausibility" => Some(ResolvedTrustyAgent::Plain(&plausibility)),
                _ => None,
            }
        })
        .await;

        assert!(!outcome.success);
        assert_eq!(outcome.failure_type, "dummy failure type");
        assert!(!block.trusty_agent_results.contains_key("plausibility"));
    }

    #[tokio::test]
    async fn test_coding_agent_failure_is_treated_as_attempt_failure() {
        let mut block = make_block(vec!["pytest"]);
        let coding_agent = DummyCodingAgent { fails: true };
        let vcs = DummyVcs;
        let registry = TrustyAgentRegistry::with_builtins();

        let outcome = BlockExecutor::execute_block(&mut block, None, "###FILE: mathutils.py", &coding_agent, &vcs, &registry, |_| None).await;

        assert!(!outcome.success);
        assert_eq!(outcome.failure_type, "coding_agent failure");
    }
}
