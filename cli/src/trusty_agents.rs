//! Trusty-agent implementations the CLI wires to a local, non-network
//! capability. Only `pytest` is implemented for real here; the LLM-backed
//! agents (`code_reviewer`, `plausibility`, `web_*`) are left unresolved by
//! the default CLI wiring -- the executor logs and skips any trusty agent
//! `resolve_agent` returns `None` for, and a real deployment supplies them
//! alongside a real [`tac_core::capabilities::LlmClient`].

use async_trait::async_trait;
use tac_core::capabilities::{TestRunner, TrustyAgent};
use tac_core::models::{ProtoBlock, TrustyAgentResult, TrustyComponent};

pub struct PytestTrustyAgent<'a> {
    runner: &'a dyn TestRunner,
}

impl<'a> PytestTrustyAgent<'a> {
    pub fn new(runner: &'a dyn TestRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<'a> TrustyAgent for PytestTrustyAgent<'a> {
    fn name(&self) -> &str {
        "pytest"
    }

    async fn check(&self, protoblock: &ProtoBlock, _codebase_snapshot: &str, _code_diff: &str) -> TrustyAgentResult {
        let path = protoblock.write_files.first().map(String::as_str).unwrap_or(".");
        match self.runner.run_tests(path).await {
            Ok(outcome) if outcome.all_passed => {
                TrustyAgentResult::success("pytest", "all collected tests passed").with_component(TrustyComponent::Report {
                    title: format!("{} tests collected", outcome.collected_test_names.len()),
                    text: outcome.raw_output,
                })
            }
            Ok(outcome) => TrustyAgentResult::failure("pytest", "one or more tests failed").with_component(TrustyComponent::Report {
                title: format!("{} tests collected", outcome.collected_test_names.len()),
                text: outcome.raw_output,
            }),
            Err(e) => TrustyAgentResult::failure("pytest", e.to_string()).with_component(TrustyComponent::Error {
                message: e.to_string(),
                error_type: "test runner infrastructure failure".to_string(),
                stacktrace: None,
            }),
        }
    }
}
