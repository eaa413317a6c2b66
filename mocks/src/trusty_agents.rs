//! Canned [`TrustyAgent`] stand-ins for the seven built-in agents in spec
//! §4.5's taxonomy table, each scriptable to succeed or fail for a fixed
//! number of calls in sequence.

use async_trait::async_trait;
use parking_lot::Mutex;
use tac_core::capabilities::{ComparativeTrustyAgent, TrustyAgent};
use tac_core::error::Result;
use tac_core::models::{ProtoBlock, TrustyAgentResult, TrustyComponent};

/// A trusty agent whose `check` outcome is scripted call-by-call; once the
/// script is exhausted it repeats the last entry.
pub struct ScriptedTrustyAgent {
    name: String,
    script: Mutex<Vec<bool>>,
    before_state_calls: Mutex<u32>,
}

impl ScriptedTrustyAgent {
    pub fn new(name: impl Into<String>, script: Vec<bool>) -> Self {
        Self { name: name.into(), script: Mutex::new(script), before_state_calls: Mutex::new(0) }
    }

    pub fn always_passing(name: impl Into<String>) -> Self {
        Self::new(name, vec![true])
    }

    pub fn always_failing(name: impl Into<String>) -> Self {
        Self::new(name, vec![false])
    }

    pub fn before_state_calls(&self) -> u32 {
        *self.before_state_calls.lock()
    }

    fn next_outcome(&self) -> bool {
        let mut script = self.script.lock();
        if script.len() > 1 {
            script.remove(0)
        } else {
            *script.first().unwrap_or(&true)
        }
    }
}

#[async_trait]
impl TrustyAgent for ScriptedTrustyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, _protoblock: &ProtoBlock, _codebase_snapshot: &str, _code_diff: &str) -> TrustyAgentResult {
        if self.next_outcome() {
            TrustyAgentResult::success(&self.name, format!("{} passed", self.name))
                .with_component(TrustyComponent::Grade {
                    value: "A".to_string(),
                    scale: "A-F".to_string(),
                    description: "scripted pass".to_string(),
                })
        } else {
            TrustyAgentResult::failure(&self.name, format!("{} failed", self.name))
                .with_component(TrustyComponent::Error {
                    message: format!("{} reported a failure", self.name),
                    error_type: format!("{} failure", self.name),
                    stacktrace: None,
                })
        }
    }
}

/// Adds the stateful before/after capability used by `web_compare` and
/// `web_reference`.
#[async_trait]
impl ComparativeTrustyAgent for ScriptedTrustyAgent {
    async fn capture_before_state(&self, _protoblock: &ProtoBlock) -> Result<()> {
        *self.before_state_calls.lock() += 1;
        Ok(())
    }
}

/// Build one scripted agent per name in spec §4.5's taxonomy table, all
/// defaulting to pass -- convenient as a starting point for tests that
/// only care about overriding one or two agents' outcomes.
pub fn builtin_passing_agents() -> Vec<ScriptedTrustyAgent> {
    ["pytest", "code_reviewer", "plausibility", "web_simple", "web_compare", "web_reference", "pexpect_agent"]
        .into_iter()
        .map(ScriptedTrustyAgent::always_passing)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> ProtoBlock {
        ProtoBlock::new(
            "blk0001".to_string(),
            "task".to_string(),
            vec!["a.py".to_string()],
            vec![],
            "tac: task".to_string(),
            "tac/feature/x".to_string(),
            vec!["pytest".to_string()],
            Default::default(),
            None,
            1,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_scripted_agent_replays_outcomes_in_order() {
        let agent = ScriptedTrustyAgent::new("pytest", vec![false, true]);
        let block = sample_block();

        let first = agent.check(&block, "", "").await;
        assert!(!first.success);

        let second = agent.check(&block, "", "").await;
        assert!(second.success);
    }

    #[tokio::test]
    async fn test_comparative_agent_tracks_before_state_calls() {
        let agent = ScriptedTrustyAgent::always_passing("web_compare");
        let block = sample_block();
        agent.capture_before_state(&block).await.unwrap();
        agent.capture_before_state(&block).await.unwrap();
        assert_eq!(agent.before_state_calls(), 2);
    }
}
