//! Core domain models: the protoblock recipe and the verification results
//! attached to it by the executor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Construction-time failures for [`ProtoBlock`] -- distinct from the
/// broader [`crate::error::OrchestratorError`] taxonomy because these can
/// only happen while building the struct itself, never afterwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtoBlockError {
    #[error("path must be relative and non-empty: {0:?}")]
    InvalidPath(String),

    #[error("task_description cannot be empty")]
    EmptyTaskDescription,

    #[error("block_id must be 6-8 alphanumeric characters, got {0:?}")]
    InvalidBlockId(String),
}

/// The recipe for one code-modification attempt.
///
/// Invariants enforced by [`ProtoBlock::new`]: every path in `write_files`
/// and `context_files` is relative and non-empty; `write_files` and
/// `context_files` are disjoint (context files shadowed by a write file are
/// dropped from context); `trusty_agents` is deduplicated with `pytest`
/// first and `plausibility` last.
///
/// # Examples
///
/// ```rust
/// use tac_core::ProtoBlock;
///
/// let block = ProtoBlock::new(
///     "blk0001".to_string(),
///     "add is_even".to_string(),
///     vec!["mathutils.py".to_string()],
///     vec![],
///     "tac: add is_even".to_string(),
///     "tac/feature/is-even".to_string(),
///     vec!["pytest".to_string(), "plausibility".to_string()],
///     Default::default(),
///     None,
///     1,
/// ).unwrap();
/// assert_eq!(block.trusty_agents[0], "pytest");
/// assert_eq!(*block.trusty_agents.last().unwrap(), "plausibility");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtoBlock {
    pub block_id: String,
    pub task_description: String,
    pub write_files: Vec<String>,
    pub context_files: Vec<String>,
    pub commit_message: String,
    pub branch_name: String,
    pub trusty_agents: Vec<String>,
    #[serde(default)]
    pub trusty_agent_prompts: HashMap<String, String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub attempt_number: u32,
    #[serde(default)]
    pub trusty_agent_results: HashMap<String, TrustyAgentResult>,
}

impl ProtoBlock {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        block_id: String,
        task_description: String,
        write_files: Vec<String>,
        context_files: Vec<String>,
        commit_message: String,
        branch_name: String,
        trusty_agents: Vec<String>,
        trusty_agent_prompts: HashMap<String, String>,
        image_url: Option<String>,
        attempt_number: u32,
    ) -> std::result::Result<Self, ProtoBlockError> {
        if task_description.trim().is_empty() {
            return Err(ProtoBlockError::EmptyTaskDescription);
        }
        if !(6..=8).contains(&block_id.len()) || !block_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ProtoBlockError::InvalidBlockId(block_id));
        }
        for path in write_files.iter().chain(context_files.iter()) {
            Self::validate_relative_path(path)?;
        }

        let write_files = Self::dedup(write_files);
        let context_files: Vec<String> = Self::dedup(context_files)
            .into_iter()
            .filter(|p| !write_files.contains(p))
            .collect();
        let trusty_agents = Self::normalise_trusty_agents(trusty_agents);

        Ok(Self {
            block_id,
            task_description,
            write_files,
            context_files,
            commit_message,
            branch_name,
            trusty_agents,
            trusty_agent_prompts,
            image_url,
            attempt_number,
            trusty_agent_results: HashMap::new(),
        })
    }

    fn validate_relative_path(path: &str) -> std::result::Result<(), ProtoBlockError> {
        if path.is_empty() || path.starts_with('/') {
            return Err(ProtoBlockError::InvalidPath(path.to_string()));
        }
        Ok(())
    }

    fn dedup(paths: Vec<String>) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
    }

    /// Deduplicate, insert `pytest` at position 0 if missing, move
    /// `plausibility` (inserting it if missing) to the end.
    pub fn normalise_trusty_agents(agents: Vec<String>) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut deduped: Vec<String> = agents.into_iter().filter(|a| seen.insert(a.clone())).collect();

        deduped.retain(|a| a != "pytest" && a != "plausibility");
        let mut result = vec!["pytest".to_string()];
        result.extend(deduped);
        result.push("plausibility".to_string());
        result
    }

    /// Returns a new protoblock for the next retry attempt of this logical
    /// block, inheriting `block_id`, `branch_name` and `commit_message` so
    /// the VCS surface is stable across retries (spec §4.3).
    pub fn with_next_attempt(&self, next: ProtoBlock) -> ProtoBlock {
        ProtoBlock {
            block_id: self.block_id.clone(),
            branch_name: self.branch_name.clone(),
            commit_message: self.commit_message.clone(),
            attempt_number: self.attempt_number + 1,
            ..next
        }
    }

    pub fn record_result(&mut self, agent: impl Into<String>, result: TrustyAgentResult) {
        self.trusty_agent_results.insert(agent.into(), result);
    }
}

/// One typed sub-result attached to a [`TrustyAgentResult`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrustyComponent {
    Grade {
        value: String,
        scale: String,
        description: String,
    },
    Report {
        title: String,
        text: String,
    },
    Screenshot {
        path: String,
        description: String,
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
    },
    Comparison {
        before_path: String,
        after_path: String,
        #[serde(default)]
        reference_path: Option<String>,
        description: String,
    },
    Metric {
        name: String,
        value: f64,
        #[serde(default)]
        unit: Option<String>,
        #[serde(default)]
        threshold: Option<f64>,
        direction: MetricDirection,
    },
    Error {
        message: String,
        error_type: String,
        #[serde(default)]
        stacktrace: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    Higher,
    Lower,
}

/// The structured outcome of one trusty agent's `check` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrustyAgentResult {
    pub success: bool,
    pub agent_type: String,
    pub summary: String,
    #[serde(default)]
    pub components: Vec<TrustyComponent>,
    #[serde(default)]
    pub details: HashMap<String, String>,
}

impl TrustyAgentResult {
    pub fn success(agent_type: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            success: true,
            agent_type: agent_type.into(),
            summary: summary.into(),
            components: Vec::new(),
            details: HashMap::new(),
        }
    }

    pub fn failure(agent_type: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            success: false,
            agent_type: agent_type.into(),
            summary: summary.into(),
            components: Vec::new(),
            details: HashMap::new(),
        }
    }

    pub fn with_component(mut self, component: TrustyComponent) -> Self {
        self.components.push(component);
        self
    }

    /// The analysis text fed into the next attempt's generator request:
    /// the first `report` component's text, falling back to `summary`.
    pub fn analysis_text(&self) -> String {
        self.components
            .iter()
            .find_map(|c| match c {
                TrustyComponent::Report { text, .. } => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_else(|| self.summary.clone())
    }

    /// The failure_type string for the executor's tuple contract: the
    /// error component's `error_type` if present, else the agent name.
    pub fn failure_type(&self) -> String {
        self.components
            .iter()
            .find_map(|c| match c {
                TrustyComponent::Error { error_type, .. } => Some(error_type.clone()),
                _ => None,
            })
            .unwrap_or_else(|| format!("{} failure", self.agent_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(trusty_agents: Vec<&str>) -> ProtoBlock {
        ProtoBlock::new(
            "blk0001".to_string(),
            "do a thing".to_string(),
            vec!["a.py".to_string()],
            vec!["a.py".to_string(), "b.py".to_string()],
            "tac: do a thing".to_string(),
            "tac/feature/thing".to_string(),
            trusty_agents.into_iter().map(String::from).collect(),
            HashMap::new(),
            None,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_pytest_first_plausibility_last() {
        let block = make(vec!["plausibility", "code_reviewer", "pytest"]);
        assert_eq!(block.trusty_agents, vec!["pytest", "code_reviewer", "plausibility"]);
    }

    #[test]
    fn test_pytest_and_plausibility_inserted_when_missing() {
        let block = make(vec!["code_reviewer"]);
        assert_eq!(block.trusty_agents, vec!["pytest", "code_reviewer", "plausibility"]);
    }

    #[test]
    fn test_write_files_and_context_files_disjoint() {
        let block = make(vec!["pytest"]);
        assert_eq!(block.context_files, vec!["b.py".to_string()]);
        assert!(block.write_files.iter().all(|p| !block.context_files.contains(p)));
    }

    #[test]
    fn test_rejects_absolute_path() {
        let result = ProtoBlock::new(
            "blk0001".to_string(),
            "task".to_string(),
            vec!["/etc/passwd".to_string()],
            vec![],
            "tac: task".to_string(),
            "tac/feature/x".to_string(),
            vec![],
            HashMap::new(),
            None,
            1,
        );
        assert!(matches!(result, Err(ProtoBlockError::InvalidPath(_))));
    }

    #[test]
    fn test_rejects_empty_task_description() {
        let result = ProtoBlock::new(
            "blk0001".to_string(),
            "   ".to_string(),
            vec![],
            vec![],
            "tac: task".to_string(),
            "tac/feature/x".to_string(),
            vec![],
            HashMap::new(),
            None,
            1,
        );
        assert_eq!(result, Err(ProtoBlockError::EmptyTaskDescription));
    }

    #[test]
    fn test_with_next_attempt_preserves_identity() {
        let first = make(vec!["pytest"]);
        let regenerated = make(vec!["pytest"]);
        let retried = first.with_next_attempt(regenerated);
        assert_eq!(retried.block_id, first.block_id);
        assert_eq!(retried.branch_name, first.branch_name);
        assert_eq!(retried.commit_message, first.commit_message);
        assert_eq!(retried.attempt_number, 2);
    }

    #[test]
    fn test_trusty_agent_result_analysis_text_falls_back_to_summary() {
        let result = TrustyAgentResult::failure("pytest", "2 tests failed");
        assert_eq!(result.analysis_text(), "2 tests failed");

        let result = result.with_component(TrustyComponent::Report {
            title: "pytest output".to_string(),
            text: "AssertionError in test_foo".to_string(),
        });
        assert_eq!(result.analysis_text(), "AssertionError in test_foo");
    }
}
