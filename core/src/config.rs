//! Immutable runtime configuration.
//!
//! Replaces the source's global mutable config object (REDESIGN FLAG,
//! spec §9): one `OrchestratorConfig` is built at startup and passed
//! explicitly into the processor and orchestrator. `TAC_CONFIG` names the
//! source file; CLI flags are merged on top by the caller before this
//! struct is constructed.

use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, Result};

/// Default path for the configuration source file when `TAC_CONFIG` is
/// unset.
pub const DEFAULT_CONFIG_PATH: &str = "tac.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Attempt budget per logical block (spec §4.3's `N`).
    pub max_attempts: u32,

    /// Cleaning-retry budget for malformed generator output (spec §4.1).
    pub max_retries_protoblock_creation: u32,

    /// Pause the processor between attempts awaiting an external resume
    /// signal instead of retrying immediately.
    pub halt_after_fail: bool,

    /// Gate multi-block execution behind confirmation before running.
    pub confirm_multiblock_execution: bool,

    /// Minimum passing letter grade for grade-based trusty agents
    /// (`code_reviewer`, `web_simple`, `web_compare`); `web_reference` is
    /// the sole "A only" exception, enforced in the registry/executor, not
    /// here.
    pub min_grade: String,

    /// Minimum passing star rating for `plausibility` (0.0-5.0).
    pub min_stars: f64,

    /// Per-LLM-call timeout in seconds (spec §5, default 10 minutes).
    pub llm_timeout_secs: u64,

    /// Per-test-runner-invocation timeout in seconds.
    pub test_runner_timeout_secs: u64,

    /// Disable all VCS operations. Incompatible with `plausibility` being
    /// enabled (spec §6.7) -- enforced by the CLI at startup, a
    /// `Configuration` error otherwise.
    pub no_git: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_retries_protoblock_creation: 3,
            halt_after_fail: false,
            confirm_multiblock_execution: true,
            min_grade: "D".to_string(),
            min_stars: 3.0,
            llm_timeout_secs: 600,
            test_runner_timeout_secs: 300,
            no_git: false,
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from the file named by `TAC_CONFIG` (default
    /// [`DEFAULT_CONFIG_PATH`]), falling back to defaults for any field the
    /// file omits, and falling back to pure defaults if the file itself is
    /// absent.
    pub fn load() -> Result<Self> {
        let path = std::env::var("TAC_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).map_err(|e| {
                OrchestratorError::configuration(format!("failed to seed default config: {e}"))
            })?)
            .add_source(config::File::with_name(path).required(false));

        let built = builder
            .build()
            .map_err(|e| OrchestratorError::configuration(format!("failed to load config from {path}: {e}")))?;

        built
            .try_deserialize()
            .map_err(|e| OrchestratorError::configuration(format!("invalid config at {path}: {e}")))
    }

    /// Validate flag combinations that are fatal at startup (spec §7
    /// category 6). `--no-git` is incompatible with `plausibility` since
    /// that agent's grading is meaningless without a diff to review.
    pub fn validate(&self, trusty_agents: &[String]) -> Result<()> {
        if self.no_git && trusty_agents.iter().any(|a| a == "plausibility") {
            return Err(OrchestratorError::configuration(
                "--no-git is incompatible with the plausibility trusty agent",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.min_grade, "D");
        assert!(!config.no_git);
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = OrchestratorConfig::load_from("/nonexistent/tac.toml").unwrap();
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn test_validate_rejects_no_git_with_plausibility() {
        let mut config = OrchestratorConfig::default();
        config.no_git = true;
        let agents = vec!["pytest".to_string(), "plausibility".to_string()];
        assert!(config.validate(&agents).is_err());
    }

    #[test]
    fn test_validate_allows_no_git_without_plausibility() {
        let mut config = OrchestratorConfig::default();
        config.no_git = true;
        let agents = vec!["pytest".to_string()];
        assert!(config.validate(&agents).is_ok());
    }
}
