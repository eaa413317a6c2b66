use thiserror::Error;

/// Result type alias for block-lifecycle operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Error taxonomy for the block lifecycle engine.
///
/// These are categories, not 1:1 wrappers of every underlying failure: each
/// variant corresponds to one of the six error classes the orchestrator must
/// react to differently (retry locally, revert and retry, abort the block,
/// abort the whole run, or refuse to start).
///
/// # Examples
///
/// ```rust
/// use tac_core::error::OrchestratorError;
///
/// let err = OrchestratorError::generation_failed("unexpected EOF while parsing");
/// assert!(err.is_generation());
/// assert_eq!(err.severity(), "fatal-to-block");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The LLM produced malformed or incomplete protoblock JSON after
    /// exhausting the cleaning-retry budget.
    #[error("protoblock generation failed: {0}")]
    BlockGenerationFailed(String),

    /// The coding agent exited nonzero, timed out, or raised an
    /// unrecoverable error while applying edits.
    #[error("coding agent failed: {0}")]
    CodingAgentFailed(String),

    /// A trusty agent reported `success = false`. Non-fatal: carries the
    /// failing agent's name and failure type for retry feedback.
    #[error("trusty agent '{agent}' failed: {failure_type}")]
    VerifierFailed { agent: String, failure_type: String },

    /// Dirty working tree, failed branch switch, or failed revert. Fatal —
    /// the processor must never proceed on a dirty tree.
    #[error("version control error: {0}")]
    VcsError(String),

    /// LLM timeout, network failure, browser launch failure, or any other
    /// infrastructure hiccup. Counted as an attempt failure; retried unless
    /// the attempt budget is exhausted.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// Incompatible flags or missing required configuration, detected
    /// before any work begins.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A persisted protoblock file was unreadable or did not match either
    /// supported on-disk format.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl OrchestratorError {
    /// Build a `BlockGenerationFailed` carrying the last parse error and a
    /// truncated preview of the offending LLM response.
    pub fn generation_failed(detail: impl Into<String>) -> Self {
        Self::BlockGenerationFailed(detail.into())
    }

    /// Build a `BlockGenerationFailed` that also embeds a response preview,
    /// truncated to 200 chars per spec §4.1's error policy.
    pub fn generation_failed_with_preview(detail: impl Into<String>, raw_response: &str) -> Self {
        let preview: String = raw_response.chars().take(200).collect();
        Self::BlockGenerationFailed(format!("{} (preview: {preview:?})", detail.into()))
    }

    pub fn coding_agent_failed(detail: impl Into<String>) -> Self {
        Self::CodingAgentFailed(detail.into())
    }

    pub fn verifier_failed(agent: impl Into<String>, failure_type: impl Into<String>) -> Self {
        Self::VerifierFailed { agent: agent.into(), failure_type: failure_type.into() }
    }

    pub fn vcs_error(detail: impl Into<String>) -> Self {
        Self::VcsError(detail.into())
    }

    pub fn infrastructure(detail: impl Into<String>) -> Self {
        Self::Infrastructure(detail.into())
    }

    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::Configuration(detail.into())
    }

    pub fn persistence(detail: impl Into<String>) -> Self {
        Self::Persistence(detail.into())
    }

    pub fn is_generation(&self) -> bool {
        matches!(self, Self::BlockGenerationFailed(_))
    }

    pub fn is_vcs(&self) -> bool {
        matches!(self, Self::VcsError(_))
    }

    pub fn is_verifier(&self) -> bool {
        matches!(self, Self::VerifierFailed { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Coarse severity classifier the CLI uses to decide whether to keep
    /// retrying, abort the current block, or abort the whole run.
    pub fn severity(&self) -> &'static str {
        match self {
            Self::BlockGenerationFailed(_) => "fatal-to-block",
            Self::CodingAgentFailed(_) => "retryable",
            Self::VerifierFailed { .. } => "retryable",
            Self::VcsError(_) => "fatal-to-run",
            Self::Infrastructure(_) => "retryable",
            Self::Configuration(_) => "fatal-at-startup",
            Self::Persistence(_) => "fatal-to-block",
        }
    }

    /// Process exit code band per spec §6.7 (0 success, 1 any failure) --
    /// every orchestrator error maps to the single failure code, kept as a
    /// method for symmetry with the taxonomy and to leave room for future
    /// exit-code differentiation.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = OrchestratorError::generation_failed("bad json");
        assert_eq!(error, OrchestratorError::BlockGenerationFailed("bad json".to_string()));
        assert!(error.is_generation());
        assert_eq!(error.severity(), "fatal-to-block");
    }

    #[test]
    fn test_generation_failed_preview_truncates() {
        let long = "x".repeat(500);
        let error = OrchestratorError::generation_failed_with_preview("parse error", &long);
        let OrchestratorError::BlockGenerationFailed(msg) = &error else { panic!("wrong variant") };
        assert!(msg.len() < 500);
    }

    #[test]
    fn test_error_predicates() {
        assert!(OrchestratorError::vcs_error("dirty tree").is_vcs());
        assert!(!OrchestratorError::vcs_error("dirty tree").is_generation());

        let verifier = OrchestratorError::verifier_failed("pytest", "test failure");
        assert!(verifier.is_verifier());
        assert_eq!(verifier.to_string(), "trusty agent 'pytest' failed: test failure");
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(OrchestratorError::configuration("bad flag combo").severity(), "fatal-at-startup");
        assert_eq!(OrchestratorError::infrastructure("timeout").severity(), "retryable");
    }
}
