//! Custom assertion helpers for testing
//!
//! Provides specialized assertions for:
//! - ProtoBlock invariants (spec §8 universal invariants)
//! - Executor/processor outcome shapes

use tac_core::executor::ExecutionOutcome;
use tac_core::ProtoBlock;

/// Assert a protoblock satisfies every universal invariant from spec §8:
/// pytest first, plausibility last, write/context files disjoint, every
/// path relative.
pub fn assert_protoblock_invariants(block: &ProtoBlock) {
    assert_eq!(block.trusty_agents.first().map(String::as_str), Some("pytest"), "pytest must be first");
    assert_eq!(block.trusty_agents.last().map(String::as_str), Some("plausibility"), "plausibility must be last");

    for path in block.write_files.iter().chain(block.context_files.iter()) {
        assert!(!path.is_empty() && !path.starts_with('/'), "path must be relative and non-empty: {path:?}");
    }

    for path in &block.context_files {
        assert!(!block.write_files.contains(path), "write_files and context_files must be disjoint: {path:?}");
    }
}

/// Assert that a retried protoblock preserved the identity fields that
/// must stay stable across attempts (spec §3, §4.3).
pub fn assert_retry_preserves_identity(original: &ProtoBlock, retried: &ProtoBlock) {
    assert_eq!(retried.block_id, original.block_id, "block_id must be preserved across retries");
    assert_eq!(retried.branch_name, original.branch_name, "branch_name must be preserved across retries");
    assert_eq!(retried.commit_message, original.commit_message, "commit_message must be preserved across retries");
}

/// Assert an executor outcome matches the all-success tuple contract:
/// `(true, "", "")`.
pub fn assert_outcome_is_clean_success(outcome: &ExecutionOutcome) {
    assert!(outcome.success, "expected a successful outcome, got {outcome:?}");
    assert!(outcome.error_analysis.is_empty(), "successful outcome must carry no error analysis");
    assert!(outcome.failure_type.is_empty(), "successful outcome must carry no failure type");
}

/// Assert an executor outcome failed with the given failure type.
pub fn assert_outcome_failed_with(outcome: &ExecutionOutcome, expected_failure_type: &str) {
    assert!(!outcome.success, "expected a failing outcome, got {outcome:?}");
    assert_eq!(outcome.failure_type, expected_failure_type);
}
