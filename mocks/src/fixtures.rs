//! Standard test fixtures for consistent testing
//!
//! Provides pre-built test data including:
//! - A standard single-block protoblock scenario
//! - A standard multi-chunk scenario

use tac_core::ProtoBlock;

use crate::builders::ProtoBlockBuilder;

/// A basic protoblock matching spec §8 scenario 1 (add `is_even` to
/// `mathutils.py`).
pub fn create_test_protoblock() -> ProtoBlock {
    ProtoBlockBuilder::new()
        .with_block_id("blk0001")
        .with_task_description("add function is_even(n) returning n % 2 == 0 in mathutils.py")
        .with_write_files(vec!["mathutils.py".to_string()])
        .with_commit_message("tac: add is_even")
        .with_branch_name("tac/feature/is-even")
        .with_trusty_agents(vec!["pytest".to_string()])
        .build()
}

/// A protoblock on a given retry attempt, reusing `block_id` as the
/// processor does across attempts.
pub fn create_test_protoblock_at_attempt(attempt_number: u32) -> ProtoBlock {
    let mut block = create_test_protoblock();
    block.attempt_number = attempt_number;
    block
}

/// A protoblock already on a `tac/*` branch other than the default, used
/// to exercise branch-reuse scenarios (spec §8 scenario 4).
pub fn create_test_protoblock_on_branch(branch_name: &str) -> ProtoBlock {
    ProtoBlockBuilder::new().with_branch_name(branch_name).build()
}

/// The three-recipe chunk plan used by spec §8 scenario 5 (middle chunk
/// fails).
pub fn create_three_chunk_recipes() -> Vec<tac_core::ProtoBlockRecipe> {
    vec![
        tac_core::ProtoBlockRecipe { title: "Add data model".to_string(), description: "add the model layer".to_string() },
        tac_core::ProtoBlockRecipe { title: "Add API route".to_string(), description: "add the route layer".to_string() },
        tac_core::ProtoBlockRecipe { title: "Add UI widget".to_string(), description: "add the UI layer".to_string() },
    ]
}
