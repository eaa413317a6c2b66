//! Builder pattern implementations for easy test data construction
//!
//! Provides a fluent builder for:
//! - ProtoBlock construction with sensible defaults

use std::collections::HashMap;

use tac_core::ProtoBlock;

/// Builder for constructing [`ProtoBlock`] instances in tests.
pub struct ProtoBlockBuilder {
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
}

impl Default for ProtoBlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtoBlockBuilder {
    /// Create new builder with default values
    pub fn new() -> Self {
        Self {
            block_id: "blk0001".to_string(),
            task_description: "a test task".to_string(),
            write_files: vec!["mathutils.py".to_string()],
            context_files: Vec::new(),
            commit_message: "tac: a test task".to_string(),
            branch_name: "tac/feature/test".to_string(),
            trusty_agents: vec!["pytest".to_string()],
            trusty_agent_prompts: HashMap::new(),
            image_url: None,
            attempt_number: 1,
        }
    }

    pub fn with_block_id(mut self, block_id: impl Into<String>) -> Self {
        self.block_id = block_id.into();
        self
    }

    pub fn with_task_description(mut self, task_description: impl Into<String>) -> Self {
        self.task_description = task_description.into();
        self
    }

    pub fn with_write_files(mut self, write_files: Vec<String>) -> Self {
        self.write_files = write_files;
        self
    }

    pub fn with_context_files(mut self, context_files: Vec<String>) -> Self {
        self.context_files = context_files;
        self
    }

    pub fn with_commit_message(mut self, commit_message: impl Into<String>) -> Self {
        self.commit_message = commit_message.into();
        self
    }

    pub fn with_branch_name(mut self, branch_name: impl Into<String>) -> Self {
        self.branch_name = branch_name.into();
        self
    }

    pub fn with_trusty_agents(mut self, trusty_agents: Vec<String>) -> Self {
        self.trusty_agents = trusty_agents;
        self
    }

    pub fn with_trusty_agent_prompt(mut self, agent: impl Into<String>, prompt: impl Into<String>) -> Self {
        self.trusty_agent_prompts.insert(agent.into(), prompt.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_attempt_number(mut self, attempt_number: u32) -> Self {
        self.attempt_number = attempt_number;
        self
    }

    /// Build the final ProtoBlock. Panics if the accumulated fields would
    /// violate a `ProtoBlock` invariant -- acceptable in test code, where a
    /// broken builder call is a test bug, not a runtime condition to
    /// recover from.
    pub fn build(self) -> ProtoBlock {
        ProtoBlock::new(
            self.block_id,
            self.task_description,
            self.write_files,
            self.context_files,
            self.commit_message,
            self.branch_name,
            self.trusty_agents,
            self.trusty_agent_prompts,
            self.image_url,
            self.attempt_number,
        )
        .expect("ProtoBlockBuilder produced an invalid ProtoBlock")
    }
}
