//! Process-wide trusty-agent registration table.

use std::collections::HashMap;

/// Where an agent's `protoblock_prompt` is injected: `""` means it's only
/// used by the verifier itself; `"coding_agent"` means it's folded into the
/// generator's genesis prompt as guidance for the coding agent too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTarget {
    VerifierOnly,
    CodingAgent,
}

/// Static metadata about one registered trusty agent.
#[derive(Debug, Clone)]
pub struct TrustyAgentDescriptor {
    pub name: String,
    pub description: String,
    pub protoblock_prompt: String,
    pub prompt_target: PromptTarget,
    /// Whether this agent also satisfies [`crate::capabilities::ComparativeTrustyAgent`]
    /// and therefore needs `capture_before_state` invoked ahead of the
    /// coding agent.
    pub is_comparative: bool,
}

impl TrustyAgentDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            protoblock_prompt: String::new(),
            prompt_target: PromptTarget::VerifierOnly,
            is_comparative: false,
        }
    }

    pub fn with_protoblock_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.protoblock_prompt = prompt.into();
        self
    }

    pub fn with_prompt_target(mut self, target: PromptTarget) -> Self {
        self.prompt_target = target;
        self
    }

    pub fn comparative(mut self) -> Self {
        self.is_comparative = true;
        self
    }
}

/// Write-once, read-many registration table for trusty agents.
///
/// Populated by eager registration at startup (see [`TrustyAgentRegistry::with_builtins`]);
/// read-only thereafter. This replaces the source's dynamic class-decorator
/// registration with an explicit, constructible table: no process-global
/// state, no reflection.
#[derive(Debug, Clone, Default)]
pub struct TrustyAgentRegistry {
    agents: HashMap<String, TrustyAgentDescriptor>,
}

impl TrustyAgentRegistry {
    pub fn new() -> Self {
        Self { agents: HashMap::new() }
    }

    /// Register an agent. Idempotent: a second registration under the same
    /// name logs a warning and leaves the first registration in place,
    /// rather than erroring.
    pub fn register(&mut self, descriptor: TrustyAgentDescriptor) {
        if self.agents.contains_key(&descriptor.name) {
            tracing::warn!(agent = %descriptor.name, "trusty agent already registered, ignoring duplicate");
            return;
        }
        self.agents.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&TrustyAgentDescriptor> {
        self.agents.get(name)
    }

    pub fn is_comparative(&self, name: &str) -> bool {
        self.agents.get(name).is_some_and(|d| d.is_comparative)
    }

    pub fn all(&self) -> impl Iterator<Item = &TrustyAgentDescriptor> {
        self.agents.values()
    }

    /// Human-readable description list injected into the genesis prompt,
    /// one line per registered agent.
    pub fn describe_all(&self) -> String {
        let mut names: Vec<&TrustyAgentDescriptor> = self.agents.values().collect();
        names.sort_by(|a, b| a.name.cmp(&b.name));
        names
            .into_iter()
            .map(|d| format!("- {}: {}", d.name, d.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The seven built-in agents from spec §4.5's taxonomy table.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            TrustyAgentDescriptor::new("pytest", "Runs the project's unit tests and reports failures"),
        );
        registry.register(
            TrustyAgentDescriptor::new("code_reviewer", "LLM review of the diff against the task description")
                .with_prompt_target(PromptTarget::CodingAgent),
        );
        registry.register(
            TrustyAgentDescriptor::new("plausibility", "LLM plausibility grading of the diff against the task"),
        );
        registry.register(
            TrustyAgentDescriptor::new("web_simple", "Screenshot plus vision LLM grading of the rendered page"),
        );
        registry.register(
            TrustyAgentDescriptor::new("web_compare", "Before/after screenshot comparison via vision LLM")
                .comparative(),
        );
        registry.register(
            TrustyAgentDescriptor::new(
                "web_reference",
                "Before/after/reference screenshot comparison via vision LLM, grade A only",
            )
            .comparative(),
        );
        registry.register(
            TrustyAgentDescriptor::new("pexpect_agent", "Passthrough agent; scripts run under pytest"),
        );
        registry
    }
}
