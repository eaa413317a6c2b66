//! Task decomposition into a sequenced chain of protoblocks, executed on a
//! shared branch (spec §4.4).

use serde::Deserialize;

use crate::capabilities::{CodingAgent, LlmClient, LlmMessage, ProjectIndexer, VersionControl};
use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::executor::ResolvedTrustyAgent;
use crate::generator::{normalise_branch_name, strip_fences_and_extract_json};
use crate::processor::BlockProcessor;
use crate::registry::TrustyAgentRegistry;

/// One recipe within a multi-block decomposition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtoBlockRecipe {
    pub title: String,
    pub description: String,
}

impl ProtoBlockRecipe {
    /// The per-chunk commit message, derived as `"Implement {title}"`
    /// following `orchestrator.py::ChunkingResult.get_commit_messages`.
    pub fn commit_message(&self) -> String {
        format!("Implement {}", self.title)
    }
}

#[derive(Debug, Deserialize)]
struct RawChunkingResponse {
    strategy: String,
    branch_name: String,
    chunks: Vec<ProtoBlockRecipe>,
    #[serde(default)]
    list_of_violated_tests: Vec<String>,
}

/// The outcome of the chunking step: a branch plus an ordered sequence of
/// recipes to execute on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingResult {
    pub branch_name: String,
    pub strategy: String,
    pub recipes: Vec<ProtoBlockRecipe>,
    pub list_of_violated_tests: Vec<String>,
}

impl ChunkingResult {
    pub fn get_chunk_titles(&self) -> Vec<String> {
        self.recipes.iter().map(|r| r.title.clone()).collect()
    }

    pub fn get_commit_messages(&self) -> Vec<String> {
        self.recipes.iter().map(|r| r.commit_message()).collect()
    }

    /// Single-chunk fallback used when the chunking LLM's response fails to
    /// parse -- large-task chunking is advisory, never a hard error.
    fn single_chunk_fallback(task_instructions: &str) -> Self {
        let branch_name = derive_branch_name_from_instructions(task_instructions);
        Self {
            branch_name,
            strategy: "not chunked: falling back to a single block after a chunking parse failure".to_string(),
            recipes: vec![ProtoBlockRecipe {
                title: "Full task".to_string(),
                description: task_instructions.to_string(),
            }],
            list_of_violated_tests: Vec::new(),
        }
    }
}

fn derive_branch_name_from_instructions(instructions: &str) -> String {
    let slug: String = instructions
        .split_whitespace()
        .take(5)
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    normalise_branch_name(&slug)
}

pub struct TaskChunker;

impl TaskChunker {
    pub async fn chunk(task_instructions: &str, codebase_summary: &str, llm: &dyn LlmClient) -> ChunkingResult {
        let prompt = format!(
            "<task_instructions>\n{task_instructions}\n</task_instructions>\n\n\
             <codebase_summary>\n{codebase_summary}\n</codebase_summary>\n\n\
             Decompose this task into an ordered sequence of small, independently testable chunks. \
             Respond with a single JSON object: {{\"strategy\": string, \"branch_name\": string, \
             \"chunks\": [{{\"title\": string, \"description\": string}}], \"list_of_violated_tests\": []}}."
        );
        let messages = vec![LlmMessage::user(prompt)];

        let response = match llm.text_complete(&messages, None, None).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "chunking LLM request failed, falling back to single block");
                return ChunkingResult::single_chunk_fallback(task_instructions);
            }
        };

        match Self::parse(&response) {
            Some(raw) => ChunkingResult {
                branch_name: normalise_branch_name(&raw.branch_name),
                strategy: raw.strategy,
                recipes: raw.chunks,
                list_of_violated_tests: raw.list_of_violated_tests,
            },
            None => {
                tracing::warn!("chunking response failed to parse, falling back to single block");
                ChunkingResult::single_chunk_fallback(task_instructions)
            }
        }
    }

    fn parse(response: &str) -> Option<RawChunkingResponse> {
        let cleaned = strip_fences_and_extract_json(response)?;
        serde_json::from_str(&cleaned).ok()
    }
}

pub struct MultiBlockOrchestrator<'a> {
    pub llm: &'a dyn LlmClient,
    pub coding_agent: &'a dyn CodingAgent,
    pub vcs: &'a dyn VersionControl,
    pub indexer: &'a dyn ProjectIndexer,
    pub registry: &'a TrustyAgentRegistry,
    pub config: &'a OrchestratorConfig,
    /// Directory each chunk's generated protoblocks are persisted to, see
    /// [`crate::processor::BlockProcessor::persist_dir`].
    pub persist_dir: &'a std::path::Path,
    /// Caller-supplied confirmation for `confirm_multiblock_execution`;
    /// returns `true` to proceed. Replaces the source's blocking `input()`
    /// prompt so the core never touches stdin directly.
    pub confirm: &'a (dyn Fn() -> bool + Sync),
}

impl<'a> MultiBlockOrchestrator<'a> {
    pub async fn execute(
        &self,
        task_instructions: &str,
        codebase_summary: &str,
        resolve_agent: impl Fn(&str) -> Option<ResolvedTrustyAgent<'_>>,
    ) -> Result<bool> {
        let chunking = TaskChunker::chunk(task_instructions, codebase_summary, self.llm).await;

        if self.config.confirm_multiblock_execution && !(self.confirm)() {
            tracing::info!("multi-block execution declined by confirmation gate");
            return Ok(false);
        }

        self.vcs.checkout(&chunking.branch_name, true).await?;

        for (index, recipe) in chunking.recipes.iter().enumerate() {
            let refreshed_summary = match self.indexer.get_codebase_summary().await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to refresh codebase summary between chunks");
                    codebase_summary.to_string()
                }
            };

            let processor = BlockProcessor {
                llm: self.llm,
                coding_agent: self.coding_agent,
                vcs: self.vcs,
                registry: self.registry,
                config: self.config,
                persist_dir: self.persist_dir,
                resume_signal: None,
            };

            let succeeded = processor
                .run_loop(&recipe.description, &refreshed_summary, &resolve_agent)
                .await?;

            if !succeeded {
                tracing::warn!(chunk = index, title = %recipe.title, "chunk exhausted its attempt budget, aborting remaining chunks");
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_titles_and_commit_messages() {
        let result = ChunkingResult {
            branch_name: "tac/feature/big".to_string(),
            strategy: "by-module".to_string(),
            recipes: vec![
                ProtoBlockRecipe { title: "Add model".to_string(), description: "...".to_string() },
                ProtoBlockRecipe { title: "Add route".to_string(), description: "...".to_string() },
            ],
            list_of_violated_tests: Vec::new(),
        };
        assert_eq!(result.get_chunk_titles(), vec!["Add model", "Add route"]);
        assert_eq!(result.get_commit_messages(), vec!["Implement Add model", "Implement Add route"]);
    }

    #[test]
    fn test_single_chunk_fallback_mentions_not_chunked() {
        let result = ChunkingResult::single_chunk_fallback("add a small helper function");
        assert_eq!(result.recipes.len(), 1);
        assert!(result.strategy.to_lowercase().contains("not chunked"));
        assert!(result.branch_name.starts_with("tac/feature/"));
    }

    #[test]
    fn test_parse_valid_chunking_response() {
        let response = "```json\n{\"strategy\":\"by-module\",\"branch_name\":\"big\",\"chunks\":[{\"title\":\"A\",\"description\":\"d\"}],\"list_of_violated_tests\":[]}\n```";
        let raw = TaskChunker::parse(response).unwrap();
        assert_eq!(raw.branch_name, "big");
        assert_eq!(raw.chunks.len(), 1);
    }

    #[test]
    fn test_parse_invalid_response_returns_none() {
        assert!(TaskChunker::parse("not json at all").is_none());
    }
}
