//! Turns free-form instructions plus a codebase summary into a validated
//! [`ProtoBlock`] via the strong text LLM (spec §4.1).

use std::collections::HashMap;
use std::path::Path;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;

use crate::capabilities::{LlmClient, LlmMessage};
use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::models::ProtoBlock;
use crate::persistence;
use crate::registry::TrustyAgentRegistry;
use crate::validation::{ProtoBlockValidator, RawProtoBlockFields};

/// The JSON shape the genesis prompt asks the LLM to emit.
#[derive(Debug, Deserialize)]
struct RawProtoBlock {
    task: String,
    write_files: Vec<String>,
    context_files: Vec<String>,
    commit_message: String,
    branch_name: String,
    trusty_agents: Vec<String>,
    #[serde(default)]
    trusty_agent_prompts: HashMap<String, String>,
    #[serde(default)]
    image_url: Option<String>,
}

pub struct ProtoBlockGenerator;

impl ProtoBlockGenerator {
    /// Generate a fresh protoblock from `instructions` and
    /// `codebase_summary`. When `prior_block_id` is `Some`, this is a retry
    /// of an existing logical block and the allocated id is reused instead
    /// of a fresh one being minted; `error_analysis` (when present) is
    /// folded into the genesis prompt as a "last time this failed" preamble.
    pub async fn generate(
        instructions: &str,
        codebase_summary: &str,
        llm: &dyn LlmClient,
        registry: &TrustyAgentRegistry,
        config: &OrchestratorConfig,
        persist_dir: &Path,
        prior_block_id: Option<&str>,
        error_analysis: Option<&str>,
    ) -> Result<ProtoBlock> {
        let prompt = Self::genesis_prompt(instructions, codebase_summary, registry, error_analysis);
        let messages = vec![LlmMessage::system(GENESIS_SYSTEM_PROMPT), LlmMessage::user(prompt)];

        let mut last_error = String::new();
        let mut last_response = String::new();

        for attempt in 0..config.max_retries_protoblock_creation.max(1) {
            let response = llm
                .text_complete(&messages, None, None)
                .await
                .map_err(|e| OrchestratorError::generation_failed(format!("LLM request failed: {e}")))?;
            last_response = response.clone();

            match Self::parse_and_validate(&response) {
                Ok(raw) => return Self::build(raw, persist_dir, prior_block_id),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "protoblock generation attempt failed to parse");
                    last_error = e.to_string();
                }
            }
        }

        Err(OrchestratorError::generation_failed_with_preview(last_error, &last_response))
    }

    fn genesis_prompt(
        instructions: &str,
        codebase_summary: &str,
        registry: &TrustyAgentRegistry,
        error_analysis: Option<&str>,
    ) -> String {
        let mut sections = vec![
            format!("<codebase_summary>\n{codebase_summary}\n</codebase_summary>"),
            format!("<task_instructions>\n{instructions}\n</task_instructions>"),
            format!("<trusty_agents>\n{}\n</trusty_agents>", registry.describe_all()),
        ];

        if let Some(analysis) = error_analysis {
            sections.push(format!(
                "<previous_attempt_failure>\nLast time we tried this, it failed for the following reason. \
                 Try to do better this time:\n{analysis}\n</previous_attempt_failure>"
            ));
        }

        sections.push(OUTPUT_FORMAT_DIRECTIVE.to_string());
        sections.join("\n\n")
    }

    fn parse_and_validate(response: &str) -> Result<RawProtoBlock> {
        let cleaned = strip_fences_and_extract_json(response)
            .ok_or_else(|| OrchestratorError::generation_failed("no JSON object found in LLM response"))?;

        let raw: RawProtoBlock = serde_json::from_str(&cleaned)
            .map_err(|e| OrchestratorError::generation_failed(format!("malformed protoblock JSON: {e}")))?;

        let fields = RawProtoBlockFields {
            task: &raw.task,
            write_files: &raw.write_files,
            context_files: &raw.context_files,
            commit_message: &raw.commit_message,
            branch_name: &raw.branch_name,
            trusty_agents: &raw.trusty_agents,
        };
        ProtoBlockValidator::validate(&fields)?;

        Ok(raw)
    }

    fn build(raw: RawProtoBlock, persist_dir: &Path, prior_block_id: Option<&str>) -> Result<ProtoBlock> {
        let block_id = match prior_block_id {
            Some(id) => id.to_string(),
            None => Self::allocate_block_id(),
        };

        let branch_name = normalise_branch_name(&raw.branch_name);
        let commit_message = normalise_commit_message(&raw.commit_message);

        let block = ProtoBlock::new(
            block_id,
            raw.task,
            raw.write_files,
            raw.context_files,
            commit_message,
            branch_name,
            raw.trusty_agents,
            raw.trusty_agent_prompts,
            raw.image_url,
            1,
        )
        .map_err(|e| OrchestratorError::generation_failed(e.to_string()))?;

        persistence::save(persist_dir, &block)?;

        Ok(block)
    }

    fn allocate_block_id() -> String {
        let len = rand::thread_rng().gen_range(6..=8);
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }
}

const GENESIS_SYSTEM_PROMPT: &str =
    "You turn a natural-language coding task into a structured JSON work order.";

const OUTPUT_FORMAT_DIRECTIVE: &str = "Respond with a single JSON object with keys: task, write_files, \
context_files, commit_message, branch_name, trusty_agents, trusty_agent_prompts.";

/// Prepend `tac/feature/` unless the name already starts with `tac/`.
pub(crate) fn normalise_branch_name(branch_name: &str) -> String {
    if branch_name.starts_with("tac/") {
        branch_name.to_string()
    } else {
        format!("tac/feature/{branch_name}")
    }
}

/// Prepend `tac: ` unless the message already starts with it.
pub(crate) fn normalise_commit_message(commit_message: &str) -> String {
    if commit_message.starts_with("tac:") {
        commit_message.to_string()
    } else {
        format!("tac: {commit_message}")
    }
}

/// Strip optional Markdown code fences and extract the first balanced
/// `{...}` JSON object, mirroring `protoblock_manager.py`'s and
/// `orchestrator.py::_extract_json`'s two-stage cleanup.
pub(crate) fn strip_fences_and_extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();

    let unfenced = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.rsplit_once("```").map(|(body, _)| body).unwrap_or(rest)
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.rsplit_once("```").map(|(body, _)| body).unwrap_or(rest)
    } else {
        trimmed
    };

    let unfenced = unfenced.trim();
    if unfenced.starts_with('{') && serde_json::from_str::<serde_json::Value>(unfenced).is_ok() {
        return Some(unfenced.to_string());
    }

    // Fallback: scan for the first balanced brace span.
    let start = unfenced.find('{')?;
    let mut depth = 0i32;
    for (offset, ch) in unfenced[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(unfenced[start..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_branch_name_adds_prefix() {
        assert_eq!(normalise_branch_name("is-even"), "tac/feature/is-even");
        assert_eq!(normalise_branch_name("tac/feature/is-even"), "tac/feature/is-even");
        assert_eq!(normalise_branch_name("tac/custom/x"), "tac/custom/x");
    }

    #[test]
    fn test_normalise_commit_message_adds_prefix() {
        assert_eq!(normalise_commit_message("add is_even"), "tac: add is_even");
        assert_eq!(normalise_commit_message("tac: already prefixed"), "tac: already prefixed");
    }

    #[test]
    fn test_strip_fences_plain_json() {
        let extracted = strip_fences_and_extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(extracted, r#"{"a": 1}"#);
    }

    #[test]
    fn test_strip_fences_json_fenced() {
        let text = "```json\n{\"a\": 1}\n```";
        let extracted = strip_fences_and_extract_json(text).unwrap();
        assert!(extracted.contains("\"a\": 1"));
    }

    #[test]
    fn test_strip_fences_falls_back_to_balanced_brace_scan() {
        let text = "Sure, here is the result: {\"a\": {\"b\": 1}} -- done.";
        let extracted = strip_fences_and_extract_json(text).unwrap();
        assert_eq!(extracted, "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_strip_fences_no_json_returns_none() {
        assert!(strip_fences_and_extract_json("no json here").is_none());
    }

    #[test]
    fn test_allocate_block_id_length_and_charset() {
        let id = ProtoBlockGenerator::allocate_block_id();
        assert!((6..=8).contains(&id.len()));
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
