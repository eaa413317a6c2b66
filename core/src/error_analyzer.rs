//! Turns a raw trusty-agent failure into a structured analysis report fed
//! into the next attempt's generator call (spec §4.6).

use crate::capabilities::{LlmClient, LlmMessage};
use crate::models::ProtoBlock;

pub struct ErrorAnalyzer;

impl ErrorAnalyzer {
    /// Analyze `failure_text` (pytest stdout/stderr, or an LLM verifier's
    /// analysis) in the context of `protoblock` and `codebase_summary`.
    ///
    /// The analyzer's own failures never propagate: per spec §4.6, a
    /// failed analysis call degrades to a best-effort raw passthrough of
    /// `failure_text`, logged at `error` level.
    pub async fn analyze_failure(
        protoblock: &ProtoBlock,
        codebase_summary: &str,
        failure_text: &str,
        llm: &dyn LlmClient,
    ) -> String {
        let prompt = Self::analysis_prompt(protoblock, codebase_summary, failure_text);
        let messages = vec![LlmMessage::system(ANALYSIS_SYSTEM_PROMPT), LlmMessage::user(prompt)];

        match llm.text_complete(&messages, None, None).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::error!(error = %e, "error analyzer LLM call failed, passing through raw failure text");
                failure_text.to_string()
            }
        }
    }

    fn analysis_prompt(protoblock: &ProtoBlock, codebase_summary: &str, failure_text: &str) -> String {
        format!(
            "<purpose>\nDiagnose why this code-modification attempt failed and suggest how to fix it \
             next time.\n</purpose>\n\n\
             <codebase_state>\n{codebase_summary}\n</codebase_state>\n\n\
             <protoblock>\ntask: {}\nwrite_files: {:?}\n</protoblock>\n\n\
             <test_results>\n{failure_text}\n</test_results>\n\n\
             <analysis_rules>\nBe specific about the failure type, the likely file and line, and the root \
             cause. Recommend additional write_files or context_files if the current set is insufficient.\
             \n</analysis_rules>\n\n\
             <output_format>\nFAILURE TYPE: ...\nERROR LOCATION: ...\nROOT CAUSE: ...\nDETAILED ANALYSIS: \
             ...\nRECOMMENDATIONS: ...\nMISSING WRITE FILES: ...\n</output_format>",
            protoblock.task_description, protoblock.write_files,
        )
    }
}

const ANALYSIS_SYSTEM_PROMPT: &str = "You are a meticulous code-review assistant diagnosing failed automated \
code-modification attempts.";
