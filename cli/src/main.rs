use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tac_core::capabilities::ProjectIndexer;
use tac_core::config::OrchestratorConfig;
use tac_core::executor::{BlockExecutor, ResolvedTrustyAgent};
use tac_core::models::ProtoBlock;
use tac_core::processor::BlockProcessor;
use tac_core::registry::TrustyAgentRegistry;
use tracing::{error, info, warn};

mod capability_stubs;
mod git;
mod trusty_agents;

use capability_stubs::{NullVersionControl, ShellTestRunner, UnconfiguredCodingAgent, UnconfiguredLlmClient, WalkingProjectIndexer};
use git::GitVersionControl;
use tac_core::capabilities::VersionControl;
use trusty_agents::PytestTrustyAgent;

/// Drives the block-lifecycle engine end to end: turns free-form
/// instructions into a protoblock, applies it, and runs the trusty
/// pipeline, retrying up to the configured attempt budget.
#[derive(Parser, Debug)]
#[command(name = "make", author, version, about, long_about = None)]
struct Args {
    /// Free-form task instructions, e.g. `tac add is_even to mathutils.py`.
    /// Ignored when `--json` is given.
    instructions: Vec<String>,

    /// Load a pinned protoblock from a JSON file instead of generating one
    /// from instructions; runs it once, without the generate/retry loop.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Disable all version-control operations. Incompatible with the
    /// `plausibility` trusty agent: every protoblock, generated or
    /// pinned via `--json`, always carries `plausibility` after
    /// `ProtoBlock::new`'s normalisation, so this flag is rejected by
    /// `OrchestratorConfig::validate` as a startup configuration error
    /// rather than silently accepted.
    #[arg(long)]
    no_git: bool,

    /// Path to the repository root. Defaults to the current directory.
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Shell command used by the `pytest` trusty agent and the coding
    /// agent's own verification; receives the touched path as its last
    /// argument.
    #[arg(long, default_value = "pytest")]
    test_command: String,

    /// Path to the TOML config file. Overrides `TAC_CONFIG`.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(args: Args) -> tac_core::error::Result<()> {
    let mut config = match &args.config {
        Some(path) => OrchestratorConfig::load_from(&path.to_string_lossy())?,
        None => OrchestratorConfig::load()?,
    };
    config.no_git = config.no_git || args.no_git;

    let registry = TrustyAgentRegistry::with_builtins();
    let test_runner = ShellTestRunner::new(args.test_command.clone());

    if let Some(json_path) = &args.json {
        return run_pinned_block(&args, &config, &registry, &test_runner, json_path).await;
    }

    config.validate(&["pytest".to_string(), "plausibility".to_string()])?;

    if args.instructions.is_empty() {
        return Err(tac_core::error::OrchestratorError::configuration("no task instructions given; pass either free text or --json <file>"));
    }

    let pytest_agent = PytestTrustyAgent::new(&test_runner);
    let resolve_agent = |name: &str| -> Option<ResolvedTrustyAgent<'_>> {
        if name == "pytest" {
            Some(ResolvedTrustyAgent::Plain(&pytest_agent))
        } else {
            None
        }
    };

    let vcs = GitVersionControl::new(&args.repo);
    let coding_agent = UnconfiguredCodingAgent;
    let llm = UnconfiguredLlmClient;
    let indexer = WalkingProjectIndexer::new(&args.repo);

    let instructions = args.instructions.join(" ");
    info!(%instructions, repo = %args.repo.display(), "starting block lifecycle");

    let codebase_summary = indexer.get_codebase_summary().await?;

    let processor = BlockProcessor {
        llm: &llm,
        coding_agent: &coding_agent,
        vcs: &vcs,
        registry: &registry,
        config: &config,
        persist_dir: &args.repo,
        resume_signal: None,
    };

    let succeeded = processor.run_loop(&instructions, &codebase_summary, resolve_agent).await?;

    if succeeded {
        info!("task completed successfully");
        Ok(())
    } else {
        warn!("attempt budget exhausted without success; feature branch left on disk for inspection");
        Err(tac_core::error::OrchestratorError::coding_agent_failed("attempt budget exhausted"))
    }
}

/// The on-disk shape of a hand-authored pinned protoblock: the same raw
/// fields the genesis LLM response carries, not `ProtoBlock`'s own
/// (normalised, result-bearing) shape.
#[derive(serde::Deserialize)]
struct PinnedProtoBlock {
    block_id: String,
    task_description: String,
    write_files: Vec<String>,
    context_files: Vec<String>,
    commit_message: String,
    branch_name: String,
    trusty_agents: Vec<String>,
    #[serde(default)]
    trusty_agent_prompts: std::collections::HashMap<String, String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default = "default_attempt_number")]
    attempt_number: u32,
}

fn default_attempt_number() -> u32 {
    1
}

/// `make --json <file>`: run a single, pre-specified protoblock exactly
/// once, bypassing generation and retry (spec §6.7).
async fn run_pinned_block(
    args: &Args,
    config: &OrchestratorConfig,
    registry: &TrustyAgentRegistry,
    test_runner: &ShellTestRunner,
    json_path: &PathBuf,
) -> tac_core::error::Result<()> {
    let raw = std::fs::read_to_string(json_path)
        .map_err(|e| tac_core::error::OrchestratorError::persistence(format!("failed to read {}: {e}", json_path.display())))?;
    let pinned: PinnedProtoBlock = serde_json::from_str(&raw)
        .map_err(|e| tac_core::error::OrchestratorError::persistence(format!("failed to parse pinned protoblock: {e}")))?;

    let fields = tac_core::validation::RawProtoBlockFields {
        task: &pinned.task_description,
        write_files: &pinned.write_files,
        context_files: &pinned.context_files,
        commit_message: &pinned.commit_message,
        branch_name: &pinned.branch_name,
        trusty_agents: &pinned.trusty_agents,
    };
    tac_core::validation::ProtoBlockValidator::validate(&fields)?;

    let mut block = ProtoBlock::new(
        pinned.block_id,
        pinned.task_description,
        pinned.write_files,
        pinned.context_files,
        pinned.commit_message,
        pinned.branch_name,
        pinned.trusty_agents,
        pinned.trusty_agent_prompts,
        pinned.image_url,
        pinned.attempt_number,
    )
    .map_err(|e| tac_core::error::OrchestratorError::configuration(e.to_string()))?;

    config.validate(&block.trusty_agents)?;

    let pytest_agent = PytestTrustyAgent::new(test_runner);
    let resolve_agent = |name: &str| -> Option<ResolvedTrustyAgent<'_>> {
        if name == "pytest" {
            Some(ResolvedTrustyAgent::Plain(&pytest_agent))
        } else {
            None
        }
    };

    let coding_agent = UnconfiguredCodingAgent;
    let git_vcs;
    let null_vcs;
    let vcs: &dyn VersionControl = if config.no_git {
        null_vcs = NullVersionControl;
        &null_vcs
    } else {
        git_vcs = GitVersionControl::new(&args.repo);
        &git_vcs
    };

    let indexer = WalkingProjectIndexer::new(&args.repo);
    let codebase_snapshot = indexer.get_codebase_summary().await?;

    let outcome = BlockExecutor::execute_block(&mut block, None, &codebase_snapshot, &coding_agent, vcs, registry, resolve_agent).await;

    if outcome.success {
        vcs.commit(&block.commit_message).await?;
        info!(block_id = %block.block_id, "pinned protoblock committed");
        Ok(())
    } else {
        warn!(block_id = %block.block_id, failure_type = %outcome.failure_type, "pinned protoblock failed");
        Err(tac_core::error::OrchestratorError::verifier_failed(outcome.failure_type, outcome.error_analysis))
    }
}
