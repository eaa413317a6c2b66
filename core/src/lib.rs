//! Block-lifecycle Core Library
//!
//! This crate provides the foundational domain models, business logic, and trait
//! interfaces for the autonomous code-modification orchestrator. All other
//! crates (`tac-mocks`, `tac-cli`) depend on the types and interfaces defined
//! here.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`models`] - Core domain models (ProtoBlock, TrustyAgentResult, ...)
//! - [`error`] - Error types and result handling
//! - [`validation`] - Input-shape validation for freshly-parsed protoblocks
//! - [`registry`] - The trusty-agent registration table
//! - [`capabilities`] - Trait interfaces for external collaborators
//! - [`generator`] - Instructions + codebase summary -> validated ProtoBlock
//! - [`executor`] - One attempt: coding agent + trusty pipeline
//! - [`processor`] - Retry loop around generator + executor
//! - [`orchestrator`] - Task decomposition + sequential chunk execution
//! - [`error_analyzer`] - Failure output -> structured analysis text
//! - [`config`] - Immutable runtime configuration
//! - [`persistence`] - ProtoBlock on-disk JSON format
//!
//! # Example
//!
//! ```rust
//! use tac_core::{ProtoBlockValidator, registry::TrustyAgentRegistry};
//!
//! let registry = TrustyAgentRegistry::with_builtins();
//! assert!(registry.get("pytest").is_some());
//! ```

pub mod capabilities;
pub mod config;
pub mod error;
pub mod error_analyzer;
pub mod executor;
pub mod generator;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod processor;
pub mod registry;
pub mod validation;

pub use capabilities::{CodingAgent, ComparativeTrustyAgent, LlmClient, ProjectIndexer, TestRunner, TrustyAgent, VersionControl};
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use error_analyzer::ErrorAnalyzer;
pub use executor::{BlockExecutor, ExecutionOutcome};
pub use generator::ProtoBlockGenerator;
pub use models::{ProtoBlock, ProtoBlockError, TrustyAgentResult, TrustyComponent};
pub use orchestrator::{ChunkingResult, MultiBlockOrchestrator, ProtoBlockRecipe};
pub use processor::BlockProcessor;
pub use registry::{TrustyAgentDescriptor, TrustyAgentRegistry};
pub use validation::ProtoBlockValidator;

/// Current version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
