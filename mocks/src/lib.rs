//! Mock implementations and test utilities for the block-lifecycle engine
//!
//! This crate provides comprehensive testing infrastructure including:
//! - Mock implementations of every capability trait
//! - Canned trusty-agent implementations
//! - Builders and fixtures for protoblocks
//! - Custom assertion helpers

pub mod assertions;
pub mod builders;
pub mod capabilities;
pub mod fixtures;
pub mod trusty_agents;

pub use assertions::*;
pub use builders::*;
pub use capabilities::{MockCodingAgent, MockLlmClient, MockProjectIndexer, MockTestRunner, MockVersionControl};
pub use fixtures::*;
pub use trusty_agents::{builtin_passing_agents, ScriptedTrustyAgent};
