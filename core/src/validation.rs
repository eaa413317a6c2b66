use crate::error::{OrchestratorError, Result};

/// The raw, pre-normalisation fields parsed out of a generator or chunker
/// LLM response -- validated before [`crate::models::ProtoBlock::new`] ever
/// runs, so malformed output is reported with a `Generation` error rather
/// than panicking deep inside construction.
pub struct RawProtoBlockFields<'a> {
    pub task: &'a str,
    pub write_files: &'a [String],
    pub context_files: &'a [String],
    pub commit_message: &'a str,
    pub branch_name: &'a str,
    pub trusty_agents: &'a [String],
}

/// Validation utilities for freshly-parsed protoblock JSON.
pub struct ProtoBlockValidator;

impl ProtoBlockValidator {
    /// Validate the `task` field.
    ///
    /// Must be non-empty after trimming.
    pub fn validate_task(task: &str) -> Result<()> {
        if task.trim().is_empty() {
            return Err(OrchestratorError::generation_failed("task description is empty"));
        }
        Ok(())
    }

    /// Validate `write_files`.
    ///
    /// Must be a non-empty list of relative paths.
    pub fn validate_write_files(write_files: &[String]) -> Result<()> {
        if write_files.is_empty() {
            return Err(OrchestratorError::generation_failed("write_files must not be empty"));
        }
        Self::validate_relative_paths(write_files)
    }

    /// Validate `context_files`.
    ///
    /// May be empty; every entry must be a relative path.
    pub fn validate_context_files(context_files: &[String]) -> Result<()> {
        Self::validate_relative_paths(context_files)
    }

    fn validate_relative_paths(paths: &[String]) -> Result<()> {
        for path in paths {
            if path.is_empty() || path.starts_with('/') {
                return Err(OrchestratorError::generation_failed(format!(
                    "path must be relative and non-empty: {path:?}"
                )));
            }
        }
        Ok(())
    }

    /// Validate `commit_message`.
    ///
    /// Must be non-empty; the `tac: ` prefix is added during normalisation,
    /// not here.
    pub fn validate_commit_message(commit_message: &str) -> Result<()> {
        if commit_message.trim().is_empty() {
            return Err(OrchestratorError::generation_failed("commit_message is empty"));
        }
        Ok(())
    }

    /// Validate `branch_name`.
    ///
    /// Must be non-empty and must not contain whitespace.
    pub fn validate_branch_name(branch_name: &str) -> Result<()> {
        if branch_name.trim().is_empty() {
            return Err(OrchestratorError::generation_failed("branch_name is empty"));
        }
        if branch_name.chars().any(|c| c.is_whitespace()) {
            return Err(OrchestratorError::generation_failed(format!(
                "branch_name must not contain whitespace: {branch_name:?}"
            )));
        }
        Ok(())
    }

    /// Validate `trusty_agents`.
    ///
    /// May be empty (normalisation inserts `pytest`/`plausibility`); every
    /// entry must be non-empty.
    pub fn validate_trusty_agents(trusty_agents: &[String]) -> Result<()> {
        if trusty_agents.iter().any(|a| a.trim().is_empty()) {
            return Err(OrchestratorError::generation_failed("trusty_agents contains an empty name"));
        }
        Ok(())
    }

    /// Validate every required field per spec §4.1 step 4 in one pass.
    pub fn validate(fields: &RawProtoBlockFields) -> Result<()> {
        Self::validate_task(fields.task)?;
        Self::validate_write_files(fields.write_files)?;
        Self::validate_context_files(fields.context_files)?;
        Self::validate_commit_message(fields.commit_message)?;
        Self::validate_branch_name(fields.branch_name)?;
        Self::validate_trusty_agents(fields.trusty_agents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_task_rejects_blank() {
        assert!(ProtoBlockValidator::validate_task("   ").is_err());
        assert!(ProtoBlockValidator::validate_task("do something").is_ok());
    }

    #[test]
    fn test_validate_write_files_requires_nonempty_list() {
        assert!(ProtoBlockValidator::validate_write_files(&[]).is_err());
        assert!(ProtoBlockValidator::validate_write_files(&["a.py".to_string()]).is_ok());
    }

    #[test]
    fn test_validate_paths_reject_absolute() {
        let paths = vec!["/etc/passwd".to_string()];
        assert!(ProtoBlockValidator::validate_context_files(&paths).is_err());
    }

    #[test]
    fn test_validate_branch_name_rejects_whitespace() {
        assert!(ProtoBlockValidator::validate_branch_name("tac/feature/my task").is_err());
        assert!(ProtoBlockValidator::validate_branch_name("tac/feature/my-task").is_ok());
    }

    #[test]
    fn test_validate_full_fields() {
        let write_files = vec!["a.py".to_string()];
        let context_files = vec!["b.py".to_string()];
        let trusty_agents = vec!["pytest".to_string()];
        let fields = RawProtoBlockFields {
            task: "add a function",
            write_files: &write_files,
            context_files: &context_files,
            commit_message: "add function",
            branch_name: "tac/feature/add-function",
            trusty_agents: &trusty_agents,
        };
        assert!(ProtoBlockValidator::validate(&fields).is_ok());
    }
}
