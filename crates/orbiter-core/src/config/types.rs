//! Configuration types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::project::DependsOn;

/// Workspace-level configuration for the task runner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Version of the config schema
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Workspace name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Per-target defaults applied when a project does not declare its own
    pub target_defaults: IndexMap<String, TargetDefaults>,

    /// Task runner options
    pub tasks_runner: TasksRunnerConfig,

    /// Output declaration handling
    pub outputs: OutputsConfig,

    /// Plugins contributing inferred targets
    pub plugins: Vec<String>,
}

impl WorkspaceConfig {
    /// Workspace-level dependsOn declarations keyed by target name
    pub fn default_dependency_configs(&self) -> IndexMap<String, Vec<DependsOn>> {
        self.target_defaults
            .iter()
            .filter(|(_, defaults)| !defaults.depends_on.is_empty())
            .map(|(target, defaults)| (target.clone(), defaults.depends_on.clone()))
            .collect()
    }
}

/// Defaults for a target name across the workspace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDefaults {
    /// Targets that must run first
    pub depends_on: Vec<DependsOn>,
}

/// Task runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksRunnerConfig {
    /// Target names whose results may be cached
    pub cacheable_operations: Vec<String>,

    /// Alternative name for `cacheable_operations`, used when that list is empty
    pub cacheable_targets: Vec<String>,

    /// Stream output of every task, regardless of policy
    pub stream_output: bool,

    /// Maximum concurrent tasks
    pub concurrency: usize,
}

impl Default for TasksRunnerConfig {
    fn default() -> Self {
        Self {
            cacheable_operations: ["build", "lint", "test", "e2e"]
                .into_iter()
                .map(String::from)
                .collect(),
            cacheable_targets: Vec::new(),
            stream_output: false,
            concurrency: 3,
        }
    }
}

impl TasksRunnerConfig {
    /// The effective list of cacheable target names
    pub fn cacheable(&self) -> &[String] {
        if self.cacheable_operations.is_empty() {
            &self.cacheable_targets
        } else {
            &self.cacheable_operations
        }
    }
}

/// Output declaration configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
    /// How legacy (non-templated) outputs are handled
    pub validation: OutputValidation,
}

/// Handling of outputs that do not start with a `{...}` template token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputValidation {
    /// Rewrite them into templated form silently
    #[default]
    Migrate,
    /// Rewrite them and log a warning
    Warn,
    /// Reject them
    Strict,
}

impl OutputValidation {
    /// Get the mode as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Migrate => "migrate",
            Self::Warn => "warn",
            Self::Strict => "strict",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cacheable() {
        let runner = TasksRunnerConfig::default();
        assert_eq!(runner.cacheable(), ["build", "lint", "test", "e2e"]);
    }

    #[test]
    fn test_cacheable_falls_back_to_targets() {
        let runner = TasksRunnerConfig {
            cacheable_operations: Vec::new(),
            cacheable_targets: vec!["compile".to_string()],
            ..TasksRunnerConfig::default()
        };
        assert_eq!(runner.cacheable(), ["compile"]);
    }

    #[test]
    fn test_default_dependency_configs_skips_empty() {
        let mut config = WorkspaceConfig::default();
        config.target_defaults.insert(
            "build".to_string(),
            TargetDefaults {
                depends_on: vec![DependsOn::from("^build")],
            },
        );
        config
            .target_defaults
            .insert("lint".to_string(), TargetDefaults::default());

        let defaults = config.default_dependency_configs();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults["build"], vec![DependsOn::from("^build")]);
    }

    #[test]
    fn test_output_validation_parse() {
        let config: OutputsConfig = serde_yaml::from_str("validation: strict").unwrap();
        assert_eq!(config.validation, OutputValidation::Strict);
        assert_eq!(OutputsConfig::default().validation, OutputValidation::Migrate);
    }
}
