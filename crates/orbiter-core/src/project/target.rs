//! Target configuration types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options passed to an executor
pub type TargetOptions = Map<String, Value>;

/// Configuration of a single target (e.g. "build") on a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetConfiguration {
    /// Executor reference in `module:name` form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,

    /// Base options handed to the executor
    pub options: TargetOptions,

    /// Named option overrides (e.g. "production")
    pub configurations: IndexMap<String, TargetOptions>,

    /// Configuration used when none is requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_configuration: Option<String>,

    /// Declared output paths, usually templated (`{projectRoot}/dist`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<String>>,

    /// Targets that must run before this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<DependsOn>>,
}

impl TargetConfiguration {
    /// Create a target configuration for an executor
    pub fn new(executor: impl Into<String>) -> Self {
        Self {
            executor: Some(executor.into()),
            ..Self::default()
        }
    }

    /// Set the base options
    pub fn with_options(mut self, options: TargetOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a named configuration
    pub fn with_configuration(mut self, name: impl Into<String>, options: TargetOptions) -> Self {
        self.configurations.insert(name.into(), options);
        self
    }

    /// Set the declared outputs
    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = Some(outputs.into_iter().map(Into::into).collect());
        self
    }

    /// Set the dependsOn declarations
    pub fn with_depends_on(mut self, depends_on: Vec<DependsOn>) -> Self {
        self.depends_on = Some(depends_on);
        self
    }
}

/// Structured dependsOn declaration.
///
/// `projects` is kept as the raw declared string; it is validated when the
/// dependency configs of a target are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetDependencyConfig {
    /// Either "self" or "dependencies"
    pub projects: String,
    /// Target to run first
    pub target: String,
}

impl TargetDependencyConfig {
    /// Create a new dependency config
    pub fn new(projects: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            projects: projects.into(),
            target: target.into(),
        }
    }
}

/// A dependsOn entry as written in configuration: either the `^target` /
/// `target` shorthand or the structured form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    /// Shorthand string form
    Shorthand(String),
    /// Structured form
    Config(TargetDependencyConfig),
}

impl From<&str> for DependsOn {
    fn from(value: &str) -> Self {
        Self::Shorthand(value.to_string())
    }
}

impl From<TargetDependencyConfig> for DependsOn {
    fn from(value: TargetDependencyConfig) -> Self {
        Self::Config(value)
    }
}
