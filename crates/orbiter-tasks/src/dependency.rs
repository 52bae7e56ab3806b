//! dependsOn expansion and resolution

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use orbiter_core::{DependsOn, ProjectGraph, TargetDependencyConfig};

/// Prefix marking a dependsOn shorthand that targets dependency projects
pub const DEPENDENCIES_PREFIX: char = '^';

/// Which projects a dependsOn entry points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyScope {
    /// The same project
    #[serde(rename = "self")]
    SameProject,
    /// Every project the current one depends on
    #[serde(rename = "dependencies")]
    Dependencies,
}

impl DependencyScope {
    /// Get the scope as it is written in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SameProject => "self",
            Self::Dependencies => "dependencies",
        }
    }

    /// Parse a scope from its configuration form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "self" => Some(Self::SameProject),
            "dependencies" => Some(Self::Dependencies),
            _ => None,
        }
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated dependsOn entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Projects the target runs on
    pub projects: DependencyScope,
    /// Target to run first
    pub target: String,
}

impl DependencyConfig {
    /// Create a dependency config
    pub fn new(projects: DependencyScope, target: impl Into<String>) -> Self {
        Self {
            projects,
            target: target.into(),
        }
    }
}

/// Expand `^target` / `target` shorthands into the structured form.
///
/// Structured entries pass through unchanged; order is preserved.
pub fn expand_dependency_config_syntax_sugar(deps: &[DependsOn]) -> Vec<TargetDependencyConfig> {
    deps.iter()
        .map(|dep| match dep {
            DependsOn::Shorthand(s) => match s.strip_prefix(DEPENDENCIES_PREFIX) {
                Some(target) => TargetDependencyConfig::new("dependencies", target),
                None => TargetDependencyConfig::new("self", s.as_str()),
            },
            DependsOn::Config(config) => config.clone(),
        })
        .collect()
}

/// Resolve the dependency configs of `project:target`.
///
/// The project's own dependsOn wins over the workspace defaults; with neither
/// the target has no dependencies. An entry whose `projects` is not `self` or
/// `dependencies` is a configuration error.
pub fn get_dependency_configs(
    project: &str,
    target: &str,
    default_dependency_configs: &IndexMap<String, Vec<DependsOn>>,
    project_graph: &ProjectGraph,
) -> Result<Vec<DependencyConfig>, DependencyConfigError> {
    let node = project_graph
        .node(project)
        .ok_or_else(|| DependencyConfigError::ProjectNotFound(project.to_string()))?;

    let declared = node
        .target(target)
        .and_then(|t| t.depends_on.as_deref())
        .or_else(|| default_dependency_configs.get(target).map(Vec::as_slice))
        .unwrap_or_default();

    let configs = expand_dependency_config_syntax_sugar(declared)
        .into_iter()
        .map(|config| match DependencyScope::parse(&config.projects) {
            Some(scope) => Ok(DependencyConfig::new(scope, config.target)),
            None => Err(DependencyConfigError::InvalidProjects {
                project: project.to_string(),
                target: target.to_string(),
                projects: config.projects,
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(project, target, count = configs.len(), "resolved dependency configs");
    Ok(configs)
}

/// Errors while resolving dependsOn
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyConfigError {
    /// Project missing from the graph
    #[error("Project '{0}' not found in project graph")]
    ProjectNotFound(String),

    /// dependsOn names something other than "self" or "dependencies"
    #[error("dependsOn is improperly configured for {project}:{target}: dependsOn.projects is \"{projects}\" but should be \"self\" or \"dependencies\"")]
    InvalidProjects {
        project: String,
        target: String,
        projects: String,
    },
}

impl DependencyConfigError {
    /// Short headline for user-facing diagnostics
    pub fn title(&self) -> String {
        match self {
            Self::ProjectNotFound(project) => format!("Project '{}' not found in project graph", project),
            Self::InvalidProjects { project, target, .. } => {
                format!("dependsOn is improperly configured for {}:{}", project, target)
            }
        }
    }

    /// Detail lines for user-facing diagnostics
    pub fn body_lines(&self) -> Vec<String> {
        match self {
            Self::ProjectNotFound(_) => Vec::new(),
            Self::InvalidProjects { projects, .. } => vec![format!(
                "dependsOn.projects is \"{}\" but should be \"self\" or \"dependencies\"",
                projects
            )],
        }
    }

    /// Whether this error reflects invalid user configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidProjects { .. })
    }
}
