//! Project graph for workspace projects

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

use super::target::TargetConfiguration;

/// Configuration of a single project as seen by the task engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfiguration {
    /// Project root relative to the workspace root ("." for the workspace itself)
    pub root: String,

    /// Source root relative to the workspace root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,

    /// "application" or "library"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,

    /// Free-form tags
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Targets declared on the project
    pub targets: IndexMap<String, TargetConfiguration>,
}

impl ProjectConfiguration {
    /// Create a project configuration rooted at `root`
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Add a target
    pub fn with_target(mut self, name: impl Into<String>, target: TargetConfiguration) -> Self {
        self.targets.insert(name.into(), target);
        self
    }
}

/// A node in the project graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectGraphNode {
    /// Project name
    pub name: String,
    /// Node kind ("app", "lib", "e2e")
    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: String,
    /// Project data
    pub data: ProjectConfiguration,
}

fn default_node_type() -> String {
    "lib".to_string()
}

impl ProjectGraphNode {
    /// Create a new project node
    pub fn new(name: impl Into<String>, data: ProjectConfiguration) -> Self {
        Self {
            name: name.into(),
            node_type: default_node_type(),
            data,
        }
    }

    /// Look up a target by name
    pub fn target(&self, name: &str) -> Option<&TargetConfiguration> {
        self.data.targets.get(name)
    }

    /// Whether the project declares a target
    pub fn has_target(&self, name: &str) -> bool {
        self.data.targets.contains_key(name)
    }
}

/// An edge between two projects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGraphDependency {
    /// Project that depends
    pub source: String,
    /// Project depended upon
    pub target: String,
    /// Edge kind ("static", "dynamic", "implicit")
    #[serde(rename = "type", default = "default_dependency_type")]
    pub dependency_type: String,
}

fn default_dependency_type() -> String {
    "static".to_string()
}

/// Read-only project graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectGraph {
    /// Nodes indexed by project name
    pub nodes: IndexMap<String, ProjectGraphNode>,
    /// Outgoing edges indexed by source project name
    pub dependencies: IndexMap<String, Vec<ProjectGraphDependency>>,
}

impl ProjectGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a serialized project graph from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading project graph");
        let content = std::fs::read_to_string(path)?;
        let graph: Self = serde_json::from_str(&content)?;
        debug!(projects = graph.nodes.len(), "project graph loaded");
        Ok(graph)
    }

    /// Add a project node
    pub fn with_node(mut self, node: ProjectGraphNode) -> Self {
        self.dependencies.entry(node.name.clone()).or_default();
        self.nodes.insert(node.name.clone(), node);
        self
    }

    /// Add a static dependency edge `source -> target`
    pub fn with_dependency(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        self.dependencies
            .entry(source.clone())
            .or_default()
            .push(ProjectGraphDependency {
                source,
                target: target.into(),
                dependency_type: default_dependency_type(),
            });
        self
    }

    /// Get a project node
    pub fn node(&self, name: &str) -> Option<&ProjectGraphNode> {
        self.nodes.get(name)
    }

    /// Names of the projects `name` depends on, in declaration order
    pub fn project_dependencies(&self, name: &str) -> Vec<&str> {
        self.dependencies
            .get(name)
            .map(|deps| deps.iter().map(|d| d.target.as_str()).collect())
            .unwrap_or_default()
    }

    /// Number of projects
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no projects
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
