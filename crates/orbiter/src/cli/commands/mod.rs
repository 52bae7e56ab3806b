//! CLI commands

mod command;
mod graph;
mod outputs;

pub use command::CommandCommand;
pub use graph::GraphCommand;
pub use outputs::OutputsCommand;

use std::path::PathBuf;

use anyhow::Context;
use tracing::debug;

use orbiter_core::{load_config_or_default, ProjectGraph, WorkspaceConfig};
use orbiter_tasks::TargetReference;

use crate::cli::Cli;

/// Configuration and project graph of the current workspace
pub(crate) struct Workspace {
    pub root: PathBuf,
    pub config: WorkspaceConfig,
    pub project_graph: ProjectGraph,
}

impl Workspace {
    /// Load the workspace config and the serialized project graph
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let root = std::env::current_dir()?;
        let (config, config_path) = load_config_or_default(&root);
        debug!(config = ?config_path, "loaded workspace configuration");

        let graph_path = root.join(&cli.graph);
        let project_graph = ProjectGraph::from_json_file(&graph_path)
            .with_context(|| format!("Failed to read project graph {}", graph_path.display()))?;
        debug!(projects = project_graph.len(), "loaded project graph");

        Ok(Self {
            root,
            config,
            project_graph,
        })
    }
}

/// Parse a `project:target[:configuration]` argument
pub(crate) fn parse_target_reference(value: &str) -> anyhow::Result<TargetReference> {
    TargetReference::parse(value).with_context(|| {
        format!(
            "Invalid target '{}', expected project:target[:configuration]",
            value
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_reference() {
        let reference = parse_target_reference("app:build:production").unwrap();
        assert_eq!(reference.project, "app");
        assert_eq!(reference.configuration.as_deref(), Some("production"));

        assert!(parse_target_reference("app").is_err());
    }
}
