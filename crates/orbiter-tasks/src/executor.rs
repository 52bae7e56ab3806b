//! Executor and custom hasher lookup
//!
//! A task's executor comes from the target it runs. Targets are declared on
//! the project, but may also be inferred from the project's package manifest
//! scripts or contributed by plugins. Declared targets always win, then
//! plugin targets, then script-derived targets.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use orbiter_core::{ProjectGraph, ProjectGraphNode, TargetConfiguration};

use crate::task::Task;

/// Name of the package manifest that may contribute script targets
pub const PACKAGE_MANIFEST: &str = "package.json";

/// Executor used for targets derived from package scripts
pub const RUN_SCRIPT_EXECUTOR: &str = "nx:run-script";

/// Targets keyed by name
pub type Targets = IndexMap<String, TargetConfiguration>;

/// Source of targets derived from a project's package manifest scripts
pub trait PackageScriptSource: Send + Sync {
    /// Targets inferred from the manifest in `project_dir`
    fn script_targets(&self, project_dir: &Path) -> Result<Targets, ExecutorError>;
}

/// Source of plugin-contributed targets
pub trait PluginTargets: Send + Sync {
    /// Targets the configured `plugins` infer for the project at `project_root`
    fn plugin_targets(&self, project_root: &str, plugins: &[String]) -> Result<Targets, ExecutorError>;
}

/// A custom hashing strategy supplied by an executor
pub trait TaskHasher: Send + Sync {
    /// Compute the hash of a task
    fn hash_task(&self, task: &Task) -> Result<String, ExecutorError>;
}

/// Produces a custom hasher for an executor
pub type HasherFactory = Arc<dyn Fn() -> Box<dyn TaskHasher> + Send + Sync>;

/// Executor metadata as resolved by the registry
#[derive(Clone, Default)]
pub struct ExecutorDefinition {
    /// Module providing the executor (e.g. "@orbiter/js")
    pub module: String,
    /// Executor name within the module (e.g. "tsc")
    pub name: String,
    /// Optional custom hasher factory
    pub hasher_factory: Option<HasherFactory>,
}

impl fmt::Debug for ExecutorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorDefinition")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("hasher_factory", &self.hasher_factory.is_some())
            .finish()
    }
}

/// Resolves `module:name` executor references
pub trait ExecutorRegistry: Send + Sync {
    /// Read an executor definition
    fn read_executor(&self, module: &str, name: &str) -> Result<ExecutorDefinition, ExecutorError>;
}

/// Reads `scripts` from a project's package.json
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageJsonScripts;

#[derive(Deserialize)]
struct PackageManifest {
    #[serde(default)]
    scripts: IndexMap<String, String>,
}

impl PackageScriptSource for PackageJsonScripts {
    fn script_targets(&self, project_dir: &Path) -> Result<Targets, ExecutorError> {
        let path = project_dir.join(PACKAGE_MANIFEST);
        let content = std::fs::read_to_string(&path)?;
        let manifest: PackageManifest = serde_json::from_str(&content)
            .map_err(|e| ExecutorError::Manifest(path.clone(), e.to_string()))?;

        Ok(manifest
            .scripts
            .keys()
            .map(|script| {
                let mut options = serde_json::Map::new();
                options.insert("script".to_string(), Value::String(script.clone()));
                (
                    script.clone(),
                    TargetConfiguration::new(RUN_SCRIPT_EXECUTOR).with_options(options),
                )
            })
            .collect())
    }
}

/// Plugin source for workspaces without plugins
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPluginTargets;

impl PluginTargets for NoPluginTargets {
    fn plugin_targets(&self, _project_root: &str, _plugins: &[String]) -> Result<Targets, ExecutorError> {
        Ok(Targets::new())
    }
}

/// Looks up the executor (and custom hasher) behind a task
pub struct ExecutorLookup<'a> {
    workspace_root: PathBuf,
    plugins: &'a [String],
    scripts: &'a dyn PackageScriptSource,
    plugin_targets: &'a dyn PluginTargets,
}

impl<'a> ExecutorLookup<'a> {
    /// Create a lookup rooted at `workspace_root`
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        plugins: &'a [String],
        scripts: &'a dyn PackageScriptSource,
        plugin_targets: &'a dyn PluginTargets,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            plugins,
            scripts,
            plugin_targets,
        }
    }

    /// All targets of a project: script-derived, then plugin, then declared.
    ///
    /// Checks the filesystem for a package manifest, so this blocks.
    pub fn merged_targets(&self, node: &ProjectGraphNode) -> Result<Targets, ExecutorError> {
        let project_dir = self.workspace_root.join(&node.data.root);

        let mut targets = if project_dir.join(PACKAGE_MANIFEST).exists() {
            self.scripts.script_targets(&project_dir)?
        } else {
            Targets::new()
        };

        let from_plugins = self
            .plugin_targets
            .plugin_targets(&node.data.root, self.plugins)?;
        targets.extend(from_plugins);
        targets.extend(node.data.targets.clone());

        debug!(project = %node.name, targets = targets.len(), "merged project targets");
        Ok(targets)
    }

    /// The `module:name` executor reference of a task's target
    pub fn get_executor_name_for_task(
        &self,
        task: &Task,
        project_graph: &ProjectGraph,
    ) -> Result<String, ExecutorError> {
        let project = &task.target.project;
        let node = project_graph
            .node(project)
            .ok_or_else(|| ExecutorError::ProjectNotFound(project.clone()))?;

        let targets = self.merged_targets(node)?;
        let target = targets
            .get(&task.target.target)
            .ok_or_else(|| ExecutorError::TargetNotFound {
                project: project.clone(),
                target: task.target.target.clone(),
            })?;

        target
            .executor
            .clone()
            .ok_or_else(|| ExecutorError::MissingExecutor(task.id.clone()))
    }

    /// Resolve the executor definition of a task through the registry
    pub fn get_executor_for_task(
        &self,
        task: &Task,
        registry: &dyn ExecutorRegistry,
        project_graph: &ProjectGraph,
    ) -> Result<ExecutorDefinition, ExecutorError> {
        let executor = self.get_executor_name_for_task(task, project_graph)?;
        let (module, name) = split_executor_name(&executor)?;
        debug!(task = %task.id, module, name, "reading executor");
        registry.read_executor(module, name)
    }

    /// The executor's custom hasher, or `None` to use default hashing
    pub fn get_custom_hasher(
        &self,
        task: &Task,
        registry: &dyn ExecutorRegistry,
        project_graph: &ProjectGraph,
    ) -> Result<Option<Box<dyn TaskHasher>>, ExecutorError> {
        let executor = self.get_executor_for_task(task, registry, project_graph)?;
        Ok(executor.hasher_factory.map(|factory| factory()))
    }
}

/// Split `module:name`; anything after a second `:` is ignored
pub fn split_executor_name(executor: &str) -> Result<(&str, &str), ExecutorError> {
    let mut parts = executor.split(':');
    match (parts.next(), parts.next()) {
        (Some(module), Some(name)) if !module.is_empty() && !name.is_empty() => Ok((module, name)),
        _ => Err(ExecutorError::InvalidExecutorName(executor.to_string())),
    }
}

/// Errors while resolving executors
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// Project missing from the graph
    #[error("Project '{0}' not found in project graph")]
    ProjectNotFound(String),

    /// Target missing from the project, even after merging inferred targets
    #[error("Cannot find target '{target}' for project '{project}'")]
    TargetNotFound { project: String, target: String },

    /// Target declares no executor
    #[error("Task '{0}' has no executor")]
    MissingExecutor(String),

    /// Executor reference not in `module:name` form
    #[error("Invalid executor '{0}', expected 'module:name'")]
    InvalidExecutorName(String),

    /// Package manifest could not be parsed
    #[error("Failed to parse manifest {0}: {1}")]
    Manifest(PathBuf, String),

    /// Registry failure
    #[error("Executor registry error: {0}")]
    Registry(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Overrides, TargetReference};
    use orbiter_core::ProjectConfiguration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct StaticPlugins(Targets);

    impl PluginTargets for StaticPlugins {
        fn plugin_targets(&self, _project_root: &str, plugins: &[String]) -> Result<Targets, ExecutorError> {
            if plugins.is_empty() {
                return Ok(Targets::new());
            }
            Ok(self.0.clone())
        }
    }

    struct FixedHasher;

    impl TaskHasher for FixedHasher {
        fn hash_task(&self, task: &Task) -> Result<String, ExecutorError> {
            Ok(format!("hash:{}", task.id))
        }
    }

    struct TestRegistry {
        reads: AtomicUsize,
    }

    impl ExecutorRegistry for TestRegistry {
        fn read_executor(&self, module: &str, name: &str) -> Result<ExecutorDefinition, ExecutorError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let hasher_factory: Option<HasherFactory> = if module == "@orbiter/jest" {
                Some(Arc::new(|| Box::new(FixedHasher) as Box<dyn TaskHasher>))
            } else {
                None
            };
            match module {
                "@orbiter/jest" | "@orbiter/js" | "nx" => Ok(ExecutorDefinition {
                    module: module.to_string(),
                    name: name.to_string(),
                    hasher_factory,
                }),
                other => Err(ExecutorError::Registry(format!("unknown module {}", other))),
            }
        }
    }

    fn registry() -> TestRegistry {
        TestRegistry {
            reads: AtomicUsize::new(0),
        }
    }

    fn project_graph() -> ProjectGraph {
        ProjectGraph::new().with_node(ProjectGraphNode::new(
            "web",
            ProjectConfiguration::new("apps/web")
                .with_target("build", TargetConfiguration::new("@orbiter/js:tsc"))
                .with_target("test", TargetConfiguration::new("@orbiter/jest:jest")),
        ))
    }

    fn write_manifest(root: &Path, project_root: &str) {
        let dir = root.join(project_root);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(PACKAGE_MANIFEST),
            r#"{"name": "web", "scripts": {"build": "vite build", "lint": "eslint ."}}"#,
        )
        .unwrap();
    }

    fn task(target: &str) -> Task {
        Task::new(TargetReference::new("web", target), Overrides::new())
    }

    #[test]
    fn test_declared_executor() {
        let temp = TempDir::new().unwrap();
        let plugins: Vec<String> = Vec::new();
        let lookup = ExecutorLookup::new(temp.path(), &plugins, &PackageJsonScripts, &NoPluginTargets);

        let name = lookup
            .get_executor_name_for_task(&task("build"), &project_graph())
            .unwrap();
        assert_eq!(name, "@orbiter/js:tsc");
    }

    #[test]
    fn test_script_targets_fill_gaps_only() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "apps/web");
        let plugins: Vec<String> = Vec::new();
        let lookup = ExecutorLookup::new(temp.path(), &plugins, &PackageJsonScripts, &NoPluginTargets);
        let graph = project_graph();

        assert_eq!(
            lookup.get_executor_name_for_task(&task("build"), &graph).unwrap(),
            "@orbiter/js:tsc"
        );
        assert_eq!(
            lookup.get_executor_name_for_task(&task("lint"), &graph).unwrap(),
            RUN_SCRIPT_EXECUTOR
        );

        let targets = lookup.merged_targets(graph.node("web").unwrap()).unwrap();
        assert_eq!(targets["lint"].options["script"], "lint");
    }

    #[test]
    fn test_plugin_targets_override_scripts_not_declared() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "apps/web");
        let mut contributed = Targets::new();
        contributed.insert("lint".to_string(), TargetConfiguration::new("@orbiter/eslint:lint"));
        contributed.insert("test".to_string(), TargetConfiguration::new("@orbiter/vite:test"));
        let plugin_source = StaticPlugins(contributed);
        let plugins = vec!["@orbiter/eslint".to_string()];
        let lookup = ExecutorLookup::new(temp.path(), &plugins, &PackageJsonScripts, &plugin_source);
        let graph = project_graph();

        assert_eq!(
            lookup.get_executor_name_for_task(&task("lint"), &graph).unwrap(),
            "@orbiter/eslint:lint"
        );
        assert_eq!(
            lookup.get_executor_name_for_task(&task("test"), &graph).unwrap(),
            "@orbiter/jest:jest"
        );
    }

    #[test]
    fn test_unknown_target() {
        let temp = TempDir::new().unwrap();
        let plugins: Vec<String> = Vec::new();
        let lookup = ExecutorLookup::new(temp.path(), &plugins, &PackageJsonScripts, &NoPluginTargets);
        let err = lookup
            .get_executor_name_for_task(&task("deploy"), &project_graph())
            .unwrap_err();
        assert!(matches!(err, ExecutorError::TargetNotFound { .. }));
    }

    #[test]
    fn test_custom_hasher() {
        let temp = TempDir::new().unwrap();
        let plugins: Vec<String> = Vec::new();
        let lookup = ExecutorLookup::new(temp.path(), &plugins, &PackageJsonScripts, &NoPluginTargets);
        let registry = registry();
        let graph = project_graph();

        let hasher = lookup
            .get_custom_hasher(&task("test"), &registry, &graph)
            .unwrap()
            .expect("jest provides a hasher");
        assert_eq!(hasher.hash_task(&task("test")).unwrap(), "hash:web:test");

        let none = lookup.get_custom_hasher(&task("build"), &registry, &graph).unwrap();
        assert!(none.is_none());
        assert_eq!(registry.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_executor_definition() {
        let temp = TempDir::new().unwrap();
        let plugins: Vec<String> = Vec::new();
        let lookup = ExecutorLookup::new(temp.path(), &plugins, &PackageJsonScripts, &NoPluginTargets);

        let executor = lookup
            .get_executor_for_task(&task("build"), &registry(), &project_graph())
            .unwrap();
        assert_eq!(executor.module, "@orbiter/js");
        assert_eq!(executor.name, "tsc");
        assert!(executor.hasher_factory.is_none());
    }

    #[test]
    fn test_split_executor_name() {
        assert_eq!(split_executor_name("nx:run-commands").unwrap(), ("nx", "run-commands"));
        assert_eq!(split_executor_name("a:b:c").unwrap(), ("a", "b"));
        assert!(split_executor_name("run-commands").is_err());
        assert!(split_executor_name(":x").is_err());
    }

    #[test]
    fn test_invalid_manifest() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(PACKAGE_MANIFEST), "{ not json").unwrap();
        let err = PackageJsonScripts.script_targets(temp.path()).unwrap_err();
        assert!(matches!(err, ExecutorError::Manifest(..)));
    }
}
