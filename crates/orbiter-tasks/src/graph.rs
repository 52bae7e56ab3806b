//! Task graph construction and algebra

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use orbiter_core::{DependsOn, ProjectGraph, TargetConfiguration};

use crate::dependency::{get_dependency_configs, DependencyConfigError, DependencyScope};
use crate::task::{Overrides, TargetReference, Task};

/// Directed acyclic graph of tasks.
///
/// Every id referenced in `dependencies` is a key of `tasks`, and `roots` are
/// exactly the tasks without dependencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
    /// Tasks without dependencies
    pub roots: Vec<String>,
    /// All tasks by id
    pub tasks: IndexMap<String, Task>,
    /// Ids each task depends on
    pub dependencies: IndexMap<String, Vec<String>>,
}

impl TaskGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a task by id
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Ids `id` depends on
    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Get the total number of tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove tasks and every edge pointing at them
    pub fn remove_tasks<I, S>(&self, ids: I) -> TaskGraph
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        remove_tasks_from_task_graph(self, ids)
    }

    /// Dependents of each task
    pub fn reverse_dependencies(&self) -> IndexMap<String, Vec<String>> {
        calculate_reverse_deps(self)
    }

    fn insert_task(&mut self, task: Task) {
        self.dependencies.entry(task.id.clone()).or_default();
        self.tasks.insert(task.id.clone(), task);
    }

    fn insert_edge(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        let deps = self.dependencies.entry(from.to_string()).or_default();
        if !deps.iter().any(|d| d == to) {
            deps.push(to.to_string());
        }
    }

    fn recompute_roots(&mut self) {
        self.roots = self
            .dependencies
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
    }

    /// Check the structural invariants of the graph
    pub fn validate(&self) -> Result<(), TaskGraphError> {
        for (id, deps) in &self.dependencies {
            if !self.tasks.contains_key(id) {
                return Err(TaskGraphError::UnknownTask(id.clone()));
            }
            if let Some(dep) = deps.iter().find(|d| !self.tasks.contains_key(*d)) {
                return Err(TaskGraphError::DanglingDependency {
                    task: id.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        let expected: HashSet<&str> = self
            .tasks
            .keys()
            .filter(|id| self.dependencies_of(id).is_empty())
            .map(String::as_str)
            .collect();
        let actual: HashSet<&str> = self.roots.iter().map(String::as_str).collect();
        if expected != actual || actual.len() != self.roots.len() {
            return Err(TaskGraphError::InconsistentRoots);
        }

        Ok(())
    }

    /// Topological sort using Kahn's algorithm (dependencies first)
    #[instrument(skip_all, fields(task_count = self.tasks.len()))]
    pub fn topological_order(&self) -> Result<Vec<String>, TaskGraphError> {
        let reverse = self.reverse_dependencies();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut sorted: Vec<String> = Vec::new();

        for id in self.tasks.keys() {
            let degree = self
                .dependencies_of(id)
                .iter()
                .filter(|d| self.tasks.contains_key(*d))
                .count();
            in_degree.insert(id, degree);
            if degree == 0 {
                queue.push_back(id);
            }
        }

        while let Some(id) = queue.pop_front() {
            sorted.push(id.to_string());

            for dependent in reverse.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if sorted.len() != self.tasks.len() {
            let in_sorted: HashSet<&str> = sorted.iter().map(String::as_str).collect();
            let cyclic: Vec<&str> = self
                .tasks
                .keys()
                .map(String::as_str)
                .filter(|id| !in_sorted.contains(id))
                .collect();
            return Err(TaskGraphError::CyclicDependency(cyclic.join(", ")));
        }

        Ok(sorted)
    }

    /// Group tasks into execution waves.
    ///
    /// Tasks in the same wave may run concurrently; wave `n` only starts once
    /// every task of earlier waves has finished.
    #[instrument(skip_all, fields(task_count = self.tasks.len()))]
    pub fn waves(&self) -> Result<Vec<Vec<String>>, TaskGraphError> {
        let sorted = self.topological_order()?;
        let mut wave_map: HashMap<&str, usize> = HashMap::new();

        for id in &sorted {
            let wave = self
                .dependencies_of(id)
                .iter()
                .filter_map(|dep| wave_map.get(dep.as_str()))
                .max()
                .map(|w| w + 1)
                .unwrap_or(0);
            wave_map.insert(id, wave);
        }

        let wave_count = wave_map.values().max().map(|w| w + 1).unwrap_or(0);
        let mut waves: Vec<Vec<String>> = vec![Vec::new(); wave_count];
        for id in &sorted {
            if let Some(&wave) = wave_map.get(id.as_str()) {
                waves[wave].push(id.clone());
            }
        }

        Ok(waves)
    }

    /// Get a human-readable summary of the execution plan
    pub fn execution_plan(&self) -> Result<String, TaskGraphError> {
        let mut plan = String::new();
        for (i, wave) in self.waves()?.iter().enumerate() {
            plan.push_str(&format!("Wave {} ({} tasks):\n", i, wave.len()));
            for id in wave {
                let deps = self.dependencies_of(id);
                if deps.is_empty() {
                    plan.push_str(&format!("  {}\n", id));
                } else {
                    plan.push_str(&format!("  {} (after: {})\n", id, deps.join(", ")));
                }
            }
        }
        Ok(plan)
    }
}

/// Remove `ids` from `graph`, returning a new graph.
///
/// Edges pointing at removed tasks are dropped and roots are recomputed, so
/// tasks whose only dependencies were removed become roots.
#[instrument(skip_all, fields(task_count = graph.tasks.len()))]
pub fn remove_tasks_from_task_graph<I, S>(graph: &TaskGraph, ids: I) -> TaskGraph
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let removed: HashSet<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();

    let mut tasks = IndexMap::new();
    let mut dependencies = IndexMap::new();
    for (id, task) in &graph.tasks {
        if removed.contains(id) {
            continue;
        }
        tasks.insert(id.clone(), task.clone());
        let deps: Vec<String> = graph
            .dependencies_of(id)
            .iter()
            .filter(|dep| !removed.contains(*dep))
            .cloned()
            .collect();
        dependencies.insert(id.clone(), deps);
    }

    let mut result = TaskGraph {
        roots: Vec::new(),
        tasks,
        dependencies,
    };
    result.recompute_roots();
    debug!(removed = removed.len(), remaining = result.tasks.len(), "removed tasks from graph");
    result
}

/// Invert the dependency edges: for each task, the tasks that depend on it.
///
/// Every task gets an entry; dependents are listed in the iteration order of
/// the forward dependency map.
pub fn calculate_reverse_deps(graph: &TaskGraph) -> IndexMap<String, Vec<String>> {
    let mut reverse: IndexMap<String, Vec<String>> = graph
        .tasks
        .keys()
        .map(|id| (id.clone(), Vec::new()))
        .collect();

    for (id, deps) in &graph.dependencies {
        for dep in deps {
            if let Some(dependents) = reverse.get_mut(dep) {
                dependents.push(id.clone());
            }
        }
    }

    reverse
}

/// Expands requested targets into a task graph using dependsOn rules
pub struct TaskGraphBuilder<'a> {
    project_graph: &'a ProjectGraph,
    default_dependency_configs: &'a IndexMap<String, Vec<DependsOn>>,
    graph: TaskGraph,
}

impl<'a> TaskGraphBuilder<'a> {
    /// Create a builder over a project graph and the workspace dependsOn defaults
    pub fn new(
        project_graph: &'a ProjectGraph,
        default_dependency_configs: &'a IndexMap<String, Vec<DependsOn>>,
    ) -> Self {
        Self {
            project_graph,
            default_dependency_configs,
            graph: TaskGraph::new(),
        }
    }

    /// Build the task graph for `targets` on `projects`.
    ///
    /// Requested tasks carry `overrides`; tasks pulled in through dependsOn
    /// carry none. Projects that do not declare a requested target are skipped.
    #[instrument(skip_all, fields(projects = projects.len(), targets = targets.len()))]
    pub fn build(
        mut self,
        projects: &[String],
        targets: &[String],
        configuration: Option<&str>,
        overrides: &Overrides,
    ) -> Result<TaskGraph, TaskGraphError> {
        let project_graph = self.project_graph;

        // Requested tasks exist before any expansion so dependency links reuse them
        let mut requested: Vec<(String, &str, &str, Option<String>)> = Vec::new();
        for project in projects {
            let node = project_graph
                .node(project)
                .ok_or_else(|| TaskGraphError::ProjectNotFound(project.clone()))?;

            for target in targets {
                let Some(target_config) = node.target(target) else {
                    debug!(project = %project, target = %target, "project does not declare target");
                    continue;
                };

                let mut reference = TargetReference::new(project, target);
                reference.configuration = resolve_configuration(target_config, configuration);

                let task = Task::new(reference, overrides.clone());
                if self.graph.tasks.contains_key(&task.id) {
                    continue;
                }
                requested.push((
                    task.id.clone(),
                    project.as_str(),
                    target.as_str(),
                    task.target.configuration.clone(),
                ));
                self.graph.insert_task(task);
            }
        }

        for (id, project, target, configuration) in requested {
            self.add_dependencies(&id, project, target, configuration)?;
        }

        self.graph.recompute_roots();
        self.graph.topological_order()?;

        info!(
            task_count = self.graph.len(),
            root_count = self.graph.roots.len(),
            "task graph built"
        );
        Ok(self.graph)
    }

    fn add_dependencies(
        &mut self,
        task_id: &str,
        project: &str,
        target: &str,
        configuration: Option<String>,
    ) -> Result<(), TaskGraphError> {
        let configs = get_dependency_configs(
            project,
            target,
            self.default_dependency_configs,
            self.project_graph,
        )?;

        for config in configs {
            match config.projects {
                DependencyScope::SameProject => {
                    self.link(task_id, project, &config.target, configuration.as_deref())?;
                }
                DependencyScope::Dependencies => {
                    let mut visited = HashSet::new();
                    visited.insert(project.to_string());
                    let deps: Vec<String> = self
                        .project_graph
                        .project_dependencies(project)
                        .into_iter()
                        .map(String::from)
                        .collect();
                    for dep in deps {
                        self.link_through(
                            task_id,
                            &dep,
                            &config.target,
                            configuration.as_deref(),
                            &mut visited,
                        )?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Link to `target` on `project`, or walk through to its dependencies
    /// when it does not declare that target
    fn link_through(
        &mut self,
        task_id: &str,
        project: &str,
        target: &str,
        configuration: Option<&str>,
        visited: &mut HashSet<String>,
    ) -> Result<(), TaskGraphError> {
        if !visited.insert(project.to_string()) {
            return Ok(());
        }

        let declares_target = self
            .project_graph
            .node(project)
            .is_some_and(|node| node.has_target(target));

        if declares_target {
            return self.link(task_id, project, target, configuration);
        }

        let deps: Vec<String> = self
            .project_graph
            .project_dependencies(project)
            .into_iter()
            .map(String::from)
            .collect();
        for dep in deps {
            self.link_through(task_id, &dep, target, configuration, visited)?;
        }
        Ok(())
    }

    /// Add an edge `task_id -> project:target`, creating and expanding the
    /// dependency task on first sight
    fn link(
        &mut self,
        task_id: &str,
        project: &str,
        target: &str,
        configuration: Option<&str>,
    ) -> Result<(), TaskGraphError> {
        let Some(target_config) = self
            .project_graph
            .node(project)
            .and_then(|node| node.target(target))
        else {
            return Ok(());
        };

        let mut reference = TargetReference::new(project, target);
        reference.configuration = resolve_configuration(target_config, configuration);
        let dep_task = Task::new(reference, Overrides::new());
        let dep_id = dep_task.id.clone();

        self.graph.insert_edge(task_id, &dep_id);

        if !self.graph.tasks.contains_key(&dep_id) {
            let dep_configuration = dep_task.target.configuration.clone();
            self.graph.insert_task(dep_task);
            self.add_dependencies(&dep_id, project, target, dep_configuration)?;
        }

        Ok(())
    }
}

/// Use the requested configuration only when the target declares it
fn resolve_configuration(target: &TargetConfiguration, requested: Option<&str>) -> Option<String> {
    match requested {
        Some(c) if target.configurations.contains_key(c) => Some(c.to_string()),
        _ => target.default_configuration.clone(),
    }
}

/// Errors during task graph construction and validation
#[derive(Debug, thiserror::Error)]
pub enum TaskGraphError {
    /// Cyclic dependency detected
    #[error("Cyclic dependency detected among tasks: {0}")]
    CyclicDependency(String),

    /// Requested project not in the project graph
    #[error("Project '{0}' not found in project graph")]
    ProjectNotFound(String),

    /// Dependency list for a task that is not in the graph
    #[error("Task '{0}' has dependencies but is not part of the graph")]
    UnknownTask(String),

    /// Edge to a task that is not in the graph
    #[error("Task '{task}' depends on '{dependency}' which is not part of the graph")]
    DanglingDependency { task: String, dependency: String },

    /// Roots do not match the tasks without dependencies
    #[error("Task graph roots are inconsistent with its dependencies")]
    InconsistentRoots,

    /// dependsOn could not be resolved
    #[error(transparent)]
    Dependency(#[from] DependencyConfigError),
}
