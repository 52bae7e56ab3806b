//! Graph command - build a task graph and show how it would be scheduled

use clap::Args;
use console::style;
use tracing::info;

use orbiter_tasks::task::OVERRIDES_UNPARSED;
use orbiter_tasks::{
    calculate_reverse_deps, remove_tasks_from_task_graph, ExecutorLookup, NoPluginTargets,
    Overrides, PackageJsonScripts, PolicyOptions, SchedulingPolicy, Task, TaskGraph,
    TaskGraphBuilder,
};

use super::Workspace;
use crate::cli::{output, Cli, OutputFormat};

/// Build the task graph for targets and show its execution waves
#[derive(Debug, Args)]
pub struct GraphCommand {
    /// Targets to run (e.g., build test)
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Projects to run the targets on (default: all projects)
    #[arg(long, value_delimiter = ',')]
    pub projects: Vec<String>,

    /// Configuration to run the targets with
    #[arg(short, long)]
    pub configuration: Option<String>,

    /// Project the run was started from; its tasks stream their output
    #[arg(long)]
    pub initiating_project: Option<String>,

    /// Task ids to leave out of the graph (can be repeated)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Raw arguments forwarded to the requested tasks
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl GraphCommand {
    /// Execute the graph command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            targets = ?self.targets,
            projects = self.projects.len(),
            "executing graph command"
        );
        let workspace = Workspace::load(cli)?;

        let projects: Vec<String> = if self.projects.is_empty() {
            workspace.project_graph.nodes.keys().cloned().collect()
        } else {
            self.projects.clone()
        };

        let defaults = workspace.config.default_dependency_configs();
        let mut overrides = Overrides::new();
        overrides.insert(
            OVERRIDES_UNPARSED.to_string(),
            serde_json::Value::from(self.args.clone()),
        );

        let graph = TaskGraphBuilder::new(&workspace.project_graph, &defaults).build(
            &projects,
            &self.targets,
            self.configuration.as_deref(),
            &overrides,
        )?;
        let graph = if self.exclude.is_empty() {
            graph
        } else {
            remove_tasks_from_task_graph(&graph, &self.exclude)
        };
        graph.validate()?;

        let policy = SchedulingPolicy::new(
            PolicyOptions::from(&workspace.config.tasks_runner),
            self.initiating_project.clone(),
        );
        let lookup = ExecutorLookup::new(
            &workspace.root,
            &workspace.config.plugins,
            &PackageJsonScripts,
            &NoPluginTargets,
        );
        let executor_of = |task: &Task| {
            lookup
                .get_executor_name_for_task(task, &workspace.project_graph)
                .ok()
        };

        match cli.format {
            OutputFormat::Json => print_json(&graph, &policy, executor_of),
            OutputFormat::Text => {
                if !cli.quiet {
                    print_text(&graph, &policy, executor_of, cli.verbose, projects.len())?;
                }
                Ok(())
            }
        }
    }
}

fn print_json(
    graph: &TaskGraph,
    policy: &SchedulingPolicy,
    executor_of: impl Fn(&Task) -> Option<String>,
) -> anyhow::Result<()> {
    let dependents = calculate_reverse_deps(graph);
    let waves: Vec<serde_json::Value> = graph
        .waves()?
        .iter()
        .enumerate()
        .map(|(i, wave)| {
            serde_json::json!({
                "wave": i,
                "tasks": wave
                    .iter()
                    .filter_map(|id| graph.get(id))
                    .map(|task| serde_json::json!({
                        "id": task.id,
                        "executor": executor_of(task),
                        "dependencies": graph.dependencies_of(&task.id),
                        "dependents": dependents.get(&task.id).cloned().unwrap_or_default(),
                        "stream": policy.should_stream_output(task),
                        "cacheable": policy.is_cacheable(task),
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "roots": graph.roots,
        "waves": waves,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_text(
    graph: &TaskGraph,
    policy: &SchedulingPolicy,
    executor_of: impl Fn(&Task) -> Option<String>,
    verbose: bool,
    project_count: usize,
) -> anyhow::Result<()> {
    if graph.is_empty() {
        println!("{} No tasks to run.", style("✓").green());
        return Ok(());
    }

    output::info(&format!(
        "{} task{} across {} project{}",
        graph.len(),
        output::plural(graph.len()),
        project_count,
        output::plural(project_count),
    ));
    println!();

    if verbose {
        println!("{}", graph.execution_plan()?);
    }

    for (i, wave) in graph.waves()?.iter().enumerate() {
        println!(
            "{}",
            output::header(&format!("Wave {} ({} task{})", i, wave.len(), output::plural(wave.len())))
        );
        for task in wave.iter().filter_map(|id| graph.get(id)) {
            let mut flags = Vec::new();
            if policy.should_stream_output(task) {
                flags.push("stream");
            }
            if policy.is_cacheable(task) {
                flags.push("cache");
            }

            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" {}", output::flag_style().apply_to(format!("[{}]", flags.join(", "))))
            };
            println!("  {}{}", output::task_style().apply_to(&task.id), flags);

            if verbose {
                if let Some(executor) = executor_of(task) {
                    println!("  {}", output::key_value("executor", &executor));
                }
            }
        }
    }

    Ok(())
}
