//! Outputs command

use clap::Args;
use console::style;
use tracing::info;

use orbiter_tasks::{OutputResolver, Task};

use super::{parse_target_reference, Workspace};
use crate::cli::{output, Cli, OutputFormat};

/// Show the resolved outputs of a task
#[derive(Debug, Args)]
pub struct OutputsCommand {
    /// Task to resolve (project:target[:configuration])
    pub target: String,

    /// Raw arguments forwarded to the task
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl OutputsCommand {
    /// Execute the outputs command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(target = %self.target, "executing outputs command");
        let reference = parse_target_reference(&self.target)?;
        let workspace = Workspace::load(cli)?;

        let node = workspace
            .project_graph
            .node(&reference.project)
            .ok_or_else(|| anyhow::anyhow!("Project '{}' not found in project graph", reference.project))?;

        let task = Task::with_unparsed_args(reference, self.args.iter().cloned());
        let resolver = OutputResolver::new(workspace.config.outputs.validation);
        let outputs = resolver.resolve(&task, node)?;

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "task": task.id,
                    "outputs": outputs,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!("{}", output::header(&format!("Outputs of {}", task.id)));
                    if cli.verbose {
                        println!("{}", output::key_value("root", &node.data.root));
                        println!(
                            "{}",
                            output::key_value("validation", workspace.config.outputs.validation.as_str())
                        );
                    }
                    println!();
                }

                if outputs.is_empty() {
                    if !cli.quiet {
                        println!("  {}", style("(no outputs)").dim());
                    }
                } else {
                    for path in &outputs {
                        println!("  {}", output::path_style().apply_to(path));
                    }
                }
            }
        }

        Ok(())
    }
}
