//! Command command - render the command line of a task

use clap::Args;
use tracing::info;

use orbiter_tasks::{get_command_as_string, get_serialized_args_for_task, Task};

use super::parse_target_reference;
use crate::cli::{output, Cli, OutputFormat};

/// Show the command line that runs a task
#[derive(Debug, Args)]
pub struct CommandCommand {
    /// Task to render (project:target[:configuration])
    pub target: String,

    /// Executable placed in front of the runner
    #[arg(long, default_value = "npx")]
    pub exec: String,

    /// Raw arguments forwarded to the task
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl CommandCommand {
    /// Execute the command command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(target = %self.target, "executing command command");
        let reference = parse_target_reference(&self.target)?;
        let task = Task::with_unparsed_args(reference, self.args.iter().cloned());
        let command = get_command_as_string(&self.exec, &task);

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "task": task.id,
                    "command": command,
                    "serializedArgs": get_serialized_args_for_task(&task, cli.verbose)?,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if cli.verbose && !cli.quiet {
                    output::info(&format!("Command for {}", task.id));
                }
                println!("{}", command);
            }
        }

        Ok(())
    }
}
