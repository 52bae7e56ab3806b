//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::{CommandCommand, GraphCommand, OutputsCommand};

/// Orbiter - Inspect task graphs, outputs and commands of a workspace
#[derive(Debug, Parser)]
#[command(name = "orbiter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Serialized project graph, relative to the working directory
    #[arg(long, global = true, default_value = "project-graph.json")]
    pub graph: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the task graph for targets and show its execution waves
    Graph(GraphCommand),

    /// Show the resolved outputs of a task
    Outputs(OutputsCommand),

    /// Show the command line that runs a task
    Command(CommandCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Graph(ref cmd) => cmd.execute(&self),
            Commands::Outputs(ref cmd) => cmd.execute(&self),
            Commands::Command(ref cmd) => cmd.execute(&self),
        }
    }
}
