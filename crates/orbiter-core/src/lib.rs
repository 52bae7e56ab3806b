//! Orbiter Core - Core library for task orchestration
//!
//! This crate provides the foundational types, error handling and configuration
//! shared by the Orbiter task engine: the project graph model, target
//! configuration, and the workspace runner configuration.

pub mod config;
pub mod error;
pub mod project;

pub use config::{
    load_config, load_config_or_default, OutputValidation, OutputsConfig, TargetDefaults,
    TasksRunnerConfig, WorkspaceConfig,
};
pub use error::{ConfigError, OrbiterError, Result};
pub use project::{
    DependsOn, ProjectConfiguration, ProjectGraph, ProjectGraphDependency, ProjectGraphNode,
    TargetConfiguration, TargetDependencyConfig,
};
