//! Orbiter Tasks - Task graph construction and scheduling policy
//!
//! Turns the project graph plus target configuration into schedulable work:
//! - Output interpolation and legacy output migration
//! - dependsOn expansion and task graph construction
//! - Graph algebra: removal, reverse dependencies, execution waves
//! - Streaming and cacheability decisions
//! - Executor and custom hasher lookup

pub mod dependency;
pub mod executor;
pub mod graph;
pub mod interpolate;
pub mod outputs;
pub mod policy;
pub mod task;

pub use dependency::{
    expand_dependency_config_syntax_sugar, get_dependency_configs, DependencyConfig,
    DependencyConfigError, DependencyScope,
};
pub use executor::{
    ExecutorDefinition, ExecutorError, ExecutorLookup, ExecutorRegistry, HasherFactory,
    NoPluginTargets, PackageJsonScripts, PackageScriptSource, PluginTargets, TaskHasher,
};
pub use graph::{
    calculate_reverse_deps, remove_tasks_from_task_graph, TaskGraph, TaskGraphBuilder,
    TaskGraphError,
};
pub use interpolate::{interpolate, InterpolationContext, InterpolationError};
pub use outputs::{
    get_outputs, get_outputs_for_target_and_configuration, transform_legacy_outputs,
    validate_outputs, InvalidOutputs, OutputResolver, OutputsCheck, OutputsError,
};
pub use policy::{
    get_command_as_string, get_printable_command_args_for_task, get_serialized_args_for_task,
    is_cacheable_task, should_stream_output, PolicyOptions, SchedulingPolicy,
};
pub use task::{Overrides, TargetReference, Task};
