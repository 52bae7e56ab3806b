//! Project graph model consumed by the task engine
//!
//! The project graph itself is produced elsewhere (workspace discovery); this
//! module only defines its read-only shape and the target configuration each
//! project carries.

pub mod graph;
pub mod target;

pub use graph::{ProjectConfiguration, ProjectGraph, ProjectGraphDependency, ProjectGraphNode};
pub use target::{DependsOn, TargetConfiguration, TargetDependencyConfig};
