//! Output resolution for tasks
//!
//! Determines the workspace-relative paths a task produces, which is what a
//! cache captures and restores. Declared outputs are templates; projects that
//! still declare plain paths are migrated into templated form on the fly.

use std::fmt;
use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use orbiter_core::project::target::TargetOptions;
use orbiter_core::{OutputValidation, ProjectGraphNode, TargetConfiguration};

use crate::interpolate::{interpolate, is_truthy, render, InterpolationContext, InterpolationError};
use crate::task::Task;

/// A valid output opens with a template expression
static TEMPLATED_OUTPUT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{[\s\S]+\}").expect("Invalid regex"));

/// An interpolated output still carrying an unresolved expression
static UNRESOLVED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{.*\}").expect("Invalid regex"));

/// Outputs that contain entries not written as templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOutputs {
    /// The full declared list
    pub outputs: Vec<String>,
    /// Entries that do not start with a template expression
    pub invalid: IndexSet<String>,
}

impl fmt::Display for InvalidOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The following outputs are invalid:")?;
        for output in &self.invalid {
            write!(f, "\n - {}", output)?;
        }
        write!(f, "\nPlease run \"orbiter repair\" to repair your configuration")
    }
}

/// Result of checking declared outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputsCheck {
    /// Every entry is templated
    Valid(Vec<String>),
    /// Some entries need migrating
    Invalid(InvalidOutputs),
}

/// Check that every output opens with a `{...}` expression
pub fn validate_outputs(outputs: &[String]) -> OutputsCheck {
    let invalid: IndexSet<String> = outputs
        .iter()
        .filter(|output| !TEMPLATED_OUTPUT_REGEX.is_match(output))
        .cloned()
        .collect();

    if invalid.is_empty() {
        OutputsCheck::Valid(outputs.to_vec())
    } else {
        OutputsCheck::Invalid(InvalidOutputs {
            outputs: outputs.to_vec(),
            invalid,
        })
    }
}

/// Rewrite legacy output entries into templated form.
///
/// Relative entries are taken as relative to the project root; absolute ones
/// are relativized against it. Entries inside the project become
/// `{projectRoot}/<path>`, anything escaping it becomes
/// `{workspaceRoot}/<original>`. Valid entries pass through untouched.
pub fn transform_legacy_outputs(project_root: &str, invalid: &InvalidOutputs) -> Vec<String> {
    invalid
        .outputs
        .iter()
        .map(|output| {
            if !invalid.invalid.contains(output) {
                return output.clone();
            }

            let relative = if is_absolute(output) {
                relative_path(&format!("/{}", project_root), output)
            } else {
                output.clone()
            };

            if relative.starts_with("..") {
                join_path_fragments("{workspaceRoot}", output)
            } else {
                join_path_fragments("{projectRoot}", &relative)
            }
        })
        .collect()
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.starts_with('\\')
}

/// Split a path into normalized segments, collapsing `.` and inner `..`
fn segments(path: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => match out.last() {
                Some(&last) if last != ".." => {
                    out.pop();
                }
                _ => out.push(".."),
            },
            s => out.push(s),
        }
    }
    out
}

/// Lexical relative path between two absolute paths
fn relative_path(from: &str, to: &str) -> String {
    let from: Vec<&str> = segments(from).into_iter().filter(|s| *s != "..").collect();
    let to: Vec<&str> = segments(to).into_iter().filter(|s| *s != "..").collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend_from_slice(&to[common..]);
    parts.join("/")
}

/// Join a template token with a path, normalized to forward slashes
fn join_path_fragments(token: &str, path: &str) -> String {
    let rest = segments(path);
    if rest.is_empty() {
        token.to_string()
    } else {
        format!("{}/{}", token, rest.join("/"))
    }
}

/// Resolves the outputs of tasks
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputResolver {
    validation: OutputValidation,
}

impl OutputResolver {
    /// Create a resolver with the given legacy-output handling
    pub fn new(validation: OutputValidation) -> Self {
        Self { validation }
    }

    /// Returns the list of outputs that will be cached for `task` on `node`
    pub fn resolve(&self, task: &Task, node: &ProjectGraphNode) -> Result<Vec<String>, OutputsError> {
        let target_name = &task.target.target;
        let target = node
            .target(target_name)
            .ok_or_else(|| OutputsError::TargetNotFound {
                project: node.name.clone(),
                target: target_name.clone(),
            })?;

        let options = effective_options(task, target);

        if let Some(declared) = &target.outputs {
            let outputs = match validate_outputs(declared) {
                OutputsCheck::Valid(outputs) => outputs,
                OutputsCheck::Invalid(invalid) => self.migrate(task, node, invalid)?,
            };

            let ctx = InterpolationContext::for_node(node, &options);
            let mut resolved = Vec::with_capacity(outputs.len());
            for output in &outputs {
                let path = interpolate(output, &ctx)?;
                if path.is_empty() || UNRESOLVED_REGEX.is_match(&path) {
                    debug!(task = %task.id, output = %output, "dropping unresolved output");
                    continue;
                }
                resolved.push(path);
            }
            return Ok(resolved);
        }

        // Projects without declared outputs
        if let Some(output_path) = options.get("outputPath").filter(|v| is_truthy(v)) {
            return Ok(match output_path {
                Value::Array(items) => items.iter().map(render).collect(),
                other => vec![render(other)],
            });
        }

        if target_name == "build" || target_name == "prepare" {
            let root = &node.data.root;
            return Ok(vec![
                format!("dist/{}", root),
                format!("{}/dist", root),
                format!("{}/build", root),
                format!("{}/public", root),
            ]);
        }

        Ok(Vec::new())
    }

    fn migrate(
        &self,
        task: &Task,
        node: &ProjectGraphNode,
        invalid: InvalidOutputs,
    ) -> Result<Vec<String>, OutputsError> {
        match self.validation {
            OutputValidation::Strict => Err(OutputsError::InvalidOutputs(invalid)),
            OutputValidation::Warn => {
                warn!(task = %task.id, "{}", invalid);
                Ok(transform_legacy_outputs(&node.data.root, &invalid))
            }
            OutputValidation::Migrate => {
                debug!(task = %task.id, count = invalid.invalid.len(), "migrating legacy outputs");
                Ok(transform_legacy_outputs(&node.data.root, &invalid))
            }
        }
    }
}

/// Merge options: target options, then the named configuration, then task overrides
fn effective_options(task: &Task, target: &TargetConfiguration) -> TargetOptions {
    let mut options = target.options.clone();
    if let Some(overrides) = task
        .target
        .configuration
        .as_ref()
        .and_then(|name| target.configurations.get(name))
    {
        options.extend(overrides.clone());
    }
    options.extend(task.overrides.clone());
    options
}

/// Returns the list of outputs that will be cached, migrating legacy outputs silently
pub fn get_outputs_for_target_and_configuration(
    task: &Task,
    node: &ProjectGraphNode,
) -> Result<Vec<String>, OutputsError> {
    OutputResolver::default().resolve(task, node)
}

/// Resolve outputs for a task by looking up its project in `nodes`
pub fn get_outputs(
    nodes: &IndexMap<String, ProjectGraphNode>,
    task: &Task,
) -> Result<Vec<String>, OutputsError> {
    let node = nodes
        .get(&task.target.project)
        .ok_or_else(|| OutputsError::ProjectNotFound(task.target.project.clone()))?;
    get_outputs_for_target_and_configuration(task, node)
}

/// Errors while resolving outputs
#[derive(Debug, thiserror::Error)]
pub enum OutputsError {
    /// Project missing from the graph
    #[error("Project '{0}' not found in project graph")]
    ProjectNotFound(String),

    /// Target missing from the project
    #[error("Cannot find target '{target}' for project '{project}'")]
    TargetNotFound { project: String, target: String },

    /// An output template was malformed
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    /// Legacy outputs rejected in strict mode
    #[error("{0}")]
    InvalidOutputs(InvalidOutputs),
}
