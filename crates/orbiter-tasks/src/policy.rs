//! Scheduling policy: streaming, cacheability and command rendering

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use orbiter_core::TasksRunnerConfig;

use crate::interpolate::is_truthy;
use crate::task::{Overrides, TargetReference, Task};

/// Runner binary named in printed commands
pub const RUNNER_BINARY: &str = "nx";

/// Target names of server-style tasks that never finish on their own
const LONG_RUNNING_TARGETS: [&str; 3] = ["serve", "dev", "start"];

/// Options consulted by the scheduling policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyOptions {
    /// Stream output of every task
    pub stream_output: bool,
    /// Target names whose results may be cached
    pub cacheable_targets: Vec<String>,
}

impl PolicyOptions {
    /// Build policy options from the runner configuration
    pub fn from_config(config: &TasksRunnerConfig) -> Self {
        Self {
            stream_output: config.stream_output,
            cacheable_targets: config.cacheable().to_vec(),
        }
    }
}

impl From<&TasksRunnerConfig> for PolicyOptions {
    fn from(config: &TasksRunnerConfig) -> Self {
        Self::from_config(config)
    }
}

/// Reconstruct `run project:target[:configuration] ...args` for a task.
///
/// The target is quoted when it contains `:` so it cannot be mistaken for
/// the configuration separator.
pub fn get_printable_command_args_for_task(task: &Task) -> Vec<String> {
    let target = if task.target.target.contains(':') {
        format!("\"{}\"", task.target.target)
    } else {
        task.target.target.clone()
    };

    let config = task
        .target
        .configuration
        .as_ref()
        .map(|c| format!(":{}", c))
        .unwrap_or_default();

    let mut args = vec![
        "run".to_string(),
        format!("{}:{}{}", task.target.project, target, config),
    ];
    args.extend(task.unparsed_args());
    args
}

/// Render the full command line used to run a task
pub fn get_command_as_string(exec_command: &str, task: &Task) -> String {
    let mut parts = vec![exec_command.to_string(), RUNNER_BINARY.to_string()];
    parts.extend(get_printable_command_args_for_task(task));
    parts.join(" ").trim().to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SerializedTaskArgs<'a> {
    target_description: &'a TargetReference,
    overrides: &'a Overrides,
    is_verbose: bool,
}

/// Arguments handed to a task runner process: a single JSON document
pub fn get_serialized_args_for_task(task: &Task, is_verbose: bool) -> serde_json::Result<Vec<String>> {
    let args = SerializedTaskArgs {
        target_description: &task.target,
        overrides: &task.overrides,
        is_verbose,
    };
    Ok(vec![serde_json::to_string(&args)?])
}

/// Whether a task's output is shown live rather than replayed
pub fn should_stream_output(task: &Task, initiating_project: Option<&str>, options: &PolicyOptions) -> bool {
    let stream = options.stream_output
        || is_long_running(task)
        || initiating_project == Some(task.target.project.as_str());
    debug!(task = %task.id, stream, "stream output decision");
    stream
}

/// Whether a task's results may be cached
pub fn is_cacheable_task(task: &Task, options: &PolicyOptions) -> bool {
    let cacheable = options
        .cacheable_targets
        .iter()
        .any(|t| *t == task.target.target)
        && !is_long_running(task);
    debug!(task = %task.id, cacheable, "cacheability decision");
    cacheable
}

/// Watch-mode and server tasks never terminate by themselves
fn is_long_running(task: &Task) -> bool {
    let watch = task
        .overrides
        .get("watch")
        .is_some_and(|w| is_truthy(w) && *w != Value::String("false".to_string()));
    let t = task.target.target.as_str();

    watch || t.ends_with(":watch") || t.ends_with("-watch") || LONG_RUNNING_TARGETS.contains(&t)
}

/// Scheduling decisions for a run, bundled with the run's options
#[derive(Debug, Clone, Default)]
pub struct SchedulingPolicy {
    options: PolicyOptions,
    initiating_project: Option<String>,
}

impl SchedulingPolicy {
    /// Create a policy
    pub fn new(options: PolicyOptions, initiating_project: Option<String>) -> Self {
        Self {
            options,
            initiating_project,
        }
    }

    /// See [`should_stream_output`]
    pub fn should_stream_output(&self, task: &Task) -> bool {
        should_stream_output(task, self.initiating_project.as_deref(), &self.options)
    }

    /// See [`is_cacheable_task`]
    pub fn is_cacheable(&self, task: &Task) -> bool {
        is_cacheable_task(task, &self.options)
    }

    /// The options in effect
    pub fn options(&self) -> &PolicyOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(project: &str, target: &str, overrides: Value) -> Task {
        let overrides = match overrides {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        };
        Task::new(TargetReference::new(project, target), overrides)
    }

    fn options() -> PolicyOptions {
        PolicyOptions {
            stream_output: false,
            cacheable_targets: vec!["build".to_string(), "test".to_string(), "build-watch".to_string()],
        }
    }

    #[test]
    fn test_command_as_string() {
        let task = task("app", "build", json!({ "__overrides_unparsed__": ["--verbose"] }));
        assert_eq!(get_command_as_string("npx", &task), "npx nx run app:build --verbose");
    }

    #[test]
    fn test_command_as_string_trims_empty_exec() {
        let task = task("app", "build", json!({}));
        assert_eq!(get_command_as_string("", &task), "nx run app:build");
    }

    #[test]
    fn test_printable_args_quote_colon_targets() {
        let task = task("app", "build:prod", json!({}));
        assert_eq!(
            get_printable_command_args_for_task(&task),
            vec!["run", "app:\"build:prod\""]
        );
    }

    #[test]
    fn test_printable_args_with_configuration() {
        let task = Task::with_unparsed_args(
            TargetReference::new("app", "build").with_configuration("production"),
            ["--skip-nx-cache"],
        );
        assert_eq!(
            get_printable_command_args_for_task(&task),
            vec!["run", "app:build:production", "--skip-nx-cache"]
        );
    }

    #[test]
    fn test_serialized_args() {
        let task = task("app", "test", json!({ "__overrides_unparsed__": [], "ci": true }));
        let args = get_serialized_args_for_task(&task, true).unwrap();
        assert_eq!(args.len(), 1);

        let parsed: Value = serde_json::from_str(&args[0]).unwrap();
        assert_eq!(
            parsed,
            json!({
                "targetDescription": { "project": "app", "target": "test" },
                "overrides": { "__overrides_unparsed__": [], "ci": true },
                "isVerbose": true,
            })
        );
    }

    #[test]
    fn test_stream_output_for_initiating_project() {
        let task = task("app", "build", json!({}));
        assert!(should_stream_output(&task, Some("app"), &options()));
        assert!(!should_stream_output(&task, Some("lib"), &options()));
        assert!(!should_stream_output(&task, None, &options()));
    }

    #[test]
    fn test_stream_output_forced() {
        let task = task("lib", "build", json!({}));
        let forced = PolicyOptions {
            stream_output: true,
            ..options()
        };
        assert!(should_stream_output(&task, None, &forced));
    }

    #[test]
    fn test_stream_output_long_running() {
        assert!(should_stream_output(&task("lib", "serve", json!({})), None, &options()));
        assert!(should_stream_output(&task("lib", "build:watch", json!({})), None, &options()));
        assert!(should_stream_output(
            &task("lib", "build", json!({ "watch": true })),
            None,
            &options()
        ));
    }

    #[test]
    fn test_cacheable_task() {
        assert!(is_cacheable_task(&task("app", "build", json!({})), &options()));
        assert!(!is_cacheable_task(&task("app", "lint", json!({})), &options()));
        assert!(!is_cacheable_task(&task("app", "build", json!({})), &PolicyOptions::default()));
    }

    #[test]
    fn test_watch_targets_never_cacheable() {
        assert!(!is_cacheable_task(&task("app", "build-watch", json!({})), &options()));
    }

    #[test]
    fn test_long_running_names() {
        let opts = PolicyOptions {
            stream_output: false,
            cacheable_targets: ["serve", "dev", "start", "e2e:watch", "starter"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        assert!(!is_cacheable_task(&task("app", "serve", json!({})), &opts));
        assert!(!is_cacheable_task(&task("app", "dev", json!({})), &opts));
        assert!(!is_cacheable_task(&task("app", "start", json!({})), &opts));
        assert!(!is_cacheable_task(&task("app", "e2e:watch", json!({})), &opts));
        assert!(is_cacheable_task(&task("app", "starter", json!({})), &opts));
    }

    #[test]
    fn test_watch_override_values() {
        let opts = options();
        assert!(!is_cacheable_task(&task("app", "test", json!({ "watch": true })), &opts));
        assert!(!is_cacheable_task(&task("app", "test", json!({ "watch": "true" })), &opts));
        assert!(is_cacheable_task(&task("app", "test", json!({ "watch": "false" })), &opts));
        assert!(is_cacheable_task(&task("app", "test", json!({ "watch": false })), &opts));
        assert!(is_cacheable_task(&task("app", "test", json!({ "watch": 0 })), &opts));
    }

    #[test]
    fn test_policy_from_config() {
        let config = TasksRunnerConfig {
            stream_output: true,
            ..TasksRunnerConfig::default()
        };
        let policy = SchedulingPolicy::new(PolicyOptions::from(&config), Some("app".to_string()));
        assert!(policy.options().stream_output);
        assert!(policy.is_cacheable(&task("lib", "lint", json!({}))));
        assert!(policy.should_stream_output(&task("lib", "lint", json!({}))));
    }
}
